use futures::future::LocalBoxFuture;
use reqwest::{StatusCode, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::request_error::RequestError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMethod {
    Get,
    Post,
}

/// One network call: method, url and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCall {
    pub method: CallMethod,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl EndpointCall {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: CallMethod::Get, url: url.into(), body: None }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self { method: CallMethod::Post, url: url.into(), body: Some(body) }
    }
}

/// Raw text of a successful response. Some endpoints answer with JSON, others with markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBody(pub String);

impl ResponseBody {
    pub fn json<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        Ok(serde_json::from_str(&self.0)?)
    }

    pub fn into_text(self) -> String {
        self.0
    }
}

/// Performs endpoint calls. Dropping the returned future cancels the call where the transport allows it.
pub trait EndpointClient {
    fn call(&self, call: EndpointCall) -> LocalBoxFuture<'static, Result<ResponseBody, RequestError>>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpEndpointClient {
    client: reqwest::Client,
}

impl HttpEndpointClient {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl EndpointClient for HttpEndpointClient {
    fn call(&self, call: EndpointCall) -> LocalBoxFuture<'static, Result<ResponseBody, RequestError>> {
        let client = self.client.clone();
        Box::pin(async move { send_endpoint_call(&client, call).await })
    }
}

async fn send_endpoint_call(client: &reqwest::Client, call: EndpointCall) -> Result<ResponseBody, RequestError> {
    let request = match call.method {
        CallMethod::Get => client.get(&call.url),
        CallMethod::Post => client.post(&call.url),
    };
    let request = match &call.body {
        Some(body) => request.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(body.to_string()),
        None => request,
    };
    let response = request
        .send()
        .await
        .map_err(|e| RequestError::TransportFailure(e.to_string()))?;
    let status = response.status();
    let response_txt = response
        .text()
        .await
        .map_err(|e| RequestError::TransportFailure(e.to_string()))?;
    tracing::debug!("{} {}: {} ({} bytes)", method_name(call.method), call.url, status, response_txt.len());
    classify_response(status, response_txt)
}

fn method_name(method: CallMethod) -> &'static str {
    match method {
        CallMethod::Get => "GET",
        CallMethod::Post => "POST",
    }
}

/// Maps an HTTP status onto success, access denied (403, body kept) or a generic failure.
pub fn classify_response(status: StatusCode, response_txt: String) -> Result<ResponseBody, RequestError> {
    if status == StatusCode::FORBIDDEN {
        return Err(RequestError::AccessDenied(response_txt));
    }
    if status.is_client_error() || status.is_server_error() {
        return Err(RequestError::TransportFailure(status.to_string()));
    }
    Ok(ResponseBody(response_txt))
}
