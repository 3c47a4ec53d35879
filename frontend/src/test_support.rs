//! In-memory endpoint client whose calls are answered by the test.

use std::{cell::RefCell, rc::Rc};

use backend::{
    http_utils::endpoint_client::{EndpointCall, EndpointClient, ResponseBody},
    request_error::RequestError,
};
use futures_util::future::LocalBoxFuture;
use tokio::sync::oneshot;

type Reply = Result<ResponseBody, RequestError>;

struct RecordedCall {
    call: EndpointCall,
    responder: Option<oneshot::Sender<Reply>>,
}

#[derive(Default)]
pub(crate) struct MockEndpointClient {
    calls: RefCell<Vec<RecordedCall>>,
}

impl MockEndpointClient {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn calls(&self) -> Vec<EndpointCall> {
        self.calls.borrow().iter().map(|recorded| recorded.call.clone()).collect()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|recorded| recorded.call.url.clone()).collect()
    }

    /// Started calls whose url ends with `suffix`.
    pub(crate) fn count_of(&self, suffix: &str) -> usize {
        self.urls().iter().filter(|url| url.ends_with(suffix)).count()
    }

    /// Calls that are neither answered nor cancelled.
    pub(crate) fn open_calls(&self) -> Vec<usize> {
        self.calls
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, recorded)| recorded.responder.as_ref().is_some_and(|tx| !tx.is_closed()))
            .map(|(index, _)| index)
            .collect()
    }

    pub(crate) fn call(&self, index: usize) -> EndpointCall {
        self.calls.borrow()[index].call.clone()
    }

    pub(crate) fn reply(&self, index: usize, reply: Reply) {
        let responder = self.calls.borrow_mut()[index].responder.take();
        if let Some(tx) = responder {
            let _ = tx.send(reply);
        }
    }

    pub(crate) fn reply_ok(&self, index: usize, body: &str) {
        self.reply(index, Ok(ResponseBody(body.to_string())));
    }
}

impl EndpointClient for MockEndpointClient {
    fn call(&self, call: EndpointCall) -> LocalBoxFuture<'static, Reply> {
        let (tx, rx) = oneshot::channel();
        self.calls.borrow_mut().push(RecordedCall { call, responder: Some(tx) });
        Box::pin(async move { rx.await.unwrap_or(Err(RequestError::Aborted)) })
    }
}

/// Lets spawned local tasks run until they wait on something.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Answers every open call with `server` until no call is left open.
pub(crate) async fn answer_all(mock: &MockEndpointClient, server: impl Fn(&EndpointCall) -> Reply) {
    for _ in 0..100 {
        settle().await;
        let open = mock.open_calls();
        if open.is_empty() {
            return;
        }
        for index in open {
            let reply = server(&mock.call(index));
            mock.reply(index, reply);
        }
    }
    panic!("calls are still open after 100 rounds");
}
