use crate::{
    api::data_set_endpoints::DataSetEndpoints,
    http_utils::endpoint_client::EndpointClient,
    request_error::RequestError,
};

/// Suggestions for a text filter on `column_name` starting from `term`.
pub async fn auto_complete(
    client: &dyn EndpointClient,
    endpoints: &DataSetEndpoints,
    term: &str,
    data_set_id: &str,
    column_name: &str,
) -> Result<Vec<String>, RequestError> {
    let response = client.call(endpoints.auto_complete(term, data_set_id, column_name)).await?;
    response
        .json::<Vec<String>>()
        .map_err(|e| RequestError::TransportFailure(format!("invalid auto-complete response: {e}")))
}
