use common::data_set_query::Query;

use crate::{
    api::data_set_endpoints::DataSetEndpoints,
    http_utils::endpoint_client::EndpointClient,
    request_error::RequestError,
};

/// Stores `query` under its `query_id` and returns the location of the saved query's page.
pub async fn save_query(
    client: &dyn EndpointClient,
    endpoints: &DataSetEndpoints,
    query: &Query,
) -> Result<String, RequestError> {
    let response = client.call(endpoints.save(query)).await?;
    response
        .json::<String>()
        .map_err(|e| RequestError::TransportFailure(format!("invalid save response: {e}")))
}
