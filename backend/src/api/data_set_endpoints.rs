//! URL and payload builders for every data set endpoint.

use common::{
    data_set_query::Query,
    explorer_result::{InitializeArgs, PreviewRequest},
};
use serde_json::json;

use crate::http_utils::endpoint_client::EndpointCall;

/// Endpoints below one base url (the mount point of the data sets blueprint).
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetEndpoints {
    base_url: reqwest::Url,
}

impl DataSetEndpoints {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = reqwest::Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("data sets url {} can not be used as a base url", base_url);
        }
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        // never fails: cannot-be-a-base urls are rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn initialize(&self, args: &InitializeArgs) -> EndpointCall {
        EndpointCall::post(self.url(&[".initialize"]), json!(args))
    }

    pub fn preview(&self, query: &Query, limit: u64, offset: u64) -> EndpointCall {
        let request = PreviewRequest { query: query.clone(), limit, offset };
        EndpointCall::post(self.preview_url(), json!(request))
    }

    pub fn preview_url(&self) -> String {
        self.url(&[".preview"]).into()
    }

    pub fn row_count(&self, query: &Query) -> EndpointCall {
        EndpointCall::post(self.row_count_url(), json!(query))
    }

    pub fn row_count_url(&self) -> String {
        self.url(&[".row-count"]).into()
    }

    /// Count of rows matching only the filter at `filter_position` of `query`.
    pub fn filter_row_count(&self, filter_position: usize, query: &Query) -> EndpointCall {
        EndpointCall::post(self.url(&[&format!(".filter-row-count-{filter_position}")]), json!(query))
    }

    /// Histogram of the catalog column at `column_index` under the filters of `query`.
    pub fn distribution_chart(&self, column_index: usize, query: &Query) -> EndpointCall {
        EndpointCall::post(self.distribution_chart_url(column_index), json!(query))
    }

    pub fn distribution_chart_url(&self, column_index: usize) -> String {
        self.url(&[&format!(".distribution-chart-{column_index}")]).into()
    }

    pub fn auto_complete(&self, term: &str, data_set_id: &str, column_name: &str) -> EndpointCall {
        let mut url = self.url(&[".auto-complete"]);
        url.query_pairs_mut()
            .append_pair("term", term)
            .append_pair("data-set-id", data_set_id)
            .append_pair("column-name", column_name);
        EndpointCall::get(url)
    }

    pub fn save(&self, query: &Query) -> EndpointCall {
        EndpointCall::post(self.url(&[".save"]), json!(query))
    }

    pub fn display_query(&self, query: &Query) -> EndpointCall {
        EndpointCall::post(self.url(&[".display-query"]), json!(query))
    }

    pub fn query_list(&self, data_set_id: &str) -> EndpointCall {
        EndpointCall::get(self.url(&[data_set_id, ".query-list"]))
    }
}
