//! Actions on the query as a whole: save, show, load and share.

use backend::api::{auto_complete, save_query};
use common::{data_set_query::FilterId, explorer_result::InitializeArgs};

use crate::{
    data_definitions::{
        target_board::{Notification, Target, TargetContent},
        url_param::UrlParam,
        validation::{ActionError, ValidationFailure},
    },
    query_engine::data_set_page::DataSetPage,
    scheduler::ScheduledRequest,
};

impl DataSetPage {
    /// Saves the query under `name` and returns where the saved query can be opened.
    ///
    /// The name stays assigned to the query when saving fails.
    pub async fn save(&self, name: &str) -> Result<String, ActionError> {
        self.ensure_initialized()?;
        let name = name.trim();
        if name.is_empty() {
            self.render_query_details(Some(ValidationFailure::MissingQueryName.to_string()));
            return Err(ValidationFailure::MissingQueryName.into());
        }

        let query = {
            let mut session = self.session.borrow_mut();
            session.query.query_id = Some(name.to_string());
            session.query.clone()
        };
        self.render_query_details(None);

        match save_query(self.client.as_ref(), &self.endpoints, &query).await {
            Ok(location) => {
                tracing::info!("saved query {} to {}", name, location);
                Ok(location)
            }
            Err(e) => {
                tracing::warn!("could not save query {}: {}", name, e);
                self.board.notify(Notification::danger(format!("Could not save query {}", name)));
                Err(e.into())
            }
        }
    }

    /// Fetches the server's rendering of the query into the query display.
    pub fn display_query(&self) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        let call = self.endpoints.display_query(&self.session.borrow().query);
        let board = self.board.clone();
        self.scheduler.enqueue(ScheduledRequest::for_url(call, vec![Target::QueryDisplay], move |body| {
            board.render(Target::QueryDisplay, TargetContent::Markup(body.into_text()));
            Ok(())
        }));
        Ok(())
    }

    /// Fetches the saved queries of this data set for the load dialog.
    pub fn load_query_list(&self) -> Result<(), ValidationFailure> {
        self.ensure_initialized()?;
        let call = self.endpoints.query_list(&self.session.borrow().query.data_set_id);
        let board = self.board.clone();
        self.scheduler.enqueue(ScheduledRequest::for_url(call, vec![Target::QueryList], move |body| {
            board.render(Target::QueryList, TargetContent::Markup(body.into_text()));
            Ok(())
        }));
        Ok(())
    }

    /// Suggested values for the text filter `id` that match `term`.
    pub async fn auto_complete(&self, id: FilterId, term: &str) -> Result<Vec<String>, ActionError> {
        self.ensure_initialized()?;
        let (column_name, column_type) = self.filter_column(id)?;
        if !column_type.takes_value_list() {
            return Ok(Vec::new());
        }
        let data_set_id = self.session.borrow().query.data_set_id.clone();
        let suggestions = auto_complete(self.client.as_ref(), &self.endpoints, term, &data_set_id, &column_name).await?;
        Ok(suggestions)
    }

    /// Link parameter that opens this page with the current query.
    pub fn share_link_param(&self) -> UrlParam<InitializeArgs> {
        let query = self.session.borrow().query.clone();
        UrlParam(InitializeArgs { data_set_id: query.data_set_id.clone(), query_id: None, query: Some(query) })
    }
}
