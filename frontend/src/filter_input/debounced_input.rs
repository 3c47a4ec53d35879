use std::{cell::RefCell, rc::Rc, time::Duration};

use common::data_set_query::FilterId;
use tokio_util::sync::CancellationToken;

use crate::{data_definitions::validation::ValidationFailure, filter_input::FilterEditor, runtime};

/// Free-text or numeric filter value input.
///
/// Keystrokes only update the pending value and restart the quiet-period timer;
/// the filter is changed once the timer runs out, or right away on [`Self::commit`].
pub struct DebouncedFilterInput<E: FilterEditor + Clone + 'static> {
    editor: E,
    filter_id: FilterId,
    quiet_period: Duration,
    pending: Rc<RefCell<Option<String>>>,
    timer: Option<CancellationToken>,
}

impl<E: FilterEditor + Clone + 'static> DebouncedFilterInput<E> {
    pub fn new(editor: E, filter_id: FilterId, quiet_period: Duration) -> Self {
        Self { editor, filter_id, quiet_period, pending: Rc::new(RefCell::new(None)), timer: None }
    }

    pub fn filter_id(&self) -> FilterId {
        self.filter_id
    }

    /// Typed but not yet applied value, shown in the input meanwhile.
    pub fn pending_value(&self) -> Option<String> {
        self.pending.borrow().clone()
    }

    pub fn keystroke(&mut self, value: &str) {
        *self.pending.borrow_mut() = Some(value.to_string());
        self.cancel_timer();

        let token = CancellationToken::new();
        self.timer = Some(token.clone());
        let editor = self.editor.clone();
        let pending = self.pending.clone();
        let filter_id = self.filter_id;
        let quiet_period = self.quiet_period;
        runtime::spawn_local(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = runtime::sleep(quiet_period) => {
                    let value = pending.borrow_mut().take();
                    if let Some(value) = value
                        && let Err(e) = editor.change_filter_value_text(filter_id, &value)
                    {
                        tracing::warn!("filter {} keeps its value: {}", filter_id, e);
                    }
                }
            }
        });
    }

    /// Applies the pending value now (change or blur of the input).
    pub fn commit(&mut self) -> Result<(), ValidationFailure> {
        self.cancel_timer();
        let value = self.pending.borrow_mut().take();
        match value {
            Some(value) => self.editor.change_filter_value_text(self.filter_id, &value),
            None => Ok(()),
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl<E: FilterEditor + Clone + 'static> Drop for DebouncedFilterInput<E> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use common::data_set_query::FilterValue;
    use tokio::{task::LocalSet, time::sleep};

    use super::*;
    use crate::{filter_input::recording_editor::RecordingEditor, test_support::settle};

    const QUIET: Duration = Duration::from_secs(2);

    fn editor() -> RecordingEditor {
        RecordingEditor::with_value(FilterId(1), FilterValue::Number(0.0))
    }

    fn text(value: &str) -> (FilterId, FilterValue) {
        (FilterId(1), FilterValue::Text(value.to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_collapse_into_one_change() {
        LocalSet::new()
            .run_until(async {
                let editor = editor();
                let mut input = DebouncedFilterInput::new(editor.clone(), FilterId(1), QUIET);
                input.keystroke("1");
                sleep(Duration::from_millis(500)).await;
                input.keystroke("12");
                sleep(Duration::from_millis(500)).await;
                input.keystroke("125");
                assert_eq!(input.pending_value().as_deref(), Some("125"));

                sleep(Duration::from_millis(1999)).await;
                settle().await;
                assert!(editor.changes().is_empty());

                sleep(Duration::from_millis(2)).await;
                settle().await;
                assert_eq!(editor.changes(), vec![text("125")]);
                assert_eq!(input.pending_value(), None);

                sleep(Duration::from_secs(10)).await;
                settle().await;
                assert_eq!(editor.changes().len(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn commit_applies_once() {
        LocalSet::new()
            .run_until(async {
                let editor = editor();
                let mut input = DebouncedFilterInput::new(editor.clone(), FilterId(1), QUIET);
                input.keystroke("7");
                input.commit().unwrap();
                assert_eq!(editor.changes(), vec![text("7")]);
                sleep(Duration::from_secs(5)).await;
                settle().await;
                assert_eq!(editor.changes().len(), 1);
                // nothing pending
                input.commit().unwrap();
                assert_eq!(editor.changes().len(), 1);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_input_never_applies() {
        LocalSet::new()
            .run_until(async {
                let editor = editor();
                let mut input = DebouncedFilterInput::new(editor.clone(), FilterId(1), QUIET);
                input.keystroke("9");
                drop(input);
                sleep(Duration::from_secs(5)).await;
                settle().await;
                assert!(editor.changes().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_filter_is_not_resurrected() {
        LocalSet::new()
            .run_until(async {
                let editor = editor();
                let mut input = DebouncedFilterInput::new(editor.clone(), FilterId(2), QUIET);
                input.keystroke("3");
                sleep(Duration::from_secs(3)).await;
                settle().await;
                assert!(editor.changes().is_empty());
                assert!(editor.filter_value(FilterId(2)).is_none());
                input.keystroke("4");
                assert_eq!(input.commit(), Err(ValidationFailure::UnknownFilter(FilterId(2))));
            })
            .await;
    }
}
