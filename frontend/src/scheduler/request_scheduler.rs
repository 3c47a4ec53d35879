use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use backend::{
    http_utils::endpoint_client::{EndpointCall, EndpointClient, ResponseBody},
    request_error::RequestError,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::{
    data_definitions::target_board::{Target, TargetBoard, TargetContent},
    runtime,
};

type ResultHandler = Box<dyn FnOnce(ResponseBody) -> anyhow::Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Normal,
    /// Dispatched before everything queued, never preempts a running call.
    High,
}

/// A call together with where its outcome goes.
pub struct ScheduledRequest {
    /// At most one request per key is queued or running.
    pub key: String,
    pub call: EndpointCall,
    pub targets: Vec<Target>,
    pub priority: Priority,
    on_result: ResultHandler,
}

impl ScheduledRequest {
    pub fn new(
        key: impl Into<String>,
        call: EndpointCall,
        targets: Vec<Target>,
        on_result: impl FnOnce(ResponseBody) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self { key: key.into(), call, targets, priority: Priority::Normal, on_result: Box::new(on_result) }
    }

    /// Keyed by the call's url.
    pub fn for_url(
        call: EndpointCall,
        targets: Vec<Target>,
        on_result: impl FnOnce(ResponseBody) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self::new(call.url.clone(), call, targets, on_result)
    }

    pub fn high_priority(mut self) -> Self {
        self.priority = Priority::High;
        self
    }
}

struct InFlightRequest {
    generation: u64,
    cancel: CancellationToken,
    url: String,
    targets: Vec<Target>,
    on_result: ResultHandler,
}

#[derive(Default)]
struct SchedulerState {
    pending: VecDeque<ScheduledRequest>,
    in_flight: HashMap<String, InFlightRequest>,
    next_generation: u64,
}

/// Runs scheduled requests, at most `max_in_flight` at a time.
///
/// Enqueueing a request whose key is already queued or running supersedes the
/// older one: the queued one is dropped, the running one is cancelled and its
/// response, should it still arrive, is discarded.
#[derive(Clone)]
pub struct RequestScheduler {
    state: Rc<RefCell<SchedulerState>>,
    client: Rc<dyn EndpointClient>,
    board: TargetBoard,
    max_in_flight: usize,
    idle: Rc<Notify>,
}

impl RequestScheduler {
    pub fn new(client: Rc<dyn EndpointClient>, board: TargetBoard, max_in_flight: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState::default())),
            client,
            board,
            max_in_flight: max_in_flight.max(1),
            idle: Rc::new(Notify::new()),
        }
    }

    pub fn enqueue(&self, request: ScheduledRequest) {
        self.drop_key(&request.key);

        for target in &request.targets {
            self.board.show_loading(*target);
        }

        {
            let mut state = self.state.borrow_mut();
            match request.priority {
                Priority::High => state.pending.push_front(request),
                Priority::Normal => state.pending.push_back(request),
            }
        }
        self.admit();
    }

    /// Withdraws the request queued or running under `key`, without touching its targets.
    pub fn cancel(&self, key: &str) -> bool {
        let dropped = self.drop_key(key);
        self.admit();
        self.notify_if_idle();
        dropped
    }

    fn drop_key(&self, key: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let mut dropped = false;
        if let Some(running) = state.in_flight.remove(key) {
            tracing::debug!("abort running request for {}", key);
            running.cancel.cancel();
            dropped = true;
        }
        let queued = state.pending.len();
        state.pending.retain(|request| request.key != key);
        if state.pending.len() != queued {
            tracing::debug!("removing queued request for {}", key);
            dropped = true;
        }
        dropped
    }

    fn admit(&self) {
        loop {
            let (key, generation, cancel, call) = {
                let mut state = self.state.borrow_mut();
                if state.in_flight.len() >= self.max_in_flight {
                    return;
                }
                let Some(request) = state.pending.pop_front() else {
                    return;
                };
                state.next_generation += 1;
                let generation = state.next_generation;
                let cancel = CancellationToken::new();
                let ScheduledRequest { key, call, targets, on_result, .. } = request;
                state.in_flight.insert(
                    key.clone(),
                    InFlightRequest { generation, cancel: cancel.clone(), url: call.url.clone(), targets, on_result },
                );
                (key, generation, cancel, call)
            };

            let response = self.client.call(call);
            let scheduler = self.clone();
            runtime::spawn_local(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(RequestError::Aborted),
                    outcome = response => outcome,
                };
                scheduler.complete(&key, generation, outcome);
            });
        }
    }

    fn complete(&self, key: &str, generation: u64, outcome: Result<ResponseBody, RequestError>) {
        let running = {
            let mut state = self.state.borrow_mut();
            match state.in_flight.get(key) {
                Some(running) if running.generation == generation => state.in_flight.remove(key),
                _ => None,
            }
        };

        match (running, outcome) {
            (None, Err(RequestError::Aborted)) => {}
            (None, _) => tracing::debug!("discarding stale response for {}", key),
            (Some(running), Ok(body)) => {
                if let Err(e) = (running.on_result)(body) {
                    tracing::error!("failed to handle response of {}: {:#}", running.url, e);
                    self.render_all(&running.targets, TargetContent::Error(e.to_string()));
                }
            }
            (Some(_), Err(RequestError::Aborted)) => {}
            (Some(running), Err(RequestError::AccessDenied(explanation))) => {
                self.render_all(&running.targets, TargetContent::AccessDenied(explanation));
            }
            (Some(running), Err(RequestError::TransportFailure(detail))) => {
                tracing::warn!("{} while posting to {}", detail, running.url);
                let detail = format!("{} while posting to \"{}\"", detail, running.url);
                self.render_all(&running.targets, TargetContent::Error(detail));
            }
        }

        self.admit();
        self.notify_if_idle();
    }

    fn render_all(&self, targets: &[Target], content: TargetContent) {
        for target in targets {
            self.board.render(*target, content.clone());
        }
    }

    fn notify_if_idle(&self) {
        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }

    pub fn is_idle(&self) -> bool {
        let state = self.state.borrow();
        state.pending.is_empty() && state.in_flight.is_empty()
    }

    /// Resolves once nothing is queued or running.
    pub async fn idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Whether a request for `key` is queued or running.
    pub fn is_scheduled(&self, key: &str) -> bool {
        let state = self.state.borrow();
        state.in_flight.contains_key(key) || state.pending.iter().any(|request| request.key == key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.borrow().in_flight.len()
    }

    pub fn in_flight_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.borrow().in_flight.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Queued keys in dispatch order.
    pub fn pending_keys(&self) -> Vec<String> {
        self.state.borrow().pending.iter().map(|request| request.key.clone()).collect()
    }

    pub fn board(&self) -> &TargetBoard {
        &self.board
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tokio::task::LocalSet;

    use super::*;
    use crate::test_support::{MockEndpointClient, settle};

    fn scheduler(mock: &Rc<MockEndpointClient>) -> RequestScheduler {
        let client: Rc<dyn EndpointClient> = mock.clone();
        RequestScheduler::new(client, TargetBoard::new(), 3)
    }

    fn post(url: &str) -> EndpointCall {
        EndpointCall::post(url, serde_json::json!({"url": url}))
    }

    fn recording(log: &Rc<RefCell<Vec<String>>>, name: &str) -> impl FnOnce(ResponseBody) -> anyhow::Result<()> + 'static {
        let log = log.clone();
        let name = name.to_string();
        move |body| {
            log.borrow_mut().push(format!("{}={}", name, body.into_text()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn at_most_three_in_flight() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                for i in 0..5 {
                    let url = format!("/r{i}");
                    scheduler.enqueue(ScheduledRequest::for_url(post(&url), vec![], |_| Ok(())));
                }
                settle().await;
                assert_eq!(scheduler.in_flight_count(), 3);
                assert_eq!(mock.urls(), vec!["/r0", "/r1", "/r2"]);
                assert_eq!(scheduler.pending_keys(), vec!["/r3", "/r4"]);

                mock.reply_ok(1, "1");
                settle().await;
                assert_eq!(scheduler.in_flight_count(), 3);
                assert_eq!(mock.urls().last().map(String::as_str), Some("/r3"));
                assert_eq!(scheduler.pending_keys(), vec!["/r4"]);
            })
            .await;
    }

    #[tokio::test]
    async fn high_priority_goes_first() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                for url in ["/busy0", "/busy1", "/busy2"] {
                    scheduler.enqueue(ScheduledRequest::for_url(post(url), vec![], |_| Ok(())));
                }
                scheduler.enqueue(ScheduledRequest::for_url(post("/a"), vec![], |_| Ok(())));
                scheduler.enqueue(ScheduledRequest::for_url(post("/b"), vec![], |_| Ok(())));
                scheduler.enqueue(ScheduledRequest::for_url(post("/c"), vec![], |_| Ok(())).high_priority());
                assert_eq!(scheduler.pending_keys(), vec!["/c", "/a", "/b"]);
                // nothing running was preempted
                assert_eq!(scheduler.in_flight_keys(), vec!["/busy0", "/busy1", "/busy2"]);

                for index in 0..3 {
                    mock.reply_ok(index, "0");
                }
                settle().await;
                assert_eq!(&mock.urls()[3..], ["/c", "/a", "/b"]);
            })
            .await;
    }

    #[tokio::test]
    async fn superseded_response_is_discarded() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                let log = Rc::new(RefCell::new(Vec::new()));

                scheduler.enqueue(ScheduledRequest::for_url(post("/row-count"), vec![], recording(&log, "p1")));
                settle().await;
                scheduler.enqueue(ScheduledRequest::for_url(post("/row-count"), vec![], recording(&log, "p2")));
                settle().await;
                assert_eq!(scheduler.in_flight_keys(), vec!["/row-count"]);
                assert_eq!(mock.open_calls(), vec![1]);

                // the first exchange still answers, late
                mock.reply_ok(0, "1");
                mock.reply_ok(1, "2");
                settle().await;
                assert_eq!(*log.borrow(), vec!["p2=2"]);
                assert!(scheduler.is_idle());
            })
            .await;
    }

    #[tokio::test]
    async fn queued_duplicate_is_replaced() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                let log = Rc::new(RefCell::new(Vec::new()));
                for url in ["/busy0", "/busy1", "/busy2"] {
                    scheduler.enqueue(ScheduledRequest::for_url(post(url), vec![], |_| Ok(())));
                }
                scheduler.enqueue(ScheduledRequest::new("chart-1", post("/chart?v=1"), vec![], recording(&log, "v1")));
                scheduler.enqueue(ScheduledRequest::for_url(post("/other"), vec![], |_| Ok(())));
                scheduler.enqueue(ScheduledRequest::new("chart-1", post("/chart?v=2"), vec![], recording(&log, "v2")));
                assert_eq!(scheduler.pending_keys(), vec!["/other", "chart-1"]);

                for index in 0..3 {
                    mock.reply_ok(index, "0");
                }
                settle().await;
                assert_eq!(mock.count_of("/chart?v=1"), 0);
                let chart_call = mock.urls().iter().position(|url| url == "/chart?v=2").unwrap();
                mock.reply_ok(chart_call, "done");
                settle().await;
                assert_eq!(*log.borrow(), vec!["v2=done"]);
            })
            .await;
    }

    #[tokio::test]
    async fn targets_show_loading_then_result() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                let board = scheduler.board().clone();
                board.set_height(Target::Preview, 300);
                let handler_board = board.clone();
                scheduler.enqueue(ScheduledRequest::for_url(post("/preview"), vec![Target::Preview], move |body| {
                    handler_board.render(Target::Preview, TargetContent::Markup(body.into_text()));
                    Ok(())
                }));
                assert_eq!(board.content(Target::Preview), Some(TargetContent::Loading { height_px: 300 }));
                settle().await;
                mock.reply_ok(0, "<table/>");
                settle().await;
                assert_eq!(board.content(Target::Preview), Some(TargetContent::Markup("<table/>".to_string())));
            })
            .await;
    }

    #[tokio::test]
    async fn access_denied_shows_server_explanation() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                let called = Rc::new(Cell::new(false));
                let flag = called.clone();
                scheduler.enqueue(ScheduledRequest::for_url(
                    post("/row-count"),
                    vec![Target::RowCounts, Target::Pagination],
                    move |_| {
                        flag.set(true);
                        Ok(())
                    },
                ));
                settle().await;
                mock.reply(0, Err(RequestError::AccessDenied("<p>No access to orders</p>".to_string())));
                settle().await;
                let denied = Some(TargetContent::AccessDenied("<p>No access to orders</p>".to_string()));
                assert_eq!(scheduler.board().content(Target::RowCounts), denied);
                assert_eq!(scheduler.board().content(Target::Pagination), denied);
                assert!(!called.get());
            })
            .await;
    }

    #[tokio::test]
    async fn transport_failure_shows_error_marker() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                scheduler.enqueue(ScheduledRequest::for_url(post("/preview"), vec![Target::Preview], |_| Ok(())));
                settle().await;
                mock.reply(0, Err(RequestError::TransportFailure("500 Internal Server Error".to_string())));
                settle().await;
                assert_eq!(
                    scheduler.board().content(Target::Preview),
                    Some(TargetContent::Error("500 Internal Server Error while posting to \"/preview\"".to_string()))
                );
                assert!(scheduler.is_idle());
            })
            .await;
    }

    #[tokio::test]
    async fn failing_handler_marks_targets() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                scheduler.enqueue(ScheduledRequest::for_url(post("/row-count"), vec![Target::RowCounts], |body| {
                    body.json::<u64>()?;
                    Ok(())
                }));
                settle().await;
                mock.reply_ok(0, "not a number");
                settle().await;
                assert!(matches!(scheduler.board().content(Target::RowCounts), Some(TargetContent::Error(_))));
            })
            .await;
    }

    #[tokio::test]
    async fn cancel_frees_the_slot_without_ui() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                for url in ["/a", "/b", "/c", "/d"] {
                    scheduler.enqueue(ScheduledRequest::for_url(post(url), vec![Target::Preview], |_| Ok(())));
                }
                settle().await;
                assert!(scheduler.cancel("/a"));
                // the freed slot is used right away
                assert_eq!(scheduler.in_flight_keys(), vec!["/b", "/c", "/d"]);
                settle().await;
                assert!(!mock.open_calls().contains(&0));
                assert!(scheduler.board().content(Target::Preview).is_some_and(|content| content.is_loading()));
                assert!(!scheduler.cancel("/a"));
            })
            .await;
    }

    #[tokio::test]
    async fn idle_resolves_after_cascade() {
        LocalSet::new()
            .run_until(async {
                let mock = MockEndpointClient::new();
                let scheduler = scheduler(&mock);
                let follow_up = scheduler.clone();
                scheduler.enqueue(ScheduledRequest::for_url(post("/first"), vec![], move |_| {
                    follow_up.enqueue(ScheduledRequest::for_url(post("/second"), vec![], |_| Ok(())));
                    Ok(())
                }));
                let waiter = scheduler.clone();
                let done = Rc::new(Cell::new(false));
                let done_flag = done.clone();
                tokio::task::spawn_local(async move {
                    waiter.idle().await;
                    done_flag.set(true);
                });
                settle().await;
                mock.reply_ok(0, "");
                settle().await;
                assert!(!done.get());
                mock.reply_ok(1, "");
                settle().await;
                assert!(done.get());
            })
            .await;
    }
}
