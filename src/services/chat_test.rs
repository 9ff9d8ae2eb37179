use super::*;
use crate::config::{AppConfig, ChatConfig};
use crate::llm::types::{ChatResponse, Tool};
use crate::services::charts::{ChartError, execute_chart};
use crate::services::thread::{MemoryThreadStore, ThreadStore};
use crate::state::test_helpers;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wire::ChartKind;

// =========================================================================
// MockLlm
// =========================================================================

struct MockLlm {
    responses: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
    seen: Mutex<Vec<Vec<LlmMessage>>>,
}

impl MockLlm {
    fn new(responses: Vec<Result<ChatResponse, LlmError>>) -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(responses.into()), seen: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> Vec<Vec<LlmMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmChat for MockLlm {
    async fn chat(
        &self,
        _max_tokens: u32,
        _system: &str,
        messages: &[LlmMessage],
        _tools: Option<&[Tool]>,
    ) -> Result<ChatResponse, LlmError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("done")))
    }
}

fn response(content: Vec<ContentBlock>, stop_reason: &str) -> ChatResponse {
    ChatResponse { content, model: "mock".into(), stop_reason: stop_reason.into(), input_tokens: 1, output_tokens: 1 }
}

fn text_response(text: &str) -> ChatResponse {
    response(vec![ContentBlock::Text { text: text.into() }], "end_turn")
}

fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
    ContentBlock::ToolUse { id: id.into(), name: name.into(), input }
}

fn bar_input() -> Value {
    json!({ "title": "Q1 Sales", "data": [{ "month": "Jan", "sales": 120 }], "xKey": "month" })
}

fn request(message: &str) -> ChatRequest {
    ChatRequest { thread_id: None, message: message.into() }
}

/// Prepare then run, as the route does.
async fn run_turn(
    state: &AppState,
    user_id: &str,
    req: ChatRequest,
    tx: mpsc::Sender<StreamEvent>,
) -> Result<TurnOutcome, ChatError> {
    let turn = prepare_turn(state, user_id, req).await?;
    run_prepared(state, turn, tx).await
}

async fn run(state: &AppState, req: ChatRequest) -> (Result<TurnOutcome, ChatError>, Vec<StreamEvent>) {
    let (tx, mut rx) = mpsc::channel(256);
    let result = run_turn(state, "u1", req, tx).await;
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (result, events)
}

fn names(events: &[StreamEvent]) -> Vec<&'static str> {
    events.iter().map(StreamEvent::name).collect()
}

// =========================================================================
// FlakyStore
// =========================================================================

/// Memory store that fails history loads or assistant writes on request.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryThreadStore,
    fail_load: bool,
    /// Assistant appends still to fail.
    failing_replies: AtomicUsize,
}

fn db_down() -> ThreadError {
    ThreadError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait::async_trait]
impl ThreadStore for FlakyStore {
    async fn create_thread(&self, user_id: &str, title: &str) -> Result<Thread, ThreadError> {
        self.inner.create_thread(user_id, title).await
    }

    async fn get_thread(&self, user_id: &str, thread_id: Uuid) -> Result<Thread, ThreadError> {
        self.inner.get_thread(user_id, thread_id).await
    }

    async fn list_threads(&self, user_id: &str) -> Result<Vec<Thread>, ThreadError> {
        self.inner.list_threads(user_id).await
    }

    async fn delete_thread(&self, user_id: &str, thread_id: Uuid) -> Result<(), ThreadError> {
        self.inner.delete_thread(user_id, thread_id).await
    }

    async fn load_messages(&self, thread_id: Uuid) -> Result<Vec<Message>, ThreadError> {
        if self.fail_load {
            return Err(db_down());
        }
        self.inner.load_messages(thread_id).await
    }

    async fn append_message(&self, thread_id: Uuid, message: &Message) -> Result<(), ThreadError> {
        if message.role == Role::Assistant
            && self
                .failing_replies
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(db_down());
        }
        self.inner.append_message(thread_id, message).await
    }
}

fn flaky_state(store: &Arc<FlakyStore>, llm: Arc<dyn LlmChat>) -> AppState {
    AppState::new(store.clone(), Some(llm), ToolRegistry::build(), AppConfig::default())
}

// =========================================================================
// run_prepared: happy path
// =========================================================================

#[tokio::test]
async fn chart_turn_streams_and_persists() {
    let llm = MockLlm::new(vec![
        Ok(response(
            vec![ContentBlock::Text { text: "Charting.".into() }, tool_use("call-1", "create_bar_chart", bar_input())],
            "tool_use",
        )),
        Ok(text_response("Here is Q1.")),
    ]);
    let state = test_helpers::test_app_state_with_llm(llm.clone());

    let (result, events) = run(&state, request("chart Q1 sales")).await;
    let outcome = result.expect("turn");

    assert_eq!(
        names(&events),
        vec![
            "start",
            "text-delta",
            "tool-input-start",
            "tool-input-available",
            "tool-output-available",
            "finish-step",
            "text-delta",
            "finish",
        ]
    );
    let StreamEvent::ToolOutputAvailable { output, .. } = &events[4] else {
        panic!("expected tool output, got {:?}", events[4]);
    };
    assert_eq!(output["chartType"], "bar");

    let messages = state.store.load_messages(outcome.thread_id).await.expect("load");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].id, outcome.message_id);
    let tools: Vec<&ToolPart> = messages[1].tool_parts().collect();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].state, ToolState::OutputAvailable);
    assert_eq!(messages[1].text(), "Charting.\nHere is Q1.");

    let thread = state.store.get_thread("u1", outcome.thread_id).await.expect("thread");
    assert_eq!(thread.title, "chart Q1 sales");
    assert_eq!(llm.calls().len(), 2);
}

#[tokio::test]
async fn finish_step_repeats_terminal_tool_parts() {
    let llm = MockLlm::new(vec![
        Ok(response(vec![tool_use("a", "create_bar_chart", bar_input()), tool_use("b", "create_gauge_chart", json!({}))], "tool_use")),
        Ok(text_response("ok")),
    ]);
    let state = test_helpers::test_app_state_with_llm(llm);
    let (_, events) = run(&state, request("two charts")).await;

    let step = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::FinishStep { tool_results } => Some(tool_results.clone()),
            _ => None,
        })
        .expect("finish-step");
    let states: Vec<(String, ToolState)> = step.into_iter().map(|p| (p.tool_call_id, p.state)).collect();
    assert_eq!(states, vec![("a".into(), ToolState::OutputAvailable), ("b".into(), ToolState::OutputError)]);
}

#[tokio::test]
async fn invalid_chart_input_is_a_tool_error_and_the_turn_continues() {
    let llm = MockLlm::new(vec![
        Ok(response(vec![tool_use("c1", "create_pie_chart", json!({ "title": "Share" }))], "tool_use")),
        Ok(text_response("I need the data first.")),
    ]);
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let (result, events) = run(&state, request("pie chart")).await;
    result.expect("turn");

    let error = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolOutputError { error_kind, error_text, .. } => Some((*error_kind, error_text.clone())),
            _ => None,
        })
        .expect("tool error event");
    assert_eq!(error.0, ToolErrorKind::Execution);
    assert!(error.1.contains("data"), "{}", error.1);

    // The model saw the failure as an error tool result.
    let second_call = &llm.calls()[1];
    let Content::Blocks(blocks) = &second_call.last().expect("tool results").content else {
        panic!("expected blocks");
    };
    assert!(matches!(&blocks[0], ContentBlock::ToolResult { is_error: Some(true), .. }));
}

#[tokio::test]
async fn unknown_tool_is_reported_not_executed() {
    let llm = MockLlm::new(vec![
        Ok(response(vec![tool_use("x", "web_search", json!({ "q": "sales" }))], "tool_use")),
        Ok(text_response("ok")),
    ]);
    let state = test_helpers::test_app_state_with_llm(llm);
    let (_, events) = run(&state, request("search")).await;
    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::ToolOutputError { tool_call_id, error_text, .. } if tool_call_id == "x" && error_text.contains("unknown tool")
    )));
}

#[tokio::test]
async fn silent_model_gets_fallback_text() {
    let llm = MockLlm::new(vec![
        Ok(response(vec![tool_use("c1", "create_bar_chart", bar_input())], "tool_use")),
        Ok(response(Vec::new(), "end_turn")),
    ]);
    let state = test_helpers::test_app_state_with_llm(llm);
    let (result, _) = run(&state, request("chart")).await;
    let outcome = result.expect("turn");
    let messages = state.store.load_messages(outcome.thread_id).await.expect("load");
    assert_eq!(messages[1].text(), FALLBACK_TEXT);
    assert_eq!(messages[1].tool_parts().count(), 1);
}

#[tokio::test]
async fn iteration_cap_stops_a_looping_model() {
    let looping: Vec<_> = (0..20)
        .map(|i| Ok(response(vec![tool_use(&format!("c{i}"), "create_bar_chart", bar_input())], "tool_use")))
        .collect();
    let llm = MockLlm::new(looping);
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let (result, _) = run(&state, request("loop")).await;
    result.expect("turn");
    assert_eq!(llm.calls().len(), state.config.chat.max_tool_iterations);
}

// =========================================================================
// run_prepared: failures
// =========================================================================

#[tokio::test]
async fn provider_failure_persists_stub_with_completed_chart() {
    let llm = MockLlm::new(vec![
        Ok(response(vec![tool_use("call-1", "create_bar_chart", bar_input())], "tool_use")),
        Err(LlmError::ApiResponse { status: 529, body: "overloaded".into() }),
    ]);
    let state = test_helpers::test_app_state_with_llm(llm);
    let (result, events) = run(&state, request("chart Q1")).await;

    assert!(matches!(result, Err(ChatError::Llm(_))));
    assert_eq!(names(&events).last(), Some(&"error"));
    assert!(!names(&events).contains(&"finish"));

    let StreamEvent::Start { thread_id, message_id } = events[0] else {
        panic!("expected start");
    };
    let messages = state.store.load_messages(thread_id).await.expect("load");
    assert_eq!(messages.len(), 2);
    let stub = &messages[1];
    assert_eq!(stub.id, message_id);
    assert_eq!(stub.role, Role::Assistant);
    assert_eq!(stub.tool_parts().next().map(|p| p.state), Some(ToolState::OutputAvailable));
    assert!(stub.text().starts_with("The response was interrupted"));

    // Reload: the completed chart comes back as exactly one artifact.
    let mut session = canvas::CanvasSession::default();
    assert_eq!(session.hydrate(&messages), 1);
    assert_eq!(session.state(), canvas::CanvasState::VisiblePopulated);
    assert_eq!(session.store().artifacts()[0].title, "Q1 Sales");
}

#[tokio::test]
async fn provider_failure_on_first_call_still_persists_a_reply() {
    let llm = MockLlm::new(vec![Err(LlmError::ApiRequest("connection reset".into()))]);
    let state = test_helpers::test_app_state_with_llm(llm);
    let (result, events) = run(&state, request("hello")).await;
    assert!(matches!(result, Err(ChatError::Llm(LlmError::ApiRequest(_)))));
    assert_eq!(names(&events), vec!["start", "error"]);

    let StreamEvent::Start { thread_id, .. } = events[0] else {
        panic!("expected start");
    };
    let messages = state.store.load_messages(thread_id).await.expect("load");
    assert!(!messages[1].parts.is_empty());
}

#[tokio::test]
async fn history_load_failure_ends_with_error_and_stores_a_stub() {
    let store = Arc::new(FlakyStore { fail_load: true, ..FlakyStore::default() });
    let state = flaky_state(&store, MockLlm::new(Vec::new()));
    let (result, events) = run(&state, request("chart Q1")).await;

    assert!(matches!(result, Err(ChatError::Thread(ThreadError::Database(_)))));
    assert_eq!(names(&events), vec!["start", "error"]);

    let StreamEvent::Start { thread_id, message_id } = events[0] else {
        panic!("expected start");
    };
    let messages = store.inner.load_messages(thread_id).await.expect("load");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].id, message_id);
    assert!(messages[1].text().starts_with("The response was interrupted"));
}

#[tokio::test]
async fn reply_write_failure_ends_with_error_and_retries_as_stub() {
    let llm = MockLlm::new(vec![
        Ok(response(vec![tool_use("call-1", "create_bar_chart", bar_input())], "tool_use")),
        Ok(text_response("Here it is.")),
    ]);
    let store = Arc::new(FlakyStore { failing_replies: AtomicUsize::new(1), ..FlakyStore::default() });
    let state = flaky_state(&store, llm);
    let (result, events) = run(&state, request("chart Q1")).await;

    assert!(matches!(result, Err(ChatError::Thread(ThreadError::Database(_)))));
    assert_eq!(names(&events).last(), Some(&"error"));
    assert!(!names(&events).contains(&"finish"));

    let StreamEvent::Start { thread_id, .. } = events[0] else {
        panic!("expected start");
    };
    let messages = store.inner.load_messages(thread_id).await.expect("load");
    assert_eq!(messages.len(), 2);
    let stub = &messages[1];
    assert_eq!(stub.tool_parts().next().map(|p| p.state), Some(ToolState::OutputAvailable));
    assert!(stub.text().contains("The response was interrupted"));
}

#[tokio::test]
async fn unwritable_reply_still_ends_the_stream() {
    let store = Arc::new(FlakyStore { failing_replies: AtomicUsize::new(2), ..FlakyStore::default() });
    let state = flaky_state(&store, MockLlm::new(vec![Ok(text_response("hi"))]));
    let (result, events) = run(&state, request("hello")).await;

    assert!(result.is_err());
    assert_eq!(names(&events), vec!["start", "text-delta", "error"]);

    let StreamEvent::Start { thread_id, .. } = events[0] else {
        panic!("expected start");
    };
    let messages = store.inner.load_messages(thread_id).await.expect("load");
    assert_eq!(messages.len(), 1, "only the user message is stored");
}

/// Sleeps past the turn's tool deadline for charts titled "Slow".
fn slow_chart(kind: ChartKind, input: &Value) -> Result<Value, ChartError> {
    if input["title"] == "Slow" {
        std::thread::sleep(Duration::from_millis(600));
    }
    execute_chart(kind, input)
}

#[tokio::test]
async fn tool_timeout_fails_only_that_call_and_the_turn_continues() {
    let slow = json!({ "title": "Slow", "data": [{ "month": "Jan", "sales": 1 }] });
    let llm = MockLlm::new(vec![
        Ok(response(
            vec![tool_use("slow", "create_bar_chart", slow), tool_use("fast", "create_bar_chart", bar_input())],
            "tool_use",
        )),
        Ok(text_response("One chart timed out.")),
    ]);
    let config = AppConfig {
        chat: ChatConfig { tool_timeout: Duration::from_millis(100), ..ChatConfig::default() },
        ..AppConfig::default()
    };
    let mut state = AppState::new(Arc::new(MemoryThreadStore::new()), Some(llm.clone()), ToolRegistry::build(), config);
    state.chart_exec = slow_chart;

    let (result, events) = run(&state, request("two charts")).await;
    let outcome = result.expect("turn");
    assert_eq!(names(&events).last(), Some(&"finish"));

    let timed_out = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolOutputError { tool_call_id, error_kind, .. } => Some((tool_call_id.clone(), *error_kind)),
            _ => None,
        })
        .expect("tool error event");
    assert_eq!(timed_out, ("slow".to_owned(), ToolErrorKind::Timeout));
    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::ToolOutputAvailable { tool_call_id, .. } if tool_call_id == "fast"
    )));

    // The model was told and answered.
    let calls = llm.calls();
    let Content::Blocks(blocks) = &calls[1].last().expect("tool results").content else {
        panic!("expected blocks");
    };
    assert!(matches!(&blocks[0], ContentBlock::ToolResult { is_error: Some(true), .. }));

    let messages = state.store.load_messages(outcome.thread_id).await.expect("load");
    let parts: Vec<(&str, ToolState, Option<ToolErrorKind>)> = messages[1]
        .tool_parts()
        .map(|p| (p.tool_call_id.as_str(), p.state, p.error_kind))
        .collect();
    assert_eq!(
        parts,
        vec![
            ("slow", ToolState::OutputError, Some(ToolErrorKind::Timeout)),
            ("fast", ToolState::OutputAvailable, None),
        ]
    );
    assert_eq!(messages[1].text(), "One chart timed out.");

    let mut session = canvas::CanvasSession::default();
    assert_eq!(session.hydrate(&messages), 1);
}

#[tokio::test]
async fn disconnected_client_does_not_abort_the_turn() {
    let llm = MockLlm::new(vec![
        Ok(response(vec![tool_use("c1", "create_bar_chart", bar_input())], "tool_use")),
        Ok(text_response("done")),
    ]);
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let outcome = run_turn(&state, "u1", request("chart"), tx).await.expect("turn");
    let messages = state.store.load_messages(outcome.thread_id).await.expect("load");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].tool_parts().count(), 1);
    assert_eq!(llm.calls().len(), 2);
}

#[tokio::test]
async fn empty_message_is_rejected_before_any_write() {
    let state = test_helpers::test_app_state_with_llm(MockLlm::new(Vec::new()));
    let (result, events) = run(&state, request("   ")).await;
    assert!(matches!(result, Err(ChatError::EmptyMessage)));
    assert!(events.is_empty());
    assert!(state.store.list_threads("u1").await.expect("list").is_empty());
}

#[tokio::test]
async fn missing_llm_is_reported() {
    let state = test_helpers::test_app_state();
    let (result, _) = run(&state, request("hi")).await;
    let err = result.expect_err("no llm");
    assert!(matches!(err, ChatError::LlmNotConfigured));
    assert_eq!(err.error_code(), "E_LLM_NOT_CONFIGURED");
}

#[tokio::test]
async fn foreign_thread_is_not_found() {
    let state = test_helpers::test_app_state_with_llm(MockLlm::new(Vec::new()));
    let theirs = state.store.create_thread("u2", "private").await.expect("create");
    let req = ChatRequest { thread_id: Some(theirs.id), message: "peek".into() };
    let (result, _) = run(&state, req).await;
    let err = result.expect_err("foreign");
    assert_eq!(err.error_code(), "E_THREAD_NOT_FOUND");
    assert!(state.store.load_messages(theirs.id).await.expect("load").is_empty());
}

#[tokio::test]
async fn continuing_a_thread_sends_history() {
    let llm = MockLlm::new(vec![Ok(text_response("first")), Ok(text_response("second"))]);
    let state = test_helpers::test_app_state_with_llm(llm.clone());
    let (first, _) = run(&state, request("one")).await;
    let thread_id = first.expect("first").thread_id;

    let (second, _) = run(&state, ChatRequest { thread_id: Some(thread_id), message: "two".into() }).await;
    second.expect("second");

    let sent = &llm.calls()[1];
    let roles: Vec<&str> = sent.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user"]);
    assert_eq!(sent[2].content, Content::Text("<user_input>two</user_input>".into()));
}

// =========================================================================
// TurnRecorder
// =========================================================================

fn output_event(id: &str) -> StreamEvent {
    StreamEvent::ToolOutputAvailable { tool_call_id: id.into(), tool_name: "create_bar_chart".into(), output: json!({ "title": "T" }) }
}

fn start_event(id: &str) -> StreamEvent {
    StreamEvent::ToolInputStart { tool_call_id: id.into(), tool_name: "create_bar_chart".into() }
}

#[test]
fn recorder_merges_consecutive_text() {
    let mut rec = TurnRecorder::default();
    rec.record(&StreamEvent::TextDelta { delta: "Hel".into() });
    rec.record(&StreamEvent::TextDelta { delta: "lo".into() });
    rec.record(&start_event("a"));
    rec.record(&StreamEvent::TextDelta { delta: "after".into() });
    assert_eq!(rec.finish(), vec![Part::text("Hello"), Part::Tool(ToolPart::pending("a", "create_bar_chart")), Part::text("after")]);
}

#[test]
fn recorder_freezes_terminal_parts() {
    let mut rec = TurnRecorder::default();
    rec.record(&start_event("a"));
    rec.record(&output_event("a"));
    rec.record(&StreamEvent::ToolOutputError {
        tool_call_id: "a".into(),
        tool_name: "create_bar_chart".into(),
        error_text: "late".into(),
        error_kind: ToolErrorKind::Timeout,
    });
    rec.record(&output_event("a"));
    let parts = rec.tool_parts(&["a".into()]);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].state, ToolState::OutputAvailable);
    assert!(parts[0].error_kind.is_none());
}

#[test]
fn recorder_timeout_touches_only_that_call() {
    let mut rec = TurnRecorder::default();
    rec.record(&start_event("slow"));
    rec.record(&start_event("fast"));
    rec.record(&StreamEvent::ToolOutputError {
        tool_call_id: "slow".into(),
        tool_name: "create_bar_chart".into(),
        error_text: "tool call slow timed out after 30s".into(),
        error_kind: ToolErrorKind::Timeout,
    });
    rec.record(&output_event("fast"));
    let parts = rec.tool_parts(&["slow".into(), "fast".into()]);
    assert_eq!(parts[0].error_kind, Some(ToolErrorKind::Timeout));
    assert_eq!(parts[1].state, ToolState::OutputAvailable);
    assert!(parts[1].error_kind.is_none());
}

#[test]
fn abort_marks_unfinished_tools_and_explains() {
    let mut rec = TurnRecorder::default();
    rec.record(&start_event("done"));
    rec.record(&output_event("done"));
    rec.record(&start_event("running"));
    let parts = rec.abort("provider overloaded");

    let Part::Tool(done) = &parts[0] else { panic!("tool") };
    let Part::Tool(running) = &parts[1] else { panic!("tool") };
    assert_eq!(done.state, ToolState::OutputAvailable);
    assert_eq!(running.state, ToolState::OutputError);
    assert_eq!(running.error_kind, Some(ToolErrorKind::Aborted));
    assert_eq!(parts[2], Part::text("The response was interrupted: provider overloaded"));
}

#[test]
fn finish_and_abort_are_never_empty() {
    assert_eq!(TurnRecorder::default().finish(), vec![Part::text(FALLBACK_TEXT)]);
    assert_eq!(TurnRecorder::default().abort("x").len(), 1);
}

// =========================================================================
// history_messages / build_system_prompt
// =========================================================================

#[test]
fn history_is_limited_and_opens_with_user() {
    let history = vec![
        Message::new(Role::User, vec![Part::text("a")], 1),
        Message::new(Role::Assistant, vec![Part::text("b")], 2),
        Message::new(Role::User, vec![Part::text("c")], 3),
        Message::new(Role::Assistant, vec![Part::text("d")], 4),
        Message::new(Role::User, vec![Part::text("e")], 5),
    ];
    let sent = history_messages(&history, 4);
    let roles: Vec<&str> = sent.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user"]);
    assert_eq!(sent[0].content, Content::Text("<user_input>c</user_input>".into()));
}

#[test]
fn history_notes_created_charts() {
    let mut part = ToolPart::pending("c1", "create_bar_chart");
    part.state = ToolState::OutputAvailable;
    part.output = Some(json!({ "title": "Q1 Sales" }));
    let history = vec![
        Message::new(Role::User, vec![Part::text("chart")], 1),
        Message::new(Role::Assistant, vec![Part::Tool(part)], 2),
    ];
    let sent = history_messages(&history, 10);
    assert_eq!(sent[1].content, Content::Text("[create_bar_chart created: \"Q1 Sales\"]".into()));
}

#[test]
fn system_prompt_lists_every_chart_tool() {
    let registry = ToolRegistry::build();
    let prompt = build_system_prompt(&registry);
    for kind in wire::ChartKind::ALL {
        assert!(prompt.contains(kind.tool_name()), "missing {}", kind.tool_name());
    }
    assert!(prompt.contains("canvasName"));
    assert!(prompt.contains("<user_input>"));
}
