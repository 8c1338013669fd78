//! Session-level tests against a scripted in-memory processing service.
//!
//! Run with:
//!   cargo test --test wizard

use async_trait::async_trait;
use effilayouter::engine::START_LINE;
use effilayouter::gating;
use effilayouter::{
    ActionId, ExecutionEvent, ExecutionObserver, ExecutionOutcome, ExecutionStatus, FileHandle,
    FileInfo, Language, Operation, OperationError, ProcessingService, ServiceResponse, StepId,
    Wizard, WizardConfig, WizardError,
};
use futures::StreamExt;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Answers every operation with `ok: true` unless told to fail it.
#[derive(Default)]
struct ScriptedService {
    calls: Mutex<Vec<Operation>>,
    failures: Mutex<HashMap<ActionId, String>>,
    gate: Option<Arc<Notify>>,
    crash: bool,
}

impl ScriptedService {
    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn crashing() -> Self {
        Self {
            crash: true,
            ..Self::default()
        }
    }

    fn fail(&self, action: ActionId, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(action, message.to_string());
    }

    fn heal(&self, action: ActionId) {
        self.failures.lock().unwrap().remove(&action);
    }

    fn actions(&self) -> Vec<ActionId> {
        self.calls.lock().unwrap().iter().map(Operation::action).collect()
    }

    fn last_call(&self) -> Option<Operation> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProcessingService for ScriptedService {
    async fn invoke(&self, operation: &Operation) -> Result<ServiceResponse, OperationError> {
        self.calls.lock().unwrap().push(operation.clone());
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        if self.crash {
            panic!("service crashed");
        }
        let action = operation.action();
        if let Some(message) = self.failures.lock().unwrap().get(&action) {
            return Ok(ServiceResponse::failure(message.clone()));
        }
        Ok(ServiceResponse::success(format!("{action} ok"))
            .with("output", json!({ "filename": format!("{action}.out") })))
    }

    async fn health(&self) -> Result<ServiceResponse, OperationError> {
        Ok(ServiceResponse::success("healthy"))
    }

    async fn list_files(&self) -> Result<Vec<FileInfo>, OperationError> {
        Ok(Vec::new())
    }

    fn download_url(&self, file: &str) -> String {
        format!("http://service.test/api/download?file={file}")
    }
}

struct Session {
    wizard: Wizard,
    service: Arc<ScriptedService>,
    _dir: TempDir,
}

fn sample_pdf(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("contract.pdf");
    std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();
    path
}

fn session_with(language: Language, service: ScriptedService) -> Session {
    let dir = tempfile::tempdir().unwrap();
    let config = WizardConfig::builder()
        .initial_language(language)
        .build()
        .unwrap();
    let service = Arc::new(service);
    let wizard = Wizard::with_service(config, service.clone());
    wizard
        .set_input(1, "file", FileHandle::open(sample_pdf(&dir)).unwrap())
        .unwrap();
    Session {
        wizard,
        service,
        _dir: dir,
    }
}

fn session(language: Language) -> Session {
    session_with(language, ScriptedService::default())
}

async fn run_ok(wizard: &Wizard, steps: &[StepId]) {
    for &step in steps {
        let outcome = wizard.execute(step).await.unwrap();
        assert!(outcome.is_success(), "step {step} failed: {outcome:?}");
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl ExecutionObserver for Recorder {
    fn on_execution_start(&self, step: StepId, first_line: &str) {
        self.seen.lock().unwrap().push(format!("start {step}: {first_line}"));
    }
    fn on_log(&self, step: StepId, line: &str) {
        self.seen.lock().unwrap().push(format!("log {step}: {line}"));
    }
    fn on_execution_success(&self, step: StepId, message: &str) {
        self.seen.lock().unwrap().push(format!("ok {step}: {message}"));
    }
    fn on_execution_error(&self, step: StepId, error: &str) {
        self.seen.lock().unwrap().push(format!("err {step}: {error}"));
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn english_pipeline_reaches_comparison() {
    let s = session(Language::English);
    assert!(gating::visible_steps(Language::English)
        .iter()
        .all(|d| d.id != 5));

    run_ok(&s.wizard, &[1, 2, 3, 4, 6, 7]).await;
    assert!(gating::can_enter(8, &s.wizard.snapshot()));

    run_ok(&s.wizard, &[8]).await;
    assert_eq!(
        s.service.actions(),
        vec![
            ActionId::Upload,
            ActionId::RemoveText,
            ActionId::ExtractCharacters,
            ActionId::ReconstructEnglish,
            ActionId::VisualizeLines,
        ]
    );
    assert!(s.wizard.progress().is_complete());
}

#[tokio::test]
async fn translation_refused_before_extraction() {
    let s = session(Language::Arabic);
    run_ok(&s.wizard, &[1, 2, 3]).await;

    let before = s.wizard.snapshot();
    let err = s.wizard.execute(5).await.unwrap_err();
    assert_eq!(err, WizardError::NotEnterable { step: 5 });
    assert!(err.is_precondition());
    assert_eq!(s.wizard.snapshot(), before);

    run_ok(&s.wizard, &[4, 5]).await;
    assert_eq!(
        s.service.actions(),
        vec![
            ActionId::Upload,
            ActionId::RemoveText,
            ActionId::ExtractLines,
            ActionId::TranslateArabic,
        ]
    );
}

#[tokio::test]
async fn failed_step_records_error_and_recovers() {
    let s = session(Language::English);
    run_ok(&s.wizard, &[1, 2]).await;
    s.service.fail(ActionId::RemoveText, "disk full");

    let outcome = s.wizard.execute(3).await.unwrap();
    assert_eq!(
        outcome,
        ExecutionOutcome::Failed {
            step: 3,
            error: OperationError::rejected("disk full"),
        }
    );

    let state = s.wizard.snapshot();
    let record = state.execution(3).unwrap();
    assert_eq!(record.status, ExecutionStatus::Error);
    assert_eq!(record.error.as_deref(), Some("disk full"));
    assert_eq!(record.logs.last().map(String::as_str), Some("Error: disk full"));
    assert!(!gating::can_enter(4, &state));

    s.service.heal(ActionId::RemoveText);
    run_ok(&s.wizard, &[3]).await;

    let state = s.wizard.snapshot();
    let record = state.execution(3).unwrap();
    assert_eq!(
        record.logs,
        vec![START_LINE, "Removing text from PDF...", "removeText ok"]
    );
    assert_eq!(record.error, None);
    assert!(gating::can_enter(4, &state));
}

#[tokio::test]
async fn rerunning_successful_step_starts_fresh_log() {
    let s = session(Language::English);
    run_ok(&s.wizard, &[1, 2, 3]).await;
    run_ok(&s.wizard, &[3]).await;

    let state = s.wizard.snapshot();
    let record = state.execution(3).unwrap();
    assert_eq!(record.status, ExecutionStatus::Success);
    assert_eq!(
        record.logs,
        vec![START_LINE, "Removing text from PDF...", "removeText ok"]
    );
    assert_eq!(record.error, None);
    assert_eq!(
        s.service.actions(),
        vec![ActionId::Upload, ActionId::RemoveText, ActionId::RemoveText]
    );
}

#[tokio::test]
async fn language_switch_keeps_records_and_regates() {
    let s = session(Language::English);
    run_ok(&s.wizard, &[1, 2, 3, 4]).await;

    s.wizard.select_language(Language::Arabic);
    let state = s.wizard.snapshot();
    assert_eq!(state.status(4), ExecutionStatus::Success);
    assert!(gating::can_enter(5, &state));
    assert!(!gating::can_enter(6, &state));

    s.wizard.select_language(Language::English);
    assert!(gating::can_enter(6, &s.wizard.snapshot()));
}

// ── Preconditions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_is_refused_without_dispatch() {
    let config = WizardConfig::default();
    let service = Arc::new(ScriptedService::default());
    let wizard = Wizard::with_service(config, service.clone());

    let before = wizard.snapshot();
    let err = wizard.execute(1).await.unwrap_err();
    assert_eq!(
        err,
        WizardError::IncompleteInputs {
            step: 1,
            missing: vec!["file"],
        }
    );
    assert_eq!(wizard.snapshot(), before);
    assert!(service.actions().is_empty());
}

#[tokio::test]
async fn unknown_step_is_a_programming_error() {
    let s = session(Language::English);
    let err = s.wizard.execute(99).await.unwrap_err();
    assert!(err.is_programming_error());
    assert!(!err.is_precondition());
}

#[tokio::test]
async fn second_execution_is_refused_while_running() {
    let gate = Arc::new(Notify::new());
    let s = session_with(Language::English, ScriptedService::gated(gate.clone()));

    let wizard = s.wizard.clone();
    let handle = tokio::spawn(async move { wizard.execute(1).await });

    while s.wizard.snapshot().status(1) != ExecutionStatus::Running {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        s.wizard.execute(1).await,
        Err(WizardError::AlreadyRunning { running: 1 })
    );
    assert_eq!(
        s.wizard.reset_execution(1),
        Err(WizardError::AlreadyRunning { running: 1 })
    );

    gate.notify_one();
    let outcome = tokio_test::assert_ok!(handle.await.unwrap());
    assert!(outcome.is_success());
    assert_eq!(s.service.actions(), vec![ActionId::Upload]);
}

#[tokio::test]
async fn abandoned_execution_still_finishes() {
    let gate = Arc::new(Notify::new());
    let s = session_with(Language::English, ScriptedService::gated(gate.clone()));

    let abandoned = tokio::time::timeout(Duration::from_millis(50), s.wizard.execute(1)).await;
    assert!(abandoned.is_err());
    assert_eq!(s.wizard.snapshot().status(1), ExecutionStatus::Running);

    gate.notify_one();
    while s.wizard.snapshot().status(1) == ExecutionStatus::Running {
        tokio::task::yield_now().await;
    }
    let state = s.wizard.snapshot();
    assert_eq!(state.status(1), ExecutionStatus::Success);
    assert_eq!(
        state.execution(1).unwrap().logs.last().map(String::as_str),
        Some("upload ok")
    );

    run_ok(&s.wizard, &[2]).await;
    tokio_test::assert_ok!(s.wizard.reset_execution(1));
    assert_eq!(s.wizard.snapshot().status(1), ExecutionStatus::Idle);
}

#[tokio::test]
async fn crashed_attempt_is_closed_as_failed() {
    let s = session_with(Language::English, ScriptedService::crashing());

    let err = s.wizard.execute(1).await.unwrap_err();
    assert!(matches!(err, WizardError::Internal(_)), "{err:?}");

    let state = s.wizard.snapshot();
    let record = state.execution(1).unwrap();
    assert_eq!(record.status, ExecutionStatus::Error);
    assert!(record.logs.last().unwrap().starts_with("Error: Step execution aborted"));
    assert_eq!(state.running_step(), None);
}

// ── Navigation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn local_language_step_must_run_before_moving_on() {
    let s = session(Language::English);
    run_ok(&s.wizard, &[1]).await;
    assert_eq!(s.wizard.next(), Ok(2));
    assert_eq!(s.wizard.next(), Err(WizardError::CannotAdvance { step: 2 }));

    let outcome = s.wizard.execute_current().await.unwrap();
    assert_eq!(
        outcome,
        ExecutionOutcome::Succeeded {
            step: 2,
            message: "Selected english pipeline".into(),
        }
    );
    assert_eq!(s.wizard.next(), Ok(3));
    assert_eq!(s.wizard.back(), 2);
}

#[tokio::test]
async fn hidden_current_step_falls_back() {
    let s = session(Language::Arabic);
    run_ok(&s.wizard, &[1, 2, 3, 4]).await;
    assert_eq!(s.wizard.navigate_to(5), Ok(5));

    s.wizard.select_language(Language::English);
    assert_eq!(s.wizard.current_step(), 4);
    assert_eq!(s.wizard.navigate_to(5), Err(WizardError::NotEnterable { step: 5 }));
}

#[tokio::test]
async fn last_step_next_is_a_no_op() {
    let s = session(Language::English);
    run_ok(&s.wizard, &[1, 2, 3, 4, 6, 7]).await;
    assert_eq!(s.wizard.navigate_to(8), Ok(8));
    assert_eq!(s.wizard.next(), Ok(8));
}

// ── Parameters & results ─────────────────────────────────────────────────────

#[tokio::test]
async fn save_as_flows_into_downstream_steps() {
    let s = session(Language::Arabic);
    s.wizard.set_input(1, "save_as", "brochure").unwrap();
    s.wizard.set_input(4, "line_db_output", "brochure_lines.json").unwrap();
    run_ok(&s.wizard, &[1, 2, 3, 4]).await;

    match s.service.last_call() {
        Some(Operation::ExtractLines(req)) => {
            assert_eq!(req.input_pdf, "brochure.pdf");
            assert_eq!(req.line_db_output, "brochure_lines.json");
        }
        other => panic!("unexpected call {other:?}"),
    }

    run_ok(&s.wizard, &[5]).await;
    match s.service.last_call() {
        Some(Operation::TranslateArabic(req)) => {
            assert_eq!(req.line_db_input, "brochure_lines.json")
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn success_stores_full_response() {
    let s = session(Language::English);
    run_ok(&s.wizard, &[1]).await;
    let state = s.wizard.snapshot();
    let result = state.execution(1).unwrap().result.clone().unwrap();
    assert_eq!(result["ok"], true);
    assert_eq!(result["output"]["filename"], "upload.out");
}

#[tokio::test]
async fn comparison_result_names_both_documents() {
    let s = session(Language::Arabic);
    run_ok(&s.wizard, &[1, 2, 3, 4, 5, 6, 7, 8]).await;
    let state = s.wizard.snapshot();
    let record = state.execution(8).unwrap();
    assert_eq!(
        record.logs,
        vec![
            START_LINE,
            "Preparing side-by-side comparison...",
            "Comparison ready"
        ]
    );
    let viewer = &record.result.as_ref().unwrap()["viewer"];
    assert_eq!(viewer["left"], "input.pdf");
    assert_eq!(viewer["right"], "arabic_reconstructed_input.pdf");
}

// ── Observation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn observer_and_stream_see_the_same_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let config = WizardConfig::builder()
        .observer(recorder.clone())
        .build()
        .unwrap();
    let wizard = Wizard::with_service(config, Arc::new(ScriptedService::default()));
    wizard
        .set_input(1, "file", FileHandle::open(sample_pdf(&dir)).unwrap())
        .unwrap();

    let events = wizard.events();
    run_ok(&wizard, &[1]).await;

    let events: Vec<_> = events.take(4).collect().await;
    assert_eq!(
        events,
        vec![
            ExecutionEvent::Started {
                step: 1,
                first_line: START_LINE.into()
            },
            ExecutionEvent::Log {
                step: 1,
                line: "Uploading PDF file...".into()
            },
            ExecutionEvent::Log {
                step: 1,
                line: "upload ok".into()
            },
            ExecutionEvent::Succeeded {
                step: 1,
                message: "upload ok".into()
            },
        ]
    );
    assert_eq!(
        *recorder.seen.lock().unwrap(),
        vec![
            format!("start 1: {START_LINE}"),
            "log 1: Uploading PDF file...".to_string(),
            "log 1: upload ok".to_string(),
            "ok 1: upload ok".to_string(),
        ]
    );
}

#[tokio::test]
async fn unreachable_service_is_an_operational_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = WizardConfig::builder()
        .api_base("http://127.0.0.1:9")
        .request_timeout_secs(5)
        .build()
        .unwrap();
    let wizard = Wizard::new(config).unwrap();
    wizard
        .set_input(1, "file", FileHandle::open(sample_pdf(&dir)).unwrap())
        .unwrap();

    match wizard.execute(1).await.unwrap() {
        ExecutionOutcome::Failed { error, .. } => {
            assert!(matches!(error, OperationError::Transport { .. }))
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(wizard.snapshot().status(1), ExecutionStatus::Error);
}
