//! In-memory collaborators shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use yawe_types::config::TaskDefaults;
use yawe_types::error::{LockError, StoreError};
use yawe_types::state::{LockRecord, WorkflowState, WorkflowStatus};
use yawe_types::workflow::NotifyEvent;

use crate::exec::{
    CommandExecutor, CommandOutput, CommandRequest, ExecutorError, FileTransfer, ItemReport,
    Notifier, NotifyError, TemplateError, TemplateRenderer, TransferError, TransferReport,
    TransferRequest,
};
use crate::repository::lock::CrossProcessLock;
use crate::repository::state::StateStore;
use crate::task::TaskEnv;

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Returns scripted outputs in order, then repeats the fallback.
#[derive(Clone, Default)]
pub struct MockExecutor {
    script: Arc<Mutex<VecDeque<CommandOutput>>>,
    fallback: CommandOutput,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockExecutor {
    pub fn always(output: CommandOutput) -> Self {
        Self {
            fallback: output,
            ..Self::default()
        }
    }

    pub fn scripted(outputs: Vec<CommandOutput>) -> Self {
        Self {
            script: Arc::new(Mutex::new(outputs.into())),
            fallback: CommandOutput::exited(0, "", ""),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == command).count()
    }
}

impl CommandExecutor for MockExecutor {
    fn execute<'a>(
        &'a self,
        request: &'a CommandRequest,
    ) -> BoxFuture<'a, Result<CommandOutput, ExecutorError>> {
        async move {
            self.calls.lock().unwrap().push(request.command.clone());
            let next = self.script.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| self.fallback.clone()))
        }
        .boxed()
    }
}

/// Fails any command containing `FAIL`, succeeds otherwise, echoing the
/// command as stdout.
#[derive(Clone, Default)]
pub struct EchoExecutor {
    calls: Arc<Mutex<Vec<String>>>,
}

impl EchoExecutor {
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == command).count()
    }
}

impl CommandExecutor for EchoExecutor {
    fn execute<'a>(
        &'a self,
        request: &'a CommandRequest,
    ) -> BoxFuture<'a, Result<CommandOutput, ExecutorError>> {
        async move {
            self.calls.lock().unwrap().push(request.command.clone());
            if request.command.contains("FAIL") {
                Ok(CommandOutput::exited(1, "", "boom"))
            } else {
                Ok(CommandOutput::exited(0, request.command.clone(), ""))
            }
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockTransfer {
    pub requests: Arc<Mutex<Vec<TransferRequest>>>,
    pub fail: bool,
}

impl FileTransfer for MockTransfer {
    fn transfer<'a>(
        &'a self,
        request: &'a TransferRequest,
    ) -> BoxFuture<'a, Result<TransferReport, TransferError>> {
        async move {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(TransferError::Failed {
                    item: request.items[0].remote.clone(),
                    message: "connection reset".into(),
                });
            }
            let items = request
                .items
                .iter()
                .map(|item| ItemReport {
                    remote_path: item.remote.clone(),
                    local_path: item.local.clone(),
                    method: item.method,
                    compressed: item.pre_compress,
                    archive_name: item.pre_compress.then(|| "data_transfer_20260101_000000.tar.gz".to_string()),
                    archive_path: None,
                    elapsed_secs: 0.5,
                })
                .collect();
            Ok(TransferReport {
                items,
                total_time_secs: 1.0,
            })
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Substitutes `{{ dotted.path }}` expressions; anything undefined is an error.
pub struct DottedRenderer;

impl TemplateRenderer for DottedRenderer {
    fn render(&self, template: &str, bindings: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let end = rest[start..]
                .find("}}")
                .ok_or_else(|| TemplateError::Syntax("unclosed expression".into()))?;
            let expr = rest[start + 2..start + end].trim();
            let mut value = bindings;
            for part in expr.split('.') {
                value = value
                    .get(part)
                    .ok_or_else(|| TemplateError::Render(format!("undefined value '{expr}'")))?;
            }
            match value {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
            rest = &rest[start + end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(NotifyEvent, String, String)>>>,
    pub fail: bool,
}

impl Notifier for RecordingNotifier {
    fn notify<'a>(
        &'a self,
        event: NotifyEvent,
        title: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        async move {
            if self.fail {
                return Err(NotifyError::Request("endpoint down".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((event, title.to_string(), message.to_string()));
            Ok(())
        }
        .boxed()
    }
}

pub fn test_env(executor: impl CommandExecutor + 'static) -> TaskEnv {
    TaskEnv {
        executor: Arc::new(executor),
        transfer: Arc::new(MockTransfer::default()),
        renderer: Arc::new(DottedRenderer),
        notifier: None,
        defaults: TaskDefaults::default(),
    }
}

// ---------------------------------------------------------------------------
// State store and lock
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryStore {
    states: Arc<Mutex<HashMap<String, WorkflowState>>>,
    pub saves: Arc<Mutex<Vec<WorkflowState>>>,
}

impl MemoryStore {
    pub fn get(&self, identity: &str) -> Option<WorkflowState> {
        self.states.lock().unwrap().get(identity).cloned()
    }

    pub fn put(&self, state: WorkflowState) {
        self.states.lock().unwrap().insert(state.identity.clone(), state);
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }
}

impl StateStore for MemoryStore {
    async fn load(&self, identity: &str) -> Result<Option<WorkflowState>, StoreError> {
        Ok(self.get(identity))
    }

    async fn save(&self, state: &WorkflowState) -> Result<(), StoreError> {
        self.saves.lock().unwrap().push(state.clone());
        self.put(state.clone());
        Ok(())
    }

    async fn reset(&self, identity: &str) -> Result<bool, StoreError> {
        Ok(self.states.lock().unwrap().remove(identity).is_some())
    }

    async fn list(&self) -> Result<Vec<WorkflowState>, StoreError> {
        Ok(self.states.lock().unwrap().values().cloned().collect())
    }

    async fn prune(&self, older_than: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut states = self.states.lock().unwrap();
        let before = states.len();
        states.retain(|_, s| !(s.status == WorkflowStatus::Success && s.updated_at < older_than));
        Ok(before - states.len())
    }
}

/// Lock records in memory; pids listed in `dead` are reported stale.
#[derive(Clone, Default)]
pub struct MemoryLock {
    records: Arc<Mutex<HashMap<String, LockRecord>>>,
    pub dead: Arc<Mutex<Vec<u32>>>,
}

impl MemoryLock {
    pub fn plant(&self, record: LockRecord) {
        self.records.lock().unwrap().insert(record.identity.clone(), record);
    }

    pub fn holder(&self, identity: &str) -> Option<LockRecord> {
        self.records.lock().unwrap().get(identity).cloned()
    }
}

impl CrossProcessLock for MemoryLock {
    fn try_acquire(&self, identity: &str) -> Result<LockRecord, LockError> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(identity) {
            return Err(LockError::Contention {
                identity: identity.to_string(),
                pid: existing.pid,
                since: existing.acquired_at,
            });
        }
        let record = LockRecord::for_current_process(identity);
        records.insert(identity.to_string(), record.clone());
        Ok(record)
    }

    fn read(&self, identity: &str) -> Result<Option<LockRecord>, LockError> {
        Ok(self.holder(identity))
    }

    fn release(&self, record: &LockRecord) -> Result<(), LockError> {
        let mut records = self.records.lock().unwrap();
        if records.get(&record.identity) == Some(record) {
            records.remove(&record.identity);
        }
        Ok(())
    }

    fn is_stale(&self, record: &LockRecord) -> bool {
        self.dead.lock().unwrap().contains(&record.pid)
    }

    fn break_stale(&self, record: &LockRecord) -> Result<bool, LockError> {
        let mut records = self.records.lock().unwrap();
        if records.get(&record.identity) == Some(record) {
            records.remove(&record.identity);
            return Ok(true);
        }
        Ok(false)
    }
}
