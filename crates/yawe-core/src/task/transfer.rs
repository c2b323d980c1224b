//! Transfer task: move a set of files between the local machine and a host.
//!
//! The whole item set is a single attempt; a retry re-runs every item.

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};
use yawe_types::config::TaskDefaults;
use yawe_types::error::SpecError;
use yawe_types::workflow::{TaskSpec, TransferTaskConfig};

use super::{RawResult, Task, TaskEnv, TaskFailure, merge_params};
use crate::exec::{TransferItem, TransferRequest};

pub struct TransferTask {
    spec: TaskSpec,
    config: TransferTaskConfig,
    host: String,
    timeout: Duration,
    default_decompress: bool,
    /// Items after path rendering; set by `prepare`.
    items: Vec<TransferItem>,
}

impl TransferTask {
    pub const TYPE_TAG: &'static str = "transfer";

    pub fn new(spec: &TaskSpec, defaults: &TaskDefaults) -> Result<Self, SpecError> {
        let config: TransferTaskConfig = spec.decode_options().map_err(|message| {
            SpecError::InvalidTask {
                task: spec.name.clone(),
                message,
            }
        })?;
        let host = spec
            .host
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| SpecError::InvalidTask {
                task: spec.name.clone(),
                message: "'host' is required for transfer tasks".to_string(),
            })?;

        Ok(Self {
            spec: spec.clone(),
            host,
            timeout: Duration::from_secs(spec.timeout_secs.unwrap_or(defaults.transfer.timeout)),
            default_decompress: config.decompress.unwrap_or(defaults.transfer.decompress),
            config,
            items: Vec::new(),
        })
    }

    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }
}

impl Task for TransferTask {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    fn prepare(&mut self, env: &TaskEnv, bindings: &Value) -> Result<(), TaskFailure> {
        let bindings = merge_params(bindings, &self.spec.params);
        let render = |label: &str, path: &str| -> Result<String, TaskFailure> {
            if !path.contains("{{") && !path.contains("{%") {
                return Ok(path.to_string());
            }
            env.renderer
                .render(path, &bindings)
                .map(|p| p.trim().to_string())
                .map_err(|e| TaskFailure::configuration(format!("{label} path: {e}")))
        };

        let mut items = Vec::with_capacity(self.config.items.len());
        for (index, item) in self.config.items.iter().enumerate() {
            let remote = render("remote", &item.remote)?;
            let local = render("local", &item.local)?;
            if remote.is_empty() || local.is_empty() {
                tracing::warn!(
                    task = %self.spec.name,
                    item = index,
                    "transfer item has an empty path, skipping"
                );
                continue;
            }
            let pre_compress = item.pre_compress.unwrap_or(self.config.pre_compress);
            items.push(TransferItem {
                remote,
                local,
                recursive: item.recursive,
                exclude: item.exclude.clone(),
                method: item.method.unwrap_or(self.config.transfer_method),
                pre_compress,
                decompress: pre_compress && item.decompress.unwrap_or(self.default_decompress),
            });
        }
        if items.is_empty() {
            return Err(TaskFailure::configuration("no transfer items configured"));
        }
        self.items = items;
        Ok(())
    }

    fn execute<'a>(&'a self, env: &'a TaskEnv) -> BoxFuture<'a, Result<RawResult, TaskFailure>> {
        async move {
            if self.items.is_empty() {
                return Err(TaskFailure::configuration("transfer was not prepared"));
            }
            let request = TransferRequest {
                host: self.host.clone(),
                direction: self.config.direction,
                items: self.items.clone(),
                timeout: self.timeout,
            };
            tracing::info!(
                task = %self.spec.name,
                host = %self.host,
                direction = %self.config.direction,
                items = self.items.len(),
                "starting transfer"
            );
            let report = env
                .transfer
                .transfer(&request)
                .await
                .map_err(|e| TaskFailure::transfer(e.to_string()))?;
            Ok(RawResult::Transfer(report))
        }
        .boxed()
    }

    fn validate<'a>(
        &'a self,
        _env: &'a TaskEnv,
        raw: &'a RawResult,
    ) -> BoxFuture<'a, Result<String, TaskFailure>> {
        async move {
            let RawResult::Transfer(report) = raw else {
                return Err(TaskFailure::transfer("unexpected result kind for transfer task"));
            };
            if report.items.len() != self.items.len() {
                return Err(TaskFailure::transfer(format!(
                    "transferred {} of {} items",
                    report.items.len(),
                    self.items.len()
                )));
            }
            Ok(format!(
                "transferred {} item(s) in {:.1}s",
                report.items.len(),
                report.total_time_secs
            ))
        }
        .boxed()
    }

    fn export_context(&self, _env: &TaskEnv, raw: &RawResult) -> Result<Map<String, Value>, TaskFailure> {
        let RawResult::Transfer(report) = raw else {
            return Ok(Map::new());
        };
        let compress = self.items.iter().any(|i| i.pre_compress);
        let decompress = self.items.iter().any(|i| i.decompress);

        let mut exported = Map::new();
        exported.insert("direction".into(), json!(self.config.direction));
        exported.insert("host".into(), json!(self.host));
        exported.insert("compress".into(), json!(compress));
        exported.insert("decompress".into(), json!(decompress));
        exported.insert("total_time".into(), json!(report.total_time_secs));
        exported.insert("items_count".into(), json!(report.items.len()));
        if let Some(first) = report.items.first() {
            exported.insert("remote_path".into(), json!(first.remote_path));
            exported.insert("local_path".into(), json!(first.local_path));
            if first.compressed {
                exported.insert("archive_name".into(), json!(first.archive_name));
                if let Some(path) = &first.archive_path {
                    exported.insert("archive_path".into(), json!(path));
                }
            }
        }
        exported.insert("items".into(), json!(report.items));
        Ok(exported)
    }
}
