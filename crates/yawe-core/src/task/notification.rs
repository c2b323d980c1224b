//! Notification task: send a message through the configured notifier.
//!
//! Params: `notification_type` (`success` | `failure` | `warning`, default
//! `success`), `title`, `message`. Title and message are templates.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use yawe_types::config::TaskDefaults;
use yawe_types::error::SpecError;
use yawe_types::workflow::{NotifyEvent, TaskSpec};

use super::{RawResult, Task, TaskEnv, TaskFailure, merge_params};

pub struct NotificationTask {
    spec: TaskSpec,
    /// (event, title, message) after rendering; set by `prepare`.
    rendered: Option<(NotifyEvent, String, String)>,
}

impl NotificationTask {
    pub const TYPE_TAG: &'static str = "notification";

    pub fn new(spec: &TaskSpec, _defaults: &TaskDefaults) -> Result<Self, SpecError> {
        Ok(Self {
            spec: spec.clone(),
            rendered: None,
        })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.spec.params.get(key).and_then(Value::as_str)
    }
}

impl Task for NotificationTask {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    fn prepare(&mut self, env: &TaskEnv, bindings: &Value) -> Result<(), TaskFailure> {
        let event: NotifyEvent = self
            .param("notification_type")
            .unwrap_or("success")
            .parse()
            .map_err(TaskFailure::configuration)?;

        let bindings = merge_params(bindings, &self.spec.params);
        let render = |template: &str| {
            env.renderer
                .render(template, &bindings)
                .map_err(|e| TaskFailure::configuration(e.to_string()))
        };
        let default_title = format!("{}: {}", self.spec.name, event);
        let title = render(self.param("title").unwrap_or(&default_title))?;
        let message = render(self.param("message").unwrap_or(""))?;
        self.rendered = Some((event, title, message));
        Ok(())
    }

    fn execute<'a>(&'a self, env: &'a TaskEnv) -> BoxFuture<'a, Result<RawResult, TaskFailure>> {
        async move {
            let notifier = env
                .notifier
                .as_ref()
                .ok_or_else(|| TaskFailure::configuration("no notifier configured"))?;
            let (event, title, message) = self
                .rendered
                .as_ref()
                .ok_or_else(|| TaskFailure::configuration("notification was not prepared"))?;
            notifier
                .notify(*event, title, message)
                .await
                .map_err(|e| TaskFailure::execution(e.to_string()))?;
            Ok(RawResult::Message(format!("notification sent ({event})")))
        }
        .boxed()
    }

    fn validate<'a>(
        &'a self,
        _env: &'a TaskEnv,
        raw: &'a RawResult,
    ) -> BoxFuture<'a, Result<String, TaskFailure>> {
        async move {
            match raw {
                RawResult::Message(message) => Ok(message.clone()),
                _ => Err(TaskFailure::execution("unexpected result kind for notification task")),
            }
        }
        .boxed()
    }
}
