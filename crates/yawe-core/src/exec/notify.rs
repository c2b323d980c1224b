use futures_util::future::BoxFuture;
use yawe_types::workflow::NotifyEvent;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(String),

    #[error("notification endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Outbound notification sink.
pub trait Notifier: Send + Sync {
    fn notify<'a>(
        &'a self,
        event: NotifyEvent,
        title: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;
}
