//! Tracing subscriber initialization with structured logging, an optional
//! daily log file and optional OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use yawe_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
//!
//! let options = TracingOptions {
//!     level: "INFO".to_string(),
//!     log_file: Some("logs/workflow_20260101.log".into()),
//!     enable_otel: false,
//! };
//! init_tracing(&options).unwrap();
//! // ... run ...
//! shutdown_tracing();
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::NaiveDate;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Level name from config or the command line (`DEBUG`, `INFO`, ...).
    pub level: String,
    /// Also write plain-text logs to this file (appending).
    pub log_file: Option<PathBuf>,
    pub enable_otel: bool,
}

/// Map a level name to an `EnvFilter` directive.
///
/// Accepts the usual spellings case-insensitively, including `WARNING` and
/// `CRITICAL`.
pub fn level_directive(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok("trace"),
        "DEBUG" => Ok("debug"),
        "INFO" => Ok("info"),
        "WARN" | "WARNING" => Ok("warn"),
        "ERROR" | "CRITICAL" => Ok("error"),
        other => Err(format!("unknown log level '{other}'")),
    }
}

/// `{log_dir}/{log_name}_{YYYYMMDD}.log`
pub fn log_file_path(log_dir: &Path, log_name: &str, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("{log_name}_{}.log", date.format("%Y%m%d")))
}

/// Initialize the global tracing subscriber.
///
/// - `RUST_LOG` wins when set; otherwise `options.level` is used.
/// - Always installs a console `fmt` layer.
/// - With `log_file`, adds a second `fmt` layer without ANSI colors that
///   appends to the file, creating its directory.
/// - With `enable_otel`, bridges spans to OpenTelemetry using the stdout
///   exporter.
///
/// # Errors
///
/// Returns an error for an unknown level name, an unwritable log file, or
/// when a global subscriber has already been set.
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level_directive(&options.level)?)?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    let file_layer = match &options.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let otel_layer = if options.enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("workflow-run");

        // Store the provider for shutdown and register it globally.
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
