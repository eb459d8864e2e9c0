use std::{fs::File, sync::Arc};

use tracing::{error, info_span};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter, MakeWriter},
    prelude::*,
    EnvFilter,
};

#[derive(Default)]
pub struct TelemetryConfig {
    enabled: bool,
    filter: Option<String>,
    console_writer: Option<BoxMakeWriter>,
    file_writer: Option<BoxMakeWriter>,
}

impl TelemetryConfig {
    /// Enable crash reporting. Only has an effect when built with the `sentry` feature.
    pub fn enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }

    /// Filter directives used when `RUST_LOG` is not set.
    pub fn with_default_filter<S: Into<String>>(self, filter: S) -> Self {
        Self {
            filter: Some(filter.into()),
            ..self
        }
    }

    pub fn with_console_writer<W>(self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            console_writer: Some(BoxMakeWriter::new(writer)),
            ..self
        }
    }

    pub fn with_file_writer(self, file: File) -> Self {
        Self {
            file_writer: Some(BoxMakeWriter::new(Arc::new(file))),
            ..self
        }
    }
}

pub struct TelemetryGuard {
    #[cfg(feature = "sentry")]
    _client: Option<sentry::ClientInitGuard>,
}

/// Installs the global tracing subscriber. Calling this more than once keeps the first
/// subscriber and returns a guard that does nothing.
pub fn install(config: TelemetryConfig) -> TelemetryGuard {
    let TelemetryConfig {
        enabled,
        filter,
        console_writer,
        file_writer,
    } = config;

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.as_deref().unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(filter_layer)
        .with(file_writer.map(|file_writer| {
            fmt::layer()
                .pretty()
                .with_ansi(false)
                .with_writer(file_writer)
        }))
        .with(console_writer.map(|writer| {
            fmt::layer()
                .compact()
                .with_ansi(true)
                .without_time()
                .with_writer(writer)
        }));

    #[cfg(feature = "sentry")]
    let registry = registry.with(enabled.then(sentry::integrations::tracing::layer));

    let _ = registry.try_init();

    #[cfg(not(feature = "sentry"))]
    let _ = enabled;

    #[cfg(feature = "sentry")]
    let _client = enabled.then(|| {
        let dsn = option_env!("SENTRY_DSN").and_then(|dsn| dsn.parse().ok());
        if dsn.is_none() {
            eprintln!("No Sentry DSN provided, but crash reporting was enabled");
        }

        sentry::init(sentry::ClientOptions {
            release: Some(env!("CARGO_PKG_VERSION").into()),
            debug: cfg!(debug_assertions),
            dsn,
            ..Default::default()
        })
    });

    TelemetryGuard {
        #[cfg(feature = "sentry")]
        _client,
    }
}

pub fn install_error_handler() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .install();
}

/// Runs `f` inside a root span, logging the error it returns, if any.
pub fn with_root_span<T, F>(command: &str, operation: &str, f: F) -> color_eyre::Result<T>
where
    F: FnOnce() -> color_eyre::Result<T>,
{
    let span = info_span!("root", command, operation);
    let result = span.in_scope(f);

    if let Err(error) = &result {
        span.in_scope(|| error!(?error, "{operation} failed"));
    }

    result
}
