// src/logging.rs

use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Logger settings, built once at startup and handed to [`init`].
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub prefix: String,
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset.
    pub default_directive: String,
}

impl LogConfig {
    pub fn new(prefix: impl Into<String>, format: LogFormat) -> Self {
        Self {
            prefix: prefix.into(),
            format,
            default_directive: "info".to_string(),
        }
    }
}

/// Plain text events: `<prefix><message> key=value...`, no timestamp, no level.
pub struct PrefixedFormat {
    prefix: String,
}

impl PrefixedFormat {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl<S, N> FormatEvent<S, N> for PrefixedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}", self.prefix)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays free.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // try_init: a second call (tests, embedding) keeps the first subscriber.
    let _ = match config.format {
        LogFormat::Text => builder
            .event_format(PrefixedFormat::new(config.prefix.clone()))
            .try_init(),
        LogFormat::Json => builder.json().with_target(false).try_init(),
    };
}
