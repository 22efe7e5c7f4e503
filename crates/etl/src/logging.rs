//! Console logging plus the append-only progress log.
//!
//! Progress messages are ordinary `tracing` events with target
//! [`PROGRESS_TARGET`]. The progress layer writes only those, one per line, as
//! `<timestamp> : <message>`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::Result;

pub const PROGRESS_TARGET: &str = "progress";

/// e.g. `2023-Sep-08 : 09:16:35`
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d : %H:%M:%S";

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Event formatter for the progress log: local timestamp, separator, message.
pub struct ProgressFormat;

impl<S, N> FormatEvent<S, N> for ProgressFormat
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
        write!(writer, "{} : ", format_timestamp(Local::now().naive_local()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Layer that appends progress events to `file`.
pub fn progress_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(ProgressFormat)
        .with_writer(Mutex::new(file))
        .with_filter(filter::filter_fn(|meta| meta.target() == PROGRESS_TARGET))
}

pub fn open_progress_log(path: &Path) -> Result<File> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}

/// Installs the global subscriber: console output filtered by `RUST_LOG`
/// (or the verbosity default) and the progress log at `log_path`.
pub fn init(log_path: &Path, verbose: bool) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "bank_etl={level},etl={level},storage={level},{progress}={level}",
            level = log_level,
            progress = PROGRESS_TARGET
        )
        .into()
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(console_filter))
        .with(progress_layer(open_progress_log(log_path)?))
        .init();

    Ok(())
}
