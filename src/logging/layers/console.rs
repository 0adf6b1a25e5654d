use crate::logging::context::ExecutionContext;
use serde::Deserialize;
use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// Compact, timestamp-free lines; the log file keeps the full record.
pub type ConsoleFmtLayer<S> = tracing_fmt::Layer<
    S,
    format::DefaultFields,
    format::Format<format::Compact, ()>,
    BoxMakeWriter,
>;

/// Where console logs go. Stdout is left to command output unless asked for.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

/// `watch` stays quiet unless `--verbose`; otherwise the configured sink wins.
pub fn select_console_output(
    context: ExecutionContext,
    verbose: bool,
    configured: Option<ConsoleOutput>,
) -> ConsoleOutput {
    if context.disables_console(verbose) {
        return ConsoleOutput::None;
    }
    configured.unwrap_or_default()
}

pub fn console_layer<S>(output: ConsoleOutput) -> ConsoleFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let writer = match output {
        ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
        ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
        ConsoleOutput::None => BoxMakeWriter::new(io::sink),
    };
    layer_with_writer(writer)
}

fn layer_with_writer<S>(writer: BoxMakeWriter) -> ConsoleFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_fmt::layer()
        .compact()
        .without_time()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
}
