use std::io::IsTerminal as _;

use loadphase_core::{IngestStats, Report};

use crate::cli::OutputFormat;

mod html;
mod human;
mod json;

pub(crate) use html::render_html;

pub(crate) trait OutputFormatter {
    fn print_report(&self, report: &Report, ingest: &IngestStats) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat, no_color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => {
            let color = !no_color && std::io::stdout().is_terminal();
            Box::new(human::HumanReadableOutput::new(color))
        }
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
