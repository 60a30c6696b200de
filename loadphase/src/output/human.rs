use std::io::Write as _;

use loadphase_core::{IngestStats, Report};

mod format;
mod summary;

use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    color: bool,
}

impl HumanReadableOutput {
    pub(crate) fn new(color: bool) -> Self {
        Self { color }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_report(&self, report: &Report, ingest: &IngestStats) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(render(report, ingest, self.color).as_bytes())?;
        out.flush()?;

        let failing: Vec<&str> = report.failing_apis().collect();
        if !failing.is_empty() {
            eprintln!("sla failed: {}", failing.join(", "));
        }
        Ok(())
    }
}
