use anyhow::Context as _;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use loadphase_core::{RunInfo, RunMetrics, Sla, TestPlan, TimelineBuilder, build_report, ingest};

use crate::cli::ReportArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::{InvalidInputExt as _, RunError, RuntimeErrorExt as _};

fn open_results(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open results file: {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn load_plan(args: &ReportArgs) -> Result<TestPlan, RunError> {
    let mut plan = TestPlan::load_unvalidated(&args.plan)
        .with_context(|| format!("failed to load test plan: {}", args.plan.display()))
        .invalid_input()?;

    if let Some(path) = &args.sla {
        let sla = Sla::load(path)
            .with_context(|| format!("failed to load sla: {}", path.display()))
            .invalid_input()?;
        plan = plan.with_sla(sla);
    }

    if args.discover_apis && plan.apis.is_empty() {
        let apis = open_results(&args.results)
            .and_then(|r| Ok(ingest::discover_apis(r)?))
            .runtime_error()?;
        tracing::info!(count = apis.len(), "discovered apis from results");
        plan = plan.with_apis(apis);
    }

    plan.validate()
        .with_context(|| format!("invalid test plan: {}", args.plan.display()))
        .invalid_input()?;
    Ok(plan)
}

pub fn report(args: ReportArgs) -> Result<ExitCode, RunError> {
    let plan = load_plan(&args)?;
    let out = output::formatter(args.output, args.no_color);

    let test_start = match args.start_time {
        Some(t) => Some(t),
        None => {
            open_results(&args.results)
                .and_then(|r| Ok(ingest::survey(r)?))
                .runtime_error()?
                .first_time
        }
    };

    let run = RunMetrics::new(&plan)
        .context("failed to allocate metrics")
        .runtime_error()?;

    let recorder = run.recorder();
    let (stats, timeline) = match test_start {
        Some(start) => {
            let mut timeline = TimelineBuilder::new(start, args.interval)
                .context("invalid timeline interval")
                .invalid_input()?;
            let stats = open_results(&args.results)
                .and_then(|r| Ok(ingest::replay(r, &recorder, start, Some(&mut timeline))?))
                .runtime_error()?;
            (stats, Some(timeline))
        }
        None => {
            tracing::warn!(path = %args.results.display(), "results contain no request durations");
            (ingest::IngestStats::default(), None)
        }
    };
    drop(recorder);

    let registry = run
        .finish()
        .map_err(|(_, e)| anyhow::Error::new(e))
        .runtime_error()?;

    if stats.unmatched() > 0 {
        tracing::warn!(
            unmatched = stats.unmatched(),
            "some results did not match any api/scenario in the plan"
        );
    }
    if stats.malformed > 0 {
        tracing::warn!(malformed = stats.malformed, "skipped malformed result lines");
    }

    let info = RunInfo {
        app_name: args.app_name.clone(),
        run_name: args.run_name.clone(),
        start_time: test_start,
        end_time: stats.last_time,
    };
    let mut report = build_report(&registry, &plan, &info);
    if let Some(timeline) = timeline {
        report = report.with_timeline(timeline.finish(&plan.apis));
    }

    out.print_report(&report, &stats).runtime_error()?;

    if let Some(path) = &args.html {
        write_html(path, &output::render_html(&report)).runtime_error()?;
    }

    Ok(ExitCode::from_sla(report.has_sla_failures()))
}

fn write_html(path: &Path, html: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report output dir: {}", parent.display()))?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write html report: {}", path.display()))
}
