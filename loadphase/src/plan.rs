use anyhow::Context as _;
use std::fmt::Write as _;

use loadphase_core::duration::format_duration_secs;
use loadphase_core::{PhaseSchedule, TestPlan};

use crate::cli::PlanArgs;
use crate::run_error::{InvalidInputExt as _, RunError};

pub fn plan(args: PlanArgs) -> Result<(), RunError> {
    let plan = TestPlan::load(&args.file)
        .with_context(|| format!("invalid test plan: {}", args.file.display()))
        .invalid_input()?;
    print!("{}", render_timeline(&plan));
    Ok(())
}

pub(crate) fn render_timeline(plan: &TestPlan) -> String {
    let mut out = String::new();
    writeln!(&mut out, "apis: {}", plan.apis.join(", ")).ok();

    for s in &plan.scenarios {
        let schedule = PhaseSchedule::new(s);
        let start = s.start_time.as_secs();
        let end = start.saturating_add(schedule.phases_duration().as_secs());

        writeln!(
            &mut out,
            "\nscenario: {} start={} phases={}",
            s.name,
            format_duration_secs(start),
            schedule.phase_count()
        )
        .ok();
        for w in schedule.windows(s) {
            writeln!(
                &mut out,
                "  {}. {:<16} {:>8} -> {:<8} target={}",
                w.index + 1,
                w.name,
                format_duration_secs(w.start.as_secs()),
                format_duration_secs(w.end.as_secs()),
                w.target
            )
            .ok();
        }
        writeln!(
            &mut out,
            "  grace: rampDown={} stop={} (unphased after {})",
            format_duration_secs(s.graceful_ramp_down.as_secs()),
            format_duration_secs(s.graceful_stop.as_secs()),
            format_duration_secs(end)
        )
        .ok();
    }

    if !plan.sla.is_empty() {
        out.push_str("\nsla:\n");
        for (api, t) in plan.sla.iter() {
            let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v}ms"));
            writeln!(
                &mut out,
                "  {api}: p90={} p95={} p99={} target={}",
                fmt(t.p90),
                fmt(t.p95),
                fmt(t.p99),
                t.target_count
                    .map_or_else(|| "-".to_string(), |v| v.to_string())
            )
            .ok();
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_lists_absolute_windows() {
        let plan = match TestPlan::from_yaml_str(
            "apis: [login]\nscenarios:\n  spike:\n    startTime: 1m\n    phases:\n      - { name: up, duration: 30s, target: 50 }\n      - { name: hold, duration: 1m, target: 50 }\nsla:\n  login: { p90: 250 }",
        ) {
            Ok(v) => v,
            Err(err) => panic!("plan: {err}"),
        };

        let out = render_timeline(&plan);
        assert!(out.contains("scenario: spike start=1m phases=2"));
        assert!(out.contains("1m -> 1m30s"));
        assert!(out.contains("1m30s -> 2m30s"));
        assert!(out.contains("unphased after 2m30s"));
        assert!(out.contains("login: p90=250ms p95=- p99=- target=-"));
    }
}
