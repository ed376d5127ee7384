//! Rendering helpers (markdown) for human-readable artifacts.

use linkstep_types::{BatchReport, BuildStatus, VerdictStatus};

pub fn render_report_md(report: &BatchReport) -> String {
    let mut out = String::new();
    out.push_str("# linkstep batch\n\n");
    out.push_str(&format!(
        "- Verdict: `{}`\n",
        verdict_label(report.verdict.status)
    ));
    out.push_str(&format!("- Linker: `{}`\n", report.plan.linker));
    out.push_str(&format!(
        "- Base: `{}` step `{}`\n",
        report.plan.base, report.plan.step
    ));
    out.push_str(&format!(
        "- Targets: {} (built {}, failed {}, not attempted {})\n\n",
        report.summary.targets,
        report.summary.built,
        report.summary.failed,
        report.summary.not_attempted
    ));

    if !report.verdict.reasons.is_empty() {
        out.push_str("## Reasons\n\n");
        for r in &report.verdict.reasons {
            out.push_str(&format!("- {}\n", r));
        }
        out.push('\n');
    }

    if !report.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for w in &report.warnings {
            out.push_str(&format!("- {}\n", w));
        }
        out.push('\n');
    }

    out.push_str("## Targets\n\n");
    if report.results.is_empty() {
        out.push_str("_No targets._\n");
        return out;
    }

    out.push_str("| # | Target | Address | Status |\n");
    out.push_str("|---|--------|---------|--------|\n");
    for r in &report.results {
        out.push_str(&format!(
            "| {} | `{}` | `{}` | {} |\n",
            r.ordinal,
            r.name,
            r.address,
            status_label(r.status)
        ));
    }

    out
}

fn verdict_label(s: VerdictStatus) -> &'static str {
    match s {
        VerdictStatus::Pass => "pass",
        VerdictStatus::Fail => "fail",
    }
}

fn status_label(s: BuildStatus) -> &'static str {
    match s {
        BuildStatus::Built => "built",
        BuildStatus::Failed => "failed",
        BuildStatus::NotAttempted => "not attempted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstep_types::{BuildOutcome, BuildTarget, LoadAddress, PlanInfo, ToolInfo};

    fn report() -> BatchReport {
        BatchReport::new(
            ToolInfo {
                name: "linkstep".to_string(),
                version: None,
            },
            PlanInfo {
                base: LoadAddress::new(0x8040_0000),
                step: LoadAddress::new(0x20000),
                linker: "src/linker.ld".to_string(),
            },
        )
    }

    #[test]
    fn renders_empty_batch() {
        let mut r = report();
        r.finish();
        let md = render_report_md(&r);
        assert!(md.contains("- Verdict: `pass`"));
        assert!(md.contains("_No targets._"));
    }

    #[test]
    fn renders_table_and_failure_reason() {
        let mut r = report();
        r.results = vec![
            BuildOutcome::new(
                &BuildTarget::new("alpha", 0),
                LoadAddress::new(0x8040_0000),
                BuildStatus::Built,
            ),
            BuildOutcome::new(
                &BuildTarget::new("beta", 1),
                LoadAddress::new(0x8042_0000),
                BuildStatus::Failed,
            ),
        ];
        r.warnings.push("duplicate target name: beta".to_string());
        r.finish();

        let md = render_report_md(&r);
        assert!(md.contains("- Verdict: `fail`"));
        assert!(md.contains("| 0 | `alpha` | `0x80400000` | built |"));
        assert!(md.contains("| 1 | `beta` | `0x80420000` | failed |"));
        assert!(md.contains("- beta failed to build"));
        assert!(md.contains("## Warnings"));
    }
}
