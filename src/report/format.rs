//! Terminal rendering of a `RunReport`.

use crate::domain::{CalibrationState, CurveParams, Verdict};
use crate::error::AppError;
use crate::report::{EditOutcome, RunReport, StratumReport};

/// Header plus one diagnostics line per stratum.
pub fn format_run_summary(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("=== csr - Stratum CSR Fatigue Curves ===\n");
    out.push_str(&format!(
        "Generated: {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Curve: {}\n", report.curve.display_name()));

    let samples: usize = report.strata.iter().map(|s| s.samples.len()).sum();
    let failed: usize = report
        .strata
        .iter()
        .flat_map(|s| &s.samples)
        .filter(|r| r.failure_cycle.is_some())
        .count();
    out.push_str(&format!(
        "Samples: n={samples} | failed={failed} | survived={}\n",
        samples - failed
    ));

    out.push_str("\nStratum diagnostics:\n");
    for s in &report.strata {
        out.push_str(&format_stratum_line(s));
        out.push('\n');
    }

    if let Some(edit) = &report.edit {
        out.push_str(&format_edit(edit));
    }
    out.push('\n');

    out
}

fn format_stratum_line(s: &StratumReport) -> String {
    let params = fmt_params(s.params);
    let line = match &s.state {
        CalibrationState::Calibrated(fit) => format!(
            "* {:<12} {:<18} {params} RMSE={:.4} n={} gen={} lm={}",
            truncate(&s.stratum, 12),
            s.state.label(),
            fit.rmse,
            fit.n,
            fit.generations,
            fit.lm_iterations,
        ),
        CalibrationState::Failed { reason } => format!(
            "  {:<12} {:<18} {params} ({reason})",
            truncate(&s.stratum, 12),
            s.state.label(),
        ),
        _ => format!(
            "  {:<12} {:<18} {params} n={} survivors={}",
            truncate(&s.stratum, 12),
            s.state.label(),
            s.fit_points,
            s.survivors,
        ),
    };
    line.trim_end().to_string()
}

fn format_edit(edit: &EditOutcome) -> String {
    let mut out = String::new();
    out.push_str("\nEdit:\n");
    out.push_str(&format!(
        "- {} / {}: N={:.1} CSR={:.4}\n",
        edit.stratum, edit.sample, edit.cycle, edit.csr
    ));
    out.push_str(&format!("- before: {}\n", fmt_params(edit.before)));
    out.push_str(&format!("- after : {}\n", fmt_params(edit.after)));
    out
}

/// Per-sample table for every stratum.
pub fn format_sample_tables(report: &RunReport) -> String {
    let mut out = String::new();
    for s in &report.strata {
        out.push_str(&format!("{} ({}):\n", s.stratum, s.state.label()));
        out.push_str(&format_sample_table(s));
        out.push('\n');
    }
    out
}

pub fn format_sample_table(s: &StratumReport) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<16} {:>6} {:>8} {:>8} {:>8} {:>8} {:<18}\n",
            "id", "Ip", "CSR", "N_ass", "N_fail", "margin", "verdict"
        )
        .trim_end(),
    );
    out.push('\n');

    out.push_str(
        format!(
            "{:-<16} {:-<6} {:-<8} {:-<8} {:-<8} {:-<8} {:-<18}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in &s.samples {
        out.push_str(
            format!(
                "{:<16} {:>6} {:>8.4} {:>8} {:>8} {:>8} {:<18}\n",
                truncate(&r.id, 16),
                fmt_opt(r.plasticity_index, 1),
                r.load_csr,
                r.assumed_cycle_count,
                r.failure_cycle.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
                fmt_opt(r.safety_margin, 3),
                fmt_verdict(r.verdict.as_ref()),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

pub fn report_to_json(report: &RunReport) -> Result<String, AppError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| AppError::output(format!("failed to serialize report: {e}")))
}

fn fmt_params(params: Option<CurveParams>) -> String {
    match params {
        Some(p) => format!("alpha={:.5} beta={:.5}", p.alpha, p.beta),
        None => "alpha=- beta=-".to_string(),
    }
}

fn fmt_verdict(v: Option<&Verdict>) -> String {
    match v {
        Some(Verdict::Fails { cycle }) => format!("fails @ {cycle}"),
        Some(Verdict::Survives { margin }) => format!("survives x{margin:.3}"),
        None => "n/a".to_string(),
    }
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(x) => format!("{x:.precision$}"),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveChoice, CurveFit};
    use crate::report::SampleRow;
    use chrono::Local;

    fn row(
        id: &str,
        failure: Option<u32>,
        margin: Option<f64>,
        verdict: Option<Verdict>,
    ) -> SampleRow {
        SampleRow {
            id: id.to_string(),
            plasticity_index: Some(12.0),
            load_csr: 0.45,
            assumed_cycle_count: 20,
            failure_cycle: failure,
            safety_margin: margin,
            verdict,
        }
    }

    fn report() -> RunReport {
        let params = CurveParams::new(0.08, 0.7);
        RunReport {
            generated_at: Local::now(),
            curve: CurveChoice::Preferred,
            strata: vec![
                StratumReport {
                    stratum: "EGE-1".to_string(),
                    state: CalibrationState::Calibrated(CurveFit {
                        params,
                        sse: 0.0,
                        rmse: 0.0,
                        n: 2,
                        generations: 12,
                        lm_iterations: 3,
                    }),
                    params: Some(params),
                    fit_points: 2,
                    survivors: 1,
                    samples: vec![
                        row("EGE-1/01", Some(7), None, Some(Verdict::Fails { cycle: 7 })),
                        row("EGE-1/02", None, Some(1.2), Some(Verdict::Survives { margin: 1.2 })),
                    ],
                },
                StratumReport {
                    stratum: "EGE-2".to_string(),
                    state: CalibrationState::InsufficientData { n: 0 },
                    params: None,
                    fit_points: 0,
                    survivors: 1,
                    samples: vec![row("EGE-2/01", None, Some(1.4), None)],
                },
            ],
            edit: Some(EditOutcome {
                stratum: "EGE-1".to_string(),
                sample: "EGE-1/02".to_string(),
                cycle: 40.0,
                csr: 0.4,
                before: None,
                after: Some(params),
            }),
        }
    }

    #[test]
    fn summary_lists_strata_and_edit() {
        let text = format_run_summary(&report());
        assert!(text.contains("Curve: preferred"));
        assert!(text.contains("Samples: n=3 | failed=1 | survived=2"));
        assert!(text.contains("* EGE-1"));
        assert!(text.contains("alpha=0.08000 beta=0.70000"));
        assert!(text.contains("insufficient data"));
        assert!(text.contains("- before: alpha=- beta=-"));
    }

    #[test]
    fn sample_table_renders_verdicts() {
        let text = format_sample_tables(&report());
        assert!(text.contains("fails @ 7"));
        assert!(text.contains("survives x1.200"));
        assert!(text.contains("n/a"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn json_report_is_valid() {
        let json = report_to_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["strata"][0]["samples"][0]["verdict"]["outcome"], "fails");
        assert_eq!(value["edit"]["after"]["alpha"], 0.08);
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("EGE-1/01", 16), "EGE-1/01");
        assert_eq!(truncate("abcdefgh", 5), "abcd.");
    }
}
