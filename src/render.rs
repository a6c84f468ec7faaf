//! Plain-text rendering of grading reports.
//!
//! Rendering is driven by the verdict; the rendered text is never read back
//! to decide whether a run passed.
use crate::report::{Graded, GradingReport, Verdict};
use std::time::Duration;

const PASS_MARK: &str = "✓";
const FAIL_MARK: &str = "✗";

pub fn render_report(slug: &str, graded: &Graded, elapsed: Duration) -> String {
    if graded.verdict == Verdict::Passed {
        return format!("{PASS_MARK} Success! ({})\n", format_elapsed(elapsed));
    }
    render_detail(slug, &graded.report)
}

fn render_detail(slug: &str, report: &GradingReport) -> String {
    let mut out = String::new();
    if !report.stdout.is_empty() {
        out.push_str(&report.stdout);
        if !report.stdout.ends_with('\n') {
            out.push('\n');
        }
    }
    if !report.stderr.is_empty() {
        out.push_str(&report.stderr);
        out.push('\n');
    }
    out.push_str(&format!(
        "Kata: {slug} - {}/{} passed\n",
        report.passed, report.total
    ));
    for case in &report.cases {
        let mark = if case.ok { PASS_MARK } else { FAIL_MARK };
        out.push_str(&format!(
            "{mark} {} => got {} (expected {})\n",
            case.call, case.got, case.expected
        ));
    }
    out
}

/// `"<n> ms"` below one second, `"<s.ss> s"` otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{} ms", elapsed.as_millis())
    } else {
        format!("{:.2} s", elapsed.as_secs_f64())
    }
}
