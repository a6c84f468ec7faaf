//! Grading report types and the result assembler.
//!
//! Classification happens here and nowhere else. Degraded reports keep the
//! output captured so far, carry a prefixed error message, and still report
//! the kata's assertion count as `total` with `passed = 0`.
use crate::catalog::{Kata, KataNotFound};
use crate::engine::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-assertion outcome. `ok` holds exactly when `got == expected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseOutcome {
    pub call: String,
    pub expected: String,
    pub got: String,
    pub ok: bool,
}

/// Externally visible result of one grading run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradingReport {
    pub stdout: String,
    pub stderr: String,
    pub total: usize,
    pub passed: usize,
    pub cases: Vec<CaseOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
    CompileError,
    ResultError,
    KataNotFound,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::CompileError => "compile error",
            Self::ResultError => "result error",
            Self::KataNotFound => "kata not found",
        }
    }
}

/// A report together with the verdict the assembler assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graded {
    pub report: GradingReport,
    pub verdict: Verdict,
}

/// How far an execution attempt got.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The full unit failed to build, start, or run to completion.
    UnitFailed(EngineError),
    /// The unit ran, but the follow-up result request failed.
    ResultFailed(EngineError),
    /// Both phases succeeded; carries the serialized payload.
    Completed(String),
}

/// The payload disagreed with what the harness promises. Always a defect.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("result payload is not a grading report: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("result payload disagrees with kata {slug:?}: {detail}")]
    Shape { slug: String, detail: String },
}

pub fn not_found(missing: &KataNotFound) -> Graded {
    tracing::info!(slug = %missing.slug, "kata not found");
    Graded {
        report: GradingReport {
            stderr: missing.to_string(),
            ..GradingReport::default()
        },
        verdict: Verdict::KataNotFound,
    }
}

pub fn assemble(
    kata: &Kata,
    captured: String,
    outcome: AttemptOutcome,
) -> Result<Graded, DecodeError> {
    match outcome {
        AttemptOutcome::UnitFailed(err) if err.compiled() => {
            Ok(degraded(kata, captured, "result error", &err, Verdict::ResultError))
        }
        AttemptOutcome::UnitFailed(err) => {
            Ok(degraded(kata, captured, "compile error", &err, Verdict::CompileError))
        }
        AttemptOutcome::ResultFailed(err) => {
            Ok(degraded(kata, captured, "result error", &err, Verdict::ResultError))
        }
        AttemptOutcome::Completed(payload) => {
            let report = decode(kata, &payload)?;
            let verdict = if report.passed == report.total {
                Verdict::Passed
            } else {
                Verdict::Failed
            };
            Ok(Graded { report, verdict })
        }
    }
}

fn degraded(
    kata: &Kata,
    captured: String,
    prefix: &str,
    err: &EngineError,
    verdict: Verdict,
) -> Graded {
    Graded {
        report: GradingReport {
            stdout: captured,
            stderr: format!("{prefix}: {err}"),
            total: kata.assertions.len(),
            passed: 0,
            cases: Vec::new(),
        },
        verdict,
    }
}

/// Decode a payload and check it against the kata it was generated for.
pub fn decode(kata: &Kata, payload: &str) -> Result<GradingReport, DecodeError> {
    let report: GradingReport = serde_json::from_str(payload)?;
    let shape = |detail: String| DecodeError::Shape {
        slug: kata.slug.clone(),
        detail,
    };

    if report.total != kata.assertions.len() || report.cases.len() != report.total {
        return Err(shape(format!(
            "expected {} cases, payload has total {} and {} cases",
            kata.assertions.len(),
            report.total,
            report.cases.len()
        )));
    }
    for (idx, (case, assertion)) in report.cases.iter().zip(&kata.assertions).enumerate() {
        if case.call != assertion.call || case.expected != assertion.expected {
            return Err(shape(format!("case {idx} does not match assertion order")));
        }
        if case.ok != (case.got == case.expected) {
            return Err(shape(format!("case {idx} has ok={} for got {:?}", case.ok, case.got)));
        }
    }
    let ok_count = report.cases.iter().filter(|case| case.ok).count();
    if report.passed != ok_count {
        return Err(shape(format!(
            "passed is {} but {ok_count} cases are ok",
            report.passed
        )));
    }
    Ok(report)
}
