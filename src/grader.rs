//! Grading pipeline: lookup, normalize, synthesize, two-phase evaluation,
//! assembly.
//!
//! Each call builds its own [`ExecutionAttempt`] around a freshly spawned
//! engine and consumes it; nothing about an attempt outlives the report.
use crate::catalog::Catalog;
use crate::engine::{EngineFactory, ExecutionEngine};
use crate::harness;
use crate::normalize::{normalize_source, SourceUnit};
use crate::report::{self, AttemptOutcome, DecodeError, Graded};
use std::time::Instant;

/// Grade `source` against the kata named `slug`.
///
/// Every user-facing outcome, including an unknown slug, is an `Ok` report.
/// `Err` means the result payload disagreed with the harness that produced it.
pub fn grade<F: EngineFactory>(
    catalog: &Catalog,
    slug: &str,
    source: &str,
    factory: &F,
) -> Result<Graded, DecodeError> {
    let start = Instant::now();
    let kata = match catalog.find(slug) {
        Ok(kata) => kata,
        Err(missing) => return Ok(report::not_found(&missing)),
    };

    let unit = normalize_source(source).with_epilogue(&harness::synthesize(kata));
    tracing::debug!(
        slug,
        wrapped = unit.wrapped(),
        bytes = unit.as_str().len(),
        "unit synthesized"
    );

    let (captured, outcome) = match factory.spawn() {
        Ok(engine) => ExecutionAttempt { engine, unit }.run(slug),
        Err(err) => {
            tracing::warn!(slug, error = %err, "engine spawn failed");
            (String::new(), AttemptOutcome::UnitFailed(err))
        }
    };
    let graded = report::assemble(kata, captured, outcome)?;
    tracing::info!(
        slug,
        verdict = ?graded.verdict,
        passed = graded.report.passed,
        total = graded.report.total,
        elapsed_ms = start.elapsed().as_millis(),
        "graded"
    );
    Ok(graded)
}

/// One engine instance and the unit it will evaluate.
struct ExecutionAttempt<E> {
    engine: E,
    unit: SourceUnit,
}

impl<E: ExecutionEngine> ExecutionAttempt<E> {
    fn run(mut self, slug: &str) -> (String, AttemptOutcome) {
        let evaluation = self.engine.evaluate_unit(self.unit.as_str());
        tracing::debug!(
            slug,
            phase = "unit",
            bytes = evaluation.output.len(),
            failed = evaluation.error.is_some(),
            "phase finished"
        );
        if let Some(err) = evaluation.error {
            return (evaluation.output, AttemptOutcome::UnitFailed(err));
        }

        let expr = harness::result_expression(&evaluation.output);
        let outcome = match self.engine.evaluate_expr(&expr) {
            Ok(payload) => AttemptOutcome::Completed(payload),
            Err(err) => AttemptOutcome::ResultFailed(err),
        };
        tracing::debug!(slug, phase = "result", "phase finished");
        (evaluation.output, outcome)
    }
}
