//! Harness synthesis: the Go epilogue appended to every submission.
//!
//! The epilogue declares one `__Case` record per assertion (in kata order)
//! whose `Got` field is `_fmt.Sprint(<call>)`, a `__grade` routine that
//! marks each record by exact text equality, and `__resultJSON(stdout)`,
//! which grades and returns the report payload as JSON text.
//!
//! Call expressions are spliced verbatim as code; every other embedded value
//! is quoted with [`go_string_literal`].
use crate::catalog::Kata;
use crate::quote::go_string_literal;
use crate::templates;

/// Name of the generated result-serialization routine.
pub const RESULT_FN: &str = "__resultJSON";

pub fn synthesize(kata: &Kata) -> String {
    let mut cases = String::new();
    for assertion in &kata.assertions {
        let call_literal = go_string_literal(&assertion.call);
        let expected_literal = go_string_literal(&assertion.expected);
        cases.push_str(&templates::render(
            templates::HARNESS_CASE_GO,
            &[
                ("CALL_LITERAL", call_literal.as_str()),
                ("EXPECTED_LITERAL", expected_literal.as_str()),
                ("CALL", assertion.call.as_str()),
            ],
        ));
    }
    templates::render(templates::HARNESS_GO, &[("CASES", cases.as_str())])
}

/// Follow-up expression that asks the evaluated unit for its report payload.
pub fn result_expression(captured_stdout: &str) -> String {
    format!("{RESULT_FN}({})", go_string_literal(captured_stdout))
}
