pub const PREAMBLE_GO: &str = include_str!("../templates/preamble.go.tmpl");
pub const HARNESS_GO: &str = include_str!("../templates/harness.go.tmpl");
pub const HARNESS_CASE_GO: &str = include_str!("../templates/harness_case.go.tmpl");
pub const ENTRY_GO: &str = include_str!("../templates/entry.go.tmpl");
pub const EVAL_DRIVER_GO: &str = include_str!("../templates/eval_driver.go.tmpl");
pub const GO_MOD: &str = include_str!("../templates/go.mod.tmpl");

/// Substitute `{{KEY}}` placeholders in a single left-to-right pass.
///
/// Substituted values are never rescanned, so a value that itself contains
/// `{{...}}` is emitted verbatim. Unknown placeholders are left untouched.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after_open[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(key);
                out.push_str("}}");
            }
        }
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    out
}
