//! Go toolchain engine.
//!
//! Each instance owns a private temporary module directory that is removed
//! when the instance drops. Only the content-addressed Go build cache is
//! shared between instances.
//!
//! ## Protocol
//! - **Unit**: write `go.mod` and `main.go`, add an empty `func main()` when
//!   the unit has none, `go build`, then run the binary with stdout and
//!   stderr merged into one capture.
//! - **Expression**: add a driver file whose `init` runs after every
//!   package-level declaration is initialized, writes `fmt.Sprint(<expr>)`
//!   to a result file, and exits before the program's own `main`. Output
//!   printed while the program re-initializes is discarded.
use super::process::{run_bounded, BoundedRun};
use super::{EngineError, EngineFactory, ExecutionEngine, UnitEvaluation};
use crate::config::RunnerConfig;
use crate::templates;
use crate::util::exit_status_string;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

const UNIT_FILE: &str = "main.go";
const ENTRY_FILE: &str = "zz_entry.go";
const EVAL_DRIVER_FILE: &str = "zz_eval.go";
const UNIT_BINARY: &str = "unit";
const EVAL_BINARY: &str = "eval";
const RESULT_FILE: &str = "result.txt";
const RESULT_PATH_ENV: &str = "KATA_RESULT_PATH";
const PASSTHROUGH_ENV: &[&str] = &["PATH", "GOROOT", "TMPDIR"];

/// Factory for [`GoEngine`] instances built from the runner config.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    argv: Vec<String>,
    build_timeout: Duration,
    run_timeout: Duration,
    max_output_bytes: usize,
    cache_dir: Option<PathBuf>,
}

impl GoToolchain {
    pub fn from_config(config: &RunnerConfig) -> Result<Self, EngineError> {
        let argv = shell_words::split(&config.go_command).map_err(|err| {
            EngineError::Unavailable(format!("parse go_command {:?}: {err}", config.go_command))
        })?;
        if argv.is_empty() {
            return Err(EngineError::Unavailable("go_command is empty".to_string()));
        }
        Ok(Self {
            argv,
            build_timeout: Duration::from_secs_f64(config.build_timeout_seconds),
            run_timeout: Duration::from_secs_f64(config.run_timeout_seconds),
            max_output_bytes: config.max_output_bytes,
            cache_dir: dirs::cache_dir().map(|dir| dir.join("kata-runner").join("go-build")),
        })
    }
}

impl EngineFactory for GoToolchain {
    type Engine = GoEngine;

    fn spawn(&self) -> Result<GoEngine, EngineError> {
        let program = which::which(&self.argv[0]).map_err(|err| {
            EngineError::Unavailable(format!("{}: {err}", self.argv[0]))
        })?;
        let workdir = tempfile::Builder::new().prefix("kata-").tempdir()?;
        let cache_dir = self
            .cache_dir
            .clone()
            .unwrap_or_else(|| workdir.path().join("gocache"));
        for dir in [
            workdir.path().join("src"),
            workdir.path().join("bin"),
            workdir.path().join("home"),
            cache_dir.clone(),
        ] {
            fs::create_dir_all(&dir)?;
        }

        let mut engine = GoEngine {
            workdir,
            program,
            leading_args: self.argv[1..].to_vec(),
            cache_dir,
            build_timeout: self.build_timeout,
            run_timeout: self.run_timeout,
            max_output_bytes: self.max_output_bytes,
            language_version: None,
            state: EngineState::Fresh,
        };
        engine.language_version = engine.query_language_version()?;
        tracing::debug!(
            workdir = %engine.workdir.path().display(),
            go = ?engine.language_version,
            "go engine ready"
        );
        Ok(engine)
    }
}

#[derive(Debug)]
enum EngineState {
    Fresh,
    Ready { package: String },
    Spent,
}

/// One private Go module directory; evaluates exactly one unit.
#[derive(Debug)]
pub struct GoEngine {
    workdir: TempDir,
    program: PathBuf,
    leading_args: Vec<String>,
    cache_dir: PathBuf,
    build_timeout: Duration,
    run_timeout: Duration,
    max_output_bytes: usize,
    language_version: Option<String>,
    state: EngineState,
}

impl GoEngine {
    fn src_dir(&self) -> PathBuf {
        self.workdir.path().join("src")
    }

    fn capture_path(&self, name: &str) -> PathBuf {
        self.workdir.path().join(name)
    }

    fn go_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .env_clear()
            .env("HOME", self.workdir.path().join("home"))
            .env("GOPATH", self.workdir.path().join("gopath"))
            .env("GOCACHE", &self.cache_dir)
            .env("GOTOOLCHAIN", "local")
            .env("GOPROXY", "off")
            .env("GOFLAGS", "-mod=mod")
            .env("GO111MODULE", "on")
            .env("CGO_ENABLED", "0")
            .env("LC_ALL", "C")
            .env("TZ", "UTC")
            .env("TERM", "dumb")
            .current_dir(self.src_dir());
        for key in PASSTHROUGH_ENV {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        cmd
    }

    fn query_language_version(&self) -> Result<Option<String>, EngineError> {
        let mut cmd = self.go_command();
        cmd.args(["env", "GOVERSION"]);
        let run = run_bounded(
            &mut cmd,
            &self.capture_path("goversion.log"),
            self.build_timeout,
            self.max_output_bytes,
        )
        .map_err(|err| EngineError::Unavailable(format!("run go env: {err}")))?;
        if !run.success() {
            return Err(EngineError::Unavailable(format!(
                "go env GOVERSION failed: {}",
                run.output.trim()
            )));
        }
        Ok(parse_language_version(&run.output))
    }

    fn write_unit(&self, unit: &str) -> Result<String, EngineError> {
        let package = package_name(unit)
            .ok_or_else(|| EngineError::Compile("expected 'package' clause".to_string()))?;
        if package != "main" {
            return Err(EngineError::Compile(format!(
                "package {package} is not a command; submissions must declare package main"
            )));
        }
        let directive = self
            .language_version
            .as_deref()
            .map(|version| format!("\ngo {version}"))
            .unwrap_or_default();
        let src = self.src_dir();
        fs::write(
            src.join("go.mod"),
            templates::render(templates::GO_MOD, &[("GO_DIRECTIVE", directive.as_str())]),
        )?;
        fs::write(src.join(UNIT_FILE), unit)?;
        if !declares_main(unit) {
            fs::write(
                src.join(ENTRY_FILE),
                templates::render(templates::ENTRY_GO, &[("PACKAGE", package.as_str())]),
            )?;
        }
        Ok(package)
    }

    fn build(&self, binary: &str, log: &str) -> Result<(), EngineError> {
        let mut cmd = self.go_command();
        cmd.arg("build")
            .arg("-o")
            .arg(self.workdir.path().join("bin").join(binary))
            .arg(".");
        let run = run_bounded(
            &mut cmd,
            &self.capture_path(log),
            self.build_timeout,
            self.max_output_bytes,
        )?;
        tracing::debug!(binary, duration_ms = run.duration_ms, "go build finished");
        if run.timed_out {
            return Err(EngineError::BuildTimeout {
                seconds: self.build_timeout.as_secs_f64(),
            });
        }
        if !run.success() {
            return Err(EngineError::Compile(clean_diagnostics(
                &run.output,
                &self.src_dir(),
            )));
        }
        Ok(())
    }

    fn run_program(
        &self,
        binary: &str,
        log: &str,
        result_path: Option<&Path>,
    ) -> Result<BoundedRun, EngineError> {
        let mut cmd = Command::new(self.workdir.path().join("bin").join(binary));
        cmd.env_clear()
            .env("HOME", self.workdir.path().join("home"))
            .env("LC_ALL", "C")
            .env("TZ", "UTC")
            .env("TERM", "dumb")
            .current_dir(self.src_dir());
        if let Some(path) = result_path {
            cmd.env(RESULT_PATH_ENV, path);
        }
        let run = run_bounded(
            &mut cmd,
            &self.capture_path(log),
            self.run_timeout,
            self.max_output_bytes,
        )?;
        tracing::debug!(
            binary,
            duration_ms = run.duration_ms,
            output_bytes = run.output.len(),
            timed_out = run.timed_out,
            "program finished"
        );
        Ok(run)
    }

    fn run_failure(&self, run: &BoundedRun) -> Option<EngineError> {
        if run.timed_out {
            return Some(EngineError::RunTimeout {
                seconds: self.run_timeout.as_secs_f64(),
            });
        }
        if run.success() {
            return None;
        }
        let status = run
            .status
            .as_ref()
            .map(exit_status_string)
            .unwrap_or_else(|| "unknown status".to_string());
        Some(EngineError::Runtime(match failure_line(&run.output) {
            Some(line) => format!("program exited with {status}: {line}"),
            None => format!("program exited with {status}"),
        }))
    }

    fn build_and_run_unit(&self, unit: &str) -> Result<(String, BoundedRun), EngineError> {
        let package = self.write_unit(unit)?;
        self.build(UNIT_BINARY, "build.log")?;
        let run = self.run_program(UNIT_BINARY, "run.log", None)?;
        Ok((package, run))
    }
}

impl ExecutionEngine for GoEngine {
    fn evaluate_unit(&mut self, unit: &str) -> UnitEvaluation {
        if !matches!(self.state, EngineState::Fresh) {
            return UnitEvaluation::failed(String::new(), EngineError::AlreadyEvaluated);
        }
        self.state = EngineState::Spent;
        let (package, run) = match self.build_and_run_unit(unit) {
            Ok(result) => result,
            Err(err) => return UnitEvaluation::failed(String::new(), err),
        };
        if let Some(err) = self.run_failure(&run) {
            return UnitEvaluation::failed(run.output, err);
        }
        self.state = EngineState::Ready { package };
        UnitEvaluation::ok(run.output)
    }

    fn evaluate_expr(&mut self, expr: &str) -> Result<String, EngineError> {
        let EngineState::Ready { package } = &self.state else {
            return Err(EngineError::NotReady);
        };
        let driver = templates::render(
            templates::EVAL_DRIVER_GO,
            &[("PACKAGE", package.as_str()), ("EXPR", expr)],
        );
        let driver_path = self.src_dir().join(EVAL_DRIVER_FILE);
        fs::write(&driver_path, driver)?;
        let built = self.build(EVAL_BINARY, "eval-build.log");
        fs::remove_file(&driver_path)?;
        built?;

        let result_path = self.capture_path(RESULT_FILE);
        if result_path.exists() {
            fs::remove_file(&result_path)?;
        }
        let run = self.run_program(EVAL_BINARY, "eval-run.log", Some(&result_path))?;
        if let Some(err) = self.run_failure(&run) {
            return Err(err);
        }
        let bytes = fs::read(&result_path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// `unit` with comments and the bodies of string and rune literals removed.
///
/// Line breaks are kept so line-anchored patterns still see the layout.
fn code_outline(unit: &str) -> String {
    let mut out = String::with_capacity(unit.len());
    let mut chars = unit.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '/' if chars.peek() == Some(&'/') => {
                if chars.by_ref().any(|c| c == '\n') {
                    out.push('\n');
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            '"' | '\'' => {
                out.push(ch);
                let mut escaped = false;
                for c in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == ch || c == '\n' {
                        out.push(c);
                        break;
                    }
                }
            }
            '`' => {
                out.push(ch);
                for c in chars.by_ref() {
                    if c == '\n' || c == '`' {
                        out.push(c);
                    }
                    if c == '`' {
                        break;
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Name from the package clause, which must be the first token of the unit.
fn package_name(unit: &str) -> Option<String> {
    let re = Regex::new(r"\A\s*package\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("regex for package clause");
    re.captures(&code_outline(unit))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

fn declares_main(unit: &str) -> bool {
    let re = Regex::new(r"(?m)^[ \t]*func\s+main\s*\(\s*\)")
        .expect("regex for main declaration");
    re.is_match(&code_outline(unit))
}

fn parse_language_version(goversion: &str) -> Option<String> {
    let re = Regex::new(r"go(\d+)\.(\d+)").expect("regex for go version");
    let cap = re.captures(goversion)?;
    Some(format!("{}.{}", cap.get(1)?.as_str(), cap.get(2)?.as_str()))
}

/// Strip `go build` package headers and private paths from diagnostics.
fn clean_diagnostics(output: &str, src_dir: &Path) -> String {
    let prefix = format!("{}/", src_dir.display());
    let lines: Vec<String> = output
        .lines()
        .filter(|line| !line.starts_with("# "))
        .map(|line| line.replace(&prefix, ""))
        .collect();
    lines.join("\n").trim().to_string()
}

fn failure_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("panic:") || line.starts_with("fatal error:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_reads_first_clause() {
        assert_eq!(
            package_name("// header\npackage main\n\nfunc F() {}"),
            Some("main".to_string())
        );
        assert_eq!(package_name("package kata_1"), Some("kata_1".to_string()));
        assert_eq!(package_name("func F() {}"), None);
    }

    #[test]
    fn package_name_skips_clauses_inside_comments() {
        assert_eq!(
            package_name("/*\npackage foo\n*/\npackage main\n"),
            Some("main".to_string())
        );
        assert_eq!(
            package_name("// package foo\n/* package bar */ package main\n"),
            Some("main".to_string())
        );
        assert_eq!(package_name("func F() {}\npackage main\n"), None);
    }

    #[test]
    fn declares_main_requires_a_func_named_main() {
        assert!(declares_main("package main\n\nfunc main() {\n}"));
        assert!(declares_main("func main ( ) {}"));
        assert!(declares_main("\tfunc main() {}"));
        assert!(!declares_main("func mainly() {}"));
        assert!(!declares_main("func (s S) main() {}"));
    }

    #[test]
    fn declares_main_ignores_comments_and_literals() {
        assert!(!declares_main("/*\nfunc main() {}\n*/\nfunc F() {}"));
        assert!(!declares_main("// func main() {}\nfunc F() {}"));
        assert!(!declares_main("var s = `\nfunc main() {}\n`"));
        assert!(!declares_main("var s = \"func main() {}\""));
        assert!(declares_main("var s = \"/*\"\n\nfunc main() {}\n"));
        assert!(declares_main("var r = '`'\n\nfunc main() {}\n"));
    }

    #[test]
    fn parse_language_version_keeps_major_minor() {
        assert_eq!(parse_language_version("go1.22.3\n"), Some("1.22".to_string()));
        assert_eq!(parse_language_version("go1.21rc2"), Some("1.21".to_string()));
        assert_eq!(
            parse_language_version("devel go1.23-abcdef"),
            Some("1.23".to_string())
        );
        assert_eq!(parse_language_version("unknown"), None);
    }

    #[test]
    fn clean_diagnostics_drops_headers_and_private_paths() {
        let src = Path::new("/tmp/kata-xyz/src");
        let output = "# kata\n./main.go:9:2: undefined: x\n/tmp/kata-xyz/src/main.go:10:1: syntax error\n";
        assert_eq!(
            clean_diagnostics(output, src),
            "./main.go:9:2: undefined: x\nmain.go:10:1: syntax error"
        );
    }

    #[test]
    fn failure_line_finds_panics() {
        let output = "hello\npanic: runtime error: integer divide by zero\n\ngoroutine 1 [running]:\n";
        assert_eq!(
            failure_line(output),
            Some("panic: runtime error: integer divide by zero")
        );
        assert_eq!(failure_line("all good\n"), None);
    }

    fn toolchain() -> Option<GoToolchain> {
        which::which("go").ok()?;
        let config = RunnerConfig {
            build_timeout_seconds: 120.0,
            ..RunnerConfig::default()
        };
        GoToolchain::from_config(&config).ok()
    }

    #[test]
    fn unit_then_expression_share_declarations() {
        let Some(toolchain) = toolchain() else {
            return;
        };
        let mut engine = toolchain.spawn().expect("spawn go engine");
        let unit = "package main\n\nimport \"fmt\"\n\nvar greeting = \"hi\"\n\nfunc init() { fmt.Println(\"init ran\") }\n\nfunc Twice(n int) int { return 2 * n }\n";
        let evaluation = engine.evaluate_unit(unit);
        assert!(evaluation.error.is_none(), "{:?}", evaluation.error);
        assert_eq!(evaluation.output, "init ran\n");

        let value = engine
            .evaluate_expr("Twice(21)")
            .expect("evaluate expression");
        assert_eq!(value, "42");
        let value = engine.evaluate_expr("greeting").expect("evaluate again");
        assert_eq!(value, "hi");
    }

    #[test]
    fn expression_before_unit_is_rejected() {
        let Some(toolchain) = toolchain() else {
            return;
        };
        let mut engine = toolchain.spawn().expect("spawn go engine");
        let err = engine.evaluate_expr("1").expect_err("not ready");
        assert!(matches!(err, EngineError::NotReady));
    }

    #[test]
    fn syntax_error_is_a_compile_failure() {
        let Some(toolchain) = toolchain() else {
            return;
        };
        let mut engine = toolchain.spawn().expect("spawn go engine");
        let evaluation = engine.evaluate_unit("package main\n\nfunc Broken( {\n");
        let err = evaluation.error.expect("compile error");
        assert!(matches!(err, EngineError::Compile(_)), "{err:?}");
        assert!(!err.compiled());
        assert!(evaluation.output.is_empty());

        let again = engine.evaluate_unit("package main\n");
        assert!(matches!(again.error, Some(EngineError::AlreadyEvaluated)));
    }

    #[test]
    fn panic_during_initialization_is_a_runtime_failure() {
        let Some(toolchain) = toolchain() else {
            return;
        };
        let mut engine = toolchain.spawn().expect("spawn go engine");
        let unit = "package main\n\nimport \"fmt\"\n\nvar zero = 0\n\nvar boom = 1 / zero\n\nfunc main() { fmt.Println(boom) }\n";
        let evaluation = engine.evaluate_unit(unit);
        let err = evaluation.error.expect("runtime error");
        assert!(err.compiled());
        assert!(err.to_string().contains("integer divide by zero"), "{err}");
        assert!(evaluation.output.contains("panic:"));
    }

    #[test]
    fn fresh_instances_do_not_share_declarations() {
        let Some(toolchain) = toolchain() else {
            return;
        };
        let mut first = toolchain.spawn().expect("spawn first engine");
        let evaluation = first.evaluate_unit("package main\n\nvar only = 1\n");
        assert!(evaluation.error.is_none(), "{:?}", evaluation.error);

        let mut second = toolchain.spawn().expect("spawn second engine");
        let evaluation = second.evaluate_unit("package main\n\nvar other = 2\n");
        assert!(evaluation.error.is_none(), "{:?}", evaluation.error);
        let err = second.evaluate_expr("only").expect_err("undeclared in second");
        assert!(matches!(err, EngineError::Compile(_)), "{err:?}");
    }
}
