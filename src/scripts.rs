//! Script minification and linting.
//!
//! A conservative minifier: comments go, lines are trimmed and blank lines
//! dropped. Identifiers and statements are never rewritten, so the output
//! runs exactly like the input. `/*! ... */` banners (licenses) are kept.
//!
//! String, template and regular-expression literals are copied verbatim.
//! Whether a `/` starts a regex or is a division is decided from the last
//! significant character or keyword before it, the usual heuristic.
//!
//! Linting shells out to `eslint --fix` over the same sources. A non-zero
//! exit is an error carrying eslint's report.

use crate::config::ScriptsConfig;
use crate::variants::output_name;
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("script path has no file name: {0}")]
    NoFileName(PathBuf),
    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("{} found problems (exit {code}):\n{report}", program.display())]
    Lint {
        program: PathBuf,
        code: String,
        report: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    pub processed: usize,
    pub failed: usize,
}

impl fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scripts minified, {} failed",
            self.processed, self.failed
        )
    }
}

/// Characters after which a `/` starts a regex literal.
const REGEX_PRECEDERS: &str = "(,=:[!&|?{};+-*%<>~^";

/// Keywords after which a `/` starts a regex literal.
const REGEX_KEYWORDS: [&str; 10] = [
    "return",
    "typeof",
    "case",
    "do",
    "else",
    "in",
    "instanceof",
    "new",
    "delete",
    "throw",
];

fn at_line_start(out: &str) -> bool {
    out.is_empty() || out.ends_with('\n')
}

fn push_newline(out: &mut String) {
    while out.ends_with([' ', '\t', '\r']) {
        out.pop();
    }
    if !at_line_start(out) {
        out.push('\n');
    }
}

fn push_space(out: &mut String) {
    if !at_line_start(out) && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    let Some(last) = trimmed.chars().last() else {
        return true;
    };
    if REGEX_PRECEDERS.contains(last) {
        return true;
    }
    let word_start = trimmed
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .map_or(0, |i| i + 1);
    REGEX_KEYWORDS.contains(&&trimmed[word_start..])
}

/// Copy a quoted literal starting at `start`; returns the index after it.
fn copy_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        if c == '\\' {
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
            }
            i += 2;
            continue;
        }
        i += 1;
        if c == quote {
            break;
        }
    }
    i
}

/// Copy a regex literal starting at `start` (the opening `/`).
fn copy_regex(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('/');
    let mut i = start + 1;
    let mut in_class = false;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        match c {
            '\\' => {
                if let Some(&next) = chars.get(i) {
                    out.push(next);
                }
                i += 1;
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => break,
            '\n' => break,
            _ => {}
        }
    }
    i
}

/// Index just past the `*/` closing a block comment opened at `start`.
fn block_comment_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// Minify one script.
pub fn minify_js(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '"' | '\'' | '`' => i = copy_quoted(&chars, i, &mut out),
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let end = block_comment_end(&chars, i);
                let comment = &chars[i..end];
                if chars.get(i + 2) == Some(&'!') {
                    out.extend(comment);
                } else if comment.contains(&'\n') {
                    push_newline(&mut out);
                } else {
                    push_space(&mut out);
                }
                i = end;
            }
            '/' if regex_allowed(&out) => i = copy_regex(&chars, i, &mut out),
            '\n' => {
                push_newline(&mut out);
                i += 1;
            }
            c if c.is_whitespace() => {
                if !at_line_start(&out) {
                    out.push(c);
                }
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    push_newline(&mut out);
    out
}

fn minify_file(source: &Path, dest_dir: &Path) -> Result<PathBuf, ScriptError> {
    let file_name = source
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| ScriptError::NoFileName(source.to_path_buf()))?;
    let content = fs::read_to_string(source).map_err(|e| ScriptError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    let target = dest_dir.join(output_name(file_name, Some(".min")));
    fs::create_dir_all(dest_dir)
        .and_then(|()| fs::write(&target, minify_js(&content)))
        .map_err(|e| ScriptError::Write {
            path: target.clone(),
            source: e,
        })?;
    Ok(target)
}

/// Minify every configured script into `scripts.dest`.
///
/// An empty source list does nothing. Paths are relative to `root`.
pub fn run_scripts(config: &ScriptsConfig, root: &Path) -> ScriptReport {
    let mut report = ScriptReport::default();
    if config.src.is_empty() {
        tracing::info!("no scripts configured");
        return report;
    }

    let dest_dir = root.join(&config.dest);
    for src in &config.src {
        match minify_file(&root.join(src), &dest_dir) {
            Ok(target) => {
                tracing::debug!(file = %src.display(), output = %target.display(), "minified");
                report.processed += 1;
            }
            Err(e) => {
                tracing::warn!(file = %src.display(), error = %e, "failed to minify script");
                report.failed += 1;
            }
        }
    }
    report
}

/// `eslint` arguments: fix in place, the config if present, every source.
fn lint_args(config: &ScriptsConfig, root: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--fix".into()];
    let eslint_config = root.join(&config.eslint_config);
    if eslint_config.is_file() {
        args.push("--config".into());
        args.push(eslint_config.into());
    }
    args.extend(config.src.iter().map(|src| root.join(src).into()));
    args
}

/// Lint every configured script with `eslint --fix`.
///
/// Returns the number of files checked. An empty source list does nothing
/// and never starts the linter.
pub fn lint_scripts(config: &ScriptsConfig, root: &Path) -> Result<usize, ScriptError> {
    if config.src.is_empty() {
        tracing::info!("no scripts configured");
        return Ok(0);
    }
    tracing::info!(files = config.src.len(), "linting scripts");

    let output = Command::new(&config.eslint)
        .args(lint_args(config, root))
        .output()
        .map_err(|source| ScriptError::Spawn {
            program: config.eslint.clone(),
            source,
        })?;

    // eslint prints its findings on stdout, crashes on stderr
    let report = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
    .trim()
    .to_string();
    if !output.status.success() {
        return Err(ScriptError::Lint {
            program: config.eslint.clone(),
            code: output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string()),
            report,
        });
    }
    if !report.is_empty() {
        tracing::warn!(report = %report, "lint warnings");
    }
    Ok(config.src.len())
}

/// Lint, then minify. Minification is skipped when linting fails.
pub fn lint_and_minify(config: &ScriptsConfig, root: &Path) -> Result<ScriptReport, ScriptError> {
    lint_scripts(config, root)?;
    Ok(run_scripts(config, root))
}
