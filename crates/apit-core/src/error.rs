use std::fmt;
use std::path::PathBuf;

use colored::Colorize;
use thiserror::Error;

/// Lines of source shown around a diagnostic.
const WINDOW: usize = 5;

/// A located message with a window of the offending source.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub snippet: String,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, path: &str, source: &str, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            path: path.to_string(),
            line,
            column,
            snippet: source_window(source, line, column),
        }
    }

    /// The `file:line:col` prefix used by errors and warnings alike.
    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.path, self.line, self.column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** {}", self.message)?;
        writeln!(f, "    at {}", self.location())?;
        write!(f, "{}", self.snippet)
    }
}

/// Render up to five lines ending at `line`, highlighting the offending line
/// and marking the column with a caret.
pub fn source_window(source: &str, line: usize, column: usize) -> String {
    if line == 0 {
        return String::new();
    }
    let lines: Vec<&str> = source.lines().collect();
    let last = line.min(lines.len());
    let first = last.saturating_sub(WINDOW - 1).max(1);
    let mut out = String::new();
    for n in first..=last {
        let text = lines[n - 1];
        if n == line {
            out.push_str(&format!("{:>5}: {}\n", n, text.red().bold()));
            let pad = " ".repeat(column.saturating_sub(1) + 7);
            out.push_str(&format!("{}{}\n", pad, "^".yellow().bold()));
        } else {
            out.push_str(&format!("{:>5}: {}\n", n, text));
        }
    }
    out
}

/// Failures while reading a single input document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Lexical(Diagnostic),

    #[error("{0}")]
    Syntax(Diagnostic),

    #[error("{0}")]
    Reference(Diagnostic),

    #[error("{0}")]
    Trait(Diagnostic),

    #[error("{0}")]
    Unsupported(Diagnostic),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid Swagger document: {0}")]
    Swagger(String),

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
}

impl ParseError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ParseError::Lexical(d)
            | ParseError::Syntax(d)
            | ParseError::Reference(d)
            | ParseError::Trait(d)
            | ParseError::Unsupported(d) => Some(d),
            _ => None,
        }
    }
}

/// Failures of the model layers: AST merge/validate, lowering, Schema checks.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("unresolved reference: {0}")]
    Reference(String),

    #[error("duplicate definition: {0}")]
    Duplicate(String),

    #[error("bad trait: {0}")]
    Trait(String),

    #[error("HTTP binding error: {0}")]
    Binding(String),

    #[error("merge conflict: {0}")]
    MergeConflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Failures surfaced by the assembly pipeline.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Failures raised by code generators.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("template error: {0}")]
    Template(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("generation failed: {0}")]
    Other(String),
}

/// Failures writing generated files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("{0} already exists. Use force to overwrite.")]
    Exists(PathBuf),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_window_limits_lines() {
        colored::control::set_override(false);
        let src = "a\nb\nc\nd\ne\nf\ng\n";
        let w = source_window(src, 7, 3);
        assert!(!w.contains("    2: b"));
        assert!(w.contains("    3: c"));
        assert!(w.contains("    7: g"));
        assert!(w.ends_with("^\n"));
    }

    #[test]
    fn test_diagnostic_display() {
        colored::control::set_override(false);
        let d = Diagnostic::new("Expected '}'", "model.smithy", "structure Foo {\n", 1, 15);
        let text = d.to_string();
        assert!(text.starts_with("*** Expected '}'"));
        assert!(text.contains("model.smithy:1:15"));
    }
}
