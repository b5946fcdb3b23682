//! Terminal rendering of resolution errors.
//!
//! A [`Diagnostic`] is a headline, an optional config file location,
//! context lines, and `help:` suggestions:
//!
//! ```text
//! error: module "buf.build/acme/a" is declared in multiple directories
//!   = declared in "proto"
//!   = declared in "other"
//! help: Give each module directory a unique name
//! ```

use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// Suggestions shared by several errors.
pub mod suggestions {
    pub const MODULE_AS_INPUT: &str =
        "Specify the module directory as the input instead of passing it to --path";

    pub const CHECK_PATHS: &str =
        "Check that --path and --exclude-path point at .proto files or directories inside a module";

    pub const REGENERATE_LOCK: &str = "Regenerate the lock file so that its version matches buf.yaml";

    pub const MIGRATE_V2: &str =
        "Remove buf.work.yaml and declare the modules in a v2 buf.yaml, or remove the buf.yaml";

    pub const REPORT_BUG: &str = "This is a bug; run again with --verbose and report the output";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    /// ANSI bold plus the severity color.
    fn ansi(self) -> &'static str {
        match self {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;33m",
        }
    }
}

const HELP_ANSI: &str = "\x1b[1;32m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    location: Option<PathBuf>,
    context: Vec<String>,
    suggestions: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            location: None,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, message)
    }

    pub fn with_context(mut self, line: impl Into<String>) -> Self {
        self.context.push(line.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// The config file the diagnostic is about.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |ansi: &str, label: &str| {
            if color {
                format!("{}{}{}", ansi, label, RESET)
            } else {
                label.to_string()
            }
        };

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {}",
            paint(self.severity.ansi(), self.severity.label()),
            self.message
        );
        if let Some(path) = &self.location {
            let _ = writeln!(out, "  --> {}", path.display());
        }
        for line in &self.context {
            let _ = writeln!(out, "  = {}", line);
        }
        for suggestion in &self.suggestions {
            let _ = writeln!(out, "{}: {}", paint(HELP_ANSI, "help"), suggestion);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
