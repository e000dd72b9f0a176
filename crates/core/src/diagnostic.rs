//! Structured diagnostics produced by the check pipeline
//!
//! A [`Diagnostic`] is attached either to a single file (by workspace-
//! relative path) or to the workspace as a whole (empty path). Adding a
//! diagnostic is idempotent per `(code, path)`: a later report with the
//! same key replaces the earlier one, so repeated check passes do not pile
//! up duplicates.
//!
//! Persistence controls lifetime: non-persistent diagnostics are cleared at
//! the start of every `perform_checks` invocation and re-derived;
//! persistent ones survive until the offending condition is resolved and
//! the entry is explicitly dropped or replaced.

use serde::{Deserialize, Serialize};

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational note; never affects readiness.
    Info,
    /// Something the submitter should review; readiness drops to
    /// ready-with-warnings.
    Warning,
    /// Blocks the submission while persistent; readiness becomes errors.
    Fatal,
}

impl Severity {
    /// Wire-stable string representation as surfaced to the hosting
    /// service: `info`, `warn`, or `fatal`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warn",
            Severity::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One finding from a checker, keyed by `(code, path)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity of the finding.
    pub severity: Severity,
    /// Short stable identifier, e.g. `disallowed_file`, `unpack_error`.
    pub code: String,
    /// Workspace-relative path the finding is attached to; empty for
    /// workspace-level findings.
    pub path: String,
    /// Human-readable message, may name the file.
    pub message: String,
    /// Whether the finding survives across check passes.
    pub is_persistent: bool,
}

impl Diagnostic {
    /// Create a fatal, persistent diagnostic.
    pub fn fatal(code: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Fatal,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            is_persistent: true,
        }
    }

    /// Create a warning diagnostic (persistent by default).
    pub fn warning(
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            is_persistent: true,
        }
    }

    /// Create an informational diagnostic (non-persistent by default).
    pub fn info(code: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Info,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            is_persistent: false,
        }
    }

    /// Override the persistence flag.
    pub fn persistent(mut self, yes: bool) -> Self {
        self.is_persistent = yes;
        self
    }

    /// True when attached to the workspace rather than a file.
    pub fn is_workspace_level(&self) -> bool {
        self.path.is_empty()
    }

    /// The `(severity, path, message)` triple surfaced to the hosting
    /// service.
    pub fn as_triple(&self) -> (&'static str, &str, &str) {
        (self.severity.as_str(), &self.path, &self.message)
    }
}

/// Ordered collection of diagnostics with idempotent insertion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticList {
    entries: Vec<Diagnostic>,
}

impl DiagnosticList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic, replacing any prior entry with the same
    /// `(code, path)` key in place.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|d| d.code == diagnostic.code && d.path == diagnostic.path)
        {
            *existing = diagnostic;
        } else {
            self.entries.push(diagnostic);
        }
    }

    /// Drop all non-persistent entries.
    pub fn clear_non_persistent(&mut self) {
        self.entries.retain(|d| d.is_persistent);
    }

    /// Drop every entry attached to `path`.
    pub fn remove_for_path(&mut self, path: &str) {
        self.entries.retain(|d| d.path != path);
    }

    /// Drop the entry with the given `(code, path)` key, if present.
    pub fn resolve(&mut self, code: &str, path: &str) {
        self.entries.retain(|d| !(d.code == code && d.path == path));
    }

    /// Re-key entries attached to `old_path` onto `new_path` after a
    /// rename.
    pub fn rekey_path(&mut self, old_path: &str, new_path: &str) {
        for d in &mut self.entries {
            if d.path == old_path {
                d.path = new_path.to_string();
            }
        }
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up by `(code, path)`.
    pub fn get(&self, code: &str, path: &str) -> Option<&Diagnostic> {
        self.entries
            .iter()
            .find(|d| d.code == code && d.path == path)
    }

    /// Fatal persistent entries gate readiness. `path_counts` decides
    /// whether a file-level entry still applies (e.g. the file was not
    /// removed in the meantime); workspace-level entries always apply.
    pub fn has_fatal_persistent<F>(&self, path_counts: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        self.entries.iter().any(|d| {
            d.severity == Severity::Fatal
                && d.is_persistent
                && (d.is_workspace_level() || path_counts(&d.path))
        })
    }

    /// Whether any warning applies, under the same path filter.
    pub fn has_warnings<F>(&self, path_counts: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        self.entries.iter().any(|d| {
            d.severity == Severity::Warning && (d.is_workspace_level() || path_counts(&d.path))
        })
    }

    /// All `(severity, path, message)` triples, in insertion order.
    pub fn triples(&self) -> Vec<(String, String, String)> {
        self.entries
            .iter()
            .map(|d| {
                (
                    d.severity.as_str().to_string(),
                    d.path.clone(),
                    d.message.clone(),
                )
            })
            .collect()
    }
}
