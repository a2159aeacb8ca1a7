//! Structured Feedback Module
//!
//! Machine-readable rendering of a package check:
//! - JSON diagnostics with resolved positions
//! - Instantiated generic combinations and struct layouts
//! - Struct declaration order

use std::collections::BTreeMap;

use serde::Serialize;

use crate::sema::diagnostic::Position;
use crate::sema::{PackageReport, Severity, StructInstance};
use crate::types::Type;

// ==================== Structured Diagnostic Report ====================

/// One diagnostic, positioned
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    #[serde(flatten)]
    pub position: Position,
    pub severity: Severity,
    /// Stable message key (e.g. "incompatible_types")
    pub key: String,
    pub message: String,
}

/// Outcome of one file
#[derive(Debug, Clone, Serialize)]
pub struct FileFeedback {
    pub path: String,
    /// Lexer or parser error that removed the file from the check
    pub fatal: Option<DiagnosticReport>,
    pub diagnostics: Vec<DiagnosticReport>,
}

// ==================== Check Feedback ====================

/// Complete feedback of a package check
#[derive(Debug, Clone, Serialize)]
pub struct CheckFeedback {
    pub success: bool,
    pub files: Vec<FileFeedback>,
    pub combines: BTreeMap<String, Vec<Vec<Type>>>,
    pub struct_order: Vec<String>,
    pub instances: Vec<StructInstance>,
    pub stats: CheckStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckStats {
    pub file_count: usize,
    pub error_count: usize,
    pub info_count: usize,
    pub instance_count: usize,
}

impl CheckFeedback {
    pub fn from_report(report: &PackageReport) -> Self {
        let mut stats = CheckStats {
            file_count: report.files.len(),
            instance_count: report.instances.len(),
            ..CheckStats::default()
        };

        let files: Vec<FileFeedback> = report
            .files
            .iter()
            .map(|file| {
                let fatal = file.fatal.as_ref().map(|err| {
                    let (row, column) = file.lines.position(err.span().start);
                    DiagnosticReport {
                        position: Position {
                            path: file.path.clone(),
                            row,
                            column,
                        },
                        severity: Severity::Error,
                        key: "syntax_error".to_string(),
                        message: err.to_string(),
                    }
                });
                let diagnostics = file
                    .diagnostics
                    .iter()
                    .map(|d| DiagnosticReport {
                        position: d.position(&file.path, &file.lines),
                        severity: d.severity(),
                        key: d.key().to_string(),
                        message: d.kind.to_string(),
                    })
                    .collect::<Vec<_>>();
                FileFeedback {
                    path: file.path.clone(),
                    fatal,
                    diagnostics,
                }
            })
            .collect();

        for file in &files {
            let all = file.fatal.iter().chain(file.diagnostics.iter());
            for d in all {
                match d.severity {
                    Severity::Error => stats.error_count += 1,
                    Severity::Info => stats.info_count += 1,
                }
            }
        }

        Self {
            success: stats.error_count == 0,
            files,
            combines: report.combines.clone(),
            struct_order: report.struct_order.clone(),
            instances: report.instances.clone(),
            stats,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Output as compact JSON (one line)
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::{check_package, CheckOptions};
    use pretty_assertions::assert_eq;

    fn feedback(src: &str) -> CheckFeedback {
        let sources = vec![("main.jn".to_string(), src.to_string())];
        CheckFeedback::from_report(&check_package(&sources, &CheckOptions::default()))
    }

    #[test]
    fn test_clean_package() {
        let fb = feedback("fn main() { let x: int = 1 + 2\n println(x) }");
        assert!(fb.success);
        assert_eq!(fb.stats.error_count, 0);
        assert_eq!(fb.files[0].diagnostics.len(), 0);
    }

    #[test]
    fn test_diagnostic_positions() {
        let fb = feedback("fn main() {\n    let x: int = \"s\"\n    println(x)\n}");
        assert!(!fb.success);
        let d = &fb.files[0].diagnostics[0];
        assert_eq!(d.key, "incompatible_types");
        assert_eq!(d.position.row, 2);
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn test_fatal_is_reported() {
        let fb = feedback("fn (");
        assert!(!fb.success);
        assert_eq!(fb.stats.error_count, 1);
        assert!(fb.files[0].fatal.is_some());
    }

    #[test]
    fn test_json_output() {
        let fb = feedback("fn main() { }");
        let value: serde_json::Value = serde_json::from_str(&fb.to_json()).unwrap();
        assert_eq!(value["success"], serde_json::Value::Bool(true));
        assert_eq!(value["files"][0]["path"], serde_json::Value::from("main.jn"));
        assert!(!fb.to_json_compact().contains('\n'));
    }
}
