//! Static reference checking over schema files.
//!
//! Each `.json` file is fully resolved against the directory it lives in.
//! Any resolution failure is reported as an error diagnostic:
//! - E001: invalid JSON or non-schema document
//! - E002: referenced definition, file, or URL not found
//! - E003: circular reference
//! - E004: read or network failure
//!
//! `$ref` nodes with sibling keywords other than `title` get a W001 warning,
//! since the referent overwrites any keyword it also defines.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, ResolveError};
use crate::loader::{load_schema, AutoLoader};
use crate::resolver::resolve;
use crate::schema::{DEFINITIONS, ITEMS, PROPERTIES, REF, TITLE};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A finding in one file.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// Pointer to the offending node, e.g. `/properties/id`
    pub path: String,
    pub message: String,
}

/// Result of checking a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a checked file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Totals over every file under the checked path.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub files_checked: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl CheckResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Check a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// Returns aggregated results for all files.
pub fn check(path: &Path) -> CheckResult {
    let files = collect_schema_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| check_file(file, path)).collect();

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);
    let failed = results
        .iter()
        .filter(|r| r.status == FileStatus::Error)
        .count();

    CheckResult {
        files_checked: files.len(),
        failed,
        errors,
        warnings,
        results,
    }
}

/// Check a single schema file.
pub fn check_file(file: &Path, base_path: &Path) -> FileResult {
    let display = match file.strip_prefix(base_path) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => file.to_path_buf(),
    };
    let mut diagnostics = Vec::new();

    let mut schema = match load_schema(file) {
        Ok(s) => s,
        Err(e) => {
            diagnostics.push(error_diagnostic(&e));
            return FileResult {
                file: display,
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    check_siblings(schema.as_map(), "", &mut diagnostics);

    let file_dir = file.parent().unwrap_or(Path::new("."));
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let result = AutoLoader::new(file_dir).and_then(|loader| resolve(&mut schema, &loader, &file_name));
    if let Err(e) = result {
        diagnostics.push(error_diagnostic(&e));
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

fn error_diagnostic(error: &ResolveError) -> Diagnostic {
    let code = match error.kind() {
        ErrorKind::Decode => "E001",
        ErrorKind::NotFound => "E002",
        ErrorKind::Cycle => "E003",
        ErrorKind::Io => "E004",
    };

    Diagnostic {
        severity: Severity::Error,
        code,
        path: "/".to_string(),
        message: error.to_string(),
    }
}

/// Warn on keywords next to `$ref` that a referent could overwrite.
fn check_siblings(node: &Map<String, Value>, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if node.contains_key(REF) {
        let siblings: Vec<&str> = node
            .keys()
            .map(String::as_str)
            .filter(|k| *k != REF && !k.eq_ignore_ascii_case(TITLE))
            .collect();

        if !siblings.is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                code: "W001",
                path: if path.is_empty() { "/".to_string() } else { path.to_string() },
                message: format!(
                    "keywords next to $ref may be overwritten by the referenced schema: {}",
                    siblings.join(", ")
                ),
            });
        }
    }

    for keyword in [PROPERTIES, DEFINITIONS] {
        if let Some(children) = node.get(keyword).and_then(Value::as_object) {
            for (name, child) in children {
                if let Value::Object(child) = child {
                    let child_path = format!("{}/{}/{}", path, keyword, name);
                    check_siblings(child, &child_path, diagnostics);
                }
            }
        }
    }

    if let Some(Value::Object(items)) = node.get(ITEMS) {
        check_siblings(items, &format!("{}/{}", path, ITEMS), diagnostics);
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
