//! Registry linting - static analysis of resource registry files.
//!
//! Unlike [`SchemaRegistry::new`](crate::SchemaRegistry::new), which stops at
//! the first problem, the linter reports every finding:
//! - JSON syntax and shape errors
//! - Relationship targets that are not registered
//! - Includable names that are not relationships
//! - Duplicate types and attribute/relationship clashes
//! - Names that do not survive a wire-case round trip

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::format_key;
use crate::loader::load_json;
use crate::types::{json_type_name, CaseConvention, Direction, ResourceSchema};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/resources/0/relationships/author")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }

    /// Whether the run succeeds; in strict mode warnings fail it too.
    pub fn passes(&self, strict: bool) -> bool {
        self.is_ok() && !(strict && self.warnings > 0)
    }
}

/// Lint a registry file or a directory of them.
///
/// If `strict` is true, files with warnings count as failed.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let results: Vec<FileResult> = registry_files(path)
        .iter()
        .map(|file| lint_file(file, path))
        .collect();

    let failed = results.iter().filter(|r| r.fails(strict)).count();
    let tally = |severity| -> usize { results.iter().map(|r| r.count(severity)).sum() };

    LintResult {
        path: path.to_path_buf(),
        files_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors: tally(Severity::Error),
        warnings: tally(Severity::Warning),
        results,
    }
}

impl FileResult {
    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn fails(&self, strict: bool) -> bool {
        match self.status {
            FileStatus::Ok => false,
            FileStatus::Warning => strict,
            FileStatus::Error => true,
        }
    }
}

/// Lint a single registry file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut sink = Sink {
        file: file.to_path_buf(),
        diagnostics: Vec::new(),
    };

    match load_json(file) {
        Ok(value) => check_registry(&value, &mut sink),
        Err(e) => sink.error("E001", "/", format!("syntax error: {}", e)),
    }

    let diagnostics = sink.diagnostics;
    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.is_empty() {
        FileStatus::Ok
    } else {
        FileStatus::Warning
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

struct Sink {
    file: PathBuf,
    diagnostics: Vec<Diagnostic>,
}

impl Sink {
    fn push(&mut self, severity: Severity, code: &str, path: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: self.file.clone(),
            path: path.to_string(),
            message,
        });
    }

    fn error(&mut self, code: &str, path: &str, message: String) {
        self.push(Severity::Error, code, path, message);
    }

    fn warning(&mut self, code: &str, path: &str, message: String) {
        self.push(Severity::Warning, code, path, message);
    }
}

fn check_registry(value: &Value, sink: &mut Sink) {
    let Some(entries) = value.get("resources").and_then(Value::as_array) else {
        let actual = value
            .get("resources")
            .map(json_type_name)
            .unwrap_or("nothing");
        sink.error(
            "E001",
            "/resources",
            format!("expected an array of resources, got {}", actual),
        );
        return;
    };

    // Shape first, so cross-references are checked against every parsable entry.
    let mut schemas: Vec<(usize, ResourceSchema)> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match ResourceSchema::deserialize(entry) {
            Ok(schema) => schemas.push((i, schema)),
            Err(e) => sink.error("E001", &format!("/resources/{}", i), format!("invalid resource: {}", e)),
        }
    }

    let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, schema) in &schemas {
        if let Some(first) = first_seen.insert(schema.type_name.as_str(), *i) {
            sink.error(
                "E004",
                &format!("/resources/{}/type", i),
                format!(
                    "type \"{}\" already registered at /resources/{}",
                    schema.type_name, first
                ),
            );
        }
    }
    let known: BTreeSet<&str> = first_seen.keys().copied().collect();

    for (i, schema) in &schemas {
        check_schema(*i, schema, &known, sink);
    }
}

fn check_schema(i: usize, schema: &ResourceSchema, known: &BTreeSet<&str>, sink: &mut Sink) {
    let base = format!("/resources/{}", i);

    check_name(&format!("{}/type", base), &schema.type_name, sink);
    if schema.attributes.is_empty() {
        sink.warning(
            "W002",
            &format!("{}/attributes", base),
            format!("resource \"{}\" declares no attributes", schema.type_name),
        );
    }
    for name in &schema.attributes {
        check_name(&format!("{}/attributes", base), name, sink);
    }

    for (name, rel) in &schema.relationships {
        let path = format!("{}/relationships/{}", base, name);
        check_name(&path, name, sink);
        if !known.contains(rel.target.as_str()) {
            sink.error(
                "E002",
                &format!("{}/target", path),
                format!("relationship target \"{}\" is not registered", rel.target),
            );
        }
        if schema.attributes.contains(name) {
            sink.error(
                "E005",
                &path,
                format!("\"{}\" is both an attribute and a relationship", name),
            );
        }
    }

    for name in schema.includable.iter().flatten() {
        if !schema.relationships.contains_key(name) {
            sink.error(
                "E003",
                &format!("{}/includable", base),
                format!("includable \"{}\" is not a relationship", name),
            );
        }
    }
}

/// Warn when a name would not come back unchanged from the wire.
fn check_name(path: &str, name: &str, sink: &mut Sink) {
    let broken: Vec<&str> = CaseConvention::ALL
        .iter()
        .filter(|convention| {
            let wire = format_key(name, Direction::ToWire, **convention);
            format_key(&wire, Direction::FromWire, **convention) != name
        })
        .map(CaseConvention::as_str)
        .collect();

    if !broken.is_empty() {
        sink.warning(
            "W001",
            path,
            format!(
                "name \"{}\" does not round-trip under {}; use lowercase snake_case",
                name,
                broken.join(", ")
            ),
        );
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// `.json` files under `path`, sorted; `path` itself when it is one.
fn registry_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_json(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                pending.push(entry_path);
            } else if is_json(&entry_path) {
                files.push(entry_path);
            }
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, Builder};

    fn registry_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    fn codes(result: &FileResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn lint_valid_registry() {
        let file = registry_file(
            r#"{"resources": [
                {"type": "users", "attributes": ["first_name"],
                 "relationships": {"posts": {"target": "posts", "many": true}},
                 "includable": ["posts"]},
                {"type": "posts", "attributes": ["title"],
                 "relationships": {"author": {"target": "users"}}}
            ]}"#,
        );
        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let file = registry_file("{ not valid json }");
        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(codes(&result), vec!["E001"]);
    }

    #[test]
    fn lint_bad_shape_continues_with_other_entries() {
        let file = registry_file(
            r#"{"resources": [
                {"attributes": ["x"]},
                {"type": "users", "attributes": ["x"],
                 "relationships": {"team": {"target": "teams"}}}
            ]}"#,
        );
        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(codes(&result), vec!["E001", "E002"]);
    }

    #[test]
    fn lint_reports_every_problem() {
        let file = registry_file(
            r#"{"resources": [
                {"type": "users", "attributes": ["manager"],
                 "relationships": {"manager": {"target": "users"}},
                 "includable": ["email", "avatar"]},
                {"type": "users", "attributes": ["x"]}
            ]}"#,
        );
        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Error);
        let codes = codes(&result);
        assert!(codes.contains(&"E004"));
        assert!(codes.contains(&"E005"));
        assert_eq!(codes.iter().filter(|c| **c == "E003").count(), 2);
    }

    #[test]
    fn lint_warns_on_non_round_trip_names() {
        let file = registry_file(r#"{"resources": [{"type": "users", "attributes": ["firstName"]}]}"#);
        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(result.status, FileStatus::Warning);
        assert!(result.diagnostics[0].message.contains("camelize"));
        assert_eq!(result.diagnostics[0].code, "W001");
    }

    #[test]
    fn lint_warns_on_empty_attributes() {
        let file = registry_file(r#"{"resources": [{"type": "tags"}]}"#);
        let result = lint_file(file.path(), file.path().parent().unwrap());
        assert_eq!(codes(&result), vec!["W002"]);
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("valid.json"),
            r#"{"resources": [{"type": "users", "attributes": ["email"]}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("invalid.json"), "{ not json }").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_strict_mode() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("registry.json");
        std::fs::write(&file_path, r#"{"resources": [{"type": "tags"}]}"#).unwrap();

        let result = lint(&file_path, false);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 0);
        assert!(result.passes(false));

        let result = lint(&file_path, true);
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
        assert!(!result.passes(true));
    }

    #[test]
    fn errors_fail_in_both_modes() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("registry.json");
        std::fs::write(&file_path, r#"{"resources": 5}"#).unwrap();

        assert!(!lint(&file_path, false).passes(false));
        assert!(!lint(&file_path, true).passes(true));
    }
}
