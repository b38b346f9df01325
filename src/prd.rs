//! Read-only view of the agent-owned task list (`prd.json`).
//!
//! A missing or unreadable task list counts as "nothing left to do", so a
//! corrupt `prd.json` ends the loop as if every story passed. The warning
//! logged in that case is the only trace of it.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub stories: Vec<Story>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Any truthy value marks a story done. Absent, `null`, `false`, `0`,
    /// `""`, `[]` and `{}` do not.
    #[serde(default)]
    pub passes: Value,
}

impl Story {
    pub fn is_done(&self) -> bool {
        is_truthy(&self.passes)
    }

    /// Human label: `id: title`, falling back to whichever is present.
    pub fn label(&self) -> String {
        let id = self.id.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        let title = self.title.as_deref().or(self.description.as_deref());
        match (id, title) {
            (Some(id), Some(title)) => format!("{id}: {title}"),
            (Some(id), None) => id,
            (None, Some(title)) => title.to_string(),
            (None, None) => "(unnamed story)".to_string(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

impl TaskList {
    /// Strict load, for reporting. Missing and malformed files are errors.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn has_incomplete(&self) -> bool {
        self.stories.iter().any(|s| !s.is_done())
    }

    pub fn done_count(&self) -> usize {
        self.stories.iter().filter(|s| s.is_done()).count()
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &Story> {
        self.stories.iter().filter(|s| !s.is_done())
    }
}

/// Whether the task list at `path` still has a story that does not pass.
///
/// Reads the file fresh on every call. Returns `false` when the file is
/// missing, cannot be parsed, or has no stories.
pub fn has_incomplete_tasks(path: &Path) -> bool {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "task list missing, treating as complete");
        return false;
    }
    match TaskList::load(path) {
        Ok(list) => {
            let incomplete = list.has_incomplete();
            tracing::debug!(
                total = list.stories.len(),
                done = list.done_count(),
                incomplete,
                "checked task list"
            );
            incomplete
        }
        Err(e) => {
            let error = format!("{e:#}");
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "task list unreadable, treating as complete"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_prd(dir: &Path, passes: &[bool]) -> std::path::PathBuf {
        let stories: Vec<Value> = passes
            .iter()
            .enumerate()
            .map(|(i, p)| {
                serde_json::json!({
                    "id": format!("US-{:03}", i + 1),
                    "title": format!("Story {}", i + 1),
                    "passes": p,
                })
            })
            .collect();
        let path = dir.join("prd.json");
        std::fs::write(&path, serde_json::json!({ "stories": stories }).to_string()).unwrap();
        path
    }

    #[test]
    fn all_passing_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_prd(dir.path(), &[true, true, true, true]);
        assert!(!has_incomplete_tasks(&path));
    }

    #[test]
    fn any_single_failing_story_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        for flipped in 0..4 {
            let mut passes = [true; 4];
            passes[flipped] = false;
            let path = write_prd(dir.path(), &passes);
            assert!(has_incomplete_tasks(&path), "story {flipped} flipped");
        }
    }

    #[test]
    fn missing_passes_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prd.json");
        std::fs::write(&path, r#"{"stories":[{"id":"US-001","passes":true},{"id":"US-002"}]}"#)
            .unwrap();
        assert!(has_incomplete_tasks(&path));
    }

    #[test]
    fn truthy_non_boolean_passes_is_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prd.json");
        std::fs::write(&path, r#"{"stories":[{"id":"A","passes":1},{"id":"B","passes":"yes"}]}"#)
            .unwrap();
        assert!(!has_incomplete_tasks(&path));

        let list =
            TaskList::parse(r#"{"stories":[{"passes":[1]},{"passes":{"ok":true}},{"passes":0.5}]}"#)
                .unwrap();
        assert_eq!(list.done_count(), 3);
    }

    #[test]
    fn falsy_passes_is_incomplete() {
        let list = TaskList::parse(
            r#"{"stories":[
                {"passes":null},{"passes":false},{"passes":0},{"passes":0.0},
                {"passes":""},{"passes":[]},{"passes":{}}
            ]}"#,
        )
        .unwrap();
        assert!(list.has_incomplete());
        assert_eq!(list.done_count(), 0);
        assert_eq!(list.incomplete().count(), 7);
    }

    #[test]
    fn missing_file_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_incomplete_tasks(&dir.path().join("prd.json")));
    }

    #[test]
    fn invalid_json_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prd.json");
        std::fs::write(&path, "{ \"stories\": [ {\"passes\": false ").unwrap();
        assert!(!has_incomplete_tasks(&path));
    }

    #[test]
    fn wrong_shape_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prd.json");
        std::fs::write(&path, r#"[{"passes": false}]"#).unwrap();
        assert!(!has_incomplete_tasks(&path));
        std::fs::write(&path, r#"{"stories": "none"}"#).unwrap();
        assert!(!has_incomplete_tasks(&path));
    }

    #[test]
    fn empty_or_absent_stories_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prd.json");
        std::fs::write(&path, r#"{"stories": []}"#).unwrap();
        assert!(!has_incomplete_tasks(&path));
        std::fs::write(&path, r#"{"project": "demo"}"#).unwrap();
        assert!(!has_incomplete_tasks(&path));
    }

    #[test]
    fn reads_fresh_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_prd(dir.path(), &[true, false]);
        assert!(has_incomplete_tasks(&path));
        write_prd(dir.path(), &[true, true]);
        assert!(!has_incomplete_tasks(&path));
    }

    #[test]
    fn labels() {
        let list = TaskList::parse(
            r#"{"stories":[
                {"id":"US-001","title":"Login","passes":false},
                {"id":7,"passes":false},
                {"description":"Fix footer","passes":false},
                {"passes":false}
            ]}"#,
        )
        .unwrap();
        let labels: Vec<String> = list.incomplete().map(Story::label).collect();
        assert_eq!(labels, vec!["US-001: Login", "7", "Fix footer", "(unnamed story)"]);
    }

    #[test]
    fn strict_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TaskList::load(&dir.path().join("prd.json")).is_err());
    }
}
