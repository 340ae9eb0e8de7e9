use crate::model::GoalFile;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalsScope {
    Project,
    Global,
    External,
}

impl GoalsScope {
    pub fn label(self) -> &'static str {
        match self {
            GoalsScope::Project => "project",
            GoalsScope::Global => "global",
            GoalsScope::External => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoalsLocation {
    pub path: PathBuf,
    pub scope: GoalsScope,
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid goals document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unknown fields are ignored; a missing `goals` key yields an empty
/// document.
pub fn parse_document(text: &str) -> Result<GoalFile, ParseError> {
    Ok(serde_json::from_str(text)?)
}

pub fn init_project_goals() -> Result<GoalsLocation> {
    let cwd = std::env::current_dir()?;
    let dir = cwd.join(".goalboard");
    fs::create_dir_all(&dir).context("failed to create .goalboard directory")?;
    let location = GoalsLocation {
        path: dir.join("goals.json"),
        scope: GoalsScope::Project,
    };
    if !location.path.exists() {
        save_goals(&location, &GoalFile::default())?;
    }
    Ok(location)
}

pub fn locate_goals(start: &Path) -> Result<GoalsLocation> {
    if let Some(project_path) = find_project_goals(start) {
        return Ok(GoalsLocation {
            path: project_path,
            scope: GoalsScope::Project,
        });
    }
    Ok(GoalsLocation {
        path: global_goals_path()?,
        scope: GoalsScope::Global,
    })
}

pub fn load_goals(location: &GoalsLocation) -> Result<GoalFile> {
    if location.path.exists() {
        read_document(&location.path)
    } else {
        let file = GoalFile::default();
        save_goals(location, &file)?;
        Ok(file)
    }
}

pub fn read_document(path: &Path) -> Result<GoalFile> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let file = parse_document(&data).with_context(|| format!("parsing {:?}", path))?;
    Ok(file)
}

pub fn save_goals(location: &GoalsLocation, file: &GoalFile) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_json::to_string_pretty(file).context("serializing goals")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    Ok(())
}

fn find_project_goals(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(".goalboard/goals.json");
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_goals_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "goalboard").context("locating data directory")?;
    Ok(dirs.data_dir().join("goals.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_text_is_a_parse_error() {
        assert!(parse_document("{not json").is_err());
        assert!(parse_document("").is_err());
        assert!(parse_document(r#"{"goals": "nope"}"#).is_err());
    }

    #[test]
    fn missing_or_empty_goal_list_is_not_an_error() {
        let empty = parse_document("{}").unwrap();
        assert!(empty.goals.is_empty());
        assert_eq!(empty.last_goal_id, 0);

        let explicit = parse_document(r#"{"goals": []}"#).unwrap();
        assert!(explicit.goals.is_empty());
    }

    #[test]
    fn documents_round_trip_through_save_format() {
        let raw = r#"{
            "last_goal_id": 2,
            "goals": [
                {"id": 1, "name": "Read", "last_completed_date": "2024-03-01T08:30:00Z", "frequency_days": 2},
                {"id": 2, "name": "Run", "last_completed_date": "2024-03-02T09:00:00Z", "frequency_hours": 12, "audio_alert": true}
            ]
        }"#;
        let file = parse_document(raw).unwrap();
        let serialized = serde_json::to_string_pretty(&file).unwrap();
        let reparsed = parse_document(&serialized).unwrap();
        assert_eq!(reparsed.last_goal_id, 2);
        assert_eq!(reparsed.goals.len(), 2);
        assert_eq!(reparsed.goals[1].name, "Run");
        assert!(reparsed.goals[1].audio_alert);
    }
}
