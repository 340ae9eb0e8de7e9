use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type GoalId = u64;

pub const DEFAULT_ASSET: &str = "images/default_balloon.png";

/// The goals document: an id counter plus the ordered goal list.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GoalFile {
    #[serde(default)]
    pub last_goal_id: GoalId,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Goal {
    pub id: GoalId,
    pub name: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_completed_date: DateTime<Utc>,
    #[serde(default)]
    pub frequency_days: f64,
    #[serde(default)]
    pub frequency_hours: f64,
    #[serde(default)]
    pub frequency_minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default)]
    pub audio_alert: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum GoalError {
    #[error("goal not found: {0}")]
    GoalNotFound(GoalId),
    #[error("unrecognized timestamp: {0}")]
    BadTimestamp(String),
    #[error("name and frequency must be specified")]
    MissingNameOrFrequency,
    #[error("frequency values must be non-negative")]
    NegativeFrequency,
}

impl Goal {
    pub fn new(id: GoalId, name: String, now: DateTime<Utc>) -> Self {
        Goal {
            id,
            name,
            last_completed_date: now,
            frequency_days: 0.0,
            frequency_hours: 0.0,
            frequency_minutes: 0.0,
            image_path: None,
            audio_alert: false,
        }
    }

    /// Combined cycle length in days.
    pub fn cycle_days(&self) -> f64 {
        self.frequency_days + self.frequency_hours / 24.0 + self.frequency_minutes / 1440.0
    }

    pub fn asset(&self) -> String {
        match self.image_path.as_deref() {
            Some(name) if !name.is_empty() => format!("images/{}", name),
            _ => DEFAULT_ASSET.to_string(),
        }
    }

    pub fn frequency_label(&self) -> String {
        let mut parts = Vec::new();
        if self.frequency_days != 0.0 {
            parts.push(format!("{}d", self.frequency_days));
        }
        if self.frequency_hours != 0.0 {
            parts.push(format!("{}h", self.frequency_hours));
        }
        if self.frequency_minutes != 0.0 {
            parts.push(format!("{}m", self.frequency_minutes));
        }
        if parts.is_empty() {
            return "0d".to_string();
        }
        parts.join(" ")
    }
}

impl GoalFile {
    pub fn next_id(&mut self) -> GoalId {
        self.last_goal_id += 1;
        self.last_goal_id
    }

    pub fn find(&self, id: GoalId) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn add_goal(&mut self, goal: Goal) {
        self.goals.push(goal);
    }

    pub fn update_goal<F>(&mut self, id: GoalId, f: F) -> Result<(), GoalError>
    where
        F: FnOnce(&mut Goal),
    {
        let goal = self
            .goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(GoalError::GoalNotFound(id))?;
        f(goal);
        Ok(())
    }

    pub fn reset_goal(&mut self, id: GoalId, now: DateTime<Utc>) -> Result<(), GoalError> {
        self.update_goal(id, |goal| goal.last_completed_date = now)
    }

    pub fn remove_goal(&mut self, id: GoalId) -> Result<Goal, GoalError> {
        let idx = self
            .goals
            .iter()
            .position(|g| g.id == id)
            .ok_or(GoalError::GoalNotFound(id))?;
        Ok(self.goals.remove(idx))
    }
}

pub fn validate_goal_input(
    name: &str,
    days: f64,
    hours: f64,
    minutes: f64,
) -> Result<(), GoalError> {
    if name.trim().is_empty() || (days == 0.0 && hours == 0.0 && minutes == 0.0) {
        return Err(GoalError::MissingNameOrFrequency);
    }
    if days < 0.0 || hours < 0.0 || minutes < 0.0 {
        return Err(GoalError::NegativeFrequency);
    }
    Ok(())
}

/// Accepts RFC 3339 timestamps as well as naive ISO timestamps (taken as
/// UTC), which is what older goals documents contain.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, GoalError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(GoalError::BadTimestamp(raw.to_string()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn cycle_length_combines_all_three_parts() {
        let mut goal = Goal::new(1, "Run".into(), at(0));
        goal.frequency_days = 1.0;
        goal.frequency_hours = 12.0;
        goal.frequency_minutes = 720.0;
        assert!((goal.cycle_days() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn id_counter_advances_and_sticks() {
        let mut file = GoalFile::default();
        assert_eq!(file.next_id(), 1);
        assert_eq!(file.next_id(), 2);
        assert_eq!(file.last_goal_id, 2);
    }

    #[test]
    fn missing_image_falls_back_to_default_asset() {
        let mut goal = Goal::new(1, "Read".into(), at(0));
        assert_eq!(goal.asset(), DEFAULT_ASSET);
        goal.image_path = Some(String::new());
        assert_eq!(goal.asset(), DEFAULT_ASSET);
        goal.image_path = Some("red_balloon.png".into());
        assert_eq!(goal.asset(), "images/red_balloon.png");
    }

    #[test]
    fn reset_restarts_the_cycle() {
        let mut file = GoalFile::default();
        file.add_goal(Goal::new(1, "Read".into(), at(0)));
        file.reset_goal(1, at(500)).unwrap();
        assert_eq!(file.find(1).unwrap().last_completed_date, at(500));
    }

    #[test]
    fn removing_unknown_goal_is_an_error() {
        let mut file = GoalFile::default();
        assert!(matches!(file.remove_goal(7), Err(GoalError::GoalNotFound(7))));
    }

    #[test]
    fn timestamps_parse_with_and_without_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T08:30:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T08:30:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-01T08:30:00.000000").unwrap(),
            expected
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn document_tolerates_unknown_fields_and_missing_optionals() {
        let raw = r#"{
            "last_goal_id": 3,
            "schema": "v2",
            "goals": [{
                "id": 3,
                "name": "Stretch",
                "last_completed_date": "2024-03-01T08:30:00",
                "frequency_days": 1,
                "color_hint": "blue"
            }]
        }"#;
        let file: GoalFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.goals.len(), 1);
        let goal = &file.goals[0];
        assert_eq!(goal.frequency_hours, 0.0);
        assert_eq!(goal.image_path, None);
        assert!(!goal.audio_alert);
    }

    #[test]
    fn validation_mirrors_the_entry_form() {
        assert!(validate_goal_input("Read", 1.0, 0.0, 0.0).is_ok());
        assert!(matches!(
            validate_goal_input("", 1.0, 0.0, 0.0),
            Err(GoalError::MissingNameOrFrequency)
        ));
        assert!(matches!(
            validate_goal_input("Read", 0.0, 0.0, 0.0),
            Err(GoalError::MissingNameOrFrequency)
        ));
        assert!(matches!(
            validate_goal_input("Read", 1.0, -2.0, 0.0),
            Err(GoalError::NegativeFrequency)
        ));
    }
}
