use serde::{Deserialize, Serialize};

use crate::config::ContainerKind;
use crate::error::{AdapterError, AdapterResult};

/// Context handed out by the Teams host for the current tab.
///
/// Accepts both the v1 flat shape (`locale` at the top level) and the v2
/// nested shape (`app.locale`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostContext {
    #[serde(default)]
    pub team: Option<TeamInfo>,
    #[serde(default)]
    pub channel: Option<ChannelInfo>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub app: Option<AppInfo>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamInfo {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub internal_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub login_hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    #[serde(default)]
    pub locale: Option<String>,
}

impl HostContext {
    pub fn group_id(&self) -> Option<&str> {
        self.team
            .as_ref()
            .and_then(|team| team.group_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel
            .as_ref()
            .and_then(|channel| channel.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn locale(&self) -> Option<&str> {
        self.app
            .as_ref()
            .and_then(|app| app.locale.as_deref())
            .or(self.locale.as_deref())
    }

    /// Resolves the assignment container for this tab. Education classes
    /// share their id with the backing group, so both variants key off
    /// `team.groupId`.
    pub fn container(&self, kind: ContainerKind) -> AdapterResult<Container> {
        let group_id = self.group_id().ok_or_else(|| {
            AdapterError::HostUnavailable("context has no team.groupId".to_string())
        })?;
        Ok(match kind {
            ContainerKind::Class => Container::Class {
                class_id: group_id.to_string(),
            },
            ContainerKind::Team => Container::Team {
                team_id: group_id.to_string(),
            },
        })
    }
}

/// Parent grouping that assignments are scoped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Container {
    Class { class_id: String },
    Team { team_id: String },
}

impl Container {
    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Class { .. } => ContainerKind::Class,
            Container::Team { .. } => ContainerKind::Team,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Container::Class { class_id } => class_id,
            Container::Team { team_id } => team_id,
        }
    }
}

/// One unit of coursework. The class endpoint uses `id`/`displayName`/
/// `dueDateTime`; the team endpoint reports `assignmentId`/`title`/`dueDate`.
/// Payloads carrying both spellings keep the class-endpoint value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawAssignment")]
pub struct Assignment {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub due_date_time: Option<String>,
    pub completion_rate: Option<f64>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssignment {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    assignment_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    due_date_time: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    completion_rate: Option<f64>,
    #[serde(default)]
    status: Option<String>,
}

impl From<RawAssignment> for Assignment {
    fn from(raw: RawAssignment) -> Self {
        Self {
            id: raw.id.or(raw.assignment_id),
            display_name: raw.display_name.or(raw.title),
            due_date_time: raw.due_date_time.or(raw.due_date),
            completion_rate: raw.completion_rate,
            status: raw.status,
        }
    }
}

/// Signed-in student, from either `/education/me` or `/me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub primary_role: Option<String>,
    #[serde(default)]
    pub student: Option<StudentInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub student_number: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub submitted_date_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationClass {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub class_code: Option<String>,
}

/// Weekly reflection text typed into the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectionDraft {
    text: String,
}

impl ReflectionDraft {
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub const MAX_SCORE: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScores")]
pub struct WellbeingScores {
    heart: u8,
    power: u8,
    wisdom: u8,
}

#[derive(Deserialize)]
struct RawScores {
    heart: u8,
    power: u8,
    wisdom: u8,
}

impl TryFrom<RawScores> for WellbeingScores {
    type Error = AdapterError;

    fn try_from(raw: RawScores) -> AdapterResult<Self> {
        Self::new(raw.heart, raw.power, raw.wisdom)
    }
}

impl WellbeingScores {
    pub fn new(heart: u8, power: u8, wisdom: u8) -> AdapterResult<Self> {
        for (name, value) in [("heart", heart), ("power", power), ("wisdom", wisdom)] {
            if value > MAX_SCORE {
                return Err(AdapterError::InvalidInput(format!(
                    "{name} score {value} exceeds {MAX_SCORE}"
                )));
            }
        }
        Ok(Self {
            heart,
            power,
            wisdom,
        })
    }

    pub fn heart(&self) -> u8 {
        self.heart
    }

    pub fn power(&self) -> u8 {
        self.power
    }

    pub fn wisdom(&self) -> u8 {
        self.wisdom
    }
}

impl Default for WellbeingScores {
    fn default() -> Self {
        Self {
            heart: 8,
            power: 7,
            wisdom: 9,
        }
    }
}

/// Facts posted to a channel as an adaptive card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFacts {
    pub meditation_minutes: u32,
    pub reflection_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_reads_nested_locale_first() {
        let ctx: HostContext = serde_json::from_value(json!({
            "team": {"groupId": "G1"},
            "app": {"locale": "en-us"},
            "locale": "th-th"
        }))
        .unwrap();
        assert_eq!(ctx.group_id(), Some("G1"));
        assert_eq!(ctx.locale(), Some("en-us"));
    }

    #[test]
    fn container_requires_group_id() {
        let ctx = HostContext::default();
        let err = ctx.container(ContainerKind::Team).unwrap_err();
        assert!(matches!(err, AdapterError::HostUnavailable(_)));

        let ctx: HostContext =
            serde_json::from_value(json!({"team": {"groupId": "G1"}})).unwrap();
        assert_eq!(
            ctx.container(ContainerKind::Class).unwrap(),
            Container::Class {
                class_id: "G1".into()
            }
        );
    }

    #[test]
    fn team_assignment_shape_maps_onto_class_fields() {
        let a: Assignment = serde_json::from_value(json!({
            "assignmentId": "a-1",
            "title": "Essay",
            "dueDate": "2024-02-01",
            "completionRate": 0.25
        }))
        .unwrap();
        assert_eq!(a.id.as_deref(), Some("a-1"));
        assert_eq!(a.display_name.as_deref(), Some("Essay"));
        assert_eq!(a.due_date_time.as_deref(), Some("2024-02-01"));
        assert_eq!(a.completion_rate, Some(0.25));
    }

    #[test]
    fn both_spellings_keep_class_values() {
        let a: Assignment = serde_json::from_value(json!({
            "id": "a",
            "assignmentId": "legacy",
            "displayName": "Journal",
            "title": "Old title",
            "dueDateTime": "2024-01-01",
            "dueDate": "2023-12-31",
            "completionRate": 0.5
        }))
        .unwrap();
        assert_eq!(a.id.as_deref(), Some("a"));
        assert_eq!(a.display_name.as_deref(), Some("Journal"));
        assert_eq!(a.due_date_time.as_deref(), Some("2024-01-01"));
        assert_eq!(a.completion_rate, Some(0.5));
    }

    #[test]
    fn deserialized_scores_are_bounded() {
        let err = serde_json::from_value::<WellbeingScores>(json!({
            "heart": 200, "power": 7, "wisdom": 9
        }))
        .unwrap_err();
        assert!(err.to_string().contains("heart score 200 exceeds 10"));

        let scores: WellbeingScores =
            serde_json::from_value(json!({"heart": 10, "power": 0, "wisdom": 3})).unwrap();
        assert_eq!((scores.heart(), scores.power(), scores.wisdom()), (10, 0, 3));
    }

    #[test]
    fn scores_are_bounded() {
        assert!(WellbeingScores::new(10, 0, 5).is_ok());
        let err = WellbeingScores::new(11, 0, 5).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn whitespace_draft_is_blank() {
        let mut draft = ReflectionDraft::default();
        assert!(draft.is_blank());
        draft.set_text("  \n ");
        assert!(draft.is_blank());
        draft.set_text("grateful for today");
        assert!(!draft.is_blank());
    }

    #[test]
    fn card_facts_use_camel_case() {
        let facts = CardFacts {
            meditation_minutes: 15,
            reflection_complete: true,
        };
        let value = serde_json::to_value(facts).unwrap();
        assert_eq!(
            value,
            json!({"meditationMinutes": 15, "reflectionComplete": true})
        );
    }
}
