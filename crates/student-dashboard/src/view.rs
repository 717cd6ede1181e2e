//! Localized view model for the dashboard page.
//!
//! Rendering is split from the controller so the same model can be printed
//! as text, serialized as JSON, or turned into an adaptive card.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Assignment, WellbeingScores};

pub const CONTEXT_LOADING: &str = "Loading Teams context...";
pub const NAME_LOADING: &str = "Loading...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Th,
}

impl Language {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::En),
            "th" | "thai" => Some(Self::Th),
            _ => None,
        }
    }

    /// Maps a host locale such as `en-us` or `th-TH` onto a supported language.
    pub fn from_locale(locale: &str) -> Option<Self> {
        let primary = locale.split(['-', '_']).next().unwrap_or_default();
        Self::parse(primary)
    }

    fn pick(self, en: &'static str, th: &'static str) -> &'static str {
        match self {
            Language::En => en,
            Language::Th => th,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardView {
    Loading { message: String },
    Ready(DashboardPage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardPage {
    pub student_name: String,
    pub course_label: String,
    pub wellbeing: Vec<WellbeingCard>,
    pub reflection: ReflectionPanel,
    pub progress: ProgressChart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WellbeingDimension {
    Heart,
    Power,
    Wisdom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WellbeingCard {
    pub dimension: WellbeingDimension,
    pub label: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReflectionPanel {
    pub title: String,
    pub placeholder: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressChart {
    pub title: String,
    pub series_name: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub due_date_time: Option<String>,
    pub completion_rate: Option<f64>,
}

/// Inputs for one page render.
pub struct PageInput<'a> {
    pub language: Language,
    pub student_name: Option<&'a str>,
    pub course_label: &'a str,
    pub scores: WellbeingScores,
    pub reflection_text: &'a str,
    pub assignments: &'a [Assignment],
}

impl DashboardView {
    pub fn loading() -> Self {
        DashboardView::Loading {
            message: CONTEXT_LOADING.to_string(),
        }
    }

    pub fn page(input: PageInput<'_>) -> Self {
        let lang = input.language;
        let wellbeing = vec![
            WellbeingCard {
                dimension: WellbeingDimension::Heart,
                label: lang.pick("Heart (Love)", "หัวใจ (ความรัก)").to_string(),
                score: input.scores.heart(),
            },
            WellbeingCard {
                dimension: WellbeingDimension::Power,
                label: lang.pick("Power (Body)", "พลัง (ร่างกาย)").to_string(),
                score: input.scores.power(),
            },
            WellbeingCard {
                dimension: WellbeingDimension::Wisdom,
                label: lang.pick("Wisdom (Mind)", "ปัญญา (จิตใจ)").to_string(),
                score: input.scores.wisdom(),
            },
        ];
        // Server order is kept; the chart never re-sorts by due date.
        let points = input
            .assignments
            .iter()
            .map(|assignment| ChartPoint {
                due_date_time: assignment.due_date_time.clone(),
                completion_rate: assignment.completion_rate,
            })
            .collect();
        DashboardView::Ready(DashboardPage {
            student_name: input
                .student_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(NAME_LOADING)
                .to_string(),
            course_label: input.course_label.to_string(),
            wellbeing,
            reflection: ReflectionPanel {
                title: lang
                    .pick("Weekly Reflection", "การสะท้อนรายสัปดาห์")
                    .to_string(),
                placeholder: lang
                    .pick(
                        "Write your weekly reflection here...",
                        "เขียนการสะท้อนประจำสัปดาห์ของคุณที่นี่...",
                    )
                    .to_string(),
                text: input.reflection_text.to_string(),
            },
            progress: ProgressChart {
                title: lang
                    .pick("Course Progress", "ความก้าวหน้าในรายวิชา")
                    .to_string(),
                series_name: lang.pick("Completion", "ความสำเร็จ").to_string(),
                points,
            },
        })
    }

    pub fn as_page(&self) -> Option<&DashboardPage> {
        match self {
            DashboardView::Ready(page) => Some(page),
            DashboardView::Loading { .. } => None,
        }
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page = match self {
            DashboardView::Loading { message } => return writeln!(f, "{message}"),
            DashboardView::Ready(page) => page,
        };
        writeln!(f, "{}", page.student_name)?;
        writeln!(f, "{}", page.course_label)?;
        writeln!(f)?;
        for card in &page.wellbeing {
            writeln!(f, "{}: {}/10", card.label, card.score)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", page.reflection.title)?;
        if page.reflection.text.is_empty() {
            writeln!(f, "  {}", page.reflection.placeholder)?;
        } else {
            writeln!(f, "  {}", page.reflection.text)?;
        }
        writeln!(f)?;
        writeln!(f, "{} ({})", page.progress.title, page.progress.series_name)?;
        for point in &page.progress.points {
            let due = point.due_date_time.as_deref().unwrap_or("-");
            match point.completion_rate {
                Some(rate) => writeln!(f, "  {due}  {rate:.2}")?,
                None => writeln!(f, "  {due}  -")?,
            }
        }
        Ok(())
    }
}
