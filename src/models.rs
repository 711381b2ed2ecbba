use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subgroup marker parsed from a `(1)` / `(2)` subject suffix.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum Subgroup {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "1")]
    First,
    #[serde(rename = "2")]
    Second,
}

/// One table row of a schedule. Empty strings mean the column was absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Lesson {
    #[schema(example = "1")]
    pub number: String,
    #[schema(example = "08:30 - 10:00")]
    pub time: String,
    #[schema(example = "Математика")]
    pub subject: String,
    #[schema(example = "А-12")]
    pub room: String,
    pub location: String,
    pub group: String,
    pub subgroup: Subgroup,
    pub teacher: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct DaySchedule {
    /// Date header exactly as the site renders it.
    #[schema(example = "19 февраля 2024, понедельник")]
    pub date: String,
    pub lessons: Vec<Lesson>,
    /// Link to the site's own view of this day.
    pub href: String,
}

pub type WeekSchedule = Vec<DaySchedule>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ScheduleOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Announcement {
    pub path: String,
    pub title: String,
    pub date: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AnnouncementsPage {
    pub announcements: Vec<Announcement>,
    pub last_page: u32,
}
