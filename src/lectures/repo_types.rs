use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "lecture_format", rename_all = "lowercase")]
pub enum LectureFormat {
    Online,
    Offline,
}

impl std::str::FromStr for LectureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(LectureFormat::Online),
            "offline" => Ok(LectureFormat::Offline),
            other => Err(format!("unknown lecture format: {other:?}")),
        }
    }
}

/// Lecture record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Lecture {
    pub id: i64,
    pub title: String,
    pub speaker: String,
    pub date: OffsetDateTime, // start time
    pub end_time: OffsetDateTime,
    pub max_seats: i32,
    pub format: LectureFormat,
    pub conference_link: Option<String>,
    pub offline_map_link: Option<String>,
    pub photo_key: Option<String>, // object key in the photo bucket
}

/// Lecture joined with its live registration count.
#[derive(Debug, Clone, FromRow)]
pub struct LectureWithSeats {
    pub id: i64,
    pub title: String,
    pub speaker: String,
    pub date: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub max_seats: i32,
    pub format: LectureFormat,
    pub conference_link: Option<String>,
    pub offline_map_link: Option<String>,
    pub photo_key: Option<String>,
    pub remaining_seats: i64,
}

impl LectureWithSeats {
    /// A lecture nobody has registered for yet.
    pub fn fresh(l: Lecture) -> Self {
        Self {
            remaining_seats: i64::from(l.max_seats),
            id: l.id,
            title: l.title,
            speaker: l.speaker,
            date: l.date,
            end_time: l.end_time,
            max_seats: l.max_seats,
            format: l.format,
            conference_link: l.conference_link,
            offline_map_link: l.offline_map_link,
            photo_key: l.photo_key,
        }
    }
}

/// Row-locked slice of a lecture, read inside a transaction.
#[derive(Debug, Clone, FromRow)]
pub struct LockedLecture {
    pub id: i64,
    pub max_seats: i32,
    pub photo_key: Option<String>,
}

/// Validated input for a new lecture.
#[derive(Debug, Clone, PartialEq)]
pub struct LectureDraft {
    pub title: String,
    pub speaker: String,
    pub date: OffsetDateTime,
    pub end_time: OffsetDateTime,
    pub max_seats: i32,
    pub format: LectureFormat,
    pub conference_link: Option<String>,
    pub offline_map_link: Option<String>,
}

/// Validated partial update. `None` keeps the stored value; for links,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LecturePatch {
    pub title: Option<String>,
    pub speaker: Option<String>,
    pub date: Option<OffsetDateTime>,
    pub end_time: Option<OffsetDateTime>,
    pub max_seats: Option<i32>,
    pub format: Option<LectureFormat>,
    pub conference_link: Option<Option<String>>,
    pub offline_map_link: Option<Option<String>>,
}
