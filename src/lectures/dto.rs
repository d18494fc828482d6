use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{
    repo_types::{LectureDraft, LectureFormat, LecturePatch},
    services::CatalogError,
};
use crate::photos::PhotoUpload;

const MAX_NAME_CHARS: usize = 100;
const MAX_LINK_CHARS: usize = 255;

/// Lecture as shown to clients.
#[derive(Debug, Serialize)]
pub struct LectureView {
    pub id: i64,
    pub title: String,
    pub speaker: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub max_seats: i32,
    pub remaining_seats: i64,
    pub format: LectureFormat,
    pub conference_link: Option<String>,
    pub offline_map_link: Option<String>,
    pub offline_photo: Option<String>, // presigned url
}

/// Raw multipart fields of a lecture create/update request.
#[derive(Debug, Default)]
pub struct LectureForm {
    pub title: Option<String>,
    pub speaker: Option<String>,
    pub date: Option<String>,
    pub end_time: Option<String>,
    pub max_seats: Option<String>,
    pub format: Option<String>,
    pub conference_link: Option<String>,
    pub offline_map_link: Option<String>,
    pub offline_photo: Option<PhotoUpload>,
}

impl LectureForm {
    /// Store one text field by name. Unknown names are ignored.
    pub fn set_text(&mut self, name: &str, value: String) {
        let slot = match name {
            "title" => &mut self.title,
            "speaker" => &mut self.speaker,
            "date" => &mut self.date,
            "end_time" => &mut self.end_time,
            "max_seats" => &mut self.max_seats,
            "format" => &mut self.format,
            "conference_link" => &mut self.conference_link,
            "offline_map_link" => &mut self.offline_map_link,
            _ => return,
        };
        *slot = Some(value);
    }

    pub fn into_draft(self) -> Result<(LectureDraft, Option<PhotoUpload>), CatalogError> {
        let draft = LectureDraft {
            title: name_field("title", required("title", self.title)?)?,
            speaker: name_field("speaker", required("speaker", self.speaker)?)?,
            date: time_field("date", &required("date", self.date)?)?,
            end_time: time_field("end_time", &required("end_time", self.end_time)?)?,
            max_seats: seats_field(&required("max_seats", self.max_seats)?)?,
            format: format_field(&required("format", self.format)?)?,
            conference_link: self
                .conference_link
                .map(|v| link_field("conference_link", v))
                .transpose()?
                .flatten(),
            offline_map_link: self
                .offline_map_link
                .map(|v| link_field("offline_map_link", v))
                .transpose()?
                .flatten(),
        };
        if draft.end_time < draft.date {
            return Err(CatalogError::InvalidInput("end_time is before date".into()));
        }
        Ok((draft, self.offline_photo))
    }

    pub fn into_patch(self) -> Result<(LecturePatch, Option<PhotoUpload>), CatalogError> {
        let patch = LecturePatch {
            title: self.title.map(|v| name_field("title", v)).transpose()?,
            speaker: self.speaker.map(|v| name_field("speaker", v)).transpose()?,
            date: self.date.map(|v| time_field("date", &v)).transpose()?,
            end_time: self.end_time.map(|v| time_field("end_time", &v)).transpose()?,
            max_seats: self.max_seats.map(|v| seats_field(&v)).transpose()?,
            format: self.format.map(|v| format_field(&v)).transpose()?,
            conference_link: self
                .conference_link
                .map(|v| link_field("conference_link", v))
                .transpose()?,
            offline_map_link: self
                .offline_map_link
                .map(|v| link_field("offline_map_link", v))
                .transpose()?,
        };
        if let (Some(start), Some(end)) = (patch.date, patch.end_time) {
            if end < start {
                return Err(CatalogError::InvalidInput("end_time is before date".into()));
            }
        }
        Ok((patch, self.offline_photo))
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, CatalogError> {
    value.ok_or_else(|| CatalogError::InvalidInput(format!("{field} is required")))
}

fn name_field(field: &str, value: String) -> Result<String, CatalogError> {
    let v = value.trim();
    if v.is_empty() || v.chars().count() > MAX_NAME_CHARS {
        return Err(CatalogError::InvalidInput(format!(
            "{field} must be 1..={MAX_NAME_CHARS} characters"
        )));
    }
    Ok(v.to_owned())
}

/// An empty link means "no link".
fn link_field(field: &str, value: String) -> Result<Option<String>, CatalogError> {
    let v = value.trim();
    if v.is_empty() {
        return Ok(None);
    }
    if v.chars().count() > MAX_LINK_CHARS {
        return Err(CatalogError::InvalidInput(format!(
            "{field} must be at most {MAX_LINK_CHARS} characters"
        )));
    }
    Ok(Some(v.to_owned()))
}

fn time_field(field: &str, value: &str) -> Result<OffsetDateTime, CatalogError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map_err(|_| CatalogError::InvalidInput(format!("{field} must be an RFC 3339 timestamp")))
}

fn seats_field(value: &str) -> Result<i32, CatalogError> {
    match value.trim().parse::<i32>() {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(CatalogError::InvalidInput(
            "max_seats must be a non-negative integer".into(),
        )),
    }
}

fn format_field(value: &str) -> Result<LectureFormat, CatalogError> {
    value.parse::<LectureFormat>().map_err(CatalogError::InvalidInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn full_form() -> LectureForm {
        let mut f = LectureForm::default();
        f.set_text("title", " Lock-free queues ".into());
        f.set_text("speaker", "Grace".into());
        f.set_text("date", "2025-03-01T10:00:00Z".into());
        f.set_text("end_time", "2025-03-01T11:30:00+00:00".into());
        f.set_text("max_seats", "40".into());
        f.set_text("format", "Offline".into());
        f.set_text("offline_map_link", "https://maps.example/room-3".into());
        f.set_text("conference_link", "".into());
        f.set_text("unrelated", "ignored".into());
        f
    }

    #[test]
    fn draft_from_complete_form() {
        let (draft, photo) = full_form().into_draft().unwrap();
        assert!(photo.is_none());
        assert_eq!(draft.title, "Lock-free queues");
        assert_eq!(draft.date, datetime!(2025-03-01 10:00 UTC));
        assert_eq!(draft.end_time, datetime!(2025-03-01 11:30 UTC));
        assert_eq!(draft.max_seats, 40);
        assert_eq!(draft.format, LectureFormat::Offline);
        assert_eq!(draft.conference_link, None);
        assert_eq!(draft.offline_map_link.as_deref(), Some("https://maps.example/room-3"));
    }

    #[test]
    fn draft_requires_fields() {
        let mut f = full_form();
        f.speaker = None;
        let err = f.into_draft().unwrap_err();
        assert!(err.to_string().contains("speaker is required"));
    }

    #[test]
    fn draft_rejects_bad_values() {
        let mut f = full_form();
        f.set_text("max_seats", "-1".into());
        assert!(matches!(f.into_draft(), Err(CatalogError::InvalidInput(_))));

        let mut f = full_form();
        f.set_text("end_time", "2025-03-01T09:00:00Z".into());
        assert!(matches!(f.into_draft(), Err(CatalogError::InvalidInput(_))));

        let mut f = full_form();
        f.set_text("title", "x".repeat(101));
        assert!(matches!(f.into_draft(), Err(CatalogError::InvalidInput(_))));

        let mut f = full_form();
        f.set_text("date", "yesterday".into());
        assert!(matches!(f.into_draft(), Err(CatalogError::InvalidInput(_))));
    }

    #[test]
    fn patch_keeps_absent_fields_and_clears_empty_links() {
        let mut f = LectureForm::default();
        f.set_text("max_seats", "12".into());
        f.set_text("conference_link", "  ".into());
        let (patch, _) = f.into_patch().unwrap();
        assert_eq!(
            patch,
            LecturePatch {
                max_seats: Some(12),
                conference_link: Some(None),
                ..LecturePatch::default()
            }
        );
    }

    #[test]
    fn view_serializes_rfc3339() {
        let view = LectureView {
            id: 1,
            title: "t".into(),
            speaker: "s".into(),
            date: datetime!(2025-03-01 10:00 UTC),
            end_time: datetime!(2025-03-01 11:00 UTC),
            max_seats: 10,
            remaining_seats: 7,
            format: LectureFormat::Online,
            conference_link: Some("https://meet.example/x".into()),
            offline_map_link: None,
            offline_photo: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["date"], "2025-03-01T10:00:00Z");
        assert_eq!(json["remaining_seats"], 7);
        assert_eq!(json["format"], "online");
    }
}
