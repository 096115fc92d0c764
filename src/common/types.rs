use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a two-party conversation, as carried on `/ws` and returned
/// by `/past_messages/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub sender_id: i64,
    #[serde(default)]
    pub receiver_id: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Only set on history entries.
    #[serde(
        default,
        rename = "created_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// How a received message must be routed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageKind {
    Chat,
    Location { latitude: f64, longitude: f64 },
}

impl ChatMessage {
    /// Outgoing text message; location fields are left out.
    pub fn text(sender_id: i64, receiver_id: i64, message: impl Into<String>) -> Self {
        Self {
            sender_id,
            receiver_id,
            message: message.into(),
            latitude: None,
            longitude: None,
            created_at: None,
        }
    }

    /// A zero coordinate counts as absent.
    pub fn kind(&self) -> MessageKind {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) if latitude != 0.0 && longitude != 0.0 => {
                MessageKind::Location {
                    latitude,
                    longitude,
                }
            }
            _ => MessageKind::Chat,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.message.trim().is_empty()
    }
}

/// `GET /users/{id}/json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Entry of `GET /messages` and `GET /unread_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadMessage {
    pub sender_id: i64,
    pub message: String,
    #[serde(default)]
    pub read: bool,
}

/// Hit of `GET /course_search.json`, also the body of `GET /courses/{id}/json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub professor: String,
}

/// Google Books `volumes?q=isbn:` response, reduced to what the book page shows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSearch {
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
}
