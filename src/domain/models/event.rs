//! Impression and conversion event records.
//!
//! Events are write-once and append-only; they are the source of truth from
//! which variant counters are derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of tracked event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Visitor was exposed to a variant
    Impression,
    /// Visitor completed the test's goal action
    Conversion,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impression => "impression",
            Self::Conversion => "conversion",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "impression" => Some(Self::Impression),
            "conversion" => Some(Self::Conversion),
            _ => None,
        }
    }
}

/// Identity of the acting visitor: an authenticated user id, or a stable
/// anonymous session id. The engine only needs a stable string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum VisitorKey {
    User(String),
    Anonymous(String),
}

impl VisitorKey {
    /// The stable key used for deterministic assignment.
    pub fn key(&self) -> &str {
        match self {
            Self::User(id) | Self::Anonymous(id) => id,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Anonymous(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous(id) => Some(id),
            Self::User(_) => None,
        }
    }
}

/// An immutable impression or conversion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub id: Uuid,
    pub test_id: Uuid,
    pub variant_id: Uuid,
    pub kind: EventKind,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TrackedEvent {
    pub fn new(test_id: Uuid, variant_id: Uuid, kind: EventKind, visitor: &VisitorKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_id,
            variant_id,
            kind,
            user_id: visitor.user_id().map(ToString::to_string),
            session_id: visitor.session_id().map(ToString::to_string),
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visitor_key_stability() {
        let user = VisitorKey::User("user-42".to_string());
        let anon = VisitorKey::Anonymous("sess-abc".to_string());

        assert_eq!(user.key(), "user-42");
        assert_eq!(anon.key(), "sess-abc");
        assert_eq!(user.user_id(), Some("user-42"));
        assert_eq!(user.session_id(), None);
        assert_eq!(anon.session_id(), Some("sess-abc"));
    }

    #[test]
    fn test_event_captures_identity() {
        let test_id = Uuid::new_v4();
        let variant_id = Uuid::new_v4();
        let visitor = VisitorKey::Anonymous("sess-1".to_string());

        let event = TrackedEvent::new(test_id, variant_id, EventKind::Impression, &visitor);
        assert_eq!(event.test_id, test_id);
        assert_eq!(event.variant_id, variant_id);
        assert_eq!(event.kind, EventKind::Impression);
        assert_eq!(event.user_id, None);
        assert_eq!(event.session_id.as_deref(), Some("sess-1"));
    }
}
