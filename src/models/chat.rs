use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalize an unordered participant pair for uniqueness lookups. The
/// schema stores pairs in this order, so (A,B) and (B,A) hit the same row.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    General,
    PairedProfessional,
}

impl ChatKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            ChatKind::General => "general",
            ChatKind::PairedProfessional => "paired_professional",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "general" => Some(ChatKind::General),
            "paired_professional" => Some(ChatKind::PairedProfessional),
            _ => None,
        }
    }
}

/// Chat row: a persistent channel between exactly two participants.
/// Participants are stored in canonical order (see [`canonical_pair`]).
#[derive(Debug, Clone, Serialize)]
pub struct Chat {
    pub id: Uuid,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub kind: ChatKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The other participant, if `user_id` is one of the two.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_a == user_id {
            Some(self.participant_b)
        } else if self.participant_b == user_id {
            Some(self.participant_a)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
        let (first, second) = canonical_pair(a, b);
        assert!(first <= second);
    }

    #[test]
    fn chat_kind_db_roundtrip() {
        assert_eq!(ChatKind::from_db("general"), Some(ChatKind::General));
        assert_eq!(
            ChatKind::from_db("paired_professional"),
            Some(ChatKind::PairedProfessional)
        );
        assert_eq!(ChatKind::from_db(ChatKind::General.as_db()), Some(ChatKind::General));
        assert_eq!(ChatKind::from_db("group"), None);
    }

    #[test]
    fn counterpart_resolution() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (pa, pb) = canonical_pair(a, b);
        let chat = Chat {
            id: Uuid::new_v4(),
            participant_a: pa,
            participant_b: pb,
            kind: ChatKind::PairedProfessional,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(chat.is_participant(a));
        assert!(chat.is_participant(b));
        assert_eq!(chat.counterpart_of(a), Some(b));
        assert_eq!(chat.counterpart_of(b), Some(a));
        assert_eq!(chat.counterpart_of(Uuid::new_v4()), None);
    }
}
