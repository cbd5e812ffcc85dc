//! Entity — a remote-controllable device (switch, light) mirrored from the hub.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest entity id stored, in bytes.
pub const MAX_ENTITY_ID_LEN: usize = 63;

/// Stable string identifier of an entity, as assigned by the hub.
///
/// Ids longer than [`MAX_ENTITY_ID_LEN`] bytes are truncated to the nearest
/// UTF-8 boundary at construction time. Truncation is a documented lossy
/// contract inherited from the wire format's fixed-size id fields: an
/// oversized id is shortened, never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let mut id = id.into();
        if id.len() > MAX_ENTITY_ID_LEN {
            let mut cut = MAX_ENTITY_ID_LEN;
            while !id.is_char_boundary(cut) {
                cut -= 1;
            }
            id.truncate(cut);
        }
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single controllable entity and its last known state.
///
/// `area_id` is a non-owning back-reference into the area table; the registry
/// guarantees it always resolves (unknown areas are created implicitly during
/// bootstrap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub state: String,
    pub area_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_short_ids_untouched() {
        let id = EntityId::new("switch.kitchen_light");
        assert_eq!(id.as_str(), "switch.kitchen_light");
    }

    #[test]
    fn should_truncate_oversized_id_to_max_len() {
        let long = "x".repeat(200);
        let id = EntityId::new(long);
        assert_eq!(id.as_str().len(), MAX_ENTITY_ID_LEN);
    }

    #[test]
    fn should_truncate_at_utf8_boundary() {
        // 31 two-byte characters = 62 bytes; one more would land mid-character.
        let long = "é".repeat(40);
        let id = EntityId::new(long);
        assert!(id.as_str().len() <= MAX_ENTITY_ID_LEN);
        assert_eq!(id.as_str().len() % 2, 0);
        assert!(id.as_str().chars().all(|c| c == 'é'));
    }

    #[test]
    fn should_report_empty_id() {
        assert!(EntityId::new("").is_empty());
        assert!(!EntityId::new("a").is_empty());
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let entity = Entity {
            id: EntityId::new("light.hall"),
            name: "Hall".to_string(),
            state: "on".to_string(),
            area_id: "a1".to_string(),
        };
        let json = serde_json::to_string(&entity).unwrap();
        let parsed: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entity);
    }

    #[test]
    fn should_serialize_id_as_plain_string() {
        let json = serde_json::to_string(&EntityId::new("switch.k1")).unwrap();
        assert_eq!(json, "\"switch.k1\"");
    }
}
