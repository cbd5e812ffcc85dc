//! Area — a named grouping of entities (a room).

use serde::{Deserialize, Serialize};

/// A named grouping such as a room.
///
/// Areas are created during bootstrap parsing and never updated afterwards;
/// the only way to replace one is a full registry rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_through_serde_json() {
        let area = Area {
            id: "a1".to_string(),
            name: "Kitchen".to_string(),
        };
        let json = serde_json::to_string(&area).unwrap();
        let parsed: Area = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, area);
    }
}
