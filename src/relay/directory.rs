//! Connection directory - maps live connections to their room and role
//!
//! Inbound gameplay traffic is always routed through the connection's own
//! recorded association. A client-supplied room code is never trusted as
//! routing input, so a malicious client cannot inject updates into another
//! match by forging a code.

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

/// Fallback display name, matching the client's own default.
const DEFAULT_PLAYER_NAME: &str = "Player";

/// Cosmetic defaults applied when a client registers without settings.
/// Opaque to the relay; never consulted for gameplay logic.
fn default_settings() -> Value {
    serde_json::json!({ "skin": "classic", "bg": "deep" })
}

/// Association from one live connection to at most one room.
///
/// Holds only the back-reference; match state lives in the session registry
/// and every lookup through here re-checks room existence there.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub name: String,
    pub settings: Value,
    pub room_code: Option<String>,
    pub is_host: bool,
}

impl Default for ConnectionEntry {
    fn default() -> Self {
        Self {
            name: DEFAULT_PLAYER_NAME.to_string(),
            settings: default_settings(),
            room_code: None,
            is_host: false,
        }
    }
}

/// In-memory map of connection id to lobby/room association
#[derive(Default)]
pub struct ConnectionDirectory {
    entries: HashMap<Uuid, ConnectionEntry>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection's display name and cosmetic settings, replacing
    /// any previous registration.
    pub fn register(&mut self, connection_id: Uuid, name: String, settings: Value) {
        let name = if name.is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            name
        };
        let settings = if settings.is_null() {
            default_settings()
        } else {
            settings
        };
        self.entries.insert(
            connection_id,
            ConnectionEntry {
                name,
                settings,
                room_code: None,
                is_host: false,
            },
        );
    }

    /// Bind a connection to a room. Creates a default entry if the client
    /// skipped the lobby and went straight to create/join.
    pub fn attach(&mut self, connection_id: Uuid, room_code: String, is_host: bool) {
        let entry = self.entries.entry(connection_id).or_default();
        entry.room_code = Some(room_code);
        entry.is_host = is_host;
    }

    pub fn lookup(&self, connection_id: Uuid) -> Option<&ConnectionEntry> {
        self.entries.get(&connection_id)
    }

    pub fn remove(&mut self, connection_id: Uuid) -> Option<ConnectionEntry> {
        self.entries.remove(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup() {
        let mut dir = ConnectionDirectory::new();
        let id = Uuid::new_v4();

        dir.register(
            id,
            "An".to_string(),
            serde_json::json!({ "skin": "ufo", "bg": "sunset" }),
        );

        let entry = dir.lookup(id).unwrap();
        assert_eq!(entry.name, "An");
        assert_eq!(entry.settings["skin"], "ufo");
        assert!(entry.room_code.is_none());
    }

    #[test]
    fn register_defaults_empty_name_and_null_settings() {
        let mut dir = ConnectionDirectory::new();
        let id = Uuid::new_v4();

        dir.register(id, String::new(), Value::Null);

        let entry = dir.lookup(id).unwrap();
        assert_eq!(entry.name, "Player");
        assert_eq!(entry.settings["skin"], "classic");
    }

    #[test]
    fn attach_binds_room_and_role() {
        let mut dir = ConnectionDirectory::new();
        let id = Uuid::new_v4();
        dir.register(id, "An".to_string(), Value::Null);

        dir.attach(id, "1234".to_string(), true);

        let entry = dir.lookup(id).unwrap();
        assert_eq!(entry.room_code.as_deref(), Some("1234"));
        assert!(entry.is_host);
        assert_eq!(entry.name, "An");
    }

    #[test]
    fn attach_without_prior_registration_creates_entry() {
        let mut dir = ConnectionDirectory::new();
        let id = Uuid::new_v4();

        dir.attach(id, "4321".to_string(), false);

        let entry = dir.lookup(id).unwrap();
        assert_eq!(entry.room_code.as_deref(), Some("4321"));
        assert_eq!(entry.name, "Player");
    }

    #[test]
    fn remove_clears_association() {
        let mut dir = ConnectionDirectory::new();
        let id = Uuid::new_v4();
        dir.register(id, "An".to_string(), Value::Null);

        assert!(dir.remove(id).is_some());
        assert!(dir.lookup(id).is_none());
        assert!(dir.is_empty());
    }
}
