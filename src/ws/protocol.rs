//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Announce presence with a display name and cosmetic settings.
    /// Settings are an opaque blob, relayed state never depends on them.
    JoinLobby {
        #[serde(default)]
        name: String,
        #[serde(default)]
        settings: serde_json::Value,
    },

    /// Host a new room
    CreateRoom {
        #[serde(default)]
        name: String,
        #[serde(default)]
        settings: serde_json::Value,
    },

    /// Join an existing room by its 4-digit code
    JoinRoom {
        room_code: String,
        player_name: String,
    },

    /// Periodic gameplay telemetry: claimed cumulative score + death flag
    GameUpdate { score: u32, is_dead: bool },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// New room code, emitted back to the creator only
    RoomCreated { room_code: String },

    /// Second player arrived; sent to both participants with the full
    /// roster so each learns the opponent without a separate lookup
    GameStart { players: Vec<PlayerInfo> },

    /// The opponent's validated score/death state
    OpponentUpdate {
        player_id: Uuid,
        score: u32,
        is_dead: bool,
    },

    /// Both players dead; the match is decided and the room is gone
    GameFinished,

    /// The opponent's connection dropped; the match is over
    OpponentDisconnected { player_id: Uuid },

    /// A join request was refused
    JoinFailed { error: String },
}

/// Roster entry broadcast in `GameStart`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub score: u32,
    pub is_dead: bool,
    pub is_host: bool,
}
