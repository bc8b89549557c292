//! Session registry - authoritative store of live rooms

use std::collections::HashMap;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

/// Room codes are fixed-width 4-digit numeric strings.
const CODE_MIN: u32 = 1000;
const CODE_MAX: u32 = 10_000;

/// Generation retries before giving up. The code space is small on purpose
/// (codes must be human-typable), so uniqueness is checked, never assumed.
const MAX_CODE_ATTEMPTS: u32 = 32;

/// Room lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    /// One player, awaiting an opponent
    Waiting,
    /// Two players, match live
    Playing,
}

/// A participant's live match data
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub connection_id: Uuid,
    pub name: String,
    pub score: u32,
    pub is_dead: bool,
    pub is_host: bool,
    /// Timestamp of the last accepted score increase
    pub last_score_update: Instant,
}

impl PlayerState {
    pub fn new(connection_id: Uuid, name: String, is_host: bool) -> Self {
        Self {
            connection_id,
            name,
            score: 0,
            is_dead: false,
            is_host,
            last_score_update: Instant::now(),
        }
    }
}

/// One 2-player match session.
///
/// A room transitions `Waiting -> Playing` exactly once, on the second join,
/// and is deleted on completion or disconnect - never reset to `Waiting`.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: String,
    pub created_at: Instant,
    pub host_connection_id: Uuid,
    pub players: Vec<PlayerState>,
    pub status: RoomStatus,
}

impl Room {
    /// Find the sending player's record
    pub fn player_mut(&mut self, connection_id: Uuid) -> Option<&mut PlayerState> {
        self.players
            .iter_mut()
            .find(|p| p.connection_id == connection_id)
    }

    /// The other participant, if present
    pub fn opponent_of(&self, connection_id: Uuid) -> Option<&PlayerState> {
        self.players
            .iter()
            .find(|p| p.connection_id != connection_id)
    }

    /// Termination condition: a full room where both players reported death
    pub fn both_dead(&self) -> bool {
        self.players.len() == 2 && self.players.iter().all(|p| p.is_dead)
    }
}

/// Join failures surfaced back to the requester
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full or game started")]
    RoomUnavailable,
}

/// Bounded code generation ran out of retries
#[derive(Debug, thiserror::Error)]
#[error("no free room code after {attempts} attempts")]
pub struct CodeSpaceExhausted {
    pub attempts: u32,
}

/// In-memory mapping from room code to match state. Exclusively owns all
/// `Room`/`PlayerState` data; everything else holds at most a code.
pub struct SessionRegistry {
    rooms: HashMap<String, Room>,
    rng: ChaCha8Rng,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_seed(rand::random::<u64>())
    }

    /// Seeded constructor for deterministic code generation in tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a `Waiting` room holding the host and return its code.
    pub fn create_room(
        &mut self,
        host_connection_id: Uuid,
        host_name: String,
    ) -> Result<String, CodeSpaceExhausted> {
        let code = self.generate_code()?;
        let room = Room {
            code: code.clone(),
            created_at: Instant::now(),
            host_connection_id,
            players: vec![PlayerState::new(host_connection_id, host_name, true)],
            status: RoomStatus::Waiting,
        };
        self.rooms.insert(code.clone(), room);
        Ok(code)
    }

    /// Append the second player and flip the room to `Playing`.
    pub fn join_room(
        &mut self,
        code: &str,
        connection_id: Uuid,
        name: String,
    ) -> Result<&Room, JoinError> {
        let room = self.rooms.get_mut(code).ok_or(JoinError::RoomNotFound)?;

        if room.status != RoomStatus::Waiting || room.players.len() >= 2 {
            return Err(JoinError::RoomUnavailable);
        }

        room.players.push(PlayerState::new(connection_id, name, false));
        room.status = RoomStatus::Playing;
        Ok(room)
    }

    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn delete(&mut self, code: &str) -> Option<Room> {
        self.rooms.remove(code)
    }

    /// Iterate all live rooms (reaper and diagnostics only)
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Draw codes until one is free. Short room lifetimes keep the space
    /// sparse, but a saturated registry must fail loudly rather than spin.
    fn generate_code(&mut self) -> Result<String, CodeSpaceExhausted> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = self.rng.gen_range(CODE_MIN..CODE_MAX).to_string();
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::with_seed(7)
    }

    #[test]
    fn create_room_holds_waiting_host() {
        let mut reg = registry();
        let host = Uuid::new_v4();

        let code = reg.create_room(host, "An".to_string()).unwrap();

        assert_eq!(code.len(), 4);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        let room = reg.get(&code).unwrap();
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.host_connection_id, host);
        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].is_host);
        assert_eq!(room.players[0].score, 0);
        assert!(!room.players[0].is_dead);
    }

    #[test]
    fn second_join_flips_to_playing() {
        let mut reg = registry();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let code = reg.create_room(host, "An".to_string()).unwrap();

        let room = reg.join_room(&code, guest, "Binh".to_string()).unwrap();

        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.players.len(), 2);
        assert!(!room.players[1].is_host);
        assert_eq!(room.players[1].name, "Binh");
    }

    #[test]
    fn join_unknown_code_fails() {
        let mut reg = registry();
        let err = reg
            .join_room("0000", Uuid::new_v4(), "Binh".to_string())
            .unwrap_err();
        assert_eq!(err, JoinError::RoomNotFound);
        assert!(reg.is_empty());
    }

    #[test]
    fn join_playing_room_fails_without_mutation() {
        let mut reg = registry();
        let code = reg.create_room(Uuid::new_v4(), "An".to_string()).unwrap();
        reg.join_room(&code, Uuid::new_v4(), "Binh".to_string())
            .unwrap();

        let err = reg
            .join_room(&code, Uuid::new_v4(), "Chi".to_string())
            .unwrap_err();

        assert_eq!(err, JoinError::RoomUnavailable);
        let room = reg.get(&code).unwrap();
        assert_eq!(room.players.len(), 2);
        assert_eq!(room.status, RoomStatus::Playing);
    }

    #[test]
    fn delete_removes_room() {
        let mut reg = registry();
        let code = reg.create_room(Uuid::new_v4(), "An".to_string()).unwrap();

        assert!(reg.delete(&code).is_some());
        assert!(reg.get(&code).is_none());
        assert!(reg.delete(&code).is_none());
    }

    #[test]
    fn generated_codes_are_unique_while_live() {
        let mut reg = registry();
        for _ in 0..500 {
            reg.create_room(Uuid::new_v4(), "An".to_string()).unwrap();
        }
        // HashMap keys are unique by construction; 500 successful inserts
        // means 500 distinct codes were drawn.
        assert_eq!(reg.len(), 500);
    }

    #[test]
    fn saturated_code_space_errors_instead_of_spinning() {
        let mut reg = registry();
        let mut created = 0usize;
        let exhausted = loop {
            match reg.create_room(Uuid::new_v4(), "An".to_string()) {
                Ok(_) => created += 1,
                Err(e) => break e,
            }
            assert!(created <= 9000, "more rooms than the code space allows");
        };
        assert_eq!(exhausted.attempts, MAX_CODE_ATTEMPTS);
        // The registry fills most of the space before retries run dry.
        assert!(created > 1000);
    }
}
