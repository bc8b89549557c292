//! Match relay protocol engine
//!
//! All inbound events funnel through here. The engine owns the session
//! registry and connection directory behind a single lock; critical sections
//! never await, so every operation is atomic with respect to every other and
//! cross-map reads can never observe a half-applied update. Outbound messages
//! are collected under the lock and dispatched after it is released.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{ClientMsg, PlayerInfo, ServerMsg};

use super::directory::ConnectionDirectory;
use super::registry::{Room, RoomStatus, SessionRegistry};

/// Per-connection outbound channel, writer end
pub type OutboundSender = mpsc::UnboundedSender<ServerMsg>;

/// Relay tunables
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Minimum time between accepted score increases. Derived from the
    /// fastest physically possible gameplay cadence (obstacles are at least
    /// ~1.2s apart); anything quicker is an update flood.
    pub min_score_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            min_score_interval: Duration::from_millis(1000),
        }
    }
}

/// The two shared maps, guarded together so cross-map operations
/// (resolve connection, then mutate its room) stay atomic.
struct RelayState {
    registry: SessionRegistry,
    directory: ConnectionDirectory,
}

/// The match relay. One instance per server process; shared across
/// connection tasks and the reaper.
pub struct Relay {
    state: Mutex<RelayState>,
    /// Live connections' outbound senders
    outbox: DashMap<Uuid, OutboundSender>,
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            state: Mutex::new(RelayState {
                registry: SessionRegistry::new(),
                directory: ConnectionDirectory::new(),
            }),
            outbox: DashMap::new(),
            config,
        }
    }

    /// Register a connection's outbound channel (called on WebSocket upgrade)
    pub fn connect(&self, connection_id: Uuid, sender: OutboundSender) {
        self.outbox.insert(connection_id, sender);
    }

    /// Dispatch one inbound client event
    pub fn handle_message(&self, connection_id: Uuid, msg: ClientMsg) {
        match msg {
            ClientMsg::JoinLobby { name, settings } => {
                self.handle_join_lobby(connection_id, name, settings)
            }
            ClientMsg::CreateRoom { name, settings } => {
                self.handle_create_room(connection_id, name, settings)
            }
            ClientMsg::JoinRoom {
                room_code,
                player_name,
            } => self.handle_join_room(connection_id, room_code, player_name),
            ClientMsg::GameUpdate { score, is_dead } => {
                self.handle_game_update(connection_id, score, is_dead)
            }
        }
    }

    /// Connection loss: the match cannot continue 1-vs-0, so the room is
    /// deleted unconditionally and the remaining peer notified. There is no
    /// reconnection grace period.
    pub fn disconnect(&self, connection_id: Uuid) {
        self.outbox.remove(&connection_id);

        let outbound = {
            let mut guard = self.state.lock();
            let RelayState {
                registry,
                directory,
            } = &mut *guard;

            let mut outbound = Vec::new();
            if let Some(entry) = directory.remove(connection_id) {
                if let Some(code) = entry.room_code {
                    if let Some(room) = registry.delete(&code) {
                        for peer in room
                            .players
                            .iter()
                            .filter(|p| p.connection_id != connection_id)
                        {
                            outbound.push((
                                peer.connection_id,
                                ServerMsg::OpponentDisconnected {
                                    player_id: connection_id,
                                },
                            ));
                        }
                        info!(
                            conn_id = %connection_id,
                            room = %code,
                            was_host = entry.is_host,
                            "room closed on disconnect"
                        );
                    }
                }
            }
            outbound
        };

        self.dispatch(outbound);
    }

    /// Delete rooms stuck in `Waiting` past `ttl`. Playing rooms are never
    /// age-reaped; their lifecycle is owned by the termination and
    /// disconnect paths. Returns the number of rooms removed.
    pub fn reap_idle_rooms(&self, ttl: Duration) -> usize {
        let mut guard = self.state.lock();

        let expired: Vec<String> = guard
            .registry
            .rooms()
            .filter(|room| room.status == RoomStatus::Waiting && room.created_at.elapsed() > ttl)
            .map(|room| room.code.clone())
            .collect();

        for code in &expired {
            if let Some(room) = guard.registry.delete(code) {
                info!(
                    room = %room.code,
                    host = %room.host_connection_id,
                    "reaped abandoned waiting room"
                );
            }
        }
        expired.len()
    }

    /// Live room count (diagnostics)
    pub fn active_rooms(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Live connection count (diagnostics)
    pub fn active_connections(&self) -> usize {
        self.outbox.len()
    }

    fn handle_join_lobby(&self, connection_id: Uuid, name: String, settings: Value) {
        info!(conn_id = %connection_id, name = %name, "player joined lobby");
        self.state
            .lock()
            .directory
            .register(connection_id, name, settings);
    }

    fn handle_create_room(&self, connection_id: Uuid, name: String, settings: Value) {
        let created = {
            let mut guard = self.state.lock();
            let RelayState {
                registry,
                directory,
            } = &mut *guard;

            directory.register(connection_id, name.clone(), settings);
            match registry.create_room(connection_id, name) {
                Ok(code) => {
                    directory.attach(connection_id, code.clone(), true);
                    Ok(code)
                }
                Err(err) => Err(err),
            }
        };

        match created {
            Ok(code) => {
                info!(conn_id = %connection_id, room = %code, "room created");
                self.send(connection_id, ServerMsg::RoomCreated { room_code: code });
            }
            Err(err) => {
                error!(conn_id = %connection_id, error = %err, "room creation failed");
                self.send(
                    connection_id,
                    ServerMsg::JoinFailed {
                        error: "No free room codes, try again shortly".to_string(),
                    },
                );
            }
        }
    }

    fn handle_join_room(&self, connection_id: Uuid, room_code: String, player_name: String) {
        let outcome = {
            let mut guard = self.state.lock();
            let RelayState {
                registry,
                directory,
            } = &mut *guard;

            match registry.join_room(&room_code, connection_id, player_name) {
                Ok(room) => {
                    let roster = roster_of(room);
                    let recipients: Vec<Uuid> =
                        room.players.iter().map(|p| p.connection_id).collect();
                    directory.attach(connection_id, room_code.clone(), false);
                    Ok((roster, recipients))
                }
                Err(err) => Err(err),
            }
        };

        match outcome {
            Ok((roster, recipients)) => {
                info!(conn_id = %connection_id, room = %room_code, "player joined room");
                for target in recipients {
                    self.send(
                        target,
                        ServerMsg::GameStart {
                            players: roster.clone(),
                        },
                    );
                }
            }
            Err(err) => {
                debug!(conn_id = %connection_id, room = %room_code, error = %err, "join refused");
                self.send(
                    connection_id,
                    ServerMsg::JoinFailed {
                        error: err.to_string(),
                    },
                );
            }
        }
    }

    /// Score/death relay with the anti-cheat gate.
    ///
    /// A claimed score is accepted only if it is strictly greater than the
    /// stored one, advances by at most one, and arrives no sooner than the
    /// minimum interval after the last accepted increase. A rejected claim
    /// leaves the stored score untouched, and the stored score is what gets
    /// relayed - the opponent never observes a rejected spike, not even
    /// transiently. Death flags are applied unconditionally: a false death
    /// report only disadvantages its sender.
    fn handle_game_update(&self, connection_id: Uuid, score: u32, is_dead: bool) {
        let outbound = {
            let mut guard = self.state.lock();
            let RelayState {
                registry,
                directory,
            } = &mut *guard;

            // Late messages after disconnect or room deletion are expected
            // races, not errors; resolve via the directory and drop silently.
            let Some(code) = directory
                .lookup(connection_id)
                .and_then(|e| e.room_code.clone())
            else {
                return;
            };
            let Some(room) = registry.get_mut(&code) else {
                return;
            };
            let Some(player) = room.player_mut(connection_id) else {
                return;
            };

            if score > player.score {
                let delta = score - player.score;
                let since_last = player.last_score_update.elapsed();
                if delta > 1 || since_last < self.config.min_score_interval {
                    warn!(
                        conn_id = %connection_id,
                        room = %code,
                        claimed = score,
                        held = player.score,
                        "rejected suspicious score claim"
                    );
                } else {
                    player.score = score;
                    player.last_score_update = Instant::now();
                }
            }
            player.is_dead = is_dead;
            let relayed_score = player.score;

            let mut outbound = Vec::new();
            if let Some(opponent) = room.opponent_of(connection_id) {
                outbound.push((
                    opponent.connection_id,
                    ServerMsg::OpponentUpdate {
                        player_id: connection_id,
                        score: relayed_score,
                        is_dead,
                    },
                ));
            }

            if room.both_dead() {
                for p in &room.players {
                    outbound.push((p.connection_id, ServerMsg::GameFinished));
                }
                registry.delete(&code);
                info!(room = %code, "match finished, both players dead");
            }
            outbound
        };

        self.dispatch(outbound);
    }

    fn dispatch(&self, outbound: Vec<(Uuid, ServerMsg)>) {
        for (target, msg) in outbound {
            self.send(target, msg);
        }
    }

    fn send(&self, target: Uuid, msg: ServerMsg) {
        if let Some(sender) = self.outbox.get(&target) {
            if sender.send(msg).is_err() {
                debug!(conn_id = %target, "outbound channel closed, message dropped");
            }
        }
    }
}

fn roster_of(room: &Room) -> Vec<PlayerInfo> {
    room.players
        .iter()
        .map(|p| PlayerInfo {
            id: p.connection_id,
            name: p.name.clone(),
            score: p.score,
            is_dead: p.is_dead,
            is_host: p.is_host,
        })
        .collect()
}
