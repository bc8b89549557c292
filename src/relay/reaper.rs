//! Idle-room reaper
//!
//! A room creator who abandons the tab before anyone joins would otherwise
//! leak a registry entry forever - there is no client-initiated cancel. The
//! reaper sweeps on a fixed interval and evicts rooms still waiting for a
//! second player past their TTL.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::engine::Relay;

pub struct Reaper {
    relay: Arc<Relay>,
    sweep_interval: Duration,
    waiting_ttl: Duration,
}

impl Reaper {
    pub fn new(relay: Arc<Relay>, sweep_interval: Duration, waiting_ttl: Duration) -> Self {
        Self {
            relay,
            sweep_interval,
            waiting_ttl,
        }
    }

    /// Run the periodic sweep until the process shuts down.
    pub async fn run(self) {
        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let reaped = self.relay.reap_idle_rooms(self.waiting_ttl);
            if reaped > 0 {
                info!(count = reaped, "idle room sweep complete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::engine::RelayConfig;
    use crate::ws::protocol::ClientMsg;
    use serde_json::Value;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn waiting_room(relay: &Relay) -> String {
        let host = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        relay.connect(host, tx);
        relay.handle_message(
            host,
            ClientMsg::CreateRoom {
                name: "An".to_string(),
                settings: Value::Null,
            },
        );
        match rx.try_recv().unwrap() {
            crate::ws::protocol::ServerMsg::RoomCreated { room_code } => room_code,
            other => panic!("expected room_created, got {other:?}"),
        }
    }

    fn playing_room(relay: &Relay) -> String {
        let code = waiting_room(relay);
        let guest = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        relay.connect(guest, tx);
        relay.handle_message(
            guest,
            ClientMsg::JoinRoom {
                room_code: code.clone(),
                player_name: "Binh".to_string(),
            },
        );
        code
    }

    #[test]
    fn sweep_evicts_expired_waiting_rooms_only() {
        let relay = Relay::new(RelayConfig::default());
        waiting_room(&relay);
        playing_room(&relay);
        std::thread::sleep(Duration::from_millis(5));

        // TTL zero: every waiting room is past its deadline.
        let reaped = relay.reap_idle_rooms(Duration::ZERO);

        assert_eq!(reaped, 1);
        assert_eq!(relay.active_rooms(), 1);
    }

    #[test]
    fn sweep_spares_fresh_waiting_rooms() {
        let relay = Relay::new(RelayConfig::default());
        waiting_room(&relay);

        let reaped = relay.reap_idle_rooms(Duration::from_secs(600));

        assert_eq!(reaped, 0);
        assert_eq!(relay.active_rooms(), 1);
    }

    #[test]
    fn reaper_task_sweeps_on_interval() {
        tokio_test::block_on(async {
            let relay = Arc::new(Relay::new(RelayConfig::default()));
            waiting_room(&relay);

            let reaper = Reaper::new(
                relay.clone(),
                Duration::from_millis(10),
                Duration::ZERO,
            );
            let handle = tokio::spawn(reaper.run());

            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(relay.active_rooms(), 0);

            handle.abort();
        });
    }
}
