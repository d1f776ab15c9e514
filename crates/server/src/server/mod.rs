//! Game server implementation.
//!
//! [`Server`] is the single aggregate holding every room, session and timer.
//! Connection tasks and the game loop share it behind one
//! `tokio::sync::RwLock` and take the write lock for each message or tick, so
//! handlers never interleave.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use protocol::{ClientMessage, ConnId, ServerMessage};
use rand::rngs::StdRng;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::room::RoomRegistry;
use crate::scheduler::{Scheduler, TaskId};

pub mod game;
mod handlers;
pub mod outbox;
pub mod session;

pub use game::run_game_loop;
pub use outbox::Outbox;
pub use session::{GraceEntry, Session};

pub struct Server {
    pub config: Config,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    started_at: u64,
    next_conn_id: ConnId,
    rooms: RoomRegistry,
    sessions: BTreeMap<ConnId, Session>,
    /// Grace cleanups for dropped token holders.
    grace: Scheduler<GraceEntry>,
    /// Token -> pending grace task.
    pending: HashMap<String, TaskId>,
    outbox: Outbox,
}

impl Server {
    pub fn new(config: Config, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        let started_at = clock.now_ms();
        Self {
            config,
            clock,
            rng,
            started_at,
            next_conn_id: 0,
            rooms: RoomRegistry::new(),
            sessions: BTreeMap::new(),
            grace: Scheduler::new(),
            pending: HashMap::new(),
            outbox: Outbox::default(),
        }
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn rooms_mut(&mut self) -> &mut RoomRegistry {
        &mut self.rooms
    }

    pub fn session(&self, id: ConnId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of seats waiting on a reconnection.
    pub fn pending_grace(&self) -> usize {
        self.grace.len()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.started_at)
    }

    /// Decode and dispatch one text frame. Undecodable frames are dropped.
    pub fn handle_text(&mut self, conn: ConnId, text: &str) {
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle_message(conn, msg),
            Err(e) => warn!("Dropping frame from {}: {}", conn, e),
        }
    }

    /// Dispatch a decoded message. Protocol violations are reported to the
    /// sender as an `error` message without touching any state.
    pub fn handle_message(&mut self, conn: ConnId, msg: ClientMessage) {
        if !self.sessions.contains_key(&conn) {
            return;
        }
        if !matches!(msg, ClientMessage::Move(_)) {
            debug!("Client {} sent {}", conn, msg.event());
        }
        let result = match msg {
            ClientMessage::SetName(name) => {
                self.handle_set_name(conn, &name);
                Ok(())
            }
            ClientMessage::ListRooms => {
                self.outbox
                    .send(conn, ServerMessage::RoomList(self.rooms.list()));
                Ok(())
            }
            ClientMessage::CreateRoom(req) => {
                self.handle_create_room(conn, req);
                Ok(())
            }
            ClientMessage::JoinRoom(room_id) => self.handle_join_room(conn, &room_id),
            ClientMessage::LeaveRoom => self.handle_leave_room(conn),
            ClientMessage::UpdateWeapon(weapon) => {
                self.handle_update_weapon(conn, &weapon);
                Ok(())
            }
            ClientMessage::StartGame => self.handle_start_game(conn),
            ClientMessage::Move(input) => {
                self.handle_move(conn, input);
                Ok(())
            }
            ClientMessage::Shoot(input) => {
                self.handle_shoot(conn, input);
                Ok(())
            }
            ClientMessage::PlayerReachedExit => {
                self.handle_reached_exit(conn);
                Ok(())
            }
            ClientMessage::NpcKill(kill) => {
                self.handle_npc_kill(conn, kill.enemy_id);
                Ok(())
            }
            ClientMessage::BossKill => {
                self.handle_boss_kill(conn);
                Ok(())
            }
        };
        if let Err(e) = result {
            debug!("Rejected request from {}: {}", conn, e);
            self.outbox.send(conn, ServerMessage::error(e.to_string()));
        }
    }
}

/// Run `f`, turning a panic into a logged `None`.
///
/// The tokio lock around [`Server`] does not poison, so the aggregate stays
/// usable afterwards with whatever `f` had already applied.
pub fn catch_panic<T>(context: impl fmt::Display, f: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("non-string panic payload");
            error!("Panic in {}: {}", context, reason);
            None
        }
    }
}
