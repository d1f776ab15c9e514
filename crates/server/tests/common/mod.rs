//! Shared harness: a `Server` driven by a manual clock and seeded RNG, with
//! one inbox per simulated connection.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use protocol::packets::CreateRoom;
use protocol::{CellPos, ClientMessage, ConnId, ServerMessage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use server::room::{Player, Room};
use server::{Config, ManualClock, Server};
use tokio::sync::mpsc::{self, Receiver};

pub struct Harness {
    pub server: Server,
    pub clock: Arc<ManualClock>,
    inboxes: HashMap<ConnId, Receiver<ServerMessage>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let server = Server::new(config, clock.clone(), StdRng::seed_from_u64(7));
        Self {
            server,
            clock,
            inboxes: HashMap::new(),
        }
    }

    pub fn connect(&mut self, token: Option<&str>) -> ConnId {
        let (tx, rx) = mpsc::channel(self.server.config.server.outbound_queue.max(1));
        let id = self.server.connect(token.map(str::to_string), None, tx);
        self.inboxes.insert(id, rx);
        id
    }

    pub fn disconnect(&mut self, id: ConnId) {
        self.server.disconnect(id);
        self.inboxes.remove(&id);
    }

    pub fn send(&mut self, id: ConnId, msg: ClientMessage) {
        self.server.handle_message(id, msg);
    }

    pub fn send_text(&mut self, id: ConnId, text: &str) {
        self.server.handle_text(id, text);
    }

    pub fn advance(&mut self, ms: u64) {
        self.clock.advance(ms);
    }

    pub fn tick(&mut self) {
        self.server.tick();
    }

    /// Everything delivered to `id` since the last drain.
    pub fn drain(&mut self, id: ConnId) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        if let Some(rx) = self.inboxes.get_mut(&id) {
            while let Ok(msg) = rx.try_recv() {
                out.push(msg);
            }
        }
        out
    }

    pub fn drain_all(&mut self) {
        let ids: Vec<ConnId> = self.inboxes.keys().copied().collect();
        for id in ids {
            self.drain(id);
        }
    }

    /// Create a room as `creator` and return its id.
    pub fn create_room(&mut self, creator: ConnId, max_players: f32, arena: bool) -> String {
        self.send(
            creator,
            ClientMessage::CreateRoom(CreateRoom {
                name: "test room".into(),
                max_players,
                arena,
            }),
        );
        self.server
            .rooms()
            .room_id_of(creator)
            .cloned()
            .expect("creator is seated")
    }

    /// Connect `count` named players into one room and start the game.
    pub fn started_room(&mut self, count: usize, arena: bool) -> (String, Vec<ConnId>) {
        let mut ids = Vec::new();
        for i in 0..count {
            let token = format!("token-{i}");
            let id = self.connect(Some(&token));
            self.send(id, ClientMessage::SetName(format!("player{i}")));
            ids.push(id);
        }
        let room_id = self.create_room(ids[0], count as f32, arena);
        for &id in &ids[1..] {
            self.send(id, ClientMessage::JoinRoom(room_id.clone()));
        }
        self.send(ids[0], ClientMessage::StartGame);
        self.drain_all();
        (room_id, ids)
    }

    pub fn room(&self, id: ConnId) -> &Room {
        self.server.rooms().room_of(id).expect("player is seated")
    }

    pub fn player(&self, id: ConnId) -> &Player {
        self.room(id).player(id).expect("player exists")
    }

    pub fn player_mut(&mut self, id: ConnId) -> &mut Player {
        self.server
            .rooms_mut()
            .room_of_mut(id)
            .and_then(|room| room.player_mut(id))
            .expect("player exists")
    }

    pub fn place(&mut self, id: ConnId, cell: CellPos) -> Vec3 {
        let player = self.player_mut(id);
        player.place_at(cell);
        player.exit_triggered = false;
        player.position
    }
}

/// Event names in delivery order.
pub fn events(msgs: &[ServerMessage]) -> Vec<&'static str> {
    msgs.iter().map(ServerMessage::event).collect()
}
