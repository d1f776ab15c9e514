//! Connection sessions: naming, token reconnection and grace cleanup.

use std::net::SocketAddr;

use protocol::ConnId;
use protocol::packets::{GameStarted, PlayerLeft, RoomJoined};
use protocol::ServerMessage;
use protocol::ServerMessage as Msg;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info};

use super::Server;

/// A live connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: ConnId,
    pub addr: Option<SocketAddr>,
    /// Persistent client token, used to resume after a dropped socket.
    pub token: Option<String>,
    pub name: Option<String>,
}

impl Session {
    pub fn new(id: ConnId, addr: Option<SocketAddr>, token: Option<String>) -> Self {
        Self {
            id,
            addr,
            token,
            name: None,
        }
    }

    /// Display name, falling back to a generated one.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Player {}", self.id),
        }
    }
}

/// A pending cleanup for a token holder that dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceEntry {
    pub conn: ConnId,
    pub token: String,
}

impl Server {
    /// Register a new connection and deliver its initial messages.
    ///
    /// A known token resumes the seated player under the new id.
    pub fn connect(
        &mut self,
        token: Option<String>,
        addr: Option<SocketAddr>,
        link: Sender<ServerMessage>,
    ) -> ConnId {
        self.expire_grace();

        self.next_conn_id += 1;
        let id = self.next_conn_id;
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        self.sessions.insert(id, Session::new(id, addr, token.clone()));
        self.outbox.link(id, link);
        info!("Client {} connected from {:?}", id, addr);

        self.outbox.send(id, Msg::RoomList(self.rooms.list()));
        if let Some(token) = token {
            self.resume(id, &token);
        }
        id
    }

    fn resume(&mut self, id: ConnId, token: &str) {
        if let Some(task) = self.pending.remove(token) {
            self.grace.cancel(task);
            debug!("Cancelled grace cleanup for token held by {}", id);
        }
        let Some(old) = self.rooms.find_by_token(token) else {
            return;
        };
        if old == id || !self.rooms.rebind(old, id) {
            return;
        }
        let Some(room) = self.rooms.room_of(id) else {
            return;
        };
        let name = room.player(id).map(|p| p.name.clone());
        if let Some(session) = self.sessions.get_mut(&id) {
            session.name = name;
        }
        info!("Client {} resumed the seat of {} in room {}", id, old, room.id);

        self.outbox.send(
            id,
            Msg::RoomJoined(RoomJoined {
                room_id: room.id.clone(),
                room: room.info(),
                players: room.summaries(),
                is_creator: room.creator_id == id,
            }),
        );
        if room.is_playing() {
            if let Some(course) = room.course_of(id) {
                let level = room.player(id).map(|p| p.level).unwrap_or_default();
                self.outbox.send(
                    id,
                    Msg::GameStarted(GameStarted {
                        maze: course.maze.clone(),
                        start_cell: course.start,
                        exit_cell: course.exit,
                        level,
                        players: room.snapshot(),
                    }),
                );
            }
        }
    }

    /// Handle a closed socket. Seated token holders keep their seat for the
    /// grace period; everyone else is cleaned up now.
    pub fn disconnect(&mut self, id: ConnId) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        self.outbox.unlink(id);
        let seated = self.rooms.room_id_of(id).is_some();

        match session.token {
            Some(token) if seated => {
                let deadline = self.clock.now_ms() + self.config.server.reconnect_grace_ms;
                let task = self.grace.schedule(
                    deadline,
                    GraceEntry {
                        conn: id,
                        token: token.clone(),
                    },
                );
                if let Some(previous) = self.pending.insert(token, task) {
                    self.grace.cancel(previous);
                }
                info!(
                    "Client {} disconnected, holding seat for {}ms",
                    id, self.config.server.reconnect_grace_ms
                );
            }
            _ => {
                info!("Client {} disconnected", id);
                self.cleanup(id);
            }
        }
    }

    /// Run every grace cleanup whose deadline has passed.
    pub fn expire_grace(&mut self) {
        let now = self.clock.now_ms();
        for (_, entry) in self.grace.drain_due(now) {
            self.pending.remove(&entry.token);
            info!("Grace period expired for client {}", entry.conn);
            self.cleanup(entry.conn);
        }
    }

    /// Permanent removal: leave the room, forget the name, refresh lobbies.
    fn cleanup(&mut self, id: ConnId) {
        self.leave_room(id);
        self.sessions.remove(&id);
        self.broadcast_room_list();
    }

    /// Remove `id` from its room and notify the remaining players.
    pub(super) fn leave_room(&mut self, id: ConnId) -> bool {
        let Some(departure) = self.rooms.leave(id) else {
            return false;
        };
        info!("Player {} ({}) left room {}", id, departure.player.name, departure.room_id);
        if let Some(room) = self.rooms.get(&departure.room_id) {
            self.outbox
                .broadcast(&departure.remaining, &Msg::PlayerLeft(PlayerLeft { id }));
            self.outbox
                .broadcast(&departure.remaining, &Msg::RoomUpdated(room.info()));
        }
        true
    }

    pub(super) fn broadcast_room_list(&self) {
        self.outbox.broadcast_all(&Msg::RoomList(self.rooms.list()));
    }
}
