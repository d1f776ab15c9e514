//! Active rooms and the connection -> room index.

use std::collections::{BTreeMap, HashMap};

use protocol::ConnId;
use protocol::packets::RoomInfo;
use tracing::info;

use super::{Player, Room, RoomId};
use crate::error::GameError;

/// Result of removing a player from their room.
#[derive(Debug)]
pub struct Departure {
    pub room_id: RoomId,
    pub player: Player,
    /// Roster left behind; empty when the room was deleted.
    pub remaining: Vec<ConnId>,
}

impl Departure {
    pub fn room_deleted(&self) -> bool {
        self.remaining.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<RoomId, Room>,
    members: HashMap<ConnId, RoomId>,
    next_room_id: u64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub fn room_id_of(&self, conn: ConnId) -> Option<&RoomId> {
        self.members.get(&conn)
    }

    pub fn room_of(&self, conn: ConnId) -> Option<&Room> {
        self.rooms.get(self.members.get(&conn)?)
    }

    pub fn room_of_mut(&mut self, conn: ConnId) -> Option<&mut Room> {
        let id = self.members.get(&conn)?;
        self.rooms.get_mut(id)
    }

    /// Lobby listing of every room.
    pub fn list(&self) -> Vec<RoomInfo> {
        self.rooms.values().map(Room::info).collect()
    }

    pub fn playing_ids(&self) -> Vec<RoomId> {
        self.rooms
            .values()
            .filter(|room| room.is_playing())
            .map(|room| room.id.clone())
            .collect()
    }

    /// Create a room with `creator` as its first player.
    pub fn create(&mut self, name: String, max_players: usize, creator: Player, arena: bool) -> RoomId {
        self.next_room_id += 1;
        let id = format!("room-{}", self.next_room_id);
        let creator_id = creator.id;
        let mut room = Room::new(id.clone(), name, max_players, creator_id, arena);
        room.add_player(creator);
        info!("Room {} ({:?}) created by {}", id, room.name, creator_id);
        self.rooms.insert(id.clone(), room);
        self.members.insert(creator_id, id.clone());
        id
    }

    /// Seat `player` in an existing waiting room.
    pub fn join(&mut self, room_id: &str, player: Player) -> Result<(), GameError> {
        let room = self.rooms.get_mut(room_id).ok_or(GameError::RoomNotFound)?;
        if room.is_playing() {
            return Err(GameError::GameInProgress);
        }
        let conn = player.id;
        if !room.add_player(player) {
            return Err(GameError::RoomFull);
        }
        self.members.insert(conn, room.id.clone());
        Ok(())
    }

    /// Remove a connection from its room, deleting the room once empty.
    pub fn leave(&mut self, conn: ConnId) -> Option<Departure> {
        let room_id = self.members.remove(&conn)?;
        let room = self.rooms.get_mut(&room_id)?;
        let player = room.remove_player(conn)?;
        let remaining = room.player_ids();
        if remaining.is_empty() {
            self.rooms.remove(&room_id);
            info!("Room {} deleted (empty)", room_id);
        }
        Some(Departure {
            room_id,
            player,
            remaining,
        })
    }

    /// Move a seated player from `old` to `new`.
    pub fn rebind(&mut self, old: ConnId, new: ConnId) -> bool {
        let Some(room_id) = self.members.get(&old).cloned() else {
            return false;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return false;
        };
        if !room.rebind(old, new) {
            return false;
        }
        self.members.remove(&old);
        self.members.insert(new, room_id);
        true
    }

    pub fn find_by_token(&self, token: &str) -> Option<ConnId> {
        self.rooms.values().find_map(|room| room.find_by_token(token))
    }
}
