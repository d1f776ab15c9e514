//! A single game instance and its state machine.
//!
//! `waiting -> playing -> waiting (after a win)`; the registry deletes a
//! room once its roster is empty. Every operation here is a no-op when the
//! referenced player is missing.

pub mod enemy;
pub mod player;
pub mod registry;

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use protocol::packets::{LevelAdvanced, PlayerRespawned, PlayerState, PlayerSummary, RoomInfo, ScoreEntry};
use protocol::{CellPos, ConnId, Enemy, Maze, RoomStatus};
use rand::Rng;
use tracing::{debug, info};

use crate::collision::Target;
use crate::config::GameConfig;
use crate::{maze, spawn};

pub use player::Player;
pub use registry::{Departure, RoomRegistry};

pub type RoomId = String;

/// A maze with its entry and exit cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub maze: Maze,
    pub start: CellPos,
    pub exit: CellPos,
}

impl Course {
    /// Start in the `(0, 0)` corner, exit in the opposite one.
    pub fn new(maze: Maze) -> Self {
        let exit = maze.far_corner();
        Self {
            maze,
            start: CellPos::new(0, 0),
            exit,
        }
    }
}

/// A scheduled respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnEntry {
    pub player_id: ConnId,
    pub respawn_at: u64,
}

#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub max_players: usize,
    pub creator_id: ConnId,
    pub state: RoomStatus,
    /// Open arena instead of a generated maze.
    pub arena: bool,
    players: BTreeMap<ConnId, Player>,
    /// Course per personal level; level 0 is the shared starting course.
    courses: BTreeMap<u32, Course>,
    /// Enemy layouts by player, then level.
    enemies: HashMap<ConnId, HashMap<u32, Vec<Enemy>>>,
    respawns: Vec<RespawnEntry>,
}

impl Room {
    pub fn new(id: RoomId, name: String, max_players: usize, creator_id: ConnId, arena: bool) -> Self {
        Self {
            id,
            name,
            max_players: max_players.max(1),
            creator_id,
            state: RoomStatus::Waiting,
            arena,
            players: BTreeMap::new(),
            courses: BTreeMap::new(),
            enemies: HashMap::new(),
            respawns: Vec::new(),
        }
    }

    // ---- roster -------------------------------------------------------

    pub fn player(&self, id: ConnId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: ConnId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_ids(&self) -> Vec<ConnId> {
        self.players.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn is_playing(&self) -> bool {
        self.state == RoomStatus::Playing
    }

    /// Seat a player. Returns `false` when the room is full.
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.is_full() && !self.players.contains_key(&player.id) {
            return false;
        }
        self.players.insert(player.id, player);
        true
    }

    /// Remove a player, handing the creator role to the next remaining one.
    pub fn remove_player(&mut self, id: ConnId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.enemies.remove(&id);
        self.respawns.retain(|entry| entry.player_id != id);
        if self.creator_id == id {
            if let Some(&next) = self.players.keys().next() {
                info!("Room {}: creator role passes from {} to {}", self.id, id, next);
                self.creator_id = next;
            }
        }
        Some(player)
    }

    pub fn find_by_token(&self, token: &str) -> Option<ConnId> {
        self.players
            .values()
            .find(|p| p.token.as_deref() == Some(token))
            .map(|p| p.id)
    }

    /// Move a player to a new connection id, keeping all of its state.
    pub fn rebind(&mut self, old: ConnId, new: ConnId) -> bool {
        if old == new || self.players.contains_key(&new) {
            return false;
        }
        let Some(mut player) = self.players.remove(&old) else {
            return false;
        };
        player.id = new;
        self.players.insert(new, player);
        if self.creator_id == old {
            self.creator_id = new;
        }
        if let Some(cache) = self.enemies.remove(&old) {
            self.enemies.insert(new, cache);
        }
        for entry in self.respawns.iter_mut().filter(|e| e.player_id == old) {
            entry.player_id = new;
        }
        true
    }

    // ---- views --------------------------------------------------------

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            players: self.players.len(),
            max_players: self.max_players,
            state: self.state,
            arena: self.arena,
            creator_id: self.creator_id,
        }
    }

    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.players.values().map(Player::summary).collect()
    }

    pub fn snapshot(&self) -> BTreeMap<ConnId, PlayerState> {
        self.players.iter().map(|(id, p)| (*id, p.state())).collect()
    }

    /// Players on `level` as ray targets.
    pub fn targets_on_level(&self, level: u32) -> Vec<Target> {
        self.players
            .values()
            .filter(|p| p.level == level)
            .map(|p| Target {
                id: p.id,
                position: p.position,
                alive: p.alive,
            })
            .collect()
    }

    /// Shared starting maze, once the game has started.
    pub fn maze(&self) -> Option<&Maze> {
        self.courses.get(&0).map(|c| &c.maze)
    }

    pub fn start_cell(&self) -> Option<CellPos> {
        self.courses.get(&0).map(|c| c.start)
    }

    pub fn exit_cell(&self) -> Option<CellPos> {
        self.courses.get(&0).map(|c| c.exit)
    }

    pub fn course(&self, level: u32) -> Option<&Course> {
        self.courses.get(&level)
    }

    /// The course a player is currently running.
    pub fn course_of(&self, id: ConnId) -> Option<&Course> {
        let level = self.players.get(&id)?.level;
        self.courses.get(&level)
    }

    pub fn enemies_for(&self, id: ConnId, level: u32) -> Option<&[Enemy]> {
        self.enemies.get(&id)?.get(&level).map(Vec::as_slice)
    }

    pub fn respawn_queue(&self) -> &[RespawnEntry] {
        &self.respawns
    }

    // ---- game flow ----------------------------------------------------

    fn build_course<R: Rng + ?Sized>(&self, level: u32, rules: &GameConfig, rng: &mut R) -> Course {
        let (base_rows, base_cols) = rules.level_dimensions(level);
        let (rows, cols) =
            spawn::scaled_dimensions(base_rows, base_cols, self.max_players, rules.spawn_spacing);
        let maze = if self.arena {
            maze::open_arena(rows, cols)
        } else {
            maze::generate(rows, cols, rng)
        };
        Course::new(maze)
    }

    /// Cached enemy layout for (player, level), rolled on first request.
    fn ensure_enemies<R: Rng + ?Sized>(
        &mut self,
        id: ConnId,
        level: u32,
        rules: &GameConfig,
        rng: &mut R,
    ) -> Vec<Enemy> {
        if let Some(cached) = self.enemies_for(id, level) {
            return cached.to_vec();
        }
        let Some(course) = self.courses.get(&level) else {
            return Vec::new();
        };
        let layout = enemy::generate(course, level, rules, rng);
        self.enemies
            .entry(id)
            .or_default()
            .insert(level, layout.clone());
        layout
    }

    /// Generate the starting course and place every player on a spaced
    /// spawn. Spawns are computed for full capacity and cycled.
    pub fn start_game<R: Rng + ?Sized>(&mut self, rules: &GameConfig, rng: &mut R) {
        self.courses.clear();
        self.enemies.clear();
        self.respawns.clear();
        for player in self.players.values_mut() {
            player.level = 0;
        }

        let course = self.build_course(0, rules, rng);
        let slots = spawn::pick_spaced_spawns(
            self.max_players,
            course.maze.rows,
            course.maze.cols,
            rules.spawn_spacing,
            rng,
        );
        for (i, player) in self.players.values_mut().enumerate() {
            let cell = slots.get(i % slots.len().max(1)).copied().unwrap_or(course.start);
            player.place_at(cell);
            // Spawning on the exit does not count as reaching it.
            player.exit_triggered = cell == course.exit;
        }
        self.courses.insert(0, course);

        for id in self.player_ids() {
            self.ensure_enemies(id, 0, rules, rng);
        }

        self.state = RoomStatus::Playing;
        let maze = self.maze().map(|m| (m.rows, m.cols)).unwrap_or_default();
        info!(
            "Room {} started: {} players on a {}x{} {}",
            self.id,
            self.players.len(),
            maze.0,
            maze.1,
            if self.arena { "arena" } else { "maze" }
        );
    }

    /// Move one player onto their next level's course. Other players are
    /// untouched. Returns the payload to send to that player.
    pub fn advance_player_level<R: Rng + ?Sized>(
        &mut self,
        id: ConnId,
        rules: &GameConfig,
        rng: &mut R,
    ) -> Option<LevelAdvanced> {
        if !self.is_playing() {
            return None;
        }
        let level = self.players.get(&id)?.level + 1;
        if !self.courses.contains_key(&level) {
            let course = self.build_course(level, rules, rng);
            self.courses.insert(level, course);
        }
        let course = self.courses.get(&level)?.clone();
        let enemies = self.ensure_enemies(id, level, rules, rng);

        let player = self.players.get_mut(&id)?;
        player.level = level;
        player.position = course.start.center();
        player.sprinting = false;
        info!("Room {}: player {} advanced to level {}", self.id, id, level);

        Some(LevelAdvanced {
            maze: course.maze,
            start_cell: course.start,
            exit_cell: course.exit,
            level,
            enemies,
        })
    }

    /// Schedule a respawn at `respawn_at` (ms). One entry per player.
    pub fn queue_respawn(&mut self, id: ConnId, respawn_at: u64) {
        if !self.players.contains_key(&id) || self.respawns.iter().any(|e| e.player_id == id) {
            return;
        }
        self.respawns.push(RespawnEntry {
            player_id: id,
            respawn_at,
        });
    }

    /// Respawn every player whose deadline has passed, spaced away from the
    /// living players on the same level.
    pub fn process_respawns<R: Rng + ?Sized>(
        &mut self,
        now: u64,
        rules: &GameConfig,
        rng: &mut R,
    ) -> Vec<PlayerRespawned> {
        if self.respawns.is_empty() {
            return Vec::new();
        }
        let (due, pending): (Vec<_>, Vec<_>) =
            self.respawns.drain(..).partition(|e| e.respawn_at <= now);
        self.respawns = pending;

        let mut respawned = Vec::with_capacity(due.len());
        for entry in due {
            let Some(level) = self.players.get(&entry.player_id).map(|p| p.level) else {
                continue;
            };
            let Some(course) = self.courses.get(&level) else {
                continue;
            };
            let exit = course.exit;
            let occupied: Vec<CellPos> = self
                .players
                .values()
                .filter(|p| p.alive && p.level == level && p.id != entry.player_id)
                .filter_map(Player::cell)
                .collect();
            let cell = spawn::pick_respawn_cell(
                course.maze.rows,
                course.maze.cols,
                &occupied,
                rules.spawn_spacing,
                rng,
            );
            let Some(player) = self.players.get_mut(&entry.player_id) else {
                continue;
            };
            player.place_at(cell);
            player.exit_triggered = cell == exit;
            debug!("Room {}: player {} respawned at {:?}", self.id, player.id, cell);
            respawned.push(PlayerRespawned {
                id: player.id,
                x: player.position.x,
                y: player.position.y,
                z: player.position.z,
            });
        }
        respawned
    }

    /// Whether `(x, z)` counts as the exit of the player's current course:
    /// inside the exit cell or within `exit_radius` of its centre.
    pub fn is_player_exit_pos(&self, id: ConnId, x: f32, z: f32, rules: &GameConfig) -> bool {
        let Some(course) = self.course_of(id) else {
            return false;
        };
        if CellPos::containing(x, z) == Some(course.exit) {
            return true;
        }
        let center = course.exit.center();
        let (dx, dz) = (x - center.x, z - center.z);
        dx * dx + dz * dz <= rules.exit_radius * rules.exit_radius
    }

    /// Debounced exit test on the authoritative position. Returns `true`
    /// exactly once per arrival; leaving the exit re-arms it.
    pub fn try_trigger_exit(&mut self, id: ConnId, rules: &GameConfig) -> bool {
        let Some(player) = self.players.get(&id) else {
            return false;
        };
        if !player.alive || !self.is_playing() {
            return false;
        }
        let Vec3 { x, z, .. } = player.position;
        let at_exit = self.is_player_exit_pos(id, x, z, rules);

        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        if !at_exit {
            player.exit_triggered = false;
            return false;
        }
        if player.exit_triggered {
            return false;
        }
        player.exit_triggered = true;
        true
    }

    /// Exit check followed by the level advance it earns, if any.
    pub fn advance_if_at_exit<R: Rng + ?Sized>(
        &mut self,
        id: ConnId,
        rules: &GameConfig,
        rng: &mut R,
    ) -> Option<LevelAdvanced> {
        if !self.try_trigger_exit(id, rules) {
            return None;
        }
        self.advance_player_level(id, rules, rng)
    }

    /// Drop a reported kill from the player's current-level enemy list.
    pub fn remove_enemy(&mut self, id: ConnId, enemy_id: u32) -> bool {
        let Some(level) = self.players.get(&id).map(|p| p.level) else {
            return false;
        };
        let Some(layout) = self.enemies.get_mut(&id).and_then(|m| m.get_mut(&level)) else {
            return false;
        };
        let before = layout.len();
        layout.retain(|e| e.id != enemy_id);
        layout.len() != before
    }

    /// Highest score; the earliest seated player wins ties.
    pub fn winner(&self) -> Option<&Player> {
        self.players.values().fold(None, |best: Option<&Player>, p| match best {
            Some(b) if b.score >= p.score => Some(b),
            _ => Some(p),
        })
    }

    /// Scoreboard, highest score first.
    pub fn scoreboard(&self) -> Vec<ScoreEntry> {
        let mut rows: Vec<ScoreEntry> = self
            .players
            .values()
            .map(|p| ScoreEntry {
                id: p.id,
                name: p.name.clone(),
                score: p.score,
                deaths: p.deaths,
                level: p.level,
            })
            .collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        rows
    }

    /// Back to the lobby with scores, health and progression cleared.
    pub fn reset_after_win(&mut self) {
        self.state = RoomStatus::Waiting;
        self.courses.clear();
        self.enemies.clear();
        self.respawns.clear();
        for player in self.players.values_mut() {
            player.reset_match();
            player.position = Vec3::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::MAX_HEALTH;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn room_with(ids: &[ConnId], max_players: usize, arena: bool) -> Room {
        let mut room = Room::new("room-1".into(), "test".into(), max_players, ids[0], arena);
        for &id in ids {
            let token = format!("tok-{id}");
            assert!(room.add_player(Player::new(id, format!("p{id}"), Some(token))));
        }
        room
    }

    #[test]
    fn test_add_respects_capacity() {
        let mut room = room_with(&[1, 2], 2, false);
        assert!(room.is_full());
        assert!(!room.add_player(Player::new(3, "late".into(), None)));
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn test_creator_passes_on_leave() {
        let mut room = room_with(&[1, 2, 3], 4, false);
        room.remove_player(1);
        assert_eq!(room.creator_id, 2);
        room.remove_player(3);
        assert_eq!(room.creator_id, 2);
        room.remove_player(2);
        assert!(room.is_empty());
        assert!(room.remove_player(2).is_none());
    }

    #[test]
    fn test_start_game_places_spaced_players() {
        let mut rng = StdRng::seed_from_u64(42);
        let rules = GameConfig::default();
        let mut room = room_with(&[1, 2], 2, false);
        room.start_game(&rules, &mut rng);

        assert!(room.is_playing());
        assert_eq!(room.start_cell(), Some(CellPos::new(0, 0)));
        let maze = room.maze().unwrap();
        assert_eq!(room.exit_cell(), Some(CellPos::new(maze.rows - 1, maze.cols - 1)));

        let a = room.player(1).unwrap().cell().unwrap();
        let b = room.player(2).unwrap().cell().unwrap();
        assert!(a.manhattan(b) >= rules.spawn_spacing);
        assert!(room.enemies_for(1, 0).is_some());
        assert!(room.enemies_for(2, 0).is_some());
    }

    #[test]
    fn test_full_capacity_maze_is_scaled() {
        let mut rng = StdRng::seed_from_u64(1);
        let rules = GameConfig::default();
        let mut room = room_with(&[1], 8, false);
        room.start_game(&rules, &mut rng);
        let maze = room.maze().unwrap();
        assert!(maze.rows * maze.cols >= 8 * rules.spawn_spacing * rules.spawn_spacing);
    }

    #[test]
    fn test_advance_is_per_player_and_cached() {
        let mut rng = StdRng::seed_from_u64(3);
        let rules = GameConfig::default();
        let mut room = room_with(&[1, 2], 2, false);
        room.start_game(&rules, &mut rng);
        let before = room.player(2).unwrap().position;

        let advanced = room.advance_player_level(1, &rules, &mut rng).unwrap();
        assert_eq!(advanced.level, 1);
        assert_eq!(advanced.start_cell, CellPos::new(0, 0));
        assert_eq!(room.player(1).unwrap().level, 1);
        assert_eq!(room.player(1).unwrap().position, CellPos::new(0, 0).center());
        assert_eq!(room.player(2).unwrap().level, 0);
        assert_eq!(room.player(2).unwrap().position, before);
        assert_eq!(
            room.enemies_for(1, 1).unwrap(),
            advanced.enemies.as_slice()
        );

        // A second player reaching level 1 shares the course.
        let second = room.advance_player_level(2, &rules, &mut rng).unwrap();
        assert_eq!(second.maze, advanced.maze);
    }

    #[test]
    fn test_respawn_waits_for_deadline() {
        let mut rng = StdRng::seed_from_u64(5);
        let rules = GameConfig::default();
        let mut room = room_with(&[1, 2], 2, true);
        room.start_game(&rules, &mut rng);

        room.player_mut(2).unwrap().take_damage(MAX_HEALTH);
        room.queue_respawn(2, 3_000);
        room.queue_respawn(2, 9_000);
        assert_eq!(room.respawn_queue().len(), 1);

        assert!(room.process_respawns(2_999, &rules, &mut rng).is_empty());
        let done = room.process_respawns(3_000, &rules, &mut rng);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, 2);
        let player = room.player(2).unwrap();
        assert!(player.alive);
        assert_eq!(player.health, MAX_HEALTH);
        assert!(room.respawn_queue().is_empty());
    }

    #[test]
    fn test_exit_trigger_is_debounced() {
        let mut rng = StdRng::seed_from_u64(7);
        let rules = GameConfig::default();
        let mut room = room_with(&[1], 1, true);
        room.start_game(&rules, &mut rng);
        let exit = room.exit_cell().unwrap();

        room.player_mut(1).unwrap().position = CellPos::new(0, 0).center();
        assert!(!room.try_trigger_exit(1, &rules));
        room.player_mut(1).unwrap().position = exit.center();
        assert!(room.try_trigger_exit(1, &rules));
        assert!(!room.try_trigger_exit(1, &rules));

        room.player_mut(1).unwrap().position = CellPos::new(0, 0).center();
        assert!(!room.try_trigger_exit(1, &rules));
        assert!(!room.player(1).unwrap().exit_triggered);

        room.player_mut(1).unwrap().position = exit.center();
        assert!(room.try_trigger_exit(1, &rules));
    }

    #[test]
    fn test_rebind_keeps_state() {
        let mut rng = StdRng::seed_from_u64(9);
        let rules = GameConfig::default();
        let mut room = room_with(&[1, 2], 2, false);
        room.start_game(&rules, &mut rng);
        room.player_mut(1).unwrap().score = 30;
        let position = room.player(1).unwrap().position;

        assert_eq!(room.find_by_token("tok-1"), Some(1));
        assert!(room.rebind(1, 10));
        let player = room.player(10).unwrap();
        assert_eq!(player.id, 10);
        assert_eq!(player.score, 30);
        assert_eq!(player.position, position);
        assert_eq!(room.creator_id, 10);
        assert!(room.player(1).is_none());
        assert!(room.enemies_for(10, 0).is_some());
        assert!(!room.rebind(1, 11));
    }

    #[test]
    fn test_winner_and_reset() {
        let mut rng = StdRng::seed_from_u64(11);
        let rules = GameConfig::default();
        let mut room = room_with(&[1, 2, 3], 3, false);
        room.start_game(&rules, &mut rng);
        room.player_mut(1).unwrap().score = 20;
        room.player_mut(2).unwrap().score = 40;
        room.player_mut(3).unwrap().score = 40;

        assert_eq!(room.winner().unwrap().id, 2);
        let board = room.scoreboard();
        assert_eq!(board.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 3, 1]);

        room.reset_after_win();
        assert_eq!(room.state, RoomStatus::Waiting);
        assert!(room.maze().is_none());
        assert!(room.players().all(|p| p.score == 0 && p.level == 0 && p.alive));
    }

    #[test]
    fn test_remove_enemy() {
        let mut rng = StdRng::seed_from_u64(12);
        let rules = GameConfig::default();
        let mut room = room_with(&[1], 1, false);
        room.start_game(&rules, &mut rng);
        let first = room.enemies_for(1, 0).unwrap()[0].id;
        assert!(room.remove_enemy(1, first));
        assert!(!room.remove_enemy(1, first));
        assert!(room.enemies_for(1, 0).unwrap().iter().all(|e| e.id != first));
    }
}
