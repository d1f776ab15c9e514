//! Client message handlers.

use std::collections::HashMap;

use glam::Vec3;
use protocol::packets::{
    CreateRoom, GameStarted, GameWon, HitConfirmed, MoveInput, PlayerDamaged, PlayerKilled,
    PlayerMoved, PlayerShot, RoomJoined, ShootInput,
};
use protocol::{ConnId, ServerMessage as Msg, Weapon};
use tracing::{debug, info};

use super::Server;
use crate::collision::{self, Ray};
use crate::error::GameError;
use crate::room::Player;
use crate::weapons;

/// Trim and cap a client-supplied label.
fn clean_label(raw: &str, max_chars: usize) -> String {
    let capped: String = raw.trim().chars().take(max_chars).collect();
    capped.trim_end().to_string()
}

impl Server {
    fn new_player(&self, conn: ConnId) -> Player {
        match self.sessions.get(&conn) {
            Some(session) => Player::new(conn, session.display_name(), session.token.clone()),
            None => Player::new(conn, format!("Player {conn}"), None),
        }
    }

    fn send_room_joined(&self, conn: ConnId) {
        let Some(room) = self.rooms.room_of(conn) else {
            return;
        };
        self.outbox.send(
            conn,
            Msg::RoomJoined(RoomJoined {
                room_id: room.id.clone(),
                room: room.info(),
                players: room.summaries(),
                is_creator: room.creator_id == conn,
            }),
        );
    }

    pub(super) fn handle_set_name(&mut self, conn: ConnId, raw: &str) {
        let name = clean_label(raw, self.config.server.max_name_length);
        let name = (!name.is_empty()).then_some(name);
        if let Some(session) = self.sessions.get_mut(&conn) {
            session.name = name.clone();
        }
        if let Some(name) = name {
            if let Some(player) = self.rooms.room_of_mut(conn).and_then(|r| r.player_mut(conn)) {
                player.name = name;
            }
        }
    }

    pub(super) fn handle_create_room(&mut self, conn: ConnId, req: CreateRoom) {
        self.leave_room(conn);

        let rules = &self.config.game;
        let player = self.new_player(conn);
        let mut name = clean_label(&req.name, rules.max_room_name_length);
        if name.is_empty() {
            name = format!("{}'s room", player.name);
        }
        let max_players = if req.max_players.is_finite() && req.max_players >= 1.0 {
            (req.max_players.floor() as usize).min(rules.max_players_limit)
        } else {
            rules.default_max_players
        };

        self.rooms.create(name, max_players, player, req.arena);
        self.send_room_joined(conn);
        self.broadcast_room_list();
    }

    pub(super) fn handle_join_room(&mut self, conn: ConnId, room_id: &str) -> Result<(), GameError> {
        let room_id = room_id.trim();
        if self.rooms.room_id_of(conn).map(String::as_str) == Some(room_id) {
            self.send_room_joined(conn);
            return Ok(());
        }
        // Validate first so a rejected join leaves the current seat alone.
        let room = self.rooms.get(room_id).ok_or(GameError::RoomNotFound)?;
        if room.is_playing() {
            return Err(GameError::GameInProgress);
        }
        if room.is_full() {
            return Err(GameError::RoomFull);
        }

        self.leave_room(conn);
        let player = self.new_player(conn);
        let summary = player.summary();
        self.rooms.join(room_id, player)?;
        info!("Player {} joined room {}", conn, room_id);

        self.send_room_joined(conn);
        if let Some(room) = self.rooms.get(room_id) {
            let ids = room.player_ids();
            self.outbox
                .broadcast_except(&ids, conn, &Msg::PlayerJoined(summary));
            self.outbox.broadcast(&ids, &Msg::RoomUpdated(room.info()));
        }
        self.broadcast_room_list();
        Ok(())
    }

    pub(super) fn handle_leave_room(&mut self, conn: ConnId) -> Result<(), GameError> {
        if !self.leave_room(conn) {
            return Err(GameError::NotInRoom);
        }
        self.broadcast_room_list();
        Ok(())
    }

    pub(super) fn handle_update_weapon(&mut self, conn: ConnId, raw: &str) {
        let Some(weapon) = Weapon::parse(raw) else {
            debug!("Client {} picked unknown weapon {:?}", conn, raw);
            return;
        };
        if let Some(player) = self.rooms.room_of_mut(conn).and_then(|r| r.player_mut(conn)) {
            player.weapon = weapon;
        }
    }

    pub(super) fn handle_start_game(&mut self, conn: ConnId) -> Result<(), GameError> {
        let room = self.rooms.room_of_mut(conn).ok_or(GameError::NotInRoom)?;
        if room.creator_id != conn {
            return Err(GameError::NotCreator);
        }
        if room.is_playing() {
            return Err(GameError::GameInProgress);
        }

        room.start_game(&self.config.game, &mut self.rng);
        let ids = room.player_ids();
        if let Some(course) = room.course(0) {
            let started = Msg::GameStarted(GameStarted {
                maze: course.maze.clone(),
                start_cell: course.start,
                exit_cell: course.exit,
                level: 0,
                players: room.snapshot(),
            });
            self.outbox.broadcast(&ids, &started);
        }
        self.outbox.broadcast(&ids, &Msg::RoomUpdated(room.info()));
        self.broadcast_room_list();
        Ok(())
    }

    /// Accept or correct a movement claim.
    pub(super) fn handle_move(&mut self, conn: ConnId, input: MoveInput) {
        let rules = &self.config.game;
        let Some(room) = self.rooms.room_of_mut(conn) else {
            return;
        };
        if !room.is_playing() {
            return;
        }
        let Some(player) = room.player(conn) else {
            return;
        };
        if !player.alive {
            return;
        }
        let Some(course) = room.course_of(conn) else {
            return;
        };

        let current = player.position;
        let target = input.position();
        let max_step = rules.max_move_distance;
        if current.distance_squared(target) > max_step * max_step
            || collision::is_blocked(&course.maze, target.x, target.z, rules.player_radius)
        {
            self.outbox
                .send(conn, Msg::PositionCorrection(current.into()));
            return;
        }

        let Some(player) = room.player_mut(conn) else {
            return;
        };
        player.position = target;
        player.yaw = input.yaw;
        player.pitch = input.pitch;
        player.sprinting = input.sprinting;
        let moved = Msg::PlayerMoved(PlayerMoved {
            id: conn,
            x: target.x,
            y: target.y,
            z: target.z,
            yaw: input.yaw,
            pitch: input.pitch,
            sprinting: input.sprinting,
        });

        let advanced = room.advance_if_at_exit(conn, rules, &mut self.rng);
        self.outbox
            .broadcast_except(&room.player_ids(), conn, &moved);
        if let Some(advanced) = advanced {
            self.outbox.send(conn, Msg::PlayerLevelAdvanced(advanced));
        }
    }

    /// Hitscan resolution for every pellet of a shot.
    pub(super) fn handle_shoot(&mut self, conn: ConnId, input: ShootInput) {
        let rules = &self.config.game;
        let combat = &self.config.combat;
        let now = self.clock.now_ms();
        let Some(room) = self.rooms.room_of_mut(conn) else {
            return;
        };
        if !room.is_playing() {
            return;
        }
        let Some(shooter) = room.player(conn) else {
            return;
        };
        if !shooter.alive {
            return;
        }
        let direction = input.direction.to_vec3().normalize_or_zero();
        if direction == Vec3::ZERO {
            return;
        }

        let weapon = Weapon::parse(&input.weapon).unwrap_or(shooter.weapon);
        let claimed = input.origin.to_vec3();
        let origin = if claimed.distance_squared(shooter.position)
            <= combat.max_origin_drift * combat.max_origin_drift
        {
            claimed
        } else {
            shooter.position
        };
        let ids = room.player_ids();
        self.outbox.broadcast_except(
            &ids,
            conn,
            &Msg::PlayerShot(PlayerShot {
                id: conn,
                origin: origin.into(),
                direction: direction.into(),
                weapon,
            }),
        );

        let stats = weapons::stats(weapon);
        let Some(course) = room.course_of(conn) else {
            return;
        };
        let mut targets = room.targets_on_level(shooter.level);
        let mut health: HashMap<ConnId, i32> = room.players().map(|p| (p.id, p.health)).collect();

        // Pellets after a kill pass through the corpse.
        let mut hits = Vec::new();
        for _ in 0..stats.pellets {
            let ray = Ray {
                origin,
                direction: weapons::jitter(direction, stats.spread, &mut self.rng),
                max_range: stats.range,
                step: combat.ray_step,
            };
            let Some(hit) = collision::raycast_players(
                &course.maze,
                &ray,
                &targets,
                conn,
                combat.probe_radius,
                combat.hit_radius,
            ) else {
                continue;
            };
            hits.push(hit.target_id);
            let remaining = health.entry(hit.target_id).or_default();
            *remaining -= stats.damage;
            if *remaining <= 0 {
                if let Some(target) = targets.iter_mut().find(|t| t.id == hit.target_id) {
                    target.alive = false;
                }
            }
        }

        for target_id in hits {
            let Some(target) = room.player_mut(target_id) else {
                continue;
            };
            if !target.alive {
                continue;
            }
            let fatal = target.take_damage(stats.damage);
            let target_health = target.health;
            let target_name = target.name.clone();
            // A killing hit is reported only through `playerKilled`.
            if !fatal {
                self.outbox.send(
                    target_id,
                    Msg::PlayerDamaged(PlayerDamaged {
                        health: target_health,
                        attacker_id: conn,
                    }),
                );
                self.outbox.send(
                    conn,
                    Msg::HitConfirmed(HitConfirmed {
                        target_id,
                        damage: stats.damage,
                        target_health,
                    }),
                );
                continue;
            }

            let Some(shooter) = room.player_mut(conn) else {
                continue;
            };
            shooter.score += rules.kill_score;
            let killed = PlayerKilled {
                killer_id: conn,
                killer_name: shooter.name.clone(),
                target_id,
                target_name,
                killer_score: shooter.score,
            };
            info!(
                "Room {}: {} killed {} ({} pts)",
                room.id, killed.killer_name, killed.target_name, killed.killer_score
            );
            self.outbox.broadcast(&ids, &Msg::PlayerKilled(killed));
            room.queue_respawn(target_id, now + rules.respawn_delay_ms);
        }
    }

    pub(super) fn handle_reached_exit(&mut self, conn: ConnId) {
        let Some(room) = self.rooms.room_of_mut(conn) else {
            return;
        };
        if let Some(advanced) = room.advance_if_at_exit(conn, &self.config.game, &mut self.rng) {
            self.outbox.send(conn, Msg::PlayerLevelAdvanced(advanced));
        }
    }

    pub(super) fn handle_npc_kill(&mut self, conn: ConnId, enemy_id: Option<u32>) {
        let Some(room) = self.rooms.room_of_mut(conn) else {
            return;
        };
        if !room.is_playing() {
            return;
        }
        let Some(player) = room.player_mut(conn) else {
            return;
        };
        player.score += self.config.game.npc_kill_score;
        if let Some(enemy_id) = enemy_id {
            room.remove_enemy(conn, enemy_id);
        }
    }

    /// Award the boss kill, announce the winner and return the room to the
    /// lobby.
    pub(super) fn handle_boss_kill(&mut self, conn: ConnId) {
        let Some(room) = self.rooms.room_of_mut(conn) else {
            return;
        };
        if !room.is_playing() {
            return;
        }
        let Some(player) = room.player_mut(conn) else {
            return;
        };
        player.score += self.config.game.boss_kill_score;
        let boss_killer_name = player.name.clone();

        let Some(winner) = room.winner() else {
            return;
        };
        let won = GameWon {
            boss_killer_id: conn,
            boss_killer_name,
            winner_id: winner.id,
            winner_name: winner.name.clone(),
            winner_score: winner.score,
            scoreboard: room.scoreboard(),
        };
        info!(
            "Room {}: boss down by {}, {} wins with {}",
            room.id, won.boss_killer_name, won.winner_name, won.winner_score
        );
        let ids = room.player_ids();
        self.outbox.broadcast(&ids, &Msg::GameWon(won));

        room.reset_after_win();
        self.outbox.broadcast(&ids, &Msg::RoomUpdated(room.info()));
        self.broadcast_room_list();
    }
}
