//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub combat: CombatConfig,
}

impl Config {
    /// Load configuration from `config.toml` (creating it with defaults if
    /// missing), then apply the `PORT` environment override.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(Path::new("config.toml"))?;
        config.apply_env(std::env::var(PORT_ENV).ok().as_deref());
        Ok(config)
    }

    /// Load configuration from a specific file or use defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {:?} found, creating default config", path);
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Apply a `PORT` value; unparsable values are ignored.
    pub fn apply_env(&mut self, port: Option<&str>) {
        let Some(raw) = port else {
            return;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(_) => warn!("Ignoring invalid {}={:?}", PORT_ENV, raw),
        }
    }
}

/// Server networking and session settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// How long a disconnected token holder keeps their seat.
    #[serde(default = "default_reconnect_grace")]
    pub reconnect_grace_ms: u64,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// Messages buffered per connection before new ones are dropped.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            tick_interval_ms: default_tick_interval(),
            reconnect_grace_ms: default_reconnect_grace(),
            max_name_length: default_max_name_length(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_tick_interval() -> u64 {
    50
}
fn default_reconnect_grace() -> u64 {
    15_000
}
fn default_max_name_length() -> usize {
    20
}
fn default_outbound_queue() -> usize {
    256
}

/// Room, maze and progression rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameConfig {
    /// Minimum Manhattan distance between spawn cells.
    #[serde(default = "default_spawn_spacing")]
    pub spawn_spacing: usize,
    #[serde(default = "default_base_maze_size")]
    pub base_maze_rows: usize,
    #[serde(default = "default_base_maze_size")]
    pub base_maze_cols: usize,
    /// Rows and columns added per personal level.
    #[serde(default = "default_maze_growth")]
    pub maze_growth_per_level: usize,
    /// Cap on the per-level base dimension (before spawn scaling).
    #[serde(default = "default_max_maze_dim")]
    pub max_maze_dim: usize,
    #[serde(default = "default_max_players")]
    pub default_max_players: usize,
    #[serde(default = "default_max_players_limit")]
    pub max_players_limit: usize,
    #[serde(default = "default_max_room_name_length")]
    pub max_room_name_length: usize,
    /// Largest accepted displacement per `move` message.
    #[serde(default = "default_max_move_distance")]
    pub max_move_distance: f32,
    #[serde(default = "default_player_radius")]
    pub player_radius: f32,
    /// Distance from the exit cell centre that counts as reaching it.
    #[serde(default = "default_exit_radius")]
    pub exit_radius: f32,
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay_ms: u64,
    #[serde(default = "default_kill_score")]
    pub kill_score: u32,
    #[serde(default = "default_npc_kill_score")]
    pub npc_kill_score: u32,
    #[serde(default = "default_boss_kill_score")]
    pub boss_kill_score: u32,
    #[serde(default = "default_enemies_base")]
    pub enemies_base: usize,
    #[serde(default = "default_enemies_per_level")]
    pub enemies_per_level: usize,
    #[serde(default = "default_enemy_base_hp")]
    pub enemy_base_hp: i32,
    #[serde(default = "default_enemy_hp_per_level")]
    pub enemy_hp_per_level: i32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            spawn_spacing: default_spawn_spacing(),
            base_maze_rows: default_base_maze_size(),
            base_maze_cols: default_base_maze_size(),
            maze_growth_per_level: default_maze_growth(),
            max_maze_dim: default_max_maze_dim(),
            default_max_players: default_max_players(),
            max_players_limit: default_max_players_limit(),
            max_room_name_length: default_max_room_name_length(),
            max_move_distance: default_max_move_distance(),
            player_radius: default_player_radius(),
            exit_radius: default_exit_radius(),
            respawn_delay_ms: default_respawn_delay(),
            kill_score: default_kill_score(),
            npc_kill_score: default_npc_kill_score(),
            boss_kill_score: default_boss_kill_score(),
            enemies_base: default_enemies_base(),
            enemies_per_level: default_enemies_per_level(),
            enemy_base_hp: default_enemy_base_hp(),
            enemy_hp_per_level: default_enemy_hp_per_level(),
        }
    }
}

impl GameConfig {
    /// Base (unscaled) maze dimensions for a personal level.
    pub fn level_dimensions(&self, level: u32) -> (usize, usize) {
        let growth = self.maze_growth_per_level.saturating_mul(level as usize);
        let cap = self.max_maze_dim.max(1);
        (
            self.base_maze_rows.saturating_add(growth).clamp(1, cap),
            self.base_maze_cols.saturating_add(growth).clamp(1, cap),
        )
    }
}

fn default_spawn_spacing() -> usize {
    5
}
fn default_base_maze_size() -> usize {
    8
}
fn default_maze_growth() -> usize {
    2
}
fn default_max_maze_dim() -> usize {
    40
}
fn default_max_players() -> usize {
    4
}
fn default_max_players_limit() -> usize {
    8
}
fn default_max_room_name_length() -> usize {
    32
}
fn default_max_move_distance() -> f32 {
    3.0
}
fn default_player_radius() -> f32 {
    0.35
}
fn default_exit_radius() -> f32 {
    1.5
}
fn default_respawn_delay() -> u64 {
    3_000
}
fn default_kill_score() -> u32 {
    10
}
fn default_npc_kill_score() -> u32 {
    5
}
fn default_boss_kill_score() -> u32 {
    50
}
fn default_enemies_base() -> usize {
    3
}
fn default_enemies_per_level() -> usize {
    2
}
fn default_enemy_base_hp() -> i32 {
    50
}
fn default_enemy_hp_per_level() -> i32 {
    25
}

/// Server-side hit detection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CombatConfig {
    /// Ray sampling increment. Must stay below the thinnest wall/player.
    #[serde(default = "default_ray_step")]
    pub ray_step: f32,
    /// Radius of the wall probe at each ray sample.
    #[serde(default = "default_probe_radius")]
    pub probe_radius: f32,
    /// Radius of the player hit cylinder.
    #[serde(default = "default_hit_radius")]
    pub hit_radius: f32,
    /// How far a claimed shot origin may sit from the authoritative position.
    #[serde(default = "default_max_origin_drift")]
    pub max_origin_drift: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            ray_step: default_ray_step(),
            probe_radius: default_probe_radius(),
            hit_radius: default_hit_radius(),
            max_origin_drift: default_max_origin_drift(),
        }
    }
}

fn default_ray_step() -> f32 {
    0.1
}
fn default_probe_radius() -> f32 {
    0.05
}
fn default_hit_radius() -> f32 {
    0.5
}
fn default_max_origin_drift() -> f32 {
    2.0
}
