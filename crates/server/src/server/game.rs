//! Fixed-rate game tick.

use std::sync::Arc;

use protocol::ServerMessage as Msg;
use protocol::packets::{EnemyUpdate, GameSnapshot};
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

use super::{Server, catch_panic};

impl Server {
    /// Advance every playing room by one tick.
    ///
    /// Order per room: due respawns, exit safety net, full state broadcast,
    /// then each player's enemy list for their current level.
    pub fn tick(&mut self) {
        self.expire_grace();
        let now = self.clock.now_ms();
        let rules = &self.config.game;

        for room_id in self.rooms.playing_ids() {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                continue;
            };
            let ids = room.player_ids();

            for respawned in room.process_respawns(now, rules, &mut self.rng) {
                self.outbox.broadcast(&ids, &Msg::PlayerRespawned(respawned));
            }

            // Catches exits reached between move messages.
            for &id in &ids {
                if let Some(advanced) = room.advance_if_at_exit(id, rules, &mut self.rng) {
                    self.outbox.send(id, Msg::PlayerLevelAdvanced(advanced));
                }
            }

            self.outbox.broadcast(
                &ids,
                &Msg::GameState(GameSnapshot {
                    players: room.snapshot(),
                }),
            );

            for player in room.players() {
                let enemies = room
                    .enemies_for(player.id, player.level)
                    .map(<[_]>::to_vec)
                    .unwrap_or_default();
                self.outbox.send(
                    player.id,
                    Msg::EnemyUpdate(EnemyUpdate {
                        level: player.level,
                        enemies,
                    }),
                );
            }
        }
    }
}

/// Drive [`Server::tick`] every `tick_interval_ms`.
pub async fn run_game_loop(server: Arc<RwLock<Server>>, tick_interval_ms: u64) {
    let interval = Duration::from_millis(tick_interval_ms.max(1));
    let mut ticker = interval_at(Instant::now() + interval, interval);
    // Skip missed ticks rather than bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Game loop running every {}ms", tick_interval_ms);

    let mut tick_count: u64 = 0;
    loop {
        ticker.tick().await;
        tick_count += 1;

        let mut server = server.write().await;
        let tick_start = std::time::Instant::now();
        if catch_panic(format_args!("tick #{tick_count}"), || server.tick()).is_none() {
            continue;
        }
        let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

        let tick_budget = tick_interval_ms as f64 * 0.9;
        if tick_ms > tick_budget {
            warn!(
                "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} rooms, {} connections",
                tick_count,
                tick_ms,
                tick_budget,
                server.rooms().len(),
                server.connection_count()
            );
        }
    }
}
