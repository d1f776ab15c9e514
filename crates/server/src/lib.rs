//! Mazerun authoritative game server library.

pub mod clock;
pub mod collision;
pub mod config;
pub mod error;
pub mod maze;
pub mod net;
pub mod room;
pub mod scheduler;
pub mod server;
pub mod spawn;
pub mod weapons;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::GameError;
pub use net::{AppState, router, run, serve};
pub use server::Server;
