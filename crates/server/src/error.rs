//! Game-level errors reported back to the offending client.

use thiserror::Error;

/// Protocol violations. The `Display` text is what the client sees in its
/// `error` message; no state is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Game already in progress")]
    GameInProgress,

    #[error("You are not in a room")]
    NotInRoom,

    #[error("Only the room creator can start the game")]
    NotCreator,
}
