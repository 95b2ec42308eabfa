//! Gameplay error types.

use std::path::PathBuf;

use crate::round::GameState;

/// Errors raised by the gameplay layer.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// The path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`GameConfig`](crate::GameConfig).
    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The requested state change is not in the transition table.
    #[error("invalid game state transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// State the machine was in.
        from: GameState,
        /// State that was requested.
        to: GameState,
    },

    /// `go_back` was called with an empty history.
    #[error("no previous game state")]
    NoPreviousState,
}
