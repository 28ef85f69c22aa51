//! Control unit error types.

use lift_common::config::ConfigError;
use thiserror::Error;

use crate::state::HsmError;

/// Errors while building or running the cycle.
#[derive(Debug, Clone, Error)]
pub enum CycleError {
    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State tree rejected by the engine.
    #[error("state machine error: {0}")]
    Machine(#[from] HsmError),
}

// ─── Tests ──────────────────────────────────────────────────────────
