//! Error types
//!
//! `FieldError` is fatal and only produced while building or loading a field.
//! `CollisionFault` is a per-tick numerical fault that callers absorb.

use std::io;

/// Fatal errors raised while constructing or configuring a field
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("No asteroid models available (asteroid_kinds is 0)")]
    NoAsteroidKinds,
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Invalid level: {0}")]
    InvalidLevel(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to spawn simulation worker: {0}")]
    WorkerSpawn(io::Error),
}

/// Non-fatal numerical fault inside collision or player-contact code.
///
/// The tick that hit it treats the affected step as "no effect" and moves on.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CollisionFault {
    #[error("Bodies share the same center")]
    CoincidentCenters,
    #[error("Camera basis is degenerate")]
    DegenerateCamera,
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FieldError::InvalidSettings("sector_count must be odd".into()).to_string(),
            "Invalid settings: sector_count must be odd"
        );
        assert_eq!(
            CollisionFault::NonFinite("velocity").to_string(),
            "Non-finite value in velocity"
        );
    }

    #[test]
    fn test_parse_error_converts() {
        let err: FieldError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, FieldError::Parse(_)));
    }
}
