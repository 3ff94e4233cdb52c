//! Error types for track loading and layout

/// Result type alias
pub type Result<T> = std::result::Result<T, TrackError>;

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// Malformed persisted track (unknown piece type, missing field, bad rotation)
    #[error("Failed to decode track: {0}")]
    Decode(#[from] serde_json::Error),

    /// I/O error while reading or writing a track file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A track needs at least one piece
    #[error("Track has no pieces")]
    Empty,
}
