//! Game-specific error types.
//!
//! Body construction and outline loading propagate errors through these types
//! rather than panicking. Systems log them and carry on: a bad drawing yields
//! an absent body, never a crash.

use std::fmt;

/// Top-level error enum for doodle-drop.
#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    /// The outline has fewer than 3 usable vertices after cleaning.
    DegenerateOutline {
        /// Number of vertices left after deduplication.
        vertex_count: usize,
    },

    /// The outline crosses itself, so it cannot be decomposed.
    SelfIntersectingOutline,

    /// Convex decomposition produced no usable parts.
    Decomposition {
        reason: String,
    },

    /// The SVG document could not be parsed.
    SvgDocument {
        reason: String,
    },

    /// An SVG document contained no drawable path.
    MissingPathElement,

    /// Reading or decoding an outline supplier file failed.
    OutlineFile {
        path: String,
        reason: String,
    },

    /// A level name did not match any registered level.
    UnknownLevel {
        name: String,
    },
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::DegenerateOutline { vertex_count } => write!(
                f,
                "outline is degenerate: only {} usable vertices (need ≥ 3)",
                vertex_count
            ),
            GameError::SelfIntersectingOutline => write!(f, "drawing is self-intersecting"),
            GameError::Decomposition { reason } => {
                write!(f, "convex decomposition failed: {}", reason)
            }
            GameError::SvgDocument { reason } => write!(f, "invalid SVG document: {}", reason),
            GameError::MissingPathElement => write!(f, "SVG document has no path"),
            GameError::OutlineFile { path, reason } => {
                write!(f, "failed to read outline file '{}': {}", path, reason)
            }
            GameError::UnknownLevel { name } => write!(f, "unknown level '{}'", name),
        }
    }
}

impl std::error::Error for GameError {}

/// Convenience alias: a `Result` using `GameError` as the error type.
pub type GameResult<T> = Result<T, GameError>;
