//! Error types shared by both rendering engines and the page pool.

use std::path::PathBuf;

/// Everything that can abort a render.
///
/// Malformed CSS, unknown tags and bad colours never show up here: the style
/// resolver falls back to the inherited value instead.
#[derive(thiserror::Error, Debug)]
pub enum PressError {
    // ── Configuration (surfaced before any work is done) ─────────────────
    #[error("configuration error: {0}")]
    Config(String),

    #[error("template not readable: {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    // ── Pooled engine ─────────────────────────────────────────────────────
    #[error("browser error: {0}")]
    Browser(String),

    #[error("page capture failed: {0}")]
    Capture(String),

    #[error("timed out after {0:?} waiting for a browser page")]
    AcquireTimeout(std::time::Duration),

    #[error("page pool has been shut down")]
    PoolShutDown,

    // ── Native engine ─────────────────────────────────────────────────────
    #[error("PDF encoding failed: {0}")]
    Encoding(String),

    #[error("render task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, PressError>;
