use std::io;

use thiserror::Error;

/// Failures that abort rendering of a page.
///
/// Per-image cache misses and lookup errors inside the body are not part of
/// this type: they are logged and the remote URL is left in place.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cache lookup failed for {url}: {source}")]
    Cache {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid feed colour: {0:?}")]
    InvalidColour(String),

    #[error("Colour resolver returned {got} colours, expected {expected}")]
    MissingColours { expected: usize, got: usize },

    #[error("Render worker exited without a result")]
    WorkerGone,
}
