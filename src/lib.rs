pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod html;
pub mod model;
pub mod page;
pub mod render;
pub mod theme;

// Re-export commonly used types
pub use error::RenderError;
pub use model::{Feed, FeedItem};
pub use page::PageBuilder;
pub use theme::RenderContext;
