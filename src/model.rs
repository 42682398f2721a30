use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Domain models
// ---------------------------------------------------------------------------

/// A subscribed feed, as far as page rendering is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: String,
    pub favicon_url: Option<String>,
    /// Average colour of the favicon, stored as the decimal form of a signed
    /// 32-bit ARGB integer (e.g. `"-16776961"` for opaque blue).
    pub avg_colour: Option<String>,
}

/// A single entry belonging to a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// Raw HTML body of the entry.
    pub body: String,
    pub feed: Option<Feed>,
}
