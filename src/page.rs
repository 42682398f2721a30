//! Assembles the full HTML document for one feed item.

use std::sync::Arc;

use crate::cache::DiskCache;
use crate::clock::{self, Clock, SystemClock};
use crate::error::RenderError;
use crate::html::{self, ProtocolFix};
use crate::model::FeedItem;
use crate::theme::{ColorAttr, RenderContext, Theme, css_color};

/// Favicon shown when the feed doesn't have one.
pub const DEFAULT_FAVICON: &str = "file:///android_res/drawable/default_feed_icon_light.png";

/// Stylesheet linked from every page.
pub const DEFAULT_STYLESHEET: &str = "web.css";

/// Feed title used for items that aren't attached to a feed.
const UNDEFINED_FEED_TITLE: &str = "Undefined";

const VIEWPORT_META: &str = "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1, maximum-scale=1, minimum-scale=1, user-scalable=0\" />";

/// Page-independent rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    pub stylesheet: String,
    pub default_favicon: String,
    pub protocol_fix: ProtocolFix,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            default_favicon: DEFAULT_FAVICON.to_string(),
            protocol_fix: ProtocolFix::default(),
        }
    }
}

/// Builds item pages from injected collaborators.
///
/// The output depends only on the arguments, the cache contents and the
/// clock, so two calls with the same inputs produce the same bytes.
#[derive(Clone)]
pub struct PageBuilder {
    cache: Arc<dyn DiskCache>,
    clock: Arc<dyn Clock>,
    options: PageOptions,
}

impl PageBuilder {
    pub fn new(cache: Arc<dyn DiskCache>) -> Self {
        Self {
            cache,
            clock: Arc::new(SystemClock),
            options: PageOptions::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_options(mut self, options: PageOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// Render `item` as a complete HTML document.
    pub fn build_page(
        &self,
        ctx: &RenderContext,
        item: &FeedItem,
        show_header: bool,
    ) -> Result<String, RenderError> {
        let attrs = [ColorAttr::DividerLine, ColorAttr::ItemListBackground];
        let colors = ctx.colors.resolve(&attrs);
        let [divider, background] = colors[..] else {
            return Err(RenderError::MissingColours {
                expected: attrs.len(),
                got: colors.len(),
            });
        };

        let mut feed_title = UNDEFINED_FEED_TITLE.to_string();
        let mut feed_color = divider;
        let mut favicon_url = None;

        if let Some(feed) = &item.feed {
            feed_title = html::escape_html(&feed.title);
            favicon_url = feed.favicon_url.clone();
            if let Some(avg) = &feed.avg_colour {
                feed_color = parse_avg_colour(avg)?;
            }
        }

        let favicon = self.resolve_favicon(favicon_url)?;

        let body_id = Theme::from_id(ctx.theme.selected_theme()).body_id();
        let (rtl_class, border_side) = if ctx.right_to_left {
            ("rtl", "right")
        } else {
            ("", "left")
        };

        let mut page = String::new();

        page.push_str("<html><head>");
        page.push_str(VIEWPORT_META);
        page.push_str(&format!(
            "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\" />",
            html::escape_html(&self.options.stylesheet)
        ));
        page.push_str("<style type=\"text/css\">");
        page.push_str(&format!(
            "#top_section {{ border-{}: 4px solid {}; border-bottom: 1px solid {}; background: {} }}",
            border_side,
            css_color(feed_color),
            css_color(divider),
            css_color(background),
        ));
        page.push_str("</style>");
        page.push_str(&format!("</head><body id=\"{body_id}\" class=\"{rtl_class}\">"));

        if show_header {
            self.push_header(&mut page, item, feed_title, &favicon);
        }

        let body = html::localize_images(&item.body, self.cache.as_ref());
        let body = html::strip_video_preload(body.trim());

        page.push_str("<div id=\"content\">");
        page.push_str(&body);
        page.push_str("</div>");

        page.push_str("</body></html>");

        Ok(html::fix_protocol_relative(page, self.options.protocol_fix))
    }

    fn push_header(&self, page: &mut String, item: &FeedItem, mut feed_title: String, favicon: &str) {
        page.push_str("<div id=\"top_section\">");

        page.push_str("<div id=\"header\">");
        page.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            html::escape_html(&item.link),
            html::escape_html(&item.title)
        ));
        page.push_str("</div>");

        if let Some(author) = &item.author {
            let author = html::escape_html(author);
            let author = author.trim();
            if !author.is_empty() {
                feed_title.push_str(" - ");
                feed_title.push_str(author);
            }
        }

        page.push_str("<div id=\"header_small_text\">");

        page.push_str("<div id=\"subscription\">");
        page.push_str(&format!(
            "<img id=\"imgFavicon\" src=\"{}\" />",
            html::escape_html(favicon)
        ));
        page.push_str(feed_title.trim());
        page.push_str("</div>");

        if let Some(published) = item.published {
            page.push_str("<div id=\"datetime\">");
            page.push_str(&clock::relative_time_span(published, self.clock.now()));
            page.push_str("</div>");
        }

        page.push_str("</div>");

        page.push_str("</div>");
    }

    /// Cached copy of the favicon, the remote URL if it isn't cached, or the
    /// default icon when the feed has none.
    fn resolve_favicon(&self, favicon_url: Option<String>) -> Result<String, RenderError> {
        let Some(url) = favicon_url else {
            return Ok(self.options.default_favicon.clone());
        };

        match self.cache.lookup(&url) {
            Ok(Some(path)) => Ok(format!("file://{}", path.display())),
            Ok(None) => Ok(url),
            Err(source) => Err(RenderError::Cache { url, source }),
        }
    }
}

impl std::fmt::Debug for PageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuilder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Parse a feed's stored average colour (decimal, signed 32-bit ARGB).
fn parse_avg_colour(value: &str) -> Result<u32, RenderError> {
    value
        .trim()
        .parse::<i32>()
        .map(|argb| argb as u32)
        .map_err(|_| RenderError::InvalidColour(value.to_string()))
}
