use std::time::Duration;

use anyhow::Context;

use crate::html;
use crate::model::{Feed, FeedItem};

/// Build a shared HTTP client with the given timeout and a browser-like
/// user agent (some sites return HTML error pages to bots).
pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36")
        .build()
        .context("Failed to create HTTP client")
}

/// Read feed bytes from an http(s) URL or a local path.
pub async fn load_source(client: &reqwest::Client, source: &str) -> anyhow::Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetch(client, source).await
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read feed file: {source}"))
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<u8>> {
    let response = client
        .get(url)
        .header("Accept", "application/rss+xml, application/rdf+xml, application/atom+xml, application/xml, text/xml, */*")
        .send()
        .await
        .with_context(|| format!("Failed to fetch feed: {url}"))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("HTTP {} fetching {}", status.as_u16(), url);
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        anyhow::bail!("Empty response from feed: {url}");
    }

    Ok(bytes.to_vec())
}

/// Parse RSS/Atom bytes into the feed and its items.
///
/// Each item carries a copy of the feed so it can be rendered on its own.
pub fn parse_feed(bytes: &[u8]) -> anyhow::Result<(Feed, Vec<FeedItem>)> {
    // Some feeds ship a UTF-8 BOM.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let lower = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]).to_lowercase();
    if lower.contains("<html") || lower.contains("<!doctype html") {
        anyhow::bail!("Source is an HTML page, not a feed");
    }

    let parsed = feed_rs::parser::parse(bytes).context("Failed to parse feed")?;

    let feed = Feed {
        title: parsed
            .title
            .map(|t| t.content)
            .unwrap_or_default(),
        favicon_url: parsed
            .icon
            .or(parsed.logo)
            .map(|image| image.uri)
            .filter(|uri| !uri.trim().is_empty()),
        avg_colour: None,
    };

    let items = parsed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "(untitled)".to_string());

            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();

            let author = entry.authors.first().map(|a| a.name.clone());

            let body = entry
                .content
                .and_then(|c| c.body)
                .or(entry.summary.map(|s| s.content))
                .unwrap_or_default();

            FeedItem {
                title,
                link,
                author,
                published: entry.published.or(entry.updated),
                body,
                feed: Some(feed.clone()),
            }
        })
        .collect();

    Ok((feed, items))
}

/// Pick entry `index` from parsed feed bytes.
pub fn load_item(bytes: &[u8], index: usize) -> anyhow::Result<FeedItem> {
    let (feed, mut items) = parse_feed(bytes)?;
    if index >= items.len() {
        anyhow::bail!(
            "Feed '{}' has {} entr{}, no entry at index {}",
            feed.title,
            items.len(),
            if items.len() == 1 { "y" } else { "ies" },
            index
        );
    }
    Ok(items.swap_remove(index))
}

/// Remote assets an item page may show: the favicon and every body image.
pub fn asset_urls(item: &FeedItem) -> Vec<String> {
    let mut urls: Vec<String> = item
        .feed
        .as_ref()
        .and_then(|f| f.favicon_url.clone())
        .into_iter()
        .collect();
    urls.extend(html::extract_image_links(&item.body));
    urls
}
