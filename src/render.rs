//! Background page rendering.
//!
//! Building a page touches the disk cache once per image, so it runs on the
//! blocking pool via `tokio::task::spawn_blocking`. The result comes back
//! over a oneshot channel and is consumed on whichever task holds the
//! [`RenderHandle`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::RenderError;
use crate::model::FeedItem;
use crate::page::PageBuilder;
use crate::theme::RenderContext;

/// Result delivered by a render task.
pub type RenderResult = Result<String, RenderError>;

/// Request to render one item in the background.
pub struct RenderRequest {
    pub context: RenderContext,
    pub item: FeedItem,
    /// Whether to include the title/feed/date header block.
    pub show_header: bool,
    /// Channel to send the rendered page.
    pub respond_to: oneshot::Sender<RenderResult>,
}

/// Receives the outcome of a render.
pub trait RenderListener {
    /// The item was rendered to a full HTML page.
    fn on_rendered(&self, page: String);

    /// Rendering failed. The default just logs.
    fn on_failed(&self, err: &RenderError) {
        tracing::error!(error = %err, "item render failed");
    }
}

/// Spawn a blocking task that renders `req` with `builder`.
///
/// The page is built at most once and sent at most once. If the receiver was
/// dropped before the worker started, the build is skipped; if it is dropped
/// while building, the finished page is discarded.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_render(builder: Arc<PageBuilder>, req: RenderRequest) {
    tokio::task::spawn_blocking(move || {
        if req.respond_to.is_closed() {
            tracing::debug!(title = %req.item.title, "render cancelled before start");
            return;
        }

        let result = builder.build_page(&req.context, &req.item, req.show_header);

        // Receiver may have been dropped if the user navigated away.
        if req.respond_to.send(result).is_err() {
            tracing::debug!(title = %req.item.title, "render finished after caller detached");
        }
    });
}

/// Convenience function to spawn a render and return a handle to its result.
///
/// Must be called from within a tokio runtime, like [`spawn_render`].
///
/// ```ignore
/// let handle = render::render_item(builder.clone(), ctx, item, true);
/// // Later, in the event loop:
/// if let Some(result) = handle.try_take() {
///     show(result?);
/// }
/// ```
pub fn render_item(
    builder: Arc<PageBuilder>,
    context: RenderContext,
    item: FeedItem,
    show_header: bool,
) -> RenderHandle {
    let (tx, rx) = oneshot::channel();
    spawn_render(
        builder,
        RenderRequest {
            context,
            item,
            show_header,
            respond_to: tx,
        },
    );
    RenderHandle { rx }
}

/// Pending result of a background render.
///
/// Awaiting the handle yields the page. Dropping it (or calling
/// [`RenderHandle::cancel`]) detaches the caller: the listener is never
/// invoked and the worker skips the build if it hasn't started.
#[derive(Debug)]
pub struct RenderHandle {
    rx: oneshot::Receiver<RenderResult>,
}

impl RenderHandle {
    /// Non-blocking check for the result.
    ///
    /// Returns `None` while the worker is still running. After a result has
    /// been taken, later calls report [`RenderError::WorkerGone`].
    pub fn try_take(&mut self) -> Option<RenderResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RenderError::WorkerGone)),
        }
    }

    /// Detach from the render. No result will be delivered.
    pub fn cancel(mut self) {
        self.rx.close();
    }

    /// Wait for the result and hand it to `listener` on the current task.
    pub async fn deliver<L: RenderListener + ?Sized>(self, listener: &L) {
        match self.await {
            Ok(page) => listener.on_rendered(page),
            Err(err) => listener.on_failed(&err),
        }
    }
}

impl Future for RenderHandle {
    type Output = RenderResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RenderError::WorkerGone)))
    }
}

/// Run a render and deliver the outcome to `listener` on the calling task,
/// unless the returned future is dropped first.
pub async fn run<L: RenderListener + ?Sized>(
    builder: Arc<PageBuilder>,
    context: RenderContext,
    item: FeedItem,
    listener: &L,
) {
    render_item(builder, context, item, true).deliver(listener).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiskCache;
    use crate::theme::{Palette, Theme};
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EmptyCache;

    impl DiskCache for EmptyCache {
        fn lookup(&self, _url: &str) -> io::Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    /// Counts lookups and panics on the first one, to exercise worker death.
    struct ExplodingCache(AtomicUsize);

    impl DiskCache for ExplodingCache {
        fn lookup(&self, _url: &str) -> io::Result<Option<PathBuf>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            panic!("cache exploded");
        }
    }

    #[derive(Default)]
    struct Recorder {
        pages: Mutex<Vec<String>>,
        failures: Mutex<Vec<String>>,
    }

    impl RenderListener for Recorder {
        fn on_rendered(&self, page: String) {
            self.pages.lock().unwrap().push(page);
        }

        fn on_failed(&self, err: &RenderError) {
            self.failures.lock().unwrap().push(err.to_string());
        }
    }

    fn ctx() -> RenderContext {
        RenderContext::new(
            Arc::new(Theme::Light),
            Arc::new(Palette {
                divider_line: 0xff000000,
                item_list_background: 0xffffffff,
            }),
            false,
        )
    }

    fn item(body: &str) -> FeedItem {
        FeedItem {
            title: "Title".to_string(),
            link: "https://example.com/post".to_string(),
            body: body.to_string(),
            ..FeedItem::default()
        }
    }

    #[tokio::test]
    async fn handle_resolves_to_page() {
        let builder = Arc::new(PageBuilder::new(Arc::new(EmptyCache)));
        let page = render_item(builder, ctx(), item("<p>hi</p>"), true).await.unwrap();
        assert!(page.contains("<body id=\"lightTheme\""));
        assert!(page.contains("<div id=\"content\"><p>hi</p></div>"));
    }

    #[test]
    #[should_panic]
    fn render_item_outside_runtime_panics() {
        let builder = Arc::new(PageBuilder::new(Arc::new(EmptyCache)));
        let _handle = render_item(builder, ctx(), item("<p>hi</p>"), true);
    }

    #[tokio::test]
    async fn run_delivers_exactly_once() {
        let builder = Arc::new(PageBuilder::new(Arc::new(EmptyCache)));
        let recorder = Recorder::default();
        run(builder, ctx(), item("<p>once</p>"), &recorder).await;

        let pages = recorder.pages.lock().unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("<p>once</p>"));
        assert!(recorder.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn panicking_builder_reports_worker_gone() {
        let cache = Arc::new(ExplodingCache(AtomicUsize::new(0)));
        let builder = Arc::new(PageBuilder::new(cache.clone()));
        let recorder = Recorder::default();

        render_item(builder, ctx(), item(r#"<img src="https://x/a.png">"#), false)
            .deliver(&recorder)
            .await;

        assert!(recorder.pages.lock().unwrap().is_empty());
        assert_eq!(
            *recorder.failures.lock().unwrap(),
            vec![RenderError::WorkerGone.to_string()]
        );
        assert_eq!(cache.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_render_skips_build() {
        let cache = Arc::new(ExplodingCache(AtomicUsize::new(0)));
        let builder = Arc::new(PageBuilder::new(cache.clone()));

        let (tx, rx) = oneshot::channel();
        drop(rx);
        spawn_render(
            builder,
            RenderRequest {
                context: ctx(),
                item: item(r#"<img src="https://x/a.png">"#),
                show_header: false,
                respond_to: tx,
            },
        );

        // Give the blocking pool a chance to pick the task up.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(cache.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn try_take_polls_without_blocking() {
        let builder = Arc::new(PageBuilder::new(Arc::new(EmptyCache)));
        let mut handle = render_item(builder, ctx(), item("<p>poll</p>"), false);

        let result = loop {
            if let Some(result) = handle.try_take() {
                break result;
            }
            tokio::task::yield_now().await;
        };
        assert!(result.unwrap().contains("<p>poll</p>"));
        assert!(matches!(handle.try_take(), Some(Err(RenderError::WorkerGone))));
    }
}
