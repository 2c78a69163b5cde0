//! The shared lazy-load scheduler.
//!
//! One [`LazyLoader`] serves a whole document. Images are queued with
//! [`LazyLoader::add_image`]; layout is only read in batched visibility passes
//! that run after a short debounce. While anything is queued the loader also
//! listens for window resize/scroll and polls the document height, since
//! content injected below the fold changes nothing a scroll event would report.
//!
//! ```text
//!   Idle ──add_image──▶ Active ──pass renders last / remove_image──▶ Idle
//!                         │
//!            NoPassScheduled ⇄ PassScheduled   (debounce start / fire)
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use web_time::Instant;

use crate::host::{LoaderHost, TimerHandle};
use crate::image::LazyImage;
use crate::settings::LoaderSettings;

/// Whether the loader currently has work and is listening for changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderPhase {
    /// Nothing queued, no listeners, no poll.
    Idle,
    /// Images queued, window listeners and the height poll attached.
    Active,
}

/// Counters describing loader activity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Images currently waiting for their first reveal.
    pub pending: usize,

    /// Images committed by visibility passes.
    pub rendered: usize,

    /// Visibility passes run.
    pub passes: usize,

    /// Images taken out of the queue by [`LazyLoader::remove_image`].
    pub deregistered: usize,
}

/// Document-wide scheduler deciding when deferred sources are committed.
///
/// Cloning yields another handle to the same loader.
pub struct LazyLoader<H: LoaderHost> {
    inner: Rc<RefCell<LazyLoaderInner<H>>>,
}

/// Non-owning handle used by hosts to deliver events back to the loader.
pub struct WeakLazyLoader<H: LoaderHost> {
    inner: Weak<RefCell<LazyLoaderInner<H>>>,
}

struct LazyLoaderInner<H: LoaderHost> {
    host: H,
    settings: LoaderSettings,

    /// Images that have yet to be rendered.
    images: Vec<LazyImage>,

    /// Debounce timer for the next visibility pass.
    render_timer: Option<TimerHandle>,

    /// Last observed document height.
    document_height: f64,
    document_timer: Option<TimerHandle>,

    is_watching_window: bool,

    stats: LoaderStats,
}

impl<H: LoaderHost> LazyLoader<H> {
    /// Creates an idle loader. The initial document height is sampled now.
    pub fn new(host: H, settings: LoaderSettings) -> Self {
        let document_height = host.document_height();
        Self {
            inner: Rc::new(RefCell::new(LazyLoaderInner {
                host,
                settings,
                images: Vec::new(),
                render_timer: None,
                document_height,
                document_timer: None,
                is_watching_window: false,
                stats: LoaderStats::default(),
            })),
        }
    }

    /// Creates an idle loader with default settings.
    pub fn with_host(host: H) -> Self {
        Self::new(host, LoaderSettings::default())
    }

    /// Creates a handle that does not keep the loader alive.
    pub fn downgrade(&self) -> WeakLazyLoader<H> {
        WeakLazyLoader {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns true if both handles refer to the same loader.
    pub fn ptr_eq(&self, other: &LazyLoader<H>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Queues `image` for lazy rendering. Adding an image that is already
    /// queued leaves the queue unchanged.
    ///
    /// Schedules a pass if none is pending and starts watching the window if
    /// this is the first queued image.
    pub fn add_image(&self, image: LazyImage) {
        image.set_detached(false);
        let mut inner = self.inner.borrow_mut();
        if inner.images.iter().any(|queued| queued.ptr_eq(&image)) {
            log::trace!("add_image: image already queued");
            return;
        }
        inner.images.push(image);

        if inner.render_timer.is_none() {
            inner.start_render_timer();
        }

        if !inner.is_watching_window {
            inner.start_watching_window();
        }
    }

    /// Removes `image` from the render queue.
    ///
    /// Only the first matching handle is removed. The image is guaranteed not
    /// to be rendered by this loader afterwards. Removing an image that is not
    /// queued is a no-op. Returns true if the image was queued.
    pub fn remove_image(&self, image: &LazyImage) -> bool {
        image.set_detached(true);
        let mut inner = self.inner.borrow_mut();

        let removed = match inner.images.iter().position(|queued| queued.ptr_eq(image)) {
            Some(index) => {
                inner.images.remove(index);
                inner.stats.deregistered += 1;
                true
            }
            None => {
                log::trace!("remove_image: image not queued");
                false
            }
        };

        // If removing the image cleared the queue, stop monitoring.
        if inner.images.is_empty() {
            inner.clear_render_timer();
            inner.stop_watching_window();
        }

        removed
    }

    /// Delivers a fired timer. Handles this loader does not own are ignored.
    pub fn handle_timer(&self, handle: TimerHandle) {
        let (is_render_timer, is_document_timer) = {
            let inner = self.inner.borrow();
            (
                inner.render_timer == Some(handle),
                inner.document_timer == Some(handle),
            )
        };

        if is_render_timer {
            self.check_images();
        } else if is_document_timer {
            self.inner.borrow_mut().check_document_height();
        } else {
            log::trace!("ignoring stale timer {:?}", handle);
        }
    }

    /// Delivers a window resize or scroll.
    pub fn on_window_changed(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.render_timer.is_none() {
            inner.start_render_timer();
        }
    }

    /// Runs a visibility pass immediately, cancelling any scheduled one.
    pub fn check_now(&self) {
        self.check_images();
    }

    /// Checks every queued image against the current viewport, renders the
    /// visible ones and keeps the rest queued.
    fn check_images(&self) {
        let started = Instant::now();

        let (visible, remaining) = {
            let mut inner = self.inner.borrow_mut();
            let viewport = inner.host.viewport();
            let margin = inner.settings.margin;

            // The pass works on the queue as it stood when it started.
            let images = std::mem::take(&mut inner.images);
            let mut visible: SmallVec<[LazyImage; 8]> = SmallVec::new();
            let mut hidden = Vec::with_capacity(images.len());
            for image in images {
                if image.is_visible_with_margin(&viewport, margin) {
                    visible.push(image);
                } else {
                    hidden.push(image);
                }
            }

            inner.images = hidden;
            inner.clear_render_timer();
            inner.stats.passes += 1;

            if inner.images.is_empty() {
                inner.stop_watching_window();
            }

            (visible, inner.images.len())
        };

        // Elements are written with the loader released so a source write may
        // queue further images.
        let mut rendered = 0;
        for image in &visible {
            if image.is_detached() {
                continue;
            }
            image.render();
            rendered += 1;
        }
        self.inner.borrow_mut().stats.rendered += rendered;

        log::trace!(
            "visibility pass rendered {} image(s), {} still hidden ({:?})",
            rendered,
            remaining,
            started.elapsed()
        );
    }

    /// Returns [`LoaderPhase::Active`] while window listeners are attached.
    pub fn phase(&self) -> LoaderPhase {
        if self.inner.borrow().is_watching_window {
            LoaderPhase::Active
        } else {
            LoaderPhase::Idle
        }
    }

    /// Returns true while a debounced visibility pass is scheduled.
    pub fn is_pass_scheduled(&self) -> bool {
        self.inner.borrow().render_timer.is_some()
    }

    /// Returns true while resize/scroll listeners and the height poll are attached.
    pub fn is_watching_window(&self) -> bool {
        self.inner.borrow().is_watching_window
    }

    /// Number of images still waiting for their first reveal.
    pub fn pending_len(&self) -> usize {
        self.inner.borrow().images.len()
    }

    /// Returns true if `image` is queued.
    pub fn is_pending(&self, image: &LazyImage) -> bool {
        self.inner
            .borrow()
            .images
            .iter()
            .any(|queued| queued.ptr_eq(image))
    }

    /// Snapshot of the loader's counters.
    pub fn stats(&self) -> LoaderStats {
        let inner = self.inner.borrow();
        LoaderStats {
            pending: inner.images.len(),
            ..inner.stats.clone()
        }
    }

    /// Settings the loader was created with.
    pub fn settings(&self) -> LoaderSettings {
        self.inner.borrow().settings.clone()
    }
}

impl<H: LoaderHost> LazyLoaderInner<H> {
    fn start_render_timer(&mut self) {
        let delay = self.settings.render_delay;
        self.render_timer = self.host.set_timeout(delay);
        if self.render_timer.is_none() {
            log::warn!("could not schedule visibility pass");
        }
    }

    fn clear_render_timer(&mut self) {
        if let Some(handle) = self.render_timer.take() {
            self.host.clear_timeout(handle);
        }
    }

    fn start_watching_window(&mut self) {
        self.is_watching_window = true;
        self.host.watch_window();

        let period = self.settings.document_poll_interval;
        self.document_timer = self.host.set_interval(period);
        log::debug!("lazy loader active, watching window");
    }

    fn stop_watching_window(&mut self) {
        if !self.is_watching_window {
            return;
        }
        self.is_watching_window = false;
        self.host.unwatch_window();

        if let Some(handle) = self.document_timer.take() {
            self.host.clear_interval(handle);
        }
        log::debug!("lazy loader idle, stopped watching window");
    }

    fn check_document_height(&mut self) {
        // A pass is already on its way; the height would not change its outcome.
        if self.render_timer.is_some() {
            return;
        }

        let current = self.host.document_height();
        if current == self.document_height {
            return;
        }

        log::trace!(
            "document height changed {} -> {}",
            self.document_height,
            current
        );
        self.document_height = current;
        self.start_render_timer();
    }
}

impl<H: LoaderHost> Drop for LazyLoaderInner<H> {
    fn drop(&mut self) {
        self.clear_render_timer();
        self.stop_watching_window();
    }
}

impl<H: LoaderHost> Clone for LazyLoader<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: LoaderHost> fmt::Debug for LazyLoader<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("LazyLoader")
            .field("pending", &inner.images.len())
            .field("render_timer", &inner.render_timer)
            .field("document_timer", &inner.document_timer)
            .field("is_watching_window", &inner.is_watching_window)
            .finish_non_exhaustive()
    }
}

impl<H: LoaderHost> WeakLazyLoader<H> {
    /// Returns the loader if it is still alive.
    pub fn upgrade(&self) -> Option<LazyLoader<H>> {
        self.inner.upgrade().map(|inner| LazyLoader { inner })
    }
}

impl<H: LoaderHost> Clone for WeakLazyLoader<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Viewport};
    use crate::host::{TimerHost, WindowHost};
    use crate::image::ImageElement;
    use std::cell::Cell;
    use std::time::Duration;

    /// Records host calls; timers never fire on their own.
    #[derive(Clone, Default)]
    struct RecordingHost {
        state: Rc<RefCell<RecordingState>>,
    }

    #[derive(Default)]
    struct RecordingState {
        next_handle: u64,
        timeouts: Vec<TimerHandle>,
        intervals: Vec<TimerHandle>,
        watching: bool,
        reject_timeouts: bool,
        viewport: Viewport,
        document_height: f64,
    }

    impl TimerHost for RecordingHost {
        fn set_timeout(&mut self, _delay: Duration) -> Option<TimerHandle> {
            let mut state = self.state.borrow_mut();
            if state.reject_timeouts {
                return None;
            }
            state.next_handle += 1;
            let handle = TimerHandle(state.next_handle);
            state.timeouts.push(handle);
            Some(handle)
        }

        fn clear_timeout(&mut self, handle: TimerHandle) {
            self.state.borrow_mut().timeouts.retain(|h| *h != handle);
        }

        fn set_interval(&mut self, _period: Duration) -> Option<TimerHandle> {
            let mut state = self.state.borrow_mut();
            state.next_handle += 1;
            let handle = TimerHandle(state.next_handle);
            state.intervals.push(handle);
            Some(handle)
        }

        fn clear_interval(&mut self, handle: TimerHandle) {
            self.state.borrow_mut().intervals.retain(|h| *h != handle);
        }
    }

    impl WindowHost for RecordingHost {
        fn viewport(&self) -> Viewport {
            self.state.borrow().viewport
        }

        fn document_height(&self) -> f64 {
            self.state.borrow().document_height
        }

        fn watch_window(&mut self) {
            self.state.borrow_mut().watching = true;
        }

        fn unwatch_window(&mut self) {
            self.state.borrow_mut().watching = false;
        }
    }

    struct FixedElement {
        rect: Cell<Rect>,
        writes: Rc<Cell<usize>>,
    }

    impl ImageElement for FixedElement {
        fn bounding_rect(&self) -> Rect {
            self.rect.get()
        }

        fn set_src(&self, _src: Option<&str>) {
            self.writes.set(self.writes.get() + 1);
        }
    }

    fn image_at(top: f64) -> (LazyImage, Rc<Cell<usize>>) {
        let writes = Rc::new(Cell::new(0));
        let image = LazyImage::new(FixedElement {
            rect: Cell::new(Rect::from_origin_size(0.0, top, 50.0, 50.0)),
            writes: writes.clone(),
        });
        image.set_source("img.png");
        (image, writes)
    }

    fn loader() -> (LazyLoader<RecordingHost>, RecordingHost) {
        let host = RecordingHost::default();
        host.state.borrow_mut().viewport = Viewport::new(1024.0, 800.0);
        (LazyLoader::with_host(host.clone()), host)
    }

    fn fire_render_timer(loader: &LazyLoader<RecordingHost>, host: &RecordingHost) {
        let handle = *host.state.borrow().timeouts.last().expect("no render timer");
        loader.handle_timer(handle);
    }

    #[test]
    fn test_add_image_activates_loader() {
        let (loader, host) = loader();
        assert_eq!(loader.phase(), LoaderPhase::Idle);

        let (image, _) = image_at(0.0);
        loader.add_image(image);

        assert_eq!(loader.phase(), LoaderPhase::Active);
        assert!(loader.is_pass_scheduled());
        let state = host.state.borrow();
        assert!(state.watching);
        assert_eq!(state.timeouts.len(), 1);
        assert_eq!(state.intervals.len(), 1);
    }

    #[test]
    fn test_second_add_reuses_timers() {
        let (loader, host) = loader();
        loader.add_image(image_at(0.0).0);
        loader.add_image(image_at(900.0).0);

        let state = host.state.borrow();
        assert_eq!(state.timeouts.len(), 1);
        assert_eq!(state.intervals.len(), 1);
        assert_eq!(loader.pending_len(), 2);
    }

    #[test]
    fn test_pass_renders_only_visible() {
        let (loader, host) = loader();
        let (near, near_writes) = image_at(100.0);
        let (far, far_writes) = image_at(900.0);
        loader.add_image(near.clone());
        loader.add_image(far.clone());

        fire_render_timer(&loader, &host);

        assert_eq!(near_writes.get(), 1);
        assert_eq!(far_writes.get(), 0);
        assert!(near.is_rendered());
        assert!(!loader.is_pending(&near));
        assert!(loader.is_pending(&far));
        assert!(!loader.is_pass_scheduled());
        assert_eq!(loader.phase(), LoaderPhase::Active);
        assert_eq!(loader.stats().rendered, 1);
        assert_eq!(loader.stats().passes, 1);
    }

    #[test]
    fn test_draining_queue_goes_idle() {
        let (loader, host) = loader();
        loader.add_image(image_at(0.0).0);
        fire_render_timer(&loader, &host);

        assert_eq!(loader.phase(), LoaderPhase::Idle);
        let state = host.state.borrow();
        assert!(!state.watching);
        assert!(state.intervals.is_empty());
        assert!(state.timeouts.is_empty());
    }

    #[test]
    fn test_remove_last_image_clears_timers() {
        let (loader, host) = loader();
        let (image, writes) = image_at(0.0);
        loader.add_image(image.clone());
        let stale = *host.state.borrow().timeouts.last().unwrap();

        assert!(loader.remove_image(&image));
        assert_eq!(loader.phase(), LoaderPhase::Idle);
        assert!(!loader.is_pass_scheduled());
        assert!(host.state.borrow().timeouts.is_empty());

        // A timer that slipped through anyway is ignored.
        loader.handle_timer(stale);
        assert_eq!(writes.get(), 0);
        assert_eq!(loader.stats().passes, 0);
    }

    #[test]
    fn test_remove_absent_image_is_noop() {
        let (loader, _host) = loader();
        let (image, _) = image_at(0.0);
        assert!(!loader.remove_image(&image));
        assert_eq!(loader.phase(), LoaderPhase::Idle);
        assert_eq!(loader.stats().deregistered, 0);
    }

    #[test]
    fn test_remove_keeps_other_images_scheduled() {
        let (loader, _host) = loader();
        let (a, _) = image_at(0.0);
        let (b, _) = image_at(0.0);
        loader.add_image(a.clone());
        loader.add_image(b.clone());

        loader.remove_image(&a);
        assert_eq!(loader.phase(), LoaderPhase::Active);
        assert!(loader.is_pass_scheduled());
        assert!(loader.is_pending(&b));
    }

    #[test]
    fn test_window_change_schedules_pass_once() {
        let (loader, host) = loader();
        let (image, _) = image_at(900.0);
        loader.add_image(image);
        fire_render_timer(&loader, &host);
        assert!(!loader.is_pass_scheduled());

        loader.on_window_changed();
        loader.on_window_changed();
        assert!(loader.is_pass_scheduled());
        assert_eq!(host.state.borrow().timeouts.len(), 1);
    }

    #[test]
    fn test_document_poll_skips_when_pass_scheduled() {
        let (loader, host) = loader();
        loader.add_image(image_at(900.0).0);
        host.state.borrow_mut().document_height = 5000.0;

        let poll = host.state.borrow().intervals[0];
        loader.handle_timer(poll);
        // Still the original render timer, nothing new scheduled.
        assert_eq!(host.state.borrow().timeouts.len(), 1);

        fire_render_timer(&loader, &host);
        assert!(!loader.is_pass_scheduled());

        loader.handle_timer(poll);
        assert!(loader.is_pass_scheduled());

        fire_render_timer(&loader, &host);
        loader.handle_timer(poll);
        assert!(!loader.is_pass_scheduled(), "unchanged height must not schedule");
    }

    #[test]
    fn test_check_now_runs_pass_immediately() {
        let (loader, host) = loader();
        let (image, writes) = image_at(10.0);
        loader.add_image(image);

        loader.check_now();
        assert_eq!(writes.get(), 1);
        assert!(host.state.borrow().timeouts.is_empty());
        assert_eq!(loader.phase(), LoaderPhase::Idle);
    }

    #[test]
    fn test_adding_queued_image_twice_keeps_one_entry() {
        let (loader, host) = loader();
        let (image, writes) = image_at(0.0);
        loader.add_image(image.clone());
        loader.add_image(image.clone());
        assert_eq!(loader.pending_len(), 1);

        assert!(loader.remove_image(&image));
        assert_eq!(loader.pending_len(), 0);
        assert_eq!(loader.phase(), LoaderPhase::Idle);
        assert!(!host.state.borrow().watching);
        assert_eq!(writes.get(), 0);
    }

    #[test]
    fn test_rejected_timeout_leaves_no_pass_scheduled() {
        let (loader, host) = loader();
        host.state.borrow_mut().reject_timeouts = true;
        let (image, writes) = image_at(0.0);
        loader.add_image(image);

        assert_eq!(loader.phase(), LoaderPhase::Active);
        assert!(!loader.is_pass_scheduled());

        // The next window event retries once timers work again.
        host.state.borrow_mut().reject_timeouts = false;
        loader.on_window_changed();
        assert!(loader.is_pass_scheduled());

        fire_render_timer(&loader, &host);
        assert_eq!(writes.get(), 1);
    }

    #[test]
    fn test_dropping_loader_releases_host() {
        let (loader, host) = loader();
        loader.add_image(image_at(900.0).0);
        drop(loader);

        let state = host.state.borrow();
        assert!(!state.watching);
        assert!(state.timeouts.is_empty());
        assert!(state.intervals.is_empty());
    }
}
