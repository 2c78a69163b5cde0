//! A fake page: virtual clock, timers, viewport and scroll position.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use lazysrc_core::{TimerHandle, TimerHost, Viewport, WindowHost};
use rustc_hash::FxHashMap;

/// Smallest interval period accepted, so a zero period cannot stall
/// [`TestPage::pop_due`].
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug)]
struct ScheduledTimer {
    due: Duration,
    period: Option<Duration>,
}

struct PageState {
    now: Duration,
    viewport: Viewport,
    scroll_x: f64,
    scroll_y: f64,
    document_height: f64,
    watching: bool,
    watch_count: usize,
    next_timer: u64,
    timers: FxHashMap<TimerHandle, ScheduledTimer>,
}

/// Shared handle to the fake page. Elements and the host read it; the test
/// rule drives it.
#[derive(Clone)]
pub struct TestPage {
    state: Rc<RefCell<PageState>>,
}

impl TestPage {
    pub fn new(viewport: Viewport, document_height: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(PageState {
                now: Duration::ZERO,
                viewport,
                scroll_x: 0.0,
                scroll_y: 0.0,
                document_height,
                watching: false,
                watch_count: 0,
                next_timer: 0,
                timers: FxHashMap::default(),
            })),
        }
    }

    /// Virtual time elapsed since the page was created.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    pub fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.borrow_mut().viewport = viewport;
    }

    pub fn scroll_offset(&self) -> (f64, f64) {
        let state = self.state.borrow();
        (state.scroll_x, state.scroll_y)
    }

    pub fn set_scroll_offset(&self, x: f64, y: f64) {
        let mut state = self.state.borrow_mut();
        state.scroll_x = x;
        state.scroll_y = y;
    }

    pub fn document_height(&self) -> f64 {
        self.state.borrow().document_height
    }

    pub fn set_document_height(&self, height: f64) {
        self.state.borrow_mut().document_height = height;
    }

    /// Returns true while resize/scroll listeners are attached.
    pub fn is_watching(&self) -> bool {
        self.state.borrow().watching
    }

    /// Number of times listeners have been attached.
    pub fn watch_count(&self) -> usize {
        self.state.borrow().watch_count
    }

    /// Number of live timers, one-shot and repeating.
    pub fn timer_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn interval_count(&self) -> usize {
        self.state
            .borrow()
            .timers
            .values()
            .filter(|timer| timer.period.is_some())
            .count()
    }

    pub fn timeout_count(&self) -> usize {
        self.timer_count() - self.interval_count()
    }

    /// Pops the earliest timer due at or before `until`, moving the clock to
    /// its due time. Repeating timers are rescheduled.
    ///
    /// Ties are broken by creation order.
    pub fn pop_due(&self, until: Duration) -> Option<TimerHandle> {
        let mut state = self.state.borrow_mut();
        let (handle, timer) = state
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= until)
            .min_by_key(|(handle, timer)| (timer.due, **handle))
            .map(|(handle, timer)| (*handle, *timer))?;

        state.now = state.now.max(timer.due);
        match timer.period {
            Some(period) => {
                if let Some(entry) = state.timers.get_mut(&handle) {
                    entry.due = timer.due + period;
                }
            }
            None => {
                state.timers.remove(&handle);
            }
        }
        Some(handle)
    }

    pub(crate) fn set_now(&self, now: Duration) {
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(now);
    }

    fn schedule(&self, delay: Duration, period: Option<Duration>) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        state.next_timer += 1;
        let handle = TimerHandle(state.next_timer);
        let due = state.now + delay;
        state.timers.insert(handle, ScheduledTimer { due, period });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.state.borrow_mut().timers.remove(&handle);
    }
}

impl Default for TestPage {
    fn default() -> Self {
        Self::new(Viewport::new(1024.0, 800.0), 800.0)
    }
}

/// [`LoaderHost`](lazysrc_core::LoaderHost) backed by a [`TestPage`].
#[derive(Clone)]
pub struct TestHost {
    page: TestPage,
}

impl TestHost {
    pub fn new(page: TestPage) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &TestPage {
        &self.page
    }
}

impl TimerHost for TestHost {
    fn set_timeout(&mut self, delay: Duration) -> Option<TimerHandle> {
        Some(self.page.schedule(delay, None))
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        self.page.cancel(handle);
    }

    fn set_interval(&mut self, period: Duration) -> Option<TimerHandle> {
        let period = period.max(MIN_INTERVAL);
        Some(self.page.schedule(period, Some(period)))
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        self.page.cancel(handle);
    }
}

impl WindowHost for TestHost {
    fn viewport(&self) -> Viewport {
        self.page.viewport()
    }

    fn document_height(&self) -> f64 {
        self.page.document_height()
    }

    fn watch_window(&mut self) {
        let mut state = self.page.state.borrow_mut();
        state.watching = true;
        state.watch_count += 1;
    }

    fn unwatch_window(&mut self) {
        self.page.state.borrow_mut().watching = false;
    }
}
