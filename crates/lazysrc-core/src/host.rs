//! Host services the loader needs from its environment.
//!
//! The loader never owns a clock or touches the window directly. A host
//! (the browser adapter, or the virtual-time harness in tests) provides
//! timers and window/document readings, and delivers fired timers and
//! window events back through [`LazyLoader::handle_timer`] and
//! [`LazyLoader::on_window_changed`].
//!
//! [`LazyLoader::handle_timer`]: crate::LazyLoader::handle_timer
//! [`LazyLoader::on_window_changed`]: crate::LazyLoader::on_window_changed

use std::time::Duration;

use crate::geometry::Viewport;

/// Opaque identifier for a timer created by a [`TimerHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// One-shot and repeating timers.
///
/// Implementations must not invoke the loader synchronously from inside these
/// methods; fired timers are delivered later via `handle_timer`.
pub trait TimerHost {
    /// Schedules a one-shot timer firing once after `delay`. Returns `None`
    /// if the timer could not be scheduled.
    fn set_timeout(&mut self, delay: Duration) -> Option<TimerHandle>;

    /// Cancels a one-shot timer. Unknown or already fired handles are ignored.
    fn clear_timeout(&mut self, handle: TimerHandle);

    /// Schedules a timer firing every `period` until cleared. Returns `None`
    /// if the timer could not be scheduled.
    fn set_interval(&mut self, period: Duration) -> Option<TimerHandle>;

    /// Cancels a repeating timer. Unknown handles are ignored.
    fn clear_interval(&mut self, handle: TimerHandle);
}

/// Window and document signals.
pub trait WindowHost {
    /// Current size of the visible window area.
    fn viewport(&self) -> Viewport;

    /// Current height of the document content.
    fn document_height(&self) -> f64;

    /// Starts delivering resize and scroll events to the loader.
    fn watch_window(&mut self);

    /// Stops delivering resize and scroll events.
    fn unwatch_window(&mut self);
}

/// Everything a [`LazyLoader`](crate::LazyLoader) needs from its host.
pub trait LoaderHost: TimerHost + WindowHost {}

impl<T: TimerHost + WindowHost> LoaderHost for T {}
