use std::time::Duration;

/// Default quiet period before a visibility pass runs.
pub const DEFAULT_RENDER_DELAY: Duration = Duration::from_millis(100);

/// Default period of the document height poll.
pub const DEFAULT_DOCUMENT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Tuning for a [`LazyLoader`](crate::LazyLoader).
#[derive(Clone, Debug, PartialEq)]
pub struct LoaderSettings {
    /// Debounce delay coalescing registrations, resizes and scrolls into one
    /// layout-reading pass.
    pub render_delay: Duration,

    /// How often document height is sampled while images are pending.
    pub document_poll_interval: Duration,

    /// Pixels added around the viewport on every side, so images load just
    /// before they scroll in.
    pub margin: f64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            render_delay: DEFAULT_RENDER_DELAY,
            document_poll_interval: DEFAULT_DOCUMENT_POLL_INTERVAL,
            margin: 0.0,
        }
    }
}

impl LoaderSettings {
    /// Creates settings with the default delays and no margin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long a visibility pass waits after being requested.
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    /// Sets how often the document height is checked while images are queued.
    pub fn with_document_poll_interval(mut self, interval: Duration) -> Self {
        self.document_poll_interval = interval;
        self
    }

    /// Sets the viewport margin. Negative values are treated as zero.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = LoaderSettings::default();
        assert_eq!(settings.render_delay, Duration::from_millis(100));
        assert_eq!(settings.document_poll_interval, Duration::from_secs(2));
        assert_eq!(settings.margin, 0.0);
    }

    #[test]
    fn test_builder() {
        let settings = LoaderSettings::new()
            .with_render_delay(Duration::from_millis(16))
            .with_document_poll_interval(Duration::from_millis(500))
            .with_margin(-5.0);
        assert_eq!(settings.render_delay, Duration::from_millis(16));
        assert_eq!(settings.document_poll_interval, Duration::from_millis(500));
        assert_eq!(settings.margin, 0.0);
    }
}
