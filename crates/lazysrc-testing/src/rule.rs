use std::time::Duration;

use lazysrc_core::{ImageBinding, LazyLoader, LoaderSettings, Rect, Viewport};

use crate::element::TestElement;
use crate::page::{TestHost, TestPage};

const MAX_TIMER_FIRES: usize = 10_000;

/// Drives a [`LazyLoader`] on a [`TestPage`] in virtual time.
///
/// Window events are only delivered while the loader has listeners attached,
/// the same as a real window.
pub struct LoaderTestRule {
    page: TestPage,
    loader: LazyLoader<TestHost>,
}

impl LoaderTestRule {
    /// A 1024x800 viewport over an 800px document, default settings.
    pub fn new() -> Self {
        Self::with_settings(LoaderSettings::default())
    }

    pub fn with_settings(settings: LoaderSettings) -> Self {
        Self::with_page(TestPage::default(), settings)
    }

    pub fn with_page(page: TestPage, settings: LoaderSettings) -> Self {
        let loader = LazyLoader::new(TestHost::new(page.clone()), settings);
        Self { page, loader }
    }

    pub fn loader(&self) -> &LazyLoader<TestHost> {
        &self.loader
    }

    pub fn page(&self) -> &TestPage {
        &self.page
    }

    /// Creates an element at `layout` without binding it.
    pub fn element(&self, layout: Rect) -> TestElement {
        TestElement::new(&self.page, layout)
    }

    /// Binds a new element at `layout` and reports `source` for it.
    pub fn add_image(&self, layout: Rect, source: &str) -> (ImageBinding<TestHost>, TestElement) {
        let element = self.element(layout);
        let binding = ImageBinding::bind(&self.loader, element.clone());
        binding.set_source(source);
        (binding, element)
    }

    /// Tears down a bound image the way a view teardown would.
    pub fn drop_binding(&self, binding: ImageBinding<TestHost>) {
        drop(binding);
    }

    /// Moves virtual time forward, firing every timer that comes due in order.
    /// Returns the number of timers fired.
    pub fn advance_by(&self, duration: Duration) -> usize {
        let until = self.page.now() + duration;
        let mut fired = 0;
        while let Some(handle) = self.page.pop_due(until) {
            self.loader.handle_timer(handle);
            fired += 1;
            if fired > MAX_TIMER_FIRES {
                panic!("timers failed to settle within {:?}", duration);
            }
        }
        self.page.set_now(until);
        fired
    }

    /// Lets one debounce period elapse.
    pub fn flush(&self) -> usize {
        self.advance_by(self.loader.settings().render_delay)
    }

    /// Scrolls the page and fires a scroll event.
    pub fn scroll_to(&self, x: f64, y: f64) {
        self.page.set_scroll_offset(x, y);
        self.dispatch_window_event();
    }

    /// Resizes the viewport and fires a resize event.
    pub fn resize(&self, width: f64, height: f64) {
        self.page.set_viewport(Viewport::new(width, height));
        self.dispatch_window_event();
    }

    /// Changes the document height. No event fires; only the poll notices.
    pub fn grow_document(&self, height: f64) {
        self.page.set_document_height(height);
    }

    fn dispatch_window_event(&self) {
        if self.page.is_watching() {
            self.loader.on_window_changed();
        }
    }
}

impl Default for LoaderTestRule {
    fn default() -> Self {
        Self::new()
    }
}
