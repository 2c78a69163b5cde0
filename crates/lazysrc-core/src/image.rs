//! Per-element lazy image state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::geometry::{Rect, Viewport};

/// The DOM-facing side of a tracked image.
///
/// Implementors are handles to an element the loader does not own.
pub trait ImageElement {
    /// Current bounding box relative to the viewport origin.
    fn bounding_rect(&self) -> Rect;

    /// Writes the live source attribute. `None` removes it.
    fn set_src(&self, src: Option<&str>);
}

/// A single image waiting for (or past) its first reveal.
///
/// Cloning yields another handle to the same image; the loader compares
/// images by handle identity.
#[derive(Clone)]
pub struct LazyImage {
    inner: Rc<RefCell<LazyImageInner>>,
}

struct LazyImageInner {
    /// Latest source reported by the binding layer.
    source: Option<String>,

    /// Set once the source has been committed to the element.
    rendered: bool,

    /// Set while the image is removed from its loader; a detached image is
    /// never committed by a visibility pass.
    detached: bool,

    element: Rc<dyn ImageElement>,
}

impl LazyImage {
    /// Creates an unrendered image with no source yet.
    pub fn new(element: impl ImageElement + 'static) -> Self {
        Self::from_shared(Rc::new(element))
    }

    /// Creates an image over an element handle shared with the caller.
    pub fn from_shared(element: Rc<dyn ImageElement>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LazyImageInner {
                source: None,
                rendered: false,
                detached: false,
                element,
            })),
        }
    }

    /// Returns true if both handles refer to the same image.
    pub fn ptr_eq(&self, other: &LazyImage) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the last reported source.
    pub fn source(&self) -> Option<String> {
        self.inner.borrow().source.clone()
    }

    /// Returns true once the image has been revealed.
    pub fn is_rendered(&self) -> bool {
        self.inner.borrow().rendered
    }

    /// Records a new source value.
    ///
    /// Before the first reveal the value is only held. Afterwards it is
    /// written to the element immediately so source changes keep working.
    pub fn set_source(&self, source: impl Into<String>) {
        self.update_source(Some(source.into()));
    }

    /// Forgets the current source value.
    pub fn clear_source(&self) {
        self.update_source(None);
    }

    fn update_source(&self, source: Option<String>) {
        let rendered = {
            let mut inner = self.inner.borrow_mut();
            inner.source = source;
            inner.rendered
        };
        if rendered {
            self.render_source();
        }
    }

    /// Returns true if any part of the element is inside `viewport`.
    pub fn is_visible(&self, viewport: &Viewport) -> bool {
        self.is_visible_with_margin(viewport, 0.0)
    }

    /// Visibility against `viewport` grown by `margin` pixels on every side.
    pub fn is_visible_with_margin(&self, viewport: &Viewport, margin: f64) -> bool {
        let rect = self.element().bounding_rect();
        viewport.intersects_with_margin(&rect, margin)
    }

    /// Marks the image rendered and moves the held source into the element.
    pub fn render(&self) {
        self.inner.borrow_mut().rendered = true;
        self.render_source();
    }

    fn render_source(&self) {
        // Release the borrow before touching the element so the element may
        // call back into this image.
        let (element, source) = {
            let inner = self.inner.borrow();
            (inner.element.clone(), inner.source.clone())
        };
        element.set_src(source.as_deref());
    }

    fn element(&self) -> Rc<dyn ImageElement> {
        self.inner.borrow().element.clone()
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.inner.borrow().detached
    }

    pub(crate) fn set_detached(&self, detached: bool) {
        self.inner.borrow_mut().detached = detached;
    }
}

impl fmt::Debug for LazyImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("LazyImage")
            .field("source", &inner.source)
            .field("rendered", &inner.rendered)
            .field("detached", &inner.detached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct StubElement {
        rect: Cell<Rect>,
        writes: RefCell<Vec<Option<String>>>,
    }

    impl ImageElement for StubElement {
        fn bounding_rect(&self) -> Rect {
            self.rect.get()
        }

        fn set_src(&self, src: Option<&str>) {
            self.writes.borrow_mut().push(src.map(str::to_owned));
        }
    }

    fn stub() -> (LazyImage, Rc<StubElement>) {
        let element = Rc::new(StubElement::default());
        (LazyImage::from_shared(element.clone()), element)
    }

    #[test]
    fn test_source_is_held_until_render() {
        let (image, element) = stub();
        image.set_source("a.png");
        assert!(element.writes.borrow().is_empty());
        assert!(!image.is_rendered());

        image.render();
        assert!(image.is_rendered());
        assert_eq!(*element.writes.borrow(), vec![Some("a.png".to_string())]);
    }

    #[test]
    fn test_source_change_after_render_commits_immediately() {
        let (image, element) = stub();
        image.set_source("a.png");
        image.render();
        image.set_source("b.png");
        assert_eq!(
            *element.writes.borrow(),
            vec![Some("a.png".to_string()), Some("b.png".to_string())]
        );
        assert_eq!(image.source().as_deref(), Some("b.png"));
    }

    #[test]
    fn test_render_without_source_clears_attribute() {
        let (image, element) = stub();
        image.render();
        assert_eq!(*element.writes.borrow(), vec![None]);

        image.set_source("late.png");
        image.clear_source();
        assert_eq!(
            *element.writes.borrow(),
            vec![None, Some("late.png".to_string()), None]
        );
    }

    #[test]
    fn test_visibility_uses_current_rect() {
        let (image, element) = stub();
        let viewport = Viewport::new(100.0, 100.0);
        element.rect.set(Rect::from_origin_size(0.0, 200.0, 10.0, 10.0));
        assert!(!image.is_visible(&viewport));
        assert!(image.is_visible_with_margin(&viewport, 100.0));

        element.rect.set(Rect::from_origin_size(0.0, 50.0, 10.0, 10.0));
        assert!(image.is_visible(&viewport));
    }

    #[test]
    fn test_identity() {
        let (image, _) = stub();
        let (other, _) = stub();
        assert!(image.ptr_eq(&image.clone()));
        assert!(!image.ptr_eq(&other));
    }
}
