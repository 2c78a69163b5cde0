use std::cell::RefCell;
use std::rc::Rc;

use lazysrc_core::{ImageElement, Rect};

use crate::page::TestPage;

#[derive(Default)]
struct ElementState {
    /// Position in document coordinates.
    layout: Rect,
    src: Option<String>,
    writes: Vec<Option<String>>,
}

/// Fake `<img>` element laid out at a fixed document position.
///
/// Its bounding rect follows the page scroll offset, the way
/// `getBoundingClientRect` does.
#[derive(Clone)]
pub struct TestElement {
    page: TestPage,
    state: Rc<RefCell<ElementState>>,
}

impl TestElement {
    pub fn new(page: &TestPage, layout: Rect) -> Self {
        Self {
            page: page.clone(),
            state: Rc::new(RefCell::new(ElementState {
                layout,
                ..Default::default()
            })),
        }
    }

    /// Moves the element to a new document position.
    pub fn set_layout(&self, layout: Rect) {
        self.state.borrow_mut().layout = layout;
    }

    pub fn layout(&self) -> Rect {
        self.state.borrow().layout
    }

    /// The live source attribute.
    pub fn src(&self) -> Option<String> {
        self.state.borrow().src.clone()
    }

    /// Every value written to the source attribute, in order.
    pub fn writes(&self) -> Vec<Option<String>> {
        self.state.borrow().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.borrow().writes.len()
    }
}

impl ImageElement for TestElement {
    fn bounding_rect(&self) -> Rect {
        let (scroll_x, scroll_y) = self.page.scroll_offset();
        self.state.borrow().layout.translate(-scroll_x, -scroll_y)
    }

    fn set_src(&self, src: Option<&str>) {
        let src = src.map(str::to_owned);
        let mut state = self.state.borrow_mut();
        state.writes.push(src.clone());
        state.src = src;
    }
}
