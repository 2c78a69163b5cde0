//! Glue between a UI binding layer and the loader.

use std::rc::Rc;

use crate::host::LoaderHost;
use crate::image::{ImageElement, LazyImage};
use crate::loader::LazyLoader;

/// Lazy image bound to one element for the lifetime of its owning view.
///
/// Creating the binding queues the image; dropping it removes the image from
/// the queue whether or not it was rendered.
pub struct ImageBinding<H: LoaderHost> {
    loader: LazyLoader<H>,
    image: LazyImage,
}

impl<H: LoaderHost> ImageBinding<H> {
    /// Binds `element` and starts watching it for visibility.
    pub fn bind(loader: &LazyLoader<H>, element: impl ImageElement + 'static) -> Self {
        Self::bind_image(loader, LazyImage::new(element))
    }

    /// Binds an element handle shared with the caller.
    pub fn bind_shared(loader: &LazyLoader<H>, element: Rc<dyn ImageElement>) -> Self {
        Self::bind_image(loader, LazyImage::from_shared(element))
    }

    fn bind_image(loader: &LazyLoader<H>, image: LazyImage) -> Self {
        loader.add_image(image.clone());
        Self {
            loader: loader.clone(),
            image,
        }
    }

    /// Forwards a newly interpolated source value.
    pub fn set_source(&self, source: impl Into<String>) {
        self.image.set_source(source);
    }

    pub fn clear_source(&self) {
        self.image.clear_source();
    }

    pub fn image(&self) -> &LazyImage {
        &self.image
    }

    pub fn is_rendered(&self) -> bool {
        self.image.is_rendered()
    }
}

impl<H: LoaderHost> Drop for ImageBinding<H> {
    fn drop(&mut self) {
        self.loader.remove_image(&self.image);
    }
}
