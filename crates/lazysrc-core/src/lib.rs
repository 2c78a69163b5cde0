//! Deferred image sources for browser documents.
//!
//! An image's source is held back until its element scrolls into (or near)
//! the viewport. A single [`LazyLoader`] per document batches the layout
//! reads: registrations, resizes and scrolls are debounced into one
//! visibility pass, and the document height is polled while images are
//! waiting so content growth below the fold is noticed too.
//!
//! The loader is host-driven. It asks a [`LoaderHost`] for timers and window
//! readings and is told about fired timers and window events; the browser
//! adapter lives in `lazysrc-platform-web`, a virtual-time host for tests in
//! `lazysrc-testing`.
//!
//! # Example
//!
//! ```rust,ignore
//! let loader = LazyLoader::new(host, LoaderSettings::default());
//! let binding = ImageBinding::bind(&loader, element);
//! binding.set_source("https://example.com/cat.png");
//! // ...the source is written once the element becomes visible.
//! drop(binding); // view torn down
//! ```

mod binding;
mod geometry;
mod host;
mod image;
mod loader;
mod settings;

pub use binding::*;
pub use geometry::*;
pub use host::*;
pub use image::*;
pub use loader::*;
pub use settings::*;
