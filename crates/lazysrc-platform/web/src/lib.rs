//! Browser adapter for lazysrc.
//!
//! [`install_loader`] creates the document's loader on top of a [`WebHost`],
//! which drives it with `setTimeout`/`setInterval` and window resize/scroll
//! events. [`bind_document`] attaches every `<img>` carrying a deferred-source
//! attribute.

mod host;
mod image;

pub use host::WebHost;
pub use image::{bind_document, WebImage};

use lazysrc_core::{LazyLoader, LoaderSettings};
use wasm_bindgen::JsValue;

/// Creates a loader for the current document.
///
/// Call once per document and keep the loader alive; timers and listeners
/// are released when the last handle is dropped.
pub fn install_loader(settings: LoaderSettings) -> Result<LazyLoader<WebHost>, JsValue> {
    let host = WebHost::new()?;
    let sink = host.sink();
    let loader = LazyLoader::new(host, settings);
    WebHost::connect(&sink, &loader);
    log::info!("lazy image loader installed");
    Ok(loader)
}
