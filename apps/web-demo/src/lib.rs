use std::cell::RefCell;

use lazysrc::web::{bind_document, install_loader, WebHost};
use lazysrc::{ImageBinding, LazyLoader, LoaderSettings};
use wasm_bindgen::prelude::*;

const DEFAULT_ATTRIBUTE: &str = "data-src";

/// The page's loader and the images bound to it.
struct LazyPage {
    loader: LazyLoader<WebHost>,
    bindings: Vec<ImageBinding<WebHost>>,
}

thread_local! {
    static PAGE: RefCell<Option<LazyPage>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Lazy image demo starting...");
}

/// Binds every `<img>` carrying `attribute` (default `data-src`).
///
/// The first call installs the loader; later calls bind images added since,
/// replacing earlier bindings. `margin` only applies when the loader is
/// installed; later calls keep the original margin. Returns the number of
/// bound images.
#[wasm_bindgen]
pub fn run_lazy_images(attribute: Option<String>, margin: Option<f64>) -> Result<usize, JsValue> {
    let attribute = attribute.unwrap_or_else(|| DEFAULT_ATTRIBUTE.to_string());

    PAGE.with(|page| {
        let mut page = page.borrow_mut();
        let loader = match page.take() {
            Some(existing) => {
                if let Some(margin) = margin {
                    if margin.max(0.0) != existing.loader.settings().margin {
                        log::warn!(
                            "loader already installed, ignoring margin {}; call stop_lazy_images first",
                            margin
                        );
                    }
                }
                // Drop old bindings first so each image is tracked once.
                drop(existing.bindings);
                existing.loader
            }
            None => {
                let settings = LoaderSettings::default().with_margin(margin.unwrap_or(0.0));
                install_loader(settings)?
            }
        };

        let bindings = bind_document(&loader, &attribute)?;
        let count = bindings.len();
        *page = Some(LazyPage { loader, bindings });
        Ok(count)
    })
}

/// Stops tracking all images and releases the loader.
#[wasm_bindgen]
pub fn stop_lazy_images() {
    PAGE.with(|page| {
        if let Some(page) = page.borrow_mut().take() {
            log::info!(
                "stopping lazy images, {} still pending",
                page.loader.pending_len()
            );
        }
    });
}
