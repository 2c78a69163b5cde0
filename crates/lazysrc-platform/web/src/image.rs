use lazysrc_core::{ImageBinding, ImageElement, LazyLoader, Rect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlImageElement;

use crate::host::WebHost;

/// An `<img>` element as seen by the loader.
#[derive(Clone, Debug)]
pub struct WebImage {
    element: HtmlImageElement,
}

impl WebImage {
    pub fn new(element: HtmlImageElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlImageElement {
        &self.element
    }
}

impl ImageElement for WebImage {
    fn bounding_rect(&self) -> Rect {
        let rect = self.element.get_bounding_client_rect();
        Rect {
            top: rect.top(),
            bottom: rect.bottom(),
            left: rect.left(),
            right: rect.right(),
        }
    }

    fn set_src(&self, src: Option<&str>) {
        match src {
            Some(src) => self.element.set_src(src),
            None => {
                if let Err(err) = self.element.remove_attribute("src") {
                    log::warn!("failed to clear image source: {:?}", err);
                }
            }
        }
    }
}

/// Binds every `<img>` in the document carrying `attribute`, using the
/// attribute's value as the deferred source.
///
/// Keep the returned bindings alive for as long as the images are on the
/// page; dropping one stops tracking its image.
pub fn bind_document(
    loader: &LazyLoader<WebHost>,
    attribute: &str,
) -> Result<Vec<ImageBinding<WebHost>>, JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let nodes = document.query_selector_all(&format!("img[{}]", attribute))?;
    let mut bindings = Vec::with_capacity(nodes.length() as usize);
    for index in 0..nodes.length() {
        let Some(node) = nodes.item(index) else {
            continue;
        };
        let Ok(element) = node.dyn_into::<HtmlImageElement>() else {
            continue;
        };

        let source = element.get_attribute(attribute);
        let binding = ImageBinding::bind(loader, WebImage::new(element));
        if let Some(source) = source {
            binding.set_source(source);
        }
        bindings.push(binding);
    }

    log::debug!("bound {} lazy image(s) via [{}]", bindings.len(), attribute);
    Ok(bindings)
}
