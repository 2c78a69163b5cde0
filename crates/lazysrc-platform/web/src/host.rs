use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use lazysrc_core::{LazyLoader, TimerHandle, TimerHost, Viewport, WeakLazyLoader, WindowHost};
use rustc_hash::FxHashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Window};

/// Where fired callbacks are delivered. Filled in once the loader owning the
/// host exists.
type LoaderSink = Rc<RefCell<Option<WeakLazyLoader<WebHost>>>>;

struct ActiveTimer {
    id: i32,
    repeating: bool,
    _callback: Closure<dyn FnMut()>,
}

#[derive(Default)]
struct TimerTable {
    next_handle: u64,
    active: FxHashMap<TimerHandle, ActiveTimer>,
}

/// Browser host: `setTimeout`/`setInterval`, window resize/scroll listeners
/// and document layout readings.
pub struct WebHost {
    window: Window,
    document: Document,
    sink: LoaderSink,
    timers: Rc<RefCell<TimerTable>>,
    listener: Option<Closure<dyn FnMut(web_sys::Event)>>,
}

const WINDOW_EVENTS: [&str; 2] = ["resize", "scroll"];

impl WebHost {
    pub(crate) fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;
        Ok(Self {
            window,
            document,
            sink: Rc::new(RefCell::new(None)),
            timers: Rc::new(RefCell::new(TimerTable::default())),
            listener: None,
        })
    }

    /// Routes fired timers and window events to `loader`.
    pub(crate) fn connect(sink: &LoaderSink, loader: &LazyLoader<WebHost>) {
        *sink.borrow_mut() = Some(loader.downgrade());
    }

    pub(crate) fn sink(&self) -> LoaderSink {
        self.sink.clone()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn schedule(&mut self, delay: Duration, repeating: bool) -> Option<TimerHandle> {
        let handle = {
            let mut timers = self.timers.borrow_mut();
            timers.next_handle += 1;
            TimerHandle(timers.next_handle)
        };

        let sink = self.sink.clone();
        let timers = self.timers.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            if !repeating {
                // Dropping the closure from inside its own call is deferred by
                // wasm-bindgen until the call returns.
                let _fired = timers.borrow_mut().active.remove(&handle);
            }
            if let Some(loader) = upgrade(&sink) {
                loader.handle_timer(handle);
            }
        });

        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let function: &js_sys::Function = callback.as_ref().unchecked_ref();
        let scheduled = if repeating {
            self.window
                .set_interval_with_callback_and_timeout_and_arguments_0(function, millis)
        } else {
            self.window
                .set_timeout_with_callback_and_timeout_and_arguments_0(function, millis)
        };

        match scheduled {
            Ok(id) => {
                self.timers.borrow_mut().active.insert(
                    handle,
                    ActiveTimer {
                        id,
                        repeating,
                        _callback: callback,
                    },
                );
                Some(handle)
            }
            Err(err) => {
                log::error!("failed to schedule timer: {:?}", err);
                None
            }
        }
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let Some(timer) = self.timers.borrow_mut().active.remove(&handle) else {
            return;
        };
        if timer.repeating {
            self.window.clear_interval_with_handle(timer.id);
        } else {
            self.window.clear_timeout_with_handle(timer.id);
        }
    }

    fn client_size(&self) -> (f64, f64) {
        self.document
            .document_element()
            .map(|root| (root.client_width() as f64, root.client_height() as f64))
            .unwrap_or_default()
    }
}

fn upgrade(sink: &LoaderSink) -> Option<LazyLoader<WebHost>> {
    sink.borrow().as_ref().and_then(WeakLazyLoader::upgrade)
}

/// Reads a window dimension, ignoring missing or zero values.
fn dimension(value: Result<JsValue, JsValue>) -> Option<f64> {
    value.ok().and_then(|v| v.as_f64()).filter(|v| *v > 0.0)
}

impl TimerHost for WebHost {
    fn set_timeout(&mut self, delay: Duration) -> Option<TimerHandle> {
        self.schedule(delay, false)
    }

    fn clear_timeout(&mut self, handle: TimerHandle) {
        self.cancel(handle);
    }

    fn set_interval(&mut self, period: Duration) -> Option<TimerHandle> {
        self.schedule(period, true)
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        self.cancel(handle);
    }
}

impl WindowHost for WebHost {
    fn viewport(&self) -> Viewport {
        let width = dimension(self.window.inner_width()).unwrap_or_else(|| self.client_size().0);
        let height =
            dimension(self.window.inner_height()).unwrap_or_else(|| self.client_size().1);
        Viewport::new(width, height)
    }

    fn document_height(&self) -> f64 {
        if let Some(body) = self.document.body() {
            return body.offset_height() as f64;
        }
        self.document
            .document_element()
            .map(|root| root.scroll_height() as f64)
            .unwrap_or_default()
    }

    fn watch_window(&mut self) {
        if self.listener.is_some() {
            return;
        }

        let sink = self.sink.clone();
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            if let Some(loader) = upgrade(&sink) {
                loader.on_window_changed();
            }
        });

        for event in WINDOW_EVENTS {
            if let Err(err) = self
                .window
                .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            {
                log::warn!("failed to listen for window {}: {:?}", event, err);
            }
        }
        self.listener = Some(callback);
    }

    fn unwatch_window(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        for event in WINDOW_EVENTS {
            if let Err(err) = self.window.remove_event_listener_with_callback(
                event,
                listener.as_ref().unchecked_ref(),
            ) {
                log::warn!("failed to stop listening for window {}: {:?}", event, err);
            }
        }
    }
}

impl Drop for WebHost {
    fn drop(&mut self) {
        let handles: Vec<TimerHandle> = self.timers.borrow().active.keys().copied().collect();
        for handle in handles {
            self.cancel(handle);
        }
        self.unwatch_window();
    }
}
