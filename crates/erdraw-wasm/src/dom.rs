//! Browser implementations of the engine's host capabilities.

use erdraw_editor::{Preferences, Prompt};
use erdraw_render::{Surface, SurfaceError};
use wasm_bindgen::JsValue;
use web_sys::{Document, Element, Node, Storage};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

fn backend(err: JsValue) -> SurfaceError {
    SurfaceError::Backend(format!("{err:?}"))
}

/// [`Surface`] over a live `<svg>` element.
pub struct DomSurface {
    document: Document,
    root: Element,
}

impl DomSurface {
    pub fn new(root: Element) -> Result<Self, SurfaceError> {
        let document = root
            .owner_document()
            .ok_or_else(|| SurfaceError::Backend("root is not attached to a document".into()))?;
        Ok(Self { document, root })
    }
}

impl Surface for DomSurface {
    type Element = Element;

    fn root(&self) -> Element {
        self.root.clone()
    }

    fn create(&mut self, tag: &str) -> Result<Element, SurfaceError> {
        self.document
            .create_element_ns(Some(SVG_NS), tag)
            .map_err(backend)
    }

    fn append(&mut self, parent: &Element, child: &Element) -> Result<(), SurfaceError> {
        parent.append_child(child).map(|_| ()).map_err(backend)
    }

    fn remove(&mut self, element: &Element) -> Result<(), SurfaceError> {
        element.remove();
        Ok(())
    }

    fn clear(&mut self, element: &Element) -> Result<(), SurfaceError> {
        element.set_text_content(None);
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Option<Element> {
        // Another canvas on the same page may use the same ids.
        self.document
            .get_element_by_id(id)
            .filter(|el| {
                let node: &Node = el;
                self.root.contains(Some(node))
            })
    }

    fn set_attribute(&mut self, element: &Element, name: &str, value: &str) -> Result<(), SurfaceError> {
        element.set_attribute(name, value).map_err(backend)
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn add_class(&mut self, element: &Element, class: &str) -> Result<(), SurfaceError> {
        element.class_list().add_1(class).map_err(backend)
    }

    fn remove_class(&mut self, element: &Element, class: &str) -> Result<(), SurfaceError> {
        element.class_list().remove_1(class).map_err(backend)
    }

    fn set_text(&mut self, element: &Element, text: &str) -> Result<(), SurfaceError> {
        element.set_text_content(Some(text));
        Ok(())
    }
}

/// `window.localStorage`. Without storage (private mode, sandboxed frames)
/// every read misses and writes are dropped.
pub struct LocalStoragePreferences {
    storage: Option<Storage>,
}

impl LocalStoragePreferences {
    pub fn new() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            log::warn!("preferences: localStorage unavailable");
        }
        Self { storage }
    }
}

impl Default for LocalStoragePreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl Preferences for LocalStoragePreferences {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set_raw(&mut self, key: &str, value: String) {
        if let Some(storage) = &self.storage {
            warn_failed(&format!("cannot store {key:?}"), storage.set_item(key, &value));
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = &self.storage {
            warn_failed(&format!("cannot remove {key:?}"), storage.remove_item(key));
        }
    }

    fn clear(&mut self) {
        if let Some(storage) = &self.storage {
            warn_failed("cannot clear storage", storage.clear());
        }
    }
}

/// Storage writes are best effort; failures are logged and dropped.
fn warn_failed<E: std::fmt::Debug>(action: &str, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => false,
        Err(err) => {
            log::warn!("preferences: {action}: {err:?}");
            true
        }
    }
}

/// `window.prompt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowPrompt;

impl Prompt for WindowPrompt {
    fn prompt(&mut self, message: &str, default: &str) -> Option<String> {
        web_sys::window()?
            .prompt_with_message_and_default(message, default)
            .ok()
            .flatten()
    }
}

/// Route `log` records to the browser console.
#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[erdraw] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            log::Level::Info => web_sys::console::info_1(&msg),
            _ => web_sys::console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
static LOGGER: ConsoleLogger = ConsoleLogger;

/// Panic hook and console logger, installed once per page.
pub fn install_hooks() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("erdraw WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(log::LevelFilter::Info);
            }
        });
    }
}
