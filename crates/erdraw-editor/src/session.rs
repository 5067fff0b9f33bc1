//! External collaborators and the session that drives them.
//!
//! The engine never talks to the network, storage or dialogs directly. It
//! sees three capability traits: [`DiagramService`] (the diagram server),
//! [`Preferences`] (key-value persistence) and [`Prompt`] (blocking text
//! entry). Failures from them are caught here and surfaced as a
//! notification plus the state's error flag; diagram data is left untouched.

use crate::editor::DiagramEditor;
use crate::store::{Notification, StatePatch};
use erdraw_core::{DiagramData, LayoutDocument, SidebarState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Preferences key for the left sidebar's visibility and width.
pub const SIDEBAR_KEY: &str = "erd.leftSidebar";

/// Blocking text entry, used for text annotations.
pub trait Prompt {
    /// `None` when the user cancelled.
    fn prompt(&mut self, message: &str, default: &str) -> Option<String>;
}

/// A prompt that is always cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompt for NoPrompt {
    fn prompt(&mut self, _message: &str, _default: &str) -> Option<String> {
        None
    }
}

/// Key-value persistence of serialized values.
pub trait Preferences {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
    fn clear(&mut self);

    /// Read and decode a value. Undecodable values read as absent.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T>
    where
        Self: Sized,
    {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("preferences: ignoring unreadable {key:?}: {err}");
                None
            }
        }
    }

    fn set<T: Serialize>(&mut self, key: &str, value: &T)
    where
        Self: Sized,
    {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, raw),
            Err(err) => log::warn!("preferences: cannot store {key:?}: {err}"),
        }
    }
}

/// In-process preferences.
#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl Preferences for MemoryPreferences {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_raw(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("network error: {0}")]
    Network(String),
}

/// `GET diagram` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiagramPayload {
    #[serde(alias = "data")]
    pub diagram: DiagramData,
    #[serde(default)]
    pub layout: Option<LayoutDocument>,
}

/// The diagram server.
pub trait DiagramService {
    fn fetch_diagram(&mut self) -> Result<DiagramPayload, RemoteError>;
    fn fetch_table_ddl(&mut self, table: &str) -> Result<String, RemoteError>;
    fn save_layout(&mut self, layout: &LayoutDocument) -> Result<(), RemoteError>;
    fn reverse_engineer(&mut self) -> Result<DiagramData, RemoteError>;
}

pub struct DiagramSession<S, P> {
    service: S,
    prefs: P,
}

impl<S: DiagramService, P: Preferences> DiagramSession<S, P> {
    pub fn new(service: S, prefs: P) -> Self {
        Self { service, prefs }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    /// Fetch the diagram and its stored layout. The locally stored sidebar
    /// state wins over the one in the layout.
    pub fn load(&mut self, editor: &mut DiagramEditor) -> Result<(), RemoteError> {
        begin(editor);
        let payload = match self.service.fetch_diagram() {
            Ok(payload) => payload,
            Err(err) => return Err(fail(editor, "Failed to load diagram", err)),
        };
        let mut layout = payload.layout.unwrap_or_default();
        if let Some(sidebar) = self.prefs.get::<SidebarState>(SIDEBAR_KEY) {
            layout.left_sidebar = sidebar;
        }
        editor.load(payload.diagram, layout);
        editor
            .store_mut()
            .set_state(StatePatch::new().loading(false), false);
        Ok(())
    }

    pub fn save(&mut self, editor: &mut DiagramEditor) -> Result<(), RemoteError> {
        begin(editor);
        if let Err(err) = self.service.save_layout(&editor.state().layout) {
            return Err(fail(editor, "Failed to save layout", err));
        }
        editor.store_mut().set_state(
            StatePatch::new()
                .loading(false)
                .notification(Some(Notification::info("Layout saved"))),
            false,
        );
        Ok(())
    }

    pub fn table_ddl(&mut self, editor: &mut DiagramEditor, table: &str) -> Result<String, RemoteError> {
        self.service
            .fetch_table_ddl(table)
            .map_err(|err| fail(editor, &format!("Failed to load DDL for {table}"), err))
    }

    /// Re-read the schema from the database. Every entity is re-clustered.
    pub fn reverse_engineer(&mut self, editor: &mut DiagramEditor) -> Result<(), RemoteError> {
        begin(editor);
        let data = match self.service.reverse_engineer() {
            Ok(data) => data,
            Err(err) => return Err(fail(editor, "Reverse engineering failed", err)),
        };
        let count = data.entities.len();
        editor.apply_reverse_engineered(data);
        editor.store_mut().set_state(
            StatePatch::new()
                .loading(false)
                .notification(Some(Notification::info(format!(
                    "Reverse engineered {count} tables"
                )))),
            false,
        );
        Ok(())
    }

    /// Store sidebar visibility and width in the layout and in preferences.
    pub fn set_sidebar(&mut self, editor: &mut DiagramEditor, sidebar: SidebarState) {
        let mut layout = editor.state().layout.clone();
        if layout.left_sidebar == sidebar {
            return;
        }
        layout.left_sidebar = sidebar;
        editor
            .store_mut()
            .set_state(StatePatch::new().layout(layout), false);
        self.prefs.set(SIDEBAR_KEY, &sidebar);
    }
}

fn begin(editor: &mut DiagramEditor) {
    editor
        .store_mut()
        .set_state(StatePatch::new().loading(true).error(None), false);
}

fn fail(editor: &mut DiagramEditor, context: &str, err: RemoteError) -> RemoteError {
    log::warn!("session: {context}: {err}");
    editor.store_mut().set_state(
        StatePatch::new()
            .loading(false)
            .error(Some(err.to_string()))
            .notification(Some(Notification::error(format!("{context}: {err}")))),
        false,
    );
    err
}
