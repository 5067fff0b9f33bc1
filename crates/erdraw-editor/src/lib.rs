pub mod editor;
pub mod event;
pub mod history;
pub mod input;
pub mod interaction;
pub mod session;
pub mod shortcuts;
pub mod store;

pub use editor::{DiagramEditor, EditorConfig, Repaint};
pub use event::{ContextTarget, EditorEvent};
pub use history::{History, HistoryConfig, HistoryEntry, HistoryError, Snapshot};
pub use input::{Button, InputEvent, Modifiers};
pub use interaction::{InteractionConfig, InteractionMachine, Mode, Response, resize_bounds};
pub use session::{
    DiagramPayload, DiagramService, DiagramSession, MemoryPreferences, NoPrompt, Preferences,
    Prompt, RemoteError, SIDEBAR_KEY,
};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::{
    DiagramState, DiagramStore, DrawingMode, Notification, NotificationLevel, PatchQueue,
    StateKey, StatePatch, SubscriberError, Subscriber, SubscriptionId,
};
