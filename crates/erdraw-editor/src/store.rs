//! The single authoritative diagram state.
//!
//! Every mutation goes through [`DiagramStore::set_state`]: merge the patch,
//! snapshot into history when a historied key changed, notify subscribers,
//! and mark render-triggering keys dirty for the next repaint. Subscribers
//! cannot reach the store while they run; follow-up patches go into a
//! [`PatchQueue`] and are applied after the current notification pass.

use crate::history::{History, HistoryConfig, HistoryError, Snapshot, encode_parts};
use erdraw_core::{DiagramData, ElementId, Highlight, LayoutDocument, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Follow-up passes allowed per `set_state` before queued patches are dropped.
const MAX_NOTIFY_PASSES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StateKey {
    Data,
    Layout,
    Viewport,
    Selection,
    Highlight,
    DrawingMode,
    Loading,
    Error,
    Notification,
}

impl StateKey {
    /// Keys whose change is snapshotted into undo history.
    pub fn is_historied(self) -> bool {
        matches!(self, StateKey::Data | StateKey::Layout)
    }

    /// Keys whose change requires a repaint.
    pub fn triggers_render(self) -> bool {
        matches!(
            self,
            StateKey::Data
                | StateKey::Layout
                | StateKey::Viewport
                | StateKey::Selection
                | StateKey::Highlight
        )
    }
}

/// Annotation tool armed from outside the canvas (toolbar, shortcut).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingMode {
    Rectangle,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagramState {
    pub data: DiagramData,
    pub layout: LayoutDocument,
    pub viewport: Viewport,
    /// The selected annotation, if any.
    pub selection: Option<ElementId>,
    pub highlight: Highlight,
    pub drawing_mode: Option<DrawingMode>,
    pub loading: bool,
    pub error: Option<String>,
    pub notification: Option<Notification>,
}

/// A partial update. `None` leaves the key untouched.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub data: Option<DiagramData>,
    pub layout: Option<LayoutDocument>,
    pub viewport: Option<Viewport>,
    pub selection: Option<Option<ElementId>>,
    pub highlight: Option<Highlight>,
    pub drawing_mode: Option<Option<DrawingMode>>,
    pub loading: Option<bool>,
    pub error: Option<Option<String>>,
    pub notification: Option<Option<Notification>>,
    /// History label used when this patch is recorded.
    pub label: Option<String>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: DiagramData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn layout(mut self, layout: LayoutDocument) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn selection(mut self, selection: Option<ElementId>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    pub fn drawing_mode(mut self, mode: Option<DrawingMode>) -> Self {
        self.drawing_mode = Some(mode);
        self
    }

    pub fn loading(mut self, loading: bool) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn notification(mut self, notification: Option<Notification>) -> Self {
        self.notification = Some(notification);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Keys present in the patch, in declaration order.
    pub fn keys(&self) -> Vec<StateKey> {
        let present = [
            (self.data.is_some(), StateKey::Data),
            (self.layout.is_some(), StateKey::Layout),
            (self.viewport.is_some(), StateKey::Viewport),
            (self.selection.is_some(), StateKey::Selection),
            (self.highlight.is_some(), StateKey::Highlight),
            (self.drawing_mode.is_some(), StateKey::DrawingMode),
            (self.loading.is_some(), StateKey::Loading),
            (self.error.is_some(), StateKey::Error),
            (self.notification.is_some(), StateKey::Notification),
        ];
        present
            .into_iter()
            .filter_map(|(set, key)| set.then_some(key))
            .collect()
    }

    fn merge_into(self, state: &mut DiagramState) {
        if let Some(v) = self.data {
            state.data = v;
        }
        if let Some(v) = self.layout {
            state.layout = v;
        }
        if let Some(v) = self.viewport {
            state.viewport = v;
        }
        if let Some(v) = self.selection {
            state.selection = v;
        }
        if let Some(v) = self.highlight {
            state.highlight = v;
        }
        if let Some(v) = self.drawing_mode {
            state.drawing_mode = v;
        }
        if let Some(v) = self.loading {
            state.loading = v;
        }
        if let Some(v) = self.error {
            state.error = v;
        }
        if let Some(v) = self.notification {
            state.notification = v;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Patches queued by subscribers during notification.
#[derive(Debug, Default)]
pub struct PatchQueue {
    patches: Vec<(StatePatch, bool)>,
}

impl PatchQueue {
    pub fn push(&mut self, patch: StatePatch, record_history: bool) {
        self.patches.push((patch, record_history));
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

pub type Subscriber =
    Box<dyn FnMut(&DiagramState, &[StateKey], &mut PatchQueue) -> Result<(), SubscriberError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    /// `None` for whole-state subscribers.
    key: Option<StateKey>,
    callback: Subscriber,
}

/// Milliseconds since the Unix epoch.
pub type Clock = Box<dyn Fn() -> f64>;

fn system_clock() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

pub struct DiagramStore {
    state: DiagramState,
    history: History,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
    dirty: BTreeSet<StateKey>,
    data_revision: u64,
    /// Encoded snapshot taken when the current gesture began.
    gesture: Option<Vec<u8>>,
    clock: Clock,
}

impl Default for DiagramStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl std::fmt::Debug for DiagramStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramStore")
            .field("state", &self.state)
            .field("history", &self.history.len())
            .field("subscriptions", &self.subscriptions.len())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl DiagramStore {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            state: DiagramState::default(),
            history: History::new(config),
            subscriptions: Vec::new(),
            next_subscription: 0,
            dirty: BTreeSet::new(),
            data_revision: 0,
            gesture: None,
            clock: Box::new(system_clock),
        }
    }

    /// Replace the timestamp source (the wasm host has no `SystemTime`).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Milliseconds since the epoch.
    pub fn now(&self) -> f64 {
        (self.clock)()
    }

    pub fn state(&self) -> &DiagramState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.gesture = None;
    }

    /// Bumped whenever `data` is replaced.
    pub fn data_revision(&self) -> u64 {
        self.data_revision
    }

    /// Render-triggering keys changed since the last call.
    pub fn take_dirty(&mut self) -> BTreeSet<StateKey> {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    // ─── Subscriptions ───────────────────────────────────────────────────

    /// Called after every state change with the changed keys.
    pub fn subscribe(&mut self, callback: Subscriber) -> SubscriptionId {
        self.add_subscription(None, callback)
    }

    /// Called only when `key` is among the changed keys.
    pub fn subscribe_key(&mut self, key: StateKey, callback: Subscriber) -> SubscriptionId {
        self.add_subscription(Some(key), callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    fn add_subscription(&mut self, key: Option<StateKey>, callback: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(Subscription { id, key, callback });
        id
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Merge `patch`, record history when asked and a historied key is
    /// present, then notify. Patches queued by subscribers are applied in
    /// order once the current pass completes. Returns the keys of `patch`.
    pub fn set_state(&mut self, patch: StatePatch, record_history: bool) -> Vec<StateKey> {
        let mut pending = VecDeque::from([(patch, record_history)]);
        let mut first: Option<Vec<StateKey>> = None;
        let mut passes = 0;

        while let Some((patch, record)) = pending.pop_front() {
            if passes == MAX_NOTIFY_PASSES {
                log::warn!(
                    "state: dropping {} queued patches after {passes} passes",
                    pending.len() + 1
                );
                break;
            }
            passes += 1;

            let keys = self.apply(patch, record);
            if first.is_none() {
                first = Some(keys.clone());
            }
            if keys.is_empty() {
                continue;
            }
            let mut queue = PatchQueue::default();
            self.notify(&keys, &mut queue);
            pending.extend(queue.patches);
        }
        first.unwrap_or_default()
    }

    fn apply(&mut self, patch: StatePatch, record_history: bool) -> Vec<StateKey> {
        let keys = patch.keys();
        if keys.is_empty() {
            return keys;
        }
        let label = patch.label.clone().unwrap_or_else(|| "edit".to_string());
        let historied = record_history && keys.iter().any(|k| k.is_historied());
        let before = if historied { self.encode_current() } else { None };

        patch.merge_into(&mut self.state);
        if keys.contains(&StateKey::Data) {
            self.data_revision += 1;
        }
        if let Some(before) = before
            && let Some(after) = self.encode_current()
        {
            let now = (self.clock)();
            self.history.push_encoded(&label, now, before, after);
        }
        self.dirty
            .extend(keys.iter().copied().filter(|k| k.triggers_render()));
        keys
    }

    fn notify(&mut self, keys: &[StateKey], queue: &mut PatchQueue) {
        let state = &self.state;
        for sub in self.subscriptions.iter_mut() {
            if let Some(key) = sub.key
                && !keys.contains(&key)
            {
                continue;
            }
            if let Err(err) = (sub.callback)(state, keys, queue) {
                log::warn!("state: subscriber {:?} failed: {err}", sub.id);
            }
        }
    }

    fn encode_current(&self) -> Option<Vec<u8>> {
        match encode_parts(&self.state.data, &self.state.layout) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("state: cannot snapshot diagram: {err}");
                None
            }
        }
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    /// Capture the pre-gesture snapshot. Live updates during the gesture are
    /// applied without history; [`commit_gesture`](Self::commit_gesture)
    /// records them as one entry.
    pub fn begin_gesture(&mut self) {
        if self.gesture.is_some() {
            log::debug!("state: gesture already open");
            return;
        }
        self.gesture = self.encode_current();
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Close the open gesture. Returns true if a history entry was recorded.
    pub fn commit_gesture(&mut self, label: &str) -> bool {
        let Some(before) = self.gesture.take() else {
            return false;
        };
        let Some(after) = self.encode_current() else {
            return false;
        };
        let now = (self.clock)();
        self.history.push_encoded(label, now, before, after)
    }

    // ─── Undo / redo ─────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.commit_gesture("gesture");
        let step = self.history.undo();
        self.restore(step, "undo")
    }

    pub fn redo(&mut self) -> bool {
        self.commit_gesture("gesture");
        let step = self.history.redo();
        self.restore(step, "redo")
    }

    fn restore(
        &mut self,
        step: Result<Option<(Snapshot, String)>, HistoryError>,
        verb: &str,
    ) -> bool {
        let (snapshot, label) = match step {
            Ok(Some(step)) => step,
            Ok(None) => return false,
            Err(err) => {
                log::warn!("state: {verb} skipped, corrupt snapshot: {err}");
                return false;
            }
        };
        log::debug!("state: {verb} {label:?}");
        let selection = self
            .state
            .selection
            .filter(|id| snapshot.layout.annotation_kind(*id).is_some());
        let mut patch = StatePatch::new()
            .data(snapshot.data)
            .layout(snapshot.layout);
        if selection != self.state.selection {
            patch = patch.selection(selection);
        }
        self.set_state(patch, false);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erdraw_core::{Bounds, Point, RectAnnotation};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> DiagramStore {
        DiagramStore::default().with_clock(Box::new(|| 42.0))
    }

    fn moved(store: &DiagramStore, x: f64) -> LayoutDocument {
        let mut layout = store.state().layout.clone();
        layout.set_position("users", Point::new(x, 0.0));
        layout
    }

    #[test]
    fn patch_keys_follow_present_fields() {
        let patch = StatePatch::new()
            .viewport(Viewport::default())
            .selection(None)
            .loading(true);
        assert_eq!(
            patch.keys(),
            vec![StateKey::Viewport, StateKey::Selection, StateKey::Loading]
        );
        assert!(StatePatch::new().keys().is_empty());
    }

    #[test]
    fn only_historied_keys_record() {
        let mut s = store();
        s.set_state(StatePatch::new().viewport(Viewport::default()), true);
        assert!(s.history().is_empty());

        let layout = moved(&s, 10.0);
        s.set_state(StatePatch::new().layout(layout).label("move users"), true);
        assert_eq!(s.history().len(), 1);
        let entry = s.history().entries().next().unwrap();
        assert_eq!(entry.label, "move users");
        assert_eq!(entry.timestamp, 42.0);

        let layout = moved(&s, 20.0);
        s.set_state(StatePatch::new().layout(layout), false);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn undo_after_n_mutations_restores_previous_snapshot() {
        let mut s = store();
        for i in 1..=4 {
            let layout = moved(&s, i as f64 * 10.0);
            s.set_state(StatePatch::new().layout(layout), true);
        }
        assert!(s.undo());
        assert_eq!(s.state().layout.position("users"), Some(Point::new(30.0, 0.0)));
        assert!(s.undo());
        assert_eq!(s.state().layout.position("users"), Some(Point::new(20.0, 0.0)));
        assert!(s.redo());
        assert_eq!(s.state().layout.position("users"), Some(Point::new(30.0, 0.0)));
    }

    #[test]
    fn history_is_bounded() {
        let mut s = DiagramStore::new(HistoryConfig { capacity: 5 });
        for i in 0..20 {
            let layout = moved(&s, i as f64 + 1.0);
            s.set_state(StatePatch::new().layout(layout), true);
            assert!(s.history().len() <= 5);
        }
        let mut undone = 0;
        while s.undo() {
            undone += 1;
        }
        assert_eq!(undone, 5);
        assert_eq!(s.state().layout.position("users"), Some(Point::new(15.0, 0.0)));
    }

    #[test]
    fn undo_drops_selection_of_vanished_annotation() {
        let mut s = store();
        let mut layout = s.state().layout.clone();
        let id = layout.fresh_id("rect");
        layout.add_rectangle(RectAnnotation::new(id, Bounds::new(0.0, 0.0, 50.0, 50.0)));
        s.set_state(StatePatch::new().layout(layout).selection(Some(id)), true);
        assert!(s.undo());
        assert_eq!(s.state().selection, None);
        assert!(s.state().layout.rectangles.is_empty());
    }

    #[test]
    fn gesture_records_one_entry() {
        let mut s = store();
        s.begin_gesture();
        for x in [1.0, 2.0, 3.0] {
            let layout = moved(&s, x);
            s.set_state(StatePatch::new().layout(layout), false);
        }
        assert!(s.commit_gesture("drag"));
        assert_eq!(s.history().len(), 1);
        assert!(s.undo());
        assert_eq!(s.state().layout.position("users"), None);

        s.begin_gesture();
        assert!(!s.commit_gesture("no-op"));
    }

    #[test]
    fn subscribers_filter_by_key_and_survive_errors() {
        let mut s = store();
        let seen = Rc::new(RefCell::new(Vec::new()));

        s.subscribe(Box::new(|_, _, _| Err(SubscriberError::Failed("boom".into()))));
        let log = Rc::clone(&seen);
        s.subscribe(Box::new(move |_, keys, _| {
            log.borrow_mut().push(format!("all:{keys:?}"));
            Ok(())
        }));
        let log = Rc::clone(&seen);
        s.subscribe_key(
            StateKey::Viewport,
            Box::new(move |state, _, _| {
                log.borrow_mut().push(format!("viewport:{}", state.viewport.scale));
                Ok(())
            }),
        );

        s.set_state(StatePatch::new().loading(true), false);
        s.set_state(
            StatePatch::new().viewport(Viewport {
                scale: 2.0,
                ..Viewport::default()
            }),
            false,
        );
        assert_eq!(
            *seen.borrow(),
            vec!["all:[Loading]", "all:[Viewport]", "viewport:2"]
        );
    }

    #[test]
    fn reentrant_patches_run_after_the_current_pass() {
        let mut s = store();
        let order = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&order);
        s.subscribe_key(
            StateKey::Loading,
            Box::new(move |state, _, queue| {
                log.borrow_mut().push(format!("a:loading={}", state.loading));
                if state.loading {
                    queue.push(StatePatch::new().loading(false), false);
                }
                Ok(())
            }),
        );
        let log = Rc::clone(&order);
        s.subscribe(Box::new(move |state, _, _| {
            log.borrow_mut().push(format!("b:loading={}", state.loading));
            Ok(())
        }));

        s.set_state(StatePatch::new().loading(true), false);
        assert_eq!(
            *order.borrow(),
            vec![
                "a:loading=true",
                "b:loading=true",
                "a:loading=false",
                "b:loading=false"
            ]
        );
        assert!(!s.state().loading);
    }

    #[test]
    fn runaway_subscribers_are_cut_off() {
        let mut s = store();
        s.subscribe(Box::new(|state, _, queue| {
            queue.push(StatePatch::new().loading(!state.loading), false);
            Ok(())
        }));
        // Terminates instead of looping forever.
        s.set_state(StatePatch::new().loading(true), false);
    }

    #[test]
    fn dirty_keys_are_render_keys_only() {
        let mut s = store();
        s.set_state(
            StatePatch::new()
                .loading(true)
                .viewport(Viewport::default())
                .notification(Some(Notification::info("hi"))),
            false,
        );
        assert_eq!(s.take_dirty(), BTreeSet::from([StateKey::Viewport]));
        assert!(!s.is_dirty());

        let rev = s.data_revision();
        s.set_state(StatePatch::new().data(DiagramData::default()), false);
        assert_eq!(s.data_revision(), rev + 1);
        assert_eq!(s.take_dirty(), BTreeSet::from([StateKey::Data]));
    }

    #[test]
    fn unsubscribe_stops_callbacks() {
        let mut s = store();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = s.subscribe(Box::new(move |_, _, _| {
            *c.borrow_mut() += 1;
            Ok(())
        }));
        s.set_state(StatePatch::new().loading(true), false);
        assert!(s.unsubscribe(id));
        assert!(!s.unsubscribe(id));
        s.set_state(StatePatch::new().loading(false), false);
        assert_eq!(*count.borrow(), 1);
    }
}
