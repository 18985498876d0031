//! Virtual output state written by the mapper and read by the emitter
//!
//! Every entry carries the value the mapper wants now and the last value
//! that actually reached the virtual device. The emitter only ever touches
//! the latter.

use crate::action::{Action, Key, PadAxis, PadButton};
use std::collections::VecDeque;
use tracing::warn;

/// Most one-shot actions held while the device refuses writes
pub const MAX_PENDING: usize = 16;

/// One discrete event sent to the virtual device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// Keyboard key level (0 released, 1 pressed)
    Key { key: Key, value: i32 },
    /// Press and release of a single key
    Tap(Key),
    /// Press all keys in order, release them all
    Combo(Vec<Key>),
    /// Absolute axis value, already rescaled to the device range
    Axis { axis: PadAxis, value: i32 },
    /// Joystick button level (0 released, 1 pressed)
    Button { button: PadButton, value: i32 },
    /// End of one processing cycle
    Sync,
}

impl From<Action> for OutputEvent {
    fn from(action: Action) -> Self {
        match action {
            Action::Key(key) => OutputEvent::Tap(key),
            Action::Combo(keys) => OutputEvent::Combo(keys),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<K, V> {
    id: K,
    value: V,
    emitted: Option<V>,
}

/// Insertion-ordered map from output id to value, with emitted shadows
#[derive(Debug, Clone)]
pub struct OutputBank<K, V> {
    slots: Vec<Slot<K, V>>,
}

impl<K, V> Default for OutputBank<K, V> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<K: Copy + PartialEq, V: Copy + PartialEq> OutputBank<K, V> {
    /// Set the wanted value; new ids are appended and have no shadow yet
    pub fn set(&mut self, id: K, value: V) {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) => slot.value = value,
            None => self.slots.push(Slot {
                id,
                value,
                emitted: None,
            }),
        }
    }

    /// Wanted value for an id, if it was ever written
    pub fn get(&self, id: K) -> Option<V> {
        self.slots.iter().find(|s| s.id == id).map(|s| s.value)
    }

    /// Last value that reached the device
    pub fn emitted(&self, id: K) -> Option<V> {
        self.slots.iter().find(|s| s.id == id).and_then(|s| s.emitted)
    }

    /// Entries whose wanted value differs from what was emitted, in order
    pub fn changed(&self) -> impl Iterator<Item = (K, V)> + '_ {
        self.slots
            .iter()
            .filter(|s| s.emitted != Some(s.value))
            .map(|s| (s.id, s.value))
    }

    /// Record that `value` reached the device for `id`
    pub fn commit(&mut self, id: K, value: V) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) {
            slot.emitted = Some(value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Everything the mapper produces for the virtual device
#[derive(Debug, Clone, Default)]
pub struct OutputState {
    /// Keyboard key levels
    pub keyboard: OutputBank<Key, i32>,
    /// Bank A: joystick axes, -1.0..1.0
    pub axes: OutputBank<PadAxis, f64>,
    /// Bank B: joystick buttons
    pub buttons: OutputBank<PadButton, i32>,
    /// One-shot actions not yet emitted, oldest first
    pub pending: VecDeque<Action>,
}

impl OutputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot action for the next emission. A full queue drops
    /// its oldest action.
    pub fn push_action(&mut self, action: Action) {
        if self.pending.len() >= MAX_PENDING {
            if let Some(stale) = self.pending.pop_front() {
                warn!("Action queue full, dropping {stale}");
            }
        }
        self.pending.push_back(action);
    }

    /// Whether emitting now would produce anything besides the sync
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
            || self.keyboard.changed().next().is_some()
            || self.axes.changed().next().is_some()
            || self.buttons.changed().next().is_some()
    }
}
