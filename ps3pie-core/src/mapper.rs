//! Snapshot to output mapping
//!
//! The mapper owns all runtime remapping state: calibration, the previous
//! cycle's buttons, the shift-layer state machine and the persistent
//! selection. One call to [`Mapper::map`] is one processing cycle; it never
//! blocks and never fails (a rejected calibration is reported, not raised).

use crate::action::Action;
use crate::calibration::{Calibration, Chord};
use crate::error::CalibrationFault;
use crate::output::OutputState;
use crate::profile::{Profile, SelectionEffect, TapBehavior};
use crate::snapshot::{Button, ControllerSnapshot};
use std::sync::Arc;
use tracing::debug;

/// What consumed the current layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Taken {
    /// The calibration chord fired while the layer was held
    Calibrated,
    /// Index of the layer binding that fired
    Binding(usize),
}

/// Shift-layer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftState {
    #[default]
    Idle,
    Active {
        /// Index into the profile's layers
        layer: usize,
        taken: Option<Taken>,
    },
}

impl ShiftState {
    pub fn is_active(&self) -> bool {
        matches!(self, ShiftState::Active { .. })
    }
}

/// Button levels seen on the previous cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeState {
    previous: ControllerSnapshot,
}

impl EdgeState {
    pub fn rose(&self, button: Button, now: &ControllerSnapshot) -> bool {
        now.button(button) && !self.previous.button(button)
    }

    pub fn fell(&self, button: Button, now: &ControllerSnapshot) -> bool {
        !now.button(button) && self.previous.button(button)
    }

    pub fn update(&mut self, now: &ControllerSnapshot) {
        self.previous = *now;
    }
}

/// Persistent selection driven by layer bindings and toggle taps
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Action a toggle tap falls back to while the flag is set
    pub default: Action,
    pub toggle: bool,
}

/// Side results of one mapping cycle
#[derive(Debug, Clone, Default)]
pub struct MapOutcome {
    /// Set when the calibration chord fired this cycle
    pub calibration: Option<Result<(), CalibrationFault>>,
}

pub struct Mapper {
    profile: Arc<Profile>,
    calibration: Calibration,
    chord: Chord,
    shift: ShiftState,
    edges: EdgeState,
    selection: Selection,
}

impl Mapper {
    pub fn new(profile: Arc<Profile>) -> Self {
        Self {
            calibration: Calibration::new(&profile),
            chord: Chord::new(profile.calibration.chord.clone()),
            shift: ShiftState::Idle,
            edges: EdgeState::default(),
            selection: Selection {
                default: profile.selection.initial.clone(),
                toggle: false,
            },
            profile,
        }
    }

    pub fn shift(&self) -> ShiftState {
        self.shift
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Output state matching a freshly created virtual device: every output
    /// the profile can write, at rest and already emitted
    pub fn initial_output(&self) -> OutputState {
        let mut out = OutputState::new();
        let profile = &self.profile;

        for axis in profile.output_axes() {
            out.axes.set(axis, 0.0);
            out.axes.commit(axis, 0.0);
        }
        for button in profile.output_buttons() {
            out.buttons.set(button, 0);
            out.buttons.commit(button, 0);
        }
        for key in profile.keys.iter().map(|k| k.output) {
            out.keyboard.set(key, 0);
            out.keyboard.commit(key, 0);
        }
        out
    }

    /// Run one cycle against `snapshot`
    pub fn map(&mut self, snapshot: &ControllerSnapshot, out: &mut OutputState) -> MapOutcome {
        let calibrated = self.chord.update(snapshot);
        let calibration = calibrated.then(|| self.calibration.recalibrate(snapshot));

        for (axis, value) in self.calibration.apply(snapshot) {
            out.axes.set(axis, value);
        }
        self.mix_triggers(snapshot, out);
        self.shift_layers(snapshot, calibrated, out);
        self.direct_bindings(snapshot, out);

        self.edges.update(snapshot);
        MapOutcome { calibration }
    }

    /// Drop any layer activation without its tap and any unsent one-shot
    /// actions, then map the controller at rest so held outputs are released.
    /// Sticks rest on their calibrated centers.
    pub fn release_all(&mut self, out: &mut OutputState) -> MapOutcome {
        if self.shift.is_active() {
            debug!("Shift layer abandoned");
        }
        if !out.pending.is_empty() {
            debug!("Dropping {} unsent actions", out.pending.len());
            out.pending.clear();
        }
        self.shift = ShiftState::Idle;
        let rest = self.calibration.rest();
        self.map(&rest, out)
    }

    fn mix_triggers(&self, snapshot: &ControllerSnapshot, out: &mut OutputState) {
        let Some(mix) = &self.profile.trigger_mix else {
            return;
        };
        let positive = snapshot.analog(mix.positive);
        let negative = snapshot.analog(mix.negative);

        if mix.both.iter().all(|b| snapshot.button(*b)) {
            out.buttons.set(mix.flag, 1);
            out.axes.set(mix.axis, -negative);
            if let Some(forced) = mix.forced {
                out.axes.set(forced.axis, forced.value);
            }
        } else {
            out.buttons.set(mix.flag, 0);
            out.axes.set(mix.axis, positive - negative);
        }
    }

    fn shift_layers(&mut self, snapshot: &ControllerSnapshot, calibrated: bool, out: &mut OutputState) {
        let profile = Arc::clone(&self.profile);
        let state = self.shift;

        match state {
            ShiftState::Idle => {
                let rising = profile
                    .layers
                    .iter()
                    .position(|l| self.edges.rose(l.trigger, snapshot));
                if let Some(layer) = rising {
                    debug!("Shift layer {} active", profile.layers[layer].trigger);
                    self.shift = ShiftState::Active {
                        layer,
                        taken: calibrated.then_some(Taken::Calibrated),
                    };
                }
            }
            ShiftState::Active { layer, taken } => {
                let current = &profile.layers[layer];

                if !snapshot.button(current.trigger) {
                    match taken {
                        None => {
                            debug!("Shift layer {} tapped", current.trigger);
                            self.tap(&current.tap, out);
                        }
                        Some(taken) => {
                            debug!("Shift layer {} released ({taken:?})", current.trigger);
                        }
                    }
                    self.shift = ShiftState::Idle;
                    return;
                }

                if taken.is_some() {
                    return;
                }
                if calibrated {
                    self.shift = ShiftState::Active {
                        layer,
                        taken: Some(Taken::Calibrated),
                    };
                    return;
                }

                let fired = current
                    .bindings
                    .iter()
                    .position(|b| self.edges.rose(b.input, snapshot));
                if let Some(index) = fired {
                    let binding = &current.bindings[index];
                    debug!(
                        "Shift layer {}: {} -> {}",
                        current.trigger, binding.input, binding.action
                    );
                    out.push_action(binding.action.clone());
                    if let Some(effect) = binding.effect {
                        self.apply_effect(effect, &binding.action);
                    }
                    self.shift = ShiftState::Active {
                        layer,
                        taken: Some(Taken::Binding(index)),
                    };
                }
            }
        }
    }

    fn tap(&mut self, tap: &TapBehavior, out: &mut OutputState) {
        match tap {
            TapBehavior::None => {}
            TapBehavior::Action { action } => out.push_action(action.clone()),
            TapBehavior::Toggle { action } => {
                let fire = if self.selection.toggle {
                    self.selection.default.clone()
                } else {
                    action.clone()
                };
                out.push_action(fire);
                self.selection.toggle = !self.selection.toggle;
            }
        }
    }

    fn apply_effect(&mut self, effect: SelectionEffect, action: &Action) {
        match effect {
            SelectionEffect::Select => {
                self.selection.default = action.clone();
                if self.profile.selection.reset_toggle_on_select {
                    self.selection.toggle = false;
                }
            }
            SelectionEffect::Arm => self.selection.toggle = true,
        }
        debug!(
            "Selection: default {}, toggle {}",
            self.selection.default, self.selection.toggle
        );
    }

    fn direct_bindings(&self, snapshot: &ControllerSnapshot, out: &mut OutputState) {
        let shifted = self.shift.is_active();

        for binding in &self.profile.buttons {
            if self.edges.rose(binding.input, snapshot) && !shifted {
                out.buttons.set(binding.output, 1);
            } else if self.edges.fell(binding.input, snapshot) {
                out.buttons.set(binding.output, 0);
            }
        }
        for binding in &self.profile.keys {
            if self.edges.rose(binding.input, snapshot) && !shifted {
                out.keyboard.set(binding.output, 1);
            } else if self.edges.fell(binding.input, snapshot) {
                out.keyboard.set(binding.output, 0);
            }
        }
    }
}
