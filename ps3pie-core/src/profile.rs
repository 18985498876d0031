//! Remap profiles
//!
//! A profile is the full, immutable remapping table handed to the engine:
//! axis mappings, direct bindings, shift layers and their tap behaviour.
//! Tables are ordered lists, and the order is significant: when several
//! edges land in the same cycle, the earliest entry wins.
//!
//! The built-in default is the "descent" profile.

use crate::action::{Action, Key, PadAxis, PadButton};
use crate::error::ProfileError;
use crate::snapshot::{Analog, Button};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Integer range of the virtual joystick axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self { min: 0, max: 1000 }
    }
}

impl AxisRange {
    pub fn center(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }

    pub fn half_span(&self) -> f64 {
        (self.max as f64 - self.min as f64) / 2.0
    }

    /// Rescale a -1.0..1.0 value into this range, rounding to nearest
    pub fn scale(&self, value: f64) -> i32 {
        let scaled = (value * self.half_span() + self.center()).round();
        (scaled as i32).clamp(self.min, self.max)
    }
}

/// One stick axis routed to a joystick axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisMapping {
    /// Joystick axis written
    pub output: PadAxis,
    /// Controller axis read
    pub input: Analog,
    /// Flip the sign of the output
    #[serde(default)]
    pub invert: bool,
}

impl AxisMapping {
    /// Static sign applied to the calibration factor
    pub fn sign(&self) -> f64 {
        if self.invert {
            -1.0
        } else {
            1.0
        }
    }
}

/// Fixed value forced onto an axis while both mix triggers are held
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForcedAxis {
    pub axis: PadAxis,
    pub value: f64,
}

/// Two analog triggers folded into one joystick axis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerMix {
    /// Holding both of these switches to the "both pressed" override
    pub both: [Button; 2],
    /// Trigger pushing the axis positive
    pub positive: Analog,
    /// Trigger pushing the axis negative
    pub negative: Analog,
    /// Joystick axis written
    pub axis: PadAxis,
    /// Joystick button reflecting the override
    pub flag: PadButton,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced: Option<ForcedAxis>,
}

/// Controller button mirrored onto a joystick button
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub input: Button,
    pub output: PadButton,
}

/// Controller button mirrored onto a keyboard key
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyBinding {
    pub input: Button,
    pub output: Key,
}

/// Side effect of a layer binding on the persistent selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionEffect {
    /// The binding's action becomes the default selection
    Select,
    /// Set the toggle flag
    Arm,
}

/// Sub-button binding inside a shift layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerBinding {
    pub input: Button,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<SelectionEffect>,
}

/// What releasing a layer trigger does when no binding was used
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TapBehavior {
    #[default]
    None,
    /// Fire a fixed action
    Action { action: Action },
    /// Fire `action` if the toggle flag is clear, the default selection if
    /// it is set; then flip the flag
    Toggle { action: Action },
}

/// A shift layer: hold `trigger`, press one of the bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftLayer {
    pub trigger: Button,
    #[serde(default)]
    pub tap: TapBehavior,
    #[serde(default)]
    pub bindings: Vec<LayerBinding>,
}

/// Persistent selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Default selection before any `select` binding fires
    pub initial: Action,
    /// Whether a `select` binding also clears the toggle flag
    #[serde(default = "default_true")]
    pub reset_toggle_on_select: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            initial: Action::Key(Key::One),
            reset_toggle_on_select: true,
        }
    }
}

/// Buttons that, held together, recalibrate the sticks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub chord: Vec<Button>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            chord: vec![Button::Ps, Button::Start, Button::Select],
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_device_name() -> String {
    "ps3pie".to_string()
}

/// Complete remap profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Name for the virtual input device
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default)]
    pub axis_range: AxisRange,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub axes: Vec<AxisMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_mix: Option<TriggerMix>,
    #[serde(default)]
    pub buttons: Vec<ButtonBinding>,
    #[serde(default)]
    pub keys: Vec<KeyBinding>,
    #[serde(default)]
    pub layers: Vec<ShiftLayer>,
}

impl Default for Profile {
    fn default() -> Self {
        Self::descent()
    }
}

impl Profile {
    /// Flight-sim style profile: sticks on X/Y/Z/RX, triggers mixed on RY,
    /// weapon selection on the start and select layers
    pub fn descent() -> Self {
        use Button as B;

        fn bind(input: Button, action: impl Into<Action>) -> LayerBinding {
            LayerBinding {
                input,
                action: action.into(),
                effect: None,
            }
        }
        fn weapon(input: Button, key: Key, effect: SelectionEffect) -> LayerBinding {
            LayerBinding {
                input,
                action: Action::Key(key),
                effect: Some(effect),
            }
        }

        Self {
            device_name: default_device_name(),
            axis_range: AxisRange::default(),
            calibration: CalibrationConfig::default(),
            selection: SelectionConfig::default(),
            axes: vec![
                AxisMapping {
                    output: PadAxis::X,
                    input: Analog::LeftStickX,
                    invert: false,
                },
                AxisMapping {
                    output: PadAxis::Y,
                    input: Analog::LeftStickY,
                    invert: true,
                },
                AxisMapping {
                    output: PadAxis::Z,
                    input: Analog::RightStickX,
                    invert: false,
                },
                AxisMapping {
                    output: PadAxis::Rx,
                    input: Analog::RightStickY,
                    invert: true,
                },
            ],
            trigger_mix: Some(TriggerMix {
                both: [B::L1, B::L2],
                positive: Analog::L1Analog,
                negative: Analog::L2Analog,
                axis: PadAxis::Ry,
                flag: PadButton::Tl2,
                forced: None,
            }),
            buttons: vec![
                ButtonBinding { input: B::R1, output: PadButton::A },
                ButtonBinding { input: B::R2, output: PadButton::B },
                ButtonBinding { input: B::LeftStickButton, output: PadButton::X },
                ButtonBinding { input: B::RightStickButton, output: PadButton::Y },
                ButtonBinding { input: B::Circle, output: PadButton::Tl },
                ButtonBinding { input: B::Triangle, output: PadButton::Tr },
            ],
            keys: vec![
                KeyBinding { input: B::Up, output: Key::Up },
                KeyBinding { input: B::Down, output: Key::Down },
                KeyBinding { input: B::Left, output: Key::Left },
                KeyBinding { input: B::Right, output: Key::Right },
                KeyBinding { input: B::Cross, output: Key::Enter },
                KeyBinding { input: B::Square, output: Key::Space },
            ],
            layers: vec![
                ShiftLayer {
                    trigger: B::Ps,
                    tap: TapBehavior::Action {
                        action: Action::Key(Key::Esc),
                    },
                    bindings: vec![
                        bind(B::Cross, Action::Combo(vec![Key::RAlt, Key::F1])),
                        bind(B::Circle, Action::Combo(vec![Key::RAlt, Key::F3])),
                        bind(B::Square, Key::F2),
                        bind(B::Triangle, Key::Tab),
                        bind(B::Left, Key::Home),
                        bind(B::Right, Key::End),
                        bind(B::Up, Key::PageUp),
                        bind(B::Down, Key::PageDown),
                    ],
                },
                ShiftLayer {
                    trigger: B::Start,
                    tap: TapBehavior::None,
                    bindings: vec![
                        weapon(B::Down, Key::One, SelectionEffect::Select),
                        weapon(B::Left, Key::Two, SelectionEffect::Arm),
                        weapon(B::Up, Key::Three, SelectionEffect::Select),
                        weapon(B::Right, Key::Four, SelectionEffect::Select),
                        weapon(B::Select, Key::Five, SelectionEffect::Select),
                    ],
                },
                ShiftLayer {
                    trigger: B::Select,
                    tap: TapBehavior::Toggle {
                        action: Action::Key(Key::Two),
                    },
                    bindings: vec![
                        bind(B::Cross, Key::Six),
                        bind(B::Circle, Key::Seven),
                        bind(B::Triangle, Key::Eight),
                        bind(B::Square, Key::Nine),
                        bind(B::Start, Key::Zero),
                    ],
                },
            ],
        }
    }

    /// Get the default profile path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ps3pie")
            .join("profile.toml")
    }

    /// Load a profile from a file, or return the default if not found
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a profile
    pub fn from_toml(content: &str) -> Result<Self, ProfileError> {
        let profile: Profile = toml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_toml(&self) -> Result<String, ProfileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save profile to a file
    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Check the invariants the mapper relies on
    pub fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |msg: String| Err(ProfileError::Invalid(msg));

        if self.axis_range.min >= self.axis_range.max {
            return invalid(format!(
                "axis range {}..{} is empty",
                self.axis_range.min, self.axis_range.max
            ));
        }
        if self.calibration.chord.is_empty() {
            return invalid("calibration chord has no buttons".into());
        }

        let mut outputs = HashSet::new();
        let mix_axes = self.trigger_mix.iter().flat_map(|mix| {
            std::iter::once(mix.axis).chain(mix.forced.map(|f| f.axis))
        });
        for axis in self.axes.iter().map(|a| a.output).chain(mix_axes) {
            if !outputs.insert(axis) {
                return invalid(format!("axis {axis} is written twice"));
            }
        }
        for mapping in &self.axes {
            if !mapping.input.is_stick() {
                return invalid(format!("axis input {} is not a stick", mapping.input));
            }
        }

        let mut triggers = HashSet::new();
        for layer in &self.layers {
            if !triggers.insert(layer.trigger) {
                return invalid(format!("layer trigger {} used twice", layer.trigger));
            }
        }

        let mut actions: Vec<&Action> = vec![&self.selection.initial];
        for layer in &self.layers {
            if let TapBehavior::Action { action } | TapBehavior::Toggle { action } = &layer.tap {
                actions.push(action);
            }
            actions.extend(layer.bindings.iter().map(|b| &b.action));
        }
        if actions.iter().any(|a| a.keys().is_empty()) {
            return invalid("empty key combo".into());
        }

        Ok(())
    }

    /// Every joystick axis the profile writes, in profile order
    pub fn output_axes(&self) -> Vec<PadAxis> {
        let mut axes: Vec<PadAxis> = self.axes.iter().map(|a| a.output).collect();
        if let Some(mix) = &self.trigger_mix {
            axes.push(mix.axis);
            axes.extend(mix.forced.map(|f| f.axis));
        }
        axes
    }

    /// Every joystick button the profile writes
    pub fn output_buttons(&self) -> Vec<PadButton> {
        let mut buttons: Vec<PadButton> = self.buttons.iter().map(|b| b.output).collect();
        buttons.extend(self.trigger_mix.as_ref().map(|m| m.flag));
        buttons
    }

    /// Every key the profile can emit
    pub fn used_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.keys.iter().map(|k| k.output).collect();
        keys.extend(self.selection.initial.keys());
        for layer in &self.layers {
            if let TapBehavior::Action { action } | TapBehavior::Toggle { action } = &layer.tap {
                keys.extend(action.keys());
            }
            for binding in &layer.bindings {
                keys.extend(binding.action.keys());
            }
        }
        let mut seen = HashSet::new();
        keys.retain(|k| seen.insert(*k));
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        Profile::default().validate().unwrap();
    }

    #[test]
    fn test_roundtrip() {
        let profile = Profile::default();
        let toml_str = profile.to_toml().unwrap();
        assert!(toml_str.contains("device_name = \"ps3pie\""));
        assert!(toml_str.contains("trigger = \"ps\""));
        let parsed = Profile::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.axes.len(), 4);
        assert_eq!(parsed.layers.len(), 3);
        assert_eq!(parsed.layers[0].bindings.len(), 8);
        assert_eq!(
            parsed.layers[0].bindings[0].action,
            Action::Combo(vec![Key::RAlt, Key::F1])
        );
        assert_eq!(
            parsed.layers[2].tap,
            TapBehavior::Toggle {
                action: Action::Key(Key::Two)
            }
        );
    }

    #[test]
    fn test_layer_order_preserved() {
        let profile = Profile::default();
        let ps = &profile.layers[0];
        let inputs: Vec<_> = ps.bindings.iter().map(|b| b.input).collect();
        assert_eq!(
            inputs,
            vec![
                Button::Cross,
                Button::Circle,
                Button::Square,
                Button::Triangle,
                Button::Left,
                Button::Right,
                Button::Up,
                Button::Down,
            ]
        );
    }

    #[test]
    fn test_minimal_profile_uses_defaults() {
        let profile = Profile::from_toml(
            r#"
[[buttons]]
input = "cross"
output = "a"
"#,
        )
        .unwrap();
        assert_eq!(profile.device_name, "ps3pie");
        assert_eq!(profile.axis_range, AxisRange { min: 0, max: 1000 });
        assert_eq!(profile.calibration.chord.len(), 3);
        assert!(profile.layers.is_empty());
        assert!(profile.trigger_mix.is_none());
        assert!(profile.selection.reset_toggle_on_select);
    }

    #[test]
    fn test_parse_layer() {
        let profile = Profile::from_toml(
            r#"
[[layers]]
trigger = "ps"
tap = { type = "action", action = "esc" }

[[layers.bindings]]
input = "cross"
action = ["ralt", "f1"]

[[layers.bindings]]
input = "down"
action = "one"
effect = "select"
"#,
        )
        .unwrap();
        let layer = &profile.layers[0];
        assert_eq!(layer.trigger, Button::Ps);
        assert_eq!(
            layer.tap,
            TapBehavior::Action {
                action: Action::Key(Key::Esc)
            }
        );
        assert_eq!(layer.bindings[1].effect, Some(SelectionEffect::Select));
        assert_eq!(layer.bindings[0].effect, None);
    }

    #[test]
    fn test_duplicate_trigger_rejected() {
        let err = Profile::from_toml(
            r#"
[[layers]]
trigger = "ps"
[[layers]]
trigger = "ps"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let mut profile = Profile::default();
        profile.axes[1].output = PadAxis::Ry; // collides with trigger mix
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_empty_combo_rejected() {
        let mut profile = Profile::default();
        profile.layers[0].bindings[0].action = Action::Combo(vec![]);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_empty_chord_rejected() {
        let mut profile = Profile::default();
        profile.calibration.chord.clear();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_axis_range_scale() {
        let range = AxisRange::default();
        assert_eq!(range.center(), 500.0);
        assert_eq!(range.half_span(), 500.0);
        assert_eq!(range.scale(0.0), 500);
        assert_eq!(range.scale(-1.0), 0);
        assert_eq!(range.scale(1.0), 1000);
        assert_eq!(range.scale(0.0096), 505);
    }

    #[test]
    fn test_output_axes_and_buttons() {
        let profile = Profile::default();
        assert_eq!(
            profile.output_axes(),
            vec![PadAxis::X, PadAxis::Y, PadAxis::Z, PadAxis::Rx, PadAxis::Ry]
        );
        let buttons = profile.output_buttons();
        assert_eq!(buttons.len(), 7);
        assert_eq!(buttons.last(), Some(&PadButton::Tl2));
    }

    #[test]
    fn test_used_keys() {
        let keys = Profile::default().used_keys();
        for key in [Key::Esc, Key::RAlt, Key::F1, Key::Zero, Key::Enter, Key::One] {
            assert!(keys.contains(&key), "{key}");
        }
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_load_missing_returns_default() {
        let path = std::env::temp_dir().join("ps3pie-missing-profile.toml");
        let _ = std::fs::remove_file(&path);
        let profile = Profile::load(&path).unwrap();
        assert_eq!(profile.layers.len(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("ps3pie-test-{}", std::process::id()));
        let path = dir.join("profile.toml");
        let mut profile = Profile::default();
        profile.device_name = "saved pad".into();
        profile.save(&path).unwrap();
        let loaded = Profile::load(&path).unwrap();
        assert_eq!(loaded.device_name, "saved pad");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
