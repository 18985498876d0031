//! Virtual keyboard + joystick device using evdev/uinput
//!
//! One uinput device carries both the keyboard keys and the joystick
//! buttons and axes, so applications see a single "ps3pie" device.

use async_trait::async_trait;
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId,
    Key as EvKey, UinputAbsSetup,
};
use ps3pie_core::emitter::EventSink;
use ps3pie_core::output::OutputEvent;
use ps3pie_core::profile::Profile;
use ps3pie_core::{Key, PadAxis, PadButton};
use thiserror::Error;

/// Errors from virtual device creation
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),
}

/// The virtual device the engine writes to
pub struct VirtualPad {
    device: VirtualDevice,
    frame: CycleFrame,
}

impl VirtualPad {
    /// Create the device with the keys the profile can send, every joystick
    /// button, and the axes the profile writes, all at rest
    pub fn new(profile: &Profile) -> Result<Self, DeviceError> {
        let mut keys = AttributeSet::<EvKey>::new();
        for key in profile.used_keys() {
            keys.insert(key_code(key));
        }
        for button in PadButton::ALL {
            keys.insert(button_code(*button));
        }

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(DeviceError::CreateDevice)?
            .name(&profile.device_name)
            .input_id(InputId::new(BusType::BUS_VIRTUAL, 1, 1, 1))
            .with_keys(&keys)
            .map_err(DeviceError::CreateDevice)?;

        let range = profile.axis_range;
        let center = range.scale(0.0);
        for axis in profile.output_axes() {
            let setup = UinputAbsSetup::new(
                axis_code(axis),
                AbsInfo::new(center, range.min, range.max, 0, 0, 1),
            );
            builder = builder
                .with_absolute_axis(&setup)
                .map_err(DeviceError::CreateDevice)?;
        }

        let device = builder.build().map_err(DeviceError::CreateDevice)?;
        Ok(Self {
            device,
            frame: CycleFrame::default(),
        })
    }

    /// Get the device path (e.g., /dev/input/eventX)
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }
}

fn key_event(code: EvKey, value: i32) -> InputEvent {
    InputEvent::new(EventType::KEY, code.code(), value)
}

/// Groups one cycle's level changes into a single frame
///
/// Key, axis and button levels are held until the cycle's `Sync` and then
/// written together. Taps and combos need their press and release in
/// separate frames, so they are written at once, after any held levels.
/// Every frame is terminated by a SYN_REPORT when written.
#[derive(Debug, Default)]
struct CycleFrame {
    levels: Vec<InputEvent>,
}

impl CycleFrame {
    /// Frames to write now for `event`. Held levels stay held until
    /// [`CycleFrame::written`] confirms they reached the device.
    fn route(&mut self, event: &OutputEvent) -> Vec<Vec<InputEvent>> {
        let mut frames = Vec::new();
        match event {
            OutputEvent::Key { key, value } => {
                self.levels.push(key_event(key_code(*key), *value));
            }
            OutputEvent::Axis { axis, value } => {
                self.levels.push(InputEvent::new(
                    EventType::ABSOLUTE,
                    axis_code(*axis).0,
                    *value,
                ));
            }
            OutputEvent::Button { button, value } => {
                self.levels.push(key_event(button_code(*button), *value));
            }
            OutputEvent::Tap(key) => {
                self.flush_into(&mut frames);
                frames.push(vec![key_event(key_code(*key), 1)]);
                frames.push(vec![key_event(key_code(*key), 0)]);
            }
            OutputEvent::Combo(keys) => {
                self.flush_into(&mut frames);
                frames.push(keys.iter().map(|k| key_event(key_code(*k), 1)).collect());
                frames.push(keys.iter().rev().map(|k| key_event(key_code(*k), 0)).collect());
            }
            OutputEvent::Sync => frames.push(self.levels.clone()),
        }
        frames
    }

    fn flush_into(&self, frames: &mut Vec<Vec<InputEvent>>) {
        if !self.levels.is_empty() {
            frames.push(self.levels.clone());
        }
    }

    fn written(&mut self) {
        self.levels.clear();
    }
}

#[async_trait]
impl EventSink for VirtualPad {
    async fn emit(&mut self, event: &OutputEvent) -> std::io::Result<()> {
        let frames = self.frame.route(event);
        if frames.is_empty() {
            return Ok(());
        }
        // On failure held levels are written again with the next sync
        for frame in &frames {
            self.device.emit(frame)?;
        }
        self.frame.written();
        Ok(())
    }
}

fn key_code(key: Key) -> EvKey {
    match key {
        Key::Esc => EvKey::KEY_ESC,
        Key::One => EvKey::KEY_1,
        Key::Two => EvKey::KEY_2,
        Key::Three => EvKey::KEY_3,
        Key::Four => EvKey::KEY_4,
        Key::Five => EvKey::KEY_5,
        Key::Six => EvKey::KEY_6,
        Key::Seven => EvKey::KEY_7,
        Key::Eight => EvKey::KEY_8,
        Key::Nine => EvKey::KEY_9,
        Key::Zero => EvKey::KEY_0,
        Key::Tab => EvKey::KEY_TAB,
        Key::Enter => EvKey::KEY_ENTER,
        Key::Space => EvKey::KEY_SPACE,
        Key::Backspace => EvKey::KEY_BACKSPACE,
        Key::Shift => EvKey::KEY_RIGHTSHIFT,
        Key::LShift => EvKey::KEY_LEFTSHIFT,
        Key::LCtrl => EvKey::KEY_LEFTCTRL,
        Key::RCtrl => EvKey::KEY_RIGHTCTRL,
        Key::LAlt => EvKey::KEY_LEFTALT,
        Key::RAlt => EvKey::KEY_RIGHTALT,
        Key::F1 => EvKey::KEY_F1,
        Key::F2 => EvKey::KEY_F2,
        Key::F3 => EvKey::KEY_F3,
        Key::F4 => EvKey::KEY_F4,
        Key::F5 => EvKey::KEY_F5,
        Key::F6 => EvKey::KEY_F6,
        Key::F7 => EvKey::KEY_F7,
        Key::F8 => EvKey::KEY_F8,
        Key::F9 => EvKey::KEY_F9,
        Key::F10 => EvKey::KEY_F10,
        Key::F11 => EvKey::KEY_F11,
        Key::F12 => EvKey::KEY_F12,
        Key::Insert => EvKey::KEY_INSERT,
        Key::Delete => EvKey::KEY_DELETE,
        Key::Home => EvKey::KEY_HOME,
        Key::End => EvKey::KEY_END,
        Key::PageUp => EvKey::KEY_PAGEUP,
        Key::PageDown => EvKey::KEY_PAGEDOWN,
        Key::Up => EvKey::KEY_UP,
        Key::Down => EvKey::KEY_DOWN,
        Key::Left => EvKey::KEY_LEFT,
        Key::Right => EvKey::KEY_RIGHT,
    }
}

fn button_code(button: PadButton) -> EvKey {
    match button {
        PadButton::A => EvKey::BTN_SOUTH,
        PadButton::B => EvKey::BTN_EAST,
        PadButton::X => EvKey::BTN_NORTH,
        PadButton::Y => EvKey::BTN_WEST,
        PadButton::Tl => EvKey::BTN_TL,
        PadButton::Tr => EvKey::BTN_TR,
        PadButton::Tl2 => EvKey::BTN_TL2,
        PadButton::Tr2 => EvKey::BTN_TR2,
        PadButton::Select => EvKey::BTN_SELECT,
        PadButton::Start => EvKey::BTN_START,
        PadButton::Mode => EvKey::BTN_MODE,
        PadButton::ThumbL => EvKey::BTN_THUMBL,
        PadButton::ThumbR => EvKey::BTN_THUMBR,
        PadButton::Up => EvKey::BTN_DPAD_UP,
        PadButton::Down => EvKey::BTN_DPAD_DOWN,
        PadButton::Left => EvKey::BTN_DPAD_LEFT,
        PadButton::Right => EvKey::BTN_DPAD_RIGHT,
    }
}

/// Convert a joystick axis to evdev AbsoluteAxisType
fn axis_code(axis: PadAxis) -> AbsoluteAxisType {
    match axis {
        PadAxis::X => AbsoluteAxisType::ABS_X,
        PadAxis::Y => AbsoluteAxisType::ABS_Y,
        PadAxis::Z => AbsoluteAxisType::ABS_Z,
        PadAxis::Rx => AbsoluteAxisType::ABS_RX,
        PadAxis::Ry => AbsoluteAxisType::ABS_RY,
        PadAxis::Rz => AbsoluteAxisType::ABS_RZ,
    }
}
