//! Whole-cycle scenarios for the built-in descent profile, driven with raw
//! reports the way the controller sends them.

use ps3pie_core::engine::Engine;
use ps3pie_core::gate::Input;
use ps3pie_core::output::OutputEvent;
use ps3pie_core::profile::Profile;
use ps3pie_core::report::{dpad, neutral_report, offset};
use ps3pie_core::{Button, Key, PadAxis, PadButton, RecordingSink};
use std::sync::Arc;

/// Raw report builder
#[derive(Clone)]
struct Pad {
    data: Vec<u8>,
}

impl Pad {
    fn new() -> Self {
        Self {
            data: neutral_report().to_vec(),
        }
    }

    fn press(mut self, button: Button) -> Self {
        let (index, mask) = match button {
            Button::Up => (offset::DPAD_SYSTEM, dpad::UP),
            Button::Right => (offset::DPAD_SYSTEM, dpad::RIGHT),
            Button::Down => (offset::DPAD_SYSTEM, dpad::DOWN),
            Button::Left => (offset::DPAD_SYSTEM, dpad::LEFT),
            Button::Select => (offset::DPAD_SYSTEM, 1 << 0),
            Button::LeftStickButton => (offset::DPAD_SYSTEM, 1 << 1),
            Button::RightStickButton => (offset::DPAD_SYSTEM, 1 << 2),
            Button::Start => (offset::DPAD_SYSTEM, 1 << 3),
            Button::L2 => (offset::SHOULDER_FACE, 1 << 0),
            Button::R2 => (offset::SHOULDER_FACE, 1 << 1),
            Button::L1 => (offset::SHOULDER_FACE, 1 << 2),
            Button::R1 => (offset::SHOULDER_FACE, 1 << 3),
            Button::Triangle => (offset::SHOULDER_FACE, 1 << 4),
            Button::Circle => (offset::SHOULDER_FACE, 1 << 5),
            Button::Cross => (offset::SHOULDER_FACE, 1 << 6),
            Button::Square => (offset::SHOULDER_FACE, 1 << 7),
            Button::Ps => (offset::PS, 1),
        };
        self.data[index] |= mask;
        self
    }

    fn byte(mut self, index: usize, value: u8) -> Self {
        self.data[index] = value;
        self
    }

    fn input(&self) -> Input {
        Input::Report(self.data.clone())
    }
}

struct Harness {
    engine: Engine,
    sink: RecordingSink,
}

impl Harness {
    fn new() -> Self {
        Self {
            engine: Engine::new(Arc::new(Profile::default())),
            sink: RecordingSink::new(),
        }
    }

    async fn send(&mut self, pad: &Pad) -> Vec<OutputEvent> {
        self.engine
            .process(&pad.input(), &mut self.sink)
            .await
            .expect("cycle failed");
        self.sink.take()
    }
}

fn taps(events: &[OutputEvent]) -> Vec<OutputEvent> {
    events
        .iter()
        .filter(|e| matches!(e, OutputEvent::Tap(_) | OutputEvent::Combo(_)))
        .cloned()
        .collect()
}

#[tokio::test]
async fn test_circle_presses_left_shoulder_button() {
    let mut h = Harness::new();
    let events = h.send(&Pad::new().press(Button::Circle)).await;
    assert_eq!(
        events,
        vec![
            OutputEvent::Button {
                button: PadButton::Tl,
                value: 1
            },
            OutputEvent::Sync
        ]
    );

    // Held: nothing new
    let events = h.send(&Pad::new().press(Button::Circle)).await;
    assert_eq!(events, vec![OutputEvent::Sync]);
}

#[tokio::test]
async fn test_stick_deflection_rescaled() {
    let mut h = Harness::new();
    let events = h.send(&Pad::new().byte(offset::LEFT_STICK_X, 140)).await;
    assert_eq!(
        events,
        vec![
            OutputEvent::Axis {
                axis: PadAxis::X,
                value: 505
            },
            OutputEvent::Sync
        ]
    );

    // Left stick Y is inverted
    let events = h.send(&Pad::new().byte(offset::LEFT_STICK_Y, 255)).await;
    assert!(events.contains(&OutputEvent::Axis {
        axis: PadAxis::Y,
        value: 0
    }));
}

#[tokio::test]
async fn test_ps_tap_sends_escape() {
    let mut h = Harness::new();
    assert_eq!(h.send(&Pad::new().press(Button::Ps)).await, vec![OutputEvent::Sync]);
    assert_eq!(
        h.send(&Pad::new()).await,
        vec![OutputEvent::Tap(Key::Esc), OutputEvent::Sync]
    );
}

#[tokio::test]
async fn test_ps_layer_combo_hides_direct_key() {
    let mut h = Harness::new();
    h.send(&Pad::new().press(Button::Ps)).await;
    let events = h.send(&Pad::new().press(Button::Ps).press(Button::Cross)).await;
    assert_eq!(
        events,
        vec![OutputEvent::Combo(vec![Key::RAlt, Key::F1]), OutputEvent::Sync]
    );

    let events = h.send(&Pad::new()).await;
    assert_eq!(events, vec![OutputEvent::Sync]);
}

#[tokio::test]
async fn test_calibration_suppresses_escape() {
    let mut h = Harness::new();
    // 153 reads as exactly 0.2
    let resting = Pad::new().byte(offset::LEFT_STICK_X, 153);

    h.send(&resting.clone().press(Button::Ps)).await;
    h.send(&resting.clone().press(Button::Ps).press(Button::Start)).await;
    let chord = resting
        .clone()
        .press(Button::Ps)
        .press(Button::Start)
        .press(Button::Select);
    let report = h
        .engine
        .process(&chord.input(), &mut h.sink)
        .await
        .unwrap();
    assert_eq!(report.calibration, Some(Ok(())));

    let x = h.engine.mapper().calibration().get(PadAxis::X).unwrap();
    assert!((x.center - 0.2).abs() < 1e-12);
    assert!((x.factor - 1.25).abs() < 1e-12);
    let y = h.engine.mapper().calibration().get(PadAxis::Y).unwrap();
    assert!(y.factor < 0.0);

    // Releasing everything: the stick now reads as centered, no escape
    h.sink.take();
    let events = h.send(&resting).await;
    assert!(taps(&events).is_empty(), "{events:?}");
    assert_eq!(h.engine.output().axes.emitted(PadAxis::X), Some(0.0));
}

#[tokio::test]
async fn test_start_layer_selects_weapon() {
    let mut h = Harness::new();
    h.send(&Pad::new().press(Button::Start)).await;
    let events = h.send(&Pad::new().press(Button::Start).press(Button::Up)).await;
    assert_eq!(taps(&events), vec![OutputEvent::Tap(Key::Three)]);
    // The D-pad key binding stays untouched while shifted
    assert!(!events.iter().any(|e| matches!(e, OutputEvent::Key { .. })));

    h.send(&Pad::new()).await;

    // Select tap: flag clear, fires "two"; next tap falls back to "three"
    h.send(&Pad::new().press(Button::Select)).await;
    assert_eq!(taps(&h.send(&Pad::new()).await), vec![OutputEvent::Tap(Key::Two)]);
    h.send(&Pad::new().press(Button::Select)).await;
    assert_eq!(taps(&h.send(&Pad::new()).await), vec![OutputEvent::Tap(Key::Three)]);
}

#[tokio::test]
async fn test_select_layer_numbers() {
    let mut h = Harness::new();
    h.send(&Pad::new().press(Button::Select)).await;
    let events = h.send(&Pad::new().press(Button::Select).press(Button::Square)).await;
    assert_eq!(taps(&events), vec![OutputEvent::Tap(Key::Nine)]);
    // Binding used: no toggle tap on release
    assert!(taps(&h.send(&Pad::new()).await).is_empty());
    assert!(!h.engine.mapper().selection().toggle);
}

#[tokio::test]
async fn test_trigger_mix_on_ry() {
    let mut h = Harness::new();
    let l1 = Pad::new().press(Button::L1).byte(20, 255);
    let events = h.send(&l1).await;
    assert_eq!(
        events,
        vec![
            OutputEvent::Axis {
                axis: PadAxis::Ry,
                value: 1000
            },
            OutputEvent::Sync
        ]
    );

    let both = l1.press(Button::L2).byte(18, 51);
    let events = h.send(&both).await;
    assert_eq!(
        events,
        vec![
            OutputEvent::Axis {
                axis: PadAxis::Ry,
                value: 400
            },
            OutputEvent::Button {
                button: PadButton::Tl2,
                value: 1
            },
            OutputEvent::Sync
        ]
    );
}

#[tokio::test]
async fn test_disconnect_releases_held_outputs() {
    let mut h = Harness::new();
    h.send(&Pad::new().press(Button::Cross).press(Button::R1)).await;
    h.engine
        .process(&Input::Disconnected, &mut h.sink)
        .await
        .unwrap();
    assert_eq!(
        h.sink.take(),
        vec![
            OutputEvent::Key {
                key: Key::Enter,
                value: 0
            },
            OutputEvent::Button {
                button: PadButton::A,
                value: 0
            },
            OutputEvent::Sync
        ]
    );
}

#[tokio::test]
async fn test_disconnect_after_calibration_keeps_sticks_centered() {
    let mut h = Harness::new();
    let resting = Pad::new().byte(offset::LEFT_STICK_X, 191);
    let chord = resting
        .clone()
        .press(Button::Ps)
        .press(Button::Start)
        .press(Button::Select);
    h.send(&chord).await;
    h.send(&resting).await;
    assert_eq!(h.engine.output().axes.emitted(PadAxis::X), Some(0.0));

    h.engine
        .process(&Input::Disconnected, &mut h.sink)
        .await
        .unwrap();
    assert_eq!(h.sink.take(), vec![OutputEvent::Sync]);
}
