//! Live stick calibration
//!
//! Holding the calibration chord records every mapped stick's current
//! position as its new center and stretches the remaining travel back to a
//! full -1.0..1.0 range. A calibration is applied to all axes or to none.

use crate::action::PadAxis;
use crate::error::CalibrationFault;
use crate::profile::Profile;
use crate::snapshot::{Analog, Button, ControllerSnapshot};
use tracing::{debug, info, warn};

/// Center offset and scale for one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    pub center: f64,
    /// Scale applied after centering; negative values invert the axis
    pub factor: f64,
}

impl AxisCalibration {
    /// Uncalibrated axis with the given sign
    pub fn neutral(sign: f64) -> Self {
        Self {
            center: 0.0,
            factor: sign,
        }
    }

    /// Calibration centering on `raw`. May hold a non-finite factor when
    /// `raw` sits at an end stop; callers check with [`is_finite`].
    ///
    /// [`is_finite`]: AxisCalibration::is_finite
    pub fn centered_on(raw: f64, sign: f64) -> Self {
        Self {
            center: raw,
            factor: (1.0 / (1.0 - raw.abs())) * sign,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.center.is_finite() && self.factor.is_finite()
    }

    /// Center, scale, clamp and apply the squared response curve
    pub fn apply(&self, raw: f64) -> f64 {
        let clamped = ((raw - self.center) * self.factor).clamp(-1.0, 1.0);
        clamped * clamped.abs()
    }
}

#[derive(Debug, Clone)]
struct CalibratedAxis {
    output: PadAxis,
    input: Analog,
    sign: f64,
    cal: AxisCalibration,
}

/// Calibration for every axis a profile maps
#[derive(Debug, Clone)]
pub struct Calibration {
    axes: Vec<CalibratedAxis>,
}

impl Calibration {
    pub fn new(profile: &Profile) -> Self {
        let axes = profile
            .axes
            .iter()
            .map(|m| CalibratedAxis {
                output: m.output,
                input: m.input,
                sign: m.sign(),
                cal: AxisCalibration::neutral(m.sign()),
            })
            .collect();
        Self { axes }
    }

    /// Current calibration of an output axis
    pub fn get(&self, output: PadAxis) -> Option<AxisCalibration> {
        self.axes.iter().find(|a| a.output == output).map(|a| a.cal)
    }

    /// Re-center every axis on the snapshot's stick positions
    ///
    /// On a fault nothing changes.
    pub fn recalibrate(&mut self, snapshot: &ControllerSnapshot) -> Result<(), CalibrationFault> {
        let mut next = Vec::with_capacity(self.axes.len());
        for axis in &self.axes {
            let cal = AxisCalibration::centered_on(snapshot.analog(axis.input), axis.sign);
            if !cal.is_finite() {
                warn!(
                    "Calibration rejected: {} centered at {} gives factor {}",
                    axis.input, cal.center, cal.factor
                );
                return Err(CalibrationFault {
                    axis: axis.input.to_string(),
                    center: cal.center,
                    factor: cal.factor,
                });
            }
            next.push(cal);
        }

        for (axis, cal) in self.axes.iter_mut().zip(next) {
            debug!(
                "Calibrated {} -> {}: center {:.4}, factor {:.4}",
                axis.input, axis.output, cal.center, cal.factor
            );
            axis.cal = cal;
        }
        info!("Calibrated {} axes", self.axes.len());
        Ok(())
    }

    /// Idle controller with every mapped stick on its calibrated center
    pub fn rest(&self) -> ControllerSnapshot {
        self.axes
            .iter()
            .fold(ControllerSnapshot::default(), |snap, a| {
                snap.with_analog(a.input, a.cal.center)
            })
    }

    /// Calibrated, shaped value of every mapped axis, in profile order
    pub fn apply<'a>(
        &'a self,
        snapshot: &'a ControllerSnapshot,
    ) -> impl Iterator<Item = (PadAxis, f64)> + 'a {
        self.axes
            .iter()
            .map(move |a| (a.output, a.cal.apply(snapshot.analog(a.input))))
    }
}

/// Detects the rising edge of "all chord buttons held"
#[derive(Debug, Clone)]
pub struct Chord {
    buttons: Vec<Button>,
    was_held: bool,
}

impl Chord {
    pub fn new(buttons: Vec<Button>) -> Self {
        Self {
            buttons,
            was_held: false,
        }
    }

    pub fn is_held(&self, snapshot: &ControllerSnapshot) -> bool {
        !self.buttons.is_empty() && self.buttons.iter().all(|b| snapshot.button(*b))
    }

    /// True only on the cycle the chord becomes fully held
    pub fn update(&mut self, snapshot: &ControllerSnapshot) -> bool {
        let held = self.is_held(snapshot);
        let fired = held && !self.was_held;
        self.was_held = held;
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sticks(lx: f64, ly: f64, rx: f64, ry: f64) -> ControllerSnapshot {
        ControllerSnapshot::default()
            .with_analog(Analog::LeftStickX, lx)
            .with_analog(Analog::LeftStickY, ly)
            .with_analog(Analog::RightStickX, rx)
            .with_analog(Analog::RightStickY, ry)
    }

    fn chord_snapshot() -> ControllerSnapshot {
        ControllerSnapshot::default()
            .with_button(Button::Ps, true)
            .with_button(Button::Start, true)
            .with_button(Button::Select, true)
    }

    #[test]
    fn test_neutral_passthrough() {
        let cal = AxisCalibration::neutral(1.0);
        assert!(approx(cal.apply(0.5), 0.25));
        assert!(approx(cal.apply(-0.5), -0.25));
        assert!(approx(cal.apply(2.0), 1.0));
        let inverted = AxisCalibration::neutral(-1.0);
        assert!(approx(inverted.apply(0.5), -0.25));
    }

    #[test]
    fn test_stick_140_shape() {
        let raw = 12.5 / 127.5;
        let shaped = AxisCalibration::neutral(1.0).apply(raw);
        assert!((shaped - 0.00961).abs() < 1e-5);
    }

    #[test]
    fn test_centered_on() {
        let cal = AxisCalibration::centered_on(0.2, 1.0);
        assert!(approx(cal.center, 0.2));
        assert!(approx(cal.factor, 1.25));
        assert!(approx(cal.apply(0.2), 0.0));
        assert!(approx(cal.apply(1.0), 1.0));

        let inverted = AxisCalibration::centered_on(-0.2, -1.0);
        assert!(approx(inverted.factor, -1.25));
    }

    #[test]
    fn test_recalibrate_all_axes() {
        let profile = Profile::default();
        let mut cal = Calibration::new(&profile);
        assert_eq!(cal.get(PadAxis::Y), Some(AxisCalibration::neutral(-1.0)));

        cal.recalibrate(&sticks(0.2, 0.1, -0.2, 0.0)).unwrap();
        let x = cal.get(PadAxis::X).unwrap();
        assert!(approx(x.center, 0.2) && approx(x.factor, 1.25));
        let y = cal.get(PadAxis::Y).unwrap();
        assert!(approx(y.factor, -1.0 / 0.9));
        let rx = cal.get(PadAxis::Rx).unwrap();
        assert!(approx(rx.center, 0.0) && approx(rx.factor, -1.0));
    }

    #[test]
    fn test_fault_keeps_previous() {
        let profile = Profile::default();
        let mut cal = Calibration::new(&profile);
        cal.recalibrate(&sticks(0.2, 0.0, 0.0, 0.0)).unwrap();
        let before: Vec<_> = PadAxis::ALL.iter().map(|a| cal.get(*a)).collect();

        // Right stick X pinned at an end stop
        let err = cal.recalibrate(&sticks(0.1, 0.1, 1.0, 0.1)).unwrap_err();
        assert_eq!(err.axis, "rightStickX");
        assert!(!err.factor.is_finite());

        let after: Vec<_> = PadAxis::ALL.iter().map(|a| cal.get(*a)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_apply_in_profile_order() {
        let profile = Profile::default();
        let cal = Calibration::new(&profile);
        let values: Vec<_> = cal.apply(&sticks(0.5, 0.5, 0.0, 0.0)).collect();
        let ids: Vec<_> = values.iter().map(|(a, _)| *a).collect();
        assert_eq!(ids, vec![PadAxis::X, PadAxis::Y, PadAxis::Z, PadAxis::Rx]);
        assert!(approx(values[0].1, 0.25));
        assert!(approx(values[1].1, -0.25));
    }

    #[test]
    fn test_rest_sits_on_centers() {
        let profile = Profile::default();
        let mut cal = Calibration::new(&profile);
        assert!(cal.apply(&cal.rest()).all(|(_, v)| v == 0.0));

        cal.recalibrate(&sticks(0.5, -0.3, 0.1, 0.0)).unwrap();
        let rest = cal.rest();
        assert!(approx(rest.analog(Analog::LeftStickX), 0.5));
        assert!(approx(rest.analog(Analog::LeftStickY), -0.3));
        assert!(!rest.button(Button::Ps));
        assert!(cal.apply(&rest).all(|(_, v)| approx(v, 0.0)));
    }

    #[test]
    fn test_chord_edge_only() {
        let mut chord = Chord::new(vec![Button::Ps, Button::Start, Button::Select]);
        let idle = ControllerSnapshot::default();
        let partial = ControllerSnapshot::default()
            .with_button(Button::Ps, true)
            .with_button(Button::Start, true);

        assert!(!chord.update(&idle));
        assert!(!chord.update(&partial));
        assert!(chord.update(&chord_snapshot()));
        assert!(!chord.update(&chord_snapshot()));
        assert!(!chord.update(&partial));
        assert!(chord.update(&chord_snapshot()));
    }

    #[test]
    fn test_empty_chord_never_fires() {
        let mut chord = Chord::new(Vec::new());
        assert!(!chord.update(&chord_snapshot()));
    }
}
