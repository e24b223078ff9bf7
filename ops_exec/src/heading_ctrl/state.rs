//! Implementations for the HeadingCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;
use std::f64::consts::PI;

// Internal
use super::{HeadingCtrlError, Params};
use util::{
    maths::wrap_to_pi,
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Heading control module state
#[derive(Default)]
pub struct HeadingCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    /// The heading currently being driven towards. Retained across ticks
    /// until arrival, release, or a mode change clears it.
    pub(crate) target_heading_rad: Option<f64>,
}

/// Input data to Heading control.
pub struct InputData {
    /// A new rotation gesture, or `None` if the operator produced none this
    /// cycle.
    pub gesture: Option<Vector2<f64>>,

    /// The current heading of the controlled robot.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Output from HeadingCtrl.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct OutputData {
    /// The normalised turn-rate command, in [-1, +1].
    pub rotation: f64,
}

/// Status report for HeadingCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True while a target heading is being driven towards.
    pub target_set: bool,

    /// The signed angular error to the target, zero when no target is set.
    ///
    /// Units: radians
    pub error_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for HeadingCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = HeadingCtrlError;

    /// Initialise the HeadingCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        Ok(())
    }

    /// Perform cyclic processing of Heading control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.report = StatusReport::default();

        if !input_data.heading_rad.is_finite() {
            return Err(HeadingCtrlError::NonFiniteHeading);
        }

        // A new gesture either sets or clears the target
        if let Some(gesture) = input_data.gesture {
            if gesture.norm() < self.params.gesture_deadband {
                self.target_heading_rad = None;
            }
            else {
                // Screen-to-world: the gesture's vertical axis grows
                // downwards on screen
                let target = (-gesture.y).atan2(gesture.x);
                self.target_heading_rad = Some(target);

                trace!("HeadingCtrl target set to {:.3} rad", target);
            }
        }

        let target = match self.target_heading_rad {
            Some(t) => t,
            None => return Ok((OutputData::default(), self.report)),
        };

        let error_rad = wrap_to_pi(target - input_data.heading_rad);

        // Inside the arrival tolerance the target is considered reached
        if error_rad.abs() < self.params.arrival_tol_rad {
            self.target_heading_rad = None;

            trace!("HeadingCtrl arrived at target");

            return Ok((OutputData::default(), self.report));
        }

        self.report.target_set = true;
        self.report.error_rad = error_rad;

        let rotation = (error_rad / PI).clamp(-1.0, 1.0);

        Ok((OutputData { rotation }, self.report))
    }
}

impl HeadingCtrl {

    /// Clear any target heading, for example on a mode change.
    pub fn clear_target(&mut self) {
        self.target_heading_rad = None;
    }

    /// True while a target heading is set.
    pub fn target_set(&self) -> bool {
        self.target_heading_rad.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn module() -> HeadingCtrl {
        let mut hc = HeadingCtrl::default();
        hc.params = Params::default();
        hc
    }

    fn proc(hc: &mut HeadingCtrl, gesture: Option<(f64, f64)>, heading: f64) -> f64 {
        let (out, _) = hc
            .proc(&InputData {
                gesture: gesture.map(|(x, y)| Vector2::new(x, y)),
                heading_rad: heading,
            })
            .unwrap();
        out.rotation
    }

    #[test]
    fn test_deadband_clears_target() {
        let mut hc = module();

        proc(&mut hc, Some((1.0, 0.0)), 1.0);
        assert!(hc.target_set());

        let rotation = proc(&mut hc, Some((0.05, 0.05)), 1.0);
        assert_eq!(rotation, 0.0);
        assert!(!hc.target_set());
    }

    #[test]
    fn test_gesture_sets_world_target() {
        let mut hc = module();

        // Gesture pointing screen-up maps onto world heading +pi/2
        proc(&mut hc, Some((0.0, -1.0)), 0.0);
        assert!((hc.target_heading_rad.unwrap() - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_command_magnitude_shrinks_with_error() {
        let mut hc = module();

        proc(&mut hc, Some((1.0, 0.0)), 0.0);
        let target = 0.0;

        let mut prev_mag = f64::INFINITY;
        for &heading in &[-2.0, -1.0, -0.5, -0.1, -0.05] {
            hc.target_heading_rad = Some(target);
            let mag = proc(&mut hc, None, heading).abs();
            assert!(mag <= prev_mag, "magnitude grew as error shrank");
            assert!(mag > 0.0);
            prev_mag = mag;
        }
    }

    #[test]
    fn test_arrival_zeroes_and_clears() {
        let mut hc = module();

        hc.target_heading_rad = Some(0.5);
        let rotation = proc(&mut hc, None, 0.49);

        assert_eq!(rotation, 0.0);
        assert!(!hc.target_set());
    }

    #[test]
    fn test_shortest_path_across_wrap() {
        let mut hc = module();

        // Heading just below +pi, target just above -pi: the short way round
        // is anticlockwise (positive command)
        hc.target_heading_rad = Some(-PI + 0.1);
        let rotation = proc(&mut hc, None, PI - 0.1);

        assert!(rotation > 0.0);
        assert!(rotation < 0.5);
    }

    #[test]
    fn test_controller_runs_without_fresh_gesture() {
        let mut hc = module();

        proc(&mut hc, Some((0.0, -1.0)), 0.0);

        // No new gesture, the controller keeps driving towards the target
        let rotation = proc(&mut hc, None, 0.0);
        assert!(rotation > 0.0);
        assert!(hc.target_set());
    }
}
