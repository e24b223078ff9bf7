//! Implementations for the BoundedInput state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{BoundedInputError, Params};
use crate::loc::Pose;
use util::{
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Bounded input control module state
#[derive(Default)]
pub struct BoundedInput {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,
}

/// Input data to Bounded input control.
pub struct InputData {
    /// The raw movement intent, each axis in [-1, +1].
    pub intent: Vector2<f64>,

    /// The current pose of the controlled robot.
    pub pose: Pose,

    /// The operator's speed profile scale.
    pub speed_scale: f64,

    /// Half the side length of the arena.
    ///
    /// Units: meters
    pub half_span_m: f64,
}

/// Output from BoundedInput.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct OutputData {
    /// The possibly-shrunk movement intent, same axes as the input.
    pub bounded: Vector2<f64>,
}

impl Default for OutputData {
    fn default() -> Self {
        OutputData {
            bounded: Vector2::new(0.0, 0.0),
        }
    }
}

/// Status report for BoundedInput processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True if the intent had to be shrunk to respect the boundary.
    pub intent_limited: bool,

    /// The scale that was applied to the intent, in [0, 1].
    pub applied_scale: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for BoundedInput {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = BoundedInputError;

    /// Initialise the BoundedInput module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        Ok(())
    }

    /// Perform cyclic processing of Bounded input control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport {
            intent_limited: false,
            applied_scale: 1.0,
        };

        let intent = input_data.intent;

        if !intent.x.is_finite() || !intent.y.is_finite() {
            return Err(BoundedInputError::NonFiniteIntent(intent.x, intent.y));
        }
        if !input_data.pose.position_m.x.is_finite()
            || !input_data.pose.position_m.y.is_finite()
            || !input_data.pose.heading_rad.is_finite()
        {
            return Err(BoundedInputError::NonFinitePose);
        }

        // Convert the body-frame intent into a world-frame velocity using the
        // current heading
        let speed = self.params.max_speed_ms * input_data.speed_scale;
        let vel_body = intent * speed;
        let vel_world = input_data.pose.body_to_world(vel_body);

        // For each world axis take the most restrictive scale
        let scale = f64::min(
            self.axis_scale(
                input_data.pose.position_m.x,
                vel_world.x,
                input_data.half_span_m,
            ),
            self.axis_scale(
                input_data.pose.position_m.y,
                vel_world.y,
                input_data.half_span_m,
            ),
        );

        // Applying the minimum scale uniformly preserves the intent direction
        let output = OutputData {
            bounded: intent * scale,
        };

        if scale < 1.0 {
            self.report.intent_limited = true;
        }
        self.report.applied_scale = scale;

        trace!(
            "BoundedInput scale {:.3}, intent ({:.2}, {:.2}) -> ({:.2}, {:.2})",
            scale,
            intent.x,
            intent.y,
            output.bounded.x,
            output.bounded.y
        );

        Ok((output, self.report))
    }
}

impl BoundedInput {

    /// Get the scale in [0, 1] required so that one lookahead interval of
    /// travel along a single world axis stays inside the boundary.
    fn axis_scale(&self, position_m: f64, velocity_ms: f64, half_span_m: f64) -> f64 {

        // A (near) stationary axis imposes no constraint
        if velocity_ms.abs() < self.params.min_constraint_speed_ms {
            return 1.0;
        }

        // Distance remaining to the boundary in the direction of travel
        let boundary_m = half_span_m * velocity_ms.signum();
        let remaining_m = (boundary_m - position_m) * velocity_ms.signum();

        // At or past the boundary while still moving outwards
        if remaining_m <= 0.0 {
            return 0.0;
        }

        let travel_m = velocity_ms.abs() * self.params.lookahead_dt_s;

        (remaining_m / travel_m).min(1.0)
    }
}
