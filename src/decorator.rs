//! Decorating path-follow steps with concurrent subsystem work.
//!
//! A decorated step runs its base step alongside a subsystem [`Action`] and ends
//! as soon as either the base step finishes or the action's exit condition holds.

use crate::selection::{Level, Pole};
use crate::step::{Action, Condition, DecoratedStep, RoutineStep};
use std::sync::Arc;
use std::time::Duration;

/// Period at which exit conditions are polled (one robot loop).
pub const LOOP_PERIOD: Duration = Duration::from_millis(20);

/// The game-piece end effector.
pub trait EndEffector: Send + Sync {
    /// Runs the intake rollers for as long as the returned action runs.
    fn intake(&self) -> Arc<dyn Action>;

    /// True once the sensor confirms a piece is held.
    fn has_piece(&self) -> bool;
}

/// Whatever positions the end effector for scoring (elevator, arm, wrist).
pub trait ScoringMechanism: Send + Sync {
    /// Moves to and holds the setpoint for `level` on `pole`.
    fn go_to_setpoint(&self, level: Level, pole: Pole) -> Arc<dyn Action>;

    /// True once the sensor confirms the piece was released onto the reef.
    fn scored(&self) -> bool;
}

/// Runs `step` while intaking; ends early once the end effector holds a piece.
pub fn with_intaking(step: RoutineStep, end_effector: &Arc<dyn EndEffector>) -> RoutineStep {
    let sensor = Arc::clone(end_effector);
    decorate(
        step,
        end_effector.intake(),
        Condition::new("has piece", move || sensor.has_piece()),
    )
}

/// Runs `step` while moving to the scoring setpoint; ends early once scoring is confirmed.
pub fn with_scoring(
    step: RoutineStep,
    scorer: &Arc<dyn ScoringMechanism>,
    level: Level,
    pole: Pole,
) -> RoutineStep {
    let sensor = Arc::clone(scorer);
    decorate(
        step,
        scorer.go_to_setpoint(level, pole),
        Condition::new("scored", move || sensor.scored()),
    )
}

/// Races `step` against `until` while `action` runs alongside.
pub fn decorate(step: RoutineStep, action: Arc<dyn Action>, until: Condition) -> RoutineStep {
    RoutineStep::Decorated(Box::new(DecoratedStep {
        base: step,
        action,
        until,
        poll_period: LOOP_PERIOD,
    }))
}
