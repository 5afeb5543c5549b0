//! Routine steps and their execution.
//!
//! A [`RoutineStep`] is a value describing work: follow a path, wait, run a
//! sequence, or race a path against a subsystem action. Building steps has no
//! side effects; [`RoutineStep::run`] executes them on tokio.
//!
//! # Cancellation
//!
//! Dropping the future returned by [`RoutineStep::run`] cancels the step. Path
//! followers and subsystem actions are told to `stop()` when their part of the
//! step is dropped, so nothing keeps moving after the parent is cancelled.

use crate::path::PathDescriptor;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives the robot along a path. Implemented by the drivetrain.
#[async_trait]
pub trait PathFollower: Send + Sync {
    /// Follows `path` to completion.
    async fn follow(&self, path: &PathDescriptor);

    /// Halts motion. Called when a follow is cancelled part way.
    fn stop(&self);
}

/// A concurrent subsystem action, e.g. "run the intake".
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    /// Runs the action. Most actions never finish on their own and are ended
    /// by whatever they are composed with.
    async fn run(&self);

    /// Releases the mechanism. Called whenever the action is ended or cancelled.
    fn stop(&self) {}
}

/// A named, polled predicate.
#[derive(Clone)]
pub struct Condition {
    name: String,
    check: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Condition {
    pub fn new(name: impl Into<String>, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_met(&self) -> bool {
        (self.check)()
    }

    /// Resolves once the predicate holds, checking every `period`.
    pub async fn wait(&self, period: Duration) {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if self.is_met() {
                return;
            }
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.name).finish()
    }
}

/// Follow one resolved path.
#[derive(Clone)]
pub struct PathStep {
    pub path: Arc<PathDescriptor>,
    follower: Arc<dyn PathFollower>,
}

impl PathStep {
    pub fn new(path: PathDescriptor, follower: Arc<dyn PathFollower>) -> Self {
        Self {
            path: Arc::new(path),
            follower,
        }
    }

    async fn run(&self) {
        let mut guard = StopOnDrop::new(|| self.follower.stop());
        debug!(path = %self.path.name, "Following path");
        self.follower.follow(&self.path).await;
        guard.disarm();
    }
}

impl fmt::Debug for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathStep")
            .field("path", &self.path.name)
            .finish()
    }
}

/// A base step raced against a concurrent action's exit condition.
///
/// Ends as soon as the base step finishes or `until` holds, whichever is first.
/// The action runs alongside and is stopped when the decorated step ends.
#[derive(Clone)]
pub struct DecoratedStep {
    pub base: RoutineStep,
    pub action: Arc<dyn Action>,
    pub until: Condition,
    pub poll_period: Duration,
}

/// How a decorated step ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceWinner {
    Base,
    Condition,
}

impl DecoratedStep {
    pub async fn run(&self) -> RaceWinner {
        let _release = StopOnDrop::new(|| self.action.stop());
        let action = async {
            self.action.run().await;
            // Finishing early does not end the race.
            std::future::pending::<RaceWinner>().await
        };

        let winner = tokio::select! {
            () = self.base.run() => RaceWinner::Base,
            () = self.until.wait(self.poll_period) => RaceWinner::Condition,
            winner = action => winner,
        };
        debug!(
            action = self.action.name(),
            condition = self.until.name(),
            ?winner,
            "Decorated step finished"
        );
        winner
    }
}

impl fmt::Debug for DecoratedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratedStep")
            .field("base", &self.base)
            .field("action", &self.action.name())
            .field("until", &self.until)
            .finish()
    }
}

/// One executable unit of an autonomous routine.
#[derive(Clone, Debug, Default)]
pub enum RoutineStep {
    /// Finishes immediately and does nothing.
    #[default]
    None,
    Wait(Duration),
    FollowPath(PathStep),
    /// Children run strictly one after another.
    Sequence(Vec<RoutineStep>),
    Decorated(Box<DecoratedStep>),
}

impl RoutineStep {
    /// An empty sequence, the starting point for appending with [`then`](Self::then).
    pub fn empty() -> Self {
        Self::Sequence(Vec::new())
    }

    pub fn wait(duration: Duration) -> Self {
        Self::Wait(duration)
    }

    /// Appends `next` after this step.
    ///
    /// Sequences are flattened so the result is always a single, linear
    /// sequence of units. A no-op is still a unit.
    pub fn then(self, next: RoutineStep) -> Self {
        let mut steps = match self {
            Self::Sequence(steps) => steps,
            other => vec![other],
        };
        match next {
            Self::Sequence(more) => steps.extend(more),
            other => steps.push(other),
        }
        Self::Sequence(steps)
    }

    /// Number of logical units: children of a sequence, otherwise one.
    pub fn unit_count(&self) -> usize {
        match self {
            Self::Sequence(steps) => steps.len(),
            _ => 1,
        }
    }

    /// The units of this step, in execution order.
    pub fn units(&self) -> &[RoutineStep] {
        match self {
            Self::Sequence(steps) => steps,
            other => std::slice::from_ref(other),
        }
    }

    /// Names of every path this step will follow, in order.
    pub fn path_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_path_names(&mut names);
        names
    }

    fn collect_path_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::None | Self::Wait(_) => {}
            Self::FollowPath(step) => out.push(&step.path.name),
            Self::Sequence(steps) => steps.iter().for_each(|s| s.collect_path_names(out)),
            Self::Decorated(d) => d.base.collect_path_names(out),
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Sum of the fixed waits in this step.
    pub fn total_wait(&self) -> Duration {
        match self {
            Self::Wait(d) => *d,
            Self::Sequence(steps) => steps.iter().map(Self::total_wait).sum(),
            Self::Decorated(d) => d.base.total_wait(),
            Self::None | Self::FollowPath(_) => Duration::ZERO,
        }
    }

    /// Executes the step to completion.
    pub fn run(&self) -> BoxFuture<'_, ()> {
        async move {
            match self {
                Self::None => {}
                Self::Wait(duration) => tokio::time::sleep(*duration).await,
                Self::FollowPath(step) => step.run().await,
                Self::Sequence(steps) => {
                    for step in steps {
                        step.run().await;
                    }
                }
                Self::Decorated(decorated) => {
                    decorated.run().await;
                }
            }
        }
        .boxed()
    }

    fn fmt_outline(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Self::None => writeln!(f, "{indent}(none)"),
            Self::Wait(d) => writeln!(f, "{indent}wait {:.2}s", d.as_secs_f64()),
            Self::FollowPath(step) => writeln!(
                f,
                "{indent}follow \"{}\" ({:.2} m, ~{:.2}s)",
                step.path.name,
                step.path.length(),
                step.path.estimated_duration().as_secs_f64()
            ),
            Self::Sequence(steps) => {
                writeln!(f, "{indent}sequence ({} steps)", steps.len())?;
                steps.iter().try_for_each(|s| s.fmt_outline(f, depth + 1))
            }
            Self::Decorated(d) => {
                writeln!(
                    f,
                    "{indent}with {} until {}",
                    d.action.name(),
                    d.until.name()
                )?;
                d.base.fmt_outline(f, depth + 1)
            }
        }
    }
}

impl fmt::Display for RoutineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_outline(f, 0)
    }
}

/// Runs `on_drop` unless disarmed first.
struct StopOnDrop<F: FnMut()> {
    on_drop: Option<F>,
}

impl<F: FnMut()> StopOnDrop<F> {
    fn new(on_drop: F) -> Self {
        Self {
            on_drop: Some(on_drop),
        }
    }

    fn disarm(&mut self) {
        self.on_drop = None;
    }
}

impl<F: FnMut()> Drop for StopOnDrop<F> {
    fn drop(&mut self) {
        if let Some(mut f) = self.on_drop.take() {
            f();
        }
    }
}

/// Simulated drivetrain: takes the path's estimated duration to "drive" it.
#[derive(Debug)]
pub struct TimedFollower {
    moving: AtomicBool,
    /// Multiplies every travel time. `1.0` is real time.
    time_scale: f32,
}

impl TimedFollower {
    pub fn new() -> Self {
        Self::with_time_scale(1.0)
    }

    /// A follower whose travel times are multiplied by `time_scale`.
    ///
    /// Negative or non-finite scales fall back to real time.
    pub fn with_time_scale(time_scale: f32) -> Self {
        let time_scale = if time_scale.is_finite() && time_scale >= 0.0 {
            time_scale
        } else {
            warn!(time_scale, "Unusable time scale, driving in real time");
            1.0
        };
        Self {
            moving: AtomicBool::new(false),
            time_scale,
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Scaled travel time for `path`. Falls back to the unscaled estimate when
    /// the scaled time does not fit a `Duration`.
    pub fn travel_time(&self, path: &PathDescriptor) -> Duration {
        let estimate = path.estimated_duration();
        Duration::try_from_secs_f32(estimate.as_secs_f32() * self.time_scale).unwrap_or_else(|err| {
            warn!(path = %path.name, time_scale = self.time_scale, %err, "Scaled travel time out of range");
            estimate
        })
    }

    pub fn is_moving(&self) -> bool {
        self.moving.load(Ordering::SeqCst)
    }
}

impl Default for TimedFollower {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PathFollower for TimedFollower {
    async fn follow(&self, path: &PathDescriptor) {
        let travel = self.travel_time(path);
        info!(path = %path.name, seconds = travel.as_secs_f32(), "Driving");
        self.moving.store(true, Ordering::SeqCst);
        tokio::time::sleep(travel).await;
        self.moving.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        if self.moving.swap(false, Ordering::SeqCst) {
            info!("Drivetrain stopped");
        }
    }
}
