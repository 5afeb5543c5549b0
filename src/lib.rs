//! # reef-auto
//!
//! Autonomous routine synthesis for a reef-scoring mobile robot.
//!
//! Before the match the operator picks a starting position and, for each scoring
//! group, a reef side, a level, a pole and an alternate destination. At the start
//! of autonomous, [`AutoRoutineMaker::build_auto`] turns those choices into a
//! single [`RoutineStep`]: a linear sequence of path follows, each followed by a
//! fixed settle delay, optionally decorated with intake/scoring actions.
//!
//! Path following, mechanisms and the path asset store are collaborators behind
//! traits ([`PathFollower`], [`EndEffector`], [`ScoringMechanism`], [`PathLibrary`]).

pub mod config;
pub mod decorator;
pub mod path;
pub mod resolver;
pub mod selection;
pub mod step;
pub mod synthesizer;

pub use config::*;
pub use decorator::*;
pub use path::*;
pub use resolver::*;
pub use selection::*;
pub use step::*;
pub use synthesizer::*;
