//! Routine synthesis: operator selections in, one composed [`RoutineStep`] out.
//!
//! The entry point is [`AutoRoutineMaker`]. It owns the operator choosers (one
//! starting position and a fixed number of [`ScoringGroup`]s). Call
//! [`AutoRoutineMaker::build_auto`] once, right before the match, to snapshot the
//! choosers and build the routine.

use crate::config::SynthesisConfig;
use crate::decorator::{EndEffector, ScoringMechanism, with_intaking, with_scoring};
use crate::resolver::PathStepResolver;
use crate::selection::{
    AlternateDestination, Chooser, Level, ScoringGroup, ScoringGroupSelection,
    SelectionSnapshot, StartingPosition, select_or_warn,
};
use crate::step::RoutineStep;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Subsystems used to decorate legs. Without them legs are plain path follows.
#[derive(Clone)]
pub struct Mechanisms {
    pub end_effector: Arc<dyn EndEffector>,
    pub scorer: Arc<dyn ScoringMechanism>,
}

/// Where a leg ends, and what that implies for decoration.
#[derive(Clone, Copy, Debug)]
enum LegTarget {
    /// Approaching the reef to score for this group.
    Reef(ScoringGroupSelection),
    /// Heading to the alternate destination to pick up the next piece.
    Alternate(AlternateDestination),
}

impl LegTarget {
    fn location_id(self) -> &'static str {
        match self {
            Self::Reef(group) => group.reef_side.location_id(),
            Self::Alternate(dest) => dest.location_id(),
        }
    }
}

/// Builds autonomous routines from operator selections.
pub struct AutoRoutineMaker {
    starting_position: Chooser<StartingPosition>,
    scoring_groups: Vec<ScoringGroup>,
    resolver: PathStepResolver,
    config: SynthesisConfig,
    mechanisms: Option<Mechanisms>,
}

impl AutoRoutineMaker {
    /// Creates the maker and its `config.group_count` scoring groups.
    ///
    /// A `group_count` of zero is treated as one; synthesis always has a first leg.
    pub fn new(resolver: PathStepResolver, config: SynthesisConfig) -> Self {
        let group_count = config.group_count.max(1);
        Self {
            starting_position: Chooser::for_enum("Starting Position"),
            scoring_groups: (0..group_count).map(|_| ScoringGroup::new()).collect(),
            resolver,
            config,
            mechanisms: None,
        }
    }

    /// Attaches subsystems so legs get decorated with intaking/scoring (builder pattern).
    pub fn with_mechanisms(mut self, mechanisms: Mechanisms) -> Self {
        self.mechanisms = Some(mechanisms);
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn starting_position(&self) -> &Chooser<StartingPosition> {
        &self.starting_position
    }

    pub fn starting_position_mut(&mut self) -> &mut Chooser<StartingPosition> {
        &mut self.starting_position
    }

    pub fn scoring_groups(&self) -> &[ScoringGroup] {
        &self.scoring_groups
    }

    pub fn scoring_group_mut(&mut self, index: usize) -> Option<&mut ScoringGroup> {
        self.scoring_groups.get_mut(index)
    }

    /// Points the choosers at the values in `snapshot`.
    ///
    /// Groups beyond the configured count are ignored; groups missing from the
    /// snapshot keep their current selection.
    pub fn apply(&mut self, snapshot: &SelectionSnapshot) {
        select_or_warn(&mut self.starting_position, snapshot.starting_position);
        if snapshot.groups.len() > self.scoring_groups.len() {
            warn!(
                given = snapshot.groups.len(),
                configured = self.scoring_groups.len(),
                "Ignoring extra scoring groups"
            );
        }
        for (group, selection) in self.scoring_groups.iter_mut().zip(&snapshot.groups) {
            group.apply(selection);
        }
    }

    /// Reads every chooser once.
    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            starting_position: self.starting_position.selected(),
            groups: self.scoring_groups.iter().map(ScoringGroup::snapshot).collect(),
        }
    }

    /// Snapshots the current selections and builds the routine.
    pub fn build_auto(&self) -> RoutineStep {
        self.build_routine(&self.snapshot())
    }

    /// Builds the routine for `selection`.
    ///
    /// The sequence is: start → first reef side, then for every pair of
    /// consecutive groups: reef side → alternate destination → next reef side.
    /// Every leg is followed by the settle delay. The last group's alternate
    /// destination is never visited.
    ///
    /// Never fails: legs whose path cannot be resolved become no-op steps.
    pub fn build_routine(&self, selection: &SelectionSnapshot) -> RoutineStep {
        let groups = self.effective_groups(selection);
        let settle = RoutineStep::wait(self.config.settle_delay());

        let mut routine = RoutineStep::empty()
            .then(self.leg(
                selection.starting_position.location_id(),
                LegTarget::Reef(groups[0]),
            ))
            .then(settle.clone());

        for pair in groups.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            routine = routine
                .then(self.leg(
                    current.reef_side.location_id(),
                    LegTarget::Alternate(current.alternate_destination),
                ))
                .then(settle.clone())
                .then(self.leg(
                    current.alternate_destination.location_id(),
                    LegTarget::Reef(next),
                ))
                .then(settle.clone());
        }

        info!(
            start = ?selection.starting_position,
            groups = groups.len(),
            units = routine.unit_count(),
            paths = routine.path_names().len(),
            "Built autonomous routine"
        );
        routine
    }

    fn effective_groups(&self, selection: &SelectionSnapshot) -> Vec<ScoringGroupSelection> {
        if selection.groups.is_empty() {
            warn!("Selection has no scoring groups, using one default group");
            return vec![ScoringGroupSelection::default()];
        }
        let limit = self.config.group_count.max(1);
        if selection.groups.len() > limit {
            warn!(
                given = selection.groups.len(),
                limit, "Truncating scoring groups"
            );
        }
        selection.groups.iter().take(limit).copied().collect()
    }

    /// Resolves one leg and, with mechanisms attached, decorates it.
    ///
    /// A scoring decoration ends with the leg: once the path finishes, the
    /// setpoint action is stopped on arrival, before the settle delay. The
    /// mechanism is not held at the setpoint during that delay.
    fn leg(&self, from_id: &str, target: LegTarget) -> RoutineStep {
        let step = self.resolver.resolve(from_id, target.location_id());
        let Some(mechanisms) = &self.mechanisms else {
            return step;
        };
        if step.is_noop() {
            return step;
        }

        match target {
            LegTarget::Reef(group) if group.reef_side.is_chosen() && group.level != Level::NoChoice => {
                debug!(to = target.location_id(), level = ?group.level, pole = ?group.pole, "Scoring on arrival");
                with_scoring(step, &mechanisms.scorer, group.level, group.pole)
            }
            LegTarget::Alternate(dest) if dest.is_chosen() => {
                debug!(to = target.location_id(), "Intaking on the way");
                with_intaking(step, &mechanisms.end_effector)
            }
            _ => step,
        }
    }
}
