//! Operator selections: the discrete choices that describe an autonomous routine.
//!
//! Every location-bearing enum maps each variant to a stable path-location
//! identifier via `location_id()`. Those identifiers are stitched together as
//! `"<from> to <to>"` to look up path assets (see [`crate::resolver`]).
//!
//! Choices are made through [`Chooser`]s before the match. Synthesis never reads
//! choosers directly; it works from a [`SelectionSnapshot`] taken once at build time.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Where the robot starts the match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartingPosition {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl StartingPosition {
    /// Every variant, in chooser order.
    pub const ALL: [Self; 3] = [Self::Top, Self::Middle, Self::Bottom];

    pub fn location_id(self) -> &'static str {
        match self {
            Self::Top => "Starting 1",
            Self::Middle => "Starting 2",
            Self::Bottom => "Starting 3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Middle => "Middle",
            Self::Bottom => "Bottom",
        }
    }
}

/// Reef face targeted by a scoring group.
///
/// [`ReefSide::NoChoice`] maps to `"Brake"`, which has no path asset; any leg
/// touching it degrades to a no-op step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReefSide {
    #[default]
    NoChoice,
    ReefR1,
    ReefR2,
    ReefR3,
    ReefL1,
    ReefL2,
    ReefL3,
}

impl ReefSide {
    pub const ALL: [Self; 7] = [
        Self::NoChoice,
        Self::ReefR1,
        Self::ReefR2,
        Self::ReefR3,
        Self::ReefL1,
        Self::ReefL2,
        Self::ReefL3,
    ];

    pub fn location_id(self) -> &'static str {
        match self {
            Self::NoChoice => "Brake",
            Self::ReefR1 => "ReefR1",
            Self::ReefR2 => "ReefR2",
            Self::ReefR3 => "ReefR3",
            Self::ReefL1 => "ReefL1",
            Self::ReefL2 => "ReefL2",
            Self::ReefL3 => "ReefL3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NoChoice => "No Choice",
            other => other.location_id(),
        }
    }

    pub fn is_chosen(self) -> bool {
        self != Self::NoChoice
    }
}

/// Where the robot goes between two reef visits (a coral station, usually).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlternateDestination {
    #[default]
    NoChoice,
    LeftCoral1,
    LeftCoral2,
    LeftCoral3,
    UpCoral,
    DownCoral,
}

impl AlternateDestination {
    pub const ALL: [Self; 6] = [
        Self::NoChoice,
        Self::LeftCoral1,
        Self::LeftCoral2,
        Self::LeftCoral3,
        Self::DownCoral,
        Self::UpCoral,
    ];

    pub fn location_id(self) -> &'static str {
        match self {
            Self::NoChoice => "Brake",
            Self::LeftCoral1 => "LeftCoral1",
            Self::LeftCoral2 => "LeftCoral2",
            Self::LeftCoral3 => "LeftCoral3",
            Self::UpCoral => "UpCoral",
            Self::DownCoral => "DownCoral",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NoChoice => "No Choice",
            Self::LeftCoral1 => "Left Coral 1",
            Self::LeftCoral2 => "Left Coral 2",
            Self::LeftCoral3 => "Left Coral 3",
            Self::UpCoral => "Up Coral",
            Self::DownCoral => "Down Coral",
        }
    }

    pub fn is_chosen(self) -> bool {
        self != Self::NoChoice
    }
}

/// Scoring depth on the reef.
///
/// Levels have no path location of their own; they only select the scoring
/// setpoint used when a leg is decorated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[default]
    NoChoice,
    L1,
    L2,
    L3,
    L4,
}

impl Level {
    pub const ALL: [Self; 5] = [Self::NoChoice, Self::L1, Self::L2, Self::L3, Self::L4];

    /// Always empty: levels do not take part in path lookup.
    pub fn location_id(self) -> &'static str {
        ""
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NoChoice => "No Choice",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
        }
    }
}

/// Which pole of a reef face to score on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pole {
    NoChoice,
    Left,
    #[default]
    Right,
}

impl Pole {
    /// Chooser order. `NoChoice` is representable but never offered.
    pub const ALL: [Self; 2] = [Self::Right, Self::Left];

    /// Always empty: poles do not take part in path lookup.
    pub fn location_id(self) -> &'static str {
        ""
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NoChoice => "No Choice",
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

/// An operator-facing selector: a titled list of labelled options with a default.
///
/// `selected()` never fails; with no explicit selection it returns the default.
#[derive(Clone, Debug)]
pub struct Chooser<T> {
    title: String,
    options: Vec<(String, T)>,
    default: usize,
    selected: Option<usize>,
}

impl<T: Copy + PartialEq> Chooser<T> {
    /// Creates a chooser whose only option is its default.
    pub fn new(title: impl Into<String>, default_label: impl Into<String>, default: T) -> Self {
        Self {
            title: title.into(),
            options: vec![(default_label.into(), default)],
            default: 0,
            selected: None,
        }
    }

    /// Adds an option (builder pattern). A label that already exists is replaced.
    pub fn with_option(mut self, label: impl Into<String>, value: T) -> Self {
        self.add_option(label, value);
        self
    }

    pub fn add_option(&mut self, label: impl Into<String>, value: T) {
        let label = label.into();
        match self.options.iter_mut().find(|(l, _)| *l == label) {
            Some(slot) => slot.1 = value,
            None => self.options.push((label, value)),
        }
    }

    /// Selects the option with `label`. Returns `false` (and changes nothing)
    /// when no such option exists.
    pub fn select(&mut self, label: &str) -> bool {
        match self.options.iter().position(|(l, _)| l == label) {
            Some(idx) => {
                self.selected = Some(idx);
                true
            }
            None => false,
        }
    }

    /// Selects the first option carrying `value`.
    pub fn select_value(&mut self, value: T) -> bool {
        match self.options.iter().position(|(_, v)| *v == value) {
            Some(idx) => {
                self.selected = Some(idx);
                true
            }
            None => false,
        }
    }

    /// Reverts to the default option.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// The currently selected value, falling back to the default.
    pub fn selected(&self) -> T {
        self.options[self.selected.unwrap_or(self.default)].1
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, T)> {
        self.options.iter().map(|(l, v)| (l.as_str(), *v))
    }
}

/// An enum that can populate a [`Chooser`] on its own.
pub trait ChooserOption: Copy + PartialEq + Default + 'static {
    /// Every offered variant, in chooser order.
    const OPTIONS: &'static [Self];

    /// Operator-facing option label.
    fn option_label(self) -> &'static str;
}

impl ChooserOption for StartingPosition {
    const OPTIONS: &'static [Self] = &Self::ALL;

    fn option_label(self) -> &'static str {
        self.label()
    }
}

impl ChooserOption for ReefSide {
    const OPTIONS: &'static [Self] = &Self::ALL;

    fn option_label(self) -> &'static str {
        self.label()
    }
}

impl ChooserOption for AlternateDestination {
    const OPTIONS: &'static [Self] = &Self::ALL;

    fn option_label(self) -> &'static str {
        self.label()
    }
}

impl ChooserOption for Level {
    const OPTIONS: &'static [Self] = &Self::ALL;

    fn option_label(self) -> &'static str {
        self.label()
    }
}

impl ChooserOption for Pole {
    const OPTIONS: &'static [Self] = &Self::ALL;

    fn option_label(self) -> &'static str {
        self.label()
    }
}

impl<T: ChooserOption> Chooser<T> {
    /// Builds a chooser offering every option, defaulting to `T::default()`.
    pub fn for_enum(title: impl Into<String>) -> Self {
        let default = T::default();
        T::OPTIONS
            .iter()
            .copied()
            .filter(|v| *v != default)
            .fold(Self::new(title, default.option_label(), default), |c, v| {
                c.with_option(v.option_label(), v)
            })
    }
}

/// One operator-configurable scoring cycle.
#[derive(Clone, Debug)]
pub struct ScoringGroup {
    pub reef_side: Chooser<ReefSide>,
    pub level: Chooser<Level>,
    pub pole: Chooser<Pole>,
    pub alternate_destination: Chooser<AlternateDestination>,
}

impl Default for ScoringGroup {
    fn default() -> Self {
        Self {
            reef_side: Chooser::for_enum("What side are you scoring on"),
            level: Chooser::for_enum("What level are you scoring?"),
            pole: Chooser::for_enum("Are you scoring on the right pole or left pole?"),
            alternate_destination: Chooser::for_enum("Where are you going after scoring?"),
        }
    }
}

impl ScoringGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the current value of every chooser in this group.
    pub fn snapshot(&self) -> ScoringGroupSelection {
        ScoringGroupSelection {
            reef_side: self.reef_side.selected(),
            level: self.level.selected(),
            pole: self.pole.selected(),
            alternate_destination: self.alternate_destination.selected(),
        }
    }

    /// Points every chooser at the values in `selection`.
    ///
    /// A value the chooser does not offer is logged and leaves that chooser as it was.
    pub fn apply(&mut self, selection: &ScoringGroupSelection) {
        select_or_warn(&mut self.reef_side, selection.reef_side);
        select_or_warn(&mut self.level, selection.level);
        select_or_warn(&mut self.pole, selection.pole);
        select_or_warn(&mut self.alternate_destination, selection.alternate_destination);
    }
}

/// Selects `value` on `chooser`, warning when it is not one of the options.
pub(crate) fn select_or_warn<T>(chooser: &mut Chooser<T>, value: T) -> bool
where
    T: Copy + PartialEq + fmt::Debug,
{
    let offered = chooser.select_value(value);
    if !offered {
        warn!(
            chooser = chooser.title(),
            ?value,
            current = ?chooser.selected(),
            "Value is not offered, keeping current selection"
        );
    }
    offered
}

/// Plain-data view of one [`ScoringGroup`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringGroupSelection {
    pub reef_side: ReefSide,
    pub level: Level,
    pub pole: Pole,
    pub alternate_destination: AlternateDestination,
}

/// Everything synthesis needs, read once at build time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSnapshot {
    pub starting_position: StartingPosition,
    pub groups: Vec<ScoringGroupSelection>,
}

impl SelectionSnapshot {
    /// A snapshot where nothing was chosen: default start, `group_count` default groups.
    pub fn defaults(group_count: usize) -> Self {
        Self {
            starting_position: StartingPosition::default(),
            groups: vec![ScoringGroupSelection::default(); group_count],
        }
    }
}
