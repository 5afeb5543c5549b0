// tests/routine_synthesis.rs
use glam::Vec2;
use reef_auto::{
    AlternateDestination, AutoRoutineMaker, DiagnosticsSink, InMemoryPaths, Level,
    PathDescriptor, PathDirectory, PathError, PathLibrary, PathStepResolver, Pole, ReefSide,
    RoutineStep, ScoringGroupSelection, SelectionSnapshot, StartingPosition, SynthesisConfig,
    TimedFollower,
};
use std::backtrace::Backtrace;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every name it is asked for, then defers to an in-memory store.
#[derive(Default)]
struct RecordingLibrary {
    paths: InMemoryPaths,
    requests: Mutex<Vec<String>>,
}

impl RecordingLibrary {
    fn with_paths(names: &[&str]) -> Self {
        let mut paths = InMemoryPaths::new();
        for name in names {
            paths.insert(straight_path(name));
        }
        Self {
            paths,
            requests: Mutex::default(),
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl PathLibrary for RecordingLibrary {
    fn load(&self, name: &str) -> Result<PathDescriptor, PathError> {
        self.requests.lock().unwrap().push(name.to_string());
        self.paths.load(name)
    }
}

#[derive(Default)]
struct RecordingDiagnostics {
    reports: Mutex<Vec<String>>,
}

impl RecordingDiagnostics {
    fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl DiagnosticsSink for RecordingDiagnostics {
    fn report_error(&self, message: &str, _backtrace: &Backtrace) {
        self.reports.lock().unwrap().push(message.to_string());
    }
}

fn straight_path(name: &str) -> PathDescriptor {
    PathDescriptor::new(name, vec![Vec2::ZERO, Vec2::new(2.0, 0.0)], 2.0, 4.0).unwrap()
}

fn setup(
    names: &[&str],
    config: SynthesisConfig,
) -> (AutoRoutineMaker, Arc<RecordingLibrary>, Arc<RecordingDiagnostics>) {
    let library = Arc::new(RecordingLibrary::with_paths(names));
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let resolver = PathStepResolver::new(library.clone(), Arc::new(TimedFollower::new()))
        .with_diagnostics(diagnostics.clone());
    (AutoRoutineMaker::new(resolver, config), library, diagnostics)
}

fn group(reef_side: ReefSide, alternate_destination: AlternateDestination) -> ScoringGroupSelection {
    ScoringGroupSelection {
        reef_side,
        alternate_destination,
        ..Default::default()
    }
}

/// Three-cycle selection used by several tests.
fn three_cycle() -> SelectionSnapshot {
    SelectionSnapshot {
        starting_position: StartingPosition::Middle,
        groups: vec![
            group(ReefSide::ReefR1, AlternateDestination::UpCoral),
            group(ReefSide::ReefL2, AlternateDestination::DownCoral),
            group(ReefSide::ReefR3, AlternateDestination::LeftCoral1),
        ],
    }
}

#[test]
fn test_default_selection_degrades_to_noops() {
    let (maker, library, diagnostics) = setup(&[], SynthesisConfig::default());

    let routine = maker.build_auto();

    assert_eq!(routine.unit_count(), 22, "2 + 4 * (6 - 1) units");
    assert!(routine.path_names().is_empty());

    // Every path unit is a no-op, every other unit is the settle delay.
    for (i, unit) in routine.units().iter().enumerate() {
        if i % 2 == 0 {
            assert!(unit.is_noop(), "unit {i} should be a no-op");
        } else {
            assert!(matches!(unit, RoutineStep::Wait(d) if *d == Duration::from_millis(2500)));
        }
    }

    let requests = library.requests();
    assert_eq!(requests.len(), 11);
    assert_eq!(requests[0], "Starting 1 to Brake");
    assert!(requests[1..].iter().all(|r| r == "Brake to Brake"));

    let reports = diagnostics.reports();
    assert_eq!(reports.len(), 11);
    assert!(reports.iter().all(|r| r.starts_with("Big oops: ")));
    assert!(reports[0].contains("Starting 1 to Brake"));
}

#[test]
fn test_unit_count_for_every_group_count() {
    for group_count in 1..=6 {
        let config = SynthesisConfig {
            group_count,
            ..Default::default()
        };
        let (maker, _, _) = setup(&[], config);
        let routine = maker.build_auto();
        assert_eq!(
            routine.unit_count(),
            2 + 4 * (group_count - 1),
            "group_count = {group_count}"
        );
    }
}

#[test]
fn test_single_group_emits_only_initial_leg() {
    let config = SynthesisConfig {
        group_count: 1,
        ..Default::default()
    };
    let (maker, library, _) = setup(&["Starting 3 to ReefL1"], config);
    let selection = SelectionSnapshot {
        starting_position: StartingPosition::Bottom,
        groups: vec![group(ReefSide::ReefL1, AlternateDestination::UpCoral)],
    };

    let routine = maker.build_routine(&selection);

    assert_eq!(routine.unit_count(), 2);
    assert_eq!(routine.path_names(), vec!["Starting 3 to ReefL1"]);
    // The last group's alternate destination is never visited.
    assert_eq!(library.requests(), vec!["Starting 3 to ReefL1"]);
}

#[test]
fn test_lookup_keys_follow_selection_order() {
    let config = SynthesisConfig {
        group_count: 3,
        ..Default::default()
    };
    let (maker, library, _) = setup(&[], config);

    maker.build_routine(&three_cycle());

    assert_eq!(
        library.requests(),
        vec![
            "Starting 2 to ReefR1",
            "ReefR1 to UpCoral",
            "UpCoral to ReefL2",
            "ReefL2 to DownCoral",
            "DownCoral to ReefR3",
        ]
    );
}

#[test]
fn test_build_is_idempotent() {
    let names = [
        "Starting 2 to ReefR1",
        "ReefR1 to UpCoral",
        "UpCoral to ReefL2",
    ];
    let config = SynthesisConfig {
        group_count: 3,
        ..Default::default()
    };
    let (mut maker, library, _) = setup(&names, config);
    maker.apply(&three_cycle());

    let first = maker.build_auto();
    let first_requests = library.requests();
    let second = maker.build_auto();
    let all_requests = library.requests();

    assert_eq!(first.path_names(), second.path_names());
    assert_eq!(first.unit_count(), second.unit_count());
    assert_eq!(&all_requests[..first_requests.len()], &first_requests[..]);
    assert_eq!(&all_requests[first_requests.len()..], &first_requests[..]);
}

#[test]
fn test_missing_leg_does_not_abort_routine() {
    // The middle leg is missing; legs around it still resolve.
    let names = [
        "Starting 2 to ReefR1",
        "ReefR1 to UpCoral",
        "ReefL2 to DownCoral",
        "DownCoral to ReefR3",
    ];
    let config = SynthesisConfig {
        group_count: 3,
        ..Default::default()
    };
    let (maker, _, diagnostics) = setup(&names, config);

    let routine = maker.build_routine(&three_cycle());

    assert_eq!(routine.unit_count(), 10);
    assert_eq!(routine.path_names(), names.to_vec());
    assert!(routine.units()[4].is_noop());
    assert_eq!(diagnostics.reports().len(), 1);
    assert!(diagnostics.reports()[0].contains("UpCoral to ReefL2"));
}

#[test]
fn test_build_auto_reads_operator_choosers() {
    let (mut maker, library, _) = setup(&[], SynthesisConfig::default());
    assert!(maker.starting_position_mut().select("Bottom"));
    let first = maker.scoring_group_mut(0).unwrap();
    assert!(first.reef_side.select("ReefL3"));
    assert!(first.alternate_destination.select("Left Coral 2"));
    assert!(first.level.select("L4"));
    assert!(maker.scoring_group_mut(6).is_none());

    let snapshot = maker.snapshot();
    assert_eq!(snapshot.groups.len(), 6);
    assert_eq!(snapshot.groups[0].level, Level::L4);
    assert_eq!(snapshot.groups[0].pole, Pole::Right);

    maker.build_auto();
    let requests = library.requests();
    assert_eq!(requests[0], "Starting 3 to ReefL3");
    assert_eq!(requests[1], "ReefL3 to LeftCoral2");
    assert_eq!(requests[2], "LeftCoral2 to Brake");
}

#[test]
fn test_empty_and_oversized_selections_still_build() {
    let config = SynthesisConfig {
        group_count: 2,
        ..Default::default()
    };
    let (maker, _, _) = setup(&[], config);

    let empty = SelectionSnapshot {
        starting_position: StartingPosition::Top,
        groups: Vec::new(),
    };
    assert_eq!(maker.build_routine(&empty).unit_count(), 2);

    // Extra groups beyond the configured count are dropped.
    assert_eq!(maker.build_routine(&three_cycle()).unit_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_failed_resolution_completes_immediately() {
    let library = Arc::new(RecordingLibrary::default());
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let follower = Arc::new(TimedFollower::new());
    let resolver =
        PathStepResolver::new(library, follower.clone()).with_diagnostics(diagnostics.clone());

    let step = resolver.resolve("ReefR2", "Nowhere");
    assert!(step.is_noop());

    let start = tokio::time::Instant::now();
    step.run().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert!(!follower.is_moving());

    let reports = diagnostics.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0], "Big oops: path 'ReefR2 to Nowhere' not found");
}

#[test]
fn test_strict_resolution_surfaces_error() {
    let resolver = PathStepResolver::new(
        Arc::new(InMemoryPaths::new()),
        Arc::new(TimedFollower::new()),
    );
    assert!(matches!(
        resolver.try_resolve("Starting 1", "Brake"),
        Err(PathError::NotFound { name }) if name == "Starting 1 to Brake"
    ));
}

#[test]
fn test_routes_from_path_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Starting 1 to ReefR1.path"),
        r#"{
            "waypoints": [
                {"anchor": {"x": 7.5, "y": 6.0}},
                {"anchor": {"x": 5.0, "y": 5.5}}
            ],
            "globalConstraints": {"maxVelocity": 3.0, "maxAcceleration": 3.0}
        }"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("ReefR1 to UpCoral.path"), "{ truncated").unwrap();

    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let resolver = PathStepResolver::new(
        Arc::new(PathDirectory::new(dir.path())),
        Arc::new(TimedFollower::new()),
    )
    .with_diagnostics(diagnostics.clone());
    let config = SynthesisConfig {
        group_count: 2,
        ..Default::default()
    };
    let maker = AutoRoutineMaker::new(resolver, config);
    let selection = SelectionSnapshot {
        starting_position: StartingPosition::Top,
        groups: vec![
            group(ReefSide::ReefR1, AlternateDestination::UpCoral),
            group(ReefSide::ReefR1, AlternateDestination::NoChoice),
        ],
    };

    let routine = maker.build_routine(&selection);

    assert_eq!(routine.path_names(), vec!["Starting 1 to ReefR1"]);
    let reports = diagnostics.reports();
    assert_eq!(reports.len(), 2);
    assert!(reports[0].contains("malformed"));
    assert!(reports[1].contains("not found"));
}

#[tokio::test(start_paused = true)]
async fn test_routine_runs_legs_and_waits_in_order() {
    let config = SynthesisConfig {
        group_count: 2,
        settle_delay_secs: 0.5,
    };
    // Each straight path: 2 m at 2 m/s, 4 m/s² = 1.5 s.
    let (maker, _, _) = setup(
        &["Starting 1 to ReefR1", "ReefR1 to UpCoral", "UpCoral to ReefR2"],
        config,
    );
    let selection = SelectionSnapshot {
        starting_position: StartingPosition::Top,
        groups: vec![
            group(ReefSide::ReefR1, AlternateDestination::UpCoral),
            group(ReefSide::ReefR2, AlternateDestination::NoChoice),
        ],
    };
    let routine = maker.build_routine(&selection);
    assert_eq!(routine.total_wait(), Duration::from_millis(1500));

    let start = tokio::time::Instant::now();
    routine.run().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(6000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(6050), "{elapsed:?}");
}

#[test]
fn test_unusable_settle_delay_still_builds() {
    for settle_delay_secs in [1e20, -1.0, f64::NAN] {
        let config = SynthesisConfig {
            settle_delay_secs,
            group_count: 2,
        };
        let (maker, _, _) = setup(&[], config);

        let routine = maker.build_auto();

        assert_eq!(routine.unit_count(), 6);
        assert_eq!(routine.total_wait(), Duration::from_millis(7500), "{settle_delay_secs}");
    }
}
