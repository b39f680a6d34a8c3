use load_client::errors::SwarmError;
use load_client::shape::{FixedLoad, LoadShape, ResolvedShape, Schedule, Stage, Tick};

fn users(shape: &dyn LoadShape, elapsed: f64) -> Option<u32> {
    match shape.tick(elapsed) {
        Tick::Target { users, .. } => Some(users),
        Tick::Stop => None,
    }
}

#[test]
fn stress_schedule_walks_every_stage() {
    let schedule = Schedule::stress();
    let expected = [
        (0.0, 10, 2.0),
        (59.0, 10, 2.0),
        (60.0, 35, 5.0),
        (119.9, 35, 5.0),
        (300.0, 135, 15.0),
        (599.0, 235, 25.0),
    ];
    for (elapsed, want_users, want_rate) in expected {
        assert_eq!(
            schedule.tick(elapsed),
            Tick::Target {
                users: want_users,
                spawn_rate: want_rate
            },
            "elapsed={}",
            elapsed
        );
    }
    assert_eq!(schedule.tick(600.0), Tick::Stop);
    assert_eq!(schedule.tick(601.0), Tick::Stop);
}

#[test]
fn degenerate_inputs_stop() {
    let empty = Schedule::empty();
    assert_eq!(empty.tick(0.0), Tick::Stop);

    let schedule = Schedule::stress();
    assert_eq!(schedule.tick(-1.0), Tick::Stop);
    assert_eq!(schedule.tick(f64::NAN), Tick::Stop);
    assert_eq!(schedule.tick(f64::INFINITY), Tick::Stop);
}

#[test]
fn down_ramp_is_allowed() {
    let schedule = Schedule::new(vec![
        Stage::new(10.0, 20, 5.0),
        Stage::new(20.0, 5, 5.0),
        Stage::new(30.0, 0, 5.0),
    ])
    .unwrap();
    assert_eq!(users(&schedule, 5.0), Some(20));
    assert_eq!(users(&schedule, 15.0), Some(5));
    assert_eq!(users(&schedule, 25.0), Some(0));
    assert_eq!(users(&schedule, 30.0), None);
}

#[test]
fn invalid_schedules_are_rejected() {
    let tie = Schedule::new(vec![Stage::new(60.0, 10, 1.0), Stage::new(60.0, 20, 1.0)]);
    assert!(matches!(tie, Err(SwarmError::InvalidStage { index: 1, .. })));

    let negative_rate = Schedule::new(vec![Stage::new(60.0, 10, -1.0)]);
    assert!(matches!(
        negative_rate,
        Err(SwarmError::InvalidStage { index: 0, .. })
    ));
}

#[test]
fn shapes_are_shareable_across_threads() {
    let shape = std::sync::Arc::new(ResolvedShape::Staged(Schedule::stress()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shape = shape.clone();
            std::thread::spawn(move || users(shape.as_ref(), 60.0 * i as f64 + 1.0))
        })
        .collect();
    let got: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(got, [Some(10), Some(35), Some(60), Some(85)]);
}

#[test]
fn fixed_load_runs_until_time_limit() {
    let fixed = FixedLoad::new(50, 5.0, Some(120.0)).unwrap();
    assert_eq!(users(&fixed, 0.0), Some(50));
    assert_eq!(users(&fixed, 119.99), Some(50));
    assert_eq!(users(&fixed, 120.0), None);

    let open_ended = FixedLoad::new(50, 5.0, None).unwrap();
    assert_eq!(users(&open_ended, 1.0e6), Some(50));
}
