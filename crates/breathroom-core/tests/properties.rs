use proptest::prelude::*;

use breathroom_core::{DriveMode, Event, Pattern, Phase, Simulation, TimingConfig};

/// 0 or 0.1 ..= 4.0 seconds.
fn duration() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(0.0),
        3 => (1u32..=40).prop_map(|tenths| f64::from(tenths) / 10.0),
    ]
}

fn pattern() -> impl Strategy<Value = Pattern> {
    (duration(), duration(), duration(), duration())
        .prop_filter("at least one timed phase", |(i, h, e, o)| i + h + e + o > 0.0)
        .prop_map(|(i, h, e, o)| Pattern::new(i, h, e, o))
}

fn mode() -> impl Strategy<Value = DriveMode> {
    prop_oneof![Just(DriveMode::SleepRefine), Just(DriveMode::Continuous)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn phases_follow_cyclic_order_within_tolerance(pattern in pattern(), mode in mode()) {
        let timing = TimingConfig { mode, ..TimingConfig::default() };
        let frame = timing.frame_interval_ms;
        let mut sim = Simulation::new(pattern, timing);
        sim.start();
        let events = sim.advance(20_000);

        let mut previous = (Phase::Inhale, 0u64);
        let mut cycles = 0u64;
        for event in &events {
            match event {
                Event::PhaseChanged { phase, at_ms, cycle } => {
                    let (from, since) = previous;
                    prop_assert_eq!(*phase, from.next());

                    let nominal = pattern.duration_ms(from);
                    let took = at_ms - since;
                    prop_assert!(
                        took + 50 >= nominal && took <= nominal + frame,
                        "{} lasted {}ms, nominal {}ms", from, took, nominal
                    );

                    if from == Phase::HoldOut {
                        cycles += 1;
                    }
                    prop_assert_eq!(*cycle, cycles);
                    previous = (*phase, *at_ms);
                }
                Event::CycleCompleted { count, .. } => prop_assert_eq!(*count, cycles),
                _ => {}
            }
        }
        prop_assert_eq!(sim.snapshot().cycle_count, cycles);
    }

    #[test]
    fn pause_never_loses_or_gains_time(
        pattern in pattern(),
        run_ms in 1u64..5_000,
        paused_ms in 0u64..120_000,
    ) {
        let mut sim = Simulation::new(pattern, TimingConfig::default());
        sim.start();
        sim.advance(run_ms);
        sim.pause();
        let frozen = sim.snapshot();
        prop_assert!(frozen.is_paused);
        prop_assert!(frozen.phase_elapsed_secs <= frozen.phase_duration_secs);

        prop_assert!(sim.advance(paused_ms).is_empty());
        let still = sim.snapshot();
        prop_assert_eq!(still.phase, frozen.phase);
        prop_assert_eq!(still.phase_elapsed_secs, frozen.phase_elapsed_secs);
        prop_assert_eq!(still.active_secs, frozen.active_secs);
    }

    #[test]
    fn progress_stays_in_unit_range(pattern in pattern(), mode in mode()) {
        let timing = TimingConfig { mode, ..TimingConfig::default() };
        let mut sim = Simulation::new(pattern, timing);
        sim.start();
        for event in sim.advance(10_000) {
            if let Event::Progress(snap) = event {
                prop_assert!((0.0..=1.0).contains(&snap.progress));
            }
        }
    }
}
