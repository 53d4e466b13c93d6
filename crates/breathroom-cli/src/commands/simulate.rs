use clap::Args;
use breathroom_core::{Config, Event, MessageScheduler, Simulation};

use super::{print_event, print_notice, SessionArgs};

/// Simulation step; targets are checked between steps.
const STEP_MS: u64 = 100;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub session: SessionArgs,
    /// Virtual seconds to run
    #[arg(long, default_value_t = 30.0)]
    pub seconds: f64,
    /// Include progress snapshots in JSON output
    #[arg(long)]
    pub progress: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.seconds.is_finite() || args.seconds < 0.0 {
        return Err(format!("--seconds must be non-negative, got {}", args.seconds).into());
    }
    let config = Config::load()?;
    let plan = args.session.plan(&config)?;
    let json = args.session.json;
    let mut messages = plan
        .technique
        .as_ref()
        .map(|t| MessageScheduler::for_technique(t, config.session.notice_timeout_ms));

    if let Some(scheduler) = &messages {
        for notice in scheduler.pre_session() {
            print_notice(&notice, json)?;
        }
    }

    let mut sim = Simulation::new(plan.pattern, config.timing.clone());
    let total_ms = (args.seconds * 1000.0).round() as u64;
    let mut events = sim.start();
    loop {
        for event in &events {
            // Progress stays hidden from JSON output unless asked for, but
            // time triggers still need to see it.
            let hidden = json && !args.progress && matches!(event, Event::Progress(_));
            if !hidden {
                print_event(event, json)?;
            }
            if let Some(scheduler) = messages.as_mut() {
                for notice in scheduler.observe(event) {
                    print_notice(&notice, json)?;
                }
            }
        }
        let reached_target = plan
            .target_cycles
            .is_some_and(|target| sim.snapshot().cycle_count >= u64::from(target));
        if reached_target || sim.now_ms() >= total_ms {
            break;
        }
        events = sim.advance(STEP_MS.min(total_ms - sim.now_ms()));
    }

    let summary = sim.snapshot();
    if let Some(scheduler) = &messages {
        for notice in scheduler.finish() {
            print_notice(&notice, json)?;
        }
    }
    if !json {
        println!(
            "{} cycles in {:.1}s, ended in {} ({:.0}%)",
            summary.cycle_count,
            summary.active_secs,
            summary.phase,
            summary.progress * 100.0
        );
    }
    Ok(())
}
