use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use breathroom_core::{Config, Event, FrameDriver, MessageScheduler, Session, SessionHandle};

use super::{print_event, print_notice, SessionArgs};

#[derive(Args, Debug)]
pub struct BreatheArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

enum Control {
    Pause,
    Resume,
    Reset,
    Quit,
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim() {
        "p" | "pause" => Some(Control::Pause),
        "s" | "start" | "resume" => Some(Control::Resume),
        "r" | "reset" => Some(Control::Reset),
        "q" | "quit" => Some(Control::Quit),
        _ => None,
    }
}

pub fn run(args: BreatheArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let plan = args.session.plan(&config)?;
    let json = args.session.json;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut messages = plan
            .technique
            .as_ref()
            .map(|t| MessageScheduler::for_technique(t, config.session.notice_timeout_ms));
        if let Some(scheduler) = &messages {
            for notice in scheduler.pre_session() {
                print_notice(&notice, json)?;
            }
        }
        if !json {
            println!(
                "pattern {}-{}-{}-{}  (p pause, s resume, r reset, q quit)",
                plan.pattern.inhale, plan.pattern.hold_in, plan.pattern.exhale, plan.pattern.hold_out
            );
        }

        let driver = FrameDriver::new(plan.pattern, config.timing.clone());
        let (handle, task) = Session::spawn(driver);
        let mut events = handle.subscribe();
        handle.start().await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        loop {
            tokio::select! {
                line = lines.next_line(), if stdin_open => {
                    match line {
                        Ok(Some(line)) => match parse_control(&line) {
                            Some(Control::Quit) => break,
                            Some(control) => apply(&handle, control).await?,
                            None => eprintln!("unknown command: {}", line.trim()),
                        },
                        // Keep breathing without input.
                        Ok(None) | Err(_) => stdin_open = false,
                    }
                }
                event = events.recv() => {
                    let event = match event {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event consumer fell behind");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    print_event(&event, json)?;
                    if let Some(scheduler) = messages.as_mut() {
                        for notice in scheduler.observe(&event) {
                            print_notice(&notice, json)?;
                        }
                    }
                    if let (Event::CycleCompleted { count, .. }, Some(target)) = (&event, plan.target_cycles) {
                        if *count >= u64::from(target) {
                            break;
                        }
                    }
                }
            }
        }

        handle.shutdown().await?;
        task.await?;
        if let Some(scheduler) = &messages {
            for notice in scheduler.finish() {
                print_notice(&notice, json)?;
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

async fn apply(handle: &SessionHandle, control: Control) -> Result<(), Box<dyn std::error::Error>> {
    match control {
        Control::Pause => {
            handle.pause().await?;
        }
        Control::Resume => {
            handle.start().await?;
        }
        Control::Reset => {
            handle.reset().await?;
        }
        Control::Quit => {}
    }
    Ok(())
}
