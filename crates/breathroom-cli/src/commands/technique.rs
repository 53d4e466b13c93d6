use std::path::PathBuf;

use clap::Subcommand;
use breathroom_core::{Config, Technique};

#[derive(Subcommand)]
pub enum TechniqueAction {
    /// List available techniques
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a technique as JSON
    Show {
        /// Technique id (e.g. "box", "4-7-8")
        id: String,
    },
    /// Check a technique file
    Validate {
        /// Path to a technique JSON file
        file: PathBuf,
    },
}

pub fn run(action: TechniqueAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TechniqueAction::List { json } => {
            let library = Config::load()?.technique_library()?;
            let metas = library.list_meta();
            if json {
                println!("{}", serde_json::to_string_pretty(&metas)?);
            } else {
                for meta in metas {
                    let minutes = meta
                        .estimated_duration_minutes
                        .map(|m| format!("{m:.1} min"))
                        .unwrap_or_default();
                    println!("{:<12} {:<24} {:<13} {minutes}", meta.id, meta.name, meta.difficulty);
                }
            }
        }
        TechniqueAction::Show { id } => {
            let library = Config::load()?.technique_library()?;
            let technique = library.require(&id)?;
            println!("{}", serde_json::to_string_pretty(technique)?);
        }
        TechniqueAction::Validate { file } => {
            let technique = Technique::from_file(&file)?;
            let pattern = technique.first_round_pattern();
            println!(
                "ok: {} ({} rounds, {:.1} breaths/min)",
                technique.id,
                technique.rounds.len(),
                pattern.breaths_per_minute()
            );
        }
    }
    Ok(())
}
