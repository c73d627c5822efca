// vizrl command-line driver
// Curriculum runs over the level table and DQN training on the driving sim

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "vizrl")]
#[command(about = "Curriculum and driving experiments", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the level table
    Levels {
        /// TOML level table; the built-in table when absent
        #[arg(long)]
        levels: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a random agent through the level curriculum on the scripted engine
    Curriculum {
        /// Number of episodes
        #[arg(short, long, default_value = "20")]
        episodes: usize,

        /// Step cap per episode
        #[arg(long, default_value = "200")]
        max_steps: usize,

        /// Ticks per scripted episode
        #[arg(long, default_value = "30")]
        episode_length: u64,

        /// Seed for the engine and the agent
        #[arg(long)]
        seed: Option<u64>,

        /// TOML level table; the built-in table when absent
        #[arg(long)]
        levels: Option<PathBuf>,
    },

    /// Train the DQN on the driving simulation
    Drive {
        /// Number of simulation steps
        #[arg(short, long, default_value = "5000")]
        steps: usize,

        /// Checkpoint file (overrides the config)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Load the checkpoint before training
        #[arg(long)]
        load: bool,

        /// Save the checkpoint after training
        #[arg(long)]
        save: bool,

        /// JSON agent configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for the agent
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Levels { levels, json } => commands::show_levels(levels.as_deref(), json)?,
        Commands::Curriculum {
            episodes,
            max_steps,
            episode_length,
            seed,
            levels,
        } => {
            let options = commands::CurriculumOptions {
                episodes,
                max_steps,
                episode_length,
                seed,
                levels,
            };
            commands::run_curriculum(&options).await?;
        }
        Commands::Drive {
            steps,
            checkpoint,
            load,
            save,
            config,
            seed,
        } => {
            let options = commands::DriveOptions {
                steps,
                checkpoint,
                load,
                save,
                config,
                seed,
            };
            commands::run_drive(&options).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_curriculum_defaults() {
        let cli = Cli::try_parse_from(["vizrl", "curriculum", "--seed", "4"]).unwrap();
        match cli.command {
            Commands::Curriculum {
                episodes, seed, levels, ..
            } => {
                assert_eq!(episodes, 20);
                assert_eq!(seed, Some(4));
                assert!(levels.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_drive_flags() {
        let args = ["vizrl", "drive", "-s", "10", "--save", "--checkpoint", "brain.json"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Drive {
                steps,
                save,
                load,
                checkpoint,
                ..
            } => {
                assert_eq!(steps, 10);
                assert!(save);
                assert!(!load);
                assert_eq!(checkpoint, Some(PathBuf::from("brain.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["vizrl", "fly"]).is_err());
    }
}
