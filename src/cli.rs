//! CLI definitions for stepcheck.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// stepcheck CLI.
#[derive(Parser)]
#[command(name = "stepcheck")]
#[command(about = "Evaluate and repair interactive lesson components")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/stepcheck.toml", global = true)]
    pub config: PathBuf,

    /// Working directory
    #[arg(short, long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Evaluate every component of a module, fixing failures
    Evaluate {
        /// Module identifier (directory name under the modules dir)
        module_id: String,

        /// Launch Chrome headless
        #[arg(long)]
        headless: bool,

        /// Evaluation attempts per component
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Evaluate only, never request fixes
        #[arg(long)]
        no_fix: bool,
    },

    /// Print the summary of the last run
    Report {
        /// Module identifier
        module_id: String,
    },

    /// Forget persisted results so every component is tested again
    Reset {
        /// Module identifier
        module_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_flags() {
        let cli = Cli::parse_from([
            "stepcheck",
            "evaluate",
            "fractions",
            "--headless",
            "--max-attempts",
            "5",
            "--no-fix",
        ]);
        assert_eq!(cli.config, PathBuf::from("config/stepcheck.toml"));
        match cli.command {
            Commands::Evaluate {
                module_id,
                headless,
                max_attempts,
                no_fix,
            } => {
                assert_eq!(module_id, "fractions");
                assert!(headless);
                assert_eq!(max_attempts, Some(5));
                assert!(no_fix);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["stepcheck", "report", "fractions", "--config", "other.toml"]);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(matches!(cli.command, Commands::Report { module_id } if module_id == "fractions"));
    }

    #[test]
    fn test_module_id_required() {
        assert!(Cli::try_parse_from(["stepcheck", "reset"]).is_err());
    }
}
