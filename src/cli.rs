use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "clip-sync")]
#[command(about = "Keeps a local copy of course documents in sync", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Root directory for downloaded documents
    #[arg(short, long, global = true)]
    pub path: Option<PathBuf>,

    /// Path or URL of the course manifest
    #[arg(short, long, global = true)]
    pub manifest: Option<String>,

    /// Verbose logging, also written to a log file
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file to read instead of Config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sync every course of an academic year (default)
    Batch(BatchArgs),
    /// Sync a single course
    Single(SingleArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args, Default)]
pub struct BatchArgs {
    /// Academic year, defaults to the latest one available
    #[arg(short, long)]
    pub year: Option<i32>,
}

#[derive(Debug, Args)]
pub struct SingleArgs {
    /// Course id
    pub id: u32,
    pub year: i32,
    pub semester: u8,
    /// The course runs in trimesters
    #[arg(short, long)]
    pub trimester: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_single_course() {
        let cli = Cli::parse_from(["clip-sync", "--debug", "single", "12", "2023", "2", "-t"]);
        assert!(cli.debug);
        match cli.command {
            Some(Commands::Single(args)) => {
                assert_eq!((args.id, args.year, args.semester), (12, 2023, 2));
                assert!(args.trimester);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn no_subcommand_means_batch() {
        let cli = Cli::parse_from(["clip-sync", "--path", "/tmp/clip"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.path, Some(PathBuf::from("/tmp/clip")));
    }
}
