pub mod cache;
pub mod get;

use clap::Parser;

use crate::cli::cache::{CacheCommand, CacheOptions};
use crate::cli::get::{GetCommand, GetOptions};

#[derive(Parser)]
#[command(about = "A private HTTP response cache", version)]
struct Args {
    #[clap(subcommand)]
    pub command: Command,
    /// Verbose mode. Log cache hits, misses and decisions to stderr
    #[clap(long, short, global = true)]
    pub verbose: bool,
    /// Path to the config file. Defaults to $HOME/.config/hpc/config
    #[clap(long, global = true, value_name = "PATH")]
    pub config: Option<String>,
}

#[derive(Parser)]
enum Command {
    #[clap(name = "get", about = "GET a URL through the cache")]
    Get(GetCommand),
    #[clap(name = "cache", about = "Inspect and manage the local cache")]
    Cache(CacheCommand),
}

pub struct CliArgs {
    pub verbose: bool,
    pub config: Option<String>,
}

pub struct OptionArgs {
    pub cli_options: CliOptions,
    pub cli_args: CliArgs,
}

pub enum CliOptions {
    Get(GetOptions),
    Cache(CacheOptions),
}

pub fn parse_cli() -> OptionArgs {
    let args = Args::parse();
    let cli_args = CliArgs {
        verbose: args.verbose,
        config: args.config,
    };
    let cli_options = match args.command {
        Command::Get(sub_matches) => CliOptions::Get(sub_matches.into()),
        Command::Cache(sub_matches) => CliOptions::Cache(sub_matches.into()),
    };
    OptionArgs {
        cli_options,
        cli_args,
    }
}
