use std::sync::Arc;

use hpc::{
    cli::{parse_cli, CliOptions},
    cmds,
    config::Config,
    logging, Result,
};

fn main() -> Result<()> {
    let option_args = parse_cli();
    let cli_args = option_args.cli_args;
    logging::init(cli_args.verbose);
    let config = Arc::new(Config::load(cli_args.config.as_deref())?);
    let stdout = std::io::stdout();
    match option_args.cli_options {
        CliOptions::Get(options) => cmds::get::execute(options, config, stdout.lock()),
        CliOptions::Cache(options) => cmds::cache::execute(options, config, stdout.lock()),
    }
}
