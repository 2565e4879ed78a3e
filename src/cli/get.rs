use clap::Parser;

#[derive(Parser)]
pub struct GetCommand {
    /// URL to fetch
    #[clap()]
    pub url: String,
    /// Refresh the cache. Skip the stored entry and go to the network
    #[clap(long, short)]
    pub refresh: bool,
    /// Print the status line and response headers before the body
    #[clap(long, short)]
    pub include: bool,
}

pub struct GetOptions {
    pub url: String,
    pub refresh: bool,
    pub include: bool,
}

impl From<GetCommand> for GetOptions {
    fn from(options: GetCommand) -> Self {
        GetOptions {
            url: options.url,
            refresh: options.refresh,
            include: options.include,
        }
    }
}
