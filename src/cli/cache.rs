use clap::{Parser, ValueEnum};

use crate::http::Method;

#[derive(Parser)]
pub struct CacheCommand {
    #[clap(subcommand)]
    subcommand: CacheSubcommand,
}

#[derive(Parser)]
enum CacheSubcommand {
    #[clap(name = "info", about = "Get local cache size and location")]
    Info,
    #[clap(name = "inspect", about = "Show the cached entry of a request")]
    Inspect(EntryArgs),
    #[clap(name = "delete", about = "Delete the cached entry of a request")]
    Delete(EntryArgs),
    #[clap(name = "clear", about = "Delete all cached entries")]
    Clear,
}

#[derive(Parser)]
struct EntryArgs {
    /// URL of the cached request
    #[clap()]
    pub url: String,
    /// HTTP method of the cached request
    #[clap(long, short, value_enum, default_value_t = MethodCli::Get)]
    pub method: MethodCli,
    /// Output format
    #[clap(long, value_enum, default_value_t = FormatCli::Text)]
    pub format: FormatCli,
}

#[derive(ValueEnum, Clone, Copy)]
pub enum MethodCli {
    Get,
    Head,
}

impl From<MethodCli> for Method {
    fn from(method: MethodCli) -> Self {
        match method {
            MethodCli::Get => Method::GET,
            MethodCli::Head => Method::HEAD,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum FormatCli {
    Text,
    Json,
}

pub struct EntryOptions {
    pub url: String,
    pub method: Method,
    pub format: FormatCli,
}

impl From<EntryArgs> for EntryOptions {
    fn from(args: EntryArgs) -> Self {
        EntryOptions {
            url: args.url,
            method: args.method.into(),
            format: args.format,
        }
    }
}

pub enum CacheOptions {
    Info,
    Inspect(EntryOptions),
    Delete(EntryOptions),
    Clear,
}

impl From<CacheCommand> for CacheOptions {
    fn from(options: CacheCommand) -> Self {
        match options.subcommand {
            CacheSubcommand::Info => CacheOptions::Info,
            CacheSubcommand::Inspect(args) => CacheOptions::Inspect(args.into()),
            CacheSubcommand::Delete(args) => CacheOptions::Delete(args.into()),
            CacheSubcommand::Clear => CacheOptions::Clear,
        }
    }
}
