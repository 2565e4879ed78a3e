use std::io::Write;
use std::sync::Arc;

use crate::cache::{CacheStorage, NoCache};
use crate::cli::get::GetOptions;
use crate::config::Config;
use crate::http::{Client, Method, Request};
use crate::io::{HttpRunner, Response};
use crate::{log_warn, Result};

pub fn execute<W: Write>(options: GetOptions, config: Arc<Config>, mut writer: W) -> Result<()> {
    // A broken cache directory must not stop the request.
    let storage: Box<dyn CacheStorage> = match super::file_storage(&config) {
        Ok(storage) => Box::new(storage),
        Err(err) => {
            log_warn!("Cache disabled: {:#}", err);
            Box::new(NoCache)
        }
    };
    let client = Client::new(storage, &config, options.refresh);
    let mut request = Request::new(&options.url, Method::GET);
    let response = client.run(&mut request)?;
    print_response(&response, options.include, &mut writer)
}

fn print_response<W: Write>(response: &Response, include: bool, writer: &mut W) -> Result<()> {
    if include {
        writeln!(writer, "HTTP {}", response.status)?;
        for (name, value) in response.headers.iter() {
            writeln!(writer, "{name}: {value}")?;
        }
        writeln!(writer)?;
    }
    writer.write_all(&response.body)?;
    writer.flush()?;
    Ok(())
}
