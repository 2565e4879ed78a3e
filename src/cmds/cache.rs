use crate::cache::{CacheEntry, CacheStrategy};
use crate::cli::cache::{CacheOptions, EntryOptions, FormatCli};
use crate::config::Config;
use crate::http::Request;
use crate::time::format_http_date;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

pub fn execute<W: Write>(options: CacheOptions, config: Arc<Config>, mut writer: W) -> Result<()> {
    let storage = super::file_storage(&config)?;
    match options {
        CacheOptions::Info => {
            let size = storage.size()?;
            writeln!(writer, "Location: {}", storage.location().display())?;
            writeln!(writer, "Size: {}", BytesToHumanReadable::from(size))?;
        }
        CacheOptions::Inspect(options) => {
            let strategy = CacheStrategy::new(storage);
            let request = Request::new(&options.url, options.method);
            let key = strategy.key(&request);
            match strategy.fetch(&request) {
                Some(entry) => {
                    let summary = EntrySummary::new(key.as_str(), &entry, &strategy.now());
                    write_summary(&summary, &options, &mut writer)?;
                }
                None => writeln!(writer, "Not cached: {} {}", options.method, options.url)?,
            }
        }
        CacheOptions::Delete(options) => {
            let strategy = CacheStrategy::new(storage);
            let request = Request::new(&options.url, options.method);
            if !strategy.delete(&request) {
                return Err(crate::error::gen(format!(
                    "Could not delete cached entry for {} {}",
                    options.method, options.url
                )));
            }
            writeln!(writer, "Deleted: {} {}", options.method, options.url)?;
        }
        CacheOptions::Clear => {
            let removed = storage.clear()?;
            writeln!(writer, "Removed {removed} cached entries")?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct EntrySummary {
    key: String,
    status: u16,
    expires: String,
    fresh: bool,
    ttl: u64,
    etag: Option<String>,
    last_modified: Option<String>,
    body_size: usize,
}

impl EntrySummary {
    fn new(key: &str, entry: &CacheEntry, now: &DateTime<Utc>) -> Self {
        EntrySummary {
            key: key.to_string(),
            status: entry.status(),
            expires: format_http_date(&entry.expires_at()),
            fresh: entry.is_fresh(now),
            ttl: *entry.ttl(now),
            etag: entry.etag().map(str::to_string),
            last_modified: entry.last_modified().map(str::to_string),
            body_size: entry.body().len(),
        }
    }
}

fn write_summary<W: Write>(
    summary: &EntrySummary,
    options: &EntryOptions,
    writer: &mut W,
) -> Result<()> {
    match options.format {
        FormatCli::Json => {
            serde_json::to_writer_pretty(&mut *writer, summary)?;
            writeln!(writer)?;
        }
        FormatCli::Text => {
            writeln!(writer, "Request: {} {}", options.method, options.url)?;
            writeln!(writer, "Key: {}", summary.key)?;
            writeln!(writer, "Status: {}", summary.status)?;
            writeln!(writer, "Expires: {}", summary.expires)?;
            let freshness = if summary.fresh {
                format!("fresh ({}s left)", summary.ttl)
            } else {
                "stale".to_string()
            };
            writeln!(writer, "Freshness: {freshness}")?;
            if let Some(etag) = &summary.etag {
                writeln!(writer, "ETag: {etag}")?;
            }
            if let Some(last_modified) = &summary.last_modified {
                writeln!(writer, "Last-Modified: {last_modified}")?;
            }
            writeln!(writer, "Body: {}", BytesToHumanReadable::from(summary.body_size as u64))?;
        }
    }
    Ok(())
}

struct BytesToHumanReadable(u64);

impl From<u64> for BytesToHumanReadable {
    fn from(size: u64) -> Self {
        BytesToHumanReadable(size)
    }
}

impl fmt::Display for BytesToHumanReadable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let suffixes = ["B", "KB", "MB", "GB"];
        let mut size = self.0 as f64;
        let mut i = 0;
        while size >= 1024.0 && i < suffixes.len() - 1 {
            size /= 1024.0;
            i += 1;
        }
        write!(f, "{:.2} {}", size, suffixes[i])
    }
}
