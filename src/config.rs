//! Config file parsing and validation.
//!
//! The config file is a list of `key=value` lines. Blank lines and lines
//! starting with `#` are ignored, as are unknown keys.
//!
//! ```text
//! cache_location=/home/user/.cache/hpc
//! request_timeout=30s
//! user_agent=my-tool/1.0
//! ```

use crate::error::{AddContext, HPCError};
use crate::time::Seconds;
use crate::{log_debug, log_warn, Result, USER_AGENT};
use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{collections::HashMap, io::Read};

pub const DEFAULT_REQUEST_TIMEOUT: Seconds = Seconds::new(30);
const DEFAULT_CACHE_DIR: &str = ".cache/hpc";
const DEFAULT_CONFIG_PATH: &str = ".config/hpc/config";

pub trait ConfigProperties {
    fn cache_location(&self) -> Option<&str>;
    fn request_timeout(&self) -> Seconds {
        DEFAULT_REQUEST_TIMEOUT
    }
    fn user_agent(&self) -> &str {
        USER_AGENT
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    cache_location: Option<String>,
    request_timeout: Seconds,
    user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        let cache_location = std::env::var("HOME")
            .ok()
            .map(|home| format!("{}/{}", home.trim_end_matches('/'), DEFAULT_CACHE_DIR));
        Config {
            cache_location,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl Config {
    pub fn new<T: Read>(reader: T) -> Result<Self> {
        let data = Config::parse(reader)?;
        let mut config = Config::default();
        if let Some(cache_location) = data.get("cache_location") {
            config.cache_location = Some(cache_location.to_string());
        }
        if let Some(timeout) = data.get("request_timeout") {
            config.request_timeout = Seconds::try_from(timeout.as_str()).map_err(|err| {
                HPCError::ConfigurationError(format!(
                    "Cannot parse request_timeout={timeout}: {err}. \
                     Use a time format such as 30s, 2m or 1h."
                ))
            })?;
        }
        if let Some(user_agent) = data.get("user_agent") {
            config.user_agent = user_agent.to_string();
        }
        Ok(config)
    }

    /// Load the config file at `path`, or at `$HOME/.config/hpc/config` when
    /// no path is given. Only an explicitly given file is required to exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (PathBuf::from(path), true),
            None => match std::env::var("HOME") {
                Ok(home) => (Path::new(&home).join(DEFAULT_CONFIG_PATH), false),
                Err(_) => return Ok(Config::default()),
            },
        };
        match File::open(&path) {
            Ok(f) => Config::new(f).err_context(format!("Reading config {}", path.display())),
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                log_debug!("No config file at {}, using defaults", path.display());
                Ok(Config::default())
            }
            Err(err) => Err(HPCError::ConfigurationError(format!(
                "Cannot open config file {}: {err}",
                path.display()
            ))
            .into()),
        }
    }

    fn parse<T: Read>(mut reader: T) -> Result<HashMap<String, String>> {
        lazy_static! {
            static ref RE_LINE: Regex =
                Regex::new(r"^(?P<key>\w+)\s*=\s*(?P<value>.*)$").unwrap();
        }
        let mut config_data = String::new();
        reader.read_to_string(&mut config_data)?;
        let mut config = HashMap::new();
        for line in config_data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match RE_LINE.captures(line) {
                Some(captured_names) => {
                    let key = &captured_names["key"];
                    let value = captured_names["value"].trim();
                    config.insert(key.to_string(), value.to_string());
                }
                None => {
                    log_warn!("Ignoring malformed config line: {}", line);
                }
            }
        }
        Ok(config)
    }
}

impl ConfigProperties for Config {
    fn cache_location(&self) -> Option<&str> {
        self.cache_location.as_deref()
    }

    fn request_timeout(&self) -> Seconds {
        self.request_timeout
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl ConfigProperties for Arc<Config> {
    fn cache_location(&self) -> Option<&str> {
        self.as_ref().cache_location()
    }

    fn request_timeout(&self) -> Seconds {
        self.as_ref().request_timeout()
    }

    fn user_agent(&self) -> &str {
        self.as_ref().user_agent()
    }
}
