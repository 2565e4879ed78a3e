use env_logger::Env;

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (
        {
            info!($($arg)*);
        }
    );
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => (
        {
            debug!($($arg)*);
        }
    );
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => (
        {
            warn!($($arg)*);
        }
    );
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (
        {
            error!($($arg)*);
        }
    );
}

/// Install the process wide logger. Only binaries call this; the library
/// just emits records through the `log` facade. `RUST_LOG` always wins over
/// the default filter.
pub fn init(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    let env = Env::default().default_filter_or(default_filter);
    // A logger may already be installed (tests, embedding applications).
    let _ = env_logger::Builder::from_env(env).try_init();
}
