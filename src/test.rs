#[cfg(test)]
pub mod utils {
    use crate::{
        cache::{CacheEntry, CacheStorage, InMemoryStorage},
        config::ConfigProperties,
        time::Seconds,
    };
    use lazy_static::lazy_static;
    use log::{Level, LevelFilter, Metadata, Record};
    use std::{
        fmt::Write,
        sync::{
            atomic::{AtomicBool, AtomicU32, Ordering},
            Mutex,
        },
    };

    /// Storage double wrapping an in-memory backend. Counts calls and can be
    /// switched into failing writes.
    #[derive(Default)]
    pub struct MockStorage {
        inner: InMemoryStorage,
        pub fail_writes: AtomicBool,
        pub fetches: AtomicU32,
        pub saves: AtomicU32,
        pub deletes: AtomicU32,
    }

    impl MockStorage {
        pub fn failing() -> Self {
            let storage = MockStorage::default();
            storage.fail_writes.store(true, Ordering::SeqCst);
            storage
        }

        pub fn saves(&self) -> u32 {
            self.saves.load(Ordering::SeqCst)
        }

        pub fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl CacheStorage for MockStorage {
        fn fetch(&self, key: &str) -> Option<CacheEntry> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(key)
        }

        fn save(&self, key: &str, entry: &CacheEntry) -> bool {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return false;
            }
            self.inner.save(key, entry)
        }

        fn delete(&self, key: &str) -> bool {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return false;
            }
            self.inner.delete(key)
        }
    }

    pub struct ConfigMock {
        pub cache_location: Option<String>,
    }

    impl Default for ConfigMock {
        fn default() -> Self {
            ConfigMock {
                cache_location: Some("/home/user/.cache/hpc".to_string()),
            }
        }
    }

    impl ConfigProperties for ConfigMock {
        fn cache_location(&self) -> Option<&str> {
            self.cache_location.as_deref()
        }

        fn request_timeout(&self) -> Seconds {
            Seconds::new(5)
        }
    }

    struct TestLogger;

    lazy_static! {
        pub static ref LOG_BUFFER: Mutex<String> = Mutex::new(String::new());
    }

    impl log::Log for TestLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Trace
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                let mut buffer = LOG_BUFFER.lock().unwrap();
                writeln!(buffer, "{} - {}", record.level(), record.args())
                    .expect("Failed to write to log buffer");
            }
        }

        fn flush(&self) {}
    }

    pub fn init_test_logger() {
        let logger = TestLogger;
        log::set_boxed_logger(Box::new(logger)).unwrap_or(());
        log::set_max_level(LevelFilter::Trace);
    }
}
