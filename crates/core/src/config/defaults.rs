//! Default values and functions for configuration

pub(crate) const DEFAULT_DEBOUNCE_MS: u64 = 30;
pub(crate) const DEFAULT_MAX_QUEUE_SIZE: usize = 4096;
pub(crate) const DEFAULT_MAX_INIT_RETRIES: u32 = 3;
pub(crate) const DEFAULT_RETRY_DELAY_MS: u64 = 100;

pub(crate) fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

pub(crate) fn default_max_queue_size() -> usize {
    DEFAULT_MAX_QUEUE_SIZE
}

pub(crate) fn default_max_init_retries() -> u32 {
    DEFAULT_MAX_INIT_RETRIES
}

pub(crate) fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
