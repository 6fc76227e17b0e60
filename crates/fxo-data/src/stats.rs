//! Process-wide request counters.

use std::sync::atomic::{AtomicU64, Ordering};

static PAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Number of API pages received since the process began.
pub fn page_counter() -> u64 {
    PAGE_COUNTER.load(Ordering::Relaxed)
}

pub(crate) fn add_page() {
    PAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
}

/// Number of files downloaded since the process began.
pub fn download_item_counter() -> u64 {
    fxo_download::stats::item_count()
}

/// Number of bytes downloaded since the process began.
pub fn download_byte_counter() -> u64 {
    fxo_download::stats::byte_count()
}
