//! Process-wide download counters.

use std::sync::atomic::{AtomicU64, Ordering};

static ITEM_COUNTER: AtomicU64 = AtomicU64::new(0);
static BYTE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Number of download requests started since the process began.
pub fn item_count() -> u64 {
    ITEM_COUNTER.load(Ordering::Relaxed)
}

/// Number of bytes received since the process began.
pub fn byte_count() -> u64 {
    BYTE_COUNTER.load(Ordering::Relaxed)
}

pub(crate) fn add_item() {
    ITEM_COUNTER.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn add_bytes(n: usize) {
    BYTE_COUNTER.fetch_add(n as u64, Ordering::Relaxed);
}
