//! Rotating ICMP identifier allocator.

use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide allocator for ICMP echo identifiers.
///
/// Every probe cycle draws its correlation identifier from one shared
/// allocator so that concurrently in-flight cycles across all targets are
/// unlikely to collide on the raw transport. The identifier space is the
/// 16-bit ICMP ID field; the counter advances monotonically and wraps.
///
/// Rotation reduces, but cannot eliminate, collisions within the correlation
/// window: more than 65536 cycles in flight at once would alias. That matches
/// the identifier space of the underlying protocol.
#[derive(Debug, Default)]
pub struct IcmpIdAllocator {
    counter: AtomicU32,
}

impl IcmpIdAllocator {
    /// Create a new allocator starting at identifier 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next identifier, wrapping within the 16-bit space.
    ///
    /// Safe to call concurrently from any number of tasks.
    pub fn next(&self) -> u16 {
        (self.counter.fetch_add(1, Ordering::Relaxed) & 0xFFFF) as u16
    }
}
