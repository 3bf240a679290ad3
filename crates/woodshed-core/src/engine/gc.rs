//! Deferred deallocation for audio-thread owned data
//!
//! A global `basedrop` collector runs on its own thread. Anything the audio
//! thread may drop (retired grain sources, the last reference to a decoded
//! track) is wrapped in `Shared<T>` or `Owned<T>` created from [`gc_handle`].
//! Dropping such a pointer only enqueues it; the memory is released on the
//! collector thread, so the real-time callback never calls into the allocator
//! to free a multi-megabyte buffer.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc_handle;
//!
//! let buffer = Shared::new(&gc_handle(), sample_buffer);
//! let for_waveform = buffer.clone();
//! drop(buffer); // queued, not freed, once the last clone goes
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the collector thread sweeps deferred drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("woodshed-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it is created and owned by this thread
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("GC handle receiver dropped");

            log::info!("Deferred-drop collector started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn GC thread");

    rx.recv().expect("GC thread exited before sending its handle")
}

/// Get a handle for creating `Shared<T>` / `Owned<T>` allocations
///
/// The collector thread is spawned lazily on first use.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Shared;

    #[test]
    fn test_shared_clone_and_drop() {
        let data = Shared::new(&gc_handle(), vec![0.0_f32; 1024]);
        let other = data.clone();
        assert_eq!(other.len(), 1024);
        drop(data);
        drop(other);
    }
}
