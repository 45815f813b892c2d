//! RT-safe garbage collection for riff and stem data
//!
//! A global `basedrop` collector backs all [`Shared`](basedrop::Shared)
//! allocations in the crate. Dropping the last reference to a riff on the
//! render thread only enqueues a pointer (~50ns); the actual deallocation of
//! the stem sample data happens on a background thread where the latency
//! does not matter.

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    // The Collector is !Sync, so it lives on its own thread and we only
    // hand out cloneable Handles.
    thread::Builder::new()
        .name("riffmix-gc".to_string())
        .spawn(move || {
            let mut collector = Collector::new();

            let handle = collector.handle();
            tx.send(handle).expect("Failed to send GC handle");

            log::info!("riff GC thread started");

            loop {
                collector.collect();
                // 100ms is fast enough for memory reclamation
                thread::sleep(Duration::from_millis(100));
            }
        })
        .expect("Failed to spawn riff GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Get a handle for creating `Shared<T>` allocations
///
/// The handle is lightweight and can be cloned freely; the first call spawns
/// the collector thread.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
