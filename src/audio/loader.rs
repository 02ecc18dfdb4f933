//! Background decoding with a fixed number of worker threads.
//!
//! Queue entries are created in play order by the manager and filled in by
//! whichever worker picks them up, so load completion order never affects
//! play order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::track::Track;

/// A queued file whose decode may still be in progress.
pub struct PendingTrack {
    path: PathBuf,
    /// `None` while loading.
    result: Mutex<Option<Result<Track, String>>>,
}

impl PendingTrack {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            result: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn ready(track: Track) -> Self {
        Self {
            path: track.path().to_path_buf(),
            result: Mutex::new(Some(Ok(track))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the load result, leaving the entry spent. `None` while loading.
    pub fn take(&self) -> Option<Result<Track, String>> {
        match self.result.lock() {
            Ok(mut r) => r.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Hold the result slot, keeping a worker from completing this entry.
    #[cfg(test)]
    pub fn hold_for_tests(&self) -> std::sync::MutexGuard<'_, Option<Result<Track, String>>> {
        self.result.lock().unwrap()
    }

    fn complete(&self, result: Result<Track, String>) {
        match self.result.lock() {
            Ok(mut r) => *r = Some(result),
            Err(poisoned) => *poisoned.into_inner() = Some(result),
        }
    }
}

pub struct Loader {
    tx: Mutex<Option<Sender<Arc<PendingTrack>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    in_flight: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl Loader {
    pub fn new(threads: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Arc<PendingTrack>>();
        let rx = Arc::new(Mutex::new(rx));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));

        let workers = (0..threads.max(1))
            .filter_map(|i| {
                let rx = Arc::clone(&rx);
                let in_flight = Arc::clone(&in_flight);
                let cancelled = Arc::clone(&cancelled);
                thread::Builder::new()
                    .name(format!("loader-{i}"))
                    .spawn(move || run_worker(rx, in_flight, cancelled))
                    .map_err(|e| log::error!("cannot spawn loader thread: {e}"))
                    .ok()
            })
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            in_flight,
            cancelled,
        }
    }

    /// Queue `pending` for decoding.
    pub fn submit(&self, pending: Arc<PendingTrack>) {
        // Counted before sending: a worker may finish the job before `send` returns.
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let sent = self
            .tx
            .lock()
            .ok()
            .and_then(|tx| tx.as_ref().map(|tx| tx.send(Arc::clone(&pending)).is_ok()))
            .unwrap_or(false);

        if !sent {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            pending.complete(Err("loader is shut down".to_string()));
        }
    }

    /// Files submitted but not decoded yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Abandon queued work and let the workers go.
    ///
    /// Idle workers exit as soon as the job channel closes. A worker in the
    /// middle of a decode is detached rather than joined, so quitting never
    /// waits for a long file; its result lands on an entry nobody reads.
    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let workers = match self.workers.lock() {
            Ok(mut w) => std::mem::take(&mut *w),
            Err(_) => return,
        };
        let busy = workers.iter().filter(|h| !h.is_finished()).count();
        if busy > 0 {
            log::debug!("detaching {busy} loader thread(s)");
        }
        drop(workers);
    }
}

fn run_worker(
    rx: Arc<Mutex<Receiver<Arc<PendingTrack>>>>,
    in_flight: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
) {
    loop {
        let job = match rx.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => return,
        };
        let Ok(pending) = job else {
            return;
        };

        let result = if cancelled.load(Ordering::Acquire) {
            Err("cancelled".to_string())
        } else {
            Track::load(pending.path()).map_err(|e| e.to_string())
        };

        match &result {
            Ok(track) => log::info!(
                "loaded {} ({} Hz, {} ch, {:.1}s)",
                pending.path().display(),
                track.sample_rate(),
                track.channels(),
                track.duration().as_secs_f64()
            ),
            Err(reason) => log::warn!("skipping {}: {}", pending.path().display(), reason),
        }

        pending.complete(result);
        in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
