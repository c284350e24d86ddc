use crate::backend::RuntimeDriver;
use crate::error::ExecutorError;
use crate::session::{ClassifySession, PoseSession};
use pipeline::classify::Ranking;
use pipeline::image::RgbImage;
use pipeline::pose::Pose;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// One frame in, one result out. Implemented by the pipeline sessions so
/// the worker can drive either model family.
pub trait FrameProcessor: Send {
    type Output: Send;

    fn process_frame(&mut self, frame: &RgbImage)
    -> Result<(Self::Output, u64), ExecutorError>;
}

impl<D: RuntimeDriver> FrameProcessor for ClassifySession<D> {
    type Output = Ranking;

    fn process_frame(&mut self, frame: &RgbImage) -> Result<(Ranking, u64), ExecutorError> {
        self.process(frame)
    }
}

impl<D: RuntimeDriver> FrameProcessor for PoseSession<D> {
    type Output = Option<Pose>;

    fn process_frame(&mut self, frame: &RgbImage) -> Result<(Option<Pose>, u64), ExecutorError> {
        self.process(frame)
    }
}

/// Callbacks the worker invokes from its own thread.
pub trait Listener<T>: Send {
    fn on_results(&self, results: T, latency_ms: u64);
    fn on_error(&self, message: &str);
}

struct Slot {
    frame: Option<RgbImage>,
    shutdown: bool,
    dropped: u64,
}

/// Background worker running one inference at a time over a single-slot
/// frame queue.
///
/// The native runtime handle is not safe for concurrent execution, so the
/// session lives on the worker thread and frames are handed over through
/// the slot. Submitting while a frame is still pending replaces it: for
/// live video a stale frame is worse than a skipped one. Dropping the
/// worker cancels the queue, joins the thread, and releases the native
/// resources through the session's teardown.
pub struct FrameWorker {
    shared: Arc<(Mutex<Slot>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl FrameWorker {
    pub fn spawn<P, L>(mut session: P, listener: L) -> Self
    where
        P: FrameProcessor + 'static,
        L: Listener<P::Output> + 'static,
    {
        let shared = Arc::new((
            Mutex::new(Slot {
                frame: None,
                shutdown: false,
                dropped: 0,
            }),
            Condvar::new(),
        ));

        let worker_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("frame-worker".to_string())
            .spawn(move || {
                let (slot, ready) = &*worker_shared;

                loop {
                    let frame = {
                        let mut guard = slot.lock().unwrap();
                        loop {
                            if guard.shutdown {
                                return;
                            }
                            if let Some(frame) = guard.frame.take() {
                                break frame;
                            }
                            guard = ready.wait(guard).unwrap();
                        }
                    };

                    match session.process_frame(&frame) {
                        Ok((results, latency_ms)) => listener.on_results(results, latency_ms),
                        Err(e) => {
                            // Per-frame failures are reported and skipped so
                            // the next frame can still be processed.
                            tracing::error!(error = %e, "Failed to process frame");
                            listener.on_error(&e.to_string());
                        }
                    }
                }
            })
            .expect("failed to spawn frame worker thread");

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Queue a frame for processing. A frame already waiting in the slot is
    /// replaced; the newest submission wins.
    pub fn submit(&self, frame: RgbImage) {
        let (slot, ready) = &*self.shared;
        let mut guard = slot.lock().unwrap();

        if guard.frame.replace(frame).is_some() {
            guard.dropped += 1;
            tracing::trace!(dropped = guard.dropped, "Replaced pending frame");
        }

        ready.notify_one();
    }

    /// Number of frames dropped because a newer one replaced them.
    pub fn dropped_frames(&self) -> u64 {
        self.shared.0.lock().unwrap().dropped
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        {
            let (slot, ready) = &*self.shared;
            let mut guard = slot.lock().unwrap();
            guard.shutdown = true;
            guard.frame = None;
            ready.notify_one();
        }

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
