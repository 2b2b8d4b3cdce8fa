//! Background job lifecycle for remote texture generation
//!
//! A [`JobController`] owns at most one job at a time:
//!
//! ```text
//! Idle -> Submitting -> Running -> { Succeeded | Failed | Cancelled } -> (consume) -> Idle
//! ```
//!
//! The job runs as a task on a runtime owned by the controller, so the host
//! thread never blocks. The host polls from its own timer tick:
//! - progress and status are published together through a `watch` slot,
//!   so a poll never sees one without the other
//! - the terminal [`Outcome`] arrives once through a `oneshot` channel
//! - cancellation is a shared flag the worker checks between stages
//!
//! Only the worker writes progress, status and outcome; only the controller
//! sets the cancellation flag and consumes the outcome.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use pbrforge_ipc::TextureRequest;
use pbrforge_maps::NormalConverter;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::textures::TextureSet;
use crate::{GenerationError, TextureBackend};

/// Identifier of one submitted job, unique per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned by [`JobController::submit`] for polling the job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    id: JobId,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }
}

/// Lifecycle state of the controller's job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Submitting,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Fixed progress checkpoints of the remote pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Connecting,
    RequestSent,
    ResponseReceived,
    Decoding,
    Done,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 5] = [
        Checkpoint::Connecting,
        Checkpoint::RequestSent,
        Checkpoint::ResponseReceived,
        Checkpoint::Decoding,
        Checkpoint::Done,
    ];

    pub fn progress(self) -> f32 {
        match self {
            Checkpoint::Connecting => 0.1,
            Checkpoint::RequestSent => 0.3,
            Checkpoint::ResponseReceived => 0.7,
            Checkpoint::Decoding => 0.85,
            Checkpoint::Done => 1.0,
        }
    }

    pub fn status(self) -> &'static str {
        match self {
            Checkpoint::Connecting => "Connecting to backend...",
            Checkpoint::RequestSent => "Generating textures with AI...",
            Checkpoint::ResponseReceived => "Receiving generated textures...",
            Checkpoint::Decoding => "Decoding texture images...",
            Checkpoint::Done => "Complete!",
        }
    }
}

/// Progress and status, always published together
#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    pub progress: f32,
    pub status: String,
}

/// Snapshot returned by [`JobController::poll`]
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub job_id: JobId,
    pub progress: f32,
    pub status: String,
    pub state: JobState,
    pub terminal: bool,
}

/// Terminal result of a job
#[derive(Debug)]
pub enum Outcome {
    Success(TextureSet),
    Failed(GenerationError),
    Cancelled,
}

impl Outcome {
    fn state(&self) -> JobState {
        match self {
            Outcome::Success(_) => JobState::Succeeded,
            Outcome::Failed(_) => JobState::Failed,
            Outcome::Cancelled => JobState::Cancelled,
        }
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("A generation job is already running")]
    AlreadyRunning,

    #[error("Job {0} has not finished yet")]
    NotTerminal(JobId),

    #[error("Outcome of job {0} was already consumed")]
    AlreadyConsumed(JobId),

    #[error("Unknown job {0}")]
    UnknownJob(JobId),

    #[error("Failed to start job runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Runs texture generation jobs in the background, one at a time.
///
/// Create and drive it from a synchronous host thread; dropping it from
/// inside an async context would shut its runtime down in that context.
pub struct JobController<B: TextureBackend> {
    backend: Arc<B>,
    runtime: Runtime,
    converter: NormalConverter,
    active: Option<ActiveJob>,
    last_consumed: Option<JobId>,
    next_id: u64,
}

/// Controller-side record of the current job
struct ActiveJob {
    id: JobId,
    state: JobState,
    progress: watch::Receiver<JobProgress>,
    completion: oneshot::Receiver<Outcome>,
    outcome: Option<Outcome>,
    cancel: Arc<AtomicBool>,
}

impl ActiveJob {
    /// Move a delivered outcome out of the channel, if any
    fn collect_outcome(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        match self.completion.try_recv() {
            Ok(outcome) if self.cancel.load(Ordering::SeqCst) => {
                // Cancelled after the worker's last check; the result is discarded
                if !matches!(outcome, Outcome::Cancelled) {
                    info!("Job {} finished after cancellation; discarding result", self.id);
                }
                self.state = JobState::Cancelled;
                self.outcome = Some(Outcome::Cancelled);
            }
            Ok(outcome) => {
                self.state = outcome.state();
                self.outcome = Some(outcome);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                error!("Job {} worker exited without reporting an outcome", self.id);
                self.state = JobState::Failed;
                self.outcome = Some(Outcome::Failed(GenerationError::Worker(
                    "worker exited without reporting an outcome".into(),
                )));
            }
        }
    }
}

impl<B: TextureBackend> JobController<B> {
    pub fn new(backend: B) -> Result<Self, JobError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("pbrforge-job")
            .enable_all()
            .build()?;

        Ok(Self {
            backend: Arc::new(backend),
            runtime,
            converter: NormalConverter::default(),
            active: None,
            last_consumed: None,
            next_id: 0,
        })
    }

    /// Converter used when a response carries a height map instead of a
    /// normal map
    pub fn with_normal_converter(mut self, converter: NormalConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> JobState {
        self.active.as_ref().map_or(JobState::Idle, |job| job.state)
    }

    /// True while a worker is executing
    pub fn is_running(&self) -> bool {
        matches!(self.state(), JobState::Submitting | JobState::Running)
    }

    /// Handle of the job awaiting completion or consumption
    pub fn active_job(&self) -> Option<JobHandle> {
        self.active.as_ref().map(|job| JobHandle { id: job.id })
    }

    /// Start generating `request` in the background.
    ///
    /// Fails with [`JobError::AlreadyRunning`] while another job is running
    /// or its outcome has not been consumed yet.
    pub fn submit(&mut self, request: TextureRequest) -> Result<JobHandle, JobError> {
        if let Some(job) = &self.active {
            warn!(
                "Rejecting submission: job {} is still {:?}",
                job.id, job.state
            );
            return Err(JobError::AlreadyRunning);
        }

        self.next_id += 1;
        let id = JobId(self.next_id);

        let (progress_tx, progress_rx) = watch::channel(JobProgress {
            progress: 0.0,
            status: "Starting generation...".into(),
        });
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        let mut job = ActiveJob {
            id,
            state: JobState::Submitting,
            progress: progress_rx,
            completion: outcome_rx,
            outcome: None,
            cancel: Arc::clone(&cancel),
        };

        info!(
            "Submitting job {}: prompt={:?} resolution={} tileable={}",
            id, request.prompt, request.resolution, request.tileable
        );

        let worker = Worker {
            id,
            backend: Arc::clone(&self.backend),
            request,
            converter: self.converter,
            cancel,
            reporter: ProgressReporter::new(progress_tx),
        };

        self.runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(worker.execute()).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(&*panic);
                    error!("Job {} worker panicked: {}", worker.id, message);
                    Outcome::Failed(GenerationError::Worker(message))
                }
            };
            worker.finish(&outcome);
            // The controller may already be gone; nothing left to report to
            let _ = outcome_tx.send(outcome);
        });

        job.state = JobState::Running;
        self.active = Some(job);
        Ok(JobHandle { id })
    }

    /// Non-blocking snapshot of the job's progress and state
    pub fn poll(&mut self, handle: JobHandle) -> Result<JobStatus, JobError> {
        let job = self.job_mut(handle)?;
        job.collect_outcome();

        let progress = job.progress.borrow().clone();
        let status = if job.state == JobState::Cancelled {
            "Cancelled".to_string()
        } else {
            progress.status
        };
        Ok(JobStatus {
            job_id: job.id,
            progress: progress.progress,
            status,
            state: job.state,
            terminal: job.state.is_terminal(),
        })
    }

    /// Ask the worker to stop at its next checkpoint.
    ///
    /// Best effort: a request already in flight still completes, but its
    /// result is discarded. No-op once the job is terminal.
    pub fn cancel_request(&mut self, handle: JobHandle) -> Result<(), JobError> {
        let job = self.job_mut(handle)?;
        job.collect_outcome();
        if job.state.is_terminal() {
            debug!("Ignoring cancel for job {}: already {:?}", job.id, job.state);
            return Ok(());
        }
        job.cancel.store(true, Ordering::SeqCst);
        info!("Cancellation requested for job {}", job.id);
        Ok(())
    }

    /// Take the terminal outcome, returning the controller to `Idle`.
    pub fn consume_outcome(&mut self, handle: JobHandle) -> Result<Outcome, JobError> {
        let job = self.job_mut(handle)?;
        job.collect_outcome();
        let state = job.state;
        let outcome = job.outcome.take().ok_or(JobError::NotTerminal(handle.id))?;

        self.active = None;
        self.last_consumed = Some(handle.id);
        info!("Job {} consumed ({:?})", handle.id, state);
        Ok(outcome)
    }

    fn job_mut(&mut self, handle: JobHandle) -> Result<&mut ActiveJob, JobError> {
        match self.active.as_mut() {
            Some(job) if job.id == handle.id => Ok(job),
            _ if self.last_consumed == Some(handle.id) => Err(JobError::AlreadyConsumed(handle.id)),
            _ => Err(JobError::UnknownJob(handle.id)),
        }
    }
}

impl<B: TextureBackend> Drop for JobController<B> {
    fn drop(&mut self) {
        if let Some(job) = &self.active {
            if !job.state.is_terminal() {
                debug!("Controller dropped; cancelling job {}", job.id);
                job.cancel.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Worker-side writer of progress and status
struct ProgressReporter {
    tx: watch::Sender<JobProgress>,
    /// Every checkpoint published, in order
    #[cfg(test)]
    trail: std::sync::Mutex<Vec<Checkpoint>>,
}

impl ProgressReporter {
    fn new(tx: watch::Sender<JobProgress>) -> Self {
        Self {
            tx,
            #[cfg(test)]
            trail: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Advance to `checkpoint`; never moves progress backwards
    fn checkpoint(&self, checkpoint: Checkpoint) {
        let value = checkpoint.progress();
        let advanced = self.tx.send_if_modified(|current| {
            if value < current.progress {
                return false;
            }
            current.progress = value;
            current.status = checkpoint.status().to_string();
            true
        });
        if advanced {
            self.record(checkpoint);
        }
    }

    #[cfg(test)]
    fn record(&self, checkpoint: Checkpoint) {
        self.trail.lock().unwrap().push(checkpoint);
    }

    #[cfg(not(test))]
    fn record(&self, _checkpoint: Checkpoint) {}

    /// Replace the status text, keeping progress
    fn set_status(&self, status: String) {
        self.tx.send_modify(|current| current.status = status);
    }
}

/// Everything the background task needs to run one job
struct Worker<B> {
    id: JobId,
    backend: Arc<B>,
    request: TextureRequest,
    converter: NormalConverter,
    cancel: Arc<AtomicBool>,
    reporter: ProgressReporter,
}

impl<B: TextureBackend> Worker<B> {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn checkpoint(&self, checkpoint: Checkpoint) {
        debug!(
            "Job {} checkpoint {:?} ({:.2})",
            self.id,
            checkpoint,
            checkpoint.progress()
        );
        self.reporter.checkpoint(checkpoint);
    }

    async fn execute(&self) -> Outcome {
        self.checkpoint(Checkpoint::Connecting);
        if self.cancelled() {
            return Outcome::Cancelled;
        }

        self.checkpoint(Checkpoint::RequestSent);
        let response = self.backend.generate(self.request.clone()).await;
        // A response that lands after cancellation is discarded
        if self.cancelled() {
            return Outcome::Cancelled;
        }
        let response = match response {
            Ok(response) => response,
            Err(e) => return Outcome::Failed(e),
        };

        self.checkpoint(Checkpoint::ResponseReceived);
        if self.cancelled() {
            return Outcome::Cancelled;
        }

        self.checkpoint(Checkpoint::Decoding);
        let converter = self.converter;
        let request = self.request.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            TextureSet::from_response(&request, &response, &converter)
        })
        .await;
        if self.cancelled() {
            return Outcome::Cancelled;
        }

        match decoded {
            Ok(Ok(textures)) => {
                self.checkpoint(Checkpoint::Done);
                Outcome::Success(textures)
            }
            Ok(Err(e)) => Outcome::Failed(e),
            Err(e) => Outcome::Failed(GenerationError::Worker(format!("decode task: {e}"))),
        }
    }

    /// Publish the final status line for `outcome`
    fn finish(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Success(textures) => {
                let (w, h) = textures.dimensions();
                info!("Job {} succeeded: four {}x{} maps", self.id, w, h);
            }
            Outcome::Failed(e) => {
                warn!("Job {} failed: {}", self.id, e);
                self.reporter.set_status(format!("Error: {e}"));
            }
            Outcome::Cancelled => {
                info!("Job {} cancelled", self.id);
                self.reporter.set_status("Cancelled".into());
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use image::{ImageFormat, Rgb, RgbImage};
    use pbrforge_ipc::{Resolution, TextureResponse};
    use std::io::Cursor;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn solid_png(size: u32, color: [u8; 3]) -> String {
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(RgbImage::from_pixel(size, size, Rgb(color)))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        BASE64.encode(bytes.into_inner())
    }

    enum Behavior {
        Succeed,
        Fail(GenerationError),
        Panic,
    }

    struct StubBackend {
        delay: Duration,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl StubBackend {
        fn new(delay_ms: u64, behavior: Behavior) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                behavior,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextureBackend for StubBackend {
        async fn generate(
            &self,
            request: TextureRequest,
        ) -> Result<TextureResponse, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match &self.behavior {
                Behavior::Succeed => Ok(TextureResponse {
                    diffuse: solid_png(8, [120, 60, 20]),
                    roughness: solid_png(8, [200, 200, 200]),
                    normal: Some(solid_png(8, [128, 128, 255])),
                    height: None,
                    metallic: solid_png(8, [255, 255, 255]),
                    prompt: request.prompt,
                    resolution: 8,
                    tileable: request.tileable,
                }),
                Behavior::Fail(e) => Err(e.clone()),
                Behavior::Panic => panic!("backend exploded"),
            }
        }
    }

    fn request() -> TextureRequest {
        TextureRequest::new("rusty metal", Resolution::R512, false)
    }

    fn wait_terminal<B: TextureBackend>(
        controller: &mut JobController<B>,
        handle: JobHandle,
    ) -> JobStatus {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let status = controller.poll(handle).unwrap();
            if status.terminal {
                return status;
            }
            assert!(Instant::now() < deadline, "job never finished: {status:?}");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_success_lifecycle() {
        let mut controller = JobController::new(StubBackend::new(20, Behavior::Succeed)).unwrap();
        assert_eq!(controller.state(), JobState::Idle);

        let handle = controller.submit(request()).unwrap();
        assert!(controller.is_running());

        let status = wait_terminal(&mut controller, handle);
        assert_eq!(status.state, JobState::Succeeded);
        assert_eq!(status.progress, 1.0);
        assert_eq!(status.status, "Complete!");
        assert!(!controller.is_running());

        match controller.consume_outcome(handle).unwrap() {
            Outcome::Success(textures) => assert_eq!(textures.dimensions(), (8, 8)),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(controller.state(), JobState::Idle);
        assert_eq!(controller.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_submit_rejected_until_consumed() {
        let mut controller = JobController::new(StubBackend::new(20, Behavior::Succeed)).unwrap();
        let handle = controller.submit(request()).unwrap();
        assert!(matches!(
            controller.submit(request()),
            Err(JobError::AlreadyRunning)
        ));

        // Still rejected while terminal but unconsumed
        wait_terminal(&mut controller, handle);
        assert!(matches!(
            controller.submit(request()),
            Err(JobError::AlreadyRunning)
        ));

        controller.consume_outcome(handle).unwrap();
        let next = controller.submit(request()).unwrap();
        assert_ne!(next.id(), handle.id());
    }

    #[test]
    fn test_consume_before_terminal_fails() {
        let mut controller = JobController::new(StubBackend::new(300, Behavior::Succeed)).unwrap();
        let handle = controller.submit(request()).unwrap();
        assert!(matches!(
            controller.consume_outcome(handle),
            Err(JobError::NotTerminal(_))
        ));
        wait_terminal(&mut controller, handle);
        assert!(controller.consume_outcome(handle).is_ok());
    }

    #[test]
    fn test_consume_twice_fails() {
        let mut controller = JobController::new(StubBackend::new(0, Behavior::Succeed)).unwrap();
        let handle = controller.submit(request()).unwrap();
        wait_terminal(&mut controller, handle);

        assert!(controller.consume_outcome(handle).is_ok());
        assert!(matches!(
            controller.consume_outcome(handle),
            Err(JobError::AlreadyConsumed(id)) if id == handle.id()
        ));
        assert!(matches!(
            controller.poll(handle),
            Err(JobError::AlreadyConsumed(_))
        ));
    }

    #[test]
    fn test_cancel_discards_result() {
        let mut controller = JobController::new(StubBackend::new(100, Behavior::Succeed)).unwrap();
        let handle = controller.submit(request()).unwrap();
        controller.cancel_request(handle).unwrap();

        let status = wait_terminal(&mut controller, handle);
        assert_eq!(status.state, JobState::Cancelled);
        assert_eq!(status.status, "Cancelled");
        assert!(matches!(
            controller.consume_outcome(handle).unwrap(),
            Outcome::Cancelled
        ));
    }

    #[test]
    fn test_backend_error_becomes_failed() {
        let error = GenerationError::ConnectionFailure("connection refused".into());
        let mut controller =
            JobController::new(StubBackend::new(0, Behavior::Fail(error.clone()))).unwrap();
        let handle = controller.submit(request()).unwrap();

        let status = wait_terminal(&mut controller, handle);
        assert_eq!(status.state, JobState::Failed);
        assert!(status.status.starts_with("Error: Connection failed"));
        // Progress stays where the failure happened
        assert_eq!(status.progress, Checkpoint::RequestSent.progress());

        match controller.consume_outcome(handle).unwrap() {
            Outcome::Failed(e) => assert_eq!(e, error),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_worker_panic_is_contained() {
        let mut controller = JobController::new(StubBackend::new(0, Behavior::Panic)).unwrap();
        let handle = controller.submit(request()).unwrap();

        let status = wait_terminal(&mut controller, handle);
        assert_eq!(status.state, JobState::Failed);
        match controller.consume_outcome(handle).unwrap() {
            Outcome::Failed(GenerationError::Worker(message)) => {
                assert!(message.contains("backend exploded"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        // The controller is still usable afterwards
        assert!(controller.submit(request()).is_ok());
    }

    #[test]
    fn test_unknown_handle() {
        let mut controller = JobController::new(StubBackend::new(0, Behavior::Succeed)).unwrap();
        let bogus = JobHandle { id: JobId(42) };
        assert!(matches!(controller.poll(bogus), Err(JobError::UnknownJob(_))));
        assert!(matches!(
            controller.cancel_request(bogus),
            Err(JobError::UnknownJob(_))
        ));
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut controller = JobController::new(StubBackend::new(30, Behavior::Succeed)).unwrap();
        let handle = controller.submit(request()).unwrap();

        let mut last = 0.0;
        loop {
            let status = controller.poll(handle).unwrap();
            assert!(status.progress >= last, "{} < {}", status.progress, last);
            last = status.progress;
            if status.terminal {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(last, 1.0);
    }

    fn worker(behavior: Behavior) -> Worker<StubBackend> {
        let (tx, _rx) = watch::channel(JobProgress {
            progress: 0.0,
            status: String::new(),
        });
        Worker {
            id: JobId(1),
            backend: Arc::new(StubBackend::new(0, behavior)),
            request: request(),
            converter: NormalConverter::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            reporter: ProgressReporter::new(tx),
        }
    }

    #[test]
    fn test_worker_publishes_every_checkpoint() {
        let runtime = Runtime::new().unwrap();

        let succeeding = worker(Behavior::Succeed);
        let outcome = runtime.block_on(succeeding.execute());
        assert!(matches!(outcome, Outcome::Success(_)));
        assert_eq!(*succeeding.reporter.trail.lock().unwrap(), Checkpoint::ALL.to_vec());

        let failing = worker(Behavior::Fail(GenerationError::RemoteRejected("no".into())));
        let outcome = runtime.block_on(failing.execute());
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(
            *failing.reporter.trail.lock().unwrap(),
            vec![Checkpoint::Connecting, Checkpoint::RequestSent]
        );
    }

    #[test]
    fn test_cancel_racing_completion_discards_success() {
        let mut controller = JobController::new(StubBackend::new(0, Behavior::Succeed)).unwrap();

        // A job whose worker has published its last checkpoint but whose
        // outcome has not been delivered yet
        let (progress_tx, progress_rx) = watch::channel(JobProgress {
            progress: Checkpoint::Done.progress(),
            status: Checkpoint::Done.status().into(),
        });
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let id = JobId(7);
        controller.active = Some(ActiveJob {
            id,
            state: JobState::Running,
            progress: progress_rx,
            completion: outcome_rx,
            outcome: None,
            cancel: Arc::new(AtomicBool::new(false)),
        });
        let handle = JobHandle { id };

        let status = controller.poll(handle).unwrap();
        assert_eq!(status.progress, 1.0);
        assert!(!status.terminal);

        controller.cancel_request(handle).unwrap();

        let solid = |c: [u8; 3]| RgbImage::from_pixel(4, 4, Rgb(c));
        let textures = TextureSet::new(
            solid([1, 2, 3]),
            solid([4, 5, 6]),
            solid([128, 128, 255]),
            solid([0, 0, 0]),
            "late",
            false,
        )
        .unwrap();
        outcome_tx.send(Outcome::Success(textures)).unwrap();
        drop(progress_tx);

        let status = controller.poll(handle).unwrap();
        assert_eq!(status.state, JobState::Cancelled);
        assert_eq!(status.status, "Cancelled");
        assert!(matches!(
            controller.consume_outcome(handle).unwrap(),
            Outcome::Cancelled
        ));
    }

    #[test]
    fn test_reporter_ignores_regression() {
        let (tx, rx) = watch::channel(JobProgress {
            progress: 0.0,
            status: String::new(),
        });
        let reporter = ProgressReporter::new(tx);
        reporter.checkpoint(Checkpoint::Decoding);
        reporter.checkpoint(Checkpoint::Connecting);
        assert_eq!(rx.borrow().progress, 0.85);
        assert_eq!(rx.borrow().status, Checkpoint::Decoding.status());
    }
}
