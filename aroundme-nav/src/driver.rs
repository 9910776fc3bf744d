//! Pipeline driver
//!
//! Frames are submitted from the capture side and processed on a dedicated
//! tokio task. At most one frame waits for the worker; what happens to a
//! frame arriving while that slot is taken depends on the
//! [`BackpressurePolicy`]. Voice intents arrive on an mpsc channel and are
//! applied between frames, and everything the worker does is published on a
//! broadcast channel.

use crate::config::{BackpressurePolicy, NavigatorConfig};
use crate::error::NavigationError;
use crate::events::{DropReason, PipelineEvent, VoiceIntent};
use crate::pipeline::{FramePipeline, FrameReport, IntentOutcome, PipelineSnapshot};
use aroundme_eye::{Frame, InferenceEngine};
use aroundme_spk::{HapticSink, SpeechOutcome, SpeechSink};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What happened to a submitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Waiting for the worker under this sequence number
    Accepted(u64),
    /// Took the place of an older waiting frame
    Replaced(u64),
    /// Not an Nth frame
    Skipped,
    /// Slot occupied under the queue policy, or the driver is shut down
    Rejected,
}

struct PendingFrame {
    seq: u64,
    frame: Frame,
}

struct Shared {
    running: AtomicBool,
    slot: Mutex<Option<PendingFrame>>,
    wake: Notify,
    submitted: AtomicU64,
    next_seq: AtomicU64,
    events: broadcast::Sender<PipelineEvent>,
}

impl Shared {
    fn publish(&self, event: PipelineEvent) {
        // No subscribers is fine
        if self.events.send(event).is_err() {
            debug!("No event subscribers");
        }
    }
}

/// Handle to a running pipeline worker
pub struct PipelineDriver {
    shared: Arc<Shared>,
    intents: mpsc::Sender<(VoiceIntent, DateTime<Utc>)>,
    snapshot: Arc<RwLock<PipelineSnapshot>>,
    worker: Option<JoinHandle<()>>,
    frame_skip: u64,
    backpressure: BackpressurePolicy,
    shutdown_timeout: Duration,
}

impl PipelineDriver {
    /// Build the pipeline from configuration and start the worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: NavigatorConfig,
        engine: Option<Arc<dyn InferenceEngine>>,
        speech: Arc<dyn SpeechSink>,
        haptics: Arc<dyn HapticSink>,
    ) -> Result<Self, NavigationError> {
        let pipeline = FramePipeline::from_config(&config, engine, speech, haptics)?;
        Self::spawn(pipeline, &config)
    }

    /// Start a worker around an already built pipeline
    pub fn spawn(pipeline: FramePipeline, config: &NavigatorConfig) -> Result<Self, NavigationError> {
        config.validate().map_err(NavigationError::Config)?;

        let (events, _) = broadcast::channel(config.event_buffer_size);
        let (intent_tx, intent_rx) = mpsc::channel(config.intent_buffer_size);

        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            slot: Mutex::new(None),
            wake: Notify::new(),
            submitted: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            events,
        });

        let snapshot = pipeline.snapshot_handle();
        let worker = tokio::spawn(run_worker(pipeline, shared.clone(), intent_rx));

        info!(
            "Pipeline started (frame_skip: {}, backpressure: {:?})",
            config.frame_skip, config.backpressure
        );

        Ok(Self {
            shared,
            intents: intent_tx,
            snapshot,
            worker: Some(worker),
            frame_skip: u64::from(config.frame_skip),
            backpressure: config.backpressure,
            shutdown_timeout: Duration::from_millis(config.shutdown_timeout_ms),
        })
    }

    /// Offer a frame from the capture side; never blocks on processing
    pub fn submit(&self, frame: Frame) -> SubmitOutcome {
        if !self.shared.running.load(Ordering::SeqCst) {
            return SubmitOutcome::Rejected;
        }

        let count = self.shared.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        if count % self.frame_skip != 0 {
            return SubmitOutcome::Skipped;
        }

        let outcome = {
            let mut slot = self.shared.slot.lock();
            let waiting = slot.as_ref().map(|pending| pending.seq);
            match (waiting, self.backpressure) {
                (Some(_), BackpressurePolicy::Queue) => {
                    debug!("Frame slot occupied, rejecting frame");
                    SubmitOutcome::Rejected
                }
                (superseded, _) => {
                    let seq = self.shared.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
                    *slot = Some(PendingFrame { seq, frame });
                    match superseded {
                        Some(old) => {
                            self.shared.publish(PipelineEvent::FrameDropped {
                                seq: Some(old),
                                reason: DropReason::Superseded,
                            });
                            SubmitOutcome::Replaced(seq)
                        }
                        None => SubmitOutcome::Accepted(seq),
                    }
                }
            }
        };

        if outcome == SubmitOutcome::Rejected {
            self.shared.publish(PipelineEvent::FrameDropped {
                seq: None,
                reason: DropReason::QueueFull,
            });
        } else {
            self.shared.wake.notify_one();
        }
        outcome
    }

    /// Queue a voice intent, stamped with the current time
    pub async fn send_intent(&self, intent: VoiceIntent) -> Result<(), NavigationError> {
        self.send_intent_at(intent, Utc::now()).await
    }

    pub async fn send_intent_at(
        &self,
        intent: VoiceIntent,
        timestamp: DateTime<Utc>,
    ) -> Result<(), NavigationError> {
        if !self.is_running() {
            return Err(NavigationError::Shutdown("Pipeline is shut down".to_string()));
        }
        self.intents
            .send((intent, timestamp))
            .await
            .map_err(|_| NavigationError::Shutdown("Pipeline worker has stopped".to_string()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.shared.events.subscribe()
    }

    /// Latest published state; may lag the worker by one frame
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.snapshot.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Whether a frame is waiting for the worker
    pub fn has_pending_frame(&self) -> bool {
        self.shared.slot.lock().is_some()
    }

    /// Stop accepting frames, release the waiting frame and wait for the worker
    ///
    /// A frame being processed finishes, but its result is not dispatched.
    pub async fn shutdown(&mut self) -> Result<(), NavigationError> {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Shutting down pipeline");

        if let Some(pending) = self.shared.slot.lock().take() {
            self.shared.publish(PipelineEvent::FrameDropped {
                seq: Some(pending.seq),
                reason: DropReason::ShuttingDown,
            });
        }
        self.shared.wake.notify_one();

        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.shutdown_timeout, &mut worker).await {
            Ok(Ok(())) => {
                info!("Pipeline stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(NavigationError::Shutdown(format!("Worker failed: {}", e))),
            Err(_) => {
                worker.abort();
                Err(NavigationError::Shutdown(format!(
                    "Worker did not stop within {:?}",
                    self.shutdown_timeout
                )))
            }
        }
    }
}

impl Drop for PipelineDriver {
    fn drop(&mut self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            self.shared.slot.lock().take();
            self.shared.wake.notify_one();
        }
    }
}

async fn run_worker(
    mut pipeline: FramePipeline,
    shared: Arc<Shared>,
    mut intents: mpsc::Receiver<(VoiceIntent, DateTime<Utc>)>,
) {
    let mut intents_open = true;

    loop {
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }

        // Intents queued during the last frame apply before the next one
        while intents_open {
            match intents.try_recv() {
                Ok((intent, timestamp)) => {
                    let outcome = pipeline.apply_intent(intent, timestamp).await;
                    publish_intent(&shared, &outcome);
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => intents_open = false,
            }
        }

        let pending = shared.slot.lock().take();
        let Some(PendingFrame { seq, frame }) = pending else {
            tokio::select! {
                _ = shared.wake.notified() => {}
                received = intents.recv(), if intents_open => match received {
                    Some((intent, timestamp)) => {
                        let outcome = pipeline.apply_intent(intent, timestamp).await;
                        publish_intent(&shared, &outcome);
                    }
                    None => intents_open = false,
                },
            }
            continue;
        };

        let analysis = pipeline.analyze(seq, frame).await;

        if !shared.running.load(Ordering::SeqCst) {
            debug!("Discarding frame {} finished during shutdown", seq);
            shared.publish(PipelineEvent::FrameDropped {
                seq: Some(seq),
                reason: DropReason::ShuttingDown,
            });
            break;
        }

        let report = pipeline.dispatch(analysis).await;
        publish_report(&shared, report);
    }

    debug!("Pipeline worker exiting");
}

fn publish_report(shared: &Shared, report: FrameReport) {
    let FrameReport {
        seq,
        timestamp,
        raw_count,
        detections,
        decision,
    } = report;

    let Some(decision) = decision else {
        shared.publish(PipelineEvent::FrameDropped {
            seq: Some(seq),
            reason: DropReason::Stale,
        });
        return;
    };

    shared.publish(PipelineEvent::FrameProcessed {
        seq,
        timestamp,
        raw_count,
        detections,
    });

    match (decision.text, decision.speech) {
        (Some(text), Some(SpeechOutcome::Spoken)) => {
            shared.publish(PipelineEvent::Spoken {
                text,
                priority: false,
            });
        }
        (Some(text), Some(SpeechOutcome::Failed)) => {
            error!("Frame {}: failed to speak \"{}\"", seq, text);
        }
        _ => {}
    }

    if let Some(text) = decision.drained {
        shared.publish(PipelineEvent::Spoken {
            text,
            priority: false,
        });
    }

    if let Some(pattern) = decision.haptic {
        shared.publish(PipelineEvent::Vibrated { pattern });
    }
}

fn publish_intent(shared: &Shared, outcome: &IntentOutcome) {
    if let Some(mode) = outcome.mode_changed {
        shared.publish(PipelineEvent::ModeChanged { mode });
    }
    match &outcome.spoken {
        Some(text) => shared.publish(PipelineEvent::Spoken {
            text: text.clone(),
            priority: true,
        }),
        None if outcome.mode_changed.is_some() => {
            warn!("Mode change confirmation was not spoken");
        }
        None => {}
    }
}
