//! Single-frame processing: detect, confirm, classify, dispatch

use crate::config::NavigatorConfig;
use crate::error::NavigationError;
use crate::events::VoiceIntent;
use crate::scene::{detailed_description, scan_summary};
use aroundme_eye::{
    ConfirmationFilter, DetectionPipeline, EnrichedDetection, Frame, InferenceEngine,
    SpatialClassifier,
};
use aroundme_spk::dispatcher::mode_confirmation;
use aroundme_spk::{
    AlertMode, AlertSession, DispatchDecision, DispatcherState, HapticSink, SpeechOutcome,
    SpeechRequest, SpeechSink,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the worker is in the per-frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    #[default]
    Idle,
    Decoding,
    Filtering,
    Classifying,
    Dispatching,
}

/// Read-only view of pipeline state, refreshed after every frame
#[derive(Debug, Clone, Default)]
pub struct PipelineSnapshot {
    pub stage: PipelineStage,
    pub dispatcher: DispatcherState,
    pub tracked_labels: Vec<String>,
    pub frames_processed: u64,
    pub last_dispatched_seq: Option<u64>,
}

impl PipelineSnapshot {
    pub fn mode(&self) -> AlertMode {
        self.dispatcher.mode
    }
}

/// Outcome of one processed frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub raw_count: usize,
    pub detections: Vec<EnrichedDetection>,
    /// `None` when the frame was older than one already dispatched
    pub decision: Option<DispatchDecision>,
}

/// Outcome of one voice intent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentOutcome {
    pub mode_changed: Option<AlertMode>,
    /// Text handed to the speech sink
    pub spoken: Option<String>,
}

/// Detections of one frame before dispatch
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub raw_count: usize,
    pub detections: Vec<EnrichedDetection>,
}

/// Owns every stage and all per-session state
pub struct FramePipeline {
    detector: DetectionPipeline,
    filter: ConfirmationFilter,
    classifier: SpatialClassifier,
    alerts: AlertSession,
    latest: Vec<EnrichedDetection>,
    last_dispatched_seq: Option<u64>,
    frames_processed: u64,
    snapshot: Arc<RwLock<PipelineSnapshot>>,
}

impl FramePipeline {
    /// Create a pipeline from its stages
    pub fn new(detector: DetectionPipeline, alerts: AlertSession) -> Result<Self, NavigationError> {
        let filter = ConfirmationFilter::new(detector.config().confirmation_threshold)?;
        let classifier = SpatialClassifier::new(detector.config())?;
        let snapshot = PipelineSnapshot {
            dispatcher: alerts.snapshot(),
            ..PipelineSnapshot::default()
        };

        Ok(Self {
            detector,
            filter,
            classifier,
            alerts,
            latest: Vec::new(),
            last_dispatched_seq: None,
            frames_processed: 0,
            snapshot: Arc::new(RwLock::new(snapshot)),
        })
    }

    /// Build every stage from configuration; without an engine the detector stays empty
    pub fn from_config(
        config: &NavigatorConfig,
        engine: Option<Arc<dyn InferenceEngine>>,
        speech: Arc<dyn SpeechSink>,
        haptics: Arc<dyn HapticSink>,
    ) -> Result<Self, NavigationError> {
        config.validate().map_err(NavigationError::Config)?;

        let detector = match engine {
            Some(engine) => {
                info!("Using inference engine {}", engine.name());
                DetectionPipeline::new(engine, config.vision.clone())?
            }
            None => {
                warn!("No inference engine available, running with detection disabled");
                DetectionPipeline::disabled(config.vision.clone())?
            }
        };

        let mut alerts = AlertSession::new(config.alerts.clone(), speech, haptics)?;
        alerts.set_mode(config.initial_mode);

        Self::new(detector, alerts)
    }

    /// Shared handle to the published snapshot
    pub fn snapshot_handle(&self) -> Arc<RwLock<PipelineSnapshot>> {
        self.snapshot.clone()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.snapshot.read().clone()
    }

    pub fn mode(&self) -> AlertMode {
        self.alerts.mode()
    }

    /// Run detection, confirmation and classification; the frame is released once inference returns
    pub async fn analyze(&mut self, seq: u64, frame: Frame) -> FrameAnalysis {
        let timestamp = frame.timestamp;
        let (width, height) = frame.oriented_size();

        self.set_stage(PipelineStage::Decoding);
        let raw = self.detector.detect(&frame).await;
        drop(frame);
        let raw_count = raw.len();

        self.set_stage(PipelineStage::Filtering);
        let confirmed = self.filter.update(raw);

        self.set_stage(PipelineStage::Classifying);
        let detections = self.classifier.classify_all(confirmed, width, height);

        debug!(
            "Frame {}: {} raw, {} confirmed",
            seq,
            raw_count,
            detections.len()
        );

        FrameAnalysis {
            seq,
            timestamp,
            raw_count,
            detections,
        }
    }

    /// Hand an analysis to the alert session unless a newer frame was already dispatched
    pub async fn dispatch(&mut self, analysis: FrameAnalysis) -> FrameReport {
        let FrameAnalysis {
            seq,
            timestamp,
            raw_count,
            detections,
        } = analysis;

        let stale = self.last_dispatched_seq.map_or(false, |last| seq <= last);
        let decision = if stale {
            debug!("Dropping stale frame {}", seq);
            None
        } else {
            self.set_stage(PipelineStage::Dispatching);
            let decision = self.alerts.dispatch(&detections, timestamp).await;
            self.last_dispatched_seq = Some(seq);
            self.latest = detections.clone();
            Some(decision)
        };

        self.frames_processed += 1;
        self.publish(PipelineStage::Idle);

        FrameReport {
            seq,
            timestamp,
            raw_count,
            detections,
            decision,
        }
    }

    /// Analyze and dispatch one frame
    pub async fn process(&mut self, seq: u64, frame: Frame) -> FrameReport {
        let analysis = self.analyze(seq, frame).await;
        self.dispatch(analysis).await
    }

    /// Apply a voice intent between frames
    pub async fn apply_intent(&mut self, intent: VoiceIntent, now: DateTime<Utc>) -> IntentOutcome {
        let outcome = match intent {
            VoiceIntent::SwitchToContinuous => self.switch_mode(AlertMode::Continuous, now).await,
            VoiceIntent::SwitchToNormal => self.switch_mode(AlertMode::Normal, now).await,
            VoiceIntent::RequestScan => {
                let text = scan_summary(&self.latest);
                self.announce(text, now).await
            }
            VoiceIntent::RequestDescribe => {
                let text = detailed_description(&self.latest);
                self.announce(text, now).await
            }
            VoiceIntent::Unknown => {
                debug!("Ignoring unrecognized voice intent");
                IntentOutcome::default()
            }
        };

        self.publish(PipelineStage::Idle);
        outcome
    }

    async fn switch_mode(&mut self, mode: AlertMode, now: DateTime<Utc>) -> IntentOutcome {
        match self.alerts.switch_mode(mode, now).await {
            None => IntentOutcome::default(),
            Some(outcome) => IntentOutcome {
                mode_changed: Some(mode),
                spoken: (outcome == SpeechOutcome::Spoken)
                    .then(|| mode_confirmation(mode).to_string()),
            },
        }
    }

    async fn announce(&mut self, text: String, now: DateTime<Utc>) -> IntentOutcome {
        let outcome = self.alerts.speak(SpeechRequest::new(text.clone(), now).priority()).await;
        IntentOutcome {
            mode_changed: None,
            spoken: (outcome == SpeechOutcome::Spoken).then_some(text),
        }
    }

    fn set_stage(&self, stage: PipelineStage) {
        self.snapshot.write().stage = stage;
    }

    fn publish(&self, stage: PipelineStage) {
        let mut snapshot = self.snapshot.write();
        snapshot.stage = stage;
        snapshot.dispatcher = self.alerts.snapshot();
        snapshot.tracked_labels = self.filter.tracked_labels();
        snapshot.frames_processed = self.frames_processed;
        snapshot.last_dispatched_seq = self.last_dispatched_seq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aroundme_eye::VisionError;
    use aroundme_spk::{CustomHapticSink, CustomSpeechSink};
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::{Duration, TimeZone};
    use ndarray::Array2;
    use parking_lot::Mutex;

    struct FixedEngine(Array2<f32>);

    #[async_trait]
    impl InferenceEngine for FixedEngine {
        async fn infer(&self, _frame: &Frame) -> Result<Array2<f32>, VisionError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(ms)
    }

    fn frame(ms: i64) -> Frame {
        Frame::new(Bytes::from_static(&[0u8; 4]), 100, 100, at(ms))
    }

    fn pipeline(output: Array2<f32>) -> (FramePipeline, Arc<Mutex<Vec<String>>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let sink_log = spoken.clone();
        let speech = CustomSpeechSink::always_idle("log", move |text, _| {
            sink_log.lock().push(text.to_string());
            Ok(())
        });

        let config = NavigatorConfig {
            vision: aroundme_eye::VisionConfig {
                labels: vec!["person".to_string(), "car".to_string()],
                ..Default::default()
            },
            ..NavigatorConfig::default()
        };

        let pipeline = FramePipeline::from_config(
            &config,
            Some(Arc::new(FixedEngine(output))),
            Arc::new(speech),
            Arc::new(CustomHapticSink::new(|_| Ok(()))),
        )
        .unwrap();
        (pipeline, spoken)
    }

    fn two_people() -> Array2<f32> {
        Array2::from_shape_vec(
            (2, 7),
            vec![
                0.2, 0.5, 0.1, 0.2, 0.9, 1.0, 0.0, //
                0.8, 0.5, 0.1, 0.2, 0.8, 1.0, 0.0,
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_stale_frame_is_not_dispatched() {
        let (mut pipeline, _) = pipeline(two_people());

        let report = pipeline.process(5, frame(0)).await;
        assert!(report.decision.is_some());

        let stale = pipeline.process(3, frame(100)).await;
        assert!(stale.decision.is_none());

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.last_dispatched_seq, Some(5));
        assert_eq!(snapshot.frames_processed, 2);
        assert_eq!(snapshot.stage, PipelineStage::Idle);
    }

    #[tokio::test]
    async fn test_scan_reports_confirmed_objects() {
        let (mut pipeline, spoken) = pipeline(two_people());

        let outcome = pipeline.apply_intent(VoiceIntent::RequestScan, at(0)).await;
        assert_eq!(outcome.spoken.as_deref(), Some("No objects detected"));

        pipeline.process(1, frame(100)).await;
        pipeline.process(2, frame(200)).await;
        let outcome = pipeline.apply_intent(VoiceIntent::RequestScan, at(300)).await;
        assert_eq!(outcome.spoken.as_deref(), Some("I can see 2 persons"));
        assert_eq!(spoken.lock().last().map(String::as_str), Some("I can see 2 persons"));
    }

    #[tokio::test]
    async fn test_describe_lists_descriptions() {
        let (mut pipeline, _) = pipeline(two_people());
        pipeline.process(1, frame(0)).await;
        pipeline.process(2, frame(100)).await;

        let outcome = pipeline.apply_intent(VoiceIntent::RequestDescribe, at(200)).await;
        assert_eq!(
            outcome.spoken.as_deref(),
            Some("Detailed scan. Person on your left, far away. Person on your right, far away. ")
        );
    }

    #[tokio::test]
    async fn test_mode_intents() {
        let (mut pipeline, spoken) = pipeline(two_people());

        let outcome = pipeline.apply_intent(VoiceIntent::SwitchToContinuous, at(0)).await;
        assert_eq!(outcome.mode_changed, Some(AlertMode::Continuous));
        assert_eq!(pipeline.snapshot().mode(), AlertMode::Continuous);

        let repeat = pipeline.apply_intent(VoiceIntent::SwitchToContinuous, at(10)).await;
        assert_eq!(repeat, IntentOutcome::default());

        let back = pipeline.apply_intent(VoiceIntent::SwitchToNormal, at(20)).await;
        assert_eq!(back.spoken.as_deref(), Some("Back to normal mode."));
        assert_eq!(spoken.lock().len(), 2);

        let unknown = pipeline.apply_intent(VoiceIntent::Unknown, at(30)).await;
        assert_eq!(unknown, IntentOutcome::default());
    }

    #[tokio::test]
    async fn test_continuous_mode_reads_everything() {
        let (mut pipeline, spoken) = pipeline(two_people());
        pipeline.apply_intent(VoiceIntent::SwitchToContinuous, at(0)).await;

        pipeline.process(1, frame(100)).await;
        let report = pipeline.process(2, frame(200)).await;
        let decision = report.decision.unwrap();
        assert_eq!(
            decision.text.as_deref(),
            Some("Person on your left, far away. Person on your right, far away")
        );
        assert_eq!(spoken.lock().len(), 2);
    }
}
