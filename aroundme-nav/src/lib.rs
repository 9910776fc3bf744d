//! aroundme-nav: the navigation pipeline
//!
//! Wires detection, confirmation, spatial classification and alerting into a
//! frame-driven worker with frame skipping, backpressure and voice intents.

pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod scene;

pub use config::{BackpressurePolicy, NavigatorConfig};
pub use driver::{PipelineDriver, SubmitOutcome};
pub use error::NavigationError;
pub use events::{DropReason, PipelineEvent, VoiceIntent};
pub use pipeline::{
    FrameAnalysis, FramePipeline, FrameReport, IntentOutcome, PipelineSnapshot, PipelineStage,
};
