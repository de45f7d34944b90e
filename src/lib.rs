pub mod config;
pub mod error;
pub mod files;
pub mod media;
pub mod pipeline;
pub mod subtitle;
pub mod transcribe;
pub mod video;

pub use config::{Config, VideoCodec};
pub use error::{Result, SplitcapError};
pub use pipeline::{print_summary, BatchReport, Pipeline, RunStage, VideoOutcome, VideoReport};
