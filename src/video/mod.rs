pub mod burn;
pub mod compose;
pub mod segment;

pub use burn::burn_captions;
pub use compose::{Composer, Composition};
pub use segment::{choose_start, last_valid_start, trim_segment, SubClip};

/// Audio encoder for every re-encoded output.
pub const AUDIO_CODEC: &str = "aac";
