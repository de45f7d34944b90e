pub mod ass;
pub mod time;

pub use ass::{dialogue_line, CaptionBuilder, DEFAULT_ASS_HEADER};
pub use time::format_ass_time;
