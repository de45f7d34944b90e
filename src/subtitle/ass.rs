// ASS subtitle documents for burned word captions
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::files::{remove_if_exists, scratch_path};
use crate::transcribe::WordToken;

use super::time::format_ass_time;

/// Header used when no template file is present.
pub const DEFAULT_ASS_HEADER: &str = "[Script Info]
Title: Generated ASS file
ScriptType: v4.00+


[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial Black,20,&H0000FFFF,&H000000FF,&H00000000,&H00000000,-1,0,0,0,100,100,0,0,1,2,0,5,0,0,0,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

/// Builds caption documents from word tokens.
#[derive(Debug, Clone)]
pub struct CaptionBuilder {
    header: String,
}

impl Default for CaptionBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ASS_HEADER)
    }
}

impl CaptionBuilder {
    pub fn new(header: impl Into<String>) -> Self {
        let mut header = header.into();
        if !header.ends_with('\n') {
            header.push('\n');
        }
        Self { header }
    }

    /// Read the header template, falling back to the built-in one if the
    /// file does not exist.
    pub fn load(header_path: &Path) -> Result<Self> {
        if !header_path.exists() {
            warn!(
                "ASS header template {} not found, using built-in header",
                header_path.display()
            );
            return Ok(Self::default());
        }
        Ok(Self::new(fs::read_to_string(header_path)?))
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Render the document. Word text is copied as-is: `{`, `}` and `\N`
    /// inside a word are interpreted by the renderer.
    pub fn render(&self, words: &[WordToken]) -> String {
        let mut out = String::with_capacity(self.header.len() + words.len() * 64);
        out.push_str(&self.header);
        for word in words {
            out.push_str(&dialogue_line(word));
        }
        out
    }

    /// Render the document into a fresh scratch file in `temp_dir`.
    pub fn write(&self, words: &[WordToken], temp_dir: &Path) -> Result<PathBuf> {
        let path = scratch_path(temp_dir, "ass")?;
        if let Err(e) = fs::write(&path, self.render(words)) {
            remove_if_exists(&path);
            return Err(e.into());
        }

        info!("Subtitles file created: {} ({} words)", path.display(), words.len());
        Ok(path)
    }
}

pub fn dialogue_line(word: &WordToken) -> String {
    format!(
        "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
        format_ass_time(word.start),
        format_ass_time(word.end),
        word.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(start: f64, end: f64, text: &str) -> WordToken {
        WordToken {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_dialogue_line() {
        assert_eq!(
            dialogue_line(&word(1.5, 2.25, "Hello")),
            "Dialogue: 0,00:00:01.50,00:00:02.25,Default,,0,0,0,,Hello\n"
        );
    }

    #[test]
    fn test_text_is_not_escaped() {
        let line = dialogue_line(&word(0.0, 1.0, "{\\b1}bold,yes"));
        assert!(line.ends_with(",,{\\b1}bold,yes\n"));
    }

    #[test]
    fn test_render_header_then_lines() {
        let builder = CaptionBuilder::default();
        let words = vec![
            word(0.0, 0.5, "one"),
            word(0.5, 1.25, "two"),
            word(61.5, 62.75, "three"),
        ];

        let doc = builder.render(&words);
        assert!(doc.starts_with(DEFAULT_ASS_HEADER));

        let body = &doc[DEFAULT_ASS_HEADER.len()..];
        assert_eq!(
            body,
            "Dialogue: 0,00:00:00.00,00:00:00.50,Default,,0,0,0,,one\n\
             Dialogue: 0,00:00:00.50,00:00:01.25,Default,,0,0,0,,two\n\
             Dialogue: 0,00:01:01.50,00:01:02.75,Default,,0,0,0,,three\n"
        );
    }

    #[test]
    fn test_header_gets_trailing_newline() {
        let builder = CaptionBuilder::new("[Script Info]");
        assert_eq!(builder.header(), "[Script Info]\n");
        assert_eq!(builder.render(&[]), "[Script Info]\n");
    }

    #[test]
    fn test_load_missing_template_uses_default() {
        let builder = CaptionBuilder::load(Path::new("/nonexistent/ass_header.txt")).unwrap();
        assert_eq!(builder.header(), DEFAULT_ASS_HEADER);
    }

    #[test]
    fn test_load_template_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.txt");
        fs::write(&path, "[Script Info]\nTitle: custom\n").unwrap();

        let builder = CaptionBuilder::load(&path).unwrap();
        assert_eq!(builder.header(), "[Script Info]\nTitle: custom\n");
    }

    #[test]
    fn test_write_creates_scratch_document() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CaptionBuilder::default();

        let path = builder.write(&[word(0.0, 1.0, "hi")], dir.path()).unwrap();
        assert_eq!(path.extension().unwrap(), "ass");
        assert_eq!(fs::read_to_string(&path).unwrap(), builder.render(&[word(0.0, 1.0, "hi")]));
    }
}
