pub mod audio;
pub mod ffmpeg;

pub use audio::extract_audio;
pub use ffmpeg::{parse_duration, Ffmpeg};

use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::error::Result;

/// Argument list for a single ffmpeg run, without the program name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn as_args(&self) -> &[OsString] {
        &self.args
    }

    /// The output file, which is always the last argument.
    pub fn output(&self) -> Option<&Path> {
        self.args.last().map(Path::new)
    }

    /// Value following the first occurrence of `flag`.
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// All values following each occurrence of `flag`.
    pub fn values_of(&self, flag: &str) -> Vec<&OsStr> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_os_str())
            .collect()
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<_> = self.args.iter().map(|a| a.to_string_lossy()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// The external transcoding toolchain.
pub trait MediaTool: Send + Sync {
    /// Run ffmpeg with the given arguments, failing on a non-zero exit.
    fn run(&self, invocation: &Invocation) -> Result<()>;

    /// Container duration in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64>;
}
