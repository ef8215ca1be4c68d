use nix::sys::signal::Signal;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("failed to run command \"{prog}\": {source}")]
    Spawn { prog: String, source: io::Error },

    #[error("command \"{prog}\" exited with status {code}")]
    Exit { prog: String, code: i32 },

    #[error("command \"{prog}\" was terminated by signal {signal}")]
    Signaled { prog: String, signal: Signal },

    #[error("failed to remove work directory {}: {source}", path.display())]
    ClearWorkspace { path: PathBuf, source: io::Error },

    #[error("source directory {} was not created", .0.display())]
    MissingSource(PathBuf),

    #[error("invalid version \"{0}\": must be a plain directory name")]
    InvalidVersion(String),

    #[error("{context}: {source}")]
    Io { context: String, source: io::Error },

    #[error("failed to download {url}: {source}")]
    Download { url: String, source: reqwest::Error },

    #[error("failed to render configure script: {0}")]
    Template(#[from] minijinja::Error),
}

impl Error {
    pub(crate) fn io<C: Into<String>>(context: C) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| Error::Io { context, source }
    }

    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            // shell convention for a child that died from a signal
            Error::Signaled { signal, .. } => 128 + *signal as i32,
            _ => 1,
        }
    }
}

/// A fatal pipeline error plus the log file of the phase that produced it,
/// if that phase was capturing output.
#[derive(Debug)]
pub(crate) struct Failure {
    pub(crate) error: Error,
    pub(crate) log: Option<PathBuf>,
}

impl Failure {
    pub(crate) fn with_log(error: Error, log: &Path) -> Self {
        Self {
            error,
            log: Some(log.to_path_buf()),
        }
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Self { error, log: None }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}
