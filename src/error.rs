use std::{io, path::PathBuf, process::ExitStatus};

/// Errors surfaced by the reminder service and its configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The trigger date was not `YYYY-MM-DD`.
    #[error("invalid trigger date `{input}`")]
    InvalidDate {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The trigger time was not `HH:MM`.
    #[error("invalid trigger time `{input}`")]
    InvalidTime {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("couldn't start the alarm run-loop")]
    RunLoop(#[source] io::Error),

    #[error("couldn't access config file {}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't parse config file")]
    ConfigParse(#[from] toml::de::Error),

    #[error("couldn't serialize config")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("couldn't find a config directory for this platform")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a content fetch came back empty. Stays inside the content providers.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payload is missing `{0}`")]
    Malformed(&'static str),
}

/// Failure reported by a [`Speaker`](crate::speaker::Speaker).
#[derive(Debug, thiserror::Error)]
pub enum SpeakError {
    /// Another utterance is in progress; try again later.
    #[error("speaker is busy")]
    Busy,

    #[error("couldn't start speech command: {0}")]
    Spawn(#[source] io::Error),

    #[error("speech command exited with {0}")]
    Exit(ExitStatus),
}
