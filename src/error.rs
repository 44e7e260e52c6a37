use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid hide pattern '{pattern}': {source}")]
    HidePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Catalog source failed: {0}")]
    Source(String),

    #[error("Invalid launch command for '{0}'")]
    InvalidCommand(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Keyboard focus unavailable: {0}")]
    FocusUnavailable(String),

    #[error("Pointer capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("No running launcher (pid file {0})")]
    NotRunning(std::path::PathBuf),

    #[error("Launcher already running (pid {pid}, pid file {path})")]
    AlreadyRunning {
        pid: i32,
        path: std::path::PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, LauncherError>;
