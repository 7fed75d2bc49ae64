/// Errors that can occur inside the tracking core.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("External SLAM system failed to initialize: {0}")]
    SlamInit(String),

    #[error("SLAM config file not found: {0:?}")]
    ConfigNotFound(std::path::PathBuf),

    #[error("Invalid sample: {0}")]
    InvalidSample(&'static str),

    #[error("Unknown input name: {0}")]
    UnknownInput(String),

    #[error("Unknown output name: {0}")]
    UnknownOutput(String),

    #[error("Device has been shut down")]
    DeviceStopped,

    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
