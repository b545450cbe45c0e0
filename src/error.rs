use thiserror::Error;

/// Failures bringing up or resuming the audio subsystem.
///
/// Nothing on the scheduling path returns these; once the device is running
/// every failure degrades to silence instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no default output device")]
    NoOutputDevice,

    #[error("no default output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format {0:?} (only f32 supported for now)")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn scheduler thread: {0}")]
    SpawnScheduler(#[from] std::io::Error),
}

/// Why a composer's response couldn't be used as-is.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("response is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response has no usable notes ({rejected} rejected)")]
    NoUsableNotes { rejected: usize },
}
