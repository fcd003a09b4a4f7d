use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to cast FFmpeg decoder")]
    Cast,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("invalid media URL `{0}`")]
    Uri(String),
    #[error("failed to get media capabilities")]
    Caps,
    #[error("failed to initialize FFmpeg")]
    Init,
    #[error("invalid framerate: {0}")]
    Framerate(f64),
    #[error("audio output unavailable: {0}")]
    Audio(String),
}
