use thiserror::Error;

/// Everything that can go wrong while configuring or showing a splash window.
///
/// Native failures never cross the UI thread boundary as a panic; the thread
/// records them (see `SplashWindow::last_error`) and exits without a window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplashError {
    #[error("splash window is live; configuration can only change before show or after close")]
    InvalidState,
    #[error("minimum duration {0} ms is out of range")]
    OutOfRange(i64),
    #[error("no splash image configured")]
    MissingImage,
    #[error("invalid splash image: {0}")]
    InvalidImage(String),
    #[error("invalid value for {key}: {value:?}")]
    Config { key: &'static str, value: String },
    #[error("window class registration failed: {0}")]
    ClassRegistration(String),
    #[error("window creation failed: {0}")]
    WindowCreation(String),
    #[error("splash windows are not supported on this platform")]
    Unsupported,
    #[error("failed to spawn splash thread: {0}")]
    Thread(String),
}

pub type Result<T> = std::result::Result<T, SplashError>;
