use thiserror::Error;

/// Errors raised by the engine core.
///
/// `AlreadyStarted`, `CameraWithoutTarget` and `PanelWithoutTag` are misuse of the API and are
/// raised as panics carrying this message. The remaining variants are returned to callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine already started: start() may only be called once")]
    AlreadyStarted,

    #[error("camera update without a target: call follow() first")]
    CameraWithoutTarget,

    #[error("UI panel requires a non-empty tag")]
    PanelWithoutTag,

    #[error("unknown scene {0:?}")]
    UnknownScene(String),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
}
