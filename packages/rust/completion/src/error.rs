/// Why a completion call produced no text.
///
/// None of these abort a run; callers fall back on every variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx with an error object instead of choices.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("response contained no text")]
    EmptyResponse,
}

impl CompletionError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
