use thiserror::Error;

pub type Result<T> = std::result::Result<T, HalError>;

#[derive(Debug, Error)]
pub enum HalError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    InvalidRepresentation(#[from] InvalidRepresentation),

    #[error("no transport configured to fetch {0}")]
    NoTransport(String),

    #[error("representation has no self link")]
    MissingSelf,

    #[error("expected exactly one representation, found {0}")]
    NotSingular(usize),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport: {0}")]
    Transport(#[from] anyhow::Error),
}

impl HalError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// JSON Pointer of the offending entry, for shape violations only.
    pub fn pointer(&self) -> Option<&str> {
        match self {
            Self::InvalidRepresentation(e) => Some(&e.pointer),
            _ => None,
        }
    }
}

/// A HAL document violated the shape contract at `pointer`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid HAL representation at '{pointer}': {reason}")]
pub struct InvalidRepresentation {
    /// RFC 6901 pointer into the document.
    pub pointer: String,
    pub reason: String,
}

impl InvalidRepresentation {
    pub fn new(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }
}

/// Build an RFC 6901 pointer from unescaped reference tokens.
pub fn json_pointer<I, S>(tokens: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens.into_iter().fold(String::new(), |mut acc, token| {
        acc.push('/');
        acc.push_str(&token.as_ref().replace('~', "~0").replace('/', "~1"));
        acc
    })
}
