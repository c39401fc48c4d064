use std::fmt;

/// Keys and `Index <n>` components leading to a value, outermost first.
pub type CodingPath = Vec<String>;

#[must_use]
pub fn child_path(path: &[String], key: &str) -> CodingPath {
    let mut child = path.to_vec();
    child.push(key.to_string());
    child
}

#[must_use]
pub fn index_key(index: usize) -> String {
    format!("Index {index}")
}

fn render_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DecodingError {
    KeyNotFound {
        key: String,
        path: CodingPath,
    },
    ValueNotFound {
        ty: String,
        path: CodingPath,
        description: String,
    },
    TypeMismatch {
        expected: String,
        path: CodingPath,
        description: String,
    },
}

impl DecodingError {
    #[must_use]
    pub fn path(&self) -> &[String] {
        match self {
            DecodingError::KeyNotFound { path, .. }
            | DecodingError::ValueNotFound { path, .. }
            | DecodingError::TypeMismatch { path, .. } => path,
        }
    }
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodingError::KeyNotFound { key, path } => write!(
                f,
                "no value associated with key '{key}' at {}",
                render_path(path)
            ),
            DecodingError::ValueNotFound {
                ty,
                path,
                description,
            } => write!(f, "{description} ({ty} at {})", render_path(path)),
            DecodingError::TypeMismatch {
                expected,
                path,
                description,
            } => write!(f, "{description} ({expected} at {})", render_path(path)),
        }
    }
}

impl std::error::Error for DecodingError {}

#[derive(Clone, Debug, PartialEq)]
pub enum EncodingError {
    InvalidValue {
        ty: String,
        path: CodingPath,
        description: String,
    },
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::InvalidValue {
                ty,
                path,
                description,
            } => write!(f, "{description} ({ty} at {})", render_path(path)),
        }
    }
}

impl std::error::Error for EncodingError {}

/// Failure while running synthesized bodies.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalError {
    Decoding(DecodingError),
    Encoding(EncodingError),
    /// Construct the evaluator has no runtime model for, such as a
    /// user-written body.
    Unsupported(String),
}

impl EvalError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        EvalError::Unsupported(message.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Decoding(error) => write!(f, "decoding error: {error}"),
            EvalError::Encoding(error) => write!(f, "encoding error: {error}"),
            EvalError::Unsupported(message) => write!(f, "unsupported: {message}"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Decoding(error) => Some(error),
            EvalError::Encoding(error) => Some(error),
            EvalError::Unsupported(_) => None,
        }
    }
}

impl From<DecodingError> for EvalError {
    fn from(error: DecodingError) -> Self {
        EvalError::Decoding(error)
    }
}

impl From<EncodingError> for EvalError {
    fn from(error: EncodingError) -> Self {
        EvalError::Encoding(error)
    }
}
