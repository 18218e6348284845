use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Whether this error is the closed-buffer class (including use of a
    /// source handle after `send`).
    pub fn is_closed(&self) -> bool {
        matches!(self.kind(), ErrorKind::BufferClosed)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.kind(), ErrorKind::BufferReadOnly)
    }

    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfBounds { .. })
    }

    pub fn closed() -> Error {
        Error(ErrorKind::BufferClosed.into())
    }

    pub fn read_only() -> Error {
        Error(ErrorKind::BufferReadOnly.into())
    }

    pub fn out_of_bounds(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::OutOfBounds {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("out of bounds for {name}: {message}")]
    OutOfBounds { name: String, message: String },

    #[error("buffer is closed")]
    BufferClosed,

    #[error("buffer is read-only")]
    BufferReadOnly,

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
