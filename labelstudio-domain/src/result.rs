use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
};

/// Coarse classification of what went wrong. Lets callers decide whether a failure is a
/// recoverable no-op (e.g., [`ErrorKind::NotFound`]) or has to be reported upwards.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
pub enum ErrorKind {
    /// An update or removal referenced an id that does not exist.
    NotFound,
    /// Numerically unusable input such as a zero-length ray direction.
    DegenerateInput,
    /// Reading or writing a file failed.
    Io,
    /// A file could be read but its content is malformed.
    Parse,
    #[default]
    Other,
}

/// Error type of the annotation core. Carries a human readable message and an [`ErrorKind`].
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct LsError {
    kind: ErrorKind,
    msg: String,
}
impl LsError {
    pub fn new(msg: &str) -> LsError {
        LsError {
            kind: ErrorKind::Other,
            msg: msg.to_string(),
        }
    }
    pub fn with_kind(kind: ErrorKind, msg: &str) -> LsError {
        LsError {
            kind,
            msg: msg.to_string(),
        }
    }
    pub fn not_found(msg: &str) -> LsError {
        Self::with_kind(ErrorKind::NotFound, msg)
    }
    pub fn degenerate(msg: &str) -> LsError {
        Self::with_kind(ErrorKind::DegenerateInput, msg)
    }
    pub fn msg(&self) -> &str {
        &self.msg
    }
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}
impl Display for LsError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.msg)
    }
}
impl Error for LsError {}
impl From<&str> for LsError {
    fn from(value: &str) -> Self {
        LsError::new(value)
    }
}
impl From<std::io::Error> for LsError {
    fn from(e: std::io::Error) -> Self {
        LsError::with_kind(ErrorKind::Io, &e.to_string())
    }
}
impl From<serde_json::Error> for LsError {
    fn from(e: serde_json::Error) -> Self {
        let kind = if e.is_io() {
            ErrorKind::Io
        } else {
            ErrorKind::Parse
        };
        LsError::with_kind(kind, &e.to_string())
    }
}

/// Result type of the annotation core with [`LsError`] as error type.
pub type LsResult<U> = Result<U, LsError>;

/// Creates an [`LsError`] with a formatted message.
/// ```rust
/// use labelstudio_domain::{lserr, LsError};
/// assert_eq!(lserr!("some error {}", 1), LsError::new(format!("some error {}", 1).as_str()));
/// ```
#[macro_export]
macro_rules! lserr {
    ($s:literal) => {
        $crate::LsError::new(format!($s).as_str())
    };
    ($s:literal, $( $exps:expr ),*) => {
        $crate::LsError::new(format!($s, $($exps,)*).as_str())
    }
}

pub fn to_ls<E: Debug>(e: E) -> LsError {
    lserr!(
        "original error type is '{:?}', error message is '{:?}'",
        std::any::type_name::<E>(),
        e
    )
}

#[test]
fn test_error_kind() {
    let e = LsError::not_found("keypoint 3");
    assert_eq!(e.kind(), ErrorKind::NotFound);
    assert_eq!(e.msg(), "keypoint 3");
    assert_eq!(format!("{e}"), "NotFound: keypoint 3");
    let e: LsError = serde_json::from_str::<Vec<u8>>("[1, 2").unwrap_err().into();
    assert_eq!(e.kind(), ErrorKind::Parse);
    assert_eq!(lserr!("x {}", 2).kind(), ErrorKind::Other);
    let e = to_ls(std::fmt::Error);
    assert_eq!(e.kind(), ErrorKind::Other);
    assert!(e.msg().contains("fmt::Error"));
}
