use camino::Utf8PathBuf;

/// Any error that an [`ObjectStorage`](crate::ObjectStorage) implementation may
/// report. The facade never inspects it, it only forwards it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The coarse category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad credentials or options, or no bucket could be resolved. Raised before
    /// any network call.
    Configuration,
    /// Fetching a remote url failed.
    Network,
    /// Reading or writing a local file failed.
    Io,
    /// The object storage service reported a failure.
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("s3 {0} must not be empty")]
    EmptyCredential(&'static str),

    #[error("please specify a bucket or set a default bucket")]
    NoBucket,

    #[error("part size must be greater than zero")]
    InvalidPartSize,

    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("io error on {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("s3 {op} request failed")]
    Storage {
        op: &'static str,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyCredential(_) | Error::NoBucket | Error::InvalidPartSize => {
                ErrorKind::Configuration
            }
            Error::Fetch { .. } => ErrorKind::Network,
            Error::Io { .. } => ErrorKind::Io,
            Error::Storage { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn fetch(url: &str, source: reqwest::Error) -> Self {
        Error::Fetch {
            url: url.to_owned(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn storage(op: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Storage {
            op,
            source: source.into(),
        }
    }
}
