//! Server errors.

use std::io;

/// Why the listening socket could not be acquired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindFailureKind {
    /// The port needs elevated privileges.
    PermissionDenied,
    /// Another process holds the port.
    AddressInUse,
    /// Anything else, such as an unparseable host.
    Other,
}

impl BindFailureKind {
    /// Classify the error returned by `bind`.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::AddrInUse => Self::AddressInUse,
            _ => Self::Other,
        }
    }

    /// Operator-facing advice for this failure.
    pub fn hint(self, port: u16) -> Option<String> {
        match self {
            Self::PermissionDenied => Some(
                "Try running with elevated privileges or use a port > 1024.".into(),
            ),
            Self::AddressInUse => {
                Some(format!("Port {port} is already in use. Try a different port."))
            }
            Self::Other => None,
        }
    }
}

/// Failures of the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The `host:port` that was attempted.
        addr: String,
        /// Port, kept separately for the hint.
        port: u16,
        /// Why the bind failed.
        kind: BindFailureKind,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Listener or serve loop I/O failure.
    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ServerError {
    /// Classify a bind failure.
    pub fn bind(addr: String, port: u16, source: io::Error) -> Self {
        Self::Bind {
            addr,
            port,
            kind: BindFailureKind::from_io(&source),
            source,
        }
    }

    /// Operator advice for bind failures.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Bind { kind, port, .. } => kind.hint(*port),
            Self::Io(_) => None,
        }
    }
}
