//! Error types for smtp-mailer.

use std::fmt;
use std::io;
use std::path::PathBuf;

use lettre::transport::smtp;

/// Main error type for mailer operations.
#[derive(Debug)]
pub enum Error {
    /// Connection, TLS upgrade, authentication or send-time failures
    Transport(TransportError),
    /// An attachment could not be opened or read
    AttachmentRead(AttachmentReadError),
    /// Sender or recipient is not a usable mail address
    Address(String),
    /// MIME assembly errors
    Message(String),
    /// CA file and TLS parameter errors
    Tls(String),
    /// Configuration errors
    Config(String),
}

/// The step of the session lifecycle a transport failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    StartTls,
    Auth,
    Send,
    Quit,
}

/// Failures reported by the mail server or the network layer.
#[derive(Debug)]
pub enum TransportError {
    /// TCP connect, greeting or EHLO failed
    Connect(smtp::Error),
    /// STARTTLS required but not advertised by the server
    StartTlsUnsupported,
    /// STARTTLS handshake failed
    StartTls(smtp::Error),
    /// Server rejected the credentials or no mechanism matched
    Auth(smtp::Error),
    /// Envelope or data rejected, or the connection failed mid-send
    Send(smtp::Error),
    /// QUIT failed; the connection was aborted
    Quit(smtp::Error),
    /// The session was closed before this call
    SessionClosed,
}

/// An attachment path that could not be read.
#[derive(Debug)]
pub struct AttachmentReadError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl TransportError {
    /// The lifecycle step that failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Connect(_) => Stage::Connect,
            Self::StartTlsUnsupported | Self::StartTls(_) => Stage::StartTls,
            Self::Auth(_) => Stage::Auth,
            Self::Send(_) | Self::SessionClosed => Stage::Send,
            Self::Quit(_) => Stage::Quit,
        }
    }

    /// Whether the server answered with a permanent (5xx) failure.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Connect(e) | Self::StartTls(e) | Self::Auth(e) | Self::Send(e) | Self::Quit(e) => {
                e.is_permanent()
            }
            Self::StartTlsUnsupported | Self::SessionClosed => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::AttachmentRead(e) => write!(f, "attachment error: {e}"),
            Self::Address(msg) => write!(f, "address error: {msg}"),
            Self::Message(msg) => write!(f, "message error: {msg}"),
            Self::Tls(msg) => write!(f, "TLS error: {msg}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::StartTls => "starttls",
            Self::Auth => "auth",
            Self::Send => "send",
            Self::Quit => "quit",
        };
        f.write_str(name)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "connection failed: {e}"),
            Self::StartTlsUnsupported => write!(f, "server does not offer STARTTLS"),
            Self::StartTls(e) => write!(f, "STARTTLS failed: {e}"),
            Self::Auth(e) => write!(f, "authentication failed: {e}"),
            Self::Send(e) => write!(f, "send failed: {e}"),
            Self::Quit(e) => write!(f, "quit failed: {e}"),
            Self::SessionClosed => write!(f, "session is closed"),
        }
    }
}

impl fmt::Display for AttachmentReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot read {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::AttachmentRead(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect(e) | Self::StartTls(e) | Self::Auth(e) | Self::Send(e) | Self::Quit(e) => {
                Some(e)
            }
            Self::StartTlsUnsupported | Self::SessionClosed => None,
        }
    }
}

impl std::error::Error for AttachmentReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<AttachmentReadError> for Error {
    fn from(e: AttachmentReadError) -> Self {
        Self::AttachmentRead(e)
    }
}

impl From<lettre::address::AddressError> for Error {
    fn from(e: lettre::address::AddressError) -> Self {
        Self::Address(e.to_string())
    }
}

impl From<lettre::error::Error> for Error {
    fn from(e: lettre::error::Error) -> Self {
        Self::Message(e.to_string())
    }
}

/// Result type alias for mailer operations.
pub type Result<T> = std::result::Result<T, Error>;
