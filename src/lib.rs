//! Send plain-text emails with file attachments over a single authenticated
//! SMTP session.
//!
//! ```no_run
//! use smtp_mailer::{Mailer, MailerConfig};
//!
//! # fn main() -> smtp_mailer::Result<()> {
//! let config = MailerConfig::new("smtp.example.com", 587, "user@example.com", "secret");
//! let mut mailer = Mailer::connect(config)?;
//! mailer.send(
//!     "Alice",
//!     "alice@example.com",
//!     "bob@example.com",
//!     "Hi",
//!     "Hello Bob",
//!     &["report.pdf".into()],
//! )?;
//! mailer.close()?;
//! # Ok(())
//! # }
//! ```

mod config;
mod email;
mod error;
mod mailer;
mod tls;

pub use config::{parse_port, MailerConfig, Security, DEFAULT_TIMEOUT};
pub use email::{attachment_name, OutgoingEmail};
pub use error::{AttachmentReadError, Error, Result, Stage, TransportError};
pub use mailer::Mailer;
