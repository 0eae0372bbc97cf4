//! Outbound email type and MIME assembly.

use std::fs;
use std::path::{Path, PathBuf};

use lettre::address::{Address, Envelope};
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::Message;

use crate::error::{AttachmentReadError, Error, Result};

/// A plain-text email with optional file attachments, sent to one recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from_name: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

impl OutgoingEmail {
    pub fn new(
        from_name: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Append an attachment. Files are read when the message is built.
    #[must_use]
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    /// Transport-level sender and recipient.
    ///
    /// The recipient header may carry a display name; only its address goes
    /// into the envelope.
    pub fn envelope(&self) -> Result<Envelope> {
        let sender: Address = self.sender.parse()?;
        let recipient = parse_recipient(&self.recipient)?;
        Envelope::new(Some(sender), vec![recipient.email])
            .map_err(|e| Error::Address(e.to_string()))
    }

    /// Assemble the full MIME message, reading every attachment.
    ///
    /// Fails without side effects if any attachment is unreadable.
    pub fn to_message(&self) -> Result<Message> {
        let sender: Address = self.sender.parse()?;
        let name = Some(self.from_name.trim())
            .filter(|n| !n.is_empty())
            .map(String::from);
        let from = Mailbox::new(name, sender);
        let to = parse_recipient(&self.recipient)?;

        let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
        for path in &self.attachments {
            multipart = multipart.singlepart(attachment_part(path)?);
        }

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.as_str())
            .envelope(self.envelope()?)
            .multipart(multipart)?;

        Ok(message)
    }
}

fn parse_recipient(recipient: &str) -> Result<Mailbox> {
    recipient
        .parse()
        .map_err(|e| Error::Address(format!("invalid recipient {recipient:?}: {e}")))
}

/// Read `path` into an `application/octet-stream` part named after its base name.
///
/// Always base64, so the bytes arrive unchanged whatever their line endings.
fn attachment_part(path: &Path) -> Result<SinglePart> {
    let data = fs::read(path).map_err(|source| AttachmentReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let body = Body::new_with_encoding(data, ContentTransferEncoding::Base64)
        .map_err(|_| Error::Message(format!("cannot encode {}", path.display())))?;

    let filename = attachment_name(path);
    let content_type = octet_stream_named(&filename)?;
    Ok(Attachment::new(filename).body(body, content_type))
}

/// File name without directory components.
#[must_use]
pub fn attachment_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// `application/octet-stream` with a `name` parameter.
///
/// Names that cannot sit in a quoted string use the RFC 2231 form
/// `name*=utf-8''<percent-encoded>`.
fn octet_stream_named(filename: &str) -> Result<ContentType> {
    let param = if is_quotable(filename) {
        format!("name=\"{filename}\"")
    } else {
        format!("name*=utf-8''{}", urlencoding::encode(filename))
    };
    ContentType::parse(&format!("application/octet-stream; {param}"))
        .map_err(|e| Error::Message(format!("cannot name attachment {filename:?}: {e}")))
}

fn is_quotable(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\')
}
