//! Authenticated SMTP session reused across sends.

use std::path::PathBuf;

use lettre::address::Envelope;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::SmtpConnection;
use lettre::transport::smtp::commands::{Data, Mail, Rcpt, Rset};
use lettre::transport::smtp::extension::{ClientId, Extension, MailBodyParameter, MailParameter};
use lettre::transport::smtp::response::Response;
use lettre::transport::smtp::Error as SmtpError;
use tracing::{debug, info, warn};

use crate::config::{MailerConfig, Security};
use crate::email::OutgoingEmail;
use crate::error::{Error, Result, TransportError};
use crate::tls;

enum Session {
    Connected(SmtpConnection),
    Closed,
}

/// Owns one authenticated connection to a mail server.
///
/// A `Mailer` is connected from the moment it exists until [`close`](Self::close)
/// is called, the connection breaks, or it is dropped. Dropping a connected
/// mailer sends `QUIT`.
pub struct Mailer {
    config: MailerConfig,
    session: Session,
}

impl Mailer {
    /// Connect with STARTTLS, trusting `cafile` in addition to the built-in roots.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        cafile: Option<PathBuf>,
    ) -> Result<Self> {
        let mut config = MailerConfig::new(host, port, username, password);
        config.cafile = cafile;
        Self::connect(config)
    }

    /// Open, encrypt and authenticate a session.
    ///
    /// Nothing is returned unless every step succeeded; a half-open
    /// connection is aborted before the error is reported.
    pub fn connect(config: MailerConfig) -> Result<Self> {
        config.validate()?;

        let hello_name = config
            .hello_name
            .clone()
            .map_or_else(ClientId::default, ClientId::Domain);

        let tls_parameters = match config.security {
            Security::None => None,
            Security::StartTls | Security::Wrapper => Some(tls::build_parameters(
                &config.host,
                config.cafile.as_deref(),
            )?),
        };
        let wrapper = match config.security {
            Security::Wrapper => tls_parameters.as_ref(),
            Security::StartTls | Security::None => None,
        };

        let mut conn = SmtpConnection::connect(
            (config.host.as_str(), config.port),
            config.timeout,
            &hello_name,
            wrapper,
            None,
        )
        .map_err(TransportError::Connect)?;
        debug!("Connected to {}:{}", config.host, config.port);

        if let (Security::StartTls, Some(params)) = (config.security, &tls_parameters) {
            if !conn.can_starttls() {
                conn.abort();
                return Err(TransportError::StartTlsUnsupported.into());
            }
            if let Err(e) = conn.starttls(params, &hello_name) {
                conn.abort();
                return Err(TransportError::StartTls(e).into());
            }
            debug!("Upgraded connection to {} to TLS", config.host);
        }

        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        if let Err(e) = conn.auth(&[Mechanism::Plain, Mechanism::Login], &credentials) {
            conn.abort();
            return Err(TransportError::Auth(e).into());
        }

        info!(
            "SMTP session open to {}:{} as {}",
            config.host, config.port, config.username
        );

        Ok(Self {
            config,
            session: Session::Connected(conn),
        })
    }

    /// Send a plain-text email with the given attachments.
    pub fn send(
        &mut self,
        from_name: &str,
        sender_addr: &str,
        receiver_addr: &str,
        subject: &str,
        body: &str,
        attachments: &[PathBuf],
    ) -> Result<()> {
        let email = OutgoingEmail {
            from_name: from_name.to_string(),
            sender: sender_addr.to_string(),
            recipient: receiver_addr.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: attachments.to_vec(),
        };
        self.send_email(&email)
    }

    /// Send a prepared email over the open session.
    ///
    /// The message, attachments included, is fully assembled before any
    /// command goes out. A rejected transaction is reset so the session can
    /// be used again; a connection that cannot be reset is closed.
    pub fn send_email(&mut self, email: &OutgoingEmail) -> Result<()> {
        let Session::Connected(conn) = &mut self.session else {
            return Err(TransportError::SessionClosed.into());
        };

        let message = email.to_message()?;
        let formatted = message.formatted();
        let parameters = mail_parameters(conn, message.envelope())?;

        match transact(conn, message.envelope(), parameters, &formatted) {
            Ok(response) => {
                info!(
                    "Sent message to {} ({} bytes, {})",
                    email.recipient,
                    formatted.len(),
                    response.code()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Send to {} failed: {e}", email.recipient);
                if let Err(reset) = conn.command(Rset) {
                    warn!("Cannot reset session, closing it: {reset}");
                    conn.abort();
                    self.session = Session::Closed;
                }
                Err(TransportError::Send(e).into())
            }
        }
    }

    /// Send `QUIT` and release the connection. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.session, Session::Closed) {
            Session::Connected(mut conn) => {
                conn.quit().map_err(TransportError::Quit)?;
                info!("SMTP session to {} closed", self.config.host);
                Ok(())
            }
            Session::Closed => {
                debug!("SMTP session to {} already closed", self.config.host);
                Ok(())
            }
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.session, Session::Connected(_))
    }

    #[must_use]
    pub const fn config(&self) -> &MailerConfig {
        &self.config
    }
}

impl Drop for Mailer {
    fn drop(&mut self) {
        if !self.is_connected() {
            return;
        }
        if let Err(e) = self.close() {
            debug!("Error closing SMTP session on drop: {e}");
        }
    }
}

/// `MAIL FROM` parameters for `envelope`, given what the server advertised.
///
/// Non-ASCII envelope addresses need SMTPUTF8; without it the send fails
/// before anything is transmitted.
fn mail_parameters(conn: &SmtpConnection, envelope: &Envelope) -> Result<Vec<MailParameter>> {
    let server = conn.server_info();
    let mut parameters = Vec::new();
    if server.supports_feature(Extension::EightBitMime) {
        parameters.push(MailParameter::Body(MailBodyParameter::EightBitMime));
    }

    let international = envelope
        .from()
        .into_iter()
        .chain(envelope.to())
        .any(|address| !(address.user().is_ascii() && address.domain().is_ascii()));
    if international {
        if !server.supports_feature(Extension::SmtpUtfEight) {
            return Err(Error::Address(
                "envelope has non-ASCII addresses but the server does not offer SMTPUTF8"
                    .to_string(),
            ));
        }
        parameters.push(MailParameter::SmtpUtfEight);
    }
    Ok(parameters)
}

/// One MAIL/RCPT/DATA transaction.
fn transact(
    conn: &mut SmtpConnection,
    envelope: &Envelope,
    parameters: Vec<MailParameter>,
    message: &[u8],
) -> std::result::Result<Response, SmtpError> {
    conn.command(Mail::new(envelope.from().cloned(), parameters))?;
    for recipient in envelope.to() {
        conn.command(Rcpt::new(recipient.clone(), vec![]))?;
    }
    conn.command(Data)?;
    conn.message(message)
}
