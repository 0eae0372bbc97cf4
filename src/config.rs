//! Session configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Network timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How the channel to the server is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain connect, then a mandatory STARTTLS upgrade
    #[default]
    StartTls,
    /// TLS from the first byte (SMTPS)
    Wrapper,
    /// No encryption. Only for local relays and tests.
    None,
}

/// Connection settings for a [`Mailer`](crate::Mailer).
#[derive(Clone, Deserialize)]
pub struct MailerConfig {
    pub host: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// PEM file with extra trusted root certificates
    #[serde(default)]
    pub cafile: Option<PathBuf>,
    #[serde(default)]
    pub security: Security,
    #[serde(
        default = "default_timeout",
        rename = "timeout_secs",
        deserialize_with = "deserialize_timeout"
    )]
    pub timeout: Option<Duration>,
    /// Name sent with EHLO; the local hostname when unset
    #[serde(default)]
    pub hello_name: Option<String>,
}

impl MailerConfig {
    /// Create a config with STARTTLS, no CA file and the default timeout.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            cafile: None,
            security: Security::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            hello_name: None,
        }
    }

    #[must_use]
    pub fn with_cafile(mut self, cafile: impl Into<PathBuf>) -> Self {
        self.cafile = Some(cafile.into());
        self
    }

    #[must_use]
    pub const fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_hello_name(mut self, name: impl Into<String>) -> Self {
        self.hello_name = Some(name.into());
        self
    }

    /// Check the values that can be checked without touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be between 1 and 65535".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cafile", &self.cafile)
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .field("hello_name", &self.hello_name)
            .finish()
    }
}

/// Parse a port given as text, e.g. from a settings file or form input.
pub fn parse_port(value: &str) -> Result<u16> {
    let port: u16 = value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid port: {value:?}")))?;
    if port == 0 {
        return Err(Error::Config("port must be between 1 and 65535".to_string()));
    }
    Ok(port)
}

#[allow(clippy::unnecessary_wraps)]
const fn default_timeout() -> Option<Duration> {
    Some(DEFAULT_TIMEOUT)
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    struct PortVisitor;

    impl Visitor<'_> for PortVisitor {
        type Value = u16;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a port number between 1 and 65535, as integer or string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<u16, E> {
            match u16::try_from(v) {
                Ok(port) if port != 0 => Ok(port),
                _ => Err(E::custom(format!("port out of range: {v}"))),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<u16, E> {
            u64::try_from(v)
                .map_err(|_| E::custom(format!("port out of range: {v}")))
                .and_then(|v| self.visit_u64(v))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<u16, E> {
            parse_port(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(PortVisitor)
}

fn deserialize_timeout<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}
