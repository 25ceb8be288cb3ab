//! Server configuration: a raw, CLI/file-shaped form and the validated
//! value type built from it.

use rcon_core::CredentialRecord;
use thiserror::Error;

/// Raw, unvalidated configuration values, the shape a CLI parser or config
/// file produces.
#[derive(Debug, Clone)]
pub struct RawServerConfig {
    /// Listening address.
    pub host: String,
    /// Listening port.
    pub port: i64,
    /// Concurrent connection cap.
    pub max_connections: i64,
    /// Largest accepted or emitted frame.
    pub max_frame_size: i64,
    /// Per-socket read timeout and idle cap, in milliseconds.
    pub read_timeout_ms: i64,
    /// Acceptor wakeup interval, in milliseconds.
    pub accept_timeout_ms: i64,
    /// Stored credential record (`Base64(salt):Base64(digest)`), or `None`
    /// / blank to disable authentication (insecure mode).
    pub credential: Option<String>,
}

impl Default for RawServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 25575,
            max_connections: 10,
            max_frame_size: 4096,
            read_timeout_ms: 30_000,
            accept_timeout_ms: 5_000,
            credential: None,
        }
    }
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening address.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Concurrent connection cap.
    pub max_connections: usize,
    /// Largest accepted or emitted frame.
    pub max_frame_size: i32,
    /// Per-socket read timeout and idle cap.
    pub read_timeout: std::time::Duration,
    /// Acceptor wakeup interval.
    pub accept_timeout: std::time::Duration,
    /// Credential record, or `None` for insecure mode (every `Auth`
    /// attempt succeeds).
    pub credential: Option<CredentialRecord>,
}

/// Errors raised validating a [`RawServerConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `port` was negative or exceeded `u16::MAX`.
    #[error("port {0} is out of range")]
    InvalidPort(i64),

    /// `max_connections` was zero or negative.
    #[error("max_connections must be positive, got {0}")]
    InvalidMaxConnections(i64),

    /// `max_frame_size` was too small to hold even an empty-body packet
    /// (header + terminator = 14 bytes) or did not fit in `i32`.
    #[error("max_frame_size must be at least 14, got {0}")]
    InvalidMaxFrameSize(i64),

    /// `read_timeout_ms` or `accept_timeout_ms` was zero or negative.
    #[error("{field} must be positive, got {value}")]
    InvalidTimeout {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// `credential` was present but not in `Base64(salt):Base64(digest)`
    /// form.
    #[error("invalid credential record: {0}")]
    InvalidCredential(#[from] rcon_core::CredentialDecodeError),
}

impl ServerConfig {
    /// Validate `raw`, producing a [`ServerConfig`] or the first
    /// [`ConfigError`] encountered.
    pub fn validate(raw: RawServerConfig) -> Result<Self, ConfigError> {
        let port =
            u16::try_from(raw.port).map_err(|_| ConfigError::InvalidPort(raw.port))?;

        if raw.max_connections <= 0 {
            return Err(ConfigError::InvalidMaxConnections(raw.max_connections));
        }
        #[allow(clippy::cast_sign_loss)]
        let max_connections = raw.max_connections as usize;

        let max_frame_size = i32::try_from(raw.max_frame_size)
            .ok()
            .filter(|&size| size >= 14)
            .ok_or(ConfigError::InvalidMaxFrameSize(raw.max_frame_size))?;

        if raw.read_timeout_ms <= 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "read_timeout_ms",
                value: raw.read_timeout_ms,
            });
        }
        if raw.accept_timeout_ms <= 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "accept_timeout_ms",
                value: raw.accept_timeout_ms,
            });
        }

        #[allow(clippy::cast_sign_loss)]
        let read_timeout = std::time::Duration::from_millis(raw.read_timeout_ms as u64);
        #[allow(clippy::cast_sign_loss)]
        let accept_timeout = std::time::Duration::from_millis(raw.accept_timeout_ms as u64);

        let credential = match raw.credential.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(encoded) => Some(CredentialRecord::decode(encoded)?),
        };

        Ok(Self {
            host: raw.host,
            port,
            max_connections,
            max_frame_size,
            read_timeout,
            accept_timeout,
            credential,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn defaults_validate_successfully() {
        let config = ServerConfig::validate(RawServerConfig::default()).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 25575);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.max_frame_size, 4096);
        assert!(config.credential.is_none());
    }

    #[test]
    fn rejects_negative_port() {
        let raw = RawServerConfig { port: -1, ..RawServerConfig::default() };
        assert_eq!(ServerConfig::validate(raw), Err(ConfigError::InvalidPort(-1)));
    }

    #[test]
    fn rejects_port_above_u16_max() {
        let raw = RawServerConfig { port: 70_000, ..RawServerConfig::default() };
        assert_eq!(ServerConfig::validate(raw), Err(ConfigError::InvalidPort(70_000)));
    }

    #[test]
    fn rejects_zero_max_connections() {
        let raw = RawServerConfig { max_connections: 0, ..RawServerConfig::default() };
        assert_eq!(ServerConfig::validate(raw), Err(ConfigError::InvalidMaxConnections(0)));
    }

    #[test]
    fn rejects_undersized_max_frame_size() {
        let raw = RawServerConfig { max_frame_size: 13, ..RawServerConfig::default() };
        assert_eq!(ServerConfig::validate(raw), Err(ConfigError::InvalidMaxFrameSize(13)));
    }

    #[test]
    fn rejects_zero_read_timeout() {
        let raw = RawServerConfig { read_timeout_ms: 0, ..RawServerConfig::default() };
        assert_eq!(
            ServerConfig::validate(raw),
            Err(ConfigError::InvalidTimeout { field: "read_timeout_ms", value: 0 })
        );
    }

    #[test]
    fn rejects_credential_without_separator() {
        let raw =
            RawServerConfig { credential: Some("not-a-record".to_string()), ..RawServerConfig::default() };
        assert!(matches!(ServerConfig::validate(raw), Err(ConfigError::InvalidCredential(_))));
    }

    #[test]
    fn blank_credential_means_insecure_mode() {
        let raw = RawServerConfig { credential: Some("  ".to_string()), ..RawServerConfig::default() };
        let config = ServerConfig::validate(raw).unwrap();
        assert!(config.credential.is_none());
    }

    #[test]
    fn valid_credential_round_trips_through_config() {
        let record = CredentialRecord::hash("hunter2");
        let raw = RawServerConfig { credential: Some(record.encode()), ..RawServerConfig::default() };
        let config = ServerConfig::validate(raw).unwrap();
        assert!(config.credential.unwrap().verify("hunter2"));
    }

    proptest! {
        #[test]
        fn any_port_outside_u16_range_is_rejected(port in (i64::from(u16::MAX) + 1)..i64::MAX) {
            let raw = RawServerConfig { port, ..RawServerConfig::default() };
            prop_assert_eq!(ServerConfig::validate(raw), Err(ConfigError::InvalidPort(port)));
        }

        #[test]
        fn any_non_positive_max_connections_is_rejected(max_connections in i64::MIN..=0) {
            let raw = RawServerConfig { max_connections, ..RawServerConfig::default() };
            prop_assert_eq!(
                ServerConfig::validate(raw),
                Err(ConfigError::InvalidMaxConnections(max_connections))
            );
        }

        #[test]
        fn any_in_range_max_frame_size_validates(max_frame_size in 14i64..=1_000_000) {
            let raw = RawServerConfig { max_frame_size, ..RawServerConfig::default() };
            prop_assert!(ServerConfig::validate(raw).is_ok());
        }
    }
}
