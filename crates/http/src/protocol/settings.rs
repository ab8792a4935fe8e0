use std::time::Duration;

use crate::protocol::header::Host;

/// Code-level settings the message model consults.
///
/// There is no file or environment loading here; embedders build the value
/// once with [`MessageSettings::builder`] and share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSettings {
    default_host_header: Host,
    secured_connection: bool,
    to_strict_timeout: Duration,
    max_to_strict_bytes: Option<u64>,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            default_host_header: Host::empty(),
            secured_connection: false,
            to_strict_timeout: Duration::from_secs(5),
            max_to_strict_bytes: Some(8 * 1024 * 1024),
        }
    }
}

impl MessageSettings {
    pub fn builder() -> MessageSettingsBuilder {
        MessageSettingsBuilder::new()
    }

    /// Used by effective uri resolution when a relative request has no usable `Host` header.
    pub fn default_host_header(&self) -> &Host {
        &self.default_host_header
    }

    pub fn secured_connection(&self) -> bool {
        self.secured_connection
    }

    pub fn to_strict_timeout(&self) -> Duration {
        self.to_strict_timeout
    }

    pub fn max_to_strict_bytes(&self) -> Option<u64> {
        self.max_to_strict_bytes
    }
}

#[derive(Debug)]
pub struct MessageSettingsBuilder {
    settings: MessageSettings,
}

impl MessageSettingsBuilder {
    fn new() -> Self {
        Self { settings: MessageSettings::default() }
    }

    pub fn default_host_header(mut self, host: Host) -> Self {
        self.settings.default_host_header = host;
        self
    }

    pub fn secured_connection(mut self, secured: bool) -> Self {
        self.settings.secured_connection = secured;
        self
    }

    pub fn to_strict_timeout(mut self, timeout: Duration) -> Self {
        self.settings.to_strict_timeout = timeout;
        self
    }

    /// `None` disables the limit.
    pub fn max_to_strict_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.settings.max_to_strict_bytes = max_bytes;
        self
    }

    pub fn build(self) -> MessageSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let settings = MessageSettings::builder()
            .default_host_header(Host::new("example.com", Some(8080)))
            .secured_connection(true)
            .max_to_strict_bytes(None)
            .build();

        assert_eq!(settings.default_host_header(), &Host::new("example.com", Some(8080)));
        assert!(settings.secured_connection());
        assert_eq!(settings.max_to_strict_bytes(), None);
        assert_eq!(settings.to_strict_timeout(), Duration::from_secs(5));
    }
}
