use std::fmt;

use http::Version;

use crate::protocol::MessageError;

/// The protocol versions a message can carry.
///
/// Only HTTP/1.0 and HTTP/1.1 are modelled; anything else is rejected when
/// converting from [`http::Version`], so connection semantics are always
/// defined for a constructed message.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpProtocol {
    Http10,
    #[default]
    Http11,
}

impl HttpProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpProtocol::Http10 => "HTTP/1.0",
            HttpProtocol::Http11 => "HTTP/1.1",
        }
    }

    #[inline]
    pub fn is_http10(&self) -> bool {
        matches!(self, HttpProtocol::Http10)
    }
}

impl fmt::Display for HttpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<Version> for HttpProtocol {
    type Error = MessageError;

    fn try_from(version: Version) -> Result<Self, Self::Error> {
        match version {
            Version::HTTP_10 => Ok(HttpProtocol::Http10),
            Version::HTTP_11 => Ok(HttpProtocol::Http11),
            // http2 and http3 are handled by other layers
            other => Err(MessageError::UnsupportedProtocol { version: other }),
        }
    }
}

impl From<HttpProtocol> for Version {
    fn from(protocol: HttpProtocol) -> Self {
        match protocol {
            HttpProtocol::Http10 => Version::HTTP_10,
            HttpProtocol::Http11 => Version::HTTP_11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_supported_versions() {
        assert_eq!(HttpProtocol::try_from(Version::HTTP_10).unwrap(), HttpProtocol::Http10);
        assert_eq!(HttpProtocol::try_from(Version::HTTP_11).unwrap(), HttpProtocol::Http11);
        assert_eq!(Version::from(HttpProtocol::Http10), Version::HTTP_10);
    }

    #[test]
    fn reject_other_versions() {
        assert!(matches!(
            HttpProtocol::try_from(Version::HTTP_2),
            Err(MessageError::UnsupportedProtocol { version }) if version == Version::HTTP_2
        ));
        assert!(HttpProtocol::try_from(Version::HTTP_09).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(HttpProtocol::default().to_string(), "HTTP/1.1");
    }
}
