use http::StatusCode;

/// Extension methods for [`http::StatusCode`].
pub trait StatusExt {
    /// Returns true if a response with this status may carry a non-empty entity.
    fn allows_entity(&self) -> bool;

    /// The default human readable message for this status.
    fn default_message(&self) -> &'static str;
}

impl StatusExt for StatusCode {
    fn allows_entity(&self) -> bool {
        !(self.is_informational() || *self == StatusCode::NO_CONTENT || *self == StatusCode::NOT_MODIFIED)
    }

    fn default_message(&self) -> &'static str {
        match *self {
            StatusCode::BAD_REQUEST => "The request contains bad syntax or cannot be fulfilled.",
            StatusCode::UNAUTHORIZED => {
                "The supplied authentication is invalid or the resource requires authentication."
            }
            StatusCode::FORBIDDEN => "The request was a legal request, but the server is refusing to respond to it.",
            StatusCode::NOT_FOUND => "The requested resource could not be found.",
            StatusCode::METHOD_NOT_ALLOWED => "A request was made of a resource using a request method not supported by that resource.",
            StatusCode::NOT_ACCEPTABLE => {
                "The resource is not able to produce a response matching the Accept headers of the request."
            }
            StatusCode::PAYLOAD_TOO_LARGE => "The request payload is larger than the server is willing or able to process.",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "The request entity has a media type which the server or resource does not support.",
            StatusCode::RANGE_NOT_SATISFIABLE => "The client requested a portion of the file, but the server cannot supply that portion.",
            StatusCode::INTERNAL_SERVER_ERROR => "There was an internal server error.",
            StatusCode::SERVICE_UNAVAILABLE => {
                "The server is currently unavailable (because it is overloaded or down for maintenance)."
            }
            _ => self.canonical_reason().unwrap_or(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_allows_entity() {
        assert!(StatusCode::OK.allows_entity());
        assert!(StatusCode::NOT_FOUND.allows_entity());
        assert!(!StatusCode::NO_CONTENT.allows_entity());
        assert!(!StatusCode::NOT_MODIFIED.allows_entity());
        assert!(!StatusCode::CONTINUE.allows_entity());
    }

    #[test]
    fn status_default_message() {
        assert_eq!(StatusCode::NOT_FOUND.default_message(), "The requested resource could not be found.");
        assert_eq!(StatusCode::IM_A_TEAPOT.default_message(), "I'm a teapot");
    }
}
