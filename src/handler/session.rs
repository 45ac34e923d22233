//! Session handler seam
//!
//! Bodies posted to the bind path belong to a long-lived protocol session that lives
//! outside this crate. The handler receives the body and returns what to send back.

use bytes::Bytes;
use std::collections::HashMap;

/// The parts of a request a session handler may look at
#[derive(Debug, Clone, Copy)]
pub struct SessionRequest<'a> {
    pub method: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub body: &'a Bytes,
}

impl SessionRequest<'_> {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

/// Payload and media type for a 200 reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReply {
    pub body: Bytes,
    pub content_type: String,
}

pub trait SessionHandler: Send + Sync {
    fn handle(&self, request: SessionRequest<'_>) -> SessionReply;
}

/// Sends every body straight back with the request's media type
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoSession;

impl SessionHandler for EchoSession {
    fn handle(&self, request: SessionRequest<'_>) -> SessionReply {
        SessionReply {
            body: request.body.clone(),
            content_type: request
                .content_type()
                .unwrap_or("text/plain")
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_keeps_body_and_type() {
        let headers = HashMap::from([("content-type".to_string(), "text/xml".to_string())]);
        let body = Bytes::from_static(b"<body rid='1'/>");
        let reply = EchoSession.handle(SessionRequest {
            method: "POST",
            headers: &headers,
            body: &body,
        });
        assert_eq!(reply.body, body);
        assert_eq!(reply.content_type, "text/xml");
    }

    #[test]
    fn test_echo_defaults_to_plain_text() {
        let headers = HashMap::new();
        let body = Bytes::new();
        let reply = EchoSession.handle(SessionRequest {
            method: "POST",
            headers: &headers,
            body: &body,
        });
        assert_eq!(reply.content_type, "text/plain");
        assert!(reply.body.is_empty());
    }
}
