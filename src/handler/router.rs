//! Request dispatch module
//!
//! The bind path carries session traffic (and its CORS preflight); any other path
//! is answered from the public directory.

use super::session::SessionRequest;
use crate::config::AppState;
use crate::http::{Request, Sent, Sink};
use std::io;

/// Route a request to the reply it gets
pub fn dispatch<S: Sink>(state: &AppState, request: &mut Request<S>) -> io::Result<Sent> {
    if request.path() != state.config.http.bind_path {
        return request.reply_with_static(&state.static_files);
    }

    if request.is_options() {
        return request.reply_to_options();
    }

    let reply = state.session.handle(SessionRequest {
        method: request.method(),
        headers: request.headers(),
        body: request.body(),
    });
    request.reply(&reply.body, &reply.content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::{SessionHandler, SessionReply};
    use crate::http::scratch::ScratchDir;
    use crate::http::{parse_request, Status};
    use bytes::Bytes;
    use std::sync::Arc;

    fn state_for(scratch: &ScratchDir) -> AppState {
        let toml = format!(
            "[http]\npublic_dir = {:?}\n",
            scratch.path("web").display().to_string()
        );
        AppState::new(&Config::from_toml(&toml).unwrap())
    }

    fn capture() -> Vec<Bytes> {
        Vec::new()
    }

    fn run(state: &AppState, raw: &[u8]) -> (Sent, Vec<Bytes>) {
        let parsed = parse_request(raw).unwrap().unwrap();
        let body = Bytes::copy_from_slice(&raw[parsed.head_len..]);
        let mut request = Request::new(capture(), &parsed, body);
        let sent = dispatch(state, &mut request).unwrap();
        (sent, request.into_stream())
    }

    #[test]
    fn test_preflight_on_bind_path() {
        let scratch = ScratchDir::new("router");
        let state = state_for(&scratch);
        let (sent, writes) = run(
            &state,
            b"OPTIONS /xmpp HTTP/1.1\r\nHost: wonderland.lit\r\nAccess-Control-Request-Headers: Content-Type\r\n\r\n",
        );
        assert_eq!(sent.status, Status::Ok);
        let text = String::from_utf8(writes[0].to_vec()).unwrap();
        assert!(text.contains("Access-Control-Allow-Headers: Content-Type\r\n"));
        assert!(text.ends_with("Access-Control-Max-Age: 2592000\r\n\r\n"));
    }

    #[test]
    fn test_post_on_bind_path_goes_to_session() {
        let scratch = ScratchDir::new("router");
        let state = state_for(&scratch);
        let (sent, writes) = run(
            &state,
            b"POST /xmpp HTTP/1.1\r\nContent-Type: text/xml\r\nContent-Length: 24\r\n\r\n<message>hello</message>",
        );
        assert_eq!(sent.body_bytes, 24);
        assert_eq!(
            writes,
            vec![Bytes::from_static(
                b"HTTP/1.1 200 OK\r\nAccess-Control-Allow-Origin: *\r\nContent-Type: text/xml\r\nContent-Length: 24\r\n\r\n<message>hello</message>"
            )]
        );
    }

    #[test]
    fn test_other_paths_serve_files() {
        let scratch = ScratchDir::new("router");
        scratch.write("web/index.html", "welcome\n");
        let state = state_for(&scratch);

        let (sent, writes) = run(&state, b"GET /?lang=en HTTP/1.1\r\nHost: a\r\n\r\n");
        assert_eq!(sent.status, Status::Ok);
        assert_eq!(writes[1], Bytes::from_static(b"welcome\n"));

        // Preflight only applies to the bind path
        let (sent, _) = run(&state, b"OPTIONS /index.html HTTP/1.1\r\n\r\n");
        assert_eq!(sent.status, Status::Ok);
        assert_eq!(sent.body_bytes, 8);
    }

    #[test]
    fn test_encoded_traversal_is_404() {
        let scratch = ScratchDir::new("router");
        scratch.write("web/index.html", "welcome\n");
        scratch.write("secret.txt", "top secret\n");
        let state = state_for(&scratch);

        let (sent, writes) = run(&state, b"GET /%2e%2e/secret.txt HTTP/1.1\r\n\r\n");
        assert_eq!(sent.status, Status::NotFound);
        assert_eq!(
            writes,
            vec![Bytes::from_static(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")]
        );
    }

    struct Upper;

    impl SessionHandler for Upper {
        fn handle(&self, request: SessionRequest<'_>) -> SessionReply {
            SessionReply {
                body: Bytes::from(request.body.to_ascii_uppercase()),
                content_type: format!("text/plain; method={}", request.method),
            }
        }
    }

    #[test]
    fn test_custom_session_handler() {
        let scratch = ScratchDir::new("router");
        let toml = format!(
            "[http]\nbind_path = \"/http-bind\"\npublic_dir = {:?}\n",
            scratch.path("web").display().to_string()
        );
        let state = AppState::with_session(&Config::from_toml(&toml).unwrap(), Arc::new(Upper));

        let (_, writes) = run(
            &state,
            b"POST /http-bind HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
        );
        let text = String::from_utf8(writes[0].to_vec()).unwrap();
        assert!(text.contains("Content-Type: text/plain; method=POST\r\n"));
        assert!(text.ends_with("\r\n\r\nHELLO"));

        // The default bind path is now ordinary static content
        let (sent, _) = run(&state, b"POST /xmpp HTTP/1.1\r\n\r\n");
        assert_eq!(sent.status, Status::NotFound);
    }
}
