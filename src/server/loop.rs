// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Serve until Ctrl-C
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    serve_until(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logger::log_error(&format!("Failed to listen for Ctrl-C: {e}"));
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Accept loop; in-flight connections keep running after `shutdown` fires
pub async fn serve_until<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let addr = listener.local_addr()?;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => {
                logger::log_server_stop(&addr);
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::scratch::ScratchDir;
    use crate::server::create_reusable_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn roundtrip(addr: std::net::SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serves_over_tcp() {
        let scratch = ScratchDir::new("loop");
        scratch.write("web/index.html", "index.html contents\n");
        scratch.mkdir("web/http");
        let toml = format!(
            "[logging]\naccess_log = false\n[http]\npublic_dir = {:?}\n",
            scratch.path("web").display().to_string()
        );
        let state = Arc::new(AppState::new(&Config::from_toml(&toml).unwrap()));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, Arc::clone(&state), async move {
            let _ = stop_rx.await;
        }));

        let index = roundtrip(addr, b"GET / HTTP/1.1\r\nHost: wonderland.lit\r\n\r\n").await;
        assert!(index.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(index.ends_with("\r\n\r\nindex.html contents\n"));

        let redirect = roundtrip(addr, b"GET /http?ok=true HTTP/1.1\r\nHost: wonderland.lit\r\n\r\n").await;
        assert_eq!(
            redirect,
            "HTTP/1.1 301 Moved Permanently\r\nContent-Length: 0\r\nLocation: http://wonderland.lit/http/?ok=true\r\n\r\n"
        );

        let echo = roundtrip(
            addr,
            b"POST /xmpp HTTP/1.1\r\nContent-Type: text/xml\r\nContent-Length: 24\r\n\r\n<message>hello</message>",
        )
        .await;
        assert!(echo.ends_with("Content-Length: 24\r\n\r\n<message>hello</message>"));

        let missing = roundtrip(addr, b"GET /../passwords HTTP/1.1\r\n\r\n").await;
        assert_eq!(missing, "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let toml = "[performance]\nmax_connections = 0\n";
        let state = Arc::new(AppState::new(&Config::from_toml(toml).unwrap()));

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, Arc::clone(&state), async move {
            let _ = stop_rx.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let _ = stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await;
        let mut out = Vec::new();
        let _ = stream.read_to_end(&mut out).await;
        assert!(out.is_empty());

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(state.active_connections.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
