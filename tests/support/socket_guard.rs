//! Skip logic for tests that need a localhost socket.
//!
//! Sandboxed runners often cannot bind. Tests skip with a note on stderr
//! unless `REQUEST_KIT_REQUIRE_SOCKET_TESTS` is truthy, in which case a bind
//! failure fails the test.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::MockServer;

const REQUIRE_ENV: &str = "REQUEST_KIT_REQUIRE_SOCKET_TESTS";

fn socket_tests_required() -> bool {
    std::env::var(REQUIRE_ENV)
        .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

fn skip_or_panic(error: &std::io::Error) {
    let message = format!("cannot bind a localhost socket ({error})");
    assert!(
        !socket_tests_required(),
        "{message}; unset {REQUIRE_ENV} to skip instead"
    );
    eprintln!("{message}; skipping. Set {REQUIRE_ENV}=1 to fail instead.");
}

/// Starts a wiremock server, or returns `None` when localhost cannot bind.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    match std::net::TcpListener::bind("127.0.0.1:0") {
        Ok(_) => Some(MockServer::start().await),
        Err(e) => {
            skip_or_panic(&e);
            None
        }
    }
}

/// A listener that answers exactly one request with `200 OK` and hands back
/// the raw request head as received.
pub struct RawCapture {
    pub url: String,
    pub head: JoinHandle<String>,
}

/// Binds a one-shot raw listener, or returns `None` when localhost cannot bind.
pub async fn capture_one_request_or_skip() -> Option<RawCapture> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(e) => {
            skip_or_panic(&e);
            return None;
        }
    };
    let url = format!("http://{}/", listener.local_addr().unwrap());

    let head = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0_u8; 1024];
        while !received.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        String::from_utf8_lossy(&received).into_owned()
    });

    Some(RawCapture { url, head })
}
