use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use onair_api::{BaseUrl, FetchError, HttpApi, RelayApi};
use onair_core::{EventKind, Filter, Order};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Canned {
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
}

/// Minimal HTTP/1.1 responder: answers every connection with the same canned reply
/// and records the request line.
async fn serve(canned: Canned) -> Result<(SocketAddr, Arc<Mutex<Vec<String>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let canned = canned.clone();
            let seen = Arc::clone(&seen_clone);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                let mut n = 0usize;
                loop {
                    let Ok(read) = sock.read(&mut buf[n..]).await else { return };
                    if read == 0 { return; }
                    n += read;
                    if buf[..n].windows(4).any(|w| w == b"\r\n\r\n") { break; }
                }
                let req = String::from_utf8_lossy(&buf[..n]).to_string();
                if let Some(line) = req.lines().next() {
                    seen.lock().unwrap().push(line.to_string());
                }
                let resp = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    canned.status,
                    canned.content_type,
                    canned.body.len(),
                    canned.body
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    Ok((addr, seen))
}

fn client(addr: SocketAddr) -> HttpApi {
    HttpApi::new(BaseUrl::Direct(format!("http://{addr}")), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn events_request_carries_filter_query() -> Result<()> {
    let (addr, seen) = serve(Canned {
        status: "200 OK",
        content_type: "application/json; charset=utf-8",
        body: r#"[{"play_time":"2024-01-01T10:00:00Z","event_type":"AD","artist":"A","title":"T","filename":"f.mp3"}]"#,
    })
    .await?;
    let api = client(addr);
    let filter = Filter { kind: EventKind::Ad, limit: 10, order: Order::Asc };
    let events = api.events(&filter).await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].filename, "f.mp3");
    let lines = seen.lock().unwrap().clone();
    assert_eq!(lines, vec!["GET /events/by-type?type=AD&limit=10&order=asc HTTP/1.1".to_string()]);
    Ok(())
}

#[tokio::test]
async fn non_2xx_is_a_status_error() -> Result<()> {
    let (addr, _seen) = serve(Canned {
        status: "503 Service Unavailable",
        content_type: "text/plain",
        body: "down",
    })
    .await?;
    let err = client(addr).now_playing().await.unwrap_err();
    match err {
        FetchError::Status { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() -> Result<()> {
    let (addr, _seen) = serve(Canned { status: "200 OK", content_type: "application/json", body: "{oops" }).await?;
    let err = client(addr).now_playing().await.unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
    Ok(())
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let err = client(addr).now_playing().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
    Ok(())
}
