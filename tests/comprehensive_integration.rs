use color_eyre::eyre::Result;
use httpecho::common::spawn_test_server;
use httpecho::http::HttpEchoClient;
use httpecho::{EchoServerTrait, HttpConfig, HttpEchoServer, ListenAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Sends raw bytes and reads until the server closes the connection
async fn raw_exchange(addr: std::net::SocketAddr, request: &[u8]) -> Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(request).await?;
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await??;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

#[tokio::test]
async fn test_keep_alive_with_request_body() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let first = client
        .request("POST", "/submit", &[("X-Forwarded-For", "203.0.113.9")], b"secret-body")
        .await?;
    assert_eq!(first.status, 200);
    assert!(first.section("Request").unwrap().contains(&"X-Forwarded-For: 203.0.113.9".to_string()));
    assert!(first.section("Request").unwrap().contains(&"Content-Length: 11".to_string()));
    assert!(!first.text().contains("secret-body"));

    let second = client.get("/again?status=202").await?;
    assert_eq!(second.status, 202);

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_header_names_are_canonicalized() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let response = client
        .request("GET", "/", &[("x-request-id", "abc"), ("ACCEPT", "*/*")], b"")
        .await?;
    let request = response.section("Request").unwrap();
    assert_eq!(request[1], format!("Host: {}", server.addr));
    assert_eq!(request[2], "Accept: */*");
    assert_eq!(request[3], "X-Request-Id: abc");

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_head_request_has_no_body() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let response = client.request("HEAD", "/?status=201", &[], b"").await?;
    assert_eq!(response.status, 201);
    assert!(response.body.is_empty());
    let length: usize = response.header("content-length").unwrap().parse()?;
    assert!(length > 0);

    let response = client.get("/").await?;
    assert_eq!(response.status, 200);

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_no_content_status() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let response = client.get("/?status=204").await?;
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());

    let response = client.get("/?status=200").await?;
    assert_eq!(response.status, 200);

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_http10_closes_connection() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;

    let response = raw_exchange(server.addr, b"GET /old HTTP/1.0\r\n\r\n").await?;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert!(response.contains("GET /old HTTP/1.0\r\n"));

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_malformed_request_gets_400() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;

    let response = raw_exchange(server.addr, b"GET / HTTP/1.1\r\nBad Header\r\n\r\n").await?;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_oversized_head_gets_431() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default().with_max_header_bytes(256)).await?;

    let request = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "b".repeat(1024));
    let response = raw_exchange(server.addr, request.as_bytes()).await?;
    assert!(response.starts_with("HTTP/1.1 431 "));

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_obs_text_header_is_echoed() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;

    let mut request = b"GET /?status=201 HTTP/1.1\r\nHost: x\r\nX-Name: caf".to_vec();
    request.push(0xe9);
    request.extend_from_slice(b"\r\nConnection: close\r\n\r\n");

    let mut stream = TcpStream::connect(server.addr).await?;
    stream.write_all(&request).await?;
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response)).await??;

    assert!(response.starts_with(b"HTTP/1.1 201 Created\r\n"));
    let echoed = b"X-Name: caf\xe9\r\n";
    assert!(response.windows(echoed.len()).any(|w| w == echoed));

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_informational_status_precedes_echo() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;

    let response = raw_exchange(server.addr, b"GET /?status=100 HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await?;
    assert!(response.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"));
    assert!(response.contains("\nRequest:\n"));

    let mut client = HttpEchoClient::connect(server.addr).await?;
    let response = client.get("/?status=102").await?;
    assert_eq!(response.informational, vec![102]);
    assert_eq!(response.status, 200);
    assert!(response.section("Client").is_some());

    let response = client.get("/?status=203").await?;
    assert!(response.informational.is_empty());
    assert_eq!(response.status, 203);

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_http10_keep_alive_is_confirmed() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let response = client
        .send_raw(b"GET /first HTTP/1.0\r\nConnection: keep-alive\r\n\r\n", false)
        .await?;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("connection"), Some("keep-alive"));

    let response = client.send_raw(b"GET /second HTTP/1.0\r\n\r\n", false).await?;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("connection"), Some("close"));

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_run_and_shutdown() -> Result<()> {
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = probe.local_addr()?;
    drop(probe);

    let config = HttpConfig::default().with_listen_addr(ListenAddr::from(addr));
    let server = HttpEchoServer::new(config);
    let shutdown = server.shutdown_signal();
    let handle = tokio::spawn(async move { server.run().await });

    let mut connected = None;
    for _ in 0..50 {
        if let Ok(client) = HttpEchoClient::connect(addr).await {
            connected = Some(client);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let mut client = connected.expect("server never started listening");
    assert_eq!(client.get("/").await?.status, 200);

    let _ = shutdown.send(());
    handle.await??;
    Ok(())
}

#[tokio::test]
async fn test_bind_failure_is_reported() -> Result<()> {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let config = HttpConfig::default().with_listen_addr(ListenAddr::from(taken.local_addr()?));

    let server = HttpEchoServer::new(config);
    let err = server.run().await.unwrap_err();
    assert!(err.to_string().contains("Failed to bind"));
    Ok(())
}
