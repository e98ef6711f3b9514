use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use color_eyre::eyre::{Result, eyre};
use httpecho::HttpConfig;
use httpecho::common::spawn_test_server;
use httpecho::http::HttpEchoClient;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_plain_request_echoes_request_and_client() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let started = Instant::now();
    let response = client.get("/some/path").await?;
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("text/plain; charset=utf-8"));

    let request = response.section("Request").ok_or_else(|| eyre!("missing Request section"))?;
    assert_eq!(request[0], "GET /some/path HTTP/1.1");
    assert_eq!(request[1], format!("Host: {}", server.addr));

    let client_section = response.section("Client").ok_or_else(|| eyre!("missing Client section"))?;
    assert_eq!(client_section, vec![format!("RemoteAddr: {}", client.local_addr()?)]);

    assert!(response.section("Environment").is_none());
    assert!(response.section("Payload").is_none());

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_status_parameter() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    for status in [201, 302, 404, 418, 500, 503, 599] {
        let response = client.get(&format!("/?status={status}")).await?;
        assert_eq!(response.status, status);
        assert!(response.section("Request").is_some());
    }

    let response = client.get("/?status=notanumber").await?;
    assert_eq!(response.status, 200);

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_delay_parameter() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let response = client.get("/?delay=100ms").await?;
    assert_eq!(response.status, 200);
    assert!(response.first_byte >= Duration::from_millis(100));

    let response = client.get("/?delay=later").await?;
    assert_eq!(response.status, 200);
    assert!(response.first_byte < Duration::from_secs(2));

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_payload_parameter() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let mut decoded = Vec::new();
    for _ in 0..2 {
        let response = client.get("/?payload=32").await?;
        let payload = response.section("Payload").ok_or_else(|| eyre!("missing Payload section"))?;
        assert_eq!(payload.len(), 1);

        let bytes = STANDARD.decode(&payload[0])?;
        assert_eq!(bytes.len(), 32);
        decoded.push(bytes);
    }
    assert_ne!(decoded[0], decoded[1]);

    let response = client.get("/?payload=0").await?;
    assert!(response.section("Payload").is_none());

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_environment_section_enabled() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default().with_include_env(true)).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    let response = client.get("/").await?;
    let env = response.section("Environment").ok_or_else(|| eyre!("missing Environment section"))?;

    let mut expected: Vec<String> = std::env::vars_os()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
        .collect();
    expected.sort();
    assert_eq!(env, expected);

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_environment_section_disabled() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let mut client = HttpEchoClient::connect(server.addr).await?;

    for target in ["/", "/?env=1", "/?env=true&payload=4&status=201"] {
        let response = client.get(target).await?;
        assert!(!response.text().contains("Environment:"), "target {target}");
    }

    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_delays_are_independent() -> Result<()> {
    let server = spawn_test_server(HttpConfig::default()).await?;
    let addr = server.addr;

    let slow = tokio::spawn(async move {
        let mut client = HttpEchoClient::connect(addr).await?;
        client.get("/?delay=2s").await?;
        Ok::<Instant, httpecho::EchoError>(Instant::now())
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut client = HttpEchoClient::connect(addr).await?;
    let started = Instant::now();
    let response = client.get("/?delay=0").await?;
    let fast_done = Instant::now();
    assert_eq!(response.status, 200);
    assert!(started.elapsed() < Duration::from_secs(1));

    let slow_done = slow.await??;
    assert!(fast_done < slow_done);

    server.stop().await?;
    Ok(())
}
