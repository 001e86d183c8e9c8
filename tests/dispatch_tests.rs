//! End-to-end tests for the request dispatcher over plain-HTTP loopback
//! servers — the H1 path alone exercises the full retry/redirect machinery
//! without needing a TLS certificate or real DNS.

use std::time::Duration;

use bytes::Bytes;
use sandbox_http::request::{Request, RequestOptions, RetryPreference};
use sandbox_http::{request, body::RequestBody, EngineConfig, EngineContext, ParsedUrl};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn serve_once(listener: TcpListener, response: &'static [u8]) {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; 8192];
    let _ = socket.read(&mut buf).await.unwrap();
    socket.write_all(response).await.unwrap();
    socket.flush().await.unwrap();
}

fn test_context() -> EngineContext {
    EngineContext::new(EngineConfig::development())
}

#[tokio::test]
async fn get_via_h1_to_local_server_returns_ok_body() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(serve_once(listener, b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nOK"));

    let ctx = test_context();
    let url = ParsedUrl::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
    let resp = request(&ctx, Request::new(http::Method::GET, url)).await.unwrap();

    assert_eq!(resp.status, http::StatusCode::OK);
    assert_eq!(resp.body.collect().await.unwrap(), Bytes::from_static(b"OK"));
    server.await.unwrap();
}

#[tokio::test]
async fn cross_origin_redirect_strips_sensitive_headers() {
    let final_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let final_port = final_listener.local_addr().unwrap().port();
    let final_server = tokio::spawn(async move {
        let (mut socket, _) = final_listener.accept().await.unwrap();
        let mut buf = [0u8; 8192];
        let n = socket.read(&mut buf).await.unwrap();
        let req = String::from_utf8_lossy(&buf[..n]).to_string();
        socket.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await.unwrap();
        socket.flush().await.unwrap();
        req
    });

    let first_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let first_port = first_listener.local_addr().unwrap().port();
    let location = format!("http://127.0.0.1:{final_port}/next");
    let first_server = tokio::spawn(async move {
        let (mut socket, _) = first_listener.accept().await.unwrap();
        let mut buf = [0u8; 8192];
        let _ = socket.read(&mut buf).await.unwrap();
        let response = format!("HTTP/1.1 301 Moved Permanently\r\nLocation: {location}\r\nContent-Length: 0\r\n\r\n");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
    });

    let ctx = test_context();
    let url = ParsedUrl::parse(&format!("http://127.0.0.1:{first_port}/start")).unwrap();
    let req = Request::new(http::Method::GET, url)
        .header("authorization", "Bearer secret")
        .header("cookie", "sid=1");

    let resp = request(&ctx, req).await.unwrap();
    assert_eq!(resp.status, http::StatusCode::OK);

    first_server.await.unwrap();
    let second_request = final_server.await.unwrap();
    assert!(!second_request.to_lowercase().contains("authorization:"));
    assert!(!second_request.to_lowercase().contains("cookie:"));
}

#[tokio::test]
async fn retries_on_503_with_retry_after() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut first, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 8192];
        let _ = first.read(&mut buf).await.unwrap();
        first
            .write_all(b"HTTP/1.1 503 Service Unavailable\r\nRetry-After: 0\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        first.flush().await.unwrap();
        drop(first);

        let (mut second, _) = listener.accept().await.unwrap();
        let _ = second.read(&mut buf).await.unwrap();
        second.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await.unwrap();
        second.flush().await.unwrap();
    });

    let ctx = test_context();
    let url = ParsedUrl::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
    let mut options = RequestOptions::default();
    options.retry = RetryPreference::Count(2);
    let req = Request::new(http::Method::GET, url).options(options);

    let resp = request(&ctx, req).await.unwrap();
    assert_eq!(resp.status, http::StatusCode::OK);
    server.await.unwrap();
}

#[tokio::test]
async fn stream_body_on_307_redirect_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(serve_once(
        listener,
        b"HTTP/1.1 307 Temporary Redirect\r\nLocation: /next\r\nContent-Length: 0\r\n\r\n",
    ));

    let ctx = test_context();
    let url = ParsedUrl::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
    let (body, tx) = RequestBody::streamed(4);
    tx.send(Ok(Bytes::from_static(b"chunk"))).await.unwrap();
    drop(tx);

    let req = Request::new(http::Method::POST, url).body(body);
    let err = request(&ctx, req).await.unwrap_err();
    assert!(err.is_redirect());
    server.await.unwrap();
}

#[tokio::test]
async fn redirect_loop_to_self_is_detected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let location = format!("http://127.0.0.1:{port}/");
    let response = format!("HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\n\r\n");

    let server = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { return };
            let mut buf = [0u8; 8192];
            if socket.read(&mut buf).await.unwrap_or(0) == 0 {
                return;
            }
            if socket.write_all(response.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
        }
    });

    let ctx = test_context();
    let url = ParsedUrl::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
    let err = tokio::time::timeout(Duration::from_secs(5), request(&ctx, Request::new(http::Method::GET, url)))
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_redirect());
    server.abort();
}
