use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use weft::middleware::{BoxFuture, ErrorBoundary, Next, ParseUrl, RequestId, boxed};
use weft::outcome::{Outcome, render_paged};
use weft::{Context, Error, Mode, Paged, Pipeline, Request, Router, Server};

async fn hello(req: Request) -> String {
    format!("hello {}", req.param("name").unwrap_or("?"))
}

fn boom<'a>(_cx: &'a mut Context, _next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
    Box::pin(async { Err(Error::handler("secret detail")) })
}

fn pages<'a>(cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move {
        let page = cx.query().and_then(|q| q.get("page")).and_then(|p| p.parse().ok()).unwrap_or(1);
        render_paged(cx, Outcome::ok(Paged::new(95, vec!["x"])), page, 10)?;
        next.run(cx).await
    })
}

fn app(mode: Mode) -> Pipeline {
    let router = Router::new()
        .get("/hello/:name", hello)
        .route(http::Method::GET, "/boom", vec![boxed(boom)])
        .route(http::Method::GET, "/items", vec![boxed(pages)])
        .route(http::Method::GET, "/empty", Vec::new());

    Pipeline::new()
        .with(ErrorBoundary::new(mode))
        .with(RequestId::new())
        .with(ParseUrl::default())
        .with(router)
}

async fn start(mode: Mode) -> (SocketAddr, oneshot::Sender<()>) {
    start_limited(mode, 8).await
}

/// Starts a server on a free port. Dropping the sender shuts it down.
async fn start_limited(mode: Mode, max_connections: usize) -> (SocketAddr, oneshot::Sender<()>) {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(
        Server::bind(&addr.to_string())
            .max_connections(max_connections)
            .serve_with_shutdown(app(mode), async move { let _ = rx.await; }),
    );

    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    (addr, tx)
}

async fn get(addr: SocketAddr, target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {target} HTTP/1.1\r\nHost: test.local\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    raw
}

fn header<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.split("\r\n\r\n").next()?.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        k.eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

fn body(raw: &str) -> &str {
    raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
}

#[tokio::test]
async fn test_serves_routes_with_request_ids() {
    let (addr, _stop) = start(Mode::Development).await;

    let first = get(addr, "/hello/ada").await;
    assert!(first.starts_with("HTTP/1.1 200"));
    assert_eq!(body(&first), "hello ada");
    assert_eq!(header(&first, "content-type"), Some("text/plain; charset=utf-8"));
    let id: u64 = header(&first, "x-request-id").unwrap().parse().unwrap();

    let second = get(addr, "/hello/bob").await;
    let next_id: u64 = header(&second, "x-request-id").unwrap().parse().unwrap();
    assert!(next_id > id);
}

#[tokio::test]
async fn test_unmatched_and_unanswered_requests() {
    let (addr, _stop) = start(Mode::Development).await;

    assert!(get(addr, "/nope").await.starts_with("HTTP/1.1 404"));
    assert!(get(addr, "/empty").await.starts_with("HTTP/1.1 501"));
}

#[tokio::test]
async fn test_faults_become_500() {
    let (addr, _stop) = start(Mode::Development).await;
    let raw = get(addr, "/boom").await;
    assert!(raw.starts_with("HTTP/1.1 500"));
    assert_eq!(body(&raw), "handler: secret detail");

    let (addr, _stop) = start(Mode::Production).await;
    let raw = get(addr, "/boom").await;
    assert!(raw.starts_with("HTTP/1.1 500"));
    assert_eq!(body(&raw), "Internal Server Error");
}

#[tokio::test]
async fn test_pagination_headers_on_the_wire() {
    let (addr, _stop) = start(Mode::Development).await;
    let raw = get(addr, "/items?page=10").await;

    assert_eq!(header(&raw, "x-total-count"), Some("95"));
    assert_eq!(header(&raw, "x-total-pages"), Some("10"));
    assert_eq!(header(&raw, "x-page"), Some("10"));
    assert_eq!(header(&raw, "content-type"), Some("application/json"));
    assert_eq!(body(&raw), r#"["x"]"#);

    let link = header(&raw, "link").unwrap();
    assert!(link.contains("<http://test.local/items?page=9&size=10>; rel=\"prev\""));
    assert!(!link.contains("rel=\"next\""));
    assert!(!link.contains("rel=\"last\""));
}

/// Reads from a kept-alive connection until `needle` shows up.
async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&raw).contains(needle) {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before `{needle}` arrived");
        raw.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(raw).unwrap()
}

#[tokio::test]
async fn test_connection_limit_holds_back_extra_connections() {
    let (addr, _stop) = start_limited(Mode::Development, 1).await;

    // A keep-alive connection that has been served owns the only slot.
    let mut held = TcpStream::connect(addr).await.unwrap();
    held.write_all(b"GET /hello/first HTTP/1.1\r\nHost: test.local\r\n\r\n").await.unwrap();
    read_until(&mut held, "hello first").await;

    let mut waiting = TcpStream::connect(addr).await.unwrap();
    waiting
        .write_all(b"GET /hello/second HTTP/1.1\r\nHost: test.local\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let early = tokio::time::timeout(Duration::from_millis(300), waiting.read(&mut buf)).await;
    assert!(early.is_err(), "second connection was served while the first held the slot");

    drop(held);

    let mut raw = String::new();
    tokio::time::timeout(Duration::from_secs(5), waiting.read_to_string(&mut raw))
        .await
        .unwrap()
        .unwrap();
    assert!(raw.starts_with("HTTP/1.1 200"));
    assert_eq!(body(&raw), "hello second");
}
