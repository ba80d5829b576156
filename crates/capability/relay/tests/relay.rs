use iregul_decoder::TextFrameDecoder;
use iregul_relay::{FrameTap, ObservationStore, RelayConfig, RelayHandle, RelayServer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const FRAME: &[u8] = b"START;T=2024-01-01T00:00:00;G=2;...";

struct Relay {
    handle: RelayHandle,
    addr: SocketAddr,
    store: Arc<ObservationStore>,
    task: JoinHandle<()>,
}

async fn start_relay(upstream_addr: String) -> Relay {
    start_relay_with_linger(upstream_addr, Duration::from_millis(200)).await
}

async fn start_relay_with_linger(upstream_addr: String, linger: Duration) -> Relay {
    let store = Arc::new(ObservationStore::new());
    let tap = FrameTap::new(Arc::new(TextFrameDecoder::new()), Arc::clone(&store));
    let mut config = RelayConfig::new("127.0.0.1:0", upstream_addr);
    config.connect_timeout = Duration::from_secs(1);
    config.linger = linger;

    let server = RelayServer::bind(config, tap, CancellationToken::new())
        .await
        .expect("bind relay");
    let handle = server.handle();
    let addr = server.local_addr();
    let task = tokio::spawn(server.run());
    Relay {
        handle,
        addr,
        store,
        task,
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn relays_bytes_and_publishes_snapshot() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay = start_relay(upstream.local_addr().unwrap().to_string()).await;
    assert!(relay.handle.is_running());

    let mut device = TcpStream::connect(relay.addr).await.unwrap();
    let (mut server, _) = upstream.accept().await.unwrap();

    device.write_all(FRAME).await.unwrap();
    let mut received = vec![0u8; FRAME.len()];
    server.read_exact(&mut received).await.unwrap();
    assert_eq!(received, FRAME);

    let snapshot = relay.store.read().expect("snapshot published");
    assert_eq!(
        snapshot.timestamp.map(|ts| ts.to_string()).as_deref(),
        Some("2024-01-01 00:00:00")
    );
    assert_eq!(snapshot.count, 2);
    assert_eq!(snapshot.raw.as_bytes(), FRAME);

    let reply: Vec<u8> = (0..20_000u32).map(|i| (i % 253) as u8).collect();
    server.write_all(&reply).await.unwrap();
    let mut echoed = vec![0u8; reply.len()];
    device.read_exact(&mut echoed).await.unwrap();
    assert_eq!(echoed, reply);

    assert!(wait_for(|| relay.handle.active_sessions() == 1).await);
}

#[tokio::test]
async fn garbage_is_forwarded_without_touching_snapshot() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay = start_relay(upstream.local_addr().unwrap().to_string()).await;

    let mut device = TcpStream::connect(relay.addr).await.unwrap();
    let (mut server, _) = upstream.accept().await.unwrap();

    device.write_all(b"GARBAGE").await.unwrap();
    let mut received = [0u8; 7];
    server.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"GARBAGE");
    assert!(relay.store.read().is_none());

    device.write_all(FRAME).await.unwrap();
    let mut frame = vec![0u8; FRAME.len()];
    server.read_exact(&mut frame).await.unwrap();
    let published = relay.store.read().expect("snapshot published");

    device.write_all(b"GARBAGE").await.unwrap();
    server.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"GARBAGE");
    let current = relay.store.read().expect("snapshot kept");
    assert!(Arc::ptr_eq(&published, &current));
}

#[tokio::test]
async fn unreachable_upstream_closes_client_and_keeps_accepting() {
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = probe.local_addr().unwrap();
    drop(probe);

    let relay = start_relay(upstream_addr.to_string()).await;

    let mut rejected = TcpStream::connect(relay.addr).await.unwrap();
    let mut buf = [0u8; 16];
    let closed = tokio::time::timeout(Duration::from_secs(3), rejected.read(&mut buf))
        .await
        .expect("client should be closed promptly");
    assert!(matches!(closed, Ok(0) | Err(_)));
    assert_eq!(relay.handle.active_sessions(), 0);
    assert!(relay.handle.is_running());

    // 上游恢复后，新连接正常转发
    let upstream = TcpListener::bind(upstream_addr).await.unwrap();
    let mut device = TcpStream::connect(relay.addr).await.unwrap();
    let (mut server, _) = upstream.accept().await.unwrap();
    device.write_all(b"hello").await.unwrap();
    let mut received = [0u8; 5];
    server.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"hello");
}

#[tokio::test]
async fn closing_device_closes_both_connections() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay = start_relay(upstream.local_addr().unwrap().to_string()).await;

    let device = TcpStream::connect(relay.addr).await.unwrap();
    let (mut server, _) = upstream.accept().await.unwrap();
    assert!(wait_for(|| relay.handle.active_sessions() == 1).await);

    drop(device);

    // 上游收到 EOF；即便上游不主动关闭，linger 过后会话也会结束
    let mut rest = Vec::new();
    let eof = tokio::time::timeout(Duration::from_secs(3), server.read_to_end(&mut rest))
        .await
        .expect("upstream should see EOF");
    assert!(eof.is_ok());
    assert!(wait_for(|| relay.handle.active_sessions() == 0).await);
}

#[tokio::test]
async fn device_reset_closes_upstream_without_waiting_for_linger() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    // linger 远大于断言期限：只有错误路径能让会话及时结束
    let relay = start_relay_with_linger(
        upstream.local_addr().unwrap().to_string(),
        Duration::from_secs(60),
    )
    .await;

    let device = TcpStream::connect(relay.addr).await.unwrap();
    let (mut server, _) = upstream.accept().await.unwrap();
    assert!(wait_for(|| relay.handle.active_sessions() == 1).await);

    // SO_LINGER=0 后关闭会发送 RST
    #[allow(deprecated)]
    device.set_linger(Some(Duration::ZERO)).unwrap();
    drop(device);

    let mut rest = Vec::new();
    let eof = tokio::time::timeout(Duration::from_secs(1), server.read_to_end(&mut rest))
        .await
        .expect("upstream should be closed promptly");
    assert!(eof.is_ok());

    let closed = tokio::time::timeout(Duration::from_secs(1), async {
        while relay.handle.active_sessions() != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(closed.is_ok(), "session should end well before the linger");
}

#[tokio::test]
async fn stop_releases_listener_but_keeps_sessions() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay = start_relay(upstream.local_addr().unwrap().to_string()).await;

    let mut device = TcpStream::connect(relay.addr).await.unwrap();
    let (mut server, _) = upstream.accept().await.unwrap();
    assert!(wait_for(|| relay.handle.active_sessions() == 1).await);

    relay.handle.stop();
    tokio::time::timeout(Duration::from_secs(2), relay.task)
        .await
        .expect("accept loop should exit")
        .unwrap();
    assert!(!relay.handle.is_running());
    assert!(TcpStream::connect(relay.addr).await.is_err());

    device.write_all(b"still relaying").await.unwrap();
    let mut received = [0u8; 14];
    server.read_exact(&mut received).await.unwrap();
    assert_eq!(&received, b"still relaying");
    assert_eq!(relay.handle.active_sessions(), 1);
}

#[tokio::test]
async fn shutdown_drains_active_sessions() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay = start_relay(upstream.local_addr().unwrap().to_string()).await;

    let mut device = TcpStream::connect(relay.addr).await.unwrap();
    let (_server, _) = upstream.accept().await.unwrap();
    assert!(wait_for(|| relay.handle.active_sessions() == 1).await);

    assert!(relay.handle.shutdown(Duration::from_secs(2)).await);
    assert_eq!(relay.handle.active_sessions(), 0);

    let mut buf = [0u8; 8];
    let closed = tokio::time::timeout(Duration::from_secs(2), device.read(&mut buf))
        .await
        .expect("device connection should be closed");
    assert!(matches!(closed, Ok(0) | Err(_)));
}
