//! End-to-end tests: real TCP server, real client

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use pulse_client::{BufferClient, ClientError};
use pulse_protocol::{DataType, Event, Header, SampleBlock, Status, WakeReason};
use pulse_server::{BufferServer, ClientId, Monitor, ServerConfig, ServerError};
use pulse_store::{DataStore, RingDataStore};

/// Start a server on an ephemeral port and wait until it is listening
async fn start_server(store: Arc<dyn DataStore>) -> (Arc<BufferServer>, SocketAddr) {
    let config = ServerConfig {
        address: "127.0.0.1".into(),
        port: 0,
        nodelay: true,
    };
    let server = Arc::new(BufferServer::new(config, store));
    server.spawn();

    let addr = loop {
        if let Some(addr) = server.local_addr() {
            break addr;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    (server, addr)
}

async fn start_ring_server(samples: usize, events: usize) -> (Arc<BufferServer>, SocketAddr) {
    let store = Arc::new(RingDataStore::new(samples, events).unwrap());
    start_server(store).await
}

fn byte_header() -> Header {
    Header::new(1, 100.0, DataType::U8)
}

fn byte_block(start: u64, columns: u64) -> SampleBlock {
    let data: Vec<u8> = (start..start + columns).map(|v| v as u8).collect();
    SampleBlock::new(1, columns, DataType::U8, Bytes::from(data)).unwrap()
}

// ============================================================================
// Round trips
// ============================================================================

#[tokio::test]
async fn test_put_and_get_over_the_wire() {
    let (_server, addr) = start_ring_server(100, 100).await;
    let mut client = BufferClient::connect(addr).await.unwrap();

    let header = Header::new(1, 100.0, DataType::U8);
    client.put_header(header.clone()).await.unwrap();
    assert_eq!(client.get_header().await.unwrap(), header);

    client.put_samples(byte_block(0, 10)).await.unwrap();
    client
        .put_events(vec![Event::marker("trigger", 3)])
        .await
        .unwrap();

    let counts = client.get_counts().await.unwrap();
    assert_eq!(counts.samples, 10);
    assert_eq!(counts.events, 1);

    let block = client.get_samples(2, 6).await.unwrap();
    assert_eq!(block.data().to_vec(), vec![2, 3, 4, 5]);

    let events = client.get_events(0, 1).await.unwrap();
    assert_eq!(events[0].kind, "trigger");
    assert_eq!(events[0].sample, 3);
}

#[tokio::test]
async fn test_flushes_over_the_wire() {
    let (_server, addr) = start_ring_server(100, 100).await;
    let mut client = BufferClient::connect(addr).await.unwrap();

    client.put_header(byte_header()).await.unwrap();
    client.put_samples(byte_block(0, 5)).await.unwrap();
    client.put_events(vec![Event::marker("e", 0)]).await.unwrap();

    client.flush_data().await.unwrap();
    let counts = client.get_counts().await.unwrap();
    assert_eq!(counts.samples, 0);
    assert_eq!(counts.events, 1);

    client.flush_events().await.unwrap();
    assert_eq!(client.get_counts().await.unwrap().events, 0);

    client.flush_header().await.unwrap();
    let err = client.get_header().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Server {
            status: Status::NoHeader,
            ..
        }
    ));
}

// ============================================================================
// Error responses keep the connection usable
// ============================================================================

#[tokio::test]
async fn test_data_error_does_not_close_connection() {
    let (_server, addr) = start_ring_server(100, 100).await;
    let mut client = BufferClient::connect(addr).await.unwrap();

    // No header yet: rejected, but the connection survives
    let err = client.put_samples(byte_block(0, 1)).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Server {
            status: Status::NoHeader,
            ..
        }
    ));

    client.put_header(byte_header()).await.unwrap();
    client.put_samples(byte_block(0, 1)).await.unwrap();
}

#[tokio::test]
async fn test_channel_mismatch_over_the_wire() {
    let (_server, addr) = start_ring_server(100, 100).await;
    let mut client = BufferClient::connect(addr).await.unwrap();

    client
        .put_header(Header::new(4, 100.0, DataType::U8))
        .await
        .unwrap();

    let block = SampleBlock::new(2, 1, DataType::U8, Bytes::from(vec![0u8; 2])).unwrap();
    let err = client.put_samples(block).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Server {
            status: Status::ChannelMismatch,
            ..
        }
    ));
    assert_eq!(client.get_counts().await.unwrap().samples, 0);
}

#[tokio::test]
async fn test_eviction_error_over_the_wire() {
    let (_server, addr) = start_ring_server(10, 10).await;
    let mut client = BufferClient::connect(addr).await.unwrap();

    client.put_header(byte_header()).await.unwrap();
    for i in 0..15 {
        client.put_samples(byte_block(i, 1)).await.unwrap();
    }

    let err = client.get_samples(0, 1).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Server {
            status: Status::Evicted,
            ..
        }
    ));

    let block = client.get_samples(5, 10).await.unwrap();
    assert_eq!(block.data().to_vec(), vec![5, 6, 7, 8, 9]);
}

// ============================================================================
// Wait-for-data across connections
// ============================================================================

#[tokio::test]
async fn test_waiter_woken_by_another_client() {
    let (_server, addr) = start_ring_server(100, 100).await;

    let mut producer = BufferClient::connect(addr).await.unwrap();
    producer.put_header(byte_header()).await.unwrap();

    let mut consumer = BufferClient::connect(addr).await.unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        producer.put_samples(byte_block(0, 10)).await.unwrap();
    });

    let started = Instant::now();
    let (counts, wake) = consumer
        .wait_for_data(10, u64::MAX, Duration::from_secs(5))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(wake, WakeReason::Satisfied);
    assert!(counts.samples >= 10);
    assert!(elapsed < Duration::from_secs(2), "woke too late: {elapsed:?}");
}

#[tokio::test]
async fn test_wait_timeout_over_the_wire() {
    let (_server, addr) = start_ring_server(100, 100).await;
    let mut client = BufferClient::connect(addr).await.unwrap();
    client.put_header(byte_header()).await.unwrap();

    let started = Instant::now();
    let (counts, wake) = client
        .wait_for_data(u64::MAX, u64::MAX, Duration::from_millis(200))
        .await
        .unwrap();

    assert_eq!(wake, WakeReason::Timeout);
    assert_eq!(counts.samples, 0);
    assert!(started.elapsed() >= Duration::from_millis(180));
}

#[tokio::test]
async fn test_flush_header_wakes_remote_waiter() {
    let (server, addr) = start_ring_server(100, 100).await;
    let mut client = BufferClient::connect(addr).await.unwrap();
    client.put_header(byte_header()).await.unwrap();

    let flusher = Arc::clone(&server);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        flusher.flush_header();
    });

    let started = Instant::now();
    let (counts, wake) = client
        .wait_for_data(1000, u64::MAX, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(wake, WakeReason::Flushed);
    assert_eq!(counts.samples, 0);
    assert!(started.elapsed() < Duration::from_secs(2));
}

// ============================================================================
// Monitor notifications
// ============================================================================

/// Records header_put notifications for the parity check
#[derive(Default)]
struct RecordingMonitor {
    headers: Mutex<Vec<(ClientId, Header)>>,
    connects: Mutex<Vec<ClientId>>,
}

impl Monitor for RecordingMonitor {
    fn client_connected(&self, client: ClientId, _peer: std::net::SocketAddr, _at_ms: u64) {
        self.connects.lock().push(client);
    }

    fn header_put(&self, client: ClientId, header: &Header, _at_ms: u64) {
        self.headers.lock().push((client, header.clone()));
    }
}

#[tokio::test]
async fn test_admin_and_network_put_header_notify_identically() {
    let (server, addr) = start_ring_server(100, 100).await;
    let monitor = Arc::new(RecordingMonitor::default());
    server.add_monitor(Arc::clone(&monitor) as Arc<dyn Monitor>);

    // Administrative path
    assert!(server.put_header(4, 100.0, DataType::F32));

    // Network path, same header
    let mut client = BufferClient::connect(addr).await.unwrap();
    client
        .put_header(Header::new(4, 100.0, DataType::F32))
        .await
        .unwrap();

    let headers = monitor.headers.lock();
    assert_eq!(headers.len(), 2);
    let (admin_id, admin_header) = &headers[0];
    let (client_id, client_header) = &headers[1];

    // Only the acting identity differs
    assert_eq!(*admin_id, ClientId::SERVER);
    assert_eq!(*client_id, ClientId(0));
    assert_eq!(admin_header, client_header);
}

#[tokio::test]
async fn test_client_ids_are_sequential_from_zero() {
    let (server, addr) = start_ring_server(100, 100).await;
    let monitor = Arc::new(RecordingMonitor::default());
    server.add_monitor(Arc::clone(&monitor) as Arc<dyn Monitor>);

    let _a = BufferClient::connect(addr).await.unwrap();
    let _b = BufferClient::connect(addr).await.unwrap();
    let _c = BufferClient::connect(addr).await.unwrap();

    // Connection admission is async to the accept loop
    tokio::time::sleep(Duration::from_millis(100)).await;

    let connects = monitor.connects.lock();
    assert_eq!(*connects, vec![ClientId(0), ClientId(1), ClientId(2)]);
}

#[tokio::test]
async fn test_admin_put_header_rejects_bad_parameters() {
    let (server, _addr) = start_ring_server(100, 100).await;
    assert!(!server.put_header(0, 100.0, DataType::F32));
    assert!(server.put_header(4, 100.0, DataType::F32));
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_stop_interrupts_parked_waiter() {
    let (server, addr) = start_ring_server(100, 100).await;
    let mut client = BufferClient::connect(addr).await.unwrap();
    client.put_header(byte_header()).await.unwrap();

    let stopper = Arc::clone(&server);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stopper.stop();
    });

    // The server drops the connection mid-wait instead of riding out
    // the 10 second timeout
    let started = Instant::now();
    let result = client
        .wait_for_data(1000, u64::MAX, Duration::from_secs(10))
        .await;
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert!(elapsed < Duration::from_secs(2), "disconnect too slow: {elapsed:?}");
}

#[tokio::test]
async fn test_disconnect_drops_only_the_target_client() {
    let (server, addr) = start_ring_server(100, 100).await;

    let mut target = BufferClient::connect(addr).await.unwrap();
    target.put_header(byte_header()).await.unwrap();
    let mut other = BufferClient::connect(addr).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.client_count(), 2);

    // First connection got id 0; cut it while it is parked in a wait
    let disconnector = Arc::clone(&server);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        disconnector.disconnect(ClientId(0));
    });

    let started = Instant::now();
    let result = target
        .wait_for_data(1000, u64::MAX, Duration::from_secs(10))
        .await;
    let elapsed = started.elapsed();

    assert!(result.is_err());
    assert!(elapsed < Duration::from_secs(2), "disconnect too slow: {elapsed:?}");

    // The other connection is untouched
    assert_eq!(other.get_counts().await.unwrap().samples, 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.client_count(), 1);

    // Already gone: a second disconnect finds nothing to cut
    assert!(!server.disconnect(ClientId(0)));
}

#[tokio::test]
async fn test_stop_empties_the_registry() {
    let (server, addr) = start_ring_server(100, 100).await;
    let _a = BufferClient::connect(addr).await.unwrap();
    let _b = BufferClient::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.client_count(), 2);

    server.stop();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.client_count(), 0);
}

#[tokio::test]
async fn test_bind_error_is_fatal_at_startup() {
    let (_server, addr) = start_ring_server(100, 100).await;

    let config = ServerConfig {
        address: "127.0.0.1".into(),
        port: addr.port(),
        nodelay: true,
    };
    let store: Arc<dyn DataStore> = Arc::new(RingDataStore::with_capacity(10).unwrap());
    let second = Arc::new(BufferServer::new(config, store));

    let err = second.run().await.unwrap_err();
    assert!(matches!(err, ServerError::Bind { .. }));
}
