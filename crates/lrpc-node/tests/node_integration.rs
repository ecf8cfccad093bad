//! End-to-end tests: a real `Server` on a loopback port and `Client`s talking
//! to it over TCP.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lrpc_core::body::JsonCodec;
use lrpc_core::protocol::{Message, Metadata, SerializeKind};
use lrpc_node::application::echo;
use lrpc_node::{Client, ClientError, HandlerError, NodeConfig, Server, ServiceRegistry};

struct RunningServer {
    addr: std::net::SocketAddr,
    server: Arc<Server>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RunningServer {
    fn start(registry: ServiceRegistry) -> Self {
        let mut config = NodeConfig::default();
        config.server.port = 0;
        config.server.read_timeout_ms = 5_000;
        let server = Arc::new(Server::bind(&config, Arc::new(registry)).expect("bind"));
        let addr = server.local_addr().expect("local addr");
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let server = Arc::clone(&server);
            let running = Arc::clone(&running);
            thread::spawn(move || server.run(running))
        };

        Self {
            addr,
            server,
            running,
            thread: Some(thread),
        }
    }

    fn client(&self) -> Client {
        let client = Client::connect(self.addr).expect("connect");
        client
            .set_timeout(Some(Duration::from_secs(5)))
            .expect("set timeout");
        client
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

fn echo_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    echo::register(&mut registry);
    registry
}

#[test]
fn test_echo_call_over_tcp() {
    // Arrange
    let node = RunningServer::start(echo_registry());
    let mut client = node.client();
    let mut metadata = Metadata::new();
    metadata.insert("caller".to_string(), "integration".to_string());

    // Act
    let reply = client
        .call("echo", "Echo", metadata, SerializeKind::Raw, b"hello".to_vec())
        .expect("echo call");

    // Assert
    assert_eq!(reply.data, b"hello");
    assert_eq!(reply.serialize_kind, Some(SerializeKind::Raw));
}

#[test]
fn test_reverse_and_ping_share_one_connection() {
    let node = RunningServer::start(echo_registry());
    let mut client = node.client();

    let first = client
        .call("echo", "Reverse", Metadata::new(), SerializeKind::Raw, b"abc".to_vec())
        .unwrap();
    let ping_seq = client.ping().unwrap();
    let second = client
        .call("echo", "Reverse", Metadata::new(), SerializeKind::Raw, b"xyz".to_vec())
        .unwrap();

    assert_eq!(first.data, b"cba");
    assert_eq!(ping_seq, first.seq + 1);
    assert_eq!(second.data, b"zyx");
    assert_eq!(second.seq, ping_seq + 1);
}

#[test]
fn test_unknown_method_is_a_remote_error() {
    let node = RunningServer::start(echo_registry());
    let mut client = node.client();

    let err = client
        .call("echo", "Shout", Metadata::new(), SerializeKind::Raw, Vec::new())
        .unwrap_err();

    assert!(
        matches!(&err, ClientError::Remote(text) if text == "unknown method echo.Shout"),
        "unexpected error: {err}"
    );
    // The connection survives a failed call
    assert!(client.ping().is_ok());
}

#[test]
fn test_typed_json_call() {
    let mut registry = ServiceRegistry::new();
    registry.register("calc", "Sum", |call: &Message| -> Result<Vec<u8>, HandlerError> {
        let numbers: Vec<i64> = decode_numbers(call.data())?;
        Ok(numbers.iter().sum::<i64>().to_string().into_bytes())
    });
    let node = RunningServer::start(registry);
    let mut client = node.client();
    let mut total = 0i64;

    client
        .call_with("calc", "Sum", &JsonCodec, &vec![1i64, 2, 39], &mut total)
        .expect("sum call");

    assert_eq!(total, 42);
}

fn decode_numbers(data: &[u8]) -> Result<Vec<i64>, HandlerError> {
    use lrpc_core::body::Codec;
    let mut out: Vec<i64> = Vec::new();
    JsonCodec.decode(data, &mut out)?;
    Ok(out)
}

#[test]
fn test_oneway_is_dispatched_without_reply() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    {
        let hits = Arc::clone(&hits);
        registry.register("log", "Append", move |_: &Message| -> Result<Vec<u8>, HandlerError> {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });
    }
    let node = RunningServer::start(registry);
    let mut client = node.client();

    client
        .notify("log", "Append", Metadata::new(), SerializeKind::Raw, b"one".to_vec())
        .unwrap();
    // The ping reply proves the server has processed the earlier oneway
    client.ping().unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_clients() {
    let node = RunningServer::start(echo_registry());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let mut client = node.client();
            thread::spawn(move || {
                for round in 0..25 {
                    let body = format!("client-{i}-round-{round}").into_bytes();
                    let reply = client
                        .call("echo", "Echo", Metadata::new(), SerializeKind::Raw, body.clone())
                        .expect("echo");
                    assert_eq!(reply.data, body);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("client thread panicked");
    }

    // Connections reuse messages from the shared pool
    assert!(node.server.pool().stats().hits > 0);
}
