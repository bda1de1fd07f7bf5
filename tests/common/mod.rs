//! Shared utilities for integration testing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use configured_connector::net::SocketBuffers;
use configured_connector::{
    BufferSizeConfigurator, RunningConnector, SocketConfigurator, RECV_BUFFER_BYTES,
    SEND_BUFFER_BYTES,
};
use socket2::SockRef;
use tokio::net::TcpStream;

/// Runs the buffer-size policy and records what each socket ended up with.
pub struct RecordingConfigurator {
    inner: BufferSizeConfigurator,
    effective: Mutex<Vec<(usize, usize)>>,
}

impl RecordingConfigurator {
    pub fn new(inner: BufferSizeConfigurator) -> Arc<Self> {
        Arc::new(Self {
            inner,
            effective: Mutex::new(Vec::new()),
        })
    }

    /// (SO_RCVBUF, SO_SNDBUF) observed after configuration, per connection.
    pub fn effective(&self) -> Vec<(usize, usize)> {
        self.effective.lock().unwrap().clone()
    }
}

impl SocketConfigurator for RecordingConfigurator {
    fn configure(&self, stream: &TcpStream) {
        self.inner.configure(stream);
        let socket = SockRef::from(stream);
        let recv = SocketBuffers::recv_buffer_size(&socket).unwrap();
        let send = SocketBuffers::send_buffer_size(&socket).unwrap();
        self.effective.lock().unwrap().push((recv, send));
    }
}

/// HTTP client that opens a fresh connection per request.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub fn url(running: &RunningConnector, path: &str) -> String {
    format!("http://{}{}", running.local_addr(), path)
}

/// Lowest SO_RCVBUF a tuned socket may report: the kernel caps the request at
/// `rmem_max` (and reports double what it stores).
pub fn recv_floor() -> usize {
    kernel_capped(RECV_BUFFER_BYTES, "/proc/sys/net/core/rmem_max")
}

/// Lowest SO_SNDBUF a tuned socket may report, capped by `wmem_max`.
pub fn send_floor() -> usize {
    kernel_capped(SEND_BUFFER_BYTES, "/proc/sys/net/core/wmem_max")
}

fn kernel_capped(requested: usize, sysctl: &str) -> usize {
    std::fs::read_to_string(sysctl)
        .ok()
        .and_then(|max| max.trim().parse::<usize>().ok())
        .map_or(requested, |max| requested.min(max))
}

/// Assert every recorded connection got at least the kernel-permitted sizes.
pub fn assert_tuned(effective: &[(usize, usize)]) {
    let (recv_floor, send_floor) = (recv_floor(), send_floor());
    for &(recv, send) in effective {
        assert!(recv >= recv_floor, "SO_RCVBUF {recv} below {recv_floor}");
        assert!(send >= send_floor, "SO_SNDBUF {send} below {send_floor}");
    }
}
