//! Post-accept socket configuration.
//!
//! # Responsibilities
//! - Define the capability the accept path invokes on every new socket
//! - Apply standard options (TCP_NODELAY, keepalive)
//! - Override SO_RCVBUF / SO_SNDBUF with fixed sizes, optionally logging
//!   the prior, requested and effective values
//!
//! # Design Decisions
//! - Socket option failures never escape `configure`; a connection is still
//!   handed to the protocol layer when tuning could not be applied
//! - The diagnostics decision is taken once and stored on the policy object

use std::io;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

use crate::config::SocketConfig;

/// Receive buffer size requested for every accepted socket.
pub const RECV_BUFFER_BYTES: usize = 2_097_152;

/// Send buffer size requested for every accepted socket.
pub const SEND_BUFFER_BYTES: usize = 2_097_152;

/// Invoked by the accept path on each newly accepted socket, before the
/// socket is handed to the connection factory chain.
pub trait SocketConfigurator: Send + Sync + 'static {
    fn configure(&self, stream: &TcpStream);
}

/// Kernel buffer-size options of a socket.
pub trait SocketBuffers {
    fn recv_buffer_size(&self) -> io::Result<usize>;
    fn set_recv_buffer_size(&self, size: usize) -> io::Result<()>;
    fn send_buffer_size(&self) -> io::Result<usize>;
    fn set_send_buffer_size(&self, size: usize) -> io::Result<()>;
}

impl SocketBuffers for SockRef<'_> {
    fn recv_buffer_size(&self) -> io::Result<usize> {
        socket2::Socket::recv_buffer_size(self)
    }

    fn set_recv_buffer_size(&self, size: usize) -> io::Result<()> {
        socket2::Socket::set_recv_buffer_size(self, size)
    }

    fn send_buffer_size(&self) -> io::Result<usize> {
        socket2::Socket::send_buffer_size(self)
    }

    fn set_send_buffer_size(&self, size: usize) -> io::Result<()> {
        socket2::Socket::set_send_buffer_size(self, size)
    }
}

/// Whether debug records from this module would be emitted right now.
pub fn debug_enabled() -> bool {
    tracing::enabled!(tracing::Level::DEBUG)
}

/// Standard per-socket setup shared by every connector.
#[derive(Debug, Clone, Default)]
pub struct StandardConfigurator {
    no_delay: bool,
    keepalive: Option<Duration>,
}

impl StandardConfigurator {
    pub fn new(no_delay: bool, keepalive: Option<Duration>) -> Self {
        Self { no_delay, keepalive }
    }

    pub fn from_config(config: &SocketConfig) -> Self {
        Self::new(config.no_delay, config.keepalive_secs.map(Duration::from_secs))
    }
}

impl SocketConfigurator for StandardConfigurator {
    fn configure(&self, stream: &TcpStream) {
        if let Err(e) = stream.set_nodelay(self.no_delay) {
            tracing::trace!(error = %e, "Ignoring TCP_NODELAY failure");
        }
        if let Some(idle) = self.keepalive {
            let keepalive = TcpKeepalive::new().with_time(idle);
            if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
                tracing::trace!(error = %e, "Ignoring keepalive failure");
            }
        }
    }
}

/// Overrides the kernel socket buffers with [`RECV_BUFFER_BYTES`] and
/// [`SEND_BUFFER_BYTES`] after the standard setup has run.
#[derive(Debug, Clone)]
pub struct BufferSizeConfigurator {
    standard: StandardConfigurator,
    diagnostics: bool,
}

impl BufferSizeConfigurator {
    pub fn new(standard: StandardConfigurator, diagnostics: bool) -> Self {
        Self { standard, diagnostics }
    }

    /// Build from socket config. An unset `diagnostics` is resolved here,
    /// once, from the active log filter.
    pub fn from_config(config: &SocketConfig) -> Self {
        let diagnostics = config.diagnostics.unwrap_or_else(debug_enabled);
        Self::new(StandardConfigurator::from_config(config), diagnostics)
    }

    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    /// Apply the buffer sizes to `socket`, swallowing any option failure.
    pub fn apply<S: SocketBuffers + ?Sized>(&self, socket: &S) {
        let result = if self.diagnostics {
            set_buffers_and_log(socket)
        } else {
            set_buffers(socket)
        };
        if let Err(e) = result {
            tracing::trace!(error = %e, "Ignoring socket buffer option failure");
        }
    }
}

impl SocketConfigurator for BufferSizeConfigurator {
    fn configure(&self, stream: &TcpStream) {
        self.standard.configure(stream);
        self.apply(&SockRef::from(stream));
    }
}

fn set_buffers<S: SocketBuffers + ?Sized>(socket: &S) -> io::Result<()> {
    socket.set_recv_buffer_size(RECV_BUFFER_BYTES)?;
    socket.set_send_buffer_size(SEND_BUFFER_BYTES)
}

fn set_buffers_and_log<S: SocketBuffers + ?Sized>(socket: &S) -> io::Result<()> {
    let prior_recv = socket.recv_buffer_size()?;
    let prior_send = socket.send_buffer_size()?;

    if let Err(e) = set_buffers(socket) {
        tracing::trace!(error = %e, "Ignoring socket buffer option failure");
    }

    let effective_recv = socket.recv_buffer_size()?;
    tracing::debug!(
        "SO_RCVBUF value prior: [{}], setting to: [{}], in effect: [{}]",
        prior_recv,
        RECV_BUFFER_BYTES,
        effective_recv
    );
    let effective_send = socket.send_buffer_size()?;
    tracing::debug!(
        "SO_SNDBUF value prior: [{}], setting to: [{}], in effect: [{}]",
        prior_send,
        SEND_BUFFER_BYTES,
        effective_send
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Captures debug-level messages.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn messages(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct MessageVisitor(Option<String>);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{:?}", value));
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Recorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != Level::DEBUG {
                return;
            }
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let Some(message) = visitor.0 {
                self.0.lock().unwrap().push(message);
            }
        }
    }

    fn recorded<F: FnOnce()>(f: F) -> Vec<String> {
        let recorder = Recorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        tracing::subscriber::with_default(subscriber, f);
        recorder.messages()
    }

    /// In-memory socket that doubles requested sizes like Linux does.
    struct FakeSocket {
        recv: Cell<usize>,
        send: Cell<usize>,
        requested: RefCell<Vec<(&'static str, usize)>>,
        fail_set_recv: bool,
        fail_reads: bool,
    }

    impl FakeSocket {
        fn new() -> Self {
            Self {
                recv: Cell::new(131_072),
                send: Cell::new(16_384),
                requested: RefCell::new(Vec::new()),
                fail_set_recv: false,
                fail_reads: false,
            }
        }

        fn failure() -> io::Error {
            io::Error::new(io::ErrorKind::InvalidInput, "socket closed")
        }
    }

    impl SocketBuffers for FakeSocket {
        fn recv_buffer_size(&self) -> io::Result<usize> {
            if self.fail_reads {
                return Err(Self::failure());
            }
            Ok(self.recv.get())
        }

        fn set_recv_buffer_size(&self, size: usize) -> io::Result<()> {
            self.requested.borrow_mut().push(("SO_RCVBUF", size));
            if self.fail_set_recv {
                return Err(Self::failure());
            }
            self.recv.set(size * 2);
            Ok(())
        }

        fn send_buffer_size(&self) -> io::Result<usize> {
            if self.fail_reads {
                return Err(Self::failure());
            }
            Ok(self.send.get())
        }

        fn set_send_buffer_size(&self, size: usize) -> io::Result<()> {
            self.requested.borrow_mut().push(("SO_SNDBUF", size));
            self.send.set(size * 2);
            Ok(())
        }
    }

    fn configurator(diagnostics: bool) -> BufferSizeConfigurator {
        BufferSizeConfigurator::new(StandardConfigurator::default(), diagnostics)
    }

    #[test]
    fn requests_fixed_sizes() {
        let socket = FakeSocket::new();
        configurator(false).apply(&socket);
        assert_eq!(
            *socket.requested.borrow(),
            vec![("SO_RCVBUF", 2_097_152), ("SO_SNDBUF", 2_097_152)]
        );
    }

    #[test]
    fn no_records_without_diagnostics() {
        let messages = recorded(|| {
            let configurator = configurator(false);
            for _ in 0..10 {
                configurator.apply(&FakeSocket::new());
            }
        });
        assert!(messages.is_empty(), "unexpected records: {:?}", messages);
    }

    #[test]
    fn diagnostics_emit_two_records_in_order() {
        let messages = recorded(|| configurator(true).apply(&FakeSocket::new()));
        assert_eq!(
            messages,
            vec![
                concat!(
                    "SO_RCVBUF value prior: [131072], setting to: [2097152], ",
                    "in effect: [4194304]"
                ),
                concat!(
                    "SO_SNDBUF value prior: [16384], setting to: [2097152], ",
                    "in effect: [4194304]"
                ),
            ]
        );
    }

    #[test]
    fn set_failure_does_not_escape() {
        let mut socket = FakeSocket::new();
        socket.fail_set_recv = true;
        configurator(false).apply(&socket);
        assert_eq!(*socket.requested.borrow(), vec![("SO_RCVBUF", 2_097_152)]);

        let healthy = FakeSocket::new();
        configurator(false).apply(&healthy);
        assert_eq!(healthy.recv.get(), 4_194_304);
        assert_eq!(healthy.send.get(), 4_194_304);
    }

    #[test]
    fn set_failure_with_diagnostics_still_reports() {
        let mut socket = FakeSocket::new();
        socket.fail_set_recv = true;
        let messages = recorded(|| configurator(true).apply(&socket));
        assert_eq!(
            messages,
            vec![
                concat!(
                    "SO_RCVBUF value prior: [131072], setting to: [2097152], ",
                    "in effect: [131072]"
                ),
                concat!(
                    "SO_SNDBUF value prior: [16384], setting to: [2097152], ",
                    "in effect: [16384]"
                ),
            ]
        );
    }

    #[test]
    fn read_failure_suppresses_records() {
        let mut socket = FakeSocket::new();
        socket.fail_reads = true;
        let messages = recorded(|| configurator(true).apply(&socket));
        assert!(messages.is_empty());
        assert!(socket.requested.borrow().is_empty());
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let socket = FakeSocket::new();
        let configurator = configurator(true);
        let messages = recorded(|| {
            configurator.apply(&socket);
            configurator.apply(&socket);
        });
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[2],
            "SO_RCVBUF value prior: [4194304], setting to: [2097152], in effect: [4194304]"
        );
        assert!(socket.requested.borrow().iter().all(|(_, size)| *size == 2_097_152));
    }

    #[test]
    fn unset_diagnostics_follow_log_filter() {
        let config = SocketConfig::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::filter::LevelFilter::DEBUG,
        );
        let enabled = tracing::subscriber::with_default(subscriber, || {
            BufferSizeConfigurator::from_config(&config).diagnostics()
        });
        assert!(enabled);

        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::filter::LevelFilter::INFO,
        );
        let disabled = tracing::subscriber::with_default(subscriber, || {
            BufferSizeConfigurator::from_config(&config).diagnostics()
        });
        assert!(!disabled);

        let forced = SocketConfig {
            diagnostics: Some(true),
            ..SocketConfig::default()
        };
        assert!(BufferSizeConfigurator::from_config(&forced).diagnostics());
    }

    #[tokio::test]
    async fn configures_live_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let standard = StandardConfigurator::new(true, Some(Duration::from_secs(60)));
        BufferSizeConfigurator::new(standard, false).configure(&stream);

        assert!(stream.nodelay().unwrap());
        let socket = SockRef::from(&stream);
        let recv = SocketBuffers::recv_buffer_size(&socket).unwrap();
        let send = SocketBuffers::send_buffer_size(&socket).unwrap();
        let recv_floor = kernel_capped(RECV_BUFFER_BYTES, "/proc/sys/net/core/rmem_max");
        let send_floor = kernel_capped(SEND_BUFFER_BYTES, "/proc/sys/net/core/wmem_max");
        assert!(recv >= recv_floor, "SO_RCVBUF {recv} below {recv_floor}");
        assert!(send >= send_floor, "SO_SNDBUF {send} below {send_floor}");
    }

    /// The kernel caps a buffer request at the sysctl maximum.
    fn kernel_capped(requested: usize, sysctl: &str) -> usize {
        std::fs::read_to_string(sysctl)
            .ok()
            .and_then(|max| max.trim().parse::<usize>().ok())
            .map_or(requested, |max| requested.min(max))
    }
}
