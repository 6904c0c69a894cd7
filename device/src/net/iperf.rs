//! iperf2 TCP sink
//!
//! Accepts one client at a time, discards the payload and logs the client
//! header and the achieved throughput when the connection closes.

use atstart_core::iperf::{
    ClientHeader, ConnState, DEFAULT_PORT, HeaderAccumulator, SessionEvent, SessionStats, TestLength,
    session_event,
};
use smoltcp::iface::{SocketHandle, SocketSet};
use smoltcp::socket::tcp;
use static_cell::ConstStaticCell;

use super::NetStack;

const RX_LEN: usize = 8 * 1024;
const TX_LEN: usize = 256;

static RX_BUFFER: ConstStaticCell<[u8; RX_LEN]> = ConstStaticCell::new([0; RX_LEN]);
static TX_BUFFER: ConstStaticCell<[u8; TX_LEN]> = ConstStaticCell::new([0; TX_LEN]);

#[derive(Clone, Copy, Debug, defmt::Format)]
pub struct IperfConfig {
    pub port: u16,
}

impl Default for IperfConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

struct Session {
    header: HeaderAccumulator,
    stats: SessionStats,
}

pub struct IperfServer {
    handle: SocketHandle,
    port: u16,
    session: Option<Session>,
}

impl IperfServer {
    /// Add the listening socket to `stack`. Only one server can exist.
    pub fn new(stack: &mut NetStack, config: &IperfConfig) -> Self {
        let socket = tcp::Socket::new(
            tcp::SocketBuffer::new(&mut RX_BUFFER.take()[..]),
            tcp::SocketBuffer::new(&mut TX_BUFFER.take()[..]),
        );
        let handle = stack.sockets().add(socket);
        defmt::info!("iperf: listening on port {}", config.port);
        Self {
            handle,
            port: config.port,
            session: None,
        }
    }

    pub(super) fn poll(&mut self, sockets: &mut SocketSet<'static>, now_ms: u64) {
        let socket = sockets.get_mut::<tcp::Socket>(self.handle);

        match session_event(self.session.is_some(), conn_state(socket)) {
            SessionEvent::Start => {
                if let Some(remote) = socket.remote_endpoint() {
                    defmt::info!("iperf: client {}", remote);
                }
                self.session = Some(Session {
                    header: HeaderAccumulator::new(),
                    stats: SessionStats::start(now_ms),
                });
            }
            SessionEvent::Finish => {
                if let Some(session) = self.session.take() {
                    report(&session.stats);
                }
            }
            SessionEvent::Idle => {}
        }

        if !socket.is_open() {
            if let Err(e) = socket.listen(self.port) {
                defmt::error!("iperf: listen failed: {}", e);
            }
            return;
        }

        if let Some(session) = self.session.as_mut() {
            while socket.can_recv() {
                let received = socket.recv(|data| {
                    if let Some(header) = session.header.feed(data) {
                        log_header(&header);
                    }
                    (data.len(), data.len())
                });
                match received {
                    Ok(0) => break,
                    Ok(n) => session.stats.record(n, now_ms),
                    Err(e) => {
                        defmt::warn!("iperf: recv: {}", e);
                        break;
                    }
                }
            }
        }

        // Client finished sending
        if socket.state() == tcp::State::CloseWait {
            socket.close();
        }
    }
}

fn conn_state(socket: &tcp::Socket) -> ConnState {
    match socket.state() {
        tcp::State::Closed | tcp::State::TimeWait => ConnState::Closed,
        tcp::State::Listen => ConnState::Listening,
        tcp::State::SynSent | tcp::State::SynReceived => ConnState::Handshaking,
        _ => ConnState::Connected,
    }
}

fn log_header(header: &ClientHeader) {
    if !header.has_settings() {
        return;
    }
    match header.test_length() {
        TestLength::Bytes(n) => defmt::info!("iperf: {} bytes, buffer {}", n, header.buffer_len),
        TestLength::Centiseconds(cs) => {
            defmt::info!("iperf: {} ms, buffer {}", cs * 10, header.buffer_len)
        }
    }
}

fn report(stats: &SessionStats) {
    defmt::info!(
        "iperf: {} bytes in {} ms, {} kbit/s",
        stats.bytes,
        stats.duration_ms(),
        stats.kbits_per_sec()
    );
}
