//! iperf2 TCP throughput test: client header and session accounting

/// Port the iperf2 server listens on
pub const DEFAULT_PORT: u16 = 5001;

/// Size of the iperf2 client header at the start of the stream
pub const HEADER_LEN: usize = 24;

/// Header carries valid settings
pub const HEADER_VERSION1: u32 = 0x8000_0000;
/// Dual test requested immediately
pub const RUN_NOW: u32 = 0x0000_0001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("iperf header needs 24 bytes, got {0}")]
pub struct TruncatedHeader(pub usize);

/// How long the client intends to send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestLength {
    Bytes(u32),
    /// Duration in 10 ms units
    Centiseconds(u32),
}

/// Settings an iperf2 client sends before its payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClientHeader {
    pub flags: u32,
    pub num_threads: u32,
    pub port: u32,
    pub buffer_len: u32,
    pub win_band: u32,
    pub amount: i32,
}

impl ClientHeader {
    /// Header for a plain timed upload
    pub fn timed(duration_ms: u32, port: u16, buffer_len: u32) -> Self {
        Self {
            flags: 0,
            num_threads: 1,
            port: port as u32,
            buffer_len,
            win_band: 0,
            amount: -((duration_ms / 10).min(i32::MAX as u32) as i32),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, TruncatedHeader> {
        let bytes: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(TruncatedHeader(bytes.len()))?;
        let word = |i: usize| u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Ok(Self {
            flags: word(0),
            num_threads: word(4),
            port: word(8),
            buffer_len: word(12),
            win_band: word(16),
            amount: word(20) as i32,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let words = [
            self.flags,
            self.num_threads,
            self.port,
            self.buffer_len,
            self.win_band,
            self.amount as u32,
        ];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// Settings are only meaningful when the client set the version bit
    pub fn has_settings(&self) -> bool {
        self.flags & HEADER_VERSION1 != 0
    }

    pub fn test_length(&self) -> TestLength {
        if self.amount < 0 {
            TestLength::Centiseconds(self.amount.unsigned_abs())
        } else {
            TestLength::Bytes(self.amount as u32)
        }
    }
}

/// Collects the first [`HEADER_LEN`] bytes of a stream across segments
#[derive(Debug)]
pub struct HeaderAccumulator {
    buf: [u8; HEADER_LEN],
    filled: usize,
    done: bool,
}

impl HeaderAccumulator {
    pub const fn new() -> Self {
        Self {
            buf: [0; HEADER_LEN],
            filled: 0,
            done: false,
        }
    }

    /// Feed received bytes; yields the header exactly once
    pub fn feed(&mut self, data: &[u8]) -> Option<ClientHeader> {
        if self.done {
            return None;
        }
        let take = (HEADER_LEN - self.filled).min(data.len());
        self.buf[self.filled..self.filled + take].copy_from_slice(&data[..take]);
        self.filled += take;
        if self.filled < HEADER_LEN {
            return None;
        }
        self.done = true;
        ClientHeader::parse(&self.buf).ok()
    }
}

impl Default for HeaderAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte count and timing of one iperf connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    pub bytes: u64,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SessionStats {
    pub const fn start(now_ms: u64) -> Self {
        Self {
            bytes: 0,
            start_ms: now_ms,
            end_ms: now_ms,
        }
    }

    pub fn record(&mut self, bytes: usize, now_ms: u64) {
        self.bytes += bytes as u64;
        self.end_ms = self.end_ms.max(now_ms);
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Throughput in kbit/s (bits per millisecond)
    pub fn kbits_per_sec(&self) -> u64 {
        match self.duration_ms() {
            0 => 0,
            ms => self.bytes * 8 / ms,
        }
    }
}

/// Coarse TCP state of the server socket
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnState {
    Closed,
    Listening,
    Handshaking,
    /// Handshake done, possibly already half closed by the client
    Connected,
}

/// What the server does with its session after a poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    Idle,
    Start,
    Finish,
}

/// A single poll can take the socket from a half-open handshake straight to
/// close-wait, so any connected state starts a session.
pub const fn session_event(session_open: bool, state: ConnState) -> SessionEvent {
    match (session_open, state) {
        (false, ConnState::Connected) => SessionEvent::Start,
        (true, ConnState::Closed | ConnState::Listening) => SessionEvent::Finish,
        _ => SessionEvent::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_header_round_trips() {
        let header = ClientHeader::timed(10_000, DEFAULT_PORT, 128 * 1024);
        assert_eq!(header.test_length(), TestLength::Centiseconds(1_000));
        assert_eq!(ClientHeader::parse(&header.encode()), Ok(header));
        assert!(!header.has_settings());
    }

    #[test]
    fn short_input_is_rejected() {
        assert_eq!(ClientHeader::parse(&[0u8; 10]), Err(TruncatedHeader(10)));
    }

    #[test]
    fn header_arrives_in_pieces() {
        let mut header = ClientHeader::timed(5_000, DEFAULT_PORT, 1460);
        header.flags = HEADER_VERSION1 | RUN_NOW;
        let bytes = header.encode();

        let mut acc = HeaderAccumulator::new();
        assert_eq!(acc.feed(&bytes[..7]), None);
        assert_eq!(acc.feed(&bytes[7..20]), None);
        let parsed = acc.feed(&bytes[20..]).unwrap();
        assert!(parsed.has_settings());
        assert_eq!(parsed.amount, -500);
        // only once
        assert_eq!(acc.feed(&bytes), None);
    }

    #[test]
    fn short_run_seen_only_after_client_closed() {
        // Listen -> (ACK, data, FIN in one poll) -> close-wait
        assert_eq!(session_event(false, ConnState::Listening), SessionEvent::Idle);
        assert_eq!(session_event(false, ConnState::Handshaking), SessionEvent::Idle);
        assert_eq!(session_event(false, ConnState::Connected), SessionEvent::Start);
        assert_eq!(session_event(true, ConnState::Connected), SessionEvent::Idle);
        assert_eq!(session_event(true, ConnState::Closed), SessionEvent::Finish);
        assert_eq!(session_event(false, ConnState::Closed), SessionEvent::Idle);
    }

    #[test]
    fn throughput_in_kbit_per_second() {
        let mut stats = SessionStats::start(1_000);
        stats.record(1_250_000, 1_500);
        stats.record(1_250_000, 2_000);
        assert_eq!(stats.duration_ms(), 1_000);
        // 2.5 MB in one second
        assert_eq!(stats.kbits_per_sec(), 20_000);
        assert_eq!(SessionStats::start(7).kbits_per_sec(), 0);
    }
}
