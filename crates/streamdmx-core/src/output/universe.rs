use std::net::SocketAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::SenderConfig;
use crate::error::EngineError;
use crate::protocols::sacn::packet::check_universe;
use crate::protocols::sacn::{PacketError, SacnPacket, layout};
use crate::transport::SenderTransport;
use crate::universe::UniverseData;

/// Stream-terminated packets sent when a universe stops (E1.31 6.2.6).
const TERMINATION_PACKETS: usize = 3;

#[derive(Debug)]
struct OutputState {
    sequence: u8,
    last_sent: Option<Instant>,
    source_name: String,
    priority: u8,
}

/// One universe registered for output: its buffer plus send state.
///
/// The buffer is written by callers; [`UniverseOutput::poll`] runs on the
/// sender thread and decides whether a packet goes out.
#[derive(Debug)]
pub struct UniverseOutput {
    universe: u16,
    data: UniverseData,
    keep_alive: Duration,
    multicast: bool,
    unicast_targets: Vec<SocketAddr>,
    state: Mutex<OutputState>,
}

impl UniverseOutput {
    pub(crate) fn new(universe: u16, config: &SenderConfig) -> Result<Self, EngineError> {
        check_universe(universe)?;
        config.validate()?;
        Ok(Self {
            universe,
            data: UniverseData::new(),
            keep_alive: config.keep_alive_interval(),
            multicast: config.multicast,
            unicast_targets: config.unicast_targets.clone(),
            state: Mutex::new(OutputState {
                sequence: 0,
                last_sent: None,
                source_name: config.source_name.clone(),
                priority: config.priority,
            }),
        })
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Channel values sent for this universe.
    pub fn dmx(&self) -> &UniverseData {
        &self.data
    }

    pub fn set_source_name(&self, name: &str) -> Result<(), PacketError> {
        if name.len() >= layout::MAX_SOURCE_NAME_LEN {
            return Err(PacketError::SourceNameTooLong { length: name.len() });
        }
        self.state.lock().source_name = name.to_string();
        Ok(())
    }

    pub fn source_name(&self) -> String {
        self.state.lock().source_name.clone()
    }

    pub fn set_priority(&self, priority: u8) -> Result<(), PacketError> {
        if priority > layout::MAX_PRIORITY {
            return Err(PacketError::InvalidPriority { priority });
        }
        self.state.lock().priority = priority;
        Ok(())
    }

    pub fn priority(&self) -> u8 {
        self.state.lock().priority
    }

    /// Sequence number the next packet will carry.
    pub fn next_sequence(&self) -> u8 {
        self.state.lock().sequence
    }

    /// Instant of the last successful send.
    pub fn last_sent(&self) -> Option<Instant> {
        self.state.lock().last_sent
    }

    pub fn keep_alive_interval(&self) -> Duration {
        self.keep_alive
    }

    /// Whether a packet is due at `now`: the buffer changed, nothing was sent
    /// yet, or the keep-alive interval elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        let last_sent = self.state.lock().last_sent;
        self.data.is_dirty() || self.keep_alive_elapsed(last_sent, now)
    }

    fn keep_alive_elapsed(&self, last_sent: Option<Instant>, now: Instant) -> bool {
        last_sent.is_none_or(|at| now.saturating_duration_since(at) >= self.keep_alive)
    }

    /// Sends one packet if due. Returns whether a packet went out.
    ///
    /// The buffer copy and the dirty-flag clear happen in one critical
    /// section. On a failed send the buffer is re-marked dirty so the change
    /// is retried on the next poll.
    pub fn poll<T: SenderTransport + ?Sized>(
        &self,
        packet: &mut SacnPacket,
        transport: &T,
        now: Instant,
    ) -> Result<bool, EngineError> {
        let mut state = self.state.lock();
        if !self.data.is_dirty() && !self.keep_alive_elapsed(state.last_sent, now) {
            return Ok(false);
        }

        let (values, was_dirty) = self.data.take_snapshot();
        self.stamp(packet, &mut state)?;
        packet.set_dmx_slots(&values);

        match self.transmit(packet, transport) {
            Ok(()) => {
                state.last_sent = Some(now);
                Ok(true)
            }
            Err(err) => {
                if was_dirty {
                    self.data.mark_dirty();
                }
                Err(err)
            }
        }
    }

    /// Sends the stream-terminated packets announcing this source is gone.
    pub fn send_termination<T: SenderTransport + ?Sized>(
        &self,
        packet: &mut SacnPacket,
        transport: &T,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        packet.set_dmx_slots(&self.data.snapshot());
        packet.set_stream_terminated(true);
        let mut result = Ok(());
        for _ in 0..TERMINATION_PACKETS {
            if let Err(err) = self
                .stamp(packet, &mut state)
                .and_then(|()| self.transmit(packet, transport))
            {
                result = Err(err);
                break;
            }
        }
        packet.set_stream_terminated(false);
        result
    }

    fn stamp(&self, packet: &mut SacnPacket, state: &mut OutputState) -> Result<(), EngineError> {
        packet.set_universe(self.universe)?;
        packet.set_source_name(&state.source_name)?;
        packet.set_priority(state.priority)?;
        packet.set_sequence_number(state.sequence);
        state.sequence = state.sequence.wrapping_add(1);
        Ok(())
    }

    fn transmit<T: SenderTransport + ?Sized>(
        &self,
        packet: &SacnPacket,
        transport: &T,
    ) -> Result<(), EngineError> {
        let bytes = packet.raw_bytes();
        let mut first_error = None;
        if self.multicast {
            if let Err(err) = transport.send_multicast(bytes, self.universe) {
                first_error = Some(err);
            }
        }
        for &target in &self.unicast_targets {
            if let Err(err) = transport.send_unicast(bytes, target) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
