use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::config::ReceiverConfig;
use crate::error::EngineError;
use crate::protocols::sacn::SacnPacket;
use crate::protocols::sacn::layout;
use crate::protocols::sacn::packet::check_universe;
use crate::universe::UniverseData;

/// The source that sent the last accepted packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub cid: Uuid,
    pub priority: u8,
    pub sequence: u8,
    pub preview: bool,
    pub last_seen: Instant,
}

impl SourceInfo {
    fn from_packet(packet: &SacnPacket, now: Instant) -> Self {
        Self {
            name: packet.source_name(),
            cid: Uuid::from_bytes(packet.cid()),
            priority: packet.priority(),
            sequence: packet.sequence_number(),
            preview: packet.is_preview_data(),
            last_seen: now,
        }
    }
}

/// Serializable snapshot of one input universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniverseStatus {
    pub universe: u16,
    pub receiving: bool,
    pub source_name: Option<String>,
    pub cid: Option<String>,
    pub sequence: Option<u8>,
    pub priority: Option<u8>,
    pub packets_received: u64,
    pub channels: Vec<u8>,
}

/// What [`UniverseInput::handle_packet`] did with a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// DMX data copied into the buffer.
    Applied,
    /// The source announced the end of its stream.
    Terminated,
    /// Alternate start code; not level data.
    IgnoredStartCode(u8),
    WrongUniverse(u16),
}

#[derive(Debug, Default)]
struct InputState {
    source: Option<SourceInfo>,
    packets: u64,
}

/// One universe registered for input: the received levels plus who sent
/// them and when.
#[derive(Debug)]
pub struct UniverseInput {
    universe: u16,
    data: UniverseData,
    stale_after: Duration,
    state: Mutex<InputState>,
}

impl UniverseInput {
    pub(crate) fn new(universe: u16, config: &ReceiverConfig) -> Result<Self, EngineError> {
        check_universe(universe)?;
        config.validate()?;
        Ok(Self {
            universe,
            data: UniverseData::new(),
            stale_after: config.stale_after(),
            state: Mutex::new(InputState::default()),
        })
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }

    /// Last received channel values.
    pub fn dmx(&self) -> &UniverseData {
        &self.data
    }

    /// Applies a validated packet received at `now`.
    pub fn handle_packet(&self, packet: &SacnPacket, now: Instant) -> PacketOutcome {
        let universe = packet.universe();
        if universe != self.universe {
            return PacketOutcome::WrongUniverse(universe);
        }
        let mut state = self.state.lock();
        // Termination ends the stream whatever the start code.
        if packet.is_stream_terminated() {
            state.source = None;
            return PacketOutcome::Terminated;
        }
        let start_code = packet.start_code();
        if start_code != layout::START_CODE_DMX {
            return PacketOutcome::IgnoredStartCode(start_code);
        }

        packet.copy_universe_data_out(&self.data);
        state.source = Some(SourceInfo::from_packet(packet, now));
        state.packets += 1;
        PacketOutcome::Applied
    }

    /// True when the last accepted packet is at most the staleness window
    /// (2 s by default) older than `now`.
    pub fn is_receiving_at(&self, now: Instant) -> bool {
        self.state
            .lock()
            .source
            .as_ref()
            .is_some_and(|source| now.saturating_duration_since(source.last_seen) <= self.stale_after)
    }

    pub fn is_receiving(&self) -> bool {
        self.is_receiving_at(Instant::now())
    }

    /// Name of the last source, empty before the first packet.
    pub fn current_source(&self) -> String {
        self.state
            .lock()
            .source
            .as_ref()
            .map(|source| source.name.clone())
            .unwrap_or_default()
    }

    pub fn source(&self) -> Option<SourceInfo> {
        self.state.lock().source.clone()
    }

    pub fn packets_received(&self) -> u64 {
        self.state.lock().packets
    }

    pub fn status(&self) -> UniverseStatus {
        self.status_at(Instant::now())
    }

    pub fn status_at(&self, now: Instant) -> UniverseStatus {
        let receiving = self.is_receiving_at(now);
        let state = self.state.lock();
        let source = state.source.as_ref();
        UniverseStatus {
            universe: self.universe,
            receiving,
            source_name: source.map(|s| s.name.clone()),
            cid: source.map(|s| s.cid.hyphenated().to_string()),
            sequence: source.map(|s| s.sequence),
            priority: source.map(|s| s.priority),
            packets_received: state.packets,
            channels: self.data.snapshot().to_vec(),
        }
    }
}
