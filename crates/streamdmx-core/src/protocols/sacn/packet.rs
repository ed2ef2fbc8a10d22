use crate::universe::{DMX_CHANNELS, UniverseData};

use super::error::PacketError;
use super::layout;
use super::reader::SacnReader;
use super::writer::SacnWriter;

/// One E1.31 data packet, kept in a fixed 638-byte buffer.
///
/// A packet is built once per send/receive loop and reused as scratch space
/// every cycle. Channels are 0-indexed: channel `k` lives in property value
/// `k + 1`, right after the start code.
///
/// # Examples
/// ```
/// use streamdmx_core::SacnPacket;
///
/// let mut packet = SacnPacket::new(5)?;
/// packet.set_source_name("Desk")?;
/// packet.set_dmx(0, 255)?;
/// assert!(packet.is_valid());
/// assert_eq!(packet.raw_bytes().len(), 638);
/// assert_eq!(packet.raw_bytes()[126], 255);
/// # Ok::<(), streamdmx_core::PacketError>(())
/// ```
#[derive(Clone)]
pub struct SacnPacket {
    buf: [u8; layout::MAX_LEN],
    len: usize,
}

impl Default for SacnPacket {
    fn default() -> Self {
        Self::stamped(layout::MIN_UNIVERSE, layout::DMX_MAX_SLOTS)
    }
}

impl std::fmt::Debug for SacnPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SacnPacket")
            .field("universe", &self.universe())
            .field("source_name", &self.source_name())
            .field("sequence", &self.sequence_number())
            .field("priority", &self.priority())
            .field("slots", &self.slot_count())
            .finish()
    }
}

impl SacnPacket {
    /// Builds a header-stamped, zeroed 512-slot packet.
    pub fn new(universe: u16) -> Result<Self, PacketError> {
        Self::with_slots(universe, layout::DMX_MAX_SLOTS)
    }

    pub fn with_slots(universe: u16, slots: usize) -> Result<Self, PacketError> {
        check_universe(universe)?;
        if slots == 0 || slots > layout::DMX_MAX_SLOTS {
            return Err(PacketError::InvalidSlotCount { slots });
        }
        Ok(Self::stamped(universe, slots))
    }

    fn stamped(universe: u16, slots: usize) -> Self {
        let len = layout::packet_len(slots);
        let mut packet = Self {
            buf: [0; layout::MAX_LEN],
            len,
        };
        let mut w = SacnWriter::new(&mut packet.buf);

        w.write_u16_be(layout::PREAMBLE_SIZE_RANGE, layout::PREAMBLE_SIZE);
        w.write_u16_be(layout::POSTAMBLE_SIZE_RANGE, layout::POSTAMBLE_SIZE);
        w.write_slice(layout::ACN_PID_RANGE, layout::ACN_PID);
        w.write_flags_length(
            layout::ROOT_FLAGS_LENGTH_RANGE,
            layout::FLAGS,
            len - layout::ROOT_LAYER_START,
        );
        w.write_u32_be(layout::ROOT_VECTOR_RANGE, layout::ROOT_VECTOR_DATA);

        w.write_flags_length(
            layout::FRAMING_FLAGS_LENGTH_RANGE,
            layout::FLAGS,
            len - layout::FRAMING_LAYER_START,
        );
        w.write_u32_be(layout::FRAMING_VECTOR_RANGE, layout::FRAMING_VECTOR_DMX);
        w.write_u8(layout::PRIORITY_OFFSET, layout::DEFAULT_PRIORITY);
        w.write_u16_be(layout::RESERVED_RANGE, 0);
        w.write_u16_be(layout::UNIVERSE_RANGE, universe);

        w.write_flags_length(
            layout::DMP_FLAGS_LENGTH_RANGE,
            layout::FLAGS,
            len - layout::DMP_LAYER_START,
        );
        w.write_u8(layout::DMP_VECTOR_OFFSET, layout::DMP_VECTOR_SET_PROPERTY);
        w.write_u8(layout::DMP_TYPE_OFFSET, layout::DMP_ADDRESS_DATA_TYPE);
        w.write_u16_be(layout::DMP_FIRST_ADDRESS_RANGE, layout::DMP_FIRST_ADDRESS);
        w.write_u16_be(
            layout::DMP_ADDRESS_INCREMENT_RANGE,
            layout::DMP_ADDRESS_INCREMENT,
        );
        w.write_u16_be(layout::DMP_PROPERTY_VALUE_COUNT_RANGE, (slots + 1) as u16);
        w.write_u8(layout::START_CODE_OFFSET, layout::START_CODE_DMX);

        packet
    }

    /// Replaces the packet contents with a received datagram.
    ///
    /// Only the size is checked here; call [`SacnPacket::validate`] before
    /// trusting any field.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), PacketError> {
        if bytes.len() < layout::MIN_LEN {
            return Err(PacketError::TooShort {
                needed: layout::MIN_LEN,
                actual: bytes.len(),
            });
        }
        if bytes.len() > layout::MAX_LEN {
            return Err(PacketError::TooLong {
                max: layout::MAX_LEN,
                actual: bytes.len(),
            });
        }
        self.buf[..bytes.len()].copy_from_slice(bytes);
        self.buf[bytes.len()..].fill(0);
        self.len = bytes.len();
        Ok(())
    }

    /// Checks every fixed constant and the layer lengths.
    pub fn validate(&self) -> Result<(), PacketError> {
        let r = self.reader();
        r.require_len(layout::MIN_LEN)?;

        let preamble = r.read_u16_be(layout::PREAMBLE_SIZE_RANGE)?;
        if preamble != layout::PREAMBLE_SIZE {
            return Err(PacketError::InvalidPreambleSize { value: preamble });
        }
        let postamble = r.read_u16_be(layout::POSTAMBLE_SIZE_RANGE)?;
        if postamble != layout::POSTAMBLE_SIZE {
            return Err(PacketError::InvalidPostambleSize { value: postamble });
        }
        if r.read_slice(layout::ACN_PID_RANGE)? != layout::ACN_PID {
            return Err(PacketError::InvalidAcnPid);
        }

        self.check_layer(&r, "root", layout::ROOT_FLAGS_LENGTH_RANGE, layout::ROOT_LAYER_START)?;
        let root_vector = r.read_u32_be(layout::ROOT_VECTOR_RANGE)?;
        if root_vector != layout::ROOT_VECTOR_DATA {
            return Err(PacketError::InvalidRootVector { value: root_vector });
        }

        self.check_layer(
            &r,
            "framing",
            layout::FRAMING_FLAGS_LENGTH_RANGE,
            layout::FRAMING_LAYER_START,
        )?;
        let framing_vector = r.read_u32_be(layout::FRAMING_VECTOR_RANGE)?;
        if framing_vector != layout::FRAMING_VECTOR_DMX {
            return Err(PacketError::InvalidFramingVector {
                value: framing_vector,
            });
        }
        check_universe(r.read_u16_be(layout::UNIVERSE_RANGE)?)?;

        self.check_layer(&r, "DMP", layout::DMP_FLAGS_LENGTH_RANGE, layout::DMP_LAYER_START)?;
        let dmp_vector = r.read_u8(layout::DMP_VECTOR_OFFSET)?;
        if dmp_vector != layout::DMP_VECTOR_SET_PROPERTY {
            return Err(PacketError::InvalidDmpVector { value: dmp_vector });
        }
        let dmp_type = r.read_u8(layout::DMP_TYPE_OFFSET)?;
        if dmp_type != layout::DMP_ADDRESS_DATA_TYPE {
            return Err(PacketError::InvalidDmpType { value: dmp_type });
        }
        let first_address = r.read_u16_be(layout::DMP_FIRST_ADDRESS_RANGE)?;
        if first_address != layout::DMP_FIRST_ADDRESS {
            return Err(PacketError::InvalidFirstAddress {
                value: first_address,
            });
        }
        let increment = r.read_u16_be(layout::DMP_ADDRESS_INCREMENT_RANGE)?;
        if increment != layout::DMP_ADDRESS_INCREMENT {
            return Err(PacketError::InvalidAddressIncrement { value: increment });
        }
        let count = r.read_u16_be(layout::DMP_PROPERTY_VALUE_COUNT_RANGE)?;
        if count == 0
            || usize::from(count) > layout::DMX_MAX_SLOTS + 1
            || usize::from(count) != self.len - layout::START_CODE_OFFSET
        {
            return Err(PacketError::InvalidPropertyValueCount { count });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn check_layer(
        &self,
        r: &SacnReader<'_>,
        layer: &'static str,
        range: std::ops::Range<usize>,
        start: usize,
    ) -> Result<(), PacketError> {
        let (flags, length) = r.read_flags_length(range)?;
        if flags != layout::FLAGS {
            return Err(PacketError::InvalidFlags { layer, flags });
        }
        let expected = self.len - start;
        if length != expected {
            return Err(PacketError::LengthMismatch {
                layer,
                expected,
                actual: length,
            });
        }
        Ok(())
    }

    /// The encoded packet, exactly `len()` bytes.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// DMX slots carried, excluding the start code.
    pub fn slot_count(&self) -> usize {
        self.len.saturating_sub(layout::DMX_DATA_OFFSET)
    }

    pub fn universe(&self) -> u16 {
        self.read_u16(layout::UNIVERSE_RANGE)
    }

    pub fn set_universe(&mut self, universe: u16) -> Result<(), PacketError> {
        check_universe(universe)?;
        self.writer().write_u16_be(layout::UNIVERSE_RANGE, universe);
        Ok(())
    }

    pub fn source_name(&self) -> String {
        self.reader()
            .read_nul_terminated(layout::SOURCE_NAME_RANGE)
            .unwrap_or_default()
    }

    pub fn set_source_name(&mut self, name: &str) -> Result<(), PacketError> {
        if name.len() >= layout::MAX_SOURCE_NAME_LEN {
            return Err(PacketError::SourceNameTooLong { length: name.len() });
        }
        self.writer()
            .write_padded(layout::SOURCE_NAME_RANGE, name.as_bytes());
        Ok(())
    }

    pub fn priority(&self) -> u8 {
        self.buf[layout::PRIORITY_OFFSET]
    }

    pub fn set_priority(&mut self, priority: u8) -> Result<(), PacketError> {
        if priority > layout::MAX_PRIORITY {
            return Err(PacketError::InvalidPriority { priority });
        }
        self.buf[layout::PRIORITY_OFFSET] = priority;
        Ok(())
    }

    pub fn sequence_number(&self) -> u8 {
        self.buf[layout::SEQUENCE_OFFSET]
    }

    pub fn set_sequence_number(&mut self, sequence: u8) {
        self.buf[layout::SEQUENCE_OFFSET] = sequence;
    }

    /// Component identifier of the sending process.
    pub fn cid(&self) -> [u8; 16] {
        let mut cid = [0u8; 16];
        cid.copy_from_slice(&self.buf[layout::CID_RANGE]);
        cid
    }

    pub fn set_cid(&mut self, cid: [u8; 16]) {
        self.writer().write_slice(layout::CID_RANGE, &cid);
    }

    pub fn options(&self) -> u8 {
        self.buf[layout::OPTIONS_OFFSET]
    }

    pub fn is_preview_data(&self) -> bool {
        self.options() & layout::OPTION_PREVIEW_DATA != 0
    }

    pub fn set_preview_data(&mut self, preview: bool) {
        self.set_option(layout::OPTION_PREVIEW_DATA, preview);
    }

    pub fn is_stream_terminated(&self) -> bool {
        self.options() & layout::OPTION_STREAM_TERMINATED != 0
    }

    pub fn set_stream_terminated(&mut self, terminated: bool) {
        self.set_option(layout::OPTION_STREAM_TERMINATED, terminated);
    }

    fn set_option(&mut self, bit: u8, on: bool) {
        let options = &mut self.buf[layout::OPTIONS_OFFSET];
        if on {
            *options |= bit;
        } else {
            *options &= !bit;
        }
    }

    pub fn start_code(&self) -> u8 {
        self.buf[layout::START_CODE_OFFSET]
    }

    pub fn dmx(&self, channel: usize) -> Result<u8, PacketError> {
        self.check_channel(channel)?;
        Ok(self.buf[layout::DMX_DATA_OFFSET + channel])
    }

    pub fn set_dmx(&mut self, channel: usize, value: u8) -> Result<(), PacketError> {
        self.check_channel(channel)?;
        self.buf[layout::DMX_DATA_OFFSET + channel] = value;
        Ok(())
    }

    pub fn dmx_slots(&self) -> &[u8] {
        &self.buf[layout::DMX_DATA_OFFSET..self.len]
    }

    /// Fills the packet slots from `values`, ignoring channels past
    /// `slot_count()`.
    pub fn set_dmx_slots(&mut self, values: &[u8; DMX_CHANNELS]) {
        let slots = self.slot_count();
        self.buf[layout::DMX_DATA_OFFSET..self.len].copy_from_slice(&values[..slots]);
    }

    /// Copies the buffer's channels into the packet slots.
    pub fn copy_universe_data_in(&mut self, data: &UniverseData) {
        let len = self.len;
        data.read_into(&mut self.buf[layout::DMX_DATA_OFFSET..len]);
    }

    /// Writes the packet slots into the buffer; the buffer becomes dirty only
    /// if a channel changed.
    pub fn copy_universe_data_out(&self, data: &UniverseData) {
        let slots = &self.dmx_slots()[..self.slot_count().min(DMX_CHANNELS)];
        // slot_count() never exceeds 512, so this cannot fail
        let _ = data.write_from(slots);
    }

    fn check_channel(&self, channel: usize) -> Result<(), PacketError> {
        let slots = self.slot_count();
        if channel >= slots {
            return Err(PacketError::ChannelOutOfRange { channel, slots });
        }
        Ok(())
    }

    fn reader(&self) -> SacnReader<'_> {
        SacnReader::new(&self.buf[..self.len])
    }

    fn writer(&mut self) -> SacnWriter<'_> {
        SacnWriter::new(&mut self.buf)
    }

    fn read_u16(&self, range: std::ops::Range<usize>) -> u16 {
        u16::from_be_bytes([self.buf[range.start], self.buf[range.start + 1]])
    }
}

pub(crate) fn check_universe(universe: u16) -> Result<(), PacketError> {
    if !(layout::MIN_UNIVERSE..=layout::MAX_UNIVERSE).contains(&universe) {
        return Err(PacketError::InvalidUniverse { universe });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SacnPacket;
    use crate::protocols::sacn::{error::PacketError, layout};
    use crate::universe::UniverseData;

    #[test]
    fn fresh_packet_is_valid() {
        let packet = SacnPacket::new(7).unwrap();
        assert!(packet.is_valid());
        assert_eq!(packet.universe(), 7);
        assert_eq!(packet.len(), 638);
        assert_eq!(packet.slot_count(), 512);
        assert_eq!(packet.priority(), 100);
        assert_eq!(packet.start_code(), 0);
    }

    #[test]
    fn header_bytes_match_wire_layout() {
        let packet = SacnPacket::new(0x0102).unwrap();
        let raw = packet.raw_bytes();
        assert_eq!(&raw[0..4], &[0x00, 0x10, 0x00, 0x00]);
        assert_eq!(&raw[4..16], b"ASC-E1.17\0\0\0");
        assert_eq!(&raw[16..18], &[0x72, 0x6e]);
        assert_eq!(&raw[18..22], &[0, 0, 0, 4]);
        assert_eq!(&raw[38..40], &[0x72, 0x58]);
        assert_eq!(&raw[40..44], &[0, 0, 0, 2]);
        assert_eq!(&raw[113..115], &[0x01, 0x02]);
        assert_eq!(&raw[115..117], &[0x72, 0x0b]);
        assert_eq!(&raw[117..125], &[0x02, 0xa1, 0, 0, 0, 1, 0x02, 0x01]);
    }

    #[test]
    fn reserved_bytes_are_zero_and_not_validated() {
        let packet = SacnPacket::new(3).unwrap();
        assert_eq!(&packet.raw_bytes()[layout::RESERVED_RANGE], &[0, 0]);

        // Newer sources put a sync address here; receivers accept it.
        let mut bytes = packet.raw_bytes().to_vec();
        bytes[layout::RESERVED_RANGE].copy_from_slice(&[0x12, 0x34]);
        let mut received = SacnPacket::default();
        received.load(&bytes).unwrap();
        assert!(received.is_valid());
        assert_eq!(received.universe(), 3);
    }

    #[test]
    fn custom_slot_count_shrinks_packet() {
        let packet = SacnPacket::with_slots(1, 24).unwrap();
        assert_eq!(packet.len(), 150);
        assert_eq!(packet.raw_bytes().len(), 150);
        assert!(packet.is_valid());
        assert!(matches!(
            SacnPacket::with_slots(1, 513),
            Err(PacketError::InvalidSlotCount { slots: 513 })
        ));
        assert!(SacnPacket::with_slots(1, 0).is_err());
    }

    #[test]
    fn flipping_any_fixed_constant_invalidates() {
        let fixed_offsets = [0, 1, 2, 3]
            .into_iter()
            .chain(layout::ACN_PID_RANGE)
            .chain(layout::ROOT_FLAGS_LENGTH_RANGE)
            .chain(layout::ROOT_VECTOR_RANGE)
            .chain(layout::FRAMING_FLAGS_LENGTH_RANGE)
            .chain(layout::FRAMING_VECTOR_RANGE)
            .chain(layout::DMP_FLAGS_LENGTH_RANGE)
            .chain([layout::DMP_VECTOR_OFFSET, layout::DMP_TYPE_OFFSET])
            .chain(layout::DMP_FIRST_ADDRESS_RANGE)
            .chain(layout::DMP_ADDRESS_INCREMENT_RANGE)
            .chain(layout::DMP_PROPERTY_VALUE_COUNT_RANGE);

        let packet = SacnPacket::new(1).unwrap();
        for offset in fixed_offsets {
            let mut bytes = packet.raw_bytes().to_vec();
            bytes[offset] ^= 0x01;
            let mut corrupted = SacnPacket::default();
            corrupted.load(&bytes).unwrap();
            assert!(!corrupted.is_valid(), "offset {offset} still valid");
        }
    }

    #[test]
    fn validate_names_failing_field() {
        let mut bytes = SacnPacket::new(1).unwrap().raw_bytes().to_vec();
        bytes[layout::DMP_VECTOR_OFFSET] = 0x03;
        let mut packet = SacnPacket::default();
        packet.load(&bytes).unwrap();
        assert_eq!(
            packet.validate(),
            Err(PacketError::InvalidDmpVector { value: 0x03 })
        );
    }

    #[test]
    fn zero_universe_on_wire_is_invalid() {
        let mut bytes = SacnPacket::new(1).unwrap().raw_bytes().to_vec();
        bytes[layout::UNIVERSE_RANGE].copy_from_slice(&0u16.to_be_bytes());
        let mut packet = SacnPacket::default();
        packet.load(&bytes).unwrap();
        assert_eq!(
            packet.validate(),
            Err(PacketError::InvalidUniverse { universe: 0 })
        );
    }

    #[test]
    fn truncated_datagram_is_invalid() {
        let bytes = SacnPacket::new(1).unwrap().raw_bytes()[..600].to_vec();
        let mut packet = SacnPacket::default();
        packet.load(&bytes).unwrap();
        assert!(matches!(
            packet.validate(),
            Err(PacketError::LengthMismatch { layer: "root", .. })
        ));

        assert!(matches!(
            packet.load(&[0u8; 20]),
            Err(PacketError::TooShort { needed: 126, actual: 20 })
        ));
        assert!(matches!(
            packet.load(&[0u8; 700]),
            Err(PacketError::TooLong { .. })
        ));
    }

    #[test]
    fn source_name_limits() {
        let mut packet = SacnPacket::default();
        packet.set_source_name("Front of house").unwrap();
        assert_eq!(packet.source_name(), "Front of house");

        packet.set_source_name("x").unwrap();
        assert_eq!(packet.source_name(), "x");

        let longest = "n".repeat(62);
        packet.set_source_name(&longest).unwrap();
        assert_eq!(packet.source_name(), longest);

        let too_long = "n".repeat(63);
        assert_eq!(
            packet.set_source_name(&too_long),
            Err(PacketError::SourceNameTooLong { length: 63 })
        );
    }

    #[test]
    fn universe_and_priority_limits() {
        let mut packet = SacnPacket::default();
        assert!(packet.set_universe(63999).is_ok());
        assert_eq!(packet.universe(), 63999);
        assert!(packet.set_universe(0).is_err());
        assert!(packet.set_universe(64000).is_err());
        assert!(SacnPacket::new(0).is_err());

        assert!(packet.set_priority(200).is_ok());
        assert_eq!(
            packet.set_priority(201),
            Err(PacketError::InvalidPriority { priority: 201 })
        );
        assert_eq!(packet.priority(), 200);
    }

    #[test]
    fn dmx_channels_are_zero_indexed_after_start_code() {
        let mut packet = SacnPacket::default();
        packet.set_dmx(0, 11).unwrap();
        packet.set_dmx(511, 22).unwrap();
        assert_eq!(packet.raw_bytes()[layout::START_CODE_OFFSET], 0);
        assert_eq!(packet.raw_bytes()[126], 11);
        assert_eq!(packet.raw_bytes()[637], 22);
        assert_eq!(packet.dmx(511).unwrap(), 22);
        assert!(packet.dmx(512).is_err());
    }

    #[test]
    fn options_bits() {
        let mut packet = SacnPacket::default();
        packet.set_stream_terminated(true);
        assert!(packet.is_stream_terminated());
        assert_eq!(packet.options(), 0x40);
        packet.set_preview_data(true);
        packet.set_stream_terminated(false);
        assert!(packet.is_preview_data());
        assert_eq!(packet.options(), 0x80);
        assert!(packet.is_valid());
    }

    #[test]
    fn universe_data_bridges_both_ways() {
        let data = UniverseData::new();
        data.set(0, 1).unwrap();
        data.set(511, 2).unwrap();

        let mut packet = SacnPacket::default();
        packet.copy_universe_data_in(&data);
        assert_eq!(packet.dmx(0).unwrap(), 1);
        assert_eq!(packet.dmx(511).unwrap(), 2);

        let received = UniverseData::new();
        packet.copy_universe_data_out(&received);
        assert!(received.is_dirty());
        assert_eq!(received.snapshot(), data.snapshot());

        received.clear_dirty();
        packet.copy_universe_data_out(&received);
        assert!(!received.is_dirty());
    }

    #[test]
    fn short_packet_updates_leading_channels_only() {
        let mut packet = SacnPacket::with_slots(3, 4).unwrap();
        for channel in 0..4 {
            packet.set_dmx(channel, 9).unwrap();
        }
        let data = UniverseData::new();
        data.set(10, 77).unwrap();
        packet.copy_universe_data_out(&data);
        assert_eq!(data.get(3).unwrap(), 9);
        assert_eq!(data.get(4).unwrap(), 0);
        assert_eq!(data.get(10).unwrap(), 77);
    }
}
