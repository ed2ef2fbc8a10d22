//! Thread-safe 512-channel DMX buffer with change tracking.
//!
//! The channel array and the dirty flag share one reader/writer lock, so a
//! reader never observes a cleared flag next to half-applied data. The flag
//! is value-compared: writes that leave every channel unchanged do not mark
//! the buffer dirty.

use parking_lot::RwLock;
use thiserror::Error;

/// Number of DMX channels in a universe.
pub const DMX_CHANNELS: usize = 512;
/// Largest supported fine-channel resolution (bytes per value).
pub const MAX_FINE_RESOLUTION: usize = 4;

/// Errors returned by [`UniverseData`] accessors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DmxError {
    #[error("channel {channel} out of range (0..=511)")]
    ChannelOutOfRange { channel: usize },
    #[error("{resolution}-channel value at {channel} extends past channel 511")]
    ResolutionOutOfRange { channel: usize, resolution: usize },
    #[error("invalid resolution {resolution} (must be 1..=4)")]
    InvalidResolution { resolution: usize },
    #[error("fine value {value} outside 0.0..=1.0")]
    InvalidValue { value: f64 },
    #[error("buffer of {length} bytes exceeds 512 channels")]
    BufferTooLong { length: usize },
}

#[derive(Debug)]
struct Slots {
    values: [u8; DMX_CHANNELS],
    dirty: bool,
}

/// Live channel state for one universe.
///
/// # Examples
/// ```
/// use streamdmx_core::UniverseData;
///
/// let data = UniverseData::new();
/// data.set(0, 255)?;
/// assert!(data.is_dirty());
/// data.write_fine_value(0.5, 10, 2)?;
/// assert_eq!(data.get(10)?, 127);
/// assert_eq!(data.get(11)?, 255);
/// # Ok::<(), streamdmx_core::DmxError>(())
/// ```
#[derive(Debug)]
pub struct UniverseData {
    inner: RwLock<Slots>,
}

impl Default for UniverseData {
    fn default() -> Self {
        Self::new()
    }
}

impl UniverseData {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Slots {
                values: [0; DMX_CHANNELS],
                dirty: false,
            }),
        }
    }

    pub fn get(&self, channel: usize) -> Result<u8, DmxError> {
        check_channel(channel)?;
        Ok(self.inner.read().values[channel])
    }

    pub fn set(&self, channel: usize, value: u8) -> Result<(), DmxError> {
        check_channel(channel)?;
        let mut slots = self.inner.write();
        if slots.values[channel] != value {
            slots.values[channel] = value;
            slots.dirty = true;
        }
        Ok(())
    }

    /// Copies the leading channels into `buffer`; returns the count copied.
    pub fn read_into(&self, buffer: &mut [u8]) -> usize {
        let len = buffer.len().min(DMX_CHANNELS);
        buffer[..len].copy_from_slice(&self.inner.read().values[..len]);
        len
    }

    /// Overwrites the leading channels with `buffer`.
    pub fn write_from(&self, buffer: &[u8]) -> Result<(), DmxError> {
        if buffer.len() > DMX_CHANNELS {
            return Err(DmxError::BufferTooLong {
                length: buffer.len(),
            });
        }
        let mut slots = self.inner.write();
        apply(&mut slots, 0, buffer);
        Ok(())
    }

    /// Propagates this buffer's values into `other`.
    ///
    /// `other` becomes dirty only if some channel differed.
    pub fn copy_to(&self, other: &UniverseData) {
        if std::ptr::eq(self, other) {
            return;
        }
        let values = self.snapshot();
        let mut target = other.inner.write();
        apply(&mut target, 0, &values);
    }

    pub fn snapshot(&self) -> [u8; DMX_CHANNELS] {
        self.inner.read().values
    }

    /// Copies the channels out and clears the dirty flag in one critical
    /// section.
    ///
    /// Returns the copy together with the flag as it was before clearing.
    pub fn take_snapshot(&self) -> ([u8; DMX_CHANNELS], bool) {
        let mut slots = self.inner.write();
        let was_dirty = std::mem::replace(&mut slots.dirty, false);
        (slots.values, was_dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.read().dirty
    }

    pub fn clear_dirty(&self) {
        self.inner.write().dirty = false;
    }

    pub fn mark_dirty(&self) {
        self.inner.write().dirty = true;
    }

    /// Reads a value spread over `resolution` channels, most significant first.
    pub fn read_fine_value(&self, channel: usize, resolution: usize) -> Result<f64, DmxError> {
        check_fine_range(channel, resolution)?;
        let slots = self.inner.read();
        let raw = slots.values[channel..channel + resolution]
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte));
        Ok(raw as f64 / fine_max(resolution) as f64)
    }

    /// Writes `value` (0.0..=1.0) across `resolution` channels starting at
    /// `channel`, most significant first.
    pub fn write_fine_value(
        &self,
        value: f64,
        channel: usize,
        resolution: usize,
    ) -> Result<(), DmxError> {
        check_fine_range(channel, resolution)?;
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(DmxError::InvalidValue { value });
        }
        let raw = quantize(value, fine_max(resolution));
        let bytes = raw.to_be_bytes();
        let encoded = &bytes[bytes.len() - resolution..];

        let mut slots = self.inner.write();
        apply(&mut slots, channel, encoded);
        Ok(())
    }
}

fn apply(slots: &mut Slots, start: usize, bytes: &[u8]) {
    let target = &mut slots.values[start..start + bytes.len()];
    if target != bytes {
        target.copy_from_slice(bytes);
        slots.dirty = true;
    }
}

// Truncating quantization: 0.5 over two channels encodes as 0x7FFF.
// Products within float noise of an integer snap to it first so that a
// decoded value re-encodes to the same bytes.
fn quantize(value: f64, max: u64) -> u64 {
    let scaled = value * max as f64;
    let nearest = scaled.round();
    if (scaled - nearest).abs() < 1e-6 {
        nearest as u64
    } else {
        scaled.floor() as u64
    }
}

fn fine_max(resolution: usize) -> u64 {
    (1u64 << (8 * resolution)) - 1
}

fn check_channel(channel: usize) -> Result<(), DmxError> {
    if channel >= DMX_CHANNELS {
        return Err(DmxError::ChannelOutOfRange { channel });
    }
    Ok(())
}

fn check_fine_range(channel: usize, resolution: usize) -> Result<(), DmxError> {
    if resolution == 0 || resolution > MAX_FINE_RESOLUTION {
        return Err(DmxError::InvalidResolution { resolution });
    }
    check_channel(channel)?;
    if channel + resolution > DMX_CHANNELS {
        return Err(DmxError::ResolutionOutOfRange {
            channel,
            resolution,
        });
    }
    Ok(())
}
