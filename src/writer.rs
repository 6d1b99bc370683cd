use std::io::Write;

use crate::error::{Error, Result};

/// Largest payload one physical packet can carry; longer payloads are split
/// across continuation packets.
pub const MAX_PACKET_CHUNK: usize = 0xFFFFFF;

/// Handle to a 4-byte slot reserved inside the current frame.
///
/// Obtained from [`PacketWriter::reserve_int4`] and redeemed exactly once by
/// [`PacketWriter::patch_int4`]. Not `Copy`: a slot cannot outlive its patch,
/// and a slot from an abandoned frame cannot be redeemed against a new one.
#[derive(Debug)]
#[must_use]
pub struct Int4Slot(usize);

/// Buffered, size-limited builder for one command frame.
///
/// Accumulates a single logical payload (without packet headers), enforces the
/// server-negotiated `max_allowed_packet`, and on [`finish_packet`] frames the
/// payload with 3-byte-length + sequence-id headers, transparently splitting
/// payloads of 16MB or more into continuation packets. The writer does not own
/// the socket; any `io::Write` sink is borrowed per flush.
///
/// [`finish_packet`]: PacketWriter::finish_packet
#[derive(Debug)]
pub struct PacketWriter {
    buf: Vec<u8>,
    max_allowed_packet: usize,
    sequence_id: u8,
}

impl PacketWriter {
    pub fn new(max_allowed_packet: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_allowed_packet,
            sequence_id: 0,
        }
    }

    /// Begin a new command frame, discarding any unflushed payload.
    pub fn start_packet(&mut self) {
        self.buf.clear();
        self.sequence_id = 0;
    }

    /// Drop the current frame without sending it.
    pub fn abort_packet(&mut self) {
        self.buf.clear();
    }

    /// Ensure capacity for at least `additional` more payload bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Mutable access to the payload under construction.
    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Payload bytes buffered so far.
    pub fn payload(&self) -> &[u8] {
        &self.buf
    }

    /// Number of payload bytes buffered so far.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn max_allowed_packet(&self) -> usize {
        self.max_allowed_packet
    }

    /// Would `additional` more bytes keep this frame under `max_allowed_packet`?
    pub fn fits(&self, additional: usize) -> bool {
        self.buf.len() + additional < self.max_allowed_packet
    }

    /// Reserve a zeroed 4-byte slot at the current position, to be patched
    /// once its value is known.
    pub fn reserve_int4(&mut self) -> Int4Slot {
        let offset = self.buf.len();
        self.buf.extend_from_slice(&[0u8; 4]);
        Int4Slot(offset)
    }

    /// Patch a reserved slot with a little-endian 32-bit value.
    pub fn patch_int4(&mut self, slot: Int4Slot, value: u32) -> Result<()> {
        let Int4Slot(offset) = slot;
        let Some(bytes) = self.buf.get_mut(offset..offset + 4) else {
            return Err(Error::InvalidFrameSlot { offset });
        };
        bytes.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Frame the buffered payload and flush it to `sink`.
    ///
    /// Payloads of `0xFFFFFF` bytes or more are split into continuation
    /// packets; an exact multiple is terminated by an empty packet so the
    /// server can detect the end of the sequence.
    pub fn finish_packet<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        let mut remaining: &[u8] = &self.buf;

        loop {
            let chunk_size = remaining.len().min(MAX_PACKET_CHUNK);
            let chunk;
            (chunk, remaining) = remaining.split_at(chunk_size);

            let mut header = [0u8; 4];
            header[..3].copy_from_slice(&(chunk_size as u32).to_le_bytes()[..3]);
            header[3] = self.sequence_id;
            self.sequence_id = self.sequence_id.wrapping_add(1);

            sink.write_all(&header)?;
            sink.write_all(chunk)?;

            if chunk_size < MAX_PACKET_CHUNK {
                break;
            }
        }

        sink.flush()?;
        self.buf.clear();
        Ok(())
    }
}
