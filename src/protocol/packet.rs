use std::io::Read;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// MySQL packet header (zero-copy)
///
/// Layout matches the wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        if data.len() < 4 {
            return Err(Error::InvalidPacket);
        }
        Self::ref_from_bytes(&data[..4]).map_err(|_| Error::InvalidPacket)
    }
}

/// Read a complete payload, concatenating packets spanning 16MB chunks.
///
/// The payload lands in `buffer`; the first packet's sequence id is returned.
pub fn read_payload<R: Read>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<u8> {
    buffer.clear();

    let mut header_bytes = [0u8; 4];
    reader.read_exact(&mut header_bytes)?;

    let header = PacketHeader::from_bytes(&header_bytes)?;
    let length = header.length();
    let sequence_id = header.sequence_id;

    buffer.resize(length, 0);
    reader.read_exact(&mut buffer[..])?;

    // A packet of exactly 16MB - 1 bytes continues in the next packet.
    let mut current_length = length;
    while current_length == 0xFFFFFF {
        reader.read_exact(&mut header_bytes)?;
        current_length = PacketHeader::from_bytes(&header_bytes)?.length();

        let prev_len = buffer.len();
        buffer.resize(prev_len + current_length, 0);
        reader.read_exact(&mut buffer[prev_len..])?;
    }

    Ok(sequence_id)
}
