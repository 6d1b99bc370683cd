use std::io::Write;

use crate::constant::{STMT_INDICATOR_NONE, STMT_INDICATOR_NULL, CommandByte, StatusFlags};
use crate::error::{Error, Result};
use crate::protocol::command::Action;
use crate::protocol::primitive::*;
use crate::protocol::r#trait::Param;
use crate::protocol::response::{ErrPayload, ErrPayloadBytes, OkPayload, OkPayloadBytes};
use crate::results::BatchResult;
use crate::writer::PacketWriter;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BulkFlags: u16 {
        const SEND_UNIT_RESULTS = 64;
        const SEND_TYPES_TO_SERVER = 128;
    }
}

/// Write and flush one COM_STMT_BULK_EXECUTE command carrying every row.
///
/// Array binding sends the type header exactly once for the whole batch, so
/// no per-row size or type-stability bookkeeping happens here; the server
/// consumes the payload as one unit and the writer fragments oversized
/// payloads transparently. Requires server support (MariaDB >= 10.2.7).
pub fn write_bulk_execute<'p, W, R>(
    writer: &mut PacketWriter,
    sink: &mut W,
    statement_id: u32,
    rows: &[R],
    parameter_count: usize,
    flags: BulkFlags,
) -> Result<()>
where
    W: Write,
    R: AsRef<[&'p dyn Param]>,
{
    let first: &[&dyn Param] = rows.first().map_or(&[], |row| row.as_ref());
    if parameter_count > first.len() {
        return Err(Error::ParameterNotSet {
            position: parameter_count - 1,
        });
    }

    writer.start_packet();
    let out = writer.payload_mut();
    write_int_1(out, CommandByte::StmtBulkExecute as u8);
    write_int_4(out, statement_id);
    write_int_2(out, flags.bits());

    if flags.contains(BulkFlags::SEND_TYPES_TO_SERVER) {
        for param in &first[..parameter_count] {
            write_int_2(out, param.column_type() as u8 as u16);
        }
    }

    for row in rows {
        let row = row.as_ref();
        if parameter_count > row.len() {
            return Err(Error::ParameterNotSet {
                position: parameter_count - 1,
            });
        }
        for param in &row[..parameter_count] {
            if param.is_null() {
                write_int_1(out, STMT_INDICATOR_NULL);
            } else {
                write_int_1(out, STMT_INDICATOR_NONE);
                param.encode_value(out)?;
            }
        }
    }

    writer.finish_packet(sink)
}

enum BulkReplyState {
    Start,
    ReadingFirstPacket,
    ReadingColumns { remaining: usize },
    ReadingKeyBlocks,
    Finished,
}

/// Consumes the reply to one bulk unit and populates a [`BatchResult`].
///
/// The reply is either a bare OK/ERR, or a three-column result set of
/// `(first_id, block_length, increment)` BIGINT rows describing the
/// auto-increment keys the unit generated. Server-reported execution errors
/// are absorbed into the accounting, not raised.
pub struct BulkReplyReader<'r> {
    state: BulkReplyState,
    result: &'r BatchResult,
}

impl<'r> BulkReplyReader<'r> {
    pub fn new(result: &'r BatchResult) -> Self {
        Self {
            state: BulkReplyState::Start,
            result,
        }
    }

    pub fn step<'buf>(&mut self, buffer: &'buf mut Vec<u8>) -> Result<Action<'buf>> {
        match &mut self.state {
            BulkReplyState::Start => {
                self.state = BulkReplyState::ReadingFirstPacket;
                Ok(Action::NeedPacket(buffer))
            }

            BulkReplyState::ReadingFirstPacket => match buffer.first().copied() {
                Some(0x00) => {
                    let ok = OkPayload::try_from(OkPayloadBytes(buffer))?;
                    self.result.add_success(ok.affected_rows);

                    if ok
                        .status_flags
                        .has(StatusFlags::SERVER_MORE_RESULTS_EXISTS)
                    {
                        Ok(Action::NeedPacket(buffer))
                    } else {
                        self.state = BulkReplyState::Finished;
                        Ok(Action::Finished)
                    }
                }
                Some(0xFF) => {
                    if let Ok(err) = ErrPayload::try_from(ErrPayloadBytes(buffer)) {
                        tracing::debug!(code = err.error_code, "bulk unit failed: {}", err.message);
                    }
                    self.result.add_error();
                    self.state = BulkReplyState::Finished;
                    Ok(Action::Finished)
                }
                Some(_) => {
                    let (column_count, _rest) = read_int_lenenc(buffer)?;
                    if column_count != 3 {
                        return Err(Error::InvalidPacket);
                    }
                    self.state = BulkReplyState::ReadingColumns { remaining: 3 };
                    Ok(Action::NeedPacket(buffer))
                }
                None => Err(Error::InvalidPacket),
            },

            BulkReplyState::ReadingColumns { remaining } => {
                // Column definitions carry nothing the accounting needs.
                *remaining -= 1;
                if *remaining == 0 {
                    self.state = BulkReplyState::ReadingKeyBlocks;
                }
                Ok(Action::NeedPacket(buffer))
            }

            BulkReplyState::ReadingKeyBlocks => match buffer.first().copied() {
                Some(0x00) => {
                    let (first_id, len, increment) = read_key_block(buffer)?;
                    self.result.add_key_block(first_id, len, increment);
                    Ok(Action::NeedPacket(buffer))
                }
                Some(0xFE) => {
                    let eof = OkPayloadBytes(buffer);
                    eof.assert_eof()?;
                    let ok = OkPayload::try_from(eof)?;

                    if ok
                        .status_flags
                        .has(StatusFlags::SERVER_MORE_RESULTS_EXISTS)
                    {
                        self.state = BulkReplyState::ReadingFirstPacket;
                        Ok(Action::NeedPacket(buffer))
                    } else {
                        self.state = BulkReplyState::Finished;
                        Ok(Action::Finished)
                    }
                }
                _ => Err(Error::InvalidPacket),
            },

            BulkReplyState::Finished => Err(Error::InvalidPacket),
        }
    }
}

/// Decode one generated-key row: binary row header, null bitmap, then three
/// LONGLONG columns `(first_id, block_length, increment)`.
fn read_key_block(payload: &[u8]) -> Result<(u64, u64, u64)> {
    let (header, rest) = read_int_1(payload)?;
    if header != 0x00 {
        return Err(Error::InvalidPacket);
    }

    // Null bitmap for 3 columns with the 2-bit offset: 1 byte.
    let (_bitmap, rest) = read_int_1(rest)?;
    let (first_id, rest) = read_int_8(rest)?;
    let (len, rest) = read_int_8(rest)?;
    let (increment, _rest) = read_int_8(rest)?;
    Ok((first_id, len, increment))
}
