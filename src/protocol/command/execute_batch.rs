use std::io::Write;

use crate::constant::{
    ColumnType, CommandByte, STMT_INDICATOR_NONE, STMT_INDICATOR_NULL, TYPE_TAG_INDICATOR_FLAG,
};
use crate::error::{Error, Result};
use crate::protocol::command::prepared::write_execute;
use crate::protocol::primitive::*;
use crate::protocol::r#trait::Param;
use crate::writer::{Int4Slot, PacketWriter};

/// Progress of one splitting-encoder invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Index of the first row not yet sent.
    pub next_offset: usize,
    /// The row at `next_offset` binds long-data values that must go through
    /// the side channel before bulk encoding resumes.
    pub deferred_long_data: bool,
}

/// Encode and flush one sub-batch of `rows`, starting at `offset`, as a
/// COM_STMT_EXECUTE command with an iteration count.
///
/// Rows accumulate into the frame until the list is exhausted, a row would
/// push the frame past `max_allowed_packet`, a non-null value changes wire
/// type against `last_sent_types`, or a row binds long data. The first three
/// close the frame at the previous row and leave the rest to the next
/// invocation; the type header is re-sent there. A frame that ends up with a
/// single row is re-encoded as an ordinary single execute instead of the
/// bulk framing.
///
/// `last_sent_types` is owned by the driving loop and rewritten whenever a
/// frame writes its type header.
pub fn write_execute_batch<'p, W, R>(
    writer: &mut PacketWriter,
    sink: &mut W,
    statement_id: u32,
    rows: &[R],
    offset: usize,
    last_sent_types: &mut Vec<ColumnType>,
) -> Result<BatchProgress>
where
    W: Write,
    R: AsRef<[&'p dyn Param]>,
{
    writer.start_packet();
    let out = writer.payload_mut();
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);
    write_int_1(out, 0x00); // CURSOR_TYPE_NO_CURSOR
    let count_slot = writer.reserve_int4(); // iteration count, patched at close

    let parameter_count = rows.first().map_or(0, |row| row.as_ref().len());
    let initial_offset = offset;
    let mut offset = offset;
    let mut must_send_types = true;
    let mut has_long_data = false;

    while !has_long_data && offset < rows.len() {
        let row = rows[offset].as_ref();
        if row.len() < parameter_count {
            return Err(Error::ParameterNotSet {
                position: row.len(),
            });
        }
        let row = &row[..parameter_count];

        if parameter_count > 0 {
            if must_send_types {
                writer.reserve(1 + parameter_count * 2);
                let out = writer.payload_mut();
                write_int_1(out, 0x01); // types follow
                last_sent_types.clear();
                for param in row {
                    let column_type = param.column_type();
                    last_sent_types.push(column_type);
                    write_int_2(out, column_type as u8 as u16 | TYPE_TAG_INDICATOR_FLAG);
                }
                must_send_types = false;
            } else {
                for (position, (cached, param)) in
                    last_sent_types.iter().zip(row.iter()).enumerate()
                {
                    if *cached != param.column_type() && !param.is_null() {
                        // A changed type invalidates the frame's header; close
                        // with the rows so far and re-send types next time.
                        tracing::debug!(offset, position, "type change closes frame");
                        let next_offset = close_frame(
                            writer,
                            sink,
                            count_slot,
                            statement_id,
                            rows,
                            initial_offset,
                            offset,
                        )?;
                        return Ok(BatchProgress {
                            next_offset,
                            deferred_long_data: false,
                        });
                    }
                }
            }
        }

        let mut row_size = 0;
        for param in row {
            if param.is_long_data() {
                has_long_data = true;
            } else if param.is_null() {
                row_size += 1;
            } else {
                row_size += param.binary_len() + 1;
            }
        }

        if !has_long_data {
            if writer.fits(row_size) {
                writer.reserve(row_size);
                let out = writer.payload_mut();
                for param in row {
                    if param.is_null() {
                        write_int_1(out, STMT_INDICATOR_NULL);
                    } else {
                        write_int_1(out, STMT_INDICATOR_NONE);
                        param.encode_value(out)?;
                    }
                }
                offset += 1;
            } else {
                // A lone row larger than the packet limit cannot be split.
                if offset == initial_offset {
                    return Err(Error::MaxAllowedPacket {
                        size: row_size + writer.position(),
                        max_allowed_packet: writer.max_allowed_packet(),
                    });
                }

                let next_offset = close_frame(
                    writer,
                    sink,
                    count_slot,
                    statement_id,
                    rows,
                    initial_offset,
                    offset,
                )?;
                return Ok(BatchProgress {
                    next_offset,
                    deferred_long_data: false,
                });
            }
        }
    }

    if has_long_data {
        tracing::debug!(offset, "long data defers to the side channel");
        if offset > initial_offset {
            // Flush the rows before the long-data row; the caller routes that
            // row through the side channel and resumes after it.
            let next_offset = close_frame(
                writer,
                sink,
                count_slot,
                statement_id,
                rows,
                initial_offset,
                offset,
            )?;
            return Ok(BatchProgress {
                next_offset,
                deferred_long_data: true,
            });
        }

        writer.abort_packet();
        return Ok(BatchProgress {
            next_offset: offset,
            deferred_long_data: true,
        });
    }

    let next_offset = close_frame(
        writer,
        sink,
        count_slot,
        statement_id,
        rows,
        initial_offset,
        offset,
    )?;
    Ok(BatchProgress {
        next_offset,
        deferred_long_data: false,
    })
}

/// Patch the iteration count and flush, or fall back to a plain single
/// execute when the frame holds exactly one row.
fn close_frame<'p, W, R>(
    writer: &mut PacketWriter,
    sink: &mut W,
    count_slot: Int4Slot,
    statement_id: u32,
    rows: &[R],
    initial_offset: usize,
    offset: usize,
) -> Result<usize>
where
    W: Write,
    R: AsRef<[&'p dyn Param]>,
{
    let batch_len = offset - initial_offset;

    if batch_len == 1 {
        // Bulk framing for a singleton is pure overhead.
        let row = rows[offset - 1].as_ref();
        writer.start_packet();
        write_execute(writer.payload_mut(), statement_id, row)?;
        writer.finish_packet(sink)?;
        return Ok(offset);
    }

    writer.patch_int4(count_slot, batch_len as u32)?;
    writer.finish_packet(sink)?;
    tracing::debug!(rows = batch_len, "batch frame flushed");
    Ok(offset)
}
