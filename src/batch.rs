use std::io::{Read, Write};

use crate::constant::ColumnType;
use crate::error::Result;
use crate::opts::{Opts, supports_bulk};
use crate::protocol::command::Action;
use crate::protocol::command::bulk::{BulkFlags, BulkReplyReader, write_bulk_execute};
use crate::protocol::command::execute_batch::write_execute_batch;
use crate::protocol::command::prepared::{write_execute, write_send_long_data};
use crate::protocol::packet::read_payload;
use crate::protocol::r#trait::Param;
use crate::results::BatchResult;
use crate::writer::PacketWriter;

/// Execute a batch with whichever strategy `server_version` allows.
///
/// Servers with array binding get one COM_STMT_BULK_EXECUTE command (unless
/// disabled through [`Opts::use_bulk`]); everything else goes through the
/// splitting encoder.
pub fn execute<'p, S, R>(
    stream: &mut S,
    opts: &Opts,
    server_version: &str,
    statement_id: u32,
    rows: &[R],
    result: &BatchResult,
) -> Result<()>
where
    S: Read + Write,
    R: AsRef<[&'p dyn Param]>,
{
    let mut writer = PacketWriter::new(opts.max_allowed_packet);

    if opts.use_bulk && supports_bulk(server_version) {
        let parameter_count = rows.first().map_or(0, |row| row.as_ref().len());
        execute_bulk(
            stream,
            &mut writer,
            statement_id,
            rows,
            parameter_count,
            result,
        )
    } else {
        execute_batch(stream, &mut writer, statement_id, rows, result)
    }
}

/// Execute a batch with the array-binding COM_STMT_BULK_EXECUTE command.
///
/// One logical command carries every row; the server replies once per unit.
/// Only valid against servers that advertise array binding (see
/// [`supports_bulk`](crate::supports_bulk)).
#[tracing::instrument(skip_all)]
pub fn execute_bulk<'p, S, R>(
    stream: &mut S,
    writer: &mut PacketWriter,
    statement_id: u32,
    rows: &[R],
    parameter_count: usize,
    result: &BatchResult,
) -> Result<()>
where
    S: Read + Write,
    R: AsRef<[&'p dyn Param]>,
{
    if rows.is_empty() {
        return Ok(());
    }

    write_bulk_execute(
        writer,
        stream,
        statement_id,
        rows,
        parameter_count,
        BulkFlags::SEND_UNIT_RESULTS | BulkFlags::SEND_TYPES_TO_SERVER,
    )?;
    read_reply(stream, result)
}

/// Execute a batch with the splitting encoder, for servers without array
/// binding.
///
/// Repeatedly invokes the encoder until the row range is consumed, reading
/// one reply after every flushed frame before the next is sent — frames are
/// never pipelined. Rows binding long-data values are deferred by the
/// encoder; this loop streams their payloads through
/// COM_STMT_SEND_LONG_DATA and executes them singly before resuming.
///
/// Server-reported execution failures land in `result` and do not stop the
/// remaining frames; encode-time and transport errors abort the loop.
#[tracing::instrument(skip_all)]
pub fn execute_batch<'p, S, R>(
    stream: &mut S,
    writer: &mut PacketWriter,
    statement_id: u32,
    rows: &[R],
    result: &BatchResult,
) -> Result<()>
where
    S: Read + Write,
    R: AsRef<[&'p dyn Param]>,
{
    let mut offset = 0;
    let mut last_sent_types: Vec<ColumnType> = Vec::new();

    while offset < rows.len() {
        let progress = write_execute_batch(
            writer,
            stream,
            statement_id,
            rows,
            offset,
            &mut last_sent_types,
        )?;

        if progress.next_offset > offset {
            read_reply(stream, result)?;
        }
        offset = progress.next_offset;

        if progress.deferred_long_data {
            let row = rows[offset].as_ref();
            for (index, param) in row.iter().enumerate() {
                if let Some(chunk) = param.long_data() {
                    // No server reply follows this command.
                    writer.start_packet();
                    write_send_long_data(writer.payload_mut(), statement_id, index as u16, chunk);
                    writer.finish_packet(stream)?;
                }
            }

            writer.start_packet();
            write_execute(writer.payload_mut(), statement_id, row)?;
            writer.finish_packet(stream)?;
            read_reply(stream, result)?;
            offset += 1;
        }
    }

    Ok(())
}

/// The blocking result-read step: drain one command's reply into `result`.
fn read_reply<S: Read>(stream: &mut S, result: &BatchResult) -> Result<()> {
    let mut reader = BulkReplyReader::new(result);
    let mut buffer = Vec::new();

    loop {
        match reader.step(&mut buffer)? {
            Action::NeedPacket(buf) => {
                read_payload(stream, buf)?;
            }
            Action::Finished => return Ok(()),
        }
    }
}
