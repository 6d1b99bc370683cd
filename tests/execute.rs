//! Driving-loop behavior against a scripted in-memory connection: reply
//! accounting, error absorption, long-data routing, generated keys.

use std::io::{self, Cursor, Read, Write};

use mariadb_bulk::constant::StatusFlags;
use mariadb_bulk::protocol::Param;
use mariadb_bulk::protocol::r#trait::LongData;
use mariadb_bulk::results::{EXECUTE_FAILED, SUCCESS_NO_INFO};
use mariadb_bulk::{BatchResult, Opts, PacketWriter, execute, execute_batch, execute_bulk};

/// One side of a connection: commands are captured, replies are scripted.
struct TestStream {
    replies: Cursor<Vec<u8>>,
    sent: Vec<u8>,
}

impl TestStream {
    fn new(replies: Vec<u8>) -> Self {
        Self {
            replies: Cursor::new(replies),
            sent: Vec::new(),
        }
    }
}

impl Read for TestStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.replies.read(buf)
    }
}

impl Write for TestStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lenenc(out: &mut Vec<u8>, value: u64) {
    assert!(value < 251, "test values stay in the 1-byte range");
    out.push(value as u8);
}

/// Frame one reply payload with a packet header.
fn frame(payload: &[u8], seq: u8) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes()[..3]);
    out.push(seq);
    out.extend_from_slice(payload);
    out
}

fn ok_payload(affected: u64, insert_id: u64, status: u16) -> Vec<u8> {
    let mut out = vec![0x00];
    lenenc(&mut out, affected);
    lenenc(&mut out, insert_id);
    out.extend_from_slice(&status.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

fn err_payload(code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut out = vec![0xFF];
    out.extend_from_slice(&code.to_le_bytes());
    out.push(b'#');
    out.extend_from_slice(sql_state.as_bytes());
    out.extend_from_slice(message.as_bytes());
    out
}

fn eof_payload(status: u16) -> Vec<u8> {
    let mut out = vec![0xFE];
    lenenc(&mut out, 0);
    lenenc(&mut out, 0);
    out.extend_from_slice(&status.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

fn key_block_row(first_id: u64, len: u64, increment: u64) -> Vec<u8> {
    let mut out = vec![0x00, 0x00]; // row header + null bitmap
    out.extend_from_slice(&first_id.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&increment.to_le_bytes());
    out
}

#[test]
fn single_frame_batch_records_one_success() {
    let ints: Vec<i32> = (0..6).collect();
    let rows: Vec<Vec<&dyn Param>> = ints.iter().map(|i| vec![i as &dyn Param]).collect();

    let mut stream = TestStream::new(frame(&ok_payload(6, 0, 0), 1));
    let mut writer = PacketWriter::new(1 << 20);
    let result = BatchResult::new();

    execute_batch(&mut stream, &mut writer, 1, &rows, &result).unwrap();

    assert_eq!(result.total_affected_rows(), Some(6));
    assert_eq!(result.stat_count(), 1);
    let counts = result.update_counts();
    assert_eq!(counts.len(), 6);
    assert!(counts.iter().all(|&status| status == SUCCESS_NO_INFO));
    assert!(
        stream.replies.position() as usize == stream.replies.get_ref().len(),
        "every scripted reply consumed"
    );
}

#[test]
fn server_error_taints_batch_but_does_not_stop_it() {
    // A type flip at row 3 forces two frames, each answered separately; the
    // second reply is an ERR that must be absorbed, not raised.
    let ints: Vec<i32> = (0..3).collect();
    let texts: Vec<String> = (0..3).map(|i| format!("t{i}")).collect();
    let mut rows: Vec<Vec<&dyn Param>> = ints.iter().map(|i| vec![i as &dyn Param]).collect();
    rows.extend(texts.iter().map(|t| vec![t as &dyn Param]));

    let mut replies = frame(&ok_payload(3, 0, 0), 1);
    replies.extend(frame(&err_payload(1062, "23000", "Duplicate entry"), 1));

    let mut stream = TestStream::new(replies);
    let mut writer = PacketWriter::new(1 << 20);
    let result = BatchResult::new();

    execute_batch(&mut stream, &mut writer, 1, &rows, &result).unwrap();

    assert!(result.has_error());
    assert_eq!(result.total_affected_rows(), Some(3));
    let counts = result.update_counts();
    assert!(counts.iter().all(|&status| status == EXECUTE_FAILED));
    assert!(
        stream.replies.position() as usize == stream.replies.get_ref().len(),
        "the loop kept going after the error"
    );
}

#[test]
fn long_data_row_goes_through_side_channel() {
    let blob = vec![0xEEu8; 100];
    let long = LongData(&blob);
    let before = 5i32;
    let rows: Vec<Vec<&dyn Param>> = vec![
        vec![&before as &dyn Param],
        vec![&long as &dyn Param],
    ];

    // Reply 1: the frame holding the first row (singleton fallback).
    // Reply 2: the single execute completing the long-data row.
    let mut replies = frame(&ok_payload(1, 0, 0), 1);
    replies.extend(frame(&ok_payload(1, 0, 0), 1));

    let mut stream = TestStream::new(replies);
    let mut writer = PacketWriter::new(1 << 20);
    let result = BatchResult::new();

    execute_batch(&mut stream, &mut writer, 9, &rows, &result).unwrap();

    assert_eq!(result.total_affected_rows(), Some(2));

    // A COM_STMT_SEND_LONG_DATA command for parameter 0 went over the wire.
    let mut offset = 0;
    let sent = &stream.sent;
    let mut opcodes = Vec::new();
    while offset < sent.len() {
        let len = u32::from_le_bytes([sent[offset], sent[offset + 1], sent[offset + 2], 0]);
        opcodes.push(sent[offset + 4]);
        offset += 4 + len as usize;
    }
    assert_eq!(opcodes, vec![0x17, 0x18, 0x17]);

    let long_data_at = sent.iter().position(|&byte| byte == 0x18).unwrap();
    // opcode, statement id 9, parameter index 0, then the raw chunk.
    assert_eq!(&sent[long_data_at + 1..long_data_at + 5], &9u32.to_le_bytes());
    assert_eq!(&sent[long_data_at + 5..long_data_at + 7], &0u16.to_le_bytes());
    assert_eq!(&sent[long_data_at + 7..long_data_at + 7 + 100], &blob[..]);
}

#[test]
fn bulk_command_collects_generated_key_blocks() {
    let ints: Vec<i32> = (0..5).collect();
    let rows: Vec<Vec<&dyn Param>> = ints.iter().map(|i| vec![i as &dyn Param]).collect();

    // Generated-ids result set, then the unit's OK with the affected count.
    let mut replies = frame(&[3], 1); // column count
    for seq in 2..5u8 {
        replies.extend(frame(b"coldef", seq));
    }
    replies.extend(frame(&key_block_row(100, 3, 1), 5));
    replies.extend(frame(&key_block_row(200, 2, 5), 6));
    replies.extend(frame(
        &eof_payload(StatusFlags::SERVER_MORE_RESULTS_EXISTS),
        7,
    ));
    replies.extend(frame(&ok_payload(5, 0, 0), 8));

    let mut stream = TestStream::new(replies);
    let mut writer = PacketWriter::new(1 << 20);
    let result = BatchResult::new();

    execute_bulk(&mut stream, &mut writer, 4, &rows, 1, &result).unwrap();

    assert_eq!(result.generated_keys(), vec![100, 101, 102, 200, 205]);
    assert_eq!(result.total_affected_rows(), Some(5));
    assert!(!result.has_error());

    // Exactly one command was sent and it used the bulk opcode.
    assert_eq!(stream.sent[4], 0xFA);
}

#[test]
fn dispatch_follows_server_capability() {
    let ints: Vec<i32> = (0..3).collect();
    let rows: Vec<Vec<&dyn Param>> = ints.iter().map(|i| vec![i as &dyn Param]).collect();
    let opts = Opts::default();

    let mut stream = TestStream::new(frame(&ok_payload(3, 0, 0), 1));
    let result = BatchResult::new();
    execute(&mut stream, &opts, "10.6.4-MariaDB", 1, &rows, &result).unwrap();
    assert_eq!(stream.sent[4], 0xFA, "array binding on capable servers");

    let mut stream = TestStream::new(frame(&ok_payload(3, 0, 0), 1));
    let result = BatchResult::new();
    execute(&mut stream, &opts, "8.0.36", 1, &rows, &result).unwrap();
    assert_eq!(stream.sent[4], 0x17, "splitting encoder everywhere else");
}

#[test]
fn empty_batch_is_a_no_op() {
    let rows: Vec<Vec<&dyn Param>> = Vec::new();
    let mut stream = TestStream::new(Vec::new());
    let mut writer = PacketWriter::new(1 << 20);
    let result = BatchResult::new();

    execute_batch(&mut stream, &mut writer, 1, &rows, &result).unwrap();
    execute_bulk(&mut stream, &mut writer, 1, &rows, 0, &result).unwrap();

    assert!(stream.sent.is_empty());
    assert_eq!(result.total_affected_rows(), None);
}
