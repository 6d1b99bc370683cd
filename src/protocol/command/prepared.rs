use crate::constant::CommandByte;
use crate::error::Result;
use crate::protocol::primitive::*;
use crate::protocol::r#trait::Param;

/// Write a COM_STMT_EXECUTE command for a single parameter row.
///
/// Layout: opcode, statement id, cursor type (none), iteration count 1,
/// null bitmap, new-params-bound marker, 2-byte type pairs, binary values.
/// Long-data parameters contribute their type pair but no inline value; the
/// server uses the bytes accumulated through the side channel.
pub fn write_execute(out: &mut Vec<u8>, statement_id: u32, params: &[&dyn Param]) -> Result<()> {
    write_int_1(out, CommandByte::StmtExecute as u8);
    write_int_4(out, statement_id);

    // flags (1 byte) - CURSOR_TYPE_NO_CURSOR
    write_int_1(out, 0x00);

    // iteration count (4 bytes) - always 1
    write_int_4(out, 1);

    if !params.is_empty() {
        // NULL bitmap: (num_params + 7) / 8 bytes
        let mut bitmap = vec![0u8; params.len().div_ceil(8)];
        for (i, param) in params.iter().enumerate() {
            if param.is_null() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        out.extend_from_slice(&bitmap);

        // new-params-bound flag (1 byte)
        write_int_1(out, 0x01);
        for param in params {
            param.encode_type(out);
        }

        for param in params {
            if !param.is_null() {
                param.encode_value(out)?;
            }
        }
    }
    Ok(())
}

/// Write a COM_STMT_SEND_LONG_DATA command carrying one chunk of an
/// out-of-band parameter. The server sends no reply to this command.
pub fn write_send_long_data(out: &mut Vec<u8>, statement_id: u32, param_index: u16, chunk: &[u8]) {
    write_int_1(out, CommandByte::StmtSendLongData as u8);
    write_int_4(out, statement_id);
    write_int_2(out, param_index);
    out.extend_from_slice(chunk);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::ColumnType;

    #[test]
    fn test_write_execute_layout() {
        let params: Vec<&dyn Param> = vec![&7i32, &None::<i64>, &"ab"];
        let mut out = Vec::new();
        write_execute(&mut out, 42, &params).unwrap();

        let mut expected = vec![0x17];
        expected.extend_from_slice(&42u32.to_le_bytes());
        expected.push(0x00); // no cursor
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.push(0b0000_0010); // only parameter 1 is NULL
        expected.push(0x01); // types follow
        expected.extend_from_slice(&[ColumnType::MYSQL_TYPE_LONG as u8, 0x00]);
        expected.extend_from_slice(&[ColumnType::MYSQL_TYPE_VAR_STRING as u8, 0x00]);
        expected.extend_from_slice(&[ColumnType::MYSQL_TYPE_VAR_STRING as u8, 0x00]);
        expected.extend_from_slice(&7i32.to_le_bytes());
        expected.extend_from_slice(&[2, b'a', b'b']);

        assert_eq!(out, expected);
    }

    #[test]
    fn test_write_execute_no_params() {
        let mut out = Vec::new();
        write_execute(&mut out, 9, &[]).unwrap();
        assert_eq!(out.len(), 1 + 4 + 1 + 4);
    }

    #[test]
    fn test_write_send_long_data_layout() {
        let mut out = Vec::new();
        write_send_long_data(&mut out, 3, 1, b"chunk");

        let mut expected = vec![0x18];
        expected.extend_from_slice(&3u32.to_le_bytes());
        expected.extend_from_slice(&1u16.to_le_bytes());
        expected.extend_from_slice(b"chunk");
        assert_eq!(out, expected);
    }
}
