use crate::constant::ColumnType;
use crate::error::Result;
use crate::protocol::primitive::*;

/// A bound parameter value, one per statement placeholder.
///
/// Supplied by the driver's type-conversion layer and consumed by the batch
/// encoders, which need to know — without encoding yet — whether the value is
/// NULL, whether it must travel out of band, its wire type, and how many
/// bytes its binary form takes.
///
/// # Examples
/// - `&42i32`
/// - `&"hello"`
/// - `&None::<i64>`  // NULL
/// - `&LongData(blob)`  // out-of-band
pub trait Param {
    /// Returns true if this parameter is NULL
    fn is_null(&self) -> bool {
        false
    }

    /// Returns true if this parameter is sent through the long-data
    /// side channel instead of inline in a row payload
    fn is_long_data(&self) -> bool {
        false
    }

    /// Bytes to stream through the side channel, for long-data parameters
    fn long_data(&self) -> Option<&[u8]> {
        None
    }

    /// Wire type tag
    fn column_type(&self) -> ColumnType;

    /// Whether the unsigned flag accompanies the type in 2-byte type pairs
    fn unsigned_flag(&self) -> bool {
        false
    }

    /// Approximate length of the binary encoding in bytes
    fn binary_len(&self) -> usize;

    /// Encode parameter value (binary protocol)
    ///
    /// Only called if is_null() returns false.
    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()>;

    /// Encode the 2-byte type pair used by COM_STMT_EXECUTE headers:
    /// type byte followed by 0x80 when unsigned.
    fn encode_type(&self, out: &mut Vec<u8>) {
        out.push(self.column_type() as u8);
        out.push(if self.unsigned_flag() { 0x80 } else { 0x00 });
    }
}

// ============================================================================
// Signed integer implementations
// ============================================================================

impl Param for i8 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_TINY
    }

    fn binary_len(&self) -> usize {
        1
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_1(out, *self as u8);
        Ok(())
    }
}

impl Param for i16 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_SHORT
    }

    fn binary_len(&self) -> usize {
        2
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_2(out, *self as u16);
        Ok(())
    }
}

impl Param for i32 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_LONG
    }

    fn binary_len(&self) -> usize {
        4
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_4(out, *self as u32);
        Ok(())
    }
}

impl Param for i64 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_LONGLONG
    }

    fn binary_len(&self) -> usize {
        8
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_8(out, *self as u64);
        Ok(())
    }
}

// ============================================================================
// Unsigned integer implementations
// ============================================================================

impl Param for u8 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_TINY
    }

    fn unsigned_flag(&self) -> bool {
        true
    }

    fn binary_len(&self) -> usize {
        1
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_1(out, *self);
        Ok(())
    }
}

impl Param for u16 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_SHORT
    }

    fn unsigned_flag(&self) -> bool {
        true
    }

    fn binary_len(&self) -> usize {
        2
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_2(out, *self);
        Ok(())
    }
}

impl Param for u32 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_LONG
    }

    fn unsigned_flag(&self) -> bool {
        true
    }

    fn binary_len(&self) -> usize {
        4
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_4(out, *self);
        Ok(())
    }
}

impl Param for u64 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_LONGLONG
    }

    fn unsigned_flag(&self) -> bool {
        true
    }

    fn binary_len(&self) -> usize {
        8
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_8(out, *self);
        Ok(())
    }
}

// ============================================================================
// Floating point implementations
// ============================================================================

impl Param for f32 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_FLOAT
    }

    fn binary_len(&self) -> usize {
        4
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_4(out, self.to_bits());
        Ok(())
    }
}

impl Param for f64 {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_DOUBLE
    }

    fn binary_len(&self) -> usize {
        8
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_int_8(out, self.to_bits());
        Ok(())
    }
}

// ============================================================================
// String implementations (&str and String work the same)
// ============================================================================

impl Param for &str {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_VAR_STRING
    }

    fn binary_len(&self) -> usize {
        int_lenenc_len(self.len() as u64) + self.len()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_string_lenenc(out, self);
        Ok(())
    }
}

impl Param for String {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_VAR_STRING
    }

    fn binary_len(&self) -> usize {
        int_lenenc_len(self.len() as u64) + self.len()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_string_lenenc(out, self);
        Ok(())
    }
}

// ============================================================================
// Byte slice implementations
// ============================================================================

impl Param for &[u8] {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_BLOB
    }

    fn binary_len(&self) -> usize {
        int_lenenc_len(self.len() as u64) + self.len()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_bytes_lenenc(out, self);
        Ok(())
    }
}

impl Param for Vec<u8> {
    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_BLOB
    }

    fn binary_len(&self) -> usize {
        int_lenenc_len(self.len() as u64) + self.len()
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        write_bytes_lenenc(out, self);
        Ok(())
    }
}

// ============================================================================
// Option<T> implementation for NULL handling
// ============================================================================

impl<T: Param> Param for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn column_type(&self) -> ColumnType {
        match self {
            Some(value) => value.column_type(),
            // NULL still carries a type tag in headers
            None => ColumnType::MYSQL_TYPE_VAR_STRING,
        }
    }

    fn unsigned_flag(&self) -> bool {
        match self {
            Some(value) => value.unsigned_flag(),
            None => false,
        }
    }

    fn binary_len(&self) -> usize {
        match self {
            Some(value) => value.binary_len(),
            None => 0,
        }
    }

    fn encode_value(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(value) => value.encode_value(out),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Out-of-band values
// ============================================================================

/// A value routed through COM_STMT_SEND_LONG_DATA rather than inline.
///
/// Its bytes are delivered before execution; the execute command itself
/// carries only the type tag and an empty value slot.
#[derive(Debug, Clone, Copy)]
pub struct LongData<'a>(pub &'a [u8]);

impl Param for LongData<'_> {
    fn is_long_data(&self) -> bool {
        true
    }

    fn long_data(&self) -> Option<&[u8]> {
        Some(self.0)
    }

    fn column_type(&self) -> ColumnType {
        ColumnType::MYSQL_TYPE_BLOB
    }

    fn binary_len(&self) -> usize {
        0
    }

    fn encode_value(&self, _out: &mut Vec<u8>) -> Result<()> {
        // The payload travels out of band.
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
