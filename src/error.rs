use thiserror::Error;

use crate::protocol::response::{ErrPayload, ErrPayloadBytes};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The caller declared more parameters than the row actually binds.
    #[error("Parameter at position {position} is not set")]
    ParameterNotSet { position: usize },

    /// A single row's encoding does not fit into one command packet.
    #[error("stream size {size} is >= to max_allowed_packet ({max_allowed_packet})")]
    MaxAllowedPacket {
        size: usize,
        max_allowed_packet: usize,
    },

    /// A header slot patch targeted bytes outside the current frame.
    #[error("reserved slot at offset {offset} is outside the frame")]
    InvalidFrameSlot { offset: usize },

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected EOF")]
    UnexpectedEof,
}

impl Error {
    /// SQLSTATE for errors that carry one.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Error::ServerError(err) => Some(&err.sql_state),
            Error::ParameterNotSet { .. } => Some("07004"),
            Error::MaxAllowedPacket { .. } => Some("08000"),
            _ => None,
        }
    }
}

impl<'a> From<ErrPayloadBytes<'a>> for Error {
    fn from(value: ErrPayloadBytes) -> Self {
        match ErrPayload::try_from(value) {
            Ok(err_payload) => Error::ServerError(err_payload),
            Err(err) => err,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
