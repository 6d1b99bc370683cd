pub mod bulk;
pub mod execute_batch;
pub mod prepared;

/// Action returned by reply state machines indicating the next I/O step
pub enum Action<'buf> {
    /// More data is needed - fill the referenced buffer with the next payload
    NeedPacket(&'buf mut Vec<u8>),
    /// The reply has been fully consumed
    Finished,
}
