/// Configuration for batched statement execution
///
/// ```rs
/// let mut opts = Opts::default();
/// opts.max_allowed_packet = 4 * 1024 * 1024;
/// ```
#[derive(Debug, Clone)]
pub struct Opts {
    /// Server-negotiated `max_allowed_packet`. One command packet, including
    /// everything buffered so far, must stay below this.
    pub max_allowed_packet: usize,

    /// Use the array-binding COM_STMT_BULK_EXECUTE command when the server
    /// advertises it; otherwise batches go through the splitting encoder.
    pub use_bulk: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            max_allowed_packet: 16 * 1024 * 1024,
            use_bulk: true,
        }
    }
}

/// Whether the server supports COM_STMT_BULK_EXECUTE.
///
/// Array binding is MariaDB-only, available from 10.2.7. Servers behind a
/// 5.5.5 replication version prefix ("5.5.5-10.4.0-MariaDB") are unwrapped
/// before comparison.
pub fn supports_bulk(server_version: &str) -> bool {
    let version = server_version
        .strip_prefix("5.5.5-")
        .unwrap_or(server_version);

    if !version.to_ascii_lowercase().contains("mariadb") {
        return false;
    }

    let mut parts = version
        .split(['.', '-'])
        .map_while(|part| part.parse::<u32>().ok());

    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    let patch = parts.next().unwrap_or(0);

    (major, minor, patch) >= (10, 2, 7)
}
