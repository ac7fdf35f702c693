//! Board services the bridge needs beyond USB: a device-unique id and a clock.

/// Length of the board's unique identifier (RP2040-style 64-bit flash id).
pub const BOARD_ID_LEN: usize = 8;

pub trait Platform {
    /// Device-unique hardware serial. Must always be available: a board
    /// without one cannot host the bridge.
    fn unique_board_id(&self) -> [u8; BOARD_ID_LEN];

    /// Monotonic milliseconds since boot, used for IP-stack timers.
    fn now_ms(&self) -> u64;
}
