/**
    GATT service UUID advertised by the vehicle.
*/
pub const SERVICE_UUID: &str = "00000211-b2d1-43f0-9b88-960cebf8b91e";

/**
    Characteristic the vehicle notifies inbound message chunks on.
*/
pub const READ_UUID: &str = "00000213-b2d1-43f0-9b88-960cebf8b91e";

/**
    Characteristic outbound message chunks are written to.
*/
pub const WRITE_UUID: &str = "00000212-b2d1-43f0-9b88-960cebf8b91e";

/// Largest framed message in either direction, length prefix included.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// BLE write chunk size. The vehicle accepts at most 20 bytes per write.
pub const BLOCK_LENGTH: usize = 20;

/// Time allowed between sending a request and seeing its reply before the
/// attempt is retried.
pub const MAX_LATENCY_MS: u32 = 4_000;

/// Overall deadline for one command, from first processing to resolution.
pub const COMMAND_TIMEOUT_MS: u32 = 30_000;

/// Attempts per command before it fails.
pub const MAX_RETRIES: u32 = 5;

/// Commands the queue will hold before rejecting new ones.
pub const MAX_QUEUE_SIZE: usize = 20;

/// Inactivity window after which a partially reassembled message is dropped.
pub const RX_TIMEOUT_MS: u32 = 1_000;

/// Margin added to the vehicle clock when stamping `expires_at` on a signed
/// message, in seconds.
pub const LATENCY_BUDGET_S: u32 = 5;

// Charging parameter bounds. The vehicle enforces its own limits; these
// reject clearly invalid requests before they consume queue space.
pub const MIN_CHARGING_AMPS: i32 = 0;
pub const MAX_CHARGING_AMPS: i32 = 80;
pub const MIN_CHARGING_LIMIT: i32 = 50;
pub const MAX_CHARGING_LIMIT: i32 = 100;

// Storage keys.
pub const STORAGE_KEY_PRIVATE_KEY: &str = "private_key";
pub const STORAGE_KEY_SESSION_VCSEC: &str = "session_vcsec";
pub const STORAGE_KEY_SESSION_INFOTAINMENT: &str = "session_infotainment";
