use uuid::Uuid;

/**
 * How often (milliseconds) to poll the adapters for new scan results.
 */
pub const SCAN_POLL_DELAY: u64 = 250;

/**
 * How long (milliseconds) a scan runs by default.
 */
pub const DEFAULT_SCAN_DURATION: u64 = 5000;

/**
 * How long (milliseconds) a single read or write on the connected peripheral may take.
 */
pub const OPERATION_DEADLINE: u64 = 5000;

/**
 * How long (milliseconds) connecting and discovering services may take.
 */
pub const CONNECT_DEADLINE: u64 = 10000;

/**
 * How often (milliseconds) to check whether the peripheral is still connected while watching.
 */
pub const CONNECTION_CHECK_DELAY: u64 = 1000;

/**
 * How many GATT operations may wait in the queue of one connection.
 */
pub const OPERATION_QUEUE_CAPACITY: usize = 32;

/**
 * Slots per subscriber of the status relay. A subscriber that falls behind only sees the newest event.
 */
pub const STATUS_RELAY_CAPACITY: usize = 1;

// Services exposed by the Clockwise firmware.
pub const DEVICE_CONFIG_SERVICE: &str = "0000ff10-0000-1000-8000-00805f9b34fb";
pub const NETWORK_SERVICE: &str = "0000ff20-0000-1000-8000-00805f9b34fb";
pub const DISPLAY_SERVICE: &str = "0000ff30-0000-1000-8000-00805f9b34fb";
pub const DEVICE_INFO_SERVICE: &str = "0000ff40-0000-1000-8000-00805f9b34fb";

// Device config characteristics
pub const DISPLAY_BRIGHT: &str = "0000ff11-0000-1000-8000-00805f9b34fb";
pub const AUTO_BRIGHT_MIN: &str = "0000ff12-0000-1000-8000-00805f9b34fb";
pub const AUTO_BRIGHT_MAX: &str = "0000ff13-0000-1000-8000-00805f9b34fb";
pub const SWAP_BLUE_GREEN: &str = "0000ff14-0000-1000-8000-00805f9b34fb";
pub const SWAP_BLUE_RED: &str = "0000ff15-0000-1000-8000-00805f9b34fb";
pub const USE_24H_FORMAT: &str = "0000ff16-0000-1000-8000-00805f9b34fb";
pub const LDR_PIN: &str = "0000ff17-0000-1000-8000-00805f9b34fb";
pub const DISPLAY_ROTATION: &str = "0000ff18-0000-1000-8000-00805f9b34fb";
pub const DRIVER: &str = "0000ff19-0000-1000-8000-00805f9b34fb";
pub const I2C_SPEED: &str = "0000ff1a-0000-1000-8000-00805f9b34fb";
pub const E_PIN: &str = "0000ff1b-0000-1000-8000-00805f9b34fb";

// Network characteristics
pub const WIFI_SSID: &str = "0000ff21-0000-1000-8000-00805f9b34fb";
pub const WIFI_PWD: &str = "0000ff22-0000-1000-8000-00805f9b34fb";
pub const TIME_ZONE: &str = "0000ff23-0000-1000-8000-00805f9b34fb";
pub const NTP_SERVER: &str = "0000ff24-0000-1000-8000-00805f9b34fb";
pub const MANUAL_POSIX: &str = "0000ff25-0000-1000-8000-00805f9b34fb";

// Display characteristics
pub const CANVAS_FILE: &str = "0000ff31-0000-1000-8000-00805f9b34fb";
pub const CANVAS_SERVER: &str = "0000ff32-0000-1000-8000-00805f9b34fb";

// Device info characteristics
pub const FIRMWARE_VERSION: &str = "0000ff41-0000-1000-8000-00805f9b34fb";
pub const FIRMWARE_NAME: &str = "0000ff42-0000-1000-8000-00805f9b34fb";
pub const CLOCKFACE_NAME: &str = "0000ff43-0000-1000-8000-00805f9b34fb";
pub const RESTART: &str = "0000ff4f-0000-1000-8000-00805f9b34fb";

/**
 * Written to RESTART to reboot the clock.
 */
pub const COMMAND_RESTART: [u8; 1] = [0x01];

/**
 * Parses one of the UUID constants above. The constants are checked by the registry tests.
 */
pub const fn make_uuid(value: &str) -> Uuid {
    match Uuid::try_parse(value) {
        Ok(uuid) => uuid,
        Err(_) => panic!("invalid uuid constant"),
    }
}

pub fn make_device_config_service_uuid() -> Uuid {
    make_uuid(DEVICE_CONFIG_SERVICE)
}
