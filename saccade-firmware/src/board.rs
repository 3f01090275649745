//! Board constants for the Raspberry Pi Pico servo board
//!
//! UART0 on GPIO0 (TX) / GPIO1 (RX) talks to the host. The PCA9685 sits on
//! I2C0 with SDA on GPIO4 and SCL on GPIO5.

/// Host link baud rate
pub const UART_BAUD: u32 = 115_200;

/// I2C bus clock
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// PCA9685 bus address (A0-A5 strapped low)
pub const PCA9685_ADDRESS: u8 = 0x40;

/// PCA9685 output for LX, LY, RX, RY
pub const CHANNEL_MAP: [u8; 4] = [0, 1, 2, 3];
