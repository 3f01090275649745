//! Saccade - Animatronic Eye Servo Controller Firmware
//!
//! Drives four eye servos (left/right, horizontal/vertical) through a
//! PCA9685 from commands sent over a serial line by a host GUI, a joystick
//! bridge or a face tracker.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::{Config as I2cConfig, I2c};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use saccade_core::{ConfigOrigin, Controller};
use saccade_drivers::pwm::{Pca9685, Pca9685Config};
use saccade_hal_rp2040::flash::Rp2040RecordSlot;

mod board;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Saccade firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // PCA9685 on I2C0
    let mut i2c_config = I2cConfig::default();
    i2c_config.frequency = board::I2C_FREQUENCY_HZ;
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config);
    let mut pwm = Pca9685::new(
        i2c,
        Delay,
        Pca9685Config {
            address: board::PCA9685_ADDRESS,
            channel_map: board::CHANNEL_MAP,
        },
    );
    match pwm.init() {
        Ok(()) => info!("PCA9685 initialized at {:#x}", board::PCA9685_ADDRESS),
        Err(e) => error!("PCA9685 init failed: {:?}", e),
    }

    // Config record from the last flash sector
    let slot = Rp2040RecordSlot::new(p.FLASH);
    let (controller, origin) = Controller::new(pwm, slot);
    match origin {
        ConfigOrigin::Stored => info!("Loaded servo config from flash"),
        ConfigOrigin::Defaults {
            reason,
            persist_error: None,
        } => warn!("Stored config rejected ({:?}), defaults saved", reason),
        ConfigOrigin::Defaults {
            reason,
            persist_error: Some(e),
        } => error!(
            "Stored config rejected ({:?}), saving defaults failed: {:?}",
            reason, e
        ),
    }
    let config = controller.config();
    info!(
        "Config: {} Hz, tween {} deg / {} ms",
        config.frequency.hz(),
        config.tween.step_deg,
        config.tween.interval_ms
    );

    // Host link on UART0
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = board::UART_BAUD;

    let tx_buf = TX_BUF.init([0u8; 1024]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    info!("UART initialized at {} baud", board::UART_BAUD);

    spawner.spawn(tasks::control_task(controller, uart)).unwrap();
}
