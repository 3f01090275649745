//! Control loop task
//!
//! The only task that touches controller state. Each pass drains whatever
//! the host sent, answers every completed line, then ticks the scheduler.
//! A 1 ms timer bounds the wait so motion keeps running without input.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_rp::uart::BufferedUart;
use embassy_time::{Delay, Duration, Instant, Timer};
use embedded_io_async::{Read, Write};
use heapless::String;

use saccade_core::{Controller, Handled, Interpreter, TickReport};
use saccade_drivers::pwm::Pca9685;
use saccade_hal_rp2040::flash::Rp2040RecordSlot;

/// Controller wired to the board hardware
pub type ServoController =
    Controller<Pca9685<I2c<'static, I2C0, Blocking>, Delay>, Rp2040RecordSlot<'static>>;

/// Bytes read from the UART per pass
const RX_CHUNK: usize = 64;

/// Largest reply to one line (HELP is the longest)
const REPLY_CAPACITY: usize = 1024;

/// Upper bound on the wait for input
const TICK_PERIOD: Duration = Duration::from_millis(1);

/// Control loop task
#[embassy_executor::task]
pub async fn control_task(mut controller: ServoController, mut uart: BufferedUart) {
    info!("Control task started");

    let mut interpreter = Interpreter::new();
    let mut buf = [0u8; RX_CHUNK];
    let mut reply: String<REPLY_CAPACITY> = String::new();

    loop {
        match select(uart.read(&mut buf), Timer::after(TICK_PERIOD)).await {
            Either::First(Ok(n)) => {
                for &byte in &buf[..n] {
                    reply.clear();
                    match interpreter.feed(byte, &mut controller, &mut reply) {
                        Ok(None) => continue,
                        Ok(Some(handled)) => log_handled(handled),
                        Err(_) => warn!("Reply overflowed {} bytes", REPLY_CAPACITY),
                    }
                    if let Err(e) = uart.write_all(reply.as_bytes()).await {
                        warn!("UART write failed: {:?}", e);
                    }
                }
            }
            Either::First(Err(e)) => {
                warn!("UART read error: {:?}", e);
            }
            Either::Second(()) => {}
        }

        let now_ms = Instant::now().as_millis() as u32;
        log_tick(controller.tick(now_ms));
    }
}

fn log_handled(handled: Handled) {
    match (handled.command, handled.ok) {
        ("SAVE" | "LOAD" | "RESETCFG", true) => info!("{} done", handled.command),
        ("SAVE" | "LOAD" | "RESETCFG", false) => warn!("{} failed", handled.command),
        (command, true) => debug!("{} ok", command),
        (command, false) => debug!("{} rejected", command),
    }
}

fn log_tick(report: TickReport) {
    if report.frequency_failed {
        warn!("PWM frequency update failed");
    }
    if report.failed > 0 {
        warn!("{} PWM channel writes failed", report.failed);
    } else if report.written > 0 {
        trace!("{} PWM channels written", report.written);
    }
}
