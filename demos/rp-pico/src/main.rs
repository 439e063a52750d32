//! # SHT1x thermometer.
//!
//! This will output a temperature and humidity reading via `defmt` every two seconds. Modified
//! from the Pico Blinky example, the on-board LED (GP25) is lit while a sample is taken.
//!
//! Wiring: SCK to GP16, DATA to GP17 with a 10kΩ pull-up to 3V3.
//!
//! Run with `DEFMT_LOG=info cargo run`.
#![no_std]
#![no_main]

// For logging via defmt
use defmt_rtt as _;

// The macro for our start-up function
use rp_pico::entry;

// GPIO traits
use embedded_hal::digital::OutputPin;

// Ensure we halt the program on panic (if we don't mention this crate it won't
// be linked)
use panic_halt as _;

// Time handling traits:
use embedded_hal::delay::DelayNs;

// A shorter alias for the Peripheral Access Crate, which provides low-level
// register access
use rp_pico::hal::pac;

// A shorter alias for the Hardware Abstraction Layer, which provides
// higher-level drivers.
use rp_pico::hal;

use sht1x_driver::{Config, Error, Lines, SHT1x};

/// Entry point to our bare-metal application.
///
/// The function configures the RP2040 peripherals, resets the SHT1x's interface once, then
/// samples it forever.
#[entry]
fn main() -> ! {
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = hal::clocks::init_clocks_and_plls(
        rp_pico::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    // The timer provides all the delays the driver needs.
    let mut timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // The single-cycle I/O block controls our GPIO pins
    let sio = hal::Sio::new(pac.SIO);

    // Set the pins up according to their function on this particular board
    let pins = rp_pico::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // Set the LED to be an output
    let mut led_pin = pins.led.into_push_pull_output();
    // SCK is a plain output. DATA is bidirectional: InOutPin emulates an open-drain pin by
    // switching between driving low and floating.
    let sck_pin = pins.gpio16.into_push_pull_output();
    let data_pin = hal::gpio::InOutPin::new(pins.gpio17.into_floating_input());

    let mut sht1x = SHT1x::new(Lines::new(sck_pin, data_pin), Config::default());
    sht1x.connection_reset(&mut timer).unwrap();
    defmt::info!("setup done");

    loop {
        led_pin.set_high().unwrap();

        match sht1x.sample(&mut timer) {
            Ok(reading) => {
                defmt::info!("temperature: {}", reading.whole_degrees());
                defmt::info!("humidity: {}", reading.whole_percent());
            }
            // The driver has already reset the bus, try again next time round.
            Err(Error::Transaction(errors)) => defmt::warn!("sample failed, {} errors", errors),
            Err(_) => defmt::error!("sample failed"),
        }

        led_pin.set_low().unwrap();
        timer.delay_ms(2_000);
    }
}
