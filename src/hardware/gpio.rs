//! GPIO function routing.
use super::regs::{
    io_bank::{self, Ctrl, Function},
    pads::{self, Pad},
    Bus,
};

/// Connect `pin` to a peripheral function with its pad input enabled and output not disabled.
///
/// Drive strength, pulls and slew rate of the pad are kept.
///
/// # Panics
/// If `pin` is not a user GPIO.
pub fn set_function<B: Bus>(bus: &B, pin: u8, function: Function) {
    let regs = pads::PADS.at(bus, pin as usize);
    let pad = Pad::new_with_raw_value(regs.read(pads::PAD))
        .with_od(false)
        .with_ie(true);
    regs.write(pads::PAD, pad.raw_value());
    io_bank::GPIO
        .at(bus, pin as usize)
        .write(io_bank::GPIO_CTRL, Ctrl::routed(function).raw_value());
}

/// The function `pin` is currently routed to.
pub fn function<B: Bus>(bus: &B, pin: u8) -> Option<Function> {
    let ctrl = io_bank::GPIO.at(bus, pin as usize).read(io_bank::GPIO_CTRL);
    Ctrl::new_with_raw_value(ctrl).function()
}
