//! PADS_BANK0: electrical pad control of the user GPIOs (datasheet 2.19.6.3).
use crate::RegisterBlock;
use bitbybit::{bitenum, bitfield};

pub const PADS_BANK0_BASE: u32 = 0x4001_c000;

/// Number of user GPIO pads.
pub const PIN_COUNT: usize = 30;

/// GPIO0 follows the VOLTAGE_SELECT register at offset 0.
pub const PADS: RegisterBlock =
    RegisterBlock::new(PADS_BANK0_BASE + 0x04, 0x04, PIN_COUNT, 0x04);

pub const PAD: u32 = 0x00;

#[bitenum(u2, exhaustive = true)]
#[derive(Debug, PartialEq)]
pub enum Drive {
    Ma2 = 0,
    Ma4 = 1,
    Ma8 = 2,
    Ma12 = 3,
}

/// Pad control register. The reset value enables input, schmitt trigger and pull-down.
#[bitfield(u32, default = 0x56)]
#[derive(Debug, PartialEq)]
pub struct Pad {
    /// Output disable.
    #[bit(7, rw)]
    pub od: bool,
    /// Input enable.
    #[bit(6, rw)]
    pub ie: bool,
    #[bits(4..=5, rw)]
    pub drive: Drive,
    #[bit(3, rw)]
    pub pue: bool,
    #[bit(2, rw)]
    pub pde: bool,
    #[bit(1, rw)]
    pub schmitt: bool,
    #[bit(0, rw)]
    pub slewfast: bool,
}
