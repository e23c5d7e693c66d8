//! PWM: eight counter/compare slices, each driving or sampling a pin pair (datasheet 4.5.3).
use crate::{Field, RegisterBlock};
use arbitrary_int::u4;
use bitbybit::{bitenum, bitfield};

pub const PWM_BASE: u32 = 0x4005_0000;

pub const SLICE_COUNT: usize = 8;

pub const SLICES: RegisterBlock =
    RegisterBlock::new(PWM_BASE, 0x14, SLICE_COUNT, 0x14);

pub const CSR: u32 = 0x00;
pub const DIV: u32 = 0x04;
pub const CTR: u32 = 0x08;
pub const CC: u32 = 0x0c;
pub const TOP: u32 = 0x10;

/// Shared enable register: bit `n` aliases `CSR.EN` of slice `n`.
pub const EN: u32 = 0xa0;
pub const EN_ADDRESS: u32 = PWM_BASE + EN;

pub const CSR_PH_ADV: Field = Field::new(CSR, 7, 1);
pub const CSR_PH_RET: Field = Field::new(CSR, 6, 1);
pub const CSR_DIVMODE: Field = Field::new(CSR, 4, 2);
pub const CSR_B_INV: Field = Field::new(CSR, 3, 1);
pub const CSR_A_INV: Field = Field::new(CSR, 2, 1);
pub const CSR_PH_CORRECT: Field = Field::new(CSR, 1, 1);
pub const CSR_EN: Field = Field::new(CSR, 0, 1);

pub const DIV_INT: Field = Field::new(DIV, 4, 8);
pub const DIV_FRAC: Field = Field::new(DIV, 0, 4);

pub const CTR_VALUE: Field = Field::new(CTR, 0, 16);

pub const CC_A: Field = Field::new(CC, 0, 16);
pub const CC_B: Field = Field::new(CC, 16, 16);

pub const TOP_VALUE: Field = Field::new(TOP, 0, 16);

/// What advances the slice counter.
#[bitenum(u2, exhaustive = true)]
#[derive(Debug, PartialEq)]
pub enum DivMode {
    /// The fractional divider, free running.
    FreeRunning = 0,
    /// The fractional divider, gated by a high level on the B pin.
    BHigh = 1,
    /// Each rising edge of the B pin.
    BRising = 2,
    /// Each falling edge of the B pin.
    BFalling = 3,
}

#[bitfield(u32, default = 0)]
#[derive(Debug, PartialEq)]
pub struct Csr {
    #[bit(7, rw)]
    pub ph_adv: bool,
    #[bit(6, rw)]
    pub ph_ret: bool,
    #[bits(4..=5, rw)]
    pub divmode: DivMode,
    #[bit(3, rw)]
    pub b_inv: bool,
    #[bit(2, rw)]
    pub a_inv: bool,
    #[bit(1, rw)]
    pub ph_correct: bool,
    #[bit(0, rw)]
    pub en: bool,
}

/// Clock divisor, 8.4 fixed point. An integer part of 0 divides by 256.
#[bitfield(u32, default = 0x10)]
#[derive(Debug, PartialEq)]
pub struct Div {
    #[bits(4..=11, rw)]
    pub int: u8,
    #[bits(0..=3, rw)]
    pub frac: u4,
}

impl Div {
    /// Divisor in sixteenths.
    pub fn sixteenths(&self) -> u32 {
        let int = match self.int() {
            0 => 256,
            i => i as u32,
        };
        int * 16 + self.frac().value() as u32
    }
}

#[bitfield(u32, default = 0)]
#[derive(Debug, PartialEq)]
pub struct Cc {
    #[bits(16..=31, rw)]
    pub b: u16,
    #[bits(0..=15, rw)]
    pub a: u16,
}

/// The slice driving `pin`.
pub const fn slice_of(pin: u8) -> usize {
    ((pin >> 1) & 7) as usize
}

/// Slice channel of `pin`: A for even pins, B for odd pins.
pub const fn channel_of(pin: u8) -> Channel {
    if pin & 1 == 0 {
        Channel::A
    } else {
        Channel::B
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}
