//! IO_BANK0: GPIO status and function select (datasheet 2.19.6.1).
use crate::{Field, RegisterBlock};
use arbitrary_int::{u2, u5};
use bitbybit::bitfield;
use num_enum::{IntoPrimitive, TryFromPrimitive};

pub const IO_BANK0_BASE: u32 = 0x4001_4000;

pub const GPIO: RegisterBlock =
    RegisterBlock::new(IO_BANK0_BASE, 0x08, crate::pads::PIN_COUNT, 0x08);

pub const GPIO_STATUS: u32 = 0x00;
pub const GPIO_CTRL: u32 = 0x04;

pub const IRQTOPROC: Field = Field::new(GPIO_STATUS, 26, 1);
pub const IRQFROMPAD: Field = Field::new(GPIO_STATUS, 24, 1);
pub const INTOPERI: Field = Field::new(GPIO_STATUS, 19, 1);
pub const INFROMPAD: Field = Field::new(GPIO_STATUS, 17, 1);
pub const OETOPAD: Field = Field::new(GPIO_STATUS, 13, 1);
pub const OEFROMPERI: Field = Field::new(GPIO_STATUS, 12, 1);
pub const OUTTOPAD: Field = Field::new(GPIO_STATUS, 9, 1);
pub const OUTFROMPERI: Field = Field::new(GPIO_STATUS, 8, 1);

pub const IRQOVER: Field = Field::new(GPIO_CTRL, 28, 2);
pub const INOVER: Field = Field::new(GPIO_CTRL, 16, 2);
pub const OEOVER: Field = Field::new(GPIO_CTRL, 12, 2);
pub const OUTOVER: Field = Field::new(GPIO_CTRL, 8, 2);
pub const FUNCSEL: Field = Field::new(GPIO_CTRL, 0, 5);

/// GPIO function select values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Function {
    Spi = 1,
    Uart = 2,
    I2c = 3,
    Pwm = 4,
    Sio = 5,
    Pio0 = 6,
    Pio1 = 7,
    Clock = 8,
    Usb = 9,
    Null = 0x1f,
}

#[bitfield(u32, default = 0x1f)]
#[derive(Debug, PartialEq)]
pub struct Ctrl {
    #[bits(28..=29, rw)]
    pub irqover: u2,
    #[bits(16..=17, rw)]
    pub inover: u2,
    #[bits(12..=13, rw)]
    pub oeover: u2,
    #[bits(8..=9, rw)]
    pub outover: u2,
    #[bits(0..=4, rw)]
    pub funcsel: u5,
}

impl Ctrl {
    /// Control word routing the pin to `function` with no overrides.
    pub fn routed(function: Function) -> Self {
        Self::new_with_raw_value(0).with_funcsel(u5::new(function.into()))
    }

    pub fn function(&self) -> Option<Function> {
        Function::try_from(self.funcsel().value()).ok()
    }
}
