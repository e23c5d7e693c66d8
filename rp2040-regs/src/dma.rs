//! DMA: twelve channels with per-channel transfer-request pacing (datasheet 2.5.7).
use crate::{Field, RegisterBlock};
use arbitrary_int::{u4, u6};
use bitbybit::{bitenum, bitfield};

pub const DMA_BASE: u32 = 0x5000_0000;

pub const CHANNEL_COUNT: usize = 12;

pub const CHANNELS: RegisterBlock =
    RegisterBlock::new(DMA_BASE, 0x40, CHANNEL_COUNT, 0x40);

pub const READ_ADDR: u32 = 0x00;
pub const WRITE_ADDR: u32 = 0x04;
pub const TRANS_COUNT: u32 = 0x08;
/// Control register. Writing it triggers the channel when EN is set.
pub const CTRL_TRIG: u32 = 0x0c;
/// Alias of the control register that never triggers.
pub const AL1_CTRL: u32 = 0x10;

// Device-wide registers, relative to `DMA_BASE`.
pub const INTR: u32 = 0x400;
pub const MULTI_CHAN_TRIGGER: u32 = 0x430;
pub const SNIFF_CTRL: u32 = 0x434;
pub const FIFO_LEVELS: u32 = 0x440;
/// Write a channel mask to abort; bits read back set until the abort has completed.
pub const CHAN_ABORT: u32 = 0x444;
pub const CHAN_ABORT_ADDRESS: u32 = DMA_BASE + CHAN_ABORT;

pub const AHB_ERROR: Field = Field::new(CTRL_TRIG, 31, 1);
pub const READ_ERROR: Field = Field::new(CTRL_TRIG, 30, 1);
pub const WRITE_ERROR: Field = Field::new(CTRL_TRIG, 29, 1);
pub const BUSY: Field = Field::new(CTRL_TRIG, 24, 1);
pub const SNIFF_EN: Field = Field::new(CTRL_TRIG, 23, 1);
pub const BSWAP: Field = Field::new(CTRL_TRIG, 22, 1);
pub const IRQ_QUIET: Field = Field::new(CTRL_TRIG, 21, 1);
pub const TREQ_SEL: Field = Field::new(CTRL_TRIG, 15, 6);
pub const CHAIN_TO: Field = Field::new(CTRL_TRIG, 11, 4);
pub const RING_SEL: Field = Field::new(CTRL_TRIG, 10, 1);
pub const RING_SIZE: Field = Field::new(CTRL_TRIG, 6, 4);
pub const INCR_WRITE: Field = Field::new(CTRL_TRIG, 5, 1);
pub const INCR_READ: Field = Field::new(CTRL_TRIG, 4, 1);
pub const DATA_SIZE: Field = Field::new(CTRL_TRIG, 2, 2);
pub const HIGH_PRIORITY: Field = Field::new(CTRL_TRIG, 1, 1);
pub const EN: Field = Field::new(CTRL_TRIG, 0, 1);

// Transfer request (dreq) numbers.
pub const DREQ_PIO0_TX0: u8 = 0;
pub const DREQ_PIO0_RX0: u8 = 4;
pub const DREQ_PIO1_TX0: u8 = 8;
pub const DREQ_PIO1_RX0: u8 = 12;
pub const DREQ_SPI0_TX: u8 = 16;
pub const DREQ_SPI0_RX: u8 = 17;
pub const DREQ_SPI1_TX: u8 = 18;
pub const DREQ_SPI1_RX: u8 = 19;
pub const DREQ_UART0_TX: u8 = 20;
pub const DREQ_UART0_RX: u8 = 21;
pub const DREQ_UART1_TX: u8 = 22;
pub const DREQ_UART1_RX: u8 = 23;
/// Wrap of PWM slice 0; slice `n` is `DREQ_PWM_WRAP0 + n`.
pub const DREQ_PWM_WRAP0: u8 = 24;
pub const DREQ_I2C0_TX: u8 = 32;
pub const DREQ_I2C0_RX: u8 = 33;
pub const DREQ_I2C1_TX: u8 = 34;
pub const DREQ_I2C1_RX: u8 = 35;
pub const DREQ_ADC: u8 = 36;
/// Unpaced: transfer as fast as possible.
pub const TREQ_PERMANENT: u8 = 0x3f;

#[bitenum(u2, exhaustive = false)]
#[derive(Debug, PartialEq)]
pub enum DataSize {
    Byte = 0,
    HalfWord = 1,
    Word = 2,
}

impl DataSize {
    pub const fn bytes(&self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::HalfWord => 2,
            Self::Word => 4,
        }
    }
}

#[bitfield(u32, default = 0)]
#[derive(Debug, PartialEq)]
pub struct Ctrl {
    #[bit(31, r)]
    pub ahb_error: bool,
    #[bit(30, rw)]
    pub read_error: bool,
    #[bit(29, rw)]
    pub write_error: bool,
    #[bit(24, r)]
    pub busy: bool,
    #[bit(23, rw)]
    pub sniff_en: bool,
    #[bit(22, rw)]
    pub bswap: bool,
    #[bit(21, rw)]
    pub irq_quiet: bool,
    #[bits(15..=20, rw)]
    pub treq_sel: u6,
    #[bits(11..=14, rw)]
    pub chain_to: u4,
    #[bit(10, rw)]
    pub ring_sel: bool,
    #[bits(6..=9, rw)]
    pub ring_size: u4,
    #[bit(5, rw)]
    pub incr_write: bool,
    #[bit(4, rw)]
    pub incr_read: bool,
    #[bits(2..=3, rw)]
    pub data_size: Option<DataSize>,
    #[bit(1, rw)]
    pub high_priority: bool,
    #[bit(0, rw)]
    pub en: bool,
}
