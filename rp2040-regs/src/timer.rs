//! TIMER: the free-running 64 bit microsecond counter (datasheet 4.6).

pub const TIMER_BASE: u32 = 0x4005_4000;

/// Upper half of the raw counter, no latching.
pub const TIMERAWH: u32 = 0x24;
/// Lower half of the raw counter, no latching.
pub const TIMERAWL: u32 = 0x28;

/// Address of the low 32 bits of the microsecond counter, usable as a DMA source.
pub const TIMERAWL_ADDRESS: u32 = TIMER_BASE + TIMERAWL;
