use fugit::HertzU32;

/// The system clock feeding the PWM slice dividers.
pub const SYSTEM_CLOCK: HertzU32 = HertzU32::MHz(125);

/// The tick rate of the free-running TIMER counter used for timestamping.
pub const TIMER_FREQUENCY: HertzU32 = HertzU32::MHz(1);

/// The largest DMA transfer count. Loaded as a decrementing tally when the DMA channel counts
/// events rather than moving data.
pub const TRANS_COUNT_MAX: u32 = u32::MAX;

/// Number of times the abort status is polled before a DMA channel is declared unresponsive.
// At 125 MHz this is on the order of a few milliseconds. An abort normally completes within a
// handful of bus cycles.
pub const ABORT_SPIN_LIMIT: u32 = 100_000;
