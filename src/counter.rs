//! Pulse counter extended to 32 bits by a DMA channel
//!
//! # Design
//! The PWM slice counter is only 16 bits wide. With its wrap value at zero the slice wraps on
//! every counted edge, and each wrap raises a dreq that makes the DMA channel perform one
//! (meaningless) byte transfer from a scratch word onto itself. The channel's transfer count,
//! loaded with its maximum on `start()`, therefore decrements once per edge and the number of
//! edges since `start()` is the distance from that maximum.
//!
//! No CPU involvement is needed while counting, so no edge can be lost between software reads.
use crate::hardware::{
    design_parameters::TRANS_COUNT_MAX,
    regs::{dma::DataSize, Bus},
    Dma, DmaBuffer, Error, Pwm,
};

/// An edge counter paired with a DMA channel tallying its wraps.
pub struct ExtendedCounter<'a, B> {
    counter: Pwm<'a, B>,
    dma: Dma<'a, B>,
    _scratch: DmaBuffer<'a>,
    started: bool,
}

impl<'a, B: Bus> ExtendedCounter<'a, B> {
    /// Construct the extended counter.
    ///
    /// # Args
    /// * `counter` - A slice configured as an edge counter, see
    ///   [`Pwm::configure_edge_counter`]. It is left running with a wrap value of zero.
    /// * `dma` - The channel used as the tally.
    /// * `scratch` - Source and destination of the tally transfers.
    pub fn new(
        mut counter: Pwm<'a, B>,
        mut dma: Dma<'a, B>,
        scratch: &'a mut u32,
    ) -> Self {
        counter.set_enabled(false);
        counter.set_wrap(0);
        counter.reset_count();

        let scratch = DmaBuffer::word(scratch);
        let address = scratch.address(counter.bus());
        dma.configure(DataSize::Byte, false, false, counter.dreq());
        dma.set_source(address, false);
        dma.set_destination(address, false);

        counter.set_enabled(true);
        log::info!(
            "Extended counter on GPIO{} using DMA channel {}",
            counter.pin(),
            dma.channel()
        );

        Self {
            counter,
            dma,
            _scratch: scratch,
            started: false,
        }
    }

    /// Restart the count from zero.
    ///
    /// # Errors
    /// [`Error::AbortTimeout`] if the previous session cannot be stopped.
    pub fn start(&mut self) -> Result<(), Error> {
        self.dma.abort()?;
        self.dma.set_count(TRANS_COUNT_MAX, true);
        self.started = true;
        Ok(())
    }

    /// Edges counted since `start()`. Zero before the first `start()`.
    pub fn read(&self) -> u32 {
        if !self.started {
            // The channel count is left over from reset or a previous owner.
            return 0;
        }
        TRANS_COUNT_MAX - self.dma.remaining_count()
    }

    /// Freeze the count. The counter slice keeps running.
    pub fn stop(&mut self) {
        self.dma.set_enabled(false);
    }

    /// Release the counter slice and DMA channel.
    pub fn free(self) -> (Pwm<'a, B>, Dma<'a, B>) {
        (self.counter, self.dma)
    }
}
