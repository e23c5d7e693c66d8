//! Reciprocal frequency measurement from input edge timestamps
//!
//! # Design
//! The input slice counts edges with a wrap value of zero, so every counted edge raises its wrap
//! dreq. Each dreq makes the DMA channel copy the free-running 1 MHz TIMER low word into the next
//! slot of a caller-owned buffer. The buffer therefore fills with the arrival times of successive
//! edges, from which the input period, and hence its frequency, follows without any gate.
//!
//! At low input frequencies this resolves far better than counting edges in a fixed gate.
use fugit::HertzU32;

use crate::hardware::{
    design_parameters::TIMER_FREQUENCY,
    regs::{dma::DataSize, timer::TIMERAWL_ADDRESS, Bus},
    Dma, DmaBuffer, Edge, Error, Pwm,
};

/// Frequency from consecutive edge timestamps.
///
/// Timestamps may wrap around. Returns `None` with fewer than two timestamps or when no time
/// elapsed between them.
///
/// # Args
/// * `samples` - Timestamps in arrival order.
/// * `timer_rate` - Tick rate of the timestamp counter.
pub fn reciprocal_frequency(samples: &[u32], timer_rate: HertzU32) -> Option<f32> {
    let intervals = samples.len().checked_sub(1).filter(|&n| n > 0)?;
    let total: u64 = samples
        .windows(2)
        .map(|pair| pair[1].wrapping_sub(pair[0]) as u64)
        .sum();
    (total > 0).then(|| intervals as f32 * timer_rate.raw() as f32 / total as f32)
}

/// An edge counter timestamping each counted edge into a buffer.
pub struct ReciprocalTimer<'a, B> {
    counter: Pwm<'a, B>,
    dma: Dma<'a, B>,
    buffer: DmaBuffer<'a>,
    capacity: usize,
}

impl<'a, B: Bus> ReciprocalTimer<'a, B> {
    /// Construct the reciprocal timer.
    ///
    /// # Args
    /// * `counter` - Slice of the input pin.
    /// * `dma` - Channel copying timestamps.
    /// * `buffer` - Timestamp storage.
    /// * `edge` - The input edge that is timestamped.
    ///
    /// # Errors
    /// [`Error::NotChannelB`] if the counter pin is even. The peripherals are handed back
    /// unchanged.
    pub fn new(
        mut counter: Pwm<'a, B>,
        mut dma: Dma<'a, B>,
        buffer: &'a mut [u32],
        edge: Edge,
    ) -> Result<Self, (Error, Pwm<'a, B>, Dma<'a, B>)> {
        if let Err(error) = counter.configure_edge_counter(edge) {
            return Err((error, counter, dma));
        }
        counter.set_wrap(0);
        dma.configure(DataSize::Word, false, true, counter.dreq());
        dma.set_source(TIMERAWL_ADDRESS, false);
        log::info!(
            "Reciprocal timer on GPIO{} using DMA channel {}",
            counter.pin(),
            dma.channel()
        );
        Ok(Self {
            counter,
            dma,
            buffer: DmaBuffer::new(buffer),
            capacity: 0,
        })
    }

    /// Start timestamping the next `capacity` edges.
    ///
    /// # Errors
    /// [`Error::AbortTimeout`] if the previous session cannot be stopped.
    ///
    /// # Panics
    /// If `capacity` exceeds the buffer length.
    pub fn start(&mut self, capacity: usize) -> Result<(), Error> {
        assert!(
            capacity <= self.buffer.len(),
            "capacity {} exceeds buffer of {}",
            capacity,
            self.buffer.len()
        );
        self.counter.reset_count();
        self.dma.abort()?;
        self.capacity = capacity;
        self.dma
            .set_destination(self.buffer.address(self.counter.bus()), false);
        self.dma.set_count(capacity as u32, true);
        self.counter.set_enabled(true);
        Ok(())
    }

    /// Stop timestamping. Timestamps taken so far stay available.
    pub fn stop(&mut self) {
        self.counter.set_enabled(false);
    }

    /// The timestamps taken since `start()`, in arrival order. Empty before the first `start()`.
    ///
    /// # Note
    /// While running, a timestamp may be in flight. The returned prefix only covers completed
    /// transfers.
    pub fn samples(&self) -> &[u32] {
        // The channel may still hold a count from its previous owner.
        let taken = self
            .capacity
            .saturating_sub(self.dma.remaining_count() as usize);
        self.buffer.prefix(taken)
    }

    /// Input frequency in Hz from the timestamps taken so far.
    pub fn frequency(&self) -> Option<f32> {
        reciprocal_frequency(self.samples(), TIMER_FREQUENCY)
    }

    /// Release the counter slice and DMA channel.
    pub fn free(self) -> (Pwm<'a, B>, Dma<'a, B>) {
        (self.counter, self.dma)
    }
}
