//! Frequency measurement by counting edges in a hardware-timed gate
//!
//! # Design
//! Two PWM slices and a DMA channel cooperate:
//! * The signal counter counts input edges.
//! * The gate timer is a phase-correct free-running slice whose period is the gate duration.
//! * The DMA channel is paced by the gate timer wrap and armed for a single word transfer. That
//!   transfer copies a prepared control word, identical to the counter's but with the enable bit
//!   cleared, into the counter's CSR.
//!
//! Both slices are started by one write to the shared enable register, so the gate opens on the
//! same clock cycle the counter starts and closes exactly one gate period later, independent of
//! CPU latency.
use fugit::MicrosDurationU32;

use crate::hardware::{
    pwm::{self, Edge},
    regs::{dma::DataSize, Bus},
    Dma, DmaBuffer, Error, Pwm,
};

/// Gate timer register values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GateTimer {
    pub divisor: u8,
    pub wrap: u16,
    pub level: u16,
}

impl GateTimer {
    /// Timer for a gate of `ticks` prescaled clock cycles.
    ///
    /// The timer runs phase-correct, so the wrap value is half the gate length.
    ///
    /// # Panics
    /// If `ticks` is odd, zero or exceeds 2^17.
    pub fn new(prescale: u8, ticks: u32) -> Self {
        assert!(ticks > 0 && ticks % 2 == 0 && ticks <= 1 << 17);
        Self {
            divisor: prescale,
            wrap: (ticks / 2 - 1) as u16,
            level: (ticks / 4) as u16,
        }
    }
}

/// A signal counter stopped by DMA at the end of a gate period.
pub struct GatedFrequency<'a, B> {
    counter: Pwm<'a, B>,
    gate: Pwm<'a, B>,
    dma: Dma<'a, B>,
    _scratch: DmaBuffer<'a>,
}

impl<'a, B: Bus> GatedFrequency<'a, B> {
    /// Construct the gated frequency counter.
    ///
    /// # Args
    /// * `counter` - Slice of the input pin.
    /// * `gate` - Slice used as gate timer. Its pin is not routed.
    /// * `dma` - Channel stopping the counter.
    /// * `scratch` - Holds the control word written at the end of the gate.
    /// * `timer` - Gate timer configuration.
    /// * `edge` - The input edge that is counted.
    ///
    /// # Errors
    /// [`Error::NotChannelB`] if the counter pin is even. The peripherals are handed back
    /// unchanged.
    #[allow(clippy::type_complexity)]
    pub fn new(
        mut counter: Pwm<'a, B>,
        mut gate: Pwm<'a, B>,
        mut dma: Dma<'a, B>,
        scratch: &'a mut u32,
        timer: GateTimer,
        edge: Edge,
    ) -> Result<Self, (Error, Pwm<'a, B>, Pwm<'a, B>, Dma<'a, B>)> {
        if let Err(error) = counter.configure_edge_counter(edge) {
            return Err((error, counter, gate, dma));
        }
        counter.set_enabled(false);
        // A slice taken over from another protocol may wrap early.
        counter.set_wrap(0xffff);
        counter.reset_count();
        gate.configure_timer(timer.divisor, timer.wrap, timer.level, true);

        let mut scratch = DmaBuffer::word(scratch);
        scratch.set(0, counter.csr().with_en(false).raw_value());
        dma.configure(DataSize::Word, false, false, gate.dreq());
        dma.set_source(scratch.address(counter.bus()), false);
        dma.set_destination(counter.csr_address(), false);

        let gated = Self {
            counter,
            gate,
            dma,
            _scratch: scratch,
        };
        log::info!(
            "Gated counter on GPIO{}, gate {} us",
            gated.counter.pin(),
            gated.gate_duration().to_micros()
        );
        Ok(gated)
    }

    /// Open the gate and start counting. A gate still open is restarted.
    ///
    /// # Errors
    /// [`Error::AbortTimeout`] if the pending gate end cannot be cancelled.
    pub fn start(&mut self) -> Result<(), Error> {
        self.dma.abort()?;
        pwm::set_enables(
            self.counter.bus(),
            self.counter.mask() | self.gate.mask(),
            false,
        );
        self.counter.reset_count();
        self.gate.reset_count();
        self.dma.set_count(1, true);
        pwm::set_enables(
            self.counter.bus(),
            self.counter.mask() | self.gate.mask(),
            true,
        );
        Ok(())
    }

    /// The edges counted so far. Final once the gate has closed.
    pub fn read(&self) -> u16 {
        self.counter.read_count()
    }

    /// Whether the gate has closed.
    ///
    /// Only meaningful after `start()`.
    pub fn is_complete(&self) -> bool {
        self.dma.remaining_count() == 0
    }

    /// The gate length given by the gate timer configuration.
    pub fn gate_duration(&self) -> MicrosDurationU32 {
        self.gate.period()
    }

    /// Input frequency in Hz from a completed gate.
    pub fn frequency(&self) -> f32 {
        self.read() as f32 * self.gate.output_frequency()
    }

    /// Stop the gate timer and cancel a pending gate end.
    ///
    /// # Errors
    /// [`Error::AbortTimeout`] if the DMA channel does not stop.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.gate.set_enabled(false);
        self.dma.abort()
    }

    /// Release the counter slice, gate slice and DMA channel.
    pub fn free(self) -> (Pwm<'a, B>, Pwm<'a, B>, Dma<'a, B>) {
        (self.counter, self.gate, self.dma)
    }
}
