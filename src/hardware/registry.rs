//! Ownership table for PWM slices and DMA channels.
use fugit::HertzU32;

use super::{
    regs::{dma::CHANNEL_COUNT, pwm::slice_of, Bus},
    Dma, Error, Pwm,
};

/// Hands out each PWM slice and DMA channel to at most one owner at a time.
#[derive(Debug)]
pub struct Registry {
    dma: u16,
    slices: u8,
    abort_limit: u32,
}

impl Registry {
    /// # Args
    /// * `abort_limit` - Spin limit for DMA aborts of the channels handed out.
    pub const fn new(abort_limit: u32) -> Self {
        Self {
            dma: 0,
            slices: 0,
            abort_limit,
        }
    }

    /// Claim the lowest free DMA channel, reset and idle.
    ///
    /// # Errors
    /// [`Error::DmaExhausted`] if all channels are claimed, or [`Error::AbortTimeout`] if the
    /// channel cannot be stopped. In both cases nothing is claimed.
    pub fn dma<'a, B: Bus>(&mut self, bus: &'a B) -> Result<Dma<'a, B>, Error> {
        let channel = (0..CHANNEL_COUNT as u8)
            .find(|c| self.dma & (1 << c) == 0)
            .ok_or(Error::DmaExhausted)?;
        let dma = Dma::new(bus, channel, self.abort_limit)?;
        self.dma |= 1 << channel;
        log::debug!("Claimed DMA channel {channel}");
        Ok(dma)
    }

    /// Return a DMA channel after aborting it.
    ///
    /// # Errors
    /// [`Error::AbortTimeout`] if the channel does not stop. It then stays claimed.
    pub fn release_dma<B: Bus>(&mut self, mut dma: Dma<'_, B>) -> Result<(), Error> {
        dma.abort()?;
        self.dma &= !(1 << dma.channel());
        Ok(())
    }

    /// Claim the PWM slice of `pin`.
    ///
    /// # Errors
    /// [`Error::SliceBusy`] if the slice, possibly through the other pin of its pair, is owned.
    pub fn pwm<'a, B: Bus>(
        &mut self,
        bus: &'a B,
        pin: u8,
        clock: HertzU32,
    ) -> Result<Pwm<'a, B>, Error> {
        let slice = slice_of(pin) as u8;
        if self.slices & (1 << slice) != 0 {
            return Err(Error::SliceBusy(slice));
        }
        let pwm = Pwm::new(bus, pin, clock);
        self.slices |= 1 << slice;
        Ok(pwm)
    }

    /// Return a PWM slice, stopping it.
    pub fn release_pwm<B: Bus>(&mut self, mut pwm: Pwm<'_, B>) {
        pwm.set_enabled(false);
        self.slices &= !pwm.mask();
    }
}
