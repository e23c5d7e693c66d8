//! DMA channel paced by peripheral transfer requests
//!
//! # Design
//! A channel moves one data item per satisfied transfer request (dreq) and decrements its transfer
//! count. When the count reaches zero the channel goes idle, or triggers its chain target if that
//! is a different channel. The measurement protocols use the channel less as a data mover than as
//! a hardware event handler: each peripheral event performs exactly one register or memory write
//! without CPU involvement, and the transfer count doubles as an event tally.
//!
//! Configuration writes go through the non-triggering control alias. Only the `arm` path writes
//! the triggering control register, so a channel is never started with partial configuration.
use core::{
    marker::PhantomData,
    ptr::NonNull,
    sync::atomic::{compiler_fence, Ordering},
};

use arbitrary_int::{u4, u6};

use super::{
    regs::{
        dma::{
            self, Ctrl, DataSize, AL1_CTRL, CHAN_ABORT_ADDRESS, CTRL_TRIG,
            READ_ADDR, TRANS_COUNT, WRITE_ADDR,
        },
        Bus, Registers,
    },
    Error,
};

/// Caller-owned memory that a DMA channel reads or writes.
///
/// The buffer is borrowed for as long as the DMA channel may access it. All CPU access goes
/// through volatile loads and stores.
pub struct DmaBuffer<'a> {
    ptr: NonNull<u32>,
    len: usize,
    _buffer: PhantomData<&'a mut [u32]>,
}

impl<'a> DmaBuffer<'a> {
    pub fn new(buffer: &'a mut [u32]) -> Self {
        Self {
            // Note(unsafe): A slice pointer is never null.
            ptr: unsafe { NonNull::new_unchecked(buffer.as_mut_ptr()) },
            len: buffer.len(),
            _buffer: PhantomData,
        }
    }

    /// A single word, e.g. a DMA source or sink whose content does not matter.
    pub fn word(word: &'a mut u32) -> Self {
        Self::new(core::slice::from_mut(word))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bus address of the first word.
    pub fn address<B: Bus>(&self, bus: &B) -> u32 {
        bus.dma_address(self.ptr.as_ptr() as *const u8)
    }

    pub fn get(&self, index: usize) -> u32 {
        assert!(index < self.len);
        compiler_fence(Ordering::SeqCst);
        // Note(unsafe): The index is in bounds of the borrowed buffer.
        unsafe { self.ptr.as_ptr().add(index).read_volatile() }
    }

    pub fn set(&mut self, index: usize, value: u32) {
        assert!(index < self.len);
        // Note(unsafe): The index is in bounds of the borrowed buffer.
        unsafe { self.ptr.as_ptr().add(index).write_volatile(value) };
        compiler_fence(Ordering::SeqCst);
    }

    /// The first `len` words.
    ///
    /// # Note
    /// The contents are only stable while no DMA channel is writing the buffer.
    pub fn prefix(&self, len: usize) -> &[u32] {
        assert!(len <= self.len);
        compiler_fence(Ordering::SeqCst);
        // Note(unsafe): The range is in bounds of the borrowed buffer, which outlives `self`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), len) }
    }
}

/// One DMA channel.
pub struct Dma<'a, B> {
    regs: Registers<'a, B>,
    channel: u8,
    abort_limit: u32,
}

impl<B> core::fmt::Debug for Dma<'_, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dma").field("channel", &self.channel).finish()
    }
}

impl<'a, B: Bus> Dma<'a, B> {
    /// Take a channel and reset it: idle, addresses and count zero, no chaining.
    ///
    /// # Panics
    /// If `channel` does not exist.
    pub(crate) fn new(
        bus: &'a B,
        channel: u8,
        abort_limit: u32,
    ) -> Result<Self, Error> {
        let regs = dma::CHANNELS.at(bus, channel as usize);
        let mut dma = Self {
            regs,
            channel,
            abort_limit,
        };
        dma.abort()?;
        dma.regs.write(READ_ADDR, 0);
        dma.regs.write(WRITE_ADDR, 0);
        dma.regs.write(TRANS_COUNT, 0);
        // Chaining to itself disables chaining.
        dma.write_ctrl(Ctrl::new_with_raw_value(0).with_chain_to(u4::new(channel)));
        Ok(dma)
    }

    /// Set the transfer shape and pacing. The channel is left disabled.
    ///
    /// # Args
    /// * `size` - Width of each transfer.
    /// * `increment_read` - Advance the source address after each transfer.
    /// * `increment_write` - Advance the destination address after each transfer.
    /// * `dreq` - The transfer request that paces the channel.
    pub fn configure(
        &mut self,
        size: DataSize,
        increment_read: bool,
        increment_write: bool,
        dreq: u8,
    ) {
        let ctrl = self
            .ctrl()
            .with_data_size(size)
            .with_incr_read(increment_read)
            .with_incr_write(increment_write)
            .with_treq_sel(u6::new(dreq))
            .with_en(false);
        self.write_ctrl(ctrl);
    }

    /// Set the source address, optionally starting the channel.
    pub fn set_source(&mut self, address: u32, arm: bool) {
        self.regs.write(READ_ADDR, address);
        if arm {
            self.arm();
        }
    }

    /// Set the destination address, optionally starting the channel.
    pub fn set_destination(&mut self, address: u32, arm: bool) {
        self.regs.write(WRITE_ADDR, address);
        if arm {
            self.arm();
        }
    }

    /// Set the number of transfers, optionally starting the channel.
    pub fn set_count(&mut self, count: u32, arm: bool) {
        self.regs.write(TRANS_COUNT, count);
        if arm {
            self.arm();
        }
    }

    /// Enable and trigger the channel.
    fn arm(&mut self) {
        let ctrl = Self::keep_errors(self.ctrl().with_en(true));
        self.regs.write(CTRL_TRIG, ctrl.raw_value());
    }

    /// Suspend or resume without touching configuration or the remaining count.
    pub fn set_enabled(&mut self, enable: bool) {
        let ctrl = self.ctrl().with_en(enable);
        self.write_ctrl(ctrl);
    }

    /// Cancel any transfer in flight and wait until the channel has stopped.
    ///
    /// Aborting an idle channel has no effect.
    ///
    /// # Errors
    /// [`Error::AbortTimeout`] if the hardware does not confirm within the spin limit.
    pub fn abort(&mut self) -> Result<(), Error> {
        // RP2040-E13: a paced channel must be disabled before it is aborted.
        self.set_enabled(false);

        let bus = self.regs.bus();
        let mask = 1 << self.channel;
        bus.write(CHAN_ABORT_ADDRESS, mask);
        for _ in 0..self.abort_limit {
            if bus.read(CHAN_ABORT_ADDRESS) & mask == 0 {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        log::warn!("DMA channel {} did not stop", self.channel);
        Err(Error::AbortTimeout(self.channel))
    }

    /// Transfers outstanding before the channel goes idle.
    pub fn remaining_count(&self) -> u32 {
        self.regs.read(TRANS_COUNT)
    }

    pub fn is_busy(&self) -> bool {
        self.regs.get(dma::BUSY) != 0
    }

    /// Trigger `channel` when this channel completes. Chaining to itself disables chaining.
    pub fn set_chain_to(&mut self, channel: u8) {
        let ctrl = self.ctrl().with_chain_to(u4::new(channel));
        self.write_ctrl(ctrl);
    }

    pub fn set_high_priority(&mut self, high: bool) {
        let ctrl = self.ctrl().with_high_priority(high);
        self.write_ctrl(ctrl);
    }

    pub fn ctrl(&self) -> Ctrl {
        Ctrl::new_with_raw_value(self.regs.read(AL1_CTRL))
    }

    fn write_ctrl(&mut self, ctrl: Ctrl) {
        self.regs.write(AL1_CTRL, Self::keep_errors(ctrl).raw_value());
    }

    /// The error flags are write-1-to-clear. Writing back a read value must not clear them.
    fn keep_errors(ctrl: Ctrl) -> Ctrl {
        ctrl.with_read_error(false).with_write_error(false)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn bus(&self) -> &'a B {
        self.regs.bus()
    }

    pub fn log_registers(&self) {
        log::debug!(
            "DMA{} READ_ADDR {:08X}, WRITE_ADDR {:08X}, TRANS_COUNT {:08X}, CTRL {:08X}",
            self.channel,
            self.regs.read(READ_ADDR),
            self.regs.read(WRITE_ADDR),
            self.regs.read(TRANS_COUNT),
            self.regs.read(AL1_CTRL),
        );
    }
}
