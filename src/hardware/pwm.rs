//! PWM slice as an output generator, gate timer or edge counter
//!
//! # Design
//! Each of the eight PWM slices has a 16 bit counter that advances either on its fractional clock
//! divider or on edges of the slice's B input pin. When the counter passes its wrap (TOP) value it
//! returns to zero and raises the slice's wrap dreq, which a DMA channel can use as its transfer
//! request. This lets the slice pace DMA transfers without CPU involvement.
//!
//! GPIO pairs share a slice: the even pin is channel A, the odd pin channel B. Only the B pin can
//! clock the counter, so edge counting requires an odd pin.
use arbitrary_int::u4;
use fugit::{HertzU32, MicrosDurationU32};

use super::{
    gpio,
    regs::{
        dma::DREQ_PWM_WRAP0,
        io_bank::Function,
        pads,
        pwm::{self, Channel, Cc, Csr, Div, DivMode, CC, CSR, CTR, DIV, TOP},
        Bus, Registers,
    },
    Error,
};

/// The input edge that advances an edge counter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl From<Edge> for DivMode {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Rising => DivMode::BRising,
            Edge::Falling => DivMode::BFalling,
        }
    }
}

/// Start or stop several slices on the same clock cycle.
///
/// # Args
/// * `mask` - Bit `n` selects slice `n`.
/// * `enable` - Whether the selected slices should run.
pub fn set_enables<B: Bus>(bus: &B, mask: u8, enable: bool) {
    let en = bus.read(pwm::EN_ADDRESS);
    let en = if enable {
        en | mask as u32
    } else {
        en & !(mask as u32)
    };
    bus.write(pwm::EN_ADDRESS, en);
}

/// One PWM slice, bound to a pin.
pub struct Pwm<'a, B> {
    regs: Registers<'a, B>,
    pin: u8,
    slice: u8,
    clock: HertzU32,
}

impl<B> core::fmt::Debug for Pwm<'_, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pwm")
            .field("pin", &self.pin)
            .field("slice", &self.slice)
            .finish()
    }
}

impl<'a, B: Bus> Pwm<'a, B> {
    /// Take the slice of `pin` and reset it: stopped, counter zero, divisor 1, wrap 0xffff.
    ///
    /// # Args
    /// * `bus` - Register access.
    /// * `pin` - GPIO the slice is bound to.
    /// * `clock` - The system clock feeding the slice divider.
    ///
    /// # Panics
    /// If `pin` is not a user GPIO.
    pub fn new(bus: &'a B, pin: u8, clock: HertzU32) -> Self {
        assert!((pin as usize) < pads::PIN_COUNT, "GPIO{pin} does not exist");
        let slice = pwm::slice_of(pin);
        let regs = pwm::SLICES.at(bus, slice);
        for offset in [CSR, DIV, CTR, CC, TOP] {
            regs.write(offset, 0);
        }
        let mut pwm = Self {
            regs,
            pin,
            slice: slice as u8,
            clock,
        };
        pwm.set_divisor(1, u4::new(0));
        pwm.set_wrap(0xffff);
        pwm
    }

    /// Generate a free-running PWM signal on the bound pin.
    ///
    /// # Args
    /// * `divisor` - Integer part of the clock divisor.
    /// * `wrap` - Counter wrap value. The period is `wrap + 1` divided clock cycles.
    /// * `level` - Compare level. The output is high while the counter is below it.
    pub fn configure_output(&mut self, divisor: u8, wrap: u16, level: u16) {
        gpio::set_function(self.regs.bus(), self.pin, Function::Pwm);
        self.configure_timer(divisor, wrap, level, false);
        self.set_enabled(true);
    }

    /// Configure a free-running timer without routing or starting it.
    ///
    /// In phase-correct mode the counter runs up and back down, doubling the period.
    pub fn configure_timer(
        &mut self,
        divisor: u8,
        wrap: u16,
        level: u16,
        phase_correct: bool,
    ) {
        self.set_divmode(DivMode::FreeRunning);
        self.set_divisor(divisor, u4::new(0));
        self.set_wrap(wrap);
        self.set_channel_level(self.channel(), level);
        self.set_phase_correct(phase_correct);
    }

    /// Count edges on the bound pin, one count per edge.
    ///
    /// The slice is not started. The counter wraps at the configured wrap value.
    ///
    /// # Errors
    /// [`Error::NotChannelB`] if the pin is even. The slice is left unchanged.
    pub fn configure_edge_counter(&mut self, edge: Edge) -> Result<(), Error> {
        if self.channel() != Channel::B {
            log::error!("Edge counting needs an odd GPIO, not GPIO{}", self.pin);
            return Err(Error::NotChannelB(self.pin));
        }
        gpio::set_function(self.regs.bus(), self.pin, Function::Pwm);
        self.set_divmode(edge.into());
        self.set_divisor(1, u4::new(0));
        Ok(())
    }

    /// Start or stop counting.
    ///
    /// Starting clears the counter first so that only edges inside the window are counted.
    /// Stopping keeps the count readable.
    pub fn enable(&mut self, enable: bool) {
        if enable {
            self.reset_count();
        }
        self.set_enabled(enable);
    }

    /// The raw 16 bit count.
    pub fn read_count(&self) -> u16 {
        self.regs.get(pwm::CTR_VALUE) as u16
    }

    /// Clear the counter.
    ///
    /// # Note
    /// Only race-free while the slice is stopped or about to be started.
    pub fn reset_count(&mut self) {
        self.set_counter(0);
    }

    pub fn set_counter(&mut self, value: u16) {
        self.regs.write(CTR, value as u32);
    }

    pub fn set_enabled(&mut self, enable: bool) {
        self.regs.set(pwm::CSR_EN, enable as u32);
    }

    pub fn set_divisor(&mut self, int: u8, frac: u4) {
        let div = Div::new_with_raw_value(0).with_int(int).with_frac(frac);
        self.regs.write(DIV, div.raw_value());
    }

    pub fn set_divmode(&mut self, mode: DivMode) {
        let csr = self.csr().with_divmode(mode);
        self.regs.write(CSR, csr.raw_value());
    }

    pub fn set_phase_correct(&mut self, phase_correct: bool) {
        self.regs.set(pwm::CSR_PH_CORRECT, phase_correct as u32);
    }

    pub fn set_wrap(&mut self, wrap: u16) {
        self.regs.write(TOP, wrap as u32);
    }

    pub fn wrap(&self) -> u16 {
        self.regs.get(pwm::TOP_VALUE) as u16
    }

    pub fn set_channel_level(&mut self, channel: Channel, level: u16) {
        let cc = Cc::new_with_raw_value(self.regs.read(CC));
        let cc = match channel {
            Channel::A => cc.with_a(level),
            Channel::B => cc.with_b(level),
        };
        self.regs.write(CC, cc.raw_value());
    }

    pub fn csr(&self) -> Csr {
        Csr::new_with_raw_value(self.regs.read(CSR))
    }

    pub fn divisor(&self) -> Div {
        Div::new_with_raw_value(self.regs.read(DIV))
    }

    /// Divided clock cycles per wrap while free running.
    fn cycles(&self) -> u32 {
        (self.wrap() as u32 + 1) * if self.csr().ph_correct() { 2 } else { 1 }
    }

    /// Rate of wrap events while free running, derived from the current register state.
    pub fn output_frequency(&self) -> f32 {
        self.clock.raw() as f32 * 16.0
            / self.divisor().sixteenths() as f32
            / self.cycles() as f32
    }

    /// Time between wrap events while free running, truncated to microseconds.
    pub fn period(&self) -> MicrosDurationU32 {
        let sixteenths = self.cycles() as u64 * self.divisor().sixteenths() as u64;
        let us = sixteenths * 1_000_000 / (16 * self.clock.raw() as u64);
        MicrosDurationU32::from_ticks(us as u32)
    }

    /// The dreq raised when this slice wraps.
    pub fn dreq(&self) -> u8 {
        DREQ_PWM_WRAP0 + self.slice
    }

    /// Address of the control and status register, as a DMA destination.
    pub fn csr_address(&self) -> u32 {
        self.regs.address(CSR)
    }

    /// Bit of this slice in the shared enable register.
    pub fn mask(&self) -> u8 {
        1 << self.slice
    }

    pub fn slice(&self) -> u8 {
        self.slice
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn channel(&self) -> Channel {
        pwm::channel_of(self.pin)
    }

    pub fn bus(&self) -> &'a B {
        self.regs.bus()
    }

    pub fn log_registers(&self) {
        log::debug!(
            "PWM{} CSR {:08X}, DIV {:08X}, CTR {:08X}, CC {:08X}, TOP {:08X}",
            self.slice,
            self.regs.read(CSR),
            self.regs.read(DIV),
            self.regs.read(CTR),
            self.regs.read(CC),
            self.regs.read(TOP),
        );
    }
}
