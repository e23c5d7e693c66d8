//! Event-driven model of the RP2040 pads, IO bank, PWM, DMA and timer registers.
//!
//! Time advances in sixteenths of a system clock cycle so that fractional PWM dividers are exact.
//! Peripherals interact as on the chip: a slice wrap raises its dreq, a raised dreq performs one
//! transfer on every enabled busy channel paced by it, and DMA writes to peripheral addresses go
//! through the same register model as CPU writes.
use core::cell::RefCell;

use rp2040_regs::{
    dma::{self, DREQ_PWM_WRAP0, TREQ_PERMANENT},
    io_bank::{self, Function},
    pads::{self, Pad},
    pwm::{self, Cc, Csr, Div, DivMode},
    timer, Bus,
};

pub fn isclose(a: f32, b: f32, rtol: f32, atol: f32) -> bool {
    (a - b).abs() <= a.abs().max(b.abs()) * rtol + atol
}

/// System clock cycles per TIMER microsecond at 125 MHz.
const CYCLES_PER_US: u64 = 125;
const SUBCYCLES: u64 = 16;

/// Bus addresses handed out for host memory used as DMA source or destination.
const RAM_BASE: u32 = 0x2000_0000;
const RAM_WINDOW: u32 = 0x0010_0000;

#[derive(Copy, Clone, Default)]
struct Slice {
    csr: u32,
    div: u32,
    ctr: u32,
    cc: u32,
    top: u32,
    counting_down: bool,
    next_tick: u64,
}

impl Slice {
    fn csr(&self) -> Csr {
        Csr::new_with_raw_value(self.csr)
    }

    fn period(&self) -> u64 {
        Div::new_with_raw_value(self.div).sixteenths() as u64
    }
}

#[derive(Copy, Clone, Default)]
struct Channel {
    read_addr: u32,
    write_addr: u32,
    reload: u32,
    remaining: u32,
    ctrl: u32,
    busy: bool,
}

impl Channel {
    fn paced_by(&self, dreq: u8) -> bool {
        self.busy
            && dma::EN.extract(self.ctrl) != 0
            && dma::TREQ_SEL.extract(self.ctrl) == dreq as u32
    }
}

struct Source {
    pin: u8,
    half_period: u64,
    next: u64,
}

struct State {
    now: u64,
    timer_offset: u32,
    pads: [u32; pads::PIN_COUNT],
    gpio_ctrl: [u32; pads::PIN_COUNT],
    levels: [bool; pads::PIN_COUNT],
    slices: [Slice; pwm::SLICE_COUNT],
    channels: [Channel; dma::CHANNEL_COUNT],
    stalled_aborts: u32,
    wires: Vec<(u8, u8)>,
    sources: Vec<Source>,
    memory: Vec<*mut u8>,
}

pub struct Rp2040 {
    state: RefCell<State>,
}

impl Default for Rp2040 {
    fn default() -> Self {
        Self::new()
    }
}

impl Rp2040 {
    /// A chip in its reset state.
    pub fn new() -> Self {
        let slice = Slice {
            div: 0x10,
            top: 0xffff,
            ..Default::default()
        };
        Self {
            state: RefCell::new(State {
                now: 0,
                timer_offset: 0,
                pads: [0x56; pads::PIN_COUNT],
                gpio_ctrl: [0x1f; pads::PIN_COUNT],
                levels: [false; pads::PIN_COUNT],
                slices: [slice; pwm::SLICE_COUNT],
                channels: [Channel::default(); dma::CHANNEL_COUNT],
                stalled_aborts: 0,
                wires: Vec::new(),
                sources: Vec::new(),
                memory: Vec::new(),
            }),
        }
    }

    /// Feed the level of output `from` into input `to`.
    pub fn connect(&self, from: u8, to: u8) {
        let mut state = self.state.borrow_mut();
        state.wires.push((from, to));
        let level = state.levels[from as usize];
        state.set_level(to, level);
    }

    /// Drive `pin` with an external square wave of the given frequency.
    pub fn drive(&self, pin: u8, frequency: f64) {
        let mut state = self.state.borrow_mut();
        let half_period = (CYCLES_PER_US as f64 * 1e6 * SUBCYCLES as f64
            / (2. * frequency))
            .round() as u64;
        let next = state.now + half_period;
        state.sources.push(Source {
            pin,
            half_period,
            next,
        });
    }

    /// Apply `count` full pulses (rising then falling edge) to `pin`.
    pub fn pulse(&self, pin: u8, count: u32) {
        let mut state = self.state.borrow_mut();
        for _ in 0..count {
            state.set_level(pin, true);
            state.set_level(pin, false);
        }
    }

    /// Raise a transfer request.
    pub fn dreq(&self, dreq: u8) {
        self.state.borrow_mut().dreq(dreq);
    }

    /// Latch both bus error flags of `channel`.
    pub fn latch_dma_errors(&self, channel: u8) {
        let mut state = self.state.borrow_mut();
        let errors = dma::READ_ERROR.mask() | dma::WRITE_ERROR.mask();
        state.channels[channel as usize].ctrl |= errors;
    }

    /// Make aborts of `channel` never complete.
    pub fn stall_abort(&self, channel: u8) {
        self.state.borrow_mut().stalled_aborts |= 1 << channel;
    }

    /// Shift the TIMER so that it currently reads `us`.
    pub fn set_timer(&self, us: u32) {
        let mut state = self.state.borrow_mut();
        let elapsed = state.timer();
        state.timer_offset =
            state.timer_offset.wrapping_add(us.wrapping_sub(elapsed));
    }

    /// Advance time by `cycles` system clock cycles.
    pub fn run(&self, cycles: u64) {
        let mut state = self.state.borrow_mut();
        let until = state.now + cycles * SUBCYCLES;
        state.advance(until);
    }

    /// Advance time by `us` microseconds.
    pub fn run_us(&self, us: u64) {
        self.run(us * CYCLES_PER_US)
    }
}

impl Bus for Rp2040 {
    fn read(&self, address: u32) -> u32 {
        self.state.borrow().read(address)
    }

    fn write(&self, address: u32, value: u32) {
        self.state.borrow_mut().write(address, value)
    }

    fn dma_address(&self, ptr: *const u8) -> u32 {
        let mut state = self.state.borrow_mut();
        let ptr = ptr as *mut u8;
        for (i, base) in state.memory.iter().enumerate() {
            let offset = (ptr as usize).wrapping_sub(*base as usize);
            if offset < RAM_WINDOW as usize {
                return RAM_BASE + i as u32 * RAM_WINDOW + offset as u32;
            }
        }
        state.memory.push(ptr);
        RAM_BASE + (state.memory.len() as u32 - 1) * RAM_WINDOW
    }
}

impl State {
    fn timer(&self) -> u32 {
        ((self.now / SUBCYCLES / CYCLES_PER_US) as u32)
            .wrapping_add(self.timer_offset)
    }

    fn read(&self, address: u32) -> u32 {
        if let Some((pin, _)) = pads::PADS.decode(address) {
            return self.pads[pin];
        }
        if let Some((pin, offset)) = io_bank::GPIO.decode(address) {
            return match offset {
                io_bank::GPIO_STATUS => io_bank::INFROMPAD
                    .insert(0, self.levels[pin] as u32),
                io_bank::GPIO_CTRL => self.gpio_ctrl[pin],
                _ => 0,
            };
        }
        if let Some((index, offset)) = pwm::SLICES.decode(address) {
            let slice = &self.slices[index];
            return match offset {
                pwm::CSR => slice.csr,
                pwm::DIV => slice.div,
                pwm::CTR => slice.ctr,
                pwm::CC => slice.cc,
                pwm::TOP => slice.top,
                _ => 0,
            };
        }
        if address == pwm::EN_ADDRESS {
            return self
                .slices
                .iter()
                .enumerate()
                .map(|(i, s)| pwm::CSR_EN.extract(s.csr) << i)
                .sum();
        }
        if let Some((index, offset)) = dma::CHANNELS.decode(address) {
            let channel = &self.channels[index];
            return match offset {
                dma::READ_ADDR => channel.read_addr,
                dma::WRITE_ADDR => channel.write_addr,
                dma::TRANS_COUNT => channel.remaining,
                dma::CTRL_TRIG | dma::AL1_CTRL => {
                    dma::BUSY.insert(channel.ctrl, channel.busy as u32)
                }
                _ => 0,
            };
        }
        if address == dma::CHAN_ABORT_ADDRESS {
            return self.stalled_aborts;
        }
        if address == timer::TIMERAWL_ADDRESS {
            return self.timer();
        }
        if let Some(ptr) = self.ram(address) {
            // Note(unsafe): `ram()` only resolves addresses inside mapped host buffers.
            return unsafe { (ptr as *const u32).read_unaligned() };
        }
        0
    }

    fn write(&mut self, address: u32, value: u32) {
        if let Some((pin, _)) = pads::PADS.decode(address) {
            self.pads[pin] = value & 0xff;
        } else if let Some((pin, offset)) = io_bank::GPIO.decode(address) {
            if offset == io_bank::GPIO_CTRL {
                self.gpio_ctrl[pin] = value;
            }
        } else if let Some((index, offset)) = pwm::SLICES.decode(address) {
            if offset == pwm::CSR {
                self.set_csr(index, value);
                return;
            }
            let slice = &mut self.slices[index];
            match offset {
                pwm::DIV => slice.div = value & 0xfff,
                pwm::CTR => {
                    slice.ctr = value & 0xffff;
                    slice.counting_down = false;
                }
                pwm::CC => slice.cc = value,
                pwm::TOP => slice.top = value & 0xffff,
                _ => {}
            }
        } else if address == pwm::EN_ADDRESS {
            for index in 0..pwm::SLICE_COUNT {
                let csr = pwm::CSR_EN
                    .insert(self.slices[index].csr, (value >> index) & 1);
                self.set_csr(index, csr);
            }
        } else if let Some((index, offset)) = dma::CHANNELS.decode(address) {
            let channel = &mut self.channels[index];
            let errors = dma::READ_ERROR.mask() | dma::WRITE_ERROR.mask();
            let latched = channel.ctrl & errors & !value;
            let ctrl = (value & !(dma::BUSY.mask() | dma::AHB_ERROR.mask() | errors)) | latched;
            match offset {
                dma::READ_ADDR => channel.read_addr = value,
                dma::WRITE_ADDR => channel.write_addr = value,
                dma::TRANS_COUNT => channel.reload = value,
                dma::AL1_CTRL => channel.ctrl = ctrl,
                dma::CTRL_TRIG => channel.ctrl = ctrl,
                _ => {}
            }
            if offset == dma::CTRL_TRIG && dma::EN.extract(ctrl) != 0 {
                self.trigger(index);
            }
        } else if address == dma::CHAN_ABORT_ADDRESS {
            for (index, channel) in self.channels.iter_mut().enumerate() {
                if value & !self.stalled_aborts & (1 << index) != 0 {
                    channel.busy = false;
                }
            }
        } else if let Some(ptr) = self.ram(address) {
            // Note(unsafe): `ram()` only resolves addresses inside mapped host buffers.
            unsafe { (ptr as *mut u32).write_unaligned(value) };
        }
    }

    fn ram(&self, address: u32) -> Option<*mut u8> {
        let offset = address.checked_sub(RAM_BASE)?;
        let base = self.memory.get((offset / RAM_WINDOW) as usize)?;
        Some(base.wrapping_add((offset % RAM_WINDOW) as usize))
    }

    fn set_csr(&mut self, index: usize, value: u32) {
        let slice = &mut self.slices[index];
        let clocked = |csr: Csr| {
            csr.en() && matches!(csr.divmode(), DivMode::FreeRunning | DivMode::BHigh)
        };
        let was_enabled = slice.csr().en();
        let was_clocked = clocked(slice.csr());
        // The phase advance and retard strobes are not stored.
        slice.csr = value & 0x3f;
        if clocked(slice.csr()) && !was_clocked {
            slice.next_tick = self.now + slice.period();
        }
        if slice.csr().en() && !was_enabled {
            self.update_outputs(index);
        }
    }

    /// Start a channel with its reload count, unless it is already running.
    fn trigger(&mut self, index: usize) {
        let channel = &mut self.channels[index];
        if channel.busy {
            return;
        }
        channel.remaining = channel.reload;
        channel.busy = true;
        let unpaced = dma::TREQ_SEL.extract(channel.ctrl) == TREQ_PERMANENT as u32;
        if channel.remaining == 0 {
            self.complete(index);
        } else if unpaced {
            while self.channels[index].busy {
                self.transfer(index);
            }
        }
    }

    fn complete(&mut self, index: usize) {
        let channel = &mut self.channels[index];
        channel.busy = false;
        let chain = dma::CHAIN_TO.extract(channel.ctrl) as usize;
        if chain != index {
            self.trigger(chain);
        }
    }

    fn transfer(&mut self, index: usize) {
        let channel = self.channels[index];
        let size = match dma::DATA_SIZE.extract(channel.ctrl) {
            0 => 1,
            1 => 2,
            _ => 4,
        };
        let value = self.load(channel.read_addr, size);
        self.store(channel.write_addr, value, size);

        let channel = &mut self.channels[index];
        if dma::INCR_READ.extract(channel.ctrl) != 0 {
            channel.read_addr = channel.read_addr.wrapping_add(size);
        }
        if dma::INCR_WRITE.extract(channel.ctrl) != 0 {
            channel.write_addr = channel.write_addr.wrapping_add(size);
        }
        channel.remaining -= 1;
        if channel.remaining == 0 {
            self.complete(index);
        }
    }

    fn load(&self, address: u32, size: u32) -> u32 {
        if let Some(ptr) = self.ram(address) {
            // Note(unsafe): `ram()` only resolves addresses inside mapped host buffers.
            return unsafe {
                match size {
                    1 => ptr.read() as u32,
                    2 => (ptr as *const u16).read_unaligned() as u32,
                    _ => (ptr as *const u32).read_unaligned(),
                }
            };
        }
        let word = self.read(address & !3);
        let lane = (address & 3) * 8;
        match size {
            1 => (word >> lane) & 0xff,
            2 => (word >> lane) & 0xffff,
            _ => word,
        }
    }

    fn store(&mut self, address: u32, value: u32, size: u32) {
        if let Some(ptr) = self.ram(address) {
            // Note(unsafe): `ram()` only resolves addresses inside mapped host buffers.
            unsafe {
                match size {
                    1 => ptr.write(value as u8),
                    2 => (ptr as *mut u16).write_unaligned(value as u16),
                    _ => (ptr as *mut u32).write_unaligned(value),
                }
            }
            return;
        }
        // Narrow writes to peripherals are replicated across byte lanes.
        let value = match size {
            1 => (value & 0xff) * 0x0101_0101,
            2 => (value & 0xffff) * 0x0001_0001,
            _ => value,
        };
        self.write(address & !3, value);
    }

    fn dreq(&mut self, dreq: u8) {
        let paced: Vec<usize> = (0..dma::CHANNEL_COUNT)
            .filter(|&i| self.channels[i].paced_by(dreq))
            .collect();
        for index in paced {
            if self.channels[index].paced_by(dreq) {
                self.transfer(index);
            }
        }
    }

    fn wrap(&mut self, index: usize) {
        self.dreq(DREQ_PWM_WRAP0 + index as u8);
    }

    fn routed(&self, pin: u8) -> bool {
        io_bank::FUNCSEL.extract(self.gpio_ctrl[pin as usize])
            == u8::from(Function::Pwm) as u32
    }

    fn set_level(&mut self, pin: u8, level: bool) {
        if self.levels[pin as usize] == level {
            return;
        }
        self.levels[pin as usize] = level;

        let input = self.routed(pin)
            && Pad::new_with_raw_value(self.pads[pin as usize]).ie()
            && pin & 1 == 1;
        if input {
            let index = pwm::slice_of(pin);
            let csr = self.slices[index].csr();
            let counts = match csr.divmode() {
                DivMode::BRising => level,
                DivMode::BFalling => !level,
                _ => false,
            };
            if csr.en() && counts {
                self.count(index);
            }
        }

        let targets: Vec<u8> = self
            .wires
            .iter()
            .filter(|(from, _)| *from == pin)
            .map(|(_, to)| *to)
            .collect();
        for to in targets {
            self.set_level(to, level);
        }
    }

    /// Advance a slice counter in sawtooth mode.
    fn count(&mut self, index: usize) {
        let slice = &mut self.slices[index];
        if slice.ctr >= slice.top {
            slice.ctr = 0;
            self.update_outputs(index);
            self.wrap(index);
        } else {
            slice.ctr += 1;
            self.update_outputs(index);
        }
    }

    /// One divided clock tick of a free-running slice.
    fn tick(&mut self, index: usize) {
        let slice = &mut self.slices[index];
        slice.next_tick += slice.period();
        let csr = slice.csr();
        if csr.divmode() == DivMode::BHigh
            && !(1..pads::PIN_COUNT as u8)
                .step_by(2)
                .any(|p| pwm::slice_of(p) == index && self.levels[p as usize])
        {
            return;
        }
        let slice = &mut self.slices[index];
        if !csr.ph_correct() {
            self.count(index);
        } else if !slice.counting_down {
            if slice.ctr < slice.top {
                slice.ctr += 1;
            } else {
                slice.counting_down = true;
            }
            self.update_outputs(index);
        } else if slice.ctr > 0 {
            slice.ctr -= 1;
            self.update_outputs(index);
        } else {
            slice.counting_down = false;
            self.wrap(index);
        }
    }

    fn update_outputs(&mut self, index: usize) {
        let slice = self.slices[index];
        let csr = slice.csr();
        let cc = Cc::new_with_raw_value(slice.cc);
        let a = (slice.ctr < cc.a() as u32) ^ csr.a_inv();
        let b = (slice.ctr < cc.b() as u32) ^ csr.b_inv();
        let b_output = csr.divmode() == DivMode::FreeRunning;
        for pin in 0..pads::PIN_COUNT as u8 {
            if pwm::slice_of(pin) != index || !self.routed(pin) {
                continue;
            }
            if pin & 1 == 0 {
                self.set_level(pin, a);
            } else if b_output {
                self.set_level(pin, b);
            }
        }
    }

    fn advance(&mut self, until: u64) {
        loop {
            let slice = (0..pwm::SLICE_COUNT)
                .filter(|&i| {
                    let csr = self.slices[i].csr();
                    csr.en()
                        && matches!(
                            csr.divmode(),
                            DivMode::FreeRunning | DivMode::BHigh
                        )
                })
                .min_by_key(|&i| self.slices[i].next_tick);
            let source = (0..self.sources.len())
                .min_by_key(|&i| self.sources[i].next);

            let slice_time = slice.map(|i| self.slices[i].next_tick);
            let source_time = source.map(|i| self.sources[i].next);
            match (slice_time, source_time) {
                (Some(ts), st) if ts <= until && st.map_or(true, |st| ts <= st) => {
                    self.now = ts;
                    self.tick(slice.unwrap());
                }
                (_, Some(st)) if st <= until => {
                    self.now = st;
                    let source = &mut self.sources[source.unwrap()];
                    source.next += source.half_period;
                    let pin = source.pin;
                    let level = !self.levels[pin as usize];
                    self.set_level(pin, level);
                }
                _ => break,
            }
        }
        self.now = until;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn free_running_period() {
        let chip = Rp2040::new();
        let slice = pwm::SLICES.at(&chip, 2);
        slice.write(pwm::DIV, 125 << 4);
        slice.write(pwm::TOP, 9);
        slice.write(pwm::CC, 5);
        slice.write(pwm::CSR, 1);
        chip.run(125 * 9);
        assert_eq!(slice.read(pwm::CTR), 9);
        chip.run(125);
        assert_eq!(slice.read(pwm::CTR), 0);
    }

    #[test]
    fn output_drives_wired_input() {
        let chip = Rp2040::new();
        let io = io_bank::GPIO.at(&chip, 4);
        io.write(io_bank::GPIO_CTRL, Function::Pwm as u32);
        chip.connect(4, 7);
        let slice = pwm::SLICES.at(&chip, 2);
        slice.write(pwm::TOP, 9);
        slice.write(pwm::CC, 5);
        slice.write(pwm::CSR, 1);
        chip.run(3);
        assert_eq!(io_bank::GPIO.at(&chip, 7).get(io_bank::INFROMPAD), 1);
        chip.run(5);
        assert_eq!(io_bank::GPIO.at(&chip, 7).get(io_bank::INFROMPAD), 0);
    }

    #[test]
    fn timer_counts_microseconds() {
        let chip = Rp2040::new();
        chip.run_us(1234);
        assert_eq!(chip.read(timer::TIMERAWL_ADDRESS), 1234);
        chip.set_timer(u32::MAX);
        chip.run_us(2);
        assert_eq!(chip.read(timer::TIMERAWL_ADDRESS), 1);
    }
}
