//! RP2040 register map for the pad, IO bank, PWM, DMA and timer blocks.
//!
//! Each peripheral family is described by a [`RegisterBlock`] (base address, per-instance
//! stride, instance count) and a table of [`Field`]s. A [`Registers`] handle binds one instance
//! to a [`Bus`] and performs masked field access. Whole-register values are also available as
//! typed bitfields for composing configuration words.
#![cfg_attr(not(test), no_std)]

pub mod dma;
pub mod io_bank;
pub mod pads;
pub mod pwm;
pub mod timer;

/// Word-wide register access.
///
/// Every access is a direct, unbuffered load or store of the addressed word.
pub trait Bus {
    fn read(&self, address: u32) -> u32;

    fn write(&self, address: u32, value: u32);

    /// Translate a CPU pointer into the address the DMA engine uses to reach it.
    fn dma_address(&self, ptr: *const u8) -> u32 {
        ptr as usize as u32
    }
}

/// The memory-mapped peripheral bus of the running chip.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Construct the bus.
    ///
    /// # Safety
    /// Only valid on an RP2040 where the register blocks of this crate are mapped. The caller
    /// also takes on exclusive use of every register accessed through it.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Bus for Mmio {
    fn read(&self, address: u32) -> u32 {
        // Note(unsafe): `Mmio::new()` guarantees the address space is the RP2040 one.
        unsafe { core::ptr::read_volatile(address as usize as *const u32) }
    }

    fn write(&self, address: u32, value: u32) {
        // Note(unsafe): `Mmio::new()` guarantees the address space is the RP2040 one.
        unsafe { core::ptr::write_volatile(address as usize as *mut u32, value) }
    }
}

/// A bitfield within a register: byte offset of the register, bit position, bit width.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub offset: u32,
    pub position: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(offset: u32, position: u8, width: u8) -> Self {
        assert!(width > 0);
        assert!(position as u32 + width as u32 <= 32);
        assert!(offset % 4 == 0);
        Self {
            offset,
            position,
            width,
        }
    }

    /// Field bits in register position.
    pub const fn mask(&self) -> u32 {
        (u32::MAX >> (32 - self.width as u32)) << self.position
    }

    /// Extract the field value from a register value.
    pub const fn extract(&self, register: u32) -> u32 {
        (register & self.mask()) >> self.position
    }

    /// Replace the field in a register value, truncating `value` to the field width.
    pub const fn insert(&self, register: u32, value: u32) -> u32 {
        (register & !self.mask()) | ((value << self.position) & self.mask())
    }
}

/// Address window of a peripheral family.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterBlock {
    pub base: u32,
    /// Distance between consecutive instances.
    pub stride: u32,
    pub count: usize,
    /// Bytes occupied by one instance.
    pub span: u32,
}

impl RegisterBlock {
    pub const fn new(base: u32, stride: u32, count: usize, span: u32) -> Self {
        assert!(span > 0 && span <= stride);
        assert!(base as u64 + stride as u64 * count as u64 <= 1 << 32);
        Self {
            base,
            stride,
            count,
            span,
        }
    }

    /// Base address of instance `index`.
    ///
    /// # Panics
    /// If `index` is not below the instance count.
    pub fn address(&self, index: usize) -> u32 {
        assert!(
            index < self.count,
            "instance {} out of range ({} instances)",
            index,
            self.count
        );
        self.base + self.stride * index as u32
    }

    /// Find the instance and offset within it that `address` belongs to.
    pub fn decode(&self, address: u32) -> Option<(usize, u32)> {
        let delta = address.checked_sub(self.base)?;
        let index = (delta / self.stride) as usize;
        let offset = delta % self.stride;
        (index < self.count && offset < self.span).then_some((index, offset))
    }

    /// Bind instance `index` to a bus.
    ///
    /// # Panics
    /// If `index` is not below the instance count.
    pub fn at<'a, B: Bus>(&self, bus: &'a B, index: usize) -> Registers<'a, B> {
        Registers {
            bus,
            base: self.address(index),
        }
    }
}

/// Register access for one peripheral instance.
#[derive(Debug)]
pub struct Registers<'a, B> {
    bus: &'a B,
    base: u32,
}

impl<'a, B: Bus> Registers<'a, B> {
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn bus(&self) -> &'a B {
        self.bus
    }

    /// Absolute address of the register at `offset`.
    pub fn address(&self, offset: u32) -> u32 {
        self.base + offset
    }

    pub fn read(&self, offset: u32) -> u32 {
        self.bus.read(self.address(offset))
    }

    pub fn write(&self, offset: u32, value: u32) {
        self.bus.write(self.address(offset), value)
    }

    pub fn modify(&self, offset: u32, f: impl FnOnce(u32) -> u32) {
        self.write(offset, f(self.read(offset)))
    }

    pub fn get(&self, field: Field) -> u32 {
        field.extract(self.read(field.offset))
    }

    /// Read-modify-write of a single field. All other bits of the register are preserved.
    pub fn set(&self, field: Field, value: u32) {
        self.modify(field.offset, |r| field.insert(r, value))
    }
}
