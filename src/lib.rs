//! CPU-free frequency and pulse counting on the RP2040.
//!
//! PWM slices count input edges or time a gate, and DMA channels paced by slice wrap events do
//! the bookkeeping that would otherwise need interrupts:
//! * [`counter::ExtendedCounter`] extends the 16 bit slice counter to 32 bits.
//! * [`gate::GatedFrequency`] counts edges in a gate that a second slice closes in hardware.
//! * [`reciprocal::ReciprocalTimer`] timestamps individual edges.
#![cfg_attr(not(test), no_std)]

pub mod counter;
pub mod gate;
pub mod hardware;
pub mod reciprocal;
pub mod settings;

#[cfg(test)]
pub mod testing;
