//! Peripheral access for the measurement protocols: pin routing, PWM slices and DMA channels.
pub use rp2040_regs as regs;

pub mod design_parameters;
pub mod dma;
pub mod gpio;
pub mod pwm;
mod registry;

pub use dma::{Dma, DmaBuffer};
pub use pwm::{Edge, Pwm};
pub use registry::Registry;

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Edge counting is only possible on the B input of a slice (odd GPIO).
    #[error("GPIO{0} is not a PWM B channel")]
    NotChannelB(u8),
    /// The DMA channel did not confirm an abort within the spin limit.
    #[error("DMA channel {0} abort timed out")]
    AbortTimeout(u8),
    #[error("No free DMA channel")]
    DmaExhausted,
    #[error("PWM slice {0} is in use")]
    SliceBusy(u8),
}
