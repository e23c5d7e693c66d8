//! Measurement settings
//!
//! # Design
//! All parameters of the measurement protocols and the self-test signal live in one
//! [`miniconf::Tree`] so that they can be inspected and changed by path. A JSON document can
//! provide any subset of them; absent entries keep their defaults. Every update is validated
//! before it takes effect.
use fugit::{HertzU32, MicrosDurationU32};
use miniconf::{Leaf, Tree};
use serde::{Deserialize, Serialize};

use crate::{
    gate::GateTimer,
    hardware::{
        regs::{
            pads::PIN_COUNT,
            pwm::{slice_of, Div},
        },
        Edge,
    },
};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Malformed settings: {0}")]
    Json(serde_json_core::de::Error),
    #[error("Settings access failed: {0}")]
    Path(miniconf::Error<serde_json_core::de::Error>),
    #[error("Invalid {0}")]
    Invalid(&'static str),
}

#[derive(Clone, Debug, PartialEq, Tree, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// System clock feeding the PWM slices, in Hz.
    pub clock: Leaf<u32>,

    /// Input GPIO. Must be odd, as only the B channel of a slice counts edges.
    pub input_pin: Leaf<u8>,

    /// Self-test signal GPIO.
    pub output_pin: Leaf<u8>,

    /// GPIO whose slice is used as gate timer. The pin itself is not driven.
    pub gate_pin: Leaf<u8>,

    /// Count rising input edges, otherwise falling ones.
    pub rising: Leaf<bool>,

    /// Gate timer clock divisor. Zero divides by 256.
    pub gate_prescale: Leaf<u8>,

    /// Gate length in prescaled clock cycles.
    pub gate_wrap: Leaf<u32>,

    /// Self-test signal clock divisor.
    pub test_divisor: Leaf<u8>,

    /// Self-test signal wrap value. The period is one more divided clock cycle.
    pub test_wrap: Leaf<u16>,

    /// Number of edge timestamps taken by the reciprocal timer.
    pub samples: Leaf<u32>,

    /// Polls of the DMA abort status before giving up.
    pub abort_spin_limit: Leaf<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clock: Leaf(125_000_000),
            input_pin: Leaf(3),
            output_pin: Leaf(4),
            gate_pin: Leaf(0),
            rising: Leaf(true),
            // 125 MHz / 250 = 500 kHz
            gate_prescale: Leaf(250),
            // 500 kHz / 125000 = 4 Hz, i.e. 250 ms
            gate_wrap: Leaf(125_000),
            // 125 MHz / 125 / 10 = 100 kHz
            test_divisor: Leaf(125),
            test_wrap: Leaf(9),
            samples: Leaf(9),
            abort_spin_limit: Leaf(100_000),
        }
    }
}

impl Settings {
    /// Settings from a JSON object. Absent fields take their default value.
    pub fn from_json(json: &[u8]) -> Result<Self, Error> {
        let (settings, _): (Self, _) =
            serde_json_core::from_slice(json).map_err(Error::Json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Update one setting by path, e.g. `/input_pin`, from its JSON value.
    ///
    /// # Errors
    /// The settings are left unchanged if the path or value is malformed or if the result
    /// would be invalid.
    pub fn set(&mut self, path: &str, value: &[u8]) -> Result<(), Error> {
        let mut updated = self.clone();
        miniconf::json::set(&mut updated, path, value).map_err(Error::Path)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check the values the measurement protocols rely on.
    pub fn validate(&self) -> Result<(), Error> {
        let pins = PIN_COUNT as u8;
        if *self.clock == 0 {
            return Err(Error::Invalid("clock"));
        }
        if *self.input_pin >= pins || *self.input_pin % 2 == 0 {
            return Err(Error::Invalid("input_pin"));
        }
        if *self.output_pin >= pins {
            return Err(Error::Invalid("output_pin"));
        }
        if *self.gate_pin >= pins || slice_of(*self.gate_pin) == slice_of(*self.input_pin) {
            return Err(Error::Invalid("gate_pin"));
        }
        let wrap = *self.gate_wrap;
        if wrap == 0 || wrap % 2 != 0 || wrap > 1 << 17 {
            return Err(Error::Invalid("gate_wrap"));
        }
        if *self.samples < 2 {
            return Err(Error::Invalid("samples"));
        }
        if *self.abort_spin_limit == 0 {
            return Err(Error::Invalid("abort_spin_limit"));
        }
        Ok(())
    }

    pub fn clock(&self) -> HertzU32 {
        HertzU32::from_raw(*self.clock)
    }

    pub fn edge(&self) -> Edge {
        if *self.rising {
            Edge::Rising
        } else {
            Edge::Falling
        }
    }

    /// Gate timer register values.
    ///
    /// # Panics
    /// If the gate wrap is odd or does not fit the phase-correct 16 bit counter.
    pub fn gate(&self) -> GateTimer {
        GateTimer::new(*self.gate_prescale, *self.gate_wrap)
    }

    /// Gate length, truncated to microseconds.
    ///
    /// # Panics
    /// If the clock is zero.
    pub fn gate_duration(&self) -> MicrosDurationU32 {
        let div = Div::new_with_raw_value(0).with_int(*self.gate_prescale);
        let sixteenths = *self.gate_wrap as u64 * div.sixteenths() as u64;
        let us = sixteenths * 1_000_000 / (16 * *self.clock as u64);
        MicrosDurationU32::from_ticks(us as u32)
    }

    /// Self-test signal compare level for a 50% duty cycle.
    pub fn test_level(&self) -> u16 {
        ((*self.test_wrap as u32 + 1) / 2) as u16
    }
}
