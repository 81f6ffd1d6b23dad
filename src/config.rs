// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Filter model configuration for the 8580.
//!
//! Holds the chip characterization and the reverse op-amp table derived from
//! it. Building the table samples a spline 65536 times, so build once and
//! share: every integrator gets an `Arc` to the same table.
//!
//! # Singleton Usage
//!
//! ```ignore
//! // At startup (once):
//! FilterModelConfig::init(ModelParams::default());
//!
//! // Later (fast; panics if `init` was skipped):
//! let hp = FilterModelConfig::global().build_integrator();
//! ```

use alloc::sync::Arc;
use alloc::vec::Vec;

use bit_field::BitField;

#[cfg(feature = "std")]
use std::sync::OnceLock;

use crate::error::ModelError;
use crate::integrator::{Integrator8580, IntegratorParams};
use crate::lut::{InterpolatedLut, LUT_SIZE};
use crate::spline::{MonotoneSpline, Point};

/// Global singleton (std feature only).
#[cfg(feature = "std")]
static CONFIG: OnceLock<FilterModelConfig> = OnceLock::new();

/// Number of bits in the cutoff frequency register.
const FC_BITS: usize = 11;

/// W/L of the smallest cutoff DAC transistor (~1/163).
const DAC_WL: f64 = 0.00615;

/// SID 8580 op-amp voltage transfer function, (vi, vo) in volts.
///
/// All measured chips have op-amps with output voltages (and thus input
/// voltages) within the range of 1.30V - 8.91V.
pub const OPAMP_VOLTAGE_8580: [(f64, f64); 21] = [
    (1.30, 8.91), // Approximate start of actual range
    (4.76, 8.91),
    (4.77, 8.90),
    (4.78, 8.88),
    (4.785, 8.86),
    (4.79, 8.80),
    (4.795, 8.60),
    (4.80, 8.25),
    (4.805, 7.50),
    (4.81, 6.10),
    (4.815, 4.05), // Change of curvature
    (4.82, 2.27),
    (4.825, 1.65),
    (4.83, 1.55),
    (4.84, 1.47),
    (4.85, 1.43),
    (4.87, 1.37),
    (4.90, 1.34),
    (5.00, 1.30),
    (5.10, 1.30),
    (8.91, 1.30), // Approximate end of actual range
];

/// Chip characterization data.
///
/// Defaults describe the MOS 8580. Override fields with struct update
/// syntax:
///
/// ```ignore
/// let params = ModelParams { u_cox: 80e-6, ..ModelParams::default() };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ModelParams {
    /// Supply voltage (V).
    pub vdd: f64,
    /// Transistor threshold voltage (V).
    pub vth: f64,
    /// Integration capacitor (F).
    pub c: f64,
    /// Process transconductance (A/V^2).
    pub u_cox: f64,
    /// Measured op-amp transfer, (vi, vo) pairs with vi increasing.
    pub opamp_voltage: Vec<(f64, f64)>,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            vdd: 9.09,
            vth: 0.80,
            c: 22e-9,
            u_cox: 100e-6,
            opamp_voltage: OPAMP_VOLTAGE_8580.to_vec(),
        }
    }
}

impl ModelParams {
    fn validate(&self) -> Result<(), ModelError> {
        let positive = [("vdd", self.vdd), ("c", self.c), ("u_cox", self.u_cox)];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ModelError::InvalidParameter { name, value });
            }
        }
        if !(self.vth >= 0.0 && self.vth < self.vdd) {
            return Err(ModelError::InvalidParameter {
                name: "vth",
                value: self.vth,
            });
        }
        if self.opamp_voltage.len() < 3 {
            return Err(ModelError::TooFewPoints(self.opamp_voltage.len()));
        }
        // Reverse-curve x can be sorted even when vi is not.
        if let Some(index) = self
            .opamp_voltage
            .windows(2)
            .position(|w| !(w[1].0 > w[0].0))
        {
            return Err(ModelError::UnsortedPoints {
                index: index + 1,
                x: self.opamp_voltage[index + 1].0,
            });
        }
        Ok(())
    }
}

/// Configuration and lookup table for the 8580 filter model.
#[derive(Clone, Debug)]
pub struct FilterModelConfig {
    params: ModelParams,

    /// Reverse op-amp transfer function.
    opamp_rev: Arc<InterpolatedLut>,

    /// Voltage mapped to normalized zero.
    vmin: f64,

    /// Voltage range covered by the normalized scale.
    denorm: f64,

    /// Fixed-point scale factor: norm * UINT16_MAX.
    n16: f64,
}

impl FilterModelConfig {
    /// Initialize the global singleton.
    ///
    /// Returns `false` if already initialized or the parameters are invalid.
    #[cfg(feature = "std")]
    pub fn try_init(params: ModelParams) -> bool {
        if CONFIG.get().is_some() {
            log::warn!("filter model config already initialized");
            return false;
        }
        match Self::from_params(params) {
            Ok(config) => CONFIG.set(config).is_ok(),
            Err(err) => {
                log::warn!("filter model config rejected: {}", err);
                false
            }
        }
    }

    /// Initialize the global singleton.
    ///
    /// # Panics
    /// Panics if already initialized or the parameters are invalid. Prefer
    /// `try_init()` for fallible initialization.
    #[cfg(feature = "std")]
    pub fn init(params: ModelParams) {
        if !Self::try_init(params) {
            panic!("FilterModelConfig::init() failed or already called");
        }
    }

    /// Returns the global singleton if initialized.
    #[cfg(feature = "std")]
    pub fn try_global() -> Option<&'static FilterModelConfig> {
        CONFIG.get()
    }

    /// Returns the global singleton.
    ///
    /// # Panics
    /// Panics if `init()` was not called. Prefer `try_global()` for fallible access.
    #[cfg(feature = "std")]
    pub fn global() -> &'static FilterModelConfig {
        Self::try_global().expect("FilterModelConfig::init() must be called first")
    }

    /// Creates the 8580 configuration.
    pub fn new() -> Self {
        match Self::from_params(ModelParams::default()) {
            Ok(config) => config,
            Err(err) => unreachable!("8580 characterization is valid: {err}"),
        }
    }

    /// Creates a configuration from custom characterization data.
    pub fn from_params(params: ModelParams) -> Result<Self, ModelError> {
        params.validate()?;

        let vddt = params.vdd - params.vth;
        let (vmin, vo0) = params.opamp_voltage[0];
        let vmax = vddt.max(vo0);
        let denorm = vmax - vmin;
        if !(denorm > 0.0) {
            return Err(ModelError::InvalidParameter {
                name: "denorm",
                value: denorm,
            });
        }
        let n16 = (u16::MAX as f64) / denorm;

        let opamp_rev = build_opamp_rev_table(&params.opamp_voltage, n16, vmin)?;
        log::debug!(
            "built 8580 op-amp table: {} entries, vmin={} denorm={} n16={}",
            LUT_SIZE,
            vmin,
            denorm,
            n16
        );

        Ok(FilterModelConfig {
            params,
            opamp_rev: Arc::new(InterpolatedLut::new(opamp_rev)?),
            vmin,
            denorm,
            n16,
        })
    }

    /// Construction constants for an integrator stage.
    pub fn integrator_params(&self) -> IntegratorParams {
        IntegratorParams {
            vth: self.params.vth,
            denorm: self.denorm,
            c: self.params.c,
            u_cox: self.params.u_cox,
            vmin: self.vmin,
            n16: self.n16,
        }
    }

    /// Builds an integrator stage sharing this configuration's table.
    pub fn build_integrator(&self) -> Integrator8580 {
        Integrator8580::new(Arc::clone(&self.opamp_rev), &self.integrator_params())
    }

    /// Maps the 11-bit cutoff register to the DAC W/L ratio.
    ///
    /// Each set bit switches in a transistor twice as wide as the previous
    /// one. With no bits set only leakage remains, modeled as half the
    /// smallest transistor.
    pub fn cutoff_wl(fc: u16) -> f64 {
        let fc = fc.get_bits(0..FC_BITS);
        if fc == 0 {
            return DAC_WL / 2.0;
        }
        (0..FC_BITS)
            .filter(|&bit| fc.get_bit(bit))
            .map(|bit| DAC_WL * (1u32 << bit) as f64)
            .sum()
    }

    /// Maps a filter curve position in `[0, 1]` to the gate voltage
    /// multiplier, `1.8` down to `1.2`.
    pub fn gate_multiplier(curve: f64) -> f64 {
        1.8 - curve.clamp(0.0, 1.0) * 3.0 / 5.0
    }

    /// Reverse op-amp transfer table.
    pub fn opamp_rev(&self) -> &Arc<InterpolatedLut> {
        &self.opamp_rev
    }

    /// Characterization data this configuration was built from.
    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Returns voltage mapped to normalized zero.
    #[inline]
    pub fn get_vmin(&self) -> f64 {
        self.vmin
    }

    /// Returns voltage range of the normalized scale.
    #[inline]
    pub fn get_denorm(&self) -> f64 {
        self.denorm
    }

    /// Returns fixed-point scale factor.
    #[inline]
    pub fn get_n16(&self) -> f64 {
        self.n16
    }
}

impl Default for FilterModelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts f64 to u16 with rounding, rejecting values off the scale.
fn to_u16(index: usize, x: f64) -> Result<u16, ModelError> {
    let tmp = x + 0.5;
    if tmp >= 0.0 && tmp < 65536.0 {
        Ok(tmp as u16)
    } else {
        Err(ModelError::TableOverflow { index, value: x })
    }
}

/// Builds the reverse op-amp transfer function lookup table.
///
/// Maps capacitor voltage to op-amp input voltage:
/// x = n16 * (vi - vo) / 2 + 2^15, y = n16 * (vi - vmin).
fn build_opamp_rev_table(
    opamp_voltage: &[(f64, f64)],
    n16: f64,
    vmin: f64,
) -> Result<Vec<u16>, ModelError> {
    let scaled: Vec<Point> = opamp_voltage
        .iter()
        .map(|&(vi, vo)| Point {
            x: n16 * (vi - vo) / 2.0 + (1u32 << 15) as f64,
            y: n16 * (vi - vmin),
        })
        .collect();

    let spline = MonotoneSpline::new(&scaled)?;

    (0..LUT_SIZE)
        .map(|x| {
            let (y, _dy) = spline.evaluate(x as f64);
            // If vmax exceeds the op-amp range the first entries go negative.
            to_u16(x, y.max(0.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::TransferTable;

    macro_rules! assert_close {
        ($actual:expr, $expected:expr, $tol:expr, $msg:expr) => {{
            let diff = ($actual - $expected).abs();
            assert!(
                diff <= $tol,
                "{}: expected ~{}, got {} (diff: {})",
                $msg,
                $expected,
                $actual,
                diff
            );
        }};
    }

    #[test]
    fn derived_scale_matches_characterization() {
        let config = FilterModelConfig::new();
        assert_close!(config.get_vmin(), 1.30, 1e-12, "vmin");
        assert_close!(config.get_denorm(), 7.61, 1e-12, "denorm");
        assert_close!(config.get_n16(), 8611.695, 0.001, "n16");
    }

    #[test]
    fn opamp_rev_table_spans_scale() {
        let config = FilterModelConfig::new();
        let table = config.opamp_rev().entries();

        assert_eq!(table.len(), LUT_SIZE);
        assert_eq!(table[0], 0);
        assert!(table[LUT_SIZE - 1] >= 65530, "top entry {}", table[LUT_SIZE - 1]);
        // Zero capacitor voltage sits at the op-amp working point (~4.81V).
        let working_point = config.opamp_rev().output(32768.0) as f64 / config.get_n16() + 1.30;
        assert_close!(working_point, 4.81, 0.01, "working point");
    }

    #[test]
    fn opamp_rev_table_is_monotone() {
        let config = FilterModelConfig::new();
        let table = config.opamp_rev().entries();
        assert!(table.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn cutoff_wl_sums_set_bits() {
        assert_close!(FilterModelConfig::cutoff_wl(0), DAC_WL / 2.0, 1e-15, "fc=0");
        assert_close!(FilterModelConfig::cutoff_wl(1), DAC_WL, 1e-15, "fc=1");
        assert_close!(FilterModelConfig::cutoff_wl(0x400), DAC_WL * 1024.0, 1e-12, "fc=0x400");
        assert_close!(FilterModelConfig::cutoff_wl(0x7ff), DAC_WL * 2047.0, 1e-12, "fc=0x7ff");
        // Bits above the register width are ignored.
        assert_eq!(
            FilterModelConfig::cutoff_wl(0xf801),
            FilterModelConfig::cutoff_wl(0x001)
        );
    }

    #[test]
    fn gate_multiplier_covers_curve_range() {
        assert_close!(FilterModelConfig::gate_multiplier(0.0), 1.8, 1e-12, "curve 0");
        assert_close!(FilterModelConfig::gate_multiplier(0.5), 1.5, 1e-12, "curve 0.5");
        assert_close!(FilterModelConfig::gate_multiplier(1.0), 1.2, 1e-12, "curve 1");
        assert_close!(FilterModelConfig::gate_multiplier(7.0), 1.2, 1e-12, "clamped");
    }

    #[test]
    fn rejects_invalid_params() {
        let params = ModelParams {
            c: 0.0,
            ..ModelParams::default()
        };
        assert_eq!(
            FilterModelConfig::from_params(params).unwrap_err(),
            ModelError::InvalidParameter { name: "c", value: 0.0 }
        );

        let params = ModelParams {
            opamp_voltage: alloc::vec![(1.0, 9.0), (9.0, 1.0)],
            ..ModelParams::default()
        };
        assert_eq!(
            FilterModelConfig::from_params(params).unwrap_err(),
            ModelError::TooFewPoints(2)
        );
    }

    #[test]
    fn rejects_threshold_outside_supply() {
        let params = ModelParams {
            vth: 9.5,
            ..ModelParams::default()
        };
        assert_eq!(
            FilterModelConfig::from_params(params).unwrap_err(),
            ModelError::InvalidParameter { name: "vth", value: 9.5 }
        );

        let params = ModelParams {
            vth: -0.1,
            ..ModelParams::default()
        };
        assert_eq!(
            FilterModelConfig::from_params(params).unwrap_err(),
            ModelError::InvalidParameter { name: "vth", value: -0.1 }
        );
    }

    #[test]
    fn rejects_opamp_input_out_of_order() {
        // Reverse-curve x is still increasing here: 0, 32768, 47427, 65536.
        let params = ModelParams {
            opamp_voltage: alloc::vec![(1.3, 8.9), (4.8, 4.8), (4.7, 1.3), (8.9, 1.3)],
            ..ModelParams::default()
        };
        assert_eq!(
            FilterModelConfig::from_params(params).unwrap_err(),
            ModelError::UnsortedPoints { index: 2, x: 4.7 }
        );

        let params = ModelParams {
            opamp_voltage: alloc::vec![(1.3, 8.9), (4.8, 4.8), (4.8, 1.3)],
            ..ModelParams::default()
        };
        assert_eq!(
            FilterModelConfig::from_params(params).unwrap_err(),
            ModelError::UnsortedPoints { index: 2, x: 4.8 }
        );
    }

    #[test]
    fn rejects_table_above_scale() {
        // vo at vmin sits below Vdd - Vth, so the last segment climbs past
        // the top of the scale before x reaches 65535.
        let params = ModelParams {
            opamp_voltage: alloc::vec![(1.3, 5.0), (4.8, 4.8), (8.9, 1.3)],
            ..ModelParams::default()
        };
        assert!(matches!(
            FilterModelConfig::from_params(params),
            Err(ModelError::TableOverflow { index, value }) if index < LUT_SIZE && value >= 65535.5
        ));
    }

    #[cfg(feature = "std")]
    #[test]
    fn singleton_requires_init() {
        assert!(FilterModelConfig::try_global().is_none());
        assert!(std::panic::catch_unwind(|| FilterModelConfig::global()).is_err());

        let params = ModelParams {
            u_cox: 80e-6,
            ..ModelParams::default()
        };
        assert!(FilterModelConfig::try_init(params.clone()));
        assert!(!FilterModelConfig::try_init(ModelParams::default()));

        let a = FilterModelConfig::global();
        let b = FilterModelConfig::global();
        assert!(core::ptr::eq(a, b));
        assert_eq!(a.params(), &params);
    }
}
