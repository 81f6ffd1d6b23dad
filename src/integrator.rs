// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Integrator stage of the 8580 filter.
//!
//! ```text
//!                    +---C---+
//!                    |       |
//!      vi -----Rfc---o--[A>--o-- vo
//!                    vx
//! ```
//!
//! Rfc is a MOS transistor whose gate is driven by an op-amp voltage divider.
//! Its current follows the square law
//!
//! ```text
//! IRfc = K/2 * W/L * (Vgst^2 - Vgdt^2)
//! ```
//!
//! and charges C each cycle:
//!
//! ```text
//! vc = vc0 + n * IRfc(vi, vx)
//! vx = g(vc)
//! ```
//!
//! `g` is the reverse op-amp transfer function, which has no closed form and
//! is read from a [`TransferTable`]. All voltages are normalized to the
//! table scale; `vc` carries an extra factor of 2^16.

use alloc::sync::Arc;

use crate::lut::{InterpolatedLut, TransferTable};

/// Scale of the charge accumulator relative to the table scale.
const CHARGE_SCALE: f32 = 65536.0;

/// Table index of zero capacitor voltage.
const HALF_DOMAIN: f32 = (1 << 15) as f32;

/// Gate voltage divider reference: Ua = Ue * v = 4.76V * v.
const GATE_REFERENCE: f64 = 4.76;

/// Gate voltage multiplier applied at construction.
pub const DEFAULT_GATE_MULTIPLIER: f64 = 1.5;

/// Physical constants of one integrator stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntegratorParams {
    /// Transistor threshold voltage (V).
    pub vth: f64,
    /// Voltage range of the normalized scale (V).
    pub denorm: f64,
    /// Integration capacitor (F).
    pub c: f64,
    /// Process transconductance uCox (A/V^2).
    pub u_cox: f64,
    /// Voltage mapped to normalized zero (V).
    pub vmin: f64,
    /// Fixed-point scale: normalized units per volt.
    pub n16: f64,
}

/// Operating region of the Rfc transistor for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    /// Input below the gate overdrive: both terminals conduct.
    Triode,
    /// Input at or above the gate overdrive: drain side pinched off.
    Saturation,
}

/// One 8580 filter integrator.
///
/// The table handle is shared with every other stage built from the same
/// filter model. `solve` advances the stage by one cycle and must be called
/// in simulation order.
#[derive(Clone, Debug)]
pub struct Integrator8580<L = InterpolatedLut> {
    opamp_rev: Arc<L>,

    /// Op-amp input voltage, normalized.
    vx: f32,
    /// Capacitor voltage, normalized and scaled by 2^16.
    vc: f32,

    /// Gate overdrive Vg - Vth, normalized.
    n_vgt: f32,
    /// Current factor for the DAC W/L.
    n_dac: f32,

    vth: f64,
    n_kp: f64,
    vmin: f64,
    n16: f64,
}

impl<L: TransferTable> Integrator8580<L> {
    /// Creates a stage at rest with the default gate voltage and no current.
    pub fn new(opamp_rev: Arc<L>, params: &IntegratorParams) -> Self {
        let mut integrator = Self {
            opamp_rev,
            vx: 0.0,
            vc: 0.0,
            n_vgt: 0.0,
            n_dac: 0.0,
            vth: params.vth,
            n_kp: params.denorm * (params.u_cox / 2.0 * 1.0e-6 / params.c),
            vmin: params.vmin,
            n16: params.n16,
        };
        integrator.set_v(DEFAULT_GATE_MULTIPLIER);
        integrator
    }

    /// Sets the DAC W/L ratio selected by the cutoff register.
    ///
    /// Normalized current factor for one cycle at 1MHz.
    pub fn set_fc(&mut self, wl: f64) {
        self.n_dac = (self.n_kp * wl) as f32;
        log::trace!("integrator fc: wl={} n_dac={}", wl, self.n_dac);
    }

    /// Sets the gate voltage multiplier, nominally in `[1, 2]`.
    pub fn set_v(&mut self, v: f64) {
        let vg = GATE_REFERENCE * v;
        let vgt = vg - self.vth;

        // Translated by vmin so that Vgt - x = (Vgt - t) - (x - t).
        let n_vgt = self.n16 * (vgt - self.vmin);
        debug_assert!(
            n_vgt > -0.5 && n_vgt < 65535.5,
            "gate overdrive {n_vgt} outside table domain (v={v})"
        );
        self.n_vgt = n_vgt as f32;
        log::trace!("integrator gate: v={} n_vgt={}", v, self.n_vgt);
    }

    /// Region the transistor operates in for input `vi`.
    #[inline]
    pub fn region(&self, vi: f32) -> Region {
        if vi < self.n_vgt {
            Region::Triode
        } else {
            Region::Saturation
        }
    }

    /// Advances one cycle with input `vi` and returns the output voltage.
    #[inline]
    pub fn solve(&mut self, vi: f32) -> f32 {
        debug_assert!(
            self.vx < self.n_vgt,
            "subthreshold mode: vx={} nVgt={}",
            self.vx,
            self.n_vgt
        );

        let vgst = self.n_vgt - self.vx;
        let vgdt = match self.region(vi) {
            Region::Triode => self.n_vgt - vi,
            Region::Saturation => 0.0,
        };

        // DAC current, scaled by m*2^32.
        let n_i_dac = self.n_dac * (vgst * vgst - vgdt * vgdt);

        self.vc += n_i_dac;

        // vx = g(vc)
        let index = self.vc / CHARGE_SCALE / 2.0 + HALF_DOMAIN;
        debug_assert!(
            (0.0..65536.0).contains(&index),
            "integrator overflow: table index {index}"
        );
        self.vx = self.opamp_rev.output(index);

        self.vx - self.vc / CHARGE_SCALE
    }

    /// Returns the stage to rest, keeping fc and gate voltage.
    pub fn reset(&mut self) {
        self.vx = 0.0;
        self.vc = 0.0;
    }

    /// Op-amp input voltage after the last cycle.
    #[inline]
    pub fn node_voltage(&self) -> f32 {
        self.vx
    }

    /// Accumulated capacitor charge.
    #[inline]
    pub fn charge(&self) -> f32 {
        self.vc
    }

    /// Normalized gate overdrive, Vg - Vth.
    #[inline]
    pub fn gate_voltage_offset(&self) -> f32 {
        self.n_vgt
    }

    /// Normalized DAC current factor.
    #[inline]
    pub fn current_scale(&self) -> f32 {
        self.n_dac
    }

    /// Shared reverse op-amp table.
    pub fn table(&self) -> &Arc<L> {
        &self.opamp_rev
    }
}
