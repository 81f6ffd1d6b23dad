// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![no_std]
#![warn(missing_docs)]
//! MOS 8580 SID filter integrator derived from libresidfp.
//!
//! Each of the two 8580 filter integrators is an op-amp with a capacitor in
//! its feedback path, fed through a transistor acting as a voltage-controlled
//! resistor. [`Integrator8580`] advances one such stage per clock cycle; the
//! op-amp's nonlinear transfer, which cannot be inverted in closed form, is
//! read from a shared [`TransferTable`] built by [`FilterModelConfig`].
//!
//! ```ignore
//! use residfp_integrator::FilterModelConfig;
//!
//! let config = FilterModelConfig::new();
//! let mut bp = config.build_integrator();
//! bp.set_fc(FilterModelConfig::cutoff_wl(0x400));
//! bp.set_v(FilterModelConfig::gate_multiplier(0.5));
//! let vo = bp.solve(29000.0);
//! ```
//!
//! ## Feature flags
//! - `std` (default): process-wide configuration singleton
//!   ([`FilterModelConfig::global`]). Everything else only needs `alloc`.

extern crate alloc;
#[cfg(any(feature = "std", test))]
extern crate std;

/// 8580 chip characterization and derived tables.
pub mod config;
pub mod cursor;
mod error;
/// Per-cycle integrator stage.
pub mod integrator;
pub mod lut;
/// Monotone spline used to build transfer tables.
pub mod spline;

pub use self::config::{FilterModelConfig, ModelParams};
pub use self::cursor::{BufferCursor, Status};
pub use self::error::ModelError;
pub use self::integrator::{Integrator8580, IntegratorParams, Region};
pub use self::lut::{IndexedLut, InterpolatedLut, TransferTable, LUT_SIZE};
