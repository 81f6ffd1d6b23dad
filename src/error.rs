// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Errors raised while building filter model tables.
//!
//! Only construction can fail. The per-cycle integrator path checks its
//! invariants with debug assertions instead.

use thiserror::Error;

/// Error returned when characterization data cannot produce a valid model.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ModelError {
    /// Spline interpolation needs at least three points.
    #[error("spline requires at least 3 points, got {0}")]
    TooFewPoints(usize),
    /// Spline x coordinates must be strictly increasing.
    #[error("spline points must be sorted by x (point {index} at x={x})")]
    UnsortedPoints {
        /// Index of the first offending point.
        index: usize,
        /// Its x coordinate.
        x: f64,
    },
    /// Transfer tables must hold exactly 65536 entries.
    #[error("transfer table must have 65536 entries, got {0}")]
    TableSize(usize),
    /// A physical constant is out of its meaningful range.
    #[error("invalid model parameter `{name}`: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A generated table value does not fit the 16-bit scale.
    #[error("table value {value} at index {index} exceeds the 16-bit range")]
    TableOverflow {
        /// Table index.
        index: usize,
        /// Offending value.
        value: f64,
    },
}
