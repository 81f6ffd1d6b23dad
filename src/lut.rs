// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! 16-bit transfer function lookup tables.
//!
//! A table maps a normalized index in `[0, 65535]` to a normalized voltage in
//! the same scale. Two lookup flavours exist: [`IndexedLut`] snaps to the
//! nearest entry, [`InterpolatedLut`] interpolates linearly between
//! neighbours. Both clamp the index to the table domain, so a monotone table
//! gives a monotone lookup.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::ModelError;

/// Number of entries in a transfer table.
pub const LUT_SIZE: usize = 1 << 16;

/// Largest valid table index, as `f32`.
const MAX_INDEX: f32 = (LUT_SIZE - 1) as f32;

/// Resolves a scaled index to a scaled value.
///
/// Tables are immutable once built and are read concurrently by every
/// integrator sharing them.
pub trait TransferTable: Send + Sync {
    /// Looks up `x`, which may be fractional.
    fn output(&self, x: f32) -> f32;
}

fn check_size(entries: &[u16]) -> Result<(), ModelError> {
    if entries.len() == LUT_SIZE {
        Ok(())
    } else {
        Err(ModelError::TableSize(entries.len()))
    }
}

/// Nearest-entry lookup.
#[derive(Clone, Debug)]
pub struct IndexedLut {
    table: Box<[u16]>,
}

impl IndexedLut {
    /// Wraps a table of exactly [`LUT_SIZE`] entries.
    pub fn new(entries: Vec<u16>) -> Result<Self, ModelError> {
        check_size(&entries)?;
        Ok(IndexedLut {
            table: entries.into_boxed_slice(),
        })
    }

    /// Raw table entries.
    pub fn entries(&self) -> &[u16] {
        &self.table
    }
}

impl TransferTable for IndexedLut {
    #[inline]
    fn output(&self, x: f32) -> f32 {
        let i = libm::roundf(x.clamp(0.0, MAX_INDEX)) as usize;
        self.table[i] as f32
    }
}

/// Linear interpolation between adjacent entries.
#[derive(Clone, Debug)]
pub struct InterpolatedLut {
    table: Box<[u16]>,
}

impl InterpolatedLut {
    /// Wraps a table of exactly [`LUT_SIZE`] entries.
    pub fn new(entries: Vec<u16>) -> Result<Self, ModelError> {
        check_size(&entries)?;
        Ok(InterpolatedLut {
            table: entries.into_boxed_slice(),
        })
    }

    /// Raw table entries.
    pub fn entries(&self) -> &[u16] {
        &self.table
    }
}

impl TransferTable for InterpolatedLut {
    #[inline]
    fn output(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, MAX_INDEX);
        let base = libm::floorf(x);
        let i = base as usize;
        let y0 = self.table[i] as f32;
        if i == LUT_SIZE - 1 {
            return y0;
        }
        let y1 = self.table[i + 1] as f32;
        y0 + (y1 - y0) * (x - base)
    }
}
