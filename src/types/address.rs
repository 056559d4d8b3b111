// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Defines the [`Address`] type.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Network address of a mining process.
///
/// Addresses are 1-based: the process at index `i` has address `i + 1`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    /// Creates a new address with the given number.
    ///
    /// # Panics
    ///
    /// Panics if `address` is zero.
    pub const fn new(address: u64) -> Self {
        assert!(address > 0);
        Self(address)
    }

    /// Returns the address of the process at position `index`.
    pub const fn from_index(index: usize) -> Self {
        Self(index as u64 + 1)
    }

    /// Returns the position of this process in the process list.
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Returns the inner `u64`.
    pub const fn inner(self) -> u64 {
        self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrip() {
        for index in 0..10 {
            let address = Address::from_index(index);
            assert_eq!(address.index(), index);
            assert_eq!(address.inner(), index as u64 + 1);
        }
        assert_eq!(Address::new(3).to_string(), "3");
    }

    #[test]
    #[should_panic]
    fn zero_address() {
        let _ = Address::new(0);
    }
}
