// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic primitives.
//!
//! The simulator only needs a collision-resistant digest to identify blocks.

pub mod hash;

pub use self::hash::{BlockHash, Hash, hash, hash_all};
