// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod address;
pub mod sim_time;

pub use self::address::Address;
pub use self::sim_time::{SimTime, Timer};
