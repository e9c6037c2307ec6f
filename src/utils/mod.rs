// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod duration;
pub mod periodic;

pub use duration::parse_duration;
pub use periodic::PeriodicTask;
