// Copyright 2026 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Harvest runtime library: authenticated profile acquisition and
//! markup-tolerant structured-field extraction.
//!
//! This library crate exposes the core modules for integration testing.

#![allow(clippy::new_without_default, clippy::too_many_arguments)]

pub mod acquisition;
pub mod audit;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod error;
pub mod events;
pub mod extraction;
pub mod model;
pub mod renderer;
pub mod roster;
pub mod stealth;
