//! Stealth measures for browser automation.
//!
//! Patches browser fingerprint signals and adds human-like timing and
//! typing to avoid bot detection.

pub mod behavior;
pub mod fingerprint;
