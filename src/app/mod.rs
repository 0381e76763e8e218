//! Panel core: action table, dispatch and lifecycle.
//!
//! Everything outside the process (pins, buses, transports, time) is
//! reached through the **port traits** in [`ports`], so the core runs
//! unchanged against simulated hardware in tests and dry runs.

pub mod actions;
pub mod events;
pub mod panel;
pub mod ports;
