//! PiControl panel library.
//!
//! A YAML document declares expanders, outputs and inputs. The
//! [`Panel`](app::panel::Panel) built from it debounces input changes and
//! runs each status's action chain against the outputs.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod device;
pub mod error;
pub mod expander;
pub mod inputs;
pub mod outputs;
pub mod timer;
