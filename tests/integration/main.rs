//! Integration tests: whole panels built from YAML and run against
//! simulated hardware with a manual clock.

mod dispatch_tests;
mod effect_tests;
mod input_tests;
mod mock_hw;
