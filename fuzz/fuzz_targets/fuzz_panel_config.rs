//! Fuzz target: configuration loading and panel construction
//!
//! Feeds arbitrary bytes through `PanelConfig::from_yaml_str` and, when
//! that succeeds, builds a panel on simulated hardware.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A rejected configuration is always reported as a `ConfigError`
//! - A panel that builds has a unique name for every device
//!
//! cargo fuzz run fuzz_panel_config

#![no_main]

use std::collections::BTreeSet;
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use picontrol::adapters::sim::SimulatedHardware;
use picontrol::adapters::simulated_ports;
use picontrol::app::panel::Panel;
use picontrol::config::PanelConfig;
use picontrol::device::Device;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = PanelConfig::from_yaml_str(text) else {
        return;
    };

    let hardware = Arc::new(SimulatedHardware::new());
    let ports = simulated_ports(hardware, true);
    if let Ok(panel) = Panel::new("fuzz", &config, &ports) {
        let names: BTreeSet<&str> = panel.devices().map(|d| d.name()).collect();
        assert_eq!(names.len(), panel.devices().count());
    }
});
