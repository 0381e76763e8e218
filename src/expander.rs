//! Expander devices: ADCs and port expanders that other devices read through.
//!
//! An expander owns no actions. Inputs reference it by name via
//! `source_device` and pick one of its channels via `source_channel`.
//!
//! | Chip family                     | Kind     | Bus | Channels   |
//! |---------------------------------|----------|-----|------------|
//! | ads1015, ads1115                | ADC      | I²C | 4          |
//! | mcp3001/3002/3004/3008          | ADC      | SPI | 1/2/4/8    |
//! | mcp3201/3202/3204/3208          | ADC      | SPI | 1/2/4/8    |
//! | mcp3301/3302/3304               | ADC      | SPI | 1/2/4      |
//! | mcp23008, mcp23017              | expander | I²C | 8 / 16     |

use crate::config::ExpanderConfig;
use crate::device::{Device, DeviceKind, DeviceState, Label};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    I2c,
    Spi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipKind {
    /// Analog-to-digital converter.
    Adc,
    /// GPIO port expander.
    PortExpander,
}

/// One row of the supported chip table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip {
    pub model: &'static str,
    pub kind: ChipKind,
    pub bus: Bus,
    pub channels: u8,
}

const fn adc(model: &'static str, bus: Bus, channels: u8) -> Chip {
    Chip {
        model,
        kind: ChipKind::Adc,
        bus,
        channels,
    }
}

const CHIPS: [Chip; 15] = [
    adc("ads1015", Bus::I2c, 4),
    adc("ads1115", Bus::I2c, 4),
    adc("mcp3001", Bus::Spi, 1),
    adc("mcp3002", Bus::Spi, 2),
    adc("mcp3004", Bus::Spi, 4),
    adc("mcp3008", Bus::Spi, 8),
    adc("mcp3201", Bus::Spi, 1),
    adc("mcp3202", Bus::Spi, 2),
    adc("mcp3204", Bus::Spi, 4),
    adc("mcp3208", Bus::Spi, 8),
    adc("mcp3301", Bus::Spi, 1),
    adc("mcp3302", Bus::Spi, 2),
    adc("mcp3304", Bus::Spi, 4),
    Chip {
        model: "mcp23008",
        kind: ChipKind::PortExpander,
        bus: Bus::I2c,
        channels: 8,
    },
    Chip {
        model: "mcp23017",
        kind: ChipKind::PortExpander,
        bus: Bus::I2c,
        channels: 16,
    },
];

impl Chip {
    /// Look a chip up by model name (case-insensitive).
    pub fn lookup(model: &str) -> Option<Chip> {
        CHIPS
            .iter()
            .find(|c| c.model.eq_ignore_ascii_case(model))
            .copied()
    }

    pub fn is_adc(&self) -> bool {
        self.kind == ChipKind::Adc
    }
}

/// A configured expander.
#[derive(Debug, Clone)]
pub struct Expander {
    name: String,
    chip: Chip,
}

impl Expander {
    pub fn build(name: &str, config: &ExpanderConfig) -> Result<Self, ConfigError> {
        let model = config.chip.as_deref().ok_or_else(|| ConfigError::MissingField {
            device: name.to_owned(),
            field: "chip",
        })?;
        let chip = Chip::lookup(model).ok_or_else(|| ConfigError::UnknownChip {
            device: name.to_owned(),
            chip: model.to_owned(),
        })?;
        Ok(Self {
            name: name.to_owned(),
            chip,
        })
    }

    pub fn chip(&self) -> &Chip {
        &self.chip
    }

    /// Validate `channel` for a device reading through this expander.
    pub fn channel(&self, device: &str, channel: Option<i64>) -> Result<u8, ConfigError> {
        let channel = channel.ok_or_else(|| ConfigError::MissingField {
            device: device.to_owned(),
            field: "source_channel",
        })?;
        match u8::try_from(channel) {
            Ok(c) if c < self.chip.channels => Ok(c),
            _ => Err(ConfigError::InvalidField {
                device: device.to_owned(),
                field: "source_channel",
                reason: format!(
                    "channel {channel} not available on {} ({} channels)",
                    self.chip.model, self.chip.channels
                ),
            }),
        }
    }
}

impl Device for Expander {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Expander
    }

    fn state(&self) -> DeviceState {
        DeviceState {
            last_status: Some(Label::from(self.chip.model)),
            last_value: None,
        }
    }
}
