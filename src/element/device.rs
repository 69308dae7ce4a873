use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::error::BoxError;

pub const EXT_SIZE: usize = 4;

/// Where a box's data buffer lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DeviceTag {
    #[default]
    None,
    Cpu,
    AccelA,
    AccelB,
}

impl DeviceTag {
    pub const fn code(self) -> u16 {
        match self {
            DeviceTag::None => 0,
            DeviceTag::Cpu => 1,
            DeviceTag::AccelA => 2,
            DeviceTag::AccelB => 3,
        }
    }

    pub fn from_code(code: u16) -> Result<Self, BoxError> {
        match code {
            0 => Ok(DeviceTag::None),
            1 => Ok(DeviceTag::Cpu),
            2 => Ok(DeviceTag::AccelA),
            3 => Ok(DeviceTag::AccelB),
            other => Err(BoxError::IllegalArgs(format!(
                "unknown device code {}",
                other
            ))),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DeviceTag::None => "NONE",
            DeviceTag::Cpu => "CPU",
            DeviceTag::AccelA => "ACCEL_A",
            DeviceTag::AccelB => "ACCEL_B",
        }
    }

    /// Whether the device identity is refined by a `DeviceExt`.
    pub const fn uses_ext(self) -> bool {
        matches!(self, DeviceTag::AccelA | DeviceTag::AccelB)
    }
}

impl fmt::Display for DeviceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accelerator identity words: platform, device, context and a reserved slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceExt(pub [u64; EXT_SIZE]);

impl DeviceExt {
    pub const ZERO: DeviceExt = DeviceExt([0; EXT_SIZE]);

    pub const fn new(platform: u64, device: u64, context: u64) -> Self {
        DeviceExt([platform, device, context, 0])
    }

    /// Hosts ignore the extension, so it is forced to zero for them.
    pub fn normalized_for(self, device: DeviceTag) -> Self {
        if device.uses_ext() { self } else { Self::ZERO }
    }
}

impl From<[u64; EXT_SIZE]> for DeviceExt {
    fn from(words: [u64; EXT_SIZE]) -> Self {
        DeviceExt(words)
    }
}
