//! Graphics hardware identity and capability types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// GPU family, ordered roughly by capability.
///
/// Variants gate themselves on comparisons such as
/// `chipset >= ChipsetId::GenericPs11`, so the declaration order matters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum ChipsetId {
    #[default]
    Unknown,
    Voodoo2,
    Voodoo3,
    Voodoo4,
    Voodoo5,
    Tnt,
    Tnt2,
    GeForce2,
    Radeon,
    GenericPs11,
    GeForce3,
    GeForce4,
    GenericPs14,
    Radeon8500,
    GenericPs20,
    Radeon9700,
}

impl ChipsetId {
    pub const ALL: [ChipsetId; 16] = [
        ChipsetId::Unknown,
        ChipsetId::Voodoo2,
        ChipsetId::Voodoo3,
        ChipsetId::Voodoo4,
        ChipsetId::Voodoo5,
        ChipsetId::Tnt,
        ChipsetId::Tnt2,
        ChipsetId::GeForce2,
        ChipsetId::Radeon,
        ChipsetId::GenericPs11,
        ChipsetId::GeForce3,
        ChipsetId::GeForce4,
        ChipsetId::GenericPs14,
        ChipsetId::Radeon8500,
        ChipsetId::GenericPs20,
        ChipsetId::Radeon9700,
    ];

    /// Short name used in config files and reports.
    pub fn short_name(self) -> &'static str {
        match self {
            ChipsetId::Unknown => "XX",
            ChipsetId::Voodoo2 => "V2",
            ChipsetId::Voodoo3 => "V3",
            ChipsetId::Voodoo4 => "V4",
            ChipsetId::Voodoo5 => "V5",
            ChipsetId::Tnt => "TNT",
            ChipsetId::Tnt2 => "TNT2",
            ChipsetId::GeForce2 => "GF2",
            ChipsetId::Radeon => "R100",
            ChipsetId::GenericPs11 => "PS11",
            ChipsetId::GeForce3 => "GF3",
            ChipsetId::GeForce4 => "GF4",
            ChipsetId::GenericPs14 => "PS14",
            ChipsetId::Radeon8500 => "R200",
            ChipsetId::GenericPs20 => "PS20",
            ChipsetId::Radeon9700 => "R300",
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        self != ChipsetId::Unknown
    }

    /// True when the family can run pixel-shader 1.1 programs.
    #[inline]
    pub fn has_pixel_shaders(self) -> bool {
        self >= ChipsetId::GenericPs11
    }
}

impl fmt::Display for ChipsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chipset name '{0}'")]
pub struct ParseChipsetError(pub String);

impl FromStr for ChipsetId {
    type Err = ParseChipsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ChipsetId::ALL
            .iter()
            .copied()
            .find(|c| c.short_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseChipsetError(s.to_string()))
    }
}

impl TryFrom<String> for ChipsetId {
    type Error = ParseChipsetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChipsetId> for String {
    fn from(value: ChipsetId) -> Self {
        value.short_name().to_string()
    }
}

/// PCI vendor of the graphics adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VendorId {
    #[default]
    Unknown,
    Nvidia,
    ThreeDfx,
    Ati,
    Other(u32),
}

impl VendorId {
    pub const NVIDIA: u32 = 0x10DE;
    pub const THREE_DFX: u32 = 0x121A;
    pub const ATI: u32 = 0x1002;

    pub fn from_pci(id: u32) -> Self {
        match id {
            0 => VendorId::Unknown,
            Self::NVIDIA => VendorId::Nvidia,
            Self::THREE_DFX => VendorId::ThreeDfx,
            Self::ATI => VendorId::Ati,
            other => VendorId::Other(other),
        }
    }
}

/// Programmable shader model version (major, minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ShaderVersion {
    pub major: u8,
    pub minor: u8,
}

impl ShaderVersion {
    /// No programmable support, also the "unknown device" sentinel.
    pub const NONE: ShaderVersion = ShaderVersion::new(0, 0);
    pub const V1_1: ShaderVersion = ShaderVersion::new(1, 1);
    pub const V1_4: ShaderVersion = ShaderVersion::new(1, 4);
    pub const V2_0: ShaderVersion = ShaderVersion::new(2, 0);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    #[inline]
    pub fn at_least(self, other: ShaderVersion) -> bool {
        self >= other
    }
}

impl fmt::Display for ShaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Who made the adapter and which driver drives it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdapterIdentity {
    pub vendor_id: u32,
    pub device_id: u32,
    pub name: String,
    /// Driver version as reported by the wrapper, 0 when unknown.
    pub driver_version: u64,
}

/// Raw capability numbers reported by the device wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCaps {
    pub max_simultaneous_textures: u32,
    pub pixel_shader: ShaderVersion,
    pub vertex_shader: ShaderVersion,
}
