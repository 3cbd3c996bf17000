//! Graphics hardware capability probing.
//!
//! Answers the questions effect variants ask during negotiation: which GPU
//! family is this, which shader models does it run, how many texture stages
//! can it blend at once. Without a device every query answers with the
//! "unknown" sentinel, which satisfies no capability requirement.

use log::info;
use ridgeline_shared::{AdapterIdentity, ChipsetId, DeviceCaps, ShaderVersion, VendorId};

use crate::device::Device;

/// Snapshot of the probe results handed to every variant `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityReport {
    pub chipset: ChipsetId,
    pub vendor: VendorId,
    pub driver_version: u64,
    pub pixel_shader: ShaderVersion,
    pub vertex_shader: ShaderVersion,
    pub max_simultaneous_textures: u32,
    /// Both the scratch colour target and its depth surface were allocated.
    pub render_to_texture: bool,
}

impl CapabilityReport {
    pub const UNKNOWN: CapabilityReport = CapabilityReport {
        chipset: ChipsetId::Unknown,
        vendor: VendorId::Unknown,
        driver_version: 0,
        pixel_shader: ShaderVersion::NONE,
        vertex_shader: ShaderVersion::NONE,
        max_simultaneous_textures: 0,
        render_to_texture: false,
    };
}

impl Default for CapabilityReport {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

#[derive(Debug, Clone, Copy)]
struct Detected {
    chipset: ChipsetId,
    vendor: VendorId,
    driver_version: u64,
}

/// Classifies the active adapter and caches the result for the device session.
#[derive(Debug, Default)]
pub struct CapabilityProbe {
    chipset_override: Option<ChipsetId>,
    detected: Option<Detected>,
}

impl CapabilityProbe {
    pub fn new(chipset_override: Option<ChipsetId>) -> Self {
        Self {
            chipset_override,
            detected: None,
        }
    }

    pub fn set_override(&mut self, chipset_override: Option<ChipsetId>) {
        if self.chipset_override != chipset_override {
            self.chipset_override = chipset_override;
            self.detected = None;
        }
    }

    /// GPU family of the active adapter.
    ///
    /// Cached after the first call that sees a device; [`invalidate`] clears
    /// the cache so the next negotiation probes again.
    ///
    /// [`invalidate`]: CapabilityProbe::invalidate
    pub fn chipset(&mut self, device: &dyn Device) -> ChipsetId {
        if let Some(detected) = self.detected {
            return detected.chipset;
        }
        let Some(identity) = device.adapter() else {
            return ChipsetId::Unknown;
        };
        let caps = device.caps().unwrap_or_default();

        let chipset = self
            .chipset_override
            .unwrap_or_else(|| classify_chipset(&identity, &caps));
        self.detected = Some(Detected {
            chipset,
            vendor: VendorId::from_pci(identity.vendor_id),
            driver_version: identity.driver_version,
        });
        chipset
    }

    /// Vendor seen by the last successful [`CapabilityProbe::chipset`] call.
    pub fn vendor(&self) -> VendorId {
        self.detected.map(|d| d.vendor).unwrap_or_default()
    }

    pub fn driver_version(&self) -> u64 {
        self.detected.map(|d| d.driver_version).unwrap_or(0)
    }

    pub fn pixel_shader_version(&self, device: &dyn Device) -> ShaderVersion {
        device.caps().map(|c| c.pixel_shader).unwrap_or(ShaderVersion::NONE)
    }

    pub fn vertex_shader_version(&self, device: &dyn Device) -> ShaderVersion {
        device.caps().map(|c| c.vertex_shader).unwrap_or(ShaderVersion::NONE)
    }

    pub fn max_simultaneous_textures(&self, device: &dyn Device) -> u32 {
        device.caps().map(|c| c.max_simultaneous_textures).unwrap_or(0)
    }

    /// Collect everything negotiation needs in one value.
    pub fn report(&mut self, device: &dyn Device, render_to_texture: bool) -> CapabilityReport {
        CapabilityReport {
            chipset: self.chipset(device),
            vendor: self.vendor(),
            driver_version: self.driver_version(),
            pixel_shader: self.pixel_shader_version(device),
            vertex_shader: self.vertex_shader_version(device),
            max_simultaneous_textures: self.max_simultaneous_textures(device),
            render_to_texture,
        }
    }

    /// Forget the cached classification (device reset).
    pub fn invalidate(&mut self) {
        self.detected = None;
    }
}

/// Map vendor/device ids to a GPU family.
///
/// Known parts are matched by PCI id first. Anything else is classified by
/// its programmable shader version, and only when it blends at least four
/// textures in one pass.
pub fn classify_chipset(identity: &AdapterIdentity, caps: &DeviceCaps) -> ChipsetId {
    let device = identity.device_id;
    let known = match VendorId::from_pci(identity.vendor_id) {
        VendorId::Nvidia => match device {
            0x20 => Some(ChipsetId::Tnt),
            0x100..=0x103 | 0x110..=0x113 | 0x150..=0x153 => Some(ChipsetId::GeForce2),
            0x28..0x100 => Some(ChipsetId::Tnt2),
            0x200..0x250 => Some(ChipsetId::GeForce3),
            d if d >= 0x250 => Some(ChipsetId::GeForce4),
            _ => None,
        },
        VendorId::ThreeDfx => match device {
            2 => Some(ChipsetId::Voodoo2),
            5 => Some(ChipsetId::Voodoo3),
            8 => Some(ChipsetId::Voodoo4),
            9 => Some(ChipsetId::Voodoo5),
            _ => None,
        },
        VendorId::Ati => match device {
            0x5144 => Some(ChipsetId::Radeon),
            0x514C => Some(ChipsetId::Radeon8500),
            0x4E44 => Some(ChipsetId::Radeon9700),
            _ => None,
        },
        _ => None,
    };
    if let Some(chipset) = known {
        return chipset;
    }

    let mut chipset = ChipsetId::Unknown;
    if caps.max_simultaneous_textures >= 4 {
        if caps.pixel_shader.at_least(ShaderVersion::V1_1) {
            chipset = ChipsetId::GenericPs11;
        }
        if caps.pixel_shader.at_least(ShaderVersion::V1_4) {
            chipset = ChipsetId::GenericPs14;
        }
        if caps.max_simultaneous_textures >= 8 && caps.pixel_shader.at_least(ShaderVersion::V2_0) {
            chipset = ChipsetId::GenericPs20;
        }
    }
    chipset
}

/// Build an adapter identity and capability set from a wgpu adapter.
pub fn caps_from_wgpu(
    info: &wgpu::AdapterInfo,
    limits: &wgpu::Limits,
    downlevel: &wgpu::DownlevelCapabilities,
) -> (AdapterIdentity, DeviceCaps) {
    let shader = match downlevel.shader_model {
        wgpu::ShaderModel::Sm2 => ShaderVersion::new(2, 0),
        wgpu::ShaderModel::Sm4 => ShaderVersion::new(4, 0),
        wgpu::ShaderModel::Sm5 => ShaderVersion::new(5, 0),
    };
    let identity = AdapterIdentity {
        vendor_id: info.vendor,
        device_id: info.device,
        name: info.name.clone(),
        driver_version: parse_driver_version(&info.driver_info),
    };
    let caps = DeviceCaps {
        max_simultaneous_textures: limits.max_sampled_textures_per_shader_stage,
        pixel_shader: shader,
        vertex_shader: shader,
    };
    info!(
        "Adapter '{}' ({:04x}:{:04x}) shader model {}",
        identity.name, identity.vendor_id, identity.device_id, shader
    );
    (identity, caps)
}

/// Pack up to four dotted numeric components into 16-bit lanes.
///
/// "31.0.15.3623" becomes `0x001F_0000_000F_0E27`. Non-numeric text ends
/// the version.
pub fn parse_driver_version(text: &str) -> u64 {
    let digits = text.trim_start_matches(|c: char| !c.is_ascii_digit());
    let mut version = 0u64;
    let mut parts = 0;
    for part in digits.split('.').take(4) {
        let numeric: String = part.chars().take_while(char::is_ascii_digit).collect();
        let Ok(value) = numeric.parse::<u16>() else {
            break;
        };
        version = (version << 16) | value as u64;
        parts += 1;
        if numeric.len() != part.len() {
            break;
        }
    }
    if parts == 0 {
        return 0;
    }
    version << (16 * (4 - parts))
}
