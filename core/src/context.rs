//! Top-level owner of the effect layer.
//!
//! [`RenderContext`] holds the device, the texture loader and everything
//! negotiated against them, and ties their lifetimes to the device's.

use log::{debug, info, warn};
use ridgeline_shared::FilterId;

use crate::config::RenderConfig;
use crate::device::{Device, TextureLoader};
use crate::error::DeviceError;
use crate::filter::{FadeDirection, FilterManager};
use crate::manager::ShaderManager;
use crate::probe::CapabilityProbe;
use crate::shroud::ShroudRenderer;

/// Device, loader and the managers negotiated against them.
///
/// Everything that holds device resources is released on
/// [`on_device_lost`](Self::on_device_lost) and renegotiated from scratch
/// on [`on_device_restored`](Self::on_device_restored).
pub struct RenderContext<D: Device, T: TextureLoader> {
    device: D,
    textures: T,
    config: RenderConfig,
    probe: CapabilityProbe,
    shaders: ShaderManager,
    filters: FilterManager,
    shroud: ShroudRenderer,
}

impl<D: Device, T: TextureLoader> RenderContext<D, T> {
    pub fn new(device: D, textures: T, config: RenderConfig) -> Self {
        for warning in config.validate() {
            warn!("render config: {warning}");
        }
        Self {
            device,
            textures,
            probe: CapabilityProbe::new(config.device.chipset_override),
            config,
            shaders: ShaderManager::new(),
            filters: FilterManager::new(),
            shroud: ShroudRenderer::new(),
        }
    }

    /// Negotiate effects and filters against the current device.
    pub fn init(&mut self) {
        self.shaders.init(
            &mut self.device,
            &mut self.textures,
            &mut self.probe,
            &self.config,
        );
        self.filters.init(&mut self.device, &mut self.textures, &self.shaders);
        info!("Render context ready on {}", self.shaders.chipset());
    }

    /// Release every device resource and texture reference.
    pub fn shutdown(&mut self) {
        self.shroud.shutdown(&mut self.device, &mut self.shaders);
        self.filters.shutdown(&mut self.device, &mut self.textures);
        self.shaders
            .shutdown(&mut self.device, &mut self.textures, &mut self.probe);
    }

    /// The device is gone. Drop everything created on it; the shroud grid
    /// is kept for when it comes back.
    pub fn on_device_lost(&mut self) {
        info!("Device lost, releasing effect resources");
        self.shroud.release_resources(&mut self.device);
        self.filters.shutdown(&mut self.device, &mut self.textures);
        self.shaders
            .shutdown(&mut self.device, &mut self.textures, &mut self.probe);
    }

    /// The device was recreated, possibly on another adapter.
    pub fn on_device_restored(&mut self) -> Result<(), DeviceError> {
        info!("Device restored, renegotiating effects");
        self.init();
        self.shroud.reacquire_resources(&mut self.device)
    }

    /// Start a frame at `sync_time_ms`. Returns false while the device is
    /// lost; nothing should be drawn until it is restored.
    pub fn begin_frame(&mut self, sync_time_ms: u64) -> bool {
        if self.device.is_lost() {
            debug!("Device lost, skipping frame");
            return false;
        }
        self.shaders.begin_frame(sync_time_ms);
        true
    }

    /// Fade `filter` in or out over its configured number of frames.
    pub fn fade_filter(&mut self, filter: FilterId, direction: FadeDirection) {
        let frames = match filter {
            FilterId::ViewCrossFade => self.config.filters.crossfade_frames,
            _ => self.config.filters.bw_fade_frames,
        };
        self.filters.set_filter_fade(filter, direction, frames);
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replace the settings. A new chipset override applies at the next
    /// negotiation.
    pub fn set_config(&mut self, config: RenderConfig) {
        self.probe.set_override(config.device.chipset_override);
        self.shaders.set_config(&config);
        if let Some(grid) = self.shroud.grid_mut() {
            grid.set_config(&config.shroud);
        }
        self.config = config;
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn textures(&self) -> &T {
        &self.textures
    }

    pub fn shaders(&self) -> &ShaderManager {
        &self.shaders
    }

    pub fn filters(&self) -> &FilterManager {
        &self.filters
    }

    pub fn shroud(&self) -> &ShroudRenderer {
        &self.shroud
    }

    /// Borrow the device alongside the managers for a frame's draws.
    pub fn frame_mut(&mut self) -> FrameParts<'_, D> {
        FrameParts {
            device: &mut self.device,
            shaders: &mut self.shaders,
            filters: &mut self.filters,
            shroud: &mut self.shroud,
        }
    }
}

/// Disjoint borrows of a [`RenderContext`].
pub struct FrameParts<'a, D: Device> {
    pub device: &'a mut D,
    pub shaders: &'a mut ShaderManager,
    pub filters: &'a mut FilterManager,
    pub shroud: &'a mut ShroudRenderer,
}
