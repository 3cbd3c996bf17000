//! Effect variants and the contexts they run in.
//!
//! A variant is one hardware-specific way of drawing one or more logical
//! effects. Variants never touch the device state directly during a frame:
//! [`EffectVariant::set_pass`] and [`EffectVariant::reset`] edit a working
//! [`GpuStateSnapshot`] and the manager applies the difference.

mod catalog;
mod overlay;
mod projection;
mod road;
mod selection;
mod terrain;

pub use catalog::{CandidateList, EffectCatalog, VariantId};
pub use overlay::{CloudProjection, FlatShroudProjection, MaskProjectionVariant, ShroudProjectionVariant};
pub use projection::{CloudScroll, cloud_matrix, mask_matrix, noise_matrix, shroud_matrix};
pub use road::{RoadPixelShader, RoadTwoStage};
pub use selection::select;
pub use terrain::{EightStageTerrain, FlatPixelShader, FlatTwoStage, PixelShaderTerrain, TwoStageTerrain};

use glam::{Mat4, Vec2};
use ridgeline_shared::{
    ChipsetId, EffectId, MAX_TEXTURE_STAGES, ShaderHandle, TextureHandle,
};

use crate::config::RenderConfig;
use crate::device::{Device, TextureLoader};
use crate::probe::CapabilityReport;
use crate::state::{GpuStateSnapshot, StageState};

/// Texture handle per stage, written by consumers before `set_shader`.
pub type BoundTextureSlots = [TextureHandle; MAX_TEXTURE_STAGES];

/// Per-call options for effects drawn as overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassOptions {
    /// Texture stage an overlay effect draws into.
    pub stage: usize,
    /// Depth test for the shroud overlay, `None` keeps the variant default.
    pub depth_compare: Option<wgpu::CompareFunction>,
}

impl PassOptions {
    pub fn at_stage(stage: usize) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    pub fn with_depth_compare(mut self, compare: wgpu::CompareFunction) -> Self {
        self.depth_compare = Some(compare);
        self
    }
}

/// Where the shroud texture lies in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShroudProjection {
    pub texture: TextureHandle,
    pub cell_width: f32,
    pub cell_height: f32,
    /// World position of the first visible cell.
    pub draw_origin: Vec2,
    pub texture_width: u32,
    pub texture_height: u32,
}

/// Centre and fade of the crossfade mask.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaskProjection {
    /// World position the mask circle is centred on.
    pub center: Vec2,
    /// 0 starts the fade, 1 completes it.
    pub fade: f32,
    /// Pattern the crossfade reveals the new scene through.
    pub texture: TextureHandle,
}

/// Frame inputs variants read besides the bound textures.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SceneInputs {
    /// Frame timestamp in milliseconds, drives cloud scrolling.
    pub sync_time_ms: u64,
    /// Present while a map with fog of war is loaded.
    pub shroud: Option<ShroudProjection>,
    pub mask: MaskProjection,
}

/// What a variant sees during negotiation.
pub struct InitContext<'a> {
    pub device: &'a mut dyn Device,
    pub textures: &'a mut dyn TextureLoader,
    pub caps: &'a CapabilityReport,
    pub config: &'a RenderConfig,
}

impl InitContext<'_> {
    pub fn chipset(&self) -> ChipsetId {
        self.caps.chipset
    }

    /// Create a pixel-shader program, or `None` when the hardware has no
    /// pixel shaders or the device refuses the program.
    pub fn create_pixel_shader(&mut self, program: &str) -> Option<ShaderHandle> {
        if !self.chipset().has_pixel_shaders() {
            return None;
        }
        match self.device.create_pixel_shader(program) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::debug!("{e}");
                None
            }
        }
    }

    /// Create every program in `programs`, deleting the ones already made
    /// if any fails.
    pub fn create_pixel_shaders<const N: usize>(
        &mut self,
        programs: [&str; N],
    ) -> Option<[ShaderHandle; N]> {
        let mut handles = [ShaderHandle::INVALID; N];
        for (i, program) in programs.iter().enumerate() {
            match self.create_pixel_shader(program) {
                Some(handle) => handles[i] = handle,
                None => {
                    for created in &handles[..i] {
                        self.device.delete_pixel_shader(*created);
                    }
                    return None;
                }
            }
        }
        Some(handles)
    }
}

/// What a variant sees while configuring one pass.
pub struct PassContext<'a> {
    pub effect: EffectId,
    pub pass: u32,
    pub options: PassOptions,
    /// Working copy, diffed against the device afterwards.
    pub state: &'a mut GpuStateSnapshot,
    pub slots: &'a BoundTextureSlots,
    pub scene: &'a SceneInputs,
    pub clouds: &'a mut CloudScroll,
    pub config: &'a RenderConfig,
    /// Camera view transform at the time of the call.
    pub view: Mat4,
}

impl PassContext<'_> {
    pub fn slot(&self, stage: usize) -> TextureHandle {
        self.slots[stage]
    }

    pub fn stage(&mut self, stage: usize) -> &mut StageState {
        &mut self.state.stages[stage]
    }

    /// Cloud projection, scrolling the clouds first when `advance` is set.
    pub fn cloud_matrix(&mut self, advance: bool) -> Mat4 {
        if advance {
            self.clouds
                .advance(self.scene.sync_time_ms, self.config.terrain.cloud_slide_per_second);
        }
        cloud_matrix(self.clouds.offset, self.view)
    }

    pub fn noise_matrix(&self) -> Mat4 {
        noise_matrix(self.view)
    }

    pub fn shroud_matrix(&self) -> Option<Mat4> {
        self.scene.shroud.map(|s| shroud_matrix(&s, self.view))
    }
}

/// What a variant sees while undoing its passes.
pub struct ResetContext<'a> {
    pub effect: EffectId,
    pub options: PassOptions,
    pub state: &'a mut GpuStateSnapshot,
    /// Device state captured before the effect's first pass.
    pub baseline: &'a GpuStateSnapshot,
}

impl ResetContext<'_> {
    pub fn restore_stage(&mut self, stage: usize) {
        self.state.stages[stage] = self.baseline.stages[stage];
    }

    pub fn restore_stages(&mut self, stages: std::ops::Range<usize>) {
        for stage in stages {
            self.restore_stage(stage);
        }
    }

    pub fn restore_render(&mut self) {
        self.state.render = self.baseline.render;
    }

    pub fn restore_pixel_shader(&mut self) {
        self.state.pixel_shader = self.baseline.pixel_shader;
        self.state.pixel_constants = self.baseline.pixel_constants;
    }
}

/// One hardware-specific implementation of one or more effects.
///
/// Variants live for the whole process. `init` runs once per negotiation
/// and must leave nothing allocated when it fails; `shutdown` is only
/// called on variants that were selected.
pub trait EffectVariant {
    /// Name used in logs and the capability report.
    fn name(&self) -> &'static str;

    /// Validate the hardware and allocate one-time resources.
    fn init(&mut self, ctx: &mut InitContext<'_>) -> bool;

    /// Passes needed for `effect`, or `None` if this variant does not draw it.
    fn pass_count(&self, effect: EffectId) -> Option<u32>;

    /// Configure the working state for `ctx.pass` of `ctx.effect`.
    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool;

    /// Restore what `set_pass` changed.
    fn reset(&mut self, ctx: &mut ResetContext<'_>);

    /// Release resources from `init`.
    fn shutdown(&mut self, _device: &mut dyn Device, _textures: &mut dyn TextureLoader) -> bool {
        true
    }
}

/// Filter settings shared by the terrain variants.
///
/// Returns `(min_mag, mip)` for the base stages.
pub(crate) fn terrain_filters(config: &RenderConfig) -> (wgpu::FilterMode, wgpu::FilterMode) {
    let min_mag = if config.terrain.linear_filtering() {
        wgpu::FilterMode::Linear
    } else {
        wgpu::FilterMode::Nearest
    };
    let mip = if config.terrain.trilinear {
        wgpu::FilterMode::Linear
    } else {
        wgpu::FilterMode::Nearest
    };
    (min_mag, mip)
}
