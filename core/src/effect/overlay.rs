//! Single-pass overlays projected onto geometry that is already drawn:
//! the shroud, the crossfade mask and the cloud layer.
//!
//! Overlays draw into the texture stage named by [`PassOptions::stage`]
//! so they can be stacked on top of another effect's stages.
//!
//! [`PassOptions::stage`]: super::PassOptions::stage

use glam::Mat4;
use ridgeline_shared::{EffectId, MAX_TEXTURE_STAGES};
use wgpu::{AddressMode, CompareFunction, FilterMode};

use super::{EffectVariant, InitContext, PassContext, ResetContext, mask_matrix};
use crate::state::{ShaderPreset, StageArg, StageOp, TexCoordSource};

fn single_pass(served: EffectId, effect: EffectId) -> Option<u32> {
    (served == effect).then_some(1)
}

/// Stage requested by the caller, or `None` when out of range.
fn target_stage(ctx: &PassContext<'_>) -> Option<usize> {
    (ctx.options.stage < MAX_TEXTURE_STAGES).then_some(ctx.options.stage)
}

/// Fog-of-war shroud multiplied over terrain, water and roads.
///
/// The shroud texture is always bound in slot 0 whichever stage it is
/// drawn on. Depth defaults to an equal test so only pixels already drawn
/// this frame are darkened.
#[derive(Debug, Default)]
pub struct ShroudProjectionVariant;

impl EffectVariant for ShroudProjectionVariant {
    fn name(&self) -> &'static str {
        "shroud"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> bool {
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        single_pass(EffectId::ShroudTexture, effect)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        let Some(stage) = target_stage(ctx) else {
            return false;
        };
        let texture = ctx.slot(0);
        let matrix = ctx.shroud_matrix();

        if stage == 0 {
            ctx.state.render.preset = if ctx.config.shroud.fog_of_war {
                ShaderPreset::AlphaSprite
            } else {
                ShaderPreset::MultiplicativeSprite
            };
        }
        ctx.state.render.depth_compare = ctx.options.depth_compare.unwrap_or(CompareFunction::Equal);
        let filter = if ctx.config.shroud.filter {
            FilterMode::Linear
        } else {
            FilterMode::Nearest
        };

        let s = ctx.stage(stage);
        s.texture = texture;
        s.color(StageOp::Modulate, StageArg::Texture, StageArg::Current)
            .alpha(StageOp::SelectArg2, StageArg::Texture, StageArg::Current)
            .address(AddressMode::ClampToEdge)
            .filter(filter, filter, None);
        match matrix {
            Some(matrix) => {
                s.project(matrix);
            }
            // Without a loaded map the shroud has nowhere to go.
            None => s.tex_coord = TexCoordSource::CameraSpacePosition,
        }
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.options.stage < MAX_TEXTURE_STAGES {
            ctx.restore_stage(ctx.options.stage);
        }
        ctx.restore_render();
    }
}

/// Shroud folded into a flat-terrain stage instead of drawn as its own
/// blended pass. The texture comes from the slot matching the stage.
#[derive(Debug, Default)]
pub struct FlatShroudProjection;

impl EffectVariant for FlatShroudProjection {
    fn name(&self) -> &'static str {
        "flat-shroud"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> bool {
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        single_pass(EffectId::FlatShroudTexture, effect)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        let Some(stage) = target_stage(ctx) else {
            return false;
        };
        let texture = ctx.slot(stage);
        let matrix = ctx.shroud_matrix();

        let s = ctx.stage(stage);
        s.texture = texture;
        s.color(StageOp::Modulate, StageArg::Texture, StageArg::Current)
            .alpha(StageOp::Disable, StageArg::Texture, StageArg::Current);
        match matrix {
            Some(matrix) => {
                s.project(matrix);
            }
            None => s.tex_coord = TexCoordSource::CameraSpacePosition,
        }
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.options.stage < MAX_TEXTURE_STAGES {
            ctx.restore_stage(ctx.options.stage);
        }
        ctx.restore_render();
    }
}

/// Crossfade mask projected onto the terrain around the view centre.
#[derive(Debug, Default)]
pub struct MaskProjectionVariant;

impl EffectVariant for MaskProjectionVariant {
    fn name(&self) -> &'static str {
        "mask"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> bool {
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        single_pass(EffectId::MaskTexture, effect)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        let mask = ctx.scene.mask;
        let matrix: Mat4 = mask_matrix(mask.center, mask.fade, ctx.view);

        ctx.state.render.preset = ShaderPreset::Opaque;
        ctx.state.render.primary_gradient = false;

        let s = ctx.stage(0);
        s.texture = mask.texture;
        s.project(matrix);
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stage(0);
        ctx.restore_render();
    }
}

/// Cloud shadows for objects that sit on the terrain but are not part of
/// it. The cloud position is read, never advanced.
#[derive(Debug, Default)]
pub struct CloudProjection;

impl EffectVariant for CloudProjection {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> bool {
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        single_pass(EffectId::CloudTexture, effect)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        let Some(stage) = target_stage(ctx) else {
            return false;
        };
        let texture = ctx.slot(stage);
        let matrix = ctx.cloud_matrix(false);

        let s = ctx.stage(stage);
        let mip = s.mip_filter;
        s.texture = texture;
        s.filter(FilterMode::Linear, FilterMode::Linear, mip)
            .address(AddressMode::Repeat)
            .color(StageOp::Modulate, StageArg::Texture, StageArg::Current)
            .alpha(StageOp::Modulate, StageArg::Texture, StageArg::Current)
            .project(matrix);
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        if ctx.options.stage < MAX_TEXTURE_STAGES {
            ctx.restore_stage(ctx.options.stage);
        }
    }
}
