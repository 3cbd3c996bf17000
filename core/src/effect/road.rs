//! Road variants.
//!
//! Roads are alpha-blended over terrain that is already drawn, so every
//! pass tests depth without writing it. Slots: 0 road texture, 1 cloud,
//! 2 light/noise.

use ridgeline_shared::{EffectId, ShaderHandle};
use wgpu::{AddressMode, BlendFactor, CompareFunction, FilterMode};

use super::{EffectVariant, InitContext, PassContext, ResetContext};
use crate::device::{Device, TextureLoader};
use crate::state::{BlendPair, StageArg, StageOp, TexCoordSource, TextureTransform};

/// Keeps only the destination where the source is dark.
const MASK_BLEND: BlendPair = BlendPair {
    src: BlendFactor::Zero,
    dst: BlendFactor::Src,
};

fn road_passes(effect: EffectId) -> Option<u32> {
    match effect {
        EffectId::RoadBase | EffectId::RoadBaseNoise1 | EffectId::RoadBaseNoise2 => Some(1),
        EffectId::RoadBaseNoise12 => Some(2),
        _ => None,
    }
}

/// Road texture on stage 0, modulated by vertex colour, blended without
/// depth writes.
fn road_base(ctx: &mut PassContext<'_>) {
    let texture = ctx.slot(0);
    let stage = ctx.stage(0);
    stage.texture = texture;
    stage
        .color(StageOp::Modulate, StageArg::Texture, StageArg::Diffuse)
        .alpha(StageOp::Modulate, StageArg::Texture, StageArg::Diffuse);
    stage.tex_coord = TexCoordSource::Vertex(0);
    stage.transform = TextureTransform::Disabled;

    let render = &mut ctx.state.render;
    render.depth_compare = CompareFunction::LessEqual;
    render.depth_write = false;
    render.blend = Some(BlendPair::ALPHA);
}

fn noise_mip(ctx: &PassContext<'_>) -> Option<FilterMode> {
    Some(if ctx.config.terrain.trilinear {
        FilterMode::Linear
    } else {
        FilterMode::Nearest
    })
}

/// Works everywhere: clouds or light in the second stage, and a second
/// pass when both are wanted.
#[derive(Debug, Default)]
pub struct RoadTwoStage;

impl EffectVariant for RoadTwoStage {
    fn name(&self) -> &'static str {
        "road-2-stage"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> bool {
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        road_passes(effect)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        road_base(ctx);
        let mip = noise_mip(ctx);
        let slots = *ctx.slots;
        // Roads reuse the terrain's cloud position without scrolling it.
        let cloud_matrix = ctx.cloud_matrix(false);
        let noise_matrix = ctx.noise_matrix();
        let (cloud, light) = ctx.effect.noise_layers();

        match ctx.pass {
            0 => {
                let stage = ctx.stage(1);
                if !cloud && !light {
                    stage.disable();
                    return true;
                }
                stage
                    .color(StageOp::Modulate, StageArg::Texture, StageArg::Current)
                    .alpha(StageOp::Modulate, StageArg::Texture, StageArg::Current)
                    .address(AddressMode::Repeat);
                if cloud {
                    stage.texture = slots[1];
                    stage.filter(FilterMode::Linear, FilterMode::Linear, mip);
                    stage.project(cloud_matrix);
                } else {
                    stage.texture = slots[2];
                    stage.filter(FilterMode::Nearest, FilterMode::Linear, mip);
                    stage.project(noise_matrix);
                }
                true
            }
            1 if cloud && light => {
                let [stage0, stage1, ..] = &mut ctx.state.stages;
                // White colour, road alpha: the light map only lands where
                // the road is opaque.
                stage0
                    .color(StageOp::SelectArg2, StageArg::Texture, StageArg::DiffuseAlpha)
                    .alpha(StageOp::SelectArg1, StageArg::Texture, StageArg::Diffuse);

                stage1.texture = slots[2];
                stage1
                    .filter(FilterMode::Nearest, FilterMode::Linear, mip)
                    .address(AddressMode::Repeat)
                    .color(StageOp::BlendCurrentAlpha, StageArg::Texture, StageArg::Current)
                    .alpha(StageOp::Disable, StageArg::Texture, StageArg::Current)
                    .project(noise_matrix);

                ctx.state.render.blend = Some(MASK_BLEND);
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stages(0..2);
        ctx.restore_render();
    }
}

/// Both noise layers in one pass. Only draws the full cloud and light
/// road; the other road effects fall through to [`RoadTwoStage`].
#[derive(Debug, Default)]
pub struct RoadPixelShader {
    fallback: RoadTwoStage,
    program: Option<ShaderHandle>,
}

impl EffectVariant for RoadPixelShader {
    fn name(&self) -> &'static str {
        "road-ps"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> bool {
        if !self.fallback.init(ctx) {
            return false;
        }
        self.program = ctx.create_pixel_shader("roadnoise2");
        self.program.is_some()
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        (effect == EffectId::RoadBaseNoise12).then_some(1)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        let Some(program) = self.program else {
            return false;
        };
        if ctx.pass != 0 {
            return false;
        }
        road_base(ctx);
        let mip = noise_mip(ctx);
        let slots = *ctx.slots;
        let cloud_matrix = ctx.cloud_matrix(false);
        let noise_matrix = ctx.noise_matrix();

        let [_, stage1, stage2, ..] = &mut ctx.state.stages;
        stage1.texture = slots[1];
        stage1
            .filter(FilterMode::Linear, FilterMode::Linear, mip)
            .address(AddressMode::Repeat)
            .project(cloud_matrix);
        stage2.texture = slots[2];
        stage2
            .filter(FilterMode::Nearest, FilterMode::Linear, mip)
            .address(AddressMode::Repeat)
            .project(noise_matrix);

        ctx.state.pixel_shader = program;
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stages(0..4);
        ctx.restore_render();
        ctx.restore_pixel_shader();
    }

    fn shutdown(&mut self, device: &mut dyn Device, _textures: &mut dyn TextureLoader) -> bool {
        if let Some(program) = self.program.take() {
            device.delete_pixel_shader(program);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::effect::{BoundTextureSlots, CloudScroll, PassOptions, SceneInputs};
    use crate::probe::CapabilityReport;
    use crate::state::GpuStateSnapshot;
    use crate::test_utils::{FakeDevice, FakeTextures};
    use glam::{Mat4, Vec2};
    use ridgeline_shared::{ChipsetId, TextureHandle};

    fn run(
        variant: &mut dyn EffectVariant,
        state: &mut GpuStateSnapshot,
        clouds: &mut CloudScroll,
        effect: EffectId,
        pass: u32,
    ) -> bool {
        let slots: BoundTextureSlots = std::array::from_fn(|i| TextureHandle(i as u32 + 20));
        let scene = SceneInputs {
            sync_time_ms: 10_000,
            ..SceneInputs::default()
        };
        let config = RenderConfig::default();
        variant.set_pass(&mut PassContext {
            effect,
            pass,
            options: PassOptions::default(),
            state,
            slots: &slots,
            scene: &scene,
            clouds,
            config: &config,
            view: Mat4::IDENTITY,
        })
    }

    #[test]
    fn roads_never_write_depth() {
        let mut state = GpuStateSnapshot::default();
        let mut clouds = CloudScroll::default();
        assert!(run(&mut RoadTwoStage, &mut state, &mut clouds, EffectId::RoadBase, 0));
        assert!(!state.render.depth_write);
        assert_eq!(state.render.depth_compare, CompareFunction::LessEqual);
        assert_eq!(state.render.blend, Some(BlendPair::ALPHA));
        assert_eq!(state.stages[1].color_op, StageOp::Disable);
    }

    #[test]
    fn road_cloud_pass_does_not_scroll_clouds() {
        let mut state = GpuStateSnapshot::default();
        let mut clouds = CloudScroll::default();
        clouds.offset = Vec2::new(0.3, 0.1);
        let before = clouds;
        assert!(run(&mut RoadTwoStage, &mut state, &mut clouds, EffectId::RoadBaseNoise1, 0));
        assert_eq!(clouds, before);
        assert_eq!(state.stages[1].texture, TextureHandle(21));
        assert_eq!(state.stages[1].tex_coord, TexCoordSource::CameraSpacePosition);
    }

    #[test]
    fn road_second_pass_masks_light_map() {
        let mut state = GpuStateSnapshot::default();
        let mut clouds = CloudScroll::default();
        let mut v = RoadTwoStage;
        assert!(run(&mut v, &mut state, &mut clouds, EffectId::RoadBaseNoise12, 0));
        assert!(run(&mut v, &mut state, &mut clouds, EffectId::RoadBaseNoise12, 1));
        assert_eq!(state.stages[1].texture, TextureHandle(22));
        assert_eq!(state.stages[1].color_op, StageOp::BlendCurrentAlpha);
        assert_eq!(state.render.blend, Some(MASK_BLEND));

        // Single-layer roads have no second pass.
        assert!(!run(&mut v, &mut state, &mut clouds, EffectId::RoadBaseNoise2, 1));
    }

    #[test]
    fn pixel_shader_road_claims_only_full_noise() {
        let v = RoadPixelShader::default();
        assert_eq!(v.pass_count(EffectId::RoadBaseNoise12), Some(1));
        assert_eq!(v.pass_count(EffectId::RoadBase), None);
        assert_eq!(v.pass_count(EffectId::RoadBaseNoise1), None);
    }

    #[test]
    fn pixel_shader_road_lifecycle() {
        let mut device = FakeDevice::with_pixel_shaders();
        let mut textures = FakeTextures::default();
        let caps = CapabilityReport {
            chipset: ChipsetId::GeForce4,
            ..CapabilityReport::UNKNOWN
        };
        let config = RenderConfig::default();
        let mut v = RoadPixelShader::default();
        assert!(v.init(&mut InitContext {
            device: &mut device,
            textures: &mut textures,
            caps: &caps,
            config: &config,
        }));

        let mut state = GpuStateSnapshot::default();
        let mut clouds = CloudScroll::default();
        assert!(run(&mut v, &mut state, &mut clouds, EffectId::RoadBaseNoise12, 0));
        assert!(state.pixel_shader.is_valid());
        assert_eq!(state.stages[2].texture, TextureHandle(22));

        assert!(v.shutdown(&mut device, &mut textures));
        assert!(device.live_shaders().is_empty());
    }
}
