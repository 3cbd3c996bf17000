//! Terrain variants: the full terrain list and the flat (cliff-less) list.
//!
//! Slot layout for terrain: 0 and 1 hold the two base blend textures, 2 the
//! cloud texture, 3 the light/noise texture. Flat terrain uses 0 for the
//! shroud, 1 for the base texture, 2 and 3 as above.

use ridgeline_shared::{ChipsetId, EffectId, ShaderHandle};
use wgpu::{AddressMode, FilterMode};

use super::{
    EffectVariant, InitContext, PassContext, ResetContext, terrain_filters,
};
use crate::device::{Device, TextureLoader};
use crate::state::{BlendPair, StageArg, StageOp, StageState, TexCoordSource, TextureTransform};

use StageArg::{Current, Diffuse, DiffuseAlpha, Factor, Texture};
use StageOp::{Add, Disable, Modulate, SelectArg1, SelectArg2};

fn terrain_passes(effect: EffectId, base: u32, noise: u32) -> Option<u32> {
    match effect {
        EffectId::TerrainBase => Some(base),
        EffectId::TerrainBaseNoise1 | EffectId::TerrainBaseNoise2 | EffectId::TerrainBaseNoise12 => {
            Some(noise)
        }
        _ => None,
    }
}

fn flat_passes(effect: EffectId, base: u32, noise: u32) -> Option<u32> {
    match effect {
        EffectId::FlatTerrainBase => Some(base),
        EffectId::FlatTerrainBaseNoise1
        | EffectId::FlatTerrainBaseNoise2
        | EffectId::FlatTerrainBaseNoise12 => Some(noise),
        _ => None,
    }
}

/// Pass-through uv set `set` with no transform.
fn uv_set(stage: &mut StageState, set: u8) {
    stage.tex_coord = TexCoordSource::Vertex(set);
    stage.transform = TextureTransform::Disabled;
}

/// Min/mag/mip filtering of the two base stages from the quality settings.
fn base_filters(ctx: &mut PassContext<'_>, stage1_mip: FilterMode) {
    let (min_mag, mip) = terrain_filters(ctx.config);
    let stage1_mip = if ctx.config.terrain.trilinear {
        FilterMode::Linear
    } else {
        stage1_mip
    };
    ctx.stage(0).filter(min_mag, min_mag, Some(mip));
    ctx.stage(1).filter(min_mag, min_mag, Some(stage1_mip));
}

/// Multiply the cloud and/or light layer into the frame buffer.
///
/// Shared by every multi-pass terrain variant as its last pass.
fn noise_pass(ctx: &mut PassContext<'_>) -> bool {
    let (cloud, light) = match ctx.effect.noise_layers() {
        (false, false) => return false,
        layers => layers,
    };
    let slots = *ctx.slots;
    let cloud_matrix = ctx.cloud_matrix(cloud);
    let noise_matrix = ctx.noise_matrix();

    ctx.state.render.blend = Some(BlendPair::MULTIPLY);
    let [stage0, stage1, ..] = &mut ctx.state.stages;
    stage0
        .color(SelectArg1, Texture, Diffuse)
        .alpha(Disable, Texture, Diffuse)
        .address(AddressMode::Repeat);

    if cloud && light {
        stage0.texture = slots[2];
        stage0.min_filter = FilterMode::Linear;
        stage0.mag_filter = FilterMode::Linear;
        stage0.project(cloud_matrix);

        stage1.texture = slots[3];
        stage1.min_filter = FilterMode::Nearest;
        stage1.mag_filter = FilterMode::Linear;
        stage1
            .color(Modulate, Texture, Current)
            .alpha(Disable, Texture, Current)
            .address(AddressMode::Repeat)
            .project(noise_matrix);
    } else {
        if cloud {
            stage0.texture = slots[2];
            stage0.min_filter = FilterMode::Linear;
            stage0.mag_filter = FilterMode::Linear;
            stage0.project(cloud_matrix);
        } else {
            stage0.texture = slots[3];
            stage0.min_filter = FilterMode::Nearest;
            stage0.mag_filter = FilterMode::Linear;
            stage0.project(noise_matrix);
        }
        stage1.disable();
    }
    true
}

// ============================================================================
// Terrain
// ============================================================================

/// Fallback that runs on any hardware: base, blend, then noise as separate
/// passes.
#[derive(Debug, Default)]
pub struct TwoStageTerrain;

impl EffectVariant for TwoStageTerrain {
    fn name(&self) -> &'static str {
        "terrain-2-stage"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> bool {
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        terrain_passes(effect, 2, 3)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        base_filters(ctx, FilterMode::Linear);
        match ctx.pass {
            0 => {
                let texture = ctx.slot(0);
                let stage = ctx.stage(0);
                stage.texture = texture;
                stage
                    .address(AddressMode::ClampToEdge)
                    .color(Modulate, Texture, Diffuse)
                    .alpha(Disable, Texture, Diffuse);
                uv_set(stage, 0);
                ctx.stage(1).disable();
                ctx.state.render.blend = None;
                true
            }
            1 => {
                let texture = ctx.slot(1);
                let stage = ctx.stage(0);
                stage.texture = texture;
                stage
                    .address(AddressMode::ClampToEdge)
                    .color(Modulate, Texture, Diffuse)
                    .alpha(Modulate, Texture, Diffuse);
                uv_set(stage, 1);
                ctx.stage(1).disable();
                ctx.state.render.blend = Some(BlendPair::ALPHA);
                true
            }
            2 => noise_pass(ctx),
            _ => false,
        }
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stages(0..2);
        ctx.restore_render();
    }
}

/// Single combiner pass for the two base textures on NVIDIA register
/// combiner hardware, plus one noise pass.
#[derive(Debug, Default)]
pub struct EightStageTerrain {
    fallback: TwoStageTerrain,
}

impl EffectVariant for EightStageTerrain {
    fn name(&self) -> &'static str {
        "terrain-8-stage"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> bool {
        self.fallback.init(ctx) && (ChipsetId::Tnt..=ChipsetId::GeForce2).contains(&ctx.chipset())
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        terrain_passes(effect, 1, 2)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        if ctx.pass > 0 {
            ctx.stage(2).disable();
            ctx.stage(3).disable();
            return self.fallback.set_pass(&mut PassContext { pass: 2, ..reborrow(ctx) });
        }

        base_filters(ctx, FilterMode::Linear);
        let slots = *ctx.slots;
        let stages = &mut ctx.state.stages;

        stages[0].texture = slots[0];
        stages[0]
            .address(AddressMode::ClampToEdge)
            .color(Modulate, Texture, Diffuse)
            .alpha(Modulate, Texture, Diffuse);
        uv_set(&mut stages[0], 0);

        // Second texture blended in by vertex alpha.
        stages[1].texture = slots[1];
        stages[1]
            .address(AddressMode::ClampToEdge)
            .color(Add, DiffuseAlpha, Diffuse)
            .alpha(Add, Factor, Factor);
        uv_set(&mut stages[1], 1);

        let combiner = [
            (Modulate, (Texture, Texture), Modulate, (Factor, Factor)),
            (SelectArg1, (DiffuseAlpha, Diffuse), SelectArg1, (Factor, Factor)),
            (Modulate, (Current, Diffuse), Modulate, (Current, Diffuse)),
            (Add, (Diffuse, Diffuse), Add, (Factor, Factor)),
            (Modulate, (Factor, Factor), Modulate, (Factor, Factor)),
            (SelectArg1, (Factor, Factor), SelectArg1, (Factor, Factor)),
        ];
        for (i, (color_op, color_args, alpha_op, alpha_args)) in combiner.into_iter().enumerate() {
            let stage = &mut stages[i + 2];
            stage.texture = Default::default();
            stage
                .color(color_op, color_args.0, color_args.1)
                .alpha(alpha_op, alpha_args.0, alpha_args.1);
            uv_set(stage, (i + 2) as u8);
        }
        ctx.state.render.blend = None;
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stages(0..ridgeline_shared::MAX_TEXTURE_STAGES);
        ctx.restore_render();
    }
}

/// Shorter-lived copy of a pass context for delegating to a sibling variant.
fn reborrow<'b>(ctx: &'b mut PassContext<'_>) -> PassContext<'b> {
    PassContext {
        effect: ctx.effect,
        pass: ctx.pass,
        options: ctx.options,
        state: &mut *ctx.state,
        slots: ctx.slots,
        scene: ctx.scene,
        clouds: &mut *ctx.clouds,
        config: ctx.config,
        view: ctx.view,
    }
}

#[derive(Debug, Clone, Copy)]
struct TerrainPrograms {
    base: ShaderHandle,
    noise1: ShaderHandle,
    noise2: ShaderHandle,
}

/// Everything in one pass with a pixel shader per noise combination.
#[derive(Debug, Default)]
pub struct PixelShaderTerrain {
    fallback: TwoStageTerrain,
    programs: Option<TerrainPrograms>,
}

impl EffectVariant for PixelShaderTerrain {
    fn name(&self) -> &'static str {
        "terrain-ps"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> bool {
        if !self.fallback.init(ctx) || !ctx.chipset().has_pixel_shaders() {
            return false;
        }
        let Some([base, noise1, noise2]) =
            ctx.create_pixel_shaders(["terrain", "terrainnoise", "terrainnoise2"])
        else {
            return false;
        };
        self.programs = Some(TerrainPrograms { base, noise1, noise2 });
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        terrain_passes(effect, 1, 1)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        let Some(programs) = self.programs else {
            return false;
        };
        let slots = *ctx.slots;
        for i in 0..2 {
            let stage = ctx.stage(i);
            stage.texture = slots[i];
            stage.address(AddressMode::ClampToEdge);
            uv_set(stage, i as u8);
        }
        base_filters(ctx, FilterMode::Linear);

        let (cloud, light) = ctx.effect.noise_layers();
        let cloud_matrix = ctx.cloud_matrix(cloud);
        let noise_matrix = ctx.noise_matrix();
        let [_, _, stage2, stage3, ..] = &mut ctx.state.stages;

        ctx.state.pixel_shader = match (cloud, light) {
            (false, false) => programs.base,
            (true, true) => {
                stage2.texture = slots[2];
                stage2.min_filter = FilterMode::Linear;
                stage2.mag_filter = FilterMode::Linear;
                stage2.address(AddressMode::Repeat).project(cloud_matrix);

                stage3.texture = slots[3];
                stage3.min_filter = FilterMode::Nearest;
                stage3.mag_filter = FilterMode::Linear;
                stage3.address(AddressMode::Repeat).project(noise_matrix);
                programs.noise2
            }
            (true, false) => {
                stage2.texture = slots[2];
                stage2.min_filter = FilterMode::Linear;
                stage2.mag_filter = FilterMode::Linear;
                stage2.address(AddressMode::Repeat).project(cloud_matrix);
                programs.noise1
            }
            (false, true) => {
                stage2.texture = slots[3];
                stage2.min_filter = FilterMode::Nearest;
                stage2.mag_filter = FilterMode::Linear;
                stage2.address(AddressMode::Repeat).project(noise_matrix);
                programs.noise1
            }
        };
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stages(0..4);
        ctx.restore_pixel_shader();
    }

    fn shutdown(&mut self, device: &mut dyn Device, _textures: &mut dyn TextureLoader) -> bool {
        if let Some(programs) = self.programs.take() {
            device.delete_pixel_shader(programs.base);
            device.delete_pixel_shader(programs.noise1);
            device.delete_pixel_shader(programs.noise2);
        }
        true
    }
}

// ============================================================================
// Flat terrain
// ============================================================================

/// Flat terrain: shroud and base texture in one pass, noise in a second.
#[derive(Debug, Default)]
pub struct FlatTwoStage;

impl EffectVariant for FlatTwoStage {
    fn name(&self) -> &'static str {
        "flat-terrain-2-stage"
    }

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> bool {
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        flat_passes(effect, 1, 2)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        base_filters(ctx, FilterMode::Nearest);
        match ctx.pass {
            0 => {
                let slots = *ctx.slots;
                let shroud = ctx.shroud_matrix();
                let [stage0, stage1, ..] = &mut ctx.state.stages;

                stage0.address(AddressMode::ClampToEdge);
                if slots[0].is_valid() {
                    stage0.texture = slots[0];
                    stage0.color(Modulate, Texture, Current);
                    match shroud {
                        Some(matrix) => {
                            stage0.project(matrix);
                        }
                        None => stage0.tex_coord = TexCoordSource::CameraSpacePosition,
                    }
                } else {
                    stage0.color(SelectArg2, Texture, Diffuse);
                    uv_set(stage0, 0);
                }
                stage0.alpha(Disable, Texture, Current);

                stage1.texture = slots[1];
                stage1
                    .address(AddressMode::ClampToEdge)
                    .color(Modulate, Texture, Current)
                    .alpha(Disable, Texture, Current);
                uv_set(stage1, 0);

                ctx.state.render.blend = None;
                true
            }
            1 => noise_pass(&mut flat_as_terrain(ctx)),
            _ => false,
        }
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stages(0..2);
        ctx.restore_render();
    }
}

/// Terrain effect with the same noise layers as a flat terrain effect.
fn as_terrain(effect: EffectId) -> EffectId {
    match effect {
        EffectId::FlatTerrainBaseNoise1 => EffectId::TerrainBaseNoise1,
        EffectId::FlatTerrainBaseNoise2 => EffectId::TerrainBaseNoise2,
        EffectId::FlatTerrainBaseNoise12 => EffectId::TerrainBaseNoise12,
        _ => EffectId::TerrainBase,
    }
}

/// The noise pass keys off terrain effect ids.
fn flat_as_terrain<'b>(ctx: &'b mut PassContext<'_>) -> PassContext<'b> {
    let effect = as_terrain(ctx.effect);
    PassContext { effect, ..reborrow(ctx) }
}

/// Next free stage around the base texture on stage 1.
fn claim_stage(next: &mut usize) -> usize {
    let stage = *next;
    *next += if stage == 0 { 2 } else { 1 };
    stage
}

#[derive(Debug, Clone, Copy)]
struct FlatPrograms {
    /// Base texture only.
    base0: ShaderHandle,
    /// Base plus one projected layer.
    base: ShaderHandle,
    noise1: ShaderHandle,
    noise2: ShaderHandle,
}

/// Flat terrain in one pass. Projected layers (shroud, cloud, light) pack
/// into the free stages around the base texture on stage 1, and the
/// program is chosen by how many stages ended up in use.
#[derive(Debug, Default)]
pub struct FlatPixelShader {
    fallback: FlatTwoStage,
    programs: Option<FlatPrograms>,
}

impl EffectVariant for FlatPixelShader {
    fn name(&self) -> &'static str {
        "flat-terrain-ps"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> bool {
        if !self.fallback.init(ctx) || !ctx.chipset().has_pixel_shaders() {
            return false;
        }
        let Some([base0, base, noise1, noise2]) =
            ctx.create_pixel_shaders(["fterrain0", "fterrain", "fterrainnoise", "fterrainnoise2"])
        else {
            return false;
        };
        self.programs = Some(FlatPrograms { base0, base, noise1, noise2 });
        true
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        flat_passes(effect, 1, 1)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        let Some(programs) = self.programs else {
            return false;
        };
        let slots = *ctx.slots;
        let (min_mag, mip) = terrain_filters(ctx.config);
        let (cloud, light) = as_terrain(ctx.effect).noise_layers();
        let cloud_matrix = ctx.cloud_matrix(cloud);
        let noise_matrix = ctx.noise_matrix();
        let shroud = ctx
            .scene
            .shroud
            .map(|s| (s.texture, super::shroud_matrix(&s, ctx.view)));
        let stages = &mut ctx.state.stages;

        stages[0].address(AddressMode::ClampToEdge);
        let base = &mut stages[1];
        base.texture = slots[1];
        base.address(AddressMode::ClampToEdge)
            .filter(min_mag, min_mag, Some(mip));
        uv_set(base, 0);

        let mut next = 0;
        let mut layers = smallvec::SmallVec::<[_; 3]>::new();
        if let Some((texture, matrix)) = shroud {
            layers.push((texture, AddressMode::ClampToEdge, matrix));
        }
        if cloud {
            layers.push((slots[2], AddressMode::Repeat, cloud_matrix));
        }
        if light {
            layers.push((slots[3], AddressMode::Repeat, noise_matrix));
        }
        for (texture, address, matrix) in layers {
            let s = &mut stages[claim_stage(&mut next)];
            s.texture = texture;
            s.min_filter = FilterMode::Linear;
            s.mag_filter = FilterMode::Linear;
            s.address(address).project(matrix);
        }

        ctx.state.pixel_shader = match next {
            0 | 1 => programs.base0,
            2 => programs.base,
            3 => programs.noise1,
            _ => programs.noise2,
        };
        ctx.state.render.blend = None;
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        ctx.restore_stages(0..4);
        ctx.restore_render();
        ctx.restore_pixel_shader();
    }

    fn shutdown(&mut self, device: &mut dyn Device, _textures: &mut dyn TextureLoader) -> bool {
        if let Some(p) = self.programs.take() {
            for program in [p.base0, p.base, p.noise1, p.noise2] {
                device.delete_pixel_shader(program);
            }
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
    use glam::Mat4;
    use ridgeline_shared::TextureHandle;

    fn slots() -> BoundTextureSlots {
        std::array::from_fn(|i| TextureHandle(i as u32 + 10))
    }

    struct Rig {
        state: GpuStateSnapshot,
        slots: BoundTextureSlots,
        scene: SceneInputs,
        clouds: CloudScroll,
        config: RenderConfig,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                state: GpuStateSnapshot::default(),
                slots: slots(),
                scene: SceneInputs::default(),
                clouds: CloudScroll::default(),
                config: RenderConfig::default(),
            }
        }

        fn run(&mut self, variant: &mut dyn EffectVariant, effect: EffectId, pass: u32) -> bool {
            variant.set_pass(&mut PassContext {
                effect,
                pass,
                options: PassOptions::default(),
                state: &mut self.state,
                slots: &self.slots,
                scene: &self.scene,
                clouds: &mut self.clouds,
                config: &self.config,
                view: Mat4::IDENTITY,
            })
        }
    }

    fn init(variant: &mut dyn EffectVariant, device: &mut FakeDevice, chipset: ChipsetId) -> bool {
        let mut textures = FakeTextures::default();
        let caps = CapabilityReport {
            chipset,
            ..CapabilityReport::UNKNOWN
        };
        let config = RenderConfig::default();
        variant.init(&mut InitContext {
            device,
            textures: &mut textures,
            caps: &caps,
            config: &config,
        })
    }

    // ========================================================================
    // Two-stage
    // ========================================================================

    #[test]
    fn two_stage_pass_counts() {
        let v = TwoStageTerrain;
        assert_eq!(v.pass_count(EffectId::TerrainBase), Some(2));
        assert_eq!(v.pass_count(EffectId::TerrainBaseNoise12), Some(3));
        assert_eq!(v.pass_count(EffectId::RoadBase), None);
    }

    #[test]
    fn two_stage_base_then_blend() {
        let mut rig = Rig::new();
        let mut v = TwoStageTerrain;

        assert!(rig.run(&mut v, EffectId::TerrainBase, 0));
        assert_eq!(rig.state.stages[0].texture, TextureHandle(10));
        assert_eq!(rig.state.stages[0].address_u, AddressMode::ClampToEdge);
        assert_eq!(rig.state.render.blend, None);

        assert!(rig.run(&mut v, EffectId::TerrainBase, 1));
        assert_eq!(rig.state.stages[0].texture, TextureHandle(11));
        assert_eq!(rig.state.stages[0].tex_coord, TexCoordSource::Vertex(1));
        assert_eq!(rig.state.render.blend, Some(BlendPair::ALPHA));
    }

    #[test]
    fn two_stage_noise_pass_projects_cloud_and_light() {
        let mut rig = Rig::new();
        let mut v = TwoStageTerrain;
        assert!(rig.run(&mut v, EffectId::TerrainBaseNoise12, 2));

        let [s0, s1, ..] = rig.state.stages;
        assert_eq!(s0.texture, TextureHandle(12));
        assert_eq!(s0.tex_coord, TexCoordSource::CameraSpacePosition);
        assert_eq!(s0.color_op, SelectArg1);
        assert_eq!(s1.texture, TextureHandle(13));
        assert_eq!(s1.min_filter, FilterMode::Nearest);
        assert_eq!(s1.color_op, Modulate);
        assert_eq!(rig.state.render.blend, Some(BlendPair::MULTIPLY));
    }

    #[test]
    fn two_stage_light_only_uses_noise_slot() {
        let mut rig = Rig::new();
        assert!(rig.run(&mut TwoStageTerrain, EffectId::TerrainBaseNoise2, 2));
        assert_eq!(rig.state.stages[0].texture, TextureHandle(13));
        assert_eq!(rig.state.stages[1].color_op, Disable);
    }

    #[test]
    fn base_effect_has_no_noise_pass() {
        let mut rig = Rig::new();
        assert!(!rig.run(&mut TwoStageTerrain, EffectId::TerrainBase, 2));
    }

    #[test]
    fn point_filtering_when_bilinear_off() {
        let mut rig = Rig::new();
        rig.config.terrain.bilinear = false;
        rig.run(&mut TwoStageTerrain, EffectId::TerrainBase, 0);
        assert_eq!(rig.state.stages[0].min_filter, FilterMode::Nearest);
        assert_eq!(rig.state.stages[0].mip_filter, Some(FilterMode::Nearest));
        assert_eq!(rig.state.stages[1].mip_filter, Some(FilterMode::Linear));
    }

    // ========================================================================
    // Eight-stage
    // ========================================================================

    #[test]
    fn eight_stage_only_on_register_combiner_parts() {
        let mut device = FakeDevice::fixed_function();
        let mut v = EightStageTerrain::default();
        assert!(!init(&mut v, &mut device, ChipsetId::Unknown));
        assert!(!init(&mut v, &mut device, ChipsetId::GeForce3));
        assert!(init(&mut v, &mut device, ChipsetId::Tnt2));
        assert!(init(&mut v, &mut device, ChipsetId::GeForce2));
    }

    #[test]
    fn eight_stage_second_pass_is_noise_pass() {
        let mut rig = Rig::new();
        let mut v = EightStageTerrain::default();
        assert!(rig.run(&mut v, EffectId::TerrainBaseNoise1, 0));
        assert_eq!(rig.state.stages[1].texture, TextureHandle(11));
        assert_eq!(rig.state.stages[4].color_op, Modulate);

        assert!(rig.run(&mut v, EffectId::TerrainBaseNoise1, 1));
        assert_eq!(rig.state.stages[2].color_op, Disable);
        assert_eq!(rig.state.stages[3].color_op, Disable);
        assert_eq!(rig.state.stages[0].texture, TextureHandle(12));
        assert_eq!(rig.state.render.blend, Some(BlendPair::MULTIPLY));
    }

    // ========================================================================
    // Pixel shader
    // ========================================================================

    #[test]
    fn pixel_shader_needs_ps_chipset() {
        let mut device = FakeDevice::with_pixel_shaders();
        let mut v = PixelShaderTerrain::default();
        assert!(!init(&mut v, &mut device, ChipsetId::GeForce2));
        assert!(device.created_shaders().is_empty());

        assert!(init(&mut v, &mut device, ChipsetId::GenericPs11));
        assert_eq!(device.created_shaders(), ["terrain", "terrainnoise", "terrainnoise2"]);
    }

    #[test]
    fn pixel_shader_picks_program_per_effect() {
        let mut device = FakeDevice::with_pixel_shaders();
        let mut v = PixelShaderTerrain::default();
        assert!(init(&mut v, &mut device, ChipsetId::GeForce3));
        let programs = v.programs.unwrap();

        let mut rig = Rig::new();
        rig.run(&mut v, EffectId::TerrainBase, 0);
        assert_eq!(rig.state.pixel_shader, programs.base);

        rig.run(&mut v, EffectId::TerrainBaseNoise2, 0);
        assert_eq!(rig.state.pixel_shader, programs.noise1);
        assert_eq!(rig.state.stages[2].texture, TextureHandle(13));

        rig.run(&mut v, EffectId::TerrainBaseNoise12, 0);
        assert_eq!(rig.state.pixel_shader, programs.noise2);
        assert_eq!(rig.state.stages[3].tex_coord, TexCoordSource::CameraSpacePosition);
    }

    #[test]
    fn pixel_shader_shutdown_deletes_programs() {
        let mut device = FakeDevice::with_pixel_shaders();
        let mut textures = FakeTextures::default();
        let mut v = PixelShaderTerrain::default();
        assert!(init(&mut v, &mut device, ChipsetId::GeForce3));
        assert!(v.shutdown(&mut device, &mut textures));
        assert!(device.live_shaders().is_empty());
        // Second shutdown has nothing left to delete.
        assert!(v.shutdown(&mut device, &mut textures));
    }

    // ========================================================================
    // Flat terrain
    // ========================================================================

    #[test]
    fn flat_two_stage_without_shroud_selects_diffuse() {
        let mut rig = Rig::new();
        rig.slots[0] = TextureHandle::INVALID;
        assert!(rig.run(&mut FlatTwoStage, EffectId::FlatTerrainBase, 0));
        assert_eq!(rig.state.stages[0].color_op, SelectArg2);
        assert_eq!(rig.state.stages[1].texture, TextureHandle(11));
    }

    #[test]
    fn flat_two_stage_noise_pass() {
        let mut rig = Rig::new();
        assert!(rig.run(&mut FlatTwoStage, EffectId::FlatTerrainBaseNoise1, 1));
        assert_eq!(rig.state.stages[0].texture, TextureHandle(12));
        assert_eq!(rig.state.render.blend, Some(BlendPair::MULTIPLY));
    }

    #[test]
    fn flat_pixel_shader_packs_stages_around_base() {
        let mut device = FakeDevice::with_pixel_shaders();
        let mut v = FlatPixelShader::default();
        assert!(init(&mut v, &mut device, ChipsetId::GeForce4));
        let programs = v.programs.unwrap();

        let mut rig = Rig::new();
        rig.run(&mut v, EffectId::FlatTerrainBase, 0);
        assert_eq!(rig.state.pixel_shader, programs.base0);

        // Cloud lands on stage 0, light skips the base stage to 2.
        rig.run(&mut v, EffectId::FlatTerrainBaseNoise12, 0);
        assert_eq!(rig.state.stages[0].texture, TextureHandle(12));
        assert_eq!(rig.state.stages[1].texture, TextureHandle(11));
        assert_eq!(rig.state.stages[2].texture, TextureHandle(13));
        assert_eq!(rig.state.pixel_shader, programs.noise1);

        rig.scene.shroud = Some(crate::effect::ShroudProjection {
            texture: TextureHandle(99),
            cell_width: 10.0,
            cell_height: 10.0,
            draw_origin: glam::Vec2::ZERO,
            texture_width: 64,
            texture_height: 64,
        });
        rig.run(&mut v, EffectId::FlatTerrainBaseNoise12, 0);
        assert_eq!(rig.state.stages[0].texture, TextureHandle(99));
        assert_eq!(rig.state.stages[3].texture, TextureHandle(13));
        assert_eq!(rig.state.pixel_shader, programs.noise2);
    }
}
