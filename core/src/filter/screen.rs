//! The built-in screen filters.

use glam::{Vec2, Vec4};
use log::debug;
use ridgeline_shared::{
    CROSSFADE_MASK_TEXTURE, ChipsetId, FilterMode, ShaderHandle, TextureHandle,
};
use wgpu::{AddressMode, CompareFunction};

use super::{
    Fade, FadeDirection, FadeStep, FilterContext, FilterInitContext, FilterVariant, FramePlan,
    ScenePass,
};
use crate::device::{Device, TextureLoader};
use crate::state::{BlendPair, GpuStateSnapshot, ShaderPreset, StageArg, StageOp, TexCoordSource};

/// Blur copies drawn at full strength.
pub const MAX_COUNT: i32 = 60;
/// Blur copies added or removed per logic frame.
pub const COUNT_STEP: i32 = 5;
pub const DEFAULT_PAN_FACTOR: i32 = 30;

/// Copies actually drawn in one frame.
const MAX_DRAWN_COPIES: i32 = 30;

const WHITE: u32 = 0xFFFF_FFFF;

/// Luminance weights for the monochrome program.
const LUMINANCE: Vec4 = Vec4::new(0.3, 0.59, 0.11, 1.0);

/// Set up `state` to copy `texture` over the whole view, ignoring depth.
fn screen_copy(state: &mut GpuStateSnapshot, texture: TextureHandle, preset: ShaderPreset) {
    state.render.preset = preset;
    state.render.blend = match preset {
        ShaderPreset::Opaque => None,
        _ => Some(BlendPair::ALPHA),
    };
    state.render.depth_compare = CompareFunction::Always;
    state.render.depth_write = false;
    state.stages[0].texture = texture;
}

/// Advance a black-and-white fade. A finished fade-out switches the
/// filter off.
fn advance_bw_fade(fade: &mut Fade, plan: &mut FramePlan) {
    if fade.advance() == FadeStep::Completed(FadeDirection::Out) {
        plan.finished = true;
    }
}

fn tint(mode: FilterMode) -> Vec4 {
    match mode {
        FilterMode::BwRedAndWhite => Vec4::new(1.0, 0.0, 0.0, 1.0),
        FilterMode::BwGreenAndWhite => Vec4::new(0.0, 1.0, 0.0, 1.0),
        _ => Vec4::ONE,
    }
}

// ============================================================================
// Default
// ============================================================================

/// Captures the scene and copies it back unchanged, so effects that need
/// the frame as a texture always have one.
#[derive(Debug, Default)]
pub struct ScreenDefault;

impl FilterVariant for ScreenDefault {
    fn name(&self) -> &'static str {
        "screen-default"
    }

    fn init(&mut self, ctx: &mut FilterInitContext<'_>) -> bool {
        ctx.render_to_texture
    }

    fn pre_render(&mut self, ctx: &mut FilterContext<'_>, plan: &mut FramePlan) -> bool {
        plan.skip_render = false;
        ctx.begin_capture()
    }

    fn post_render(
        &mut self,
        mode: FilterMode,
        _scroll_delta: Vec2,
        ctx: &mut FilterContext<'_>,
        _plan: &mut FramePlan,
    ) -> bool {
        let Some(texture) = ctx.end_capture() else {
            return false;
        };
        if !mode.is_active() {
            return false;
        }
        let baseline = ctx.device.state().clone();
        ctx.apply(|s| screen_copy(s, texture, ShaderPreset::Opaque));
        let quad = ctx.quad(WHITE);
        ctx.draw(&quad);
        ctx.restore(&baseline);
        true
    }
}

// ============================================================================
// Black and white
// ============================================================================

/// Monochrome through the "monochrome" pixel-shader program.
#[derive(Debug, Default)]
pub struct BwPixelShader {
    program: Option<ShaderHandle>,
    fade: Fade,
}

impl FilterVariant for BwPixelShader {
    fn name(&self) -> &'static str {
        "bw-ps"
    }

    fn init(&mut self, ctx: &mut FilterInitContext<'_>) -> bool {
        if !ctx.render_to_texture || ctx.caps.chipset < ChipsetId::GenericPs11 {
            return false;
        }
        self.program = ctx.create_pixel_shader("monochrome");
        self.program.is_some()
    }

    fn pre_render(&mut self, ctx: &mut FilterContext<'_>, plan: &mut FramePlan) -> bool {
        plan.skip_render = false;
        ctx.begin_capture()
    }

    fn post_render(
        &mut self,
        mode: FilterMode,
        _scroll_delta: Vec2,
        ctx: &mut FilterContext<'_>,
        plan: &mut FramePlan,
    ) -> bool {
        let Some(texture) = ctx.end_capture() else {
            return false;
        };
        let Some(program) = self.program else {
            return false;
        };
        if !mode.is_active() {
            return false;
        }
        advance_bw_fade(&mut self.fade, plan);
        let fade = self.fade.value();

        let baseline = ctx.device.state().clone();
        ctx.apply(|s| {
            screen_copy(s, texture, ShaderPreset::Opaque);
            s.pixel_shader = program;
            s.pixel_constants[0] = LUMINANCE;
            s.pixel_constants[1] = tint(mode);
            s.pixel_constants[2] = Vec4::new(fade, fade, fade, 1.0);
        });
        let quad = ctx.quad(WHITE);
        ctx.draw(&quad);
        ctx.restore(&baseline);
        true
    }

    fn start_fade(&mut self, direction: FadeDirection, frames: u32) {
        self.fade.start(direction, frames);
    }

    fn shutdown(&mut self, device: &mut dyn Device, _textures: &mut dyn TextureLoader) -> bool {
        if let Some(program) = self.program.take() {
            device.delete_pixel_shader(program);
        }
        true
    }
}

/// Monochrome on the fixed-function combiners.
///
/// Draws a grey copy of the scene, then the coloured scene on top with
/// vertex alpha `1 - fade`. Hardware with a dot-product combiner weights
/// the channels through the texture factor; older parts just darken.
#[derive(Debug, Default)]
pub struct BwFixedFunction {
    dot3: bool,
    fade: Fade,
}

/// Luminance weights packed for the dot-product combiner.
const DOT3_FACTOR: u32 = 0x80A5_CA8E;
const DARKEN_FACTOR: u32 = 0x6060_6060;

impl FilterVariant for BwFixedFunction {
    fn name(&self) -> &'static str {
        "bw-fixed-function"
    }

    fn init(&mut self, ctx: &mut FilterInitContext<'_>) -> bool {
        if !ctx.render_to_texture || !ctx.caps.chipset.is_known() {
            return false;
        }
        self.dot3 = ctx.caps.chipset >= ChipsetId::GeForce2;
        true
    }

    fn pre_render(&mut self, ctx: &mut FilterContext<'_>, plan: &mut FramePlan) -> bool {
        plan.skip_render = false;
        ctx.begin_capture()
    }

    fn post_render(
        &mut self,
        mode: FilterMode,
        _scroll_delta: Vec2,
        ctx: &mut FilterContext<'_>,
        plan: &mut FramePlan,
    ) -> bool {
        let Some(texture) = ctx.end_capture() else {
            return false;
        };
        if !mode.is_active() {
            return false;
        }
        advance_bw_fade(&mut self.fade, plan);
        let alpha = ((1.0 - self.fade.value()) * 255.0) as u32;
        let quad = ctx.quad((alpha << 24) | 0x00FF_FFFF);
        let baseline = ctx.device.state().clone();

        let dot3 = self.dot3;
        ctx.apply(|s| {
            screen_copy(s, texture, ShaderPreset::Opaque);
            if dot3 {
                s.render.texture_factor = DOT3_FACTOR;
                s.stages[0].color(StageOp::SelectArg1, StageArg::Texture, StageArg::Factor);
                s.stages[1].color(StageOp::DotProduct3, StageArg::Current, StageArg::Factor);
            } else {
                s.render.texture_factor = DARKEN_FACTOR;
                s.stages[0].color(StageOp::Modulate, StageArg::Texture, StageArg::Factor);
            }
        });
        ctx.draw(&quad);

        // Colour view on top, blended by vertex alpha.
        ctx.apply(|s| {
            s.stages[0] = baseline.stages[0];
            s.stages[1] = baseline.stages[1];
            s.render.texture_factor = baseline.render.texture_factor;
            screen_copy(s, texture, ShaderPreset::Alpha);
            s.stages[0].alpha(StageOp::SelectArg2, StageArg::Texture, StageArg::Diffuse);
        });
        ctx.draw(&quad);
        ctx.restore(&baseline);
        true
    }

    fn start_fade(&mut self, direction: FadeDirection, frames: u32) {
        self.fade.start(direction, frames);
    }
}

// ============================================================================
// Motion blur
// ============================================================================

/// Zoom and pan blur built from shrinking translucent copies of the scene.
#[derive(Debug)]
pub struct MotionBlur {
    additive: bool,
    zoom: bool,
    pan_factor: i32,
    max_count: i32,
    decrement: bool,
    skip_render: bool,
    last_frame: Option<u64>,
    prior_delta: Vec2,
}

impl Default for MotionBlur {
    fn default() -> Self {
        Self {
            additive: false,
            zoom: false,
            pan_factor: DEFAULT_PAN_FACTOR,
            max_count: 0,
            decrement: false,
            skip_render: false,
            last_frame: None,
            prior_delta: Vec2::ZERO,
        }
    }
}

impl MotionBlur {
    /// Blur copies currently drawn at peak.
    pub fn strength(&self) -> i32 {
        self.max_count
    }

    /// One logic-frame step of the zoom blur ramp.
    fn step_zoom(&mut self, zoom_to: Option<glam::Vec3>, plan: &mut FramePlan) -> bool {
        if self.decrement {
            self.max_count -= COUNT_STEP;
            if self.max_count < 1 {
                self.decrement = false;
                return false;
            }
            self.skip_render = true;
            return true;
        }
        self.max_count += COUNT_STEP;
        if self.max_count < MAX_COUNT {
            self.skip_render = true;
            return true;
        }
        self.decrement = true;
        match zoom_to {
            Some(target) if self.zoom => {
                plan.look_at = Some(target);
                true
            }
            _ => false,
        }
    }
}

impl FilterVariant for MotionBlur {
    fn name(&self) -> &'static str {
        "motion-blur"
    }

    fn init(&mut self, ctx: &mut FilterInitContext<'_>) -> bool {
        ctx.render_to_texture
    }

    fn setup(&mut self, mode: FilterMode) -> bool {
        self.additive = mode.is_saturate();
        self.zoom = matches!(mode, FilterMode::BlurInOutAlpha | FilterMode::BlurInOutSaturate);
        if let FilterMode::BlurPan { factor } = mode {
            self.pan_factor = if factor < 1 {
                DEFAULT_PAN_FACTOR
            } else {
                i32::from(factor)
            };
        }
        if mode != FilterMode::BlurEndPan {
            self.max_count = 0;
        }
        self.decrement = false;
        self.skip_render = false;
        if matches!(mode, FilterMode::BlurOutAlpha | FilterMode::BlurOutSaturate) {
            self.max_count = MAX_COUNT;
            self.decrement = true;
        }
        true
    }

    fn pre_render(&mut self, ctx: &mut FilterContext<'_>, plan: &mut FramePlan) -> bool {
        plan.skip_render = self.skip_render;
        ctx.begin_capture()
    }

    fn post_render(
        &mut self,
        mode: FilterMode,
        scroll_delta: Vec2,
        ctx: &mut FilterContext<'_>,
        plan: &mut FramePlan,
    ) -> bool {
        let Some(texture) = ctx.end_capture() else {
            return false;
        };

        let mut running = true;
        let mut center = Vec2::splat(0.5);
        let pan = match mode {
            FilterMode::BlurPan { .. } => {
                let len = scroll_delta.length();
                center.y -= 0.5;
                self.decrement = false;
                let count = (len * 200.0 * self.pan_factor as f32 / DEFAULT_PAN_FACTOR as f32) as i32;
                self.max_count = count.clamp(self.pan_factor / 2, self.pan_factor);
                self.prior_delta = scroll_delta;
                true
            }
            FilterMode::BlurEndPan => {
                let len = self.prior_delta.length();
                if len > 0.0 {
                    center.x += 0.5 * self.prior_delta.x / len;
                    center.y -= 0.5 * self.prior_delta.y / len;
                }
                self.decrement = false;
                self.max_count -= 1;
                if self.max_count < 2 {
                    running = false;
                }
                true
            }
            _ => false,
        };

        self.skip_render = false;
        let frame = ctx.inputs.logic_frame;
        if !pan && self.last_frame != Some(frame) {
            running = self.step_zoom(ctx.inputs.zoom_to, plan) && running;
        }

        let mut quad = ctx.quad(WHITE);
        if !pan {
            let scale = (1.0 - (self.max_count as f32 / MAX_COUNT as f32) * 0.9)
                .max(0.0)
                .sqrt();
            for v in &mut quad {
                v.uv0 = (v.uv0 - center) * scale + center;
            }
        }

        let baseline = ctx.device.state().clone();
        ctx.apply(|s| {
            screen_copy(s, texture, ShaderPreset::Opaque);
            s.stages[0].alpha(StageOp::SelectArg1, StageArg::Current, StageArg::Texture);
        });
        ctx.draw(&quad);

        let additive = self.additive;
        ctx.apply(|s| {
            s.render.blend = Some(if additive {
                BlendPair::ADDITIVE_ALPHA
            } else {
                BlendPair::ALPHA
            });
        });

        let limit = self.max_count.clamp(0, MAX_DRAWN_COPIES);
        let shrink = if additive { 0.98 } else { 0.99 };
        let mut alpha = if additive { 0x09 } else { 0x15 };
        if additive {
            if self.max_count > limit {
                alpha += (self.max_count - limit) / 5;
            }
            if self.max_count == MAX_COUNT {
                alpha += 60;
            }
        }
        let color = ((alpha.clamp(0, 255) as u32) << 24) | 0x00FF_FFFF;
        let stretch = if pan { Vec2::new(shrink + 0.006, shrink) } else { Vec2::splat(shrink) };
        for _ in 0..limit {
            for v in &mut quad {
                v.color = color;
                v.uv0 = (v.uv0 - center) * stretch + center;
            }
            ctx.draw(&quad);
        }

        self.last_frame = Some(frame);
        if pan {
            self.skip_render = false;
        }
        ctx.restore(&baseline);
        if !running {
            ctx.inputs.zoom_to = None;
            debug!("Motion blur finished");
        }
        running
    }
}

// ============================================================================
// Crossfade
// ============================================================================

/// Fades between two renders of the scene through a circular mask.
///
/// The first `post_render` of a frame ends the capture of the outgoing
/// scene and asks for an extra render; the second composites the capture
/// over that render.
#[derive(Debug, Default)]
pub struct CrossFade {
    pattern: Option<TextureHandle>,
    fade: Fade,
    awaiting_second_render: bool,
}

impl CrossFade {
    /// Mask texture coordinate half-extent for the current fade.
    pub fn mask_radius(fade: f32) -> f32 {
        let radius = (1.0 - fade) * 2.0;
        0.5 / if radius <= 0.0 { 0.01 } else { radius }
    }

    pub fn fade(&self) -> f32 {
        self.fade.value()
    }

    fn publish_mask(&self, ctx: &mut FilterContext<'_>) {
        let mask = &mut ctx.shaders.scene_mut().mask;
        mask.fade = self.fade.value();
        mask.texture = self.pattern.unwrap_or_default();
    }
}

impl FilterVariant for CrossFade {
    fn name(&self) -> &'static str {
        "crossfade"
    }

    fn init(&mut self, ctx: &mut FilterInitContext<'_>) -> bool {
        self.awaiting_second_render = false;
        if !ctx.render_to_texture {
            return false;
        }
        self.pattern = ctx.textures.load(CROSSFADE_MASK_TEXTURE);
        if self.pattern.is_none() {
            debug!("Crossfade mask {CROSSFADE_MASK_TEXTURE} not found");
        }
        self.pattern.is_some()
    }

    fn pre_render(&mut self, ctx: &mut FilterContext<'_>, plan: &mut FramePlan) -> bool {
        let step = self.fade.advance_showing_current();
        self.publish_mask(ctx);
        match step {
            FadeStep::Completed(direction) => {
                plan.finished = direction == FadeDirection::Out;
                true
            }
            FadeStep::Running | FadeStep::Steady => {
                if !ctx.begin_capture() {
                    return false;
                }
                plan.scene_pass = ScenePass::AlphaMask;
                plan.skip_render = false;
                self.awaiting_second_render = true;
                true
            }
        }
    }

    fn post_render(
        &mut self,
        mode: FilterMode,
        _scroll_delta: Vec2,
        ctx: &mut FilterContext<'_>,
        plan: &mut FramePlan,
    ) -> bool {
        if self.awaiting_second_render {
            self.awaiting_second_render = false;
            plan.extra_render = true;
            ctx.end_capture();
            return true;
        }

        let texture = ctx.shaders.render_texture();
        if !texture.is_valid() || !mode.is_active() {
            return false;
        }
        let circle = mode == FilterMode::CrossFadeCircle;
        let pattern = self.pattern.unwrap_or_default();

        let mut quad = ctx.quad(WHITE);
        if circle {
            let r = Self::mask_radius(self.fade.value());
            let corners = [Vec2::new(r, r), Vec2::new(r, -r), Vec2::new(-r, r), Vec2::new(-r, -r)];
            for (v, corner) in quad.iter_mut().zip(corners) {
                v.uv1 = Vec2::splat(0.5) + corner;
            }
        }

        let baseline = ctx.device.state().clone();
        ctx.apply(|s| {
            screen_copy(s, texture, ShaderPreset::Alpha);
            s.stages[0].address(AddressMode::ClampToEdge);
            if circle {
                let mask = &mut s.stages[1];
                mask.texture = pattern;
                mask.color(StageOp::Modulate, StageArg::Texture, StageArg::Current)
                    .alpha(StageOp::Modulate, StageArg::Texture, StageArg::Current)
                    .address(AddressMode::ClampToEdge);
                mask.tex_coord = TexCoordSource::Vertex(1);
                mask.mip_filter = None;
            }
        });
        ctx.draw(&quad);
        ctx.restore(&baseline);
        true
    }

    fn start_fade(&mut self, direction: FadeDirection, frames: u32) {
        self.fade.start(direction, frames);
    }

    fn shutdown(&mut self, _device: &mut dyn Device, textures: &mut dyn TextureLoader) -> bool {
        if let Some(pattern) = self.pattern.take() {
            textures.release(pattern);
        }
        true
    }
}
