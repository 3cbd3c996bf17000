//! Whole-screen post-process filters.
//!
//! A filter captures the scene into the render-to-texture scratch during
//! [`FilterVariant::pre_render`] and composites it back onto the frame
//! buffer in [`FilterVariant::post_render`]. Like effects, each filter has
//! a candidate list and the first variant whose `init` succeeds is used.

mod screen;


pub use screen::{
    BwFixedFunction, BwPixelShader, COUNT_STEP, CrossFade, DEFAULT_PAN_FACTOR, MAX_COUNT,
    MotionBlur, ScreenDefault,
};

use glam::{Vec2, Vec3};
use log::{debug, info, warn};
use ridgeline_shared::{FilterId, FilterMode, ShaderHandle, TextureHandle};
use smallvec::SmallVec;

use crate::device::{Device, ScreenQuad, ScreenVertex, TextureLoader, Viewport};
use crate::effect::select;
use crate::manager::ShaderManager;
use crate::probe::CapabilityReport;
use crate::state::GpuStateSnapshot;

/// How the scene should be drawn while a filter is capturing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScenePass {
    #[default]
    Normal,
    /// Draw the terrain with the crossfade mask as its alpha.
    AlphaMask,
}

/// Frame decisions a filter hands back to the view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FramePlan {
    /// Reuse the last capture instead of drawing the scene.
    pub skip_render: bool,
    pub scene_pass: ScenePass,
    /// Draw the scene a second time before the next `post_render`.
    pub extra_render: bool,
    /// Camera target the view should jump to.
    pub look_at: Option<Vec3>,
    /// The filter has run its course; the view should drop it.
    pub finished: bool,
}

/// Which way a fade is heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Result of one [`Fade::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStep {
    /// No fade in progress.
    Steady,
    Running,
    /// The fade reached its end this frame.
    Completed(FadeDirection),
}

/// Frame-counted fade level between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    frames: u32,
    frame: u32,
    value: f32,
    direction: Option<FadeDirection>,
}

impl Default for Fade {
    /// Fully applied with no fade running.
    fn default() -> Self {
        Self {
            frames: 0,
            frame: 0,
            value: 1.0,
            direction: None,
        }
    }
}

impl Fade {
    pub fn start(&mut self, direction: FadeDirection, frames: u32) {
        self.frames = frames;
        self.frame = 0;
        self.direction = Some(direction);
        self.value = match direction {
            FadeDirection::In => 0.0,
            FadeDirection::Out => 1.0,
        };
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_running(&self) -> bool {
        self.direction.is_some()
    }

    /// Move one frame along the fade.
    pub fn advance(&mut self) -> FadeStep {
        let Some(direction) = self.direction else {
            return FadeStep::Steady;
        };
        self.frame += 1;
        if self.frame < self.frames {
            let t = self.frame as f32 / self.frames as f32;
            self.value = match direction {
                FadeDirection::In => t,
                FadeDirection::Out => 1.0 - t,
            };
            return FadeStep::Running;
        }
        self.value = match direction {
            FadeDirection::In => 1.0,
            FadeDirection::Out => 0.0,
        };
        self.frame = 0;
        self.direction = None;
        FadeStep::Completed(direction)
    }

    /// Like [`advance`](Self::advance), except a fade-out shows the
    /// current frame before stepping past it. The first fade-out frame is
    /// at full strength and completion comes one call later.
    pub fn advance_showing_current(&mut self) -> FadeStep {
        if self.direction != Some(FadeDirection::Out) {
            return self.advance();
        }
        if self.frame < self.frames {
            self.value = 1.0 - self.frame as f32 / self.frames as f32;
            self.frame += 1;
            return FadeStep::Running;
        }
        self.value = 0.0;
        self.frame = 0;
        self.direction = None;
        FadeStep::Completed(FadeDirection::Out)
    }
}

/// Inputs from the game side that outlive a single call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterInputs {
    /// Logic frame counter; motion blur steps once per logic frame.
    pub logic_frame: u64,
    /// Where an in-and-out motion blur should move the camera at its peak.
    pub zoom_to: Option<Vec3>,
}

/// Full-screen quad over the tactical view.
///
/// Positions sit half a pixel up and left so texels land on pixel centres.
/// `uv0` maps the view into a texture the size of `display`.
pub fn screen_quad(viewport: Viewport, display: (u32, u32), color: u32) -> ScreenQuad {
    let (x0, y0) = (viewport.x as f32, viewport.y as f32);
    let (x1, y1) = (x0 + viewport.width as f32, y0 + viewport.height as f32);
    let (dw, dh) = (display.0.max(1) as f32, display.1.max(1) as f32);
    let corner = |x: f32, y: f32| ScreenVertex {
        position: Vec2::new(x - 0.5, y - 0.5),
        uv0: Vec2::new(x / dw, y / dh),
        uv1: Vec2::ZERO,
        color,
        _pad: 0,
    };
    [corner(x1, y1), corner(x1, y0), corner(x0, y1), corner(x0, y0)]
}

/// What a filter sees during negotiation.
pub struct FilterInitContext<'a> {
    pub device: &'a mut dyn Device,
    pub textures: &'a mut dyn TextureLoader,
    pub caps: &'a CapabilityReport,
    pub render_to_texture: bool,
}

impl FilterInitContext<'_> {
    pub fn create_pixel_shader(&mut self, program: &str) -> Option<ShaderHandle> {
        if !self.caps.chipset.has_pixel_shaders() {
            return None;
        }
        match self.device.create_pixel_shader(program) {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!("{e}");
                None
            }
        }
    }
}

/// What a filter sees around a frame.
pub struct FilterContext<'a> {
    pub device: &'a mut dyn Device,
    pub shaders: &'a mut ShaderManager,
    pub inputs: &'a mut FilterInputs,
}

impl FilterContext<'_> {
    /// Redirect the scene into the scratch texture.
    pub fn begin_capture(&mut self) -> bool {
        match self.shaders.start_render_to_texture(&mut *self.device) {
            Ok(()) => true,
            Err(e) => {
                warn!("Filter capture not started: {e}");
                false
            }
        }
    }

    /// Restore the frame buffer and return the captured scene.
    pub fn end_capture(&mut self) -> Option<TextureHandle> {
        match self.shaders.end_render_to_texture(&mut *self.device) {
            Ok(texture) if texture.is_valid() => Some(texture),
            Ok(_) => None,
            Err(e) => {
                warn!("Filter capture not ended: {e}");
                None
            }
        }
    }

    pub fn quad(&self, color: u32) -> ScreenQuad {
        screen_quad(self.device.viewport(), self.device.back_buffer_size(), color)
    }

    /// Edit a copy of the device state and apply the difference.
    pub fn apply(&mut self, edit: impl FnOnce(&mut GpuStateSnapshot)) {
        let mut working = self.device.state().clone();
        edit(&mut working);
        let changes = self.device.state().diff(&working);
        self.device.apply_state(&changes);
    }

    pub fn restore(&mut self, baseline: &GpuStateSnapshot) {
        let changes = self.device.state().diff(baseline);
        self.device.apply_state(&changes);
    }

    pub fn draw(&mut self, quad: &ScreenQuad) {
        self.device.draw_screen_quad(quad);
    }
}

/// One way of running a screen filter.
pub trait FilterVariant {
    fn name(&self) -> &'static str;

    /// Validate the hardware and allocate one-time resources.
    fn init(&mut self, ctx: &mut FilterInitContext<'_>) -> bool;

    /// Called once when the filter is switched on.
    fn setup(&mut self, _mode: FilterMode) -> bool {
        true
    }

    /// Called before the scene is drawn.
    fn pre_render(&mut self, ctx: &mut FilterContext<'_>, plan: &mut FramePlan) -> bool;

    /// Called after the scene is drawn. Returns whether the filter keeps
    /// running.
    fn post_render(
        &mut self,
        mode: FilterMode,
        scroll_delta: Vec2,
        ctx: &mut FilterContext<'_>,
        plan: &mut FramePlan,
    ) -> bool;

    /// Start fading the filter in or out. Filters without a fade ignore it.
    fn start_fade(&mut self, _direction: FadeDirection, _frames: u32) {}

    fn shutdown(&mut self, _device: &mut dyn Device, _textures: &mut dyn TextureLoader) -> bool {
        true
    }
}

/// Filter candidate lists and the selected variant per filter.
pub struct FilterManager {
    variants: Vec<Box<dyn FilterVariant>>,
    lists: [SmallVec<[usize; 2]>; FilterId::COUNT],
    selected: [Option<usize>; FilterId::COUNT],
    current: Option<FilterId>,
    inputs: FilterInputs,
}

impl Default for FilterManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterManager {
    /// Manager over the built-in filters.
    pub fn new() -> Self {
        let mut manager = Self::empty();
        manager.add_candidate(FilterId::ViewDefault, ScreenDefault);
        manager.add_candidate(FilterId::ViewBlackAndWhite, BwPixelShader::default());
        manager.add_candidate(FilterId::ViewBlackAndWhite, BwFixedFunction::default());
        manager.add_candidate(FilterId::ViewMotionBlur, MotionBlur::default());
        manager.add_candidate(FilterId::ViewCrossFade, CrossFade::default());
        manager
    }

    pub fn empty() -> Self {
        Self {
            variants: Vec::new(),
            lists: Default::default(),
            selected: [None; FilterId::COUNT],
            current: None,
            inputs: FilterInputs::default(),
        }
    }

    /// Append a candidate to `filter`'s list. Earlier candidates win.
    pub fn add_candidate(&mut self, filter: FilterId, variant: impl FilterVariant + 'static) {
        self.variants.push(Box::new(variant));
        self.lists[filter.index()].push(self.variants.len() - 1);
    }

    /// Select a variant per filter. Shuts down a previous selection first.
    pub fn init(
        &mut self,
        device: &mut dyn Device,
        textures: &mut dyn TextureLoader,
        shaders: &ShaderManager,
    ) {
        self.shutdown(device, textures);

        let mut ctx = FilterInitContext {
            device,
            textures,
            caps: shaders.capabilities(),
            render_to_texture: shaders.can_render_to_texture(),
        };
        for filter in FilterId::ALL {
            let variants = &mut self.variants;
            let choice = select(&self.lists[filter.index()][..], |i| variants[i].init(&mut ctx));
            self.selected[filter.index()] = choice;
            match choice {
                Some(i) => info!("{filter}: {}", self.variants[i].name()),
                None => info!("{filter}: unsupported"),
            }
        }
    }

    pub fn shutdown(&mut self, device: &mut dyn Device, textures: &mut dyn TextureLoader) {
        for slot in &mut self.selected {
            let Some(i) = slot.take() else {
                continue;
            };
            let variant = &mut self.variants[i];
            if !variant.shutdown(device, textures) {
                warn!("Filter {} failed to shut down cleanly", variant.name());
            }
        }
        self.current = None;
    }

    pub fn is_supported(&self, filter: FilterId) -> bool {
        self.selected[filter.index()].is_some()
    }

    /// Name of the variant running `filter`.
    pub fn selected_variant(&self, filter: FilterId) -> Option<&'static str> {
        self.selected[filter.index()].map(|i| self.variants[i].name())
    }

    /// Filter whose capture is in progress.
    pub fn current_filter(&self) -> Option<FilterId> {
        self.current
    }

    pub fn inputs(&self) -> &FilterInputs {
        &self.inputs
    }

    pub fn set_logic_frame(&mut self, frame: u64) {
        self.inputs.logic_frame = frame;
    }

    pub fn set_zoom_target(&mut self, target: Option<Vec3>) {
        self.inputs.zoom_to = target;
    }

    /// Start a fade on every filter that has one.
    pub fn set_fade(&mut self, direction: FadeDirection, frames: u32) {
        for i in self.selected.iter().flatten() {
            self.variants[*i].start_fade(direction, frames);
        }
    }

    /// Start a fade on `filter` alone.
    pub fn set_filter_fade(&mut self, filter: FilterId, direction: FadeDirection, frames: u32) {
        if let Some(i) = self.selected[filter.index()] {
            self.variants[i].start_fade(direction, frames);
        }
    }

    /// Prepare `filter` for `mode`. False when the filter is unsupported.
    pub fn filter_setup(&mut self, filter: FilterId, mode: FilterMode) -> bool {
        match self.selected[filter.index()] {
            Some(i) => self.variants[i].setup(mode),
            None => false,
        }
    }

    pub fn filter_pre_render(
        &mut self,
        filter: FilterId,
        device: &mut dyn Device,
        shaders: &mut ShaderManager,
        plan: &mut FramePlan,
    ) -> bool {
        let Some(i) = self.selected[filter.index()] else {
            return false;
        };
        let mut ctx = FilterContext {
            device,
            shaders,
            inputs: &mut self.inputs,
        };
        let ok = self.variants[i].pre_render(&mut ctx, plan);
        if ok {
            self.current = Some(filter);
        }
        ok
    }

    /// Composite the captured scene. Returns whether the filter keeps
    /// running.
    pub fn filter_post_render(
        &mut self,
        filter: FilterId,
        mode: FilterMode,
        scroll_delta: Vec2,
        device: &mut dyn Device,
        shaders: &mut ShaderManager,
        plan: &mut FramePlan,
    ) -> bool {
        let Some(i) = self.selected[filter.index()] else {
            self.current = None;
            return false;
        };
        let mut ctx = FilterContext {
            device,
            shaders,
            inputs: &mut self.inputs,
        };
        let running = self.variants[i].post_render(mode, scroll_delta, &mut ctx, plan);
        if ctx.shaders.is_rendering_to_texture() {
            // A capture must never outlive the frame.
            if let Err(e) = ctx.shaders.end_render_to_texture(&mut *ctx.device) {
                warn!("{filter} left rendering redirected: {e}");
            }
        }
        if !running || plan.finished {
            self.current = None;
        }
        running
    }
}

impl std::fmt::Debug for FilterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterManager")
            .field("variants", &self.variants.iter().map(|v| v.name()).collect::<Vec<_>>())
            .field("selected", &self.selected)
            .field("current", &self.current)
            .finish()
    }
}
