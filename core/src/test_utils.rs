//! Shared fakes for unit tests: a scriptable device, a texture loader and
//! an effect variant that logs every call.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use hashbrown::HashMap;
use ridgeline_shared::{
    AdapterIdentity, DeviceCaps, EffectId, GeometryHandle, MAX_TEXTURE_STAGES, ShaderHandle,
    ShaderVersion, SurfaceHandle, TextureHandle,
};

use crate::device::{Device, RenderTexture, ScreenQuad, TextureLoader, Viewport};
use crate::effect::{EffectVariant, InitContext, PassContext, ResetContext};
use crate::error::DeviceError;
use crate::probe::CapabilityReport;
use crate::state::{GpuStateSnapshot, StateChange};

// ============================================================================
// Fake device
// ============================================================================

/// Device calls worth asserting on.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetRenderTarget { color: SurfaceHandle, depth: SurfaceHandle },
    CreateRenderTexture { width: u32, height: u32 },
    CreateTexture { width: u32, height: u32 },
    WriteTexture { texture: TextureHandle, bytes: usize },
    ReleaseTexture(TextureHandle),
    ReleaseSurface(SurfaceHandle),
    CreatePixelShader(String),
    DeletePixelShader(ShaderHandle),
    ApplyState(Vec<StateChange>),
    Draw(GeometryHandle),
    DrawScreenQuad(ScreenQuad),
}

/// In-memory device with switchable failures.
pub struct FakeDevice {
    adapter: Option<AdapterIdentity>,
    caps: Option<DeviceCaps>,
    lost: bool,
    fail_render_textures: bool,
    fail_render_target: bool,
    failing_shaders: Vec<String>,
    next_handle: u32,
    color: SurfaceHandle,
    depth: SurfaceHandle,
    state: GpuStateSnapshot,
    view: Mat4,
    back_buffer: (u32, u32),
    viewport: Option<Viewport>,
    live_shaders: Vec<ShaderHandle>,
    live_textures: Vec<TextureHandle>,
    drawn_with: Vec<GpuStateSnapshot>,
    pub calls: Vec<DeviceCall>,
}

impl FakeDevice {
    /// No device created yet: every query answers `None`.
    pub fn uncreated() -> Self {
        Self {
            adapter: None,
            caps: None,
            lost: false,
            fail_render_textures: false,
            fail_render_target: false,
            failing_shaders: Vec::new(),
            next_handle: 100,
            color: SurfaceHandle(1),
            depth: SurfaceHandle(2),
            state: GpuStateSnapshot::default(),
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -100.0)),
            back_buffer: (800, 600),
            viewport: None,
            live_shaders: Vec::new(),
            live_textures: Vec::new(),
            drawn_with: Vec::new(),
            calls: Vec::new(),
        }
    }

    fn generic(caps: DeviceCaps) -> Self {
        Self {
            adapter: Some(AdapterIdentity {
                vendor_id: 0x8086,
                device_id: 0x1234,
                name: "fake adapter".to_string(),
                driver_version: 0x0001_0002_0003_0004,
            }),
            caps: Some(caps),
            ..Self::uncreated()
        }
    }

    /// Unlisted adapter with 8 stages and pixel shader 1.4.
    pub fn with_pixel_shaders() -> Self {
        Self::generic(DeviceCaps {
            max_simultaneous_textures: 8,
            pixel_shader: ShaderVersion::V1_4,
            vertex_shader: ShaderVersion::V1_1,
        })
    }

    /// Unlisted adapter with two stages and no shaders.
    pub fn fixed_function() -> Self {
        Self::generic(DeviceCaps {
            max_simultaneous_textures: 2,
            pixel_shader: ShaderVersion::NONE,
            vertex_shader: ShaderVersion::NONE,
        })
    }

    pub fn set_caps(&mut self, caps: DeviceCaps) {
        self.caps = Some(caps);
    }

    pub fn set_adapter(&mut self, vendor_id: u32, device_id: u32) {
        if let Some(adapter) = &mut self.adapter {
            adapter.vendor_id = vendor_id;
            adapter.device_id = device_id;
        }
    }

    pub fn set_lost(&mut self, lost: bool) {
        self.lost = lost;
    }

    pub fn fail_render_textures(&mut self, fail: bool) {
        self.fail_render_textures = fail;
    }

    pub fn fail_render_target(&mut self, fail: bool) {
        self.fail_render_target = fail;
    }

    /// Make creation of `program` fail.
    pub fn fail_shader(&mut self, program: &str) {
        self.failing_shaders.push(program.to_string());
    }

    /// Tactical view smaller than the back buffer.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    /// Names of every program successfully created, in order.
    pub fn created_shaders(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::CreatePixelShader(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn live_shaders(&self) -> &[ShaderHandle] {
        &self.live_shaders
    }

    pub fn live_textures(&self) -> &[TextureHandle] {
        &self.live_textures
    }

    pub fn current_target(&self) -> (SurfaceHandle, SurfaceHandle) {
        (self.color, self.depth)
    }

    pub fn draws(&self) -> Vec<GeometryHandle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Draw(g) => Some(*g),
                _ => None,
            })
            .collect()
    }

    /// Device state at each geometry draw, in draw order.
    pub fn draw_states(&self) -> &[GpuStateSnapshot] {
        &self.drawn_with
    }

    pub fn screen_quads(&self) -> Vec<ScreenQuad> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::DrawScreenQuad(q) => Some(*q),
                _ => None,
            })
            .collect()
    }

    /// Number of uploads to `texture`.
    pub fn uploads_to(&self, texture: TextureHandle) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::WriteTexture { texture: t, .. } if *t == texture))
            .count()
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check(&self) -> Result<(), DeviceError> {
        if self.adapter.is_none() {
            return Err(DeviceError::NotCreated);
        }
        if self.lost {
            return Err(DeviceError::Lost);
        }
        Ok(())
    }
}

impl Device for FakeDevice {
    fn adapter(&self) -> Option<AdapterIdentity> {
        self.adapter.clone()
    }

    fn caps(&self) -> Option<DeviceCaps> {
        self.caps
    }

    fn is_lost(&self) -> bool {
        self.lost
    }

    fn back_buffer_size(&self) -> (u32, u32) {
        self.back_buffer
    }

    fn viewport(&self) -> Viewport {
        self.viewport.unwrap_or(Viewport {
            x: 0,
            y: 0,
            width: self.back_buffer.0,
            height: self.back_buffer.1,
        })
    }

    fn view_transform(&self) -> Mat4 {
        self.view
    }

    fn render_target(&self) -> Result<SurfaceHandle, DeviceError> {
        self.check()?;
        Ok(self.color)
    }

    fn depth_surface(&self) -> Result<SurfaceHandle, DeviceError> {
        self.check()?;
        Ok(self.depth)
    }

    fn set_render_target(
        &mut self,
        color: SurfaceHandle,
        depth: SurfaceHandle,
    ) -> Result<(), DeviceError> {
        self.check()?;
        if self.fail_render_target {
            return Err(DeviceError::RenderTargetRejected);
        }
        self.calls.push(DeviceCall::SetRenderTarget { color, depth });
        self.color = color;
        self.depth = depth;
        Ok(())
    }

    fn create_render_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderTexture, DeviceError> {
        self.check()?;
        if self.fail_render_textures {
            return Err(DeviceError::OutOfMemory { what: "render texture" });
        }
        self.calls.push(DeviceCall::CreateRenderTexture { width, height });
        let texture = TextureHandle(self.next());
        let surface = SurfaceHandle(self.next());
        self.live_textures.push(texture);
        Ok(RenderTexture { texture, surface })
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureHandle, DeviceError> {
        self.check()?;
        self.calls.push(DeviceCall::CreateTexture { width, height });
        let texture = TextureHandle(self.next());
        self.live_textures.push(texture);
        Ok(texture)
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError> {
        self.check()?;
        if !self.live_textures.contains(&texture) {
            return Err(DeviceError::UnknownTexture(texture.0));
        }
        self.calls.push(DeviceCall::WriteTexture { texture, bytes: data.len() });
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.calls.push(DeviceCall::ReleaseTexture(texture));
        self.live_textures.retain(|t| *t != texture);
    }

    fn release_surface(&mut self, surface: SurfaceHandle) {
        self.calls.push(DeviceCall::ReleaseSurface(surface));
    }

    fn create_pixel_shader(&mut self, program: &str) -> Result<ShaderHandle, DeviceError> {
        self.check()?;
        if self.failing_shaders.iter().any(|p| p == program) {
            return Err(DeviceError::ShaderCreation {
                program: program.to_string(),
                reason: "assembler rejected program".to_string(),
            });
        }
        self.calls.push(DeviceCall::CreatePixelShader(program.to_string()));
        let handle = ShaderHandle(self.next());
        self.live_shaders.push(handle);
        Ok(handle)
    }

    fn delete_pixel_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(DeviceCall::DeletePixelShader(shader));
        self.live_shaders.retain(|s| *s != shader);
    }

    fn state(&self) -> &GpuStateSnapshot {
        &self.state
    }

    fn apply_state(&mut self, changes: &[StateChange]) {
        self.state.apply(changes);
        self.calls.push(DeviceCall::ApplyState(changes.to_vec()));
    }

    fn draw(&mut self, geometry: GeometryHandle) {
        self.drawn_with.push(self.state.clone());
        self.calls.push(DeviceCall::Draw(geometry));
    }

    fn draw_screen_quad(&mut self, quad: &ScreenQuad) {
        self.calls.push(DeviceCall::DrawScreenQuad(*quad));
    }
}

// ============================================================================
// Fake texture loader
// ============================================================================

/// Reference-counted name to handle map.
#[derive(Debug, Default)]
pub struct FakeTextures {
    loaded: HashMap<String, (TextureHandle, u32)>,
    missing: Vec<String>,
    next_handle: u32,
}

impl FakeTextures {
    /// Make loading `name` fail.
    pub fn missing(&mut self, name: &str) {
        self.missing.push(name.to_string());
    }

    /// Outstanding references to `name`.
    pub fn refs(&self, name: &str) -> u32 {
        self.loaded.get(name).map(|(_, refs)| *refs).unwrap_or(0)
    }

    pub fn handle(&self, name: &str) -> Option<TextureHandle> {
        self.loaded.get(name).map(|(handle, _)| *handle)
    }
}

impl TextureLoader for FakeTextures {
    fn load(&mut self, name: &str) -> Option<TextureHandle> {
        if self.missing.iter().any(|m| m == name) {
            return None;
        }
        if let Some((handle, refs)) = self.loaded.get_mut(name) {
            *refs += 1;
            return Some(*handle);
        }
        self.next_handle += 1;
        let handle = TextureHandle(5000 + self.next_handle);
        self.loaded.insert(name.to_string(), (handle, 1));
        Some(handle)
    }

    fn release(&mut self, texture: TextureHandle) {
        self.loaded.retain(|_, (handle, refs)| {
            if *handle == texture {
                *refs = refs.saturating_sub(1);
            }
            *refs > 0
        });
    }
}

// ============================================================================
// Scripted variant
// ============================================================================

pub type CallLog = Rc<RefCell<Vec<String>>>;

/// Effect variant whose capability check is a plain predicate.
///
/// Every call is appended to the shared log as `"<name>:<call>"`. A pass
/// binds the slot texture of each stage in `stages` and nothing else.
pub struct ScriptedVariant {
    name: &'static str,
    log: CallLog,
    accept: fn(&CapabilityReport) -> bool,
    passes: Vec<(EffectId, u32)>,
    stages: Vec<usize>,
}

impl ScriptedVariant {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            accept: |_| true,
            passes: Vec::new(),
            stages: vec![0],
        }
    }

    pub fn failing(name: &'static str, log: &CallLog) -> Self {
        Self::new(name, log).accept_when(|_| false)
    }

    pub fn accept_when(mut self, accept: fn(&CapabilityReport) -> bool) -> Self {
        self.accept = accept;
        self
    }

    pub fn serves(mut self, effect: EffectId, passes: u32) -> Self {
        self.passes.push((effect, passes));
        self
    }

    pub fn touches(mut self, stages: &[usize]) -> Self {
        assert!(stages.iter().all(|s| *s < MAX_TEXTURE_STAGES));
        self.stages = stages.to_vec();
        self
    }

    fn record(&self, call: String) {
        self.log.borrow_mut().push(format!("{}:{call}", self.name));
    }
}

impl EffectVariant for ScriptedVariant {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> bool {
        self.record("init".to_string());
        (self.accept)(ctx.caps)
    }

    fn pass_count(&self, effect: EffectId) -> Option<u32> {
        self.passes.iter().find(|(e, _)| *e == effect).map(|(_, n)| *n)
    }

    fn set_pass(&mut self, ctx: &mut PassContext<'_>) -> bool {
        self.record(format!("set_pass {} {}", ctx.effect, ctx.pass));
        for &stage in &self.stages {
            let texture = ctx.slot(stage);
            ctx.stage(stage).texture = texture;
        }
        true
    }

    fn reset(&mut self, ctx: &mut ResetContext<'_>) {
        self.record(format!("reset {}", ctx.effect));
        for &stage in &self.stages {
            ctx.restore_stage(stage);
        }
    }

    fn shutdown(
        &mut self,
        _device: &mut dyn Device,
        _textures: &mut dyn TextureLoader,
    ) -> bool {
        self.record("shutdown".to_string());
        true
    }
}

/// Calls logged for variant `name`, without the prefix.
pub fn calls_for(log: &CallLog, name: &str) -> Vec<String> {
    let prefix = format!("{name}:");
    log.borrow()
        .iter()
        .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
        .collect()
}
