//! Device and texture loader that only hand out handles.
//!
//! Negotiation needs something to allocate against. These answer every
//! request successfully (unless told otherwise) so the report shows what
//! the capabilities alone select.

use glam::Mat4;
use ridgeline_core::{
    Device, DeviceError, GpuStateSnapshot, RenderTexture, ScreenQuad, StateChange, TextureLoader,
    Viewport,
};
use ridgeline_shared::{
    AdapterIdentity, DeviceCaps, GeometryHandle, ShaderHandle, SurfaceHandle, TextureHandle,
};

pub struct HeadlessDevice {
    identity: AdapterIdentity,
    caps: DeviceCaps,
    render_to_texture: bool,
    next_handle: u32,
    color: SurfaceHandle,
    depth: SurfaceHandle,
    state: GpuStateSnapshot,
    shaders_created: u32,
}

impl HeadlessDevice {
    pub fn new(identity: AdapterIdentity, caps: DeviceCaps, render_to_texture: bool) -> Self {
        Self {
            identity,
            caps,
            render_to_texture,
            next_handle: 2,
            color: SurfaceHandle(1),
            depth: SurfaceHandle(2),
            state: GpuStateSnapshot::default(),
            shaders_created: 0,
        }
    }

    /// Pixel-shader programs assembled so far.
    pub fn shaders_created(&self) -> u32 {
        self.shaders_created
    }

    fn next(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl Device for HeadlessDevice {
    fn adapter(&self) -> Option<AdapterIdentity> {
        Some(self.identity.clone())
    }

    fn caps(&self) -> Option<DeviceCaps> {
        Some(self.caps)
    }

    fn is_lost(&self) -> bool {
        false
    }

    fn back_buffer_size(&self) -> (u32, u32) {
        (1024, 768)
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            x: 0,
            y: 0,
            width: 1024,
            height: 768,
        }
    }

    fn view_transform(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    fn render_target(&self) -> Result<SurfaceHandle, DeviceError> {
        Ok(self.color)
    }

    fn depth_surface(&self) -> Result<SurfaceHandle, DeviceError> {
        Ok(self.depth)
    }

    fn set_render_target(
        &mut self,
        color: SurfaceHandle,
        depth: SurfaceHandle,
    ) -> Result<(), DeviceError> {
        self.color = color;
        self.depth = depth;
        Ok(())
    }

    fn create_render_texture(
        &mut self,
        _width: u32,
        _height: u32,
    ) -> Result<RenderTexture, DeviceError> {
        if !self.render_to_texture {
            return Err(DeviceError::OutOfMemory { what: "render texture" });
        }
        Ok(RenderTexture {
            texture: TextureHandle(self.next()),
            surface: SurfaceHandle(self.next()),
        })
    }

    fn create_texture(&mut self, _width: u32, _height: u32) -> Result<TextureHandle, DeviceError> {
        Ok(TextureHandle(self.next()))
    }

    fn write_texture(&mut self, _texture: TextureHandle, _data: &[u8]) -> Result<(), DeviceError> {
        Ok(())
    }

    fn release_texture(&mut self, _texture: TextureHandle) {}

    fn release_surface(&mut self, _surface: SurfaceHandle) {}

    fn create_pixel_shader(&mut self, _program: &str) -> Result<ShaderHandle, DeviceError> {
        self.shaders_created += 1;
        Ok(ShaderHandle(self.next()))
    }

    fn delete_pixel_shader(&mut self, _shader: ShaderHandle) {}

    fn state(&self) -> &GpuStateSnapshot {
        &self.state
    }

    fn apply_state(&mut self, changes: &[StateChange]) {
        self.state.apply(changes);
    }

    fn draw(&mut self, _geometry: GeometryHandle) {}

    fn draw_screen_quad(&mut self, _quad: &ScreenQuad) {}
}

/// Every texture name resolves.
#[derive(Default)]
pub struct NamedTextures {
    next_handle: u32,
}

impl TextureLoader for NamedTextures {
    fn load(&mut self, _name: &str) -> Option<TextureHandle> {
        self.next_handle += 1;
        Some(TextureHandle(10_000 + self.next_handle))
    }

    fn release(&mut self, _texture: TextureHandle) {}
}
