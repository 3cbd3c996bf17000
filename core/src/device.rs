//! Boundary to the graphics-device wrapper and the texture loader.
//!
//! Both are external collaborators. The effect layer only sequences calls
//! into them; it never talks to a graphics API directly.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};
use ridgeline_shared::{
    AdapterIdentity, DeviceCaps, GeometryHandle, ShaderHandle, SurfaceHandle, TextureHandle,
};

use crate::error::DeviceError;
use crate::state::{GpuStateSnapshot, StateChange};

/// An off-screen colour target and the surface to draw into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTexture {
    pub texture: TextureHandle,
    pub surface: SurfaceHandle,
}

/// Tactical view rectangle in back-buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Pre-transformed, pre-lit vertex of a full-screen quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct ScreenVertex {
    /// Pixel position (already offset by half a pixel).
    pub position: Vec2,
    pub uv0: Vec2,
    pub uv1: Vec2,
    /// ARGB diffuse
    pub color: u32,
    pub _pad: u32,
}

/// Triangle strip: bottom-right, top-right, bottom-left, top-left.
pub type ScreenQuad = [ScreenVertex; 4];

/// Trait for the graphics-device wrapper.
///
/// Capability queries return `None` while no device exists. Everything else
/// is a primitive the wrapper already provides.
pub trait Device {
    /// Adapter identity, `None` until the device is created.
    fn adapter(&self) -> Option<AdapterIdentity>;

    /// Raw capabilities, `None` until the device is created.
    fn caps(&self) -> Option<DeviceCaps>;

    /// True between a device loss and its recreation.
    fn is_lost(&self) -> bool;

    fn back_buffer_size(&self) -> (u32, u32);

    fn viewport(&self) -> Viewport;

    /// Current camera view transform.
    fn view_transform(&self) -> Mat4;

    fn render_target(&self) -> Result<SurfaceHandle, DeviceError>;

    fn depth_surface(&self) -> Result<SurfaceHandle, DeviceError>;

    fn set_render_target(
        &mut self,
        color: SurfaceHandle,
        depth: SurfaceHandle,
    ) -> Result<(), DeviceError>;

    /// Allocate a colour texture usable as a render target.
    fn create_render_texture(&mut self, width: u32, height: u32)
    -> Result<RenderTexture, DeviceError>;

    /// Allocate a dynamic R5G6B5 texture.
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureHandle, DeviceError>;

    /// Upload tightly packed texel bytes covering the whole texture.
    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<(), DeviceError>;

    fn release_texture(&mut self, texture: TextureHandle);

    fn release_surface(&mut self, surface: SurfaceHandle);

    /// Assemble and create a pixel-shader program by name.
    fn create_pixel_shader(&mut self, program: &str) -> Result<ShaderHandle, DeviceError>;

    fn delete_pixel_shader(&mut self, shader: ShaderHandle);

    /// State the device currently holds.
    fn state(&self) -> &GpuStateSnapshot;

    /// Apply state changes in order.
    fn apply_state(&mut self, changes: &[StateChange]);

    fn draw(&mut self, geometry: GeometryHandle);

    fn draw_screen_quad(&mut self, quad: &ScreenQuad);
}

/// "Get texture by name" with reference-counted lifetime.
pub trait TextureLoader {
    /// Load or add a reference to a named texture.
    fn load(&mut self, name: &str) -> Option<TextureHandle>;

    /// Drop one reference.
    fn release(&mut self, texture: TextureHandle);
}
