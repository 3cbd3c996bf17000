//! Fog-of-war shroud.
//!
//! [`FogGrid`] holds one visibility level per shroud cell for the whole map
//! and fades the displayed levels toward the ones gameplay asked for.
//! [`ShroudRenderer`] copies the part under the camera into a small device
//! texture, one texel per cell with a border ring, and publishes where that
//! texture lies so the shroud overlay can project it.

use glam::{IVec2, UVec2, Vec2};
use log::{debug, info, warn};
use ridgeline_shared::{
    MAP_XY_FACTOR, SHROUD_BORDER_TEXELS, SHROUD_LEVEL_CLEAR, Texel565, TextureHandle,
};

use crate::config::ShroudConfig;
use crate::device::Device;
use crate::effect::ShroudProjection;
use crate::error::DeviceError;
use crate::manager::ShaderManager;

/// Heightmap dimensions a shroud is built for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShroudLayout {
    /// Heightmap size in vertices, border included.
    pub extent: UVec2,
    /// Border vertices on each side. No shroud is kept for the border.
    pub border: u32,
    /// Largest terrain window drawn at once, in vertices.
    pub max_draw: UVec2,
    /// World size of one shroud cell.
    pub cell_size: Vec2,
}

/// Cells copied to the device this frame, `start..end` on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    pub start: UVec2,
    pub end: UVec2,
    /// World position of the `start` cell.
    pub draw_origin: Vec2,
}

impl VisibleWindow {
    pub fn size(&self) -> UVec2 {
        self.end - self.start
    }
}

/// Scale `color` by `level` and pack it. A clear cell is always white.
pub fn pack_level(level: u8, color: [u8; 3]) -> Texel565 {
    if level == SHROUD_LEVEL_CLEAR {
        return Texel565::pack(255, 255, 255);
    }
    let scale = |c: u8| (level as f32 * (c as f32 / 255.0)) as u8;
    Texel565::pack(scale(color[0]), scale(color[1]), scale(color[2]))
}

/// Visibility level a packed texel stands for, from its 6 green bits.
pub fn unpack_level(texel: Texel565) -> u8 {
    ((texel.green() >> 2) as f32 / 63.0 * 255.0) as u8
}

fn cell_count(vertices: u32, border: u32, cell: f32) -> u32 {
    let span = vertices.saturating_sub(1 + 2 * border) as f32;
    (span * MAP_XY_FACTOR / cell).ceil() as u32
}

fn visible_cells(vertices: u32, cell: f32) -> u32 {
    (vertices.saturating_sub(1) as f32 * MAP_XY_FACTOR / cell).floor() as u32 + 1
}

/// Per-cell shroud levels for a whole map.
#[derive(Debug, Clone)]
pub struct FogGrid {
    cells: UVec2,
    cell_size: Vec2,
    border: u32,
    max_visible: UVec2,
    /// Packed texels as they will be uploaded.
    texels: Vec<Texel565>,
    current: Vec<u8>,
    target: Vec<u8>,
    border_level: u8,
    border_dirty: bool,
    config: ShroudConfig,
}

impl FogGrid {
    /// A fully black grid covering `layout`.
    pub fn new(layout: &ShroudLayout, config: &ShroudConfig) -> Self {
        let cells = UVec2::new(
            cell_count(layout.extent.x, layout.border, layout.cell_size.x),
            cell_count(layout.extent.y, layout.border, layout.cell_size.y),
        );
        let max_visible = UVec2::new(
            visible_cells(layout.max_draw.x, layout.cell_size.x),
            visible_cells(layout.max_draw.y, layout.cell_size.y),
        );
        let len = (cells.x * cells.y) as usize;
        Self {
            cells,
            cell_size: layout.cell_size,
            border: layout.border,
            max_visible,
            texels: vec![Texel565::default(); len],
            current: vec![0; len],
            target: vec![0; len],
            border_level: 0,
            border_dirty: true,
            config: config.clone(),
        }
    }

    pub fn cells(&self) -> UVec2 {
        self.cells
    }

    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// Most cells the terrain window can cover on each axis.
    pub fn max_visible(&self) -> UVec2 {
        self.max_visible
    }

    /// Change colour, floor level or fade rate. Takes effect on the next write.
    pub fn set_config(&mut self, config: &ShroudConfig) {
        self.config = config.clone();
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.cells.x && y < self.cells.y).then(|| (x + y * self.cells.x) as usize)
    }

    fn clamp(&self, level: u8) -> u8 {
        level.max(self.config.shroud_alpha)
    }

    fn write_texel(&mut self, index: usize, level: u8) {
        self.texels[index] = pack_level(level, self.config.shroud_color);
    }

    /// Record the level a cell should fade to. Out-of-range cells are ignored.
    pub fn set_level(&mut self, x: u32, y: u32, level: u8) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let level = self.clamp(level);
        self.target[i] = level;
        self.write_texel(i, level);
    }

    /// Level shown for a cell, as read back from its texel.
    pub fn level_at(&self, x: u32, y: u32) -> u8 {
        self.index(x, y).map_or(0, |i| unpack_level(self.texels[i]))
    }

    /// Set every cell to `level`. Displayed levels still fade toward it.
    pub fn fill(&mut self, level: u8) {
        let level = self.clamp(level);
        let texel = pack_level(level, self.config.shroud_color);
        self.texels.fill(texel);
        self.target.fill(level);
    }

    /// Level drawn around the map edge. Forces the border ring to be redrawn.
    pub fn set_border_level(&mut self, level: u8) {
        self.border_level = self.clamp(level);
        self.border_dirty = true;
    }

    pub fn border_level(&self) -> u8 {
        self.border_level
    }

    fn take_border_refresh(&mut self) -> bool {
        std::mem::take(&mut self.border_dirty)
    }

    /// Move every displayed level toward its target by the time elapsed.
    ///
    /// A level closer to its target than one step snaps to it. Returns
    /// true if any texel changed.
    pub fn interpolate(&mut self, delta_ms: u32) -> bool {
        if delta_ms == 0 {
            return false;
        }
        let step = (self.config.interpolation_rate_per_ms * delta_ms as f32).min(255.0) as u8;

        let mut changed = false;
        for i in 0..self.current.len() {
            let (from, to) = (self.current[i], self.target[i]);
            if from == to {
                continue;
            }
            let next = if to < from {
                if from - to < step { to } else { from - step }
            } else if to - from < step {
                to
            } else {
                from + step
            };
            self.current[i] = next;
            self.write_texel(i, next);
            changed = true;
        }
        changed
    }

    /// Cells under a terrain window starting at heightmap vertex `origin`.
    ///
    /// The window keeps its size and slides back inside the map when it
    /// would run past the far edge.
    pub fn visible_window(&self, origin: IVec2, size: UVec2) -> VisibleWindow {
        let axis = |origin: i32, size: u32, cell: f32, cells: u32| {
            let start = ((origin - self.border as i32) as f32 * MAP_XY_FACTOR / cell).floor();
            let mut start = start.max(0.0) as u32;
            let mut end = start + visible_cells(size, cell);
            if end > cells {
                start = start.saturating_sub(end - cells);
                end = cells;
            }
            (start, end)
        };
        let (sx, ex) = axis(origin.x, size.x, self.cell_size.x, self.cells.x);
        let (sy, ey) = axis(origin.y, size.y, self.cell_size.y, self.cells.y);
        VisibleWindow {
            start: UVec2::new(sx, sy),
            end: UVec2::new(ex, ey),
            draw_origin: Vec2::new(sx as f32, sy as f32) * self.cell_size,
        }
    }

    fn row(&self, y: u32, x: std::ops::Range<u32>) -> &[Texel565] {
        let base = (y * self.cells.x) as usize;
        &self.texels[base + x.start as usize..base + x.end as usize]
    }
}

/// Owns the device copy of the shroud.
///
/// The device texture does not survive a device reset. Call
/// [`release_resources`](Self::release_resources) before the reset and
/// [`reacquire_resources`](Self::reacquire_resources) after it; the grid
/// itself is kept.
#[derive(Debug, Default)]
pub struct ShroudRenderer {
    grid: Option<FogGrid>,
    texture: TextureHandle,
    texture_size: UVec2,
    /// CPU mirror of the device texture.
    staging: Vec<Texel565>,
    clear_staging: bool,
}

impl ShroudRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a black grid for a new map and size the device texture for it.
    pub fn load_map(
        &mut self,
        device: &mut dyn Device,
        layout: &ShroudLayout,
        config: &ShroudConfig,
    ) -> Result<(), DeviceError> {
        let grid = FogGrid::new(layout, config);
        let size = grid.max_visible() + UVec2::splat(2 * SHROUD_BORDER_TEXELS);
        info!(
            "Shroud {}x{} cells, texture {}x{}",
            grid.cells().x,
            grid.cells().y,
            size.x,
            size.y
        );
        self.grid = Some(grid);
        self.clear_staging = true;

        if size != self.texture_size {
            self.release_resources(device);
            self.texture_size = size;
        }
        if !self.texture.is_valid() {
            self.reacquire_resources(device)?;
        }
        Ok(())
    }

    /// Forget the map. The device texture is kept for the next one.
    pub fn reset(&mut self, shaders: &mut ShaderManager) {
        self.grid = None;
        self.clear_staging = true;
        shaders.scene_mut().shroud = None;
    }

    pub fn shutdown(&mut self, device: &mut dyn Device, shaders: &mut ShaderManager) {
        self.reset(shaders);
        self.release_resources(device);
        self.texture_size = UVec2::ZERO;
    }

    pub fn grid(&self) -> Option<&FogGrid> {
        self.grid.as_ref()
    }

    pub fn grid_mut(&mut self) -> Option<&mut FogGrid> {
        self.grid.as_mut()
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Drop the device texture.
    pub fn release_resources(&mut self, device: &mut dyn Device) {
        if self.texture.is_valid() {
            device.release_texture(self.texture);
            self.texture = TextureHandle::INVALID;
        }
    }

    /// Recreate the device texture. Does nothing before the first map.
    pub fn reacquire_resources(&mut self, device: &mut dyn Device) -> Result<(), DeviceError> {
        if self.texture_size == UVec2::ZERO {
            return Ok(());
        }
        debug_assert!(!self.texture.is_valid(), "shroud texture reacquired twice");
        match device.create_texture(self.texture_size.x, self.texture_size.y) {
            Ok(texture) => {
                self.texture = texture;
                self.staging = vec![Texel565::default(); (self.texture_size.x * self.texture_size.y) as usize];
                self.clear_staging = true;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to create shroud texture: {e}");
                self.texture_size = UVec2::ZERO;
                Err(e)
            }
        }
    }

    /// Fade the grid, upload the cells under the terrain window and publish
    /// the projection.
    ///
    /// Without a map or a device texture the shroud is withdrawn from the
    /// scene and nothing is uploaded.
    pub fn update(
        &mut self,
        device: &mut dyn Device,
        shaders: &mut ShaderManager,
        draw_origin: IVec2,
        draw_size: UVec2,
        delta_ms: u32,
    ) -> Result<(), DeviceError> {
        let Some(grid) = self.grid.as_mut() else {
            shaders.scene_mut().shroud = None;
            return Ok(());
        };
        if !self.texture.is_valid() {
            shaders.scene_mut().shroud = None;
            return Ok(());
        }

        let window = grid.visible_window(draw_origin, draw_size);
        grid.interpolate(delta_ms);

        let width = self.texture_size.x as usize;
        if grid.take_border_refresh() | std::mem::take(&mut self.clear_staging) {
            let border = pack_level(grid.border_level(), grid.config.shroud_color);
            self.staging.fill(border);
        }

        let border = SHROUD_BORDER_TEXELS;
        let copy = window.size().min(self.texture_size - UVec2::splat(2 * border));
        for row in 0..copy.y {
            let src = grid.row(window.start.y + row, window.start.x..window.start.x + copy.x);
            let dst = (row + border) as usize * width + border as usize;
            self.staging[dst..dst + src.len()].copy_from_slice(src);
        }
        device.write_texture(self.texture, bytemuck::cast_slice(&self.staging))?;

        shaders.scene_mut().shroud = Some(ShroudProjection {
            texture: self.texture,
            cell_width: grid.cell_size.x,
            cell_height: grid.cell_size.y,
            draw_origin: window.draw_origin,
            texture_width: self.texture_size.x,
            texture_height: self.texture_size.y,
        });
        debug!(
            "Shroud window {:?}..{:?} at {}",
            window.start, window.end, window.draw_origin
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DeviceCall, FakeDevice};

    fn layout() -> ShroudLayout {
        ShroudLayout {
            extent: UVec2::new(130, 130),
            border: 5,
            max_draw: UVec2::new(65, 65),
            cell_size: Vec2::splat(10.0),
        }
    }

    fn grid() -> FogGrid {
        FogGrid::new(&layout(), &ShroudConfig::default())
    }

    #[test]
    fn cells_cover_the_map_without_its_border() {
        let grid = grid();
        assert_eq!(grid.cells(), UVec2::new(119, 119));
        assert_eq!(grid.max_visible(), UVec2::new(65, 65));

        let coarse = FogGrid::new(
            &ShroudLayout {
                cell_size: Vec2::splat(30.0),
                ..layout()
            },
            &ShroudConfig::default(),
        );
        assert_eq!(coarse.cells(), UVec2::new(40, 40));
        assert_eq!(coarse.max_visible(), UVec2::new(22, 22));
    }

    #[test]
    fn levels_read_back_from_green_bits() {
        let mut grid = grid();
        grid.set_level(3, 4, 255);
        grid.set_level(5, 4, 128);
        assert_eq!(grid.level_at(3, 4), 255);
        assert_eq!(grid.level_at(5, 4), 129);
        assert_eq!(grid.level_at(0, 0), 0);
    }

    #[test]
    fn levels_never_drop_below_shroud_alpha() {
        let config = ShroudConfig {
            shroud_alpha: 128,
            ..ShroudConfig::default()
        };
        let mut grid = FogGrid::new(&layout(), &config);
        grid.set_level(1, 1, 0);
        assert_eq!(grid.level_at(1, 1), 129);
        grid.set_border_level(10);
        assert_eq!(grid.border_level(), 128);
    }

    #[test]
    fn out_of_range_cells_are_ignored() {
        let mut grid = grid();
        grid.set_level(119, 0, 255);
        grid.set_level(0, 500, 255);
        assert_eq!(grid.level_at(119, 0), 0);
        assert!(grid.texels.iter().all(|t| t.0 == 0));
    }

    #[test]
    fn levels_tint_the_shroud_colour() {
        assert_eq!(pack_level(128, [255, 0, 0]).0, 0x8000);
        assert_eq!(pack_level(128, [0, 0, 255]).0, 0x0010);
        // Clear cells ignore the colour.
        assert_eq!(pack_level(255, [255, 0, 0]).0, 0xffff);
    }

    #[test]
    fn interpolation_fades_toward_target() {
        let mut grid = grid();
        grid.set_level(0, 0, 255);
        assert!(!grid.interpolate(0));

        // 0.255 per millisecond, 25 levels in 100ms.
        assert!(grid.interpolate(100));
        assert_eq!(grid.current[0], 25);
        let partial = grid.level_at(0, 0);
        assert!(partial > 0 && partial < 255);

        assert!(grid.interpolate(1000));
        assert_eq!(grid.level_at(0, 0), 255);
        assert!(!grid.interpolate(16));
    }

    #[test]
    fn fill_sets_every_target() {
        let mut grid = grid();
        grid.fill(255);
        assert_eq!(grid.level_at(118, 118), 255);
        grid.interpolate(2000);
        assert!(grid.current.iter().all(|&l| l == 255));

        grid.fill(0);
        grid.interpolate(40);
        // floor(0.255 * 40) = 10
        assert!(grid.current.iter().all(|&l| l == 245));
    }

    #[test]
    fn window_stays_inside_the_map() {
        let grid = grid();

        let w = grid.visible_window(IVec2::new(0, 0), UVec2::new(65, 65));
        assert_eq!(w.start, UVec2::ZERO);
        assert_eq!(w.end, UVec2::new(65, 65));

        let w = grid.visible_window(IVec2::new(15, 5), UVec2::new(65, 65));
        assert_eq!(w.start, UVec2::new(10, 0));
        assert_eq!(w.draw_origin, Vec2::new(100.0, 0.0));

        // Past the far edge: shifted back, same size.
        let w = grid.visible_window(IVec2::new(100, 100), UVec2::new(65, 65));
        assert_eq!(w.start, UVec2::new(54, 54));
        assert_eq!(w.end, UVec2::new(119, 119));
        assert_eq!(w.size(), UVec2::new(65, 65));
        assert_eq!(w.draw_origin, Vec2::new(540.0, 540.0));
    }

    #[test]
    fn window_larger_than_map_starts_at_zero() {
        let small = FogGrid::new(
            &ShroudLayout {
                extent: UVec2::new(40, 40),
                ..layout()
            },
            &ShroudConfig::default(),
        );
        let w = small.visible_window(IVec2::new(20, 20), UVec2::new(65, 65));
        assert_eq!(w.start, UVec2::ZERO);
        assert_eq!(w.end, small.cells());
    }

    #[test]
    fn update_uploads_window_inside_border_ring() {
        let mut device = FakeDevice::fixed_function();
        let mut shaders = ShaderManager::new();
        let mut shroud = ShroudRenderer::new();
        shroud.load_map(&mut device, &layout(), &ShroudConfig::default()).unwrap();
        assert!(device.calls.contains(&DeviceCall::CreateTexture { width: 67, height: 67 }));

        let grid = shroud.grid_mut().unwrap();
        grid.set_border_level(64);
        grid.set_level(10, 0, 255);
        grid.interpolate(1000);

        shroud
            .update(&mut device, &mut shaders, IVec2::new(15, 5), UVec2::new(65, 65), 0)
            .unwrap();

        let texture = shroud.texture();
        assert_eq!(device.uploads_to(texture), 1);
        assert!(device.calls.contains(&DeviceCall::WriteTexture { texture, bytes: 67 * 67 * 2 }));
        assert_eq!(shroud.staging[0], pack_level(64, [255; 3]));
        // Cell (10, 0) is the window's first cell, at texel (1, 1).
        assert_eq!(shroud.staging[67 + 1].0, 0xffff);

        let projection = shaders.scene().shroud.unwrap();
        assert_eq!(projection.texture, texture);
        assert_eq!(projection.draw_origin, Vec2::new(100.0, 0.0));
        assert_eq!((projection.texture_width, projection.texture_height), (67, 67));
    }

    #[test]
    fn device_reset_recreates_the_texture() {
        let mut device = FakeDevice::fixed_function();
        let mut shaders = ShaderManager::new();
        let mut shroud = ShroudRenderer::new();
        shroud.load_map(&mut device, &layout(), &ShroudConfig::default()).unwrap();
        let before = shroud.texture();

        shroud.release_resources(&mut device);
        assert!(device.calls.contains(&DeviceCall::ReleaseTexture(before)));
        shroud
            .update(&mut device, &mut shaders, IVec2::ZERO, UVec2::new(65, 65), 16)
            .unwrap();
        assert_eq!(shaders.scene().shroud, None);
        assert_eq!(device.uploads_to(before), 0);

        shroud.reacquire_resources(&mut device).unwrap();
        assert!(shroud.texture().is_valid());
        assert_ne!(shroud.texture(), before);
        // The grid survives the reset.
        assert_eq!(shroud.grid().unwrap().cells(), UVec2::new(119, 119));
    }

    #[test]
    fn reacquire_before_any_map_is_a_no_op() {
        let mut device = FakeDevice::fixed_function();
        let mut shroud = ShroudRenderer::new();
        shroud.reacquire_resources(&mut device).unwrap();
        assert!(!shroud.texture().is_valid());
        assert!(device.calls.is_empty());
    }

    #[test]
    fn reset_withdraws_the_shroud() {
        let mut device = FakeDevice::fixed_function();
        let mut shaders = ShaderManager::new();
        let mut shroud = ShroudRenderer::new();
        shroud.load_map(&mut device, &layout(), &ShroudConfig::default()).unwrap();
        shroud
            .update(&mut device, &mut shaders, IVec2::ZERO, UVec2::new(65, 65), 0)
            .unwrap();
        assert!(shaders.scene().shroud.is_some());

        shroud.reset(&mut shaders);
        assert_eq!(shaders.scene().shroud, None);
        assert!(shroud.texture().is_valid());

        shroud.shutdown(&mut device, &mut shaders);
        assert!(device.live_textures().is_empty());
    }
}
