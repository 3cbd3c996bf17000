//! Texture projection matrices.
//!
//! Projected stages take camera-space positions as texture coordinates, so
//! every matrix here starts by undoing the view transform and then maps
//! world x/y onto the texture.

use glam::{Mat4, Vec2, Vec3};
use ridgeline_shared::NOISE_STRETCH_FACTOR;

use super::ShroudProjection;

/// Texels per side of the crossfade mask texture.
const MASK_TEXTURE_SIZE: f32 = 128.0;

/// World units per mask texel when the fade starts.
const MASK_START_TEXEL_SIZE: f32 = 25.0;

/// Scrolling offset of the cloud layer.
///
/// One instance is shared by every variant that draws clouds, so terrain,
/// roads and the cloud overlay stay aligned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CloudScroll {
    pub offset: Vec2,
    last_sync_ms: Option<u64>,
}

impl CloudScroll {
    /// Move the clouds by the time elapsed since the previous call.
    ///
    /// The first call only records the time. The offset stays within
    /// (-1, 1) on both axes.
    pub fn advance(&mut self, sync_time_ms: u64, slide_per_second: [f32; 2]) {
        let elapsed = self
            .last_sync_ms
            .map_or(0, |last| sync_time_ms.saturating_sub(last));
        self.last_sync_ms = Some(sync_time_ms);

        self.offset += Vec2::from(slide_per_second) * (elapsed as f32 / 1000.0);
        self.offset.x %= 1.0;
        self.offset.y %= 1.0;
    }
}

/// Stretch the cloud texture over the map and slide it by `offset`.
pub fn cloud_matrix(offset: Vec2, view: Mat4) -> Mat4 {
    Mat4::from_translation(offset.extend(0.0)) * noise_matrix(view)
}

/// Stretch the static light/noise texture over the map.
pub fn noise_matrix(view: Mat4) -> Mat4 {
    Mat4::from_scale(Vec3::new(NOISE_STRETCH_FACTOR, NOISE_STRETCH_FACTOR, 1.0)) * view.inverse()
}

/// One shroud texel per terrain cell, relative to the shroud draw origin.
///
/// The origin is shifted by one cell to skip the border texels.
pub fn shroud_matrix(shroud: &ShroudProjection, view: Mat4) -> Mat4 {
    let scale = Mat4::from_scale(Vec3::new(
        1.0 / (shroud.cell_width * shroud.texture_width as f32),
        1.0 / (shroud.cell_height * shroud.texture_height as f32),
        1.0,
    ));
    let offset = Mat4::from_translation(Vec3::new(
        -shroud.draw_origin.x + shroud.cell_width,
        -shroud.draw_origin.y + shroud.cell_height,
        0.0,
    ));
    scale * offset * view.inverse()
}

/// Centre the crossfade mask on `center`, growing it as `fade` goes to 1.
///
/// At full fade the mask collapses to a single texel so the whole screen
/// samples the same value.
pub fn mask_matrix(center: Vec2, fade: f32, view: Mat4) -> Mat4 {
    let to_center = Mat4::from_translation((-center).extend(0.0)) * view.inverse();
    let texel_size = (1.0 - fade) * MASK_START_TEXEL_SIZE;
    if texel_size == 0.0 {
        return Mat4::from_scale(Vec3::new(0.0, 0.0, 1.0)) * to_center;
    }
    let inv = 1.0 / (texel_size * MASK_TEXTURE_SIZE);
    Mat4::from_translation(Vec3::new(0.5, 0.5, 0.0))
        * Mat4::from_scale(Vec3::new(inv, inv, 1.0))
        * to_center
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    const EPS: f32 = 1e-5;

    #[test]
    fn first_advance_only_records_time() {
        let mut clouds = CloudScroll::default();
        clouds.advance(5_000, [-0.02, -0.03]);
        assert_eq!(clouds.offset, Vec2::ZERO);

        clouds.advance(6_000, [-0.02, -0.03]);
        assert!((clouds.offset - Vec2::new(-0.02, -0.03)).length() < EPS);
    }

    #[test]
    fn offset_wraps() {
        let mut clouds = CloudScroll::default();
        clouds.advance(0, [0.5, -0.75]);
        clouds.advance(3_000, [0.5, -0.75]);
        assert!((clouds.offset.x - 0.5).abs() < EPS);
        assert!((clouds.offset.y + 0.25).abs() < EPS);
    }

    #[test]
    fn clock_going_backwards_does_not_scroll() {
        let mut clouds = CloudScroll::default();
        clouds.advance(1_000, [1.0, 1.0]);
        clouds.advance(500, [1.0, 1.0]);
        assert_eq!(clouds.offset, Vec2::ZERO);
    }

    #[test]
    fn cloud_matrix_slides_texture_space() {
        let view = Mat4::IDENTITY;
        let p = Vec4::new(10.0, 20.0, 0.0, 1.0);
        let still = cloud_matrix(Vec2::ZERO, view) * p;
        let moved = cloud_matrix(Vec2::new(0.25, 0.0), view) * p;
        assert!((moved.x - still.x - 0.25).abs() < EPS);
        assert!((still.x - 10.0 * NOISE_STRETCH_FACTOR).abs() < EPS);
    }

    #[test]
    fn shroud_matrix_maps_cells_to_texels() {
        let shroud = ShroudProjection {
            texture: ridgeline_shared::TextureHandle(1),
            cell_width: 10.0,
            cell_height: 10.0,
            draw_origin: Vec2::new(100.0, 50.0),
            texture_width: 64,
            texture_height: 32,
        };
        let view = Mat4::from_translation(Vec3::new(-3.0, 4.0, -100.0));
        let m = shroud_matrix(&shroud, view);

        // World point at the draw origin, seen through the camera.
        let camera_space = view * Vec4::new(100.0, 50.0, 0.0, 1.0);
        let uv = m * camera_space;
        assert!((uv.x - 1.0 / 64.0).abs() < EPS);
        assert!((uv.y - 1.0 / 32.0).abs() < EPS);
    }

    #[test]
    fn mask_centres_on_point_and_collapses_at_full_fade() {
        let view = Mat4::IDENTITY;
        let center = Vec2::new(40.0, -8.0);
        let p = Vec4::new(40.0, -8.0, 0.0, 1.0);

        let uv = mask_matrix(center, 0.5, view) * p;
        assert!((uv.x - 0.5).abs() < EPS && (uv.y - 0.5).abs() < EPS);

        let far = mask_matrix(center, 1.0, view) * Vec4::new(900.0, 900.0, 0.0, 1.0);
        assert_eq!((far.x, far.y), (0.0, 0.0));
    }
}
