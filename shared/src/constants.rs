//! Centralized constants for the Ridgeline renderer.
//!
//! Single source of truth for values shared by the effect layer,
//! the terrain consumers and the capability tooling.

/// Number of fixed-function texture stages tracked by the renderer.
///
/// Bound texture slots, GPU state snapshots and effect variants all
/// index stages in `0..MAX_TEXTURE_STAGES`.
pub const MAX_TEXTURE_STAGES: usize = 8;

/// World units covered by one heightmap cell along X or Y.
pub const MAP_XY_FACTOR: f32 = 10.0;

/// Cloud and noise textures stretch over 63/2 heightmap tiles.
pub const NOISE_STRETCH_FACTOR: f32 = 1.0 / (63.0 * MAP_XY_FACTOR / 2.0);

/// Unused texels on each side of the shroud texture.
pub const SHROUD_BORDER_TEXELS: u32 = 1;

/// Fully lit shroud level.
pub const SHROUD_LEVEL_CLEAR: u8 = 255;

/// Texture name of the crossfade alpha mask.
pub const CROSSFADE_MASK_TEXTURE: &str = "exmask_g.tga";
