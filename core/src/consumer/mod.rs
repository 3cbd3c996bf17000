//! Draw loops for geometry that renders through the effect layer.
//!
//! Every consumer follows the same protocol: bind textures to slots, run
//! `set_shader` for each pass with a draw of every batch in between, and
//! reset once at the end.

mod road;
mod terrain;
mod water;

pub use road::{RoadTextures, draw_roads, road_effect};
pub use terrain::{
    TerrainStats, TerrainTextures, draw_flat_terrain, draw_terrain, flat_terrain_effect,
    terrain_effect,
};
pub use water::draw_water;

use log::warn;
use ridgeline_shared::{EffectId, GeometryHandle};

use crate::device::Device;
use crate::effect::PassOptions;
use crate::error::ShaderError;
use crate::manager::ShaderManager;

/// What one draw loop submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawStats {
    pub passes: u32,
    pub draws: u32,
}

/// Which noise layers to blend, given what is wanted and what is loaded.
pub(crate) fn layers(want_cloud: bool, want_light: bool, cloud: bool, light: bool) -> (bool, bool) {
    (want_cloud && cloud, want_light && light)
}

/// Draw `batches` once per pass of `effect`, then reset the effect.
///
/// Unsupported effects draw nothing. If a pass fails part way the effect is
/// still reset before the error is returned.
pub fn draw_effect(
    shaders: &mut ShaderManager,
    device: &mut dyn Device,
    effect: EffectId,
    options: PassOptions,
    batches: &[GeometryHandle],
) -> Result<DrawStats, ShaderError> {
    let mut stats = DrawStats::default();
    for pass in 0..shaders.shader_passes(effect) {
        match shaders.set_shader_with(device, effect, pass, options) {
            Ok(status) if status.should_draw() => {}
            Ok(_) => break,
            Err(e) => {
                if stats.passes > 0 {
                    shaders.reset_shader(device, effect);
                }
                return Err(e);
            }
        }
        for &batch in batches {
            device.draw(batch);
            stats.draws += 1;
        }
        stats.passes += 1;
    }
    if stats.passes > 0 {
        shaders.reset_shader(device, effect);
    }
    Ok(stats)
}

/// Multiply the shroud over `batches` if a shroud is loaded.
pub fn draw_shroud(
    shaders: &mut ShaderManager,
    device: &mut dyn Device,
    options: PassOptions,
    batches: &[GeometryHandle],
) -> Result<DrawStats, ShaderError> {
    let Some(shroud) = shaders.scene().shroud else {
        return Ok(DrawStats::default());
    };
    if !shroud.texture.is_valid() {
        warn!("Shroud texture missing, drawing without fog");
        return Ok(DrawStats::default());
    }
    shaders.set_texture(0, shroud.texture)?;
    draw_effect(shaders, device, EffectId::ShroudTexture, options, batches)
}
