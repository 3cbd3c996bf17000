//! Terrain tiles, with and without cliffs.

use ridgeline_shared::{EffectId, GeometryHandle, TextureHandle};

use super::{DrawStats, draw_effect, draw_shroud, layers};
use crate::config::TerrainConfig;
use crate::device::Device;
use crate::effect::PassOptions;
use crate::error::ShaderError;
use crate::manager::ShaderManager;

/// Textures a terrain draw binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerrainTextures {
    pub base: TextureHandle,
    pub cloud: TextureHandle,
    /// Static light map.
    pub noise: TextureHandle,
}

/// Submitted work for one terrain draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerrainStats {
    pub terrain: DrawStats,
    pub shroud: DrawStats,
}

/// Terrain effect for the configured noise layers.
///
/// Reflections are drawn with the base texture only.
pub fn terrain_effect(config: &TerrainConfig, textures: &TerrainTextures, reflection: bool) -> EffectId {
    if reflection {
        return EffectId::TerrainBase;
    }
    match layers(
        config.use_cloud_map,
        config.use_light_map,
        textures.cloud.is_valid(),
        textures.noise.is_valid(),
    ) {
        (true, true) => EffectId::TerrainBaseNoise12,
        (false, true) => EffectId::TerrainBaseNoise2,
        (true, false) => EffectId::TerrainBaseNoise1,
        (false, false) => EffectId::TerrainBase,
    }
}

pub fn flat_terrain_effect(config: &TerrainConfig, textures: &TerrainTextures) -> EffectId {
    match terrain_effect(config, textures, false) {
        EffectId::TerrainBaseNoise12 => EffectId::FlatTerrainBaseNoise12,
        EffectId::TerrainBaseNoise2 => EffectId::FlatTerrainBaseNoise2,
        EffectId::TerrainBaseNoise1 => EffectId::FlatTerrainBaseNoise1,
        _ => EffectId::FlatTerrainBase,
    }
}

/// Draw the visible terrain tiles, then the shroud over them.
pub fn draw_terrain(
    shaders: &mut ShaderManager,
    device: &mut dyn Device,
    textures: &TerrainTextures,
    tiles: &[GeometryHandle],
    reflection: bool,
) -> Result<TerrainStats, ShaderError> {
    let effect = terrain_effect(&shaders.config().terrain, textures, reflection);
    shaders.set_texture(0, textures.base)?;
    shaders.set_texture(1, textures.base)?;
    shaders.set_texture(2, textures.cloud)?;
    shaders.set_texture(3, textures.noise)?;

    let terrain = draw_effect(shaders, device, effect, PassOptions::default(), tiles)?;
    let shroud = if reflection {
        DrawStats::default()
    } else {
        draw_shroud(shaders, device, PassOptions::default(), tiles)?
    };
    Ok(TerrainStats { terrain, shroud })
}

/// Draw flat terrain. The shroud is folded into the terrain passes.
pub fn draw_flat_terrain(
    shaders: &mut ShaderManager,
    device: &mut dyn Device,
    textures: &TerrainTextures,
    tiles: &[GeometryHandle],
) -> Result<DrawStats, ShaderError> {
    let effect = flat_terrain_effect(&shaders.config().terrain, textures);
    let shroud = shaders.scene().shroud.map(|s| s.texture).unwrap_or_default();
    shaders.set_texture(0, shroud)?;
    shaders.set_texture(1, textures.base)?;
    shaders.set_texture(2, textures.cloud)?;
    shaders.set_texture(3, textures.noise)?;
    draw_effect(shaders, device, effect, PassOptions::default(), tiles)
}
