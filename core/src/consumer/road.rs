//! Road segments blended over the terrain.

use ridgeline_shared::{EffectId, GeometryHandle, TextureHandle};

use super::{DrawStats, draw_effect, draw_shroud, layers};
use crate::config::TerrainConfig;
use crate::device::Device;
use crate::effect::PassOptions;
use crate::error::ShaderError;
use crate::manager::ShaderManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoadTextures {
    pub road: TextureHandle,
    pub cloud: TextureHandle,
    pub noise: TextureHandle,
}

pub fn road_effect(config: &TerrainConfig, textures: &RoadTextures) -> EffectId {
    match layers(
        config.use_cloud_map,
        config.use_light_map,
        textures.cloud.is_valid(),
        textures.noise.is_valid(),
    ) {
        (true, true) => EffectId::RoadBaseNoise12,
        (false, true) => EffectId::RoadBaseNoise2,
        (true, false) => EffectId::RoadBaseNoise1,
        (false, false) => EffectId::RoadBase,
    }
}

/// Draw road batches sharing one road texture, then the shroud over them.
pub fn draw_roads(
    shaders: &mut ShaderManager,
    device: &mut dyn Device,
    textures: &RoadTextures,
    batches: &[GeometryHandle],
) -> Result<(DrawStats, DrawStats), ShaderError> {
    let effect = road_effect(&shaders.config().terrain, textures);
    shaders.set_texture(0, textures.road)?;
    shaders.set_texture(1, textures.cloud)?;
    shaders.set_texture(2, textures.noise)?;

    let roads = draw_effect(shaders, device, effect, PassOptions::default(), batches)?;
    let shroud = draw_shroud(shaders, device, PassOptions::default(), batches)?;
    Ok((roads, shroud))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::probe::CapabilityProbe;
    use crate::test_utils::{FakeDevice, FakeTextures};

    const TEXTURES: RoadTextures = RoadTextures {
        road: TextureHandle(20),
        cloud: TextureHandle(21),
        noise: TextureHandle(22),
    };

    fn manager(device: &mut FakeDevice) -> ShaderManager {
        let mut shaders = ShaderManager::new();
        shaders.init(
            device,
            &mut FakeTextures::default(),
            &mut CapabilityProbe::default(),
            &RenderConfig::default(),
        );
        shaders
    }

    #[test]
    fn road_slots_are_road_cloud_noise() {
        let mut device = FakeDevice::fixed_function();
        let mut shaders = manager(&mut device);
        let (roads, shroud) =
            draw_roads(&mut shaders, &mut device, &TEXTURES, &[GeometryHandle(9)]).unwrap();

        assert_eq!(roads.passes, 2);
        assert_eq!(shroud, DrawStats::default());
        assert_eq!(shaders.shader_texture(0), TEXTURES.road);
        assert_eq!(shaders.shader_texture(1), TEXTURES.cloud);
        assert_eq!(shaders.shader_texture(2), TEXTURES.noise);
    }

    #[test]
    fn pixel_shader_roads_with_both_layers_take_one_pass() {
        let mut device = FakeDevice::with_pixel_shaders();
        let mut shaders = manager(&mut device);
        assert_eq!(shaders.selected_variant(EffectId::RoadBaseNoise12), Some("road-ps"));
        let (roads, _) =
            draw_roads(&mut shaders, &mut device, &TEXTURES, &[GeometryHandle(9)]).unwrap();
        assert_eq!(roads.passes, 1);
    }

    #[test]
    fn roads_without_layers() {
        let mut config = TerrainConfig::default();
        config.use_cloud_map = false;
        config.use_light_map = false;
        assert_eq!(road_effect(&config, &TEXTURES), EffectId::RoadBase);
    }
}
