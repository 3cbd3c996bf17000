//! Water surface with the shroud projected over it.

use log::warn;
use ridgeline_shared::{EffectId, GeometryHandle};
use wgpu::CompareFunction;

use super::{DrawStats, draw_effect};
use crate::device::Device;
use crate::effect::PassOptions;
use crate::error::ShaderError;
use crate::manager::ShaderManager;

/// Draw the water surface, then darken it with the shroud.
///
/// Water is drawn after the terrain beneath it, so the shroud pass tests
/// depth with less-or-equal instead of the usual equal test.
pub fn draw_water(
    shaders: &mut ShaderManager,
    device: &mut dyn Device,
    surface: &[GeometryHandle],
) -> Result<(DrawStats, DrawStats), ShaderError> {
    for &batch in surface {
        device.draw(batch);
    }
    let water = DrawStats {
        passes: 1,
        draws: surface.len() as u32,
    };

    let Some(shroud) = shaders.scene().shroud else {
        return Ok((water, DrawStats::default()));
    };
    if !shroud.texture.is_valid() {
        warn!("Shroud texture missing, water drawn without fog");
        return Ok((water, DrawStats::default()));
    }
    shaders.set_texture(0, shroud.texture)?;
    let options = PassOptions::default().with_depth_compare(CompareFunction::LessEqual);
    let fog = draw_effect(shaders, device, EffectId::ShroudTexture, options, surface)?;
    Ok((water, fog))
}
