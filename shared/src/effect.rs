//! Effect and filter identifiers.
//!
//! An effect names a logical visual operation ("terrain with clouds",
//! "project the shroud") independent of which hardware-specific variant
//! renders it. The set is closed and known at compile time so the
//! selection record can be a plain array indexed by [`EffectId::index`].

use serde::{Deserialize, Serialize};

/// Logical per-geometry effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EffectId {
    TerrainBase = 0,
    TerrainBaseNoise1,
    TerrainBaseNoise2,
    TerrainBaseNoise12,
    ShroudTexture,
    FlatShroudTexture,
    MaskTexture,
    RoadBase,
    RoadBaseNoise1,
    RoadBaseNoise2,
    RoadBaseNoise12,
    CloudTexture,
    FlatTerrainBase,
    FlatTerrainBaseNoise1,
    FlatTerrainBaseNoise2,
    FlatTerrainBaseNoise12,
}

impl EffectId {
    pub const COUNT: usize = 16;

    pub const ALL: [EffectId; Self::COUNT] = [
        EffectId::TerrainBase,
        EffectId::TerrainBaseNoise1,
        EffectId::TerrainBaseNoise2,
        EffectId::TerrainBaseNoise12,
        EffectId::ShroudTexture,
        EffectId::FlatShroudTexture,
        EffectId::MaskTexture,
        EffectId::RoadBase,
        EffectId::RoadBaseNoise1,
        EffectId::RoadBaseNoise2,
        EffectId::RoadBaseNoise12,
        EffectId::CloudTexture,
        EffectId::FlatTerrainBase,
        EffectId::FlatTerrainBaseNoise1,
        EffectId::FlatTerrainBaseNoise2,
        EffectId::FlatTerrainBaseNoise12,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            EffectId::TerrainBase => "terrain-base",
            EffectId::TerrainBaseNoise1 => "terrain-base-noise1",
            EffectId::TerrainBaseNoise2 => "terrain-base-noise2",
            EffectId::TerrainBaseNoise12 => "terrain-base-noise12",
            EffectId::ShroudTexture => "shroud-texture",
            EffectId::FlatShroudTexture => "flat-shroud-texture",
            EffectId::MaskTexture => "mask-texture",
            EffectId::RoadBase => "road-base",
            EffectId::RoadBaseNoise1 => "road-base-noise1",
            EffectId::RoadBaseNoise2 => "road-base-noise2",
            EffectId::RoadBaseNoise12 => "road-base-noise12",
            EffectId::CloudTexture => "cloud-texture",
            EffectId::FlatTerrainBase => "flat-terrain-base",
            EffectId::FlatTerrainBaseNoise1 => "flat-terrain-base-noise1",
            EffectId::FlatTerrainBaseNoise2 => "flat-terrain-base-noise2",
            EffectId::FlatTerrainBaseNoise12 => "flat-terrain-base-noise12",
        }
    }

    /// Noise layers blended over the base texture: (cloud, light map).
    pub fn noise_layers(self) -> (bool, bool) {
        match self {
            EffectId::TerrainBaseNoise1
            | EffectId::RoadBaseNoise1
            | EffectId::FlatTerrainBaseNoise1 => (true, false),
            EffectId::TerrainBaseNoise2
            | EffectId::RoadBaseNoise2
            | EffectId::FlatTerrainBaseNoise2 => (false, true),
            EffectId::TerrainBaseNoise12
            | EffectId::RoadBaseNoise12
            | EffectId::FlatTerrainBaseNoise12 => (true, true),
            _ => (false, false),
        }
    }
}

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whole-screen post-process filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum FilterId {
    ViewDefault = 0,
    ViewBlackAndWhite,
    ViewMotionBlur,
    ViewCrossFade,
}

impl FilterId {
    pub const COUNT: usize = 4;

    pub const ALL: [FilterId; Self::COUNT] = [
        FilterId::ViewDefault,
        FilterId::ViewBlackAndWhite,
        FilterId::ViewMotionBlur,
        FilterId::ViewCrossFade,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterId::ViewDefault => "view-default",
            FilterId::ViewBlackAndWhite => "view-black-and-white",
            FilterId::ViewMotionBlur => "view-motion-blur",
            FilterId::ViewCrossFade => "view-crossfade",
        }
    }
}

impl std::fmt::Display for FilterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode a screen filter is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    Null,
    BwBlackAndWhite,
    BwRedAndWhite,
    BwGreenAndWhite,
    BlurInOutAlpha,
    BlurInOutSaturate,
    BlurInAlpha,
    BlurOutAlpha,
    BlurInSaturate,
    BlurOutSaturate,
    BlurEndPan,
    /// Scroll blur; `factor` of zero selects the default pan factor.
    BlurPan {
        factor: u8,
    },
    CrossFadeCircle,
    CrossFadeMask,
}

impl FilterMode {
    #[inline]
    pub fn is_active(self) -> bool {
        self != FilterMode::Null
    }

    /// Additive (saturating) motion blur.
    pub fn is_saturate(self) -> bool {
        matches!(
            self,
            FilterMode::BlurInOutSaturate | FilterMode::BlurInSaturate | FilterMode::BlurOutSaturate
        )
    }
}
