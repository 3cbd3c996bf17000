//! The registered variants and their candidate lists.

use std::fmt;

use ridgeline_shared::EffectId;
use smallvec::SmallVec;

use super::{
    CloudProjection, EffectVariant, EightStageTerrain, FlatPixelShader, FlatShroudProjection,
    FlatTwoStage, MaskProjectionVariant, PixelShaderTerrain, RoadPixelShader, RoadTwoStage,
    ShroudProjectionVariant, TwoStageTerrain,
};

/// Index of a variant in its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId(pub usize);

/// Candidates for a group of related effects, most capable first.
#[derive(Debug, Clone)]
pub struct CandidateList {
    pub name: &'static str,
    pub effects: SmallVec<[EffectId; 4]>,
    pub candidates: SmallVec<[VariantId; 4]>,
}

/// Owns every variant for the life of the process.
///
/// Variants survive device resets; only the GPU resources they allocate
/// in `init` come and go.
#[derive(Default)]
pub struct EffectCatalog {
    variants: Vec<Box<dyn EffectVariant>>,
    lists: Vec<CandidateList>,
}

impl EffectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in lists.
    pub fn standard() -> Self {
        use EffectId::*;

        let mut catalog = Self::new();

        let terrain_ps = catalog.add_variant(PixelShaderTerrain::default());
        let terrain_8 = catalog.add_variant(EightStageTerrain::default());
        let terrain_2 = catalog.add_variant(TwoStageTerrain::default());
        catalog.add_list(
            "terrain",
            &[TerrainBase, TerrainBaseNoise1, TerrainBaseNoise2, TerrainBaseNoise12],
            &[terrain_ps, terrain_8, terrain_2],
        );

        let shroud = catalog.add_variant(ShroudProjectionVariant);
        catalog.add_list("shroud", &[ShroudTexture], &[shroud]);

        let flat_shroud = catalog.add_variant(FlatShroudProjection);
        catalog.add_list("flat-shroud", &[FlatShroudTexture], &[flat_shroud]);

        let road_ps = catalog.add_variant(RoadPixelShader::default());
        let road_2 = catalog.add_variant(RoadTwoStage);
        catalog.add_list(
            "road",
            &[RoadBase, RoadBaseNoise1, RoadBaseNoise2, RoadBaseNoise12],
            &[road_ps, road_2],
        );

        let mask = catalog.add_variant(MaskProjectionVariant);
        catalog.add_list("mask", &[MaskTexture], &[mask]);

        let cloud = catalog.add_variant(CloudProjection);
        catalog.add_list("cloud", &[CloudTexture], &[cloud]);

        let flat_ps = catalog.add_variant(FlatPixelShader::default());
        let flat_2 = catalog.add_variant(FlatTwoStage);
        catalog.add_list(
            "flat-terrain",
            &[
                FlatTerrainBase,
                FlatTerrainBaseNoise1,
                FlatTerrainBaseNoise2,
                FlatTerrainBaseNoise12,
            ],
            &[flat_ps, flat_2],
        );

        catalog
    }

    pub fn add_variant(&mut self, variant: impl EffectVariant + 'static) -> VariantId {
        self.variants.push(Box::new(variant));
        VariantId(self.variants.len() - 1)
    }

    /// Register a candidate list.
    ///
    /// # Panics
    ///
    /// If an effect already belongs to another list or a candidate id is
    /// not registered.
    pub fn add_list(&mut self, name: &'static str, effects: &[EffectId], candidates: &[VariantId]) {
        for effect in effects {
            assert!(
                self.list_for(*effect).is_none(),
                "{effect} is already in a candidate list"
            );
        }
        for candidate in candidates {
            assert!(candidate.0 < self.variants.len(), "unregistered variant {candidate:?}");
        }
        self.lists.push(CandidateList {
            name,
            effects: effects.iter().copied().collect(),
            candidates: candidates.iter().copied().collect(),
        });
    }

    pub fn lists(&self) -> &[CandidateList] {
        &self.lists
    }

    pub fn list_for(&self, effect: EffectId) -> Option<&CandidateList> {
        self.lists.iter().find(|l| l.effects.contains(&effect))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variant(&self, id: VariantId) -> &dyn EffectVariant {
        self.variants[id.0].as_ref()
    }

    pub fn variant_mut(&mut self, id: VariantId) -> &mut dyn EffectVariant {
        self.variants[id.0].as_mut()
    }
}

impl fmt::Debug for EffectCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectCatalog")
            .field("variants", &self.variants.iter().map(|v| v.name()).collect::<Vec<_>>())
            .field("lists", &self.lists)
            .finish()
    }
}
