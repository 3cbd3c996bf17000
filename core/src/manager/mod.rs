//! Effect negotiation and per-frame pass dispatch.
//!
//! [`ShaderManager::init`] picks one variant per effect from the catalog's
//! candidate lists. Consumers then drive each effect with
//! `set_shader(effect, 0..passes)` followed by one `reset_shader(effect)`,
//! without knowing which variant answers.

use hashbrown::HashSet;
use log::{debug, info, warn};
use ridgeline_shared::{ChipsetId, EffectId, MAX_TEXTURE_STAGES, TextureHandle};
use tracing::trace;

use crate::config::RenderConfig;
use crate::device::{Device, TextureLoader};
use crate::effect::{
    BoundTextureSlots, CloudScroll, EffectCatalog, InitContext, PassContext, PassOptions,
    ResetContext, SceneInputs, VariantId, select,
};
use crate::error::{RenderTargetError, ShaderError};
use crate::probe::{CapabilityProbe, CapabilityReport};
use crate::render_target::{RenderTargetGuard, RenderToTextureScratch};
use crate::state::GpuStateSnapshot;


/// Outcome of a `set_shader` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    /// The pass state is on the device.
    Applied,
    /// Same pass set again for another batch; state re-applied.
    AlreadyActive,
    /// No variant draws this effect on this device. Skip its geometry.
    Skipped,
}

impl PassStatus {
    /// Whether the consumer should draw.
    pub fn should_draw(self) -> bool {
        !matches!(self, PassStatus::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActivePass {
    effect: EffectId,
    pass: u32,
    options: PassOptions,
}

/// Selection record, bound texture slots and render-to-texture scratch.
#[derive(Debug)]
pub struct ShaderManager {
    catalog: EffectCatalog,
    selected: [Option<VariantId>; EffectId::COUNT],
    slots: BoundTextureSlots,
    scratch: RenderToTextureScratch,
    caps: CapabilityReport,
    config: RenderConfig,
    scene: SceneInputs,
    clouds: CloudScroll,
    active: Option<ActivePass>,
    /// Device state before the active effect's first pass.
    baseline: Option<GpuStateSnapshot>,
    initialized: bool,
}

impl Default for ShaderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderManager {
    /// Manager over the built-in candidate lists.
    pub fn new() -> Self {
        Self::with_catalog(EffectCatalog::standard())
    }

    pub fn with_catalog(catalog: EffectCatalog) -> Self {
        Self {
            catalog,
            selected: [None; EffectId::COUNT],
            slots: [TextureHandle::INVALID; MAX_TEXTURE_STAGES],
            scratch: RenderToTextureScratch::default(),
            caps: CapabilityReport::UNKNOWN,
            config: RenderConfig::default(),
            scene: SceneInputs::default(),
            clouds: CloudScroll::default(),
            active: None,
            baseline: None,
            initialized: false,
        }
    }

    // ========================================================================
    // Negotiation
    // ========================================================================

    /// Probe the device and select a variant for every effect.
    ///
    /// A manager that is already initialised is shut down first, so calling
    /// this again always renegotiates from scratch.
    pub fn init(
        &mut self,
        device: &mut dyn Device,
        textures: &mut dyn TextureLoader,
        probe: &mut CapabilityProbe,
        config: &RenderConfig,
    ) {
        if self.initialized {
            warn!("Shader manager initialised twice, renegotiating");
            self.shutdown(device, textures, probe);
        }
        self.config = config.clone();

        let render_to_texture = match self.scratch.allocate(device) {
            Ok(()) => true,
            Err(e) => {
                warn!("Render-to-texture unavailable: {e}");
                false
            }
        };
        self.caps = probe.report(device, render_to_texture);
        info!(
            "Chipset {} (vendor {:?}, pixel shader {}, {} texture stages)",
            self.caps.chipset,
            self.caps.vendor,
            self.caps.pixel_shader,
            self.caps.max_simultaneous_textures
        );

        let mut outcomes: Vec<Option<bool>> = vec![None; self.catalog.len()];
        let lists = self.catalog.lists().to_vec();
        for list in &lists {
            for &effect in &list.effects {
                let choice = select(&list.candidates[..], |id| {
                    let ok = *outcomes[id.0].get_or_insert_with(|| {
                        let variant = self.catalog.variant_mut(id);
                        let ok = variant.init(&mut InitContext {
                            device: &mut *device,
                            textures: &mut *textures,
                            caps: &self.caps,
                            config: &self.config,
                        });
                        debug!("Variant {} init {}", variant.name(), if ok { "ok" } else { "failed" });
                        ok
                    });
                    ok && self.catalog.variant(id).pass_count(effect).is_some()
                });
                self.selected[effect.index()] = choice;
                match choice {
                    Some(id) => info!("{effect}: {}", self.catalog.variant(id).name()),
                    None => info!("{effect}: unsupported"),
                }
            }
        }

        // Variants that initialised but serve nothing must not keep resources.
        let chosen: HashSet<VariantId> = self.selected.iter().flatten().copied().collect();
        for (i, outcome) in outcomes.iter().enumerate() {
            let id = VariantId(i);
            if *outcome == Some(true) && !chosen.contains(&id) {
                let variant = self.catalog.variant_mut(id);
                debug!("Variant {} initialised but unused", variant.name());
                variant.shutdown(device, textures);
            }
        }

        self.initialized = true;
    }

    /// Release every selected variant and the scratch target.
    ///
    /// A variant serving several effects is shut down once.
    pub fn shutdown(
        &mut self,
        device: &mut dyn Device,
        textures: &mut dyn TextureLoader,
        probe: &mut CapabilityProbe,
    ) {
        if let Some(active) = self.active.take() {
            debug!("Shutdown with {} still active", active.effect);
        }
        self.baseline = None;

        let mut done = HashSet::new();
        for slot in &mut self.selected {
            let Some(id) = slot.take() else {
                continue;
            };
            if done.insert(id) {
                let variant = self.catalog.variant_mut(id);
                if !variant.shutdown(device, textures) {
                    warn!("Variant {} failed to shut down cleanly", variant.name());
                }
            }
        }

        self.scratch.release(device);
        self.caps = CapabilityReport::UNKNOWN;
        probe.invalidate();
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ========================================================================
    // Per-frame protocol
    // ========================================================================

    /// Bind `texture` to `stage` for the next `set_shader`. No device call.
    pub fn set_texture(&mut self, stage: usize, texture: TextureHandle) -> Result<(), ShaderError> {
        let slot = self
            .slots
            .get_mut(stage)
            .ok_or(ShaderError::StageOutOfRange(stage))?;
        *slot = texture;
        Ok(())
    }

    /// Texture bound to `stage`, invalid for out-of-range stages.
    pub fn shader_texture(&self, stage: usize) -> TextureHandle {
        self.slots.get(stage).copied().unwrap_or_default()
    }

    /// Passes the selected variant needs for `effect`, 0 when unsupported.
    pub fn shader_passes(&self, effect: EffectId) -> u32 {
        self.selected[effect.index()]
            .and_then(|id| self.catalog.variant(id).pass_count(effect))
            .unwrap_or(0)
    }

    pub fn set_shader(
        &mut self,
        device: &mut dyn Device,
        effect: EffectId,
        pass: u32,
    ) -> Result<PassStatus, ShaderError> {
        self.set_shader_with(device, effect, pass, PassOptions::default())
    }

    /// Configure the device for `pass` of `effect`.
    ///
    /// Passes must run in order from 0. Setting the current pass again is
    /// allowed (one call per geometry batch). Starting another effect before
    /// resetting this one is an error.
    pub fn set_shader_with(
        &mut self,
        device: &mut dyn Device,
        effect: EffectId,
        pass: u32,
        options: PassOptions,
    ) -> Result<PassStatus, ShaderError> {
        if options.stage >= MAX_TEXTURE_STAGES {
            return Err(ShaderError::StageOutOfRange(options.stage));
        }
        let Some(id) = self.selected[effect.index()] else {
            trace!(%effect, "no variant, skipping");
            return Ok(PassStatus::Skipped);
        };
        let passes = self.catalog.variant(id).pass_count(effect).unwrap_or(0);
        if pass >= passes {
            return Err(ShaderError::PassOutOfRange { effect, pass, passes });
        }

        let status = match self.active {
            Some(active) if active.effect != effect => {
                return Err(ShaderError::EffectStillActive {
                    requested: effect,
                    active: active.effect,
                });
            }
            Some(active) if pass < active.pass => {
                return Err(ShaderError::PassOrder {
                    effect,
                    pass,
                    current: active.pass,
                });
            }
            Some(active) if pass == active.pass => PassStatus::AlreadyActive,
            Some(_) => PassStatus::Applied,
            None => {
                self.baseline = Some(device.state().clone());
                PassStatus::Applied
            }
        };

        let mut working = device.state().clone();
        let accepted = self.catalog.variant_mut(id).set_pass(&mut PassContext {
            effect,
            pass,
            options,
            state: &mut working,
            slots: &self.slots,
            scene: &self.scene,
            clouds: &mut self.clouds,
            config: &self.config,
            view: device.view_transform(),
        });
        if !accepted {
            if self.active.is_none() {
                self.baseline = None;
            }
            return Err(ShaderError::PassRejected { effect, pass });
        }

        let changes = device.state().diff(&working);
        trace!(%effect, pass, changes = changes.len(), "set pass");
        device.apply_state(&changes);
        self.active = Some(ActivePass {
            effect,
            pass,
            options,
        });
        Ok(status)
    }

    /// Undo the state `effect`'s passes changed.
    ///
    /// A no-op when `effect` has no variant or is not the active effect.
    pub fn reset_shader(&mut self, device: &mut dyn Device, effect: EffectId) {
        let Some(id) = self.selected[effect.index()] else {
            return;
        };
        let Some(active) = self.active else {
            return;
        };
        if active.effect != effect {
            debug!("Reset of {effect} while {} is active ignored", active.effect);
            return;
        }
        let baseline = self
            .baseline
            .take()
            .unwrap_or_else(|| device.state().clone());

        let mut working = device.state().clone();
        self.catalog.variant_mut(id).reset(&mut ResetContext {
            effect,
            options: active.options,
            state: &mut working,
            baseline: &baseline,
        });
        let changes = device.state().diff(&working);
        trace!(%effect, changes = changes.len(), "reset");
        device.apply_state(&changes);
        self.active = None;
    }

    /// Active `(effect, pass)`, for diagnostics.
    pub fn current_effect(&self) -> Option<(EffectId, u32)> {
        self.active.map(|a| (a.effect, a.pass))
    }

    // ========================================================================
    // Render to texture
    // ========================================================================

    pub fn can_render_to_texture(&self) -> bool {
        self.scratch.is_available()
    }

    /// Scratch texture holding the last capture.
    pub fn render_texture(&self) -> TextureHandle {
        self.scratch.texture()
    }

    pub fn is_rendering_to_texture(&self) -> bool {
        self.scratch.is_redirected()
    }

    pub fn start_render_to_texture(&mut self, device: &mut dyn Device) -> Result<(), RenderTargetError> {
        self.scratch.begin(device)
    }

    pub fn end_render_to_texture(
        &mut self,
        device: &mut dyn Device,
    ) -> Result<TextureHandle, RenderTargetError> {
        self.scratch.end(device)
    }

    /// Redirect rendering until the returned guard is finished or dropped.
    pub fn redirect<'a>(
        &'a mut self,
        device: &'a mut dyn Device,
    ) -> Result<RenderTargetGuard<'a>, RenderTargetError> {
        RenderTargetGuard::begin(&mut self.scratch, device)
    }

    // ========================================================================
    // Inputs and queries
    // ========================================================================

    pub fn chipset(&self) -> ChipsetId {
        self.caps.chipset
    }

    pub fn capabilities(&self) -> &CapabilityReport {
        &self.caps
    }

    /// Name of the variant drawing `effect`.
    pub fn selected_variant(&self, effect: EffectId) -> Option<&'static str> {
        self.selected[effect.index()].map(|id| self.catalog.variant(id).name())
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replace the settings variants read at pass time.
    pub fn set_config(&mut self, config: &RenderConfig) {
        self.config = config.clone();
    }

    pub fn scene(&self) -> &SceneInputs {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneInputs {
        &mut self.scene
    }

    /// Frame timestamp driving cloud scrolling.
    pub fn begin_frame(&mut self, sync_time_ms: u64) {
        self.scene.sync_time_ms = sync_time_ms;
    }

    pub fn clouds(&self) -> CloudScroll {
        self.clouds
    }
}
