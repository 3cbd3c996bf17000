//! Error types for the effect layer.
//!
//! Capability shortfalls are not errors: variants report them through the
//! boolean `init` result and the effect silently degrades. The enums here
//! cover device failures and caller-contract violations, which indicate a
//! bug in the calling renderer code.

use ridgeline_shared::EffectId;

/// Failure reported by the graphics-device wrapper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("graphics device has not been created")]
    NotCreated,
    #[error("graphics device lost")]
    Lost,
    #[error("out of video memory allocating {what}")]
    OutOfMemory { what: &'static str },
    #[error("failed to create pixel shader '{program}': {reason}")]
    ShaderCreation { program: String, reason: String },
    #[error("device rejected render target")]
    RenderTargetRejected,
    #[error("unknown texture handle {0}")]
    UnknownTexture(u32),
}

/// Misuse of the per-frame pass protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("pass {pass} out of range for {effect} ({passes} passes)")]
    PassOutOfRange {
        effect: EffectId,
        pass: u32,
        passes: u32,
    },
    #[error("{requested} started while {active} is still active")]
    EffectStillActive {
        requested: EffectId,
        active: EffectId,
    },
    #[error("{effect} pass {pass} requested after pass {current} without a reset")]
    PassOrder {
        effect: EffectId,
        pass: u32,
        current: u32,
    },
    #[error("{effect} rejected pass {pass}")]
    PassRejected { effect: EffectId, pass: u32 },
    #[error("texture stage {0} out of range")]
    StageOutOfRange(usize),
}

/// Misuse or failure of the render-to-texture scratch target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderTargetError {
    #[error("render-to-texture is not available on this device")]
    Unavailable,
    #[error("already rendering to texture")]
    AlreadyRedirected,
    #[error("not rendering to texture")]
    NotRedirected,
    #[error(transparent)]
    Device(#[from] DeviceError),
}
