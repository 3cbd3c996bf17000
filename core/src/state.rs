//! Fixed-function GPU state as an explicit value.
//!
//! Effect variants never poke the device directly. They edit a working copy
//! of [`GpuStateSnapshot`]; the manager diffs it against what the device
//! currently holds and applies only the [`StateChange`]s. Teardown works the
//! same way, which makes "reset only undoes what I changed" checkable by
//! comparing snapshots.

use glam::{Mat4, Vec4};
use ridgeline_shared::{MAX_TEXTURE_STAGES, ShaderHandle, TextureHandle};

/// Pixel-shader constant registers tracked in the snapshot.
pub const PIXEL_CONSTANT_REGISTERS: usize = 4;

/// Texture-stage combiner operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageOp {
    Disable,
    SelectArg1,
    SelectArg2,
    Modulate,
    Add,
    /// Lerp between the arguments by the alpha of the current stage result.
    BlendCurrentAlpha,
    DotProduct3,
}

/// Combiner argument source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageArg {
    Texture,
    Diffuse,
    /// Diffuse alpha replicated into the colour channels.
    DiffuseAlpha,
    Current,
    Factor,
}

/// Where a stage takes its texture coordinates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexCoordSource {
    /// Pass-through of the vertex uv set with this index.
    Vertex(u8),
    /// Camera-space position, used for projected textures.
    CameraSpacePosition,
}

/// Texture-coordinate transform for a stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureTransform {
    Disabled,
    /// Two output components from the given matrix.
    Count2(Mat4),
}

/// Preset blend/shading class of the higher-level renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderPreset {
    #[default]
    Opaque,
    Alpha,
    AlphaSprite,
    MultiplicativeSprite,
}

/// Framebuffer blend factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendPair {
    pub src: wgpu::BlendFactor,
    pub dst: wgpu::BlendFactor,
}

impl BlendPair {
    pub const ALPHA: BlendPair = BlendPair {
        src: wgpu::BlendFactor::SrcAlpha,
        dst: wgpu::BlendFactor::OneMinusSrcAlpha,
    };
    /// dest = src * dest
    pub const MULTIPLY: BlendPair = BlendPair {
        src: wgpu::BlendFactor::Dst,
        dst: wgpu::BlendFactor::Zero,
    };
    pub const ADDITIVE_ALPHA: BlendPair = BlendPair {
        src: wgpu::BlendFactor::SrcAlpha,
        dst: wgpu::BlendFactor::One,
    };
}

/// State of one texture stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageState {
    pub texture: TextureHandle,
    pub color_op: StageOp,
    pub color_args: (StageArg, StageArg),
    pub alpha_op: StageOp,
    pub alpha_args: (StageArg, StageArg),
    pub tex_coord: TexCoordSource,
    pub transform: TextureTransform,
    pub address_u: wgpu::AddressMode,
    pub address_v: wgpu::AddressMode,
    pub min_filter: wgpu::FilterMode,
    pub mag_filter: wgpu::FilterMode,
    /// `None` disables mipmapping.
    pub mip_filter: Option<wgpu::FilterMode>,
}

impl StageState {
    /// Power-on state of a stage: stage 0 modulates texture by diffuse,
    /// every other stage is disabled.
    pub fn initial(stage: usize) -> Self {
        let (color_op, alpha_op) = if stage == 0 {
            (StageOp::Modulate, StageOp::SelectArg1)
        } else {
            (StageOp::Disable, StageOp::Disable)
        };
        Self {
            texture: TextureHandle::INVALID,
            color_op,
            color_args: (StageArg::Texture, StageArg::Current),
            alpha_op,
            alpha_args: (StageArg::Texture, StageArg::Current),
            tex_coord: TexCoordSource::Vertex(stage as u8),
            transform: TextureTransform::Disabled,
            address_u: wgpu::AddressMode::Repeat,
            address_v: wgpu::AddressMode::Repeat,
            min_filter: wgpu::FilterMode::Linear,
            mag_filter: wgpu::FilterMode::Linear,
            mip_filter: Some(wgpu::FilterMode::Linear),
        }
    }

    pub fn color(&mut self, op: StageOp, arg1: StageArg, arg2: StageArg) -> &mut Self {
        self.color_op = op;
        self.color_args = (arg1, arg2);
        self
    }

    pub fn alpha(&mut self, op: StageOp, arg1: StageArg, arg2: StageArg) -> &mut Self {
        self.alpha_op = op;
        self.alpha_args = (arg1, arg2);
        self
    }

    pub fn disable(&mut self) -> &mut Self {
        self.color_op = StageOp::Disable;
        self.alpha_op = StageOp::Disable;
        self
    }

    pub fn address(&mut self, mode: wgpu::AddressMode) -> &mut Self {
        self.address_u = mode;
        self.address_v = mode;
        self
    }

    pub fn filter(
        &mut self,
        min: wgpu::FilterMode,
        mag: wgpu::FilterMode,
        mip: Option<wgpu::FilterMode>,
    ) -> &mut Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self.mip_filter = mip;
        self
    }

    /// Project the texture from camera-space positions through `matrix`.
    pub fn project(&mut self, matrix: Mat4) -> &mut Self {
        self.tex_coord = TexCoordSource::CameraSpacePosition;
        self.transform = TextureTransform::Count2(matrix);
        self
    }

    /// Undo [`StageState::project`], restoring pass-through coordinates.
    pub fn unproject(&mut self, stage: usize) -> &mut Self {
        self.tex_coord = TexCoordSource::Vertex(stage as u8);
        self.transform = TextureTransform::Disabled;
        self
    }
}

/// Render states outside the texture stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStates {
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
    /// `None` disables framebuffer blending.
    pub blend: Option<BlendPair>,
    pub preset: ShaderPreset,
    pub primary_gradient: bool,
    /// ARGB constant read by [`StageArg::Factor`].
    pub texture_factor: u32,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            depth_compare: wgpu::CompareFunction::LessEqual,
            depth_write: true,
            blend: None,
            preset: ShaderPreset::Opaque,
            primary_gradient: true,
            texture_factor: 0xFFFF_FFFF,
        }
    }
}

/// Everything the fixed-function pipeline holds that effects touch.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuStateSnapshot {
    pub stages: [StageState; MAX_TEXTURE_STAGES],
    pub render: RenderStates,
    pub pixel_shader: ShaderHandle,
    pub pixel_constants: [Vec4; PIXEL_CONSTANT_REGISTERS],
}

impl Default for GpuStateSnapshot {
    fn default() -> Self {
        Self {
            stages: std::array::from_fn(StageState::initial),
            render: RenderStates::default(),
            pixel_shader: ShaderHandle::INVALID,
            pixel_constants: [Vec4::ZERO; PIXEL_CONSTANT_REGISTERS],
        }
    }
}

/// One device state mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateChange {
    Texture { stage: u8, texture: TextureHandle },
    ColorOp { stage: u8, op: StageOp, args: (StageArg, StageArg) },
    AlphaOp { stage: u8, op: StageOp, args: (StageArg, StageArg) },
    TexCoord { stage: u8, source: TexCoordSource },
    Transform { stage: u8, transform: TextureTransform },
    Address { stage: u8, u: wgpu::AddressMode, v: wgpu::AddressMode },
    Filter {
        stage: u8,
        min: wgpu::FilterMode,
        mag: wgpu::FilterMode,
        mip: Option<wgpu::FilterMode>,
    },
    DepthCompare(wgpu::CompareFunction),
    DepthWrite(bool),
    Blend(Option<BlendPair>),
    Preset(ShaderPreset),
    PrimaryGradient(bool),
    TextureFactor(u32),
    PixelShader(ShaderHandle),
    PixelConstant { register: u8, value: Vec4 },
}

impl StateChange {
    /// Texture stage this change affects, if any.
    pub fn stage(&self) -> Option<usize> {
        match *self {
            StateChange::Texture { stage, .. }
            | StateChange::ColorOp { stage, .. }
            | StateChange::AlphaOp { stage, .. }
            | StateChange::TexCoord { stage, .. }
            | StateChange::Transform { stage, .. }
            | StateChange::Address { stage, .. }
            | StateChange::Filter { stage, .. } => Some(stage as usize),
            _ => None,
        }
    }
}

impl GpuStateSnapshot {
    /// Changes that turn `self` into `target`, in stage order followed by
    /// render states. Equal snapshots produce no changes.
    pub fn diff(&self, target: &GpuStateSnapshot) -> Vec<StateChange> {
        let mut changes = Vec::new();

        for (i, (from, to)) in self.stages.iter().zip(target.stages.iter()).enumerate() {
            if from == to {
                continue;
            }
            let stage = i as u8;
            if from.texture != to.texture {
                changes.push(StateChange::Texture { stage, texture: to.texture });
            }
            if from.color_op != to.color_op || from.color_args != to.color_args {
                changes.push(StateChange::ColorOp { stage, op: to.color_op, args: to.color_args });
            }
            if from.alpha_op != to.alpha_op || from.alpha_args != to.alpha_args {
                changes.push(StateChange::AlphaOp { stage, op: to.alpha_op, args: to.alpha_args });
            }
            if from.tex_coord != to.tex_coord {
                changes.push(StateChange::TexCoord { stage, source: to.tex_coord });
            }
            if from.transform != to.transform {
                changes.push(StateChange::Transform { stage, transform: to.transform });
            }
            if from.address_u != to.address_u || from.address_v != to.address_v {
                changes.push(StateChange::Address { stage, u: to.address_u, v: to.address_v });
            }
            if from.min_filter != to.min_filter
                || from.mag_filter != to.mag_filter
                || from.mip_filter != to.mip_filter
            {
                changes.push(StateChange::Filter {
                    stage,
                    min: to.min_filter,
                    mag: to.mag_filter,
                    mip: to.mip_filter,
                });
            }
        }

        let (from, to) = (&self.render, &target.render);
        if from.depth_compare != to.depth_compare {
            changes.push(StateChange::DepthCompare(to.depth_compare));
        }
        if from.depth_write != to.depth_write {
            changes.push(StateChange::DepthWrite(to.depth_write));
        }
        if from.blend != to.blend {
            changes.push(StateChange::Blend(to.blend));
        }
        if from.preset != to.preset {
            changes.push(StateChange::Preset(to.preset));
        }
        if from.primary_gradient != to.primary_gradient {
            changes.push(StateChange::PrimaryGradient(to.primary_gradient));
        }
        if from.texture_factor != to.texture_factor {
            changes.push(StateChange::TextureFactor(to.texture_factor));
        }

        if self.pixel_shader != target.pixel_shader {
            changes.push(StateChange::PixelShader(target.pixel_shader));
        }
        for (i, (from, to)) in self
            .pixel_constants
            .iter()
            .zip(target.pixel_constants.iter())
            .enumerate()
        {
            if from != to {
                changes.push(StateChange::PixelConstant { register: i as u8, value: *to });
            }
        }

        changes
    }

    /// Replay `changes` onto this snapshot.
    pub fn apply(&mut self, changes: &[StateChange]) {
        for change in changes {
            match *change {
                StateChange::Texture { stage, texture } => {
                    self.stages[stage as usize].texture = texture;
                }
                StateChange::ColorOp { stage, op, args } => {
                    let s = &mut self.stages[stage as usize];
                    s.color_op = op;
                    s.color_args = args;
                }
                StateChange::AlphaOp { stage, op, args } => {
                    let s = &mut self.stages[stage as usize];
                    s.alpha_op = op;
                    s.alpha_args = args;
                }
                StateChange::TexCoord { stage, source } => {
                    self.stages[stage as usize].tex_coord = source;
                }
                StateChange::Transform { stage, transform } => {
                    self.stages[stage as usize].transform = transform;
                }
                StateChange::Address { stage, u, v } => {
                    let s = &mut self.stages[stage as usize];
                    s.address_u = u;
                    s.address_v = v;
                }
                StateChange::Filter { stage, min, mag, mip } => {
                    let s = &mut self.stages[stage as usize];
                    s.min_filter = min;
                    s.mag_filter = mag;
                    s.mip_filter = mip;
                }
                StateChange::DepthCompare(f) => self.render.depth_compare = f,
                StateChange::DepthWrite(w) => self.render.depth_write = w,
                StateChange::Blend(b) => self.render.blend = b,
                StateChange::Preset(p) => self.render.preset = p,
                StateChange::PrimaryGradient(g) => self.render.primary_gradient = g,
                StateChange::TextureFactor(f) => self.render.texture_factor = f,
                StateChange::PixelShader(h) => self.pixel_shader = h,
                StateChange::PixelConstant { register, value } => {
                    self.pixel_constants[register as usize] = value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_snapshots_have_no_diff() {
        let a = GpuStateSnapshot::default();
        assert!(a.diff(&a.clone()).is_empty());
    }

    #[test]
    fn diff_then_apply_reaches_target() {
        let base = GpuStateSnapshot::default();
        let mut target = base.clone();
        target.stages[2].texture = TextureHandle(9);
        target.stages[2]
            .color(StageOp::Modulate, StageArg::Texture, StageArg::Current)
            .project(Mat4::from_scale(glam::Vec3::splat(0.5)));
        target.render.blend = Some(BlendPair::MULTIPLY);
        target.render.depth_compare = wgpu::CompareFunction::Equal;
        target.pixel_constants[1] = Vec4::new(1.0, 0.0, 0.0, 1.0);

        let changes = base.diff(&target);
        assert!(changes.iter().filter_map(StateChange::stage).all(|s| s == 2));

        let mut replay = base.clone();
        replay.apply(&changes);
        assert_eq!(replay, target);
    }

    #[test]
    fn diff_is_minimal_per_field() {
        let base = GpuStateSnapshot::default();
        let mut target = base.clone();
        target.stages[0].address(wgpu::AddressMode::ClampToEdge);

        let changes = base.diff(&target);
        assert_eq!(
            changes,
            vec![StateChange::Address {
                stage: 0,
                u: wgpu::AddressMode::ClampToEdge,
                v: wgpu::AddressMode::ClampToEdge,
            }]
        );
    }

    #[test]
    fn unproject_restores_pass_through() {
        let mut s = StageState::initial(3);
        s.project(Mat4::IDENTITY);
        assert_eq!(s.tex_coord, TexCoordSource::CameraSpacePosition);
        s.unproject(3);
        assert_eq!(s, StageState::initial(3));
    }
}
