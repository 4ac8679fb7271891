//! Rendering capabilities consumed by the transition core.
//!
//! The core never talks to wgpu directly. It goes through [`RenderDevice`],
//! which the wgpu backend ([`GpuDevice`]) implements for real windows and the
//! test suite implements with a recording mock.

mod effect;
mod gpu_device;
mod render_target;

pub use effect::{Effect, EffectParameters, MAX_EFFECT_PARAMETERS, PROGRESS_PARAMETER};
pub use gpu_device::GpuDevice;
pub use render_target::RenderTarget;

use crate::color::Color;
use crate::error::Result;
use glam::UVec2;

/// Blend state used when compositing onto the bound target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source replaces destination.
    #[default]
    Opaque,
    /// Straight (non-premultiplied) alpha blending.
    Alpha,
}

/// Texture filtering used by a blit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SamplerMode {
    #[default]
    Linear,
    Point,
}

/// Where subsequent draws land.
#[derive(Debug)]
pub enum TargetBinding<'a, T> {
    /// The window backbuffer.
    Screen,
    /// An offscreen surface, e.g. a transition snapshot.
    Offscreen(&'a T),
}

impl<T> Clone for TargetBinding<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TargetBinding<'_, T> {}

/// A rendering device able to allocate offscreen surfaces and composite them.
pub trait RenderDevice {
    /// Offscreen surface type. Dropping it releases the GPU memory.
    type Surface;

    /// Current backbuffer size in pixels.
    fn screen_size(&self) -> UVec2;

    /// Pixel format of the backbuffer.
    fn backbuffer_format(&self) -> wgpu::TextureFormat;

    /// Allocate a surface that is retained across frames until dropped.
    fn create_render_target(
        &mut self,
        size: UVec2,
        format: wgpu::TextureFormat,
    ) -> Result<Self::Surface>;

    /// Redirect subsequent draws.
    fn bind_target(&mut self, target: TargetBinding<'_, Self::Surface>);

    /// Clear the bound target.
    fn clear(&mut self, color: Color);

    /// Full-screen textured draw of `source` onto the bound target.
    fn blit(&mut self, source: &Self::Surface, blend: BlendMode, sampler: SamplerMode);

    /// Full-screen draw of `effect` with its current parameters.
    ///
    /// Fails when the effect's shader cannot be built into a pipeline.
    fn draw_effect(&mut self, effect: &Effect, blend: BlendMode) -> Result<()>;

    /// Sampler used when a caller has no preference.
    fn default_sampler(&self) -> SamplerMode {
        SamplerMode::Linear
    }
}
