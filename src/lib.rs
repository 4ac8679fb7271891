//! # Segue
//!
//! **Scene transitions for wgpu games, one frame at a time.**
//!
//! Capture the outgoing scene, build the next one, and cover the swap with a
//! fade or a wipe. Transitions are small frame-stepped state machines: no
//! threads, no async, nothing runs outside your frame loop.
//!
//! ## Quick Start
//!
//! ```no_run
//! use segue::*;
//!
//! struct Backdrop(Color);
//!
//! impl Scene for Backdrop {
//!     type Device = GpuDevice;
//!
//!     fn render(&mut self, device: &mut GpuDevice) {
//!         device.clear(self.0);
//!     }
//! }
//!
//! fn main() -> segue::Result<()> {
//!     init_logging();
//!     run(AppConfig::new().title("Segue"), |ctx: &mut SetupContext<'_, Backdrop>| {
//!         ctx.set_scene(Backdrop(Color::rgb(0.1, 0.1, 0.15)));
//!
//!         move |frame| {
//!             if frame.key_pressed(KeyCode::Space) {
//!                 frame.fade_to(Color::BLACK, 1.0, || Some(Backdrop(Color::rgb(0.8, 0.3, 0.2))));
//!             }
//!         }
//!     })
//! }
//! ```
//!
//! ## Pieces
//!
//! - [`Director`] runs the active scene and at most one transition.
//! - [`BasicTransition`] swaps after one captured frame; [`ColorTransition`]
//!   fades or wipes through a color.
//! - [`SceneTransition`] is the seam for custom transitions, built on
//!   [`TransitionLifecycle`] and [`ProgressDriver`].
//! - [`RenderDevice`] is everything the core needs from a renderer;
//!   [`GpuDevice`] implements it with wgpu.

mod app;
mod color;
mod error;
mod gpu;
mod input;
mod logging;
pub mod render;
pub mod scene;

#[cfg(test)]
mod test_support;

pub use app::{AppConfig, Frame, SetupContext, run};
pub use color::Color;
pub use error::{Error, Result};
pub use gpu::GpuContext;
pub use input::Input;
pub use logging::{DEFAULT_FILTER, init_logging};
pub use render::{
    BlendMode, Effect, EffectParameters, GpuDevice, RenderDevice, RenderTarget, SamplerMode,
    TargetBinding,
};
pub use scene::{
    BasicTransition, ColorTransition, Director, Easing, ProgressDriver, Scene, SceneTransition,
    Stage, Step, TransitionId, TransitionLifecycle, tick_progress,
};

// Re-export glam math types for convenience
pub use glam::{UVec2, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
