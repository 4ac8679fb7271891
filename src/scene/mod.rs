//! Scene switching for segue.
//!
//! A scene switch is carried out by a *transition*: it captures the last frame
//! of the outgoing scene, waits one frame so that capture lands before any
//! teardown, builds the incoming scene from a factory, optionally plays a
//! time-based effect, and finally releases its resources.
//!
//! # Overview
//!
//! - [`Director`] owns the [`Stage`] (active scene and active-transition slot)
//!   and the in-flight transition, and runs one frame at a time.
//! - [`TransitionLifecycle`] is the shared state machine every transition
//!   composes: snapshot, capture latch, factory and completion.
//! - [`ProgressDriver`] ticks an eased 0→1 (or 1→0) value into an effect
//!   parameter, one frame at a time.
//! - [`Compositor`] decides each frame what gets drawn where.
//!
//! # Example
//!
//! ```ignore
//! let fade = ColorTransition::fade(&mut device, Color::BLACK, 1.0, || Some(Menu::new()))?;
//! director.change_scene(fade)?;
//!
//! // in the frame loop
//! director.frame(&mut device, dt)?;
//! ```

mod compositor;
mod director;
mod lifecycle;
mod progress;
mod snapshot;
mod stage;
mod transition;

pub use compositor::Compositor;
pub use director::Director;
pub use lifecycle::{LifecyclePhase, SceneFactory, TransitionLifecycle};
pub use progress::{Easing, ProgressDriver, tick_progress};
pub use snapshot::{CaptureLatch, CaptureState, SnapshotBuffer};
pub use stage::{Stage, TransitionId};
pub use transition::{BasicTransition, ColorTransition, SceneTransition};

use crate::render::RenderDevice;

/// Outcome of one step of a frame-stepped procedure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Resume on the next frame.
    Suspended,
    /// Finished; stepping again is a no-op.
    Done,
}

/// The host's renderable unit of game state.
///
/// Scenes are opaque to the transition core beyond these hooks.
pub trait Scene {
    /// Device this scene renders with.
    type Device: RenderDevice;

    /// Called once per frame before rendering.
    fn update(&mut self, _dt: f32) {}

    /// Draw into whatever target is currently bound on `device`.
    fn render(&mut self, device: &mut Self::Device);

    /// Called when the scene becomes the active scene.
    fn on_enter(&mut self) {}

    /// Called when the scene is replaced.
    fn on_exit(&mut self) {}
}

/// Offscreen surface type of a scene's device.
pub type SurfaceOf<S> = <<S as Scene>::Device as RenderDevice>::Surface;
