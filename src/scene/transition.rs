//! Transition variants and the trait the director drives them through.

use super::lifecycle::TransitionLifecycle;
use super::progress::{Easing, ProgressDriver};
use super::stage::Stage;
use super::{Scene, Step};
use crate::color::Color;
use crate::error::Result;
use crate::render::{BlendMode, Effect, RenderDevice};

/// A scene switch the [`Director`](super::Director) can run.
///
/// Implementors compose a [`TransitionLifecycle`] and override the hooks they
/// need. The defaults give the basic behaviour: wait one frame, load the new
/// scene, complete, and draw the captured snapshot until then.
pub trait SceneTransition<S: Scene> {
    fn lifecycle(&self) -> &TransitionLifecycle<S>;

    fn lifecycle_mut(&mut self) -> &mut TransitionLifecycle<S>;

    /// Advance by one frame. Called once per frame until it returns
    /// [`Step::Done`]; errors abandon the transition.
    fn begin_transition(&mut self, _dt: f32, stage: &mut Stage<S>) -> Result<Step> {
        self.lifecycle_mut().begin(stage)
    }

    /// Draw onto the screen after the scene has rendered. Errors abandon the
    /// transition like step errors do.
    fn render(&mut self, device: &mut S::Device) -> Result<()> {
        self.lifecycle().render_snapshot(device);
        Ok(())
    }
}

/// Cut to the new scene, showing the captured frame while it loads.
pub struct BasicTransition<S: Scene> {
    lifecycle: TransitionLifecycle<S>,
}

impl<S: Scene> BasicTransition<S> {
    /// Cut that captures the outgoing scene.
    pub fn new<F>(device: &mut S::Device, factory: F) -> Result<Self>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        Ok(Self {
            lifecycle: TransitionLifecycle::new(device, factory)?,
        })
    }

    /// Cut that draws nothing over the swap.
    pub fn without_snapshot<F>(factory: F) -> Self
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        Self {
            lifecycle: TransitionLifecycle::without_snapshot(factory),
        }
    }
}

impl<S: Scene> SceneTransition<S> for BasicTransition<S> {
    fn lifecycle(&self) -> &TransitionLifecycle<S> {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut TransitionLifecycle<S> {
        &mut self.lifecycle
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColorPhase {
    /// Effect grows over the snapshot (progress 0 -> 1).
    Covering,
    /// Effect shrinks over the new scene (progress 1 -> 0).
    Revealing,
}

/// Cover the outgoing scene with a color effect, swap, then uncover.
///
/// Half the duration is spent covering the snapshot and half revealing the
/// new scene. The effect must declare `_progress`.
pub struct ColorTransition<S: Scene> {
    lifecycle: TransitionLifecycle<S>,
    effect: Effect,
    half_duration: f32,
    cover: ProgressDriver,
    reveal: ProgressDriver,
    phase: ColorPhase,
}

impl<S: Scene> ColorTransition<S> {
    /// Fade through `color`.
    pub fn fade<F>(device: &mut S::Device, color: Color, duration: f32, factory: F) -> Result<Self>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        Self::with_effect(device, Effect::fade(color), duration, factory)
    }

    /// Wipe `color` across the screen left to right, then back.
    pub fn wipe<F>(device: &mut S::Device, color: Color, duration: f32, factory: F) -> Result<Self>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        Self::with_effect(device, Effect::wipe(color), duration, factory)
    }

    /// Use a custom effect. Missing `_progress` surfaces as
    /// [`Error::ParameterNotFound`](crate::Error::ParameterNotFound) on the
    /// first animated frame.
    pub fn with_effect<F>(
        device: &mut S::Device,
        effect: Effect,
        duration: f32,
        factory: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        let half_duration = duration / 2.0;
        Ok(Self {
            lifecycle: TransitionLifecycle::new(device, factory)?,
            effect,
            half_duration,
            cover: ProgressDriver::new(half_duration, false),
            reveal: ProgressDriver::new(half_duration, true),
            phase: ColorPhase::Covering,
        })
    }

    /// Replace the easing curve of both halves. Only meaningful before the
    /// transition starts.
    pub fn easing(mut self, easing: Easing) -> Self {
        self.cover = ProgressDriver::new(self.half_duration, false).easing(easing);
        self.reveal = ProgressDriver::new(self.half_duration, true).easing(easing);
        self
    }

    /// The effect drawn over both halves.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// True once the new scene is installed and being uncovered.
    pub fn is_revealing(&self) -> bool {
        self.phase == ColorPhase::Revealing
    }
}

impl<S: Scene> SceneTransition<S> for ColorTransition<S> {
    fn lifecycle(&self) -> &TransitionLifecycle<S> {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut TransitionLifecycle<S> {
        &mut self.lifecycle
    }

    fn begin_transition(&mut self, dt: f32, stage: &mut Stage<S>) -> Result<Step> {
        if self.lifecycle.wait_first_frame() == Step::Suspended {
            return Ok(Step::Suspended);
        }
        if self.lifecycle.is_complete() {
            return Ok(Step::Done);
        }

        if self.phase == ColorPhase::Covering {
            self.lifecycle.begin_preload();
            if self.cover.step(dt, &mut self.effect)? == Step::Suspended {
                return Ok(Step::Suspended);
            }
            self.lifecycle.load_scene(stage)?;
            self.phase = ColorPhase::Revealing;
            tracing::debug!(effect = self.effect.label(), "covered, revealing new scene");
        }

        match self.reveal.step(dt, &mut self.effect)? {
            Step::Suspended => Ok(Step::Suspended),
            Step::Done => {
                self.lifecycle.complete(stage);
                Ok(Step::Done)
            }
        }
    }

    fn render(&mut self, device: &mut S::Device) -> Result<()> {
        if self.phase == ColorPhase::Covering {
            self.lifecycle.render_snapshot(device);
        }
        device.draw_effect(&self.effect, BlendMode::Alpha)
    }
}
