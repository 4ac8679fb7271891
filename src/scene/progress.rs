//! Frame-stepped progress ticking for transition effects.

use std::borrow::Cow;

use super::Step;
use crate::error::Result;
use crate::render::{EffectParameters, PROGRESS_PARAMETER};

/// Easing functions for smooth transitions.
///
/// These control the acceleration curve of transition animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed throughout.
    Linear,
    /// Start slow, accelerate (quadratic).
    #[default]
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    EaseInOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Ticks an eased value between 0 and 1 into a named effect parameter.
///
/// Each [`step`](Self::step) adds the frame's delta time, writes
/// `lerp(start, end, easing(elapsed / duration))` and suspends. Once elapsed
/// time has reached the duration the next step returns [`Step::Done`] without
/// writing. Overshoot past the duration is clamped, never snapped back.
///
/// # Example
///
/// ```ignore
/// let mut driver = ProgressDriver::new(0.5, false);
/// // once per frame during the active phase
/// if driver.step(dt, &mut effect)? == Step::Done {
///     lifecycle.complete(stage);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ProgressDriver {
    parameter: Cow<'static, str>,
    duration: f32,
    start: f32,
    end: f32,
    easing: Easing,
    elapsed: f32,
}

/// Driver ticking `_progress` over `duration` seconds, 1→0 when `reverse`.
pub fn tick_progress(duration: f32, reverse: bool) -> ProgressDriver {
    ProgressDriver::new(duration, reverse)
}

impl ProgressDriver {
    /// Driver for `_progress` with the default quadratic ease-in.
    pub fn new(duration: f32, reverse: bool) -> Self {
        let (start, end) = if reverse { (1.0, 0.0) } else { (0.0, 1.0) };
        Self {
            parameter: Cow::Borrowed(PROGRESS_PARAMETER),
            duration,
            start,
            end,
            easing: Easing::EaseIn,
            elapsed: 0.0,
        }
    }

    /// Write to `name` instead of `_progress`.
    pub fn parameter(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.parameter = name.into();
        self
    }

    /// Replace the easing curve.
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Seconds from start to end.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Seconds accumulated by successful steps.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Value that the most recent step wrote (or the start value before any step).
    pub fn progress(&self) -> f32 {
        self.value_at(self.elapsed)
    }

    fn value_at(&self, elapsed: f32) -> f32 {
        if !(self.duration > 0.0) {
            return self.start;
        }
        let t = (elapsed / self.duration).clamp(0.0, 1.0);
        lerp(self.start, self.end, self.easing.apply(t))
    }

    /// True once no further writes will happen. Zero, negative and NaN
    /// durations are finished from the start.
    pub fn is_finished(&self) -> bool {
        !(self.elapsed < self.duration)
    }

    /// Advance by one frame. A failed write leaves the elapsed time as it was.
    pub fn step<E>(&mut self, dt: f32, effect: &mut E) -> Result<Step>
    where
        E: EffectParameters + ?Sized,
    {
        if self.is_finished() {
            return Ok(Step::Done);
        }

        let elapsed = self.elapsed + dt.max(0.0);
        effect.set_parameter(&self.parameter, self.value_at(elapsed))?;
        self.elapsed = elapsed;
        Ok(Step::Suspended)
    }

    /// Rewind to the start so the driver can be reused.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
