//! Runs the active scene and at most one transition, a frame at a time.

use super::compositor::Compositor;
use super::stage::{Stage, TransitionId};
use super::transition::SceneTransition;
use super::{Scene, Step};
use crate::error::{Error, Result};

/// Owns the [`Stage`] and the transition in flight.
///
/// Each [`frame`](Self::frame) steps the transition, updates the active
/// scene and renders through the [`Compositor`]. A transition that fails,
/// while stepping or while drawing, is completed on the spot, so its snapshot
/// is released and the slot freed before the error is returned.
pub struct Director<S: Scene + 'static> {
    stage: Stage<S>,
    transition: Option<Box<dyn SceneTransition<S>>>,
}

impl<S: Scene + 'static> Director<S> {
    /// Director with no scene and no transition.
    pub fn new() -> Self {
        Self {
            stage: Stage::new(),
            transition: None,
        }
    }

    /// Director starting on `scene`.
    pub fn with_scene(scene: S) -> Self {
        let mut director = Self::new();
        director.stage.install_scene(scene);
        director
    }

    /// The stage holding the active scene and transition slot.
    pub fn stage(&self) -> &Stage<S> {
        &self.stage
    }

    /// The active scene, if one is installed.
    pub fn scene(&self) -> Option<&S> {
        self.stage.scene()
    }

    /// Mutable access to the active scene.
    pub fn scene_mut(&mut self) -> Option<&mut S> {
        self.stage.scene_mut()
    }

    /// True while a transition holds the slot.
    pub fn is_transitioning(&self) -> bool {
        self.stage.is_transitioning()
    }

    /// Swap the active scene immediately, without a transition.
    pub fn set_scene(&mut self, scene: S) -> Result<()> {
        if self.stage.is_transitioning() {
            return Err(Error::TransitionInProgress);
        }
        self.stage.install_scene(scene);
        Ok(())
    }

    /// Start `transition`. Fails with [`Error::TransitionInProgress`] while
    /// another one is in flight; the rejected transition is dropped, which
    /// releases its snapshot.
    pub fn change_scene<T>(&mut self, mut transition: T) -> Result<TransitionId>
    where
        T: SceneTransition<S> + 'static,
    {
        let id = self.stage.occupy_transition_slot()?;
        transition.lifecycle_mut().attach(id);
        tracing::info!(
            %id,
            snapshot = transition.lifecycle().wants_snapshot(),
            "transition started"
        );
        self.transition = Some(Box::new(transition));
        Ok(id)
    }

    /// Run one frame: step the transition, update the scene, render.
    ///
    /// Rendering happens even when the transition step fails; the error is
    /// returned afterwards. A failed transition draw abandons the transition
    /// too. When both fail the step error wins.
    pub fn frame(&mut self, device: &mut S::Device, dt: f32) -> Result<()> {
        self.stage.advance_frame();
        let stepped = self.step_transition(dt);

        if let Some(scene) = self.stage.scene_mut() {
            scene.update(dt);
        }

        let rendered = match self.transition.as_deref_mut() {
            Some(transition) => Compositor::render_transition(device, &mut self.stage, transition),
            None => {
                Compositor::render_scene(device, &mut self.stage);
                Ok(())
            }
        };
        if let Err(err) = &rendered {
            self.abandon_transition(err);
        }

        stepped.and(rendered)
    }

    fn abandon_transition(&mut self, err: &Error) {
        let Some(mut transition) = self.transition.take() else {
            return;
        };
        let lifecycle = transition.lifecycle_mut();
        tracing::error!(id = ?lifecycle.id(), error = %err, "transition render failed");
        lifecycle.complete(&mut self.stage);
    }

    fn step_transition(&mut self, dt: f32) -> Result<()> {
        let Some(transition) = self.transition.as_deref_mut() else {
            return Ok(());
        };

        let result = transition.begin_transition(dt, &mut self.stage);
        let lifecycle = transition.lifecycle_mut();
        let outcome = match result {
            Ok(Step::Done) if !lifecycle.is_complete() => {
                tracing::warn!(id = ?lifecycle.id(), "transition finished without completing");
                lifecycle.complete(&mut self.stage);
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!(id = ?lifecycle.id(), error = %err, "transition failed");
                lifecycle.complete(&mut self.stage);
                Err(err)
            }
        };

        if lifecycle.is_complete() {
            self.transition = None;
        }
        outcome
    }
}

impl<S: Scene + 'static> Default for Director<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::render::{BlendMode, Effect, SamplerMode};
    use crate::scene::{BasicTransition, ColorTransition, TransitionLifecycle};
    use crate::test_support::{
        Binding, Command, MockDevice, TestScene, counting_factory, events, null_factory,
    };
    use std::cell::Cell;
    use std::rc::Rc;

    /// Finishes the default sequence but never calls `complete`.
    struct Forgetful {
        lifecycle: TransitionLifecycle<TestScene>,
    }

    impl SceneTransition<TestScene> for Forgetful {
        fn lifecycle(&self) -> &TransitionLifecycle<TestScene> {
            &self.lifecycle
        }

        fn lifecycle_mut(&mut self) -> &mut TransitionLifecycle<TestScene> {
            &mut self.lifecycle
        }

        fn begin_transition(&mut self, _dt: f32, stage: &mut Stage<TestScene>) -> Result<Step> {
            if self.lifecycle.wait_first_frame() == Step::Suspended {
                return Ok(Step::Suspended);
            }
            self.lifecycle.load_scene(stage)?;
            Ok(Step::Done)
        }
    }

    fn director_with(name: &'static str) -> Director<TestScene> {
        Director::with_scene(TestScene::new(name, &events()))
    }

    #[test]
    fn basic_transition_captures_then_swaps() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let cut = BasicTransition::new(&mut device, counting_factory("new", &log, &calls)).unwrap();
        director.change_scene(cut).unwrap();
        assert!(director.is_transitioning());
        assert_eq!(device.live_surfaces(), 1);

        director.frame(&mut device, 0.016).unwrap();
        assert_eq!(calls.get(), 0);
        assert_eq!(
            device.take_commands(),
            vec![
                Command::Bind(Binding::Offscreen(0)),
                Command::Scene("old"),
                Command::Bind(Binding::Screen),
                Command::Blit {
                    surface: 0,
                    blend: BlendMode::Opaque,
                    sampler: SamplerMode::Linear,
                },
            ]
        );

        director.frame(&mut device, 0.016).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(!director.is_transitioning());
        assert_eq!(device.live_surfaces(), 0);
        assert_eq!(
            device.take_commands(),
            vec![Command::Bind(Binding::Screen), Command::Scene("new")]
        );
        assert_eq!(director.scene().unwrap().name, "new");
        assert_eq!(director.scene().unwrap().updates, 1);
    }

    #[test]
    fn factory_runs_once() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let cut = BasicTransition::new(&mut device, counting_factory("new", &log, &calls)).unwrap();
        director.change_scene(cut).unwrap();
        for _ in 0..10 {
            director.frame(&mut device, 0.016).unwrap();
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(*log.borrow(), vec!["enter:new"]);
        assert_eq!(director.stage().frame_count(), 10);
    }

    #[test]
    fn second_transition_is_rejected() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let first = BasicTransition::new(&mut device, counting_factory("a", &log, &calls)).unwrap();
        let id = director.change_scene(first).unwrap();

        let second =
            BasicTransition::new(&mut device, counting_factory("b", &log, &calls)).unwrap();
        assert!(matches!(
            director.change_scene(second),
            Err(Error::TransitionInProgress)
        ));
        // The rejected transition's snapshot is gone.
        assert_eq!(device.live_surfaces(), 1);
        assert_eq!(director.stage().active_transition(), Some(id));

        assert!(matches!(
            director.set_scene(TestScene::new("c", &log)),
            Err(Error::TransitionInProgress)
        ));
        assert_eq!(director.scene().unwrap().name, "old");

        director.frame(&mut device, 0.016).unwrap();
        director.frame(&mut device, 0.016).unwrap();
        assert_eq!(director.scene().unwrap().name, "a");
        assert_eq!(calls.get(), 1);

        director.set_scene(TestScene::new("c", &log)).unwrap();
        assert_eq!(director.scene().unwrap().name, "c");
    }

    #[test]
    fn invalid_scene_keeps_old_scene_and_frees_slot() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");

        let cut = BasicTransition::new(&mut device, null_factory).unwrap();
        director.change_scene(cut).unwrap();

        director.frame(&mut device, 0.016).unwrap();
        let err = director.frame(&mut device, 0.016).unwrap_err();
        assert!(matches!(err, Error::InvalidScene));

        assert_eq!(director.scene().unwrap().name, "old");
        assert!(!director.is_transitioning());
        assert_eq!(device.live_surfaces(), 0);

        // The old scene still rendered that frame, and keeps rendering.
        assert_eq!(
            device.take_commands().last(),
            Some(&Command::Scene("old"))
        );
        director.frame(&mut device, 0.016).unwrap();
    }

    #[test]
    fn without_snapshot_renders_straight_to_screen() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let cut = BasicTransition::without_snapshot(counting_factory("new", &log, &calls));
        director.change_scene(cut).unwrap();
        assert_eq!(device.live_surfaces(), 0);

        director.frame(&mut device, 0.016).unwrap();
        assert_eq!(
            device.take_commands(),
            vec![
                Command::Bind(Binding::Screen),
                Command::Scene("old"),
                Command::Bind(Binding::Screen),
            ]
        );

        director.frame(&mut device, 0.016).unwrap();
        assert_eq!(director.scene().unwrap().name, "new");
    }

    #[test]
    fn fade_draws_effect_over_snapshot_then_scene() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let fade = ColorTransition::fade(
            &mut device,
            Color::BLACK,
            1.0,
            counting_factory("new", &log, &calls),
        )
        .unwrap();
        director.change_scene(fade).unwrap();

        // Frame 1: capture, then snapshot and effect at zero.
        director.frame(&mut device, 0.25).unwrap();
        let frame1 = device.take_commands();
        assert_eq!(frame1[0], Command::Bind(Binding::Offscreen(0)));
        assert_eq!(
            frame1.last(),
            Some(&Command::Effect {
                label: "fade".into(),
                blend: BlendMode::Alpha,
                progress: Some(0.0),
            })
        );

        // Frame 2: the old scene draws to screen, the snapshot covers it.
        director.frame(&mut device, 0.25).unwrap();
        assert_eq!(
            device.take_commands(),
            vec![
                Command::Bind(Binding::Screen),
                Command::Scene("old"),
                Command::Bind(Binding::Screen),
                Command::Blit {
                    surface: 0,
                    blend: BlendMode::Opaque,
                    sampler: SamplerMode::Linear,
                },
                Command::Effect {
                    label: "fade".into(),
                    blend: BlendMode::Alpha,
                    progress: Some(0.25),
                },
            ]
        );

        director.frame(&mut device, 0.25).unwrap();
        device.take_commands();
        director.frame(&mut device, 0.25).unwrap();
        assert_eq!(calls.get(), 1);
        let frame4 = device.take_commands();
        assert!(frame4.contains(&Command::Scene("new")));
        assert!(!frame4.iter().any(|c| matches!(c, Command::Blit { .. })));

        director.frame(&mut device, 0.25).unwrap();
        assert!(director.is_transitioning());
        director.frame(&mut device, 0.25).unwrap();
        assert!(!director.is_transitioning());
        assert_eq!(device.live_surfaces(), 0);
        assert_eq!(
            device.take_commands().last(),
            Some(&Command::Scene("new"))
        );
    }

    #[test]
    fn done_without_complete_is_completed() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let lazy = Forgetful {
            lifecycle: TransitionLifecycle::new(&mut device, counting_factory("new", &log, &calls))
                .unwrap(),
        };
        director.change_scene(lazy).unwrap();
        director.frame(&mut device, 0.016).unwrap();
        director.frame(&mut device, 0.016).unwrap();

        assert!(!director.is_transitioning());
        assert_eq!(device.live_surfaces(), 0);
        assert_eq!(director.scene().unwrap().name, "new");
    }

    #[test]
    fn effect_error_abandons_transition() {
        let mut device = MockDevice::new(800, 600);
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let bare = ColorTransition::with_effect(
            &mut device,
            Effect::new("bare", ""),
            1.0,
            counting_factory("new", &log, &calls),
        )
        .unwrap();
        director.change_scene(bare).unwrap();

        director.frame(&mut device, 0.1).unwrap();
        let err = director.frame(&mut device, 0.1).unwrap_err();
        assert!(matches!(err, Error::ParameterNotFound { .. }));
        assert!(!director.is_transitioning());
        assert_eq!(device.live_surfaces(), 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(director.scene().unwrap().name, "old");
    }

    #[test]
    fn render_error_abandons_transition() {
        let mut device = MockDevice::new(800, 600);
        device.broken_effects.push("fade");
        let mut director = director_with("old");
        let log = events();
        let calls = Rc::new(Cell::new(0));

        let fade = ColorTransition::fade(
            &mut device,
            Color::BLACK,
            1.0,
            counting_factory("new", &log, &calls),
        )
        .unwrap();
        director.change_scene(fade).unwrap();

        let err = director.frame(&mut device, 0.1).unwrap_err();
        assert!(matches!(err, Error::EffectPipeline { ref effect, .. } if effect == "fade"));
        assert!(!director.is_transitioning());
        assert_eq!(device.live_surfaces(), 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(director.scene().unwrap().name, "old");

        device.take_commands();
        director.frame(&mut device, 0.1).unwrap();
        assert_eq!(
            device.take_commands(),
            vec![Command::Bind(Binding::Screen), Command::Scene("old")]
        );
    }

    #[test]
    fn snapshot_allocation_failure_is_reported_before_start() {
        let mut device = MockDevice::new(0, 0);
        let err = BasicTransition::<TestScene>::new(&mut device, null_factory).err();
        assert!(matches!(err, Some(Error::SurfaceAllocation { .. })));
    }
}
