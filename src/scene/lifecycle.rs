//! The one-time lifecycle shared by every transition.

use super::snapshot::{CaptureLatch, CaptureState, SnapshotBuffer};
use super::stage::{Stage, TransitionId};
use super::{Scene, Step, SurfaceOf};
use crate::error::{Error, Result};
use crate::render::{BlendMode, RenderDevice};

/// Builds the incoming scene. `None` means the scene could not be built.
pub type SceneFactory<S> = Box<dyn FnOnce() -> Option<S>>;

/// Where a transition is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Created, not yet stepped.
    Init,
    /// Waiting one frame so the outgoing scene is captured first.
    WaitFrame,
    /// The wait is over and a variant is animating before the new scene loads.
    PreLoad,
    /// The scene factory is running.
    Loading,
    /// The new scene is installed; a variant may still be animating.
    Active,
    /// Resources released and the transition slot cleared.
    Complete,
    /// The factory produced no scene. Terminal.
    Broken,
}

/// Snapshot, capture latch, scene factory and completion for one scene switch.
///
/// Transition variants own one of these and call into it from
/// [`SceneTransition`](super::SceneTransition); [`begin`](Self::begin) is the
/// whole default sequence.
pub struct TransitionLifecycle<S: Scene> {
    snapshot: SnapshotBuffer<SurfaceOf<S>>,
    latch: CaptureLatch,
    factory: Option<SceneFactory<S>>,
    phase: LifecyclePhase,
    id: Option<TransitionId>,
    released: bool,
}

impl<S: Scene> TransitionLifecycle<S> {
    /// Lifecycle that captures the outgoing scene.
    ///
    /// The snapshot is allocated immediately at the current screen size; an
    /// allocation failure is returned to the caller.
    pub fn new<F>(device: &mut S::Device, factory: F) -> Result<Self>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        let snapshot = SnapshotBuffer::allocate(device)?;
        Ok(Self::with_buffer(snapshot, Box::new(factory)))
    }

    /// Lifecycle that never captures the outgoing scene.
    pub fn without_snapshot<F>(factory: F) -> Self
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        Self::with_buffer(SnapshotBuffer::empty(), Box::new(factory))
    }

    fn with_buffer(snapshot: SnapshotBuffer<SurfaceOf<S>>, factory: SceneFactory<S>) -> Self {
        Self {
            snapshot,
            latch: CaptureLatch::new(),
            factory: Some(factory),
            phase: LifecyclePhase::Init,
            id: None,
            released: false,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Slot id assigned by the director, once started.
    pub fn id(&self) -> Option<TransitionId> {
        self.id
    }

    /// Whether the outgoing scene is rendered into [`snapshot`](Self::snapshot).
    pub fn wants_snapshot(&self) -> bool {
        self.snapshot.format().is_some()
    }

    /// The captured frame, until completion.
    pub fn snapshot(&self) -> Option<&SurfaceOf<S>> {
        self.snapshot.surface()
    }

    /// The buffer owning the snapshot surface.
    pub fn snapshot_buffer(&self) -> &SnapshotBuffer<SurfaceOf<S>> {
        &self.snapshot
    }

    /// Read the capture latch, flipping it to captured.
    pub fn observe_capture(&mut self) -> CaptureState {
        self.latch.observe()
    }

    /// True exactly once, on the frame the outgoing scene should be rendered
    /// into the snapshot. Never true for transitions without a snapshot.
    pub fn take_capture(&mut self) -> bool {
        self.snapshot.is_allocated() && self.latch.observe() == CaptureState::NotCaptured
    }

    /// True once [`complete`](Self::complete) has run.
    pub fn is_complete(&self) -> bool {
        self.released
    }

    pub(crate) fn attach(&mut self, id: TransitionId) {
        self.id = Some(id);
    }

    /// Suspend once on the first call; every later call reports [`Step::Done`].
    pub fn wait_first_frame(&mut self) -> Step {
        if self.phase == LifecyclePhase::Init {
            self.phase = LifecyclePhase::WaitFrame;
            Step::Suspended
        } else {
            Step::Done
        }
    }

    /// Mark the span between the first-frame wait and the scene load.
    ///
    /// Moves [`LifecyclePhase::WaitFrame`] to [`LifecyclePhase::PreLoad`];
    /// any other phase is left alone.
    pub fn begin_preload(&mut self) {
        if self.phase == LifecyclePhase::WaitFrame {
            self.phase = LifecyclePhase::PreLoad;
            tracing::debug!(id = ?self.id, "animating before load");
        }
    }

    /// Run the scene factory and install its scene on `stage`.
    ///
    /// A factory returning `None` leaves the stage untouched, moves the
    /// lifecycle to [`LifecyclePhase::Broken`] and fails with
    /// [`Error::InvalidScene`]. Calling this again after a successful load does
    /// nothing.
    pub fn load_scene(&mut self, stage: &mut Stage<S>) -> Result<()> {
        if self.phase == LifecyclePhase::Broken {
            return Err(Error::InvalidScene);
        }
        let Some(factory) = self.factory.take() else {
            tracing::warn!(id = ?self.id, phase = ?self.phase, "scene already loaded");
            return Ok(());
        };

        self.phase = LifecyclePhase::Loading;
        match factory() {
            Some(scene) => {
                stage.install_scene(scene);
                self.phase = LifecyclePhase::Active;
                tracing::info!(id = ?self.id, "new scene installed");
                Ok(())
            }
            None => {
                self.phase = LifecyclePhase::Broken;
                tracing::error!(id = ?self.id, "scene factory returned no scene");
                Err(Error::InvalidScene)
            }
        }
    }

    /// Release the snapshot and clear the stage's transition slot.
    ///
    /// Returns `false` if the lifecycle was already complete; repeated calls
    /// change nothing.
    pub fn complete(&mut self, stage: &mut Stage<S>) -> bool {
        if self.released {
            tracing::debug!(id = ?self.id, error = %Error::DoubleRelease, "complete ignored");
            return false;
        }
        self.released = true;

        self.snapshot.release();
        if let Some(id) = self.id {
            stage.release_transition(id);
        }
        if self.phase != LifecyclePhase::Broken {
            self.phase = LifecyclePhase::Complete;
        }

        tracing::info!(id = ?self.id, phase = ?self.phase, "transition complete");
        true
    }

    /// Default begin sequence: wait one frame, load, complete.
    pub fn begin(&mut self, stage: &mut Stage<S>) -> Result<Step> {
        if self.wait_first_frame() == Step::Suspended {
            return Ok(Step::Suspended);
        }
        if self.released {
            return Ok(Step::Done);
        }
        if matches!(self.phase, LifecyclePhase::WaitFrame | LifecyclePhase::PreLoad) {
            self.load_scene(stage)?;
        }
        self.complete(stage);
        Ok(Step::Done)
    }

    /// Draw the snapshot full-screen, opaque, with the device's default sampler.
    pub fn render_snapshot(&self, device: &mut S::Device) {
        if let Some(snapshot) = self.snapshot.surface() {
            let sampler = device.default_sampler();
            device.blit(snapshot, BlendMode::Opaque, sampler);
        }
    }
}
