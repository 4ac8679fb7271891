//! Host context: the active scene and the active-transition slot.

use super::Scene;
use crate::error::{Error, Result};

/// Identifies the transition occupying a [`Stage`]'s transition slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransitionId(u64);

impl std::fmt::Display for TransitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transition#{}", self.0)
    }
}

/// The slots a scene switch reads and writes.
///
/// The active-transition slot has a single writer on each side: only the
/// [`Director`](super::Director) occupies it, and only
/// [`TransitionLifecycle::complete`](super::TransitionLifecycle::complete)
/// clears it.
pub struct Stage<S> {
    scene: Option<S>,
    active_transition: Option<TransitionId>,
    next_transition: u64,
    frame: u64,
}

impl<S> Stage<S> {
    /// Empty stage with a free transition slot.
    pub fn new() -> Self {
        Self {
            scene: None,
            active_transition: None,
            next_transition: 0,
            frame: 0,
        }
    }

    /// The active scene, if one is installed.
    pub fn scene(&self) -> Option<&S> {
        self.scene.as_ref()
    }

    /// Mutable access to the active scene.
    pub fn scene_mut(&mut self) -> Option<&mut S> {
        self.scene.as_mut()
    }

    /// The transition currently in flight, if any.
    pub fn active_transition(&self) -> Option<TransitionId> {
        self.active_transition
    }

    /// True while the transition slot is occupied.
    pub fn is_transitioning(&self) -> bool {
        self.active_transition.is_some()
    }

    /// Frames run since the stage was created.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub(crate) fn advance_frame(&mut self) {
        self.frame += 1;
    }

    pub(crate) fn occupy_transition_slot(&mut self) -> Result<TransitionId> {
        if self.active_transition.is_some() {
            return Err(Error::TransitionInProgress);
        }
        let id = TransitionId(self.next_transition);
        self.next_transition += 1;
        self.active_transition = Some(id);
        Ok(id)
    }

    /// Clear the slot if it still names `id`.
    pub(crate) fn release_transition(&mut self, id: TransitionId) -> bool {
        if self.active_transition == Some(id) {
            self.active_transition = None;
            true
        } else {
            false
        }
    }
}

impl<S: Scene> Stage<S> {
    /// Replace the active scene, running exit and enter hooks.
    pub(crate) fn install_scene(&mut self, mut scene: S) {
        if let Some(mut outgoing) = self.scene.take() {
            outgoing.on_exit();
        }
        scene.on_enter();
        self.scene = Some(scene);
    }
}

impl<S> Default for Stage<S> {
    fn default() -> Self {
        Self::new()
    }
}
