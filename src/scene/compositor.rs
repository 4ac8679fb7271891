//! Per-frame draw ordering for the active scene and transition.

use super::Scene;
use super::stage::Stage;
use super::transition::SceneTransition;
use crate::error::Result;
use crate::render::{RenderDevice, TargetBinding};

/// Decides where the active scene draws and when the transition draws on top.
///
/// On the one frame a transition asks for a capture, the scene renders into
/// the transition's snapshot instead of the screen. The transition always
/// renders last, onto the screen.
pub struct Compositor;

impl Compositor {
    /// Frame with no transition in flight.
    pub fn render_scene<S: Scene>(device: &mut S::Device, stage: &mut Stage<S>) {
        device.bind_target(TargetBinding::Screen);
        if let Some(scene) = stage.scene_mut() {
            scene.render(device);
        }
    }

    /// Frame with `transition` in flight. Fails when the transition's own
    /// draw fails; the scene has rendered by then.
    pub fn render_transition<S, T>(
        device: &mut S::Device,
        stage: &mut Stage<S>,
        transition: &mut T,
    ) -> Result<()>
    where
        S: Scene,
        T: SceneTransition<S> + ?Sized,
    {
        let capture = transition.lifecycle_mut().take_capture();
        let frame = stage.frame_count();
        match (stage.scene_mut(), transition.lifecycle().snapshot()) {
            (Some(scene), Some(snapshot)) if capture => {
                device.bind_target(TargetBinding::Offscreen(snapshot));
                scene.render(device);
                tracing::debug!(frame, "outgoing scene captured");
            }
            (Some(scene), _) => {
                device.bind_target(TargetBinding::Screen);
                scene.render(device);
            }
            (None, _) => {}
        }

        device.bind_target(TargetBinding::Screen);
        transition.render(device)
    }
}
