//! Snapshot capture of the outgoing scene.

use glam::UVec2;

use crate::error::Result;
use crate::render::RenderDevice;

/// State of a [`CaptureLatch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    NotCaptured,
    Captured,
}

/// One-shot gate allowing exactly one snapshot capture.
///
/// [`observe`](Self::observe) reads and flips in one call: the first
/// observation returns [`CaptureState::NotCaptured`], every later one returns
/// [`CaptureState::Captured`].
#[derive(Debug, Default)]
pub struct CaptureLatch {
    state: CaptureState,
}

impl CaptureLatch {
    /// A latch that has not seen a capture yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current state and leave the latch captured.
    pub fn observe(&mut self) -> CaptureState {
        std::mem::replace(&mut self.state, CaptureState::Captured)
    }

    /// Current state without flipping.
    pub fn peek(&self) -> CaptureState {
        self.state
    }
}

/// Owned offscreen surface holding one frame of the outgoing scene.
pub struct SnapshotBuffer<T> {
    surface: Option<T>,
    size: UVec2,
    format: Option<wgpu::TextureFormat>,
}

impl<T> SnapshotBuffer<T> {
    /// Allocate a surface matching the device's screen size and backbuffer format.
    ///
    /// Allocation failures propagate unchanged.
    pub fn allocate<D>(device: &mut D) -> Result<Self>
    where
        D: RenderDevice<Surface = T>,
    {
        let size = device.screen_size();
        let format = device.backbuffer_format();
        let surface = device.create_render_target(size, format)?;
        tracing::debug!(width = size.x, height = size.y, ?format, "snapshot allocated");

        Ok(Self {
            surface: Some(surface),
            size,
            format: Some(format),
        })
    }

    /// A buffer for transitions that do not capture the outgoing scene.
    pub fn empty() -> Self {
        Self {
            surface: None,
            size: UVec2::ZERO,
            format: None,
        }
    }

    /// The snapshot surface, until released.
    pub fn surface(&self) -> Option<&T> {
        self.surface.as_ref()
    }

    /// True while the buffer holds a surface.
    pub fn is_allocated(&self) -> bool {
        self.surface.is_some()
    }

    /// Size requested at allocation, zero for empty buffers.
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Format requested at allocation, `None` for empty buffers.
    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.format
    }

    /// Drop the surface. Returns `false` if there was nothing to release.
    pub fn release(&mut self) -> bool {
        match self.surface.take() {
            Some(surface) => {
                drop(surface);
                tracing::debug!(width = self.size.x, height = self.size.y, "snapshot released");
                true
            }
            None => false,
        }
    }
}

impl<T> std::fmt::Debug for SnapshotBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotBuffer")
            .field("allocated", &self.surface.is_some())
            .field("size", &self.size)
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockDevice;

    #[test]
    fn latch_flips_on_first_observation_only() {
        let mut latch = CaptureLatch::new();
        assert_eq!(latch.peek(), CaptureState::NotCaptured);
        assert_eq!(latch.observe(), CaptureState::NotCaptured);
        for _ in 0..10 {
            assert_eq!(latch.observe(), CaptureState::Captured);
        }
        assert_eq!(latch.peek(), CaptureState::Captured);
    }

    #[test]
    fn peek_does_not_flip() {
        let mut latch = CaptureLatch::new();
        for _ in 0..3 {
            assert_eq!(latch.peek(), CaptureState::NotCaptured);
        }
        assert_eq!(latch.observe(), CaptureState::NotCaptured);
    }

    #[test]
    fn allocation_matches_screen() {
        let mut device = MockDevice::new(1920, 1080);
        let snapshot = SnapshotBuffer::allocate(&mut device).unwrap();

        assert!(snapshot.is_allocated());
        assert_eq!(snapshot.size(), UVec2::new(1920, 1080));
        assert_eq!(snapshot.format(), Some(device.format));
        assert_eq!(snapshot.surface().unwrap().size, UVec2::new(1920, 1080));
        assert_eq!(device.live_surfaces(), 1);
    }

    #[test]
    fn release_drops_the_surface_once() {
        let mut device = MockDevice::new(640, 480);
        let mut snapshot = SnapshotBuffer::allocate(&mut device).unwrap();

        assert!(snapshot.release());
        assert_eq!(device.live_surfaces(), 0);
        assert!(!snapshot.release());
        assert!(snapshot.surface().is_none());
    }

    #[test]
    fn allocation_failure_propagates() {
        let mut device = MockDevice::new(0, 0);
        let err = SnapshotBuffer::allocate(&mut device).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::SurfaceAllocation {
                width: 0,
                height: 0,
                ..
            }
        ));
    }

    #[test]
    fn empty_buffer_has_nothing_to_release() {
        let mut snapshot: SnapshotBuffer<()> = SnapshotBuffer::empty();
        assert!(!snapshot.is_allocated());
        assert!(!snapshot.release());
    }
}
