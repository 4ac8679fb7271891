//! Error types for scene transitions and the wgpu backend.

use thiserror::Error;

/// Main error type for segue.
#[derive(Error, Debug)]
pub enum Error {
    /// The scene factory produced no usable scene.
    #[error("scene factory produced no usable scene")]
    InvalidScene,

    /// An effect was asked to write a parameter it never declared.
    #[error("effect `{effect}` has no parameter named `{name}`")]
    ParameterNotFound { effect: String, name: String },

    /// A transition was completed more than once.
    ///
    /// Never returned: the completion guard logs it and turns the call into a no-op.
    #[error("transition resources were already released")]
    DoubleRelease,

    /// A scene switch was requested while another transition is still running.
    #[error("a scene transition is already in progress")]
    TransitionInProgress,

    /// Offscreen render target creation failed.
    #[error("failed to allocate {width}x{height} render target: {reason}")]
    SurfaceAllocation {
        width: u32,
        height: u32,
        reason: String,
    },

    /// An effect's shader could not be built into a render pipeline.
    #[error("effect `{effect}` has no usable pipeline: {reason}")]
    EffectPipeline { effect: String, reason: String },

    /// Swapchain texture acquisition failed.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window error: {0}")]
    Window(#[from] winit::error::OsError),
}

impl Error {
    pub fn parameter_not_found(effect: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ParameterNotFound {
            effect: effect.into(),
            name: name.into(),
        }
    }

    pub fn effect_pipeline(effect: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EffectPipeline {
            effect: effect.into(),
            reason: reason.into(),
        }
    }

    pub fn surface_allocation(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::SurfaceAllocation {
            width,
            height,
            reason: reason.into(),
        }
    }
}

/// Result type alias using segue's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_offender() {
        let err = Error::parameter_not_found("fade", "_progress");
        assert_eq!(
            err.to_string(),
            "effect `fade` has no parameter named `_progress`"
        );

        let err = Error::surface_allocation(0, 1080, "zero-sized target");
        assert!(err.to_string().contains("0x1080"));
        assert!(err.to_string().contains("zero-sized target"));

        let err = Error::effect_pipeline("stripes", "unknown identifier");
        assert_eq!(
            err.to_string(),
            "effect `stripes` has no usable pipeline: unknown identifier"
        );
    }

    #[test]
    fn surface_errors_convert() {
        let err: Error = wgpu::SurfaceError::Lost.into();
        assert!(matches!(err, Error::Surface(wgpu::SurfaceError::Lost)));
    }
}
