//! Offscreen render targets.

use glam::UVec2;

/// An offscreen texture that can be rendered to and sampled from.
///
/// Transitions use one to hold the last frame of the outgoing scene. The
/// texture lives until the target is dropped.
pub struct RenderTarget {
    /// The underlying GPU texture that stores pixel data.
    pub texture: wgpu::Texture,
    /// A view into the texture, used for render pass attachments and shader sampling.
    pub view: wgpu::TextureView,
    size: UVec2,
    format: wgpu::TextureFormat,
}

impl RenderTarget {
    /// Creates a render target with `RENDER_ATTACHMENT` and `TEXTURE_BINDING` usage.
    ///
    /// # Arguments
    ///
    /// * `device` - Device to allocate on
    /// * `size` - Width and height in pixels, both non-zero
    /// * `format` - Pixel format, normally the backbuffer format
    /// * `label` - Debug label for the texture (visible in GPU debuggers like RenderDoc)
    pub fn new(
        device: &wgpu::Device,
        size: UVec2,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
            format,
        }
    }

    /// Size in pixels.
    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Texture format the target was created with.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("size", &self.size)
            .field("format", &self.format)
            .finish()
    }
}
