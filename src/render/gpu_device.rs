//! wgpu implementation of [`RenderDevice`].
//!
//! Every draw is a full-screen triangle recorded into one command encoder per
//! frame. Pipelines are built on first use and cached per shader, blend mode
//! and target format, so effects with custom shaders cost nothing until drawn.
//! A shader that fails to build is remembered and never rebuilt.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use glam::UVec2;
use wgpu::util::DeviceExt;

use super::{BlendMode, Effect, RenderDevice, RenderTarget, SamplerMode, TargetBinding};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;

/// Uniforms for effect rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct EffectUniforms {
    /// Effect color (RGBA).
    color: [f32; 4],
    /// Scalar parameters, four per slot, in declaration order.
    params: [[f32; 4]; 4],
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum PipelineKey {
    Blit(BlendMode, wgpu::TextureFormat),
    /// Keyed by a hash of the effect's shader source.
    Effect(u64, BlendMode, wgpu::TextureFormat),
}

fn effect_pipeline_key(
    effect: &Effect,
    blend: BlendMode,
    format: wgpu::TextureFormat,
) -> PipelineKey {
    let mut hasher = DefaultHasher::new();
    effect.shader().hash(&mut hasher);
    PipelineKey::Effect(hasher.finish(), blend, format)
}

/// Swapchain texture acquired for the current frame.
struct FrameInFlight {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

enum Bound {
    Screen,
    Offscreen {
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
    },
}

/// A [`RenderDevice`] drawing through wgpu into a window surface.
///
/// Call [`begin_frame`](Self::begin_frame) before rendering and
/// [`end_frame`](Self::end_frame) afterwards; the app runner does both.
pub struct GpuDevice {
    gpu: GpuContext,
    blit_layout: wgpu::BindGroupLayout,
    effect_layout: wgpu::BindGroupLayout,
    linear_sampler: wgpu::Sampler,
    point_sampler: wgpu::Sampler,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    /// Pipelines that failed to build, with the reason.
    failed: HashMap<PipelineKey, String>,
    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<FrameInFlight>,
    bound: Bound,
}

impl GpuDevice {
    /// Create the device and its shared GPU resources.
    pub fn new(gpu: GpuContext) -> Self {
        let device = &gpu.device;

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                // Source texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let effect_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Effect Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let linear_sampler =
            create_sampler(device, "Linear Blit Sampler", wgpu::FilterMode::Linear);
        let point_sampler =
            create_sampler(device, "Point Blit Sampler", wgpu::FilterMode::Nearest);

        Self {
            gpu,
            blit_layout,
            effect_layout,
            linear_sampler,
            point_sampler,
            pipelines: HashMap::new(),
            failed: HashMap::new(),
            encoder: None,
            frame: None,
            bound: Bound::Screen,
        }
    }

    /// The underlying wgpu context.
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Resize the window surface. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// Acquire the swapchain texture and clear it to black.
    ///
    /// A lost or outdated surface is reconfigured and reported as an error;
    /// the caller should skip the frame and try again on the next redraw.
    pub fn begin_frame(&mut self) -> Result<()> {
        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                tracing::warn!(error = %err, "surface needs reconfiguring");
                self.gpu.reconfigure();
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.frame = Some(FrameInFlight { output, view });
        self.bound = Bound::Screen;
        self.clear(Color::BLACK);
        Ok(())
    }

    /// Submit recorded work and present the frame.
    pub fn end_frame(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.gpu.queue.submit(std::iter::once(encoder.finish()));
        }
        if let Some(frame) = self.frame.take() {
            frame.output.present();
        }
        self.bound = Bound::Screen;
    }

    /// View and format of the bound target, if it can be drawn to right now.
    fn target(&self) -> Option<(wgpu::TextureView, wgpu::TextureFormat)> {
        match &self.bound {
            Bound::Screen => self
                .frame
                .as_ref()
                .map(|frame| (frame.view.clone(), self.gpu.config.format)),
            Bound::Offscreen { view, format } => Some((view.clone(), *format)),
        }
    }

    /// Build the pipeline for `key` unless it is cached.
    ///
    /// A failed build is logged once and recorded; later calls with the same
    /// key fail straight away.
    fn ensure_pipeline(&mut self, key: &PipelineKey, effect: Option<&Effect>) -> Result<()> {
        let name = effect.map_or("Blit", Effect::label);
        if self.pipelines.contains_key(key) {
            return Ok(());
        }
        if let Some(reason) = self.failed.get(key) {
            return Err(Error::effect_pipeline(name, reason.clone()));
        }

        let (source, layout, blend, format) = match (key, effect) {
            (PipelineKey::Blit(blend, format), _) => {
                (BLIT_SHADER.to_string(), &self.blit_layout, *blend, *format)
            }
            (PipelineKey::Effect(_, blend, format), Some(effect)) => (
                format!("{EFFECT_PRELUDE}\n{}", effect.shader()),
                &self.effect_layout,
                *blend,
                *format,
            ),
            (PipelineKey::Effect(..), None) => {
                return Err(Error::effect_pipeline(name, "no shader to build from"));
            }
        };

        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = fullscreen_pipeline(device, name, &source, layout, format, blend);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            let reason = err.to_string();
            tracing::error!(
                pipeline = ?key,
                effect = name,
                error = %reason,
                "pipeline creation failed"
            );
            self.failed.insert(key.clone(), reason.clone());
            return Err(Error::effect_pipeline(name, reason));
        }

        tracing::debug!(pipeline = ?key, effect = name, "pipeline created");
        self.pipelines.insert(key.clone(), pipeline);
        Ok(())
    }

    fn draw_fullscreen(
        &mut self,
        label: &str,
        view: &wgpu::TextureView,
        key: &PipelineKey,
        bind_group: &wgpu::BindGroup,
    ) {
        let Some(pipeline) = self.pipelines.get(key) else {
            return;
        };
        let encoder = self.encoder.get_or_insert_with(|| {
            self.gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Segue Frame Encoder"),
                })
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl RenderDevice for GpuDevice {
    type Surface = RenderTarget;

    fn screen_size(&self) -> UVec2 {
        UVec2::new(self.gpu.width(), self.gpu.height())
    }

    fn backbuffer_format(&self) -> wgpu::TextureFormat {
        self.gpu.config.format
    }

    fn create_render_target(
        &mut self,
        size: UVec2,
        format: wgpu::TextureFormat,
    ) -> Result<RenderTarget> {
        if size.x == 0 || size.y == 0 {
            return Err(Error::surface_allocation(size.x, size.y, "zero-sized target"));
        }
        let max = self.gpu.device.limits().max_texture_dimension_2d;
        if size.x > max || size.y > max {
            return Err(Error::surface_allocation(
                size.x,
                size.y,
                format!("exceeds the {max}px texture limit"),
            ));
        }

        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let target = RenderTarget::new(device, size, format, "Transition Snapshot");
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(err) => Err(Error::surface_allocation(size.x, size.y, err.to_string())),
            None => Ok(target),
        }
    }

    fn bind_target(&mut self, target: TargetBinding<'_, RenderTarget>) {
        self.bound = match target {
            TargetBinding::Screen => Bound::Screen,
            TargetBinding::Offscreen(target) => Bound::Offscreen {
                view: target.view.clone(),
                format: target.format(),
            },
        };
    }

    fn clear(&mut self, color: Color) {
        let Some((view, _)) = self.target() else {
            tracing::warn!("clear issued with no frame in flight");
            return;
        };
        let encoder = self.encoder.get_or_insert_with(|| {
            self.gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Segue Frame Encoder"),
                })
        });

        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color.into()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    fn blit(&mut self, source: &RenderTarget, blend: BlendMode, sampler: SamplerMode) {
        let Some((view, format)) = self.target() else {
            tracing::warn!("blit issued with no frame in flight");
            return;
        };
        let key = PipelineKey::Blit(blend, format);
        // Logged when the build first failed.
        if self.ensure_pipeline(&key, None).is_err() {
            return;
        }

        let sampler = match sampler {
            SamplerMode::Linear => &self.linear_sampler,
            SamplerMode::Point => &self.point_sampler,
        };
        let bind_group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blit Bind Group"),
                layout: &self.blit_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });

        self.draw_fullscreen("Blit Pass", &view, &key, &bind_group);
    }

    fn draw_effect(&mut self, effect: &Effect, blend: BlendMode) -> Result<()> {
        let Some((view, format)) = self.target() else {
            tracing::warn!(effect = effect.label(), "effect issued with no frame in flight");
            return Ok(());
        };
        let key = effect_pipeline_key(effect, blend, format);
        self.ensure_pipeline(&key, Some(effect))?;

        let uniforms = EffectUniforms {
            color: effect.color().to_array(),
            params: effect.packed_parameters(),
        };
        // One buffer per draw so several effects can share a frame.
        let uniform_buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Effect Uniforms"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Effect Bind Group"),
                layout: &self.effect_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        self.draw_fullscreen("Effect Pass", &view, &key, &bind_group);
        Ok(())
    }
}

fn create_sampler(device: &wgpu::Device, label: &str, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    blend: BlendMode,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    let blend_state = match blend {
        BlendMode::Opaque => wgpu::BlendState::REPLACE,
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend_state),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Full-screen copy of a texture.
const BLIT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
}

@group(0) @binding(0) var source_texture: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> VertexOutput {
    // Fullscreen triangle
    let uv = vec2f(f32((vi << 1u) & 2u), f32(vi & 2u));
    var out: VertexOutput;
    out.position = vec4f(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2f(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    return textureSample(source_texture, source_sampler, in.uv);
}
"#;

/// Shared declarations prepended to every effect shader.
const EFFECT_PRELUDE: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4f,
    @location(0) uv: vec2f,
}

struct EffectUniforms {
    color: vec4f,
    params: array<vec4f, 4>,
}

@group(0) @binding(0) var<uniform> u: EffectUniforms;

fn param(i: u32) -> f32 {
    return u.params[i / 4u][i % 4u];
}

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> VertexOutput {
    let uv = vec2f(f32((vi << 1u) & 2u), f32(vi & 2u));
    var out: VertexOutput;
    out.position = vec4f(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2f(uv.x, 1.0 - uv.y);
    return out;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

    #[test]
    fn effect_keys_follow_the_shader_not_the_label() {
        let fade = Effect::fade(Color::BLACK);
        let renamed = Effect::new("curtain", fade.shader().to_string());
        let wipe_named_fade = Effect::new(
            fade.label().to_string(),
            Effect::wipe(Color::BLACK).shader().to_string(),
        );

        let key = effect_pipeline_key(&fade, BlendMode::Alpha, FORMAT);
        assert_eq!(key, effect_pipeline_key(&renamed, BlendMode::Alpha, FORMAT));
        assert_ne!(key, effect_pipeline_key(&wipe_named_fade, BlendMode::Alpha, FORMAT));
    }

    #[test]
    fn effect_keys_separate_blend_and_format() {
        let fade = Effect::fade(Color::BLACK);
        let key = effect_pipeline_key(&fade, BlendMode::Alpha, FORMAT);

        assert_ne!(key, effect_pipeline_key(&fade, BlendMode::Opaque, FORMAT));
        assert_ne!(
            key,
            effect_pipeline_key(&fade, BlendMode::Alpha, wgpu::TextureFormat::Rgba8Unorm)
        );
    }
}
