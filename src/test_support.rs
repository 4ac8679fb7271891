//! Recording doubles for the rendering collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::UVec2;

use crate::color::Color;
use crate::error::{Error, Result};
use crate::render::{
    BlendMode, Effect, EffectParameters, PROGRESS_PARAMETER, RenderDevice, SamplerMode,
    TargetBinding,
};
use crate::scene::{Scene, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Screen,
    Offscreen(u32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Bind(Binding),
    Clear(Color),
    Blit {
        surface: u32,
        blend: BlendMode,
        sampler: SamplerMode,
    },
    Effect {
        label: String,
        blend: BlendMode,
        progress: Option<f32>,
    },
    Scene(&'static str),
}

/// Surface handle that tracks how many are alive.
#[derive(Debug)]
pub struct MockSurface {
    pub id: u32,
    pub size: UVec2,
    live: Rc<Cell<usize>>,
}

impl Drop for MockSurface {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

pub struct MockDevice {
    pub size: UVec2,
    pub format: wgpu::TextureFormat,
    pub commands: Vec<Command>,
    /// Effect labels whose draws fail as if their shader were broken.
    pub broken_effects: Vec<&'static str>,
    next_surface: u32,
    live: Rc<Cell<usize>>,
}

impl MockDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: UVec2::new(width, height),
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            commands: Vec::new(),
            broken_effects: Vec::new(),
            next_surface: 0,
            live: Rc::new(Cell::new(0)),
        }
    }

    pub fn live_surfaces(&self) -> usize {
        self.live.get()
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

impl RenderDevice for MockDevice {
    type Surface = MockSurface;

    fn screen_size(&self) -> UVec2 {
        self.size
    }

    fn backbuffer_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn create_render_target(
        &mut self,
        size: UVec2,
        _format: wgpu::TextureFormat,
    ) -> Result<MockSurface> {
        if size.x == 0 || size.y == 0 {
            return Err(Error::surface_allocation(size.x, size.y, "zero-sized target"));
        }
        let id = self.next_surface;
        self.next_surface += 1;
        self.live.set(self.live.get() + 1);
        Ok(MockSurface {
            id,
            size,
            live: Rc::clone(&self.live),
        })
    }

    fn bind_target(&mut self, target: TargetBinding<'_, MockSurface>) {
        let binding = match target {
            TargetBinding::Screen => Binding::Screen,
            TargetBinding::Offscreen(surface) => Binding::Offscreen(surface.id),
        };
        self.commands.push(Command::Bind(binding));
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(Command::Clear(color));
    }

    fn blit(&mut self, source: &MockSurface, blend: BlendMode, sampler: SamplerMode) {
        self.commands.push(Command::Blit {
            surface: source.id,
            blend,
            sampler,
        });
    }

    fn draw_effect(&mut self, effect: &Effect, blend: BlendMode) -> Result<()> {
        if self.broken_effects.iter().any(|&label| label == effect.label()) {
            return Err(Error::effect_pipeline(effect.label(), "shader failed to compile"));
        }
        self.commands.push(Command::Effect {
            label: effect.label().to_string(),
            blend,
            progress: effect.parameter(PROGRESS_PARAMETER),
        });
        Ok(())
    }
}

pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn events() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Scene that records its hooks and draws a marker command.
pub struct TestScene {
    pub name: &'static str,
    pub updates: u32,
    log: EventLog,
}

impl TestScene {
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            updates: 0,
            log: Rc::clone(log),
        }
    }
}

impl Scene for TestScene {
    type Device = MockDevice;

    fn update(&mut self, _dt: f32) {
        self.updates += 1;
    }

    fn render(&mut self, device: &mut MockDevice) {
        device.commands.push(Command::Scene(self.name));
    }

    fn on_enter(&mut self) {
        self.log.borrow_mut().push(format!("enter:{}", self.name));
    }

    fn on_exit(&mut self) {
        self.log.borrow_mut().push(format!("exit:{}", self.name));
    }
}

/// Stage with a scene named `name` already installed.
pub fn stage_with(name: &'static str) -> Stage<TestScene> {
    let mut stage = Stage::new();
    stage.install_scene(TestScene::new(name, &events()));
    stage
}

/// Factory building `name` and counting its invocations.
pub fn counting_factory(
    name: &'static str,
    log: &EventLog,
    calls: &Rc<Cell<u32>>,
) -> impl FnOnce() -> Option<TestScene> + 'static {
    let log = Rc::clone(log);
    let calls = Rc::clone(calls);
    move || {
        calls.set(calls.get() + 1);
        Some(TestScene::new(name, &log))
    }
}

pub fn null_factory() -> Option<TestScene> {
    None
}

/// Effect accepting any parameter name and keeping every write.
#[derive(Default)]
pub struct RecordingEffect {
    pub writes: Vec<(String, f32)>,
}

impl RecordingEffect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self, name: &str) -> Vec<f32> {
        self.writes
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl EffectParameters for RecordingEffect {
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        self.writes.push((name.to_string(), value));
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<f32> {
        self.writes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}
