use std::sync::Arc;
use std::time::Instant;

use glam::UVec2;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::color::Color;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::render::{GpuDevice, RenderDevice};
use crate::scene::{
    BasicTransition, ColorTransition, Director, Scene, SceneTransition, TransitionId,
};

/// Context provided during app setup.
pub struct SetupContext<'a, S: Scene<Device = GpuDevice> + 'static> {
    pub device: &'a mut GpuDevice,
    director: &'a mut Director<S>,
}

impl<S: Scene<Device = GpuDevice> + 'static> SetupContext<'_, S> {
    /// Install the first scene.
    pub fn set_scene(&mut self, scene: S) {
        if let Err(err) = self.director.set_scene(scene) {
            tracing::warn!(error = %err, "initial scene rejected");
        }
    }

    /// Window size in physical pixels.
    pub fn screen_size(&self) -> UVec2 {
        self.device.screen_size()
    }
}

/// Per-frame context handed to the frame closure.
///
/// The closure runs before the director steps the transition and renders, so
/// a scene change requested here starts on the same frame.
pub struct Frame<'a, S: Scene<Device = GpuDevice> + 'static> {
    device: &'a mut GpuDevice,
    director: &'a mut Director<S>,
    pub input: &'a Input,
    /// Seconds since the app started.
    pub time: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
}

impl<S: Scene<Device = GpuDevice> + 'static> Frame<'_, S> {
    /// True on the frame `key` went down.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.input.key_pressed(key)
    }

    /// The active scene.
    pub fn scene(&self) -> Option<&S> {
        self.director.scene()
    }

    /// Mutable access to the active scene.
    pub fn scene_mut(&mut self) -> Option<&mut S> {
        self.director.scene_mut()
    }

    /// True while a transition is running; new scene changes are ignored.
    pub fn is_transitioning(&self) -> bool {
        self.director.is_transitioning()
    }

    /// Window size in physical pixels.
    pub fn screen_size(&self) -> UVec2 {
        self.device.screen_size()
    }

    /// Switch scenes after one captured frame, with no effect.
    pub fn cut_to<F>(&mut self, factory: F) -> Option<TransitionId>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        if self.rejects_new_transition() {
            return None;
        }
        let transition = BasicTransition::<S>::new(&mut *self.device, factory);
        self.start(transition)
    }

    /// Fade out to `color` and back in on the new scene.
    pub fn fade_to<F>(&mut self, color: Color, duration: f32, factory: F) -> Option<TransitionId>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        if self.rejects_new_transition() {
            return None;
        }
        let transition = ColorTransition::<S>::fade(&mut *self.device, color, duration, factory);
        self.start(transition)
    }

    /// Wipe `color` across the screen and back off it on the new scene.
    pub fn wipe_to<F>(&mut self, color: Color, duration: f32, factory: F) -> Option<TransitionId>
    where
        F: FnOnce() -> Option<S> + 'static,
    {
        if self.rejects_new_transition() {
            return None;
        }
        let transition = ColorTransition::<S>::wipe(&mut *self.device, color, duration, factory);
        self.start(transition)
    }

    /// Start any transition. Failures are logged and the current scene stays.
    pub fn transition<T>(&mut self, transition: T) -> Option<TransitionId>
    where
        T: SceneTransition<S> + 'static,
    {
        self.start(Ok(transition))
    }

    /// The render device, for building custom transitions.
    pub fn device(&mut self) -> &mut GpuDevice {
        &mut *self.device
    }

    // Skips the snapshot allocation when the request would be refused anyway.
    fn rejects_new_transition(&self) -> bool {
        if self.director.is_transitioning() {
            tracing::debug!("scene change ignored, transition in progress");
            return true;
        }
        false
    }

    fn start<T>(&mut self, transition: Result<T>) -> Option<TransitionId>
    where
        T: SceneTransition<S> + 'static,
    {
        match transition.and_then(|t| self.director.change_scene(t)) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "scene change failed");
                None
            }
        }
    }
}

/// Configuration for the app window.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Segue".to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl AppConfig {
    /// Default 800x600 window titled "Segue".
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the logical window size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Open a window and drive a [`Director`] until the window closes.
///
/// `setup` runs once the GPU is ready; it installs the first scene and
/// returns the per-frame closure. Errors during startup end the event loop
/// and are returned. Errors from transitions are logged and the app keeps
/// running on the current scene.
///
/// # Example
/// ```ignore
/// segue::run(AppConfig::new().title("Menu").size(1280, 720), |ctx| {
///     ctx.set_scene(Title::new());
///
///     move |frame| {
///         if frame.key_pressed(KeyCode::Enter) {
///             frame.fade_to(Color::BLACK, 1.0, || Some(Title::level()));
///         }
///     }
/// })?;
/// ```
pub fn run<S, Setup, F>(config: AppConfig, setup: Setup) -> Result<()>
where
    S: Scene<Device = GpuDevice> + 'static,
    Setup: FnOnce(&mut SetupContext<'_, S>) -> F + 'static,
    F: FnMut(&mut Frame<'_, S>) + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let setup: SetupFn<S> = Box::new(move |ctx: &mut SetupContext<'_, S>| {
        Box::new(setup(ctx)) as FrameFn<S>
    });
    let mut app = SegueApp::Pending {
        config,
        setup: Some(setup),
    };

    event_loop.run_app(&mut app)?;

    match app {
        SegueApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

type FrameFn<S> = Box<dyn FnMut(&mut Frame<'_, S>)>;
type SetupFn<S> = Box<dyn FnOnce(&mut SetupContext<'_, S>) -> FrameFn<S>>;

enum SegueApp<S: Scene<Device = GpuDevice> + 'static> {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn<S>>,
    },
    Running {
        window: Arc<Window>,
        device: GpuDevice,
        director: Director<S>,
        frame_fn: FrameFn<S>,
        input: Input,
        start_time: Instant,
        last_frame: Instant,
    },
    Failed(Error),
}

impl<S: Scene<Device = GpuDevice> + 'static> SegueApp<S> {
    fn start(config: &AppConfig, setup: SetupFn<S>, event_loop: &ActiveEventLoop) -> Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let mut device = GpuDevice::new(GpuContext::new(Arc::clone(&window))?);
        let mut director = Director::new();

        let frame_fn = setup(&mut SetupContext {
            device: &mut device,
            director: &mut director,
        });
        if director.scene().is_none() {
            tracing::warn!("setup installed no scene");
        }

        window.request_redraw();
        Ok(SegueApp::Running {
            window,
            device,
            director,
            frame_fn,
            input: Input::new(),
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }
}

impl<S: Scene<Device = GpuDevice> + 'static> ApplicationHandler for SegueApp<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let SegueApp::Pending { config, setup } = self else {
            return;
        };
        let Some(setup) = setup.take() else {
            return;
        };

        match Self::start(config, setup, event_loop) {
            Ok(running) => *self = running,
            Err(err) => {
                tracing::error!(error = %err, "startup failed");
                *self = SegueApp::Failed(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let SegueApp::Running {
            window,
            device,
            director,
            frame_fn,
            input,
            start_time,
            last_frame,
        } = self
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                device.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let time = start_time.elapsed().as_secs_f32();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                if let Err(err) = device.begin_frame() {
                    tracing::warn!(error = %err, "frame skipped");
                    window.request_redraw();
                    return;
                }

                let mut frame = Frame {
                    device: &mut *device,
                    director: &mut *director,
                    input: &*input,
                    time,
                    dt,
                };
                frame_fn(&mut frame);

                if let Err(err) = director.frame(device, dt) {
                    tracing::error!(error = %err, "transition abandoned");
                }

                device.end_frame();
                input.end_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }
}
