//! Transition demo: two scenes and every built-in transition.
//!
//! Controls:
//! - 1: cut to the other scene
//! - 2: fade through black
//! - 3: wipe through white
//! - 4: fade with a scene factory that fails (the current scene stays)

use segue::{
    AppConfig, Color, Effect, EffectParameters, GpuDevice, KeyCode, RenderDevice, Scene,
    SetupContext,
};

const STRIPES_SHADER: &str = r#"
@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    let band = step(0.5, fract(in.uv.x * 8.0 + param(0u) * 0.25));
    return vec4f(u.color.rgb * (0.6 + 0.4 * band), 1.0);
}
"#;

/// A solid background, optionally with animated stripes on top.
struct Backdrop {
    name: &'static str,
    color: Color,
    stripes: Option<Effect>,
    time: f32,
}

impl Backdrop {
    fn plain() -> Self {
        Self {
            name: "plain",
            color: Color::rgb(0.08, 0.1, 0.16),
            stripes: None,
            time: 0.0,
        }
    }

    fn striped() -> Self {
        let stripes = Effect::new("stripes", STRIPES_SHADER)
            .with_color(Color::rgb(0.85, 0.4, 0.2))
            .with_parameter("time", 0.0);
        Self {
            name: "striped",
            color: Color::BLACK,
            stripes: Some(stripes),
            time: 0.0,
        }
    }

    /// Factory for whichever scene this one is not.
    fn other(&self) -> fn() -> Option<Backdrop> {
        if self.stripes.is_some() {
            build_plain
        } else {
            build_striped
        }
    }
}

fn build_plain() -> Option<Backdrop> {
    Some(Backdrop::plain())
}

fn build_striped() -> Option<Backdrop> {
    Some(Backdrop::striped())
}

impl Scene for Backdrop {
    type Device = GpuDevice;

    fn update(&mut self, dt: f32) {
        self.time += dt;
        if let Some(stripes) = &mut self.stripes {
            if let Err(err) = stripes.set_parameter("time", self.time) {
                tracing::warn!(error = %err, "stripes not animated");
            }
        }
    }

    fn render(&mut self, device: &mut GpuDevice) {
        device.clear(self.color);
        if let Some(stripes) = &self.stripes {
            if let Err(err) = device.draw_effect(stripes, segue::BlendMode::Opaque) {
                tracing::warn!(error = %err, "stripes not drawn");
            }
        }
    }

    fn on_enter(&mut self) {
        tracing::info!(scene = self.name, "entered");
    }

    fn on_exit(&mut self) {
        tracing::info!(scene = self.name, time = self.time, "left");
    }
}

fn main() -> segue::Result<()> {
    segue::init_logging();

    segue::run(
        AppConfig::new().title("Segue Transitions").size(1280, 720),
        |ctx: &mut SetupContext<'_, Backdrop>| {
            ctx.set_scene(Backdrop::plain());

            move |frame| {
                let Some(next) = frame.scene().map(Backdrop::other) else {
                    return;
                };

                if frame.key_pressed(KeyCode::Digit1) {
                    frame.cut_to(next);
                } else if frame.key_pressed(KeyCode::Digit2) {
                    frame.fade_to(Color::BLACK, 1.0, next);
                } else if frame.key_pressed(KeyCode::Digit3) {
                    frame.wipe_to(Color::WHITE, 0.8, next);
                } else if frame.key_pressed(KeyCode::Digit4) {
                    frame.fade_to(Color::BLACK, 1.0, || None);
                }
            }
        },
    )
}
