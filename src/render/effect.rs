//! Named-parameter shader effects.
//!
//! An [`Effect`] is a WGSL fragment shader plus an ordered list of `f32`
//! parameters. Parameters are packed into the uniform block in declaration
//! order and read in the shader through `param(index)`; the effect color is
//! available as `u.color`.

use std::borrow::Cow;

use crate::color::Color;
use crate::error::{Error, Result};

/// Parameter name written by [`ProgressDriver`](crate::scene::ProgressDriver) by default.
pub const PROGRESS_PARAMETER: &str = "_progress";

/// Scalars that fit in the effect uniform block.
pub const MAX_EFFECT_PARAMETERS: usize = 16;

/// Write access to named effect parameters.
pub trait EffectParameters {
    /// Set a declared parameter. Undeclared names fail with [`Error::ParameterNotFound`].
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<()>;

    /// Current value of a declared parameter.
    fn parameter(&self, name: &str) -> Option<f32>;
}

/// A full-screen shader effect with named scalar parameters.
#[derive(Clone, Debug)]
pub struct Effect {
    label: Cow<'static, str>,
    shader: Cow<'static, str>,
    color: Color,
    parameters: Vec<(Cow<'static, str>, f32)>,
}

impl Effect {
    /// Create an effect from a WGSL fragment shader.
    ///
    /// The shader must define `fn fs(in: VertexOutput) -> @location(0) vec4f`.
    /// `VertexOutput`, `u` and `param` are provided by the backend.
    pub fn new(label: impl Into<Cow<'static, str>>, shader: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            shader: shader.into(),
            color: Color::BLACK,
            parameters: Vec::new(),
        }
    }

    /// Solid color overlay whose alpha follows `_progress`.
    pub fn fade(color: Color) -> Self {
        Self::new("fade", FADE_SHADER)
            .with_color(color)
            .with_parameter(PROGRESS_PARAMETER, 0.0)
    }

    /// Left-to-right color wipe covering the screen up to `_progress`.
    pub fn wipe(color: Color) -> Self {
        Self::new("wipe", WIPE_SHADER)
            .with_color(color)
            .with_parameter(PROGRESS_PARAMETER, 0.0)
    }

    /// Declare a parameter, or reset its value if it already exists.
    pub fn with_parameter(mut self, name: impl Into<Cow<'static, str>>, value: f32) -> Self {
        let name = name.into();
        if let Some(slot) = self.parameters.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else if self.parameters.len() >= MAX_EFFECT_PARAMETERS {
            tracing::warn!(
                effect = %self.label,
                parameter = %name,
                "effect parameter limit reached, parameter ignored"
            );
        } else {
            self.parameters.push((name, value));
        }
        self
    }

    /// Set the color passed to the shader as `u.color`.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Name used in logs and GPU debug labels.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// WGSL fragment source, without the shared prelude.
    pub fn shader(&self) -> &str {
        &self.shader
    }

    /// Current effect color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Change the color between frames.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Declared parameters in declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, f32)> {
        self.parameters.iter().map(|(n, v)| (n.as_ref(), *v))
    }

    /// Parameters laid out as the shader's `array<vec4f, 4>`.
    pub fn packed_parameters(&self) -> [[f32; 4]; 4] {
        let mut packed = [[0.0; 4]; 4];
        for (i, (_, value)) in self.parameters.iter().enumerate() {
            packed[i / 4][i % 4] = *value;
        }
        packed
    }
}

impl EffectParameters for Effect {
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        match self.parameters.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => {
                slot.1 = value;
                Ok(())
            }
            None => Err(Error::parameter_not_found(self.label.as_ref(), name)),
        }
    }

    fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Color overlay, alpha scaled by progress.
const FADE_SHADER: &str = r#"
@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    return vec4f(u.color.rgb, u.color.a * param(0u));
}
"#;

/// Color bar growing from the left edge.
const WIPE_SHADER: &str = r#"
@fragment
fn fs(in: VertexOutput) -> @location(0) vec4f {
    if (in.uv.x > param(0u)) {
        discard;
    }
    return u.color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_parameter_updates_declared_names() {
        let mut effect = Effect::fade(Color::BLACK);
        effect.set_parameter(PROGRESS_PARAMETER, 0.5).unwrap();
        assert_eq!(effect.parameter(PROGRESS_PARAMETER), Some(0.5));
    }

    #[test]
    fn set_parameter_rejects_unknown_names() {
        let mut effect = Effect::wipe(Color::WHITE);
        let err = effect.set_parameter("_angle", 1.0).unwrap_err();
        match err {
            Error::ParameterNotFound { effect, name } => {
                assert_eq!(effect, "wipe");
                assert_eq!(name, "_angle");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(effect.parameter("_angle"), None);
    }

    #[test]
    fn redeclaring_a_parameter_keeps_its_slot() {
        let effect = Effect::new("custom", "")
            .with_parameter("a", 1.0)
            .with_parameter("b", 2.0)
            .with_parameter("a", 3.0);

        let params: Vec<_> = effect.parameters().collect();
        assert_eq!(params, vec![("a", 3.0), ("b", 2.0)]);
    }

    #[test]
    fn parameters_pack_in_declaration_order() {
        let mut effect = Effect::new("custom", "");
        for i in 0..6 {
            effect = effect.with_parameter(format!("p{i}"), i as f32);
        }

        let packed = effect.packed_parameters();
        assert_eq!(packed[0], [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(packed[1], [4.0, 5.0, 0.0, 0.0]);
        assert_eq!(packed[3], [0.0; 4]);
    }

    #[test]
    fn parameters_beyond_the_limit_are_ignored() {
        let mut effect = Effect::new("custom", "");
        for i in 0..MAX_EFFECT_PARAMETERS + 2 {
            effect = effect.with_parameter(format!("p{i}"), 1.0);
        }

        assert_eq!(effect.parameters().count(), MAX_EFFECT_PARAMETERS);
        assert!(effect.parameter("p16").is_none());
    }
}
