use crate::math::clamp01;

/// One tick of locomotion input in local input space: `x` strafes right, `y` moves forward.
///
/// `direction` is unit length (or zero) and `scale` carries the analog magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    direction: [f32; 2],
    scale: f32,
    jump_pressed: bool,
}

impl MoveInput {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds input from raw stick or key axes. Axes are clamped to [-1, 1] and the scale to
    /// [0, 1]. Non-finite axes read as zero.
    pub fn new(x: f32, y: f32) -> Self {
        let x = sanitize_axis(x);
        let y = sanitize_axis(y);
        let magnitude = (x * x + y * y).sqrt();
        let scale = clamp01(magnitude);
        let direction = if magnitude > f32::EPSILON {
            [x / magnitude, y / magnitude]
        } else {
            [0.0, 0.0]
        };
        Self {
            direction,
            scale,
            jump_pressed: false,
        }
    }

    pub fn with_jump(mut self, jump_pressed: bool) -> Self {
        self.jump_pressed = jump_pressed;
        self
    }

    pub fn direction(&self) -> [f32; 2] {
        self.direction
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }
}

fn sanitize_axis(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Anything that can be sampled once per tick for locomotion input.
pub trait InputSource {
    fn sample(&mut self) -> MoveInput;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_keys_are_normalized() {
        let input = MoveInput::new(1.0, 1.0);
        assert!((input.scale() - 1.0).abs() < 1e-6);
        let [x, y] = input.direction();
        assert!((x - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((y - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn partial_stick_keeps_magnitude_in_scale() {
        let input = MoveInput::new(0.0, -0.5);
        assert_eq!(input.direction(), [0.0, -1.0]);
        assert_eq!(input.scale(), 0.5);
    }

    #[test]
    fn garbage_axes_read_as_zero() {
        let input = MoveInput::new(f32::NAN, f32::INFINITY);
        assert_eq!(input.direction(), [0.0, 0.0]);
        assert_eq!(input.scale(), 0.0);
        assert!(!input.jump_pressed());
        assert!(input.with_jump(true).jump_pressed());
    }
}
