use motion_graph::{InputSource, MoveInput};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSegment {
    pub ticks: u32,
    pub x: f32,
    pub y: f32,
    pub jump: bool,
}

impl InputSegment {
    pub const fn hold(ticks: u32, x: f32, y: f32) -> Self {
        Self {
            ticks,
            x,
            y,
            jump: false,
        }
    }

    pub const fn jump(ticks: u32, x: f32, y: f32) -> Self {
        Self {
            ticks,
            x,
            y,
            jump: true,
        }
    }
}

/// Replays a fixed input timeline, one sample per tick. Past the end it reports no input.
#[derive(Debug, Clone)]
pub struct InputScript {
    segments: Vec<InputSegment>,
    cursor: u32,
}

impl InputScript {
    pub fn new(segments: Vec<InputSegment>) -> Self {
        Self {
            segments,
            cursor: 0,
        }
    }

    pub fn demo() -> Self {
        Self::new(vec![
            InputSegment::hold(45, 0.0, 1.0),
            InputSegment::hold(20, 0.7, 0.7),
            InputSegment::jump(3, 0.0, 1.0),
            InputSegment::hold(40, 1.0, 0.0),
            InputSegment::hold(30, 0.0, -1.0),
            InputSegment::jump(2, 0.0, 0.0),
            InputSegment::hold(30, 0.0, 0.0),
        ])
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    fn input_at(&self, tick: u32) -> MoveInput {
        let mut start = 0u32;
        for segment in &self.segments {
            let end = start.saturating_add(segment.ticks);
            if tick < end {
                return MoveInput::new(segment.x, segment.y).with_jump(segment.jump);
            }
            start = end;
        }
        MoveInput::empty()
    }
}

impl InputSource for InputScript {
    fn sample(&mut self) -> MoveInput {
        let input = self.input_at(self.cursor);
        self.cursor = self.cursor.saturating_add(1);
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_play_back_in_order_then_go_idle() {
        let mut script = InputScript::new(vec![
            InputSegment::hold(2, 0.0, 1.0),
            InputSegment::jump(1, 1.0, 0.0),
        ]);

        assert_eq!(script.sample(), MoveInput::new(0.0, 1.0));
        assert_eq!(script.sample(), MoveInput::new(0.0, 1.0));
        let jump = script.sample();
        assert!(jump.jump_pressed());
        assert_eq!(jump.direction(), [1.0, 0.0]);
        assert_eq!(script.sample(), MoveInput::empty());
        assert_eq!(script.cursor(), 4);
    }

    #[test]
    fn cloned_script_resumes_from_the_same_cursor() {
        let mut script = InputScript::demo();
        for _ in 0..50 {
            script.sample();
        }
        let mut resumed = script.clone();
        for _ in 0..100 {
            assert_eq!(resumed.sample(), script.sample());
        }
    }
}
