use std::time::Duration;

use tracing::warn;

const DEFAULT_TARGET_TPS: u32 = 60;

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub target_tps: u32,
    pub max_ticks_per_frame: u32,
    pub max_frame_delta: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            target_tps: DEFAULT_TARGET_TPS,
            max_ticks_per_frame: 5,
            max_frame_delta: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub dropped_backlog: Duration,
}

/// Turns variable frame times into a whole number of fixed ticks. Leftover time carries
/// into the next frame; backlog beyond the per-frame cap is dropped.
#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
    max_frame_delta: Duration,
    accumulator: Duration,
}

impl FixedStepScheduler {
    pub fn new(config: &ScheduleConfig) -> Self {
        let target_tps = if config.target_tps == 0 {
            DEFAULT_TARGET_TPS
        } else {
            config.target_tps
        };
        let fixed_dt = Duration::from_secs_f64(1.0 / f64::from(target_tps));
        Self {
            fixed_dt,
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            max_frame_delta: normalize_non_zero_duration(config.max_frame_delta, fixed_dt),
            accumulator: Duration::ZERO,
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn fixed_dt_seconds(&self) -> f32 {
        self.fixed_dt.as_secs_f32()
    }

    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    pub fn advance(&mut self, frame_dt: Duration) -> StepPlan {
        let clamped = frame_dt.min(self.max_frame_delta);
        let accumulator = self.accumulator.saturating_add(clamped);
        let (plan, remaining) = plan_sim_steps(accumulator, self.fixed_dt, self.max_ticks_per_frame);
        self.accumulator = remaining;

        if !plan.dropped_backlog.is_zero() {
            warn!(
                dropped_ms = plan.dropped_backlog.as_secs_f64() * 1000.0,
                ticks = plan.ticks_to_run,
                "sim_backlog_dropped"
            );
        }
        plan
    }
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> (StepPlan, Duration) {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let plan = StepPlan {
            ticks_to_run,
            dropped_backlog: accumulator,
        };
        (plan, Duration::ZERO)
    } else {
        let plan = StepPlan {
            ticks_to_run,
            dropped_backlog: Duration::ZERO,
        };
        (plan, accumulator)
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
