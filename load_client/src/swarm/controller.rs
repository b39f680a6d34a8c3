/// What the swarm should do with its population on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Spawn(usize),
    Stop(usize),
    Hold,
}

/// Turns (current, target, spawn_rate) into bounded population changes.
///
/// Credit accrues at `spawn_rate` users per second of elapsed tick time and is
/// spent one user at a time, so fractional rates work over several ticks. The
/// same rate applies when shrinking. Credit is dropped once the target is
/// reached; a zero rate freezes the population.
#[derive(Debug, Default)]
pub struct SpawnPlanner {
    credit: f64,
}

impl SpawnPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&mut self, current: usize, target: usize, spawn_rate: f64, dt_secs: f64) -> Adjustment {
        if current == target {
            self.credit = 0.0;
            return Adjustment::Hold;
        }

        if spawn_rate.is_finite() && spawn_rate > 0.0 && dt_secs > 0.0 {
            self.credit += spawn_rate * dt_secs;
        }

        let gap = current.abs_diff(target);
        let step = (self.credit.floor() as usize).min(gap);
        if step == 0 {
            return Adjustment::Hold;
        }
        self.credit -= step as f64;
        if step == gap {
            // 목표 도달: 남은 크레딧은 다음 단계로 넘기지 않는다
            self.credit = 0.0;
        }

        if current < target {
            Adjustment::Spawn(step)
        } else {
            Adjustment::Stop(step)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simulates `ticks` polls of `dt` seconds and returns the population after each.
    fn ramp(target: usize, rate: f64, dt: f64, ticks: usize, start: usize) -> Vec<usize> {
        let mut planner = SpawnPlanner::new();
        let mut current = start;
        let mut out = Vec::new();
        for _ in 0..ticks {
            match planner.plan(current, target, rate, dt) {
                Adjustment::Spawn(n) => current += n,
                Adjustment::Stop(n) => current -= n,
                Adjustment::Hold => {}
            }
            out.push(current);
        }
        out
    }

    #[test]
    fn ramps_at_spawn_rate() {
        // warmup stage: 10 users at 2/s, 1s ticks
        assert_eq!(ramp(10, 2.0, 1.0, 7, 0), [2, 4, 6, 8, 10, 10, 10]);
    }

    #[test]
    fn fractional_rate_accumulates() {
        assert_eq!(ramp(3, 0.5, 1.0, 7, 0), [0, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn never_overshoots_target() {
        assert_eq!(ramp(5, 100.0, 1.0, 3, 0), [5, 5, 5]);
        assert_eq!(ramp(35, 5.0, 1.0, 2, 33), [35, 35]);
    }

    #[test]
    fn shrinks_at_spawn_rate() {
        assert_eq!(ramp(2, 3.0, 1.0, 4, 10), [7, 4, 2, 2]);
    }

    #[test]
    fn zero_rate_holds() {
        assert_eq!(ramp(10, 0.0, 1.0, 3, 4), [4, 4, 4]);
    }

    #[test]
    fn credit_does_not_carry_past_target() {
        let mut planner = SpawnPlanner::new();
        assert_eq!(planner.plan(0, 1, 2.5, 1.0), Adjustment::Spawn(1));
        // a new, higher target starts from zero credit
        assert_eq!(planner.plan(1, 10, 2.0, 0.25), Adjustment::Hold);
        assert_eq!(planner.plan(1, 10, 2.0, 0.5), Adjustment::Spawn(1));
    }
}
