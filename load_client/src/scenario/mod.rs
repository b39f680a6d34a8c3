use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{SwarmError, SwarmResult};
use crate::shape::Schedule;

pub mod action;

pub use action::{Action, ActionRequest};

/// Uniform pause between two action cycles of one virtual user, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThinkTime {
    pub lo: f64,
    pub hi: f64,
}

impl ThinkTime {
    pub fn between(lo: f64, hi: f64) -> SwarmResult<Self> {
        let think_time = Self { lo, hi };
        think_time.validate()?;
        Ok(think_time)
    }

    pub fn validate(&self) -> SwarmResult<()> {
        let fail = |reason: &str| SwarmError::InvalidThinkTime {
            lo: self.lo,
            hi: self.hi,
            reason: reason.to_string(),
        };
        if !self.lo.is_finite() || !self.hi.is_finite() {
            return Err(fail("bounds must be finite"));
        }
        if self.lo < 0.0 {
            return Err(fail("lower bound is negative"));
        }
        if self.lo > self.hi {
            return Err(fail("lower bound exceeds upper bound"));
        }
        Ok(())
    }

    /// Always within the closed interval `[lo, hi]`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.lo == self.hi {
            self.lo
        } else {
            rng.gen_range(self.lo..=self.hi)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedAction {
    pub weight: u32,
    #[serde(flatten)]
    pub action: Action,
}

impl WeightedAction {
    pub fn new(weight: u32, action: Action) -> Self {
        Self { weight, action }
    }
}

/// Immutable mixture of actions shared by every virtual user of a run.
#[derive(Debug, Clone)]
pub struct ScenarioProfile {
    actions: Vec<WeightedAction>,
    // cumulative[i] = weight[0] + ... + weight[i]
    cumulative: Vec<u64>,
    total: u64,
    think_time: ThinkTime,
}

impl ScenarioProfile {
    pub fn new(actions: Vec<WeightedAction>, think_time: ThinkTime) -> SwarmResult<Self> {
        think_time.validate()?;
        for wa in &actions {
            wa.action.validate()?;
        }

        let mut cumulative = Vec::with_capacity(actions.len());
        let mut total: u64 = 0;
        for wa in &actions {
            total += wa.weight as u64;
            cumulative.push(total);
        }
        if total == 0 {
            return Err(SwarmError::invalid_profile(
                "sum of action weights must be positive",
            ));
        }

        Ok(Self {
            actions,
            cumulative,
            total,
            think_time,
        })
    }

    /// homepage 3, list_products 5, search_products 2, product_details 1
    pub fn default_actions() -> Vec<WeightedAction> {
        vec![
            WeightedAction::new(3, Action::Homepage),
            WeightedAction::new(5, Action::ListProducts),
            WeightedAction::new(2, Action::search_products()),
            WeightedAction::new(1, Action::product_details()),
        ]
    }

    pub fn juice_shop(think_time: ThinkTime) -> SwarmResult<Self> {
        Self::new(Self::default_actions(), think_time)
    }

    pub fn actions(&self) -> &[WeightedAction] {
        &self.actions
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn think_time_range(&self) -> ThinkTime {
        self.think_time
    }

    /// Picks an action with probability weight / total_weight.
    pub fn select_action<R: Rng>(&self, rng: &mut R) -> &Action {
        // 누적 구간 선택: v 가 속한 첫 구간
        let v = rng.gen_range(0..self.total);
        let idx = self.cumulative.partition_point(|&c| c <= v);
        &self.actions[idx].action
    }

    pub fn think_time<R: Rng>(&self, rng: &mut R) -> f64 {
        self.think_time.sample(rng)
    }
}

/// Named traffic variants. Both run the same action mixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadVariant {
    /// Realistic browsing, fixed concurrency
    Normal,
    /// Faster think time, stepped ramp up to 235 users
    Stress,
}

impl LoadVariant {
    pub fn think_time(&self) -> ThinkTime {
        match self {
            LoadVariant::Normal => ThinkTime { lo: 1.0, hi: 3.0 },
            LoadVariant::Stress => ThinkTime { lo: 0.5, hi: 2.0 },
        }
    }

    /// The normal variant has no shape; concurrency comes from the run config.
    pub fn default_schedule(&self) -> Option<Schedule> {
        match self {
            LoadVariant::Normal => None,
            LoadVariant::Stress => Some(Schedule::stress()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadVariant::Normal => "normal",
            LoadVariant::Stress => "stress",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn think_time_stays_in_closed_interval() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for variant in [LoadVariant::Normal, LoadVariant::Stress] {
            let tt = variant.think_time();
            for _ in 0..10_000 {
                let v = tt.sample(&mut rng);
                assert!(v >= tt.lo && v <= tt.hi, "{} outside {:?}", v, tt);
            }
        }
    }

    #[test]
    fn degenerate_think_time_returns_bound() {
        let tt = ThinkTime::between(0.25, 0.25).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert_eq!(tt.sample(&mut rng), 0.25);
    }

    #[test]
    fn rejects_bad_think_time() {
        assert!(ThinkTime::between(2.0, 1.0).is_err());
        assert!(ThinkTime::between(-0.1, 1.0).is_err());
        assert!(ThinkTime::between(0.0, f64::INFINITY).is_err());
        assert!(ThinkTime::between(0.0, 0.0).is_ok());
    }

    #[test]
    fn rejects_zero_total_weight() {
        let actions = vec![
            WeightedAction::new(0, Action::Homepage),
            WeightedAction::new(0, Action::ListProducts),
        ];
        let err = ScenarioProfile::new(actions, LoadVariant::Normal.think_time()).unwrap_err();
        assert!(matches!(err, SwarmError::InvalidProfile { .. }));

        assert!(ScenarioProfile::new(vec![], LoadVariant::Normal.think_time()).is_err());
    }

    #[test]
    fn zero_weight_action_is_never_selected() {
        let actions = vec![
            WeightedAction::new(0, Action::Homepage),
            WeightedAction::new(1, Action::ListProducts),
            WeightedAction::new(0, Action::product_details()),
        ];
        let profile = ScenarioProfile::new(actions, LoadVariant::Stress.think_time()).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        for _ in 0..1_000 {
            assert_eq!(profile.select_action(&mut rng), &Action::ListProducts);
        }
    }

    #[test]
    fn juice_shop_profile_shape() {
        let profile = ScenarioProfile::juice_shop(LoadVariant::Normal.think_time()).unwrap();
        assert_eq!(profile.total_weight(), 11);
        let names: Vec<_> = profile.actions().iter().map(|a| a.action.name()).collect();
        assert_eq!(
            names,
            ["homepage", "list_products", "search_products", "product_details"]
        );
    }

    #[test]
    fn weighted_action_reads_flat_toml() {
        let wa: WeightedAction = toml::from_str(
            r#"
            weight = 4
            kind = "product_details"
            min_id = 1
            max_id = 5
            "#,
        )
        .unwrap();
        assert_eq!(wa.weight, 4);
        assert_eq!(
            wa.action,
            Action::ProductDetails {
                min_id: 1,
                max_id: 5
            }
        );
    }
}
