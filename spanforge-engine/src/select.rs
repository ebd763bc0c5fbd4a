//! Weighted scenario selection.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use spanforge_scenario::Scenario;

use crate::error::EngineError;

/// Picks scenarios proportionally to their declared weights.
///
/// Selection is independent per trace (no quotas, no round-robin) and
/// draws from the caller's RNG stream so a seeded run is reproducible.
#[derive(Debug, Clone)]
pub struct ScenarioSelector {
    index: WeightedIndex<u32>,
}

impl ScenarioSelector {
    pub fn new(scenarios: &[Scenario]) -> Result<Self, EngineError> {
        let index = WeightedIndex::new(scenarios.iter().map(|s| s.weight))
            .map_err(|_| EngineError::NoScenarios)?;
        Ok(Self { index })
    }

    /// Pick one scenario index.
    pub fn pick(&self, rng: &mut StdRng) -> usize {
        self.index.sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use spanforge_core::SpanKind;
    use spanforge_scenario::{Scenario, SpanNode, Template};

    use super::*;

    fn scenario(name: &str, weight: u32) -> Scenario {
        Scenario {
            name: name.to_owned(),
            weight,
            vars: Vec::new(),
            root: SpanNode {
                service: "svc".to_owned(),
                operation: Template::literal("op"),
                kind: SpanKind::Internal,
                delay_ms: (0, 0),
                attributes: Vec::new(),
                events: Vec::new(),
                error_conditions: Vec::new(),
                export_context_as: None,
                link_from_context: None,
                calls: Vec::new(),
            },
        }
    }

    #[test]
    fn empty_set_is_rejected() {
        assert!(matches!(
            ScenarioSelector::new(&[]),
            Err(EngineError::NoScenarios)
        ));
    }

    #[test]
    fn single_scenario_is_always_picked() {
        let scenarios = vec![scenario("only", 1)];
        let selector = ScenarioSelector::new(&scenarios).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(selector.pick(&mut rng), 0);
        }
    }

    #[test]
    fn selection_shares_track_weights() {
        // Weights 1 and 3 over 40k draws: the heavy scenario's share must
        // land within 3 sigma of 0.75.
        let scenarios = vec![scenario("light", 1), scenario("heavy", 3)];
        let selector = ScenarioSelector::new(&scenarios).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let n = 40_000u32;
        let mut heavy = 0u32;
        for _ in 0..n {
            if selector.pick(&mut rng) == 1 {
                heavy += 1;
            }
        }

        let share = f64::from(heavy) / f64::from(n);
        assert!(
            (0.735..=0.765).contains(&share),
            "heavy share {share} outside tolerance"
        );
    }

    #[test]
    fn same_seed_same_picks() {
        let scenarios = vec![scenario("a", 2), scenario("b", 5), scenario("c", 1)];
        let selector = ScenarioSelector::new(&scenarios).unwrap();

        let mut first = StdRng::seed_from_u64(99);
        let mut second = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            assert_eq!(selector.pick(&mut first), selector.pick(&mut second));
        }
    }
}
