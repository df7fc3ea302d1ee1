use contracts::{
    EnergyConfig, GridPos, MemoryConfig, ScarPosition, SimulationConfig, UtilityConfig,
    UtilityStrategyKind, UtilityWeights,
};
use proptest::prelude::*;
use resync_kernel::memory::MemoryTouch;
use resync_kernel::utility::{ProductInput, SalienceProductUtility};
use resync_kernel::{EnergyLedger, Simulation, SpatialMemoryStore, UtilityInput, WeightedSumUtility};

#[derive(Debug, Clone)]
enum LedgerOp {
    Consume(f64),
    Decay(f64),
    Reward(f64, f64),
    Replenish(f64),
    Set(f64),
}

fn any_amount() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1_000.0_f64..1_000.0,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        Just(0.0),
    ]
}

fn ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        any_amount().prop_map(LedgerOp::Consume),
        any_amount().prop_map(LedgerOp::Decay),
        (any_amount(), any_amount()).prop_map(|(fit, mult)| LedgerOp::Reward(fit, mult)),
        any_amount().prop_map(LedgerOp::Replenish),
        any_amount().prop_map(LedgerOp::Set),
    ]
}

proptest! {
    #[test]
    fn ledger_level_never_leaves_bounds(
        capacity in 1.0_f64..500.0,
        ops in prop::collection::vec(ledger_op(), 0..64),
    ) {
        let mut ledger = EnergyLedger::new(EnergyConfig::with_capacity(capacity));
        let mut last_cost = 0.0;
        for op in ops {
            match op {
                LedgerOp::Consume(cost) => { ledger.consume(cost); }
                LedgerOp::Decay(rate) => ledger.decay(rate),
                LedgerOp::Reward(fit, mult) => { ledger.reward(fit, mult); }
                LedgerOp::Replenish(amount) => { ledger.replenish(amount); }
                LedgerOp::Set(value) => ledger.set(value),
            }
            prop_assert!(ledger.level() >= 0.0);
            prop_assert!(ledger.level() <= ledger.capacity());
            prop_assert!(ledger.accumulated_cost() >= last_cost);
            last_cost = ledger.accumulated_cost();
        }
    }

    #[test]
    fn weighted_utility_is_always_clamped(
        error in any_amount(),
        salience in any_amount(),
        energy in any_amount(),
        recursion in any_amount(),
    ) {
        let mut engine = WeightedSumUtility::new(UtilityWeights::default());
        let output = engine.compute(UtilityInput {
            prediction_error: error,
            salience,
            energy,
            recursive_activity: recursion,
        });
        prop_assert!((0.0..=1.0).contains(&output.utility));
        prop_assert!(output.delta.is_finite());
    }

    #[test]
    fn product_utility_is_always_clamped(
        magnitude in any_amount(),
        variance in any_amount(),
        error in any_amount(),
        influx in any_amount(),
        dt in any_amount(),
    ) {
        let config = UtilityConfig {
            strategy: UtilityStrategyKind::SalienceProduct,
            ..UtilityConfig::default()
        };
        let mut engine = SalienceProductUtility::new(&config);
        for _ in 0..3 {
            let output = engine.compute(ProductInput {
                magnitude,
                variance,
                prediction_error: error,
                external_influx: influx,
                dt,
            });
            prop_assert!((0.0..=1.0).contains(&output.utility));
            prop_assert!((0.0..=config.budget_capacity).contains(&engine.budget()));
        }
    }

    #[test]
    fn memory_never_exceeds_capacity_and_evicts_the_minimum(
        max_entries in 1_usize..12,
        strengths in prop::collection::vec(0.02_f64..1.0, 1..40),
    ) {
        let mut memory = SpatialMemoryStore::new(MemoryConfig {
            max_entries,
            merge_radius: 0.5,
            ..MemoryConfig::default()
        });
        for (index, strength) in strengths.into_iter().enumerate() {
            let minimum = memory
                .entries()
                .iter()
                .map(|scar| scar.intensity)
                .fold(f64::INFINITY, f64::min);
            let position = ScarPosition::cell(GridPos::new(index as i32 * 10, 0));
            match memory.add_or_reinforce(position, strength) {
                MemoryTouch::InsertedAfterEviction { evicted } => {
                    prop_assert_eq!(evicted.intensity, minimum);
                }
                MemoryTouch::Inserted => {}
                MemoryTouch::Reinforced { .. } => prop_assert!(false, "far-apart touches merged"),
                MemoryTouch::Ignored => prop_assert!(false, "touch above the floor ignored"),
            }
            prop_assert!(memory.len() <= max_entries);
        }
    }

    #[test]
    fn repeated_touch_merges_into_one_capped_entry(
        first in 0.02_f64..1.0,
        second in 0.0_f64..1.0,
        x in -50_i32..50,
        y in -50_i32..50,
    ) {
        let mut memory = SpatialMemoryStore::new(MemoryConfig::default());
        let position = ScarPosition::cell(GridPos::new(x, y));
        memory.add_or_reinforce(position, first);
        memory.add_or_reinforce(position, second);
        prop_assert_eq!(memory.len(), 1);
        let expected = (first + second).min(1.0);
        prop_assert!((memory.entries()[0].intensity - expected).abs() < 1e-12);
    }

    #[test]
    fn weak_touches_never_displace_stored_scars(
        max_entries in 1_usize..8,
        weak in 0.0_f64..=0.01,
    ) {
        let mut memory = SpatialMemoryStore::new(MemoryConfig {
            max_entries,
            merge_radius: 0.5,
            ..MemoryConfig::default()
        });
        for index in 0..max_entries {
            memory.add_or_reinforce(ScarPosition::cell(GridPos::new(index as i32 * 10, 0)), 0.5);
        }
        let before = memory.entries().to_vec();
        let far = ScarPosition::cell(GridPos::new(-100, -100));
        prop_assert_eq!(memory.add_or_reinforce(far, weak), MemoryTouch::Ignored);
        prop_assert_eq!(memory.entries(), before.as_slice());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn reset_is_deterministic_for_any_seed(seed in any::<u64>(), steps in 1_u64..30) {
        let config = SimulationConfig {
            seed,
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(config.clone());
        let first = simulation.step_n(steps, 1.0);
        simulation.reset();
        let second = simulation.step_n(steps, 1.0);
        prop_assert_eq!(&first, &second);

        let mut fresh = Simulation::new(config);
        prop_assert_eq!(fresh.step_n(steps, 1.0), first);
    }
}
