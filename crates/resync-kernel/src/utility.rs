//! Update-signal computation.
//!
//! Two formulations coexist and are deliberately not unified:
//!
//! - [`WeightedSumUtility`]: `clamp(w·[error, salience, energy, recursion], 0, 1)`
//!   with weights that can be nudged by feedback.
//! - [`SalienceProductUtility`]: `salience(magnitude, variance) × budget(t) ×
//!   scaled_error`, where the budget integrates the signal it produced.
//!
//! Comparing the result against a threshold is the caller's job.

use contracts::{
    finite_or, Driver, SalienceWeights, UtilityConfig, UtilityStrategyKind, UtilityWeights,
};

/// Input of the weighted-sum formulation. `salience` may carry a coherence
/// loss instead; `energy` is expected as a fraction of capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UtilityInput {
    pub prediction_error: f64,
    pub salience: f64,
    pub energy: f64,
    pub recursive_activity: f64,
}

impl UtilityInput {
    fn sanitized(self) -> Self {
        Self {
            prediction_error: finite_or(self.prediction_error, 0.0),
            salience: finite_or(self.salience, 0.0),
            energy: finite_or(self.energy, 0.0),
            recursive_activity: finite_or(self.recursive_activity, 0.0),
        }
    }
}

/// Per-term contributions. For the product form the fields hold the three
/// factors exactly as multiplied (`energy` is the absolute budget) and
/// `recursive_activity` is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UtilityBreakdown {
    pub prediction_error: f64,
    pub salience: f64,
    pub energy: f64,
    pub recursive_activity: f64,
}

impl UtilityBreakdown {
    /// Term with the largest magnitude; ties resolve in declaration order.
    pub fn dominant_driver(&self) -> Driver {
        let terms = [
            (Driver::PredictionError, self.prediction_error),
            (Driver::Salience, self.salience),
            (Driver::Energy, self.energy),
            (Driver::RecursiveActivity, self.recursive_activity),
        ];
        let mut best = terms[0];
        for term in &terms[1..] {
            if term.1.abs() > best.1.abs() {
                best = *term;
            }
        }
        best.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilityOutput {
    pub utility: f64,
    pub delta: f64,
    pub breakdown: UtilityBreakdown,
    pub dominant_driver: Driver,
}

#[derive(Debug, Clone)]
pub struct WeightedSumUtility {
    weights: UtilityWeights,
    previous: f64,
    last_input: UtilityInput,
}

impl WeightedSumUtility {
    pub fn new(weights: UtilityWeights) -> Self {
        Self {
            weights: weights.normalized(),
            previous: 0.0,
            last_input: UtilityInput::default(),
        }
    }

    pub fn weights(&self) -> &UtilityWeights {
        &self.weights
    }

    pub fn previous_utility(&self) -> f64 {
        self.previous
    }

    pub fn compute(&mut self, input: UtilityInput) -> UtilityOutput {
        let input = input.sanitized();
        let breakdown = UtilityBreakdown {
            prediction_error: self.weights.prediction_error * input.prediction_error,
            salience: self.weights.salience * input.salience,
            energy: self.weights.energy * input.energy,
            recursive_activity: self.weights.recursive_activity * input.recursive_activity,
        };
        let raw = breakdown.prediction_error
            + breakdown.salience
            + breakdown.energy
            + breakdown.recursive_activity;
        let utility = finite_or(raw, 0.0).clamp(0.0, 1.0);
        let delta = utility - self.previous;
        self.previous = utility;
        self.last_input = input;
        UtilityOutput {
            utility,
            delta,
            dominant_driver: breakdown.dominant_driver(),
            breakdown,
        }
    }

    /// Nudge each weight toward producing `target` for the last input seen.
    /// Weights never go negative.
    pub fn update_from_feedback(&mut self, target: f64, rate: f64) {
        let error = finite_or(target, self.previous).clamp(0.0, 1.0) - self.previous;
        let step = finite_or(rate, 0.0).max(0.0) * error;
        let input = self.last_input;
        let w = &mut self.weights;
        w.prediction_error = (w.prediction_error + step * input.prediction_error).max(0.0);
        w.salience = (w.salience + step * input.salience).max(0.0);
        w.energy = (w.energy + step * input.energy).max(0.0);
        w.recursive_activity = (w.recursive_activity + step * input.recursive_activity).max(0.0);
    }

    pub fn reset(&mut self, weights: UtilityWeights) {
        *self = Self::new(weights);
    }
}

/// `clamp(baseline + magnitude·m + variance·v, 0, 1)`.
pub fn salience(weights: &SalienceWeights, magnitude: f64, variance: f64) -> f64 {
    let magnitude = finite_or(magnitude, 0.0);
    let variance = finite_or(variance, 0.0);
    (weights.baseline + weights.magnitude * magnitude + weights.variance * variance)
        .clamp(0.0, 1.0)
}

/// The bare product `salience × budget × scaled_error`.
pub fn salience_product(salience: f64, budget: f64, scaled_error: f64) -> f64 {
    finite_or(salience * budget * scaled_error, 0.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProductInput {
    pub magnitude: f64,
    pub variance: f64,
    pub prediction_error: f64,
    /// Energy added to the budget this step.
    pub external_influx: f64,
    pub dt: f64,
}

#[derive(Debug, Clone)]
pub struct SalienceProductUtility {
    salience: SalienceWeights,
    capacity: f64,
    gamma: f64,
    error_scale: f64,
    budget: f64,
    integrated_signal: f64,
    previous: f64,
}

impl SalienceProductUtility {
    pub fn new(config: &UtilityConfig) -> Self {
        let config = config.normalized();
        Self {
            salience: config.salience,
            capacity: config.budget_capacity,
            gamma: config.budget_gamma,
            error_scale: config.error_scale,
            budget: config.budget_capacity,
            integrated_signal: 0.0,
            previous: 0.0,
        }
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn integrated_signal(&self) -> f64 {
        self.integrated_signal
    }

    pub fn previous_utility(&self) -> f64 {
        self.previous
    }

    pub fn compute(&mut self, input: ProductInput) -> UtilityOutput {
        let dt = finite_or(input.dt, 0.0).max(0.0);
        let salience = salience(&self.salience, input.magnitude, input.variance);
        let budget = self.budget;
        let scaled_error =
            (finite_or(input.prediction_error, 0.0).abs() * self.error_scale).clamp(0.0, 1.0);
        let signal = salience_product(salience, budget, scaled_error);

        self.integrated_signal += signal * dt;
        let influx = finite_or(input.external_influx, 0.0).max(0.0);
        self.budget = (self.budget - self.gamma * signal * dt + influx).clamp(0.0, self.capacity);

        let utility = signal.clamp(0.0, 1.0);
        let delta = utility - self.previous;
        self.previous = utility;
        let breakdown = UtilityBreakdown {
            prediction_error: scaled_error,
            salience,
            energy: budget,
            recursive_activity: 0.0,
        };
        UtilityOutput {
            utility,
            delta,
            dominant_driver: breakdown.dominant_driver(),
            breakdown,
        }
    }

    pub fn reset(&mut self) {
        self.budget = self.capacity;
        self.integrated_signal = 0.0;
        self.previous = 0.0;
    }
}

/// Everything either formulation might need for one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalContext {
    pub prediction_error: f64,
    pub magnitude: f64,
    pub variance: f64,
    pub energy_fraction: f64,
    pub recursive_activity: f64,
    pub external_influx: f64,
    pub dt: f64,
}

#[derive(Debug, Clone)]
pub enum UtilityStrategy {
    WeightedSum(WeightedSumUtility),
    SalienceProduct(SalienceProductUtility),
}

/// Strategy selected by configuration plus the salience weights the
/// weighted-sum form needs to turn magnitude and variance into one input.
#[derive(Debug, Clone)]
pub struct UtilityEngine {
    config: UtilityConfig,
    strategy: UtilityStrategy,
}

impl UtilityEngine {
    pub fn new(config: UtilityConfig) -> Self {
        let config = config.normalized();
        Self {
            strategy: Self::build_strategy(&config),
            config,
        }
    }

    fn build_strategy(config: &UtilityConfig) -> UtilityStrategy {
        match config.strategy {
            UtilityStrategyKind::WeightedSum => {
                UtilityStrategy::WeightedSum(WeightedSumUtility::new(config.weights))
            }
            UtilityStrategyKind::SalienceProduct => {
                UtilityStrategy::SalienceProduct(SalienceProductUtility::new(config))
            }
        }
    }

    pub fn kind(&self) -> UtilityStrategyKind {
        match self.strategy {
            UtilityStrategy::WeightedSum(_) => UtilityStrategyKind::WeightedSum,
            UtilityStrategy::SalienceProduct(_) => UtilityStrategyKind::SalienceProduct,
        }
    }

    pub fn strategy(&self) -> &UtilityStrategy {
        &self.strategy
    }

    pub fn evaluate(&mut self, context: &SignalContext) -> UtilityOutput {
        match &mut self.strategy {
            UtilityStrategy::WeightedSum(engine) => engine.compute(UtilityInput {
                prediction_error: context.prediction_error,
                salience: salience(&self.config.salience, context.magnitude, context.variance),
                energy: context.energy_fraction,
                recursive_activity: context.recursive_activity,
            }),
            UtilityStrategy::SalienceProduct(engine) => engine.compute(ProductInput {
                magnitude: context.magnitude,
                variance: context.variance,
                prediction_error: context.prediction_error,
                external_influx: context.external_influx,
                dt: context.dt,
            }),
        }
    }

    /// Feedback only adjusts the weighted-sum form; the product form has no
    /// weights to learn.
    pub fn update_from_feedback(&mut self, target: f64) {
        if let UtilityStrategy::WeightedSum(engine) = &mut self.strategy {
            engine.update_from_feedback(target, self.config.feedback_rate);
        }
    }

    pub fn reset(&mut self) {
        self.strategy = Self::build_strategy(&self.config);
    }
}
