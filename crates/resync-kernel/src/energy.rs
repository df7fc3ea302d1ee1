//! Bounded energy ledger: drains on every correction, regenerates over time,
//! and is topped up by rewards. No operation can push the level outside
//! `[0, capacity]`.

use contracts::{finite_or, EnergyConfig, LedgerSnapshot};

/// Below this fraction of capacity the ledger reports itself as low.
pub const LOW_ENERGY_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyLedger {
    config: EnergyConfig,
    level: f64,
    accumulated_cost: f64,
}

impl EnergyLedger {
    pub fn new(config: EnergyConfig) -> Self {
        let config = config.normalized();
        Self {
            level: config.capacity,
            config,
            accumulated_cost: 0.0,
        }
    }

    pub fn with_capacity(capacity: f64) -> Self {
        Self::new(EnergyConfig::with_capacity(capacity))
    }

    pub fn with_level(config: EnergyConfig, level: f64) -> Self {
        let mut ledger = Self::new(config);
        ledger.set(level);
        ledger
    }

    pub fn capacity(&self) -> f64 {
        self.config.capacity
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn accumulated_cost(&self) -> f64 {
        self.accumulated_cost
    }

    pub fn fraction(&self) -> f64 {
        self.level / self.config.capacity
    }

    /// Drain `cost`, returning the amount actually taken. The requested cost
    /// is always booked, even when the ledger cannot cover it.
    pub fn consume(&mut self, cost: f64) -> f64 {
        let cost = finite_or(cost, 0.0).max(0.0);
        let drained = cost.min(self.level);
        self.level -= drained;
        self.accumulated_cost += cost;
        drained
    }

    pub fn decay(&mut self, rate: f64) {
        let rate = finite_or(rate, 0.0).max(0.0);
        self.level = (self.level - rate).max(0.0);
    }

    pub fn passive_decay(&mut self) {
        self.decay(self.config.decay_rate);
    }

    /// Add `(base + weight·clamp(fit, 0, 1))·multiplier`; returns the credit
    /// that fit under capacity.
    pub fn reward(&mut self, contextual_fit: f64, multiplier: f64) -> f64 {
        let fit = finite_or(contextual_fit, 0.0).clamp(0.0, 1.0);
        let multiplier = finite_or(multiplier, 0.0).max(0.0);
        let amount = (self.config.reward_base + self.config.reward_weight * fit) * multiplier;
        self.replenish(amount)
    }

    pub fn replenish(&mut self, amount: f64) -> f64 {
        let amount = finite_or(amount, 0.0).max(0.0);
        let before = self.level;
        self.level = (self.level + amount).min(self.config.capacity);
        self.level - before
    }

    pub fn set(&mut self, value: f64) {
        self.level = finite_or(value, self.level).clamp(0.0, self.config.capacity);
    }

    pub fn is_low(&self) -> bool {
        self.level < LOW_ENERGY_FRACTION * self.config.capacity
    }

    pub fn is_depleted(&self) -> bool {
        self.level <= 0.0
    }

    pub fn reset(&mut self) {
        self.level = self.config.capacity;
        self.accumulated_cost = 0.0;
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            capacity: self.config.capacity,
            level: self.level,
            accumulated_cost: self.accumulated_cost,
            low: self.is_low(),
            depleted: self.is_depleted(),
        }
    }
}
