//! The three arena policies behind one closed enum. Each one scores the
//! candidate cells read-only (`choose_move`) and learns from the committed
//! outcome afterwards (`on_outcome`), so scoring can run in parallel while
//! learning stays serial.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{ArenaConfig, CellState, GridPos, PolicyKind, SalienceWeights};

use crate::utility::{salience, salience_product};

/// Span of coherence-gated scores, `[-1.5, 3]`.
const SCORE_SPAN: f64 = 4.5;
const SCORE_FLOOR: f64 = -1.5;
const EXPECTATION_RATE: f64 = 0.5;
const EXPECTATION_RELAX_PER_HOLD: f64 = 0.25;
const GATE_SALIENCE: SalienceWeights = SalienceWeights {
    baseline: 0.2,
    magnitude: 0.5,
    variance: 0.3,
};

/// Reward an agent observes for ending a tick on a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardTable {
    pub resource_gain: f64,
    pub hazard_penalty: f64,
    pub empty_recovery: f64,
}

impl RewardTable {
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self {
            resource_gain: config.resource_gain,
            hazard_penalty: config.hazard_penalty,
            empty_recovery: config.empty_recovery,
        }
    }

    pub fn observed(&self, cell: CellState) -> f64 {
        match cell {
            CellState::Resource => self.resource_gain,
            CellState::Hazard => -self.hazard_penalty,
            CellState::Empty => self.empty_recovery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub pos: GridPos,
    pub cell: CellState,
}

/// What an agent sees before choosing: its neighbourhood in enumeration
/// order and its own energy fraction.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub position: GridPos,
    pub candidates: &'a [Candidate],
    pub energy_fraction: f64,
}

/// Random draws for one decision, taken serially before scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationDraw {
    /// Uniform in `[0, 1)`; explores when below epsilon.
    pub roll: f64,
    /// Uniform in `[0, 1)`; picks the random candidate.
    pub pick: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveDecision {
    /// Equal to the current position when holding.
    pub target: GridPos,
    pub hold: bool,
    pub score: f64,
    /// Gating signal for the coherence-gated policy, `score` otherwise.
    pub utility: f64,
    pub explored: bool,
}

impl MoveDecision {
    fn hold_at(position: GridPos) -> Self {
        Self {
            target: position,
            hold: true,
            score: 0.0,
            utility: 0.0,
            explored: false,
        }
    }
}

/// Index of the highest score; the earliest wins ties.
fn first_max(scores: impl Iterator<Item = f64>) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, score) in scores.enumerate() {
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoherenceGatedPolicy {
    gate_threshold: f64,
    visited: BTreeSet<GridPos>,
    expected_score: f64,
}

impl CoherenceGatedPolicy {
    pub fn new(gate_threshold: f64) -> Self {
        Self {
            gate_threshold,
            visited: BTreeSet::new(),
            expected_score: 0.0,
        }
    }

    pub fn visited(&self) -> &BTreeSet<GridPos> {
        &self.visited
    }

    pub fn expected_score(&self) -> f64 {
        self.expected_score
    }

    fn novelty(&self, pos: GridPos) -> f64 {
        if self.visited.contains(&pos) {
            -0.5
        } else {
            1.0
        }
    }

    fn resource_bonus(cell: CellState) -> f64 {
        match cell {
            CellState::Resource => 2.0,
            CellState::Hazard => -1.0,
            CellState::Empty => 0.0,
        }
    }

    pub fn score(&self, candidate: &Candidate) -> f64 {
        self.novelty(candidate.pos) + Self::resource_bonus(candidate.cell)
    }

    /// Update signal for executing `candidate` given the current expectation.
    pub fn gate_signal(&self, candidate: &Candidate, energy_fraction: f64) -> f64 {
        let score = self.score(candidate);
        let scaled_error = ((score - self.expected_score).abs() / SCORE_SPAN).clamp(0.0, 1.0);
        let unvisited = if self.visited.contains(&candidate.pos) {
            0.0
        } else {
            1.0
        };
        let magnitude = Self::resource_bonus(candidate.cell).abs() / 2.0;
        let salience = salience(&GATE_SALIENCE, magnitude, unvisited);
        salience_product(salience, energy_fraction.clamp(0.0, 1.0), scaled_error)
    }

    fn choose_move(&self, observation: &Observation<'_>) -> MoveDecision {
        let Some((index, score)) =
            first_max(observation.candidates.iter().map(|candidate| self.score(candidate)))
        else {
            return MoveDecision::hold_at(observation.position);
        };
        let candidate = &observation.candidates[index];
        let signal = self.gate_signal(candidate, observation.energy_fraction);
        let hold = signal < self.gate_threshold;
        MoveDecision {
            target: if hold { observation.position } else { candidate.pos },
            hold,
            score,
            utility: signal,
            explored: false,
        }
    }

    fn on_outcome(&mut self, decision: &MoveDecision) {
        if decision.hold {
            self.expected_score =
                (self.expected_score - EXPECTATION_RELAX_PER_HOLD).max(SCORE_FLOOR);
        } else {
            self.expected_score += EXPECTATION_RATE * (decision.score - self.expected_score);
            self.visited.insert(decision.target);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueLearningPolicy {
    learning_rate: f64,
    discount: f64,
    rewards: RewardTable,
    values: BTreeMap<GridPos, f64>,
}

impl ValueLearningPolicy {
    pub fn new(learning_rate: f64, discount: f64, rewards: RewardTable) -> Self {
        Self {
            learning_rate,
            discount,
            rewards,
            values: BTreeMap::new(),
        }
    }

    pub fn value(&self, pos: GridPos) -> f64 {
        self.values.get(&pos).copied().unwrap_or(0.0)
    }

    fn choose_move(&self, observation: &Observation<'_>) -> MoveDecision {
        let score_of = |candidate: &Candidate| {
            self.rewards.observed(candidate.cell) + self.discount * self.value(candidate.pos)
        };
        match first_max(observation.candidates.iter().map(score_of)) {
            Some((index, score)) => MoveDecision {
                target: observation.candidates[index].pos,
                hold: false,
                score,
                utility: score,
                explored: false,
            },
            None => MoveDecision::hold_at(observation.position),
        }
    }

    fn on_outcome(&mut self, decision: &MoveDecision, reward: f64) {
        if decision.hold {
            return;
        }
        let value = self.values.entry(decision.target).or_insert(0.0);
        *value += self.learning_rate * (reward - *value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpsilonGreedyPolicy {
    epsilon: f64,
    learning_rate: f64,
    q_values: BTreeMap<GridPos, f64>,
}

impl EpsilonGreedyPolicy {
    pub fn new(epsilon: f64, learning_rate: f64) -> Self {
        Self {
            epsilon,
            learning_rate,
            q_values: BTreeMap::new(),
        }
    }

    pub fn q_value(&self, pos: GridPos) -> f64 {
        self.q_values.get(&pos).copied().unwrap_or(0.0)
    }

    fn choose_move(
        &self,
        observation: &Observation<'_>,
        draw: Option<ExplorationDraw>,
    ) -> MoveDecision {
        let candidates = observation.candidates;
        if candidates.is_empty() {
            return MoveDecision::hold_at(observation.position);
        }
        if let Some(draw) = draw.filter(|draw| draw.roll < self.epsilon) {
            let index = ((draw.pick * candidates.len() as f64) as usize).min(candidates.len() - 1);
            let score = self.q_value(candidates[index].pos);
            return MoveDecision {
                target: candidates[index].pos,
                hold: false,
                score,
                utility: score,
                explored: true,
            };
        }
        match first_max(candidates.iter().map(|candidate| self.q_value(candidate.pos))) {
            Some((index, score)) => MoveDecision {
                target: candidates[index].pos,
                hold: false,
                score,
                utility: score,
                explored: false,
            },
            None => MoveDecision::hold_at(observation.position),
        }
    }

    fn on_outcome(&mut self, decision: &MoveDecision, reward: f64) {
        if decision.hold {
            return;
        }
        let q = self.q_values.entry(decision.target).or_insert(0.0);
        *q += self.learning_rate * (reward - *q);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentPolicy {
    CoherenceGated(CoherenceGatedPolicy),
    ValueLearning(ValueLearningPolicy),
    EpsilonGreedy(EpsilonGreedyPolicy),
}

impl AgentPolicy {
    pub fn from_config(kind: PolicyKind, config: &ArenaConfig) -> Self {
        match kind {
            PolicyKind::CoherenceGated => {
                Self::CoherenceGated(CoherenceGatedPolicy::new(config.gate_threshold))
            }
            PolicyKind::ValueLearning => Self::ValueLearning(ValueLearningPolicy::new(
                config.value_learning_rate,
                config.discount,
                RewardTable::from_config(config),
            )),
            PolicyKind::EpsilonGreedy => {
                Self::EpsilonGreedy(EpsilonGreedyPolicy::new(config.epsilon, config.q_learning_rate))
            }
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::CoherenceGated(_) => PolicyKind::CoherenceGated,
            Self::ValueLearning(_) => PolicyKind::ValueLearning,
            Self::EpsilonGreedy(_) => PolicyKind::EpsilonGreedy,
        }
    }

    pub fn needs_exploration_draw(&self) -> bool {
        matches!(self, Self::EpsilonGreedy(_))
    }

    pub fn choose_move(
        &self,
        observation: &Observation<'_>,
        draw: Option<ExplorationDraw>,
    ) -> MoveDecision {
        match self {
            Self::CoherenceGated(policy) => policy.choose_move(observation),
            Self::ValueLearning(policy) => policy.choose_move(observation),
            Self::EpsilonGreedy(policy) => policy.choose_move(observation, draw),
        }
    }

    pub fn on_outcome(&mut self, decision: &MoveDecision, reward: f64) {
        match self {
            Self::CoherenceGated(policy) => policy.on_outcome(decision),
            Self::ValueLearning(policy) => policy.on_outcome(decision, reward),
            Self::EpsilonGreedy(policy) => policy.on_outcome(decision, reward),
        }
    }
}
