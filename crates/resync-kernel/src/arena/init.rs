use super::*;

use crate::grid::start_positions;
use crate::rng::{stream_rng, STREAM_ARENA};

impl AgentArena {
    /// Seeded grid, agents on their spawn cells in `PolicyKind::ALL` order.
    pub fn new(config: ArenaConfig, seed: u64) -> Self {
        let config = config.normalized();
        let mut rng = stream_rng(seed, STREAM_ARENA);
        let positions = start_positions(config.width, config.height);
        let grid = GridWorld::generate(&config, &mut rng, &positions);
        Self::assemble(config, seed, rng, grid, positions)
    }

    /// Arena over a caller-supplied grid. The grid is resized to the
    /// configured dimensions if they differ.
    pub fn with_grid(
        config: ArenaConfig,
        seed: u64,
        grid: GridWorld,
        positions: [GridPos; 3],
    ) -> Self {
        let mut config = config.normalized();
        config.width = grid.width();
        config.height = grid.height();
        let rng = stream_rng(seed, STREAM_ARENA);
        Self::assemble(config, seed, rng, grid, positions)
    }

    fn assemble(
        config: ArenaConfig,
        seed: u64,
        rng: StdRng,
        grid: GridWorld,
        positions: [GridPos; 3],
    ) -> Self {
        let agents = build_agents(&config, &positions);
        let scoring_worker_threads = usize::from(config.scoring_worker_threads.max(1));
        let scoring_pool = if scoring_worker_threads > 1 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(scoring_worker_threads)
                .build()
                .ok()
        } else {
            None
        };
        Self {
            rewards: RewardTable::from_config(&config),
            ledger: EnergyLedger::new(config.ledger),
            scars: SpatialMemoryStore::new(config.scars),
            config,
            seed,
            rng,
            initial_grid: grid.clone(),
            initial_positions: positions,
            grid,
            agents,
            tick: 0,
            scoring_worker_threads,
            scoring_pool,
            last_step_metrics: ArenaStepMetrics::default(),
        }
    }

    /// Restore the initial grid, agents and random stream.
    pub fn reset(&mut self) {
        self.rng = stream_rng(self.seed, STREAM_ARENA);
        self.grid = self.initial_grid.clone();
        self.agents = build_agents(&self.config, &self.initial_positions);
        self.ledger.reset();
        self.scars.clear();
        self.tick = 0;
        self.last_step_metrics = ArenaStepMetrics::default();
    }
}

fn build_agents(config: &ArenaConfig, positions: &[GridPos; 3]) -> Vec<ArenaAgent> {
    PolicyKind::ALL
        .iter()
        .zip(positions.iter())
        .map(|(kind, position)| ArenaAgent {
            agent_id: format!("agent:{}", kind.as_str()),
            policy: AgentPolicy::from_config(*kind, config),
            position: *position,
            energy: EnergyLedger::with_capacity(config.agent_capacity),
            last_utility: 0.0,
            held_last_tick: false,
            moves: 0,
            resources_collected: 0,
            hazards_hit: 0,
        })
        .collect()
}
