//! Decaying spatial memory: a capacity-bounded set of scars that intensify
//! when touched again and fade with elapsed time.

use contracts::{finite_or, DecayCurve, MemoryConfig, ScarPosition, ScarSnapshot};
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ScarMemory {
    pub position: ScarPosition,
    pub intensity: f64,
    pub age: f64,
}

impl ScarMemory {
    pub fn snapshot(&self) -> ScarSnapshot {
        ScarSnapshot {
            position: self.position,
            intensity: self.intensity,
            age: self.age,
        }
    }
}

/// What `add_or_reinforce` did with a touch.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryTouch {
    Reinforced { index: usize },
    Inserted,
    InsertedAfterEviction { evicted: ScarMemory },
    /// Too weak to stand as its own entry and nothing nearby to reinforce.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SpatialMemoryStore {
    config: MemoryConfig,
    scars: Vec<ScarMemory>,
}

impl SpatialMemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        let config = config.normalized();
        Self {
            scars: Vec::with_capacity(config.max_entries),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn entries(&self) -> &[ScarMemory] {
        &self.scars
    }

    pub fn len(&self) -> usize {
        self.scars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scars.is_empty()
    }

    pub fn clear(&mut self) {
        self.scars.clear();
    }

    pub fn add_or_reinforce(&mut self, position: ScarPosition, strength: f64) -> MemoryTouch {
        let strength = finite_or(strength, 0.0).clamp(0.0, self.config.max_intensity);

        if let Some(index) = self.nearest_within_radius(&position) {
            let scar = &mut self.scars[index];
            scar.intensity = (scar.intensity + strength).min(self.config.max_intensity);
            scar.age = 0.0;
            return MemoryTouch::Reinforced { index };
        }
        if strength <= self.config.intensity_floor {
            return MemoryTouch::Ignored;
        }

        let evicted = if self.scars.len() >= self.config.max_entries {
            self.evict_weakest()
        } else {
            None
        };
        self.scars.push(ScarMemory {
            position,
            intensity: strength,
            age: 0.0,
        });
        match evicted {
            Some(evicted) => MemoryTouch::InsertedAfterEviction { evicted },
            None => MemoryTouch::Inserted,
        }
    }

    /// Age every scar by `dt` and purge those at or below the floor. Returns
    /// how many were purged.
    pub fn tick(&mut self, dt: f64) -> usize {
        let dt = finite_or(dt, 0.0).max(0.0);
        let rate = self.config.decay_rate;
        for scar in &mut self.scars {
            scar.intensity = match self.config.decay_curve {
                DecayCurve::Linear => scar.intensity - rate * dt,
                DecayCurve::Exponential => scar.intensity * (-rate * dt).exp(),
            };
            scar.age += dt;
        }
        let before = self.scars.len();
        let floor = self.config.intensity_floor;
        self.scars.retain(|scar| scar.intensity > floor);
        before - self.scars.len()
    }

    pub fn strongest(&self) -> Option<&ScarMemory> {
        self.scars.iter().fold(None, |best, scar| match best {
            Some(current) if current.intensity >= scar.intensity => Some(current),
            _ => Some(scar),
        })
    }

    pub fn mean_intensity(&self) -> f64 {
        if self.scars.is_empty() {
            return 0.0;
        }
        self.scars.iter().map(|scar| scar.intensity).sum::<f64>() / self.scars.len() as f64
    }

    /// Fraction of scars at or above `threshold`; 0 for an empty store.
    pub fn integrity(&self, threshold: f64) -> f64 {
        if self.scars.is_empty() {
            return 0.0;
        }
        let strong = self
            .scars
            .iter()
            .filter(|scar| scar.intensity >= threshold)
            .count();
        strong as f64 / self.scars.len() as f64
    }

    pub fn snapshot(&self) -> Vec<ScarSnapshot> {
        self.scars.iter().map(ScarMemory::snapshot).collect()
    }

    fn nearest_within_radius(&self, position: &ScarPosition) -> Option<usize> {
        let radius = self.config.merge_radius;
        let mut best: Option<(usize, f64)> = None;
        for (index, scar) in self.scars.iter().enumerate() {
            let distance = scar.position.distance(position);
            if distance > radius {
                continue;
            }
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }

    fn evict_weakest(&mut self) -> Option<ScarMemory> {
        let mut weakest: Option<usize> = None;
        for (index, scar) in self.scars.iter().enumerate() {
            if weakest.map_or(true, |w| scar.intensity < self.scars[w].intensity) {
                weakest = Some(index);
            }
        }
        let evicted = self.scars.remove(weakest?);
        debug!(
            intensity = evicted.intensity,
            age = evicted.age,
            "scar memory full; evicted weakest entry"
        );
        Some(evicted)
    }
}

/// Uniformly distributed point on the unit sphere, for callers that place
/// unreinforced touches at random.
pub fn random_sphere_position(rng: &mut impl Rng) -> ScarPosition {
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    ScarPosition::sphere(r * theta.cos(), r * theta.sin(), z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::GridPos;

    fn store(max_entries: usize) -> SpatialMemoryStore {
        SpatialMemoryStore::new(MemoryConfig {
            max_entries,
            merge_radius: 0.5,
            decay_rate: 0.1,
            intensity_floor: 0.01,
            max_intensity: 1.0,
            decay_curve: DecayCurve::Linear,
        })
    }

    fn cell(x: i32, y: i32) -> ScarPosition {
        ScarPosition::cell(GridPos::new(x, y))
    }

    #[test]
    fn touching_the_same_point_twice_merges() {
        let mut memory = store(8);
        assert_eq!(memory.add_or_reinforce(cell(2, 2), 0.4), MemoryTouch::Inserted);
        assert_eq!(
            memory.add_or_reinforce(cell(2, 2), 0.4),
            MemoryTouch::Reinforced { index: 0 }
        );
        assert_eq!(memory.len(), 1);
        assert!((memory.entries()[0].intensity - 0.8).abs() < 1e-12);
    }

    #[test]
    fn reinforcement_is_capped_and_resets_age() {
        let mut memory = store(8);
        memory.add_or_reinforce(cell(0, 0), 0.9);
        memory.tick(2.0);
        assert_eq!(memory.entries()[0].age, 2.0);
        memory.add_or_reinforce(cell(0, 0), 0.9);
        assert_eq!(memory.entries()[0].intensity, 1.0);
        assert_eq!(memory.entries()[0].age, 0.0);
    }

    #[test]
    fn full_store_evicts_lowest_intensity() {
        let mut memory = store(3);
        memory.add_or_reinforce(cell(0, 0), 0.6);
        memory.add_or_reinforce(cell(5, 0), 0.2);
        memory.add_or_reinforce(cell(10, 0), 0.9);
        let touch = memory.add_or_reinforce(cell(15, 0), 0.5);
        match touch {
            MemoryTouch::InsertedAfterEviction { evicted } => {
                assert_eq!(evicted.position, cell(5, 0));
            }
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(memory.len(), 3);
    }

    #[test]
    fn eviction_ties_go_to_the_oldest_insertion() {
        let mut memory = store(2);
        memory.add_or_reinforce(cell(0, 0), 0.3);
        memory.add_or_reinforce(cell(9, 9), 0.3);
        memory.add_or_reinforce(cell(20, 20), 0.3);
        let positions = memory
            .entries()
            .iter()
            .map(|scar| scar.position)
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![cell(9, 9), cell(20, 20)]);
    }

    #[test]
    fn sub_floor_touch_neither_inserts_nor_evicts() {
        let mut memory = store(2);
        memory.add_or_reinforce(cell(0, 0), 0.5);
        memory.add_or_reinforce(cell(5, 5), 0.6);
        assert_eq!(memory.add_or_reinforce(cell(20, 20), 0.0), MemoryTouch::Ignored);
        assert_eq!(memory.add_or_reinforce(cell(30, 30), 0.01), MemoryTouch::Ignored);
        let intensities = memory
            .entries()
            .iter()
            .map(|scar| scar.intensity)
            .collect::<Vec<_>>();
        assert_eq!(intensities, vec![0.5, 0.6]);

        // a weak touch still reinforces an entry it lands on
        assert_eq!(
            memory.add_or_reinforce(cell(0, 0), 0.005),
            MemoryTouch::Reinforced { index: 0 }
        );
        assert_eq!(memory.entries()[0].age, 0.0);
    }

    #[test]
    fn tick_decays_and_purges_below_floor() {
        let mut memory = store(8);
        memory.add_or_reinforce(cell(0, 0), 0.05);
        memory.add_or_reinforce(cell(4, 4), 0.5);
        let purged = memory.tick(1.0);
        assert_eq!(purged, 1);
        assert_eq!(memory.len(), 1);
        assert!((memory.entries()[0].intensity - 0.4).abs() < 1e-12);
    }

    #[test]
    fn exponential_curve_never_goes_negative() {
        let mut memory = SpatialMemoryStore::new(MemoryConfig {
            decay_curve: DecayCurve::Exponential,
            decay_rate: 1.0,
            intensity_floor: 0.0,
            ..MemoryConfig::default()
        });
        memory.add_or_reinforce(ScarPosition::sphere(0.0, 0.0, 1.0), 1.0);
        memory.tick(1.0);
        let intensity = memory.entries()[0].intensity;
        assert!((intensity - (-1.0_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn strongest_prefers_first_on_ties() {
        let mut memory = store(8);
        assert!(memory.strongest().is_none());
        memory.add_or_reinforce(cell(0, 0), 0.7);
        memory.add_or_reinforce(cell(5, 5), 0.7);
        memory.add_or_reinforce(cell(9, 9), 0.2);
        assert_eq!(memory.strongest().map(|scar| scar.position), Some(cell(0, 0)));
    }

    #[test]
    fn integrity_is_zero_when_empty() {
        let mut memory = store(8);
        assert_eq!(memory.integrity(0.5), 0.0);
        memory.add_or_reinforce(cell(0, 0), 0.8);
        memory.add_or_reinforce(cell(5, 5), 0.2);
        assert_eq!(memory.integrity(0.5), 0.5);
        assert!((memory.mean_intensity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn random_sphere_positions_are_on_the_sphere() {
        let mut rng = crate::rng::stream_rng(5, crate::rng::STREAM_RECALIBRATION);
        for _ in 0..64 {
            let ScarPosition::Sphere { x, y, z } = random_sphere_position(&mut rng) else {
                panic!("expected sphere position");
            };
            assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-9);
        }
    }
}
