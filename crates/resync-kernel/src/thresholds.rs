//! Readiness assessment over coherence metrics: is the whole system
//! synchronized, self-consistent and stable enough in every domain?

use std::collections::BTreeMap;
use std::fmt;

use contracts::finite_or;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoherenceMetrics {
    /// Mean distance between what is believed and what is true; lower is better.
    pub global_coherence_gap: f64,
    pub recursive_modeling_score: f64,
    pub memory_integrity_score: f64,
    pub domain_stabilization: BTreeMap<String, f64>,
}

impl Default for CoherenceMetrics {
    fn default() -> Self {
        Self {
            global_coherence_gap: 1.0,
            recursive_modeling_score: 0.0,
            memory_integrity_score: 0.0,
            domain_stabilization: BTreeMap::new(),
        }
    }
}

/// Partial update; `None` leaves a field alone and domains merge by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsUpdate {
    pub global_coherence_gap: Option<f64>,
    pub recursive_modeling_score: Option<f64>,
    pub memory_integrity_score: Option<f64>,
    pub domain_stabilization: BTreeMap<String, f64>,
}

impl CoherenceMetrics {
    pub fn update_metrics(&mut self, update: MetricsUpdate) {
        if let Some(gap) = update.global_coherence_gap {
            self.global_coherence_gap = finite_or(gap, self.global_coherence_gap).max(0.0);
        }
        if let Some(score) = update.recursive_modeling_score {
            self.recursive_modeling_score =
                finite_or(score, self.recursive_modeling_score).clamp(0.0, 1.0);
        }
        if let Some(score) = update.memory_integrity_score {
            self.memory_integrity_score =
                finite_or(score, self.memory_integrity_score).clamp(0.0, 1.0);
        }
        for (domain, value) in update.domain_stabilization {
            let value = finite_or(value, 0.0).clamp(0.0, 1.0);
            self.domain_stabilization.insert(domain, value);
        }
    }

    pub fn domain(&self, name: &str) -> f64 {
        self.domain_stabilization.get(name).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdProfile {
    pub max_coherence_gap: f64,
    pub min_recursive_modeling: f64,
    pub min_memory_integrity: f64,
    pub min_domain_stabilization: f64,
    pub required_domains: Vec<String>,
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self {
            max_coherence_gap: 0.1,
            min_recursive_modeling: 0.8,
            min_memory_integrity: 0.85,
            min_domain_stabilization: 0.7,
            required_domains: ["recalibration", "arena", "network"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdFailure {
    CoherenceGap { gap: f64, max: f64 },
    RecursiveModeling { score: f64, min: f64 },
    MemoryIntegrity { score: f64, min: f64 },
    DomainUnstable { domain: String, value: f64, min: f64 },
}

impl fmt::Display for ThresholdFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoherenceGap { gap, max } => {
                write!(f, "coherence gap {gap:.3} exceeds {max:.3}")
            }
            Self::RecursiveModeling { score, min } => {
                write!(f, "recursive modeling {score:.3} below {min:.3}")
            }
            Self::MemoryIntegrity { score, min } => {
                write!(f, "memory integrity {score:.3} below {min:.3}")
            }
            Self::DomainUnstable { domain, value, min } => {
                write!(f, "domain {domain} stabilization {value:.3} below {min:.3}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdAssessment {
    pub passed: bool,
    pub failures: Vec<ThresholdFailure>,
}

/// Every failed criterion, in check order: gap, recursive modeling, memory
/// integrity, then domains as listed in the profile.
pub fn assess(metrics: &CoherenceMetrics, profile: &ThresholdProfile) -> ThresholdAssessment {
    let mut failures = Vec::new();
    if metrics.global_coherence_gap > profile.max_coherence_gap {
        failures.push(ThresholdFailure::CoherenceGap {
            gap: metrics.global_coherence_gap,
            max: profile.max_coherence_gap,
        });
    }
    if metrics.recursive_modeling_score < profile.min_recursive_modeling {
        failures.push(ThresholdFailure::RecursiveModeling {
            score: metrics.recursive_modeling_score,
            min: profile.min_recursive_modeling,
        });
    }
    if metrics.memory_integrity_score < profile.min_memory_integrity {
        failures.push(ThresholdFailure::MemoryIntegrity {
            score: metrics.memory_integrity_score,
            min: profile.min_memory_integrity,
        });
    }
    for domain in &profile.required_domains {
        let value = metrics.domain(domain);
        if value < profile.min_domain_stabilization {
            failures.push(ThresholdFailure::DomainUnstable {
                domain: domain.clone(),
                value,
                min: profile.min_domain_stabilization,
            });
        }
    }
    ThresholdAssessment {
        passed: failures.is_empty(),
        failures,
    }
}

pub fn is_integrated(metrics: &CoherenceMetrics, profile: &ThresholdProfile) -> bool {
    assess(metrics, profile).passed
}
