use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

fn default_pipeline() -> bool {
    true
}

fn default_coef() -> f32 {
    0.2
}

fn default_rounds() -> usize {
    600
}

/// The specification for damping a worker's contribution during the first rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum WarmupSpec {
    #[default]
    None,
    Linearly {
        #[serde(default = "default_coef")]
        coef: f32,
        #[serde(default = "default_rounds")]
        rounds: usize,
    },
    Staircase {
        #[serde(default = "default_coef")]
        coef: f32,
        #[serde(default = "default_rounds")]
        rounds: usize,
    },
}

/// The specification for a parameter synchronization client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSpec {
    pub workers: NonZeroUsize,
    #[serde(default = "default_pipeline")]
    pub pipeline: bool,
    #[serde(default)]
    pub momentum: f32,
    #[serde(default)]
    pub elastic: f32,
    #[serde(default)]
    pub warmup: WarmupSpec,
    #[serde(default)]
    pub table: u32,
}
