//! Environment configuration for the Pickomino binaries.
//!
//! Consolidates `PICKOMINO_RULES` and `RAYON_NUM_THREADS` reads.

use std::path::PathBuf;

use log::info;

use crate::error::ConfigError;
use crate::rules::RuleSet;

/// Read `RAYON_NUM_THREADS` (fallback `OMP_NUM_THREADS`, default 8).
pub fn rayon_threads() -> usize {
    std::env::var("RAYON_NUM_THREADS")
        .or_else(|_| std::env::var("OMP_NUM_THREADS"))
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(8)
}

/// Build the rayon global pool with [`rayon_threads`] workers.
/// Tolerates an already-initialized pool. Returns thread count.
pub fn init_rayon_threads_lenient() -> usize {
    let num_threads = rayon_threads();
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .ok(); // May fail if already initialized
    info!("rayon threads: {}", num_threads);
    num_threads
}

/// Read `PICKOMINO_RULES`: path to a JSON rule set.
pub fn rules_path() -> Option<PathBuf> {
    std::env::var_os("PICKOMINO_RULES")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Rule set from `PICKOMINO_RULES`, or the standard game when unset.
pub fn load_rules() -> Result<RuleSet, ConfigError> {
    match rules_path() {
        Some(path) => {
            info!("loading rules from {}", path.display());
            RuleSet::from_json_file(path)
        }
        None => Ok(RuleSet::default()),
    }
}
