use anyhow::{Result, bail};
use std::collections::HashSet;

use crate::config::RotationConfig;

/// Validate a rotation configuration.
/// Returns Ok(()) if valid, or Err naming the first offending entry.
pub fn validate_config(config: &RotationConfig) -> Result<()> {
    if config.targets.is_empty() {
        bail!("targets cannot be empty: rotation needs at least one key/directory pair");
    }

    for (i, target) in config.targets.iter().enumerate() {
        if target.key.trim().is_empty() {
            bail!("targets[{i}].key cannot be empty");
        }
        if target.directory.trim().is_empty() {
            bail!(
                "targets[{i}].directory cannot be empty (key '{}')",
                target.key
            );
        }
    }

    warn_duplicate_targets(config);
    Ok(())
}

/// Same key with different directories is normal; an identical pair just
/// means that target is polled twice per cycle.
fn warn_duplicate_targets(config: &RotationConfig) {
    let mut seen = HashSet::new();
    for target in &config.targets {
        if !seen.insert((target.key.as_str(), target.directory.as_str())) {
            tracing::warn!(
                key = %target.key,
                directory = %target.directory,
                "Duplicate rotation target; it will be visited more than once per cycle"
            );
        }
    }
}
