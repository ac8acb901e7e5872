//! Destination conflict resolution.

use crate::models::ConflictPolicy;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAction {
    UseAsIs(PathBuf),
    UseAlternate(PathBuf),
    Skip,
}

/// Decide the final destination for a candidate path under the configured
/// policy, probing the real filesystem.
pub fn resolve(destination: &Path, policy: ConflictPolicy) -> ResolvedAction {
    resolve_with(destination, policy, |p| p.exists())
}

/// Same decision procedure over an injected occupancy probe. The batch
/// processor supplies a probe that also counts destinations claimed earlier
/// in a dry run, so preview and commit agree on suffix numbering for
/// duplicate candidates.
pub fn resolve_with(
    destination: &Path,
    policy: ConflictPolicy,
    occupied: impl Fn(&Path) -> bool,
) -> ResolvedAction {
    if !occupied(destination) {
        return ResolvedAction::UseAsIs(destination.to_path_buf());
    }
    match policy {
        ConflictPolicy::Overwrite => ResolvedAction::UseAsIs(destination.to_path_buf()),
        ConflictPolicy::Skip => ResolvedAction::Skip,
        ConflictPolicy::Suffix => {
            let stem = destination
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("");
            let ext = destination.extension().and_then(|s| s.to_str());
            let parent = destination
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let mut counter = 1u32;
            loop {
                let name = match ext {
                    Some(e) => format!("{}_{}.{}", stem, counter, e),
                    None => format!("{}_{}", stem, counter),
                };
                let candidate = parent.join(name);
                // Re-probe every step; availability is not monotonic.
                if !occupied(&candidate) {
                    return ResolvedAction::UseAlternate(candidate);
                }
                counter += 1;
            }
        }
    }
}
