use crate::ports::TargetSource;
use anyhow::Context;
use linkstep_types::BuildTarget;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Strip the extension suffix: everything from the first `.` onward.
///
/// A name without a `.` is already canonical.
pub fn canonical_name(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    }
}

/// Canonicalize, sort ascending, and number the names.
///
/// No deduplication: two sources that strip to the same name become two targets
/// with distinct ordinals (see [`duplicate_names`]).
pub fn enumerate_targets<I, S>(names: I) -> Vec<BuildTarget>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut canonical: Vec<String> = names
        .into_iter()
        .map(|n| canonical_name(n.as_ref()).to_string())
        .collect();
    canonical.sort();

    canonical
        .into_iter()
        .enumerate()
        .map(|(i, name)| BuildTarget::new(name, i as u64))
        .collect()
}

/// Canonical names that occur more than once, sorted.
pub fn duplicate_names(targets: &[BuildTarget]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in targets {
        *counts.entry(t.name.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Enumerate targets from a source, warning about duplicate canonical names.
pub fn load_targets(source: &dyn TargetSource) -> anyhow::Result<Vec<BuildTarget>> {
    let names = source.list_names().context("list build targets")?;
    debug!(count = names.len(), "listed target sources");

    let targets = enumerate_targets(&names);
    for dup in duplicate_names(&targets) {
        warn!(name = dup.as_str(), "several sources share this target name");
    }
    Ok(targets)
}
