//! Environment resolution for one-shot task launches.

use std::collections::BTreeMap;

/// Overlays `overrides` on `baseline` and drops entries with empty values.
///
/// A key present in `overrides` replaces the baseline value. An empty
/// override removes the variable instead of forwarding a blank value.
#[must_use]
pub fn resolve_environment(
    baseline: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut resolved = baseline.clone();
    resolved.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    resolved.retain(|_, value| !value.is_empty());
    resolved
}
