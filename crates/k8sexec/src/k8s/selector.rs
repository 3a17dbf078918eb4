use std::collections::BTreeMap;

/// Converts match labels to a Kubernetes label selector string.
///
/// Pairs are emitted in key order, e.g. `app=web,tier=frontend`. An empty map
/// yields an empty string, which the API treats as "select everything".
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}
