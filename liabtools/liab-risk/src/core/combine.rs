use std::collections::{BTreeMap, BTreeSet};

use config::NOT_AVAILABLE;
use liab_pack::{Cell, Table};

/// merge chain-prefixed columns `"{prefix} {base} {suffix}"` sharing the
/// same `base` across every prefix into `"{base} {suffix}"`, with cells
/// like `"Heavy: v1 | Light: v2"`; merged sources are dropped.
///
/// Returns the names of the created columns.
pub fn combine(table: &mut Table, suffix: &str, prefixes: &[&str]) -> Vec<String> {
    if prefixes.is_empty() {
        return Vec::new();
    }

    let tail = format!(" {}", suffix);
    let mut by_prefix: Vec<BTreeMap<String, String>> = vec![BTreeMap::new(); prefixes.len()];

    for name in table.names() {
        if !name.ends_with(&tail) {
            continue;
        }

        for (idx, prefix) in prefixes.iter().enumerate() {
            let head = format!("{} ", prefix);
            if !name.starts_with(&head) {
                continue;
            }

            if name.len() > head.len() + tail.len() {
                let base = name[head.len()..name.len() - tail.len()].trim();
                if !base.is_empty() {
                    by_prefix[idx].insert(base.to_string(), name.clone());
                }
            }
            break;
        }
    }

    let common = by_prefix[0]
        .keys()
        .filter(|base| by_prefix[1..].iter().all(|other| other.contains_key(*base)))
        .cloned()
        .collect::<BTreeSet<_>>();

    let mut created = Vec::new();
    let mut merged = Vec::new();

    for base in common {
        let target = format!("{} {}", base, suffix);
        if table.has(&target) {
            log::debug!("Column {:?} already exists, not combining", target);
            continue;
        }

        let sources = by_prefix
            .iter()
            .map(|columns| columns[&base].clone())
            .collect::<Vec<_>>();

        let values = (0..table.height())
            .map(|row| {
                let parts = prefixes
                    .iter()
                    .zip(&sources)
                    .map(|(prefix, source)| {
                        format!(
                            "{}: {}",
                            prefix,
                            table.value(row, source).unwrap_or(NOT_AVAILABLE)
                        )
                    })
                    .collect::<Vec<_>>();
                Some(parts.join(" | "))
            })
            .collect::<Vec<Cell>>();

        match table.push_column(&target, values) {
            Ok(()) => {
                created.push(target);
                merged.extend(sources);
            }
            Err(e) => log::error!("Could not combine into {:?}: {}", target, e),
        }
    }

    table.drop_columns(&merged);
    created
}
