use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, Result};
use config::{write_json, CHAIN_PREFIXES, LIABILITIES_SUFFIX, NO_FINDINGS, SEQUENCE_SUFFIX, UNKNOWN};
use liab_pack::{ColumnKey, LabelMap, Region};
use serde_json::{Map, Value};

/// read a label map from a JSON file, or parse `source` as inline JSON;
/// non-string values are stringified
pub fn load_label_map(source: &str) -> Result<LabelMap> {
    let path = Path::new(source);
    let contents = if path.is_file() {
        log::info!("Reading label map from {}", path.display());
        std::fs::read_to_string(path)?
    } else {
        source.to_string()
    };

    match serde_json::from_str::<Value>(&contents)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect()),
        other => Err(anyhow!(
            "label map must be a JSON object, found {}",
            kind_of(&other)
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// a label map as a JSON object, keys sorted
pub fn label_map_to_json(labels: &LabelMap) -> Value {
    Value::Object(
        labels
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect::<Map<String, Value>>(),
    )
}

pub fn write_label_map(labels: &LabelMap, path: Option<&Path>) -> Result<()> {
    write_json(&label_map_to_json(labels), path, "Label map")?;
    Ok(())
}

/// regions of the analyzed columns, canonical order
pub fn found_regions<S: AsRef<str>>(columns: &[S]) -> Vec<Region> {
    columns
        .iter()
        .filter_map(|column| ColumnKey::parse(column.as_ref()))
        .map(|key| key.region)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn write_found_regions(regions: &[Region], path: &Path) -> Result<()> {
    let value = Value::Array(
        regions
            .iter()
            .map(|region| Value::String(region.to_string()))
            .collect(),
    );
    write_json(&value, Some(path), "Found regions")?;
    Ok(())
}

/// one-line digest of a row's liability columns, e.g.
/// `Heavy chain: CDR1: X, CDR3: Y | Light chain: FR1: Z`
pub fn summarize(entries: &[(&str, Option<&str>)]) -> String {
    let paired = entries.iter().any(|(name, _)| {
        CHAIN_PREFIXES
            .iter()
            .any(|chain| name.starts_with(&format!("{} ", chain)))
    });

    let sequence_tail = format!(" {} {}", SEQUENCE_SUFFIX, LIABILITIES_SUFFIX);
    let tail = format!(" {}", LIABILITIES_SUFFIX);

    let mut groups: [Vec<(usize, String, String)>; 3] = Default::default();

    for (name, value) in entries {
        let value = match value.map(str::trim) {
            Some(v) if !v.is_empty() && v != NO_FINDINGS && v != UNKNOWN => v,
            _ => continue,
        };

        let (group, rest) = CHAIN_PREFIXES
            .iter()
            .enumerate()
            .find_map(|(idx, chain)| {
                name.strip_prefix(&format!("{} ", chain))
                    .map(|rest| (idx, rest))
            })
            .filter(|_| paired)
            .unwrap_or((CHAIN_PREFIXES.len(), *name));

        let base = rest
            .strip_suffix(&sequence_tail)
            .or_else(|| rest.strip_suffix(&tail))
            .unwrap_or(rest);
        let rank = base
            .parse::<Region>()
            .map_or(usize::MAX, |region| region as usize);

        groups[group].push((rank, base.to_string(), format!("{}: {}", base, value)));
    }

    for group in groups.iter_mut() {
        group.sort();
    }

    let [heavy, light, other] = &groups;
    let mut parts = Vec::new();

    if paired {
        if !heavy.is_empty() {
            parts.push(format!("Heavy chain: {}", join(heavy)));
        }
        if !light.is_empty() {
            parts.push(format!("Light chain: {}", join(light)));
        }
        if !other.is_empty() {
            if parts.is_empty() {
                parts.push(join(other));
            } else {
                parts.push(format!("Other: {}", join(other)));
            }
        }
    } else if !other.is_empty() {
        parts.push(join(other));
    }

    if parts.is_empty() {
        NO_FINDINGS.to_string()
    } else {
        parts.join(" | ")
    }
}

fn join(group: &[(usize, String, String)]) -> String {
    group
        .iter()
        .map(|(_, _, part)| part.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_label_map_inline() {
        let labels = load_label_map(r#"{"1": "CDR1", "2": 3, "x": null}"#).unwrap();

        assert_eq!(labels.get("1").map(String::as_str), Some("CDR1"));
        assert_eq!(labels.get("2").map(String::as_str), Some("3"));
        assert_eq!(labels.get("x").map(String::as_str), Some("null"));
    }

    #[test]
    fn test_load_label_map_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"{"3": "CDR3"}"#).unwrap();

        let labels = load_label_map(path.to_str().unwrap()).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels["3"], "CDR3");
    }

    #[test]
    fn test_load_label_map_rejects_non_objects() {
        assert!(load_label_map("[1, 2]").is_err());
        assert!(load_label_map("{not json").is_err());
    }

    #[test]
    fn test_found_regions_are_canonical() {
        let regions = found_regions(&["Heavy CDR3 aa", "FR1 aa", "Light CDR3 aa", "FR2 aa", "CDR1 aa"]);
        assert_eq!(
            regions,
            vec![Region::Fr1, Region::Cdr1, Region::Cdr3, Region::Fr2]
        );
    }

    #[test]
    fn test_summarize_paired_chains() {
        let summary = summarize(&[
            ("Heavy CDR3 aa liabilities", Some("Methionine Oxidation (M)")),
            ("Heavy FR1 aa liabilities", Some("Missing Cysteines")),
            ("Light CDR1 aa liabilities", Some("None")),
            ("Light CDR2 aa liabilities", Some("Fragmentation (DP)")),
            ("Light CDR3 aa liabilities", None),
        ]);

        assert_eq!(
            summary,
            "Heavy chain: FR1: Missing Cysteines, CDR3: Methionine Oxidation (M) | Light chain: CDR2: Fragmentation (DP)"
        );
    }

    #[test]
    fn test_summarize_single_chain_and_empty() {
        let summary = summarize(&[
            ("CDR2 aa liabilities", Some("Hydrolysis (NP)")),
            ("CDR1 aa liabilities", Some("Deamidation (N[GS]), Fragmentation (DP)")),
            ("FR1 aa liabilities", Some("Unknown")),
        ]);
        assert_eq!(
            summary,
            "CDR1: Deamidation (N[GS]), Fragmentation (DP), CDR2: Hydrolysis (NP)"
        );

        assert_eq!(summarize(&[("CDR1 aa liabilities", Some("None"))]), "None");
        assert_eq!(summarize(&[]), "None");
    }

    #[test]
    fn test_summarize_mixed_prefixes() {
        let summary = summarize(&[
            ("Heavy CDR1 aa liabilities", Some("Out of frame")),
            ("CDR2 aa liabilities", Some("Fragmentation (TS)")),
        ]);
        assert_eq!(
            summary,
            "Heavy chain: CDR1: Out of frame | Other: CDR2: Fragmentation (TS)"
        );
    }
}
