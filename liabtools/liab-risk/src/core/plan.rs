//! Region source selection and output column planning.
//!
//! A table reaches the liability engine through one of three paths,
//! checked in this order: region sequence columns already present for
//! every annotated chain, region extraction driven by annotation strings,
//! or plain region sequence columns with no annotations at all.

use std::collections::BTreeSet;

use config::{
    ANNOTATION_SUFFIX, CHAIN_PREFIXES, IDENTIFIER, LIABILITIES_SUFFIX, LIABILITIES_SUMMARY,
    OVERALL_RISK, RISK_SUFFIX, SEQUENCE_SUFFIX,
};
use liab_pack::{ColumnKey, ColumnKind, Region, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionPath {
    /// every annotated chain already carries its expected region columns
    PreExisting(Vec<String>),
    /// annotation columns to decode into region columns
    AnnotationDriven(Vec<String>),
    /// no annotations, region sequence columns (possibly none) used as-is
    DirectColumns(Vec<String>),
}

/// columns whose name ends with `annotations`, in table order
pub fn annotation_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| name.to_ascii_lowercase().ends_with(ANNOTATION_SUFFIX))
        .cloned()
        .collect()
}

/// chain prefix of an annotation column: `"Heavy annotations"` -> `"Heavy"`,
/// `"annotations"` -> `""`
pub fn annotation_prefix(column: &str) -> String {
    let stem = match column.len().checked_sub(ANNOTATION_SUFFIX.len()) {
        Some(cut) if column.is_char_boundary(cut) => &column[..cut],
        _ => "",
    };
    stem.trim().trim_end_matches('_').to_string()
}

/// region sequence columns (`[<chain> ]<REGION> aa`), sorted
pub fn region_columns(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| {
            ColumnKey::parse(name).is_some_and(|key| key.kind == ColumnKind::Sequence)
        })
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn select_path(columns: &[String]) -> ExtractionPath {
    let annotations = annotation_columns(columns);

    if annotations.is_empty() {
        return ExtractionPath::DirectColumns(region_columns(columns));
    }

    let prefixes = annotations
        .iter()
        .map(|column| annotation_prefix(column))
        .collect::<BTreeSet<_>>();

    let mut expected = BTreeSet::new();
    for prefix in &prefixes {
        let chain = (!prefix.is_empty()).then_some(prefix.as_str());

        for region in Region::EXPECTED {
            let name = ColumnKey::new(chain, region, ColumnKind::Sequence).name();
            if !columns.iter().any(|column| column == &name) {
                log::info!(
                    "Column {:?} not found for prefix {:?}, extracting regions from annotations",
                    name,
                    prefix
                );
                return ExtractionPath::AnnotationDriven(annotations);
            }
            expected.insert(name);
        }
    }

    ExtractionPath::PreExisting(expected.into_iter().collect())
}

pub struct PlanContext<'a> {
    pub annotation_columns: &'a [String],
    pub liabilities_computed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPlan {
    /// final output columns, in order
    pub columns: Vec<String>,
    /// planned columns absent from the table, to be added empty
    pub placeholders: Vec<String>,
}

/// output columns forced when there is nothing to report
fn bulk_columns(annotations: &[String]) -> Vec<String> {
    let per_region = |kind: ColumnKind| {
        let mut names = Region::EXPECTED
            .iter()
            .map(|region| ColumnKey::new(None, *region, kind).name())
            .collect::<Vec<_>>();
        names.sort();
        names
    };

    let mut columns = Vec::new();
    columns.extend(annotations.iter().cloned());
    columns.push(ColumnKey::new(None, Region::Cdr3, ColumnKind::Sequence).name());
    columns.extend(per_region(ColumnKind::Liabilities));
    columns.extend(per_region(ColumnKind::Risk));
    columns.push(OVERALL_RISK.to_string());
    columns.push(LIABILITIES_SUMMARY.to_string());
    columns
}

fn is_chain_column(name: &str, suffix: &str) -> bool {
    CHAIN_PREFIXES
        .iter()
        .any(|chain| name.eq_ignore_ascii_case(&format!("{} {}", chain, suffix)))
}

/// group `[<prefix>] <suffix>` columns as (per-region, combined-region,
/// per-chain) lists, each sorted
fn group_by_kind(
    names: &[String],
    suffix: &str,
    kind: ColumnKind,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let tail = format!(" {}", suffix);
    let (mut individual, mut combined, mut chains) = (Vec::new(), Vec::new(), Vec::new());

    for name in names.iter().filter(|name| name.ends_with(&tail)) {
        if name.as_str() == OVERALL_RISK {
            continue;
        }

        if ColumnKey::parse(name).is_some_and(|key| key.kind == kind) {
            individual.push(name.clone());
        } else if is_chain_column(name, suffix) {
            chains.push(name.clone());
        } else {
            combined.push(name.clone());
        }
    }

    individual.sort();
    combined.sort();
    chains.sort();
    (individual, combined, chains)
}

fn cdr3_columns(names: &[String]) -> Vec<String> {
    let cdr3 = |name: &str| {
        ColumnKey::parse(name)
            .filter(|key| key.kind == ColumnKind::Sequence && key.region == Region::Cdr3)
    };

    let mut paired = names
        .iter()
        .filter(|name| {
            cdr3(name.as_str()).is_some_and(|key| {
                key.chain.as_deref().is_some_and(|chain| {
                    CHAIN_PREFIXES
                        .iter()
                        .any(|prefix| prefix.eq_ignore_ascii_case(chain))
                })
            })
        })
        .cloned()
        .collect::<Vec<_>>();
    paired.sort();

    let mut general = names
        .iter()
        .filter(|name| cdr3(name.as_str()).is_some() && !paired.contains(*name))
        .cloned()
        .collect::<Vec<_>>();
    general.sort();

    let mut columns = paired;
    columns.extend(general);

    if columns.is_empty() {
        columns = names
            .iter()
            .filter(|name| {
                let lower = name.to_ascii_lowercase();
                lower.contains("cdr3") && lower.ends_with(SEQUENCE_SUFFIX)
            })
            .cloned()
            .collect();
        columns.sort();
    }

    columns
}

/// decide the output columns and their order
pub fn plan_columns(table: &Table, ctx: &PlanContext) -> ColumnPlan {
    let names = table.names();
    let mut columns = Vec::new();

    if table.has(IDENTIFIER) {
        columns.push(IDENTIFIER.to_string());
    }

    let mut annotations = ctx.annotation_columns.to_vec();
    annotations.sort();
    columns.extend(annotations.iter().cloned());
    columns.extend(cdr3_columns(names));

    let (liabilities, combined_liabilities, chain_liabilities) =
        group_by_kind(names, LIABILITIES_SUFFIX, ColumnKind::Liabilities);
    let (risks, combined_risks, chain_risks) =
        group_by_kind(names, RISK_SUFFIX, ColumnKind::Risk);

    columns.extend(liabilities);
    columns.extend(combined_liabilities);
    columns.extend(chain_liabilities);
    columns.extend(risks);
    columns.extend(combined_risks);
    columns.extend(chain_risks);

    for name in [OVERALL_RISK, LIABILITIES_SUMMARY] {
        if table.has(name) {
            columns.push(name.to_string());
        }
    }

    let mut seen = BTreeSet::new();
    columns.retain(|name| seen.insert(name.clone()));

    let no_data = table.width() == 0 || (!ctx.liabilities_computed && columns.len() <= 2);

    if !no_data {
        return ColumnPlan {
            columns,
            placeholders: Vec::new(),
        };
    }

    log::info!("No liabilities to report, writing the default column layout");

    let mut forced = Vec::new();
    if table.has(IDENTIFIER) {
        forced.push(IDENTIFIER.to_string());
    }
    forced.extend(bulk_columns(&annotations));

    let mut seen = BTreeSet::new();
    forced.retain(|name| seen.insert(name.clone()));

    let placeholders = forced
        .iter()
        .filter(|name| !table.has(name))
        .cloned()
        .collect();

    ColumnPlan {
        columns: forced,
        placeholders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_annotation_prefix() {
        assert_eq!(annotation_prefix("Heavy annotations"), "Heavy");
        assert_eq!(annotation_prefix("light_annotations"), "light");
        assert_eq!(annotation_prefix("annotations"), "");
        assert_eq!(annotation_prefix("Heavy Annotations"), "Heavy");
    }

    #[test]
    fn test_select_path_direct_columns() {
        let columns = names(&["clonotypeKey", "Heavy CDR3 aa", "FR2 aa", "sequence aa"]);
        assert_eq!(
            select_path(&columns),
            ExtractionPath::DirectColumns(names(&["FR2 aa", "Heavy CDR3 aa"]))
        );

        assert_eq!(
            select_path(&names(&["clonotypeKey"])),
            ExtractionPath::DirectColumns(Vec::new())
        );
    }

    #[test]
    fn test_select_path_pre_existing() {
        let columns = names(&[
            "Heavy annotations",
            "Heavy CDR1 aa",
            "Heavy CDR2 aa",
            "Heavy CDR3 aa",
            "Heavy FR1 aa",
        ]);

        assert_eq!(
            select_path(&columns),
            ExtractionPath::PreExisting(names(&[
                "Heavy CDR1 aa",
                "Heavy CDR2 aa",
                "Heavy CDR3 aa",
                "Heavy FR1 aa"
            ]))
        );
    }

    #[test]
    fn test_select_path_annotation_driven() {
        let columns = names(&["Light annotations", "Heavy annotations", "Heavy CDR1 aa"]);

        assert_eq!(
            select_path(&columns),
            ExtractionPath::AnnotationDriven(names(&["Light annotations", "Heavy annotations"]))
        );
    }

    #[test]
    fn test_plan_orders_columns() {
        let table = Table::from_rows(
            &[
                "Light CDR3 aa",
                "Heavy CDR3 aa liabilities",
                "Liabilities risk",
                "Heavy CDR3 aa",
                "CDR1 aa risk",
                "extra",
                "clonotypeKey",
                "Sequence liabilities summary",
                "CDR1 aa liabilities",
                "Heavy annotations",
                "Heavy CDR3 aa risk",
                "Heavy liabilities",
            ],
            &[vec!["x"; 12]],
        )
        .unwrap();

        let annotations = names(&["Heavy annotations"]);
        let plan = plan_columns(
            &table,
            &PlanContext {
                annotation_columns: &annotations,
                liabilities_computed: true,
            },
        );

        assert_eq!(
            plan.columns,
            names(&[
                "clonotypeKey",
                "Heavy annotations",
                "Heavy CDR3 aa",
                "Light CDR3 aa",
                "CDR1 aa liabilities",
                "Heavy CDR3 aa liabilities",
                "Heavy liabilities",
                "CDR1 aa risk",
                "Heavy CDR3 aa risk",
                "Liabilities risk",
                "Sequence liabilities summary",
            ])
        );
        assert!(plan.placeholders.is_empty());
    }

    #[test]
    fn test_plan_without_data_forces_default_layout() {
        let table = Table::from_rows(&["clonotypeKey", "other"], &[vec!["c1", "x"]]).unwrap();
        let plan = plan_columns(
            &table,
            &PlanContext {
                annotation_columns: &[],
                liabilities_computed: false,
            },
        );

        assert_eq!(
            plan.columns,
            names(&[
                "clonotypeKey",
                "CDR3 aa",
                "CDR1 aa liabilities",
                "CDR2 aa liabilities",
                "CDR3 aa liabilities",
                "FR1 aa liabilities",
                "CDR1 aa risk",
                "CDR2 aa risk",
                "CDR3 aa risk",
                "FR1 aa risk",
                "Liabilities risk",
                "Sequence liabilities summary",
            ])
        );
        assert_eq!(plan.placeholders, plan.columns[1..].to_vec());
    }

    #[test]
    fn test_plan_zero_rows_keeps_input_columns() {
        let table = Table::from_rows(
            &[
                "clonotypeKey",
                "Heavy CDR3 aa",
                "Heavy CDR3 aa liabilities",
                "Heavy CDR3 aa risk",
                "Liabilities risk",
            ],
            &[],
        )
        .unwrap();
        let plan = plan_columns(
            &table,
            &PlanContext {
                annotation_columns: &[],
                liabilities_computed: true,
            },
        );

        assert_eq!(
            plan.columns,
            names(&[
                "clonotypeKey",
                "Heavy CDR3 aa",
                "Heavy CDR3 aa liabilities",
                "Heavy CDR3 aa risk",
                "Liabilities risk",
            ])
        );
        assert!(plan.placeholders.is_empty());
    }

    #[test]
    fn test_plan_without_columns_is_no_data() {
        let plan = plan_columns(
            &Table::default(),
            &PlanContext {
                annotation_columns: &[],
                liabilities_computed: false,
            },
        );

        assert_eq!(plan.columns[0], "CDR3 aa");
        assert_eq!(plan.placeholders, plan.columns);
    }
}
