//! Core module for extracting antibody regions, flagging sequence
//! liabilities and rating their risk
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module drives a single pass over an in-memory table. Region
//! sequences either already exist as columns or are sliced out of each
//! record with its annotation string; every region column is then run
//! through the liability rule engine, each finding is rated on the
//! None < Low < Medium < High scale and the per-region ratings are
//! reduced to one overall rating per record.
//!
//! In short, this module provides four submodules: rules, risk, combine
//! and plan. The first one holds the built-in liability catalogue and
//! scans region sequences. The risk module rates findings. The combine
//! module merges Heavy/Light column pairs and the plan module picks the
//! extraction path and the final column layout.

pub mod combine;
pub mod plan;
pub mod risk;
pub mod rules;

use anyhow::{Context, Result};
use config::{
    get_progress_bar, CHAIN_PREFIXES, LIABILITIES_SUFFIX, LIABILITIES_SUMMARY, OVERALL_RISK,
    RISK_SUFFIX,
};
use liab_pack::record::{encode_token, tokens};
use liab_pack::{
    capitalize, extract, parse_annotations, Cell, CodeRegistry, ColumnKey, ColumnKind, Extraction,
    LabelMap, Region, Table, TableError,
};
use log::{error, info, warn};
use std::collections::BTreeSet;

use crate::cli::Args;
use crate::core::{
    combine::combine,
    plan::{
        annotation_columns, annotation_prefix, plan_columns, region_columns, select_path,
        ExtractionPath, PlanContext,
    },
    risk::{aggregate, classify},
    rules::{parse_selection, selection_label, RuleSet},
};
use crate::utils::{found_regions, load_label_map, summarize, write_found_regions, write_label_map};

/// result of one pass over the input table
#[derive(Debug)]
pub struct Outcome {
    pub table: Table,
    pub registry: CodeRegistry,
    pub path: ExtractionPath,
    pub regions: Vec<Region>,
    pub had_annotations: bool,
    pub computed: bool,
}

impl Outcome {
    /// region labels merged with the liability codes assigned in this run
    pub fn label_map(&self, regions: &LabelMap) -> LabelMap {
        match (self.had_annotations, self.computed) {
            (false, false) => LabelMap::new(),
            (true, false) => regions.clone(),
            (_, true) => {
                let mut labels = regions.clone();
                labels.extend(self.registry.to_label_map());
                labels
            }
        }
    }
}

pub fn annotate_liabilities(args: Args) -> Result<()> {
    let rules = active_rules(args.include_liabilities.as_deref())?;

    let labels = match args.label_map.as_deref() {
        Some(source) => load_label_map(source).unwrap_or_else(|e| {
            error!("Could not load label map: {}. Continuing with an empty map", e);
            LabelMap::new()
        }),
        None => LabelMap::new(),
    };

    let table = Table::read(&args.input)
        .with_context(|| format!("Could not read input table {}", args.input.display()))?;
    info!(
        "Read {} records with {} columns from {}",
        table.height(),
        table.width(),
        args.input.display()
    );

    let outcome = process(table, rules.as_ref(), &labels);

    match outcome.table.write(&args.output) {
        Ok(()) => info!(
            "Wrote {} records with {} columns to {}",
            outcome.table.height(),
            outcome.table.width(),
            args.output.display()
        ),
        Err(e) => error!("Could not write output table {}: {}", args.output.display(), e),
    }

    if let Some(path) = args.output_regions_found.as_deref() {
        if let Err(e) = write_found_regions(&outcome.regions, path) {
            error!("Could not write found regions to {}: {}", path.display(), e);
        }
    }

    if let Err(e) = write_label_map(&outcome.label_map(&labels), args.output_label_map.as_deref())
    {
        error!("Could not write label map: {}", e);
    }

    Ok(())
}

/// build the rule set from a comma-delimited selection; `None` disables
/// liability computation
pub fn active_rules(selection: Option<&str>) -> Result<Option<RuleSet>> {
    let Some(selection) = selection else {
        warn!("No liabilities requested, skipping liability computation");
        return Ok(None);
    };

    let names = parse_selection(selection);
    let rules = RuleSet::from_selection(&names)?;

    if rules.is_empty() {
        warn!(
            "None of the requested liabilities {:?} is known, skipping liability computation",
            names
        );
        return Ok(None);
    }

    info!(
        "Computing liabilities: {} ({})",
        selection_label(&rules.names()),
        rules.names().join(", ")
    );

    Ok(Some(rules))
}

/// run the whole pipeline over an in-memory table
pub fn process(mut table: Table, rules: Option<&RuleSet>, labels: &LabelMap) -> Outcome {
    let annotations = annotation_columns(table.names());
    let mut registry = CodeRegistry::starting_after(labels);

    let path = select_path(table.names());
    let analyzed = match &path {
        ExtractionPath::PreExisting(columns) => {
            info!("Using pre-existing region columns {:?}", columns);
            columns.clone()
        }
        ExtractionPath::AnnotationDriven(columns) => {
            info!("Extracting regions from annotation columns {:?}", columns);
            extract_regions(&mut table, columns, labels, rules, &mut registry);
            region_columns(table.names())
        }
        ExtractionPath::DirectColumns(columns) => {
            if columns.is_empty() {
                info!("No annotation or region sequence columns found");
            } else {
                info!("Using region sequence columns {:?}", columns);
            }
            columns.clone()
        }
    };

    let rules = match rules {
        Some(_) if analyzed.is_empty() => {
            warn!("No region columns to analyze, skipping liability computation");
            None
        }
        rules => rules,
    };

    if let Some(rules) = rules {
        compute_liabilities(&mut table, &analyzed, rules);
    }

    let computed = rules.is_some();
    let plan = plan_columns(
        &table,
        &PlanContext {
            annotation_columns: &annotations,
            liabilities_computed: computed,
        },
    );

    let height = table.height();
    for name in &plan.placeholders {
        if let Err(e) = table.set_column(name, vec![None; height]) {
            error!("Could not add placeholder column {:?}: {}", name, e);
        }
    }

    let selected = table.select(&plan.columns);
    let table = match (selected.width(), table.width()) {
        (0, n) if n > 0 => table,
        _ => selected,
    };

    Outcome {
        table,
        registry,
        path,
        regions: found_regions(&analyzed),
        had_annotations: !annotations.is_empty(),
        computed,
    }
}

/// locate the full-sequence column belonging to an annotation prefix
fn sequence_column(columns: &[String], prefix: &str) -> Option<String> {
    let mut candidates = vec![format!("{} sequence aa", prefix).trim().to_string()];
    if !prefix.is_empty() {
        candidates.push(format!("{} aa", prefix));
    }

    candidates.iter().find_map(|candidate| {
        columns
            .iter()
            .find(|column| column.eq_ignore_ascii_case(candidate))
            .cloned()
    })
}

/// more than one chain prefix among the annotation columns, at least
/// one of them Heavy or Light
fn multiple_chains(annotations: &[String]) -> bool {
    let chains = annotations
        .iter()
        .filter_map(|column| column.split_once(' ').map(|(chain, _)| chain))
        .collect::<BTreeSet<_>>();

    chains.len() > 1
        && chains.iter().any(|chain| {
            CHAIN_PREFIXES
                .iter()
                .any(|prefix| prefix.eq_ignore_ascii_case(chain))
        })
}

fn extract_regions(
    table: &mut Table,
    annotations: &[String],
    labels: &LabelMap,
    rules: Option<&RuleSet>,
    registry: &mut CodeRegistry,
) {
    let paired = multiple_chains(annotations);

    for annotation in annotations {
        let prefix = annotation_prefix(annotation);
        let Some(sequences) = sequence_column(table.names(), &prefix) else {
            warn!(
                "No sequence column found for {:?}, skipping its extraction",
                annotation
            );
            continue;
        };

        let chain = (paired && !prefix.is_empty()).then(|| capitalize(&prefix));
        let (rewritten, extractions) = {
            let empty: Vec<Cell> = Vec::new();
            let values = table.column(&sequences).unwrap_or(&empty);
            let annotated = table.column(annotation).unwrap_or(&empty);

            let pb = get_progress_bar(table.height() as u64, &format!("Extracting {}", annotation));
            let mut rewritten = Vec::with_capacity(table.height());
            let mut extractions = Vec::with_capacity(table.height());

            for (sequence, encoded) in values.iter().zip(annotated) {
                match (sequence.as_deref(), encoded.as_deref()) {
                    (Some(sequence), Some(encoded)) => {
                        let (updated, extraction) =
                            annotate_record(sequence, encoded, labels, rules, registry);
                        rewritten.push(updated);
                        extractions.push(extraction);
                    }
                    _ => {
                        rewritten.push(encoded.clone());
                        extractions.push(Extraction::default());
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();

            (rewritten, extractions)
        };

        if let Err(e) = table.set_column(annotation, rewritten) {
            error!("Could not rewrite annotation column {:?}: {}", annotation, e);
        }

        push_fragments(table, chain.as_deref(), &extractions);
    }
}

/// slice one record into regions and rewrite its annotation as the sorted,
/// de-duplicated token set plus, when rules are active, one token per
/// liability hit. Codes are assigned walking the regions in slicing order.
fn annotate_record(
    sequence: &str,
    annotation: &str,
    labels: &LabelMap,
    rules: Option<&RuleSet>,
    registry: &mut CodeRegistry,
) -> (Cell, Extraction) {
    let segments = parse_annotations(annotation);
    let extraction = extract(sequence, &segments, labels);

    let mut parts = tokens(annotation)
        .into_iter()
        .map(str::to_string)
        .collect::<BTreeSet<_>>();

    if let Some(rules) = rules {
        for region in extraction.sliced() {
            let Some((fragment, start, _)) = extraction.get(region) else {
                continue;
            };

            for hit in rules.scan(fragment, region) {
                let code = registry.assign(hit.name);
                parts.insert(encode_token(
                    &code.to_string(),
                    start + hit.start,
                    hit.length,
                ));
            }
        }
    }

    let rewritten = parts.into_iter().collect::<Vec<_>>().join("|");
    (Some(rewritten).filter(|value| !value.is_empty()), extraction)
}

/// one column per extracted region, in canonical order
fn push_fragments(table: &mut Table, chain: Option<&str>, extractions: &[Extraction]) {
    let regions = extractions
        .iter()
        .flat_map(|extraction| extraction.regions())
        .collect::<BTreeSet<_>>();

    for region in regions {
        let name = ColumnKey::new(chain, region, ColumnKind::Sequence).name();
        let values = extractions
            .iter()
            .map(|extraction| extraction.fragments.get(&region).cloned())
            .collect::<Vec<Cell>>();

        match table.push_column(&name, values) {
            Ok(()) => info!("Added region column {:?}", name),
            Err(TableError::DuplicateColumn(_)) => {
                warn!("Column {:?} already present, keeping the input values", name)
            }
            Err(e) => error!("Dropping region column {:?}: {}", name, e),
        }
    }
}

/// per-region liabilities and risk, the row summary and overall risk,
/// then Heavy/Light pairs merged
fn compute_liabilities(table: &mut Table, analyzed: &[String], rules: &RuleSet) {
    let mut keys = Vec::new();

    for column in analyzed {
        let Some(key) = ColumnKey::parse(column) else {
            continue;
        };
        let Some(values) = table.column(column) else {
            continue;
        };

        let findings = values
            .iter()
            .map(|value| Some(rules.identify(value.as_deref(), key.region).to_string()))
            .collect::<Vec<Cell>>();

        let name = key.with_kind(ColumnKind::Liabilities).name();
        match table.set_column(&name, findings) {
            Ok(()) => keys.push(key),
            Err(e) => error!("Dropping liability column {:?}: {}", name, e),
        }
    }

    let liabilities = keys
        .iter()
        .map(|key| key.with_kind(ColumnKind::Liabilities).name())
        .collect::<Vec<_>>();

    if !liabilities.is_empty() || !table.has(LIABILITIES_SUMMARY) {
        let summary = (0..table.height())
            .map(|row| {
                let entries = liabilities
                    .iter()
                    .map(|name| (name.as_str(), table.value(row, name)))
                    .collect::<Vec<_>>();
                Some(summarize(&entries))
            })
            .collect::<Vec<Cell>>();

        if let Err(e) = table.set_column(LIABILITIES_SUMMARY, summary) {
            error!("Dropping {:?}: {}", LIABILITIES_SUMMARY, e);
        }
    }

    let mut risks = Vec::new();
    for key in &keys {
        let source = key.with_kind(ColumnKind::Liabilities).name();
        let name = key.with_kind(ColumnKind::Risk).name();

        let levels = (0..table.height())
            .map(|row| {
                let findings = table.value(row, &source).unwrap_or_default();
                Some(classify(findings, rules).to_string())
            })
            .collect::<Vec<Cell>>();

        match table.set_column(&name, levels) {
            Ok(()) => risks.push(name),
            Err(e) => error!("Dropping risk column {:?}: {}", name, e),
        }
    }

    let overall = (0..table.height())
        .map(|row| {
            let levels = risks.iter().filter_map(|name| table.value(row, name));
            Some(aggregate(levels).to_string())
        })
        .collect::<Vec<Cell>>();

    if let Err(e) = table.set_column(OVERALL_RISK, overall) {
        error!("Dropping {:?}: {}", OVERALL_RISK, e);
    }

    combine(table, RISK_SUFFIX, &CHAIN_PREFIXES);
    combine(table, LIABILITIES_SUFFIX, &CHAIN_PREFIXES);
}
