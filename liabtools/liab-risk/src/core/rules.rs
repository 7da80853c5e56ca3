//! Liability rule engine
//!
//! Three rule families are supported, each held in its own table:
//!
//! * motif rules: a regex plus a severity, only searched inside CDRs;
//! * auxiliary patterns: severity-less markers (stop codon, frameshift)
//!   searched in every region and always rated High;
//! * cysteine rules: the number of `C` residues in a region compared
//!   against the expected count for that region.
//!
//! A [`RuleSet`] is built once per run from the names the user asked for
//! and is read-only afterwards.

use std::collections::BTreeSet;
use std::fmt;

use config::{NO_FINDINGS, UNKNOWN};
use hashbrown::{HashMap, HashSet};
use liab_pack::{Region, RegionKind};
use regex::Regex;

use crate::core::risk::RiskLevel;

pub const TRYPTOPHAN_OXIDATION: &str = "Tryptophan Oxidation (W)";
pub const MISSING_CYSTEINES: &str = "Missing Cysteines";
pub const EXTRA_CYSTEINES: &str = "Extra Cysteines";

const MOTIFS: [(&str, &str, RiskLevel); 10] = [
    ("Deamidation (N[GS])", r"N[GS]", RiskLevel::High),
    ("Fragmentation (DP)", r"DP", RiskLevel::High),
    ("Isomerization (D[DGHST])", r"D[DGHST]", RiskLevel::High),
    ("N-linked Glycosylation (N[^P][ST])", r"N[^P][ST]", RiskLevel::High),
    ("Deamidation (N[AHNT])", r"N[AHNT]", RiskLevel::Medium),
    ("Hydrolysis (NP)", r"NP", RiskLevel::Medium),
    ("Fragmentation (TS)", r"TS", RiskLevel::Medium),
    (TRYPTOPHAN_OXIDATION, r"W", RiskLevel::Medium),
    ("Methionine Oxidation (M)", r"M", RiskLevel::Medium),
    ("Deamidation ([STK]N)", r"[STK]N", RiskLevel::Low),
];

const AUXILIARY: [(&str, &str); 2] = [("Contains stop codon", r"\*"), ("Out of frame", r"_")];

const CYSTEINES: [(&str, CysteineCheck, RiskLevel); 2] = [
    (MISSING_CYSTEINES, CysteineCheck::Missing, RiskLevel::High),
    (EXTRA_CYSTEINES, CysteineCheck::Extra, RiskLevel::High),
];

// WARN: zero-indexed positions; only the count is compared
const EXPECTED_CYSTEINES: [(Region, &[usize]); 2] = [(Region::Fr1, &[22]), (Region::Cdr3, &[1])];

const PTM: [&str; 5] = [
    "Deamidation (N[GS])",
    "Isomerization (D[DGHST])",
    "N-linked Glycosylation (N[^P][ST])",
    TRYPTOPHAN_OXIDATION,
    "Methionine Oxidation (M)",
];

const FRAGMENTATION: [&str; 3] = ["Fragmentation (DP)", "Hydrolysis (NP)", "Fragmentation (TS)"];

const ABBREVIATIONS: [(&str, &str); 12] = [
    ("Deamidation (N[GS])", "Deam(N[GS])"),
    ("Fragmentation (DP)", "Frag(DP)"),
    ("Isomerization (D[DGHST])", "Isom"),
    ("N-linked Glycosylation (N[^P][ST])", "Glyc"),
    ("Deamidation (N[AHNT])", "Deam(N[AHNT])"),
    ("Hydrolysis (NP)", "Hydro"),
    ("Fragmentation (TS)", "Frag(TS)"),
    (TRYPTOPHAN_OXIDATION, "TrpOx"),
    ("Methionine Oxidation (M)", "MetOx"),
    ("Deamidation ([STK]N)", "Deam([STK]N)"),
    (MISSING_CYSTEINES, "MissCys"),
    (EXTRA_CYSTEINES, "ExtraCys"),
];

/// every built-in liability name, motifs first
pub fn catalogue() -> Vec<&'static str> {
    MOTIFS
        .iter()
        .map(|(name, _, _)| *name)
        .chain(AUXILIARY.iter().map(|(name, _)| *name))
        .chain(CYSTEINES.iter().map(|(name, _, _)| *name))
        .collect()
}

/// split a comma-delimited selection into trimmed, non-empty names
pub fn parse_selection(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CysteineCheck {
    Missing,
    Extra,
}

#[derive(Debug, Clone)]
pub struct MotifRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub severity: RiskLevel,
}

impl MotifRule {
    /// a tryptophan closing a CDR3 is not an oxidation liability
    fn exempts_terminal(&self, region: Region) -> bool {
        match region {
            Region::Cdr3 => self.name == TRYPTOPHAN_OXIDATION,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuxiliaryRule {
    pub name: &'static str,
    pub pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct CysteineRule {
    pub name: &'static str,
    pub check: CysteineCheck,
    pub severity: RiskLevel,
}

/// one liability occurrence, relative to the scanned region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub name: &'static str,
    pub start: usize,
    pub length: usize,
}

impl Hit {
    fn new(name: &'static str, start: usize, length: usize) -> Self {
        Self {
            name,
            start,
            length,
        }
    }
}

/// the liabilities of one (record, region) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Findings {
    /// the region sequence is missing or blank
    Unknown,
    Found(BTreeSet<&'static str>),
}

impl Findings {
    pub fn is_empty(&self) -> bool {
        match self {
            Findings::Unknown => true,
            Findings::Found(names) => names.is_empty(),
        }
    }
}

impl fmt::Display for Findings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Findings::Unknown => f.write_str(UNKNOWN),
            Findings::Found(names) if names.is_empty() => f.write_str(NO_FINDINGS),
            Findings::Found(names) => {
                f.write_str(&names.iter().copied().collect::<Vec<_>>().join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    motifs: Vec<MotifRule>,
    auxiliary: Vec<AuxiliaryRule>,
    cysteines: Vec<CysteineRule>,
    expected_cysteines: HashMap<Region, usize>,
}

impl RuleSet {
    /// keep the built-in rules whose names appear in `names`;
    /// unrecognized names are ignored
    pub fn from_selection<S: AsRef<str>>(names: &[S]) -> Result<Self, regex::Error> {
        let selected = names
            .iter()
            .map(|name| name.as_ref().trim())
            .collect::<HashSet<_>>();

        let motifs = MOTIFS
            .iter()
            .filter(|(name, _, _)| selected.contains(name))
            .map(|&(name, pattern, severity)| {
                Ok(MotifRule {
                    name,
                    pattern: Regex::new(pattern)?,
                    severity,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let auxiliary = AUXILIARY
            .iter()
            .filter(|(name, _)| selected.contains(name))
            .map(|&(name, pattern)| {
                Ok(AuxiliaryRule {
                    name,
                    pattern: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        let cysteines = CYSTEINES
            .iter()
            .filter(|(name, _, _)| selected.contains(name))
            .map(|&(name, check, severity)| CysteineRule {
                name,
                check,
                severity,
            })
            .collect();

        let expected_cysteines = EXPECTED_CYSTEINES
            .iter()
            .map(|(region, positions)| (*region, positions.len()))
            .collect();

        Ok(Self {
            motifs,
            auxiliary,
            cysteines,
            expected_cysteines,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty() && self.auxiliary.is_empty() && self.cysteines.is_empty()
    }

    /// active rule names in catalogue order
    pub fn names(&self) -> Vec<&'static str> {
        self.motifs
            .iter()
            .map(|rule| rule.name)
            .chain(self.auxiliary.iter().map(|rule| rule.name))
            .chain(self.cysteines.iter().map(|rule| rule.name))
            .collect()
    }

    pub fn expected_cysteines(&self, region: Region) -> Option<usize> {
        self.expected_cysteines.get(&region).copied()
    }

    /// severity lookup: cysteine table, then motif table, then auxiliary
    /// patterns (always High); `None` for names no active rule carries
    pub fn severity(&self, name: &str) -> Option<RiskLevel> {
        if let Some(rule) = self.cysteines.iter().find(|rule| rule.name == name) {
            return Some(rule.severity);
        }
        if let Some(rule) = self.motifs.iter().find(|rule| rule.name == name) {
            return Some(rule.severity);
        }
        self.auxiliary
            .iter()
            .any(|rule| rule.name == name)
            .then_some(RiskLevel::High)
    }

    /// every liability occurrence in `sequence`, read as `region`
    pub fn scan(&self, sequence: &str, region: Region) -> Vec<Hit> {
        let mut hits = Vec::new();

        match region.kind() {
            RegionKind::Cdr => {
                for rule in &self.motifs {
                    let exempt = rule.exempts_terminal(region);
                    hits.extend(
                        rule.pattern
                            .find_iter(sequence)
                            .filter(|m| !(exempt && m.end() == sequence.len()))
                            .map(|m| Hit::new(rule.name, m.start(), m.len())),
                    );
                }
            }
            RegionKind::Framework => {}
        }

        for rule in &self.auxiliary {
            hits.extend(
                rule.pattern
                    .find_iter(sequence)
                    .map(|m| Hit::new(rule.name, m.start(), m.len())),
            );
        }

        if let Some(hit) = self.check_cysteines(sequence, region) {
            hits.push(hit);
        }

        hits
    }

    /// the set of liabilities found in one region sequence
    pub fn identify(&self, sequence: Option<&str>, region: Region) -> Findings {
        match sequence {
            Some(sequence) if !sequence.trim().is_empty() => Findings::Found(
                self.scan(sequence, region)
                    .into_iter()
                    .map(|hit| hit.name)
                    .collect(),
            ),
            _ => Findings::Unknown,
        }
    }

    fn check_cysteines(&self, sequence: &str, region: Region) -> Option<Hit> {
        let expected = self.expected_cysteines(region)?;
        let actual = sequence.matches('C').count();

        let check = match actual.cmp(&expected) {
            std::cmp::Ordering::Less => CysteineCheck::Missing,
            std::cmp::Ordering::Greater => CysteineCheck::Extra,
            std::cmp::Ordering::Equal => return None,
        };

        self.cysteines
            .iter()
            .find(|rule| rule.check == check)
            .map(|rule| Hit::new(rule.name, 0, 0))
    }
}

/// short human label for a liability selection
pub fn selection_label<S: AsRef<str>>(selected: &[S]) -> String {
    let mut seen = HashSet::new();
    let selected = selected
        .iter()
        .map(|name| name.as_ref().trim())
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .collect::<Vec<_>>();

    if selected.is_empty() {
        return String::new();
    }

    if catalogue().iter().all(|name| seen.contains(name)) {
        return "All".to_string();
    }

    let all_ptm = PTM.iter().all(|name| seen.contains(name));
    let all_frag = FRAGMENTATION.iter().all(|name| seen.contains(name));
    let only_ptm = selected.iter().all(|name| PTM.contains(name));
    let only_frag = selected.iter().all(|name| FRAGMENTATION.contains(name));

    if all_ptm && all_frag {
        return "PTM+Frag".to_string();
    }
    if all_ptm && only_ptm {
        return "PTM".to_string();
    }
    if all_frag && only_frag {
        return "Frag".to_string();
    }

    let abbreviations = selected
        .iter()
        .map(|name| {
            ABBREVIATIONS
                .iter()
                .find(|(full, _)| full == name)
                .map(|(_, short)| short.to_string())
                .unwrap_or_else(|| name.chars().take(4).collect())
        })
        .collect::<Vec<_>>();

    match abbreviations.as_slice() {
        [first, second, rest @ ..] if !rest.is_empty() => {
            format!("{}+{}+{} type(s)", first, second, rest.len())
        }
        _ => abbreviations.join("+"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(names: &[&str]) -> RuleSet {
        RuleSet::from_selection(names).unwrap()
    }

    #[test]
    fn test_selection_ignores_unknown_names() {
        let set = rules(&["Fragmentation (DP)", "Not a liability", " Out of frame "]);
        assert_eq!(set.names(), vec!["Fragmentation (DP)", "Out of frame"]);

        assert!(rules(&["nothing", ""]).is_empty());
        assert!(rules(&[] as &[&str]).is_empty());
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("Deamidation (N[GS]), ,Methionine Oxidation (M),"),
            vec!["Deamidation (N[GS])", "Methionine Oxidation (M)"]
        );
        assert!(parse_selection("").is_empty());
    }

    #[test]
    fn test_identify_deamidation_in_cdr1() {
        let set = rules(&["Deamidation (N[GS])"]);
        let findings = set.identify(Some("GYTNGFT"), Region::Cdr1);

        assert_eq!(findings.to_string(), "Deamidation (N[GS])");
    }

    #[test]
    fn test_identify_blank_is_unknown() {
        let set = rules(&["Deamidation (N[GS])"]);

        assert_eq!(set.identify(None, Region::Cdr1), Findings::Unknown);
        assert_eq!(set.identify(Some("  "), Region::Cdr2).to_string(), "Unknown");
        assert_eq!(set.identify(Some("AAAA"), Region::Cdr2).to_string(), "None");
    }

    #[test]
    fn test_motifs_are_cdr_scoped() {
        let set = rules(&["Fragmentation (DP)", "Contains stop codon"]);

        assert_eq!(
            set.identify(Some("ADPK*"), Region::Fr2).to_string(),
            "Contains stop codon"
        );
        assert_eq!(
            set.identify(Some("ADPK*"), Region::Cdr2).to_string(),
            "Contains stop codon, Fragmentation (DP)"
        );
    }

    #[test]
    fn test_terminal_tryptophan_is_exempt_in_cdr3_only() {
        let set = rules(&[TRYPTOPHAN_OXIDATION]);

        assert_eq!(set.identify(Some("CARDYW"), Region::Cdr3).to_string(), "None");
        assert_eq!(
            set.identify(Some("CARWDY"), Region::Cdr3).to_string(),
            TRYPTOPHAN_OXIDATION
        );
        assert_eq!(
            set.identify(Some("GYTFW"), Region::Cdr1).to_string(),
            TRYPTOPHAN_OXIDATION
        );
        assert_eq!(
            set.identify(Some("CAWW"), Region::Cdr3).to_string(),
            TRYPTOPHAN_OXIDATION
        );
    }

    #[test]
    fn test_cysteine_counts() {
        let set = rules(&[MISSING_CYSTEINES, EXTRA_CYSTEINES]);

        assert_eq!(
            set.identify(Some("QVQLVQSGAEVKKPGASVKVS"), Region::Fr1).to_string(),
            MISSING_CYSTEINES
        );
        assert_eq!(
            set.identify(Some("QVQLVQSGAEVKKPGASVKVSCKAS"), Region::Fr1).to_string(),
            "None"
        );
        assert_eq!(
            set.identify(Some("CARCW"), Region::Cdr3).to_string(),
            EXTRA_CYSTEINES
        );
        // INFO: no expectation configured for CDR1
        assert_eq!(set.identify(Some("GYTF"), Region::Cdr1).to_string(), "None");
    }

    #[test]
    fn test_cysteine_rule_must_be_active() {
        let set = rules(&[EXTRA_CYSTEINES]);
        assert_eq!(set.identify(Some("QVQLV"), Region::Fr1).to_string(), "None");
    }

    #[test]
    fn test_scan_reports_every_match() {
        let set = rules(&["Deamidation (N[GS])", MISSING_CYSTEINES]);
        let hits = set.scan("NGANSNG", Region::Cdr3);

        assert_eq!(
            hits,
            vec![
                Hit::new("Deamidation (N[GS])", 0, 2),
                Hit::new("Deamidation (N[GS])", 3, 2),
                Hit::new("Deamidation (N[GS])", 5, 2),
                Hit::new(MISSING_CYSTEINES, 0, 0),
            ]
        );
    }

    #[test]
    fn test_scan_orders_motifs_then_auxiliary_then_cysteines() {
        let set = rules(&[
            "Contains stop codon",
            EXTRA_CYSTEINES,
            TRYPTOPHAN_OXIDATION,
            "Fragmentation (DP)",
        ]);
        let hits = set.scan("CDPW*C", Region::Cdr3);

        assert_eq!(
            hits,
            vec![
                Hit::new("Fragmentation (DP)", 1, 2),
                Hit::new(TRYPTOPHAN_OXIDATION, 3, 1),
                Hit::new("Contains stop codon", 4, 1),
                Hit::new(EXTRA_CYSTEINES, 0, 0),
            ]
        );
    }

    #[test]
    fn test_severity_lookup() {
        let set = rules(&["Deamidation ([STK]N)", "Out of frame", MISSING_CYSTEINES]);

        assert_eq!(set.severity("Deamidation ([STK]N)"), Some(RiskLevel::Low));
        assert_eq!(set.severity("Out of frame"), Some(RiskLevel::High));
        assert_eq!(set.severity(MISSING_CYSTEINES), Some(RiskLevel::High));
        assert_eq!(set.severity("Fragmentation (DP)"), None);
    }

    #[test]
    fn test_selection_label() {
        assert_eq!(selection_label(&catalogue()), "All");
        assert_eq!(selection_label(&PTM), "PTM");
        assert_eq!(selection_label(&FRAGMENTATION), "Frag");

        let mut both = PTM.to_vec();
        both.extend(FRAGMENTATION);
        assert_eq!(selection_label(&both), "PTM+Frag");

        assert_eq!(
            selection_label(&["Fragmentation (DP)", MISSING_CYSTEINES]),
            "Frag(DP)+MissCys"
        );
        assert_eq!(
            selection_label(&["Hydrolysis (NP)", "Isomerization (D[DGHST])", "Out of frame", "Contains stop codon"]),
            "Hydro+Isom+2 type(s)"
        );
        assert_eq!(selection_label(&["Out of frame"]), "Out ");
        assert_eq!(selection_label(&[] as &[&str]), "");
    }
}
