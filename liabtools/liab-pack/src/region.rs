//! Structural regions of an antibody variable domain and the
//! column schema used to read and name region-bearing columns.
//!
//! Every region column follows `[<chain> ]<REGION> aa[ liabilities| risk]`,
//! e.g. `Heavy CDR3 aa`, `CDR1 aa liabilities` or `Light FR1 aa risk`.
//! [`ColumnKey`] is the only place where those names are built or parsed.

use std::fmt;
use std::str::FromStr;

use config::{LIABILITIES_SUFFIX, RISK_SUFFIX, SEQUENCE_SUFFIX};
use thiserror::Error;

/// canonical presentation order: FR1 < CDR1 < CDR2 < CDR3 < FR2 < FR3 < FR4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Fr1,
    Cdr1,
    Cdr2,
    Cdr3,
    Fr2,
    Fr3,
    Fr4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Cdr,
    Framework,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown region {0:?}")]
pub struct UnknownRegion(pub String);

impl Region {
    pub const ALL: [Region; 7] = [
        Region::Fr1,
        Region::Cdr1,
        Region::Cdr2,
        Region::Cdr3,
        Region::Fr2,
        Region::Fr3,
        Region::Fr4,
    ];

    /// regions every chain is expected to carry as sequence columns
    pub const EXPECTED: [Region; 4] = [Region::Cdr1, Region::Cdr2, Region::Cdr3, Region::Fr1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Fr1 => "FR1",
            Region::Cdr1 => "CDR1",
            Region::Cdr2 => "CDR2",
            Region::Cdr3 => "CDR3",
            Region::Fr2 => "FR2",
            Region::Fr3 => "FR3",
            Region::Fr4 => "FR4",
        }
    }

    pub fn kind(&self) -> RegionKind {
        match self {
            Region::Cdr1 | Region::Cdr2 | Region::Cdr3 => RegionKind::Cdr,
            Region::Fr1 | Region::Fr2 | Region::Fr3 | Region::Fr4 => RegionKind::Framework,
        }
    }

    pub fn is_cdr(&self) -> bool {
        self.kind() == RegionKind::Cdr
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Sequence,
    Liabilities,
    Risk,
}

impl ColumnKind {
    fn suffix(&self) -> String {
        match self {
            ColumnKind::Sequence => SEQUENCE_SUFFIX.to_string(),
            ColumnKind::Liabilities => format!("{} {}", SEQUENCE_SUFFIX, LIABILITIES_SUFFIX),
            ColumnKind::Risk => format!("{} {}", SEQUENCE_SUFFIX, RISK_SUFFIX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub chain: Option<String>,
    pub region: Region,
    pub kind: ColumnKind,
}

impl ColumnKey {
    pub fn new(chain: Option<&str>, region: Region, kind: ColumnKind) -> Self {
        let chain = chain
            .map(normalize_header)
            .filter(|chain| !chain.is_empty());

        Self {
            chain,
            region,
            kind,
        }
    }

    pub fn with_kind(&self, kind: ColumnKind) -> Self {
        Self {
            chain: self.chain.clone(),
            region: self.region,
            kind,
        }
    }

    pub fn name(&self) -> String {
        match &self.chain {
            Some(chain) => format!("{} {} {}", chain, self.region, self.kind.suffix()),
            None => format!("{} {}", self.region, self.kind.suffix()),
        }
    }

    /// parse a (normalized or raw) column name; `None` for anything
    /// that is not a region column
    pub fn parse(name: &str) -> Option<Self> {
        let name = normalize_header(name);
        let lower = name.to_ascii_lowercase();

        let kind = [ColumnKind::Liabilities, ColumnKind::Risk, ColumnKind::Sequence]
            .into_iter()
            .find(|kind| lower.ends_with(&format!(" {}", kind.suffix())))?;

        let stem = &name[..name.len() - kind.suffix().len() - 1];
        let (chain, region) = match stem.rsplit_once(' ') {
            Some((chain, region)) => (Some(chain), region),
            None => (None, stem),
        };

        let region = region.parse::<Region>().ok()?;
        Some(ColumnKey::new(chain, region, kind))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// collapse internal whitespace runs to one space and trim
pub fn normalize_header(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// uppercase the first character, lowercase the rest
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
