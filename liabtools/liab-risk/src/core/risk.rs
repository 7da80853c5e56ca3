use std::fmt;
use std::str::FromStr;

use config::NO_FINDINGS;

use crate::core::rules::RuleSet;

/// ordered severity: None < Low < Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "None",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "None" => Ok(RiskLevel::None),
            "Low" => Ok(RiskLevel::Low),
            "Medium" => Ok(RiskLevel::Medium),
            "High" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level {:?}", other)),
        }
    }
}

/// highest severity among the names of a `", "`-joined liability list;
/// names no active rule carries do not count
pub fn classify(findings: &str, rules: &RuleSet) -> RiskLevel {
    let findings = findings.trim();
    if findings.is_empty() || findings == NO_FINDINGS {
        return RiskLevel::None;
    }

    let mut level = RiskLevel::None;
    for name in findings.split(',').map(str::trim) {
        if let Some(severity) = rules.severity(name) {
            level = level.max(severity);
            if level == RiskLevel::High {
                break;
            }
        }
    }

    level
}

/// maximum of several per-region levels; unparseable values
/// (e.g. `Unknown`) are ignored
pub fn aggregate<I, S>(levels: I) -> RiskLevel
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    levels
        .into_iter()
        .filter_map(|level| level.as_ref().parse::<RiskLevel>().ok())
        .max()
        .unwrap_or_default()
}
