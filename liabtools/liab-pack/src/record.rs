use std::collections::BTreeMap;

use config::{LABEL_DELIMITER, SEGMENT_DELIMITER, SPAN_DELIMITER};
use hashbrown::HashMap;

use crate::codec::{decode, encode};
use crate::region::Region;

/// opaque label -> human readable name, serialized sorted by key
pub type LabelMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub label: String,
    pub start: usize,
    pub length: usize,
}

impl Segment {
    pub fn new(label: &str, start: usize, length: usize) -> Self {
        Self {
            label: label.to_string(),
            start,
            length,
        }
    }

    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    /// decode one `label:START+LENGTH` token, `None` when it lacks a delimiter
    fn from_token(token: &str) -> Option<Result<Self, String>> {
        let (label, span) = token.split_once(LABEL_DELIMITER)?;
        let (start, length) = span.split_once(SPAN_DELIMITER)?;

        let coords = decode(start).and_then(|start| Ok((start, decode(length)?)));
        let segment = match coords {
            Ok((start, length)) => match (usize::try_from(start), usize::try_from(length)) {
                (Ok(start), Ok(length)) => Ok(Segment::new(label, start, length)),
                _ => Err(format!("coordinates of {token:?} exceed the address space")),
            },
            Err(e) => Err(e.to_string()),
        };

        Some(segment)
    }
}

/// split an annotation into its raw, non-empty tokens
pub fn tokens(annotation: &str) -> Vec<&str> {
    annotation
        .split(SEGMENT_DELIMITER)
        .filter(|token| !token.is_empty())
        .collect()
}

/// format one annotation token
pub fn encode_token(label: &str, start: usize, length: usize) -> String {
    format!(
        "{}{}{}{}{}",
        label,
        LABEL_DELIMITER,
        encode(start as u64),
        SPAN_DELIMITER,
        encode(length as u64)
    )
}

/// decode an annotation string into segments sorted by start offset;
/// malformed tokens are skipped
pub fn parse_annotations(annotation: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for token in tokens(annotation) {
        match Segment::from_token(token) {
            Some(Ok(segment)) => segments.push(segment),
            Some(Err(e)) => {
                log::warn!(
                    "Could not decode part {:?} in annotation {:?}: {}",
                    token,
                    annotation,
                    e
                );
            }
            None => continue,
        }
    }

    segments.sort_by_key(|segment| segment.start);
    segments
}

/// region slices of one sequence with their (start, length) coordinates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub fragments: BTreeMap<Region, String>,
    pub coords: BTreeMap<Region, (usize, usize)>,
    // first-insertion order: segment start, synthesized FR1 last
    sliced: Vec<Region>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn get(&self, region: Region) -> Option<(&str, usize, usize)> {
        let fragment = self.fragments.get(&region)?;
        let (start, length) = self.coords.get(&region)?;
        Some((fragment.as_str(), *start, *length))
    }

    /// regions in canonical order
    pub fn regions(&self) -> impl Iterator<Item = Region> + '_ {
        self.fragments.keys().copied()
    }

    /// regions in the order they were sliced out of the sequence
    pub fn sliced(&self) -> impl Iterator<Item = Region> + '_ {
        self.sliced.iter().copied()
    }

    fn insert(&mut self, region: Region, fragment: &str, start: usize, length: usize) {
        if !self.fragments.contains_key(&region) {
            self.sliced.push(region);
        }
        self.fragments.insert(region, fragment.to_string());
        self.coords.insert(region, (start, length));
    }
}

/// slice the named regions out of `sequence` and synthesize FR1 as
/// the prefix before CDR1
pub fn extract(sequence: &str, segments: &[Segment], labels: &LabelMap) -> Extraction {
    let mut extraction = Extraction::default();

    for segment in segments {
        let Some(name) = labels.get(&segment.label) else {
            continue;
        };
        let Ok(region) = name.parse::<Region>() else {
            log::debug!("Label {:?} maps to {:?}, not a region", segment.label, name);
            continue;
        };

        match sequence.get(segment.start..segment.end()) {
            Some(fragment) => extraction.insert(region, fragment, segment.start, segment.length),
            None => {
                log::warn!(
                    "Segment {} ({}+{}) out of bounds for sequence of length {}",
                    region,
                    segment.start,
                    segment.length,
                    sequence.len()
                );
            }
        }
    }

    if let Some(&(cdr1_start, _)) = extraction.coords.get(&Region::Cdr1) {
        if cdr1_start > 0 {
            extraction.insert(Region::Fr1, &sequence[..cdr1_start], 0, cdr1_start);
        }
    }

    extraction
}

/// run-wide liability name -> numeric label assignment, first come first served
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    codes: HashMap<String, u64>,
    order: Vec<String>,
    next: u64,
}

impl CodeRegistry {
    /// new codes start right after the largest numeric key of `labels`
    pub fn starting_after(labels: &LabelMap) -> Self {
        let next = labels
            .keys()
            .filter(|key| !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|key| key.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max + 1);

        Self {
            next,
            ..Default::default()
        }
    }

    pub fn assign(&mut self, name: &str) -> u64 {
        if let Some(code) = self.codes.get(name) {
            return *code;
        }

        let code = self.next;
        self.codes.insert(name.to_string(), code);
        self.order.push(name.to_string());
        self.next += 1;

        code
    }

    pub fn code(&self, name: &str) -> Option<u64> {
        self.codes.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// code -> liability name, the direction persisted in label maps
    pub fn to_label_map(&self) -> LabelMap {
        self.order
            .iter()
            .filter_map(|name| {
                self.codes
                    .get(name.as_str())
                    .map(|code| (code.to_string(), name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> LabelMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_annotations_sorts_by_start() {
        let segments = parse_annotations("2:A+3|1:0+5");

        assert_eq!(
            segments,
            vec![Segment::new("1", 0, 5), Segment::new("2", 10, 3)]
        );
    }

    #[test]
    fn test_parse_annotations_skips_malformed_tokens() {
        let segments = parse_annotations("1:0+5|garbage|3:5|4:x+1||2:5+3");

        assert_eq!(
            segments,
            vec![Segment::new("1", 0, 5), Segment::new("2", 5, 3)]
        );
        assert!(parse_annotations("").is_empty());
    }

    #[test]
    fn test_extract_cdr1_at_origin_has_no_fr1() {
        let seq = "QVQLVQSGAEVKKPGASVKVSCKASGYTFT";
        let segments = parse_annotations("1:0+5|2:5+3");
        let extraction = extract(seq, &segments, &labels(&[("1", "CDR1"), ("2", "CDR2")]));

        assert_eq!(extraction.get(Region::Cdr1), Some(("QVQLV", 0, 5)));
        assert_eq!(extraction.get(Region::Cdr2), Some(("QSG", 5, 3)));
        assert!(extraction.get(Region::Fr1).is_none());
    }

    #[test]
    fn test_extract_synthesizes_fr1() {
        let seq = "QVQLVQSGAEVKKPGASVKVSCKASGYTFT";
        let segments = vec![Segment::new("1", 25, 5)];
        let extraction = extract(seq, &segments, &labels(&[("1", "CDR1")]));

        assert_eq!(extraction.get(Region::Cdr1), Some(("GYTFT", 25, 5)));
        assert_eq!(
            extraction.get(Region::Fr1),
            Some(("QVQLVQSGAEVKKPGASVKVSCKAS", 0, 25))
        );
    }

    #[test]
    fn test_extract_drops_out_of_bounds_and_unmapped() {
        let seq = "ACDEFGHIK";
        let segments = vec![
            Segment::new("1", 2, 3),
            Segment::new("2", 7, 5),
            Segment::new("9", 0, 2),
            Segment::new("3", 0, 1),
        ];
        let extraction = extract(
            seq,
            &segments,
            &labels(&[("1", "CDR1"), ("2", "CDR2"), ("3", "V gene")]),
        );

        assert_eq!(extraction.regions().collect::<Vec<_>>(), vec![Region::Fr1, Region::Cdr1]);
        assert_eq!(extraction.get(Region::Fr1), Some(("AC", 0, 2)));
    }

    #[test]
    fn test_extract_keeps_slicing_order() {
        let seq = "QVQLVQSGAEVKKPGASVKVSCKASGYTFT";
        let segments = parse_annotations("3:K+3|1:5+5|2:A+2");
        let extraction = extract(
            seq,
            &segments,
            &labels(&[("1", "CDR1"), ("2", "CDR2"), ("3", "CDR3")]),
        );

        assert_eq!(
            extraction.sliced().collect::<Vec<_>>(),
            vec![Region::Cdr1, Region::Cdr2, Region::Cdr3, Region::Fr1]
        );
        assert_eq!(
            extraction.regions().collect::<Vec<_>>(),
            vec![Region::Fr1, Region::Cdr1, Region::Cdr2, Region::Cdr3]
        );
    }

    #[test]
    fn test_encode_token() {
        assert_eq!(encode_token("12", 40, 2), "12:14+2");
        assert_eq!(encode_token("3", 0, 0), "3:0+0");
    }

    #[test]
    fn test_code_registry_is_stable_in_encounter_order() {
        let mut registry = CodeRegistry::starting_after(&labels(&[
            ("1", "CDR1"),
            ("7", "CDR3"),
            ("x", "other"),
        ]));

        assert_eq!(registry.assign("Fragmentation (DP)"), 8);
        assert_eq!(registry.assign("Missing Cysteines"), 9);
        assert_eq!(registry.assign("Fragmentation (DP)"), 8);
        assert_eq!(registry.len(), 2);

        assert_eq!(
            registry.to_label_map(),
            labels(&[("8", "Fragmentation (DP)"), ("9", "Missing Cysteines")])
        );
    }

    #[test]
    fn test_code_registry_without_numeric_labels_starts_at_zero() {
        let mut registry = CodeRegistry::starting_after(&LabelMap::new());
        assert_eq!(registry.assign("Out of frame"), 0);
        assert_eq!(registry.code("Out of frame"), Some(0));
        assert_eq!(registry.code("Contains stop codon"), None);
    }
}
