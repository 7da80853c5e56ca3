//! Data layer for antibody liability annotation
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This crate holds everything that touches raw records: the base-36
//! positional codec used inside annotation strings, the annotation
//! parser and region extractor, the region/column schema and the
//! in-memory tab-separated table the tools read and write.

pub mod codec;
pub mod record;
pub mod region;
pub mod table;

pub use codec::{decode, encode, DecodeError};
pub use record::{extract, parse_annotations, CodeRegistry, Extraction, LabelMap, Segment};
pub use region::{capitalize, normalize_header, ColumnKey, ColumnKind, Region, RegionKind};
pub use table::{Cell, Table, TableError};
