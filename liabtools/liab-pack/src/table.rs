use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use hashbrown::HashSet;
use thiserror::Error;

use crate::region::normalize_header;

/// a missing cell; empty fields read as `None` and are written back empty
pub type Cell = Option<String>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("duplicate column {0:?}")]
    DuplicateColumn(String),
    #[error("column {name:?} has {found} rows, table has {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// column-major, in-memory tab-separated table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
    height: usize,
}

impl Table {
    /// an empty table with `height` rows and no columns
    pub fn with_height(height: usize) -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            height,
        }
    }

    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: &[Vec<&str>]) -> Result<Self, TableError> {
        let mut table = Table::with_height(rows.len());

        for (idx, name) in names.iter().enumerate() {
            let values = rows
                .iter()
                .map(|row| row.get(idx).filter(|v| !v.is_empty()).map(|v| v.to_string()))
                .collect();
            table.push_column(name.as_ref(), values)?;
        }

        Ok(table)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// parse a TSV with a header row; header names are whitespace-normalized,
    /// short rows are padded with missing cells and surplus fields ignored
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let names = rdr
            .headers()?
            .iter()
            .map(normalize_header)
            .collect::<Vec<_>>();

        // INFO: a header line with a single empty field is an empty file
        let names = match names.as_slice() {
            [only] if only.is_empty() => Vec::new(),
            _ => names,
        };

        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
        let mut height = 0;

        for record in rdr.records() {
            let record = record?;
            for (idx, column) in columns.iter_mut().enumerate() {
                let cell = record
                    .get(idx)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string);
                column.push(cell);
            }
            height += 1;
        }

        let mut table = Table::with_height(height);
        for (name, values) in names.into_iter().zip(columns) {
            table.push_column(&name, values)?;
        }

        Ok(table)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = File::create(path)?;
        self.to_writer(file)
    }

    /// write as TSV without any quoting
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .from_writer(writer);

        if self.names.is_empty() {
            wtr.flush()?;
            return Ok(());
        }

        wtr.write_record(&self.names)?;
        for row in 0..self.height {
            wtr.write_record(
                self.columns
                    .iter()
                    .map(|column| column[row].as_deref().unwrap_or_default()),
            )?;
        }
        wtr.flush()?;

        Ok(())
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.position(name).map(|idx| self.columns[idx].as_slice())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        self.column(name)?.get(row)?.as_deref()
    }

    /// append a new column; fails on an existing name or a row-count mismatch
    pub fn push_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), TableError> {
        if self.has(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        self.check_height(name, &values)?;

        self.names.push(name.to_string());
        self.columns.push(values);

        Ok(())
    }

    /// replace the values of `name` in place, or append it
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), TableError> {
        self.check_height(name, &values)?;

        match self.position(name) {
            Some(idx) => self.columns[idx] = values,
            None => {
                self.names.push(name.to_string());
                self.columns.push(values);
            }
        }

        Ok(())
    }

    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) {
        let dropped = names.iter().map(|n| n.as_ref()).collect::<HashSet<_>>();

        let (names, columns): (Vec<String>, Vec<Vec<Cell>>) = std::mem::take(&mut self.names)
            .into_iter()
            .zip(std::mem::take(&mut self.columns))
            .filter(|(name, _)| !dropped.contains(name.as_str()))
            .unzip();

        self.names = names;
        self.columns = columns;
    }

    /// a new table holding the requested columns in the requested order;
    /// unknown and repeated names are skipped
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let mut selected = Table::with_height(self.height);

        for name in names {
            let name = name.as_ref();
            if let (Some(values), false) = (self.column(name), selected.has(name)) {
                selected.names.push(name.to_string());
                selected.columns.push(values.to_vec());
            }
        }

        selected
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn check_height(&self, name: &str, values: &[Cell]) -> Result<(), TableError> {
        if values.len() != self.height {
            return Err(TableError::ShapeMismatch {
                name: name.to_string(),
                expected: self.height,
                found: values.len(),
            });
        }

        Ok(())
    }
}
