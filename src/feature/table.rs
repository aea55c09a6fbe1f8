// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pipe-delimited data [`Table`]s attached to [`Step`]s and `Examples`.
//!
//! [`Step`]: super::Step

use std::{cmp, fmt::Write as _};

use itertools::Itertools as _;
use linked_hash_map::LinkedHashMap;

/// Data table of a [`Step`] or of an `Examples` block.
///
/// The first row is treated as a header by [`Table::hashes()`]. Every row has
/// the same number of cells, which is enforced by the parser.
///
/// ```rust
/// use stepwise::feature::Table;
///
/// let table = Table::from(vec![
///     vec!["username", "email"],
///     vec!["johndoe", "john@example.com"],
/// ]);
///
/// let rows = table.hashes();
/// assert_eq!(rows[0]["email"], "john@example.com");
/// ```
///
/// [`Step`]: super::Step
#[derive(Clone, Debug, Default)]
pub struct Table {
    /// Rows of this [`Table`], header included.
    rows: Vec<Vec<String>>,

    /// Line of the first row in the `.feature` file.
    pub line: usize,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl Table {
    /// Creates a new [`Table`] out of the given `rows`.
    #[must_use]
    pub const fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows, line: 0 }
    }

    /// Sets the line of the first row.
    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Returns all the rows, header included.
    #[must_use]
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the header row, if any.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Returns the rows without the header.
    #[must_use]
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or_default()
    }

    /// Returns the line of the `n`th body row (0-based, header excluded).
    #[must_use]
    pub const fn body_line(&self, n: usize) -> usize {
        self.line + n + 1
    }

    /// Converts the body rows into maps keyed by the header cells, keeping the
    /// column order.
    #[must_use]
    pub fn hashes(&self) -> Vec<LinkedHashMap<String, String>> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        self.body()
            .iter()
            .map(|row| header.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    /// Converts a two-column table into a key → value map.
    ///
    /// Returns [`None`] if any row doesn't have exactly 2 cells.
    #[must_use]
    pub fn rows_hash(&self) -> Option<LinkedHashMap<String, String>> {
        self.rows
            .iter()
            .map(|row| match row.as_slice() {
                [k, v] => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect()
    }

    /// Returns a transposed copy of this [`Table`].
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut transposed = vec![Vec::new(); self.width()];
        for row in &self.rows {
            for (col, cell) in transposed.iter_mut().zip(row) {
                col.push(cell.clone());
            }
        }
        Self { rows: transposed, line: self.line }
    }

    /// Returns a copy of this [`Table`] with every cell mapped by `f`.
    #[must_use]
    pub fn map_cells(&self, mut f: impl FnMut(&str) -> String) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|c| f(c)).collect())
                .collect(),
            line: self.line,
        }
    }

    /// Appends a row.
    pub(crate) fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Checks whether this [`Table`] has no rows at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows, header included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Renders this [`Table`] as aligned Gherkin rows, each one prefixed with
    /// `indent` spaces.
    #[must_use]
    pub fn to_gherkin(&self, indent: usize) -> String {
        let cells = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| escape_cell(c)).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let widths = cells.iter().fold(vec![0; self.width()], |mut acc, row| {
            for (max, cell) in acc.iter_mut().zip(row) {
                *max = cmp::max(*max, cell.chars().count());
            }
            acc
        });

        cells
            .iter()
            .map(|row| {
                let mut out = " ".repeat(indent);
                for (cell, len) in row.iter().zip(&widths) {
                    _ = write!(out, "| {cell:len$} ");
                }
                out.push('|');
                out
            })
            .join("\n")
    }
}

impl From<Vec<Vec<&str>>> for Table {
    fn from(rows: Vec<Vec<&str>>) -> Self {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(str::to_owned).collect())
                .collect(),
        )
    }
}

impl From<Vec<Vec<String>>> for Table {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows)
    }
}

/// Escapes `|`, `\` and newlines of a cell value.
fn escape_cell(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    for c in cell.chars() {
        match c {
            '|' => out.push_str("\\|"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Splits a `| a | b |` row into unescaped, trimmed cells.
///
/// Returns [`None`] if the row isn't closed with an unescaped `|`.
pub(crate) fn split_row(row: &str) -> Option<Vec<String>> {
    let inner = row.trim().strip_prefix('|')?;
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut closed = false;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        closed = false;
        match c {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some('n') => cell.push('\n'),
                Some('\\') => cell.push('\\'),
                Some(other) => {
                    cell.push('\\');
                    cell.push(other);
                }
                None => cell.push('\\'),
            },
            '|' => {
                cells.push(cell.trim().to_owned());
                cell.clear();
                closed = true;
            }
            c => cell.push(c),
        }
    }
    closed.then_some(cells)
}
