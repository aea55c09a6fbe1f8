// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory model of [Gherkin] `.feature` files.
//!
//! A [`Feature`] owns an optional [`Background`] and a list of [`Scenario`]s.
//! A [`Scenario`] with [`Examples`] is a `Scenario Outline`, which is expanded
//! into one [`Pickle`] per [`Examples`] row before execution.
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

mod display;
mod expand;
pub mod parse;
mod table;
mod template;

use std::{
    fs,
    path::{Path, PathBuf},
};

use derive_more::with_trait::Display;

use crate::parser;

#[doc(inline)]
pub use self::{
    expand::{ExampleRow, Pickle, PickleStep},
    parse::{ParseError, ParseErrorKind},
    table::Table,
    template::{Segment, Template},
};

/// Parsed `.feature` file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Feature {
    /// Name following the `Feature:` keyword.
    pub name: String,

    /// Free-form text below the `Feature:` line.
    pub description: Option<String>,

    /// Tags above the `Feature:` keyword, without the leading `@`.
    ///
    /// They apply to every [`Scenario`] of this [`Feature`].
    pub tags: Vec<String>,

    /// Steps implicitly prepended to every [`Scenario`].
    pub background: Option<Background>,

    /// [`Scenario`]s in file order.
    pub scenarios: Vec<Scenario>,

    /// Path of the file this [`Feature`] was read from, if any.
    pub path: Option<PathBuf>,

    /// Line of the `Feature:` keyword.
    pub line: usize,
}

impl Feature {
    /// Parses a [`Feature`] out of the given `.feature` file contents.
    ///
    /// # Errors
    ///
    /// If the `input` isn't a well-formed `.feature` file.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        parse::parse(input, None)
    }

    /// Same as [`Feature::parse_str()`], but remembers the `path` the `input`
    /// was read from, so errors and reports can point to it.
    ///
    /// # Errors
    ///
    /// If the `input` isn't a well-formed `.feature` file.
    pub fn parse_source(
        input: &str,
        path: impl Into<PathBuf>,
    ) -> Result<Self, ParseError> {
        parse::parse(input, Some(path.into()))
    }

    /// Reads and parses the `.feature` file at the given `path`.
    ///
    /// # Errors
    ///
    /// If the file cannot be read, or isn't a well-formed `.feature` file.
    pub fn parse_path(path: impl AsRef<Path>) -> parser::Result<Self> {
        let path = path.as_ref();
        let input = fs::read_to_string(path)
            .map_err(|e| parser::Error::io(path, e))?;
        Ok(Self::parse_source(&input, path)?)
    }

    /// Expands every [`Scenario`] of this [`Feature`] into [`Pickle`]s, in
    /// file order.
    #[must_use]
    pub fn pickles(&self) -> Vec<Pickle> {
        self.scenarios.iter().flat_map(|sc| sc.expand(self)).collect()
    }

    /// Renders this [`Feature`] back into Gherkin text.
    #[must_use]
    pub fn to_gherkin(&self) -> String {
        self.to_string()
    }
}

/// `Background:` section of a [`Feature`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Background {
    /// Optional name following the `Background:` keyword.
    pub name: String,

    /// Free-form text below the `Background:` line.
    pub description: Option<String>,

    /// [`Step`]s to run before every [`Scenario`]'s own ones.
    pub steps: Vec<Step>,

    /// Line of the `Background:` keyword.
    pub line: usize,
}

/// `Scenario:` or `Scenario Outline:` of a [`Feature`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scenario {
    /// Name following the keyword, possibly containing `<placeholder>`s.
    pub name: String,

    /// Free-form text below the keyword line.
    pub description: Option<String>,

    /// Tags directly above this [`Scenario`], without the leading `@`.
    pub tags: Vec<String>,

    /// [`Step`]s in declared order.
    pub steps: Vec<Step>,

    /// `Examples` blocks. Non-empty for a `Scenario Outline`.
    pub examples: Vec<Examples>,

    /// Line of the keyword.
    pub line: usize,
}

impl Scenario {
    /// Indicates whether this [`Scenario`] is a `Scenario Outline`.
    #[must_use]
    pub fn is_outline(&self) -> bool {
        !self.examples.is_empty()
    }
}

/// `Examples:` block of a `Scenario Outline`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Examples {
    /// Optional name following the `Examples:` keyword.
    pub name: String,

    /// Tags directly above this block, without the leading `@`.
    pub tags: Vec<String>,

    /// Values, the first row being the header of placeholder names.
    pub table: Table,

    /// Line of the `Examples:` keyword.
    pub line: usize,
}

/// Keyword a [`Step`] is written with.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Keyword {
    /// `Given`.
    #[display("Given")]
    Given,

    /// `When`.
    #[display("When")]
    When,

    /// `Then`.
    #[display("Then")]
    Then,

    /// `And`, inheriting the previous [`StepType`].
    #[display("And")]
    And,

    /// `But`, inheriting the previous [`StepType`].
    #[display("But")]
    But,

    /// `*`, inheriting the previous [`StepType`].
    #[display("*")]
    Star,
}

impl Keyword {
    /// All the [`Keyword`]s, in the order the parser tries them.
    pub const ALL: [Self; 6] = [
        Self::Given,
        Self::When,
        Self::Then,
        Self::And,
        Self::But,
        Self::Star,
    ];

    /// Returns the text of this [`Keyword`] as written in `.feature` files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
            Self::Star => "*",
        }
    }

    /// Returns the [`StepType`] this [`Keyword`] denotes by itself, if it's
    /// not a conjunction.
    #[must_use]
    pub const fn step_type(self) -> Option<StepType> {
        match self {
            Self::Given => Some(StepType::Given),
            Self::When => Some(StepType::When),
            Self::Then => Some(StepType::Then),
            Self::And | Self::But | Self::Star => None,
        }
    }
}

/// Semantic type of a [`Step`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StepType {
    /// Context set up.
    Given,

    /// Action.
    When,

    /// Outcome check.
    Then,
}

/// Single line of behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// [`Keyword`] this [`Step`] is written with.
    pub keyword: Keyword,

    /// Semantic type, resolved from the [`Keyword`] and preceding steps.
    pub ty: StepType,

    /// Text following the [`Keyword`].
    pub text: Template,

    /// Attached data table.
    pub table: Option<Table>,

    /// Attached doc string.
    pub docstring: Option<DocString>,

    /// Line of this [`Step`].
    pub line: usize,
}

impl Step {
    /// Creates a new [`Step`] without any attachments.
    #[must_use]
    pub fn new(keyword: Keyword, ty: StepType, text: impl Into<Template>) -> Self {
        Self {
            keyword,
            ty,
            text: text.into(),
            table: None,
            docstring: None,
            line: 0,
        }
    }

    /// Iterates over every placeholder referenced by this [`Step`]'s text,
    /// table cells and doc string.
    pub fn placeholders(&self) -> impl Iterator<Item = String> + '_ {
        let text = self.text.placeholders().map(str::to_owned);
        let table = self.table.iter().flat_map(|t| {
            t.raw().iter().flatten().flat_map(|cell| {
                Template::parse(cell.as_str())
                    .placeholders()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
        });
        let doc = self.docstring.iter().flat_map(|d| {
            Template::parse(d.content.as_str())
                .placeholders()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        });
        text.chain(table).chain(doc)
    }
}

/// Multi-line text argument of a [`Step`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DocString {
    /// Content between the delimiters, with the delimiter's indentation
    /// stripped.
    pub content: String,

    /// Media type following the opening delimiter, if any.
    pub media_type: Option<String>,
}
