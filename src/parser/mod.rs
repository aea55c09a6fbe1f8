// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for parsing [Gherkin] files.
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

pub mod basic;

use std::{io, path::PathBuf, sync::Arc};

use derive_more::{Display, Error, From};
use futures::Stream;

use crate::feature::{Feature, ParseError};

#[doc(inline)]
pub use self::basic::Basic;

/// Source of parsed [`Feature`]s.
pub trait Parser<I> {
    /// Output [`Stream`] of parsed [`Feature`]s.
    type Output: Stream<Item = Result<Feature>> + 'static;

    /// Parses the given `input` into a [`Stream`] of [`Feature`]s.
    fn parse(self, input: I) -> Self::Output;
}

/// Result of parsing [Gherkin] files.
///
/// [Gherkin]: https://cucumber.io/docs/gherkin/reference
pub type Result<T> = std::result::Result<T, Error>;

/// [`Parser`] error.
///
/// Fatal to a single file only.
#[derive(Clone, Debug, Display, Error, From)]
pub enum Error {
    /// Failed to parse a [`Feature`].
    #[display("Failed to parse feature: {_0}")]
    Parsing(ParseError),

    /// Failed to read a `.feature` file.
    #[display("Failed to read `{}`: {source}", path.display())]
    #[from(skip)]
    Io {
        /// Path that couldn't be read.
        path: PathBuf,

        /// Underlying error.
        source: Arc<io::Error>,
    },
}

impl Error {
    /// Returns the path of the file this [`Error`] relates to, if known.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Parsing(e) => e.path.as_ref(),
            Self::Io { path, .. } => Some(path),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source: Arc::new(source) }
    }
}
