// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default [`Parser`] implementation.

use std::{io, path::Path, vec};

use futures::stream;

use super::{Error, Parser, Result};
use crate::feature::Feature;

/// Default [`Parser`].
///
/// Parses a single `.feature` file, or walks a directory recursively looking
/// for `*.feature` files (case-insensitively). Files are yielded sorted by
/// path, and a failure to read or parse one of them doesn't prevent the
/// others from being parsed.
///
/// As there is no async runtime-agnostic way to interact with io, this
/// [`Parser`] is blocking.
#[derive(Clone, Copy, Debug, Default)]
pub struct Basic;

impl Basic {
    /// Parses every `.feature` file found at the given `path`.
    #[must_use]
    pub fn parse_all(path: impl AsRef<Path>) -> Vec<Result<Feature>> {
        let path = path.as_ref();
        if !path.exists() {
            let err = io::Error::new(io::ErrorKind::NotFound, "no such path");
            return vec![Err(Error::io(path, err))];
        }
        if path.is_file() {
            return vec![Feature::parse_path(path)];
        }

        let walker = globwalk::GlobWalkerBuilder::new(path, "*.feature")
            .case_insensitive(true)
            .build();
        let mut files = match walker {
            Ok(walker) => walker
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>(),
            Err(e) => return vec![Err(Error::io(path, io::Error::other(e)))],
        };
        files.sort();

        tracing::debug!(
            dir = %path.display(),
            count = files.len(),
            "found feature files",
        );
        files.into_iter().map(Feature::parse_path).collect()
    }
}

impl<I: AsRef<Path>> Parser<I> for Basic {
    type Output = stream::Iter<vec::IntoIter<Result<Feature>>>;

    fn parse(self, path: I) -> Self::Output {
        stream::iter(Self::parse_all(path))
    }
}
