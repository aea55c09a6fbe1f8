// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Template`] text with `<placeholder>`s of a `Scenario Outline`.

use derive_more::with_trait::Display;
use lazy_regex::regex;

/// Part of a [`Template`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    /// Text taken verbatim.
    Literal(String),

    /// `<name>` to be substituted with an `Examples` value.
    Placeholder(String),
}

/// Text split into [`Segment`]s once, so substituting every `Examples` row
/// doesn't re-scan the `<name>` syntax.
#[derive(Clone, Debug, Default, Display, Eq)]
#[display("{source}")]
pub struct Template {
    /// Original text, placeholders included.
    source: String,

    /// [`Segment`]s of the [`Template::source`].
    segments: Vec<Segment>,
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Template {
    /// Splits the given `source` into [`Segment`]s.
    #[must_use]
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in regex!(r"<([^<>\r\n]+)>").captures_iter(&source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(
                    source[last..whole.start()].to_owned(),
                ));
            }
            segments.push(Segment::Placeholder(name.as_str().to_owned()));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_owned()));
        }
        Self { source, segments }
    }

    /// Returns the original text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the [`Segment`]s of this [`Template`].
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Indicates whether this [`Template`] has no placeholders.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Substitutes placeholders with values returned by `lookup`.
    ///
    /// Placeholders `lookup` knows nothing about are kept verbatim, while an
    /// empty value substitutes an empty string.
    #[must_use]
    pub fn render<'v>(&self, lookup: impl Fn(&str) -> Option<&'v str>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match lookup(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('<');
                        out.push_str(name);
                        out.push('>');
                    }
                },
            }
        }
        out
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Self::parse(source)
    }
}
