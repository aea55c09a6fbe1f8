// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for terminal output.

use std::{borrow::Cow, io};

use console::Style;

use super::Coloring;
use crate::report::Status;

/// [`Style`]s for terminal output.
#[derive(Clone, Debug)]
pub struct Styles {
    /// [`Style`] for rendering successful events.
    pub ok: Style,

    /// [`Style`] for rendering skipped events.
    pub skipped: Style,

    /// [`Style`] for rendering failed events.
    pub err: Style,

    /// [`Style`] for rendering retried events.
    pub retry: Style,

    /// [`Style`] for rendering header.
    pub header: Style,

    /// [`Style`] for rendering __bold__.
    pub bold: Style,

    /// Indicates whether the terminal was detected.
    pub is_present: bool,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            ok: Style::new().green(),
            skipped: Style::new().cyan(),
            err: Style::new().red(),
            retry: Style::new().magenta(),
            header: Style::new().blue(),
            bold: Style::new().bold(),
            is_present: console::colors_enabled(),
        }
    }
}

impl Styles {
    /// Creates new [`Styles`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the given [`Coloring`] to these [`Styles`].
    pub fn apply_coloring(&mut self, color: Coloring) {
        match color {
            Coloring::Auto => {}
            Coloring::Always => {
                self.is_present = true;
                for style in [
                    &mut self.ok,
                    &mut self.skipped,
                    &mut self.err,
                    &mut self.retry,
                    &mut self.header,
                    &mut self.bold,
                ] {
                    *style = style.clone().force_styling(true);
                }
            }
            Coloring::Never => self.is_present = false,
        }
    }

    /// Paints the `input` according to the given [`Status`].
    #[must_use]
    pub fn status<'a>(
        &self,
        status: Status,
        input: impl Into<Cow<'a, str>>,
    ) -> Cow<'a, str> {
        match status {
            Status::Passed => self.ok(input),
            Status::Skipped => self.skipped(input),
            Status::Failed | Status::Errored => self.err(input),
        }
    }

    /// If terminal is present colors `input` with [`Styles::ok`] color or
    /// leaves "as is" otherwise.
    #[must_use]
    pub fn ok<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.paint(&self.ok, input)
    }

    /// If terminal is present colors `input` with [`Styles::skipped`] color
    /// or leaves "as is" otherwise.
    #[must_use]
    pub fn skipped<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.paint(&self.skipped, input)
    }

    /// If terminal is present colors `input` with [`Styles::err`] color or
    /// leaves "as is" otherwise.
    #[must_use]
    pub fn err<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.paint(&self.err, input)
    }

    /// If terminal is present colors `input` with [`Styles::retry`] color or
    /// leaves "as is" otherwise.
    #[must_use]
    pub fn retry<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.paint(&self.retry, input)
    }

    /// If terminal is present colors `input` with [`Styles::header`] color
    /// or leaves "as is" otherwise.
    #[must_use]
    pub fn header<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.paint(&self.header, input)
    }

    /// If terminal is present makes `input` __bold__ or leaves "as is"
    /// otherwise.
    #[must_use]
    pub fn bold<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.paint(&self.bold, input)
    }

    fn paint<'a>(
        &self,
        style: &Style,
        input: impl Into<Cow<'a, str>>,
    ) -> Cow<'a, str> {
        if self.is_present {
            style.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }
}

/// [`io::Write`] extension for easier manipulation with strings.
pub trait WriteStrExt: io::Write {
    /// Writes the given `string` into this writer.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_str(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write_all(string.as_ref().as_bytes())
    }

    /// Writes the given `string` into this writer followed by a newline.
    ///
    /// # Errors
    ///
    /// If this writer fails to write the given `string`.
    fn write_line(&mut self, string: impl AsRef<str>) -> io::Result<()> {
        self.write_str(string.as_ref())?;
        self.write_str("\n")
    }
}

impl<T: io::Write + ?Sized> WriteStrExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_coloring_leaves_text_as_is() {
        let mut styles = Styles::new();
        styles.apply_coloring(Coloring::Never);
        assert_eq!(styles.status(Status::Failed, "✘ login"), "✘ login");

        styles.apply_coloring(Coloring::Always);
        assert_ne!(styles.ok("✔ login"), "✔ login");
    }

    #[test]
    fn always_coloring_styles_without_terminal() {
        let mut styles = Styles::new();
        styles.apply_coloring(Coloring::Always);

        let painted = styles.err("✘ login");
        assert!(painted.starts_with("\u{1b}["), "{painted:?}");
        assert!(painted.contains("✘ login"));
    }

    #[test]
    fn writes_lines() {
        let mut buf = Vec::new();
        buf.write_line("Feature: Login").unwrap();
        buf.write_str("  Scenario").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Feature: Login\n  Scenario");
    }
}
