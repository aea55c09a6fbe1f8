// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for composing CLI options.
//!
//! The main thing in this module is [`Opts`], which compounds options of
//! the [`Runner`] and [`Writer`] with the common filtering and
//! configuration options. Custom options may be added via its `Custom`
//! type parameter:
//!
//! ```rust,no_run
//! # use stepwise::cli;
//! #[derive(clap::Args)]
//! struct CustomOpts {
//!     /// Base URL of the application under test.
//!     #[arg(long)]
//!     base_url: Option<String>,
//! }
//!
//! let opts = cli::Opts::<
//!     stepwise::runner::Cli,
//!     stepwise::writer::basic::Cli,
//!     CustomOpts,
//! >::parsed();
//! # drop(opts);
//! ```
//!
//! [`Runner`]: crate::Runner
//! [`Writer`]: crate::Writer

use std::path::PathBuf;

use clap::{Args, Parser};
use regex::Regex;

use crate::{tag::TagOperation, writer::Coloring};

/// Root CLI (command line interface) of a top-level [`Suite`] executor.
///
/// It combines all the nested CLIs of [`Runner`] and [`Writer`],
/// and may be extended with custom CLI options additionally.
///
/// [`Runner`]: crate::Runner
/// [`Suite`]: crate::Suite
/// [`Writer`]: crate::Writer
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "stepwise", about = "Run Gherkin scenarios.")]
pub struct Opts<Runner, Writer, Custom = Empty>
where
    Runner: Args,
    Writer: Args,
    Custom: Args,
{
    /// Regex to filter scenarios by their name.
    #[arg(
        id = "name",
        long = "name",
        short = 'n',
        value_name = "regex",
        visible_alias = "scenario-name",
        global = true
    )]
    pub re_filter: Option<Regex>,

    /// Tag expression to filter scenarios by.
    ///
    /// Note: Tags from Feature and Examples are considered too.
    #[arg(
        id = "tags",
        long = "tags",
        short = 't',
        value_name = "tagexpr",
        conflicts_with = "name",
        global = true
    )]
    pub tags_filter: Option<TagOperation>,

    /// YAML configuration file.
    #[arg(long, value_name = "path", global = true)]
    pub config: Option<PathBuf>,

    /// Environment overlay of the configuration file
    /// (`environments/<env>.yaml` next to it).
    #[arg(long, value_name = "name", requires = "config", global = true)]
    pub env: Option<String>,

    /// [`Runner`] CLI options.
    ///
    /// [`Runner`]: crate::Runner
    #[command(flatten)]
    pub runner: Runner,

    /// [`Writer`] CLI options.
    ///
    /// [`Writer`]: crate::Writer
    #[command(flatten)]
    pub writer: Writer,

    /// Additional custom CLI options.
    #[command(flatten)]
    pub custom: Custom,
}

impl<Runner, Writer, Custom> Opts<Runner, Writer, Custom>
where
    Runner: Args,
    Writer: Args,
    Custom: Args,
{
    /// Shortcut for [`clap::Parser::parse()`], which doesn't require the
    /// trait being imported.
    #[must_use]
    pub fn parsed() -> Self {
        <Self as Parser>::parse()
    }
}

/// Indication whether a [`Writer`] using CLI options supports colored
/// output.
///
/// [`Writer`]: crate::Writer
pub trait Colored {
    /// Returns [`Coloring`] indicating whether a [`Writer`] using CLI options
    /// supports colored output or not.
    ///
    /// [`Writer`]: crate::Writer
    #[must_use]
    fn coloring(&self) -> Coloring {
        Coloring::Never
    }
}

/// Empty CLI options.
#[derive(Args, Clone, Copy, Debug, Default)]
#[group(skip)]
pub struct Empty;

impl Colored for Empty {}

/// Composes two [`clap::Args`] derivers together.
#[derive(Args, Clone, Copy, Debug, Default)]
#[group(skip)]
pub struct Compose<L: Args, R: Args> {
    /// Left [`clap::Args`] deriver.
    #[command(flatten)]
    pub left: L,

    /// Right [`clap::Args`] deriver.
    #[command(flatten)]
    pub right: R,
}

impl<L: Args, R: Args> Compose<L, R> {
    /// Unpacks this [`Compose`] into the underlying CLIs.
    #[must_use]
    pub fn into_inner(self) -> (L, R) {
        let Self { left, right } = self;
        (left, right)
    }
}

impl<L, R> Colored for Compose<L, R>
where
    L: Args + Colored,
    R: Args + Colored,
{
    fn coloring(&self) -> Coloring {
        // Basically, founds "maximum" `Coloring` of CLI options.
        match (self.left.coloring(), self.right.coloring()) {
            (Coloring::Always, _) | (_, Coloring::Always) => Coloring::Always,
            (Coloring::Auto, _) | (_, Coloring::Auto) => Coloring::Auto,
            (Coloring::Never, Coloring::Never) => Coloring::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;
    use crate::{runner, tag::Ext as _, writer};

    type DefaultOpts = Opts<runner::Cli, writer::basic::Cli>;

    #[test]
    fn parses_filters_and_nested_options() {
        let opts = DefaultOpts::try_parse_from([
            "stepwise",
            "--tags",
            "@ui and not @wip",
            "--concurrency",
            "4",
            "--retry",
            "2",
            "--step-timeout",
            "1s 500ms",
            "--color",
            "never",
            "-vv",
        ])
        .unwrap();

        let tags = opts.tags_filter.unwrap();
        assert!(tags.eval(["ui"]));
        assert!(!tags.eval(["ui", "wip"]));
        assert_eq!(opts.runner.concurrency, Some(4));
        assert_eq!(opts.runner.retry, Some(2));
        assert_eq!(
            opts.runner.step_timeout.map(|d| *d),
            Some(std::time::Duration::from_millis(1500)),
        );
        assert_eq!(opts.writer.color, Coloring::Never);
        assert_eq!(opts.writer.verbose, 2);
    }

    #[test]
    fn name_conflicts_with_tags() {
        assert!(DefaultOpts::try_parse_from(["stepwise", "-n", "Login", "-t", "@ui"])
            .is_err());
        assert!(DefaultOpts::try_parse_from(["stepwise", "--env", "staging"])
            .is_err());
    }

    #[test]
    fn composed_coloring_takes_maximum() {
        let cli = Compose {
            left: writer::basic::Cli { verbose: 0, color: Coloring::Never },
            right: Empty,
        };
        assert_eq!(cli.coloring(), Coloring::Never);

        let cli = Compose {
            left: writer::basic::Cli { verbose: 0, color: Coloring::Always },
            right: Empty,
        };
        assert_eq!(cli.coloring(), Coloring::Always);
    }
}
