// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default [`Writer`] implementation.

use std::{io, str::FromStr};

use async_trait::async_trait;
use itertools::Itertools as _;
use smart_default::SmartDefault;

use crate::{
    cli::Colored,
    event,
    feature::{self, Pickle},
    parser,
    report::{Counts, Report, ScenarioResult, Status, StepResult},
    writer::out::{Styles, WriteStrExt as _},
    Event, Writer,
};

/// CLI options of a [`Basic`] [`Writer`].
#[derive(Clone, Copy, Debug, SmartDefault, clap::Args)]
#[group(skip)]
pub struct Cli {
    /// Verbosity of an output.
    ///
    /// By default only failing steps are shown, `-v` outputs every step,
    /// `-vv` additionally outputs scenario's tags and [Examples] values.
    ///
    /// [Examples]: https://cucumber.io/docs/gherkin/reference#examples
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Coloring policy for a console output.
    #[arg(
        long,
        value_name = "auto|always|never",
        default_value = "auto",
        global = true
    )]
    #[default(Coloring::Auto)]
    pub color: Coloring,
}

impl Colored for Cli {
    fn coloring(&self) -> Coloring {
        self.color
    }
}

/// Possible policies of a [`console`] output coloring.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Coloring {
    /// Letting [`console::colors_enabled()`] to decide, whether output should
    /// be colored.
    Auto,

    /// Forcing of a colored output.
    Always,

    /// Forcing of a non-colored output.
    Never,
}

impl FromStr for Coloring {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err("possible options: auto, always, never"),
        }
    }
}

/// Default [`Writer`] implementation outputting to an [`io::Write`]
/// implementor ([`io::Stdout`] by default).
///
/// Scenarios are rendered once finished, so concurrently executed ones never
/// interleave. A summary is rendered at the end of an execution.
#[derive(Debug)]
pub struct Basic<Out: io::Write = io::Stdout> {
    /// [`io::Write`] implementor to write the output into.
    output: Out,

    /// [`Styles`] for terminal output.
    styles: Styles,

    /// Minimal verbosity, CLI `-v` flags add up to it.
    verbosity: u8,

    /// Results accounted for the final summary.
    report: Report,
}

impl Basic {
    /// Creates a new [`Basic`] [`Writer`] outputting to [`io::Stdout`].
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Coloring::Auto, 0)
    }
}

impl Default for Basic {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<Out: io::Write> Basic<Out> {
    /// Creates a new [`Basic`] [`Writer`] with the given `output`.
    #[must_use]
    pub fn new(output: Out, color: Coloring, verbosity: u8) -> Self {
        let mut styles = Styles::new();
        styles.apply_coloring(color);
        Self { output, styles, verbosity, report: Report::new() }
    }

    /// Returns the [`io::Write`] implementor this [`Basic`] [`Writer`]
    /// outputs to.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    fn line(&mut self, line: impl AsRef<str>) {
        self.output
            .write_line(line)
            .unwrap_or_else(|e| panic!("Failed to write into terminal: {e}"));
    }

    fn parsing_failed(&mut self, err: &parser::Error) {
        let msg = self.styles.err(format!("\u{2718}  {err}")).into_owned();
        self.line(msg);
    }

    fn feature_started(&mut self, feat: &feature::Feature) {
        let path = feat
            .path
            .as_ref()
            .map(|p| format!(" ({})", p.display()))
            .unwrap_or_default();
        let msg = self
            .styles
            .header(format!("Feature: {}{path}", feat.name))
            .into_owned();
        self.line(msg);
    }

    fn retrying(&mut self, pickle: &Pickle, attempt: usize) {
        let msg = self
            .styles
            .retry(format!(
                "  \u{21bb}  Scenario: {} (attempt {attempt})",
                pickle.name,
            ))
            .into_owned();
        self.line(msg);
    }

    fn scenario_finished(&mut self, res: &ScenarioResult, verbosity: u8) {
        let mark = match res.status {
            Status::Passed => "\u{2714}",
            Status::Skipped => "?",
            Status::Failed | Status::Errored => "\u{2718}",
        };
        let attempts = if res.attempts > 1 {
            format!(", {} attempts", res.attempts)
        } else {
            String::new()
        };
        let header = self
            .styles
            .status(
                res.status,
                format!(
                    "  {mark}  Scenario: {} (line {}{attempts})",
                    res.name, res.line,
                ),
            )
            .into_owned();
        self.line(header);

        if verbosity > 1 {
            if !res.tags.is_empty() {
                let tags = res.tags.iter().map(|t| format!("@{t}")).join(" ");
                self.line(format!("      {tags}"));
            }
            if let Some(ex) = &res.example {
                let values =
                    ex.values.iter().map(|(k, v)| format!("{k}={v:?}")).join(", ");
                self.line(format!("      Example: {values}"));
            }
        }
        if let Some(err) = &res.error {
            let msg = self.styles.err(format!("      {err}")).into_owned();
            self.line(msg);
        }

        let failing = res.failed_step().map(|s| s.line);
        for (is_bg, step) in res
            .background
            .iter()
            .map(|s| (true, s))
            .chain(res.steps.iter().map(|s| (false, s)))
        {
            if verbosity > 0 || Some(step.line) == failing {
                self.step(step, is_bg);
            }
        }
    }

    fn step(&mut self, step: &StepResult, is_bg: bool) {
        let mark = match step.status {
            Status::Passed => "\u{2714}",
            Status::Skipped => "?",
            Status::Failed | Status::Errored => "\u{2718}",
        };
        let bg = if is_bg { "> " } else { "" };
        let suffix = match step.status {
            Status::Skipped => " (skipped)".to_owned(),
            _ => step
                .location
                .map(|l| format!(" ({l})"))
                .unwrap_or_default(),
        };
        let msg = self
            .styles
            .status(
                step.status,
                format!("      {mark}  {bg}{} {}{suffix}", step.keyword, step.text),
            )
            .into_owned();
        self.line(msg);

        if let Some(err) = &step.error {
            let msg = self
                .styles
                .err(
                    err.to_string()
                        .lines()
                        .map(|l| format!("         {l}"))
                        .join("\n"),
                )
                .into_owned();
            self.line(msg);
        }
    }

    fn summary(&mut self) {
        let stats = self.report.stats();
        let features = self.report.features().len();
        let mut lines = vec![
            self.styles.bold("[Summary]").into_owned(),
            format!("{features} feature{}", if features == 1 { "" } else { "s" }),
            format!(
                "{} scenario{} {}",
                stats.scenarios.total(),
                if stats.scenarios.total() == 1 { "" } else { "s" },
                self.counts(&stats.scenarios),
            ),
            format!(
                "{} step{} {}",
                stats.steps.total(),
                if stats.steps.total() == 1 { "" } else { "s" },
                self.counts(&stats.steps),
            ),
        ];
        if stats.retries > 0 {
            lines.push(self.styles.retry(format!("{} retries", stats.retries)).into_owned());
        }
        if stats.parsing_errors > 0 {
            lines.push(
                self.styles
                    .err(format!("{} parsing errors", stats.parsing_errors))
                    .into_owned(),
            );
        }
        for line in lines {
            self.line(line);
        }
    }

    fn counts(&self, c: &Counts) -> String {
        let parts = [
            (c.passed, Status::Passed),
            (c.failed, Status::Failed),
            (c.errored, Status::Errored),
            (c.skipped, Status::Skipped),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, st)| self.styles.status(st, format!("{n} {st}")).into_owned())
        .join(", ");
        if parts.is_empty() {
            String::new()
        } else {
            format!("({parts})")
        }
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Writer for Basic<Out> {
    type Cli = Cli;

    async fn handle_event(&mut self, ev: Event<event::Cucumber>, cli: &Self::Cli) {
        use event::{Cucumber, Feature, Scenario};

        self.report.record(&ev);
        match &*ev {
            Cucumber::Started => self.styles.apply_coloring(cli.color),
            Cucumber::ParsingFailed(err) => self.parsing_failed(err),
            Cucumber::Feature(f, Feature::Started) => self.feature_started(f),
            Cucumber::Feature(_, Feature::Scenario(p, Scenario::Started { attempt }))
                if *attempt > 1 =>
            {
                self.retrying(p, *attempt);
            }
            Cucumber::Feature(_, Feature::Scenario(_, Scenario::Finished(res))) => {
                let verbosity = self.verbosity.saturating_add(cli.verbose);
                self.scenario_finished(res, verbosity);
            }
            Cucumber::Feature(..) => {}
            Cucumber::Finished => self.summary(),
        }
    }
}
