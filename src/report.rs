// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Immutable results of an execution and their aggregated [`Report`].

use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

use derive_more::with_trait::{Display, Error};
use serde::Serialize;

use crate::{
    driver::DriverError,
    event::{self, HookType},
    feature::{self, ExampleRow, Keyword, PickleStep, StepType},
    parser,
    step::{
        AmbiguousStepError, ArgumentError, Failure, Location, ResolveError,
        UndefinedStepError,
    },
};

/// Final status of a step or a scenario.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Everything succeeded.
    #[display("passed")]
    Passed,

    /// An assertion didn't hold.
    #[display("failed")]
    Failed,

    /// Not executed.
    #[display("skipped")]
    Skipped,

    /// An unexpected fault happened.
    #[display("errored")]
    Errored,
}

impl Status {
    /// Indicates whether this [`Status`] is [`Status::Failed`] or
    /// [`Status::Errored`].
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Errored)
    }
}

/// Reason of a step not passing.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StepError {
    /// No step definition matches the step.
    Undefined(UndefinedStepError),

    /// Multiple step definitions match the step.
    Ambiguous(AmbiguousStepError),

    /// Captured argument doesn't fit its parameter.
    Argument(ArgumentError),

    /// Checked expectation doesn't hold.
    Assertion {
        /// What was checked.
        message: String,

        /// Expected value, if known.
        expected: Option<String>,

        /// Actual value, if known.
        actual: Option<String>,
    },

    /// Step function panicked.
    Panic(#[error(not(source))] String),

    /// Step didn't finish in time.
    Timeout(#[error(not(source))] Duration),

    /// Collaborator fault.
    Collaborator(DriverError),
}

impl StepError {
    /// Returns the [`Status`] a step finishes with because of this
    /// [`StepError`].
    ///
    /// Assertions and panics fail a step, anything else errors it.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Assertion { .. } | Self::Panic(_) => Status::Failed,
            Self::Undefined(_)
            | Self::Ambiguous(_)
            | Self::Argument(_)
            | Self::Timeout(_)
            | Self::Collaborator(_) => Status::Errored,
        }
    }

    /// Returns a short machine-readable name of this [`StepError`] kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Undefined(_) => "undefined",
            Self::Ambiguous(_) => "ambiguous",
            Self::Argument(_) => "argument",
            Self::Assertion { .. } => "assertion",
            Self::Panic(_) => "panic",
            Self::Timeout(_) => "timeout",
            Self::Collaborator(_) => "collaborator",
        }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined(e) => write!(f, "{e}"),
            Self::Ambiguous(e) => write!(f, "{e}"),
            Self::Argument(e) => write!(f, "{e}"),
            Self::Assertion { message, expected, actual } => {
                fmt::Display::fmt(
                    &Failure::Assertion {
                        message: message.clone(),
                        expected: expected.clone(),
                        actual: actual.clone(),
                    },
                    f,
                )
            }
            Self::Panic(msg) => write!(f, "step panicked: {msg}"),
            Self::Timeout(d) => {
                write!(f, "step timed out after {}", humantime::format_duration(*d))
            }
            Self::Collaborator(e) => write!(f, "{e}"),
        }
    }
}

impl From<Failure> for StepError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Assertion { message, expected, actual } => {
                Self::Assertion { message, expected, actual }
            }
            Failure::Timeout(d) => Self::Timeout(d),
            Failure::Collaborator(e) => Self::Collaborator(e),
            Failure::Argument(e) => Self::Argument(e),
        }
    }
}

impl From<ResolveError> for StepError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Undefined(e) => Self::Undefined(e),
            ResolveError::Ambiguous(e) => Self::Ambiguous(e),
            ResolveError::Argument(e) => Self::Argument(e),
        }
    }
}

/// Outcome of a single step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    /// Keyword the step is written with.
    pub keyword: Keyword,

    /// Semantic type of the step.
    pub ty: StepType,

    /// Substituted text of the step.
    pub text: String,

    /// Line of the step in its file.
    pub line: usize,

    /// Final [`Status`].
    pub status: Status,

    /// Reason of not passing, if any.
    pub error: Option<StepError>,

    /// [`Location`] of the matched step definition, if resolved.
    pub location: Option<Location>,

    /// Time spent executing the step.
    pub duration: Duration,
}

impl StepResult {
    /// Creates a [`StepResult`] of the given `step` that wasn't executed.
    #[must_use]
    pub fn skipped(step: &PickleStep) -> Self {
        Self {
            keyword: step.keyword,
            ty: step.ty,
            text: step.text.clone(),
            line: step.line,
            status: Status::Skipped,
            error: None,
            location: None,
            duration: Duration::ZERO,
        }
    }

    /// Creates a [`StepResult`] of the given executed `step`.
    #[must_use]
    pub fn executed(
        step: &PickleStep,
        location: Option<Location>,
        error: Option<StepError>,
        duration: Duration,
    ) -> Self {
        Self {
            status: error.as_ref().map_or(Status::Passed, StepError::status),
            error,
            location,
            duration,
            ..Self::skipped(step)
        }
    }
}

/// Fault not attributed to any step.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum ScenarioError {
    /// [`World`] couldn't be created.
    ///
    /// [`World`]: crate::World
    #[display("failed to create world: {_0}")]
    World(#[error(not(source))] String),

    /// Hook failed or panicked.
    #[display("{which} hook failed: {message}")]
    Hook {
        /// Which hook failed.
        which: HookType,

        /// Failure description.
        message: String,
    },
}

/// Outcome of a single scenario (or an [Examples] row of an outline).
///
/// [Examples]: https://cucumber.io/docs/gherkin/reference#examples
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioResult {
    /// Name of the feature.
    pub feature: String,

    /// Path of the feature file, if known.
    pub path: Option<PathBuf>,

    /// Substituted name of the scenario.
    pub name: String,

    /// Line of the scenario (of its [Examples] row for an outline).
    ///
    /// [Examples]: https://cucumber.io/docs/gherkin/reference#examples
    pub line: usize,

    /// Merged tags.
    pub tags: Vec<String>,

    /// [Examples] row the scenario was expanded from.
    ///
    /// [Examples]: https://cucumber.io/docs/gherkin/reference#examples
    pub example: Option<ExampleRow>,

    /// Final [`Status`].
    pub status: Status,

    /// Results of the background steps, in order.
    pub background: Vec<StepResult>,

    /// Results of the scenario's own steps, in order.
    pub steps: Vec<StepResult>,

    /// Scenario-level fault, if any.
    pub error: Option<ScenarioError>,

    /// Number of executed attempts, `0` if never started.
    pub attempts: usize,

    /// Time spent on the final attempt.
    pub duration: Duration,
}

impl ScenarioResult {
    /// Iterates over all the step results, background ones first.
    pub fn all_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.background.iter().chain(&self.steps)
    }

    /// Returns the first step that failed or errored.
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.all_steps().find(|s| s.status.is_failure())
    }

    /// Derives the scenario [`Status`] from its parts.
    pub(crate) fn resolve_status(&mut self) {
        let status = if self.error.is_some() {
            Status::Errored
        } else {
            self.all_steps().map(|s| s.status).fold(Status::Passed, |acc, s| match (acc, s) {
                (Status::Errored, _) | (_, Status::Errored) => Status::Errored,
                (Status::Failed, _) | (_, Status::Failed) => Status::Failed,
                (Status::Skipped, _) | (_, Status::Skipped) => Status::Skipped,
                (Status::Passed, Status::Passed) => Status::Passed,
            })
        };
        self.status = status;
    }

    fn sort_key(&self) -> (usize, usize, usize) {
        self.example
            .as_ref()
            .map_or((self.line, 0, 0), |e| (self.line, e.block, e.index))
    }
}

/// Numbers of items per [`Status`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Counts {
    /// [`Status::Passed`] items.
    pub passed: usize,

    /// [`Status::Failed`] items.
    pub failed: usize,

    /// [`Status::Skipped`] items.
    pub skipped: usize,

    /// [`Status::Errored`] items.
    pub errored: usize,
}

impl Counts {
    /// Total number of items.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.errored
    }

    fn add(&mut self, status: Status) {
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Skipped => self.skipped += 1,
            Status::Errored => self.errored += 1,
        }
    }
}

/// Statistics of a [`Report`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Stats {
    /// Scenarios by [`Status`].
    pub scenarios: Counts,

    /// Steps by [`Status`].
    pub steps: Counts,

    /// Retried scenario attempts.
    pub retries: usize,

    /// Files failed to be parsed.
    pub parsing_errors: usize,
}

/// Results of a single feature.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureReport {
    /// Name of the feature.
    pub name: String,

    /// Path of the feature file, if known.
    pub path: Option<PathBuf>,

    /// Results of the executed scenarios, in file order.
    pub scenarios: Vec<Arc<ScenarioResult>>,
}

/// Failed or errored scenario along with its failing step.
#[derive(Clone, Copy, Debug)]
pub struct FailedScenario<'r> {
    /// Result of the scenario.
    pub scenario: &'r ScenarioResult,

    /// First failed or errored step, if the failure is step-level.
    pub step: Option<&'r StepResult>,
}

impl fmt::Display for FailedScenario<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sc = self.scenario;
        write!(f, "{} > {} ({})", sc.feature, sc.name, sc.status)?;
        if let Some(err) = &sc.error {
            write!(f, "\n  {err}")?;
        }
        if let Some(step) = self.step {
            write!(f, "\n  {} {} (line {})", step.keyword, step.text, step.line)?;
            if let Some(err) = &step.error {
                write!(f, "\n  {err}")?;
            }
        }
        Ok(())
    }
}

/// Aggregated results of an execution.
#[derive(Clone, Debug, Default)]
pub struct Report {
    features: Vec<FeatureReport>,

    /// Started features, index-aligned with the `features`.
    sources: Vec<Arc<feature::Feature>>,

    parsing_errors: Vec<parser::Error>,
    retries: usize,
    finished: bool,
}

impl Report {
    /// Creates a new empty [`Report`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns results grouped by feature, in order of execution start.
    #[must_use]
    pub fn features(&self) -> &[FeatureReport] {
        &self.features
    }

    /// Iterates over all the scenario results.
    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.features.iter().flat_map(|f| f.scenarios.iter().map(AsRef::as_ref))
    }

    /// Returns errors of files failed to be parsed.
    #[must_use]
    pub fn parsing_errors(&self) -> &[parser::Error] {
        &self.parsing_errors
    }

    /// Indicates whether the execution has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Counts scenarios and steps by their [`Status`].
    #[must_use]
    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            retries: self.retries,
            parsing_errors: self.parsing_errors.len(),
            ..Stats::default()
        };
        for sc in self.scenarios() {
            stats.scenarios.add(sc.status);
            for step in sc.all_steps() {
                stats.steps.add(step.status);
            }
        }
        stats
    }

    /// Lists failed and errored scenarios along with their failing steps.
    #[must_use]
    pub fn failures(&self) -> Vec<FailedScenario<'_>> {
        self.scenarios()
            .filter(|sc| sc.status.is_failure())
            .map(|scenario| FailedScenario {
                scenario,
                step: scenario.failed_step(),
            })
            .collect()
    }

    /// Indicates whether any scenario failed or errored, or any file failed
    /// to be parsed.
    #[must_use]
    pub fn execution_has_failed(&self) -> bool {
        !self.parsing_errors.is_empty()
            || self.scenarios().any(|sc| sc.status.is_failure())
    }

    /// Accounts the given [`event::Cucumber`] in this [`Report`].
    pub fn record(&mut self, ev: &event::Cucumber) {
        use event::{Cucumber, Feature, Scenario};

        match ev {
            Cucumber::Started => {}
            Cucumber::Finished => self.finished = true,
            Cucumber::ParsingFailed(err) => {
                self.parsing_errors.push(err.clone());
            }
            Cucumber::Feature(f, Feature::Started) => {
                self.sources.push(Arc::clone(f));
                self.features.push(FeatureReport {
                    name: f.name.clone(),
                    path: f.path.clone(),
                    scenarios: Vec::new(),
                });
            }
            Cucumber::Feature(_, Feature::Scenario(_, Scenario::Started { attempt }))
                if *attempt > 1 =>
            {
                self.retries += 1;
            }
            Cucumber::Feature(f, Feature::Scenario(_, Scenario::Finished(res))) => {
                let report = self
                    .sources
                    .iter()
                    .position(|src| Arc::ptr_eq(src, f))
                    .and_then(|i| self.features.get_mut(i));
                let Some(report) = report else {
                    tracing::warn!(
                        feature = %f.name,
                        "scenario finished for a feature never started",
                    );
                    return;
                };
                let key = res.sort_key();
                let at = report
                    .scenarios
                    .partition_point(|sc| sc.sort_key() <= key);
                report.scenarios.insert(at, Arc::clone(res));
            }
            Cucumber::Feature(..) => {}
        }
    }
}
