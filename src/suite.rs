// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level [Gherkin] scenarios executor.
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

use std::{fmt, path::Path, time::Duration};

use futures::{future::LocalBoxFuture, stream, Stream, StreamExt as _};

use crate::{
    cli,
    config::{Config, RunnerSettings},
    error::Error,
    feature::{Feature, Pickle},
    parser,
    runner::{self, basic::WhichScenarioFn, Cancellation},
    step,
    tag::{Ext as _, TagOperation},
    writer::{self, Ext as _},
    Parser as _, Runner as _, World, Writer,
};

/// CLI options of a [`Suite`] with the given [`Writer`] CLI options.
type Opts<WriterCli> = cli::Opts<runner::Cli, WriterCli>;

/// Top-level [Gherkin] scenarios executor.
///
/// Glues the [`parser::Basic`], the [`runner::Basic`] and a [`Writer`]
/// together: [`Feature`]s are parsed, step definitions are validated,
/// scenarios are filtered and executed, and produced events are handled by
/// the [`Writer`].
///
/// [Gherkin]: https://cucumber.io/docs/gherkin/reference
pub struct Suite<W, Wr: Writer = writer::Summarize<writer::Basic>> {
    /// [`runner::Basic`] executing scenarios.
    runner: runner::Basic<W>,

    /// [`Writer`] handling events.
    writer: Wr,

    /// CLI options, [`Default`] ones if [`None`].
    cli: Option<Opts<Wr::Cli>>,
}

// Implemented manually to omit redundant `W: Debug` trait bound.
impl<W, Wr> fmt::Debug for Suite<W, Wr>
where
    Wr: Writer + fmt::Debug,
    Wr::Cli: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("runner", &self.runner)
            .field("writer", &self.writer)
            .field("cli", &self.cli)
            .finish()
    }
}

impl<W> Default for Suite<W> {
    fn default() -> Self {
        Self {
            runner: runner::Basic::default(),
            writer: writer::Basic::stdout().summarized(),
            cli: None,
        }
    }
}

impl<W> Suite<W> {
    /// Creates a default [`Suite`] executor.
    ///
    /// * [`Runner`] is [`runner::Basic`]: scenarios are concurrent (up to
    ///   64 at once) unless tagged `@serial`;
    /// * [`Writer`] is [`writer::Basic`] wrapped into [`writer::Summarize`].
    ///
    /// [`Runner`]: crate::Runner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<W, Wr: Writer> Suite<W, Wr> {
    /// Replaces the [`Writer`] of this [`Suite`].
    ///
    /// __NOTE__: Drops CLI options set by [`Suite::with_cli()`], as they
    ///           depend on the [`Writer`].
    #[must_use]
    pub fn with_writer<N: Writer>(self, writer: N) -> Suite<W, N> {
        Suite { runner: self.runner, writer, cli: None }
    }

    /// Uses the given CLI options instead of the [`Default`] ones.
    ///
    /// Custom options are up to the caller and are dropped here.
    #[must_use]
    pub fn with_cli<Custom: clap::Args>(
        mut self,
        opts: cli::Opts<runner::Cli, Wr::Cli, Custom>,
    ) -> Self {
        let cli::Opts { re_filter, tags_filter, config, env, runner, writer, .. } =
            opts;
        self.cli = Some(cli::Opts {
            re_filter,
            tags_filter,
            config,
            env,
            runner,
            writer,
            custom: cli::Empty,
        });
        self
    }

    /// Parses CLI options from the command line and uses them.
    ///
    /// # Panics
    ///
    /// If the command line is invalid, printing the usage, as [`clap`] does.
    #[must_use]
    pub fn with_cli_parsed(mut self) -> Self {
        self.cli = Some(Opts::parsed());
        self
    }

    /// Applies [`RunnerSettings`] of the given [`Config`].
    ///
    /// CLI options still take precedence over them.
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        self.runner = configure(self.runner, RunnerSettings::from(config));
        self
    }

    /// Sets the [`step::Collection`] to resolve steps with.
    #[must_use]
    pub fn steps(mut self, steps: step::Collection<W>) -> Self {
        self.runner = self.runner.steps(steps);
        self
    }

    /// If `max` is [`Some`], then number of concurrently executed scenarios
    /// will be limited.
    #[must_use]
    pub fn max_concurrent_scenarios(
        mut self,
        max: impl Into<Option<usize>>,
    ) -> Self {
        self.runner = self.runner.max_concurrent_scenarios(max);
        self
    }

    /// Makes failed and errored scenarios to be retried the given number of
    /// times.
    #[must_use]
    pub fn retries(mut self, retries: usize) -> Self {
        self.runner = self.runner.retries(retries);
        self
    }

    /// Restricts [`Suite::retries()`] to scenarios matching the given tag
    /// expression.
    #[must_use]
    pub fn retry_filter(mut self, filter: impl Into<Option<TagOperation>>) -> Self {
        self.runner = self.runner.retry_filter(filter);
        self
    }

    /// Limits the duration of every single step.
    #[must_use]
    pub fn step_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.runner = self.runner.step_timeout(timeout);
        self
    }

    /// Makes stop running scenarios on the first failure.
    #[must_use]
    pub fn fail_fast(mut self) -> Self {
        self.runner = self.runner.fail_fast();
        self
    }

    /// Function determining whether a scenario is run concurrently or alone.
    #[must_use]
    pub fn which_scenario(mut self, func: WhichScenarioFn) -> Self {
        self.runner = self.runner.which_scenario(func);
        self
    }

    /// Executes only the scenarios matching the given predicate.
    #[must_use]
    pub fn filter_scenarios<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Feature, &Pickle) -> bool + 'static,
    {
        self.runner = self.runner.filter_scenarios(filter);
        self
    }

    /// Sets a hook, executed on each scenario before running all its steps.
    #[must_use]
    pub fn before<F>(mut self, func: F) -> Self
    where
        F: for<'a> Fn(&'a Pickle, &'a mut W) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        self.runner = self.runner.before(func);
        self
    }

    /// Sets a hook, executed on each scenario after running all its steps.
    #[must_use]
    pub fn after<F>(mut self, func: F) -> Self
    where
        F: for<'a> Fn(&'a Pickle, Option<&'a mut W>) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        self.runner = self.runner.after(func);
        self
    }

    /// Returns a handle cancelling the execution.
    ///
    /// Scenarios not started yet are skipped once it's cancelled.
    #[must_use]
    pub fn cancellation(&self) -> Cancellation {
        self.runner.cancellation()
    }
}

impl<W, Wr> Suite<W, Wr>
where
    W: World,
    Wr: Writer,
    Wr::Cli: Default,
{
    /// Runs all the `.feature` files found at the given `input` path.
    ///
    /// Returns the [`Writer`], which has handled all the events.
    ///
    /// # Errors
    ///
    /// - If the step definitions are misconfigured (see
    ///   [`step::Collection::validate()`]), before running anything.
    /// - If the configuration file passed via CLI can't be loaded.
    pub async fn run(self, input: impl AsRef<Path>) -> Result<Wr, Error> {
        self.filter_run(input, |_, _| true).await
    }

    /// Runs the scenarios found at the given `input` path, which match the
    /// given `filter`.
    ///
    /// # Errors
    ///
    /// Same as [`Suite::run()`].
    pub async fn filter_run<F>(
        self,
        input: impl AsRef<Path>,
        filter: F,
    ) -> Result<Wr, Error>
    where
        F: Fn(&Feature, &Pickle) -> bool + 'static,
    {
        let features = parser::Basic.parse(input);
        self.execute(features, filter).await
    }

    /// Runs the given already parsed [`Feature`]s.
    ///
    /// # Errors
    ///
    /// Same as [`Suite::run()`].
    pub async fn run_features(self, features: Vec<Feature>) -> Result<Wr, Error> {
        let features = stream::iter(features.into_iter().map(Ok));
        self.execute(features, |_, _| true).await
    }

    /// Runs all the `.feature` files found at the given `input` path.
    ///
    /// # Panics
    ///
    /// If the run couldn't be started, or if any scenario failed, errored or
    /// any file failed to be parsed.
    pub async fn run_and_exit(self, input: impl AsRef<Path>)
    where
        Wr: writer::Stats,
    {
        let writer = match self.run(input).await {
            Ok(w) => w,
            Err(e) => panic!("{e}"),
        };
        if writer.execution_has_failed() {
            let stats = writer.stats();
            let failed = stats.scenarios.failed + stats.scenarios.errored;
            panic!(
                "{failed} scenario{} failed, {} parsing error{}",
                if failed == 1 { "" } else { "s" },
                stats.parsing_errors,
                if stats.parsing_errors == 1 { "" } else { "s" },
            );
        }
    }

    async fn execute<S, F>(self, features: S, filter: F) -> Result<Wr, Error>
    where
        S: Stream<Item = parser::Result<Feature>> + 'static,
        F: Fn(&Feature, &Pickle) -> bool + 'static,
    {
        let Self { mut runner, mut writer, cli } = self;
        let cli = cli.unwrap_or_default();

        if let Some(path) = &cli.config {
            let config = Config::load(path, cli.env.as_deref())?;
            runner = configure(runner, RunnerSettings::from(&config));
        }

        if let Err(e) = runner.collection().validate() {
            tracing::error!(error = %e, "step definitions are misconfigured");
            return Err(e.into());
        }

        if let Some(re) = cli.re_filter {
            runner = runner.filter_scenarios(move |_, p| re.is_match(&p.name));
        }
        if let Some(tags) = cli.tags_filter {
            runner = runner.filter_scenarios(move |_, p| tags.eval(&p.tags));
        }
        let events = runner.filter_scenarios(filter).run(features, cli.runner);

        futures::pin_mut!(events);
        while let Some(ev) = events.next().await {
            writer.handle_event(ev, &cli.writer).await;
        }
        Ok(writer)
    }
}

/// Applies the given [`RunnerSettings`] to the `runner`.
fn configure<W>(
    mut runner: runner::Basic<W>,
    settings: RunnerSettings,
) -> runner::Basic<W> {
    if let Some(n) = settings.concurrency {
        runner = runner.max_concurrent_scenarios(n);
    }
    if let Some(n) = settings.retries {
        runner = runner.retries(n);
    }
    if let Some(timeout) = settings.step_timeout {
        runner = runner.step_timeout(timeout);
    }
    if settings.fail_fast {
        runner = runner.fail_fast();
    }
    runner
}
