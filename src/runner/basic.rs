// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Default [`Runner`] implementation.

use std::{cell::Cell, fmt, rc::Rc, sync::Arc, time::Duration};

use futures::{
    channel::mpsc,
    future::{self, Either, LocalBoxFuture},
    stream::{self, LocalBoxStream},
    FutureExt as _, Stream, StreamExt as _,
};
use lazy_regex::regex;
use tracing::Instrument as _;

use super::{cancel::Cancellation, executor::Executor};
use crate::{
    event,
    feature::{Feature, Pickle},
    parser, step,
    tag::{Ext as _, TagOperation},
    Event, Runner, World,
};

/// Default number of concurrently executed scenarios.
pub const DEFAULT_MAX_CONCURRENT_SCENARIOS: usize = 64;

/// CLI options of a [`Basic`] [`Runner`].
#[derive(clap::Args, Clone, Debug, Default)]
#[group(skip)]
pub struct Cli {
    /// Number of scenarios to run concurrently. If not specified, uses the
    /// value configured in tests runner, or 64 by default.
    #[arg(long, short, value_name = "int", global = true)]
    pub concurrency: Option<usize>,

    /// Run tests until the first failure.
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Number of times a failed scenario will be retried.
    #[arg(long, value_name = "int", global = true)]
    pub retry: Option<usize>,

    /// Tag expression to filter retried scenarios.
    #[arg(long, value_name = "tagexpr", requires = "retry", global = true)]
    pub retry_tag_filter: Option<TagOperation>,

    /// Maximum duration of a single step, like `5s` or `1m 30s`.
    #[arg(long, value_name = "duration", global = true)]
    pub step_timeout: Option<humantime::Duration>,
}

/// Type determining whether a scenario may run concurrently with others.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScenarioType {
    /// Run the scenario alone, with no other scenario in flight.
    Serial,

    /// Run the scenario concurrently with other ones.
    Concurrent,
}

/// Alias for [`fn`] used to determine whether a scenario is
/// [`Concurrent`] or a [`Serial`] one.
///
/// [`Concurrent`]: ScenarioType::Concurrent
/// [`Serial`]: ScenarioType::Serial
pub type WhichScenarioFn = fn(&Feature, &Pickle) -> ScenarioType;

/// Predicate selecting scenarios to execute.
pub type FilterFn = Rc<dyn Fn(&Feature, &Pickle) -> bool>;

/// Hook executed on each scenario before running its steps.
pub type BeforeHook<World> =
    Rc<dyn for<'a> Fn(&'a Pickle, &'a mut World) -> LocalBoxFuture<'a, step::Result>>;

/// Hook executed on each scenario after running its steps.
///
/// Receives no `World` if it failed to be created.
pub type AfterHook<World> = Rc<
    dyn for<'a> Fn(&'a Pickle, Option<&'a mut World>) -> LocalBoxFuture<'a, step::Result>,
>;

/// Retrying policy of failed and errored scenarios.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetryOptions {
    /// Number of retries of each scenario not tagged with `@retry`.
    pub retries: usize,

    /// Restricts [`RetryOptions::retries`] to scenarios matching it.
    pub filter: Option<TagOperation>,
}

impl RetryOptions {
    /// Returns the number of retries allowed for the given [`Pickle`].
    ///
    /// `@retry(n)` tag sets it to `n`, while a bare `@retry` tag uses the
    /// configured number (at least `1`). Untagged scenarios get the
    /// configured number if they pass the [`RetryOptions::filter`].
    #[must_use]
    pub fn for_pickle(&self, pickle: &Pickle) -> usize {
        let re = regex!(r"^retry(?:\((\d+)\))?$");
        let tagged = pickle.tags.iter().find_map(|t| {
            re.captures(t).map(|c| c.get(1).and_then(|n| n.as_str().parse().ok()))
        });
        match tagged {
            Some(Some(n)) => n,
            Some(None) => self.retries.max(1),
            None => match &self.filter {
                Some(f) if !f.eval(&pickle.tags) => 0,
                _ => self.retries,
            },
        }
    }
}

/// Default [`Runner`] implementation.
///
/// Executes scenarios concurrently (up to
/// [`Basic::max_concurrent_scenarios()`]), except the ones
/// [`ScenarioType::Serial`], which are run alone. With concurrency of `1`
/// scenarios run in file order.
pub struct Basic<World> {
    /// Step definitions to resolve steps with.
    steps: step::Collection<World>,

    /// Optional number of concurrently executed scenarios.
    max_concurrent_scenarios: Option<usize>,

    /// Retrying policy.
    retries: RetryOptions,

    /// Optional limit of a single step execution.
    step_timeout: Option<Duration>,

    /// Indicator whether execution should be stopped after the first failure.
    fail_fast: bool,

    /// Function determining whether a scenario is serial.
    which_scenario: WhichScenarioFn,

    /// Predicate selecting scenarios to run.
    filter: Option<FilterFn>,

    /// Function, executed on each scenario before running all its steps.
    before_hook: Option<BeforeHook<World>>,

    /// Function, executed on each scenario after running all its steps.
    after_hook: Option<AfterHook<World>>,

    /// Handle cancelling the execution.
    cancellation: Cancellation,
}

// Implemented manually to omit redundant `World: Debug` trait bound.
impl<World> fmt::Debug for Basic<World> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Basic")
            .field("steps", &self.steps.len())
            .field("max_concurrent_scenarios", &self.max_concurrent_scenarios)
            .field("retries", &self.retries)
            .field("step_timeout", &self.step_timeout)
            .field("fail_fast", &self.fail_fast)
            .field("before_hook", &self.before_hook.is_some())
            .field("after_hook", &self.after_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl<World> Default for Basic<World> {
    fn default() -> Self {
        let which_scenario: WhichScenarioFn = |_, pickle| {
            if pickle.has_tag("serial") {
                ScenarioType::Serial
            } else {
                ScenarioType::Concurrent
            }
        };

        Self {
            steps: step::Collection::default(),
            max_concurrent_scenarios: Some(DEFAULT_MAX_CONCURRENT_SCENARIOS),
            retries: RetryOptions::default(),
            step_timeout: None,
            fail_fast: false,
            which_scenario,
            filter: None,
            before_hook: None,
            after_hook: None,
            cancellation: Cancellation::new(),
        }
    }
}

impl<World> Basic<World> {
    /// Creates a new [`Basic`] [`Runner`] with no steps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// If `max` is [`Some`], then number of concurrently executed scenarios
    /// will be limited.
    #[must_use]
    pub fn max_concurrent_scenarios(
        mut self,
        max: impl Into<Option<usize>>,
    ) -> Self {
        self.max_concurrent_scenarios = max.into();
        self
    }

    /// Makes failed and errored scenarios to be retried the given number of
    /// times.
    #[must_use]
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries.retries = retries;
        self
    }

    /// Restricts [`Basic::retries()`] to scenarios matching the given tag
    /// expression.
    #[must_use]
    pub fn retry_filter(mut self, filter: impl Into<Option<TagOperation>>) -> Self {
        self.retries.filter = filter.into();
        self
    }

    /// Limits the duration of every single step. A step exceeding it is
    /// errored.
    #[must_use]
    pub fn step_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.step_timeout = timeout.into();
        self
    }

    /// Makes stop running tests on the first failure.
    ///
    /// __NOTE__: All the already started scenarios at the moment of failure
    /// will be finished.
    #[must_use]
    pub const fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Function determining whether a scenario is [`Concurrent`] or a
    /// [`Serial`] one. By default, scenarios tagged `@serial` are serial.
    ///
    /// [`Concurrent`]: ScenarioType::Concurrent
    /// [`Serial`]: ScenarioType::Serial
    #[must_use]
    pub fn which_scenario(mut self, func: WhichScenarioFn) -> Self {
        self.which_scenario = func;
        self
    }

    /// Executes only the scenarios matching the given predicate.
    ///
    /// Calling it again narrows the selection further.
    #[must_use]
    pub fn filter_scenarios<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Feature, &Pickle) -> bool + 'static,
    {
        self.filter = Some(match self.filter.take() {
            Some(prev) => Rc::new(move |f, p| prev(f, p) && filter(f, p)),
            None => Rc::new(filter),
        });
        self
    }

    /// Sets a hook, executed on each scenario before running all its steps,
    /// including background ones.
    ///
    /// Its failure errors the scenario and skips all its steps.
    #[must_use]
    pub fn before<F>(mut self, func: F) -> Self
    where
        F: for<'a> Fn(&'a Pickle, &'a mut World) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        self.before_hook = Some(Rc::new(func));
        self
    }

    /// Sets a hook, executed on each scenario after running all its steps,
    /// even after a failed one.
    ///
    /// Its failure errors an otherwise passed scenario.
    #[must_use]
    pub fn after<F>(mut self, func: F) -> Self
    where
        F: for<'a> Fn(&'a Pickle, Option<&'a mut World>) -> LocalBoxFuture<'a, step::Result>
            + 'static,
    {
        self.after_hook = Some(Rc::new(func));
        self
    }

    /// Sets the given [`step::Collection`] to this [`Runner`].
    #[must_use]
    pub fn steps(mut self, steps: step::Collection<World>) -> Self {
        self.steps = steps;
        self
    }

    /// Returns the [`step::Collection`] of this [`Runner`].
    #[must_use]
    pub const fn collection(&self) -> &step::Collection<World> {
        &self.steps
    }

    /// Returns a handle cancelling the execution.
    #[must_use]
    pub fn cancellation(&self) -> Cancellation {
        self.cancellation.clone()
    }

    /// Uses the given [`Cancellation`] handle for the execution.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }
}

impl<W: World> Runner<W> for Basic<W> {
    type Cli = Cli;

    type EventStream = LocalBoxStream<'static, Event<event::Cucumber>>;

    fn run<S>(self, features: S, cli: Cli) -> Self::EventStream
    where
        S: Stream<Item = parser::Result<Feature>> + 'static,
    {
        let (sender, receiver) = mpsc::unbounded();

        stream::select(
            receiver.map(Either::Left),
            execute(self, features, cli, sender).into_stream().map(Either::Right),
        )
        .filter_map(|r| {
            future::ready(match r {
                Either::Left(ev) => Some(ev),
                Either::Right(()) => None,
            })
        })
        .boxed_local()
    }
}

/// Execution progress of a single [`Feature`].
struct Progress {
    /// Executed [`Feature`].
    feature: Arc<Feature>,

    /// Indicator whether [`event::Feature::Started`] was emitted.
    started: Cell<bool>,

    /// Number of its scenarios not finished yet.
    remaining: Cell<usize>,
}

/// Collects the `features`, then executes their selected scenarios, sending
/// events into the `sender`.
async fn execute<W, S>(
    runner: Basic<W>,
    features: S,
    cli: Cli,
    sender: mpsc::UnboundedSender<Event<event::Cucumber>>,
) where
    W: World,
    S: Stream<Item = parser::Result<Feature>> + 'static,
{
    let Basic {
        steps,
        max_concurrent_scenarios,
        mut retries,
        step_timeout,
        fail_fast,
        which_scenario,
        filter,
        before_hook,
        after_hook,
        cancellation,
    } = runner;

    let concurrency = cli
        .concurrency
        .or(max_concurrent_scenarios)
        .unwrap_or(usize::MAX)
        .max(1);
    let fail_fast = cli.fail_fast || fail_fast;
    if let Some(n) = cli.retry {
        retries.retries = n;
    }
    if cli.retry_tag_filter.is_some() {
        retries.filter = cli.retry_tag_filter;
    }
    let step_timeout = cli.step_timeout.map(Into::into).or(step_timeout);

    let executor = Executor::new(
        steps,
        before_hook,
        after_hook,
        step_timeout,
        cancellation,
        sender,
    );
    executor.send(event::Cucumber::Started);

    let mut progress = Vec::new();
    let mut queue = Vec::new();
    let features = features.collect::<Vec<_>>().await;
    for feature in features {
        let feature = match feature {
            Ok(f) => Arc::new(f),
            Err(e) => {
                tracing::error!(error = %e, "failed to parse feature");
                executor.send(event::Cucumber::ParsingFailed(e));
                continue;
            }
        };
        let pickles = feature
            .pickles()
            .into_iter()
            .filter(|p| filter.as_ref().map_or(true, |f| f(&feature, p)))
            .collect::<Vec<_>>();
        if pickles.is_empty() {
            continue;
        }

        let idx = progress.len();
        progress.push(Progress {
            feature: Arc::clone(&feature),
            started: Cell::new(false),
            remaining: Cell::new(pickles.len()),
        });
        for pickle in pickles {
            let ty = which_scenario(&feature, &pickle);
            queue.push((idx, Arc::new(pickle), ty));
        }
    }
    tracing::debug!(
        features = progress.len(),
        scenarios = queue.len(),
        concurrency,
        "scheduled scenarios",
    );

    let (progress, executor, retries) = (&progress, &executor, &retries);
    let run_one = move |(idx, pickle, _): (usize, Arc<Pickle>, ScenarioType)| async move {
        let Progress { feature, started, remaining } = &progress[idx];
        if !started.replace(true) {
            executor.send(event::Cucumber::feature_started(Arc::clone(feature)));
        }

        let span = tracing::info_span!(
            "feature",
            name = %feature.name,
            path = ?feature.path,
        );
        let res = executor
            .run_scenario(Arc::clone(feature), Arc::clone(&pickle), retries.for_pickle(&pickle))
            .instrument(span)
            .await;
        if fail_fast && res.status.is_failure() {
            executor.cancellation().cancel();
        }

        remaining.set(remaining.get() - 1);
        if remaining.get() == 0 {
            executor.send(event::Cucumber::feature_finished(Arc::clone(feature)));
        }
    };

    let mut batch = Vec::new();
    for item in queue {
        if item.2 == ScenarioType::Serial {
            run_concurrently(std::mem::take(&mut batch), run_one, concurrency).await;
            run_one(item).await;
        } else {
            batch.push(item);
        }
    }
    run_concurrently(batch, run_one, concurrency).await;

    executor.send(event::Cucumber::Finished);
}

/// Runs the given `items` with at most `limit` of them in flight.
async fn run_concurrently<T, F, Fut>(items: Vec<T>, run: F, limit: usize)
where
    F: FnMut(T) -> Fut,
    Fut: future::Future<Output = ()>,
{
    stream::iter(items)
        .map(run)
        .buffer_unordered(limit)
        .collect::<Vec<()>>()
        .await;
}
