// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution of a single scenario with its hooks and retries.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::{channel::mpsc, future::LocalBoxFuture, FutureExt as _};
use tracing::Instrument as _;

use super::{
    basic::{AfterHook, BeforeHook},
    cancel::Cancellation,
};
use crate::{
    event::{self, HookType},
    feature::{Feature, Pickle, PickleStep},
    report::{ScenarioError, ScenarioResult, Status, StepError, StepResult},
    step::{self, Context},
    Event, World,
};

/// Runs scenarios one by one, sending their events into the `sender`.
pub(super) struct Executor<W> {
    /// Step definitions to resolve steps with.
    steps: step::Collection<W>,

    /// Hook executed before every scenario attempt.
    before_hook: Option<BeforeHook<W>>,

    /// Hook executed after every scenario attempt.
    after_hook: Option<AfterHook<W>>,

    /// Optional limit of a single step execution.
    step_timeout: Option<Duration>,

    /// Handle checked before every step.
    cancellation: Cancellation,

    /// Sender of the emitted events.
    sender: mpsc::UnboundedSender<Event<event::Cucumber>>,
}

impl<W: World> Executor<W> {
    /// Creates a new [`Executor`].
    pub(super) const fn new(
        steps: step::Collection<W>,
        before_hook: Option<BeforeHook<W>>,
        after_hook: Option<AfterHook<W>>,
        step_timeout: Option<Duration>,
        cancellation: Cancellation,
        sender: mpsc::UnboundedSender<Event<event::Cucumber>>,
    ) -> Self {
        Self { steps, before_hook, after_hook, step_timeout, cancellation, sender }
    }

    /// Returns the [`Cancellation`] handle of this [`Executor`].
    pub(super) const fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Sends the given event, ignoring a dropped receiver.
    pub(super) fn send(&self, ev: event::Cucumber) {
        _ = self.sender.unbounded_send(Event::new(ev));
    }

    fn emit(&self, feature: &Arc<Feature>, pickle: &Arc<Pickle>, ev: event::Scenario) {
        self.send(event::Cucumber::scenario(Arc::clone(feature), Arc::clone(pickle), ev));
    }

    /// Runs the given scenario, retrying it up to `retries` times while it
    /// fails or errors.
    ///
    /// Emits [`event::Scenario::Finished`] once, with the result of the last
    /// attempt.
    pub(super) async fn run_scenario(
        &self,
        feature: Arc<Feature>,
        pickle: Arc<Pickle>,
        retries: usize,
    ) -> Arc<ScenarioResult> {
        let result = if self.cancellation.is_cancelled() {
            tracing::debug!(scenario = %pickle.name, "skipping cancelled scenario");
            not_started(&pickle)
        } else {
            let mut attempt = 1;
            loop {
                let span = tracing::info_span!(
                    "scenario",
                    name = %pickle.name,
                    line = pickle.line,
                    attempt,
                );
                let res = self.attempt(&feature, &pickle, attempt).instrument(span).await;
                if res.status.is_failure()
                    && attempt <= retries
                    && !self.cancellation.is_cancelled()
                {
                    tracing::warn!(
                        scenario = %pickle.name,
                        status = %res.status,
                        attempt,
                        retries,
                        "retrying scenario",
                    );
                    attempt += 1;
                    continue;
                }
                break res;
            }
        };
        if result.status.is_failure() {
            tracing::warn!(
                feature = %pickle.feature,
                scenario = %pickle.name,
                status = %result.status,
                attempts = result.attempts,
                "scenario did not pass",
            );
        }

        let result = Arc::new(result);
        self.emit(&feature, &pickle, event::Scenario::Finished(Arc::clone(&result)));
        result
    }

    /// Executes a single attempt of the scenario on a fresh [`World`].
    async fn attempt(
        &self,
        feature: &Arc<Feature>,
        pickle: &Arc<Pickle>,
        attempt: usize,
    ) -> ScenarioResult {
        let started = Instant::now();
        self.emit(feature, pickle, event::Scenario::Started { attempt });

        let mut error = None;
        let mut world = match AssertUnwindSafe(W::new()).catch_unwind().await {
            Ok(Ok(w)) => Some(w),
            Ok(Err(e)) => {
                error = Some(ScenarioError::World(e.to_string()));
                None
            }
            Err(panic) => {
                error = Some(ScenarioError::World(panic_message(&*panic)));
                None
            }
        };
        if let Some(e) = &error {
            tracing::error!(error = %e, "scenario not executed");
        }

        if let (Some(hook), Some(w)) = (&self.before_hook, world.as_mut()) {
            if let Err(message) = self
                .run_hook(feature, pickle, HookType::Before, hook(&**pickle, w))
                .await
            {
                error = Some(ScenarioError::Hook { which: HookType::Before, message });
            }
        }

        let mut halted = error.is_some();
        let mut background = Vec::with_capacity(pickle.background.len());
        for step in &pickle.background {
            let w = world.as_mut().filter(|_| !halted);
            let res = self.run_step(feature, pickle, step, true, w).await;
            halted |= res.status != Status::Passed;
            background.push(res);
        }
        let mut steps = Vec::with_capacity(pickle.steps.len());
        for step in &pickle.steps {
            let w = world.as_mut().filter(|_| !halted);
            let res = self.run_step(feature, pickle, step, false, w).await;
            halted |= res.status != Status::Passed;
            steps.push(res);
        }

        if let Some(hook) = &self.after_hook {
            let failed = background.iter().chain(&steps).any(|s| s.status.is_failure());
            if let Err(message) = self
                .run_hook(feature, pickle, HookType::After, hook(&**pickle, world.as_mut()))
                .await
            {
                if error.is_none() && !failed {
                    error = Some(ScenarioError::Hook { which: HookType::After, message });
                }
            }
        }
        drop(world);

        let mut result = ScenarioResult {
            feature: pickle.feature.clone(),
            path: pickle.path.clone(),
            name: pickle.name.clone(),
            line: pickle.line,
            tags: pickle.tags.clone(),
            example: pickle.example.clone(),
            status: Status::Passed,
            background,
            steps,
            error,
            attempts: attempt,
            duration: started.elapsed(),
        };
        result.resolve_status();
        tracing::debug!(status = %result.status, "scenario finished");
        result
    }

    /// Runs the given hook future, emitting its [`event::Hook`]s.
    async fn run_hook(
        &self,
        feature: &Arc<Feature>,
        pickle: &Arc<Pickle>,
        which: HookType,
        fut: LocalBoxFuture<'_, step::Result>,
    ) -> Result<(), String> {
        self.emit(feature, pickle, event::Scenario::Hook(which, event::Hook::Started));

        let res = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => Err(panic_message(&*panic)),
        };

        let ev = match &res {
            Ok(()) => event::Hook::Passed,
            Err(message) => {
                tracing::warn!(hook = %which, error = %message, "hook failed");
                event::Hook::Failed(message.clone())
            }
        };
        self.emit(feature, pickle, event::Scenario::Hook(which, ev));
        res
    }

    /// Resolves and runs the given step, or skips it if there is no `world`
    /// to run it on or the execution is cancelled.
    async fn run_step(
        &self,
        feature: &Arc<Feature>,
        pickle: &Arc<Pickle>,
        step: &PickleStep,
        is_background: bool,
        world: Option<&mut W>,
    ) -> StepResult {
        let arc = Arc::new(step.clone());
        let wrap = |ev| {
            if is_background {
                event::Scenario::Background(Arc::clone(&arc), ev)
            } else {
                event::Scenario::Step(Arc::clone(&arc), ev)
            }
        };

        let Some(world) = world.filter(|_| !self.cancellation.is_cancelled()) else {
            let res = StepResult::skipped(step);
            self.emit(feature, pickle, wrap(event::Step::Finished(res.clone())));
            return res;
        };

        self.emit(feature, pickle, wrap(event::Step::Started));
        let started = Instant::now();
        let span = tracing::debug_span!("step", keyword = %step.keyword, text = %step.text);
        let (location, error) = match self.steps.resolve(step) {
            Ok((def, ctx)) => {
                let res = self.invoke(def.step(), world, ctx).instrument(span).await;
                (Some(def.location), res.err())
            }
            Err(e) => (None, Some(StepError::from(e))),
        };
        if let Some(e) = &error {
            tracing::debug!(step = %step.text, kind = e.kind(), error = %e, "step did not pass");
        }

        let res = StepResult::executed(step, location, error, started.elapsed());
        self.emit(feature, pickle, wrap(event::Step::Finished(res.clone())));
        res
    }

    /// Invokes the step function, catching its panics and applying the
    /// configured timeout.
    async fn invoke(
        &self,
        step: &step::Step<W>,
        world: &mut W,
        ctx: Context,
    ) -> Result<(), StepError> {
        let fut = AssertUnwindSafe(async move { step(world, ctx).await }).catch_unwind();
        let res = match self.step_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| StepError::Timeout(limit))?,
            None => fut.await,
        };
        match res {
            Ok(r) => r.map_err(StepError::from),
            Err(panic) => Err(StepError::Panic(panic_message(&*panic))),
        }
    }
}

/// Creates a [`ScenarioResult`] of a scenario never started.
fn not_started(pickle: &Pickle) -> ScenarioResult {
    ScenarioResult {
        feature: pickle.feature.clone(),
        path: pickle.path.clone(),
        name: pickle.name.clone(),
        line: pickle.line,
        tags: pickle.tags.clone(),
        example: pickle.example.clone(),
        status: Status::Skipped,
        background: pickle.background.iter().map(StepResult::skipped).collect(),
        steps: pickle.steps.iter().map(StepResult::skipped).collect(),
        error: None,
        attempts: 0,
        duration: Duration::ZERO,
    }
}

/// Extracts a human-readable message out of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_owned()))
        .unwrap_or_else(|| "unknown panic".to_owned())
}

#[cfg(test)]
mod tests {
    use std::panic;

    use super::panic_message;

    #[test]
    fn extracts_panic_messages() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom 1");

        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static");

        let payload = panic::catch_unwind(|| panic::panic_any(42)).unwrap_err();
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
