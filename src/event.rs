// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key occurrences in a lifecycle of an execution.
//!
//! The top-level enum here is [`Cucumber`].
//!
//! Each event enum contains variants indicating what stage of execution
//! [`Runner`] is at, and variants with detailed content about the precise
//! sub-event.
//!
//! [`Runner`]: crate::Runner

use std::{sync::Arc, time::SystemTime};

use derive_more::with_trait::{AsRef, Deref, DerefMut, Display};

use crate::{
    feature::{self, Pickle, PickleStep},
    parser,
    report::{ScenarioResult, StepResult},
};

/// Arbitrary event, optionally paired with additional metadata.
#[derive(AsRef, Clone, Copy, Debug, Deref, DerefMut)]
#[non_exhaustive]
pub struct Event<T: ?Sized> {
    /// [`SystemTime`] when this [`Event`] has happened.
    pub at: SystemTime,

    /// Actual value of this [`Event`].
    #[as_ref]
    #[deref]
    #[deref_mut]
    pub value: T,
}

impl<T> Event<T> {
    /// Creates a new [`Event`] out of the given `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self { at: SystemTime::now(), value }
    }

    /// Unwraps the inner [`Event::value`] loosing all the attached metadata.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Maps the inner [`Event::value`] with the given function, keeping the
    /// metadata.
    #[must_use]
    pub fn map<V>(self, f: impl FnOnce(T) -> V) -> Event<V> {
        Event { at: self.at, value: f(self.value) }
    }
}

/// Top-level event of an execution.
#[derive(Clone, Debug)]
pub enum Cucumber {
    /// Execution being started.
    Started,

    /// A file failed to be read or parsed. Other files still run.
    ParsingFailed(parser::Error),

    /// [`Feature`] event.
    Feature(Arc<feature::Feature>, Feature),

    /// Execution being finished.
    Finished,
}

impl Cucumber {
    /// Constructs an event of a [`Feature`] being started.
    #[must_use]
    pub const fn feature_started(feat: Arc<feature::Feature>) -> Self {
        Self::Feature(feat, Feature::Started)
    }

    /// Constructs an event of a [`Feature`] being finished.
    #[must_use]
    pub const fn feature_finished(feat: Arc<feature::Feature>) -> Self {
        Self::Feature(feat, Feature::Finished)
    }

    /// Constructs a [`Scenario`] event.
    #[must_use]
    pub const fn scenario(
        feat: Arc<feature::Feature>,
        pickle: Arc<Pickle>,
        event: Scenario,
    ) -> Self {
        Self::Feature(feat, Feature::Scenario(pickle, event))
    }
}

/// Event specific to a particular [Feature].
///
/// [Feature]: https://cucumber.io/docs/gherkin/reference#feature
#[derive(Clone, Debug)]
pub enum Feature {
    /// Execution of the first selected scenario of the feature being
    /// started.
    Started,

    /// [`Scenario`] event.
    Scenario(Arc<Pickle>, Scenario),

    /// Every selected scenario of the feature being finished.
    Finished,
}

/// Event specific to a particular concrete scenario.
#[derive(Clone, Debug)]
pub enum Scenario {
    /// Attempt of the scenario being started. The first attempt is `1`.
    Started {
        /// Number of the attempt.
        attempt: usize,
    },

    /// [`Hook`] event.
    Hook(HookType, Hook),

    /// Background [`Step`] event.
    Background(Arc<PickleStep>, Step),

    /// [`Step`] event.
    Step(Arc<PickleStep>, Step),

    /// Final result of the scenario, emitted once after the last attempt.
    Finished(Arc<ScenarioResult>),
}

/// Event specific to a particular step.
#[derive(Clone, Debug)]
pub enum Step {
    /// Step execution being started.
    Started,

    /// Step execution being finished, either executed or skipped.
    Finished(StepResult),
}

/// Type of a hook executed around a scenario.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum HookType {
    /// Executing before every scenario.
    #[display("before")]
    Before,

    /// Executing after every scenario.
    #[display("after")]
    After,
}

/// Hook execution event.
#[derive(Clone, Debug, PartialEq)]
pub enum Hook {
    /// Hook execution being started.
    Started,

    /// Hook passed.
    Passed,

    /// Hook failed or panicked.
    Failed(String),
}
