// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for executing [`Step`]s.
//!
//! [`Step`]: crate::step::Step

pub mod basic;
pub mod cancel;
mod executor;

use futures::Stream;

use crate::{event, feature::Feature, parser, Event};

#[doc(inline)]
pub use self::{
    basic::{Basic, Cli, RetryOptions, ScenarioType},
    cancel::Cancellation,
};

/// Executor of [`Feature`]s' scenarios, transforming them into a [`Stream`]
/// of [`event::Cucumber`]s.
///
/// # Order guarantees
///
/// - [`event::Feature::Started`] is emitted before any event of its
///   scenarios, and [`event::Feature::Finished`] after all of them.
/// - Events of a single scenario are emitted in execution order, finishing
///   with exactly one [`event::Scenario::Finished`].
/// - Events of different scenarios may interleave, unless they're executed
///   one-by-one.
pub trait Runner<World> {
    /// CLI options of this [`Runner`]. In case no options should be
    /// introduced, just use [`cli::Empty`].
    ///
    /// [`cli::Empty`]: crate::cli::Empty
    type Cli: clap::Args;

    /// Output events [`Stream`].
    type EventStream: Stream<Item = Event<event::Cucumber>>;

    /// Executes the given [`Stream`] of [`Feature`]s transforming it into a
    /// [`Stream`] of executed [`event::Cucumber`] events.
    fn run<S>(self, features: S, cli: Self::Cli) -> Self::EventStream
    where
        S: Stream<Item = parser::Result<Feature>> + 'static;
}
