// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tools for outputting [`Runner`] events.
//!
//! [`Runner`]: crate::Runner

pub mod basic;
#[cfg(feature = "output-json")]
pub mod json;
pub mod out;
pub mod summarize;
pub mod tee;

use async_trait::async_trait;
use sealed::sealed;

use crate::{event, report, Event};

#[cfg(feature = "output-json")]
#[doc(inline)]
pub use self::json::Json;
#[doc(inline)]
pub use self::{
    basic::{Basic, Coloring},
    summarize::Summarize,
    tee::Tee,
};

/// Writer of [`Runner`] events to some output.
///
/// The only consumer of the [`Runner`]'s event stream, so implementors never
/// observe events concurrently.
///
/// [`Runner`]: crate::Runner
#[async_trait(?Send)]
pub trait Writer {
    /// CLI options of this [`Writer`]. In case no options should be
    /// introduced, just use [`cli::Empty`].
    ///
    /// All CLI options from [`Parser`], [`Runner`] and [`Writer`] will be
    /// merged together, so overlapping arguments will cause a runtime panic.
    ///
    /// [`cli::Empty`]: crate::cli::Empty
    /// [`Parser`]: crate::Parser
    /// [`Runner`]: crate::Runner
    type Cli: clap::Args;

    /// Handles the given [`event::Cucumber`].
    async fn handle_event(&mut self, ev: Event<event::Cucumber>, cli: &Self::Cli);
}

/// [`Writer`] tracking the overall outcome of an execution.
pub trait Stats: Writer {
    /// Returns statistics of the events handled so far.
    #[must_use]
    fn stats(&self) -> report::Stats;

    /// Indicates whether there were failures/errors during execution.
    #[must_use]
    fn execution_has_failed(&self) -> bool {
        let stats = self.stats();
        stats.scenarios.failed > 0
            || stats.scenarios.errored > 0
            || stats.parsing_errors > 0
    }
}

/// Extension of [`Writer`] allowing its summarization and teeing.
#[sealed]
pub trait Ext: Writer + Sized {
    /// Wraps this [`Writer`] to aggregate a [`report::Report`].
    ///
    /// See [`Summarize`] for more information.
    #[must_use]
    fn summarized(self) -> Summarize<Self>;

    /// Passes events to both this and the `other` [`Writer`].
    ///
    /// See [`Tee`] for more information.
    #[must_use]
    fn tee<R: Writer>(self, other: R) -> Tee<Self, R>;
}

#[sealed]
impl<T: Writer + Sized> Ext for T {
    fn summarized(self) -> Summarize<Self> {
        Summarize::new(self)
    }

    fn tee<R: Writer>(self, other: R) -> Tee<Self, R> {
        Tee::new(self, other)
    }
}
