// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Writer`]-wrapper for collecting a [`Report`] of an execution.

use async_trait::async_trait;
use derive_more::with_trait::Deref;

use crate::{
    event,
    report::{self, Report},
    writer, Event, Writer,
};

/// Wrapper for a [`Writer`] aggregating a [`Report`] out of the events it
/// passes through.
///
/// Results are accounted as scenarios finish, so the [`Report`] is usable
/// for live inspection too, not only after the execution.
#[derive(Clone, Debug, Deref)]
pub struct Summarize<W> {
    /// Original [`Writer`] to summarize output of.
    #[deref]
    writer: W,

    /// Aggregated results.
    report: Report,
}

impl<W> Summarize<W> {
    /// Wraps the given [`Writer`] into a new [`Summarize`]d one.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, report: Report::new() }
    }

    /// Returns the [`Report`] aggregated so far.
    #[must_use]
    pub const fn report(&self) -> &Report {
        &self.report
    }

    /// Returns the original [`Writer`], wrapped by this [`Summarize`] one.
    #[must_use]
    pub const fn inner_writer(&self) -> &W {
        &self.writer
    }

    /// Unwraps this [`Summarize`] into its [`Report`] and original
    /// [`Writer`].
    #[must_use]
    pub fn into_inner(self) -> (Report, W) {
        (self.report, self.writer)
    }
}

#[async_trait(?Send)]
impl<W: Writer> Writer for Summarize<W> {
    type Cli = W::Cli;

    async fn handle_event(&mut self, ev: Event<event::Cucumber>, cli: &Self::Cli) {
        self.report.record(&ev);
        self.writer.handle_event(ev, cli).await;
    }
}

impl<W: Writer> writer::Stats for Summarize<W> {
    fn stats(&self) -> report::Stats {
        self.report.stats()
    }

    fn execution_has_failed(&self) -> bool {
        self.report.execution_has_failed()
    }
}
