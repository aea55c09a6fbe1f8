// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Passing events to multiple terminating [`Writer`]s simultaneously.

use async_trait::async_trait;
use futures::future;

use crate::{cli, event, report, writer, Event, Writer};

/// Passes events to multiple terminating [`Writer`]s simultaneously.
///
/// Useful to output both to the console and a [`Json`] report.
///
/// [`Json`]: crate::writer::Json
#[derive(Clone, Debug)]
pub struct Tee<L, R> {
    /// Left [`Writer`].
    left: L,

    /// Right [`Writer`].
    right: R,
}

impl<L, R> Tee<L, R> {
    /// Creates a new [`Tee`] [`Writer`], which passes events both to the
    /// `left` and `right` [`Writer`]s simultaneously.
    #[must_use]
    pub const fn new(left: L, right: R) -> Self {
        Self { left, right }
    }

    /// Returns the left [`Writer`].
    #[must_use]
    pub const fn left(&self) -> &L {
        &self.left
    }

    /// Returns the right [`Writer`].
    #[must_use]
    pub const fn right(&self) -> &R {
        &self.right
    }
}

#[async_trait(?Send)]
impl<L: Writer, R: Writer> Writer for Tee<L, R> {
    type Cli = cli::Compose<L::Cli, R::Cli>;

    async fn handle_event(&mut self, ev: Event<event::Cucumber>, cli: &Self::Cli) {
        future::join(
            self.left.handle_event(ev.clone(), &cli.left),
            self.right.handle_event(ev, &cli.right),
        )
        .await;
    }
}

impl<L, R> writer::Stats for Tee<L, R>
where
    L: writer::Stats,
    R: Writer,
{
    fn stats(&self) -> report::Stats {
        self.left.stats()
    }

    fn execution_has_failed(&self) -> bool {
        self.left.execution_has_failed()
    }
}
