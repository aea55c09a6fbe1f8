// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cooperative [`Cancellation`] of an execution.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cloneable handle cancelling an execution.
///
/// Once cancelled, running scenarios finish their current step and skip the
/// rest, while scenarios not started yet are reported as skipped.
///
/// May be triggered from any thread, e.g. from a signal handler.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Creates a new, not yet triggered [`Cancellation`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers this [`Cancellation`] for all of its clones.
    pub fn cancel(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            tracing::info!("execution cancelled");
        }
    }

    /// Indicates whether this [`Cancellation`] has been triggered.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
