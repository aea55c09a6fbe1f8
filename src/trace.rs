// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`tracing`] subscriber setup.
//!
//! The runtime itself only emits spans and events; installing a subscriber
//! is up to the binary running the [`Suite`]:
//!
//! ```rust,no_run
//! stepwise::trace::init("stepwise=info");
//! ```
//!
//! [`Suite`]: crate::Suite

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global [`fmt`] subscriber writing to stderr, filtered by the
/// `RUST_LOG` environment variable, or by the given `default_directive` if
/// it's absent or invalid.
///
/// Does nothing if a global subscriber is installed already, so it's safe to
/// be called from every test.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let res = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
    if res.is_ok() {
        tracing::debug!(default_directive, "tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::init;

    #[test]
    fn init_is_idempotent() {
        init("stepwise=debug");
        init("stepwise=trace");
    }
}
