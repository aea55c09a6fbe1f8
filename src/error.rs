// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Crate-level error.

use derive_more::{Display, Error, From};

use crate::{config::ConfigError, step::RegistryError};

/// Error fatal to a whole [`Suite`] run.
///
/// Failures of single steps and scenarios are never reported this way: they
/// become statuses of the [`report::Report`] instead.
///
/// [`report::Report`]: crate::report::Report
/// [`Suite`]: crate::Suite
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Step definitions are misconfigured.
    #[display("Invalid step definitions: {_0}")]
    Registry(RegistryError),

    /// Configuration couldn't be loaded.
    #[display("Invalid configuration: {_0}")]
    Config(ConfigError),
}
