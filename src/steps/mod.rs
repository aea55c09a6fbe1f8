// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ready-made step libraries.
//!
//! Every library is generic over a [`World`] exposing the collaborator it
//! drives, so it may be merged into any [`step::Collection`]:
//!
//! ```rust,ignore
//! let steps = stepwise::steps::api::collection::<MyWorld>()
//!     .merge(stepwise::steps::ui::login())
//!     .then("the basket is empty", basket_is_empty);
//! ```
//!
//! [`World`]: crate::World

pub mod api;
pub mod ui;

use crate::step;

#[doc(inline)]
pub use self::{
    api::{ApiState, ApiWorld, User},
    ui::{UiState, UiWorld},
};

/// Creates a [`step::Collection`] with all the step libraries merged.
#[must_use]
pub fn collection<W: ApiWorld + UiWorld>() -> step::Collection<W> {
    api::collection().merge(ui::collection())
}
