// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Definitions for a [`Collection`] which is used to store [`Step`] functions
//! and their corresponding [`Pattern`]s.

pub mod collection;
pub mod context;
pub mod error;
pub mod failure;
pub mod location;
pub mod pattern;
pub mod regex;

use std::rc::Rc;

use derive_more::with_trait::Display;
use futures::future::LocalBoxFuture;
use serde::Serialize;

use crate::feature::StepType;

#[doc(inline)]
pub use self::{
    collection::{Collection, Definition, Match},
    context::{Argument, ArgumentError, Capture, Context},
    error::{
        AmbiguousStepError, DuplicateRegistrationError, Overlap, OverlapError,
        RegisterError, RegistryError, ResolveError, UndefinedStepError,
    },
    failure::{ensure, ensure_eq, Failure},
    location::Location,
    pattern::{Param, ParamType, Pattern, PatternError, PatternErrorKind},
    regex::HashableRegex,
};

/// Result of a [`Step`] function.
pub type Result<T = ()> = std::result::Result<T, Failure>;

/// Step function, borrowing the `World` for the duration of its execution.
pub type Step<World> =
    Rc<dyn for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>>;

/// Keyword a step definition is registered for.
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum StepKind {
    /// `Given` steps only.
    Given,

    /// `When` steps only.
    When,

    /// `Then` steps only.
    Then,

    /// Steps of any type.
    #[display("Step")]
    Any,
}

impl StepKind {
    /// Checks whether a step of the given [`StepType`] may resolve to a
    /// definition of this [`StepKind`].
    #[must_use]
    pub fn accepts(self, ty: StepType) -> bool {
        self == Self::Any || self == Self::from(ty)
    }

    /// Checks whether some [`StepType`] is accepted by both [`StepKind`]s.
    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        self == other || self == Self::Any || other == Self::Any
    }
}

impl From<StepType> for StepKind {
    fn from(ty: StepType) -> Self {
        match ty {
            StepType::Given => Self::Given,
            StepType::When => Self::When,
            StepType::Then => Self::Then,
        }
    }
}
