// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors of registering and resolving steps in a [`Collection`].
//!
//! [`Collection`]: super::Collection

use std::fmt;

use derive_more::with_trait::{Display, Error, From};

use super::{context::ArgumentError, location::Location, pattern::PatternError, StepKind};
use crate::feature::StepType;

/// No step definition matches a step.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
#[display("no step definition matches `{ty} {text}`")]
pub struct UndefinedStepError {
    /// Type of the step.
    pub ty: StepType,

    /// Text of the step.
    pub text: String,
}

/// Step matches multiple step definitions.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct AmbiguousStepError {
    /// Text of the step.
    pub text: String,

    /// Patterns the step matches, along with their definition [`Location`]s,
    /// sorted.
    pub candidates: Vec<(String, Location)>,
}

impl fmt::Display for AmbiguousStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step `{}` is ambiguous, possible matches:", self.text)?;
        for (pattern, loc) in &self.candidates {
            write!(f, "\n{pattern} --> {loc}")?;
        }
        Ok(())
    }
}

/// Error of resolving a step into a step function.
#[derive(Clone, Debug, Display, Error, From, PartialEq)]
pub enum ResolveError {
    /// Nothing matches.
    Undefined(UndefinedStepError),

    /// More than one definition matches.
    Ambiguous(AmbiguousStepError),

    /// Captured text doesn't convert into its parameter type.
    Argument(ArgumentError),
}

/// The same pattern is registered twice for overlapping keywords.
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
#[display(
    "step pattern `{pattern}` ({kind}) is already registered at {first}, \
     registered again at {second}"
)]
pub struct DuplicateRegistrationError {
    /// Duplicated pattern.
    pub pattern: String,

    /// Keyword of the second registration.
    pub kind: StepKind,

    /// Location of the first registration.
    pub first: Location,

    /// Location of the second registration.
    pub second: Location,
}

/// Error of registering a step definition.
#[derive(Clone, Debug, Display, Error, From, PartialEq)]
pub enum RegisterError {
    /// Pattern is already registered.
    Duplicate(DuplicateRegistrationError),

    /// Pattern doesn't compile.
    Pattern(PatternError),
}

/// Two definitions both match some step text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Overlap {
    /// Text matched by both definitions.
    pub sample: String,

    /// Definition the [`Overlap::sample`] was derived from.
    pub pattern: (String, Location),

    /// Other definition matching the [`Overlap::sample`].
    pub other: (String, Location),
}

/// Registered definitions overlap, so some steps would be ambiguous.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct OverlapError {
    /// Every detected [`Overlap`].
    pub overlaps: Vec<Overlap>,
}

impl fmt::Display for OverlapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlapping step definitions:")?;
        for o in &self.overlaps {
            write!(
                f,
                "\n`{}` ({}) also matches `{}` ({}), e.g. `{}`",
                o.pattern.0, o.pattern.1, o.other.0, o.other.1, o.sample,
            )?;
        }
        Ok(())
    }
}

/// Misconfiguration of a [`Collection`] detected at startup.
///
/// [`Collection`]: super::Collection
#[derive(Clone, Debug, Display, Error, From, PartialEq)]
pub enum RegistryError {
    /// Registration failed.
    Register(RegisterError),

    /// Definitions overlap.
    Overlap(OverlapError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguity_lists_candidates() {
        let err = AmbiguousStepError {
            text: "I click the login button".into(),
            candidates: vec![
                ("I click the {word} button".into(), Location::new("steps/ui.rs", 10, 5)),
                ("I click the login button".into(), Location::new("steps/login.rs", 3, 9)),
            ],
        };
        assert_eq!(
            err.to_string(),
            "step `I click the login button` is ambiguous, possible matches:\n\
             I click the {word} button --> steps/ui.rs:10:5\n\
             I click the login button --> steps/login.rs:3:9",
        );
    }

    #[test]
    fn undefined_names_step() {
        let err = UndefinedStepError { ty: StepType::When, text: "I fly".into() };
        assert_eq!(err.to_string(), "no step definition matches `When I fly`");
    }
}
