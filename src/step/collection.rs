// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Collection`] of step definitions.

use std::{fmt, ptr, rc::Rc};

use futures::future::LocalBoxFuture;
use itertools::Itertools as _;

use super::{
    context::{ArgumentError, Capture, Context},
    error::{
        AmbiguousStepError, DuplicateRegistrationError, Overlap, OverlapError,
        RegisterError, RegistryError, ResolveError, UndefinedStepError,
    },
    location::Location,
    pattern::{Pattern, PatternError},
    Result, Step, StepKind,
};
use crate::feature::{PickleStep, StepType};

/// Registered step definition.
pub struct Definition<World> {
    /// Keyword the definition is registered for.
    pub kind: StepKind,

    /// Pattern a step text has to match.
    pub pattern: Pattern,

    /// Registration call site.
    pub location: Location,

    step: Step<World>,
}

impl<World> Definition<World> {
    /// Returns the [`Step`] function of this [`Definition`].
    #[must_use]
    pub fn step(&self) -> &Step<World> {
        &self.step
    }
}

// Implemented manually to omit redundant `World: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<World> Clone for Definition<World> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            pattern: self.pattern.clone(),
            location: self.location,
            step: Rc::clone(&self.step),
        }
    }
}

impl<World> fmt::Debug for Definition<World> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("kind", &self.kind)
            .field("pattern", &self.pattern.as_str())
            .field("location", &self.location)
            .field("step", &format_args!("{:p}", Rc::as_ptr(&self.step)))
            .finish()
    }
}

/// [`Definition`] a step resolved to, along with its typed [`Capture`]s.
pub struct Match<'c, World> {
    /// Matched [`Definition`].
    pub definition: &'c Definition<World>,

    /// Captured arguments.
    pub captures: Vec<Capture>,
}

impl<World> fmt::Debug for Match<'_, World> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("definition", self.definition)
            .field("captures", &self.captures)
            .finish()
    }
}

/// Collection of step [`Definition`]s.
///
/// Every step has to match exactly one [`Definition`]. Resolution is a pure
/// lookup, so a [`Collection`] is shared read-only by all the scenarios of a
/// run.
pub struct Collection<World> {
    /// [`Definition`]s in registration order.
    definitions: Vec<Definition<World>>,

    /// Errors of builder-style registrations, reported by
    /// [`Collection::validate()`].
    deferred: Vec<RegisterError>,
}

// Implemented manually to omit redundant `World: Clone` trait bound, imposed by
// `#[derive(Clone)]`.
impl<World> Clone for Collection<World> {
    fn clone(&self) -> Self {
        Self {
            definitions: self.definitions.clone(),
            deferred: self.deferred.clone(),
        }
    }
}

// Implemented manually to omit redundant `World: Default` trait bound, imposed
// by `#[derive(Default)]`.
impl<World> Default for Collection<World> {
    fn default() -> Self {
        Self { definitions: Vec::new(), deferred: Vec::new() }
    }
}

impl<World> fmt::Debug for Collection<World> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("definitions", &self.definitions)
            .field("deferred", &self.deferred)
            .finish()
    }
}

impl<World: 'static> Collection<World> {
    /// Creates a new empty [`Collection`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step function for the `expr`ession with typed parameters.
    ///
    /// # Errors
    ///
    /// - [`RegisterError::Pattern`] if the `expr` doesn't compile.
    /// - [`RegisterError::Duplicate`] if the same pattern is already
    ///   registered for an overlapping [`StepKind`].
    #[track_caller]
    pub fn register<F>(
        &mut self,
        kind: StepKind,
        expr: &str,
        step: F,
    ) -> std::result::Result<&mut Self, RegisterError>
    where
        F: for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        let loc = Location::caller();
        self.insert(kind, Pattern::expr(expr), Rc::new(step), loc)?;
        Ok(self)
    }

    /// Registers a step function for the raw `regex`.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::register()`].
    #[track_caller]
    pub fn register_regex<F>(
        &mut self,
        kind: StepKind,
        regex: &str,
        step: F,
    ) -> std::result::Result<&mut Self, RegisterError>
    where
        F: for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        let loc = Location::caller();
        self.insert(kind, Pattern::regex(regex), Rc::new(step), loc)?;
        Ok(self)
    }

    /// Adds a [Given] step function matching the `expr`.
    ///
    /// Registration errors are reported by [`Collection::validate()`].
    ///
    /// [Given]: https://cucumber.io/docs/gherkin/reference#given
    #[must_use]
    #[track_caller]
    pub fn given<F>(self, expr: &str, step: F) -> Self
    where
        F: for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.defer(StepKind::Given, Pattern::expr(expr), Rc::new(step))
    }

    /// Adds a [When] step function matching the `expr`.
    ///
    /// Registration errors are reported by [`Collection::validate()`].
    ///
    /// [When]: https://cucumber.io/docs/gherkin/reference#when
    #[must_use]
    #[track_caller]
    pub fn when<F>(self, expr: &str, step: F) -> Self
    where
        F: for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.defer(StepKind::When, Pattern::expr(expr), Rc::new(step))
    }

    /// Adds a [Then] step function matching the `expr`.
    ///
    /// Registration errors are reported by [`Collection::validate()`].
    ///
    /// [Then]: https://cucumber.io/docs/gherkin/reference#then
    #[must_use]
    #[track_caller]
    pub fn then<F>(self, expr: &str, step: F) -> Self
    where
        F: for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.defer(StepKind::Then, Pattern::expr(expr), Rc::new(step))
    }

    /// Adds a step function matching the `expr` for steps of any type.
    ///
    /// Registration errors are reported by [`Collection::validate()`].
    #[must_use]
    #[track_caller]
    pub fn step<F>(self, expr: &str, step: F) -> Self
    where
        F: for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.defer(StepKind::Any, Pattern::expr(expr), Rc::new(step))
    }

    /// Adds a step function matching the raw `regex`.
    ///
    /// Registration errors are reported by [`Collection::validate()`].
    #[must_use]
    #[track_caller]
    pub fn regex<F>(self, kind: StepKind, regex: &str, step: F) -> Self
    where
        F: for<'a> Fn(&'a mut World, Context) -> LocalBoxFuture<'a, Result>
            + 'static,
    {
        self.defer(kind, Pattern::regex(regex), Rc::new(step))
    }

    /// Appends all the [`Definition`]s of the `other` [`Collection`].
    ///
    /// Duplicates are reported by [`Collection::validate()`].
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.deferred.extend(other.deferred);
        for def in other.definitions {
            if let Err(e) = self.insert(def.kind, Ok(def.pattern), def.step, def.location) {
                self.deferred.push(e);
            }
        }
        self
    }

    #[track_caller]
    fn defer(
        mut self,
        kind: StepKind,
        pattern: std::result::Result<Pattern, PatternError>,
        step: Step<World>,
    ) -> Self {
        let loc = Location::caller();
        if let Err(e) = self.insert(kind, pattern, step, loc) {
            tracing::error!(location = %loc, error = %e, "invalid step definition");
            self.deferred.push(e);
        }
        self
    }

    fn insert(
        &mut self,
        kind: StepKind,
        pattern: std::result::Result<Pattern, PatternError>,
        step: Step<World>,
        location: Location,
    ) -> std::result::Result<(), RegisterError> {
        let pattern = pattern?;
        if let Some(existing) = self
            .definitions
            .iter()
            .find(|d| d.pattern == pattern && d.kind.overlaps(kind))
        {
            return Err(DuplicateRegistrationError {
                pattern: pattern.as_str().to_owned(),
                kind,
                first: existing.location,
                second: location,
            }
            .into());
        }
        self.definitions.push(Definition { kind, pattern, location, step });
        Ok(())
    }
}

impl<World> Collection<World> {
    /// Returns the number of registered [`Definition`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Indicates whether no [`Definition`] is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterates over the registered [`Definition`]s in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition<World>> {
        self.definitions.iter()
    }

    /// Resolves the [`PickleStep`] into its [`Definition`] and a [`Context`]
    /// to invoke it with.
    ///
    /// # Errors
    ///
    /// See [`Collection::resolve_text()`].
    pub fn resolve(
        &self,
        step: &PickleStep,
    ) -> std::result::Result<(&Definition<World>, Context), ResolveError> {
        let Match { definition, captures } = self.resolve_text(step.ty, &step.text)?;
        Ok((definition, Context::new(step.clone(), captures)))
    }

    /// Finds the single [`Definition`] matching the step `text` of the given
    /// [`StepType`], and converts the captured values.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Undefined`] if nothing matches.
    /// - [`ResolveError::Ambiguous`] if more than one [`Definition`] matches.
    /// - [`ResolveError::Argument`] if a captured value doesn't convert into
    ///   its parameter type.
    pub fn resolve_text(
        &self,
        ty: StepType,
        text: &str,
    ) -> std::result::Result<Match<'_, World>, ResolveError> {
        let mut matched = self
            .definitions
            .iter()
            .filter(|d| d.kind.accepts(ty))
            .filter_map(|d| d.pattern.captures(text).map(|raw| (d, raw)))
            .collect::<Vec<_>>();

        if matched.len() > 1 {
            return Err(AmbiguousStepError {
                text: text.to_owned(),
                candidates: matched
                    .into_iter()
                    .map(|(d, _)| (d.pattern.as_str().to_owned(), d.location))
                    .sorted()
                    .collect(),
            }
            .into());
        }
        let (definition, raw) = matched.pop().ok_or_else(|| UndefinedStepError {
            ty,
            text: text.to_owned(),
        })?;

        let captures = definition
            .pattern
            .params()
            .iter()
            .zip(raw)
            .map(|(param, raw)| {
                let value = param.ty.convert(raw).ok_or_else(|| {
                    ArgumentError::Conversion {
                        value: raw.to_owned(),
                        expected: param.ty.as_str(),
                    }
                })?;
                Ok(Capture { name: param.name.clone(), value })
            })
            .collect::<std::result::Result<Vec<_>, ArgumentError>>()?;

        Ok(Match { definition, captures })
    }

    /// Checks this [`Collection`] for misconfiguration.
    ///
    /// Every expression pattern is sampled into a step text, and any other
    /// keyword-compatible [`Definition`] matching that text is reported as an
    /// [`Overlap`].
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Register`] if some builder-style registration
    ///   failed.
    /// - [`RegistryError::Overlap`] if any [`Overlap`] is detected.
    pub fn validate(&self) -> std::result::Result<(), RegistryError> {
        if let Some(e) = self.deferred.first() {
            return Err(e.clone().into());
        }

        let overlaps = self
            .definitions
            .iter()
            .filter_map(|d| d.pattern.sample().map(|s| (d, s)))
            .flat_map(|(d, sample)| {
                self.definitions
                    .iter()
                    .filter(move |other| {
                        !ptr::eq(*other, d)
                            && other.kind.overlaps(d.kind)
                            && other.pattern.is_match(sample)
                    })
                    .map(move |other| Overlap {
                        sample: sample.to_owned(),
                        pattern: (d.pattern.as_str().to_owned(), d.location),
                        other: (other.pattern.as_str().to_owned(), other.location),
                    })
            })
            .collect::<Vec<_>>();

        if overlaps.is_empty() {
            Ok(())
        } else {
            Err(OverlapError { overlaps }.into())
        }
    }
}
