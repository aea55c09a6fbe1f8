// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Context`] a step function is invoked with.

use derive_more::with_trait::{Display, Error};

use crate::feature::{PickleStep, Table};

/// Value captured from a step text, typed by its pattern parameter.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum Argument {
    /// `{int}`.
    Int(i64),

    /// `{float}`.
    Float(f64),

    /// `{word}`.
    Word(String),

    /// `{string}`, without the quotes.
    Str(String),

    /// `{}`, `{name}` or a raw regex group.
    Any(String),
}

impl Argument {
    /// Returns the textual value of a [`Argument::Word`], [`Argument::Str`]
    /// or [`Argument::Any`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Word(s) | Self::Str(s) | Self::Any(s) => Some(s),
            Self::Int(_) | Self::Float(_) => None,
        }
    }

    /// Returns the value of an [`Argument::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value of an [`Argument::Float`] or an [`Argument::Int`].
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[expect(
                clippy::as_conversions,
                reason = "no lossless conversion from `i64` to `f64` exists"
            )]
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Word(_) => "word",
            Self::Str(_) => "string",
            Self::Any(_) => "any",
        }
    }
}

/// Single captured [`Argument`].
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    /// Name of the parameter, if it has one.
    pub name: Option<String>,

    /// Captured value.
    pub value: Argument,
}

/// Error of accessing an [`Argument`] of a [`Context`].
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum ArgumentError {
    /// Captured text doesn't fit the parameter type.
    #[display("cannot convert `{value}` to {expected}")]
    Conversion {
        /// Captured text.
        value: String,

        /// Expected parameter type.
        expected: &'static str,
    },

    /// No such argument.
    #[display("step has no argument `{_0}`")]
    Missing(#[error(not(source))] String),

    /// Argument has another type.
    #[display("argument `{key}` is {actual}, not {expected}")]
    Type {
        /// Index or name of the argument.
        key: String,

        /// Requested type.
        expected: &'static str,

        /// Actual type.
        actual: &'static str,
    },
}

/// Context for a step function execution.
#[derive(Clone, Debug)]
pub struct Context {
    /// Step matched to a step function.
    pub step: PickleStep,

    /// Captured arguments, in order of appearance.
    pub captures: Vec<Capture>,
}

impl Context {
    /// Creates a new [`Context`].
    #[must_use]
    pub const fn new(step: PickleStep, captures: Vec<Capture>) -> Self {
        Self { step, captures }
    }

    /// Returns the `index`th (0-based) captured [`Argument`].
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Argument> {
        self.captures.get(index).map(|c| &c.value)
    }

    /// Returns the [`Argument`] of the parameter with the given `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&Argument> {
        self.captures
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .map(|c| &c.value)
    }

    /// Returns the `index`th [`Argument`] as an integer.
    ///
    /// # Errors
    ///
    /// If there is no such [`Argument`], or it's not an [`Argument::Int`].
    pub fn int(&self, index: usize) -> Result<i64, ArgumentError> {
        let arg = self.require(index)?;
        arg.as_int().ok_or_else(|| mismatch(index, "int", arg))
    }

    /// Returns the `index`th [`Argument`] as a float.
    ///
    /// # Errors
    ///
    /// If there is no such [`Argument`], or it's not numeric.
    pub fn float(&self, index: usize) -> Result<f64, ArgumentError> {
        let arg = self.require(index)?;
        arg.as_float().ok_or_else(|| mismatch(index, "float", arg))
    }

    /// Returns the `index`th [`Argument`] as text.
    ///
    /// # Errors
    ///
    /// If there is no such [`Argument`], or it's numeric.
    pub fn str(&self, index: usize) -> Result<&str, ArgumentError> {
        let arg = self.require(index)?;
        arg.as_str().ok_or_else(|| mismatch(index, "string", arg))
    }

    /// Returns the named [`Argument`] as an integer.
    ///
    /// # Errors
    ///
    /// If there is no such [`Argument`], or it's not an [`Argument::Int`].
    pub fn named_int(&self, name: &str) -> Result<i64, ArgumentError> {
        let arg = self.require_named(name)?;
        arg.as_int().ok_or_else(|| mismatch(name, "int", arg))
    }

    /// Returns the named [`Argument`] as text.
    ///
    /// # Errors
    ///
    /// If there is no such [`Argument`], or it's numeric.
    pub fn named_str(&self, name: &str) -> Result<&str, ArgumentError> {
        let arg = self.require_named(name)?;
        arg.as_str().ok_or_else(|| mismatch(name, "string", arg))
    }

    /// Returns the data table attached to the step, if any.
    #[must_use]
    pub fn table(&self) -> Option<&Table> {
        self.step.table.as_ref()
    }

    /// Returns the doc string content attached to the step, if any.
    #[must_use]
    pub fn docstring(&self) -> Option<&str> {
        self.step.docstring.as_ref().map(|d| d.content.as_str())
    }

    fn require(&self, index: usize) -> Result<&Argument, ArgumentError> {
        self.arg(index)
            .ok_or_else(|| ArgumentError::Missing(index.to_string()))
    }

    fn require_named(&self, name: &str) -> Result<&Argument, ArgumentError> {
        self.named(name)
            .ok_or_else(|| ArgumentError::Missing(name.to_owned()))
    }
}

fn mismatch(key: impl ToString, expected: &'static str, arg: &Argument) -> ArgumentError {
    ArgumentError::Type { key: key.to_string(), expected, actual: arg.kind() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{Keyword, StepType};

    fn context(captures: Vec<Capture>) -> Context {
        Context::new(
            PickleStep {
                keyword: Keyword::Then,
                ty: StepType::Then,
                text: "the response status code should be 201".into(),
                table: Some(Table::from(vec![vec!["username"], vec!["johndoe"]])),
                docstring: None,
                line: 3,
            },
            captures,
        )
    }

    #[test]
    fn accesses_by_index_and_name() {
        let ctx = context(vec![
            Capture { name: Some("status_code".into()), value: Argument::Int(201) },
            Capture { name: None, value: Argument::Str("ok".into()) },
        ]);

        assert_eq!(ctx.int(0), Ok(201));
        assert_eq!(ctx.float(0), Ok(201.0));
        assert_eq!(ctx.named_int("status_code"), Ok(201));
        assert_eq!(ctx.str(1), Ok("ok"));
        assert_eq!(ctx.table().unwrap().hashes()[0]["username"], "johndoe");
        assert_eq!(ctx.docstring(), None);
    }

    #[test]
    fn reports_missing_and_mistyped_arguments() {
        let ctx = context(vec![Capture { name: None, value: Argument::Word("x".into()) }]);

        assert_eq!(ctx.int(3), Err(ArgumentError::Missing("3".into())));
        assert_eq!(
            ctx.int(0).unwrap_err().to_string(),
            "argument `0` is word, not int",
        );
        assert_eq!(
            ctx.named_str("user_id"),
            Err(ArgumentError::Missing("user_id".into())),
        );
    }
}
