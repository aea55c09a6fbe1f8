// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Failure`]s returned by step functions.

use std::{fmt, time::Duration};

use derive_more::with_trait::{Error, From};

use super::context::ArgumentError;
use crate::driver::DriverError;

/// Reason a step function didn't succeed.
///
/// An [`Failure::Assertion`] fails the scenario, while any other variant is
/// an unexpected fault that errors it.
#[derive(Clone, Debug, Error, From, PartialEq)]
pub enum Failure {
    /// Checked expectation doesn't hold.
    #[from(skip)]
    Assertion {
        /// What was checked.
        message: String,

        /// Expected value, if known.
        expected: Option<String>,

        /// Actual value, if known.
        actual: Option<String>,
    },

    /// Operation didn't finish in time.
    #[from(skip)]
    Timeout(#[error(not(source))] Duration),

    /// Collaborator (browser or HTTP client) fault.
    #[from(skip)]
    Collaborator(DriverError),

    /// Captured argument doesn't fit.
    Argument(ArgumentError),
}

impl Failure {
    /// Creates a [`Failure::Assertion`] without expected/actual values.
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion { message: message.into(), expected: None, actual: None }
    }

    /// Creates a [`Failure::Assertion`] describing a value mismatch.
    #[must_use]
    pub fn mismatch(
        message: impl Into<String>,
        expected: impl fmt::Debug,
        actual: impl fmt::Debug,
    ) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: Some(format!("{expected:?}")),
            actual: Some(format!("{actual:?}")),
        }
    }

    /// Indicates whether this [`Failure`] is an assertion failure, rather
    /// than an unexpected fault.
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assertion { message, expected, actual } => {
                write!(f, "{message}")?;
                if let Some(expected) = expected {
                    write!(f, "\n  expected: {expected}")?;
                }
                if let Some(actual) = actual {
                    write!(f, "\n    actual: {actual}")?;
                }
                Ok(())
            }
            Self::Timeout(d) => {
                write!(f, "timed out after {}", humantime::format_duration(*d))
            }
            Self::Collaborator(e) => write!(f, "{e}"),
            Self::Argument(e) => write!(f, "{e}"),
        }
    }
}

impl From<DriverError> for Failure {
    /// Expired [`DriverError::Timeout`]s become [`Failure::Timeout`]s, so the
    /// step is reported as timed out rather than as a collaborator fault.
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout { timeout, .. } => Self::Timeout(timeout),
            e => Self::Collaborator(e),
        }
    }
}

/// Fails with a [`Failure::Assertion`] unless `condition` holds.
///
/// # Errors
///
/// If `condition` is `false`.
pub fn ensure(condition: bool, message: impl Into<String>) -> Result<(), Failure> {
    if condition {
        Ok(())
    } else {
        Err(Failure::assertion(message))
    }
}

/// Fails with a [`Failure::Assertion`] unless `actual` equals `expected`.
///
/// # Errors
///
/// If the values differ.
pub fn ensure_eq<E, A>(
    message: impl Into<String>,
    expected: E,
    actual: A,
) -> Result<(), Failure>
where
    E: fmt::Debug,
    A: fmt::Debug + PartialEq<E>,
{
    if actual == expected {
        Ok(())
    } else {
        Err(Failure::mismatch(message, expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_expected_and_actual() {
        let err = ensure_eq("status code", 201, 500).unwrap_err();
        assert!(err.is_assertion());
        assert_eq!(
            err.to_string(),
            "status code\n  expected: 201\n    actual: 500",
        );

        assert_eq!(
            ensure(false, "user id present").unwrap_err().to_string(),
            "user id present",
        );
        assert_eq!(ensure_eq("same", "a".to_owned(), "a".to_owned()), Ok(()));
    }

    #[test]
    fn faults_are_not_assertions() {
        let timeout = Failure::Timeout(Duration::from_millis(1500));
        assert!(!timeout.is_assertion());
        assert_eq!(timeout.to_string(), "timed out after 1s 500ms");

        let arg = Failure::from(ArgumentError::Missing("0".into()));
        assert!(!arg.is_assertion());
    }
}
