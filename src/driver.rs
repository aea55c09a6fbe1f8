// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Collaborators driven by step functions: a web UI and an HTTP API.
//!
//! Only the narrow surface consumed by [`steps`] lives here. Browser
//! automation and HTTP transport are provided by implementors of
//! [`UiDriver`] and [`HttpClient`].
//!
//! [`steps`]: crate::steps

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use derive_more::with_trait::{Display, Error};
use serde::{Deserialize, Serialize};

/// Handle to an element located by a [`UiDriver`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Element {
    /// Selector the element was located by.
    pub selector: String,
}

impl Element {
    /// Creates a new [`Element`] located by the given `selector`.
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self { selector: selector.into() }
    }
}

/// Web UI collaborator.
#[async_trait(?Send)]
pub trait UiDriver {
    /// Opens the given `url`.
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Locates an element by its `selector`.
    ///
    /// # Errors
    ///
    /// [`DriverError::ElementNotFound`] if nothing matches.
    async fn find_element(
        &mut self,
        selector: &str,
    ) -> Result<Element, DriverError>;

    /// Clicks the given [`Element`].
    async fn click(&mut self, element: &Element) -> Result<(), DriverError>;

    /// Replaces the value of the given input [`Element`] with `text`.
    async fn fill(
        &mut self,
        element: &Element,
        text: &str,
    ) -> Result<(), DriverError>;

    /// Checks whether an element matching the selector (or containing the
    /// text) is currently visible.
    async fn is_visible(
        &mut self,
        text_or_selector: &str,
    ) -> Result<bool, DriverError>;

    /// Returns the text content of the element matching `selector`, if it's
    /// present.
    async fn text_of(
        &mut self,
        selector: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Returns the URL of the currently opened page.
    async fn current_url(&mut self) -> Result<String, DriverError>;
}

/// HTTP method of a [`HttpClient::request()`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Method {
    /// `GET` request.
    #[display("GET")]
    Get,

    /// `POST` request.
    #[display("POST")]
    Post,

    /// `PUT` request.
    #[display("PUT")]
    Put,

    /// `PATCH` request.
    #[display("PATCH")]
    Patch,

    /// `DELETE` request.
    #[display("DELETE")]
    Delete,
}

/// Response received by a [`HttpClient`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,

    /// Decoded JSON body, [`serde_json::Value::Null`] if there is none.
    pub body: serde_json::Value,
}

impl Response {
    /// Creates a new [`Response`].
    #[must_use]
    pub const fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Indicates whether the [`Response::status`] is in the `2xx` range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }
}

/// HTTP API collaborator.
#[async_trait(?Send)]
pub trait HttpClient {
    /// Performs a request to the given `path`, relative to the client's base
    /// URL, with an optional JSON `body`.
    ///
    /// Non-`2xx` statuses are returned as a [`Response`], not as an error.
    ///
    /// # Errors
    ///
    /// [`DriverError::Request`] if no response has been received.
    async fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, DriverError>;
}

/// Fault of a collaborator.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum DriverError {
    /// Element isn't present on the page.
    #[display("element not found: {_0}")]
    ElementNotFound(#[error(not(source))] String),

    /// Operation didn't finish in time.
    #[display(
        "{operation} timed out after {}",
        humantime::format_duration(*timeout)
    )]
    Timeout {
        /// Name of the operation.
        operation: String,

        /// Elapsed limit.
        timeout: Duration,
    },

    /// Page failed to load.
    #[display("failed to navigate to `{url}`: {reason}")]
    Navigation {
        /// Requested URL.
        url: String,

        /// Cause description.
        reason: String,
    },

    /// Request failed without a response.
    #[display("{method} {path} failed: {reason}")]
    Request {
        /// Method of the request.
        method: Method,

        /// Requested path.
        path: String,

        /// Cause description.
        reason: String,
    },

    /// Any other fault.
    #[display("{_0}")]
    Other(#[error(not(source))] String),
}

/// Bounds the given collaborator call by `timeout`.
///
/// # Errors
///
/// [`DriverError::Timeout`] if the `fut` doesn't resolve in time, or the
/// error of the `fut` itself. Propagated out of a step, the former becomes a
/// [`Failure::Timeout`].
///
/// [`Failure::Timeout`]: crate::step::Failure::Timeout
pub async fn with_timeout<T, F>(
    operation: impl Into<String>,
    timeout: Duration,
    fut: F,
) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
        Err(DriverError::Timeout { operation: operation.into(), timeout })
    })
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn timeout_names_operation() {
        let err = with_timeout(
            "find `#Input_Email`",
            Duration::from_millis(10),
            future::pending::<Result<(), _>>(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "find `#Input_Email` timed out after 10ms");
    }

    #[tokio::test]
    async fn passes_through_in_time() {
        let res = with_timeout("get", Duration::from_secs(1), async {
            Err::<(), _>(DriverError::ElementNotFound("#x".into()))
        })
        .await;

        assert_eq!(res, Err(DriverError::ElementNotFound("#x".into())));
    }

    #[tokio::test]
    async fn expired_call_times_the_step_out() {
        let res: crate::step::Result = async {
            with_timeout(
                "wait for `.error-message`",
                Duration::from_millis(5),
                future::pending::<Result<(), _>>(),
            )
            .await?;
            Ok(())
        }
        .await;

        let err = crate::report::StepError::from(res.unwrap_err());
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.status(), crate::report::Status::Errored);
    }

    #[test]
    fn method_displays_uppercase() {
        assert_eq!(
            format!("{} /users/1", Method::Delete),
            "DELETE /users/1",
        );
        assert!(Response::new(204, serde_json::Value::Null).is_success());
        assert!(!Response::new(404, serde_json::Value::Null).is_success());
    }
}
