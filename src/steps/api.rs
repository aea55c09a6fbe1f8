// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Steps of the user CRUD API flow.
//!
//! ```gherkin
//! Scenario: Create a new user
//!   Given I have user payload with the following details
//!     | username | email            | first_name | last_name |
//!     | johndoe  | john@example.com | John       | Doe       |
//!   When I send POST request to create user endpoint
//!   Then the response status code should be 201
//!   And the response should contain user id
//! ```

use futures::{future::LocalBoxFuture, FutureExt as _};
use lazy_regex::regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    driver::{HttpClient, Method, Response},
    step::{self, ensure, ensure_eq, Context, Failure},
    World,
};

/// Path of the users collection.
pub const USERS: &str = "/users";

/// [`World`] able to run the user API steps.
pub trait ApiWorld: World {
    /// [`HttpClient`] of the API under test.
    type Client: HttpClient;

    /// Returns the [`HttpClient`] to send requests with.
    fn client(&mut self) -> &mut Self::Client;

    /// Returns the [`ApiState`] shared by the steps of a scenario.
    fn api(&mut self) -> &mut ApiState;
}

/// State the user API steps pass to each other.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApiState {
    /// Payload of the user to create.
    pub user_payload: Option<Value>,

    /// Payload of the user update.
    pub update_payload: Option<Value>,

    /// Id of the user the requests address.
    pub user_id: Option<i64>,

    /// Last received [`Response`].
    pub response: Option<Response>,

    /// [`User`] decoded from the last successful [`Response`].
    pub user: Option<User>,
}

/// User resource of the API.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct User {
    /// Assigned by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// 3 to 50 characters.
    pub username: String,

    /// Valid email address.
    pub email: String,

    /// 1 to 50 characters.
    pub first_name: String,

    /// 1 to 50 characters.
    pub last_name: String,

    /// Optional phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Whether the account is active.
    #[serde(default = "active")]
    pub is_active: bool,
}

const fn active() -> bool {
    true
}

impl User {
    /// Returns descriptions of all the constraints this [`User`] violates.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut length = |field: &str, value: &str, min: usize, max: usize| {
            let len = value.chars().count();
            if !(min..=max).contains(&len) {
                out.push(format!("`{field}` must be {min} to {max} characters, got {len}"));
            }
        };
        length("username", &self.username, 3, 50);
        length("first_name", &self.first_name, 1, 50);
        length("last_name", &self.last_name, 1, 50);
        if !regex!(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_match(&self.email) {
            out.push(format!("`email` is not a valid address: {:?}", self.email));
        }
        out
    }
}

/// Creates a [`step::Collection`] with all the user API steps.
#[must_use]
pub fn collection<W: ApiWorld>() -> step::Collection<W> {
    step::Collection::new()
        .given("I have user payload with the following details", user_payload::<W>)
        .given("I have updated user payload", update_payload::<W>)
        .given("a user exists with id {user_id:d}", user_exists::<W>)
        .when("I send POST request to create user endpoint", create_user::<W>)
        .when("I send GET request to get user by id endpoint", get_user::<W>)
        .when("I send PUT request to update user endpoint", update_user::<W>)
        .when("I send DELETE request to delete user endpoint", delete_user::<W>)
        .when("I try to get the deleted user", get_user::<W>)
        .then("the response status code should be {status_code:d}", status_code::<W>)
        .then("the response should contain user id", contains_id::<W>)
        .then("the response should match user schema", matches_schema::<W>)
        .then("the response should contain user details", contains_details::<W>)
        .then("the response should contain updated information", contains_update::<W>)
        .then("the user should not be found", not_found::<W>)
}

fn user_payload<W: ApiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let payload = first_row(&ctx, &["username", "email", "first_name", "last_name"])?;
        world.api().user_payload = Some(payload);
        Ok(())
    }
    .boxed_local()
}

fn update_payload<W: ApiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let payload = first_row(&ctx, &["first_name", "last_name"])?;
        world.api().update_payload = Some(payload);
        Ok(())
    }
    .boxed_local()
}

fn user_exists<W: ApiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        world.api().user_id = Some(ctx.named_int("user_id")?);
        Ok(())
    }
    .boxed_local()
}

fn create_user<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let payload = world
            .api()
            .user_payload
            .clone()
            .ok_or_else(|| Failure::assertion("no user payload prepared"))?;
        send(world, Method::Post, USERS.to_owned(), Some(payload)).await?;
        let state = world.api();
        if let Some(id) = state.user.as_ref().and_then(|u| u.id) {
            state.user_id = Some(id);
        }
        Ok(())
    }
    .boxed_local()
}

fn get_user<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let path = user_path(world)?;
        send(world, Method::Get, path, None).await
    }
    .boxed_local()
}

fn update_user<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let path = user_path(world)?;
        let payload = world
            .api()
            .update_payload
            .clone()
            .ok_or_else(|| Failure::assertion("no update payload prepared"))?;
        send(world, Method::Put, path, Some(payload)).await
    }
    .boxed_local()
}

fn delete_user<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let path = user_path(world)?;
        send(world, Method::Delete, path, None).await
    }
    .boxed_local()
}

fn status_code<W: ApiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let expected = ctx.named_int("status_code")?;
        let actual = last_response(world)?.status;
        ensure_eq("unexpected response status code", expected, i64::from(actual))
    }
    .boxed_local()
}

fn contains_id<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let user = decoded_user(world)?;
        ensure(user.id.is_some(), "response should contain user id")
    }
    .boxed_local()
}

fn matches_schema<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let body = last_response(world)?.body.clone();
        let user = serde_json::from_value::<User>(body).map_err(|e| {
            Failure::assertion(format!("response doesn't match user schema: {e}"))
        })?;
        let violations = user.violations();
        ensure(
            violations.is_empty(),
            format!("response doesn't match user schema: {}", violations.join("; ")),
        )
    }
    .boxed_local()
}

fn contains_details<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let expected = world.api().user_id;
        let user = decoded_user(world)?;
        ensure_eq("user id should match", expected, user.id)
    }
    .boxed_local()
}

fn contains_update<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let payload = world
            .api()
            .update_payload
            .clone()
            .ok_or_else(|| Failure::assertion("no update payload prepared"))?;
        let user = decoded_user(world)?;
        for (field, actual) in [("first_name", &user.first_name), ("last_name", &user.last_name)] {
            let expected = payload[field].as_str().unwrap_or_default();
            ensure_eq(format!("`{field}` should be updated"), expected, actual.as_str())?;
        }
        Ok(())
    }
    .boxed_local()
}

fn not_found<W: ApiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let status = last_response(world)?.status;
        ensure_eq("deleted user should not be found", 404_u16, status)
    }
    .boxed_local()
}

/// Sends the request, remembering the [`Response`] and the [`User`] decoded
/// from a successful one.
async fn send<W: ApiWorld>(
    world: &mut W,
    method: Method,
    path: String,
    body: Option<Value>,
) -> step::Result {
    let resp = world.client().request(method, &path, body).await?;
    tracing::debug!(%method, %path, status = resp.status, "API response");

    let state = world.api();
    state.user = resp
        .is_success()
        .then(|| serde_json::from_value(resp.body.clone()).ok())
        .flatten();
    state.response = Some(resp);
    Ok(())
}

fn user_path<W: ApiWorld>(world: &mut W) -> step::Result<String> {
    let id = world.api().user_id.ok_or_else(|| {
        Failure::assertion("no user id: create a user or use `a user exists with id {int}`")
    })?;
    Ok(format!("{USERS}/{id}"))
}

fn last_response<W: ApiWorld>(world: &mut W) -> step::Result<&Response> {
    world
        .api()
        .response
        .as_ref()
        .ok_or_else(|| Failure::assertion("no request has been sent"))
}

fn decoded_user<W: ApiWorld>(world: &mut W) -> step::Result<User> {
    let state = world.api();
    match (&state.user, &state.response) {
        (Some(user), _) => Ok(user.clone()),
        (None, Some(resp)) => Err(Failure::assertion(format!(
            "response should contain user details, got {} {}",
            resp.status, resp.body,
        ))),
        (None, None) => Err(Failure::assertion("no request has been sent")),
    }
}

/// Builds a JSON object out of the `fields` of the first data table row.
fn first_row(ctx: &Context, fields: &[&str]) -> step::Result<Value> {
    let row = ctx
        .table()
        .and_then(|t| t.hashes().into_iter().next())
        .ok_or_else(|| Failure::assertion("step requires a data table with a header and a row"))?;
    let mut payload = json!({});
    for field in fields {
        let value = row
            .get(*field)
            .ok_or_else(|| Failure::assertion(format!("data table has no `{field}` column")))?;
        payload[*field] = Value::from(value.as_str());
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str) -> User {
        User {
            id: Some(1),
            username: username.into(),
            email: email.into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            phone: None,
            is_active: true,
        }
    }

    #[test]
    fn validates_user_constraints() {
        assert!(user("johndoe", "john@example.com").violations().is_empty());

        let v = user("jd", "john.example.com").violations();
        assert_eq!(v.len(), 2);
        assert!(v[0].starts_with("`username` must be 3 to 50 characters, got 2"));
        assert!(v[1].starts_with("`email` is not a valid address"));
    }

    #[test]
    fn decodes_with_defaults() {
        let u: User = serde_json::from_value(json!({
            "username": "johndoe",
            "email": "john@example.com",
            "first_name": "John",
            "last_name": "Doe",
        }))
        .unwrap();
        assert_eq!(u.id, None);
        assert!(u.is_active);
    }
}
