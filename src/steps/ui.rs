// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Steps of the web UI flows: login, claim submission and common
//! navigation.

use std::time::Duration;

use futures::{future::LocalBoxFuture, FutureExt as _};

use crate::{
    config::AppSettings,
    driver::{self, DriverError, UiDriver},
    step::{self, ensure, Context, Failure},
    World,
};

/// Selectors of the pages the steps interact with.
pub mod selector {
    /// Username input of the login form.
    pub const USERNAME: &str = "#Input_Email";

    /// Password input of the login form.
    pub const PASSWORD: &str = "#Input_Password";

    /// Submit button of the login form.
    pub const LOGIN_BUTTON: &str = "//*[@id='LoginForm']/div[3]/div[2]/button/span";

    /// Error feedback of the login form.
    pub const LOGIN_ERROR: &str = "//div[@class='feedback-message-text']";

    /// Container shown once logged in.
    pub const LOGGED_IN: &str = "#inventory_container";

    /// Generic error message.
    pub const ERROR: &str = ".error-message";

    /// Generic success message.
    pub const SUCCESS: &str = ".success-message";

    /// Reference number of a submitted claim.
    pub const CLAIM_REFERENCE: &str = ".claim-reference";

    /// Confirmation dialog.
    pub const CONFIRMATION_DIALOG: &str = ".confirmation-dialog";

    /// Confirming button of a dialog.
    pub const CONFIRM: &str = "button:has-text(\"Yes\")";

    /// File input of the claim form.
    pub const FILE_UPLOAD: &str = "#file_upload";

    /// Item of a claims list.
    pub const CLAIM_ITEM: &str = ".claim-item";

    /// Returns the input selector of the given claim form `field`.
    #[must_use]
    pub fn claim_field(field: &str) -> Option<&'static str> {
        Some(match field {
            "claim_type" => "#claim_type",
            "provider_name" => "#provider_name",
            "service_date" => "#service_date",
            "claim_amount" => "#claim_amount",
            "description" => "#description",
            _ => return None,
        })
    }

    /// Returns the selector of the button with the given label.
    #[must_use]
    pub fn button(label: &str) -> String {
        match label {
            "Submit Claim" => "#submit_claim_btn".to_owned(),
            "Cancel" => "#cancel_btn".to_owned(),
            "Save Draft" => "#save_draft_btn".to_owned(),
            other => format!("button:has-text(\"{other}\")"),
        }
    }
}

/// Time to wait for a message to show up.
pub const WAIT: Duration = Duration::from_secs(10);

/// [`World`] able to run the web UI steps.
pub trait UiWorld: World {
    /// [`UiDriver`] of the application under test.
    type Driver: UiDriver;

    /// Returns the [`UiDriver`] to act with.
    fn driver(&mut self) -> &mut Self::Driver;

    /// Returns the [`UiState`] shared by the steps of a scenario.
    fn ui(&mut self) -> &mut UiState;

    /// Returns the settings of the application under test.
    fn app(&self) -> &AppSettings;
}

/// State the web UI steps pass to each other.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UiState {
    /// User logged in by the steps, if any.
    pub logged_in_user: Option<String>,

    /// Reference number of the submitted claim.
    pub claim_reference: Option<String>,
}

/// Returns the path of the page with the given name.
#[must_use]
pub fn page_path(name: &str) -> String {
    let name = name.to_lowercase();
    match name.as_str() {
        "claims" => "/claims".to_owned(),
        "submit claim" => "/claims/submit".to_owned(),
        "dashboard" => "/dashboard".to_owned(),
        "profile" => "/profile".to_owned(),
        "home" => "/home".to_owned(),
        _ => format!("/{name}"),
    }
}

/// Creates a [`step::Collection`] with all the web UI steps.
#[must_use]
pub fn collection<W: UiWorld>() -> step::Collection<W> {
    login::<W>().merge(claims()).merge(common())
}

/// Steps of the login flow.
#[must_use]
pub fn login<W: UiWorld>() -> step::Collection<W> {
    step::Collection::new()
        .given("I am on the login page", open_login::<W>)
        .when("I enter username \"{username}\"", enter_username::<W>)
        .when("I enter password \"{password}\"", enter_password::<W>)
        .when("I click the login button", click_login::<W>)
        .then("I should be logged in successfully", logged_in::<W>)
        .then("I should see the dashboard", on_dashboard::<W>)
        .then("I should see an error message \"{message}\"", error_message::<W>)
        .then("I should remain on the login page", on_login_page::<W>)
        .then("I should see \"{result}\"", sees::<W>)
}

/// Steps of the claim submission flow.
#[must_use]
pub fn claims<W: UiWorld>() -> step::Collection<W> {
    step::Collection::new()
        .when("I fill in claim details", fill_claim::<W>)
        .when("I start filling claim details", start_claim::<W>)
        .when("I attach supporting document \"{document_name}\"", attach::<W>)
        .when("I click the \"{button_name}\" button", click_button::<W>)
        .when("I confirm cancellation", confirm::<W>)
        .then("I should see a success message \"{message}\"", success_message::<W>)
        .then("I should see a confirmation dialog \"{message}\"", dialog::<W>)
        .then("the claim should appear in \"{list_name}\" list", in_list::<W>)
        .then("I should receive a claim reference number", reference::<W>)
        .then("the claim should not be submitted", not_submitted::<W>)
        .then("no claim should be submitted", no_claim::<W>)
}

/// Steps reusable across features: authentication and navigation.
#[must_use]
pub fn common<W: UiWorld>() -> step::Collection<W> {
    step::Collection::new()
        .given("I am logged in as a valid user", default_login::<W>)
        .given("I am authenticated", default_login::<W>)
        .given("I have successfully logged in", default_login::<W>)
        .given(
            "I am logged in with username \"{username}\" and password \"{password}\"",
            credentials_login::<W>,
        )
        .given("I navigate to \"{page_name}\" page", navigate::<W>)
        .when("I navigate to \"{page_name}\" page", navigate::<W>)
        .then("I should be on the \"{page_name}\" page", on_page::<W>)
}

async fn fill<D: UiDriver>(driver: &mut D, selector: &str, text: &str) -> Result<(), DriverError> {
    let el = driver.find_element(selector).await?;
    driver.fill(&el, text).await
}

async fn click<D: UiDriver>(driver: &mut D, selector: &str) -> Result<(), DriverError> {
    let el = driver.find_element(selector).await?;
    driver.click(&el).await
}

/// Waits for the element matching `selector` and returns its text.
async fn wait_text<D: UiDriver>(driver: &mut D, selector: &str) -> step::Result<String> {
    let text = driver::with_timeout(format!("wait for `{selector}`"), WAIT, async {
        match driver.text_of(selector).await? {
            Some(text) => Ok(text),
            None => Err(DriverError::ElementNotFound(selector.to_owned())),
        }
    })
    .await?;
    Ok(text)
}

fn contains(what: &str, expected: &str, actual: &str) -> step::Result {
    if actual.contains(expected) {
        Ok(())
    } else {
        Err(Failure::mismatch(format!("{what} doesn't contain the expected text"), expected, actual))
    }
}

async fn log_in<W: UiWorld>(world: &mut W, username: &str, password: &str) -> step::Result {
    let url = world.app().base_url.clone();
    let driver = world.driver();
    driver.navigate(&url).await?;
    fill(driver, selector::USERNAME, username).await?;
    fill(driver, selector::PASSWORD, password).await?;
    click(driver, selector::LOGIN_BUTTON).await?;
    tracing::debug!(%username, "logged in");
    world.ui().logged_in_user = Some(username.to_owned());
    Ok(())
}

fn open_login<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let url = format!("{}/login", world.app().base_url);
        world.driver().navigate(&url).await?;
        Ok(())
    }
    .boxed_local()
}

fn enter_username<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        fill(world.driver(), selector::USERNAME, ctx.named_str("username")?).await?;
        Ok(())
    }
    .boxed_local()
}

fn enter_password<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        fill(world.driver(), selector::PASSWORD, ctx.named_str("password")?).await?;
        Ok(())
    }
    .boxed_local()
}

fn click_login<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        click(world.driver(), selector::LOGIN_BUTTON).await?;
        Ok(())
    }
    .boxed_local()
}

fn logged_in<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let visible = world.driver().is_visible(selector::LOGGED_IN).await?;
        ensure(visible, "user should be logged in")
    }
    .boxed_local()
}

fn on_dashboard<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let url = world.driver().current_url().await?;
        contains("current URL", "/dashboard", &url)
    }
    .boxed_local()
}

fn on_login_page<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let url = world.driver().current_url().await?;
        contains("current URL", "/login", &url)
    }
    .boxed_local()
}

/// Checks the login form feedback, falling back to a generic error message.
fn error_message<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let expected = ctx.named_str("message")?;
        let driver = world.driver();
        let mut actual = driver.text_of(selector::LOGIN_ERROR).await?;
        if actual.is_none() {
            actual = driver.text_of(selector::ERROR).await?;
        }
        contains("error message", expected, actual.as_deref().unwrap_or_default())
    }
    .boxed_local()
}

fn sees<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let expected = ctx.named_str("result")?;
        let visible = world.driver().is_visible(expected).await?;
        ensure(visible, format!("`{expected}` should be visible"))
    }
    .boxed_local()
}

fn fill_claim<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let rows = ctx
            .table()
            .map(|t| t.hashes())
            .ok_or_else(|| Failure::assertion("step requires a `field | value` data table"))?;
        let driver = world.driver();
        for row in rows {
            let (Some(field), Some(value)) = (row.get("field"), row.get("value")) else {
                return Err(Failure::assertion("data table must have `field` and `value` columns"));
            };
            let selector = selector::claim_field(field)
                .ok_or_else(|| Failure::assertion(format!("unknown claim field `{field}`")))?;
            fill(driver, selector, value).await?;
            tracing::debug!(%field, %value, "filled claim field");
        }
        Ok(())
    }
    .boxed_local()
}

fn start_claim<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        fill(world.driver(), "#claim_type", "Medical").await?;
        Ok(())
    }
    .boxed_local()
}

fn attach<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let path = format!("test_data/files/{}", ctx.named_str("document_name")?);
        fill(world.driver(), selector::FILE_UPLOAD, &path).await?;
        Ok(())
    }
    .boxed_local()
}

fn click_button<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let selector = selector::button(ctx.named_str("button_name")?);
        click(world.driver(), &selector).await?;
        Ok(())
    }
    .boxed_local()
}

fn confirm<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        click(world.driver(), selector::CONFIRM).await?;
        Ok(())
    }
    .boxed_local()
}

fn success_message<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let actual = wait_text(world.driver(), selector::SUCCESS).await?;
        contains("success message", ctx.named_str("message")?, &actual)
    }
    .boxed_local()
}

fn dialog<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let actual = wait_text(world.driver(), selector::CONFIRMATION_DIALOG).await?;
        contains("confirmation dialog", ctx.named_str("message")?, &actual)
    }
    .boxed_local()
}

fn in_list<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let list = ctx.named_str("list_name")?;
        let selector = format!(
            "#{} {}",
            list.to_lowercase().replace(' ', "_"),
            selector::CLAIM_ITEM,
        );
        let visible = world.driver().is_visible(&selector).await?;
        ensure(visible, format!("claim should appear in {list}"))
    }
    .boxed_local()
}

fn reference<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let reference = wait_text(world.driver(), selector::CLAIM_REFERENCE).await?;
        ensure(!reference.trim().is_empty(), "claim reference number should be generated")?;
        tracing::debug!(%reference, "claim submitted");
        world.ui().claim_reference = Some(reference);
        Ok(())
    }
    .boxed_local()
}

fn not_submitted<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let visible = world.driver().is_visible(selector::SUCCESS).await?;
        ensure(!visible, "no success message should appear")
    }
    .boxed_local()
}

fn no_claim<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let url = world.driver().current_url().await?;
        ensure(
            !url.to_lowercase().contains("success"),
            format!("should not be on a success page after cancellation, got {url}"),
        )
    }
    .boxed_local()
}

fn default_login<W: UiWorld>(world: &mut W, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let AppSettings { username, password, .. } = world.app().clone();
        let (Some(username), Some(password)) = (username, password) else {
            return Err(Failure::assertion(
                "no default credentials: set `app.default.username` and `app.default.password`",
            ));
        };
        log_in(world, &username, &password).await
    }
    .boxed_local()
}

fn credentials_login<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let username = ctx.named_str("username")?;
        let password = ctx.named_str("password")?;
        log_in(world, username, password).await
    }
    .boxed_local()
}

fn navigate<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let url = format!("{}{}", world.app().base_url, page_path(ctx.named_str("page_name")?));
        world.driver().navigate(&url).await?;
        Ok(())
    }
    .boxed_local()
}

fn on_page<W: UiWorld>(world: &mut W, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let page = ctx.named_str("page_name")?.to_lowercase();
        let url = world.driver().current_url().await?;
        ensure(
            url.to_lowercase().contains(&page),
            format!("expected to be on {page} page, but current URL is {url}"),
        )
    }
    .boxed_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_pages_and_buttons() {
        assert_eq!(page_path("Submit Claim"), "/claims/submit");
        assert_eq!(page_path("Settings"), "/settings");
        assert_eq!(selector::button("Cancel"), "#cancel_btn");
        assert_eq!(selector::button("Next"), "button:has-text(\"Next\")");
        assert_eq!(selector::claim_field("claim_amount"), Some("#claim_amount"));
        assert_eq!(selector::claim_field("patient"), None);
    }
}
