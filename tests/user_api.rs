use std::{collections::BTreeMap, convert::Infallible, io};

use async_trait::async_trait;
use serde_json::{json, Value};
use stepwise::{
    driver::{DriverError, HttpClient, Method, Response},
    report::Status,
    steps::{self, ApiState, ApiWorld},
    writer::{self, Coloring},
    Suite, World, WriterExt as _,
};

/// In-memory users API answering like the real service does.
#[derive(Debug)]
struct FakeApi {
    users: BTreeMap<i64, Value>,
    next_id: i64,
    requests: Vec<String>,
}

impl Default for FakeApi {
    fn default() -> Self {
        let users = [(1, "janet", "Janet"), (2, "emma", "Emma")]
            .into_iter()
            .map(|(id, username, name)| {
                let user = json!({
                    "id": id,
                    "username": username,
                    "email": format!("{username}@reqres.in"),
                    "first_name": name,
                    "last_name": "Weaver",
                });
                (id, user)
            })
            .collect();
        Self { users, next_id: 100, requests: Vec::new() }
    }
}

impl FakeApi {
    fn id(path: &str) -> Option<i64> {
        path.strip_prefix("/users/")?.parse().ok()
    }
}

#[async_trait(?Send)]
impl HttpClient for FakeApi {
    async fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, DriverError> {
        self.requests.push(format!("{method} {path}"));

        let resp = match (method, path, Self::id(path)) {
            (Method::Post, "/users", _) => {
                let mut user = body.unwrap_or_default();
                user["id"] = json!(self.next_id);
                _ = self.users.insert(self.next_id, user.clone());
                self.next_id += 1;
                Response::new(201, user)
            }
            (Method::Get, _, Some(id)) => match self.users.get(&id) {
                Some(user) => Response::new(200, user.clone()),
                None => Response::new(404, Value::Null),
            },
            (Method::Put, _, Some(id)) => match self.users.get_mut(&id) {
                Some(user) => {
                    if let (Some(user), Some(Value::Object(update))) =
                        (user.as_object_mut(), body)
                    {
                        user.extend(update);
                    }
                    Response::new(200, user.clone())
                }
                None => Response::new(404, Value::Null),
            },
            (Method::Delete, _, Some(id)) => match self.users.remove(&id) {
                Some(_) => Response::new(204, Value::Null),
                None => Response::new(404, Value::Null),
            },
            _ => {
                return Err(DriverError::Request {
                    method,
                    path: path.to_owned(),
                    reason: "unsupported route".into(),
                })
            }
        };
        Ok(resp)
    }
}

#[derive(Debug, Default)]
struct ApiTest {
    client: FakeApi,
    state: ApiState,
}

impl World for ApiTest {
    type Error = Infallible;

    async fn new() -> Result<Self, Infallible> {
        Ok(Self::default())
    }
}

impl ApiWorld for ApiTest {
    type Client = FakeApi;

    fn client(&mut self) -> &mut FakeApi {
        &mut self.client
    }

    fn api(&mut self) -> &mut ApiState {
        &mut self.state
    }
}

fn suite() -> Suite<ApiTest, writer::Summarize<writer::Basic<io::Sink>>> {
    Suite::<ApiTest>::new()
        .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
        .steps(steps::api::collection())
}

#[tokio::test]
async fn user_crud_flow_passes() {
    let writer = suite().run("tests/features/user_api.feature").await.unwrap();
    let report = writer.report();

    assert_eq!(report.stats().scenarios.passed, 4, "{:?}", report.failures());
    assert!(!report.execution_has_failed());
}

#[tokio::test]
async fn create_then_get_by_id() {
    let mut world = ApiTest::default();
    let steps = steps::api::collection::<ApiTest>();
    let table = "\
        | username | email            | first_name | last_name |\n\
        | johndoe  | john@example.com | John       | Doe       |\n";
    let feature = stepwise::feature::Feature::parse_str(&format!(
        "Feature: f\n  Scenario: s\n    Given I have user payload with the following details\n{table}    When I send POST request to create user endpoint\n    Then the response status code should be 201\n    And the response should contain user id\n",
    ))
    .unwrap();

    for pickle in feature.pickles() {
        for step in pickle.all_steps() {
            let (def, ctx) = steps.resolve(step).unwrap();
            def.step()(&mut world, ctx).await.unwrap();
        }
    }
    assert_eq!(world.state.response.as_ref().map(|r| r.status), Some(201));
    let id = world.state.user_id.unwrap();

    world.state.user_id = Some(1);
    let pickle = stepwise::feature::Feature::parse_str(
        "Feature: f\n  Scenario: s\n    When I send GET request to get user by id endpoint\n    Then the response status code should be 200\n",
    )
    .unwrap()
    .pickles()
    .remove(0);
    for step in pickle.all_steps() {
        let (def, ctx) = steps.resolve(step).unwrap();
        def.step()(&mut world, ctx).await.unwrap();
    }
    assert_eq!(world.state.user.as_ref().and_then(|u| u.id), Some(1));
    assert_eq!(
        world.client.requests,
        ["POST /users".to_owned(), "GET /users/1".to_owned()],
    );
    assert!(world.client.users.contains_key(&id));
}

#[tokio::test]
async fn wrong_status_fails_with_expectation() {
    let feature = stepwise::feature::Feature::parse_str(
        "Feature: f\n  Scenario: missing user\n    Given a user exists with id 42\n    When I send GET request to get user by id endpoint\n    Then the response status code should be 200\n    And the response should contain user details\n",
    )
    .unwrap();

    let writer = suite().run_features(vec![feature]).await.unwrap();
    let sc = writer.report().scenarios().next().unwrap();

    assert_eq!(sc.status, Status::Failed);
    let step = sc.failed_step().unwrap();
    assert_eq!(step.text, "the response status code should be 200");
    let err = step.error.as_ref().unwrap().to_string();
    assert!(err.contains("200") && err.contains("404"), "{err}");
    assert_eq!(sc.steps[3].status, Status::Skipped);
}
