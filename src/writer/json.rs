// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! [`Writer`] outputting the final [`Report`] as a single JSON document.

use std::{fmt::Debug, io, time::Duration};

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    cli, event,
    report::{self, Report, ScenarioResult, StepError, StepResult},
    writer, Event, Writer,
};

/// [`Writer`] aggregating a [`Report`] and writing it as a JSON document
/// into the given output once the execution finishes.
///
/// Intended to be [`Tee`]d with a console [`Writer`].
///
/// [`Tee`]: writer::Tee
#[derive(Clone, Debug)]
pub struct Json<Out: io::Write> {
    /// [`io::Write`] implementor to output the JSON into.
    output: Out,

    /// Results being collected.
    report: Report,
}

impl<Out: io::Write> Json<Out> {
    /// Creates a new [`Json`] [`Writer`] outputting into the given `output`.
    #[must_use]
    pub fn new(output: Out) -> Self {
        Self { output, report: Report::new() }
    }

    /// Returns the [`io::Write`] implementor the JSON is written into.
    #[must_use]
    pub const fn output(&self) -> &Out {
        &self.output
    }

    /// Unwraps this [`Json`] [`Writer`] into its output.
    #[must_use]
    pub fn into_output(self) -> Out {
        self.output
    }
}

#[async_trait(?Send)]
impl<Out: io::Write> Writer for Json<Out> {
    type Cli = cli::Empty;

    async fn handle_event(&mut self, ev: Event<event::Cucumber>, _: &Self::Cli) {
        self.report.record(&ev);
        if matches!(*ev, event::Cucumber::Finished) {
            serde_json::to_writer_pretty(&mut self.output, &Document::from(&self.report))
                .map_err(io::Error::from)
                .and_then(|()| self.output.flush())
                .unwrap_or_else(|e| panic!("Failed to write JSON report: {e}"));
        }
    }
}

impl<Out: io::Write> writer::Stats for Json<Out> {
    fn stats(&self) -> report::Stats {
        self.report.stats()
    }

    fn execution_has_failed(&self) -> bool {
        self.report.execution_has_failed()
    }
}

/// Serializable view of a [`Report`].
#[derive(Clone, Debug, Serialize)]
struct Document<'r> {
    stats: report::Stats,
    parsing_errors: Vec<String>,
    features: Vec<Feature<'r>>,
}

impl<'r> From<&'r Report> for Document<'r> {
    fn from(report: &'r Report) -> Self {
        Self {
            stats: report.stats(),
            parsing_errors: report
                .parsing_errors()
                .iter()
                .map(ToString::to_string)
                .collect(),
            features: report
                .features()
                .iter()
                .map(|f| Feature {
                    name: &f.name,
                    uri: f.path.as_ref().map(|p| p.display().to_string()),
                    scenarios: f.scenarios.iter().map(|s| Scenario::from(&**s)).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct Feature<'r> {
    name: &'r str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    scenarios: Vec<Scenario<'r>>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario<'r> {
    name: &'r str,
    line: usize,
    tags: &'r [String],
    status: report::Status,
    attempts: usize,
    duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<&'r linked_hash_map::LinkedHashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    steps: Vec<Step<'r>>,
}

impl<'r> From<&'r ScenarioResult> for Scenario<'r> {
    fn from(sc: &'r ScenarioResult) -> Self {
        Self {
            name: &sc.name,
            line: sc.line,
            tags: &sc.tags,
            status: sc.status,
            attempts: sc.attempts,
            duration: nanos(sc.duration),
            example: sc.example.as_ref().map(|e| &e.values),
            error: sc.error.as_ref().map(ToString::to_string),
            steps: sc
                .background
                .iter()
                .map(|s| Step::new(s, true))
                .chain(sc.steps.iter().map(|s| Step::new(s, false)))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct Step<'r> {
    keyword: &'static str,
    name: &'r str,
    line: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    background: bool,
    status: report::Status,
    duration: u64,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error<'r>>,
}

impl<'r> Step<'r> {
    fn new(step: &'r StepResult, background: bool) -> Self {
        Self {
            keyword: step.keyword.as_str(),
            name: &step.text,
            line: step.line,
            background,
            status: step.status,
            duration: nanos(step.duration),
            location: step.location.map(|l| l.to_string()),
            error: step.error.as_ref().map(Error::from),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct Error<'r> {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<&'r str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<&'r str>,
}

impl<'r> From<&'r StepError> for Error<'r> {
    fn from(err: &'r StepError) -> Self {
        let (message, expected, actual) = match err {
            StepError::Assertion { message, expected, actual } => {
                (message.clone(), expected.as_deref(), actual.as_deref())
            }
            e => (e.to_string(), None, None),
        };
        Self { kind: err.kind(), message, expected, actual }
    }
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::executor::block_on;

    use super::*;
    use crate::{
        feature::{Feature as Gherkin, Keyword, PickleStep, StepType},
        step::Failure,
    };

    #[test]
    fn writes_report_on_finish() {
        let feature = Arc::new(Gherkin { name: "User API".into(), ..Gherkin::default() });
        let step = PickleStep {
            keyword: Keyword::Then,
            ty: StepType::Then,
            text: "the response status code should be 201".into(),
            table: None,
            docstring: None,
            line: 8,
        };
        let mut result = ScenarioResult {
            feature: "User API".into(),
            path: None,
            name: "Create user".into(),
            line: 4,
            tags: vec!["api".into()],
            example: None,
            status: report::Status::Passed,
            background: vec![],
            steps: vec![StepResult::executed(
                &step,
                None,
                Some(Failure::mismatch("status code", 201, 500).into()),
                Duration::ZERO,
            )],
            error: None,
            attempts: 1,
            duration: Duration::ZERO,
        };
        result.resolve_status();
        let pickle = Arc::new(crate::feature::Pickle {
            feature: "User API".into(),
            path: None,
            name: "Create user".into(),
            line: 4,
            tags: vec!["api".into()],
            background: vec![],
            steps: vec![step],
            example: None,
        });

        let mut json = Json::new(Vec::new());
        let cli = cli::Empty;
        block_on(async {
            for ev in [
                event::Cucumber::Started,
                event::Cucumber::feature_started(Arc::clone(&feature)),
                event::Cucumber::scenario(
                    Arc::clone(&feature),
                    Arc::clone(&pickle),
                    event::Scenario::Finished(Arc::new(result)),
                ),
                event::Cucumber::feature_finished(feature),
            ] {
                json.handle_event(Event::new(ev), &cli).await;
            }
            assert!(json.output().is_empty(), "written before finish");
            json.handle_event(Event::new(event::Cucumber::Finished), &cli).await;
        });

        let doc: serde_json::Value = serde_json::from_slice(json.output()).unwrap();
        assert_eq!(doc["stats"]["scenarios"]["failed"], 1);
        let sc = &doc["features"][0]["scenarios"][0];
        assert_eq!(sc["status"], "failed");
        assert_eq!(sc["tags"][0], "api");
        assert_eq!(sc["steps"][0]["keyword"], "Then");
        assert_eq!(sc["steps"][0]["error"]["kind"], "assertion");
        assert_eq!(sc["steps"][0]["error"]["expected"], "201");
        assert_eq!(sc["steps"][0]["error"]["actual"], "500");
        assert!(sc["steps"][0].get("background").is_none());
    }
}
