// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Expansion of [`Scenario`]s into concrete [`Pickle`]s.

use std::path::PathBuf;

use linked_hash_map::LinkedHashMap;

use super::{DocString, Feature, Keyword, Scenario, Step, StepType, Table, Template};

/// Concrete scenario ready for execution.
///
/// A plain [`Scenario`] yields exactly one [`Pickle`], while a
/// `Scenario Outline` yields one per `Examples` row, with every placeholder
/// substituted.
#[derive(Clone, Debug, PartialEq)]
pub struct Pickle {
    /// Name of the [`Feature`] this [`Pickle`] belongs to.
    pub feature: String,

    /// Path of the [`Feature`] file, if any.
    pub path: Option<PathBuf>,

    /// Scenario name, placeholders substituted.
    pub name: String,

    /// Line of the scenario keyword.
    pub line: usize,

    /// Tags of the [`Feature`], the [`Scenario`] and the `Examples` block,
    /// without duplicates.
    pub tags: Vec<String>,

    /// `Background` steps, executed before [`Pickle::steps`].
    pub background: Vec<PickleStep>,

    /// Own steps of the scenario.
    pub steps: Vec<PickleStep>,

    /// `Examples` row this [`Pickle`] was expanded from.
    pub example: Option<ExampleRow>,
}

impl Pickle {
    /// Checks whether this [`Pickle`] is tagged with the given `tag` (without
    /// the leading `@`).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Iterates over `Background` steps followed by own steps.
    pub fn all_steps(&self) -> impl Iterator<Item = &PickleStep> {
        self.background.iter().chain(&self.steps)
    }

    /// Line identifying this [`Pickle`] in its file: the `Examples` row for
    /// an outline, the scenario keyword otherwise.
    #[must_use]
    pub fn source_line(&self) -> usize {
        self.example.as_ref().map_or(self.line, |ex| ex.line)
    }
}

/// Fully substituted step of a [`Pickle`].
#[derive(Clone, Debug, PartialEq)]
pub struct PickleStep {
    /// [`Keyword`] the step is written with.
    pub keyword: Keyword,

    /// Resolved [`StepType`].
    pub ty: StepType,

    /// Text to match against step definitions.
    pub text: String,

    /// Attached data table.
    pub table: Option<Table>,

    /// Attached doc string.
    pub docstring: Option<DocString>,

    /// Line of the original step.
    pub line: usize,
}

/// `Examples` row a [`Pickle`] was expanded from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExampleRow {
    /// 0-based index of the `Examples` block in its scenario.
    pub block: usize,

    /// 0-based index of the row in its block, header excluded.
    pub index: usize,

    /// Line of the row.
    pub line: usize,

    /// Header cell → value.
    pub values: LinkedHashMap<String, String>,
}

impl Scenario {
    /// Expands this [`Scenario`] of the given `feature` into [`Pickle`]s.
    #[must_use]
    pub fn expand(&self, feature: &Feature) -> Vec<Pickle> {
        let background = feature
            .background
            .iter()
            .flat_map(|bg| &bg.steps)
            .map(|st| PickleStep::verbatim(st))
            .collect::<Vec<_>>();
        let pickle = |tags: Vec<String>, name, steps, example| Pickle {
            feature: feature.name.clone(),
            path: feature.path.clone(),
            name,
            line: self.line,
            tags,
            background: background.clone(),
            steps,
            example,
        };

        if !self.is_outline() {
            let tags = merge_tags([&feature.tags, &self.tags]);
            let steps = self.steps.iter().map(PickleStep::verbatim).collect();
            return vec![pickle(tags, self.name.clone(), steps, None)];
        }

        let name = Template::parse(self.name.as_str());
        self.examples
            .iter()
            .enumerate()
            .flat_map(|(block, ex)| {
                let tags = merge_tags([&feature.tags, &self.tags, &ex.tags]);
                ex.table.hashes().into_iter().enumerate().map(
                    move |(index, values)| {
                        let row = ExampleRow {
                            block,
                            index,
                            line: ex.table.body_line(index),
                            values,
                        };
                        (tags.clone(), row)
                    },
                )
            })
            .map(|(tags, row)| {
                let lookup = |k: &str| row.values.get(k).map(String::as_str);
                let steps = self
                    .steps
                    .iter()
                    .map(|st| PickleStep::substituted(st, lookup))
                    .collect();
                pickle(tags, name.render(lookup), steps, Some(row.clone()))
            })
            .collect()
    }
}

impl PickleStep {
    fn verbatim(step: &Step) -> Self {
        Self {
            keyword: step.keyword,
            ty: step.ty,
            text: step.text.to_string(),
            table: step.table.clone(),
            docstring: step.docstring.clone(),
            line: step.line,
        }
    }

    fn substituted<'v>(step: &Step, lookup: impl Fn(&str) -> Option<&'v str>) -> Self {
        let render = |s: &str| Template::parse(s).render(&lookup);
        Self {
            keyword: step.keyword,
            ty: step.ty,
            text: step.text.render(&lookup),
            table: step.table.as_ref().map(|t| t.map_cells(render)),
            docstring: step.docstring.as_ref().map(|d| DocString {
                content: render(&d.content),
                media_type: d.media_type.clone(),
            }),
            line: step.line,
        }
    }
}

/// Concatenates `tags` dropping duplicates, keeping the first occurrence.
fn merge_tags<const N: usize>(tags: [&Vec<String>; N]) -> Vec<String> {
    let mut merged = Vec::<String>::new();
    for tag in tags.into_iter().flatten() {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use crate::feature::{Feature, StepType};

    const CLAIMS: &str = r#"@ui @claims
Feature: Submit claim
  Background:
    Given I am logged in as a valid user
    And I navigate to "Submit Claim" page

  Scenario: Cancel claim
    When I start filling claim details
    Then no claim should be submitted

  @smoke @claims
  Scenario Outline: Submit <claim_type> claim
    When I fill in claim details
      | field      | value        |
      | claim_type | <claim_type> |
    And I click the "Submit Claim" button
    Then I should see "<message>"

    Examples: medical
      | claim_type | message             |
      | Medical    | Claim submitted     |
      | Dental     | Claim submitted too |

    @wip
    Examples: broken
      | claim_type | message      |
      |            | Invalid form |
"#;

    #[test]
    fn plain_scenario_yields_single_pickle() {
        let f = Feature::parse_str(CLAIMS).unwrap();
        let pickles = f.scenarios[0].expand(&f);

        assert_eq!(pickles.len(), 1);
        let p = &pickles[0];
        assert_eq!(p.feature, "Submit claim");
        assert_eq!(p.name, "Cancel claim");
        assert_eq!(p.tags, ["ui", "claims"]);
        assert!(p.example.is_none());
        assert_eq!(p.background.len(), 2);
        assert_eq!(p.background[1].ty, StepType::Given);
        assert_eq!(p.background[1].text, r#"I navigate to "Submit Claim" page"#);
        assert_eq!(p.all_steps().count(), 4);
        assert_eq!(p.source_line(), 7);
    }

    #[test]
    fn outline_yields_pickle_per_row() {
        let f = Feature::parse_str(CLAIMS).unwrap();
        let pickles = f.scenarios[1].expand(&f);

        assert_eq!(pickles.len(), 3);
        assert_eq!(
            pickles.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            ["Submit Medical claim", "Submit Dental claim", "Submit  claim"],
        );

        let first = &pickles[0];
        assert_eq!(first.tags, ["ui", "claims", "smoke"]);
        assert_eq!(first.steps[2].text, r#"I should see "Claim submitted""#);
        let table = first.steps[0].table.as_ref().unwrap();
        assert_eq!(table.raw()[1], ["claim_type", "Medical"]);

        let row = first.example.as_ref().unwrap();
        assert_eq!((row.block, row.index, row.line), (0, 0, 21));
        assert_eq!(first.source_line(), 21);

        let last = &pickles[2];
        assert!(last.has_tag("wip"));
        assert_eq!(last.steps[0].table.as_ref().unwrap().raw()[1][1], "");
        let row = last.example.as_ref().unwrap();
        assert_eq!((row.block, row.index, row.line), (1, 0, 27));
        assert_eq!(row.values["message"], "Invalid form");
    }

    #[test]
    fn feature_pickles_keep_file_order() {
        let f = Feature::parse_str(CLAIMS).unwrap();
        let lines = f.pickles().iter().map(|p| p.source_line()).collect::<Vec<_>>();
        assert_eq!(lines, [7, 21, 22, 27]);
    }
}
