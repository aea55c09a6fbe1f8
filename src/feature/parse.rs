// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Line-oriented parser of `.feature` files.

use std::{fmt, mem, path::PathBuf};

use derive_more::with_trait::{Display, Error};

use super::{
    table::split_row, Background, DocString, Examples, Feature, Keyword,
    Scenario, Step, StepType, Table,
};

/// Error of parsing a `.feature` file, pointing to the offending line.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct ParseError {
    /// Path of the file, if it was read from one.
    pub path: Option<PathBuf>,

    /// 1-based line the error was detected at.
    pub line: usize,

    /// What went wrong.
    #[error(not(source))]
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}:{}: {}", path.display(), self.line, self.kind),
            None => write!(f, "line {}: {}", self.line, self.kind),
        }
    }
}

/// Reason of a [`ParseError`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// No `Feature:` keyword before the content.
    #[display("expected `Feature:` keyword")]
    MissingFeature,

    /// More than one `Feature:` in a single file.
    #[display("only one `Feature:` is allowed per file")]
    DuplicateFeature,

    /// Line that fits nowhere.
    #[display("unexpected line: `{_0}`")]
    UnexpectedLine(String),

    /// Step placed directly under `Feature:`.
    #[display("step must belong to a `Background:` or a `Scenario:`")]
    StepOutsideScenario,

    /// Second `Background:` in a feature.
    #[display("only one `Background:` is allowed per feature")]
    DuplicateBackground,

    /// `Background:` following a scenario.
    #[display("`Background:` must precede every scenario")]
    MisplacedBackground,

    /// Tags not followed by a taggable keyword.
    #[display("tags must be followed by `Feature:`, `Scenario:` or `Examples:`")]
    DanglingTags,

    /// Table row without a preceding step or `Examples:`.
    #[display("table is not attached to a step or `Examples:`")]
    DetachedTable,

    /// Doc string without a preceding step.
    #[display("doc string is not attached to a step")]
    DetachedDocString,

    /// Table row not closed by `|`.
    #[display("table row is not terminated with `|`")]
    UnterminatedTableRow,

    /// Table row with a different number of cells than the first one.
    #[display("table row has {found} cells, but {expected} expected")]
    InconsistentCellCount {
        /// Number of cells in the first row.
        expected: usize,

        /// Number of cells in the offending row.
        found: usize,
    },

    /// Doc string never closed.
    #[display("doc string is never closed")]
    UnterminatedDocString,

    /// `Scenario Outline:` without `Examples:`.
    #[display("scenario outline `{_0}` has no `Examples:`")]
    MissingExamples(String),

    /// `Examples:` without a table.
    #[display("`Examples:` has no table")]
    EmptyExamples,

    /// `Examples:` not following a scenario.
    #[display("`Examples:` must belong to a scenario outline")]
    ExamplesOutsideScenario,

    /// `<placeholder>` without a column in some `Examples:`.
    #[display("placeholder `<{_0}>` has no matching `Examples:` column")]
    UnknownPlaceholder(String),

    /// Valid Gherkin this parser doesn't handle.
    #[display("`{_0}` is not supported")]
    Unsupported(String),
}

/// Parses the `input` remembering its `path`.
pub(super) fn parse(
    input: &str,
    path: Option<PathBuf>,
) -> Result<Feature, ParseError> {
    Parser { path, ..Parser::default() }.run(input)
}

/// Keyword line opening a section.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Header {
    Feature,
    Background,
    Scenario,
    Outline,
    Examples,
    Rule,
}

impl Header {
    /// Recognized header prefixes.
    const PREFIXES: [(&'static str, Self); 9] = [
        ("Feature:", Self::Feature),
        ("Background:", Self::Background),
        ("Scenario Outline:", Self::Outline),
        ("Scenario Template:", Self::Outline),
        ("Scenario:", Self::Scenario),
        ("Example:", Self::Scenario),
        ("Examples:", Self::Examples),
        ("Scenarios:", Self::Examples),
        ("Rule:", Self::Rule),
    ];

    /// Splits the `line` into a [`Header`] and the name following it.
    fn split(line: &str) -> Option<(Self, &str)> {
        Self::PREFIXES.iter().find_map(|(prefix, header)| {
            line.strip_prefix(prefix).map(|rest| (*header, rest.trim()))
        })
    }
}

/// Section the parser is currently in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Section {
    #[default]
    Preamble,
    Feature,
    Background,
    Scenario,
    Examples,
}

/// What a table row or a doc string attaches to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Attach {
    #[default]
    Nothing,
    Step,
    Examples,
}

/// State of parsing a single file.
#[derive(Debug, Default)]
struct Parser {
    path: Option<PathBuf>,
    feature: Option<Feature>,
    section: Section,
    pending_tags: Vec<String>,
    tags_line: usize,

    /// Whether free-form description text is still allowed.
    describing: bool,
    last_ty: Option<StepType>,
    attach: Attach,
    outline_declared: bool,
}

impl Parser {
    fn run(mut self, input: &str) -> Result<Feature, ParseError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let lines = input.lines().collect::<Vec<_>>();

        let mut next = 0;
        while let Some(&raw) = lines.get(next) {
            let line = next + 1;
            next += 1;

            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some(delim) =
                ["\"\"\"", "```"].into_iter().find(|d| trimmed.starts_with(d))
            {
                next = self.docstring(&lines, next, line, raw, delim)?;
            } else if trimmed.starts_with('|') {
                self.table_row(trimmed, line)?;
            } else if trimmed.starts_with('@') {
                self.tags(trimmed, line)?;
            } else if let Some((header, name)) = Header::split(trimmed) {
                self.header(header, name, line)?;
            } else if let Some((keyword, text)) = split_step(trimmed) {
                self.step(keyword, text, line)?;
            } else {
                self.description(trimmed, line)?;
            }
        }

        self.finish(lines.len().max(1))
    }

    fn err(&self, line: usize, kind: ParseErrorKind) -> ParseError {
        ParseError { path: self.path.clone(), line, kind }
    }

    fn enter(&mut self, section: Section) {
        self.section = section;
        self.describing = true;
        self.last_ty = None;
        self.attach = Attach::Nothing;
    }

    fn ensure_no_pending_tags(&self) -> Result<(), ParseError> {
        if self.pending_tags.is_empty() {
            Ok(())
        } else {
            Err(self.err(self.tags_line, ParseErrorKind::DanglingTags))
        }
    }

    fn feature_mut(&mut self, line: usize) -> Result<&mut Feature, ParseError> {
        let path = &self.path;
        self.feature.as_mut().ok_or_else(|| ParseError {
            path: path.clone(),
            line,
            kind: ParseErrorKind::MissingFeature,
        })
    }

    fn scenario_mut(&mut self) -> Option<&mut Scenario> {
        self.feature.as_mut()?.scenarios.last_mut()
    }

    fn last_step_mut(&mut self) -> Option<&mut Step> {
        match self.section {
            Section::Background => {
                self.feature.as_mut()?.background.as_mut()?.steps.last_mut()
            }
            Section::Scenario => self.scenario_mut()?.steps.last_mut(),
            Section::Preamble | Section::Feature | Section::Examples => None,
        }
    }

    fn tags(&mut self, trimmed: &str, line: usize) -> Result<(), ParseError> {
        if self.pending_tags.is_empty() {
            self.tags_line = line;
        }
        for token in trimmed.split_whitespace() {
            if token.starts_with('#') {
                break;
            }
            let tag = token
                .strip_prefix('@')
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    self.err(line, ParseErrorKind::UnexpectedLine(trimmed.into()))
                })?;
            if !self.pending_tags.iter().any(|t| t == tag) {
                self.pending_tags.push(tag.to_owned());
            }
        }
        Ok(())
    }

    fn header(
        &mut self,
        header: Header,
        name: &str,
        line: usize,
    ) -> Result<(), ParseError> {
        match header {
            Header::Feature => {
                if self.feature.is_some() {
                    return Err(self.err(line, ParseErrorKind::DuplicateFeature));
                }
                self.feature = Some(Feature {
                    name: name.to_owned(),
                    tags: mem::take(&mut self.pending_tags),
                    path: self.path.clone(),
                    line,
                    ..Feature::default()
                });
                self.enter(Section::Feature);
            }
            Header::Background => {
                self.ensure_no_pending_tags()?;
                self.close_scenario()?;
                let feature = self.feature_mut(line)?;
                let kind = if feature.background.is_some() {
                    Some(ParseErrorKind::DuplicateBackground)
                } else if !feature.scenarios.is_empty() {
                    Some(ParseErrorKind::MisplacedBackground)
                } else {
                    feature.background = Some(Background {
                        name: name.to_owned(),
                        line,
                        ..Background::default()
                    });
                    None
                };
                if let Some(kind) = kind {
                    return Err(self.err(line, kind));
                }
                self.enter(Section::Background);
            }
            Header::Scenario | Header::Outline => {
                self.close_scenario()?;
                let tags = mem::take(&mut self.pending_tags);
                self.feature_mut(line)?.scenarios.push(Scenario {
                    name: name.to_owned(),
                    tags,
                    line,
                    ..Scenario::default()
                });
                self.enter(Section::Scenario);
                self.outline_declared = header == Header::Outline;
            }
            Header::Examples => {
                if !matches!(self.section, Section::Scenario | Section::Examples)
                {
                    return Err(
                        self.err(line, ParseErrorKind::ExamplesOutsideScenario)
                    );
                }
                self.close_examples()?;
                let tags = mem::take(&mut self.pending_tags);
                if let Some(sc) = self.scenario_mut() {
                    sc.examples.push(Examples {
                        name: name.to_owned(),
                        tags,
                        table: Table::default(),
                        line,
                    });
                }
                self.enter(Section::Examples);
                self.attach = Attach::Examples;
            }
            Header::Rule => {
                return Err(
                    self.err(line, ParseErrorKind::Unsupported("Rule:".into()))
                );
            }
        }
        Ok(())
    }

    fn step(
        &mut self,
        keyword: Keyword,
        text: &str,
        line: usize,
    ) -> Result<(), ParseError> {
        self.ensure_no_pending_tags()?;
        let ty = keyword
            .step_type()
            .or(self.last_ty)
            .unwrap_or(StepType::Given);
        let step = Step { line, ..Step::new(keyword, ty, text) };

        let section = self.section;
        let steps = match section {
            Section::Preamble => None,
            Section::Background => self
                .feature
                .as_mut()
                .and_then(|f| f.background.as_mut())
                .map(|bg| &mut bg.steps),
            Section::Scenario => self.scenario_mut().map(|sc| &mut sc.steps),
            Section::Feature | Section::Examples => None,
        };
        match steps {
            Some(steps) => steps.push(step),
            None => {
                let kind = match section {
                    Section::Preamble => ParseErrorKind::MissingFeature,
                    Section::Examples => ParseErrorKind::UnexpectedLine(
                        format!("{} {text}", keyword.as_str()),
                    ),
                    _ => ParseErrorKind::StepOutsideScenario,
                };
                return Err(self.err(line, kind));
            }
        }

        self.last_ty = Some(ty);
        self.describing = false;
        self.attach = Attach::Step;
        Ok(())
    }

    fn table_row(&mut self, trimmed: &str, line: usize) -> Result<(), ParseError> {
        self.ensure_no_pending_tags()?;
        let cells = split_row(trimmed)
            .ok_or_else(|| self.err(line, ParseErrorKind::UnterminatedTableRow))?;

        let table = match self.attach {
            Attach::Nothing => None,
            Attach::Step => self
                .last_step_mut()
                .filter(|st| st.docstring.is_none())
                .map(|st| st.table.get_or_insert_with(|| Table::default().at_line(line))),
            Attach::Examples => self
                .scenario_mut()
                .and_then(|sc| sc.examples.last_mut())
                .map(|ex| {
                    if ex.table.is_empty() {
                        ex.table.line = line;
                    }
                    &mut ex.table
                }),
        };
        let Some(table) = table else {
            return Err(self.err(line, ParseErrorKind::DetachedTable));
        };

        if !table.is_empty() && table.width() != cells.len() {
            let kind = ParseErrorKind::InconsistentCellCount {
                expected: table.width(),
                found: cells.len(),
            };
            return Err(self.err(line, kind));
        }
        table.push(cells);
        self.describing = false;
        Ok(())
    }

    /// Consumes a doc string opened at `line` and returns the index of the
    /// line following its closing delimiter.
    fn docstring(
        &mut self,
        lines: &[&str],
        mut next: usize,
        line: usize,
        raw: &str,
        delim: &str,
    ) -> Result<usize, ParseError> {
        let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
        let media_type = raw.trim()[delim.len()..].trim();

        let mut content = Vec::new();
        loop {
            let Some(&l) = lines.get(next) else {
                return Err(self.err(line, ParseErrorKind::UnterminatedDocString));
            };
            next += 1;
            if l.trim() == delim {
                break;
            }
            let l = strip_indent(l, indent);
            content.push(if delim == "\"\"\"" {
                l.replace(r#"\"\"\""#, r#"""""#)
            } else {
                l.replace(r"\`\`\`", "```")
            });
        }

        let docstring = DocString {
            content: content.join("\n"),
            media_type: (!media_type.is_empty()).then(|| media_type.to_owned()),
        };
        let step = if self.attach == Attach::Step {
            self.last_step_mut()
        } else {
            None
        };
        let step =
            step.filter(|st| st.docstring.is_none() && st.table.is_none());
        match step {
            Some(step) => step.docstring = Some(docstring),
            None => return Err(self.err(line, ParseErrorKind::DetachedDocString)),
        }
        self.describing = false;
        Ok(next)
    }

    fn description(&mut self, trimmed: &str, line: usize) -> Result<(), ParseError> {
        if self.section == Section::Preamble {
            return Err(self.err(line, ParseErrorKind::MissingFeature));
        }
        self.ensure_no_pending_tags()?;
        if !self.describing {
            return Err(
                self.err(line, ParseErrorKind::UnexpectedLine(trimmed.into()))
            );
        }

        let section = self.section;
        let slot = self.feature.as_mut().and_then(|f| match section {
            Section::Feature => Some(&mut f.description),
            Section::Background => f.background.as_mut().map(|b| &mut b.description),
            Section::Scenario => f.scenarios.last_mut().map(|s| &mut s.description),
            Section::Preamble | Section::Examples => None,
        });
        let Some(slot) = slot else {
            return Err(
                self.err(line, ParseErrorKind::UnexpectedLine(trimmed.into()))
            );
        };
        let text = slot.get_or_insert_with(String::new);
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(trimmed);
        Ok(())
    }

    fn close_examples(&self) -> Result<(), ParseError> {
        if self.section != Section::Examples {
            return Ok(());
        }
        let empty = self
            .feature
            .as_ref()
            .and_then(|f| f.scenarios.last())
            .and_then(|sc| sc.examples.last())
            .filter(|ex| ex.table.is_empty());
        match empty {
            Some(ex) => Err(self.err(ex.line, ParseErrorKind::EmptyExamples)),
            None => Ok(()),
        }
    }

    fn close_scenario(&self) -> Result<(), ParseError> {
        if !matches!(self.section, Section::Scenario | Section::Examples) {
            return Ok(());
        }
        self.close_examples()?;

        let Some(sc) = self.feature.as_ref().and_then(|f| f.scenarios.last())
        else {
            return Ok(());
        };
        if sc.examples.is_empty() {
            return if self.outline_declared {
                Err(self.err(
                    sc.line,
                    ParseErrorKind::MissingExamples(sc.name.clone()),
                ))
            } else {
                Ok(())
            };
        }
        for step in &sc.steps {
            for name in step.placeholders() {
                let known = sc.examples.iter().all(|ex| {
                    ex.table.header().is_some_and(|h| h.contains(&name))
                });
                if !known {
                    return Err(
                        self.err(step.line, ParseErrorKind::UnknownPlaceholder(name))
                    );
                }
            }
        }
        Ok(())
    }

    fn finish(self, last_line: usize) -> Result<Feature, ParseError> {
        self.ensure_no_pending_tags()?;
        self.close_scenario()?;
        self.feature
            .ok_or_else(|| ParseError {
                path: self.path,
                line: last_line,
                kind: ParseErrorKind::MissingFeature,
            })
    }
}

/// Splits a step line into its [`Keyword`] and text.
fn split_step(line: &str) -> Option<(Keyword, &str)> {
    Keyword::ALL.into_iter().find_map(|kw| {
        let rest = line.strip_prefix(kw.as_str())?;
        rest.starts_with(char::is_whitespace).then(|| (kw, rest.trim()))
    })
}

/// Strips at most `indent` leading whitespace characters.
fn strip_indent(line: &str, indent: usize) -> &str {
    let cut = line
        .char_indices()
        .take(indent)
        .take_while(|(_, c)| c.is_whitespace())
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[cut..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = r#"
@ui @login
Feature: Login functionality
  As a registered user
  I want to log in

  Background:
    Given I am on the login page

  @smoke
  Scenario: Successful login with valid credentials
    When I enter username "jcastro@gmail.com"
    And I enter password "SBCqatester2024!"
    And I click the login button
    Then I should be logged in successfully
    But I should see the dashboard

  @regression
  Scenario Outline: Login with different credentials
    When I enter username "<username>"
    And I enter password "<password>"
    And I click the login button
    Then I should see "<result>"

    Examples:
      | username          | password         | result                        |
      | jcastro@gmail.com | SBCqatester2024! | Login successful              |
      | invalid@test.com  | wrongpass        | Invalid username or password  |
      |                   | Test@123         | Username is required          |
      | jcastro@gmail.com |                  | Password is required          |
"#;

    fn kind_of(input: &str) -> (usize, ParseErrorKind) {
        let err = Feature::parse_str(input).unwrap_err();
        (err.line, err.kind)
    }

    #[test]
    fn parses_structure() {
        let f = Feature::parse_str(LOGIN).unwrap();

        assert_eq!(f.name, "Login functionality");
        assert_eq!(f.tags, ["ui", "login"]);
        assert_eq!(
            f.description.as_deref(),
            Some("As a registered user\nI want to log in"),
        );
        assert_eq!(f.line, 3);

        let bg = f.background.as_ref().unwrap();
        assert_eq!(bg.steps.len(), 1);
        assert_eq!(bg.steps[0].text.as_str(), "I am on the login page");

        assert_eq!(f.scenarios.len(), 2);
        let plain = &f.scenarios[0];
        assert_eq!(plain.tags, ["smoke"]);
        assert!(!plain.is_outline());
        assert_eq!(plain.steps.len(), 5);
        assert_eq!(plain.steps[1].keyword, Keyword::And);
        assert_eq!(plain.steps[1].ty, StepType::When);
        assert_eq!(plain.steps[4].keyword, Keyword::But);
        assert_eq!(plain.steps[4].ty, StepType::Then);

        let outline = &f.scenarios[1];
        assert!(outline.is_outline());
        let table = &outline.examples[0].table;
        assert_eq!(table.header().unwrap(), ["username", "password", "result"]);
        assert_eq!(table.body().len(), 4);
        assert_eq!(table.body()[2][0], "");
        assert_eq!(table.body()[2][2], "Username is required");
        assert_eq!(table.line, 26);
    }

    #[test]
    fn leading_conjunction_defaults_to_given() {
        let f = Feature::parse_str(
            "Feature: f\n  Scenario: s\n    And something\n    * other\n",
        )
        .unwrap();
        let steps = &f.scenarios[0].steps;
        assert_eq!(steps[0].ty, StepType::Given);
        assert_eq!(steps[1].keyword, Keyword::Star);
        assert_eq!(steps[1].ty, StepType::Given);
    }

    #[test]
    fn attaches_tables_and_docstrings() {
        let f = Feature::parse_str(
            r#"Feature: Users
  Scenario: Create
    Given I have user payload with the following details
      | username | email            |
      | johndoe  | john@example.com |
    When I send a raw body
      """json
      {"a": 1}
        nested
      # not a comment
      """
    Then done
"#,
        )
        .unwrap();
        let steps = &f.scenarios[0].steps;
        let table = steps[0].table.as_ref().unwrap();
        assert_eq!(table.hashes()[0]["email"], "john@example.com");
        assert_eq!(table.line, 4);

        let doc = steps[1].docstring.as_ref().unwrap();
        assert_eq!(doc.media_type.as_deref(), Some("json"));
        assert_eq!(doc.content, "{\"a\": 1}\n  nested\n# not a comment");
        assert_eq!(steps[2].line, 12);
    }

    #[test]
    fn feature_tags_and_comments() {
        let f = Feature::parse_str(
            "# comment\n@api @api\n# another\nFeature: f\n  @a @b #trailing\n  Scenario: s\n    Given x\n",
        )
        .unwrap();
        assert_eq!(f.tags, ["api"]);
        assert_eq!(f.scenarios[0].tags, ["a", "b"]);
    }

    #[test]
    fn rejects_inconsistent_rows() {
        let (line, kind) = kind_of(
            "Feature: f\n  Scenario: s\n    Given x\n      | a | b |\n      | 1 |\n",
        );
        assert_eq!(line, 5);
        assert_eq!(
            kind,
            ParseErrorKind::InconsistentCellCount { expected: 2, found: 1 },
        );
    }

    #[test]
    fn rejects_unterminated_row() {
        let (line, kind) =
            kind_of("Feature: f\n  Scenario: s\n    Given x\n      | a | b\n");
        assert_eq!(line, 4);
        assert_eq!(kind, ParseErrorKind::UnterminatedTableRow);
    }

    #[test]
    fn rejects_outline_without_examples() {
        let (line, kind) = kind_of(
            "Feature: f\n  Scenario Outline: o\n    Given <x>\n  Scenario: next\n    Given y\n",
        );
        assert_eq!(line, 2);
        assert_eq!(kind, ParseErrorKind::MissingExamples("o".into()));

        let (_, kind) = kind_of("Feature: f\n  Scenario Outline: o\n    Given <x>\n");
        assert_eq!(kind, ParseErrorKind::MissingExamples("o".into()));
    }

    #[test]
    fn rejects_examples_without_table() {
        let (line, kind) = kind_of(
            "Feature: f\n  Scenario Outline: o\n    Given <x>\n    Examples:\n",
        );
        assert_eq!(line, 4);
        assert_eq!(kind, ParseErrorKind::EmptyExamples);
    }

    #[test]
    fn rejects_unknown_placeholder() {
        let (line, kind) = kind_of(
            "Feature: f\n  Scenario Outline: o\n    Given <x>\n    Then <y>\n    Examples:\n      | x |\n      | 1 |\n",
        );
        assert_eq!(line, 4);
        assert_eq!(kind, ParseErrorKind::UnknownPlaceholder("y".into()));
    }

    #[test]
    fn placeholders_in_tables_are_checked() {
        let (_, kind) = kind_of(
            "Feature: f\n  Scenario Outline: o\n    Given data\n      | <z> |\n    Examples:\n      | x |\n      | 1 |\n",
        );
        assert_eq!(kind, ParseErrorKind::UnknownPlaceholder("z".into()));
    }

    #[test]
    fn rejects_misplaced_sections() {
        assert_eq!(kind_of("Given x\n").1, ParseErrorKind::MissingFeature);
        assert_eq!(kind_of("").1, ParseErrorKind::MissingFeature);
        assert_eq!(
            kind_of("Feature: f\n  Given x\n").1,
            ParseErrorKind::StepOutsideScenario,
        );
        assert_eq!(
            kind_of("Feature: f\n  Background:\n    Given a\n  Background:\n").1,
            ParseErrorKind::DuplicateBackground,
        );
        assert_eq!(
            kind_of("Feature: f\n  Scenario: s\n    Given a\n  Background:\n").1,
            ParseErrorKind::MisplacedBackground,
        );
        assert_eq!(
            kind_of("Feature: f\n  | a |\n").1,
            ParseErrorKind::DetachedTable,
        );
        assert_eq!(
            kind_of("Feature: f\n  Scenario: s\n    \"\"\"\n    x\n    \"\"\"\n").1,
            ParseErrorKind::DetachedDocString,
        );
        assert_eq!(
            kind_of("Feature: f\n  Scenario: s\n    Given a\n    \"\"\"\n    x\n").1,
            ParseErrorKind::UnterminatedDocString,
        );
        assert_eq!(
            kind_of("Feature: f\n  Examples:\n").1,
            ParseErrorKind::ExamplesOutsideScenario,
        );
        assert_eq!(
            kind_of("Feature: f\n  @tag\n").1,
            ParseErrorKind::DanglingTags,
        );
        assert_eq!(
            kind_of("Feature: f\n  Rule: r\n").1,
            ParseErrorKind::Unsupported("Rule:".into()),
        );
        assert_eq!(
            kind_of("Feature: f\n  Scenario: s\n    Given a\n    stray text\n").1,
            ParseErrorKind::UnexpectedLine("stray text".into()),
        );
        assert_eq!(
            kind_of("Feature: f\nFeature: g\n").1,
            ParseErrorKind::DuplicateFeature,
        );
    }

    #[test]
    fn error_mentions_path_and_line() {
        let err = Feature::parse_source("Feature: f\n  | a\n", "features/x.feature")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "features/x.feature:2: table row is not terminated with `|`",
        );

        let err = Feature::parse_str("nope").unwrap_err();
        assert_eq!(err.to_string(), "line 1: expected `Feature:` keyword");
    }

    #[test]
    fn strips_only_delimiter_indentation() {
        assert_eq!(strip_indent("      text", 4), "  text");
        assert_eq!(strip_indent("  text", 4), "text");
        assert_eq!(strip_indent("", 4), "");
    }
}
