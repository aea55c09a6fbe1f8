// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Rendering of a [`Feature`] back into Gherkin text.

use std::fmt;

use super::{DocString, Examples, Feature, Scenario, Step};

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tags(f, 0, &self.tags)?;
        write_header(f, 0, "Feature", &self.name)?;
        write_description(f, 2, self.description.as_deref())?;

        if let Some(bg) = &self.background {
            writeln!(f)?;
            write_header(f, 2, "Background", &bg.name)?;
            write_description(f, 4, bg.description.as_deref())?;
            for step in &bg.steps {
                write_step(f, step)?;
            }
        }
        for sc in &self.scenarios {
            writeln!(f)?;
            write_scenario(f, sc)?;
        }
        Ok(())
    }
}

fn write_scenario(f: &mut fmt::Formatter<'_>, sc: &Scenario) -> fmt::Result {
    write_tags(f, 2, &sc.tags)?;
    let keyword = if sc.is_outline() { "Scenario Outline" } else { "Scenario" };
    write_header(f, 2, keyword, &sc.name)?;
    write_description(f, 4, sc.description.as_deref())?;
    for step in &sc.steps {
        write_step(f, step)?;
    }
    for ex in &sc.examples {
        writeln!(f)?;
        write_examples(f, ex)?;
    }
    Ok(())
}

fn write_examples(f: &mut fmt::Formatter<'_>, ex: &Examples) -> fmt::Result {
    write_tags(f, 4, &ex.tags)?;
    write_header(f, 4, "Examples", &ex.name)?;
    writeln!(f, "{}", ex.table.to_gherkin(6))
}

fn write_step(f: &mut fmt::Formatter<'_>, step: &Step) -> fmt::Result {
    writeln!(f, "    {} {}", step.keyword, step.text)?;
    if let Some(table) = &step.table {
        writeln!(f, "{}", table.to_gherkin(6))?;
    }
    if let Some(doc) = &step.docstring {
        write_docstring(f, doc)?;
    }
    Ok(())
}

fn write_docstring(f: &mut fmt::Formatter<'_>, doc: &DocString) -> fmt::Result {
    let quotes = r#"""""#;
    let (delim, content) = if !doc.content.contains(quotes) {
        (quotes, doc.content.clone())
    } else if !doc.content.contains("```") {
        ("```", doc.content.clone())
    } else {
        (quotes, doc.content.replace(quotes, r#"\"\"\""#))
    };

    writeln!(f, "      {delim}{}", doc.media_type.as_deref().unwrap_or_default())?;
    for line in content.lines() {
        if line.is_empty() {
            writeln!(f)?;
        } else {
            writeln!(f, "      {line}")?;
        }
    }
    writeln!(f, "      {delim}")
}

fn write_tags(
    f: &mut fmt::Formatter<'_>,
    indent: usize,
    tags: &[String],
) -> fmt::Result {
    if tags.is_empty() {
        return Ok(());
    }
    write!(f, "{:indent$}", "")?;
    for (i, tag) in tags.iter().enumerate() {
        let sep = if i == 0 { "" } else { " " };
        write!(f, "{sep}@{tag}")?;
    }
    writeln!(f)
}

fn write_header(
    f: &mut fmt::Formatter<'_>,
    indent: usize,
    keyword: &str,
    name: &str,
) -> fmt::Result {
    if name.is_empty() {
        writeln!(f, "{:indent$}{keyword}:", "")
    } else {
        writeln!(f, "{:indent$}{keyword}: {name}", "")
    }
}

fn write_description(
    f: &mut fmt::Formatter<'_>,
    indent: usize,
    description: Option<&str>,
) -> fmt::Result {
    for line in description.into_iter().flat_map(str::lines) {
        writeln!(f, "{:indent$}{line}", "")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::feature::Feature;

    const OUTLINE: &str = r#"@ui
Feature: Login functionality
  Background:
    Given I am on the login page

  @regression
  Scenario Outline: Login as <username>
    When I enter username "<username>"
    And I enter password "<password>"
    Then I should see "<result>"
      """
      <result> with "" quotes
      and \"\"\" triple
      """

    @data
    Examples: credentials
      | username          | password         | result                       |
      | jcastro@gmail.com | SBCqatester2024! | Login successful             |
      | invalid@test.com  | wrongpass        | Invalid username or password |
      |                   | Test@123         | Username is required         |
      | jcastro@gmail.com |                  | Password is required         |
"#;

    #[test]
    fn renders_parsable_gherkin() {
        let parsed = Feature::parse_str(OUTLINE).unwrap();
        let rendered = parsed.to_string();
        let reparsed = Feature::parse_str(&rendered).unwrap();

        assert_eq!(reparsed.name, parsed.name);
        assert_eq!(reparsed.tags, parsed.tags);
        let bg_steps = |f: &Feature| {
            f.background
                .iter()
                .flat_map(|bg| &bg.steps)
                .map(|s| (s.keyword, s.text.to_string()))
                .collect::<Vec<_>>()
        };
        assert_eq!(bg_steps(&reparsed), bg_steps(&parsed));
        assert_eq!(reparsed.to_string(), rendered);

        let sc = &reparsed.scenarios[0];
        assert_eq!(sc.name, "Login as <username>");
        assert_eq!(sc.tags, ["regression"]);
        assert_eq!(sc.examples[0].tags, ["data"]);
        assert_eq!(sc.examples[0].table.body().len(), 4);
        assert_eq!(
            sc.steps[2].docstring.as_ref().unwrap().content,
            "<result> with \"\" quotes\nand \"\"\" triple",
        );
    }

    #[test]
    fn round_trip_keeps_expansion() {
        let parsed = Feature::parse_str(OUTLINE).unwrap();
        let reparsed = Feature::parse_str(&parsed.to_gherkin()).unwrap();

        let texts = |f: &Feature| {
            f.pickles()
                .into_iter()
                .map(|p| {
                    let steps =
                        p.steps.iter().map(|s| s.text.clone()).collect::<Vec<_>>();
                    (p.name, steps)
                })
                .collect::<Vec<_>>()
        };
        let expanded = texts(&reparsed);
        assert_eq!(expanded.len(), 4);
        assert_eq!(expanded, texts(&parsed));
        assert_eq!(expanded[2].0, "Login as ");
        assert_eq!(expanded[2].1[0], r#"I enter username """#);
        assert_eq!(expanded[2].1[2], r#"I should see "Username is required""#);
    }

    #[test]
    fn switches_docstring_delimiter() {
        let f = Feature::parse_str(
            "Feature: f\n  Scenario: s\n    Given x\n      ```\n      say \"\"\"hi\"\"\"\n      ```\n",
        )
        .unwrap();
        let rendered = f.to_string();
        assert!(rendered.contains("      ```\n      say \"\"\"hi\"\"\"\n      ```\n"));

        let reparsed = Feature::parse_str(&rendered).unwrap();
        assert_eq!(
            reparsed.scenarios[0].steps[0].docstring,
            f.scenarios[0].steps[0].docstring,
        );
    }
}
