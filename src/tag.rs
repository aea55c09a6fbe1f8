// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Boolean [`TagOperation`]s filtering scenarios by their tags.
//!
//! Grammar:
//! ```text
//! expr := or
//! or   := and ("or" and)*
//! and  := not ("and" not)*
//! not  := "not" not | atom
//! atom := "@"? tag | "(" expr ")"
//! ```

use std::{fmt, iter::Peekable, str::FromStr, vec};

use derive_more::with_trait::{Display, Error};
use sealed::sealed;

/// Parsed tag expression, like `@ui and not (@wip or @flaky)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TagOperation {
    /// Both operands hold.
    And(Box<TagOperation>, Box<TagOperation>),

    /// Any operand holds.
    Or(Box<TagOperation>, Box<TagOperation>),

    /// Operand doesn't hold.
    Not(Box<TagOperation>),

    /// Tag is present. Stored without the leading `@`.
    Tag(String),
}

/// Error of parsing a [`TagOperation`].
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum TagParseError {
    /// Nothing to parse.
    #[display("empty tag expression")]
    Empty,

    /// Expression ended while an operand was expected.
    #[display("unexpected end of tag expression")]
    UnexpectedEnd,

    /// Token out of place.
    #[display("unexpected `{_0}` in tag expression")]
    UnexpectedToken(#[error(not(source))] String),

    /// `(` without its `)`.
    #[display("unclosed `(` in tag expression")]
    UnclosedParen,
}

impl FromStr for TagOperation {
    type Err = TagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = tokenize(s).into_iter().peekable();
        if tokens.peek().is_none() {
            return Err(TagParseError::Empty);
        }
        let op = parse_or(&mut tokens)?;
        match tokens.next() {
            None => Ok(op),
            Some(tok) => Err(TagParseError::UnexpectedToken(tok)),
        }
    }
}

impl fmt::Display for TagOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(l, r) => write!(f, "({l} and {r})"),
            Self::Or(l, r) => write!(f, "({l} or {r})"),
            Self::Not(t) => write!(f, "not {t}"),
            Self::Tag(t) => write!(f, "@{t}"),
        }
    }
}

type Tokens = Peekable<vec::IntoIter<String>>;

fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in s.chars() {
        if c.is_whitespace() || c == '(' || c == ')' {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            if !c.is_whitespace() {
                tokens.push(c.to_string());
            }
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

fn parse_or(tokens: &mut Tokens) -> Result<TagOperation, TagParseError> {
    let mut lhs = parse_and(tokens)?;
    while tokens.next_if(|t| t == "or").is_some() {
        let rhs = parse_and(tokens)?;
        lhs = TagOperation::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(tokens: &mut Tokens) -> Result<TagOperation, TagParseError> {
    let mut lhs = parse_not(tokens)?;
    while tokens.next_if(|t| t == "and").is_some() {
        let rhs = parse_not(tokens)?;
        lhs = TagOperation::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_not(tokens: &mut Tokens) -> Result<TagOperation, TagParseError> {
    if tokens.next_if(|t| t == "not").is_some() {
        return Ok(TagOperation::Not(Box::new(parse_not(tokens)?)));
    }
    parse_atom(tokens)
}

fn parse_atom(tokens: &mut Tokens) -> Result<TagOperation, TagParseError> {
    let tok = tokens.next().ok_or(TagParseError::UnexpectedEnd)?;
    match tok.as_str() {
        "(" => {
            let inner = parse_or(tokens)?;
            match tokens.next().as_deref() {
                Some(")") => Ok(inner),
                Some(other) => Err(TagParseError::UnexpectedToken(other.into())),
                None => Err(TagParseError::UnclosedParen),
            }
        }
        ")" | "and" | "or" | "@" => Err(TagParseError::UnexpectedToken(tok)),
        _ => Ok(TagOperation::Tag(
            tok.strip_prefix('@').unwrap_or(&tok).to_owned(),
        )),
    }
}

/// Extension of a [`TagOperation`] allowing to evaluate it.
#[sealed]
pub trait Ext {
    /// Evaluates this [`TagOperation`] for the given `tags` (without the
    /// leading `@`).
    #[must_use]
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone;
}

#[sealed]
impl Ext for TagOperation {
    fn eval<I, S>(&self, tags: I) -> bool
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S> + Clone,
    {
        match self {
            Self::And(l, r) => l.eval(tags.clone()) & r.eval(tags),
            Self::Or(l, r) => l.eval(tags.clone()) | r.eval(tags),
            Self::Not(t) => !t.eval(tags),
            Self::Tag(t) => tags.into_iter().any(|tag| tag.as_ref() == t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(s: &str) -> TagOperation {
        s.parse().unwrap()
    }

    #[test]
    fn precedence_is_not_and_or() {
        assert_eq!(
            op("@a or @b and not @c").to_string(),
            "(@a or (@b and not @c))",
        );
        assert_eq!(op("not not a").to_string(), "not not @a");
        assert_eq!(op("(a or b) and c").to_string(), "((@a or @b) and @c)");
    }

    #[test]
    fn evaluates_against_tags() {
        let filter = op("@ui and not (@wip or @flaky)");
        assert!(filter.eval(["ui", "smoke"]));
        assert!(!filter.eval(["ui", "wip"]));
        assert!(!filter.eval(["api"]));
        assert!(!filter.eval(Vec::<String>::new()));

        assert!(op("not @serial").eval(["login"]));
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert_eq!("".parse::<TagOperation>(), Err(TagParseError::Empty));
        assert_eq!(
            "@a and".parse::<TagOperation>(),
            Err(TagParseError::UnexpectedEnd),
        );
        assert_eq!(
            "(@a or @b".parse::<TagOperation>(),
            Err(TagParseError::UnclosedParen),
        );
        assert_eq!(
            "@a @b".parse::<TagOperation>(),
            Err(TagParseError::UnexpectedToken("@b".into())),
        );
        assert_eq!(
            "or @b".parse::<TagOperation>(),
            Err(TagParseError::UnexpectedToken("or".into())),
        );
        assert_eq!(
            "@a)".parse::<TagOperation>(),
            Err(TagParseError::UnexpectedToken(")".into())),
        );
    }
}
