// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Step [`Pattern`]s: expressions with typed parameters, or raw regexes.
//!
//! Expression parameters:
//!
//! | Parameter                        | Matches                    | Yields             |
//! |----------------------------------|----------------------------|--------------------|
//! | `{int}`, `{name:int}`, `{name:d}` | `-?\d+`                    | [`Argument::Int`]   |
//! | `{float}`, `{name:float}`, `{name:f}` | decimal number         | [`Argument::Float`] |
//! | `{word}`, `{name:word}`, `{name:w}` | non-whitespace run       | [`Argument::Word`]  |
//! | `{string}`, `{name:string}`      | `"..."`, quotes stripped   | [`Argument::Str`]   |
//! | `{}`, `{name}`, `{name:any}`     | anything                   | [`Argument::Any`]   |

use derive_more::with_trait::{Display, Error};
use regex::Regex;

use super::{context::Argument, regex::HashableRegex};

/// Type of a [`Pattern`] parameter.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ParamType {
    /// Signed integer.
    #[display("int")]
    Int,

    /// Decimal number.
    #[display("float")]
    Float,

    /// Single word without whitespace.
    #[display("word")]
    Word,

    /// Double-quoted string.
    #[display("string")]
    Str,

    /// Anything.
    #[display("any")]
    Any,
}

impl ParamType {
    /// Returns the canonical name of this [`ParamType`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Word => "word",
            Self::Str => "string",
            Self::Any => "any",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int" | "d" => Self::Int,
            "float" | "f" => Self::Float,
            "word" | "w" => Self::Word,
            "string" => Self::Str,
            "any" | "" => Self::Any,
            _ => return None,
        })
    }

    /// Regex of this [`ParamType`], capturing the value under `group`.
    fn regex(self, group: &str) -> String {
        match self {
            Self::Int => format!(r"({group}-?\d+)"),
            Self::Float => format!(r"({group}-?(?:\d+(?:\.\d+)?|\.\d+))"),
            Self::Word => format!(r"({group}\S+)"),
            Self::Str => format!(r#""({group}[^"]*)""#),
            Self::Any => format!(r"({group}.*)"),
        }
    }

    /// Sample text matched by this [`ParamType`].
    const fn sample(self) -> &'static str {
        match self {
            Self::Int => "1",
            Self::Float => "1.5",
            Self::Word | Self::Any => "x",
            Self::Str => "\"x\"",
        }
    }

    /// Converts the captured `raw` text into an [`Argument`].
    pub(crate) fn convert(self, raw: &str) -> Option<Argument> {
        Some(match self {
            Self::Int => Argument::Int(raw.parse().ok()?),
            Self::Float => Argument::Float(raw.parse().ok()?),
            Self::Word => Argument::Word(raw.to_owned()),
            Self::Str => Argument::Str(raw.to_owned()),
            Self::Any => Argument::Any(raw.to_owned()),
        })
    }
}

/// Parameter of a [`Pattern`], corresponding to a single capture group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    /// Name of the parameter, if any.
    pub name: Option<String>,

    /// Type of the captured value.
    pub ty: ParamType,
}

/// Compiled step pattern.
#[derive(Clone, Debug, Display)]
#[display("{source}")]
pub struct Pattern {
    /// Text the [`Pattern`] was created from.
    source: String,

    /// Anchored [`Regex`] the step text is matched against.
    regex: HashableRegex,

    /// One [`Param`] per capture group, in order.
    params: Vec<Param>,

    /// Step text matched by this [`Pattern`], if it can be derived.
    sample: Option<String>,
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex == other.regex
    }
}

impl Eq for Pattern {}

impl Pattern {
    /// Compiles an expression with `{type}` / `{name:type}` parameters.
    ///
    /// `\{` and `\}` escape braces. The expression must match the whole step
    /// text.
    ///
    /// # Errors
    ///
    /// If the expression is malformed.
    pub fn expr(source: &str) -> Result<Self, PatternError> {
        let err = |kind| PatternError { pattern: source.to_owned(), kind };

        let mut regex = String::from("^");
        let mut sample = String::new();
        let mut params = Vec::<Param>::new();
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let escaped = chars.next().unwrap_or('\\');
                    regex.push_str(&regex::escape(&escaped.to_string()));
                    sample.push(escaped);
                }
                '{' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(err(PatternErrorKind::Unclosed));
                    }
                    let param = parse_param(inner.trim()).map_err(err)?;
                    if let Some(name) = &param.name {
                        if params.iter().any(|p| p.name.as_ref() == Some(name)) {
                            return Err(err(PatternErrorKind::DuplicateName(
                                name.clone(),
                            )));
                        }
                    }
                    let group = param
                        .name
                        .as_ref()
                        .map(|n| format!("?P<{n}>"))
                        .unwrap_or_default();
                    regex.push_str(&param.ty.regex(&group));
                    sample.push_str(param.ty.sample());
                    params.push(param);
                }
                '}' => return Err(err(PatternErrorKind::Unopened)),
                c => {
                    regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                    sample.push(c);
                }
            }
        }
        regex.push('$');

        let regex = Regex::new(&regex)
            .map_err(|e| err(PatternErrorKind::Regex(e.to_string())))?;
        Ok(Self {
            source: source.to_owned(),
            regex: regex.into(),
            params,
            sample: Some(sample),
        })
    }

    /// Compiles a raw regular expression, anchoring it on both ends if it
    /// isn't already.
    ///
    /// Every capture group yields an [`Argument::Any`].
    ///
    /// # Errors
    ///
    /// If the `source` isn't a valid regex.
    pub fn regex(source: &str) -> Result<Self, PatternError> {
        let mut anchored = String::with_capacity(source.len() + 2);
        if !source.starts_with('^') {
            anchored.push('^');
        }
        anchored.push_str(source);
        if !source.ends_with('$') {
            anchored.push('$');
        }
        let regex = Regex::new(&anchored).map_err(|e| PatternError {
            pattern: source.to_owned(),
            kind: PatternErrorKind::Regex(e.to_string()),
        })?;
        let params = regex
            .capture_names()
            .skip(1)
            .map(|name| Param { name: name.map(str::to_owned), ty: ParamType::Any })
            .collect();
        Ok(Self {
            source: source.to_owned(),
            regex: regex.into(),
            params,
            sample: None,
        })
    }

    /// Returns the text this [`Pattern`] was created from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the compiled [`Regex`].
    #[must_use]
    pub fn compiled(&self) -> &Regex {
        &self.regex
    }

    /// Returns the [`Param`]s, one per capture group.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns a step text this [`Pattern`] matches, used to detect
    /// overlapping definitions. Raw regexes have none.
    #[must_use]
    pub fn sample(&self) -> Option<&str> {
        self.sample.as_deref()
    }

    /// Checks whether the whole `text` matches this [`Pattern`].
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Matches the `text` returning the raw captured values, one per
    /// [`Param`]. Groups that didn't participate yield an empty string.
    #[must_use]
    pub fn captures<'t>(&self, text: &'t str) -> Option<Vec<&'t str>> {
        let caps = self.regex.captures(text)?;
        Some(
            (1..caps.len())
                .map(|i| caps.get(i).map_or("", |m| m.as_str()))
                .collect(),
        )
    }
}

fn parse_param(inner: &str) -> Result<Param, PatternErrorKind> {
    let (name, ty) = match inner.split_once(':') {
        Some((name, ty)) => (Some(name.trim()), ty.trim()),
        None => match ParamType::from_name(inner) {
            Some(ty) => return Ok(Param { name: None, ty }),
            None => (Some(inner), ""),
        },
    };
    let ty = ParamType::from_name(ty)
        .ok_or_else(|| PatternErrorKind::UnknownType(ty.to_owned()))?;
    let name = name.filter(|n| !n.is_empty());
    if let Some(n) = name {
        let valid = n.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(PatternErrorKind::InvalidName(n.to_owned()));
        }
    }
    Ok(Param { name: name.map(str::to_owned), ty })
}

/// Error of compiling a [`Pattern`].
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
#[display("invalid step pattern `{pattern}`: {kind}")]
pub struct PatternError {
    /// Offending pattern.
    pub pattern: String,

    /// What's wrong with it.
    #[error(not(source))]
    pub kind: PatternErrorKind,
}

/// Reason of a [`PatternError`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum PatternErrorKind {
    /// `{` without `}`.
    #[display("unclosed `{{`")]
    Unclosed,

    /// `}` without `{`.
    #[display("unexpected `}}`, escape it as `\\}}`")]
    Unopened,

    /// Parameter type not known.
    #[display("unknown parameter type `{_0}`")]
    UnknownType(String),

    /// Parameter name isn't an identifier.
    #[display("invalid parameter name `{_0}`")]
    InvalidName(String),

    /// Parameter name used twice.
    #[display("duplicate parameter name `{_0}`")]
    DuplicateName(String),

    /// Resulting regex doesn't compile.
    #[display("{_0}")]
    Regex(String),
}
