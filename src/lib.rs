// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runtime executing [Gherkin] scenarios against async step definitions.
//!
//! Features are parsed from `.feature` files, expanded into concrete
//! scenarios (one per `Examples` row of an outline) and executed on a fresh
//! [`World`] each. Steps are resolved through a [`step::Collection`] of
//! patterns, and every outcome flows as an [`Event`] into a [`Writer`],
//! which reports or aggregates it.
//!
//! ```rust,no_run
//! use futures::FutureExt as _;
//! use stepwise::{step, Suite, World};
//!
//! #[derive(Debug, Default)]
//! struct Calculator {
//!     total: i64,
//! }
//!
//! impl World for Calculator {
//!     type Error = std::convert::Infallible;
//!
//!     async fn new() -> Result<Self, Self::Error> {
//!         Ok(Self::default())
//!     }
//! }
//!
//! fn add(
//!     world: &mut Calculator,
//!     ctx: step::Context,
//! ) -> futures::future::LocalBoxFuture<'_, step::Result> {
//!     async move {
//!         world.total += ctx.named_int("n")?;
//!         Ok(())
//!     }
//!     .boxed_local()
//! }
//!
//! # async fn run() {
//! Suite::<Calculator>::new()
//!     .steps(step::Collection::new().when("I add {n:d}", add))
//!     .run_and_exit("tests/features")
//!     .await;
//! # }
//! ```
//!
//! [Gherkin]: https://cucumber.io/docs/gherkin/reference

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(non_ascii_idents, unsafe_code)]
#![warn(
    clippy::as_conversions,
    clippy::dbg_macro,
    clippy::unwrap_used,
    missing_debug_implementations,
    missing_docs
)]

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod feature;
pub mod parser;
pub mod report;
pub mod runner;
pub mod step;
pub mod steps;
pub mod suite;
pub mod tag;
pub mod trace;
pub mod world;
pub mod writer;

#[doc(inline)]
pub use self::{
    error::Error,
    event::Event,
    parser::Parser,
    runner::Runner,
    suite::Suite,
    world::World,
    writer::{Ext as WriterExt, Stats as StatsWriter, Writer},
};
