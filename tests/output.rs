use std::{convert::Infallible, fs, io};

use futures::{future::LocalBoxFuture, FutureExt as _};
use serde_json::Value;
use stepwise::{
    cli,
    config::Config,
    runner,
    step::{self, Context, Failure},
    writer::{self, Coloring},
    Error, StatsWriter as _, Suite, World, WriterExt as _,
};

#[derive(Debug, Default)]
struct Noop;

impl World for Noop {
    type Error = Infallible;

    async fn new() -> Result<Self, Infallible> {
        Ok(Self)
    }
}

fn pass(_: &mut Noop, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async { Ok(()) }.boxed_local()
}

fn fail(_: &mut Noop, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async { Err(Failure::mismatch("unexpected answer", 42, 41)) }.boxed_local()
}

fn steps() -> step::Collection<Noop> {
    step::Collection::new()
        .step("the log records \"{entry}\"", pass)
        .step("the step fails", fail)
        .step("the step fails {n:d} times", fail)
        .step("the step panics", fail)
}

type Opts = cli::Opts<runner::Cli, writer::basic::Cli, cli::Empty>;

#[tokio::test]
async fn basic_writer_renders_results_and_summary() {
    let writer = Suite::<Noop>::new()
        .with_writer(writer::Basic::new(Vec::new(), Coloring::Never, 0).summarized())
        .steps(steps())
        .max_concurrent_scenarios(1)
        .run("tests/features/engine/failures.feature")
        .await
        .unwrap();

    let out = String::from_utf8(writer.inner_writer().output().clone()).unwrap();
    assert!(out.contains("Feature: Failures"), "{out}");
    assert!(out.contains("\u{2718}  Scenario: Failing step skips the rest (line 2)"), "{out}");
    assert!(out.contains("\u{2714}  Scenario: Sibling still runs (line 7)"), "{out}");
    assert!(out.contains("\u{2718}  When the step fails"), "{out}");
    assert!(out.contains("unexpected answer"), "{out}");
    assert!(out.contains("[Summary]"), "{out}");
    assert!(out.contains("4 scenarios (1 passed, 2 failed, 1 errored)"), "{out}");
    assert!(writer.execution_has_failed());
}

#[tokio::test]
async fn verbose_output_lists_every_step() {
    let mut opts = Opts::default();
    opts.writer.verbose = 1;

    let writer = Suite::<Noop>::new()
        .with_writer(writer::Basic::new(Vec::new(), Coloring::Never, 0).summarized())
        .steps(steps())
        .with_cli(opts)
        .run("tests/features/engine/background.feature")
        .await
        .unwrap();

    let out = String::from_utf8(writer.inner_writer().output().clone()).unwrap();
    assert!(out.contains("\u{2714}  > Given the log records \"background 1\""), "{out}");
    assert!(out.contains("\u{2714}  When the log records \"second\""), "{out}");
    assert!(out.contains("2 scenarios (2 passed)"), "{out}");
}

#[tokio::test]
async fn json_report_is_written_on_finish() {
    let file = tempfile::NamedTempFile::new().unwrap();

    let writer = Suite::<Noop>::new()
        .with_writer(writer::Json::new(file.reopen().unwrap()))
        .steps(steps())
        .run("tests/features/engine/failures.feature")
        .await
        .unwrap();
    assert!(writer.execution_has_failed());

    let doc: Value = serde_json::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
    assert_eq!(doc["stats"]["scenarios"]["passed"], 1);
    assert_eq!(doc["stats"]["scenarios"]["failed"], 2);
    assert_eq!(doc["stats"]["scenarios"]["errored"], 1);

    let scenarios = doc["features"][0]["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), 4);
    let failing = &scenarios[0];
    assert_eq!(failing["name"], "Failing step skips the rest");
    assert_eq!(failing["status"], "failed");
    assert_eq!(failing["steps"][1]["error"]["kind"], "assertion");
    assert_eq!(failing["steps"][1]["error"]["expected"], "42");
    assert_eq!(failing["steps"][1]["error"]["actual"], "41");
    assert_eq!(failing["steps"][2]["status"], "skipped");
    assert_eq!(scenarios[3]["steps"][0]["error"]["kind"], "undefined");
}

#[tokio::test]
async fn tee_feeds_both_writers() {
    let writer = Suite::<Noop>::new()
        .with_writer(
            writer::Basic::new(io::sink(), Coloring::Never, 0)
                .summarized()
                .tee(writer::Json::new(Vec::new())),
        )
        .steps(steps())
        .run("tests/features/engine/background.feature")
        .await
        .unwrap();

    assert_eq!(writer.left().report().stats().scenarios.passed, 2);
    let doc: Value = serde_json::from_slice(writer.right().output()).unwrap();
    assert_eq!(doc["stats"]["scenarios"]["passed"], 2);
    assert!(!writer.execution_has_failed());
}

#[tokio::test]
async fn parsing_errors_do_not_stop_other_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("good.feature"),
        "Feature: Good\n  Scenario: fine\n    Given the log records \"ok\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("broken.feature"), "Scenario: orphan\n  Given x\n").unwrap();

    let writer = Suite::<Noop>::new()
        .with_writer(writer::Basic::new(Vec::new(), Coloring::Never, 0).summarized())
        .steps(steps())
        .run(dir.path())
        .await
        .unwrap();

    let stats = writer.report().stats();
    assert_eq!(stats.parsing_errors, 1);
    assert_eq!(stats.scenarios.passed, 1);
    assert!(writer.execution_has_failed());

    let out = String::from_utf8(writer.inner_writer().output().clone()).unwrap();
    assert!(out.contains("broken.feature"), "{out}");
    assert!(out.contains("1 parsing errors"), "{out}");
}

#[tokio::test]
async fn configuration_file_drives_the_runner() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        "app:\n  environment: qa\ntest:\n  parallel:\n    count: 1\n  retry:\n    count: 1\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("environments")).unwrap();
    fs::write(
        dir.path().join("environments/staging.yaml"),
        "test:\n  retry:\n    count: 2\n",
    )
    .unwrap();

    let run = |env: Option<&str>, retry: Option<usize>| {
        let mut opts = Opts::default();
        opts.config = Some(config.clone());
        opts.env = env.map(ToOwned::to_owned);
        opts.runner.retry = retry;
        Suite::<Noop>::new()
            .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
            .steps(steps())
            .with_cli(opts)
            .filter_run("tests/features/engine/retry.feature", |_, p| {
                p.name == "Always failing"
            })
    };
    let attempts = |w: &writer::Summarize<writer::Basic<io::Sink>>| {
        w.report().scenarios().next().map(|sc| sc.attempts)
    };

    assert_eq!(attempts(&run(None, None).await.unwrap()), Some(2));
    assert_eq!(attempts(&run(Some("staging"), None).await.unwrap()), Some(3));
    assert_eq!(attempts(&run(Some("staging"), Some(0)).await.unwrap()), Some(1));

    let loaded = Config::load(&config, Some("staging")).unwrap();
    let writer = Suite::<Noop>::new()
        .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
        .steps(steps())
        .with_config(&loaded)
        .filter_run("tests/features/engine/retry.feature", |_, p| p.name == "Always failing")
        .await
        .unwrap();
    assert_eq!(attempts(&writer), Some(3));
}

#[tokio::test]
async fn missing_configuration_file_aborts_the_run() {
    let mut opts = Opts::default();
    opts.config = Some("does/not/exist.yaml".into());

    let res = Suite::<Noop>::new()
        .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
        .steps(steps())
        .with_cli(opts)
        .run("tests/features/engine/background.feature")
        .await;

    assert!(matches!(res, Err(Error::Config(_))), "{res:?}");
}
