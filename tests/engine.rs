use std::{
    cell::{Cell, RefCell},
    convert::Infallible,
    io,
    time::Duration,
};

use futures::{future::LocalBoxFuture, FutureExt as _};
use stepwise::{
    cli,
    feature::Pickle,
    report::{Report, ScenarioResult, Status},
    runner::{self, Cancellation},
    step::{self, ensure, ensure_eq, Context, Failure, StepKind},
    tag::TagOperation,
    writer::{self, Coloring},
    Error, Suite, World, WriterExt as _,
};

thread_local! {
    static ENTRIES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    static ACTIVE: Cell<usize> = const { Cell::new(0) };
    static MAX_ACTIVE: Cell<usize> = const { Cell::new(0) };
    static ATTEMPTS: Cell<usize> = const { Cell::new(0) };
    static CANCEL: RefCell<Option<Cancellation>> = const { RefCell::new(None) };
}

fn entries() -> Vec<String> {
    ENTRIES.with(|e| e.borrow().clone())
}

fn push(entry: impl Into<String>) {
    ENTRIES.with(|e| e.borrow_mut().push(entry.into()));
}

#[derive(Debug, Default)]
struct Log {
    total: i64,
}

impl World for Log {
    type Error = Infallible;

    async fn new() -> Result<Self, Infallible> {
        Ok(Self::default())
    }
}

fn record(_: &mut Log, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        push(ctx.named_str("entry")?);
        Ok(())
    }
    .boxed_local()
}

fn fails(_: &mut Log, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async { Err(Failure::assertion("intentional failure")) }.boxed_local()
}

fn fails_times(_: &mut Log, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let times = usize::try_from(ctx.named_int("n")?).unwrap();
        let attempt = ATTEMPTS.with(|a| {
            a.set(a.get() + 1);
            a.get()
        });
        ensure(attempt > times, format!("attempt {attempt} is flaky"))
    }
    .boxed_local()
}

fn panics(_: &mut Log, _: Context) -> LocalBoxFuture<'_, step::Result> {
    panic!("boom")
}

fn number(world: &mut Log, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        world.total = ctx.named_int("a")?;
        Ok(())
    }
    .boxed_local()
}

fn add(world: &mut Log, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        world.total += ctx.named_int("b")?;
        Ok(())
    }
    .boxed_local()
}

fn total(world: &mut Log, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move { ensure_eq("total", ctx.named_int("total")?, world.total) }.boxed_local()
}

fn sleeps(_: &mut Log, ctx: Context) -> LocalBoxFuture<'_, step::Result> {
    async move {
        let ms = u64::try_from(ctx.named_int("ms")?).unwrap();
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    }
    .boxed_local()
}

fn concurrently(_: &mut Log, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async {
        let now = ACTIVE.with(|a| {
            a.set(a.get() + 1);
            a.get()
        });
        MAX_ACTIVE.with(|m| m.set(m.get().max(now)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        ACTIVE.with(|a| a.set(a.get() - 1));
        Ok(())
    }
    .boxed_local()
}

fn alone(_: &mut Log, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async {
        ensure_eq("scenarios running before", 0, ACTIVE.with(Cell::get))?;
        ACTIVE.with(|a| a.set(1));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after = ACTIVE.with(Cell::get);
        ACTIVE.with(|a| a.set(0));
        ensure_eq("scenarios running after", 1, after)
    }
    .boxed_local()
}

fn cancels(_: &mut Log, _: Context) -> LocalBoxFuture<'_, step::Result> {
    async {
        CANCEL.with(|c| {
            if let Some(handle) = c.borrow().as_ref() {
                handle.cancel();
            }
        });
        Ok(())
    }
    .boxed_local()
}

fn steps() -> step::Collection<Log> {
    step::Collection::new()
        .step("the log records \"{entry}\"", record)
        .step("the step fails", fails)
        .step("the step fails {n:d} times", fails_times)
        .step("the step panics", panics)
        .given("the number {a:d}", number)
        .when("I add {b:d}", add)
        .then("the total is {total:d}", total)
        .step("the step sleeps for {ms:d} ms", sleeps)
        .step("the step runs concurrently", concurrently)
        .step("the step runs alone", alone)
        .given("the run is cancelled", cancels)
}

type Quiet = writer::Summarize<writer::Basic<io::Sink>>;

fn suite() -> Suite<Log, Quiet> {
    Suite::<Log>::new()
        .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
        .steps(steps())
}

async fn run(suite: Suite<Log, Quiet>, feature: &str) -> Report {
    let path = format!("tests/features/engine/{feature}.feature");
    let writer = suite.run(path).await.unwrap();
    assert!(writer.report().is_finished());
    writer.into_inner().0
}

fn scenario<'r>(report: &'r Report, name: &str) -> &'r ScenarioResult {
    report
        .scenarios()
        .find(|sc| sc.name == name)
        .unwrap_or_else(|| panic!("no `{name}` scenario in the report"))
}

fn statuses(sc: &ScenarioResult) -> Vec<Status> {
    sc.all_steps().map(|s| s.status).collect()
}

#[tokio::test]
async fn background_runs_before_every_scenario() {
    let report = run(suite().max_concurrent_scenarios(1), "background").await;

    assert_eq!(
        entries(),
        [
            "background 1",
            "background 2",
            "first",
            "background 1",
            "background 2",
            "second",
        ],
    );
    for name in ["First", "Second"] {
        let sc = scenario(&report, name);
        assert_eq!(sc.status, Status::Passed);
        assert_eq!(sc.background.len(), 2);
        assert_eq!(sc.steps.len(), 1);
    }
}

#[tokio::test]
async fn failure_skips_rest_of_scenario_only() {
    let report = run(suite().max_concurrent_scenarios(1), "failures").await;

    let failing = scenario(&report, "Failing step skips the rest");
    assert_eq!(failing.status, Status::Failed);
    assert_eq!(statuses(failing), [Status::Passed, Status::Failed, Status::Skipped]);
    assert_eq!(failing.failed_step().unwrap().text, "the step fails");

    assert_eq!(scenario(&report, "Sibling still runs").status, Status::Passed);

    let panicking = scenario(&report, "Panicking step");
    assert_eq!(panicking.status, Status::Failed);
    assert_eq!(
        panicking.steps[0].error.as_ref().unwrap().to_string(),
        "step panicked: boom",
    );

    let undefined = scenario(&report, "Undefined step");
    assert_eq!(undefined.status, Status::Errored);
    assert_eq!(undefined.steps[0].error.as_ref().unwrap().kind(), "undefined");
    assert_eq!(undefined.steps[1].status, Status::Skipped);

    assert!(!entries().contains(&"after".to_owned()));
    assert!(!entries().contains(&"never".to_owned()));
    assert!(entries().contains(&"sibling".to_owned()));

    let stats = report.stats();
    assert_eq!(stats.scenarios.passed, 1);
    assert_eq!(stats.scenarios.failed, 2);
    assert_eq!(stats.scenarios.errored, 1);
    assert!(report.execution_has_failed());
    assert_eq!(report.failures().len(), 3);
}

#[tokio::test]
async fn outline_rows_are_independent() {
    let report = run(suite(), "outline").await;

    let results = report.scenarios().collect::<Vec<_>>();
    assert_eq!(results.len(), 4);
    assert_eq!(
        results.iter().map(|sc| sc.name.as_str()).collect::<Vec<_>>(),
        ["Adding 1 and 2", "Adding 2 and 2", "Adding 5 and 5", "Adding 0 and 7"],
    );
    assert_eq!(
        results.iter().map(|sc| sc.status).collect::<Vec<_>>(),
        [Status::Passed, Status::Failed, Status::Passed, Status::Passed],
    );

    let failed = results[1].failed_step().unwrap();
    assert_eq!(failed.text, "the total is 5");
    let err = failed.error.as_ref().unwrap().to_string();
    assert!(err.contains('5') && err.contains('4'), "{err}");
    assert_eq!(results[1].example.as_ref().unwrap().values["total"], "5");
}

#[tokio::test]
async fn hooks_wrap_every_scenario() {
    fn before<'a>(pickle: &'a Pickle, _: &'a mut Log) -> LocalBoxFuture<'a, step::Result> {
        async move {
            push(format!("before {}", pickle.name));
            Ok(())
        }
        .boxed_local()
    }

    fn after<'a>(
        pickle: &'a Pickle,
        world: Option<&'a mut Log>,
    ) -> LocalBoxFuture<'a, step::Result> {
        async move {
            ensure(world.is_some(), "world should be alive")?;
            push(format!("after {}", pickle.name));
            Ok(())
        }
        .boxed_local()
    }

    let suite = suite().max_concurrent_scenarios(1).before(before).after(after);
    let report = run(suite, "background").await;

    assert_eq!(report.stats().scenarios.passed, 2);
    let log = entries();
    assert_eq!(log.first().map(String::as_str), Some("before First"));
    assert_eq!(log.get(4).map(String::as_str), Some("after First"));
    assert_eq!(log.last().map(String::as_str), Some("after Second"));
}

#[tokio::test]
async fn failing_before_hook_errors_scenario() {
    fn before<'a>(_: &'a Pickle, _: &'a mut Log) -> LocalBoxFuture<'a, step::Result> {
        async { Err(Failure::assertion("no session")) }.boxed_local()
    }

    let report = run(suite().before(before), "background").await;

    for sc in report.scenarios() {
        assert_eq!(sc.status, Status::Errored);
        assert!(sc.all_steps().all(|s| s.status == Status::Skipped));
        assert!(sc.error.as_ref().unwrap().to_string().contains("no session"));
    }
    assert!(entries().is_empty());
}

#[tokio::test]
async fn filters_by_tags_and_names() {
    let mut opts = cli::Opts::<runner::Cli, writer::basic::Cli, cli::Empty>::default();
    opts.tags_filter = Some("@smoke and not @wip".parse().unwrap());
    let report = run(suite().max_concurrent_scenarios(1).with_cli(opts), "tags").await;

    let names = report.scenarios().map(|sc| sc.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Smoke", "Examples tags"]);
    assert_eq!(entries(), ["smoke", "tagged"]);

    let mut opts = cli::Opts::<runner::Cli, writer::basic::Cli, cli::Empty>::default();
    opts.re_filter = Some("^Reg".parse().unwrap());
    let report = run(suite().with_cli(opts), "tags").await;

    let names = report.scenarios().map(|sc| sc.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Regression"]);
}

#[tokio::test]
async fn filter_run_narrows_selection() {
    let writer = suite()
        .max_concurrent_scenarios(1)
        .filter_run("tests/features/engine/tags.feature", |_, pickle| {
            pickle.has_tag("suite") && !pickle.has_tag("smoke")
        })
        .await
        .unwrap();

    let names = writer.report().scenarios().map(|sc| sc.name.clone()).collect::<Vec<_>>();
    assert_eq!(names, ["Regression", "Examples tags"]);
    assert_eq!(entries(), ["regression", "untagged"]);
}

#[tokio::test]
async fn slow_step_times_out() {
    let report = run(suite().step_timeout(Duration::from_millis(50)), "timing").await;

    let slow = scenario(&report, "Slow step");
    assert_eq!(slow.status, Status::Errored);
    assert_eq!(statuses(slow), [Status::Errored, Status::Skipped]);
    assert_eq!(slow.steps[0].error.as_ref().unwrap().kind(), "timeout");

    assert_eq!(scenario(&report, "Fast step").status, Status::Passed);
    assert!(entries().is_empty());
}

#[tokio::test]
async fn retries_failed_scenarios() {
    let report = run(suite().retries(1), "retry").await;

    let flaky = scenario(&report, "Flaky");
    assert_eq!(flaky.status, Status::Passed);
    assert_eq!(flaky.attempts, 2);

    let failing = scenario(&report, "Always failing");
    assert_eq!(failing.status, Status::Failed);
    assert_eq!(failing.attempts, 2);

    assert_eq!(report.stats().retries, 2);
}

#[tokio::test]
async fn retry_filter_restricts_retries() {
    let only_flaky = "@flaky".parse::<TagOperation>().unwrap();
    let report = run(suite().retries(3).retry_filter(only_flaky), "retry").await;

    assert_eq!(scenario(&report, "Always failing").attempts, 1);
    assert_eq!(scenario(&report, "Flaky").attempts, 2);
}

#[tokio::test]
async fn runs_concurrently_except_serial() {
    let report = run(suite().max_concurrent_scenarios(4), "concurrency").await;

    assert_eq!(report.stats().scenarios.passed, 5, "{:?}", report.failures());
    assert!(MAX_ACTIVE.with(Cell::get) > 1);
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let report = run(suite().max_concurrent_scenarios(1), "concurrency").await;

    assert_eq!(report.stats().scenarios.passed, 5);
    assert_eq!(MAX_ACTIVE.with(Cell::get), 1);
}

#[tokio::test]
async fn raw_regexes_resolve_ambiguously() {
    fn noop(_: &mut Log, _: Context) -> LocalBoxFuture<'_, step::Result> {
        async { Ok(()) }.boxed_local()
    }

    let steps = step::Collection::new()
        .regex(StepKind::When, r"^I click the (\w+) button$", noop)
        .regex(StepKind::When, r"^I click the login (.+)$", noop);
    let writer = Suite::<Log>::new()
        .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
        .steps(steps)
        .run("tests/features/engine/ambiguous.feature")
        .await
        .unwrap();

    let sc = scenario(writer.report(), "Clicking");
    assert_eq!(sc.status, Status::Errored);
    let err = sc.steps[0].error.as_ref().unwrap();
    assert_eq!(err.kind(), "ambiguous");
    assert!(err.to_string().contains("I click the login button"), "{err}");
}

#[tokio::test]
async fn overlapping_definitions_abort_the_run() {
    fn noop(_: &mut Log, _: Context) -> LocalBoxFuture<'_, step::Result> {
        async { Ok(()) }.boxed_local()
    }

    let steps = step::Collection::new()
        .when("I click the {word} button", noop)
        .when("I click the login button", noop);
    let res = Suite::<Log>::new()
        .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
        .steps(steps)
        .run("tests/features/engine/ambiguous.feature")
        .await;

    assert!(matches!(res, Err(Error::Registry(_))), "{res:?}");
}

#[tokio::test]
async fn duplicate_registration_aborts_the_run() {
    let steps = steps().step("the step fails", fails);
    let res = Suite::<Log>::new()
        .with_writer(writer::Basic::new(io::sink(), Coloring::Never, 0).summarized())
        .steps(steps)
        .run("tests/features/engine/failures.feature")
        .await;

    assert!(matches!(res, Err(Error::Registry(_))), "{res:?}");
    assert!(entries().is_empty());
}

#[tokio::test]
async fn cancellation_skips_remaining_work() {
    let suite = suite().max_concurrent_scenarios(1);
    CANCEL.with(|c| *c.borrow_mut() = Some(suite.cancellation()));
    let report = run(suite, "cancel").await;

    let cancelling = scenario(&report, "Cancelling");
    assert_eq!(statuses(cancelling), [Status::Passed, Status::Skipped]);
    assert_eq!(cancelling.status, Status::Skipped);

    let never = scenario(&report, "Never started");
    assert_eq!(never.status, Status::Skipped);
    assert_eq!(never.attempts, 0);
    assert!(entries().is_empty());
}

#[tokio::test]
async fn fail_fast_stops_after_first_failure() {
    let report = run(suite().max_concurrent_scenarios(1).fail_fast(), "failures").await;

    assert_eq!(scenario(&report, "Failing step skips the rest").status, Status::Failed);
    for name in ["Sibling still runs", "Panicking step", "Undefined step"] {
        let sc = scenario(&report, name);
        assert_eq!(sc.status, Status::Skipped, "{name}");
        assert_eq!(sc.attempts, 0, "{name}");
    }
    assert_eq!(entries(), ["before"]);
}

#[tokio::test]
async fn runs_already_parsed_features() {
    let feature = stepwise::feature::Feature::parse_str(
        "Feature: Inline\n  Scenario: Adds\n    Given the number 2\n    When I add 3\n    Then the total is 5\n",
    )
    .unwrap();

    let writer = suite().run_features(vec![feature]).await.unwrap();

    assert_eq!(writer.report().stats().scenarios.passed, 1);
    assert_eq!(writer.report().features()[0].name, "Inline");
}

#[tokio::test]
async fn same_named_features_keep_their_scenarios() {
    let first = stepwise::feature::Feature::parse_str(
        "Feature: Login\n  \
         Scenario: A1\n    Given the step sleeps for 50 ms\n  \
         Scenario: A2\n    Given the step sleeps for 50 ms\n",
    )
    .unwrap();
    let second = stepwise::feature::Feature::parse_str(
        "Feature: Login\n  Scenario: B1\n    Given the number 1\n",
    )
    .unwrap();

    let writer = suite().run_features(vec![first, second]).await.unwrap();

    let grouped = writer
        .report()
        .features()
        .iter()
        .map(|f| f.scenarios.iter().map(|sc| sc.name.as_str()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    assert_eq!(grouped, [vec!["A1", "A2"], vec!["B1"]]);
}

#[tokio::test]
#[should_panic(expected = "1 scenario failed, 0 parsing errors")]
async fn run_and_exit_panics_on_failures() {
    suite().retries(1).run_and_exit("tests/features/engine/retry.feature").await;
}
