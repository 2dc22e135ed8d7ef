use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dd_pipeline::models::{StageFailure, StageKind};
use dd_pipeline::testing::ScriptedExecutor;
use dd_pipeline::{App, BatchOrchestrator, Config, EntryStatus, StartupInput};

/// 在临时目录里准备输入和输出路径
fn config_in(dir: &Path) -> Config {
    let input_folder = dir.join("input_toml");
    std::fs::create_dir_all(&input_folder).unwrap();
    std::fs::write(
        input_folder.join("batch.toml"),
        r#"
[[startups]]
name = "Acme"
website = "https://acme.io"
sector = "Fintech"

[[startups]]
name = "Globex"
pitchDeckUrl = "https://globex.io/deck.pdf"

[[startups]]
name = "   "

[[startups]]
name = "Initech"
"#,
    )
    .unwrap();

    Config {
        max_concurrent_entries: 2,
        input_folder: input_folder.display().to_string(),
        report_folder: dir.join("reports").display().to_string(),
        output_log_file: dir.join("output.txt").display().to_string(),
        failure_file: dir.join("failures.txt").display().to_string(),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_app_runs_batch_and_writes_outputs() {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let executor = ScriptedExecutor::new().fail(
        "Globex",
        StageKind::ParseDeck,
        StageFailure::upstream("deck parser unavailable"),
    );
    let app = App::with_executor(config.clone(), Arc::new(executor)).unwrap();
    let summary = app.run().await.unwrap();

    // 名字为空的输入在提交前被丢弃
    assert_eq!(summary.total, 3);
    assert_eq!(summary.complete, 2);
    assert_eq!(summary.error, 1);
    assert_eq!(summary.pending, 0);

    let reports = std::fs::read_dir(&config.report_folder).unwrap().count();
    assert_eq!(reports, 2);

    let failures = std::fs::read_to_string(&config.failure_file).unwrap();
    assert!(failures.contains("Globex"));
    assert!(failures.contains("deck parser unavailable"));
    assert!(!failures.contains("Acme"));

    let log = std::fs::read_to_string(&config.output_log_file).unwrap();
    assert!(log.contains("尽调批次日志"));
}

#[tokio::test]
async fn test_app_resubmits_failed_entries() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        retry_failed_rounds: 2,
        ..config_in(dir.path())
    };

    let executor = Arc::new(ScriptedExecutor::new().fail(
        "Initech",
        StageKind::Scrape,
        StageFailure::timeout(),
    ));
    let app = App::with_executor(config.clone(), executor.clone()).unwrap();
    let summary = app.run().await.unwrap();

    assert_eq!(summary.complete, 2);
    assert_eq!(summary.error, 1);
    // 首轮加两轮重提，每轮都重新抓取一次
    let initech_scrapes = executor
        .calls()
        .iter()
        .filter(|(name, stage)| name == "Initech" && *stage == StageKind::Scrape)
        .count();
    assert_eq!(initech_scrapes, 3);

    let failures = std::fs::read_to_string(&config.failure_file).unwrap();
    assert_eq!(failures.lines().count(), 3);
    assert!(failures.lines().all(|l| l.contains("| timeout")));
}

#[tokio::test]
async fn test_snapshots_observed_until_finished() {
    let executor = Arc::new(ScriptedExecutor::new().with_delay(Duration::from_millis(5)));
    let inputs = vec![
        StartupInput::new("A").with_website("https://a.io"),
        StartupInput::new("B"),
        StartupInput::new("C").with_pitch_deck("https://c.io/deck.pdf"),
    ];

    let handle = BatchOrchestrator::new(executor, 2).start(inputs).unwrap();
    let mut snapshots = handle.snapshots();
    let finished = snapshots
        .wait_for(|s| s.finished)
        .await
        .map(|s| s.clone())
        .unwrap();

    assert_eq!(finished.overall_progress, 100);
    assert_eq!(finished.counts.complete, 3);

    let outcome = handle.join().await.unwrap();
    assert!(!outcome.cancelled);
    assert!(outcome
        .run
        .entries()
        .iter()
        .all(|e| e.status() == EntryStatus::Complete && e.result().is_some()));
    assert_eq!(outcome.snapshot(), finished);
}

#[tokio::test]
async fn test_cancel_before_admission_keeps_everything_pending() {
    let (executor, _gate) = ScriptedExecutor::new().with_gate(StageKind::Scrape);
    let executor = Arc::new(executor);
    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();

    let outcome = BatchOrchestrator::new(executor.clone(), 2)
        .with_cancellation(cancel)
        .run(vec![StartupInput::new("A"), StartupInput::new("B")])
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.summary.pending, 2);
    assert_eq!(outcome.run.overall_progress(), 0);
    assert!(executor.calls().is_empty());
}

#[tokio::test]
#[ignore] // 默认忽略，需要外部服务：cargo test -- --ignored
async fn test_live_services_single_startup() {
    let _ = tracing_subscriber::fmt::try_init();

    // 加载配置
    let config = Config::from_env();
    let backend = dd_pipeline::services::HttpBackend::new(&config).expect("创建客户端失败");
    let executor = dd_pipeline::PipelineStageExecutor::new(backend, config.stage_timeouts());

    let outcome = BatchOrchestrator::new(Arc::new(executor), 1)
        .run(vec![StartupInput::new("Stripe")
            .with_website("https://stripe.com")
            .with_sector("Payments")])
        .await
        .expect("运行批次失败");

    let entry = &outcome.run.entries()[0];
    assert!(entry.is_terminal(), "条目应该到达终态");
}
