use std::time::Duration;

use cleanmate_assistant::{
    ActionInterpreter, ActionKind, Advisor, AdvisorReply, AssistantContext, BoxFuture, ChatMode,
    ChatSession, HealthStatus, HistoryStore, Report, ReportKind, ReportStore, Role,
    SUGGESTED_CLEAN_TARGETS, ScriptedAdvisor, SystemMetrics, SystemMonitor,
};
use cleanmate_core::{Analysis, AnalysisResult, Cleanup, DeletionOutcome, PathWhitelist};
use tempfile::TempDir;

fn analysis_of(mb: u64) -> Analysis {
    Analysis {
        result: AnalysisResult {
            total_recoverable_bytes: mb * 1024 * 1024,
            file_count: 42,
            ..Default::default()
        },
        warnings: Vec::new(),
    }
}

fn ctx(mode: ChatMode, metrics: SystemMetrics) -> AssistantContext {
    AssistantContext::new(mode, metrics, false)
}

#[test]
fn test_clean_intent_after_analysis_suggests_whitelisted_targets() {
    let mut context = ctx(ChatMode::Analysis, SystemMetrics::new(10, 20, 30, 100));
    context.record_analysis(&analysis_of(250));

    let reply = ScriptedAdvisor::new().respond("please clean my computer", &context);
    let action = reply.action.expect("clean suggestion");
    assert_eq!(action.kind, ActionKind::Clean);
    assert_eq!(action.targets, SUGGESTED_CLEAN_TARGETS.map(String::from).to_vec());
    assert!(reply.text.contains("250 MB"));

    let interpreter = ActionInterpreter::new(PathWhitelist::system_default());
    assert!(interpreter.interpret(&action).is_ok());
}

#[test]
fn test_clean_intent_without_analysis_asks_for_one() {
    let context = ctx(ChatMode::Analysis, SystemMetrics::new(10, 20, 30, 100));
    let reply = ScriptedAdvisor::new().respond("clean", &context);
    assert_eq!(reply.action.unwrap().kind, ActionKind::Analyze);
}

#[test]
fn test_greeting_variants() {
    let advisor = ScriptedAdvisor::new();

    let full = ctx(ChatMode::Analysis, SystemMetrics::new(10, 20, 95, 3));
    assert!(advisor.greeting(&full).contains("95%"));
    let reply = advisor.respond("hello", &full);
    assert_eq!(reply.action.unwrap().kind, ActionKind::Analyze);

    let mut lots = ctx(ChatMode::Optimization, SystemMetrics::new(10, 20, 30, 100));
    lots.record_analysis(&analysis_of(2048));
    let greeting = advisor.greeting(&lots);
    assert!(greeting.contains("Optimization"));
    assert!(greeting.contains("2048 MB"));

    let calm = ctx(ChatMode::Hardware, SystemMetrics::new(12, 34, 30, 100));
    assert!(advisor.greeting(&calm).contains("CPU: 12%"));
}

#[test]
fn test_hardware_fallback_reports_free_disk() {
    let context = ctx(ChatMode::Hardware, SystemMetrics::new(5, 6, 7, 321));
    let reply = ScriptedAdvisor::new().respond("tell me something", &context);
    assert!(reply.text.contains("321 GB"));
    assert!(reply.action.is_none());
}

#[test]
fn test_performance_intent_checks_ram() {
    let advisor = ScriptedAdvisor::new();
    let busy = ctx(ChatMode::Analysis, SystemMetrics::new(10, 85, 30, 100));
    assert!(advisor.respond("it's so slow", &busy).text.contains("85%"));

    let idle = ctx(ChatMode::Analysis, SystemMetrics::new(10, 40, 30, 100));
    assert!(advisor.respond("it's so slow", &idle).action.is_some());
}

#[test]
fn test_history_intent_uses_newest_report() {
    let advisor = ScriptedAdvisor::new();
    let empty = ctx(ChatMode::Analysis, SystemMetrics::default());
    assert!(advisor.respond("show history", &empty).action.is_some());

    let cleanup = Cleanup {
        outcome: DeletionOutcome {
            freed_bytes: 5 * 1024 * 1024,
            items_deleted: 17,
            ..Default::default()
        },
        ..Default::default()
    };
    let context = empty.with_reports(vec![Report::from_cleanup(&cleanup)]);
    let reply = advisor.respond("show history", &context);
    assert!(reply.text.contains("17"));
    assert!(reply.text.contains("5 MB"));
    assert_eq!(context.last_cleanup.unwrap().items_deleted, 17);
}

#[test]
fn test_system_metrics_status() {
    assert_eq!(SystemMetrics::new(90, 10, 10, 1).status, HealthStatus::Critical);
    assert_eq!(SystemMetrics::new(10, 65, 10, 1).status, HealthStatus::Warning);
    assert_eq!(SystemMetrics::new(10, 10, 10, 1).status, HealthStatus::Good);
}

#[tokio::test]
async fn test_monitor_sample_is_consistent() {
    let metrics = SystemMonitor::new().sample().await;
    assert!(metrics.cpu_load <= 100 && metrics.ram_used <= 100 && metrics.disk_used <= 100);
    if metrics.status != HealthStatus::Unknown {
        assert_eq!(
            metrics.status,
            HealthStatus::classify(metrics.cpu_load, metrics.ram_used, metrics.disk_used)
        );
    }
}

#[tokio::test]
async fn test_report_store_newest_first_and_capped() {
    let temp = TempDir::new().unwrap();
    let store = ReportStore::new(temp.path().join("data"), 2);

    store.save(Report::from_analysis(&analysis_of(1))).await.unwrap();
    store.save(Report::from_analysis(&analysis_of(2))).await.unwrap();
    store.save(Report::from_cleanup(&Cleanup::default())).await.unwrap();

    let reports = store.load().await;
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].kind, ReportKind::Cleanup);
    assert_eq!(reports[1].stats.recoverable_mb, 2.0);

    let context = AssistantContext::default().with_reports(reports);
    assert_eq!(context.recoverable_mb(), 2.0);
}

#[tokio::test]
async fn test_chat_session_records_both_sides() {
    let temp = TempDir::new().unwrap();
    let history = HistoryStore::new(temp.path(), 50);
    let session = ChatSession::new(
        ScriptedAdvisor::new(),
        history,
        ActionInterpreter::new(PathWhitelist::system_default()),
    );
    let context = ctx(ChatMode::Analysis, SystemMetrics::new(10, 20, 30, 100));

    let turn = session.send("can you scan for junk?", &context).await.unwrap();
    assert_eq!(turn.ready.unwrap().action.kind, ActionKind::Analyze);
    assert!(turn.rejected.is_none());

    let entries = session.history().load().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[0].load.unwrap().ram, 20);
    assert_eq!(entries[1].role, Role::Assistant);
    assert!(entries[1].action.is_some());
}

struct SlowAdvisor;

impl Advisor for SlowAdvisor {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn reply<'a>(&'a self, _message: &'a str, _ctx: &'a AssistantContext) -> BoxFuture<'a, AdvisorReply> {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            AdvisorReply::new("too late")
        })
    }
}

#[tokio::test]
async fn test_slow_advisor_yields_unavailable() {
    let temp = TempDir::new().unwrap();
    let session = ChatSession::new(
        SlowAdvisor,
        HistoryStore::new(temp.path(), 50),
        ActionInterpreter::new(PathWhitelist::new()),
    )
    .with_timeout(Duration::from_millis(20));

    let turn = session
        .send("hello", &AssistantContext::default())
        .await
        .unwrap();
    assert_eq!(turn.reply.message, AdvisorReply::unavailable().text);
    assert!(turn.ready.is_none());
}
