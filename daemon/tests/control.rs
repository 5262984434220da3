// daemon/tests/control.rs
use std::time::Duration;
use tokio::net::UnixListener;
use warden_core::rpc::message::{
    DaemonAction, Message, StatsAction, SubmitAction, TaskAction, TaskFilter,
};
use warden_core::rpc::request_reply;
use warden_core::{ResourceQuota, SchedulerConfig, TaskPriority, TaskStatus};
use warden_daemon::daemon::{build_scheduler, serve};

async fn ask(sock_path: &str, request: Message) -> Message {
    let sock_path = sock_path.to_string();
    tokio::task::spawn_blocking(move || request_reply(&sock_path, &request))
        .await
        .unwrap()
        .unwrap()
}

fn generous_config() -> SchedulerConfig {
    SchedulerConfig::with_quota(ResourceQuota {
        max_cpu_percent: 1000.0,
        max_memory_mb: 1.0e9,
        ..Default::default()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn socket_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let sock_path = dir.path().join("warden.sock").to_string_lossy().to_string();
    let listener = UnixListener::bind(&sock_path).unwrap();
    let server = tokio::spawn(serve(listener, build_scheduler(generous_config())));

    match ask(&sock_path, Message::DaemonCommand(DaemonAction::Status)).await {
        Message::Ack(text) => assert!(text.contains("Daemon status"), "{}", text),
        other => panic!("unexpected status reply: {:?}", other),
    }

    let submit = Message::SubmitCommand(SubmitAction::Command {
        cmd: "true".to_string(),
        task_type: "smoke".to_string(),
        priority: TaskPriority::High,
        timeout_secs: Some(30),
    });
    let task_id = match ask(&sock_path, submit).await {
        Message::Submitted(id) => id,
        other => panic!("unexpected submit reply: {:?}", other),
    };
    assert!(task_id.starts_with("smoke_"));

    let record = tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let info = Message::TaskCommand(TaskAction::Info { task_id: task_id.clone() });
            if let Message::TaskStatus(records) = ask(&sock_path, info).await {
                if records[0].status.is_terminal() {
                    return records[0].clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(record.status, TaskStatus::Completed, "{:?}", record.error);

    let list = Message::TaskCommand(TaskAction::List { filter: TaskFilter::Finished });
    match ask(&sock_path, list).await {
        Message::TaskStatus(records) => assert!(records.iter().any(|r| r.task_id == task_id)),
        other => panic!("unexpected list reply: {:?}", other),
    }
    assert!(matches!(
        ask(&sock_path, Message::StatsCommand(StatsAction::Resources)).await,
        Message::Stats(stats) if stats.task_type_stats.contains_key("smoke")
    ));
    assert!(matches!(
        ask(&sock_path, Message::StatsCommand(StatsAction::Metrics)).await,
        Message::Metrics(_)
    ));

    let cancel = Message::TaskCommand(TaskAction::Cancel { task_id: "smoke_0".to_string() });
    assert!(matches!(ask(&sock_path, cancel).await, Message::Error(_)));

    let bad = Message::SubmitCommand(SubmitAction::Command {
        cmd: "echo 'unterminated".to_string(),
        task_type: "smoke".to_string(),
        priority: TaskPriority::Low,
        timeout_secs: None,
    });
    assert!(matches!(ask(&sock_path, bad).await, Message::Error(_)));

    assert!(matches!(
        ask(&sock_path, Message::DaemonCommand(DaemonAction::Stop)).await,
        Message::Ack(_)
    ));
    tokio::time::timeout(Duration::from_secs(10), server).await.unwrap().unwrap().unwrap();
}
