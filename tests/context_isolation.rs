//! Context isolation tests
//!
//! Two units of work running interleaved must each see only their own
//! request context, across `.await` points, spawned tasks and threads.

use context_logger_system::prelude::*;
use std::time::Duration;

struct Unit(&'static str);

impl WorkUnit for Unit {
    fn acting_user_id(&self) -> Option<String> {
        Some(format!("user-{}", self.0))
    }

    fn event_id(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn memory_logger() -> (Logger<Syslog>, MemorySink) {
    let memory = MemorySink::new();
    let logger = Logger::<Syslog>::builder()
        .sink(SinkConfig::new("memory", "debug"), memory.clone())
        .call_site(CallSiteSource::Disabled)
        .build();
    (logger, memory)
}

async fn handle(logger: Logger<Syslog>, name: &'static str, steps: u64) {
    for step in 0..steps {
        logger.info((name, step));
        tokio::time::sleep(Duration::from_millis(1 + step % 3)).await;
        tokio::task::yield_now().await;
    }
}

/// Every line logged by unit `name` carries `[name user-name]`
fn assert_isolated(lines: &[String], name: &str, other: &str) {
    let own: Vec<&String> = lines
        .iter()
        .filter(|line| line.starts_with(&format!("info [{} ", name)))
        .collect();
    assert!(!own.is_empty());
    for line in own {
        assert!(line.contains(&format!("[{} user-{}] {} ", name, name, name)), "{}", line);
        assert!(!line.contains(&format!("user-{}", other)), "{}", line);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_tasks_keep_their_context() {
    let (logger, memory) = memory_logger();

    let a = tokio::spawn({
        let logger = logger.clone();
        async move {
            let unit = Unit("A");
            logger
                .setup_context_async(&unit, handle(logger.clone(), "A", 20))
                .await
        }
    });
    let b = tokio::spawn({
        let logger = logger.clone();
        async move {
            let unit = Unit("B");
            logger
                .setup_context_async(&unit, handle(logger.clone(), "B", 20))
                .await
        }
    });

    a.await.expect("task A panicked");
    b.await.expect("task B panicked");

    let lines = memory.lines();
    assert_eq!(lines.len(), 40);
    assert_isolated(&lines, "A", "B");
    assert_isolated(&lines, "B", "A");
}

#[tokio::test]
async fn test_interleaved_on_one_thread() {
    let (logger, memory) = memory_logger();

    let unit_a = Unit("A");
    let unit_b = Unit("B");
    tokio::join!(
        logger.setup_context_async(&unit_a, handle(logger.clone(), "A", 10)),
        logger.setup_context_async(&unit_b, handle(logger.clone(), "B", 10)),
    );

    let lines = memory.lines();
    assert_eq!(lines.len(), 20);
    assert_isolated(&lines, "A", "B");
    assert_isolated(&lines, "B", "A");
}

#[tokio::test]
async fn test_spawned_task_inherits_context() {
    let (logger, memory) = memory_logger();
    let unit = Unit("A");

    let inner = logger.clone();
    logger
        .setup_context_async(&unit, async move {
            let child = inner.clone();
            spawn_in_context(async move { child.info("from child") })
                .await
                .expect("child panicked");

            let orphan = inner.clone();
            tokio::spawn(async move { orphan.info("from orphan") })
                .await
                .expect("orphan panicked");
        })
        .await;

    assert_eq!(
        memory.lines(),
        vec!["info [A user-A] from child\n", "info from orphan\n"]
    );
}

#[tokio::test]
async fn test_future_created_in_scope_polled_elsewhere() {
    let (logger, memory) = memory_logger();
    let (sender, receiver) = tokio::sync::oneshot::channel();

    let unit = Unit("B");
    let inner = logger.clone();
    logger.setup_context(&unit, || {
        let deferred = async move { inner.warn("deferred") };
        let _ = sender.send(deferred.in_current_log_context());
    });

    let deferred = receiver.await.expect("future not sent");
    deferred.await;

    assert_eq!(memory.lines(), vec!["warn [B user-B] deferred\n"]);
}

#[test]
fn test_threads_keep_their_context() {
    let (logger, memory) = memory_logger();

    let handles: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| {
            let logger = logger.clone();
            std::thread::spawn(move || {
                let unit = Unit(name);
                logger.setup_context(&unit, || {
                    for step in 0..25 {
                        logger.info((name, step));
                    }
                });
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let lines = memory.lines();
    assert_eq!(lines.len(), 75);
    assert_isolated(&lines, "A", "B");
    assert_isolated(&lines, "B", "C");
    assert_isolated(&lines, "C", "A");
}

#[test]
fn test_thread_spawned_in_scope_inherits() {
    let (logger, memory) = memory_logger();
    let unit = Unit("A");

    logger.setup_context(&unit, || {
        let inner = logger.clone();
        spawn_thread_in_context(move || inner.debug("on a thread"))
            .join()
            .expect("thread panicked");
    });

    assert_eq!(memory.lines(), vec!["debug [A user-A] on a thread\n"]);
}

#[test]
fn test_nested_scopes_restore_parent() {
    let (logger, memory) = memory_logger();

    logger.setup_context(&Unit("outer"), || {
        logger.info("before");
        logger.setup_context(&Unit("inner"), || logger.info("nested"));
        logger.info("after");
    });
    logger.info("outside");

    assert_eq!(
        memory.lines(),
        vec![
            "info [outer user-outer] before\n",
            "info [inner user-inner] nested\n",
            "info [outer user-outer] after\n",
            "info outside\n",
        ]
    );
}
