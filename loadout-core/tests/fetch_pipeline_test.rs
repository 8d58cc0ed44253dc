//! Dependency ordering and fault isolation across a full fetch pass

mod common;

use anyhow::anyhow;
use common::{
    catalog, init_test_logging, recording_factory, EventLog, MockSource, RecordingHost,
    RecordingNotifier, RECORDED,
};
use loadout_core::cache::{CacheRecord, MemoryCacheStore};
use loadout_core::component::{ComponentExport, FactoryContext};
use loadout_core::{Loader, Settings};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn settings(features: &[&str]) -> Settings {
    let mut settings = Settings::default();
    settings.use_cache = false;
    for feature in features {
        settings.set_feature(feature, true);
    }
    settings
}

#[tokio::test]
async fn test_styles_complete_before_script_dependencies() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  app:
    displayName: App
    type: script
    url: https://cdn.test/app.min.js
    dependencies: [appStyle, lib]
  appStyle:
    displayName: App style
    type: style
    url: https://cdn.test/app.min.css
  lib:
    displayName: Lib
    type: script
    url: https://cdn.test/lib.min.js
    dependencies: [libStyle]
  libStyle:
    displayName: Lib style
    type: style
    url: https://cdn.test/lib.min.css
"#,
    );
    let source = MockSource::new(&log)
        .with("https://cdn.test/app.min.js", RECORDED)
        .with("https://cdn.test/lib.min.js", RECORDED)
        .with("https://cdn.test/app.min.css", ".app {}")
        .with("https://cdn.test/lib.min.css", ".lib {}")
        .delayed("https://cdn.test/app.min.css", Duration::from_millis(30));
    let host = Arc::new(RecordingHost::new(&log));

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["app"]))
        .source(Arc::new(source))
        .host(host.clone())
        .factory_fn("record", recording_factory(&log))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    log.assert_before("style:appStyle", "download:https://cdn.test/lib.min.js");
    log.assert_before("style:libStyle", "exec:lib");
    log.assert_before("exec:lib", "exec:app");
    assert_eq!(report.executed, vec!["lib", "app"]);
    assert!(report.is_clean());
    assert_eq!(host.styles.lock().len(), 2);
}

#[tokio::test]
async fn test_diamond_dependency_downloads_once() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  a: { displayName: A, type: script, url: a.js, dependencies: [b, c] }
  b: { displayName: B, type: script, url: b.js, dependencies: [d] }
  c: { displayName: C, type: script, url: c.js, dependencies: [d] }
  d: { displayName: D, type: script, url: d.js }
"#,
    );
    let source = Arc::new(
        MockSource::new(&log)
            .with("a.js", RECORDED)
            .with("b.js", RECORDED)
            .with("c.js", RECORDED)
            .with("d.js", RECORDED)
            .delayed("d.js", Duration::from_millis(20)),
    );

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["a"]))
        .source(source.clone())
        .factory_fn("record", recording_factory(&log))
        .build()
        .unwrap();

    loader.fetch().await;

    assert_eq!(source.hits("d.js"), 1);
    // Traversal is per edge; only the download is shared
    assert_eq!(log.count("exec:d"), 2);
    log.assert_before("exec:b", "exec:a");
    log.assert_before("exec:c", "exec:a");
    assert_eq!(loader.store().keys(), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_broken_shared_dependency_fails_once_per_pass() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  a: { displayName: A, type: script, url: a.js, dependencies: [b, c] }
  b: { displayName: B, type: script, url: b.js, dependencies: [d] }
  c: { displayName: C, type: script, url: c.js, dependencies: [d] }
  d: { displayName: D, type: script, url: d.js }
"#,
    );
    let source = Arc::new(
        MockSource::new(&log)
            .with("a.js", RECORDED)
            .with("b.js", RECORDED)
            .with("c.js", RECORDED)
            .failing("d.js"),
    );
    let notifier = Arc::new(RecordingNotifier::default());

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["a"]))
        .source(source.clone())
        .notifier(notifier.clone())
        .factory_fn("record", recording_factory(&log))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(source.hits("d.js"), 1);
    assert_eq!(
        notifier.error_messages(),
        vec!["Could not download component D"]
    );
    assert_eq!(report.download_failures.len(), 1);
    assert_eq!(report.download_failures[0].key, "d");
    assert_eq!(loader.store().keys(), vec!["a", "b", "c"]);

    // The next pass tries again
    loader.fetch().await;
    assert_eq!(source.hits("d.js"), 2);
}

#[tokio::test]
async fn test_dependency_cycle_is_reported_not_followed() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  a: { displayName: A, type: script, url: a.js, dependencies: [b] }
  b: { displayName: B, type: script, url: b.js, dependencies: [a] }
"#,
    );
    let source = MockSource::new(&log)
        .with("a.js", RECORDED)
        .with("b.js", RECORDED);

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["a"]))
        .source(Arc::new(source))
        .factory_fn("record", recording_factory(&log))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(report.cycles, vec![vec!["a", "b", "a"]]);
    assert_eq!(report.executed, vec!["b", "a"]);
}

#[tokio::test]
async fn test_failed_dependency_download_does_not_stop_dependent() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  app: { displayName: App, type: script, url: app.js, dependencies: [broken] }
  broken: { displayName: Broken, type: script, url: broken.js }
"#,
    );
    let source = MockSource::new(&log)
        .with("app.js", RECORDED)
        .failing("broken.js");
    let notifier = Arc::new(RecordingNotifier::default());

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["app"]))
        .source(Arc::new(source))
        .notifier(notifier.clone())
        .factory_fn("record", recording_factory(&log))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(
        notifier.error_messages(),
        vec!["Could not download component Broken"]
    );
    assert_eq!(notifier.errors.lock()[0].1, "Error");
    assert_eq!(report.download_failures.len(), 1);
    assert_eq!(report.download_failures[0].key, "broken");
    assert!(loader.store().contains("app"));
    assert!(!loader.store().contains("broken"));
    assert_eq!(log.count("exec:broken"), 0);
}

#[tokio::test]
async fn test_throwing_factory_does_not_affect_siblings() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  exploder: { displayName: Exploder, type: script, url: exploder.js }
  panicker: { displayName: Panicker, type: script, url: panicker.js }
  steady: { displayName: Steady, type: script, url: steady.js }
"#,
    );
    let source = MockSource::new(&log)
        .with("exploder.js", "factory: explode\n")
        .with("panicker.js", "factory: panic\n")
        .with("steady.js", RECORDED);
    let notifier = Arc::new(RecordingNotifier::default());

    let mut settings = settings(&["exploder", "panicker", "steady"]);
    settings.verbose_errors = true;

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings)
        .source(Arc::new(source))
        .notifier(notifier.clone())
        .factory_fn("record", recording_factory(&log))
        .factory_fn("explode", |_ctx: &FactoryContext<'_>| Err(anyhow!("kaboom")))
        .factory_fn(
            "panic",
            |_ctx: &FactoryContext<'_>| -> anyhow::Result<Option<ComponentExport>> {
                panic!("factory bug")
            },
        )
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(report.executed, vec!["steady"]);
    assert_eq!(loader.store().keys(), vec!["steady"]);

    let mut failed: Vec<String> = report
        .execution_failures
        .iter()
        .map(|f| f.key.clone())
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["exploder", "panicker"]);

    let messages = notifier.error_messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| {
        m.starts_with("Failed to load component Exploder\n") && m.contains("kaboom")
    }));
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Failed to load component Panicker\n") && m.contains("factory bug")));
}

#[tokio::test]
async fn test_unknown_factory_and_bad_document_fail_in_isolation() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  ghostly: { displayName: Ghostly, type: script, url: ghostly.js }
  garbled: { displayName: Garbled, type: script, url: garbled.js }
  blank: { displayName: Blank, type: script, url: blank.js }
"#,
    );
    let source = MockSource::new(&log)
        .with("ghostly.js", "factory: nobody-registered-this\n")
        .with("garbled.js", "unexpected: field\n")
        .with("blank.js", "   \n");

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["ghostly", "garbled", "blank"]))
        .source(Arc::new(source))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(report.execution_failures.len(), 2);
    assert!(report
        .execution_failures
        .iter()
        .any(|f| f.key == "ghostly" && f.message.contains("unknown factory")));
    // A blank document yields no component and no failure
    assert!(loader.store().is_empty());
}

#[tokio::test]
async fn test_slow_download_times_out() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  slow: { displayName: Slow, type: script, url: slow.js }
  quick: { displayName: Quick, type: script, url: quick.js }
"#,
    );
    let source = MockSource::new(&log)
        .with("slow.js", RECORDED)
        .with("quick.js", RECORDED)
        .delayed("slow.js", Duration::from_secs(10));

    let mut settings = settings(&["slow", "quick"]);
    settings.download_timeout_seconds = 1;

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings)
        .source(Arc::new(source))
        .factory_fn("record", recording_factory(&log))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(report.executed, vec!["quick"]);
    assert_eq!(report.download_failures.len(), 1);
    assert!(report.download_failures[0].message.contains("timed out"));
}

#[tokio::test]
async fn test_unregistered_feature_is_skipped() {
    init_test_logging();
    let log = EventLog::default();

    let loader = Loader::builder(catalog("resources: {}"), "1.0")
        .settings(settings(&["ghost"]))
        .source(Arc::new(MockSource::new(&log)))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(report.skipped_imports, vec!["ghost"]);
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_bootstrap_completes_before_features() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  toast: { displayName: Toast, type: script, url: toast.js }
  a: { displayName: A, type: script, url: a.js }
  b: { displayName: B, type: script, url: b.js, dependencies: [missingDep] }
"#,
    );
    let source = MockSource::new(&log)
        .with("toast.js", "factory: toast\n")
        .with("a.js", "factory: explode\n")
        .with("b.js", RECORDED)
        .delayed("toast.js", Duration::from_millis(30));

    let toast_notifier = Arc::new(RecordingNotifier::default());
    let fallback_notifier = Arc::new(RecordingNotifier::default());
    let provided = toast_notifier.clone();
    let toast_log = log.clone();

    let mut settings = settings(&["toast", "a", "b"]);
    settings.use_cache = true;

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings)
        .source(Arc::new(source))
        .notifier(fallback_notifier.clone())
        .factory_fn("record", recording_factory(&log))
        .factory_fn("explode", |_ctx: &FactoryContext<'_>| Err(anyhow!("kaboom")))
        .factory_fn("toast", move |_ctx: &FactoryContext<'_>| {
            toast_log.push("exec:toast");
            Ok(Some(ComponentExport::new().with_notifier(provided.clone())))
        })
        .build()
        .unwrap();

    let report = loader.fetch().await;

    log.assert_before("exec:toast", "download:a.js");
    log.assert_before("exec:toast", "download:b.js");

    // Feature failures go through the bootstrapped channel
    assert_eq!(
        toast_notifier.error_messages(),
        vec!["Failed to load component A"]
    );
    assert!(fallback_notifier.error_messages().is_empty());

    // Empty cache with caching on shows and dismisses the loading notice
    assert_eq!(*toast_notifier.infos.lock(), vec!["Initializing components..."]);
    assert_eq!(toast_notifier.dismiss_count(), 1);

    assert_eq!(report.skipped_imports, vec!["missingDep"]);
    assert!(loader.store().contains("b"));
}

#[tokio::test]
async fn test_failed_bootstrap_falls_back_to_log_channel() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  toast: { displayName: Toast, type: script, url: toast.js }
  a: { displayName: A, type: script, url: a.js }
"#,
    );
    let source = MockSource::new(&log)
        .failing("toast.js")
        .with("a.js", RECORDED);
    let fallback = Arc::new(RecordingNotifier::default());

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["toast", "a"]))
        .source(Arc::new(source))
        .notifier(fallback.clone())
        .factory_fn("record", recording_factory(&log))
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(
        fallback.error_messages(),
        vec!["Could not download component Toast"]
    );
    assert_eq!(report.executed, vec!["a"]);
}

#[tokio::test]
async fn test_end_to_end_single_component() {
    init_test_logging();
    let log = EventLog::default();

    let manifest = catalog(
        r#"
resources:
  x: { displayName: X, type: script, url: x.js }
"#,
    );
    let source = MockSource::new(&log).with("x.js", "exports:\n  ready: true\n");
    let cache_store = Arc::new(MemoryCacheStore::new());

    let loader = Loader::builder(manifest, "1.0")
        .settings(settings(&["x"]))
        .source(Arc::new(source))
        .cache_store(cache_store.clone())
        .build()
        .unwrap();

    let report = loader.fetch().await;

    assert_eq!(cache_store.snapshot(), CacheRecord::with_version("1.0"));
    assert_eq!(loader.cache_snapshot(), CacheRecord::with_version("1.0"));
    let export = loader.store().get("x").unwrap();
    assert_eq!(export.get("ready"), Some(&serde_json::Value::Bool(true)));
    assert!(loader.skipped_imports().is_empty());
    assert_eq!(report.cache, "empty");
    assert!(!report.cache_valid);
    assert!(report.is_clean());
}
