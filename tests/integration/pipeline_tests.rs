//! Integration tests for the parsing pipeline
//!
//! These tests feed work items through the dispatcher and record every
//! collector call, checking the end-to-end outputs and the acknowledgment
//! contract.

use ripple_parse::config::{parse_config, Config};
use ripple_parse::processor::{
    work_queue, Collector, DispatchSummary, Dispatcher, DocumentProcessor, ParsedRecord, Status,
    StatusEvent, WorkItem, ERROR_SOURCE_KEY,
};
use ripple_parse::Metadata;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One collector call, in the order it was made
#[derive(Debug, Clone)]
enum Call {
    Parsed(ParsedRecord),
    Status(StatusEvent),
    Ack(u64),
}

#[derive(Default)]
struct CountingCollector {
    calls: Mutex<Vec<Call>>,
}

impl CountingCollector {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn ack_counts(&self) -> HashMap<u64, usize> {
        let mut counts = HashMap::new();
        for call in self.calls() {
            if let Call::Ack(id) = call {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        counts
    }

    fn parsed(&self) -> Vec<ParsedRecord> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Parsed(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    fn statuses(&self, status: Status) -> Vec<StatusEvent> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Status(event) if event.status == status => Some(event),
                _ => None,
            })
            .collect()
    }
}

impl Collector for CountingCollector {
    fn emit_parsed(&self, record: ParsedRecord) {
        self.calls.lock().unwrap().push(Call::Parsed(record));
    }

    fn emit_status(&self, event: StatusEvent) {
        self.calls.lock().unwrap().push(Call::Status(event));
    }

    fn ack(&self, item_id: u64) {
        self.calls.lock().unwrap().push(Call::Ack(item_id));
    }
}

fn work_item(id: u64, url: &str, content: &str, content_type: Option<&str>) -> WorkItem {
    let mut metadata = Metadata::new();
    if let Some(content_type) = content_type {
        metadata.set_value("content-type", content_type);
    }
    WorkItem {
        id,
        url: url.to_string(),
        content: content.as_bytes().to_vec(),
        metadata,
    }
}

/// Runs `items` through a dispatcher built from `config`
async fn run_pipeline(
    config: Config,
    items: Vec<WorkItem>,
) -> (Arc<CountingCollector>, DispatchSummary) {
    let processor = Arc::new(DocumentProcessor::from_config(&config).expect("valid config"));
    let collector = Arc::new(CountingCollector::default());
    let dispatcher = Dispatcher::new(processor, collector.clone(), &config.dispatcher);
    let (sender, receiver) = work_queue(&config.dispatcher);

    let producer = tokio::spawn(async move {
        for item in items {
            sender.send(item).await.expect("dispatcher running");
        }
    });

    let summary = dispatcher.run(receiver).await;
    producer.await.expect("producer finished");
    (collector, summary)
}

#[tokio::test]
async fn test_end_to_end_single_document() {
    let (collector, summary) = run_pipeline(
        Config::default(),
        vec![work_item(
            1,
            "http://a.com/",
            "<html><body><a href='/b#frag'>B</a></body></html>",
            Some("text/html"),
        )],
    )
    .await;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.succeeded, 1);

    let parsed = collector.parsed();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].url, "http://a.com/");

    let discovered = collector.statuses(Status::Discovered);
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].url, "http://a.com/b");
    assert_eq!(discovered[0].metadata.first_value("depth"), Some("1"));

    assert!(collector.statuses(Status::Error).is_empty());
    assert_eq!(collector.ack_counts().get(&1), Some(&1));
}

#[tokio::test]
async fn test_exactly_one_ack_per_item() {
    let items = vec![
        work_item(1, "http://a.com/", "<a href='/x'>x</a>", Some("text/html")),
        work_item(2, "http://a.com/doc.pdf", "%PDF-1.4", Some("application/pdf")),
        work_item(3, "not a url", "<a href='/x'>x</a>", Some("text/html")),
        work_item(4, "http://a.com/none", "", None),
        work_item(5, "http://a.com/bin", "\u{0}\u{1}\u{2}", Some("TEXT/HTML")),
        work_item(6, "http://a.com/img", "GIF89a", Some("image/gif")),
    ];
    let (collector, summary) = run_pipeline(Config::default(), items).await;

    let acks = collector.ack_counts();
    assert_eq!(acks.len(), 6);
    assert!(acks.values().all(|&count| count == 1));

    assert_eq!(summary.processed, 6);
    assert_eq!(summary.failed, 2);

    let errors = collector.statuses(Status::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|event| {
        event.metadata.first_value(ERROR_SOURCE_KEY) == Some("content-type checking")
    }));
}

#[tokio::test]
async fn test_ack_follows_item_events() {
    let html = "<a href='/one'>1</a><a href='/two'>2</a><a href='http://b.com/'>3</a>";
    let items = (0..10)
        .map(|id| work_item(id, &format!("http://a.com/{}", id), html, Some("text/html")))
        .collect();
    let (collector, _) = run_pipeline(Config::default(), items).await;

    let calls = collector.calls();
    for id in 0..10u64 {
        let parent = format!("http://a.com/{}", id);
        let ack_position = calls
            .iter()
            .position(|call| matches!(call, Call::Ack(ack) if *ack == id))
            .expect("item acknowledged");

        let parsed_position = calls
            .iter()
            .position(|call| matches!(call, Call::Parsed(record) if record.url == parent))
            .expect("parent record emitted");
        assert!(parsed_position < ack_position);

        let discoveries_before_ack = calls[..ack_position]
            .iter()
            .filter(|call| match call {
                Call::Status(event) => event.metadata.values("url.path").last() == Some(&parent),
                _ => false,
            })
            .count();
        assert_eq!(discoveries_before_ack, 3);
    }
}

#[tokio::test]
async fn test_duplicate_links_merged() {
    let html = r#"
        <html><body>
            <a href="/home">Home</a>
            <a href="/home#top"></a>
            <a href="HTTP://A.COM/home">   </a>
        </body></html>
    "#;
    let (collector, _) = run_pipeline(
        Config::default(),
        vec![work_item(1, "http://a.com/page", html, Some("text/html"))],
    )
    .await;

    let discovered = collector.statuses(Status::Discovered);
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].url, "http://a.com/home");
    assert_eq!(discovered[0].metadata.values("anchors"), &["Home".to_string()]);
}

#[tokio::test]
async fn test_strict_page_level_nofollow() {
    let html = r#"
        <html><head><meta name="robots" content="nofollow"></head>
        <body><a href="/a">A</a><a href="/b" rel="nofollow">B</a></body></html>
    "#;
    let (collector, summary) = run_pipeline(
        Config::default(),
        vec![work_item(1, "http://a.com/", html, Some("text/html"))],
    )
    .await;

    assert_eq!(summary.succeeded, 1);
    assert!(collector.statuses(Status::Discovered).is_empty());
    assert_eq!(collector.parsed()[0].metadata.first_value("robots.noFollow"), Some("true"));
}

#[tokio::test]
async fn test_configured_pipeline() {
    let config = parse_config(
        r#"
        [normalizer]
        query-elements-to-remove = ["sessionid"]

        [parser]
        robots-no-follow-strict = false

        [metadata]
        transfer = ["batch"]

        [[url-filters]]
        id = "basic-normalizer"

        [[url-filters]]
        id = "host-deny"
        patterns = ["*.ads.com"]

        [[parse-filters]]
        id = "title"
        "#,
    )
    .expect("valid config");

    let html = r#"
        <html><head><title>Front page</title></head><body>
            <a href="/list?sessionid=42&b=2&a=1">List</a>
            <a href="http://cdn.ads.com/banner">Ad</a>
            <a href="/private" rel="nofollow">Private</a>
        </body></html>
    "#;
    let mut item = work_item(1, "http://a.com/", html, Some("text/html; charset=utf-8"));
    item.metadata.set_value("batch", "b-17");

    let (collector, _) = run_pipeline(config, vec![item]).await;

    let parsed = collector.parsed();
    assert_eq!(parsed[0].metadata.first_value("parse.title"), Some("Front page"));

    let discovered = collector.statuses(Status::Discovered);
    let urls: Vec<&str> = discovered.iter().map(|event| event.url.as_str()).collect();
    assert_eq!(urls, vec!["http://a.com/list?a=1&b=2", "http://a.com/private"]);

    assert_eq!(discovered[0].metadata.first_value("batch"), Some("b-17"));
    assert_eq!(discovered[0].metadata.values("anchors"), &["List".to_string()]);
    assert!(!discovered[1].metadata.contains_key("anchors"));
}

#[tokio::test]
async fn test_base_href_and_declared_charset() {
    let mut item = work_item(1, "http://a.com/x/y", "", Some("text/html; charset=windows-1252"));
    item.content = b"<head><base href=\"../docs/\"></head><a href=\"caf\xE9\">\x93Caf\xE9\x94</a>"
        .to_vec();

    let (collector, summary) = run_pipeline(Config::default(), vec![item]).await;

    assert_eq!(summary.succeeded, 1);
    let parsed = collector.parsed();
    assert_eq!(parsed[0].text, "\u{201C}Caf\u{E9}\u{201D}");

    let discovered = collector.statuses(Status::Discovered);
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].url, "http://a.com/docs/caf%C3%A9");
    assert_eq!(
        discovered[0].metadata.values("anchors"),
        &["\u{201C}Caf\u{E9}\u{201D}".to_string()]
    );
}
