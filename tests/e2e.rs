//! End-to-end integration tests for edgequake-html2md.
//!
//! Most tests run offline: title lookups go to a throwaway HTTP server bound
//! to 127.0.0.1 inside the test process. Tests that fetch real web pages are
//! gated behind the `E2E_ENABLED` environment variable so they do not run in
//! CI unless explicitly requested.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Include live network tests:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use chrono::NaiveDate;
use edgequake_html2md::pipeline::footnotes::format_error_log;
use edgequake_html2md::pipeline::titles::{ERROR_RETRIEVING_TITLE, UNKNOWN_RESOURCE};
use edgequake_html2md::{
    convert, convert_str, convert_sync, convert_to_file, ConversionConfig,
    ConversionProgressCallback, FootnoteError, InputFormat, NoopProgressCallback, OutputFormat,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run network tests");
            return;
        }
    }};
}

fn retrieved_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

/// Assert the Markdown passes basic quality checks.
fn assert_markdown_quality(md: &str, context: &str) {
    assert!(!md.trim().is_empty(), "[{context}] Markdown is empty");
    assert!(
        md.ends_with('\n'),
        "[{context}] Markdown must end with a newline"
    );
    assert!(
        !md.ends_with("\n\n"),
        "[{context}] Markdown must end with exactly one newline"
    );
    assert!(
        !md.contains("\n\n\n"),
        "[{context}] Output has more than one consecutive blank line"
    );
    for ch in ['\u{200B}', '\u{FEFF}', '\u{2060}'] {
        assert!(
            !md.contains(ch),
            "[{context}] Output contains invisible char U+{:04X}",
            ch as u32
        );
    }
    assert!(
        !md.contains("<svg") && !md.contains("<img"),
        "[{context}] Output still contains icon or image markup"
    );
    println!("[{context}] ✓  {} bytes, quality checks passed", md.len());
}

// ── Stub HTTP server ─────────────────────────────────────────────────────────

/// Minimal HTTP/1.1 server answering canned responses by path.
///
/// `/flaky` fails with 503 on its first request and succeeds afterwards;
/// `hits` counts every request the server received.
struct StubServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let flaky_hits = Arc::new(AtomicUsize::new(0));

        let server_hits = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let hits = server_hits.clone();
                let flaky_hits = flaky_hits.clone();
                tokio::spawn(async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let _ = handle(stream, flaky_hits).await;
                });
            }
        });

        Self { addr, hits }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn handle(mut stream: TcpStream, flaky_hits: Arc<AtomicUsize>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    let request = String::from_utf8_lossy(&request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let (status, content_type, body): (&str, &str, Vec<u8>) = match path.as_str() {
        "/page" => (
            "200 OK",
            "text/html; charset=utf-8",
            b"<html><head><title>\n  Stub   Page\n</title></head><body>hi</body></html>".to_vec(),
        ),
        "/report.pdf" => (
            "200 OK",
            "application/pdf",
            b"%PDF-1.4\n1 0 obj\n<< /Title (Quarterly \\(Q1\\) Report) >>\nendobj\n".to_vec(),
        ),
        "/untitled" => (
            "200 OK",
            "text/html",
            b"<html><body>no title here</body></html>".to_vec(),
        ),
        "/logo.png" => ("200 OK", "image/png", vec![0x89, b'P', b'N', b'G']),
        "/challenge" => (
            "200 OK",
            "text/html",
            b"<html><head><title>Just a moment... | Cloudflare</title></head></html>".to_vec(),
        ),
        "/flaky" => {
            if flaky_hits.fetch_add(1, Ordering::SeqCst) == 0 {
                ("503 Service Unavailable", "text/plain", b"busy".to_vec())
            } else {
                (
                    "200 OK",
                    "text/html",
                    b"<title>Recovered</title>".to_vec(),
                )
            }
        }
        _ => (
            "404 Not Found",
            "text/html",
            b"<html><head><title>Page Not Found</title></head></html>".to_vec(),
        ),
    };

    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}

fn titles_config() -> ConversionConfig {
    ConversionConfig::builder()
        .resolve_titles(true)
        .concurrency(4)
        .fetch_timeout_secs(5)
        .max_retries(1)
        .retry_backoff_ms(10)
        .retrieved_on(retrieved_on())
        .build()
        .unwrap()
}

// ── Offline conversion ───────────────────────────────────────────────────────

const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Field Notes</title><link rel="icon" href="/favicon.ico"></head>
<body>
  <div class="nav"><svg viewBox="0 0 10 10"><path d="M0 0h10"/></svg></div>
  <h1 id="top" class="text-center">Field Notes<a href="https://example.org/#top">#</a></h1>
  <div>
    <p>Sources: <a href="https://a.example/one">one</a><a href="https://b.example/two">two</a>.</p>
    <p><img src="chart.png" alt="A chart"> The chart above is gone.</p>
    <ul>
      <li>First <a href="https://a.example/one">again</a></li>
      <li>Second</li>
    </ul>
  </div>
  <div><span></span></div>
</body>
</html>"#;

#[tokio::test]
async fn test_convert_article_offline() {
    let out = convert_str(ARTICLE, &ConversionConfig::default())
        .await
        .expect("conversion should succeed");

    let md = &out.content;
    assert_markdown_quality(md, "article");
    assert!(md.starts_with("# Field Notes[^1]\n"), "got: {md:?}");
    assert!(md.contains("Sources: [^2]<sup>,</sup>[^3]."), "got: {md:?}");
    assert!(md.contains("The chart above is gone."));
    assert!(md.contains("First [^2]"));
    assert!(md.contains("[^1]: https://example.org/#top"));
    assert!(md.ends_with("[^3]: https://b.example/two\n"), "got: {md:?}");

    assert_eq!(out.footnotes.len(), 3);
    assert_eq!(out.metadata.title.as_deref(), Some("Field Notes"));
    assert_eq!(out.stats.images_removed, 1);
    assert_eq!(out.stats.svgs_removed, 1);
    assert_eq!(out.stats.commas_inserted, 1);
    assert!(out.titles.is_empty(), "no lookups unless requested");
}

#[tokio::test]
async fn test_same_url_shares_number() {
    let html = r#"<p><a href="https://x.example">a</a>, <a href="https://y.example">b</a>,
        <a href="https://x.example">c</a></p>"#;
    let out = convert_str(html, &ConversionConfig::default()).await.unwrap();
    assert_eq!(
        out.content,
        "[^1], [^2], [^1]\n\n[^1]: https://x.example\n\n[^2]: https://y.example\n"
    );
}

#[tokio::test]
async fn test_no_commas_leaves_markers_touching() {
    let html = r#"<p>x<a href="https://a.example">a</a><a href="https://b.example">b</a></p>"#;
    let config = ConversionConfig::builder()
        .separate_adjacent_footnotes(false)
        .build()
        .unwrap();
    let out = convert_str(html, &config).await.unwrap();
    assert!(out.content.starts_with("x[^1][^2]\n"), "got: {:?}", out.content);
    assert_eq!(out.stats.commas_inserted, 0);
}

#[tokio::test]
async fn test_front_matter() {
    let html = r#"<html><head><title>Say "hi"</title></head><body><p>x</p></body></html>"#;
    let config = ConversionConfig::builder()
        .include_metadata(true)
        .build()
        .unwrap();
    let out = convert_str(html, &config).await.unwrap();
    assert!(
        out.content.starts_with("---\ntitle: \"Say \\\"hi\\\"\"\n---\n"),
        "got: {:?}",
        out.content
    );
}

#[tokio::test]
async fn test_json_output_is_a_fixed_point() {
    let to_json = ConversionConfig::builder()
        .output_format(OutputFormat::Json)
        .build()
        .unwrap();
    let json = convert_str(ARTICLE, &to_json).await.unwrap().content;
    assert!(json.contains("\"pandoc-api-version\""));
    assert!(json.contains("\"Note\""), "links become Note nodes");
    assert!(!json.contains("\"Link\""));
    assert!(!json.contains("\"Image\""));

    // Notes are not links, so running the transformation again changes nothing.
    let json_to_json = ConversionConfig::builder()
        .input_format(InputFormat::Json)
        .output_format(OutputFormat::Json)
        .build()
        .unwrap();
    let again = convert_str(&json, &json_to_json).await.unwrap();
    assert_eq!(again.content, json);
    assert_eq!(again.stats.links_converted, 0);
    assert_eq!(again.metadata.title.as_deref(), Some("Field Notes"));
}

#[tokio::test]
async fn test_malformed_json_is_fatal() {
    let config = ConversionConfig::builder()
        .input_format(InputFormat::Json)
        .build()
        .unwrap();
    let err = convert_str("{not json", &config).await.unwrap_err();
    assert!(err.to_string().to_lowercase().contains("json"), "got: {err}");
}

#[tokio::test]
async fn test_convert_to_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("article.html");
    let output = dir.path().join("out/article.md");
    std::fs::write(&input, ARTICLE).unwrap();

    let result = convert_to_file(
        input.to_str().unwrap(),
        &output,
        &ConversionConfig::default(),
    )
    .await
    .expect("convert_to_file should succeed");

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, result.content);
    assert_eq!(result.metadata.source, input.to_str().unwrap());
}

#[test]
fn test_convert_sync_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.html");
    std::fs::write(&input, r#"<p><a href="https://z.example">z</a></p>"#).unwrap();

    let out = convert_sync(input.to_str().unwrap(), &ConversionConfig::default()).unwrap();
    assert_eq!(out.content, "[^1]\n\n[^1]: https://z.example\n");
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let err = convert("/nonexistent/dir/page.html", &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("/nonexistent/dir/page.html"), "got: {err}");
}

#[tokio::test]
async fn test_pdf_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.html");
    std::fs::write(&input, b"%PDF-1.7\n%\xE2\xE3\xCF\xD3").unwrap();
    let result = convert(input.to_str().unwrap(), &ConversionConfig::default()).await;
    assert!(result.is_err());
}

// ── Title resolution against the stub server ─────────────────────────────────

#[tokio::test]
async fn test_titles_written_into_definitions() {
    let server = StubServer::start().await;
    let html = format!(
        r#"<p>Read <a href="{}">the page</a> and <a href="{}">the report</a>.</p>"#,
        server.url("/page"),
        server.url("/report.pdf"),
    );

    let out = convert_str(&html, &titles_config()).await.unwrap();
    let md = &out.content;
    assert_markdown_quality(md, "titles");
    assert!(md.starts_with("Read [^1] and [^2].\n"), "got: {md:?}");
    assert!(
        md.contains(&format!(
            "[^1]: [Stub Page]({}) retrieved on 2024-05-01",
            server.url("/page")
        )),
        "got: {md:?}"
    );
    assert!(
        md.contains(&format!(
            "[^2]: [Quarterly (Q1) Report]({}) retrieved on 2024-05-01",
            server.url("/report.pdf")
        )),
        "got: {md:?}"
    );
    assert_eq!(out.stats.titles_resolved, 2);
    assert_eq!(out.stats.titles_failed, 0);
}

#[tokio::test]
async fn test_failed_lookups_get_placeholders() {
    let server = StubServer::start().await;
    let paths = ["/logo.png", "/missing", "/challenge", "/untitled"];
    let html: String = paths
        .iter()
        .map(|p| format!(r#"<p><a href="{}">x</a></p>"#, server.url(p)))
        .collect();

    let out = convert_str(&html, &titles_config()).await.unwrap();

    let numbers: Vec<u32> = out.titles.iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4], "results are in footnote order");

    let png = &out.titles[0];
    assert_eq!(png.title, UNKNOWN_RESOURCE);
    assert!(matches!(
        png.error,
        Some(FootnoteError::UnknownContentType { .. })
    ));

    let missing = &out.titles[1];
    assert_eq!(missing.title, ERROR_RETRIEVING_TITLE);
    assert!(matches!(
        missing.error,
        Some(FootnoteError::HttpStatus { status: 404, .. })
    ));
    assert_eq!(missing.retries, 0, "404 is not retried");
    assert!(
        !out.content.contains("Page Not Found"),
        "an error page's own title is never used"
    );

    let bot = &out.titles[2];
    assert_eq!(bot.title, ERROR_RETRIEVING_TITLE);
    assert!(matches!(bot.error, Some(FootnoteError::BotProtection { .. })));

    let untitled = &out.titles[3];
    assert!(untitled.is_ok());
    assert_eq!(untitled.title, "Untitled Webpage");

    assert_eq!(out.stats.titles_resolved, 1);
    assert_eq!(out.stats.titles_failed, 3);
    assert!(out.content.contains(&format!(
        "[^1]: [Unknown Resource]({}) retrieved on 2024-05-01",
        server.url("/logo.png")
    )));

    let log = format_error_log(&out.titles);
    assert_eq!(log.lines().count(), 6, "two lines per failure: {log}");
    assert!(log.contains(&format!(
        "Original footnote: [^2]: {}",
        server.url("/missing")
    )));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = StubServer::start().await;
    let html = format!(r#"<p><a href="{}">x</a></p>"#, server.url("/flaky"));

    let out = convert_str(&html, &titles_config()).await.unwrap();
    let result = &out.titles[0];
    assert!(result.is_ok(), "got: {result:?}");
    assert_eq!(result.title, "Recovered");
    assert_eq!(result.retries, 1);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_unreachable_host_keeps_document() {
    let html = r#"<p><a href="http://127.0.0.1:9/">dead</a></p>"#;
    let config = ConversionConfig::builder()
        .resolve_titles(true)
        .max_retries(0)
        .fetch_timeout_secs(2)
        .retrieved_on(retrieved_on())
        .build()
        .unwrap();

    let out = convert_str(html, &config).await.expect("lookup failures are not fatal");
    assert!(out.content.contains(
        "[^1]: [Error retrieving title](http://127.0.0.1:9/) retrieved on 2024-05-01"
    ));
    assert_eq!(out.stats.titles_failed, 1);
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = StubServer::start().await;
    let url = server.url("/page");
    let html = format!(r#"<p><a href="{url}">a</a> <a href="{url}">b</a> <a href="{url}">c</a></p>"#);

    let out = convert_str(&html, &titles_config()).await.unwrap();
    assert_eq!(out.footnotes.len(), 1);
    assert_eq!(out.titles.len(), 1);
    assert_eq!(server.hits(), 1);
}

// ── Progress callbacks ───────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl ConversionProgressCallback for Recorder {
    fn on_resolution_start(&self, total: usize) {
        self.events.lock().unwrap().push(format!("start:{total}"));
    }

    fn on_footnote_complete(&self, _number: u32, _total: usize, _title: &str) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_footnote_error(&self, _number: u32, _total: usize, _error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_resolution_complete(&self, total: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done:{success_count}/{total}"));
    }
}

#[tokio::test]
async fn test_progress_callback_sees_every_footnote() {
    let server = StubServer::start().await;
    let html = format!(
        r#"<p><a href="{}">a</a> <a href="{}">b</a> <a href="{}">c</a></p>"#,
        server.url("/page"),
        server.url("/report.pdf"),
        server.url("/missing"),
    );

    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .resolve_titles(true)
        .retry_backoff_ms(10)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    convert_str(&html, &config).await.unwrap();

    assert_eq!(recorder.completed.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.failed.load(Ordering::SeqCst), 1);
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start:3".to_string(), "done:2/3".to_string()]
    );
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<Recorder>();
}

// ── Live network tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_url_input() {
    e2e_skip_unless_enabled!();

    let out = convert("https://example.com/", &ConversionConfig::default())
        .await
        .expect("example.com should convert");
    assert_markdown_quality(&out.content, "example.com");
    assert!(out.content.contains("Example Domain"));
    assert!(!out.footnotes.is_empty(), "example.com links to iana.org");
}

#[tokio::test]
async fn test_live_title_lookup() {
    e2e_skip_unless_enabled!();

    let html = r#"<p><a href="https://example.com/">example</a></p>"#;
    let config = ConversionConfig::builder()
        .resolve_titles(true)
        .retrieved_on(retrieved_on())
        .build()
        .unwrap();
    let out = convert_str(html, &config).await.unwrap();
    assert_eq!(out.titles.len(), 1);
    assert_eq!(out.titles[0].title, "Example Domain", "got: {:?}", out.titles[0]);
    println!("{}", out.content);
}
