//! Integration tests for output interception and display-sink forwarding.

mod common;

use std::io::Write;
use std::sync::Arc;

use common::TestHost;
use scripthost::scripting::dom::StandardBindings;
use scripthost::scripting::output::{CapturedOutputRecord, MemorySink, SharedBuffer, Stream};
use scripthost::scripting::{ColorTag, DisplaySink, OutputMultiplexer, ScriptLocator};

fn mux() -> (Arc<OutputMultiplexer>, Arc<MemorySink>, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let mux = Arc::new(OutputMultiplexer::with_destinations(
        Box::new(out.clone()),
        Box::new(err.clone()),
    ));
    let sink = Arc::new(MemorySink::new());
    mux.set_sink(Some(sink.clone() as Arc<dyn DisplaySink>));
    (mux, sink, out, err)
}

#[test]
fn test_begin_write_end_restores_originals() {
    let (mux, sink, out, _err) = mux();

    assert!(mux.begin());
    mux.print(Stream::Out, "captured\n").unwrap();
    mux.end();
    mux.print(Stream::Out, "after\n").unwrap();

    assert_eq!(sink.text(), "captured\n");
    assert_eq!(out.contents(), "after\n");
    assert!(!mux.is_intercepting());
}

#[test]
fn test_flush_boundary_forwards_one_record() {
    let (mux, sink, _out, _err) = mux();
    let mut stdout = mux.stdout();

    mux.begin();
    write!(stdout, "a").unwrap();
    write!(stdout, "b").unwrap();
    assert!(sink.records().is_empty());
    stdout.flush().unwrap();
    mux.end();

    assert_eq!(
        sink.records(),
        vec![CapturedOutputRecord {
            text: "ab".to_string(),
            color: ColorTag::Normal,
        }]
    );
}

#[test]
fn test_error_stream_uses_error_color() {
    let (mux, sink, _out, _err) = mux();

    mux.begin();
    mux.print(Stream::Err, "oops\n").unwrap();
    mux.print(Stream::Out, "fine\n").unwrap();
    mux.end();

    assert_eq!(sink.text_with(ColorTag::Error), "oops\n");
    assert_eq!(sink.text_with(ColorTag::Normal), "fine\n");
}

#[test]
fn test_end_flushes_pending_text() {
    let (mux, sink, _out, _err) = mux();

    mux.begin();
    mux.write(Stream::Out, b"unflushed").unwrap();
    mux.end();

    assert_eq!(sink.text(), "unflushed");
}

#[test]
fn test_unavailable_sink_passes_text_through() {
    let (mux, sink, out, err) = mux();
    sink.set_available(false);

    mux.begin();
    mux.print(Stream::Out, "to stdout\n").unwrap();
    mux.print(Stream::Err, "to stderr\n").unwrap();
    mux.end();

    assert!(sink.records().is_empty());
    assert_eq!(out.contents(), "to stdout\n");
    assert_eq!(err.contents(), "to stderr\n");
}

#[test]
fn test_nested_begin_is_ignored_and_end_is_idempotent() {
    let (mux, sink, out, _err) = mux();

    assert!(mux.begin());
    assert!(!mux.begin());
    mux.end();
    mux.end();
    mux.print(Stream::Out, "plain\n").unwrap();

    assert!(sink.records().is_empty());
    assert_eq!(out.contents(), "plain\n");
}

#[test]
fn test_console_colors_reach_the_sink() {
    let host = TestHost::new();
    host.bindings
        .add_source(Arc::new(StandardBindings::new(host.output.clone())));

    let script = r#"
console.set_text_color(10, 20, 30);
console.log("tinted");
console.set_default_text_color();
console.log("plain");
console.error("broken");
"#;
    let result = host.runner.run(&ScriptLocator::inline(script, "js"), None);

    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(host.sink.text_with(ColorTag::Custom(10, 20, 30)), "tinted\n");
    assert_eq!(host.sink.text_with(ColorTag::Normal), "plain\n");
    assert_eq!(host.sink.text_with(ColorTag::Error), "broken\n");
    assert!(host.sink.is_visible());
}

#[test]
fn test_output_after_run_never_reaches_sink() {
    let host = TestHost::new();

    let result = host
        .runner
        .run(&ScriptLocator::inline("print(\"in run\");", "js"), None);
    assert!(result.is_success());
    host.output.print(Stream::Out, "later\n").unwrap();

    assert_eq!(host.sink.text(), "in run\n");
    assert_eq!(host.stdout.contents(), "later\n");
}
