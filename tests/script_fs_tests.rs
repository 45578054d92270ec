//! Integration tests for the `fs` binding.

mod common;

use std::fs;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use common::TestHost;
use scripthost::scripting::bindings::BindingDescriptor;
use scripthost::scripting::dom::{FsError, StandardBindings, write_file};
use scripthost::scripting::error::RunError;
use scripthost::scripting::value::DomValue;
use scripthost::scripting::ScriptLocator;
use tempfile::TempDir;

const PAYLOAD: &[u8] = &[0x00, 0x01, 0x02, 0xFF, 0xFE, b'\n', b'z'];

fn host_with_out_dir(dir: &std::path::Path) -> TestHost {
    let host = TestHost::new();
    host.bindings
        .add_source(Arc::new(StandardBindings::new(host.output.clone())));
    host.bindings.register(BindingDescriptor::value(
        "out_dir",
        DomValue::from(dir.to_string_lossy().into_owned()),
    ));
    host
}

#[test]
fn test_base64_write_creates_parents_and_round_trips() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out/sub/file.bin");
    let encoded = STANDARD.encode(PAYLOAD);

    write_file(&path, &encoded, "BASE64").unwrap();

    let written = fs::read(&path).unwrap();
    assert_eq!(written, PAYLOAD);
    assert_eq!(STANDARD.encode(&written), encoded);
}

#[test]
fn test_script_writes_binary_file() {
    let temp = TempDir::new().unwrap();
    let host = host_with_out_dir(temp.path());
    let encoded = STANDARD.encode(PAYLOAD);
    let script = format!(
        "fs.write_file(out_dir + \"/out/sub/file.bin\", \"{encoded}\", \"BASE64\");"
    );

    let result = host.runner.run(&ScriptLocator::inline(script, "js"), None);

    assert!(result.is_success(), "{:?}", result.error());
    let written = fs::read(temp.path().join("out/sub/file.bin")).unwrap();
    assert_eq!(STANDARD.encode(written), encoded);
}

#[test]
fn test_script_writes_text_in_encoding() {
    let temp = TempDir::new().unwrap();
    let host = host_with_out_dir(temp.path());
    let script = r#"
fs.write_file(out_dir + "/utf8.txt", "café");
fs.write_file(out_dir + "/latin1.txt", "café", "ISO-8859-1");
fs.write_file(out_dir + "/be.txt", "hi", "UTF-16BE");
"#;

    let result = host.runner.run(&ScriptLocator::inline(script, "js"), None);

    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(fs::read_to_string(temp.path().join("utf8.txt")).unwrap(), "café");
    assert_eq!(
        fs::read(temp.path().join("latin1.txt")).unwrap(),
        vec![b'c', b'a', b'f', 0xE9]
    );
    assert_eq!(
        fs::read(temp.path().join("be.txt")).unwrap(),
        vec![0x00, b'h', 0x00, b'i']
    );
}

#[test]
fn test_unsupported_encoding_fails_the_script() {
    let temp = TempDir::new().unwrap();
    let host = host_with_out_dir(temp.path());
    let script = r#"fs.write_file(out_dir + "/x.txt", "data", "KOI8-R");"#;

    let result = host.runner.run(&ScriptLocator::inline(script, "js"), None);

    match result.error() {
        Some(RunError::Script(err)) => assert!(err.message.contains("Unsupported encoding")),
        other => panic!("expected a script error, got {other:?}"),
    }
    assert!(!temp.path().join("x.txt").exists());
}

#[test]
fn test_invalid_base64_is_reported() {
    let temp = TempDir::new().unwrap();
    let err = write_file(&temp.path().join("bad.bin"), "@@@", "BASE64").unwrap_err();
    assert!(matches!(err, FsError::InvalidBase64(_)));
}
