//! Tests for the config language interpreter

use nvram_core::config::{ConfigError, InterpreterOptions, LogLevel, NvramConfig, ParseErrorKind};
use nvram_core::hardware::{HardwareDescriptor, HardwareType};
use nvram_core::map::{BitPosition, ChecksumAlgorithm, FieldKind};
use pretty_assertions::assert_eq;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

fn interpret(text: &str) -> Result<NvramConfig, ConfigError> {
    NvramConfig::from_str(
        "test.conf",
        text,
        &HardwareDescriptor::default(),
        &InterpreterOptions::default(),
    )
}

fn interpret_verbose(text: &str, verbosity: LogLevel) -> Result<NvramConfig, ConfigError> {
    let options = InterpreterOptions {
        verbosity,
        ..Default::default()
    };
    NvramConfig::from_str("test.conf", text, &HardwareDescriptor::default(), &options)
}

fn field_names(config: &NvramConfig) -> Vec<&str> {
    config.fields.iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn test_empty_config() {
    let config = interpret("").unwrap();
    assert_eq!(config.hardware, HardwareType::Standard);
    assert!(config.fields.is_empty());

    let config = interpret("# only a comment\n\n   \n").unwrap();
    assert!(config.fields.is_empty());
}

#[test]
fn test_full_config() {
    let config = interpret(
        r#"
# Example board
hardware intel
checksum  sum      standard 0x2e 0x2f 0x10 30
bytearray boot     0x40 2
string    owner    0x50 16
bitfield  bootmode 1 0x3d:4 floppy disk
"#,
    )
    .unwrap();

    assert_eq!(config.hardware, HardwareType::Intel);
    assert_eq!(field_names(&config), vec!["sum", "boot", "owner", "bootmode"]);

    let FieldKind::Checksum(checksum) = &config.fields.get("sum").unwrap().kind else {
        panic!("Expected checksum field");
    };
    assert_eq!(checksum.algorithm, ChecksumAlgorithm::Standard);
    assert_eq!(checksum.positions, vec![0x2e, 0x2f]);
    assert_eq!(checksum.region.position, 0x10);
    assert_eq!(checksum.region.length, 30);

    let FieldKind::BitField(bitfield) = &config.fields.get("bootmode").unwrap().kind else {
        panic!("Expected bitfield");
    };
    assert_eq!(bitfield.positions, vec![BitPosition { byte: 0x3d, bit: 4 }]);
    assert_eq!(bitfield.labels, vec!["floppy", "disk"]);
}

#[test]
fn test_abbreviated_keywords() {
    let config = interpret("h via823\nch s n 0x3f 0x40 8 4\nbi m 1 0x41:0 a b\n").unwrap();
    assert_eq!(config.hardware, HardwareType::Via823x);

    let FieldKind::Checksum(checksum) = &config.fields.get("s").unwrap().kind else {
        panic!("Expected checksum field");
    };
    // `c` alone would be `continue`; `n` resolves to the first matching algorithm.
    assert_eq!(checksum.algorithm, ChecksumAlgorithm::NegativeSum);
    assert!(matches!(
        config.fields.get("m").unwrap().kind,
        FieldKind::BitField(_)
    ));
}

#[test]
fn test_hardware_detect_keyword() {
    let config = interpret("hardware detect\n").unwrap();
    assert_eq!(config.hardware, HardwareType::Detect);

    let err = interpret("hardware amd\n").unwrap_err();
    assert_eq!(
        err.kind(),
        Some(&ParseErrorKind::UnknownHardware("amd".to_string()))
    );
}

#[test]
fn test_last_hardware_directive_wins() {
    let config = interpret("hardware intel\nhardware ds1685\n").unwrap();
    assert_eq!(config.hardware, HardwareType::Ds1685);
}

#[test]
fn test_or_and_chains() {
    let config = interpret(
        r#"
{
    break
}
or {
    bytearray first 0x10 1
}
and bytearray second 0x11 1
or bytearray third 0x12 1
"#,
    )
    .unwrap();
    assert_eq!(field_names(&config), vec!["first", "second"]);
}

#[test]
fn test_continue_marks_block_succeeded() {
    let config = interpret(
        r#"
{
    continue
    bytearray skipped 0x10 1
}
and bytearray taken 0x11 1
"#,
    )
    .unwrap();
    assert_eq!(field_names(&config), vec!["taken"]);
}

#[test]
fn test_nested_blocks() {
    // Break leaves only the innermost block.
    let config = interpret(
        r#"
{
    {
        break
        bytearray a 1 1
    }
    bytearray b 2 1
    {
        bytearray c 3 1
    }
}
"#,
    )
    .unwrap();
    assert_eq!(field_names(&config), vec!["b", "c"]);
}

#[test]
fn test_guarded_block_skipped_entirely() {
    let config = interpret(
        r#"
hardware intel
or {
    hardware via82cxx
    bytearray x 1 1
}
"#,
    )
    .unwrap();
    assert_eq!(config.hardware, HardwareType::Intel);
    assert!(config.fields.is_empty());
}

#[test]
fn test_skipped_directive_is_still_validated() {
    let err = interpret("hardware intel\nor bytearray x 0x300 1\n").unwrap_err();
    assert!(matches!(
        err.kind(),
        Some(ParseErrorKind::OutOfRange { .. })
    ));
}

#[test]
fn test_log_levels() {
    // Sent when the verbosity allows it; the status tells which happened.
    let text = "log info probing\nand bytearray sent 1 1\nor bytearray held 2 1\n";

    let config = interpret_verbose(text, LogLevel::Debug).unwrap();
    assert_eq!(field_names(&config), vec!["sent"]);

    let config = interpret_verbose(text, LogLevel::Info).unwrap();
    assert_eq!(field_names(&config), vec!["sent"]);

    let config = interpret_verbose(text, LogLevel::Error).unwrap();
    assert_eq!(field_names(&config), vec!["held"]);
}

#[test]
fn test_log_needs_level() {
    let err = interpret("log\n").unwrap_err();
    assert_eq!(err.kind(), Some(&ParseErrorKind::IncompleteStatement));

    let err = interpret("log shout hello\n").unwrap_err();
    assert_eq!(
        err.kind(),
        Some(&ParseErrorKind::UnknownLogLevel("shout".to_string()))
    );
}

#[test]
fn test_fail_reports_location() {
    let err = interpret("hardware intel\n\nfail\n").unwrap_err();
    assert_eq!(err.kind(), Some(&ParseErrorKind::Failed));
    assert_eq!(err.line(), Some(3));
    assert!(err.to_string().contains("test.conf"));
}

#[test]
fn test_guarded_fail() {
    let config = interpret("hardware intel\nor fail\n").unwrap();
    assert_eq!(config.hardware, HardwareType::Intel);

    let err = interpret("hardware intel\nand fail\n").unwrap_err();
    assert_eq!(err.kind(), Some(&ParseErrorKind::Failed));
}

#[test]
fn test_unbalanced_braces() {
    let err = interpret("{\nbytearray a 1 1\n").unwrap_err();
    assert_eq!(err.kind(), Some(&ParseErrorKind::UnclosedBlock));

    let err = interpret("bytearray a 1 1\n}\n").unwrap_err();
    assert_eq!(err.kind(), Some(&ParseErrorKind::UnbalancedClose));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_unknown_keyword() {
    let err = interpret("hardware intel\nfrob x\n").unwrap_err();
    assert_eq!(
        err.kind(),
        Some(&ParseErrorKind::UnknownKeyword("frob".to_string()))
    );
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_extra_tokens_are_not_fatal() {
    let config = interpret("hardware intel please\nbytearray a 1 1 2 3\n").unwrap();
    assert_eq!(config.hardware, HardwareType::Intel);
    assert!(config.fields.contains("a"));
}

#[test]
fn test_field_validation() {
    let cases: &[(&str, ParseErrorKind)] = &[
        ("bytearray a 0x100 1\n", ParseErrorKind::OutOfRange { position: 0x100, length: 1 }),
        ("string a 0xf0 0x20\n", ParseErrorKind::OutOfRange { position: 0xf0, length: 0x20 }),
        ("bytearray a 1\n", ParseErrorKind::IncompleteStatement),
        ("bytearray a one 1\n", ParseErrorKind::InvalidInteger("one".to_string())),
        ("bitfield a 0 a\n", ParseErrorKind::BitCount { got: 0, max: 5 }),
        ("bitfield a 6\n", ParseErrorKind::BitCount { got: 6, max: 5 }),
        ("bitfield a 1 0x10:9 x y\n", ParseErrorKind::BitNumber(9)),
        ("bitfield a 1 0x10:-1 x y\n", ParseErrorKind::BitNumber(-1)),
        ("bitfield a 2 0x10:0 0x10:1 w x y\n", ParseErrorKind::IncompleteStatement),
        ("checksum a crc 0x10 0x10 4\n", ParseErrorKind::UnknownChecksumAlgorithm("crc".to_string())),
        ("checksum a short 0x10 4\n", ParseErrorKind::IncompleteStatement),
    ];

    for (text, expected) in cases {
        let err = interpret(text).unwrap_err();
        assert_eq!(err.kind(), Some(expected), "config: {text:?}");
    }
}

#[test]
fn test_region_may_end_at_top() {
    let config = interpret("bytearray top 0xf0 16\nbitfield hi 1 0xff:7 low high\n").unwrap();
    assert_eq!(config.fields.len(), 2);
}

#[test]
fn test_five_bit_bitfield() {
    let labels: Vec<String> = (0..32).map(|i| format!("v{i}")).collect();
    let text = format!(
        "bitfield wide 5 0x40:0 0x40:1 0x40:2 0x40:3 0x41:0 {}\n",
        labels.join(" ")
    );
    let config = interpret(&text).unwrap();
    let FieldKind::BitField(bitfield) = &config.fields.get("wide").unwrap().kind else {
        panic!("Expected bitfield");
    };
    assert_eq!(bitfield.bits(), 5);
    assert_eq!(bitfield.labels.len(), 32);
}

/// Collects formatted log output
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_log_directive_output() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        interpret_verbose(
            "log info board found\nlog debug not for you\nhardware intel extra\n",
            LogLevel::Info,
        )
        .unwrap();
    });

    let text = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("board found"), "{text}");
    assert!(!text.contains("not for you"), "{text}");
    assert!(text.contains("additional parameter extra"), "{text}");
}
