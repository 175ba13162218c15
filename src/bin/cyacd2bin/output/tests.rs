use std::path::PathBuf;

use cyacd2bin::cyacd::{ChecksumType, Header};
use cyacd2bin::image::ArrayLayout;
use cyacd2bin::operation::ConversionEvent;

use super::human::HumanOutput;
use super::json::JsonOutput;
use super::OutputOptions;

fn header() -> Header {
    Header {
        silicon_id: 0x1E9602AA,
        silicon_revision: 0,
        checksum_type: ChecksumType::TwosComplement,
    }
}

#[test]
fn json_event_has_schema_and_event() {
    let ev = super::json::conversion_event_to_json(ConversionEvent::HeaderDecoded {
        header: header(),
    });
    let v = serde_json::to_value(&ev).unwrap();
    assert_eq!(v.get("schema").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(v.get("event").and_then(|v| v.as_str()), Some("header"));
    assert_eq!(
        v.get("silicon_id").and_then(|v| v.as_u64()),
        Some(0x1E9602AA)
    );
    assert_eq!(
        v.get("checksum_type").and_then(|v| v.as_str()),
        Some("twos_complement")
    );
}

#[test]
fn json_array_start_carries_layout() {
    let ev = super::json::conversion_event_to_json(ConversionEvent::ArrayStart {
        array_id: 1,
        layout: ArrayLayout {
            row_width: 128,
            row_count: 10,
            present_rows: 7,
        },
        present_rows: "0-2, 5, 7-9".to_string(),
    });
    let out = JsonOutput::new(OutputOptions {
        verbose: false,
        quiet: false,
    });
    let v: serde_json::Value = serde_json::from_str(&out.render_event_json(ev)).unwrap();
    assert_eq!(v["event"], "array_start");
    assert_eq!(v["present_rows"], "0-2, 5, 7-9");
    assert_eq!(v["layout"]["row_width"], 128);
    assert_eq!(v["layout"]["row_count"], 10);
}

#[test]
fn human_lines_follow_operator_format() {
    let lines = HumanOutput::conversion_lines(
        &ConversionEvent::HeaderDecoded { header: header() },
        false,
    );
    assert_eq!(lines[0], "Silicon ID: 0x1E9602AA");
    assert_eq!(lines[2], "Protocol checksum type: 2's complement summation");

    let lines = HumanOutput::conversion_lines(
        &ConversionEvent::MemoryAssembled {
            arrays: 2,
            records: 20,
            first: Some(ArrayLayout {
                row_width: 64,
                row_count: 10,
                present_rows: 10,
            }),
        },
        false,
    );
    assert_eq!(
        lines,
        vec!["Found 2 flash arrays, each containing 10 rows with 64 bytes each."]
    );

    let lines = HumanOutput::conversion_lines(
        &ConversionEvent::Done {
            output: PathBuf::from("/tmp/fw.bin"),
            bytes: 640,
        },
        false,
    );
    assert_eq!(lines, vec!["Flash memory written to /tmp/fw.bin"]);
}

#[test]
fn human_crc16_warning_names_the_header() {
    let lines = HumanOutput::conversion_lines(
        &ConversionEvent::ChecksumTypeUnsupported {
            header: Header {
                checksum_type: ChecksumType::Crc16Ccitt,
                ..header()
            },
        },
        false,
    );
    assert_eq!(
        lines,
        vec!["warning: header declares CRC-16-CCITT; rows are verified with 2's complement summation"]
    );
}

#[test]
fn memory_summary_singular() {
    assert_eq!(
        super::format_memory_summary(1, 4, 2),
        "Found 1 flash array, containing 4 rows with 2 bytes each."
    );
}
