use std::collections::BTreeMap;

use cyacd2bin::operation::ConversionEvent;

use crate::output::{ConversionSummary, DryRunSummary, Event, OutputOptions, Reporter};

#[derive(serde::Serialize)]
pub struct JsonEvent {
    schema: u32,
    event: &'static str,
    #[serde(flatten)]
    fields: BTreeMap<&'static str, serde_json::Value>,
}

impl JsonEvent {
    pub fn status(event: &'static str) -> Self {
        Self {
            schema: 1,
            event,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_u64(mut self, k: &'static str, v: u64) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_str(mut self, k: &'static str, v: &str) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_value(mut self, k: &'static str, v: serde_json::Value) -> Self {
        self.fields.insert(k, v);
        self
    }
}

pub struct JsonOutput {
    opts: OutputOptions,
}

impl JsonOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self { opts }
    }

    pub(crate) fn render_event_json(&self, ev: JsonEvent) -> String {
        serde_json::to_string(&ev).unwrap_or_else(|_| "{}".to_string())
    }

    fn json_event(&mut self, ev: JsonEvent) {
        println!("{}", self.render_event_json(ev));
    }

    fn error_event(&mut self, code: i32, msg: &str) {
        self.json_event(
            JsonEvent::status("error")
                .with_u64("code", code as u64)
                .with_str("message", msg),
        );

        if self.opts.verbose {
            eprintln!("error: {msg}");
        }
    }
}

impl Reporter for JsonOutput {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Conversion(ev) => {
                // --quiet keeps only the final event
                if self.opts.quiet && !matches!(ev, ConversionEvent::Done { .. }) {
                    return;
                }
                self.json_event(conversion_event_to_json(ev));
            }
            Event::Summary(summary) => self.json_event(summary_to_json(summary)),
            Event::DryRun(summary) => self.json_event(dry_run_to_json(summary)),
            Event::Error { code, message } => self.error_event(code, &message),
        }
    }

    fn finish(&mut self) {}
}

pub fn summary_to_json(summary: ConversionSummary) -> JsonEvent {
    JsonEvent::status("summary")
        .with_str("output", &summary.output)
        .with_u64("arrays", summary.arrays as u64)
        .with_u64("bytes", summary.bytes as u64)
}

pub fn dry_run_to_json(summary: DryRunSummary) -> JsonEvent {
    JsonEvent::status("dry_run")
        .with_str("output", &summary.output)
        .with_u64("arrays", summary.arrays as u64)
        .with_u64("records", summary.records as u64)
        .with_u64("bytes", summary.bytes as u64)
}

pub fn conversion_event_to_json(ev: ConversionEvent) -> JsonEvent {
    match ev {
        ConversionEvent::HeaderDecoded { header } => JsonEvent::status("header")
            .with_u64("silicon_id", header.silicon_id as u64)
            .with_u64("silicon_revision", header.silicon_revision as u64)
            .with_value(
                "checksum_type",
                serde_json::to_value(header.checksum_type)
                    .unwrap_or_else(|_| serde_json::Value::from("unknown")),
            ),
        ConversionEvent::ChecksumTypeUnsupported { header } => {
            JsonEvent::status("checksum_type_unsupported").with_value(
                "checksum_type",
                serde_json::to_value(header.checksum_type)
                    .unwrap_or_else(|_| serde_json::Value::from("unknown")),
            )
        }
        ConversionEvent::DuplicateRow {
            line_no,
            array_id,
            row_id,
        } => JsonEvent::status("duplicate_row")
            .with_u64("line", line_no as u64)
            .with_u64("array_id", array_id as u64)
            .with_u64("row_id", row_id as u64),
        ConversionEvent::MemoryAssembled {
            arrays,
            records,
            first,
        } => {
            let mut ev = JsonEvent::status("memory_assembled")
                .with_u64("arrays", arrays as u64)
                .with_u64("records", records as u64);
            if let Some(layout) = first {
                ev = ev
                    .with_u64("rows", layout.row_count as u64)
                    .with_u64("row_width", layout.row_width as u64);
            }
            ev
        }
        ConversionEvent::ArrayStart {
            array_id,
            layout,
            present_rows,
        } => JsonEvent::status("array_start")
            .with_u64("array_id", array_id as u64)
            .with_value(
                "layout",
                serde_json::to_value(layout)
                    .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new())),
            )
            .with_str("present_rows", &present_rows),
        ConversionEvent::ArrayWritten { array_id, bytes } => JsonEvent::status("array_written")
            .with_u64("array_id", array_id as u64)
            .with_u64("bytes", bytes as u64),
        ConversionEvent::Done { output, bytes } => JsonEvent::status("done")
            .with_str("output", &output.display().to_string())
            .with_u64("bytes", bytes as u64),
    }
}
