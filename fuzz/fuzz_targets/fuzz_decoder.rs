//! Fuzz testing for the record decoder.
//!
//! Feeds arbitrary rows and schemas into the RecordDecoder and then reads
//! every column through the RecordView getters. Malformed rows must fail
//! with an error, never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use esedb::config::FormatOptions;
use esedb::records::{MultiValue, RecordDecoder, RecordSchema, RecordView, SchemaEntry};

#[derive(Debug, Arbitrary)]
struct DecoderInput {
    columns: Vec<FuzzColumn>,
    template_columns: u8,
    extended_page_header: bool,
    legacy_tagged_layout: bool,
    row: Vec<u8>,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
struct FuzzColumn {
    identifier: u16,
    column_type: u8,
    size: u8,
    codepage: FuzzCodepage,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzCodepage {
    Default,
    Windows1252,
    Unicode,
    Utf8,
    Ascii,
    Latin1,
    Other(u16),
}

impl FuzzCodepage {
    fn code(self) -> u32 {
        match self {
            FuzzCodepage::Default => 0,
            FuzzCodepage::Windows1252 => 1252,
            FuzzCodepage::Unicode => 1200,
            FuzzCodepage::Utf8 => 65001,
            FuzzCodepage::Ascii => 20127,
            FuzzCodepage::Latin1 => 28591,
            FuzzCodepage::Other(code) => code as u32,
        }
    }
}

fuzz_target!(|input: DecoderInput| {
    if input.columns.is_empty() || input.columns.len() > 64 {
        return;
    }

    let mut entries: Vec<SchemaEntry> = input
        .columns
        .iter()
        .map(|c| {
            let mut entry = SchemaEntry::new(
                c.identifier as u32,
                esedb::records::SchemaEntryKind::Column {
                    column_type: (c.column_type % 20) as u32,
                    codepage: c.codepage.code(),
                },
                format!("c{}", c.identifier),
            );
            entry.size = c.size as u32;
            entry
        })
        .collect();
    entries.sort_by_key(|e| e.identifier);

    let split = (input.template_columns as usize).min(entries.len());
    let own = entries.split_off(split);
    let schema = RecordSchema::with_template(entries, own);

    let format = FormatOptions::default()
        .with_extended_page_header(input.extended_page_header)
        .with_legacy_tagged_layout(input.legacy_tagged_layout);
    let decoder = RecordDecoder::with_format(format);

    let Ok(record) = decoder.decode(&input.row, &schema) else {
        return;
    };

    for index in 0..schema.len() {
        if let Some(value) = record.value(index) {
            if let Some(flags) = value.flags() {
                let _ = MultiValue::parse(value.data(), flags);
            }
        }
    }

    let view = RecordView::new(record, &schema);
    for index in 0..view.column_count() {
        let _ = view.get_value(index);
        let _ = view.get_text_opt(index);
        let _ = view.get_binary_opt(index);
    }
});
