//! Activation history
//!
//! Every fired command leaves a JPEG snapshot and one row in an append-only
//! CSV log. Both names derive from the same second-resolution timestamp.

pub mod recorder;

pub use recorder::HistoryRecorder;

use binsort_core::Command;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::borrow::Cow;

/// Column names, written once when the log is created
pub const HISTORY_HEADER: [&str; 5] = [
    "fecha_hora",
    "archivo_imagen",
    "objetos_detectados",
    "comando_mqtt",
    "comentario",
];

pub const DEFAULT_COMMENT: &str = "Activación por detección válida";

const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const ROW_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One logged activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub image_file: String,
    pub object_count: usize,
    pub command: Command,
    pub comment: String,
}

impl HistoryRecord {
    pub fn new(
        at: DateTime<Local>,
        object_count: usize,
        command: Command,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: at.format(ROW_STAMP_FORMAT).to_string(),
            image_file: Self::image_file_name(at),
            object_count,
            command,
            comment: comment.into(),
        }
    }

    /// `<YYYY-MM-DD_HH-MM-SS>_detectado.jpg`
    pub fn image_file_name(at: DateTime<Local>) -> String {
        format!("{}_detectado.jpg", at.format(FILE_STAMP_FORMAT))
    }

    /// CSV row without the line terminator
    pub fn to_row(&self) -> String {
        let count = self.object_count.to_string();
        let fields = [
            self.timestamp.as_str(),
            self.image_file.as_str(),
            count.as_str(),
            self.command.as_str(),
            self.comment.as_str(),
        ];
        join_row(&fields)
    }
}

pub(crate) fn join_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a field when it contains a delimiter, quote or line break
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Split one CSV line into fields, honoring quotes
pub(crate) fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
