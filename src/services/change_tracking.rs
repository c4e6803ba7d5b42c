//! Field-level change detection for the audit trail.
//!
//! Values are compared by what a user would see, so two distinct unit records that
//! both display as "Units" do not count as a change.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fmt;

/// Displayed value of a tracked field.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackedValue {
    Unset,
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
    /// Reference field resolved to its display name
    Reference(String),
}

impl TrackedValue {
    pub fn text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => TrackedValue::Text(v.to_string()),
            _ => TrackedValue::Unset,
        }
    }

    pub fn timestamp(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(TrackedValue::Unset, TrackedValue::Timestamp)
    }

    pub fn reference(display: Option<String>) -> Self {
        display.map_or(TrackedValue::Unset, TrackedValue::Reference)
    }
}

impl fmt::Display for TrackedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackedValue::Unset => f.write_str("not set"),
            TrackedValue::Text(v) | TrackedValue::Reference(v) => f.write_str(v),
            TrackedValue::Number(v) => write!(f, "{}", v),
            TrackedValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub label: &'static str,
    pub old: TrackedValue,
    pub new: TrackedValue,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} changed from '{}' to '{}'",
            self.label, self.old, self.new
        )
    }
}

/// Ordered list of detected changes for one write call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeLog {
    changes: Vec<FieldChange>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change when the displayed values differ. Returns whether it did.
    pub fn record(&mut self, label: &'static str, old: TrackedValue, new: TrackedValue) -> bool {
        if old == new {
            return false;
        }
        self.changes.push(FieldChange { label, old, new });
        true
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// One note entry: `Change Requested: a; b`.
    pub fn summary(&self) -> Option<String> {
        if self.changes.is_empty() {
            return None;
        }
        let joined = self
            .changes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Some(format!("Change Requested: {}", joined))
    }
}

const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One note log entry. Entries typed by users carry no timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub at: Option<DateTime<Utc>>,
    pub text: String,
}

impl NoteEntry {
    fn parse_stamped(line: &str) -> Option<Self> {
        let (stamp, text) = line.strip_prefix('[')?.split_once("] ")?;
        let at = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
        Some(Self {
            at: Some(Utc.from_utc_datetime(&at)),
            text: text.to_string(),
        })
    }
}

impl fmt::Display for NoteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.at {
            Some(at) => write!(f, "[{}] {}", at.format(STAMP_FORMAT), self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Append-only log of note entries, persisted as text with one `[timestamp] text`
/// line per appended entry. Unstamped lines continue the entry before them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteLog {
    entries: Vec<NoteEntry>,
}

impl NoteLog {
    pub fn parse(stored: Option<&str>) -> Self {
        let mut log = Self::default();
        let text = match stored {
            Some(text) if !text.trim().is_empty() => text,
            _ => return log,
        };
        for line in text.split('\n') {
            if let Some(entry) = NoteEntry::parse_stamped(line) {
                log.entries.push(entry);
            } else if let Some(last) = log.entries.last_mut() {
                last.text.push('\n');
                last.text.push_str(line);
            } else {
                log.entries.push(NoteEntry {
                    at: None,
                    text: line.to_string(),
                });
            }
        }
        log
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.text.trim().is_empty())
    }

    pub fn append(&mut self, at: DateTime<Utc>, text: impl Into<String>) {
        self.entries.push(NoteEntry {
            at: Some(at),
            text: text.into(),
        });
    }

    pub fn latest(&self) -> Option<&NoteEntry> {
        self.entries.last()
    }

    pub fn render(&self) -> Option<String> {
        if self.entries.is_empty() {
            None
        } else {
            Some(
                self.entries
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
    }
}

/// Labels shown for tracked request fields.
pub mod request_labels {
    pub const PRODUCT: &str = "Product";
    pub const QUANTITY: &str = "Quantity";
    pub const UOM: &str = "Unit of Measure";
    pub const START_DATE: &str = "Start Date";
    pub const REQUESTED_DATE: &str = "Requested Date";
    pub const EXPECTED_DELIVERY_DATE: &str = "Expected Delivery Date";
    pub const BOM: &str = "Bill of Materials";
    pub const PRODUCT_OWNER: &str = "Product Owner";
    pub const ADMIN: &str = "Production Manager";
    pub const NOTE: &str = "Notes";
}

/// Labels shown for tracked production order fields.
pub mod production_labels {
    pub const PRODUCT: &str = "Product";
    pub const QUANTITY: &str = "Quantity To Produce";
    pub const UOM: &str = "Product Unit of Measure";
    pub const DATE_START: &str = "Start";
    pub const DATE_DEADLINE: &str = "Deadline";
    pub const REQUESTED_DATE: &str = "Requested Date";
    pub const EXPECTED_DELIVERY_DATE: &str = "Expected Delivery Date";
    pub const BOM: &str = "Bill of Material";
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(TrackedValue::Unset, "not set" ; "unset")]
    #[test_case(TrackedValue::Number(12.0), "12" ; "whole number")]
    #[test_case(TrackedValue::Number(0.25), "0.25" ; "fraction")]
    #[test_case(TrackedValue::Text("rush".into()), "rush" ; "text")]
    #[test_case(TrackedValue::Reference("[WID] Widget".into()), "[WID] Widget" ; "reference")]
    fn displays_tracked_values(value: TrackedValue, expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn equal_display_values_are_not_changes() {
        let mut log = ChangeLog::new();
        assert!(!log.record(
            request_labels::UOM,
            TrackedValue::Reference("Units".into()),
            TrackedValue::Reference("Units".into()),
        ));
        assert!(log.is_empty());
        assert_eq!(log.summary(), None);
    }

    #[test]
    fn summary_joins_changes_in_order() {
        let mut log = ChangeLog::new();
        log.record(
            request_labels::QUANTITY,
            TrackedValue::Number(5.0),
            TrackedValue::Number(7.5),
        );
        log.record(
            request_labels::START_DATE,
            TrackedValue::Unset,
            TrackedValue::Timestamp(Utc.with_ymd_and_hms(2024, 11, 20, 8, 30, 0).unwrap()),
        );
        assert_eq!(
            log.summary().as_deref(),
            Some(
                "Change Requested: Quantity changed from '5' to '7.5'; \
                 Start Date changed from 'not set' to '2024-11-20 08:30:00'"
            )
        );
    }

    #[test]
    fn empty_text_is_unset() {
        assert_eq!(TrackedValue::text(Some("")), TrackedValue::Unset);
        assert_eq!(TrackedValue::text(None), TrackedValue::Unset);
    }

    #[test]
    fn note_log_keeps_user_text_and_stamps_appended_entries() {
        let mut notes = NoteLog::parse(Some("first line\nsecond line"));
        let at = Utc.with_ymd_and_hms(2024, 11, 15, 10, 0, 0).unwrap();
        notes.append(at, "Change Requested: Quantity changed from '5' to '6'");
        assert_eq!(
            notes.render().as_deref(),
            Some(
                "first line\nsecond line\n\
                 [2024-11-15 10:00:00] Change Requested: Quantity changed from '5' to '6'"
            )
        );
    }

    #[test]
    fn rendered_log_parses_back_into_entries() {
        let stored = "typed by hand\n[2024-11-15 10:00:00] Need 12\ninstead\n[2024-11-16 09:30:00] Later";
        let notes = NoteLog::parse(Some(stored));
        assert_eq!(notes.entries.len(), 3);
        assert_eq!(notes.entries[0].at, None);
        assert_eq!(notes.entries[1].text, "Need 12\ninstead");
        assert_eq!(
            notes.latest(),
            Some(&NoteEntry {
                at: Some(Utc.with_ymd_and_hms(2024, 11, 16, 9, 30, 0).unwrap()),
                text: "Later".into(),
            })
        );
        assert_eq!(notes.render().as_deref(), Some(stored));
    }

    #[test]
    fn bracketed_text_without_timestamp_is_not_an_entry() {
        let notes = NoteLog::parse(Some("[urgent] ship friday"));
        assert_eq!(notes.latest().map(|e| e.at), Some(None));
    }

    #[test]
    fn blank_note_counts_as_empty() {
        assert!(NoteLog::parse(Some("  \n ")).is_empty());
        assert!(NoteLog::parse(None).is_empty());
        assert_eq!(NoteLog::parse(None).render(), None);
    }
}
