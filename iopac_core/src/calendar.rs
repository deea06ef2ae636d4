//! Build the due date calendar and publish it as a file.

mod emit;

use std::{
    io::{BufReader, Cursor, Write},
    path::Path,
};

use chrono::{NaiveDate, NaiveDateTime};
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, IcalEventBuilder, Property},
    ical_param, ical_property,
    parser::ical::component::IcalAlarm,
    IcalParser,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::NamedTempFile;

use self::emit::emit_calendar;
use crate::{
    aggregate::DueDateGroup,
    error::{Error, Result},
};

static PROD_ID: &str = "-//iopac//iopac2calendar";
static CALENDAR_NAME: &str = "IOPAC";
static TIMEZONE: &str = "Europe/Berlin";
static FORMAT: &str = "%Y%m%d";
static STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// All-day events start at 00:00, so this is 09:00 on the day before.
static REMINDER_TRIGGER: &str = "-PT15H";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// The event text of one due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub description: String,
}

impl From<&DueDateGroup> for CalendarEntry {
    fn from(group: &DueDateGroup) -> Self {
        Self {
            date: group.due_date,
            description: group.description(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalendarOptions {
    pub event_name: String,
    pub reminder: bool,
}

impl CalendarOptions {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            reminder: true,
        }
    }
}

/// Build the calendar with one event per entry, in the given order.
pub fn get_calendar(
    entries: &[CalendarEntry],
    options: &CalendarOptions,
    changed: NaiveDateTime,
) -> IcalCalendar {
    let changed = changed.format(STAMP_FORMAT).to_string();
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PROD_ID)
        .build();
    calendar
        .properties
        .push(ical_property!("X-WR-CALNAME", CALENDAR_NAME));
    for entry in entries {
        calendar.events.push(get_event(entry, options, &changed));
    }
    calendar
}

/// Serialize the calendar of the given entries.
pub fn render(entries: &[CalendarEntry], options: &CalendarOptions, changed: NaiveDateTime) -> String {
    emit_calendar(&get_calendar(entries, options, changed))
}

fn get_event(entry: &CalendarEntry, options: &CalendarOptions, changed: &str) -> IcalEvent {
    let mut event = IcalEventBuilder::tzid(TIMEZONE)
        .uid(uid(&options.event_name, &entry.date))
        .changed(changed)
        .one_day(entry.date.format(FORMAT).to_string())
        .set(ical_property!("SUMMARY", options.event_name.as_str()))
        .set(ical_property!("DESCRIPTION", escape_text(&entry.description)))
        .set(ical_property!("CLASS", "PUBLIC"))
        .set(ical_property!("TRANSP", "TRANSPARENT"))
        .build();
    if options.reminder {
        event.alarms.push(get_reminder());
    }
    event
}

fn get_reminder() -> IcalAlarm {
    let mut alarm = IcalAlarm::new();
    alarm.properties.extend([
        ical_property!("ACTION", "DISPLAY"),
        ical_property!("DESCRIPTION", "Reminder"),
        ical_property!("TRIGGER", REMINDER_TRIGGER, ical_param!("RELATED", "START")),
        ical_property!("REPEAT", "1"),
        ical_property!("DURATION", "P1D"),
    ]);
    alarm
}

/// Get a unique id for the event of a specific due date.
///
/// Changing this function is a breaking change!
fn uid(summary: &str, date: &NaiveDate) -> String {
    let summary = WHITESPACE.replace_all(summary, "-");
    format!("iopac_{summary}_{}@iopac2calendar", date.format(FORMAT))
}

/// Escape a TEXT value (RFC 5545, 3.3.11).
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape_text(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => unescaped.push('\n'),
            Some(c) => unescaped.push(c),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

trait GetIcalProperty {
    fn get_ical_property_value(&self, name: &str) -> Option<&String>;
}

impl GetIcalProperty for IcalEvent {
    fn get_ical_property_value(&self, name: &str) -> Option<&String> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| property.value.as_ref())
    }
}

/// Read the entries back from a serialized calendar.
///
/// Events without date or description are ignored.
pub fn read_entries(ics: &str) -> Result<Vec<CalendarEntry>> {
    let parser = IcalParser::new(BufReader::new(Cursor::new(ics)));
    let mut entries = vec![];
    for ical_calendar_result in parser {
        let ical_calendar = ical_calendar_result?;
        for ical_event in ical_calendar.events {
            let date_option = ical_event
                .get_ical_property_value("DTSTART")
                .and_then(|dt_start| NaiveDate::parse_from_str(dt_start.get(0..8)?, FORMAT).ok());
            let description_option = ical_event.get_ical_property_value("DESCRIPTION");
            let (Some(date), Some(description)) = (date_option, description_option) else {
                continue;
            };
            entries.push(CalendarEntry {
                date,
                description: unescape_text(description),
            });
        }
    }
    Ok(entries)
}

/// Replace the file at `path` in one step.
///
/// The contents go to a temporary file next to `path` first, readers see either the old or the
/// new file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|err| Error::write(path, err))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|err| Error::write(path, err))?;
    file.persist(path)
        .map_err(|err| Error::write(path, err.error))?;
    Ok(())
}
