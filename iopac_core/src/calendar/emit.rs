//! Serialize calendars with content lines folded on character boundaries.

use ical::{
    generator::{IcalCalendar, IcalEvent},
    parser::ical::component::IcalAlarm,
    property::Property,
};

/// Maximum octets of a content line, without the line break.
const LINE_LIMIT: usize = 75;
static LINE_BREAK: &str = "\r\n";

/// Emit the calendar with its properties, events and their alarms.
pub fn emit_calendar(calendar: &IcalCalendar) -> String {
    let mut out = String::from("BEGIN:VCALENDAR\r\n");
    emit_properties(&calendar.properties, &mut out);
    for event in &calendar.events {
        emit_event(event, &mut out);
    }
    out.push_str("END:VCALENDAR\r\n");
    out
}

fn emit_event(event: &IcalEvent, out: &mut String) {
    out.push_str("BEGIN:VEVENT\r\n");
    emit_properties(&event.properties, out);
    for alarm in &event.alarms {
        emit_alarm(alarm, out);
    }
    out.push_str("END:VEVENT\r\n");
}

fn emit_alarm(alarm: &IcalAlarm, out: &mut String) {
    out.push_str("BEGIN:VALARM\r\n");
    emit_properties(&alarm.properties, out);
    out.push_str("END:VALARM\r\n");
}

fn emit_properties(properties: &[Property], out: &mut String) {
    for property in properties {
        fold_line(&content_line(property), out);
    }
}

fn content_line(property: &Property) -> String {
    let mut line = property.name.clone();
    for (name, values) in property.params.iter().flatten() {
        let values: Vec<String> = values.iter().map(|value| param_value(value)).collect();
        line.push(';');
        line.push_str(name);
        line.push('=');
        line.push_str(&values.join(","));
    }
    line.push(':');
    line.push_str(property.value.as_deref().unwrap_or_default());
    line
}

/// Quote parameter values containing delimiters, DQUOTE cannot be represented.
fn param_value(value: &str) -> String {
    let value = value.replace('"', "");
    if value.contains([';', ':', ',']) {
        format!("\"{value}\"")
    } else {
        value
    }
}

/// Append `line` folded into chunks of at most [`LINE_LIMIT`] octets (RFC 5545, 3.1).
///
/// A chunk never ends inside a character or with whitespace, unfolding readers trim line ends.
fn fold_line(line: &str, out: &mut String) {
    let mut rest = line;
    // continuation lines start with a space
    let mut limit = LINE_LIMIT;
    while rest.len() > limit {
        let mut end = limit;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let trimmed = rest[..end].trim_end_matches([' ', '\t']).len();
        if trimmed > 0 {
            end = trimmed;
        }
        out.push_str(&rest[..end]);
        out.push_str(LINE_BREAK);
        out.push(' ');
        rest = &rest[end..];
        limit = LINE_LIMIT - 1;
    }
    out.push_str(rest);
    out.push_str(LINE_BREAK);
}
