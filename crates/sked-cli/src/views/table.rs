use chrono::Utc;
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color as CellColor, Row, Table};
use sked_core::models::{Color, Importance, ScheduleDetail, ScheduleOccurrences, Tag};

use crate::timezone::{format_instant, format_span};

/// Length of the short id shown in tables
pub const SHORT_ID_LEN: usize = 8;

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string()[..SHORT_ID_LEN].to_string()
}

fn cell_color(color: Color) -> CellColor {
    match color {
        Color::Blue => CellColor::Blue,
        Color::Green => CellColor::Green,
        Color::Yellow => CellColor::Yellow,
        Color::Purple => CellColor::Magenta,
        Color::Orange => CellColor::Rgb { r: 255, g: 165, b: 0 },
        Color::Mint => CellColor::Rgb { r: 152, g: 255, b: 152 },
        Color::Lavender => CellColor::Rgb { r: 181, g: 126, b: 220 },
        Color::Beige => CellColor::Rgb { r: 225, g: 198, b: 153 },
        Color::Coral => CellColor::Rgb { r: 255, g: 127, b: 80 },
    }
}

/// One row per occurrence, ordered by start.
pub fn display_occurrences(items: &[ScheduleOccurrences], tz: Tz) {
    if items.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut rows: Vec<_> = items
        .iter()
        .flat_map(|item| item.dates.iter().map(move |slot| (item, slot)))
        .collect();
    rows.sort_by_key(|(item, slot)| (slot.start, item.id));

    let now = Utc::now();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "When", ""]);

    for (item, slot) in rows {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&item.id)));
        row.add_cell(Cell::new(&item.title).fg(cell_color(item.color)));

        let mut when = Cell::new(format_span(slot.start, slot.end, tz));
        if slot.end < now {
            when = when.fg(CellColor::DarkGrey);
        } else if slot.start <= now {
            when = when.add_attribute(Attribute::Bold);
        }
        row.add_cell(when);
        row.add_cell(Cell::new(slot.start.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_detail(detail: &ScheduleDetail, tz: Tz) {
    let schedule = &detail.schedule;

    let mut table = Table::new();
    let mut add = |label: &str, value: String| {
        table.add_row(vec![Cell::new(label).add_attribute(Attribute::Bold), Cell::new(value)]);
    };

    add("ID", schedule.id.to_string());
    add("Title", schedule.title.clone());
    add("When", format_span(schedule.start_date, schedule.end_date, tz));
    add("Color", schedule.color.to_string());
    add("Importance", importance_label(schedule.importance).to_string());
    if let Some(note) = &schedule.note {
        add("Note", note.clone());
    }

    match &detail.rule {
        Some(rule) => {
            let mut text = match rule.interval {
                Some(i) if i > 1 => format!("every {} cycles, {}", i, rule.frequency),
                _ => rule.frequency.clone(),
            };
            if let Some(until) = rule.until {
                text.push_str(&format!(", until {}", format_instant(until, tz)));
            }
            if let Some(count) = rule.count {
                text.push_str(&format!(", {} times", count));
            }
            add("Repeats", text);
        }
        None => add("Repeats", "never".to_string()),
    }

    if let Some(first) = detail.first_occurrence {
        add("First occurrence", format_span(first.start, first.end, tz));
    }

    if !detail.exceptions.is_empty() {
        let skipped: Vec<String> = detail
            .exceptions
            .iter()
            .map(|ex| match ex.override_schedule_id {
                Some(id) => format!("{} (moved to {})", format_instant(ex.start_date, tz), short_id(&id)),
                None => format_instant(ex.start_date, tz),
            })
            .collect();
        add("Exceptions", skipped.join("\n"));
    }

    if !detail.tags.is_empty() {
        let titles: Vec<&str> = detail.tags.iter().map(|t| t.title.as_str()).collect();
        add("Tags", titles.join(", "));
    }

    if !detail.reminders.is_empty() {
        let minutes: Vec<String> = detail
            .reminders
            .iter()
            .map(|r| format!("{} min before", r.minutes_before))
            .collect();
        add("Reminders", minutes.join(", "));
    }

    add("Updated", schedule.updated_at.humanize());

    println!("{table}");
}

pub fn display_tags(tags: &[Tag]) {
    if tags.is_empty() {
        println!("No tags found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Tag", "Created"]);
    for tag in tags {
        table.add_row(vec![Cell::new(&tag.title), Cell::new(tag.created_at.humanize())]);
    }
    println!("{table}");
}

fn importance_label(importance: Importance) -> &'static str {
    match importance {
        Importance::VeryLow => "very low",
        Importance::Low => "low",
        Importance::Medium => "medium",
        Importance::High => "high",
        Importance::VeryHigh => "very high",
    }
}
