use serde::{Deserialize, Serialize};
use std::io::Write;

use super::types::{Fact, FactStore};
use crate::error::Result;

/// One fact flattened together with its context and unit.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FactTableRow {
    pub context_ref: String,
    pub concept: String,
    pub prefix: String,
    pub value: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub point_in_time: Option<String>,
    pub unit: Option<String>,
    pub decimals: Option<String>,
    pub scale: Option<i32>,
    pub segment: Option<String>,
}

pub fn facts_to_table(store: &FactStore) -> Vec<FactTableRow> {
    store.iter_facts().map(|fact| to_row(store, fact)).collect()
}

fn to_row(store: &FactStore, fact: &Fact) -> FactTableRow {
    let context = store.context(&fact.context_ref);
    let (period_start, period_end, point_in_time) = match context {
        Some(context) if context.is_instant() => (None, None, Some(context.end_date().to_string())),
        Some(context) => (
            context.start_date().map(|d| d.to_string()),
            Some(context.end_date().to_string()),
            None,
        ),
        None => (None, None, None),
    };

    // Units are resolved to their measure; undeclared refs keep the raw id
    let unit = fact.unit_ref.as_ref().map(|unit_ref| {
        store
            .unit(unit_ref)
            .map(|unit| unit.measure.to_string())
            .unwrap_or_else(|| unit_ref.clone())
    });

    FactTableRow {
        context_ref: fact.context_ref.clone(),
        concept: fact.concept.clone(),
        prefix: fact.prefix().unwrap_or_default().to_string(),
        value: fact.value.clone(),
        period_start,
        period_end,
        point_in_time,
        unit,
        decimals: fact.decimals.map(|d| d.to_string()),
        scale: fact.scale,
        segment: context.and_then(|c| c.segment.clone()),
    }
}

pub fn write_csv<W: Write>(rows: &[FactTableRow], writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// One line per fact: concept, value, unit and period.
pub fn to_compact_text(store: &FactStore) -> String {
    let mut text = String::new();
    for row in facts_to_table(store) {
        text.push_str(&format_compact_row(&row));
        text.push('\n');
    }
    text
}

fn format_compact_row(row: &FactTableRow) -> String {
    let mut parts = vec![row.concept.clone(), row.value.clone()];

    if let Some(unit) = &row.unit {
        parts.push(unit.clone());
    }

    let period = match (&row.period_start, &row.period_end, &row.point_in_time) {
        (_, _, Some(instant)) => format!("({})", instant),
        (Some(start), Some(end), None) if start == end => format!("({})", start),
        (Some(start), Some(end), None) => format!("({}/{})", start, end),
        _ => String::new(),
    };
    if !period.is_empty() {
        parts.push(period);
    }

    if let Some(segment) = &row.segment {
        parts.push(format!("[{}]", segment));
    }

    parts.join(" ")
}
