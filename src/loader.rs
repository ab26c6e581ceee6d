use std::io::{Read, Write};
use std::ops::AddAssign;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde_json::json;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::normalize::{build_item, CategoryLookup, EntityType, Item, RawRow};
use crate::parser::{hours_for, Period};

/// Where loaded rows end up. Ids come back from the store.
pub trait Sink {
    fn insert_item(&mut self, item: &Item) -> Result<i64, LoadError>;
    fn insert_period(&mut self, item_id: i64, period: &Period) -> Result<i64, LoadError>;
    fn insert_language(&mut self, item_id: i64, code: &str) -> Result<(), LoadError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub items: usize,
    pub periods: usize,
    pub languages: usize,
}

impl AddAssign for LoadStats {
    fn add_assign(&mut self, other: LoadStats) {
        self.items += other.items;
        self.periods += other.periods;
        self.languages += other.languages;
    }
}

/// Load every record of one CSV export. Stops at the first bad row.
pub fn load<R, S>(item_type: EntityType, input: R, sink: &mut S) -> Result<LoadStats>
where
    R: Read,
    S: Sink + CategoryLookup,
{
    info!(item_type = item_type.label(), "Inserting");
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .from_reader(input);

    let mut stats = LoadStats::default();
    for record in reader.records() {
        let record = record.with_context(|| format!("{} csv unreadable", item_type.label()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row = RawRow::from_record(item_type.fields(), record.iter());
        debug!(line, ?row, "row");

        load_row(item_type, &row, sink, &mut stats)
            .with_context(|| format!("{} row at line {}", item_type.label(), line))?;
    }

    info!(
        item_type = item_type.label(),
        items = stats.items,
        periods = stats.periods,
        languages = stats.languages,
        "inserted"
    );
    Ok(stats)
}

fn load_row<S>(item_type: EntityType, row: &RawRow, sink: &mut S, stats: &mut LoadStats) -> Result<(), LoadError>
where
    S: Sink + CategoryLookup,
{
    let item = build_item(item_type, row, &*sink)?;
    debug!(?item, "item");
    // hours must parse before anything of this row is written
    let periods = row.get("hours").map(hours_for).transpose()?.unwrap_or_default();

    let item_id = sink.insert_item(&item)?;
    stats.items += 1;
    for period in &periods {
        sink.insert_period(item_id, period)?;
        stats.periods += 1;
    }
    for code in &item.languages {
        sink.insert_language(item_id, code)?;
        stats.languages += 1;
    }
    Ok(())
}

// ── Echo ──

/// Prints every item (with its periods) as a JSON line before passing it on.
pub struct Echo<S, W> {
    inner: S,
    out: W,
    pending: Option<serde_json::Value>,
}

impl<S: Sink, W: Write> Echo<S, W> {
    pub fn new(inner: S, out: W) -> Self {
        Echo {
            inner,
            out,
            pending: None,
        }
    }

    /// Write out the last item. Call once the load is done.
    pub fn flush(&mut self) -> Result<(), LoadError> {
        self.emit_pending()?;
        self.out.flush()?;
        Ok(())
    }

    fn emit_pending(&mut self) -> Result<(), LoadError> {
        if let Some(value) = self.pending.take() {
            writeln!(self.out, "{}", value)?;
        }
        Ok(())
    }
}

impl<S: Sink, W: Write> Sink for Echo<S, W> {
    fn insert_item(&mut self, item: &Item) -> Result<i64, LoadError> {
        self.emit_pending()?;
        let id = self.inner.insert_item(item)?;
        self.pending = Some(json!({ "item_id": id, "item": item, "periods": [] }));
        Ok(id)
    }

    fn insert_period(&mut self, item_id: i64, period: &Period) -> Result<i64, LoadError> {
        let id = self.inner.insert_period(item_id, period)?;
        if let Some(periods) = self
            .pending
            .as_mut()
            .and_then(|v| v.get_mut("periods"))
            .and_then(|p| p.as_array_mut())
        {
            periods.push(json!(period));
        }
        Ok(id)
    }

    fn insert_language(&mut self, item_id: i64, code: &str) -> Result<(), LoadError> {
        self.inner.insert_language(item_id, code)
    }
}

impl<S: CategoryLookup, W> CategoryLookup for Echo<S, W> {
    fn category_for(&self, item_type: EntityType, name: &str) -> Result<String, LoadError> {
        self.inner.category_for(item_type, name)
    }
}
