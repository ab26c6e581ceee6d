use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::error::LoadError;
use crate::loader::Sink;
use crate::normalize::{CategoryLookup, EntityType, Item};
use crate::parser::{day_code, Period};

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Create any missing table. Existing tables are left untouched.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS categories (
            category_code TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            item_type     TEXT NOT NULL CHECK(item_type IN ('service','leisure','link','help','info')),
            link          TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_categories_type ON categories(item_type, name);

        CREATE TABLE IF NOT EXISTS items (
            item_id              INTEGER PRIMARY KEY,
            name                 TEXT,
            address              TEXT,
            web_link             TEXT,
            place_id             TEXT,
            icon_uri             TEXT NOT NULL DEFAULT '',
            is_free              BOOLEAN NOT NULL DEFAULT 0,
            coord_lat            REAL,
            coord_lon            REAL,
            phone                TEXT,
            call_for_appointment BOOLEAN NOT NULL DEFAULT 0,
            category_code        TEXT NOT NULL REFERENCES categories(category_code)
        );
        CREATE INDEX IF NOT EXISTS idx_items_category ON items(category_code);

        CREATE TABLE IF NOT EXISTS opening_hours (
            period_id     INTEGER PRIMARY KEY,
            start_day     TEXT NOT NULL CHECK(start_day IN ('mon','tue','wed','thu','fri','sat','sun')),
            end_day       TEXT NOT NULL CHECK(end_day IN ('mon','tue','wed','thu','fri','sat','sun')),
            start_hour    INTEGER NOT NULL,
            start_minutes INTEGER NOT NULL,
            end_hour      INTEGER NOT NULL,
            end_minutes   INTEGER NOT NULL,
            item_id       INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_opening_hours_item ON opening_hours(item_id);

        CREATE TABLE IF NOT EXISTS item_languages (
            item_id   INTEGER NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
            lang_code TEXT NOT NULL,
            UNIQUE(item_id, lang_code)
        );
        ",
    )?;
    Ok(())
}

// ── Categories ──

pub struct Category {
    pub code: String,
    pub name: String,
    pub link: Option<String>,
}

pub fn categories_for(conn: &Connection, item_type: EntityType) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT category_code, name, link FROM categories WHERE item_type = ?1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([item_type.key()], |row| {
            Ok(Category {
                code: row.get(0)?,
                name: row.get(1)?,
                link: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Sink ──

/// Writes items into an open connection or transaction.
pub struct SqliteSink<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteSink<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SqliteSink { conn }
    }
}

impl CategoryLookup for SqliteSink<'_> {
    fn category_for(&self, item_type: EntityType, name: &str) -> Result<String, LoadError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT category_code FROM categories WHERE name = ?1 AND item_type = ?2")?;
        let codes = stmt
            .query_map(params![name, item_type.key()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        match codes.len() {
            1 => Ok(codes.into_iter().next().unwrap_or_default()),
            0 => Err(LoadError::CategoryNotFound {
                item_type,
                name: name.to_string(),
            }),
            matches => Err(LoadError::AmbiguousCategory {
                item_type,
                name: name.to_string(),
                matches,
            }),
        }
    }
}

impl Sink for SqliteSink<'_> {
    fn insert_item(&mut self, item: &Item) -> Result<i64, LoadError> {
        self.conn.execute(
            "INSERT INTO items (name, address, web_link, place_id, icon_uri, is_free,
                                coord_lat, coord_lon, phone, call_for_appointment, category_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.name,
                item.address,
                item.web_link,
                item.place_id,
                item.icon_uri,
                item.is_free,
                item.coordinates.map(|c| c.lat),
                item.coordinates.map(|c| c.lon),
                item.phone,
                item.call_for_appointment,
                item.category_code,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_period(&mut self, item_id: i64, period: &Period) -> Result<i64, LoadError> {
        self.conn.execute(
            "INSERT INTO opening_hours (start_day, end_day, start_hour, start_minutes,
                                        end_hour, end_minutes, item_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                day_code(period.start_day),
                day_code(period.end_day),
                period.start.hour,
                period.start.minute,
                period.end.hour,
                period.end.minute,
                item_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_language(&mut self, item_id: i64, code: &str) -> Result<(), LoadError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO item_languages (item_id, lang_code) VALUES (?1, ?2)",
            params![item_id, code],
        )?;
        Ok(())
    }
}
