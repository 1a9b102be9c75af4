//! SQLite Geolocation Store
//!
//! Implements GeolocationStore using a SQLite database file. Each
//! operation opens its own connection inside a blocking task, so the
//! async runtime never parks on database I/O.
//!
//! Identity uniqueness lives here as unique indexes on `ip` and `url`.
//! The resolver's exists pre-check is only a fast path; the indexes are
//! what actually guarantee single-winner semantics under concurrency.

use crate::domain::entities::{Geolocation, Language, Location};
use crate::domain::errors::StoreError;
use crate::domain::identifier::{GeoIdentifier, IdentifierKind};
use crate::domain::ports::GeolocationStore;
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Writers wait this long for a competing lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS languages (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    native TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY,
    geoname_id INTEGER NOT NULL UNIQUE,
    capital TEXT NOT NULL,
    country_flag TEXT NOT NULL,
    country_flag_emoji TEXT NOT NULL,
    country_flag_emoji_unicode TEXT NOT NULL,
    calling_code TEXT NOT NULL,
    is_eu INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS location_language_association (
    location_id INTEGER NOT NULL REFERENCES locations(id),
    language_id INTEGER NOT NULL REFERENCES languages(id),
    PRIMARY KEY (location_id, language_id)
);

CREATE TABLE IF NOT EXISTS ip_geolocations (
    id INTEGER PRIMARY KEY,
    ip TEXT,
    type TEXT,
    url TEXT,
    continent_code TEXT NOT NULL,
    continent_name TEXT NOT NULL,
    country_code TEXT NOT NULL,
    country_name TEXT NOT NULL,
    region_code TEXT NOT NULL,
    region_name TEXT NOT NULL,
    city TEXT NOT NULL,
    zip TEXT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    msa TEXT,
    dma TEXT,
    radius TEXT,
    ip_routing_type TEXT,
    connection_type TEXT,
    location_id INTEGER REFERENCES locations(id),
    CHECK (ip IS NOT NULL OR url IS NOT NULL)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_ip_geolocations_ip ON ip_geolocations(ip);
CREATE UNIQUE INDEX IF NOT EXISTS idx_ip_geolocations_url ON ip_geolocations(url);
";

const COLUMNS: &str = "ip, type, url, continent_code, continent_name, country_code, \
                       country_name, region_code, region_name, city, zip, latitude, longitude, \
                       msa, dma, radius, ip_routing_type, connection_type, location_id";

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                StoreError::Duplicate
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// SQLite-backed geolocation store.
///
/// Holds only the database path; connections are opened per operation
/// on the blocking thread pool.
pub struct SqliteGeolocationStore {
    db_path: PathBuf,
}

impl SqliteGeolocationStore {
    /// Open the store and create the schema if it does not exist yet.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        let conn = Self::open_connection(&db_path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { db_path })
    }

    fn open_connection(db_path: &Path) -> rusqlite::Result<Connection> {
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn find_record(
        conn: &Connection,
        identifier: &GeoIdentifier,
    ) -> rusqlite::Result<Option<Geolocation>> {
        let sql = match identifier.kind() {
            IdentifierKind::Ip => format!("SELECT {COLUMNS} FROM ip_geolocations WHERE ip = ?1"),
            IdentifierKind::Url => format!("SELECT {COLUMNS} FROM ip_geolocations WHERE url = ?1"),
        };

        let found = conn
            .query_row(&sql, params![identifier.value()], Self::row_to_geolocation)
            .optional()?;

        match found {
            Some((Some(location_id), mut record)) => {
                record.location = Self::load_location(conn, location_id)?;
                Ok(Some(record))
            }
            Some((None, record)) => Ok(Some(record)),
            None => Ok(None),
        }
    }

    fn read_by_row_id(conn: &Connection, row_id: i64) -> rusqlite::Result<Geolocation> {
        let (location_id, mut record) = conn.query_row(
            &format!("SELECT {COLUMNS} FROM ip_geolocations WHERE id = ?1"),
            params![row_id],
            Self::row_to_geolocation,
        )?;
        if let Some(location_id) = location_id {
            record.location = Self::load_location(conn, location_id)?;
        }
        Ok(record)
    }

    /// Convert a SQLite row to a Geolocation entity.
    ///
    /// The nested location is loaded separately; this returns its row id
    /// alongside the flat record.
    fn row_to_geolocation(row: &Row) -> rusqlite::Result<(Option<i64>, Geolocation)> {
        let record = Geolocation {
            ip: row.get(0)?,
            kind: row.get(1)?,
            url: row.get(2)?,
            continent_code: row.get(3)?,
            continent_name: row.get(4)?,
            country_code: row.get(5)?,
            country_name: row.get(6)?,
            region_code: row.get(7)?,
            region_name: row.get(8)?,
            city: row.get(9)?,
            zip: row.get(10)?,
            latitude: row.get(11)?,
            longitude: row.get(12)?,
            msa: row.get(13)?,
            dma: row.get(14)?,
            radius: row.get(15)?,
            ip_routing_type: row.get(16)?,
            connection_type: row.get(17)?,
            location: None,
        };
        Ok((row.get(18)?, record))
    }

    fn load_location(conn: &Connection, location_id: i64) -> rusqlite::Result<Option<Location>> {
        let location = conn
            .query_row(
                "SELECT geoname_id, capital, country_flag, country_flag_emoji,
                        country_flag_emoji_unicode, calling_code, is_eu
                 FROM locations WHERE id = ?1",
                params![location_id],
                |row| {
                    Ok(Location {
                        geoname_id: row.get(0)?,
                        capital: row.get(1)?,
                        country_flag: row.get(2)?,
                        country_flag_emoji: row.get(3)?,
                        country_flag_emoji_unicode: row.get(4)?,
                        calling_code: row.get(5)?,
                        is_eu: row.get::<_, i64>(6)? != 0,
                        languages: Vec::new(),
                    })
                },
            )
            .optional()?;

        let mut location = match location {
            Some(location) => location,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT l.code, l.name, l.native
             FROM languages l
             JOIN location_language_association a ON a.language_id = l.id
             WHERE a.location_id = ?1
             ORDER BY l.id",
        )?;
        location.languages = stmt
            .query_map(params![location_id], |row| {
                Ok(Language {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    native: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(location))
    }

    fn insert_record(conn: &mut Connection, record: &Geolocation) -> rusqlite::Result<Geolocation> {
        // Immediate transaction: take the write lock up front so two
        // writers serialize instead of deadlocking on lock upgrade.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let location_id = match &record.location {
            Some(location) => Some(Self::find_or_create_location(&tx, location)?),
            None => None,
        };

        tx.execute(
            &format!(
                "INSERT INTO ip_geolocations ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
            ),
            params![
                record.ip,
                record.kind,
                record.url,
                record.continent_code,
                record.continent_name,
                record.country_code,
                record.country_name,
                record.region_code,
                record.region_name,
                record.city,
                record.zip,
                record.latitude,
                record.longitude,
                record.msa,
                record.dma,
                record.radius,
                record.ip_routing_type,
                record.connection_type,
                location_id,
            ],
        )?;
        let row_id = tx.last_insert_rowid();

        // Read back through the same transaction so the caller gets the
        // record exactly as stored, including reused nested rows.
        let stored = Self::read_by_row_id(&tx, row_id)?;
        tx.commit()?;
        Ok(stored)
    }

    /// Find a location by its natural key or create it, returning the
    /// row id. First writer wins: differing details on a later record
    /// with the same geoname_id are ignored.
    fn find_or_create_location(tx: &Transaction, location: &Location) -> rusqlite::Result<i64> {
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM locations WHERE geoname_id = ?1",
                params![location.geoname_id],
                |row| row.get(0),
            )
            .optional()?;

        let location_id = match existing {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT INTO locations (geoname_id, capital, country_flag, country_flag_emoji,
                                            country_flag_emoji_unicode, calling_code, is_eu)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        location.geoname_id,
                        location.capital,
                        location.country_flag,
                        location.country_flag_emoji,
                        location.country_flag_emoji_unicode,
                        location.calling_code,
                        location.is_eu,
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        for language in &location.languages {
            let language_id = Self::find_or_create_language(tx, language)?;
            tx.execute(
                "INSERT OR IGNORE INTO location_language_association (location_id, language_id)
                 VALUES (?1, ?2)",
                params![location_id, language_id],
            )?;
        }

        Ok(location_id)
    }

    fn find_or_create_language(tx: &Transaction, language: &Language) -> rusqlite::Result<i64> {
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM languages WHERE code = ?1",
                params![language.code],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => Ok(id),
            None => {
                tx.execute(
                    "INSERT INTO languages (code, name, native) VALUES (?1, ?2, ?3)",
                    params![language.code, language.name, language.native],
                )?;
                Ok(tx.last_insert_rowid())
            }
        }
    }

    fn identity_exists(
        conn: &Connection,
        ip: Option<&str>,
        url: Option<&str>,
    ) -> rusqlite::Result<bool> {
        // NULL never compares equal, so absent fields drop out of the OR.
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM ip_geolocations WHERE ip = ?1 OR url = ?2)",
            params![ip, url],
            |row| row.get(0),
        )
    }

    fn delete_record(conn: &Connection, identifier: &GeoIdentifier) -> rusqlite::Result<bool> {
        let sql = match identifier.kind() {
            IdentifierKind::Ip => "DELETE FROM ip_geolocations WHERE ip = ?1",
            IdentifierKind::Url => "DELETE FROM ip_geolocations WHERE url = ?1",
        };
        let deleted = conn.execute(sql, params![identifier.value()])?;
        Ok(deleted > 0)
    }
}

/// Run a store operation on the blocking thread pool.
async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(err) => Err(StoreError::Unavailable(format!(
            "blocking task failed: {err}"
        ))),
    }
}

#[async_trait]
impl GeolocationStore for SqliteGeolocationStore {
    async fn find_by_identifier(
        &self,
        identifier: &GeoIdentifier,
    ) -> Result<Option<Geolocation>, StoreError> {
        let db_path = self.db_path.clone();
        let identifier = identifier.clone();
        run_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            Ok(Self::find_record(&conn, &identifier)?)
        })
        .await
    }

    async fn exists(&self, ip: Option<&str>, url: Option<&str>) -> Result<bool, StoreError> {
        let db_path = self.db_path.clone();
        let ip = ip.map(str::to_string);
        let url = url.map(str::to_string);
        run_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            Ok(Self::identity_exists(&conn, ip.as_deref(), url.as_deref())?)
        })
        .await
    }

    async fn insert(&self, record: Geolocation) -> Result<Geolocation, StoreError> {
        let db_path = self.db_path.clone();
        run_blocking(move || {
            let mut conn = Self::open_connection(&db_path)?;
            Ok(Self::insert_record(&mut conn, &record)?)
        })
        .await
    }

    async fn delete_by_identifier(&self, identifier: &GeoIdentifier) -> Result<bool, StoreError> {
        let db_path = self.db_path.clone();
        let identifier = identifier.clone();
        run_blocking(move || {
            let conn = Self::open_connection(&db_path)?;
            Ok(Self::delete_record(&conn, &identifier)?)
        })
        .await
    }
}
