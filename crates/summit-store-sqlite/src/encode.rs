//! Encoding and decoding helpers between Summit records and the plain column
//! representations stored in SQLite.
//!
//! Dates are stored as `YYYY-MM-DD`, local times as `HH:MM:SS`. Closed
//! enumerations are stored as their snake_case names.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use summit_core::{
  difficulty::{Difficulty, DifficultySystem},
  entity::{
    Ascent, Continent, Country, EntityKind, HikeKind, Hiker, Participation,
    Peak, Photo, Range, Record, Region, Trip,
  },
};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

// ─── Tables ──────────────────────────────────────────────────────────────────

pub fn table_name(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Country => "countries",
    EntityKind::Range => "ranges",
    EntityKind::Region => "regions",
    EntityKind::Peak => "peaks",
    EntityKind::Trip => "trips",
    EntityKind::Hiker => "hikers",
    EntityKind::Ascent => "ascents",
    EntityKind::Participation => "participation",
    EntityKind::Photo => "photos",
  }
}

/// `SELECT` prefix whose column order matches [`RawRow::read`].
pub fn select_sql(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Country => "SELECT id, name FROM countries",
    EntityKind::Range => "SELECT id, name, continent FROM ranges",
    EntityKind::Region => {
      "SELECT id, name, range_id, country_id FROM regions"
    }
    EntityKind::Peak => {
      "SELECT id, name, height, is_volcano, region_id, maps_link, earth_link, \
       wiki_link FROM peaks"
    }
    EntityKind::Trip => {
      "SELECT id, name, start_date, end_date, description FROM trips"
    }
    EntityKind::Hiker => "SELECT id, name FROM hikers",
    EntityKind::Ascent => {
      "SELECT id, title, peak_id, date, time, elevation_gain, kind, \
       is_traverse, difficulty_system, difficulty_grade, trip_id, description \
       FROM ascents"
    }
    EntityKind::Participation => {
      "SELECT ascent_id, hiker_id FROM participation"
    }
    EntityKind::Photo => {
      "SELECT id, ascent_id, sort_index, file_path, description FROM photos"
    }
  }
}

/// `ORDER BY` clause giving the natural key order of a table.
pub fn order_sql(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::Participation => "ORDER BY ascent_id, hiker_id",
    _ => "ORDER BY id",
  }
}

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(column: &'static str, s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| Error::Decode {
    column,
    value: s.to_owned(),
  })
}

pub fn encode_time(t: NaiveTime) -> String { t.format(TIME_FORMAT).to_string() }

pub fn decode_time(column: &'static str, s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|_| Error::Decode {
    column,
    value: s.to_owned(),
  })
}

/// Decode a snake_case enum name written by its `Display` impl.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode { column, value: s.to_owned() })
}

fn decode_opt<T>(
  value: Option<String>,
  decode: impl FnOnce(&str) -> Result<T>,
) -> Result<Option<T>> {
  value.as_deref().map(decode).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw column values read from a `ranges` row.
pub struct RawRange {
  pub id:        i64,
  pub name:      String,
  pub continent: Option<String>,
}

impl RawRange {
  pub fn into_record(self) -> Result<Record> {
    Ok(Record::Range(Range {
      id:        self.id,
      name:      self.name,
      continent: decode_opt(self.continent, |s| {
        decode_enum::<Continent>("continent", s)
      })?,
    }))
  }
}

/// Raw column values read from a `trips` row.
pub struct RawTrip {
  pub id:          i64,
  pub name:        String,
  pub start_date:  Option<String>,
  pub end_date:    Option<String>,
  pub description: Option<String>,
}

impl RawTrip {
  pub fn into_record(self) -> Result<Record> {
    Ok(Record::Trip(Trip {
      id:          self.id,
      name:        self.name,
      start_date:  decode_opt(self.start_date, |s| decode_date("start_date", s))?,
      end_date:    decode_opt(self.end_date, |s| decode_date("end_date", s))?,
      description: self.description,
    }))
  }
}

/// Raw column values read from an `ascents` row.
pub struct RawAscent {
  pub id:                i64,
  pub title:             Option<String>,
  pub peak_id:           Option<i64>,
  pub date:              Option<String>,
  pub time:              Option<String>,
  pub elevation_gain:    Option<i64>,
  pub kind:              String,
  pub is_traverse:       bool,
  pub difficulty_system: Option<String>,
  pub difficulty_grade:  Option<String>,
  pub trip_id:           Option<i64>,
  pub description:       Option<String>,
}

impl RawAscent {
  pub fn into_record(self) -> Result<Record> {
    let difficulty = match (self.difficulty_system, self.difficulty_grade) {
      (Some(system), grade) => Some(Difficulty {
        system: decode_enum::<DifficultySystem>("difficulty_system", &system)?,
        grade,
      }),
      (None, None) => None,
      (None, Some(grade)) => {
        return Err(Error::Decode { column: "difficulty_grade", value: grade });
      }
    };

    Ok(Record::Ascent(Ascent {
      id: self.id,
      title: self.title,
      peak_id: self.peak_id,
      date: decode_opt(self.date, |s| decode_date("date", s))?,
      time: decode_opt(self.time, |s| decode_time("time", s))?,
      elevation_gain: self.elevation_gain,
      kind: decode_enum::<HikeKind>("kind", &self.kind)?,
      is_traverse: self.is_traverse,
      difficulty,
      trip_id: self.trip_id,
      description: self.description,
    }))
  }
}

/// A row read with [`select_sql`], before fallible decoding.
pub enum RawRow {
  Ready(Record),
  Range(RawRange),
  Trip(RawTrip),
  Ascent(RawAscent),
}

impl RawRow {
  /// Read one row of `kind`. Column positions follow [`select_sql`].
  pub fn read(kind: EntityKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(match kind {
      EntityKind::Country => Self::Ready(Record::Country(Country {
        id:   row.get(0)?,
        name: row.get(1)?,
      })),
      EntityKind::Range => Self::Range(RawRange {
        id:        row.get(0)?,
        name:      row.get(1)?,
        continent: row.get(2)?,
      }),
      EntityKind::Region => Self::Ready(Record::Region(Region {
        id:         row.get(0)?,
        name:       row.get(1)?,
        range_id:   row.get(2)?,
        country_id: row.get(3)?,
      })),
      EntityKind::Peak => Self::Ready(Record::Peak(Peak {
        id:         row.get(0)?,
        name:       row.get(1)?,
        height:     row.get(2)?,
        is_volcano: row.get(3)?,
        region_id:  row.get(4)?,
        maps_link:  row.get(5)?,
        earth_link: row.get(6)?,
        wiki_link:  row.get(7)?,
      })),
      EntityKind::Trip => Self::Trip(RawTrip {
        id:          row.get(0)?,
        name:        row.get(1)?,
        start_date:  row.get(2)?,
        end_date:    row.get(3)?,
        description: row.get(4)?,
      }),
      EntityKind::Hiker => Self::Ready(Record::Hiker(Hiker {
        id:   row.get(0)?,
        name: row.get(1)?,
      })),
      EntityKind::Ascent => Self::Ascent(RawAscent {
        id:                row.get(0)?,
        title:             row.get(1)?,
        peak_id:           row.get(2)?,
        date:              row.get(3)?,
        time:              row.get(4)?,
        elevation_gain:    row.get(5)?,
        kind:              row.get(6)?,
        is_traverse:       row.get(7)?,
        difficulty_system: row.get(8)?,
        difficulty_grade:  row.get(9)?,
        trip_id:           row.get(10)?,
        description:       row.get(11)?,
      }),
      EntityKind::Participation => {
        Self::Ready(Record::Participation(Participation {
          ascent_id: row.get(0)?,
          hiker_id:  row.get(1)?,
        }))
      }
      EntityKind::Photo => Self::Ready(Record::Photo(Photo {
        id:          row.get(0)?,
        ascent_id:   row.get(1)?,
        sort_index:  row.get(2)?,
        file_path:   row.get(3)?,
        description: row.get(4)?,
      })),
    })
  }

  pub fn into_record(self) -> Result<Record> {
    match self {
      Self::Ready(record) => Ok(record),
      Self::Range(raw) => raw.into_record(),
      Self::Trip(raw) => raw.into_record(),
      Self::Ascent(raw) => raw.into_record(),
    }
  }
}
