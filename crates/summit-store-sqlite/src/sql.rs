//! Synchronous statements run on the connection thread.
//!
//! Every function takes a plain connection so it can be called both inside
//! and outside a transaction (`Transaction` derefs to `Connection`).

use rusqlite::{Connection, OptionalExtension as _, params};
use summit_core::{
  ValidationError,
  delete::{Dependent, Effect, WhatIfReport},
  entity::{EntityKind, Record},
  relation::ForeignKey,
  store::NamePolicy,
};

use crate::{
  Result,
  encode::{RawRow, encode_date, encode_time, order_sql, select_sql, table_name},
};

// ─── Reads ───────────────────────────────────────────────────────────────────

fn read_rows(
  conn: &Connection,
  kind: EntityKind,
  sql: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<Record>> {
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, |row| RawRow::read(kind, row))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRow::into_record).collect()
}

pub fn read_all(conn: &Connection, kind: EntityKind) -> Result<Vec<Record>> {
  let sql = format!("{} {}", select_sql(kind), order_sql(kind));
  read_rows(conn, kind, &sql, [])
}

pub fn read_by_foreign_key(
  conn: &Connection,
  fk: ForeignKey,
  value: i64,
) -> Result<Vec<Record>> {
  let kind = fk.owner();
  let sql = format!(
    "{} WHERE {} = ?1 {}",
    select_sql(kind),
    fk.column(),
    order_sql(kind)
  );
  read_rows(conn, kind, &sql, params![value])
}

pub fn exists(conn: &Connection, kind: EntityKind, id: i64) -> Result<bool> {
  let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table_name(kind));
  Ok(
    conn
      .query_row(&sql, params![id], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

fn require(conn: &Connection, kind: EntityKind, id: i64) -> Result<()> {
  if exists(conn, kind, id)? {
    Ok(())
  } else {
    Err(summit_core::Error::NotFound { kind, id }.into())
  }
}

fn ids_where(
  conn: &Connection,
  select: &str,
  value: i64,
) -> Result<Vec<i64>> {
  let mut stmt = conn.prepare(select)?;
  let ids = stmt
    .query_map(params![value], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}

// ─── Checks ──────────────────────────────────────────────────────────────────

/// Every foreign key set on `record` must point at an existing row.
pub fn check_references(conn: &Connection, record: &Record) -> Result<()> {
  for fk in ForeignKey::owned_by(record.kind()) {
    if let Some(target_id) = record.foreign_key(fk) {
      require(conn, fk.target(), target_id)?;
    }
  }
  Ok(())
}

/// Country names are unique; hiker names are unique unless the caller allows
/// the duplicate. `own_id` excludes the row being updated.
pub fn check_name(
  conn: &Connection,
  record: &Record,
  policy: NamePolicy,
  own_id: Option<i64>,
) -> Result<()> {
  let enforce = match record.kind() {
    EntityKind::Country => true,
    EntityKind::Hiker => policy == NamePolicy::Reject,
    _ => false,
  };
  let Some(name) = record.name().filter(|_| enforce) else {
    return Ok(());
  };

  let sql = format!(
    "SELECT id FROM {} WHERE name = ?1 COLLATE NOCASE AND id IS NOT ?2",
    table_name(record.kind())
  );
  let clash: Option<i64> = conn
    .query_row(&sql, params![name, own_id], |row| row.get(0))
    .optional()?;

  match clash {
    Some(_) => Err(
      summit_core::Error::DuplicateName {
        kind: record.kind(),
        name: name.to_owned(),
      }
      .into(),
    ),
    None => Ok(()),
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn insert_record(conn: &Connection, record: &Record) -> Result<i64> {
  match record {
    Record::Country(r) => {
      conn.execute("INSERT INTO countries (name) VALUES (?1)", params![r.name])?;
    }
    Record::Range(r) => {
      conn.execute(
        "INSERT INTO ranges (name, continent) VALUES (?1, ?2)",
        params![r.name, r.continent.map(|c| c.to_string())],
      )?;
    }
    Record::Region(r) => {
      conn.execute(
        "INSERT INTO regions (name, range_id, country_id) VALUES (?1, ?2, ?3)",
        params![r.name, r.range_id, r.country_id],
      )?;
    }
    Record::Peak(r) => {
      conn.execute(
        "INSERT INTO peaks (
           name, height, is_volcano, region_id, maps_link, earth_link, wiki_link
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
          r.name,
          r.height,
          r.is_volcano,
          r.region_id,
          r.maps_link,
          r.earth_link,
          r.wiki_link,
        ],
      )?;
    }
    Record::Trip(r) => {
      conn.execute(
        "INSERT INTO trips (name, start_date, end_date, description)
         VALUES (?1, ?2, ?3, ?4)",
        params![
          r.name,
          r.start_date.map(encode_date),
          r.end_date.map(encode_date),
          r.description,
        ],
      )?;
    }
    Record::Hiker(r) => {
      conn.execute("INSERT INTO hikers (name) VALUES (?1)", params![r.name])?;
    }
    Record::Ascent(r) => {
      conn.execute(
        "INSERT INTO ascents (
           title, peak_id, date, time, elevation_gain, kind, is_traverse,
           difficulty_system, difficulty_grade, trip_id, description
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
          r.title,
          r.peak_id,
          r.date.map(encode_date),
          r.time.map(encode_time),
          r.elevation_gain,
          r.kind.to_string(),
          r.is_traverse,
          r.difficulty.as_ref().map(|d| d.system.to_string()),
          r.difficulty.as_ref().and_then(|d| d.grade.clone()),
          r.trip_id,
          r.description,
        ],
      )?;
    }
    Record::Photo(r) => {
      conn.execute(
        "INSERT INTO photos (ascent_id, sort_index, file_path, description)
         VALUES (?1, ?2, ?3, ?4)",
        params![r.ascent_id, r.sort_index, r.file_path, r.description],
      )?;
      let id = conn.last_insert_rowid();
      place_photo(conn, id, r.ascent_id, r.sort_index)?;
      return Ok(id);
    }
    Record::Participation(_) => {
      return Err(
        ValidationError::UnsupportedKind { kind: EntityKind::Participation }
          .into(),
      );
    }
  }
  Ok(conn.last_insert_rowid())
}

pub fn update_record(conn: &Connection, id: i64, record: &Record) -> Result<()> {
  let changed = match record {
    Record::Country(r) => conn.execute(
      "UPDATE countries SET name = ?2 WHERE id = ?1",
      params![id, r.name],
    )?,
    Record::Range(r) => conn.execute(
      "UPDATE ranges SET name = ?2, continent = ?3 WHERE id = ?1",
      params![id, r.name, r.continent.map(|c| c.to_string())],
    )?,
    Record::Region(r) => conn.execute(
      "UPDATE regions SET name = ?2, range_id = ?3, country_id = ?4 WHERE id = ?1",
      params![id, r.name, r.range_id, r.country_id],
    )?,
    Record::Peak(r) => conn.execute(
      "UPDATE peaks SET
         name = ?2, height = ?3, is_volcano = ?4, region_id = ?5,
         maps_link = ?6, earth_link = ?7, wiki_link = ?8
       WHERE id = ?1",
      params![
        id,
        r.name,
        r.height,
        r.is_volcano,
        r.region_id,
        r.maps_link,
        r.earth_link,
        r.wiki_link,
      ],
    )?,
    Record::Trip(r) => conn.execute(
      "UPDATE trips SET name = ?2, start_date = ?3, end_date = ?4, description = ?5
       WHERE id = ?1",
      params![
        id,
        r.name,
        r.start_date.map(encode_date),
        r.end_date.map(encode_date),
        r.description,
      ],
    )?,
    Record::Hiker(r) => conn.execute(
      "UPDATE hikers SET name = ?2 WHERE id = ?1",
      params![id, r.name],
    )?,
    Record::Ascent(r) => conn.execute(
      "UPDATE ascents SET
         title = ?2, peak_id = ?3, date = ?4, time = ?5, elevation_gain = ?6,
         kind = ?7, is_traverse = ?8, difficulty_system = ?9,
         difficulty_grade = ?10, trip_id = ?11, description = ?12
       WHERE id = ?1",
      params![
        id,
        r.title,
        r.peak_id,
        r.date.map(encode_date),
        r.time.map(encode_time),
        r.elevation_gain,
        r.kind.to_string(),
        r.is_traverse,
        r.difficulty.as_ref().map(|d| d.system.to_string()),
        r.difficulty.as_ref().and_then(|d| d.grade.clone()),
        r.trip_id,
        r.description,
      ],
    )?,
    Record::Photo(r) => {
      let previous: Option<i64> = conn
        .query_row(
          "SELECT ascent_id FROM photos WHERE id = ?1",
          params![id],
          |row| row.get(0),
        )
        .optional()?;
      let Some(previous) = previous else {
        return Err(
          summit_core::Error::NotFound { kind: EntityKind::Photo, id }.into(),
        );
      };
      conn.execute(
        "UPDATE photos SET ascent_id = ?2, file_path = ?3, description = ?4
         WHERE id = ?1",
        params![id, r.ascent_id, r.file_path, r.description],
      )?;
      place_photo(conn, id, r.ascent_id, r.sort_index)?;
      if previous != r.ascent_id {
        renumber_photos(conn, previous)?;
      }
      1
    }
    Record::Participation(_) => {
      return Err(
        ValidationError::UnsupportedKind { kind: EntityKind::Participation }
          .into(),
      );
    }
  };

  if changed == 0 {
    return Err(summit_core::Error::NotFound { kind: record.kind(), id }.into());
  }
  Ok(())
}

// ─── Photo ordering ──────────────────────────────────────────────────────────

fn write_photo_order(conn: &Connection, ordered: &[i64]) -> Result<()> {
  let mut stmt = conn.prepare("UPDATE photos SET sort_index = ?2 WHERE id = ?1")?;
  for (index, id) in ordered.iter().enumerate() {
    stmt.execute(params![id, index as i64])?;
  }
  Ok(())
}

/// Put `photo_id` at `index` among the photos of `ascent_id` and renumber
/// them all to `0..n`. Indices past the end append.
pub fn place_photo(
  conn: &Connection,
  photo_id: i64,
  ascent_id: i64,
  index: i64,
) -> Result<()> {
  let mut stmt = conn.prepare(
    "SELECT id FROM photos WHERE ascent_id = ?1 AND id != ?2
     ORDER BY sort_index, id",
  )?;
  let mut ordered = stmt
    .query_map(params![ascent_id, photo_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;

  let position = usize::try_from(index).unwrap_or(0).min(ordered.len());
  ordered.insert(position, photo_id);
  write_photo_order(conn, &ordered)
}

/// Close gaps in the photo order of an ascent.
pub fn renumber_photos(conn: &Connection, ascent_id: i64) -> Result<()> {
  let ordered = ids_where(
    conn,
    "SELECT id FROM photos WHERE ascent_id = ?1 ORDER BY sort_index, id",
    ascent_id,
  )?;
  write_photo_order(conn, &ordered)
}

pub fn photo_ascent(conn: &Connection, photo_id: i64) -> Result<i64> {
  conn
    .query_row(
      "SELECT ascent_id FROM photos WHERE id = ?1",
      params![photo_id],
      |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| {
      summit_core::Error::NotFound { kind: EntityKind::Photo, id: photo_id }
        .into()
    })
}

// ─── Participation ───────────────────────────────────────────────────────────

pub fn set_participants(
  conn: &Connection,
  ascent_id: i64,
  hiker_ids: &[i64],
) -> Result<()> {
  require(conn, EntityKind::Ascent, ascent_id)?;
  for &hiker_id in hiker_ids {
    require(conn, EntityKind::Hiker, hiker_id)?;
  }

  conn.execute(
    "DELETE FROM participation WHERE ascent_id = ?1",
    params![ascent_id],
  )?;
  let mut stmt = conn.prepare(
    "INSERT OR IGNORE INTO participation (ascent_id, hiker_id) VALUES (?1, ?2)",
  )?;
  for hiker_id in hiker_ids {
    stmt.execute(params![ascent_id, hiker_id])?;
  }
  Ok(())
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// For a link-table key, the column holding the row on the other side.
fn link_partner(fk: ForeignKey) -> &'static str {
  match fk {
    ForeignKey::ParticipationAscent => "hiker_id",
    _ => "ascent_id",
  }
}

/// Compute the consequences of deleting `ids` from `kind`. Fails with
/// `NotFound` if any id does not exist.
pub fn what_if(
  conn: &Connection,
  kind: EntityKind,
  ids: &[i64],
) -> Result<WhatIfReport> {
  if kind.is_link() {
    return Err(ValidationError::UnsupportedKind { kind }.into());
  }

  let mut ids = ids.to_vec();
  ids.sort_unstable();
  ids.dedup();
  for &id in &ids {
    require(conn, kind, id)?;
  }

  let mut report = WhatIfReport::new(kind, ids);
  for fk in ForeignKey::referencing(kind) {
    let owner = fk.owner();
    let select = if owner.is_link() {
      format!(
        "SELECT {partner} FROM {table} WHERE {column} = ?1 ORDER BY {partner}",
        partner = link_partner(fk),
        table = table_name(owner),
        column = fk.column(),
      )
    } else {
      format!(
        "SELECT id FROM {} WHERE {} = ?1 ORDER BY id",
        table_name(owner),
        fk.column()
      )
    };

    for &id in &report.ids {
      for dependent in ids_where(conn, &select, id)? {
        report.effects.push(Dependent {
          kind:   owner,
          id:     dependent,
          via:    fk,
          effect: fk.on_delete(),
        });
      }
    }
  }
  Ok(report)
}

/// Carry out a delete previously analysed by [`what_if`] on the same
/// transaction.
pub fn apply_delete(conn: &Connection, report: &WhatIfReport) -> Result<()> {
  let kind = report.kind;

  for fk in ForeignKey::referencing(kind) {
    let sql = match fk.on_delete() {
      Effect::Cascade => format!(
        "DELETE FROM {} WHERE {} = ?1",
        table_name(fk.owner()),
        fk.column()
      ),
      Effect::Unlink => format!(
        "UPDATE {table} SET {column} = NULL WHERE {column} = ?1",
        table = table_name(fk.owner()),
        column = fk.column(),
      ),
    };
    let mut stmt = conn.prepare(&sql)?;
    for id in &report.ids {
      stmt.execute(params![id])?;
    }
  }

  let mut touched_ascents = Vec::new();
  if kind == EntityKind::Photo {
    for &id in &report.ids {
      touched_ascents.push(photo_ascent(conn, id)?);
    }
    touched_ascents.sort_unstable();
    touched_ascents.dedup();
  }

  let sql = format!("DELETE FROM {} WHERE id = ?1", table_name(kind));
  let mut stmt = conn.prepare(&sql)?;
  for id in &report.ids {
    stmt.execute(params![id])?;
  }

  for ascent_id in touched_ascents {
    renumber_photos(conn, ascent_id)?;
  }
  Ok(())
}
