//! The base columns of every table and how to read them from a record.

use summit_core::entity::{EntityKind, Record};

use crate::value::{Value, ValueType};

/// Virtual column present on every table: a human-readable label for the
/// row, assembled from several fields.
pub const IDENTITY: &str = "identity";

/// A column stored in (or computed from a single row of) a base table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseColumn {
  pub name:       &'static str,
  pub value_type: ValueType,
  /// `false` for columns computed from other fields of the row.
  pub stored:     bool,
}

const fn col(name: &'static str, value_type: ValueType) -> BaseColumn {
  BaseColumn { name, value_type, stored: true }
}

const fn derived(name: &'static str, value_type: ValueType) -> BaseColumn {
  BaseColumn { name, value_type, stored: false }
}

use ValueType::{Bool, Date, Int, Text, Time};

const COUNTRY: &[BaseColumn] = &[col("id", Int), col("name", Text)];

const RANGE: &[BaseColumn] =
  &[col("id", Int), col("name", Text), col("continent", Text)];

const REGION: &[BaseColumn] = &[
  col("id", Int),
  col("name", Text),
  col("range_id", Int),
  col("country_id", Int),
];

const PEAK: &[BaseColumn] = &[
  col("id", Int),
  col("name", Text),
  col("height", Int),
  col("is_volcano", Bool),
  col("region_id", Int),
  col("maps_link", Text),
  col("earth_link", Text),
  col("wiki_link", Text),
];

const TRIP: &[BaseColumn] = &[
  col("id", Int),
  col("name", Text),
  col("start_date", Date),
  col("end_date", Date),
  // Calendar days covered, both ends included.
  derived("days", Int),
  col("description", Text),
];

const HIKER: &[BaseColumn] = &[col("id", Int), col("name", Text)];

const ASCENT: &[BaseColumn] = &[
  col("id", Int),
  col("title", Text),
  col("peak_id", Int),
  col("date", Date),
  col("time", Time),
  col("elevation_gain", Int),
  col("kind", Text),
  col("is_traverse", Bool),
  col("difficulty_system", Text),
  col("difficulty_grade", Text),
  col("trip_id", Int),
  col("description", Text),
];

const PARTICIPATION: &[BaseColumn] = &[col("ascent_id", Int), col("hiker_id", Int)];

const PHOTO: &[BaseColumn] = &[
  col("id", Int),
  col("ascent_id", Int),
  col("sort_index", Int),
  col("file_path", Text),
  col("description", Text),
];

/// Columns of `kind`, stored ones in schema order. Does not include
/// [`IDENTITY`].
pub fn base_columns(kind: EntityKind) -> &'static [BaseColumn] {
  match kind {
    EntityKind::Country => COUNTRY,
    EntityKind::Range => RANGE,
    EntityKind::Region => REGION,
    EntityKind::Peak => PEAK,
    EntityKind::Trip => TRIP,
    EntityKind::Hiker => HIKER,
    EntityKind::Ascent => ASCENT,
    EntityKind::Participation => PARTICIPATION,
    EntityKind::Photo => PHOTO,
  }
}

/// Other tables whose rows appear in the [`IDENTITY`] label of `kind`.
pub fn identity_sources(kind: EntityKind) -> &'static [EntityKind] {
  match kind {
    EntityKind::Region => &[EntityKind::Range],
    EntityKind::Peak => &[EntityKind::Region],
    EntityKind::Ascent => &[EntityKind::Peak],
    _ => &[],
  }
}

/// Type of column `name` on `kind`, including the identity column.
pub fn column_type(kind: EntityKind, name: &str) -> Option<ValueType> {
  if name == IDENTITY && !kind.is_link() {
    return Some(ValueType::Text);
  }
  base_columns(kind)
    .iter()
    .find(|c| c.name == name)
    .map(|c| c.value_type)
}

/// Read a stored column from a record. Unknown columns read as `None`.
pub fn base_value(record: &Record, column: &str) -> Value {
  match (record, column) {
    (Record::Country(r), "id") => r.id.into(),
    (Record::Country(r), "name") => r.name.as_str().into(),

    (Record::Range(r), "id") => r.id.into(),
    (Record::Range(r), "name") => r.name.as_str().into(),
    (Record::Range(r), "continent") => {
      r.continent.map_or(Value::None, |c| Value::Text(c.to_string()))
    }

    (Record::Region(r), "id") => r.id.into(),
    (Record::Region(r), "name") => r.name.as_str().into(),
    (Record::Region(r), "range_id") => r.range_id.into(),
    (Record::Region(r), "country_id") => r.country_id.into(),

    (Record::Peak(r), "id") => r.id.into(),
    (Record::Peak(r), "name") => r.name.as_str().into(),
    (Record::Peak(r), "height") => r.height.into(),
    (Record::Peak(r), "is_volcano") => r.is_volcano.into(),
    (Record::Peak(r), "region_id") => r.region_id.into(),
    (Record::Peak(r), "maps_link") => r.maps_link.as_deref().into(),
    (Record::Peak(r), "earth_link") => r.earth_link.as_deref().into(),
    (Record::Peak(r), "wiki_link") => r.wiki_link.as_deref().into(),

    (Record::Trip(r), "id") => r.id.into(),
    (Record::Trip(r), "name") => r.name.as_str().into(),
    (Record::Trip(r), "start_date") => r.start_date.into(),
    (Record::Trip(r), "end_date") => r.end_date.into(),
    (Record::Trip(r), "days") => match (r.start_date, r.end_date) {
      (Some(start), Some(end)) => Value::Int((end - start).num_days() + 1),
      _ => Value::None,
    },
    (Record::Trip(r), "description") => r.description.as_deref().into(),

    (Record::Hiker(r), "id") => r.id.into(),
    (Record::Hiker(r), "name") => r.name.as_str().into(),

    (Record::Ascent(r), "id") => r.id.into(),
    (Record::Ascent(r), "title") => r.title.as_deref().into(),
    (Record::Ascent(r), "peak_id") => r.peak_id.into(),
    (Record::Ascent(r), "date") => r.date.into(),
    (Record::Ascent(r), "time") => r.time.into(),
    (Record::Ascent(r), "elevation_gain") => r.elevation_gain.into(),
    (Record::Ascent(r), "kind") => Value::Text(r.kind.to_string()),
    (Record::Ascent(r), "is_traverse") => r.is_traverse.into(),
    (Record::Ascent(r), "difficulty_system") => r
      .difficulty
      .as_ref()
      .map_or(Value::None, |d| Value::Text(d.system.to_string())),
    (Record::Ascent(r), "difficulty_grade") => {
      r.difficulty.as_ref().and_then(|d| d.grade.as_deref()).into()
    }
    (Record::Ascent(r), "trip_id") => r.trip_id.into(),
    (Record::Ascent(r), "description") => r.description.as_deref().into(),

    (Record::Participation(r), "ascent_id") => r.ascent_id.into(),
    (Record::Participation(r), "hiker_id") => r.hiker_id.into(),

    (Record::Photo(r), "id") => r.id.into(),
    (Record::Photo(r), "ascent_id") => r.ascent_id.into(),
    (Record::Photo(r), "sort_index") => r.sort_index.into(),
    (Record::Photo(r), "file_path") => r.file_path.as_str().into(),
    (Record::Photo(r), "description") => r.description.as_deref().into(),

    _ => Value::None,
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use strum::IntoEnumIterator as _;
  use summit_core::entity::Trip;

  use super::*;

  #[test]
  fn every_table_has_identity_except_links() {
    for kind in EntityKind::iter() {
      assert_eq!(
        column_type(kind, IDENTITY).is_some(),
        !kind.is_link(),
        "{kind}"
      );
    }
  }

  #[test]
  fn trip_days_include_both_ends() {
    let trip = Record::Trip(Trip {
      id:          1,
      name:        "Wallis".into(),
      start_date:  NaiveDate::from_ymd_opt(2024, 8, 1),
      end_date:    NaiveDate::from_ymd_opt(2024, 8, 3),
      description: None,
    });
    assert_eq!(base_value(&trip, "days"), Value::Int(3));
    assert_eq!(base_value(&trip, "nonsense"), Value::None);
  }
}
