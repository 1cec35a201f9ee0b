//! Entity records: the rows of the base tables.
//!
//! Every entity except [`Participation`] is keyed by an integer `id` assigned
//! by the store. Foreign keys are nullable unless noted otherwise.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{ValidationError, difficulty::Difficulty, relation::ForeignKey};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// The base tables of the schema.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Country,
  Range,
  Region,
  Peak,
  Trip,
  Hiker,
  Ascent,
  /// Link table between ascents and hikers; has no id of its own.
  Participation,
  Photo,
}

impl EntityKind {
  /// Link tables can be traversed but are never shown as a table of their own.
  pub fn is_link(self) -> bool { matches!(self, Self::Participation) }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Continent {
  Europe,
  Asia,
  Africa,
  NorthAmerica,
  SouthAmerica,
  Oceania,
  Antarctica,
}

/// How an ascent was made.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HikeKind {
  #[default]
  Normal,
  SnowHike,
  Snowshoe,
  SkiTour,
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
  pub id:   i64,
  pub name: String,
}

/// A mountain range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
  pub id:        i64,
  pub name:      String,
  pub continent: Option<Continent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
  pub id:         i64,
  pub name:       String,
  pub range_id:   Option<i64>,
  pub country_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
  pub id:         i64,
  pub name:       String,
  /// Meters above sea level.
  pub height:     Option<i64>,
  pub is_volcano: bool,
  pub region_id:  Option<i64>,
  pub maps_link:  Option<String>,
  pub earth_link: Option<String>,
  pub wiki_link:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
  pub id:          i64,
  pub name:        String,
  /// Set together with `end_date` or not at all.
  pub start_date:  Option<NaiveDate>,
  pub end_date:    Option<NaiveDate>,
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hiker {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ascent {
  pub id:             i64,
  pub title:          Option<String>,
  pub peak_id:        Option<i64>,
  pub date:           Option<NaiveDate>,
  pub time:           Option<NaiveTime>,
  /// Meters climbed.
  pub elevation_gain: Option<i64>,
  pub kind:           HikeKind,
  pub is_traverse:    bool,
  pub difficulty:     Option<Difficulty>,
  pub trip_id:        Option<i64>,
  pub description:    Option<String>,
}

/// Links a hiker to an ascent they took part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
  pub ascent_id: i64,
  pub hiker_id:  i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
  pub id:          i64,
  pub ascent_id:   i64,
  /// Position among the photos of the same ascent, contiguous from 0.
  pub sort_index:  i64,
  /// May point at a file that no longer exists.
  pub file_path:   String,
  pub description: Option<String>,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A row of any base table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "row", rename_all = "snake_case")]
pub enum Record {
  Country(Country),
  Range(Range),
  Region(Region),
  Peak(Peak),
  Trip(Trip),
  Hiker(Hiker),
  Ascent(Ascent),
  Participation(Participation),
  Photo(Photo),
}

impl Record {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Country(_) => EntityKind::Country,
      Self::Range(_) => EntityKind::Range,
      Self::Region(_) => EntityKind::Region,
      Self::Peak(_) => EntityKind::Peak,
      Self::Trip(_) => EntityKind::Trip,
      Self::Hiker(_) => EntityKind::Hiker,
      Self::Ascent(_) => EntityKind::Ascent,
      Self::Participation(_) => EntityKind::Participation,
      Self::Photo(_) => EntityKind::Photo,
    }
  }

  /// Primary key; `None` for link rows.
  pub fn id(&self) -> Option<i64> {
    match self {
      Self::Country(r) => Some(r.id),
      Self::Range(r) => Some(r.id),
      Self::Region(r) => Some(r.id),
      Self::Peak(r) => Some(r.id),
      Self::Trip(r) => Some(r.id),
      Self::Hiker(r) => Some(r.id),
      Self::Ascent(r) => Some(r.id),
      Self::Participation(_) => None,
      Self::Photo(r) => Some(r.id),
    }
  }

  /// Overwrite the primary key. No-op for link rows.
  pub fn set_id(&mut self, id: i64) {
    match self {
      Self::Country(r) => r.id = id,
      Self::Range(r) => r.id = id,
      Self::Region(r) => r.id = id,
      Self::Peak(r) => r.id = id,
      Self::Trip(r) => r.id = id,
      Self::Hiker(r) => r.id = id,
      Self::Ascent(r) => r.id = id,
      Self::Participation(_) => {}
      Self::Photo(r) => r.id = id,
    }
  }

  /// The record's required display name, for kinds that have one.
  pub fn name(&self) -> Option<&str> {
    match self {
      Self::Country(r) => Some(&r.name),
      Self::Range(r) => Some(&r.name),
      Self::Region(r) => Some(&r.name),
      Self::Peak(r) => Some(&r.name),
      Self::Trip(r) => Some(&r.name),
      Self::Hiker(r) => Some(&r.name),
      Self::Ascent(_) | Self::Participation(_) | Self::Photo(_) => None,
    }
  }

  /// Value of the foreign key `fk` if this record owns it and it is set.
  pub fn foreign_key(&self, fk: ForeignKey) -> Option<i64> {
    match (self, fk) {
      (Self::Region(r), ForeignKey::RegionRange) => r.range_id,
      (Self::Region(r), ForeignKey::RegionCountry) => r.country_id,
      (Self::Peak(r), ForeignKey::PeakRegion) => r.region_id,
      (Self::Ascent(r), ForeignKey::AscentPeak) => r.peak_id,
      (Self::Ascent(r), ForeignKey::AscentTrip) => r.trip_id,
      (Self::Participation(r), ForeignKey::ParticipationAscent) => {
        Some(r.ascent_id)
      }
      (Self::Participation(r), ForeignKey::ParticipationHiker) => {
        Some(r.hiker_id)
      }
      (Self::Photo(r), ForeignKey::PhotoAscent) => Some(r.ascent_id),
      _ => None,
    }
  }

  /// Field-level checks that do not need the store.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if let Some(name) = self.name()
      && name.trim().is_empty()
    {
      return Err(ValidationError::MissingField {
        kind:  self.kind(),
        field: "name",
      });
    }

    match self {
      Self::Trip(trip) => match (trip.start_date, trip.end_date) {
        (Some(start), Some(end)) if start > end => {
          Err(ValidationError::InvertedDateRange { start, end })
        }
        (Some(_), None) | (None, Some(_)) => {
          Err(ValidationError::HalfOpenDateRange {
            start: trip.start_date,
            end:   trip.end_date,
          })
        }
        _ => Ok(()),
      },
      Self::Ascent(ascent) => match &ascent.difficulty {
        Some(difficulty) => difficulty.validate(),
        None => Ok(()),
      },
      Self::Photo(photo) => {
        if photo.file_path.trim().is_empty() {
          Err(ValidationError::MissingField {
            kind:  EntityKind::Photo,
            field: "file_path",
          })
        } else if photo.sort_index < 0 {
          Err(ValidationError::NegativeSortIndex(photo.sort_index))
        } else {
          Ok(())
        }
      }
      _ => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::difficulty::DifficultySystem;

  fn trip(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Record {
    Record::Trip(Trip {
      id: 0,
      name: "Engadin".into(),
      start_date: start,
      end_date: end,
      description: None,
    })
  }

  fn date(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 7, d).unwrap() }

  #[test]
  fn blank_name_is_rejected() {
    let err = Record::Hiker(Hiker { id: 0, name: "  ".into() })
      .validate()
      .unwrap_err();
    assert_eq!(err, ValidationError::MissingField {
      kind:  EntityKind::Hiker,
      field: "name",
    });
  }

  #[test]
  fn trip_dates_both_or_neither() {
    assert!(trip(None, None).validate().is_ok());
    assert!(trip(Some(date(1)), Some(date(3))).validate().is_ok());
    assert!(trip(Some(date(3)), Some(date(3))).validate().is_ok());
    assert!(matches!(
      trip(Some(date(1)), None).validate(),
      Err(ValidationError::HalfOpenDateRange { .. })
    ));
    assert!(matches!(
      trip(Some(date(4)), Some(date(2))).validate(),
      Err(ValidationError::InvertedDateRange { .. })
    ));
  }

  #[test]
  fn ascent_grade_is_checked_against_its_system() {
    let mut ascent = Ascent {
      id:             0,
      title:          None,
      peak_id:        None,
      date:           None,
      time:           None,
      elevation_gain: None,
      kind:           HikeKind::Normal,
      is_traverse:    false,
      difficulty:     Some(Difficulty {
        system: DifficultySystem::SacAlpine,
        grade:  Some("T3".into()),
      }),
      trip_id:        None,
      description:    None,
    };
    assert!(Record::Ascent(ascent.clone()).validate().is_err());

    ascent.difficulty = Some(Difficulty {
      system: DifficultySystem::SacAlpine,
      grade:  Some("PD".into()),
    });
    assert!(Record::Ascent(ascent).validate().is_ok());
  }

  #[test]
  fn foreign_keys_are_read_from_the_owning_record() {
    let region = Record::Region(Region {
      id:         4,
      name:       "Seealpen".into(),
      range_id:   Some(2),
      country_id: None,
    });
    assert_eq!(region.foreign_key(ForeignKey::RegionRange), Some(2));
    assert_eq!(region.foreign_key(ForeignKey::RegionCountry), None);
    assert_eq!(region.foreign_key(ForeignKey::PeakRegion), None);
  }
}
