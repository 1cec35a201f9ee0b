//! The foreign-key catalog of the schema.
//!
//! Every relation between base tables is one of these keys. Many-to-many
//! relations (ascents and hikers) go through the participation link table
//! and are therefore two keys.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{delete::Effect, entity::EntityKind};

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
pub enum ForeignKey {
  RegionRange,
  RegionCountry,
  PeakRegion,
  AscentPeak,
  AscentTrip,
  ParticipationAscent,
  ParticipationHiker,
  PhotoAscent,
}

impl ForeignKey {
  /// All keys in declaration order. Graph construction relies on this order
  /// being fixed.
  pub const ALL: [Self; 8] = [
    Self::RegionRange,
    Self::RegionCountry,
    Self::PeakRegion,
    Self::AscentPeak,
    Self::AscentTrip,
    Self::ParticipationAscent,
    Self::ParticipationHiker,
    Self::PhotoAscent,
  ];

  /// The table that holds the key column.
  pub fn owner(self) -> EntityKind {
    match self {
      Self::RegionRange | Self::RegionCountry => EntityKind::Region,
      Self::PeakRegion => EntityKind::Peak,
      Self::AscentPeak | Self::AscentTrip => EntityKind::Ascent,
      Self::ParticipationAscent | Self::ParticipationHiker => {
        EntityKind::Participation
      }
      Self::PhotoAscent => EntityKind::Photo,
    }
  }

  /// The table the key points at.
  pub fn target(self) -> EntityKind {
    match self {
      Self::RegionRange => EntityKind::Range,
      Self::RegionCountry => EntityKind::Country,
      Self::PeakRegion => EntityKind::Region,
      Self::AscentPeak => EntityKind::Peak,
      Self::ParticipationAscent | Self::PhotoAscent => EntityKind::Ascent,
      Self::AscentTrip => EntityKind::Trip,
      Self::ParticipationHiker => EntityKind::Hiker,
    }
  }

  /// Column name in the owning table.
  pub fn column(self) -> &'static str {
    match self {
      Self::RegionRange => "range_id",
      Self::RegionCountry => "country_id",
      Self::PeakRegion => "region_id",
      Self::AscentPeak => "peak_id",
      Self::AscentTrip => "trip_id",
      Self::ParticipationAscent | Self::PhotoAscent => "ascent_id",
      Self::ParticipationHiker => "hiker_id",
    }
  }

  /// Whether the owning row is required to reference a target.
  pub fn is_required(self) -> bool {
    matches!(
      self,
      Self::ParticipationAscent | Self::ParticipationHiker | Self::PhotoAscent
    )
  }

  /// What happens to owning rows when the target row is deleted.
  pub fn on_delete(self) -> Effect {
    if self.is_required() { Effect::Cascade } else { Effect::Unlink }
  }

  /// Keys pointing at `kind`.
  pub fn referencing(kind: EntityKind) -> impl Iterator<Item = Self> {
    Self::ALL.into_iter().filter(move |fk| fk.target() == kind)
  }

  /// Keys owned by `kind`.
  pub fn owned_by(kind: EntityKind) -> impl Iterator<Item = Self> {
    Self::ALL.into_iter().filter(move |fk| fk.owner() == kind)
  }
}
