//! The columns every composite table starts with.
//!
//! Built-in columns can be hidden but never removed.

use summit_core::entity::EntityKind;

use crate::{
  descriptor::ColumnDescriptor as C,
  fold::Fold,
};

use EntityKind::{Ascent, Country, Hiker, Peak, Photo, Range, Region, Trip};

/// Built-in descriptors of the table rooted at `root`, in display order.
pub fn builtin_columns(root: EntityKind) -> Vec<C> {
  match root {
    Ascent => vec![
      C::new("Date", Ascent, "date"),
      C::new("Time", Ascent, "time"),
      C::new("Peak", Peak, "name"),
      C::new("Title", Ascent, "title"),
      C::new("Height", Peak, "height").with_suffix(" m"),
      C::new("Elevation gain", Ascent, "elevation_gain").with_suffix(" m"),
      C::new("Kind", Ascent, "kind"),
      C::new("Traverse", Ascent, "is_traverse"),
      C::new("Difficulty system", Ascent, "difficulty_system"),
      C::new("Difficulty", Ascent, "difficulty_grade"),
      C::new("Region", Region, "name"),
      C::new("Range", Range, "name"),
      C::new("Country", Country, "name"),
      C::new("Trip", Trip, "name"),
      C::new("Hikers", Hiker, "name").folded(Fold::List),
      C::new("Photos", Photo, "id").folded(Fold::Count),
    ],
    Peak => vec![
      C::new("Name", Peak, "name"),
      C::new("Height", Peak, "height").with_suffix(" m"),
      C::new("Volcano", Peak, "is_volcano"),
      C::new("Region", Region, "name"),
      C::new("Range", Range, "name"),
      C::new("Country", Country, "name"),
      C::new("Num. ascents", Ascent, "id").folded(Fold::Count),
      C::new("Hikers", Hiker, "name").folded(Fold::List),
    ],
    Trip => vec![
      C::new("Name", Trip, "name"),
      C::new("Start", Trip, "start_date"),
      C::new("End", Trip, "end_date"),
      C::new("Days", Trip, "days"),
      C::new("Num. ascents", Ascent, "id").folded(Fold::Count),
      C::new("Total gain", Ascent, "elevation_gain")
        .folded(Fold::Sum)
        .with_suffix(" m"),
      C::new("Hikers", Hiker, "name").folded(Fold::List),
      C::new("Description", Trip, "description"),
    ],
    Hiker => vec![
      C::new("Name", Hiker, "name"),
      C::new("Num. ascents", Ascent, "id").folded(Fold::Count),
      C::new("Highest peak", Peak, "height")
        .folded(Fold::Max)
        .with_suffix(" m"),
      C::new("Total gain", Ascent, "elevation_gain")
        .folded(Fold::Sum)
        .with_suffix(" m"),
    ],
    Region => vec![
      C::new("Name", Region, "name"),
      C::new("Range", Range, "name"),
      C::new("Country", Country, "name"),
      C::new("Num. peaks", Peak, "id").folded(Fold::Count),
      C::new("Num. ascents", Ascent, "id").folded(Fold::Count),
    ],
    Range => vec![
      C::new("Name", Range, "name"),
      C::new("Continent", Range, "continent"),
      C::new("Num. regions", Region, "id").folded(Fold::Count),
      C::new("Num. peaks", Peak, "id").folded(Fold::Count),
    ],
    Country => vec![
      C::new("Name", Country, "name"),
      C::new("Num. regions", Region, "id").folded(Fold::Count),
      C::new("Num. peaks", Peak, "id").folded(Fold::Count),
    ],
    Photo => vec![
      C::identity("Ascent", Ascent),
      C::new("Index", Photo, "sort_index"),
      C::new("File", Photo, "file_path"),
      C::new("Description", Photo, "description"),
      C::new("Peak", Peak, "name"),
    ],
    EntityKind::Participation => Vec::new(),
  }
}
