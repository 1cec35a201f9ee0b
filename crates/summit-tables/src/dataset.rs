//! An in-memory copy of every base table, indexed for join traversal.

use std::collections::{BTreeMap, HashMap};

use strum::IntoEnumIterator as _;
use summit_core::{
  entity::{EntityKind, Record},
  relation::ForeignKey,
  store::TableStore,
};

use crate::{
  Error, Result,
  catalog::{self, IDENTITY},
  graph::{Direction, ResolvedPath},
  value::Value,
};

/// All base table rows, keyed by kind and primary key.
///
/// Participation rows have no id of their own; they are numbered `1..=n` in
/// `(ascent_id, hiker_id)` order when loaded.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
  tables:   HashMap<EntityKind, BTreeMap<i64, Record>>,
  /// For every key: target id -> ids of the owning rows, ascending.
  backrefs: HashMap<ForeignKey, HashMap<i64, Vec<i64>>>,
}

impl Dataset {
  /// Read every table from `store`.
  pub async fn load<S: TableStore>(store: &S) -> Result<Self> {
    let mut records = Vec::new();
    for kind in EntityKind::iter() {
      records.extend(store.query_all(kind).await.map_err(Error::store)?);
    }
    let data = Self::from_records(records);
    tracing::debug!(
      rows = data.tables.values().map(BTreeMap::len).sum::<usize>(),
      "loaded dataset"
    );
    Ok(data)
  }

  pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
    let mut tables: HashMap<EntityKind, BTreeMap<i64, Record>> = HashMap::new();
    let mut links = Vec::new();

    for record in records {
      match record {
        Record::Participation(link) => links.push(link),
        record => {
          let Some(id) = record.id() else { continue };
          tables.entry(record.kind()).or_default().insert(id, record);
        }
      }
    }

    links.sort_by_key(|l| (l.ascent_id, l.hiker_id));
    links.dedup();
    let participation = tables.entry(EntityKind::Participation).or_default();
    for (n, link) in links.into_iter().enumerate() {
      participation.insert(n as i64 + 1, Record::Participation(link));
    }

    let mut backrefs: HashMap<ForeignKey, HashMap<i64, Vec<i64>>> =
      HashMap::new();
    for fk in ForeignKey::ALL {
      let index = backrefs.entry(fk).or_default();
      if let Some(rows) = tables.get(&fk.owner()) {
        for (id, record) in rows {
          if let Some(target) = record.foreign_key(fk) {
            index.entry(target).or_default().push(*id);
          }
        }
      }
    }

    Self { tables, backrefs }
  }

  pub fn get(&self, kind: EntityKind, id: i64) -> Option<&Record> {
    self.tables.get(&kind)?.get(&id)
  }

  /// Rows of `kind` in primary key order.
  pub fn rows(&self, kind: EntityKind) -> impl Iterator<Item = &Record> {
    self.tables.get(&kind).into_iter().flat_map(BTreeMap::values)
  }

  pub fn ids(&self, kind: EntityKind) -> Vec<i64> {
    self
      .tables
      .get(&kind)
      .map(|rows| rows.keys().copied().collect())
      .unwrap_or_default()
  }

  pub fn len(&self, kind: EntityKind) -> usize {
    self.tables.get(&kind).map_or(0, BTreeMap::len)
  }

  /// Ids of the rows reached from `root_id` along `path`.
  ///
  /// A row reached twice over different links is listed twice. References
  /// to rows that do not exist are dropped.
  pub fn traverse(&self, path: &ResolvedPath, root_id: i64) -> Vec<i64> {
    let mut current = vec![root_id];
    for step in &path.steps {
      let mut next = Vec::new();
      for id in current {
        match step.direction {
          Direction::Forward => {
            if let Some(target) = self
              .get(step.from(), id)
              .and_then(|r| r.foreign_key(step.fk))
              && self.get(step.to(), target).is_some()
            {
              next.push(target);
            }
          }
          Direction::Backward => {
            if let Some(owners) =
              self.backrefs.get(&step.fk).and_then(|ix| ix.get(&id))
            {
              next.extend_from_slice(owners);
            }
          }
        }
      }
      current = next;
    }
    current
  }

  /// Cell value of `column` on row `id` of `kind`.
  pub fn value(&self, kind: EntityKind, id: i64, column: &str) -> Value {
    if column == IDENTITY {
      return self.identity(kind, id).map_or(Value::None, Value::Text);
    }
    self
      .get(kind, id)
      .map_or(Value::None, |r| catalog::base_value(r, column))
  }

  /// Human-readable label of a row, built from its own fields and those of
  /// its parents.
  pub fn identity(&self, kind: EntityKind, id: i64) -> Option<String> {
    let label = match self.get(kind, id)? {
      Record::Country(r) => r.name.clone(),
      Record::Range(r) => r.name.clone(),
      Record::Hiker(r) => r.name.clone(),
      Record::Region(r) => match self.name_of(EntityKind::Range, r.range_id) {
        Some(range) => format!("{} ({range})", r.name),
        None => r.name.clone(),
      },
      Record::Peak(r) => {
        let mut extra = Vec::new();
        if let Some(height) = r.height {
          extra.push(format!("{height} m"));
        }
        if let Some(region) = self.name_of(EntityKind::Region, r.region_id) {
          extra.push(region.to_owned());
        }
        if extra.is_empty() {
          r.name.clone()
        } else {
          format!("{} ({})", r.name, extra.join(", "))
        }
      }
      Record::Trip(r) => match (r.start_date, r.end_date) {
        (Some(start), Some(end)) => format!(
          "{} ({} - {})",
          r.name,
          start.format("%Y-%m-%d"),
          end.format("%Y-%m-%d")
        ),
        _ => r.name.clone(),
      },
      Record::Ascent(r) => {
        let mut parts = Vec::new();
        if let Some(date) = r.date {
          parts.push(date.format("%Y-%m-%d").to_string());
        }
        match self.name_of(EntityKind::Peak, r.peak_id) {
          Some(peak) => parts.push(peak.to_owned()),
          None => parts.extend(r.title.clone()),
        }
        if parts.is_empty() {
          format!("#{}", r.id)
        } else {
          parts.join(" ")
        }
      }
      Record::Photo(r) => r.file_path.clone(),
      Record::Participation(_) => return None,
    };
    Some(label)
  }

  fn name_of(&self, kind: EntityKind, id: Option<i64>) -> Option<&str> {
    self.get(kind, id?)?.name()
  }
}

#[cfg(test)]
mod tests {
  use summit_core::entity::{Hiker, Participation, Peak, Range, Region};

  use super::*;
  use crate::graph::RelationshipGraph;

  fn sample() -> Dataset {
    Dataset::from_records([
      Record::Range(Range { id: 1, name: "Alpen".into(), continent: None }),
      Record::Region(Region {
        id:         2,
        name:       "Berner Alpen".into(),
        range_id:   Some(1),
        country_id: None,
      }),
      Record::Peak(Peak {
        id:         3,
        name:       "Eiger".into(),
        height:     Some(3967),
        is_volcano: false,
        region_id:  Some(2),
        maps_link:  None,
        earth_link: None,
        wiki_link:  None,
      }),
      Record::Peak(Peak {
        id:         4,
        name:       "Niesen".into(),
        height:     None,
        is_volcano: false,
        region_id:  Some(99),
        maps_link:  None,
        earth_link: None,
        wiki_link:  None,
      }),
      Record::Hiker(Hiker { id: 1, name: "Ada".into() }),
      Record::Participation(Participation { ascent_id: 7, hiker_id: 1 }),
    ])
  }

  #[test]
  fn identity_pulls_in_parent_names() {
    let data = sample();
    assert_eq!(
      data.identity(EntityKind::Peak, 3).as_deref(),
      Some("Eiger (3967 m, Berner Alpen)")
    );
    assert_eq!(
      data.identity(EntityKind::Region, 2).as_deref(),
      Some("Berner Alpen (Alpen)")
    );
    assert_eq!(data.identity(EntityKind::Peak, 4).as_deref(), Some("Niesen"));
  }

  #[test]
  fn dangling_references_are_dropped() {
    let data = sample();
    let graph = RelationshipGraph::new();
    let to_region = graph
      .resolve_path(EntityKind::Peak, EntityKind::Region)
      .unwrap();
    assert_eq!(data.traverse(to_region, 3), vec![2]);
    assert!(data.traverse(to_region, 4).is_empty());
  }

  #[test]
  fn backward_steps_collect_all_owners() {
    let data = sample();
    let graph = RelationshipGraph::new();
    let to_peaks = graph
      .resolve_path(EntityKind::Region, EntityKind::Peak)
      .unwrap();
    assert_eq!(data.traverse(to_peaks, 2), vec![3]);
    assert_eq!(data.len(EntityKind::Participation), 1);
  }
}
