//! The relationship graph: how to get from one table to another.
//!
//! Built once from the foreign-key catalog. For every ordered pair of
//! tables the shortest join path is precomputed; ties are broken by the
//! declaration order of the keys so that paths are stable across runs.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use summit_core::{entity::EntityKind, relation::ForeignKey};

use crate::{Error, Result};

/// Which way a join step follows its foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  /// From the owning row to the row it references (to-one).
  Forward,
  /// From a referenced row to all rows referencing it (to-many).
  Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinStep {
  pub fk:        ForeignKey,
  pub direction: Direction,
}

impl JoinStep {
  pub fn from(self) -> EntityKind {
    match self.direction {
      Direction::Forward => self.fk.owner(),
      Direction::Backward => self.fk.target(),
    }
  }

  pub fn to(self) -> EntityKind {
    match self.direction {
      Direction::Forward => self.fk.target(),
      Direction::Backward => self.fk.owner(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
  /// At most one related row.
  One,
  /// Any number of related rows.
  Many,
}

/// An ordered list of join steps between two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
  pub from:  EntityKind,
  pub to:    EntityKind,
  pub steps: Vec<JoinStep>,
}

impl ResolvedPath {
  pub fn cardinality(&self) -> Cardinality {
    if self.steps.iter().any(|s| s.direction == Direction::Backward) {
      Cardinality::Many
    } else {
      Cardinality::One
    }
  }

  /// Every table the path reads, including both ends.
  pub fn tables(&self) -> impl Iterator<Item = EntityKind> + '_ {
    std::iter::once(self.from).chain(self.steps.iter().map(|s| s.to()))
  }
}

/// Static adjacency of the schema with all shortest paths precomputed.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
  paths: HashMap<(EntityKind, EntityKind), ResolvedPath>,
}

impl Default for RelationshipGraph {
  fn default() -> Self { Self::new() }
}

impl RelationshipGraph {
  pub fn new() -> Self {
    let mut paths = HashMap::new();
    for from in EntityKind::iter().filter(|k| !k.is_link()) {
      for (to, steps) in shortest_paths(from) {
        if !to.is_link() {
          paths.insert((from, to), ResolvedPath { from, to, steps });
        }
      }
    }
    Self { paths }
  }

  /// Join steps from `from` to `to`. Link tables are never an end point.
  pub fn resolve_path(
    &self,
    from: EntityKind,
    to: EntityKind,
  ) -> Result<&ResolvedPath> {
    self
      .paths
      .get(&(from, to))
      .ok_or(Error::UnknownPath { from, to })
  }
}

/// Steps leaving `kind`, in key declaration order.
fn neighbours(kind: EntityKind) -> impl Iterator<Item = JoinStep> {
  ForeignKey::ALL.into_iter().flat_map(move |fk| {
    let forward = (fk.owner() == kind).then_some(JoinStep {
      fk,
      direction: Direction::Forward,
    });
    let backward = (fk.target() == kind).then_some(JoinStep {
      fk,
      direction: Direction::Backward,
    });
    forward.into_iter().chain(backward)
  })
}

/// Breadth-first search from `from` over the key graph.
fn shortest_paths(from: EntityKind) -> HashMap<EntityKind, Vec<JoinStep>> {
  let mut found: HashMap<EntityKind, Vec<JoinStep>> = HashMap::new();
  found.insert(from, Vec::new());
  let mut queue = VecDeque::from([from]);

  while let Some(kind) = queue.pop_front() {
    let here = found[&kind].clone();
    for step in neighbours(kind) {
      let next = step.to();
      if found.contains_key(&next) {
        continue;
      }
      let mut steps = here.clone();
      steps.push(step);
      found.insert(next, steps);
      queue.push_back(next);
    }
  }
  found
}

#[cfg(test)]
mod tests {
  use super::*;

  fn path(from: EntityKind, to: EntityKind) -> Vec<EntityKind> {
    let graph = RelationshipGraph::new();
    graph.resolve_path(from, to).unwrap().tables().collect()
  }

  #[test]
  fn photo_reaches_country_through_ascent_peak_region() {
    assert_eq!(path(EntityKind::Photo, EntityKind::Country), vec![
      EntityKind::Photo,
      EntityKind::Ascent,
      EntityKind::Peak,
      EntityKind::Region,
      EntityKind::Country,
    ]);
    let graph = RelationshipGraph::new();
    assert_eq!(
      graph
        .resolve_path(EntityKind::Photo, EntityKind::Country)
        .unwrap()
        .cardinality(),
      Cardinality::One
    );
  }

  #[test]
  fn ascent_to_hiker_goes_through_participation() {
    assert_eq!(path(EntityKind::Ascent, EntityKind::Hiker), vec![
      EntityKind::Ascent,
      EntityKind::Participation,
      EntityKind::Hiker,
    ]);
    let graph = RelationshipGraph::new();
    assert_eq!(
      graph
        .resolve_path(EntityKind::Ascent, EntityKind::Hiker)
        .unwrap()
        .cardinality(),
      Cardinality::Many
    );
  }

  #[test]
  fn trip_reaches_peaks_through_ascents() {
    assert_eq!(path(EntityKind::Trip, EntityKind::Peak), vec![
      EntityKind::Trip,
      EntityKind::Ascent,
      EntityKind::Peak,
    ]);
  }

  #[test]
  fn self_path_is_empty_and_to_one() {
    let graph = RelationshipGraph::new();
    let p = graph.resolve_path(EntityKind::Peak, EntityKind::Peak).unwrap();
    assert!(p.steps.is_empty());
    assert_eq!(p.cardinality(), Cardinality::One);
  }

  #[test]
  fn link_table_is_not_an_end_point() {
    let graph = RelationshipGraph::new();
    let err = graph
      .resolve_path(EntityKind::Ascent, EntityKind::Participation)
      .unwrap_err();
    assert!(matches!(err, Error::UnknownPath { .. }));
  }
}
