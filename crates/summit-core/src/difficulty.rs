//! Difficulty scales and grades.
//!
//! A grade only means something inside its scale, so the two travel together
//! as a [`Difficulty`]. An ascent may name a scale without a grade, but never
//! a grade without a scale.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::ValidationError;

/// A grading scale for the difficulty of an ascent.
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
pub enum DifficultySystem {
  /// SAC hiking scale.
  SacHiking,
  /// SAC mountaineering scale.
  SacAlpine,
  Uiaa,
  SkiTour,
  Snowshoe,
  ViaFerrata,
}

impl DifficultySystem {
  /// Grades of this scale, easiest first.
  pub fn grades(self) -> &'static [&'static str] {
    match self {
      Self::SacHiking => &["T1", "T2", "T3", "T4", "T5", "T6"],
      Self::SacAlpine => &["F", "PD", "AD", "D", "TD", "ED", "EX"],
      Self::Uiaa => &[
        "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
      ],
      Self::SkiTour => &["L", "WS", "ZS", "S", "SS", "AS", "EX"],
      Self::Snowshoe => &["WT1", "WT2", "WT3", "WT4", "WT5", "WT6"],
      Self::ViaFerrata => &["K1", "K2", "K3", "K4", "K5", "K6"],
    }
  }

  /// Human-readable scale name.
  pub fn label(self) -> &'static str {
    match self {
      Self::SacHiking => "SAC hiking scale",
      Self::SacAlpine => "SAC alpine scale",
      Self::Uiaa => "UIAA scale",
      Self::SkiTour => "Ski tour scale",
      Self::Snowshoe => "Snowshoe scale",
      Self::ViaFerrata => "Via ferrata scale",
    }
  }
}

/// A scale, and optionally a grade on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difficulty {
  pub system: DifficultySystem,
  pub grade:  Option<String>,
}

impl Difficulty {
  /// Build a difficulty, rejecting grades that are not part of `system`.
  pub fn new(
    system: DifficultySystem,
    grade: impl Into<String>,
  ) -> Result<Self, ValidationError> {
    let difficulty = Self { system, grade: Some(grade.into()) };
    difficulty.validate()?;
    Ok(difficulty)
  }

  /// A scale with no grade chosen yet.
  pub fn ungraded(system: DifficultySystem) -> Self { Self { system, grade: None } }

  /// Position of the grade within its scale (0 = easiest).
  pub fn grade_index(&self) -> Option<usize> {
    let grade = self.grade.as_deref()?;
    self.system.grades().iter().position(|g| *g == grade)
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    match &self.grade {
      Some(grade) if self.grade_index().is_none() => {
        Err(ValidationError::GradeNotInSystem {
          system: self.system.to_string(),
          grade:  grade.clone(),
        })
      }
      _ => Ok(()),
    }
  }
}
