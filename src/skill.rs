//! Skill, grade and stage vocabulary shared by the generator, the mastery
//! tracker and the battle loop.

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Lowest difficulty stage.
pub const MIN_STAGE: u8 = 1;
/// Highest difficulty stage (also the mastery level cap).
pub const MAX_STAGE: u8 = 5;

/// Clamp any stage request into `MIN_STAGE..=MAX_STAGE`.
pub fn clamp_stage(stage: u8) -> u8 {
    stage.clamp(MIN_STAGE, MAX_STAGE)
}

/// School grade the curriculum targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Grade {
    Second,
    Third,
}

impl Grade {
    pub fn number(self) -> u8 {
        match self {
            Grade::Second => 2,
            Grade::Third => 3,
        }
    }
}

impl TryFrom<u8> for Grade {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Grade::Second),
            3 => Ok(Grade::Third),
            other => Err(GameError::UnsupportedGrade(other)),
        }
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.number()
    }
}

/// Every math skill the generator knows how to synthesize.
///
/// The plain and suffixed variants (e.g. `Addition` / `AdditionCarry`) share
/// ranges; the suffixed one adds a structural constraint on the operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkillType {
    Addition,
    AdditionCarry,
    Subtraction,
    SubtractionBorrow,
    Comparison,
    ClockReading,
    MoneyCounting,
    EvenOdd,
    Multiplication,
    MultiplicationArray,
    Division,
    DivisionBasic,
    WordProblem,
    UnitConversion,
    DataReading,
}

impl SkillType {
    pub const ALL: [SkillType; 15] = [
        SkillType::Addition,
        SkillType::AdditionCarry,
        SkillType::Subtraction,
        SkillType::SubtractionBorrow,
        SkillType::Comparison,
        SkillType::ClockReading,
        SkillType::MoneyCounting,
        SkillType::EvenOdd,
        SkillType::Multiplication,
        SkillType::MultiplicationArray,
        SkillType::Division,
        SkillType::DivisionBasic,
        SkillType::WordProblem,
        SkillType::UnitConversion,
        SkillType::DataReading,
    ];

    /// Stable key used in stats, badges and the blueprint.
    pub fn key(self) -> &'static str {
        match self {
            SkillType::Addition => "addition",
            SkillType::AdditionCarry => "addition_carry",
            SkillType::Subtraction => "subtraction",
            SkillType::SubtractionBorrow => "subtraction_borrow",
            SkillType::Comparison => "comparison",
            SkillType::ClockReading => "clock_reading",
            SkillType::MoneyCounting => "money_counting",
            SkillType::EvenOdd => "even_odd",
            SkillType::Multiplication => "multiplication",
            SkillType::MultiplicationArray => "multiplication_array",
            SkillType::Division => "division",
            SkillType::DivisionBasic => "division_basic",
            SkillType::WordProblem => "word_problem",
            SkillType::UnitConversion => "unit_conversion",
            SkillType::DataReading => "data_reading",
        }
    }

    pub fn parse(key: &str) -> Option<SkillType> {
        SkillType::ALL.iter().copied().find(|s| s.key() == key)
    }
}

/// Subject a recorded answer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Kokugo,
    Math,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_skill_key_parses_back() {
        for skill in SkillType::ALL {
            assert_eq!(SkillType::parse(skill.key()), Some(skill));
        }
        assert_eq!(SkillType::parse("additon"), None);
    }

    #[test]
    fn grade_round_trips_through_number() {
        assert_eq!(Grade::try_from(2), Ok(Grade::Second));
        assert_eq!(Grade::try_from(4), Err(GameError::UnsupportedGrade(4)));
        let json = serde_json::to_string(&Grade::Third).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn stage_is_clamped() {
        assert_eq!(clamp_stage(0), 1);
        assert_eq!(clamp_stage(9), 5);
        assert_eq!(clamp_stage(3), 3);
    }
}
