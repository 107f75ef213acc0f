use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unknown grade level: {0:?}")]
pub struct ParseGradeError(pub String);

/// Grade levels offered by the school, in promotion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Grade {
    Nursery,
    Lkg,
    Ukg,
    I,
    II,
    III,
    IV,
    V,
    VI,
    VII,
    VIII,
    IX,
    X,
}

const ORDER: [Grade; 13] = [
    Grade::Nursery,
    Grade::Lkg,
    Grade::Ukg,
    Grade::I,
    Grade::II,
    Grade::III,
    Grade::IV,
    Grade::V,
    Grade::VI,
    Grade::VII,
    Grade::VIII,
    Grade::IX,
    Grade::X,
];

const ROMAN: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];

impl Grade {
    /// The grade a passing student moves up to; `None` for the final grade.
    pub fn next(self) -> Option<Grade> {
        let index = ORDER.iter().position(|g| *g == self)?;
        ORDER.get(index + 1).copied()
    }

    pub fn band(self) -> GradeBand {
        match self {
            Grade::Nursery | Grade::Lkg | Grade::Ukg | Grade::I | Grade::II => {
                GradeBand::Foundation
            }
            Grade::IX | Grade::X => GradeBand::Secondary,
            _ => GradeBand::Middle,
        }
    }

    pub fn policy(self) -> &'static BandPolicy {
        self.band().policy()
    }

    fn class_number(self) -> Option<usize> {
        ORDER
            .iter()
            .position(|g| *g == self)?
            .checked_sub(2)
            .filter(|n| *n > 0)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Nursery => write!(f, "Nursery"),
            Grade::Lkg => write!(f, "LKG"),
            Grade::Ukg => write!(f, "UKG"),
            other => match other.class_number() {
                Some(n) => write!(f, "Class {}", ROMAN[n - 1]),
                None => Ok(()),
            },
        }
    }
}

impl FromStr for Grade {
    type Err = ParseGradeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_lowercase();
        let bare = lowered
            .strip_prefix("class")
            .or_else(|| lowered.strip_prefix("grade"))
            .unwrap_or(&lowered)
            .trim();

        match bare {
            "nursery" => return Ok(Grade::Nursery),
            "lkg" => return Ok(Grade::Lkg),
            "ukg" => return Ok(Grade::Ukg),
            _ => {}
        }

        let class = match bare.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => ROMAN
                .iter()
                .position(|r| r.eq_ignore_ascii_case(bare))
                .map(|i| i + 1),
        };

        match class {
            Some(n @ 1..=10) => Ok(ORDER[n + 2]),
            _ => Err(ParseGradeError(value.to_string())),
        }
    }
}

impl TryFrom<String> for Grade {
    type Error = ParseGradeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Grade> for String {
    fn from(grade: Grade) -> Self {
        grade.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeBand {
    /// Nursery through Class II.
    Foundation,
    /// Class III through Class VIII.
    Middle,
    /// Class IX and Class X.
    Secondary,
}

/// Marking rules shared by every grade in a band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPolicy {
    /// Subjects carry separate exam and activity marks.
    pub has_activity: bool,
    /// A numeric subject fails below this mark. With an activity component
    /// the threshold applies to the exam portion alone.
    pub pass_mark: f64,
    /// Any failed subject fails the whole term.
    pub strict_fail: bool,
    /// A passing result is reported as a division instead of a letter grade.
    pub awards_division: bool,
}

const FOUNDATION: BandPolicy = BandPolicy {
    has_activity: false,
    pass_mark: 35.0,
    strict_fail: true,
    awards_division: false,
};

const MIDDLE: BandPolicy = BandPolicy {
    has_activity: true,
    pass_mark: 20.0,
    strict_fail: false,
    awards_division: false,
};

const SECONDARY: BandPolicy = BandPolicy {
    has_activity: false,
    pass_mark: 33.0,
    strict_fail: false,
    awards_division: true,
};

impl GradeBand {
    pub fn policy(self) -> &'static BandPolicy {
        match self {
            GradeBand::Foundation => &FOUNDATION,
            GradeBand::Middle => &MIDDLE,
            GradeBand::Secondary => &SECONDARY,
        }
    }
}
