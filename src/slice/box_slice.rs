use std::fmt;
use std::str::FromStr;

use crate::utils::error::BoxError;

/// A `begin:end:step` selection along one axis.
///
/// `BoxSlice::NOP` in `begin` or `end` means "natural bound for the step
/// direction". Negative positions count from the end of the axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoxSlice {
    pub begin: i32,
    pub end: i32,
    pub step: i32,
}

/// A slice bound to a concrete axis length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    pub begin: u32,
    pub count: u32,
    pub step: i32,
}

impl BoxSlice {
    pub const NOP: i32 = i32::MAX;

    pub const fn new(begin: i32, end: i32, step: i32) -> Self {
        Self { begin, end, step }
    }

    pub const fn all() -> Self {
        Self::new(Self::NOP, Self::NOP, 1)
    }

    pub const fn range(begin: i32, end: i32) -> Self {
        Self::new(begin, end, 1)
    }

    /// The single position `index`, keeping the axis with length one.
    /// `NOP` is not a position and yields an empty selection.
    pub const fn index(index: i32) -> Self {
        match index {
            -1 => Self::new(index, Self::NOP, 1),
            Self::NOP => Self::new(0, 0, 1),
            _ => Self::new(index, index + 1, 1),
        }
    }

    pub const fn reversed() -> Self {
        Self::new(Self::NOP, Self::NOP, -1)
    }

    pub fn resolve(&self, len: u32) -> Result<ResolvedRange, BoxError> {
        if self.step == 0 {
            return Err(BoxError::IllegalArgs("Slice step cannot be zero".to_string()));
        }

        let len = len as i64;
        let from_end = |v: i32| if v < 0 { len + v as i64 } else { v as i64 };

        let (begin, end) = if self.step > 0 {
            let begin = if self.begin == Self::NOP { 0 } else { from_end(self.begin) };
            let end = if self.end == Self::NOP {
                len
            } else {
                from_end(self.end).min(len)
            };
            (begin, end)
        } else {
            let begin = if self.begin == Self::NOP {
                len - 1
            } else {
                from_end(self.begin)
            };
            let end = if self.end == Self::NOP {
                -1
            } else {
                from_end(self.end).max(-1)
            };
            (begin, end)
        };

        if begin < 0 || begin >= len {
            return Err(BoxError::IllegalArgs(format!(
                "Slice {} begins outside axis of length {}",
                self, len
            )));
        }

        let step = self.step as i64;
        let span = end - begin;
        if span == 0 || span.signum() != step.signum() {
            return Err(BoxError::IllegalArgs(format!(
                "Slice {} selects nothing from axis of length {}",
                self, len
            )));
        }

        let count = (span.abs() + step.abs() - 1) / step.abs();
        Ok(ResolvedRange {
            begin: begin as u32,
            count: count as u32,
            step: self.step,
        })
    }

    /// Parses `begin:end:step`, any part may be blank. A bare integer `i`
    /// selects the single position `i`.
    pub fn parse(text: &str) -> Result<Self, BoxError> {
        let text = text.trim();
        let parts: Vec<&str> = text.split(':').collect();

        let field = |s: &str, default: i32| -> Result<i32, BoxError> {
            let s = s.trim();
            if s.is_empty() {
                return Ok(default);
            }
            s.parse::<i32>().map_err(|e| {
                BoxError::IllegalArgs(format!("Bad slice field '{}': {}", s, e))
            })
        };

        match parts.as_slice() {
            &[single] if !single.trim().is_empty() => match field(single, 0)? {
                Self::NOP => Err(BoxError::IllegalArgs(format!(
                    "Slice index {} is reserved",
                    Self::NOP
                ))),
                index => Ok(Self::index(index)),
            },
            &[begin, end] => Ok(Self::new(
                field(begin, Self::NOP)?,
                field(end, Self::NOP)?,
                1,
            )),
            &[begin, end, step] => Ok(Self::new(
                field(begin, Self::NOP)?,
                field(end, Self::NOP)?,
                field(step, 1)?,
            )),
            _ => Err(BoxError::IllegalArgs(format!("Bad slice text '{}'", text))),
        }
    }

    /// Comma separated list of slices, one per axis starting at axis 0.
    pub fn parse_list(text: &str) -> Result<Vec<Self>, BoxError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        text.split(',').map(Self::parse).collect()
    }

    /// Inverse of `parse_list`.
    pub fn to_text(slices: &[BoxSlice]) -> String {
        slices
            .iter()
            .map(BoxSlice::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for BoxSlice {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for BoxSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |v: i32| {
            if v == Self::NOP {
                String::new()
            } else {
                v.to_string()
            }
        };
        write!(f, "{}:{}", bound(self.begin), bound(self.end))?;
        if self.step != 1 {
            write!(f, ":{}", self.step)?;
        }
        Ok(())
    }
}

impl FromStr for BoxSlice {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
