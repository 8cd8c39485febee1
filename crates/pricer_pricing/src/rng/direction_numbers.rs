//! Sobol direction-number tables.
//!
//! Tables are line-oriented text in the Joe–Kuo layout:
//!
//! ```text
//! d       s       a       m_i
//! 2       1       0       1
//! 3       2       1       1 3
//! ```
//!
//! One record per dimension `d` (starting at 2; the first dimension is the
//! van der Corput sequence and needs no record), with the primitive
//! polynomial degree `s`, its inner coefficients packed into `a`, and the `s`
//! initial odd integers `m_1 … m_s`. A non-numeric first line is treated as a
//! header; blank lines and lines starting with `#` are ignored.

use std::sync::{Arc, OnceLock};

use super::error::SobolError;

/// Maximum number of direction bits (the accumulator is a `u32`).
pub const MAX_BITS: usize = 32;

static EMBEDDED_TEXT: &str = include_str!("../../data/direction_numbers.txt");
static EMBEDDED: OnceLock<Result<Arc<DirectionNumberTable>, SobolError>> = OnceLock::new();

/// Primitive polynomial and initial direction integers for one dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectionNumbers {
    /// Polynomial degree `s`.
    pub degree: u32,
    /// Inner polynomial coefficients `a`.
    pub coefficients: u32,
    /// Initial direction integers `m_1 … m_s`.
    pub initial: Vec<u32>,
}

/// Direction numbers for every dimension after the first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectionNumberTable {
    entries: Vec<DirectionNumbers>,
}

impl DirectionNumberTable {
    /// The table shipped with the crate, parsed once per process.
    pub fn embedded() -> Result<Arc<Self>, SobolError> {
        EMBEDDED
            .get_or_init(|| Self::parse(EMBEDDED_TEXT).map(Arc::new))
            .clone()
    }

    /// Parses a table from text.
    ///
    /// # Errors
    ///
    /// [`SobolError::TableParse`] on malformed or out-of-order records.
    pub fn parse(text: &str) -> Result<Self, SobolError> {
        let mut entries = Vec::new();
        let mut seen_content = false;

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let first_content = !seen_content;
            seen_content = true;

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let numbers: Result<Vec<u32>, _> = fields.iter().map(|f| f.parse::<u32>()).collect();
            let numbers = match numbers {
                Ok(n) => n,
                Err(_) if first_content => continue,
                Err(e) => {
                    return Err(SobolError::TableParse {
                        line,
                        message: e.to_string(),
                    })
                }
            };

            entries.push(Self::record(line, &numbers, entries.len() + 2)?);
        }

        Ok(Self { entries })
    }

    fn record(line: usize, numbers: &[u32], expected: usize) -> Result<DirectionNumbers, SobolError> {
        let err = |message: String| SobolError::TableParse { line, message };

        let [dimension, degree, coefficients, initial @ ..] = numbers else {
            return Err(err("expected `d s a m_1 ... m_s`".to_string()));
        };
        if *dimension as usize != expected {
            return Err(err(format!("expected dimension {expected}, found {dimension}")));
        }
        if *degree == 0 || *degree as usize >= MAX_BITS {
            return Err(err(format!("invalid degree {degree}")));
        }
        if initial.len() != *degree as usize {
            return Err(err(format!(
                "degree {degree} needs {degree} initial values, found {}",
                initial.len()
            )));
        }
        for (k, &m) in initial.iter().enumerate() {
            if m % 2 == 0 || u64::from(m) >= 1_u64 << (k + 1) {
                return Err(err(format!("m_{} = {m} must be odd and below 2^{}", k + 1, k + 1)));
            }
        }

        Ok(DirectionNumbers {
            degree: *degree,
            coefficients: *coefficients,
            initial: initial.to_vec(),
        })
    }

    /// Number of dimensions available, counting the implicit first one.
    #[inline]
    pub fn available_dimensions(&self) -> usize {
        self.entries.len() + 1
    }

    /// Record for a zero-based `dimension >= 1`.
    pub fn entry(&self, dimension: usize) -> Option<&DirectionNumbers> {
        dimension.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Expands the `bits` direction vectors of a zero-based `dimension`,
    /// scaled to 32-bit integers.
    ///
    /// # Errors
    ///
    /// [`SobolError::TableRange`] if the table has no record for `dimension`.
    pub fn direction_vectors(&self, dimension: usize, bits: usize) -> Result<Vec<u32>, SobolError> {
        let bits = bits.min(MAX_BITS);
        if dimension == 0 {
            return Ok((0..bits).map(|k| 1_u32 << (31 - k)).collect());
        }

        let entry = self.entry(dimension).ok_or(SobolError::TableRange {
            requested: dimension + 1,
            available: self.available_dimensions(),
        })?;

        let s = entry.degree as usize;
        let a = entry.coefficients;
        let mut v = vec![0_u32; bits];
        for k in 0..bits.min(s) {
            v[k] = entry.initial[k] << (31 - k);
        }
        for k in s..bits {
            let mut value = v[k - s] ^ (v[k - s] >> s);
            for j in 1..s {
                if (a >> (s - 1 - j)) & 1 == 1 {
                    value ^= v[k - j];
                }
            }
            v[k] = value;
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_table_loads() {
        let table = DirectionNumberTable::embedded().unwrap();
        assert_eq!(table.available_dimensions(), 51);
        let d3 = table.entry(2).unwrap();
        assert_eq!(d3.degree, 2);
        assert_eq!(d3.coefficients, 1);
        assert_eq!(d3.initial, vec![1, 3]);
    }

    #[test]
    fn test_first_dimension_is_van_der_corput() {
        let table = DirectionNumberTable::parse("").unwrap();
        let v = table.direction_vectors(0, 4).unwrap();
        assert_eq!(v, vec![1 << 31, 1 << 30, 1 << 29, 1 << 28]);
    }

    #[test]
    fn test_recurrence_second_dimension() {
        // x + 1: v_k = v_{k-1} ^ (v_{k-1} >> 1)
        let table = DirectionNumberTable::parse("2 1 0 1").unwrap();
        let v = table.direction_vectors(1, 3).unwrap();
        assert_eq!(v[0], 0x8000_0000);
        assert_eq!(v[1], 0xC000_0000);
        assert_eq!(v[2], 0xA000_0000);
    }

    #[test]
    fn test_recurrence_uses_inner_coefficients() {
        // x^2 + x + 1, m = (1, 3): m_3 = 2 m_2 ^ 4 m_1 ^ m_1 = 3
        let table = DirectionNumberTable::parse("2 1 0 1\n3 2 1 1 3").unwrap();
        let v = table.direction_vectors(2, 3).unwrap();
        let m3: u32 = (2 * 3) ^ 4 ^ 1;
        assert_eq!(v[2], m3 << 29);
    }

    #[test]
    fn test_header_and_comments_skipped() {
        let table = DirectionNumberTable::parse("d s a m_i\n# comment\n\n2 1 0 1\n").unwrap();
        assert_eq!(table.available_dimensions(), 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            DirectionNumberTable::parse("2 1 0 1\n4 2 1 1 3"),
            Err(SobolError::TableParse { line: 2, .. })
        ));
        assert!(matches!(
            DirectionNumberTable::parse("2 2 0 1"),
            Err(SobolError::TableParse { line: 1, .. })
        ));
        assert!(matches!(
            DirectionNumberTable::parse("2 1 0 2"),
            Err(SobolError::TableParse { .. })
        ));
        assert!(matches!(
            DirectionNumberTable::parse("2 1 0 1\n3 2 x 1 3"),
            Err(SobolError::TableParse { line: 2, .. })
        ));
    }

    #[test]
    fn test_table_range() {
        let table = DirectionNumberTable::parse("2 1 0 1").unwrap();
        assert_eq!(
            table.direction_vectors(5, 8),
            Err(SobolError::TableRange {
                requested: 6,
                available: 2
            })
        );
    }
}
