//! Bounds attached to string and number fields

/// Inclusive length bounds for string fields, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Len {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Len {
    pub const fn between(min: usize, max: usize) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min: Some(min), max: None }
    }

    pub const fn at_most(max: usize) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub const fn any() -> Self {
        Self { min: None, max: None }
    }

    pub fn contains(&self, len: usize) -> bool {
        self.min.map_or(true, |min| len >= min) && self.max.map_or(true, |max| len <= max)
    }
}

/// Inclusive integer bounds for number fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl Range {
    pub const fn between(min: i64, max: i64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub const fn at_least(min: i64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub const fn at_most(max: i64) -> Self {
        Self { min: None, max: Some(max) }
    }

    pub const fn any() -> Self {
        Self { min: None, max: None }
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_bounds() {
        assert!(Len::between(1, 3).contains(1));
        assert!(Len::between(1, 3).contains(3));
        assert!(!Len::between(1, 3).contains(0));
        assert!(!Len::between(1, 3).contains(4));
        assert!(Len::at_most(2).contains(0));
        assert!(Len::at_least(2).contains(usize::MAX));
        assert!(Len::any().contains(0));
    }

    #[test]
    fn test_range_bounds() {
        assert!(Range::between(-5, 5).contains(-5));
        assert!(!Range::between(-5, 5).contains(6));
        assert!(Range::at_least(0).contains(i64::MAX));
        assert!(!Range::at_most(0).contains(1));
    }
}
