use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// The comparison a [TableScan](crate::TableScan) applies between a cell and the literal.
pub enum ScanType {
    Equals,
    NotEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
}

impl ScanType {
    pub const ALL: [ScanType; 6] = [
        Self::Equals,
        Self::NotEquals,
        Self::LessThan,
        Self::LessThanEquals,
        Self::GreaterThan,
        Self::GreaterThanEquals,
    ];

    #[inline]
    /// Returns `true` if a cell ordered `ordering` relative to the literal matches.
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Equals => ordering.is_eq(),
            Self::NotEquals => ordering.is_ne(),
            Self::LessThan => ordering.is_lt(),
            Self::LessThanEquals => ordering.is_le(),
            Self::GreaterThan => ordering.is_gt(),
            Self::GreaterThanEquals => ordering.is_ge(),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessThanEquals => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEquals => ">=",
        }
    }
}

impl Display for ScanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown scan type: {0:?}, expected one of = != < <= > >=")]
pub struct UnknownScanType(pub String);

impl FromStr for ScanType {
    type Err = UnknownScanType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scan_type = match s.trim() {
            "=" | "==" => Self::Equals,
            "!=" | "<>" => Self::NotEquals,
            "<" => Self::LessThan,
            "<=" => Self::LessThanEquals,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterThanEquals,
            other => return Err(UnknownScanType(other.to_string())),
        };
        Ok(scan_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("=", ScanType::Equals)]
    #[case("==", ScanType::Equals)]
    #[case("!=", ScanType::NotEquals)]
    #[case("<>", ScanType::NotEquals)]
    #[case(" < ", ScanType::LessThan)]
    #[case("<=", ScanType::LessThanEquals)]
    #[case(">", ScanType::GreaterThan)]
    #[case(">=", ScanType::GreaterThanEquals)]
    fn test_parse(#[case] input: &str, #[case] expected: ScanType) {
        assert_eq!(input.parse::<ScanType>(), Ok(expected));
    }

    #[test]
    fn test_display_parses_back() {
        for scan_type in ScanType::ALL {
            assert_eq!(scan_type.to_string().parse::<ScanType>(), Ok(scan_type));
        }
        assert!("=>".parse::<ScanType>().is_err());
    }

    #[rstest::rstest]
    #[case(ScanType::Equals, [false, true, false])]
    #[case(ScanType::NotEquals, [true, false, true])]
    #[case(ScanType::LessThan, [true, false, false])]
    #[case(ScanType::LessThanEquals, [true, true, false])]
    #[case(ScanType::GreaterThan, [false, false, true])]
    #[case(ScanType::GreaterThanEquals, [false, true, true])]
    fn test_matches(#[case] scan_type: ScanType, #[case] expected: [bool; 3]) {
        let actual = [Ordering::Less, Ordering::Equal, Ordering::Greater]
            .map(|ordering| scan_type.matches(ordering));
        assert_eq!(actual, expected);
    }
}
