// Bucketing of raw field values into fixed, labeled partitions

use std::fmt;

/// Viewer age band. Upper bounds of the named bands are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgeGroup {
    Under26,
    From26To28,
    From29To31,
    From32To35,
    Over35,
}

impl AgeGroup {
    /// All bands in axis order.
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Under26,
        AgeGroup::From26To28,
        AgeGroup::From29To31,
        AgeGroup::From32To35,
        AgeGroup::Over35,
    ];

    pub fn from_age(age: i64) -> Self {
        match age {
            i64::MIN..=25 => AgeGroup::Under26,
            26..=28 => AgeGroup::From26To28,
            29..=31 => AgeGroup::From29To31,
            32..=35 => AgeGroup::From32To35,
            _ => AgeGroup::Over35,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under26 => "<26",
            AgeGroup::From26To28 => "26–28",
            AgeGroup::From29To31 => "29–31",
            AgeGroup::From32To35 => "32–35",
            AgeGroup::Over35 => "35+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        AgeGroup::ALL.into_iter().find(|group| group.label() == label)
    }

    /// Position on the age axis, starting at 0.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve a raw `Age` field to its band, or `None` when it is not a number.
///
/// Decimal strings are truncated toward zero, so `"26.9"` lands in `26–28`.
pub fn age_group(raw_age: &str) -> Option<AgeGroup> {
    let trimmed = raw_age.trim();
    let age = match trimmed.parse::<i64>() {
        Ok(age) => age,
        Err(_) => {
            let value = trimmed.parse::<f64>().ok().filter(|v| v.is_finite())?;
            value.trunc() as i64
        }
    };
    Some(AgeGroup::from_age(age))
}

/// Genres on the bubble chart axis, in display order.
pub const CANONICAL_GENRES: [&str; 7] = ["Action", "Drama", "Comedy", "Romance", "Fantasy", "Sci-Fi", "Horror"];

/// Split a comma-separated genre field into trimmed, non-empty tokens.
/// A genre repeated within one field is reported once.
pub fn genre_list(raw_genres: &str) -> Vec<&str> {
    let mut genres: Vec<&str> = Vec::new();
    for token in raw_genres.split(',').map(str::trim) {
        if !token.is_empty() && !genres.contains(&token) {
            genres.push(token);
        }
    }
    genres
}

/// Genre axis: canonical genres first, then any others in first-seen order.
pub fn genre_axis<'a, I>(observed: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut axis: Vec<String> = CANONICAL_GENRES.iter().map(|g| g.to_string()).collect();
    for genre in observed {
        if !axis.iter().any(|g| g == genre) {
            axis.push(genre.to_string());
        }
    }
    axis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_group_boundaries() {
        assert_eq!(age_group("25"), Some(AgeGroup::Under26));
        assert_eq!(age_group("26"), Some(AgeGroup::From26To28));
        assert_eq!(age_group("28"), Some(AgeGroup::From26To28));
        assert_eq!(age_group("29"), Some(AgeGroup::From29To31));
        assert_eq!(age_group("31"), Some(AgeGroup::From29To31));
        assert_eq!(age_group("32"), Some(AgeGroup::From32To35));
        assert_eq!(age_group("35"), Some(AgeGroup::From32To35));
        assert_eq!(age_group("36"), Some(AgeGroup::Over35));
    }

    #[test]
    fn test_age_group_labels() {
        assert_eq!(age_group("26").unwrap().label(), "26–28");
        assert_eq!(age_group("35").unwrap().label(), "32–35");
        assert_eq!(age_group("36").unwrap().label(), "35+");
        assert_eq!(age_group("12").unwrap().label(), "<26");
    }

    #[test]
    fn test_age_group_is_total_over_integers() {
        for age in -5..120 {
            let group = AgeGroup::from_age(age);
            let matches = AgeGroup::ALL.iter().filter(|g| **g == group).count();
            assert_eq!(matches, 1);
        }
        assert_eq!(AgeGroup::from_age(i64::MIN), AgeGroup::Under26);
        assert_eq!(AgeGroup::from_age(i64::MAX), AgeGroup::Over35);
    }

    #[test]
    fn test_age_group_unparseable() {
        assert_eq!(age_group(""), None);
        assert_eq!(age_group("unknown"), None);
        assert_eq!(age_group("NaN"), None);
    }

    #[test]
    fn test_age_group_decimal_truncates() {
        assert_eq!(age_group("28.9"), Some(AgeGroup::From26To28));
        assert_eq!(age_group(" 31 "), Some(AgeGroup::From29To31));
    }

    #[test]
    fn test_age_group_label_roundtrip() {
        for group in AgeGroup::ALL {
            assert_eq!(AgeGroup::from_label(group.label()), Some(group));
        }
        assert_eq!(AgeGroup::from_label("13-17"), None);
    }

    #[test]
    fn test_genre_list_split_and_trim() {
        assert_eq!(genre_list("Action, Comedy ,Sci-Fi"), vec!["Action", "Comedy", "Sci-Fi"]);
        assert_eq!(genre_list(" , ,Drama,,"), vec!["Drama"]);
        assert!(genre_list("").is_empty());
    }

    #[test]
    fn test_genre_list_dedupes_within_row() {
        assert_eq!(genre_list("Action,Action , Drama"), vec!["Action", "Drama"]);
    }

    #[test]
    fn test_genre_axis_appends_unknown_genres() {
        let axis = genre_axis(["Drama", "Slice of Life", "Mecha", "Slice of Life"]);
        assert_eq!(&axis[..7], &CANONICAL_GENRES.map(String::from)[..]);
        assert_eq!(&axis[7..], &["Slice of Life".to_string(), "Mecha".to_string()]);
    }
}
