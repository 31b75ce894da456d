// Top-N ranking over tallies

use crate::aggregate::{fields, Tally, UNKNOWN};
use crate::csv_reader::{parse_number, Dataset};
use serde::Serialize;

/// One ranked slot. `rank` is 1-based and contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub rank: usize,
    pub identity: String,
    pub statistic: u64,
    /// Padding slot with no real entity behind it.
    pub placeholder: bool,
}

/// Identity used for padding slots.
pub fn anonymous(rank: usize) -> String {
    format!("Anonymous_{}", rank)
}

/// Rank `tally` by descending value and return exactly `n` slots.
///
/// Equal values keep their first-seen order. Missing slots are filled with
/// `placeholder(rank)` identities and a zero statistic.
pub fn top_n<F>(tally: &Tally, n: usize, placeholder: F) -> Vec<Ranked>
where
    F: Fn(usize) -> String,
{
    let mut entries: Vec<(&str, u64)> = tally.iter().collect();
    // sort_by is stable: ties stay in encounter order
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    (1..=n)
        .map(|rank| match entries.get(rank - 1) {
            Some((identity, statistic)) => Ranked {
                rank,
                identity: identity.to_string(),
                statistic: *statistic,
                placeholder: false,
            },
            None => Ranked {
                rank,
                identity: placeholder(rank),
                statistic: 0,
                placeholder: true,
            },
        })
        .collect()
}

/// Most-watched titles in `region`, by number of rows.
pub fn top_titles(dataset: &Dataset, region: &str, n: usize) -> Vec<Ranked> {
    let mut tally = Tally::new();
    for row in dataset.iter().filter(|row| row.get(fields::STATE) == region) {
        tally.add(row.get_or(fields::TITLE, UNKNOWN), 1);
    }
    top_n(&tally, n, anonymous)
}

/// Users in `region` with the largest `Total Entries` value.
pub fn top_raters(dataset: &Dataset, region: &str, n: usize) -> Vec<Ranked> {
    let mut tally = Tally::new();
    for row in dataset.iter().filter(|row| row.get(fields::STATE) == region) {
        let total = parse_number(row.get(fields::TOTAL_ENTRIES)).max(0.0).trunc() as u64;
        tally.keep_max(row.get_or(fields::USERNAME, UNKNOWN), total);
    }
    top_n(&tally, n, anonymous)
}
