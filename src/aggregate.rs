// Aggregation folds turning dataset rows into chart-ready summaries

use crate::bucket::{age_group, genre_axis, genre_list, AgeGroup};
use crate::csv_reader::{parse_number, Dataset};
use crate::scale::{ActivityScale, BubbleScale};
use std::collections::{HashMap, HashSet};

/// Column names read by the aggregators. Lookup is case-insensitive.
pub mod fields {
    pub const STATE: &str = "state";
    pub const SOURCE: &str = "source";
    pub const GENRE: &str = "genre";
    pub const AGE: &str = "Age";
    pub const GENDER: &str = "Gender";
    pub const TITLE: &str = "title";
    pub const USERNAME: &str = "username";
    pub const TOTAL_ENTRIES: &str = "Total Entries";
}

pub const UNKNOWN: &str = "Unknown";

/// Insertion-ordered counter keyed by string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    keys: Vec<String>,
    values: Vec<u64>,
    index: HashMap<String, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.keys.len();
        self.keys.push(key.to_string());
        self.values.push(0);
        self.index.insert(key.to_string(), idx);
        idx
    }

    pub fn add(&mut self, key: &str, amount: u64) {
        let idx = self.slot(key);
        self.values[idx] += amount;
    }

    /// Record `value` for `key`, keeping the largest value seen.
    pub fn keep_max(&mut self, key: &str, value: u64) {
        let idx = self.slot(key);
        self.values[idx] = self.values[idx].max(value);
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.index.get(key).map(|&idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.keys.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<u64>) {
        (self.keys, self.values)
    }
}

/// Distinct non-empty region values in first-seen order.
#[derive(Debug, Clone, Default)]
struct RegionObserver {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl RegionObserver {
    fn observe(&mut self, region: &str) {
        if !region.is_empty() && !self.seen.contains(region) {
            self.seen.insert(region.to_string());
            self.order.push(region.to_string());
        }
    }
}

// =============================================================================
// By source
// =============================================================================

/// Row counts per source material for one region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSummary {
    pub region: String,
    /// Source labels in first-seen order; parallel to `counts`.
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
    /// Every distinct region in the dataset, not only the selected one.
    pub regions: Vec<String>,
}

impl SourceSummary {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.labels.iter().position(|l| l == label).map(|idx| self.counts[idx])
    }
}

pub struct SourceAggregator {
    region: String,
    counts: Tally,
    regions: RegionObserver,
}

impl SourceAggregator {
    pub fn new(region: &str) -> Self {
        SourceAggregator {
            region: region.to_string(),
            counts: Tally::new(),
            regions: RegionObserver::default(),
        }
    }

    pub fn feed(&mut self, chunk: &Dataset) {
        for row in chunk.iter() {
            let state = row.get(fields::STATE);
            self.regions.observe(state);
            if state == self.region {
                self.counts.add(row.get_or(fields::SOURCE, UNKNOWN), 1);
            }
        }
    }

    pub fn finish(self) -> SourceSummary {
        let (labels, counts) = self.counts.into_parts();
        SourceSummary {
            region: self.region,
            labels,
            counts,
            regions: self.regions.order,
        }
    }
}

pub fn by_source(dataset: &Dataset, region: &str) -> SourceSummary {
    let mut aggregator = SourceAggregator::new(region);
    aggregator.feed(dataset);
    aggregator.finish()
}

// =============================================================================
// By gender and activity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    Completed,
    Watching,
    Dropped,
    Rewatched,
}

impl Activity {
    pub const ALL: [Activity; 4] = [Activity::Completed, Activity::Watching, Activity::Dropped, Activity::Rewatched];

    /// Column holding this activity's numeric value.
    pub fn field(self) -> &'static str {
        match self {
            Activity::Completed => "Completed",
            Activity::Watching => "Watching",
            Activity::Dropped => "Dropped",
            Activity::Rewatched => "Rewatched",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Exact match on `"Male"` / `"Female"`; anything else is not counted.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// Summed activity values per gender, in raw units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenderActivity {
    male: [f64; 4],
    female: [f64; 4],
    pub rows_counted: usize,
    /// Distinct regions over all rows, regardless of the filter.
    pub regions: Vec<String>,
}

impl GenderActivity {
    pub fn get(&self, gender: Gender, activity: Activity) -> f64 {
        match gender {
            Gender::Male => self.male[activity.index()],
            Gender::Female => self.female[activity.index()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows_counted == 0
    }

    /// One gender's values in `Activity::ALL` order, converted for display.
    pub fn series(&self, gender: Gender, scale: &ActivityScale) -> [f64; 4] {
        Activity::ALL.map(|activity| scale.apply(self.get(gender, activity)))
    }

    /// Largest raw value over every gender and activity.
    pub fn max(&self) -> f64 {
        self.male.iter().chain(self.female.iter()).copied().fold(0.0, f64::max)
    }
}

pub struct GenderActivityAggregator {
    region: Option<String>,
    summary: GenderActivity,
    regions: RegionObserver,
}

impl GenderActivityAggregator {
    /// `region: None` aggregates the whole dataset.
    pub fn new(region: Option<&str>) -> Self {
        GenderActivityAggregator {
            region: region.map(str::to_string),
            summary: GenderActivity::default(),
            regions: RegionObserver::default(),
        }
    }

    pub fn feed(&mut self, chunk: &Dataset) {
        for row in chunk.iter() {
            let state = row.get(fields::STATE);
            self.regions.observe(state);
            if let Some(region) = &self.region {
                if state != region.as_str() {
                    continue;
                }
            }
            let Some(gender) = Gender::parse(row.get(fields::GENDER)) else {
                continue;
            };
            let bucket = match gender {
                Gender::Male => &mut self.summary.male,
                Gender::Female => &mut self.summary.female,
            };
            for activity in Activity::ALL {
                bucket[activity.index()] += parse_number(row.get(activity.field()));
            }
            self.summary.rows_counted += 1;
        }
    }

    pub fn finish(self) -> GenderActivity {
        GenderActivity {
            regions: self.regions.order,
            ..self.summary
        }
    }
}

pub fn by_gender_activity(dataset: &Dataset, region: Option<&str>) -> GenderActivity {
    let mut aggregator = GenderActivityAggregator::new(region);
    aggregator.feed(dataset);
    aggregator.finish()
}

// =============================================================================
// By genre and age group
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GenreAgeCell {
    pub genre: String,
    pub age: AgeGroup,
    pub count: u64,
}

impl GenreAgeCell {
    /// Composite key, e.g. `"Action-26–28"`.
    pub fn key(&self) -> String {
        composite_key(&self.genre, self.age)
    }
}

pub fn composite_key(genre: &str, age: AgeGroup) -> String {
    format!("{}-{}", genre, age.label())
}

/// Recover `(genre, age)` from a composite key. Age labels never contain
/// an ASCII hyphen, so the last one separates the parts even for genres
/// such as `Sci-Fi`.
pub fn split_key(key: &str) -> Option<(&str, AgeGroup)> {
    let (genre, age) = key.rsplit_once('-')?;
    if genre.is_empty() {
        return None;
    }
    Some((genre, AgeGroup::from_label(age)?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreAgeSummary {
    pub region: String,
    /// Non-empty (genre, age) combinations in first-seen order.
    pub cells: Vec<GenreAgeCell>,
    /// Rows that contributed, each counted once however many genres it has.
    pub rows_counted: usize,
    pub regions: Vec<String>,
}

impl GenreAgeSummary {
    pub fn get(&self, genre: &str, age: AgeGroup) -> u64 {
        self.cells
            .iter()
            .find(|c| c.genre == genre && c.age == age)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Genres present in the summary, in first-seen order.
    pub fn genres(&self) -> Vec<&str> {
        let mut genres: Vec<&str> = Vec::new();
        for cell in &self.cells {
            if !genres.contains(&cell.genre.as_str()) {
                genres.push(&cell.genre);
            }
        }
        genres
    }

    /// X axis for the bubble chart.
    pub fn genre_axis(&self) -> Vec<String> {
        genre_axis(self.genres())
    }

    /// Bubble radius for every cell, in `cells` order.
    pub fn radii(&self, scale: &BubbleScale) -> Vec<f64> {
        self.cells.iter().map(|c| scale.radius(c.count)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenreAgeOutcome {
    /// No row for the region had both a usable age and a genre.
    NoData { region: String, regions: Vec<String> },
    Data(GenreAgeSummary),
}

impl GenreAgeOutcome {
    pub fn summary(&self) -> Option<&GenreAgeSummary> {
        match self {
            GenreAgeOutcome::Data(summary) => Some(summary),
            GenreAgeOutcome::NoData { .. } => None,
        }
    }

    /// Distinct regions over all rows, reported in both outcomes.
    pub fn regions(&self) -> &[String] {
        match self {
            GenreAgeOutcome::Data(summary) => &summary.regions,
            GenreAgeOutcome::NoData { regions, .. } => regions,
        }
    }
}

pub struct GenreAgeAggregator {
    region: String,
    cells: Vec<GenreAgeCell>,
    index: HashMap<(String, AgeGroup), usize>,
    rows_counted: usize,
    regions: RegionObserver,
}

impl GenreAgeAggregator {
    pub fn new(region: &str) -> Self {
        GenreAgeAggregator {
            region: region.to_string(),
            cells: Vec::new(),
            index: HashMap::new(),
            rows_counted: 0,
            regions: RegionObserver::default(),
        }
    }

    pub fn feed(&mut self, chunk: &Dataset) {
        for row in chunk.iter() {
            let state = row.get(fields::STATE);
            self.regions.observe(state);
            if state != self.region {
                continue;
            }
            let Some(age) = age_group(row.get(fields::AGE)) else {
                continue;
            };
            let genres = genre_list(row.get(fields::GENRE));
            if genres.is_empty() {
                continue;
            }
            for genre in genres {
                let key = (genre.to_string(), age);
                match self.index.get(&key) {
                    Some(&idx) => self.cells[idx].count += 1,
                    None => {
                        self.index.insert(key, self.cells.len());
                        self.cells.push(GenreAgeCell {
                            genre: genre.to_string(),
                            age,
                            count: 1,
                        });
                    }
                }
            }
            self.rows_counted += 1;
        }
    }

    pub fn finish(self) -> GenreAgeOutcome {
        if self.cells.is_empty() {
            return GenreAgeOutcome::NoData {
                region: self.region,
                regions: self.regions.order,
            };
        }
        GenreAgeOutcome::Data(GenreAgeSummary {
            region: self.region,
            cells: self.cells,
            rows_counted: self.rows_counted,
            regions: self.regions.order,
        })
    }
}

pub fn by_genre_age(dataset: &Dataset, region: &str) -> GenreAgeOutcome {
    let mut aggregator = GenreAgeAggregator::new(region);
    aggregator.feed(dataset);
    aggregator.finish()
}

// =============================================================================
// By region (choropleth)
// =============================================================================

/// Row counts per region over the full dataset, ordered by region name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCounts {
    pub counts: Vec<(String, u64)>,
}

impl RegionCounts {
    pub fn get(&self, region: &str) -> u64 {
        self.counts
            .binary_search_by(|(name, _)| name.as_str().cmp(region))
            .map(|idx| self.counts[idx].1)
            .unwrap_or(0)
    }

    pub fn contains(&self, region: &str) -> bool {
        self.get(region) > 0
    }

    /// Upper end of the color scale domain.
    pub fn max(&self) -> u64 {
        self.counts.iter().map(|(_, n)| *n).max().unwrap_or(0)
    }

    pub fn regions(&self) -> Vec<String> {
        self.counts.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Default)]
pub struct RegionAggregator {
    counts: Tally,
}

impl RegionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &Dataset) {
        for row in chunk.iter() {
            let state = row.get(fields::STATE);
            if !state.is_empty() {
                self.counts.add(state, 1);
            }
        }
    }

    pub fn finish(self) -> RegionCounts {
        let mut counts: Vec<(String, u64)> = self
            .counts
            .iter()
            .map(|(name, n)| (name.to_string(), n))
            .collect();
        counts.sort_by(|a, b| a.0.cmp(&b.0));
        RegionCounts { counts }
    }
}

pub fn by_region(dataset: &Dataset) -> RegionCounts {
    let mut aggregator = RegionAggregator::new();
    aggregator.feed(dataset);
    aggregator.finish()
}

/// Number of distinct titles watched in `region`; an empty title counts as
/// one `Unknown` title.
pub fn unique_titles(dataset: &Dataset, region: &str) -> usize {
    dataset
        .iter()
        .filter(|row| row.get(fields::STATE) == region)
        .map(|row| row.get_or(fields::TITLE, UNKNOWN))
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::{for_each_chunk, read_csv};
    use std::io::Cursor;

    fn csv_from_string(content: &str) -> Dataset {
        read_csv(Cursor::new(content)).unwrap()
    }

    fn source_rows() -> Dataset {
        csv_from_string("state,source\nMI,Manga\nMI,Manga\nMI,Original\nOH,Game")
    }

    // Tally tests

    #[test]
    fn test_tally_keeps_first_seen_order() {
        let mut tally = Tally::new();
        tally.add("b", 1);
        tally.add("a", 2);
        tally.add("b", 3);
        let entries: Vec<(&str, u64)> = tally.iter().collect();
        assert_eq!(entries, vec![("b", 4), ("a", 2)]);
        assert_eq!(tally.total(), 6);
    }

    #[test]
    fn test_tally_keep_max() {
        let mut tally = Tally::new();
        tally.keep_max("u", 10);
        tally.keep_max("u", 3);
        tally.keep_max("u", 12);
        assert_eq!(tally.get("u"), Some(12));
        assert_eq!(tally.get("missing"), None);
    }

    // By-source tests

    #[test]
    fn test_by_source_scenario() {
        let summary = by_source(&source_rows(), "MI");
        assert_eq!(summary.labels, vec!["Manga", "Original"]);
        assert_eq!(summary.counts, vec![2, 1]);
        assert_eq!(summary.regions, vec!["MI", "OH"]);
    }

    #[test]
    fn test_by_source_sum_matches_filtered_rows() {
        let data = csv_from_string(
            "state,source\nMI,Manga\nOH,\nMI,\nMI,Novel\nOH,Game\nMI,Manga\n,Manga",
        );
        for region in ["MI", "OH", "TX"] {
            let summary = by_source(&data, region);
            let expected = data.iter().filter(|r| r.get("state") == region).count() as u64;
            assert_eq!(summary.total(), expected);
        }
    }

    #[test]
    fn test_by_source_defaults_unknown() {
        let data = csv_from_string("state,source\nMI,\nMI,Manga");
        let summary = by_source(&data, "MI");
        assert_eq!(summary.get("Unknown"), Some(1));
        assert_eq!(summary.get("Manga"), Some(1));
    }

    #[test]
    fn test_by_source_missing_column() {
        let data = csv_from_string("state\nMI\nMI");
        let summary = by_source(&data, "MI");
        assert_eq!(summary.labels, vec!["Unknown"]);
        assert_eq!(summary.counts, vec![2]);
    }

    #[test]
    fn test_by_source_no_match_emits_regions() {
        let summary = by_source(&source_rows(), "TX");
        assert!(summary.is_empty());
        assert_eq!(summary.regions, vec!["MI", "OH"]);
    }

    #[test]
    fn test_by_source_chunked_equals_whole() {
        let content = "state,source\nMI,Manga\nOH,Game\nMI,Novel\nMI,Manga\nOH,Manga";
        let mut aggregator = SourceAggregator::new("MI");
        for_each_chunk(Cursor::new(content), 2, |chunk| aggregator.feed(&chunk)).unwrap();
        assert_eq!(aggregator.finish(), by_source(&csv_from_string(content), "MI"));
    }

    const CHUNKED: &str = "state,Gender,Completed,Watching,Dropped,Rewatched,genre,Age\n\
        MI,Male,1000,20,1,0,\"Action, Drama\",27\n\
        OH,Female,2000,30,2,1,Comedy,40\n\
        MI,Female,500,5,0,3,Action,26\n\
        ,Male,7,7,7,7,Horror,22\n\
        MI,Other,900,9,9,9,Drama,x\n\
        OH,Male,300,1,1,1,\"Sci-Fi, Action\",31\n\
        MI,Male,12.5,0,0,0,Action,27\n";

    #[test]
    fn test_gender_activity_chunked_equals_whole() {
        let whole = csv_from_string(CHUNKED);
        for region in [Some("MI"), None] {
            let mut aggregator = GenderActivityAggregator::new(region);
            for_each_chunk(Cursor::new(CHUNKED), 2, |chunk| aggregator.feed(&chunk)).unwrap();
            assert_eq!(aggregator.finish(), by_gender_activity(&whole, region));
        }
    }

    #[test]
    fn test_genre_age_chunked_equals_whole() {
        let whole = csv_from_string(CHUNKED);
        for region in ["MI", "OH", "TX"] {
            let mut aggregator = GenreAgeAggregator::new(region);
            for_each_chunk(Cursor::new(CHUNKED), 3, |chunk| aggregator.feed(&chunk)).unwrap();
            assert_eq!(aggregator.finish(), by_genre_age(&whole, region));
        }
    }

    #[test]
    fn test_region_chunked_equals_whole() {
        let mut aggregator = RegionAggregator::new();
        for_each_chunk(Cursor::new(CHUNKED), 1, |chunk| aggregator.feed(&chunk)).unwrap();
        let chunked = aggregator.finish();
        assert_eq!(chunked, by_region(&csv_from_string(CHUNKED)));
        assert_eq!(chunked.get("MI"), 4);
        assert_eq!(chunked.regions(), vec!["MI", "OH"]);
    }

    // By-gender-activity tests

    #[test]
    fn test_by_gender_activity_scenario() {
        let data = csv_from_string("Gender,Completed\nMale,1000\nFemale,2000\nOther,500");
        let summary = by_gender_activity(&data, None);
        assert_eq!(summary.get(Gender::Male, Activity::Completed), 1000.0);
        assert_eq!(summary.get(Gender::Female, Activity::Completed), 2000.0);
        assert_eq!(summary.rows_counted, 2);
    }

    #[test]
    fn test_by_gender_activity_non_numeric_is_zero() {
        let data = csv_from_string(
            "Gender,Completed,Watching,Dropped,Rewatched\nMale,10,abc,,2.5\nMale,5,1,1,1",
        );
        let summary = by_gender_activity(&data, None);
        assert_eq!(summary.get(Gender::Male, Activity::Completed), 15.0);
        assert_eq!(summary.get(Gender::Male, Activity::Watching), 1.0);
        assert_eq!(summary.get(Gender::Male, Activity::Dropped), 1.0);
        assert_eq!(summary.get(Gender::Male, Activity::Rewatched), 3.5);
        assert_eq!(summary.get(Gender::Female, Activity::Completed), 0.0);
    }

    #[test]
    fn test_by_gender_activity_reports_all_regions() {
        let data = csv_from_string("state,Gender,Completed\nOH,Male,1\nMI,Female,2\nOH,Other,3");
        let summary = by_gender_activity(&data, Some("MI"));
        assert_eq!(summary.rows_counted, 1);
        assert_eq!(summary.regions, vec!["OH", "MI"]);
    }

    #[test]
    fn test_by_gender_activity_region_filter() {
        let data = csv_from_string("state,Gender,Completed\nMI,Male,100\nOH,Male,900\nMI,Female,40");
        let summary = by_gender_activity(&data, Some("MI"));
        assert_eq!(summary.get(Gender::Male, Activity::Completed), 100.0);
        assert_eq!(summary.get(Gender::Female, Activity::Completed), 40.0);
        assert_eq!(summary.max(), 100.0);
    }

    #[test]
    fn test_by_gender_activity_series_scaled() {
        let data = csv_from_string("Gender,Completed,Watching\nFemale,2400,600");
        let summary = by_gender_activity(&data, None);
        let series = summary.series(Gender::Female, &ActivityScale::default());
        assert_eq!(series, [2.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_gender_parse_is_exact() {
        assert_eq!(Gender::parse("Male"), Some(Gender::Male));
        assert_eq!(Gender::parse("male"), None);
        assert_eq!(Gender::parse("Non-Binary"), None);
    }

    // By-genre-age tests

    fn bubble_rows() -> Dataset {
        csv_from_string(
            "state,genre,Age\n\
             MI,\"Action, Comedy\",27\n\
             MI,Action,26\n\
             MI,Sci-Fi,40\n\
             MI,,30\n\
             MI,Drama,unknown\n\
             OH,Action,27",
        )
    }

    #[test]
    fn test_by_genre_age_counts_pairs() {
        let outcome = by_genre_age(&bubble_rows(), "MI");
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.get("Action", AgeGroup::From26To28), 2);
        assert_eq!(summary.get("Comedy", AgeGroup::From26To28), 1);
        assert_eq!(summary.get("Sci-Fi", AgeGroup::Over35), 1);
        assert_eq!(summary.cells.len(), 3);
    }

    #[test]
    fn test_by_genre_age_multi_genre_row_counted_once() {
        let summary = by_genre_age(&bubble_rows(), "MI").summary().cloned().unwrap();
        // Three rows contribute; the two-genre row is not double counted
        assert_eq!(summary.rows_counted, 3);
        let per_genre: u64 = summary.cells.iter().map(|c| c.count).sum();
        assert_eq!(per_genre, 4);
    }

    #[test]
    fn test_by_genre_age_no_data() {
        let outcome = by_genre_age(&bubble_rows(), "TX");
        match &outcome {
            GenreAgeOutcome::NoData { region, regions } => {
                assert_eq!(region, "TX");
                assert!(!regions.is_empty());
                assert!(!regions.iter().any(|r| r == "TX"));
            }
            _ => panic!("Expected NoData"),
        }

        let outcome = by_genre_age(&csv_from_string("state,genre,Age\nMI,,20\nMI,Drama,x"), "MI");
        assert!(outcome.summary().is_none());
    }

    #[test]
    fn test_composite_key_roundtrip() {
        let summary = by_genre_age(&bubble_rows(), "MI").summary().cloned().unwrap();
        for cell in &summary.cells {
            let key = cell.key();
            let (genre, age) = split_key(&key).unwrap();
            assert_eq!(genre, cell.genre);
            assert_eq!(age, cell.age);
        }
        assert_eq!(split_key("Action-26–28"), Some(("Action", AgeGroup::From26To28)));
        assert_eq!(split_key("Sci-Fi-35+"), Some(("Sci-Fi", AgeGroup::Over35)));
        assert_eq!(split_key("Action"), None);
        assert_eq!(split_key("-<26"), None);
    }

    #[test]
    fn test_genre_age_radii_clamped() {
        let summary = by_genre_age(&bubble_rows(), "MI").summary().cloned().unwrap();
        let scale = BubbleScale::new(1.0, 2.0, 3.5);
        assert_eq!(summary.radii(&scale), vec![3.5, 3.0, 3.0]);
    }

    #[test]
    fn test_genre_axis_order() {
        let summary = by_genre_age(&bubble_rows(), "MI").summary().cloned().unwrap();
        assert_eq!(summary.genres(), vec!["Action", "Comedy", "Sci-Fi"]);
        assert_eq!(summary.genre_axis().len(), 7);
    }

    // By-region tests

    #[test]
    fn test_by_region_counts_full_dataset() {
        let data = csv_from_string("state\nOhio\nMichigan\n Ohio \n\nIowa\nOhio");
        let counts = by_region(&data);
        assert_eq!(
            counts.counts,
            vec![("Iowa".to_string(), 1), ("Michigan".to_string(), 1), ("Ohio".to_string(), 3)]
        );
        assert_eq!(counts.max(), 3);
        assert_eq!(counts.get("Ohio"), 3);
        assert_eq!(counts.get("Texas"), 0);
        assert!(!counts.contains("Texas"));
        assert_eq!(counts.regions(), vec!["Iowa", "Michigan", "Ohio"]);
    }

    #[test]
    fn test_by_region_empty() {
        let counts = by_region(&csv_from_string("state\n"));
        assert!(counts.is_empty());
        assert_eq!(counts.max(), 0);
    }

    #[test]
    fn test_unique_titles() {
        let data = csv_from_string("state,title\nMI,Naruto\nMI,Naruto\nMI,Bleach\nMI,\nOH,One Piece");
        assert_eq!(unique_titles(&data, "MI"), 3);
        assert_eq!(unique_titles(&data, "OH"), 1);
        assert_eq!(unique_titles(&data, "TX"), 0);
    }
}
