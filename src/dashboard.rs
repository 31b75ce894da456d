// Event-driven dashboard owning the selection and every panel summary

use crate::aggregate::{
    by_gender_activity, by_genre_age, by_region, by_source, unique_titles, GenderActivity, GenreAgeOutcome,
    GenreAgeSummary, RegionCounts, SourceSummary,
};
use crate::csv_reader::{read_csv_from_path, Dataset};
use crate::enrich::{resolve_title, Enrichment, EnrichmentCache, RaterCard, TitleCard, TitleLookup};
use crate::palette::ColorAssigner;
use crate::rank::{top_raters, top_titles, Ranked};
use crate::scale::{ActivityScale, BubbleScale, SequentialScale};
use crate::state::SelectionState;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Panel {
    SourceBar,
    GenderRadar,
    GenreBubble,
    RegionMap,
    TopStats,
}

impl Panel {
    pub const ALL: [Panel; 5] = [
        Panel::SourceBar,
        Panel::GenderRadar,
        Panel::GenreBubble,
        Panel::RegionMap,
        Panel::TopStats,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Panel::SourceBar => "source bar chart",
            Panel::GenderRadar => "gender radar chart",
            Panel::GenreBubble => "genre bubble chart",
            Panel::RegionMap => "region map",
            Panel::TopStats => "top stats",
        }
    }
}

/// What a panel currently has to show.
#[derive(Debug, Clone, PartialEq)]
pub enum View<T> {
    /// Dataset not loaded yet.
    Loading,
    /// Dataset failed to load; the panel stays in this state.
    Unavailable(String),
    /// Dataset loaded, but nothing matches the current selection.
    NoData,
    Ready(T),
}

impl<T> View<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            View::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, View::Loading)
    }

    fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => View::Ready(value),
            None => View::NoData,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub default_region: String,
    pub top_n: usize,
    pub activity_scale: ActivityScale,
    pub bubble_scale: BubbleScale,
    /// Title lookups allowed on worker threads at once; the rest queue.
    pub max_concurrent_lookups: usize,
    /// Dataset file per panel; `load_datasets` reads each distinct path once.
    pub datasets: HashMap<Panel, PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            default_region: "California".to_string(),
            top_n: 3,
            activity_scale: ActivityScale::default(),
            bubble_scale: BubbleScale::default(),
            max_concurrent_lookups: 3,
            datasets: HashMap::new(),
        }
    }
}

impl DashboardConfig {
    /// Every panel reads the same file.
    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        for panel in Panel::ALL {
            self.datasets.insert(panel, path.clone());
        }
        self
    }
}

/// Bubble chart input: the summary plus stable per-genre colors.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleView {
    pub summary: GenreAgeSummary,
    pub colors: HashMap<String, String>,
    pub radii: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionFill {
    pub region: String,
    pub count: u64,
    /// `None` for regions without entries (drawn unfilled).
    pub fill: Option<String>,
    pub selected: bool,
}

/// Choropleth input: counts over the whole dataset and their color scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Choropleth {
    pub counts: RegionCounts,
    pub scale: SequentialScale,
}

impl Choropleth {
    fn new(counts: RegionCounts) -> Self {
        let scale = SequentialScale::new(counts.max());
        Choropleth { counts, scale }
    }

    pub fn fills(&self, selected: &str) -> Vec<RegionFill> {
        self.counts
            .counts
            .iter()
            .map(|(region, count)| RegionFill {
                region: region.clone(),
                count: *count,
                fill: self.scale.fill(*count),
                selected: region == selected,
            })
            .collect()
    }

    /// Fills plus the scale domain `0..=max` for the legend.
    pub fn table(&self, selected: &str) -> ChoroplethTable {
        ChoroplethTable {
            max: self.scale.max,
            max_fill: self.scale.fill(self.scale.max),
            fills: self.fills(selected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoroplethTable {
    pub max: u64,
    pub max_fill: Option<String>,
    pub fills: Vec<RegionFill>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopStats {
    pub region: String,
    pub unique_titles: usize,
    pub titles: Vec<TitleCard>,
    pub raters: Vec<RaterCard>,
}

impl TopStats {
    pub fn is_pending(&self) -> bool {
        self.titles.iter().any(|card| card.pending)
    }
}

/// Worker results. `generation` is the dataset load the work belongs to;
/// events from a superseded load are ignored.
pub enum DashboardEvent {
    DatasetLoaded {
        generation: u64,
        panel: Panel,
        result: Result<Arc<Dataset>, String>,
    },
    /// A title lookup finished. `region` is the selection at request time.
    TitleEnriched {
        generation: u64,
        region: String,
        title: String,
        enrichment: Enrichment,
    },
}

enum Slot {
    Loading,
    Failed(String),
    Loaded(Arc<Dataset>),
}

pub struct Dashboard {
    config: DashboardConfig,
    state: SelectionState,
    slots: HashMap<Panel, Slot>,
    source_bar: View<SourceSummary>,
    gender_radar: View<GenderActivity>,
    genre_bubble: View<BubbleView>,
    region_map: View<Choropleth>,
    top_stats: View<TopStats>,
    colors: ColorAssigner,
    enrichments: EnrichmentCache,
    lookup: Arc<dyn TitleLookup>,
    lookup_queue: VecDeque<(String, String)>,
    lookups_running: HashSet<(u64, String, String)>,
    load_generation: u64,
    events_tx: Sender<DashboardEvent>,
    events_rx: Receiver<DashboardEvent>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, lookup: Arc<dyn TitleLookup>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let state = SelectionState::new(&config.default_region);
        Dashboard {
            config,
            state,
            slots: Panel::ALL.iter().map(|&p| (p, Slot::Loading)).collect(),
            source_bar: View::Loading,
            gender_radar: View::Loading,
            genre_bubble: View::Loading,
            region_map: View::Loading,
            top_stats: View::Loading,
            colors: ColorAssigner::default(),
            enrichments: EnrichmentCache::new(),
            lookup,
            lookup_queue: VecDeque::new(),
            lookups_running: HashSet::new(),
            load_generation: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn source_bar(&self) -> &View<SourceSummary> {
        &self.source_bar
    }

    pub fn gender_radar(&self) -> &View<GenderActivity> {
        &self.gender_radar
    }

    pub fn genre_bubble(&self) -> &View<BubbleView> {
        &self.genre_bubble
    }

    pub fn region_map(&self) -> &View<Choropleth> {
        &self.region_map
    }

    pub fn top_stats(&self) -> &View<TopStats> {
        &self.top_stats
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Start a fresh load of every configured dataset on worker threads.
    /// Panels without a configured path become unavailable immediately.
    pub fn load_datasets(&mut self) {
        self.begin_load();

        let mut by_path: HashMap<PathBuf, Vec<Panel>> = HashMap::new();
        for panel in Panel::ALL {
            match self.config.datasets.get(&panel) {
                Some(path) => by_path.entry(path.clone()).or_default().push(panel),
                None => self.fail(panel, "no dataset configured".to_string()),
            }
        }

        let generation = self.load_generation;
        for (path, panels) in by_path {
            let tx = self.events_tx.clone();
            thread::spawn(move || {
                let result = read_csv_from_path(&path)
                    .map(Arc::new)
                    .map_err(|err| format!("{:#}", err));
                for panel in panels {
                    let event = DashboardEvent::DatasetLoaded {
                        generation,
                        panel,
                        result: result.clone(),
                    };
                    if tx.send(event).is_err() {
                        log::debug!("Dashboard gone before '{}' finished loading", path.display());
                        return;
                    }
                }
            });
        }
    }

    fn begin_load(&mut self) {
        self.load_generation += 1;
        self.state.reset_regions();
        self.enrichments.clear();
        self.lookup_queue.clear();
        for panel in Panel::ALL {
            self.slots.insert(panel, Slot::Loading);
            self.set_loading(panel);
        }
    }

    fn set_loading(&mut self, panel: Panel) {
        match panel {
            Panel::SourceBar => self.source_bar = View::Loading,
            Panel::GenderRadar => self.gender_radar = View::Loading,
            Panel::GenreBubble => self.genre_bubble = View::Loading,
            Panel::RegionMap => self.region_map = View::Loading,
            Panel::TopStats => self.top_stats = View::Loading,
        }
    }

    fn fail(&mut self, panel: Panel, reason: String) {
        log::error!("Failed to load dataset for {}: {}", panel.name(), reason);
        match panel {
            Panel::SourceBar => self.source_bar = View::Unavailable(reason.clone()),
            Panel::GenderRadar => self.gender_radar = View::Unavailable(reason.clone()),
            Panel::GenreBubble => self.genre_bubble = View::Unavailable(reason.clone()),
            Panel::RegionMap => self.region_map = View::Unavailable(reason.clone()),
            Panel::TopStats => self.top_stats = View::Unavailable(reason.clone()),
        }
        self.slots.insert(panel, Slot::Failed(reason));
    }

    /// Attach an already-parsed dataset to `panel` and compute its summary.
    pub fn attach(&mut self, panel: Panel, dataset: Arc<Dataset>) {
        log::debug!("{} rows attached to {}", dataset.len(), panel.name());
        self.slots.insert(panel, Slot::Loaded(dataset));
        self.recompute(panel);
    }

    /// Attach one dataset to every panel.
    pub fn attach_all(&mut self, dataset: Arc<Dataset>) {
        for panel in Panel::ALL {
            self.attach(panel, Arc::clone(&dataset));
        }
    }

    /// User picked a region from the selector. Returns whether it changed.
    pub fn select_region(&mut self, region: &str) -> bool {
        if !self.state.select(region) {
            return false;
        }
        for panel in Panel::ALL {
            // Map counts cover the whole dataset; only its highlight moves
            if panel != Panel::RegionMap {
                self.recompute(panel);
            }
        }
        true
    }

    /// User clicked a region on the map. Regions without entries are inert.
    pub fn map_clicked(&mut self, region: &str) -> bool {
        let clickable = self
            .region_map
            .ready()
            .map(|map| map.counts.contains(region))
            .unwrap_or(false);
        clickable && self.select_region(region)
    }

    pub fn handle(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::DatasetLoaded {
                generation,
                panel,
                result,
            } => {
                if generation != self.load_generation {
                    log::debug!("Ignoring {} result from superseded load {}", panel.name(), generation);
                    return;
                }
                match result {
                    Ok(dataset) => self.attach(panel, dataset),
                    Err(reason) => self.fail(panel, reason),
                }
            }
            DashboardEvent::TitleEnriched {
                generation,
                region,
                title,
                enrichment,
            } => {
                self.lookups_running
                    .remove(&(generation, title.clone(), region.clone()));
                if generation != self.load_generation {
                    log::debug!("Ignoring enrichment for '{}' from superseded load {}", title, generation);
                } else if region != self.state.selected_region() {
                    log::debug!("Dropping stale enrichment for '{}' from region '{}'", title, region);
                    self.enrichments.abandon(&title, &region);
                } else if self.enrichments.complete(&title, &region, enrichment) {
                    self.refresh_title_cards();
                }
                self.dispatch_lookups();
            }
        }
    }

    /// Apply all events that have already arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// No dataset loads or lookups outstanding.
    pub fn is_settled(&self) -> bool {
        let loading = self.slots.values().any(|slot| matches!(slot, Slot::Loading));
        !loading && self.enrichments.in_flight_count() == 0
    }

    pub fn load_error(&self, panel: Panel) -> Option<&str> {
        match self.slots.get(&panel) {
            Some(Slot::Failed(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Process events until settled or `timeout` elapses. Returns whether
    /// the dashboard settled.
    pub fn run_until_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_settled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.events_rx.recv_timeout(deadline - now) {
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => return false,
                // The dashboard holds a sender, so this never disconnects
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn dataset(&self, panel: Panel) -> Option<Arc<Dataset>> {
        match self.slots.get(&panel) {
            Some(Slot::Loaded(dataset)) => Some(Arc::clone(dataset)),
            _ => None,
        }
    }

    /// Discard and rebuild one panel's summary from its dataset.
    fn recompute(&mut self, panel: Panel) {
        let Some(dataset) = self.dataset(panel) else {
            return;
        };
        let region = self.state.selected_region().to_string();

        match panel {
            Panel::SourceBar => {
                let summary = by_source(&dataset, &region);
                self.state.set_all_regions(&summary.regions);
                self.source_bar = View::from_option((!summary.is_empty()).then_some(summary));
            }
            Panel::GenderRadar => {
                let summary = by_gender_activity(&dataset, Some(&region));
                self.state.set_all_regions(&summary.regions);
                self.gender_radar = View::from_option((!summary.is_empty()).then_some(summary));
            }
            Panel::GenreBubble => {
                let outcome = by_genre_age(&dataset, &region);
                self.state.set_all_regions(outcome.regions());
                self.genre_bubble = match outcome {
                    GenreAgeOutcome::NoData { .. } => View::NoData,
                    GenreAgeOutcome::Data(summary) => {
                        let genres: Vec<String> = summary.genres().iter().map(|g| g.to_string()).collect();
                        self.colors.assign(&genres);
                        View::Ready(BubbleView {
                            radii: summary.radii(&self.config.bubble_scale),
                            colors: self.colors.colors(),
                            summary,
                        })
                    }
                };
            }
            Panel::RegionMap => {
                let counts = by_region(&dataset);
                self.state.set_all_regions(counts.regions());
                self.region_map = View::from_option((!counts.is_empty()).then(|| Choropleth::new(counts)));
            }
            Panel::TopStats => {
                self.top_stats = self.build_top_stats(&dataset, &region);
                self.request_enrichments(&region);
            }
        }
    }

    fn build_top_stats(&self, dataset: &Dataset, region: &str) -> View<TopStats> {
        let unique = unique_titles(dataset, region);
        if unique == 0 {
            return View::NoData;
        }
        let titles = top_titles(dataset, region, self.config.top_n)
            .iter()
            .map(|ranked| TitleCard::new(ranked, self.enrichment_for(ranked)))
            .collect();
        let raters = top_raters(dataset, region, self.config.top_n)
            .iter()
            .map(RaterCard::new)
            .collect();
        View::Ready(TopStats {
            region: region.to_string(),
            unique_titles: unique,
            titles,
            raters,
        })
    }

    fn enrichment_for(&self, ranked: &Ranked) -> Option<&Enrichment> {
        if ranked.placeholder {
            None
        } else {
            self.enrichments.get(&ranked.identity)
        }
    }

    /// Queue lookups for pending cards, tagged with `region`.
    fn request_enrichments(&mut self, region: &str) {
        let pending: Vec<String> = match &self.top_stats {
            View::Ready(stats) => stats
                .titles
                .iter()
                .filter(|card| card.pending)
                .map(|card| card.title.clone())
                .collect(),
            _ => Vec::new(),
        };

        for title in pending {
            if !self.enrichments.begin(&title, region) {
                continue;
            }
            self.lookup_queue.retain(|(queued, _)| queued != &title);
            self.lookup_queue.push_back((title, region.to_string()));
        }
        // Also drains entries queued under a previous selection
        self.dispatch_lookups();
    }

    /// Start queued lookups while fewer than `max_concurrent_lookups` run.
    fn dispatch_lookups(&mut self) {
        let limit = self.config.max_concurrent_lookups.max(1);
        while self.lookups_running.len() < limit {
            let Some((title, region)) = self.lookup_queue.pop_front() else {
                break;
            };
            if region != self.state.selected_region() {
                log::debug!("Skipping queued lookup for '{}' from region '{}'", title, region);
                self.enrichments.abandon(&title, &region);
                continue;
            }
            if self.enrichments.claim(&title) != Some(region.as_str()) {
                continue;
            }
            let generation = self.load_generation;
            if !self.lookups_running.insert((generation, title.clone(), region.clone())) {
                // The same lookup is already on a worker and will settle the claim
                continue;
            }

            let lookup = Arc::clone(&self.lookup);
            let tx = self.events_tx.clone();
            thread::spawn(move || {
                let enrichment = resolve_title(lookup.as_ref(), &title);
                let event = DashboardEvent::TitleEnriched {
                    generation,
                    region,
                    title,
                    enrichment,
                };
                if tx.send(event).is_err() {
                    log::debug!("Dashboard gone before enrichment arrived");
                }
            });
        }
    }

    fn refresh_title_cards(&mut self) {
        let View::Ready(stats) = &self.top_stats else {
            return;
        };
        let refreshed: Vec<TitleCard> = stats
            .titles
            .iter()
            .map(|card| match self.enrichments.get(&card.title) {
                Some(enrichment) if card.pending => TitleCard {
                    image_url: enrichment.image_url.clone(),
                    description: enrichment.description.clone(),
                    pending: false,
                    ..card.clone()
                },
                _ => card.clone(),
            })
            .collect();
        if let View::Ready(stats) = &mut self.top_stats {
            stats.titles = refreshed;
        }
    }
}
