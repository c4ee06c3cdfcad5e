use std::cmp::Ordering;

use feruca::Collator;
use tracing::{debug, info, warn};

use crate::models::{Route, SubmissionMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Error(String),
}

/// Result of one fetch attempt, already interpreted from the response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(SubmissionMap),
    InvalidToken,
    Failed(String),
}

/// Sequence number of an issued fetch. Only the latest ticket's outcome is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    Stale,
    Navigate(Route),
}

/// What the viewer should draw for the current state. Exactly one applies.
#[derive(Debug, PartialEq, Eq)]
pub enum ViewerContent<'a> {
    Loading,
    Error(&'a str),
    Empty,
    Browse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamEntry<'a> {
    pub name: &'a str,
    pub summary: String,
    pub selected: bool,
}

#[derive(Debug)]
pub struct SubmissionsView {
    load_state: LoadState,
    submissions: SubmissionMap,
    team_list: Vec<String>,
    selected_team: String,
    latest_ticket: u64,
    fetch_key: Option<(String, String)>,
}

impl Default for SubmissionsView {
    fn default() -> Self {
        Self {
            load_state: LoadState::Loading,
            submissions: SubmissionMap::new(),
            team_list: Vec::new(),
            selected_team: String::new(),
            latest_ticket: 0,
            fetch_key: None,
        }
    }
}

impl SubmissionsView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch when `league_id` or `token` differ from the last trigger.
    /// Blank inputs never trigger a fetch.
    pub fn trigger(&mut self, league_id: &str, token: &str) -> Option<FetchTicket> {
        if league_id.is_empty() || token.is_empty() {
            return None;
        }
        let key = (league_id.to_string(), token.to_string());
        if self.fetch_key.as_ref() == Some(&key) {
            return None;
        }
        self.fetch_key = Some(key);
        Some(self.begin_fetch())
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_ticket += 1;
        self.load_state = LoadState::Loading;
        debug!("Fetch ticket {} issued", self.latest_ticket);
        FetchTicket(self.latest_ticket)
    }

    pub fn apply(&mut self, ticket: FetchTicket, outcome: FetchOutcome) -> ApplyResult {
        if ticket.0 != self.latest_ticket {
            warn!(
                "Dropping outcome of fetch {} (latest is {})",
                ticket.0, self.latest_ticket
            );
            return ApplyResult::Stale;
        }

        match outcome {
            FetchOutcome::Loaded(map) => {
                self.team_list = sorted_team_list(&map);
                self.selected_team = map.keys().next().cloned().unwrap_or_default();
                self.submissions = map;
                self.load_state = LoadState::Loaded;
                info!(
                    "Loaded {} submissions, default team {:?}",
                    self.submissions.len(),
                    self.selected_team
                );
                ApplyResult::Applied
            }
            FetchOutcome::InvalidToken => {
                self.load_state = LoadState::Loaded;
                info!("Backend rejected the access token, leaving submissions");
                ApplyResult::Navigate(Route::Institution)
            }
            FetchOutcome::Failed(message) => {
                self.load_state = LoadState::Error(message);
                ApplyResult::Applied
            }
        }
    }

    /// Unknown team names are ignored so the selection always names a loaded team.
    pub fn select(&mut self, team: &str) -> bool {
        if team == self.selected_team || !self.submissions.contains_key(team) {
            return false;
        }
        debug!("Selected team {:?}", team);
        self.selected_team = team.to_string();
        true
    }

    pub fn content(&self) -> ViewerContent<'_> {
        match &self.load_state {
            LoadState::Loading => ViewerContent::Loading,
            LoadState::Error(message) => ViewerContent::Error(message),
            LoadState::Loaded if self.team_list.is_empty() => ViewerContent::Empty,
            LoadState::Loaded => ViewerContent::Browse,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    pub fn team_list(&self) -> &[String] {
        &self.team_list
    }

    pub fn selected_team(&self) -> &str {
        &self.selected_team
    }

    pub fn selected_code(&self) -> &str {
        self.submissions
            .get(&self.selected_team)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn team_entries(&self) -> impl Iterator<Item = TeamEntry<'_>> {
        self.team_list.iter().map(|team| TeamEntry {
            name: team,
            summary: code_summary(self.submissions.get(team).map(String::as_str)),
            selected: *team == self.selected_team,
        })
    }
}

/// N counts UTF-16 code units, matching what the web frontend reports.
pub fn code_summary(code: Option<&str>) -> String {
    match code {
        Some(code) if !code.is_empty() => format!("{} chars", code.encode_utf16().count()),
        _ => "No code".to_string(),
    }
}

pub fn sorted_team_list(map: &SubmissionMap) -> Vec<String> {
    let mut collator = Collator::default();
    let mut teams: Vec<String> = map.keys().cloned().collect();
    teams.sort_by(|a, b| locale_cmp(&mut collator, a, b));
    teams
}

/// Root-locale collation (accents secondary, lowercase before uppercase);
/// byte order breaks full ties so the sort is total.
pub fn locale_cmp(collator: &mut Collator, a: &str, b: &str) -> Ordering {
    collator.collate(a, b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> SubmissionMap {
        entries
            .iter()
            .map(|(team, code)| (team.to_string(), code.to_string()))
            .collect()
    }

    fn loaded(entries: &[(&str, &str)]) -> SubmissionsView {
        let mut view = SubmissionsView::new();
        let ticket = view.begin_fetch();
        assert_eq!(
            view.apply(ticket, FetchOutcome::Loaded(map(entries))),
            ApplyResult::Applied
        );
        view
    }

    #[test]
    fn starts_loading() {
        let view = SubmissionsView::new();
        assert_eq!(view.content(), ViewerContent::Loading);
        assert_eq!(view.selected_team(), "");
    }

    #[test]
    fn team_list_is_sorted_but_default_is_first_in_backend_order() {
        let view = loaded(&[("teamB", "code2"), ("teamA", "code1")]);
        assert_eq!(view.team_list(), ["teamA", "teamB"]);
        assert_eq!(view.selected_team(), "teamB");
        assert_eq!(view.selected_code(), "code2");
        assert_eq!(view.content(), ViewerContent::Browse);
    }

    #[test]
    fn team_list_ignores_backend_order() {
        let forward = loaded(&[("alpha", "a"), ("Beta", "b"), ("gamma", "c")]);
        let reversed = loaded(&[("gamma", "c"), ("Beta", "b"), ("alpha", "a")]);
        assert_eq!(forward.team_list(), reversed.team_list());
        assert_eq!(forward.team_list(), ["alpha", "Beta", "gamma"]);
    }

    #[test]
    fn empty_map_shows_empty_state() {
        let view = loaded(&[]);
        assert_eq!(view.content(), ViewerContent::Empty);
        assert_eq!(view.selected_team(), "");
        assert_eq!(view.selected_code(), "");
    }

    #[test]
    fn clicking_a_team_switches_the_code() {
        let mut view = loaded(&[("teamB", "code2"), ("teamA", "code1")]);
        assert!(view.select("teamA"));
        assert_eq!(view.selected_team(), "teamA");
        assert_eq!(view.selected_code(), "code1");
        assert!(!view.select("teamA"));
    }

    #[test]
    fn unknown_team_is_not_selected() {
        let mut view = loaded(&[("teamA", "code1")]);
        assert!(!view.select("ghost"));
        assert_eq!(view.selected_team(), "teamA");
    }

    #[test]
    fn backend_failure_shows_message() {
        let mut view = SubmissionsView::new();
        let ticket = view.begin_fetch();
        view.apply(ticket, FetchOutcome::Failed("bad league".to_string()));
        assert_eq!(view.content(), ViewerContent::Error("bad league"));
        assert!(!view.is_loading());
    }

    #[test]
    fn invalid_token_navigates_without_error() {
        let mut view = SubmissionsView::new();
        let ticket = view.begin_fetch();
        assert_eq!(
            view.apply(ticket, FetchOutcome::InvalidToken),
            ApplyResult::Navigate(Route::Institution)
        );
        assert!(!matches!(&view.load_state, LoadState::Error(_)));
        assert!(!view.is_loading());
    }

    #[test]
    fn new_fetch_clears_previous_error() {
        let mut view = SubmissionsView::new();
        let first = view.begin_fetch();
        view.apply(first, FetchOutcome::Failed("boom".to_string()));
        view.begin_fetch();
        assert_eq!(&view.load_state, &LoadState::Loading);
    }

    #[test]
    fn stale_outcome_is_dropped() {
        let mut view = SubmissionsView::new();
        let older = view.begin_fetch();
        let newer = view.begin_fetch();

        assert_eq!(
            view.apply(newer, FetchOutcome::Loaded(map(&[("new", "x")]))),
            ApplyResult::Applied
        );
        assert_eq!(
            view.apply(older, FetchOutcome::Loaded(map(&[("old", "y")]))),
            ApplyResult::Stale
        );
        assert_eq!(view.team_list(), ["new"]);
    }

    #[test]
    fn refetch_replaces_map_wholesale() {
        let mut view = loaded(&[("teamA", "1"), ("teamB", "2")]);
        let ticket = view.begin_fetch();
        view.apply(ticket, FetchOutcome::Loaded(map(&[("teamC", "3")])));
        assert_eq!(view.team_list(), ["teamC"]);
        assert_eq!(view.selected_team(), "teamC");
    }

    #[test]
    fn refetch_with_same_content_is_idempotent() {
        let entries = [("teamB", "code2"), ("teamA", "code1")];
        let mut view = loaded(&entries);
        let before: Vec<_> = view.team_entries().map(|e| (e.name.to_string(), e.summary, e.selected)).collect();

        let ticket = view.begin_fetch();
        view.apply(ticket, FetchOutcome::Loaded(map(&entries)));
        let after: Vec<_> = view.team_entries().map(|e| (e.name.to_string(), e.summary, e.selected)).collect();

        assert_eq!(before, after);
        assert_eq!(view.selected_team(), "teamB");
    }

    #[test]
    fn trigger_needs_league_and_token() {
        let mut view = SubmissionsView::new();
        assert!(view.trigger("", "token").is_none());
        assert!(view.trigger("7", "").is_none());
        assert!(view.trigger("7", "token").is_some());
    }

    #[test]
    fn trigger_only_fires_on_dependency_change() {
        let mut view = SubmissionsView::new();
        let first = view.trigger("7", "token").unwrap();
        assert!(view.trigger("7", "token").is_none());
        let second = view.trigger("8", "token").unwrap();
        let third = view.trigger("8", "rotated").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn team_entries_summarize_code() {
        let view = loaded(&[("teamA", "print(1)"), ("teamB", "")]);
        let entries: Vec<_> = view.team_entries().collect();
        assert_eq!(entries[0].summary, "8 chars");
        assert!(entries[0].selected);
        assert_eq!(entries[1].summary, "No code");
        assert!(!entries[1].selected);
    }

    #[test]
    fn code_summary_counts_utf16_units() {
        assert_eq!(code_summary(Some("😀")), "2 chars");
        assert_eq!(code_summary(Some("é = 1")), "5 chars");
        assert_eq!(code_summary(Some("")), "No code");
        assert_eq!(code_summary(None), "No code");
    }

    fn collate_sorted(names: &[&str]) -> Vec<String> {
        let entries: Vec<(&str, &str)> = names.iter().map(|name| (*name, "")).collect();
        sorted_team_list(&map(&entries))
    }

    #[test]
    fn locale_cmp_orders_case_and_length() {
        assert_eq!(
            collate_sorted(&["b", "B", "a", "A", "apple", "Zed", "zed2"]),
            ["a", "A", "apple", "b", "B", "Zed", "zed2"]
        );
    }

    #[test]
    fn locale_cmp_places_accented_names_with_their_base_letter() {
        assert_eq!(
            collate_sorted(&["Zebra", "Équipe", "émile", "f"]),
            ["émile", "Équipe", "f", "Zebra"]
        );
    }

    #[test]
    fn locale_cmp_follows_collation_order_for_punctuation() {
        assert_eq!(collate_sorted(&["team-1", "team_1"]), ["team_1", "team-1"]);
    }
}
