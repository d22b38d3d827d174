//! Per-agent grouping and aggregation.
//!
//! Rows are folded into an insertion-ordered arena of groups keyed by
//! agent. Duration columns are summed; other columns keep the first
//! non-null value seen in concatenation order.

use crate::models::{Cell, ColumnKind};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Grouping key of an agent.
///
/// Numeric and text identities never share a group (`42` and `"42"` are
/// different agents). Numbers sort numerically and before any text.
#[derive(Debug, Clone)]
pub enum AgentKey {
    Number(f64),
    Text(String),
}

impl AgentKey {
    /// The identity cell written for this agent.
    pub fn to_cell(&self) -> Cell {
        match self {
            AgentKey::Number(n) => Cell::Number(*n),
            AgentKey::Text(s) => Cell::Text(s.clone()),
        }
    }
}

impl Ord for AgentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AgentKey::Number(a), AgentKey::Number(b)) => a.total_cmp(b),
            (AgentKey::Number(_), AgentKey::Text(_)) => Ordering::Less,
            (AgentKey::Text(_), AgentKey::Number(_)) => Ordering::Greater,
            (AgentKey::Text(a), AgentKey::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for AgentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for AgentKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AgentKey {}

impl Hash for AgentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AgentKey::Number(n) => {
                0u8.hash(state);
                n.to_bits().hash(state);
            }
            AgentKey::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

/// One agent's accumulated row.
#[derive(Debug, Clone)]
pub struct Group {
    /// Grouping key.
    pub key: AgentKey,
    /// Aggregated cells, one per column.
    pub cells: Vec<Cell>,
}

/// Insertion-ordered arena of groups.
#[derive(Debug)]
pub struct GroupArena<'a> {
    kinds: &'a [ColumnKind],
    identity: usize,
    trim_keys: bool,
    index: HashMap<AgentKey, usize>,
    groups: Vec<Group>,
}

impl<'a> GroupArena<'a> {
    /// Create an empty arena for rows shaped by `kinds`.
    pub fn new(kinds: &'a [ColumnKind], identity: usize, trim_keys: bool) -> Self {
        Self {
            kinds,
            identity,
            trim_keys,
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Fold one row into its agent's group.
    ///
    /// Rows with an invalid identity must already have been filtered out.
    pub fn push(&mut self, row: &[Cell]) {
        let identity = &row[self.identity];
        let key = agent_key(identity, self.trim_keys);

        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.groups.len();
                let group = self.empty_group(key.clone());
                self.groups.push(group);
                self.index.insert(key, slot);
                slot
            }
        };

        let group = &mut self.groups[slot];
        for (idx, kind) in self.kinds.iter().enumerate() {
            match kind {
                ColumnKind::Identity => {}
                ColumnKind::Duration => {
                    let current = group.cells[idx].as_number().unwrap_or(0.0);
                    let add = row[idx].as_number().unwrap_or(0.0);
                    group.cells[idx] = Cell::Number(current + add);
                }
                ColumnKind::Other => {
                    if group.cells[idx].is_null() && !row[idx].is_null() {
                        group.cells[idx] = row[idx].clone();
                    }
                }
            }
        }
    }

    fn empty_group(&self, key: AgentKey) -> Group {
        let cells = self
            .kinds
            .iter()
            .map(|kind| match kind {
                ColumnKind::Identity => key.to_cell(),
                ColumnKind::Duration => Cell::Number(0.0),
                _ => Cell::Null,
            })
            .collect();

        Group { key, cells }
    }

    /// Number of distinct agents seen so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Finish aggregation, returning groups sorted ascending by key.
    pub fn into_sorted_groups(self) -> Vec<Group> {
        let mut groups = self.groups;
        groups.sort_by(|a, b| a.key.cmp(&b.key));
        groups
    }
}

/// Build the grouping key for an identity cell.
///
/// With `trim`, text identities are keyed (and written) trimmed.
pub fn agent_key(identity: &Cell, trim: bool) -> AgentKey {
    match identity {
        Cell::Number(n) => AgentKey::Number(*n),
        Cell::Text(s) if trim => AgentKey::Text(s.trim().to_string()),
        Cell::Text(s) => AgentKey::Text(s.clone()),
        Cell::Null => AgentKey::Text(String::new()),
    }
}

/// Whether an identity cell names a real agent.
///
/// Null cells and text that is empty after trimming do not.
pub fn is_valid_identity(identity: &Cell) -> bool {
    match identity {
        Cell::Text(s) => !s.trim().is_empty(),
        other => !other.is_null(),
    }
}

/// Build the summary row: duration columns hold the mean over `groups`,
/// identity holds `label`, everything else is null.
pub fn summary_row(kinds: &[ColumnKind], groups: &[Group], label: &str) -> Vec<Cell> {
    kinds
        .iter()
        .enumerate()
        .map(|(idx, kind)| match kind {
            ColumnKind::Identity => Cell::text(label),
            ColumnKind::Duration => mean(groups.iter().map(|g| &g.cells[idx])).into(),
            ColumnKind::Other => Cell::Null,
        })
        .collect()
}

/// Arithmetic mean of the numeric cells; `None` when there are none.
fn mean<'c>(cells: impl Iterator<Item = &'c Cell>) -> Option<f64> {
    let (sum, count) = cells
        .filter_map(Cell::as_number)
        .fold((0.0, 0usize), |(sum, count), n| (sum + n, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [ColumnKind; 3] = [
        ColumnKind::Identity,
        ColumnKind::Duration,
        ColumnKind::Other,
    ];

    fn text_key(s: &str) -> AgentKey {
        AgentKey::Text(s.to_string())
    }

    fn row(name: &str, secs: f64, team: Cell) -> Vec<Cell> {
        vec![Cell::text(name), Cell::Number(secs), team]
    }

    #[test]
    fn test_sums_durations_per_agent() {
        let mut arena = GroupArena::new(&KINDS, 0, false);
        arena.push(&row("Alice", 100.0, Cell::Null));
        arena.push(&row("Bob", 30.0, Cell::Null));
        arena.push(&row("Alice", 50.0, Cell::Null));

        assert_eq!(arena.len(), 2);
        let groups = arena.into_sorted_groups();
        assert_eq!(groups[0].key, text_key("Alice"));
        assert_eq!(groups[0].cells[1], Cell::Number(150.0));
        assert_eq!(groups[1].cells[1], Cell::Number(30.0));
    }

    #[test]
    fn test_first_non_null_wins() {
        let mut arena = GroupArena::new(&KINDS, 0, false);
        arena.push(&row("Alice", 0.0, Cell::Null));
        arena.push(&row("Alice", 0.0, Cell::text("North")));
        arena.push(&row("Alice", 0.0, Cell::text("South")));

        let groups = arena.into_sorted_groups();
        assert_eq!(groups[0].cells[2], Cell::text("North"));
    }

    #[test]
    fn test_groups_sorted_by_key() {
        let mut arena = GroupArena::new(&KINDS, 0, false);
        for name in ["Carol", "Alice", "Bob"] {
            arena.push(&row(name, 1.0, Cell::Null));
        }
        let keys: Vec<AgentKey> = arena.into_sorted_groups().into_iter().map(|g| g.key).collect();
        assert_eq!(keys, vec![text_key("Alice"), text_key("Bob"), text_key("Carol")]);
    }

    #[test]
    fn test_untrimmed_keys_stay_distinct() {
        let mut arena = GroupArena::new(&KINDS, 0, false);
        arena.push(&row("Alice", 1.0, Cell::Null));
        arena.push(&row("Alice ", 1.0, Cell::Null));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_trimmed_keys_merge() {
        let mut arena = GroupArena::new(&KINDS, 0, true);
        arena.push(&row(" Alice", 1.0, Cell::Null));
        arena.push(&row("Alice ", 2.0, Cell::Null));

        let groups = arena.into_sorted_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].cells[0], Cell::text("Alice"));
        assert_eq!(groups[0].cells[1], Cell::Number(3.0));
    }

    #[test]
    fn test_numeric_identity_key() {
        assert_eq!(agent_key(&Cell::Number(42.0), false), AgentKey::Number(42.0));
        assert_ne!(agent_key(&Cell::Number(42.0), false), text_key("42"));
        assert!(is_valid_identity(&Cell::Number(42.0)));
    }

    #[test]
    fn test_numeric_and_text_identities_stay_apart() {
        let mut arena = GroupArena::new(&KINDS, 0, false);
        let numeric = |n: f64, secs: f64| vec![Cell::Number(n), Cell::Number(secs), Cell::Null];
        arena.push(&numeric(100.0, 1.0));
        arena.push(&numeric(42.0, 60.0));
        arena.push(&row("42", 120.0, Cell::Null));
        arena.push(&numeric(9.0, 1.0));

        let groups = arena.into_sorted_groups();
        let identities: Vec<Cell> = groups.iter().map(|g| g.cells[0].clone()).collect();
        assert_eq!(
            identities,
            vec![
                Cell::Number(9.0),
                Cell::Number(42.0),
                Cell::Number(100.0),
                Cell::text("42"),
            ]
        );
        assert_eq!(groups[1].cells[1], Cell::Number(60.0));
        assert_eq!(groups[3].cells[1], Cell::Number(120.0));
    }

    #[test]
    fn test_is_valid_identity() {
        assert!(is_valid_identity(&Cell::text("Alice")));
        assert!(!is_valid_identity(&Cell::text("   ")));
        assert!(!is_valid_identity(&Cell::text("")));
        assert!(!is_valid_identity(&Cell::Null));
        assert!(!is_valid_identity(&Cell::Number(f64::NAN)));
    }

    #[test]
    fn test_summary_row_mean() {
        let mut arena = GroupArena::new(&KINDS, 0, false);
        arena.push(&row("Alice", 10_800.0, Cell::text("A")));
        arena.push(&row("Bob", 5_420.0, Cell::text("B")));
        let groups = arena.into_sorted_groups();

        let summary = summary_row(&KINDS, &groups, "Average");
        assert_eq!(summary[0], Cell::text("Average"));
        assert_eq!(summary[1], Cell::Number(8_110.0));
        assert_eq!(summary[2], Cell::Null);
    }

    #[test]
    fn test_summary_row_without_agents() {
        let summary = summary_row(&KINDS, &[], "Average");
        assert_eq!(summary[1], Cell::Null);
    }
}
