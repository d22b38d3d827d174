//! Table merging.
//!
//! Concatenates the raw tables from every input workbook, normalizes
//! duration columns to seconds, aggregates one row per agent and appends
//! the summary row.

pub mod aggregator;

use crate::duration;
use crate::error::MergeError;
use crate::models::{Cell, ColumnKind, ColumnSpec, RawTable, Table};
use aggregator::{is_valid_identity, summary_row, GroupArena};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Header of the agent identity column.
pub const IDENTITY_COLUMN: &str = "Collector Name";

/// Identity value of the summary row.
pub const SUMMARY_LABEL: &str = "Average";

/// Administrative columns removed before aggregation.
pub const DROP_COLUMNS: [&str; 3] = ["SNo.", "Total Calls", "Pause Count"];

/// Columns holding durations.
pub const DURATION_COLUMNS: [&str; 8] = [
    "Spent Time",
    "Talk Time",
    "AVG Talk Time",
    "Wait Time",
    "Average Wait Time",
    "Write Time",
    "AVG Write Time",
    "Pause Time",
];

/// Column roles the merger runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Header of the identity column.
    pub identity: String,
    /// Identity value written into the summary row.
    pub summary_label: String,
    /// Columns dropped when present.
    pub drop: Vec<String>,
    /// Duration columns.
    pub durations: Vec<String>,
    /// Group on the trimmed identity instead of the raw value.
    pub trim_identity: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            identity: IDENTITY_COLUMN.to_string(),
            summary_label: SUMMARY_LABEL.to_string(),
            drop: DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
            durations: DURATION_COLUMNS.iter().map(|s| s.to_string()).collect(),
            trim_identity: false,
        }
    }
}

impl From<&crate::config::ColumnsConfig> for Schema {
    fn from(config: &crate::config::ColumnsConfig) -> Self {
        Self {
            identity: config.identity.clone(),
            summary_label: config.summary_label.clone(),
            drop: config.drop.clone(),
            durations: config.durations.clone(),
            trim_identity: config.trim_identity,
        }
    }
}

impl Schema {
    fn kind_of(&self, header: &str) -> ColumnKind {
        if header == self.identity {
            ColumnKind::Identity
        } else if self.durations.iter().any(|d| d == header) {
            ColumnKind::Duration
        } else {
            ColumnKind::Other
        }
    }
}

/// Merge tables with the default schema.
pub fn merge(tables: &[RawTable]) -> Result<Table, MergeError> {
    Merger::default().merge(tables)
}

/// Runs the merge pipeline for a given schema.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    schema: Schema,
}

/// Row-major working copy of the concatenated input.
struct Concatenated {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Merger {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Merge and aggregate the given tables.
    pub fn merge(&self, tables: &[RawTable]) -> Result<Table, MergeError> {
        if tables.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        for (idx, table) in tables.iter().enumerate() {
            validate_table(idx + 1, table)?;
        }

        let mut data = concatenate(tables);
        debug!(
            "Concatenated {} tables into {} rows x {} columns",
            tables.len(),
            data.rows.len(),
            data.headers.len()
        );

        self.drop_columns(&mut data);

        let identity = data
            .headers
            .iter()
            .position(|h| *h == self.schema.identity)
            .ok_or_else(|| MergeError::Schema(self.schema.identity.clone()))?;

        let before = data.rows.len();
        data.rows.retain(|row| is_valid_identity(&row[identity]));
        debug!(
            "Filtered {} rows without a valid {}",
            before - data.rows.len(),
            self.schema.identity
        );

        let kinds: Vec<ColumnKind> = data.headers.iter().map(|h| self.schema.kind_of(h)).collect();
        normalize_durations(&mut data.rows, &kinds);

        let columns: Vec<ColumnSpec> = data
            .headers
            .iter()
            .zip(&kinds)
            .map(|(name, kind)| ColumnSpec::new(name.clone(), *kind))
            .collect();

        if kinds.iter().all(|k| *k == ColumnKind::Identity) {
            debug!("No columns to aggregate, returning filtered rows unchanged");
            return assemble(columns, data.rows);
        }

        let mut arena = GroupArena::new(&kinds, identity, self.schema.trim_identity);
        for row in &data.rows {
            arena.push(row);
        }
        debug!("Grouped {} rows into {} agents", data.rows.len(), arena.len());

        let groups = arena.into_sorted_groups();
        let summary = summary_row(&kinds, &groups, &self.schema.summary_label);

        let mut rows: Vec<Vec<Cell>> = groups.into_iter().map(|g| g.cells).collect();
        let agents = rows.len();
        rows.push(summary);

        info!(
            "Merged {} agents across {} columns ({} duration)",
            agents,
            columns.len(),
            kinds.iter().filter(|k| **k == ColumnKind::Duration).count()
        );

        assemble(columns, rows)
    }

    fn drop_columns(&self, data: &mut Concatenated) {
        let keep: Vec<bool> = data
            .headers
            .iter()
            .map(|h| !self.schema.drop.contains(h))
            .collect();

        if keep.iter().all(|k| *k) {
            return;
        }

        data.headers = retain_by_mask(std::mem::take(&mut data.headers), &keep);
        for row in data.rows.iter_mut() {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
    }
}

/// Reject tables whose columns disagree in length or repeat a header.
fn validate_table(position: usize, table: &RawTable) -> Result<(), MergeError> {
    let expected = table.row_count();
    let mut seen = HashSet::new();

    for column in &table.columns {
        if !seen.insert(column.header.as_str()) {
            return Err(MergeError::Structure {
                table: position,
                reason: format!("duplicate column {:?}", column.header),
            });
        }
        if column.cells.len() != expected {
            return Err(MergeError::Structure {
                table: position,
                reason: format!(
                    "column {:?} has {} cells, expected {}",
                    column.header,
                    column.cells.len(),
                    expected
                ),
            });
        }
    }

    Ok(())
}

/// Outer-union concatenation: headers in order of first appearance, cells
/// absent from a table become `Null`.
fn concatenate(tables: &[RawTable]) -> Concatenated {
    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for table in tables {
        for column in &table.columns {
            if !positions.contains_key(&column.header) {
                positions.insert(column.header.clone(), headers.len());
                headers.push(column.header.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(tables.iter().map(RawTable::row_count).sum());
    for table in tables {
        let targets: Vec<usize> = table.columns.iter().map(|c| positions[&c.header]).collect();
        for r in 0..table.row_count() {
            let mut row = vec![Cell::Null; headers.len()];
            for (column, &target) in table.columns.iter().zip(&targets) {
                row[target] = column.cells[r].clone();
            }
            rows.push(row);
        }
    }

    Concatenated { headers, rows }
}

fn normalize_durations(rows: &mut [Vec<Cell>], kinds: &[ColumnKind]) {
    for row in rows.iter_mut() {
        for (cell, kind) in row.iter_mut().zip(kinds) {
            if *kind == ColumnKind::Duration {
                *cell = Cell::Number(duration::parse(cell));
            }
        }
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}

/// Build the output table, checking every row matches the column count.
fn assemble(columns: Vec<ColumnSpec>, rows: Vec<Vec<Cell>>) -> Result<Table, MergeError> {
    if let Some((idx, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(MergeError::Merge(format!(
            "row {} has {} cells for {} columns",
            idx,
            row.len(),
            columns.len()
        )));
    }

    Ok(Table { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawColumn;

    fn text(s: &str) -> Cell {
        Cell::text(s)
    }

    fn talk_table(rows: &[(&str, &str)]) -> RawTable {
        RawTable::from_rows(
            ["Collector Name", "Talk Time"],
            rows.iter().map(|(n, t)| vec![text(n), text(t)]).collect(),
        )
    }

    fn seconds(table: &Table, agent: &str, column: &str) -> Option<f64> {
        let idx = table.column_index(column)?;
        table.row_for(agent)?.get(idx)?.as_number()
    }

    #[test]
    fn test_two_file_scenario() {
        let file = talk_table(&[("Alice", "1:30:00"), ("Bob", "0:45:10")]);
        let table = merge(&[file.clone(), file]).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(seconds(&table, "Alice", "Talk Time"), Some(10_800.0));
        assert_eq!(seconds(&table, "Bob", "Talk Time"), Some(5_420.0));
        assert_eq!(seconds(&table, "Average", "Talk Time"), Some(8_110.0));
        assert_eq!(table.rows.last().unwrap()[0], text("Average"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(merge(&[]), Err(MergeError::EmptyInput));
    }

    #[test]
    fn test_missing_identity_column() {
        let table =
            RawTable::from_rows(["Agent", "Talk Time"], vec![vec![text("A"), text("1:00")]]);
        assert_eq!(
            merge(&[table]),
            Err(MergeError::Schema("Collector Name".to_string()))
        );
    }

    #[test]
    fn test_whitespace_identity_excluded() {
        let table = talk_table(&[("   ", "1:00:00"), ("Alice", "0:10:00"), ("", "0:01:00")]);
        let merged = merge(&[table]).unwrap();

        assert_eq!(merged.len(), 2);
        let identity = merged.identity_index().unwrap();
        for row in &merged.rows {
            assert!(is_valid_identity(&row[identity]));
        }
        assert_eq!(seconds(&merged, "Average", "Talk Time"), Some(600.0));
    }

    #[test]
    fn test_null_identity_excluded() {
        let table = RawTable::from_rows(
            ["Collector Name", "Talk Time"],
            vec![vec![Cell::Null, text("1:00:00")], vec![text("Bob"), text("0:01:00")]],
        );
        let merged = merge(&[table]).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.row_for("Bob").is_some());
    }

    #[test]
    fn test_outer_union_of_columns() {
        let first = RawTable::from_rows(
            ["Collector Name", "Talk Time"],
            vec![vec![text("Alice"), text("0:10:00")]],
        );
        let second = RawTable::from_rows(
            ["Wait Time", "Collector Name", "Team"],
            vec![vec![text("0:05:00"), text("Alice"), text("North")]],
        );

        let merged = merge(&[first, second]).unwrap();
        assert_eq!(
            merged.column_names(),
            vec!["Collector Name", "Talk Time", "Wait Time", "Team"]
        );
        assert_eq!(seconds(&merged, "Alice", "Talk Time"), Some(600.0));
        assert_eq!(seconds(&merged, "Alice", "Wait Time"), Some(300.0));
        assert_eq!(merged.row_for("Alice").unwrap()[3], text("North"));
    }

    #[test]
    fn test_identity_keeps_position() {
        let table = RawTable::from_rows(
            ["Team", "Talk Time", "Collector Name"],
            vec![vec![text("A"), text("1:00"), text("Zed")]],
        );
        let merged = merge(&[table]).unwrap();
        assert_eq!(merged.column_names(), vec!["Team", "Talk Time", "Collector Name"]);
        assert_eq!(merged.identity_index(), Some(2));
        assert_eq!(merged.rows[1][2], text("Average"));
        assert_eq!(merged.rows[1][0], Cell::Null);
    }

    #[test]
    fn test_drop_list_is_irrelevant_to_content() {
        let plain = talk_table(&[("Alice", "0:30:00"), ("Bob", "0:15:00")]);
        let with_admin = RawTable::from_rows(
            ["SNo.", "Collector Name", "Total Calls", "Talk Time", "Pause Count"],
            vec![
                vec![
                    Cell::Number(1.0),
                    text("Alice"),
                    Cell::Number(12.0),
                    text("0:30:00"),
                    Cell::Number(3.0),
                ],
                vec![
                    Cell::Number(2.0),
                    text("Bob"),
                    Cell::Number(7.0),
                    text("0:15:00"),
                    Cell::Number(1.0),
                ],
            ],
        );

        assert_eq!(merge(&[plain]).unwrap(), merge(&[with_admin]).unwrap());
    }

    #[test]
    fn test_sum_and_average_invariants() {
        let a = talk_table(&[("Alice", "0:01:00"), ("Bob", "2:00"), ("Carol", "bogus")]);
        let b = talk_table(&[("Alice", "1:00:00"), ("Carol", "0:00:30")]);
        let c = RawTable::from_rows(
            ["Collector Name", "Talk Time"],
            vec![vec![text("Bob"), Cell::Number(15.0)], vec![text("Alice"), Cell::Null]],
        );

        let merged = merge(&[a, b, c]).unwrap();

        assert_eq!(merged.len(), 4);
        assert_eq!(seconds(&merged, "Alice", "Talk Time"), Some(3_660.0));
        assert_eq!(seconds(&merged, "Bob", "Talk Time"), Some(135.0));
        assert_eq!(seconds(&merged, "Carol", "Talk Time"), Some(30.0));

        let mean = (3_660.0 + 135.0 + 30.0) / 3.0;
        let avg = seconds(&merged, "Average", "Talk Time").unwrap();
        assert!((avg - mean).abs() < 1e-9);
    }

    #[test]
    fn test_rows_sorted_by_agent() {
        let table = talk_table(&[("Carol", "1:00"), ("Alice", "1:00"), ("Bob", "1:00")]);
        let merged = merge(&[table]).unwrap();
        let names: Vec<String> = merged.rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol", "Average"]);
    }

    #[test]
    fn test_other_columns_first_wins_and_null_in_summary() {
        let a = RawTable::from_rows(
            ["Collector Name", "Team", "Talk Time"],
            vec![vec![text("Alice"), text("North"), text("0:01:00")]],
        );
        let b = RawTable::from_rows(
            ["Collector Name", "Team", "Talk Time"],
            vec![vec![text("Alice"), text("South"), text("0:02:00")]],
        );

        let merged = merge(&[a, b]).unwrap();
        assert_eq!(merged.row_for("Alice").unwrap()[1], text("North"));
        assert_eq!(merged.row_for("Average").unwrap()[1], Cell::Null);
    }

    #[test]
    fn test_untrimmed_identities_group_separately() {
        let table = talk_table(&[("Alice", "0:01:00"), ("Alice ", "0:02:00")]);
        let merged = merge(&[table]).unwrap();
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_trim_identity_schema() {
        let table = talk_table(&[("Alice", "0:01:00"), ("Alice ", "0:02:00")]);
        let merger = Merger::new(Schema {
            trim_identity: true,
            ..Schema::default()
        });

        let merged = merger.merge(&[table]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(seconds(&merged, "Alice", "Talk Time"), Some(180.0));
    }

    #[test]
    fn test_degenerate_identity_only() {
        let table = RawTable::from_rows(
            ["Collector Name", "SNo."],
            vec![
                vec![text("Alice"), Cell::Number(1.0)],
                vec![text("  "), Cell::Number(2.0)],
                vec![text("Alice"), Cell::Number(3.0)],
            ],
        );

        let merged = merge(&[table]).unwrap();
        assert_eq!(merged.column_names(), vec!["Collector Name"]);
        assert_eq!(merged.rows, vec![vec![text("Alice")], vec![text("Alice")]]);
    }

    #[test]
    fn test_all_rows_filtered_leaves_null_average() {
        let table = talk_table(&[("  ", "1:00:00")]);
        let merged = merge(&[table]).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows[0], vec![text("Average"), Cell::Null]);
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let table = RawTable::new(vec![
            RawColumn::new("Collector Name", vec![text("A")]),
            RawColumn::new("Collector Name", vec![text("B")]),
        ]);
        assert!(matches!(
            merge(&[table]),
            Err(MergeError::Structure { table: 1, .. })
        ));
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let good = talk_table(&[("Alice", "1:00")]);
        let ragged = RawTable::new(vec![
            RawColumn::new("Collector Name", vec![text("A"), text("B")]),
            RawColumn::new("Talk Time", vec![text("1:00")]),
        ]);
        assert!(matches!(
            merge(&[good, ragged]),
            Err(MergeError::Structure { table: 2, .. })
        ));
    }

    #[test]
    fn test_all_duration_columns_recognized() {
        let headers: Vec<&str> = std::iter::once(IDENTITY_COLUMN)
            .chain(DURATION_COLUMNS.iter().copied())
            .collect();
        let row: Vec<Cell> = std::iter::once(text("Alice"))
            .chain(DURATION_COLUMNS.iter().map(|_| text("0:00:10")))
            .collect();

        let merged = merge(&[RawTable::from_rows(headers, vec![row])]).unwrap();
        for name in DURATION_COLUMNS {
            let idx = merged.column_index(name).unwrap();
            assert_eq!(merged.columns[idx].kind, ColumnKind::Duration);
            assert_eq!(merged.rows[0][idx], Cell::Number(10.0));
        }
    }

    #[test]
    fn test_assemble_rejects_misshapen_rows() {
        let columns = vec![
            ColumnSpec::new("Collector Name", ColumnKind::Identity),
            ColumnSpec::new("Talk Time", ColumnKind::Duration),
        ];
        let rows = vec![
            vec![text("Alice"), Cell::Number(60.0)],
            vec![text("Bob")],
        ];

        assert_eq!(
            assemble(columns, rows),
            Err(MergeError::Merge("row 1 has 1 cells for 2 columns".to_string()))
        );
    }
}
