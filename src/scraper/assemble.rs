//! Merge competitor rows with the race metadata

use crate::models::{CompetitorRecord, EntryRow, EntryTable, RaceMetadata};

/// Broadcast `metadata` onto every named record, dropping the rest.
///
/// Page order is kept; the resulting table is indexed from zero.
pub fn assemble<I>(records: I, metadata: &RaceMetadata) -> EntryTable
where
    I: IntoIterator<Item = CompetitorRecord>,
{
    let mut dropped = 0;
    let rows: Vec<EntryRow> = records
        .into_iter()
        .filter_map(|record| {
            let row = EntryRow::new(record, metadata.clone());
            if row.is_none() {
                dropped += 1;
            }
            row
        })
        .collect();

    if dropped > 0 {
        tracing::info!("Dropped {} unnamed entries", dropped);
    }

    EntryTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Surface, COLUMNS};

    fn metadata() -> RaceMetadata {
        RaceMetadata {
            race_id: "202409050611".to_string(),
            surface: Some(Surface::Dirt),
            distance: Some(1800),
            direction: None,
            weather: Some("曇".to_string()),
            ground_condition: None,
            race_class: "３歳以上２勝クラス".to_string(),
            venue: "阪神".to_string(),
            race_name: "テスト特別".to_string(),
            date: "2024-12-15".to_string(),
        }
    }

    fn named(name: Option<&str>, bib: u32) -> CompetitorRecord {
        CompetitorRecord {
            name: name.map(String::from),
            bib: Some(bib),
            ..Default::default()
        }
    }

    #[test]
    fn test_drops_unnamed_and_keeps_order() {
        let records = vec![
            named(Some("A"), 1),
            named(None, 2),
            named(Some("C"), 3),
            named(None, 4),
            named(Some("E"), 5),
        ];
        let table = assemble(records, &metadata());

        assert_eq!(table.len(), 3);
        let bibs: Vec<Option<u32>> = table.iter().map(|r| r.competitor().bib).collect();
        assert_eq!(bibs, vec![Some(1), Some(3), Some(5)]);
        assert_eq!(table.get(0).unwrap().name(), "A");
        assert_eq!(table.get(2).unwrap().name(), "E");
    }

    #[test]
    fn test_metadata_identical_on_every_row() {
        let meta = metadata();
        let records = (1..=5).map(|i| named(Some("X"), i));
        let table = assemble(records, &meta);

        for row in &table {
            assert_eq!(row.race(), &meta);
            let cells = row.cells();
            assert_eq!(cells[COLUMNS.len() - 1].as_deref(), Some("2024-12-15"));
        }
    }

    #[test]
    fn test_all_unnamed_gives_empty_table() {
        let table = assemble(vec![named(None, 1), named(None, 2)], &metadata());
        assert!(table.is_empty());
    }
}
