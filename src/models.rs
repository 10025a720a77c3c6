use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output columns, in the exact order and spelling the feature pipeline expects.
pub const COLUMNS: [&str; 20] = [
    "馬",
    "馬番",
    "性",
    "齢",
    "斤量",
    "体重",
    "体重変化",
    "騎手",
    "オッズ",
    "人気",
    "race_id",
    "芝・ダート",
    "距離",
    "回り",
    "天気",
    "馬場",
    "クラス",
    "場名",
    "レース名",
    "日付",
];

/// Sex code as printed in the 性齢 cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "牡")]
    Male,
    #[serde(rename = "牝")]
    Female,
    #[serde(rename = "セ")]
    Gelding,
}

impl Sex {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '牡' => Some(Sex::Male),
            '牝' => Some(Sex::Female),
            'セ' => Some(Sex::Gelding),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "牡",
            Sex::Female => "牝",
            Sex::Gelding => "セ",
        }
    }
}

/// Track surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    #[serde(rename = "芝")]
    Turf,
    #[serde(rename = "ダート")]
    Dirt,
}

impl Surface {
    pub fn label(&self) -> &'static str {
        match self {
            Surface::Turf => "芝",
            Surface::Dirt => "ダート",
        }
    }
}

/// Track direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "左")]
    Left,
    #[serde(rename = "右")]
    Right,
    #[serde(rename = "直線")]
    Straight,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Left => "左",
            Direction::Right => "右",
            Direction::Straight => "直線",
        }
    }
}

/// One starting entry as read from a competitor row
///
/// Every field is optional while the row is being read; a record without a
/// name is a scratched entry and never reaches the output table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorRecord {
    #[serde(rename = "馬")]
    pub name: Option<String>,
    #[serde(rename = "馬番")]
    pub bib: Option<u32>,
    #[serde(rename = "性")]
    pub sex: Option<Sex>,
    #[serde(rename = "齢")]
    pub age: Option<u32>,
    #[serde(rename = "斤量")]
    pub carried_weight: Option<f64>,
    #[serde(rename = "体重")]
    pub body_weight: Option<i32>,
    #[serde(rename = "体重変化")]
    pub body_weight_change: Option<i32>,
    #[serde(rename = "騎手")]
    pub handler: Option<String>,
    #[serde(rename = "オッズ")]
    pub odds: Option<String>,
    #[serde(rename = "人気")]
    pub popularity: Option<u32>,
}

/// Race-level attributes, broadcast onto every output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceMetadata {
    pub race_id: String,
    #[serde(rename = "芝・ダート")]
    pub surface: Option<Surface>,
    #[serde(rename = "距離")]
    pub distance: Option<u32>,
    #[serde(rename = "回り")]
    pub direction: Option<Direction>,
    #[serde(rename = "天気")]
    pub weather: Option<String>,
    #[serde(rename = "馬場")]
    pub ground_condition: Option<String>,
    #[serde(rename = "クラス")]
    pub race_class: String,
    #[serde(rename = "場名")]
    pub venue: String,
    #[serde(rename = "レース名")]
    pub race_name: String,
    /// yyyy-mm-dd
    #[serde(rename = "日付")]
    pub date: String,
}

/// A retained competitor merged with the race metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRow {
    #[serde(flatten)]
    competitor: CompetitorRecord,
    #[serde(flatten)]
    race: RaceMetadata,
}

impl EntryRow {
    /// Merge a competitor with the race metadata. Returns `None` for a
    /// competitor without a name.
    pub fn new(competitor: CompetitorRecord, race: RaceMetadata) -> Option<Self> {
        competitor.name.as_ref()?;
        Some(Self { competitor, race })
    }

    pub fn name(&self) -> &str {
        self.competitor.name.as_deref().unwrap_or_default()
    }

    pub fn competitor(&self) -> &CompetitorRecord {
        &self.competitor
    }

    pub fn race(&self) -> &RaceMetadata {
        &self.race
    }

    /// Cell values in `COLUMNS` order, nulls as `None`
    pub fn cells(&self) -> [Option<String>; 20] {
        let c = &self.competitor;
        let r = &self.race;
        [
            c.name.clone(),
            c.bib.map(|v| v.to_string()),
            c.sex.map(|v| v.code().to_string()),
            c.age.map(|v| v.to_string()),
            c.carried_weight.map(|v| format!("{:.1}", v)),
            c.body_weight.map(|v| v.to_string()),
            c.body_weight_change.map(|v| v.to_string()),
            c.handler.clone(),
            c.odds.clone(),
            c.popularity.map(|v| v.to_string()),
            Some(r.race_id.clone()),
            r.surface.map(|v| v.label().to_string()),
            r.distance.map(|v| v.to_string()),
            r.direction.map(|v| v.label().to_string()),
            r.weather.clone(),
            r.ground_condition.clone(),
            Some(r.race_class.clone()),
            Some(r.venue.clone()),
            Some(r.race_name.clone()),
            Some(r.date.clone()),
        ]
    }
}

/// Final ordered table, indexed from zero in page order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntryTable {
    rows: Vec<EntryRow>,
}

impl EntryTable {
    pub fn new(rows: Vec<EntryRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[EntryRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&EntryRow> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntryRow> {
        self.rows.iter()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the table as CSV with the exact column header
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", COLUMNS.join(","))?;

        for row in &self.rows {
            let values: Vec<String> = row
                .cells()
                .iter()
                .map(|cell| match cell {
                    Some(s) if s.contains(',') || s.contains('"') || s.contains('\n') => {
                        format!("\"{}\"", s.replace('"', "\"\""))
                    }
                    Some(s) => s.clone(),
                    None => String::new(),
                })
                .collect();
            writeln!(out, "{}", values.join(","))?;
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a EntryTable {
    type Item = &'a EntryRow;
    type IntoIter = std::slice::Iter<'a, EntryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
