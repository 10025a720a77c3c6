//! Race-level metadata from the entry-list header

use chrono::NaiveDate;
use regex::Regex;
use scraper::Html;

use super::{element_text, selector};
use crate::error::ExtractionError;
use crate::models::{Direction, RaceMetadata, Surface};

/// Generic breed prefix stripped from the race class
pub const BREED_PREFIX: &str = "サラ系";

/// Minimum `<span>` count in the `RaceData02` block: the class lives at
/// index 3 and its grade suffix at index 4
const RACE_DATA02_SPANS: usize = 5;

/// Fields read from the `RaceData01` line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseInfo {
    pub surface: Option<Surface>,
    pub distance: Option<u32>,
    pub direction: Option<Direction>,
    pub weather: Option<String>,
    pub ground_condition: Option<String>,
}

/// Rewrite `yyyymmdd` as `yyyy-mm-dd`
pub fn format_race_date(date: &str) -> Result<String, ExtractionError> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExtractionError::Precondition(format!(
            "date must be 8 digits (yyyymmdd), got {:?}",
            date
        )));
    }
    let parsed = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|e| {
        ExtractionError::Precondition(format!("date {:?} is not a calendar date: {}", date, e))
    })?;
    Ok(parsed.format("%Y-%m-%d").to_string())
}

/// Parser for the race header blocks
pub struct MetadataParser {
    surface_pattern: Regex,
    distance_pattern: Regex,
    direction_pattern: Regex,
    weather_pattern: Regex,
    ground_pattern: Regex,
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataParser {
    pub fn new() -> Self {
        Self {
            surface_pattern: Regex::new(r"(芝|ダート|ダ)").unwrap(),
            distance_pattern: Regex::new(r"(\d+)\s*m").unwrap(),
            direction_pattern: Regex::new(r"(右|左|直線)").unwrap(),
            weather_pattern: Regex::new(r"天候\s*[:：]\s*(\w+)").unwrap(),
            ground_pattern: Regex::new(r"馬場\s*[:：]\s*(\w+)").unwrap(),
        }
    }

    /// Independent pattern searches over the course line; each field is
    /// `None` when its pattern does not match
    pub fn parse_course_info(&self, text: &str) -> CourseInfo {
        let surface = self
            .surface_pattern
            .captures(text)
            .map(|caps| match &caps[1] {
                "芝" => Surface::Turf,
                _ => Surface::Dirt,
            });

        let distance = self
            .distance_pattern
            .captures(text)
            .and_then(|caps| caps[1].parse().ok());

        let direction = self
            .direction_pattern
            .captures(text)
            .map(|caps| match &caps[1] {
                "右" => Direction::Right,
                "左" => Direction::Left,
                _ => Direction::Straight,
            });

        let weather = self
            .weather_pattern
            .captures(text)
            .map(|caps| caps[1].to_string());

        let ground_condition = self
            .ground_pattern
            .captures(text)
            .map(|caps| caps[1].to_string());

        CourseInfo {
            surface,
            distance,
            direction,
            weather,
            ground_condition,
        }
    }

    /// Race class from the `RaceData02` spans.
    ///
    /// Layout is positional: span 3 holds the class (breed prefix removed),
    /// span 4 the grade, which is appended.
    pub fn parse_race_class(&self, spans: &[String]) -> Result<String, ExtractionError> {
        if spans.len() < RACE_DATA02_SPANS {
            return Err(ExtractionError::Structural(format!(
                "RaceData02 has {} spans, expected at least {}",
                spans.len(),
                RACE_DATA02_SPANS
            )));
        }

        let mut race_class = spans[3].clone();
        if race_class.contains(BREED_PREFIX) {
            race_class = race_class.replace(BREED_PREFIX, "").trim().to_string();
        }
        race_class.push_str(&spans[4]);
        Ok(race_class)
    }

    /// Extract all race metadata from the entry-list document.
    ///
    /// `race_id` and `venue` come from the caller; `date` must already be in
    /// `yyyy-mm-dd` form.
    pub fn extract(
        &self,
        document: &Html,
        race_id: &str,
        venue: &str,
        date: &str,
    ) -> Result<RaceMetadata, ExtractionError> {
        let data01 = document
            .select(&selector(".RaceData01")?)
            .next()
            .ok_or_else(|| ExtractionError::Structural("RaceData01 block".to_string()))?;
        let course = self.parse_course_info(&element_text(&data01));

        let data02 = document
            .select(&selector(".RaceData02")?)
            .next()
            .ok_or_else(|| ExtractionError::Structural("RaceData02 block".to_string()))?;
        let span_selector = selector("span")?;
        let spans: Vec<String> = data02
            .select(&span_selector)
            .map(|span| element_text(&span))
            .collect();
        let race_class = self.parse_race_class(&spans)?;

        let race_name = document
            .select(&selector(".RaceList_Item02")?)
            .next()
            .ok_or_else(|| ExtractionError::Structural("RaceList_Item02 container".to_string()))?
            .select(&selector(".RaceName")?)
            .next()
            .map(|el| element_text(&el))
            .ok_or_else(|| ExtractionError::Structural("RaceName element".to_string()))?;

        tracing::debug!(
            surface = ?course.surface,
            distance = ?course.distance,
            race_class = %race_class,
            race_name = %race_name,
            "Parsed race metadata"
        );

        Ok(RaceMetadata {
            race_id: race_id.to_string(),
            surface: course.surface,
            distance: course.distance,
            direction: course.direction,
            weather: course.weather,
            ground_condition: course.ground_condition,
            race_class,
            venue: venue.to_string(),
            race_name,
            date: date.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::scraper::test_pages::{header_html, PageBuilder};

    #[test]
    fn test_format_race_date() {
        assert_eq!(format_race_date("20241020").unwrap(), "2024-10-20");
        assert_eq!(format_race_date("20240229").unwrap(), "2024-02-29");
    }

    #[test]
    fn test_format_race_date_rejects_bad_input() {
        let err = format_race_date("2024102").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(format_race_date("202410200").is_err());
        assert!(format_race_date("2024-10-2").is_err());
        assert!(format_race_date("20241340").is_err());
    }

    #[test]
    fn test_parse_course_info() {
        let parser = MetadataParser::new();
        let info = parser.parse_course_info("15:40発走 / 芝2000m (左 A) / 天候:晴 / 馬場:良");
        assert_eq!(info.surface, Some(Surface::Turf));
        assert_eq!(info.distance, Some(2000));
        assert_eq!(info.direction, Some(Direction::Left));
        assert_eq!(info.weather.as_deref(), Some("晴"));
        assert_eq!(info.ground_condition.as_deref(), Some("良"));
    }

    #[test]
    fn test_parse_course_info_dirt_abbreviation() {
        let parser = MetadataParser::new();
        let info = parser.parse_course_info("10:05発走 / ダ1200m (右) / 天候:曇 / 馬場:稍重");
        assert_eq!(info.surface, Some(Surface::Dirt));
        assert_eq!(info.distance, Some(1200));
        assert_eq!(info.direction, Some(Direction::Right));
        assert_eq!(info.ground_condition.as_deref(), Some("稍重"));
    }

    #[test]
    fn test_parse_course_info_fields_are_independent() {
        let parser = MetadataParser::new();
        let info = parser.parse_course_info("芝1000m (直線) / 天候:雨");
        assert_eq!(info.direction, Some(Direction::Straight));
        assert_eq!(info.weather.as_deref(), Some("雨"));
        assert_eq!(info.ground_condition, None);

        let empty = parser.parse_course_info("発走時刻未定");
        assert_eq!(empty, CourseInfo::default());
    }

    #[test]
    fn test_parse_race_class() {
        let parser = MetadataParser::new();
        let spans: Vec<String> = ["2回", "東京", "8日目", "サラ系３歳", "オープン", "(国際)"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parser.parse_race_class(&spans).unwrap(), "３歳オープン");
    }

    #[test]
    fn test_parse_race_class_without_prefix() {
        let parser = MetadataParser::new();
        let spans: Vec<String> = ["4回", "京都", "6日目", "３歳以上", "１勝クラス"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(parser.parse_race_class(&spans).unwrap(), "３歳以上１勝クラス");
    }

    #[test]
    fn test_parse_race_class_requires_positional_spans() {
        let parser = MetadataParser::new();
        let spans = vec!["2回".to_string(), "東京".to_string()];
        let err = parser.parse_race_class(&spans).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_extract_from_document() {
        let html = PageBuilder::new().rows(1).build();
        let document = Html::parse_document(&html);
        let meta = MetadataParser::new()
            .extract(&document, "202405040811", "東京", "2024-10-20")
            .unwrap();

        assert_eq!(meta.race_id, "202405040811");
        assert_eq!(meta.surface, Some(Surface::Turf));
        assert_eq!(meta.distance, Some(2000));
        assert_eq!(meta.race_class, "３歳オープン");
        assert_eq!(meta.race_name, "テストステークス");
        assert_eq!(meta.venue, "東京");
        assert_eq!(meta.date, "2024-10-20");
    }

    #[test]
    fn test_missing_race_name_is_structural() {
        let html = format!(
            "<html><body>{}</body></html>",
            header_html().replace("RaceList_Item02", "RaceList_ItemXX")
        );
        let document = Html::parse_document(&html);
        let err = MetadataParser::new()
            .extract(&document, "202405040811", "東京", "2024-10-20")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_missing_course_block_is_structural() {
        let html = format!(
            "<html><body>{}</body></html>",
            header_html().replace("RaceData01", "RaceDataXX")
        );
        let document = Html::parse_document(&html);
        assert!(matches!(
            MetadataParser::new().extract(&document, "1", "東京", "2024-10-20"),
            Err(ExtractionError::Structural(_))
        ));
    }
}
