//! Competitor row extraction
//!
//! Rows are read from a parsed snapshot of the entry list. Each cell is
//! classified by its class attribute and handed to the matching field parser;
//! handler links are collected and resolved afterwards, in page order, through
//! the navigation coordinator.

use scraper::{ElementRef, Html, Selector};

use super::fields::{
    parse_bib, parse_body_weight, parse_carried_weight, parse_odds, parse_popularity,
    parse_sex_age, parse_weight_change, weight_change_token, CellClassifier, CellLabel,
};
use super::navigation::{HandlerLookup, NavigationCoordinator};
use super::{element_text, selector};
use crate::browser::{Browser, BrowserSession};
use crate::error::{ExtractionError, Field, FieldParseError, Issue};
use crate::models::CompetitorRecord;

/// A competitor row whose handler name may still need a detail-page lookup
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    /// Position on the page, counting every row
    pub index: usize,
    pub record: CompetitorRecord,
    pub handler_link: Option<String>,
}

/// Walks `tr.HorseList` rows and dispatches their cells
pub struct RowExtractor {
    classifier: CellClassifier,
    row: Selector,
    cell: Selector,
    horse_link: Selector,
    link: Selector,
    span: Selector,
    small: Selector,
}

impl RowExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            classifier: CellClassifier::new(),
            row: selector("tr.HorseList")?,
            cell: selector("td")?,
            horse_link: selector(".HorseName a")?,
            link: selector("a")?,
            span: selector("span")?,
            small: selector("small")?,
        })
    }

    /// Read every competitor row in page order.
    ///
    /// A page without competitor rows has no entry table and is a structural
    /// error. Field-level failures are pushed onto `issues`.
    pub fn extract(
        &self,
        document: &Html,
        issues: &mut Vec<Issue>,
    ) -> Result<Vec<PendingRow>, ExtractionError> {
        let rows: Vec<PendingRow> = document
            .select(&self.row)
            .enumerate()
            .map(|(index, tr)| self.extract_row(index, &tr, issues))
            .collect();

        if rows.is_empty() {
            return Err(ExtractionError::Structural(
                "entry table (tr.HorseList rows)".to_string(),
            ));
        }

        tracing::debug!("Read {} competitor rows", rows.len());
        Ok(rows)
    }

    fn extract_row(&self, index: usize, tr: &ElementRef, issues: &mut Vec<Issue>) -> PendingRow {
        let mut record = CompetitorRecord::default();
        let mut handler_link = None;

        let mut record_issue = |error: FieldParseError| {
            tracing::warn!("Row {}: {}", index, error);
            issues.push(Issue::FieldParse { row: index, error });
        };

        for td in tr.select(&self.cell) {
            let class = td.value().attr("class").unwrap_or_default();
            let Some(label) = self.classifier.classify(class) else {
                continue;
            };
            let text = element_text(&td);
            tracing::trace!(row = index, ?label, text = %text, "cell");

            match label {
                CellLabel::Name => {
                    record.name = td
                        .select(&self.horse_link)
                        .next()
                        .map(|a| element_text(&a))
                        .filter(|name| !name.is_empty());
                }
                CellLabel::Bib => match parse_bib(&text) {
                    Ok(bib) => record.bib = Some(bib),
                    Err(e) => record_issue(e),
                },
                CellLabel::SexAge => match parse_sex_age(&text) {
                    Ok((sex, age)) => {
                        record.sex = Some(sex);
                        record.age = Some(age);
                    }
                    Err(e) => record_issue(e),
                },
                CellLabel::CarriedWeight => {
                    if let Some(weight) = parse_carried_weight(&text) {
                        record.carried_weight = Some(weight);
                    }
                }
                CellLabel::BodyWeight => {
                    match parse_body_weight(&text) {
                        Ok(weight) => record.body_weight = Some(weight),
                        Err(e) => record_issue(e),
                    }
                    let change = td
                        .select(&self.small)
                        .next()
                        .map(|small| element_text(&small))
                        .or_else(|| weight_change_token(&text).map(str::to_string))
                        .unwrap_or_default();
                    match parse_weight_change(&change) {
                        Ok(change) => record.body_weight_change = Some(change),
                        Err(e) => record_issue(e),
                    }
                }
                CellLabel::Handler => {
                    handler_link = td
                        .select(&self.link)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(str::trim)
                        .filter(|href| !href.is_empty())
                        .map(str::to_string);
                    if handler_link.is_none() {
                        record_issue(FieldParseError::new(
                            Field::Handler,
                            &text,
                            "no link to the handler page",
                        ));
                    }
                }
                CellLabel::Odds => {
                    if let Some(span) = td.select(&self.span).next() {
                        match parse_odds(&element_text(&span)) {
                            Ok(odds) => record.odds = Some(odds),
                            Err(e) => record_issue(e),
                        }
                    }
                }
                CellLabel::Popularity => {
                    if let Some(span) = td.select(&self.span).next() {
                        match parse_popularity(&element_text(&span)) {
                            Ok(rank) => record.popularity = Some(rank),
                            Err(e) => record_issue(e),
                        }
                    }
                }
            }
        }

        if record.name.is_none() {
            tracing::debug!("Row {} has no name (scratched?)", index);
        }

        PendingRow {
            index,
            record,
            handler_link,
        }
    }
}

/// Fill in handler names, one detail-page trip per row, in page order.
///
/// Rows without a name are dropped on assembly and are not visited.
pub async fn resolve_handlers<B: Browser>(
    session: &mut BrowserSession<B>,
    coordinator: &NavigationCoordinator,
    rows: &mut [PendingRow],
    issues: &mut Vec<Issue>,
) -> Result<(), ExtractionError> {
    for row in rows.iter_mut() {
        if row.record.name.is_none() {
            continue;
        }
        let Some(link) = row.handler_link.as_deref() else {
            continue;
        };

        let (lookup, restored) = coordinator.resolve_handler(session, link).await?;
        match &lookup {
            HandlerLookup::Resolved(name) => {
                tracing::debug!("Row {}: handler {}", row.index, name);
            }
            HandlerLookup::SuffixMissing(title) => {
                tracing::warn!(
                    "Row {}: handler page title {:?} lacks the expected suffix, using it whole",
                    row.index,
                    title
                );
                issues.push(Issue::TitleSuffixMissing {
                    row: row.index,
                    title: title.clone(),
                });
            }
            HandlerLookup::TimedOut => {
                tracing::warn!("Row {}: handler page timed out ({})", row.index, link);
                issues.push(Issue::NavigationTimeout {
                    row: row.index,
                    link: link.to_string(),
                });
            }
        }
        if !restored.main_ready {
            tracing::warn!("Row {}: main window did not report ready", row.index);
            issues.push(Issue::LoadStateTimeout { row: row.index });
        }

        row.record.handler = lookup.name().map(str::to_string);
    }

    Ok(())
}
