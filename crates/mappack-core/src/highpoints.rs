//! Regional high points scraped from the Wikipedia elevation tables.
//!
//! The page layouts are assumed stable: a missing table or column is an
//! error, a row without parseable coordinates is skipped.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::error::{MapPackError, Result};
use crate::names::normalize_name;

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+\.\d+").expect("decimal pattern"));
static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").expect("citation pattern"));

/// US rows that are not states.
const US_EXCLUDED: [&str; 6] = [
    "District of Columbia",
    "American Samoa",
    "Guam",
    "Northern Mariana Islands",
    "Puerto Rico",
    "U.S. Virgin Islands",
];

#[derive(Debug, Clone, PartialEq)]
pub struct HighPoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

// ── HTML tables ──────────────────────────────────────────────────────────────

/// A table flattened to strings, with `colspan`/`rowspan` expanded so every
/// row lines up with `headers`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtmlTable {
    /// Header text per column; multi-row headers are joined with a space.
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// First column whose header contains `needle`, ignoring case.
    pub fn column(&self, needle: &str) -> Option<usize> {
        let needle = needle.to_lowercase();
        self.headers.iter().position(|h| h.to_lowercase().contains(&needle))
    }

    fn require_column(&self, table: &str, needle: &str) -> Result<usize> {
        self.column(needle).ok_or_else(|| MapPackError::MissingColumn {
            table: table.to_string(),
            column: needle.to_string(),
        })
    }
}

/// Every `<table>` in the document, in document order.
pub fn parse_tables(html: &str) -> Result<Vec<HtmlTable>> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("table").map_err(|e| MapPackError::Selector {
        selector: "table",
        reason: format!("{e:?}"),
    })?;
    Ok(doc.select(&selector).map(parse_table).collect())
}

struct Cell {
    text: String,
    header: bool,
    colspan: usize,
    rowspan: usize,
}

fn parse_table(table: ElementRef<'_>) -> HtmlTable {
    let mut out = HtmlTable::default();
    // Per column: rows still covered by a rowspan above, and its text.
    let mut carry: Vec<(usize, String)> = Vec::new();
    let mut in_body = false;

    for tr in table_rows(table) {
        let mut cells = row_cells(tr).into_iter();
        let mut row: Vec<String> = Vec::new();
        let mut all_header = true;

        loop {
            if take_carried(&mut carry, &mut row) {
                continue;
            }
            let Some(cell) = cells.next() else {
                break;
            };
            all_header &= cell.header;
            for _ in 0..cell.colspan {
                let col = row.len();
                if carry.len() <= col {
                    carry.resize(col + 1, (0, String::new()));
                }
                carry[col] = (cell.rowspan - 1, cell.text.clone());
                row.push(cell.text.clone());
            }
        }
        while take_carried(&mut carry, &mut row) {}

        if row.is_empty() {
            continue;
        }
        if all_header && !in_body {
            merge_header(&mut out.headers, row);
        } else {
            in_body = true;
            out.rows.push(row);
        }
    }
    out
}

/// Push the rowspan-carried value for the next column, if any.
fn take_carried(carry: &mut [(usize, String)], row: &mut Vec<String>) -> bool {
    match carry.get_mut(row.len()) {
        Some((left, text)) if *left > 0 => {
            *left -= 1;
            row.push(text.clone());
            true
        }
        _ => false,
    }
}

fn merge_header(headers: &mut Vec<String>, row: Vec<String>) {
    for (i, text) in row.into_iter().enumerate() {
        match headers.get_mut(i) {
            Some(h) if h == &text || text.is_empty() => {}
            Some(h) if h.is_empty() => *h = text,
            Some(h) => {
                h.push(' ');
                h.push_str(&text);
            }
            None => headers.push(text),
        }
    }
}

/// `<tr>` children of the table and of its thead/tbody/tfoot sections, so
/// rows of nested tables are not mixed in.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells(tr: ElementRef<'_>) -> Vec<Cell> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "th" | "td"))
        .map(|e| {
            let span = |attr: &str| {
                e.value()
                    .attr(attr)
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .filter(|&n| n > 0)
                    .unwrap_or(1)
            };
            let mut raw = String::new();
            collect_text(e, &mut raw);
            Cell {
                text: raw.split_whitespace().collect::<Vec<_>>().join(" "),
                header: e.value().name() == "th",
                colspan: span("colspan"),
                rowspan: span("rowspan"),
            }
        })
        .collect()
}

/// Visible text of an element: style/script bodies are skipped and `<br>`
/// becomes a space.
fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) if e.name() == "br" => out.push(' '),
            Node::Element(e) if matches!(e.name(), "style" | "script") => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

// ── Cell parsing ─────────────────────────────────────────────────────────────

/// Drop `[1]`-style citation markers.
pub fn strip_citations(text: &str) -> String {
    CITATION.replace_all(text, "").trim().to_string()
}

/// (lat, lon) from the last two decimal numbers in `text`. An `S` anywhere
/// makes latitude southern, a `W` makes longitude western.
pub fn parse_decimal_coords(text: &str) -> Option<(f64, f64)> {
    let nums: Vec<f64> = DECIMAL
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    let [.., lat, lon] = nums[..] else {
        return None;
    };
    let lat = if text.contains('S') { -lat.abs() } else { lat };
    let lon = if text.contains('W') { -lon.abs() } else { lon };
    Some((lat, lon))
}

// ── Tables ───────────────────────────────────────────────────────────────────

/// US states keyed by normalized name. Territories and DC are left out.
pub fn parse_us_highpoints(html: &str) -> Result<HashMap<String, HighPoint>> {
    const TABLE: &str = "US highpoints";
    let tables = parse_tables(html)?;
    let table = tables
        .iter()
        .find(|t| t.column("high point coordinates").is_some())
        .ok_or_else(|| MapPackError::TableNotFound(TABLE.into()))?;

    let coord_col = table.require_column(TABLE, "High point coordinates")?;
    let name_col = table.require_column(TABLE, "Highest point")?;

    let mut out = HashMap::new();
    for row in &table.rows {
        let Some(state) = row.first().map(|s| strip_citations(s)) else {
            continue;
        };
        if US_EXCLUDED.contains(&state.as_str()) {
            continue;
        }
        if let Some(hp) = highpoint_from_row(row, name_col, coord_col) {
            out.insert(normalize_name(&state), hp);
        }
    }
    Ok(out)
}

/// Canadian provinces and territories keyed by normalized name.
pub fn parse_ca_highpoints(html: &str) -> Result<HashMap<String, HighPoint>> {
    const TABLE: &str = "Canada highpoints";
    let tables = parse_tables(html)?;
    let table = tables
        .first()
        .ok_or_else(|| MapPackError::TableNotFound(TABLE.into()))?;

    let region_col = table.require_column(TABLE, "Province")?;
    let peak_col = table.require_column(TABLE, "Peak")?;
    let coord_col = table.require_column(TABLE, "Coordinates")?;

    let mut out = HashMap::new();
    for row in &table.rows {
        let Some(region) = row.get(region_col).map(|s| strip_citations(s)) else {
            continue;
        };
        if let Some(hp) = highpoint_from_row(row, peak_col, coord_col) {
            out.insert(normalize_name(&region), hp);
        }
    }
    Ok(out)
}

fn highpoint_from_row(row: &[String], name_col: usize, coord_col: usize) -> Option<HighPoint> {
    let (lat, lon) = parse_decimal_coords(row.get(coord_col)?)?;
    let name = row.get(name_col).map(|s| strip_citations(s)).unwrap_or_default();
    Some(HighPoint { name, lat, lon })
}

#[cfg(test)]
mod tests {
    use super::*;

    const US_PAGE: &str = r#"
      <html><body>
      <table><tr><th>Unrelated</th></tr><tr><td>1.5 2.5</td></tr></table>
      <table class="wikitable">
        <thead>
          <tr><th rowspan="2">State</th><th colspan="2">Highest point</th><th rowspan="2">High point coordinates</th></tr>
          <tr><th>Name</th><th>Elevation</th></tr>
        </thead>
        <tbody>
          <tr><td>Alaska<sup>[3]</sup></td><td>Denali[a]</td><td>6190 m</td>
              <td><style>.geo{display:none}</style>63°04′N 151°00′W / 63.069°N 151.007°W / 63.069; -151.007</td></tr>
          <tr><td>Puerto Rico</td><td>Cerro de Punta</td><td>1338 m</td><td>18.17°N 66.59°W</td></tr>
          <tr><td>Ohio</td><td>Campbell Hill</td><td>472 m</td><td>—</td></tr>
        </tbody>
      </table>
      </body></html>"#;

    const CA_PAGE: &str = r#"
      <table>
        <tr><th>Rank</th><th>Province or territory</th><th>Peak</th><th>Coordinates</th></tr>
        <tr><td>1</td><td>Yukon</td><td>Mount Logan</td><td>60.567°N 140.405°W</td></tr>
        <tr><td>2</td><td>Québec</td><td rowspan="2">Mont D'Iberville</td><td>58.9°N 63.7°W</td></tr>
        <tr><td>3</td><td>Newfoundland &amp; Labrador</td><td>58.9°N 63.7°W</td></tr>
      </table>"#;

    #[test]
    fn coords_take_last_two_decimals_with_hemisphere() {
        assert_eq!(
            parse_decimal_coords("63°04′N 151°00′W / 63.069°N 151.007°W"),
            Some((63.069, -151.007))
        );
        assert_eq!(parse_decimal_coords("12.5°S 45.25°E"), Some((-12.5, 45.25)));
        assert_eq!(parse_decimal_coords("no coordinates"), None);
        assert_eq!(parse_decimal_coords("only 1.0"), None);
    }

    #[test]
    fn citations_are_stripped() {
        assert_eq!(strip_citations("Denali[a][12] "), "Denali");
    }

    #[test]
    fn spans_expand_into_aligned_columns() {
        let tables = parse_tables(US_PAGE).unwrap();
        let t = &tables[1];
        assert_eq!(t.headers.len(), 4);
        assert_eq!(t.headers[0], "State");
        assert_eq!(t.headers[1], "Highest point Name");
        assert_eq!(t.headers[2], "Highest point Elevation");
        assert_eq!(t.headers[3], "High point coordinates");
        assert_eq!(t.rows.len(), 3);
        assert!(t.rows.iter().all(|r| r.len() == 4));
        assert!(!t.rows[0][3].contains("display"), "style text leaked: {}", t.rows[0][3]);
    }

    #[test]
    fn us_table_found_by_coordinate_header() {
        let hp = parse_us_highpoints(US_PAGE).unwrap();
        assert_eq!(hp.len(), 1, "territories and rows without coordinates are skipped");
        let alaska = &hp["alaska"];
        assert_eq!(alaska.name, "Denali");
        assert_eq!((alaska.lat, alaska.lon), (63.069, -151.007));
    }

    #[test]
    fn canada_rows_follow_rowspans() {
        let hp = parse_ca_highpoints(CA_PAGE).unwrap();
        assert_eq!(hp["yukon"].name, "Mount Logan");
        assert_eq!(hp["newfoundland_and_labrador"].name, "Mont D'Iberville");
        assert_eq!(hp["quebec"].lon, -63.7);
    }

    #[test]
    fn missing_table_or_column_is_an_error() {
        assert!(matches!(
            parse_us_highpoints("<p>nothing</p>"),
            Err(MapPackError::TableNotFound(_))
        ));
        assert!(matches!(
            parse_ca_highpoints("<table><tr><th>Province</th></tr></table>"),
            Err(MapPackError::MissingColumn { .. })
        ));
    }
}
