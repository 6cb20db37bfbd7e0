//! Structured extraction from LLM summary text.
//!
//! Pulls an author label and asset/direction/target prediction rows out of
//! free-form markdown. LLM output varies between runs, so parsing is an
//! ordered list of strategies: fenced ```json blocks, then inline JSON
//! arrays, then legacy Markdown/HTML tables. Malformed input never fails,
//! worst case the result is empty.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde_json::Value;

/// One extracted forecast before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRow {
    pub name: String,
    pub direction: String,
    pub if_cases: String,
    pub price_target: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryMeta {
    /// The speaker making the claims. Empty when no label matched.
    pub author: String,
    pub predictions: Vec<PredictionRow>,
}

// Ordered author label matchers, first capturing match wins.
static AUTHOR_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Hauptsprecher\s*/\s*Interviewpartner[*_:\s]+([^\n]+)",
        r"(?i)Hauptsprecher[*_:\s]+([^\n]+)",
        r"(?i)Interviewpartner[*_:\s]+([^\n]+)",
        r"(?im)^\s*-\s+Sprecher[*_:\s]+([^\n]+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FENCED_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());

static INLINE_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").unwrap());

static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

static HTML_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table.*?</table>").unwrap());
static HTML_TH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<th[^>]*>(.*?)</th>").unwrap());
static HTML_TR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap());
static HTML_TD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").unwrap());
static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static ASSET_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(name|asset|instrument|ticker)\b").unwrap());
static DIRECTION_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(long|short|direction|richtung)\b").unwrap());
static TARGET_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(target|price|preis|if.case|kurs|prognos|ziel)\b").unwrap()
});

// Key aliases for tier-1 JSON objects, in preference order.
const NAME_KEYS: [&str; 4] = ["name", "Name", "asset", "Asset"];
const DIRECTION_KEYS: [&str; 4] = ["direction", "Direction", "richtung", "Richtung"];
const IF_CASES_KEYS: [&str; 5] = ["if_cases", "ifCases", "if_case", "bedingung", "Bedingung"];
const PRICE_TARGET_KEYS: [&str; 6] = [
    "price_target",
    "priceTarget",
    "target",
    "kursziel",
    "Kursziel",
    "ziel",
];

/// Parses an LLM summary into an author label and prediction rows.
/// Idempotent and infallible by design.
pub fn extract_summary_meta(summary: &str) -> SummaryMeta {
    SummaryMeta {
        author: extract_author(summary).unwrap_or_default(),
        predictions: extract_predictions(summary),
    }
}

/// First matching pattern wins outright: a match that cleans down to
/// nothing (the prompt's placeholder text) means "no author", later,
/// broader patterns must not get a second chance at the same line.
fn extract_author(text: &str) -> Option<String> {
    for re in AUTHOR_RES.iter() {
        if let Some(cap) = re.captures(text) {
            let cleaned = clean_author(cap.get(1)?.as_str());
            return (!cleaned.is_empty()).then_some(cleaned);
        }
    }
    None
}

fn clean_author(raw: &str) -> String {
    let without_emphasis = raw.replace("**", "").replace(['*', '`'], "");
    let without_brackets = BRACKETED_RE.replace_all(&without_emphasis, "");
    collapse_whitespace(&without_brackets)
        .trim_matches(|c: char| c == ':' || c.is_whitespace())
        .to_string()
}

/// Two-tier strategy: fenced/inline JSON first, legacy tables only when
/// tier 1 produced nothing. Rows are deduplicated case-insensitively by
/// (asset, direction, target); empty assets are dropped.
pub fn extract_predictions(text: &str) -> Vec<PredictionRow> {
    let (mut rows, any_fenced_parsed) = parse_fenced_json(text);
    if !any_fenced_parsed {
        rows = parse_inline_json(text);
    }

    if rows.is_empty() {
        rows = parse_markdown_tables(text);
        rows.extend(parse_html_tables(text));
    }

    rows.into_iter()
        .filter(|r| !r.name.is_empty())
        .unique_by(|r| {
            format!("{}|{}|{}", r.name, r.direction, r.price_target).to_lowercase()
        })
        .collect()
}

/// Returns the rows plus whether any fenced block parsed as valid JSON.
/// A block that parses but holds no usable objects still counts as parsed,
/// which keeps the inline scan from re-reading the same text.
fn parse_fenced_json(text: &str) -> (Vec<PredictionRow>, bool) {
    let mut rows = Vec::new();
    let mut any_parsed = false;

    for cap in FENCED_JSON_RE.captures_iter(text) {
        let Ok(value) = serde_json::from_str::<Value>(cap[1].trim()) else {
            continue;
        };
        any_parsed = true;
        rows.extend(rows_from_value(&value, &NAME_KEYS));
    }

    (rows, any_parsed)
}

fn parse_inline_json(text: &str) -> Vec<PredictionRow> {
    let mut rows = Vec::new();
    for m in INLINE_JSON_RE.find_iter(text) {
        let Ok(value) = serde_json::from_str::<Value>(m.as_str()) else {
            continue;
        };
        // narrower contract for inline arrays: objects must carry "name"
        let objects_have_name = value
            .as_array()
            .is_some_and(|arr| arr.iter().any(|v| v.get("name").is_some()));
        if objects_have_name {
            rows.extend(rows_from_value(&value, &["name"]));
        }
    }
    rows
}

fn rows_from_value(value: &Value, name_keys: &[&str]) -> Vec<PredictionRow> {
    let objects: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    };

    objects
        .into_iter()
        .filter_map(|obj| {
            let name = resolve_alias(obj, name_keys)?;
            Some(PredictionRow {
                name,
                direction: resolve_alias(obj, &DIRECTION_KEYS).unwrap_or_default(),
                if_cases: resolve_alias(obj, &IF_CASES_KEYS).unwrap_or_default(),
                price_target: resolve_alias(obj, &PRICE_TARGET_KEYS).unwrap_or_default(),
            })
        })
        .collect()
}

fn resolve_alias(obj: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return Some(collapse_whitespace(s));
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

struct ColumnMap {
    asset: usize,
    direction: usize,
    target: usize,
}

/// Inspects header cells for keyword groups. Missing direction/target
/// columns default to the column after the previously resolved one, never
/// re-using the asset column unless no columns remain.
fn map_columns(headers: &[String]) -> Option<ColumnMap> {
    let mut asset = None;
    let mut direction = None;
    let mut target = None;

    for (i, h) in headers.iter().enumerate() {
        if asset.is_none() && ASSET_HEADER_RE.is_match(h) {
            asset = Some(i);
        } else if direction.is_none() && DIRECTION_HEADER_RE.is_match(h) {
            direction = Some(i);
        } else if target.is_none() && TARGET_HEADER_RE.is_match(h) {
            target = Some(i);
        }
    }

    let asset = asset?;
    let direction = direction.unwrap_or(if asset + 1 < headers.len() { asset + 1 } else { asset });
    let target = target.unwrap_or(if direction + 1 < headers.len() {
        direction + 1
    } else {
        direction
    });

    Some(ColumnMap {
        asset,
        direction,
        target,
    })
}

fn is_separator(line: &str) -> bool {
    let stripped: String = line
        .chars()
        .filter(|c| !matches!(c, '|' | '-' | ':' | ' '))
        .collect();
    line.contains('|') && line.contains('-') && stripped.is_empty()
}

fn split_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|c| c.trim().to_string())
        .collect()
}

fn row_from_cells(cells: &[String], cols: &ColumnMap) -> Option<PredictionRow> {
    let asset = cells.get(cols.asset).cloned().unwrap_or_default();
    if asset.is_empty() {
        return None;
    }
    Some(PredictionRow {
        name: clean_cell(&asset),
        direction: clean_cell(&cells.get(cols.direction).cloned().unwrap_or_default()),
        if_cases: String::new(),
        price_target: clean_cell(&cells.get(cols.target).cloned().unwrap_or_default()),
    })
}

fn parse_markdown_tables(text: &str) -> Vec<PredictionRow> {
    let normalized = text.replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut rows = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if line.contains('|') && !is_separator(line) {
            let next = lines.get(i + 1).map(|l| l.trim()).unwrap_or("");
            if is_separator(next) {
                let headers: Vec<String> =
                    split_row(line).iter().map(|h| h.to_lowercase()).collect();
                if let Some(cols) = map_columns(&headers) {
                    i += 2;
                    while i < lines.len() {
                        let body = lines[i].trim();
                        if !body.contains('|') || is_separator(body) {
                            break;
                        }
                        rows.extend(row_from_cells(&split_row(body), &cols));
                        i += 1;
                    }
                    continue;
                }
            }
        }
        i += 1;
    }

    rows
}

fn parse_html_tables(text: &str) -> Vec<PredictionRow> {
    let mut rows = Vec::new();

    for table in HTML_TABLE_RE.find_iter(text) {
        let table = table.as_str();

        let headers: Vec<String> = HTML_TH_RE
            .captures_iter(table)
            .map(|c| strip_tags(&c[1]).trim().to_lowercase())
            .collect();
        let Some(cols) = map_columns(&headers) else {
            continue;
        };

        // first <tr> is the header row
        for tr in HTML_TR_RE.captures_iter(table).skip(1) {
            let cells: Vec<String> = HTML_TD_RE
                .captures_iter(&tr[1])
                .map(|c| strip_tags(&c[1]).trim().to_string())
                .collect();
            rows.extend(row_from_cells(&cells, &cols));
        }
    }

    rows
}

fn strip_tags(html: &str) -> String {
    HTML_TAG_RE.replace_all(html, "").to_string()
}

fn clean_cell(cell: &str) -> String {
    collapse_whitespace(&cell.replace("**", "").replace('`', ""))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
