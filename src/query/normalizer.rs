// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query normalization: raw search input to engine-safe query syntax.
//!
//! [`normalize`] is a total, deterministic function. It never errors:
//! unusable filter values are dropped, unknown sort fields fall back to the
//! engine default, and empty text becomes match-all. Every user-supplied
//! value that ends up in the query string passes through the escaper first,
//! so free text cannot smuggle query operators into the engine.
//!
//! Token expansion: each whitespace-separated token becomes a disjunction of
//! infix-wildcard clauses over the searchable fields, widened with exact
//! date/numeric clauses when the token parses as an ISO date or an integer:
//!
//! ```text
//! "5"  ->  (@capacity:[5 5] | @date:{*5*} | @id:*5* | @meal_type:{*5*}
//!           | @reservation_id:*5* | @table_number:[5 5])
//! ```

use std::collections::BTreeMap;

use crate::domain::{parse_iso_date, utc_day_range};
use crate::index::schema::{
    FIELD_CAPACITY, FIELD_DATE, FIELD_DATE_TS, FIELD_ID, FIELD_IS_AVAILABLE, FIELD_MEAL_TYPE,
    FIELD_RESERVATION_ID, FIELD_TABLE_NUMBER,
};

use super::{NormalizedQuery, SearchQuery, Sort, SortOrder};

/// Default page size when the caller supplies none.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound on page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Sort-field aliases accepted from callers, mapped to engine field names.
const SORT_FIELDS: [(&str, &str); 8] = [
    ("date", FIELD_DATE),
    ("table", FIELD_TABLE_NUMBER),
    ("table_number", FIELD_TABLE_NUMBER),
    ("capacity", FIELD_CAPACITY),
    ("created", "created_at"),
    ("created_at", "created_at"),
    ("updated", "updated_at"),
    ("updated_at", "updated_at"),
];

/// Normalize a raw query into its canonical, engine-safe form.
pub fn normalize(raw: &SearchQuery) -> NormalizedQuery {
    NormalizedQuery {
        query: build_full_text_query(&raw.q),
        filters: normalize_filters(&raw.filters),
        sort: sanitize_sort(&raw.sort, &raw.order),
        page: raw.page.max(1),
        size: if raw.size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            raw.size.min(MAX_PAGE_SIZE)
        },
    }
}

fn build_full_text_query(term: &str) -> String {
    let trimmed = term.trim();
    if trimmed.is_empty() || trimmed == "*" || trimmed == "*:*" {
        return "*".to_string();
    }
    // Power-user escape hatch: field-qualified syntax passes through verbatim.
    if trimmed.contains(':') {
        return trimmed.to_string();
    }

    let clauses: Vec<String> = trimmed
        .split_whitespace()
        .filter_map(build_token_clause)
        .collect();
    if clauses.is_empty() {
        return "*".to_string();
    }
    clauses.join(" ")
}

fn build_token_clause(token: &str) -> Option<String> {
    let lower = token.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let escaped = escape_value(&lower);

    let mut parts = vec![
        format!("@{FIELD_ID}:*{escaped}*"),
        format!("@{FIELD_RESERVATION_ID}:*{escaped}*"),
        format!("@{FIELD_MEAL_TYPE}:{{*{escaped}*}}"),
        format!("@{FIELD_DATE}:{{*{escaped}*}}"),
    ];

    if parse_iso_date(&lower).is_some() {
        parts.push(format!("@{FIELD_DATE}:{{{escaped}}}"));
    }

    if let Ok(num) = lower.parse::<i64>() {
        parts.push(format!("@{FIELD_TABLE_NUMBER}:[{num} {num}]"));
        parts.push(format!("@{FIELD_CAPACITY}:[{num} {num}]"));
    }

    parts.sort();
    parts.dedup();
    Some(format!("({})", parts.join(" | ")))
}

fn normalize_filters(
    filters: &std::collections::HashMap<String, String>,
) -> BTreeMap<String, String> {
    // Sorted iteration keeps alias collisions (e.g. `table` vs
    // `table_number`) deterministic regardless of map insertion order.
    let mut entries: Vec<(&String, &String)> = filters.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = BTreeMap::new();
    for (key, raw) in entries {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        match canonical_filter_key(key) {
            FIELD_MEAL_TYPE => {
                out.insert(
                    FIELD_MEAL_TYPE.to_string(),
                    format!("{{{}}}", escape_value(&value.to_lowercase())),
                );
            }
            FIELD_IS_AVAILABLE => {
                let val = value.to_lowercase();
                if val == "true" || val == "false" {
                    out.insert(FIELD_IS_AVAILABLE.to_string(), format!("{{{val}}}"));
                }
            }
            FIELD_CAPACITY => {
                if let Ok(num) = value.parse::<i64>() {
                    out.insert(FIELD_CAPACITY.to_string(), format!("[{num} +inf]"));
                }
            }
            FIELD_DATE => {
                if let Some(date) = normalize_date_value(value) {
                    let (start, end) = utc_day_range(date);
                    out.insert(FIELD_DATE_TS.to_string(), format!("[{start} ({end}]"));
                }
            }
            FIELD_TABLE_NUMBER => {
                if let Ok(num) = value.parse::<i64>() {
                    out.insert(FIELD_TABLE_NUMBER.to_string(), format!("[{num} {num}]"));
                }
            }
            // Unrecognized keys pass through unchanged (forward-compatible).
            _ => {
                out.insert(key.to_string(), value.to_string());
            }
        }
    }
    out
}

fn canonical_filter_key(key: &str) -> &str {
    match key.trim().to_lowercase().as_str() {
        "meal_type" => FIELD_MEAL_TYPE,
        "is_available" => FIELD_IS_AVAILABLE,
        "capacity" => FIELD_CAPACITY,
        "date" => FIELD_DATE,
        "table" | "table_number" => FIELD_TABLE_NUMBER,
        _ => key,
    }
}

fn sanitize_sort(field: &str, order: &str) -> Option<Sort> {
    let field = field.trim().to_lowercase();
    if field.is_empty() {
        return None;
    }
    let mapped = SORT_FIELDS
        .iter()
        .find(|(alias, _)| *alias == field)
        .map(|(_, canonical)| *canonical)?;

    let order = if order.trim().eq_ignore_ascii_case("desc") {
        SortOrder::Desc
    } else {
        SortOrder::Asc
    };
    Some(Sort {
        field: mapped.to_string(),
        order,
    })
}

/// Accepted date layouts, tried after the strict ISO form.
const DATE_LAYOUTS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%Y.%m.%d"];

fn normalize_date_value(value: &str) -> Option<chrono::NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(date) = parse_iso_date(value) {
        return Some(date);
    }
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| chrono::NaiveDate::parse_from_str(value, layout).ok())
}

/// Escape engine-special characters so a value can only ever match literally.
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '@' | ':' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '%' | '-' | '+' | '~'
            | '"' | '\'' | '=' | '/' | '<' | '>' | '!' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
