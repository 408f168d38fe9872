use std::collections::HashMap;

use super::value::{parse_multiline, parse_value, Value};
use super::CifError;

/// Well-known loop-name prefixes, preferred over the generic segment
/// heuristic when a majority of headers carries one.
const STANDARD_LOOP_NAMES: &[&str] = &[
    "_space_group_symop_ssg",
    "_space_group_symop",
    "_symmetry_equiv",
    "_geom_bond",
    "_geom_hbond",
    "_geom_angle",
    "_geom_torsion",
    "_geom_contact",
    "_atom_site_aniso",
    "_atom_site",
    "_diffrn_refln",
    "_refln",
];

/// A CIF `loop_` table: shared headers over row-major data, parsed lazily on
/// first access.
#[derive(Debug, Clone)]
pub struct LoopTable {
    name: String,
    headers: Vec<String>,
    state: State,
}

#[derive(Debug, Clone)]
enum State {
    Unparsed { lines: Vec<String> },
    Parsed(Columns),
}

#[derive(Debug, Clone)]
struct Columns {
    values: HashMap<String, Vec<Value>>,
    /// Only columns where at least one row carried an uncertainty.
    sus: HashMap<String, Vec<Option<f64>>>,
    rows: usize,
}

enum Token {
    Raw(String),
    Multiline(String),
}

impl LoopTable {
    /// Builds a loop from its header tags and raw data lines. The loop name
    /// is derived immediately; data parsing is deferred until first access.
    pub fn new(headers: Vec<String>, lines: Vec<String>) -> Result<Self, CifError> {
        let name = derive_loop_name(&headers)?;
        Ok(Self {
            name,
            headers,
            state: State::Unparsed { lines },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Longest prefix shared by every header, trimmed to a `.`/`_` segment
    /// boundary. Used to disambiguate colliding loop names.
    pub(crate) fn full_common_prefix(&self) -> String {
        let Some(first) = self.headers.first() else {
            return String::new();
        };
        let mut len = first.len();
        for header in &self.headers[1..] {
            len = first
                .bytes()
                .zip(header.bytes())
                .take(len)
                .take_while(|(a, b)| a == b)
                .count();
        }
        let prefix = &first[..len];
        match prefix.rfind(['.', '_']) {
            Some(boundary) if boundary > 0 => prefix[..boundary].to_string(),
            _ => prefix.to_string(),
        }
    }

    /// Number of data rows. Forces a parse.
    pub fn n_rows(&mut self) -> Result<usize, CifError> {
        Ok(self.parsed()?.rows)
    }

    /// Returns the full column behind the first present key.
    pub fn get_column(&mut self, keys: &[&str]) -> Result<&[Value], CifError> {
        let key = self.resolve_key(keys)?;
        Ok(&self.parsed()?.values[&key])
    }

    /// Value at `row` of the first present key among `keys`.
    pub fn get_value(&mut self, keys: &[&str], row: usize) -> Result<&Value, CifError> {
        let key = self.resolve_key(keys)?;
        let name = self.name.clone();
        let columns = self.parsed()?;
        let column = &columns.values[&key];
        column.get(row).ok_or(CifError::RowOutOfRange {
            name,
            row,
            rows: columns.rows,
        })
    }

    /// Like [`get_value`](Self::get_value), but absent columns yield `None`
    /// instead of an error. Row overruns still fail.
    pub fn get_optional_value(&mut self, keys: &[&str], row: usize) -> Result<Option<&Value>, CifError> {
        if self.resolve_key(keys).is_err() {
            return Ok(None);
        }
        self.get_value(keys, row).map(Some)
    }

    /// Standard uncertainty paired with `keys` at `row`. `None` when the
    /// column never parsed an uncertainty or this row lacks one.
    pub fn get_su(&mut self, keys: &[&str], row: usize) -> Result<Option<f64>, CifError> {
        let Ok(key) = self.resolve_key(keys) else {
            return Ok(None);
        };
        let columns = self.parsed()?;
        Ok(columns.sus.get(&key).and_then(|col| col.get(row)).copied().flatten())
    }

    fn resolve_key(&self, keys: &[&str]) -> Result<String, CifError> {
        keys.iter()
            .find(|key| self.headers.iter().any(|h| h == *key))
            .map(|key| key.to_string())
            .ok_or_else(|| CifError::MissingColumn {
                name: self.name.clone(),
                tried: keys.iter().map(|k| k.to_string()).collect(),
            })
    }

    fn parsed(&mut self) -> Result<&Columns, CifError> {
        if let State::Unparsed { lines } = &self.state {
            let columns = parse_columns(&self.name, &self.headers, lines)?;
            self.state = State::Parsed(columns);
        }
        match &self.state {
            State::Parsed(columns) => Ok(columns),
            State::Unparsed { .. } => unreachable!("loop state forced above"),
        }
    }
}

fn parse_columns(name: &str, headers: &[String], lines: &[String]) -> Result<Columns, CifError> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if line == ";" {
            let (value, close) = parse_multiline(lines, i)?;
            tokens.push(Token::Multiline(value));
            i = close + 1;
        } else {
            tokens.extend(tokenize_line(line).into_iter().map(Token::Raw));
            i += 1;
        }
    }

    let columns = headers.len();
    if tokens.is_empty() {
        return Err(CifError::EmptyLoop {
            name: name.to_string(),
        });
    }
    if tokens.len() % columns != 0 {
        return Err(CifError::LoopShape {
            name: name.to_string(),
            columns,
            values: tokens.len(),
        });
    }
    let rows = tokens.len() / columns;

    let mut values: HashMap<String, Vec<Value>> = headers
        .iter()
        .map(|h| (h.clone(), Vec::with_capacity(rows)))
        .collect();
    let mut raw_sus: HashMap<String, Vec<Option<f64>>> = headers
        .iter()
        .map(|h| (h.clone(), Vec::with_capacity(rows)))
        .collect();

    for (index, token) in tokens.into_iter().enumerate() {
        let header = &headers[index % columns];
        let parsed = match token {
            Token::Multiline(text) => super::value::ParsedValue {
                value: Value::Str(text),
                su: None,
            },
            Token::Raw(raw) => parse_value(&raw, true),
        };
        if let Some(column) = values.get_mut(header) {
            column.push(parsed.value);
        }
        if let Some(column) = raw_sus.get_mut(header) {
            column.push(parsed.su);
        }
    }

    // Promote only columns where some row actually carried an uncertainty.
    let sus = raw_sus
        .into_iter()
        .filter(|(_, col)| col.iter().any(Option::is_some))
        .collect();

    Ok(Columns { values, sus, rows })
}

/// Splits one data line into raw tokens: quoted runs stay single tokens, the
/// quotes are kept for the value parser to strip.
fn tokenize_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        let quote = chars[i];
        if quote == '\'' || quote == '"' {
            let start = i;
            i += 1;
            loop {
                if i >= chars.len() {
                    tokens.push(chars[start..].iter().collect());
                    break;
                }
                if chars[i] == quote && (i + 1 == chars.len() || chars[i + 1].is_whitespace()) {
                    tokens.push(chars[start..=i].iter().collect());
                    i += 1;
                    break;
                }
                i += 1;
            }
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }
    tokens
}

/// Derives a loop's name from its headers: well-known standard prefixes win,
/// then the dot-category heuristic, then the longest `_`-segment prefix
/// shared by a majority of headers. An unresolved equal-support tie is fatal.
fn derive_loop_name(headers: &[String]) -> Result<String, CifError> {
    let majority = headers.len() / 2 + 1;

    let mut best_standard: Option<&str> = None;
    for candidate in STANDARD_LOOP_NAMES {
        let support = headers.iter().filter(|h| h.starts_with(candidate)).count();
        if support >= majority && best_standard.map_or(true, |b| candidate.len() > b.len()) {
            best_standard = Some(candidate);
        }
    }
    if let Some(name) = best_standard {
        return Ok(name.to_string());
    }

    // DDL2-style `_category.item` headers carry their own category name.
    if headers.iter().any(|h| h.contains('.')) {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for header in headers {
            let category = match header.find('.') {
                Some(dot) => header[..dot].to_string(),
                None => continue,
            };
            match counts.iter_mut().find(|(name, _)| *name == category) {
                Some((_, count)) => *count += 1,
                None => counts.push((category, 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some((top, top_count)) = counts.first().cloned() {
            if let Some((second, second_count)) = counts.get(1).cloned() {
                if second_count == top_count {
                    return Err(CifError::AmbiguousLoopName {
                        first: top,
                        second,
                    });
                }
            }
            if top_count >= majority {
                return Ok(top);
            }
        }
    }

    // Generic `_`-segment prefixes: longest one a majority of headers share.
    let mut candidates: HashMap<&str, usize> = HashMap::new();
    for header in headers {
        for (pos, _) in header.match_indices('_').skip(1) {
            *candidates.entry(&header[..pos]).or_default() += 1;
        }
        *candidates.entry(header.as_str()).or_default() += 1;
    }
    let best_len = candidates
        .iter()
        .filter(|(_, &support)| support >= majority)
        .map(|(prefix, _)| prefix.len())
        .max();
    match best_len {
        Some(len) => {
            let mut winners: Vec<&str> = candidates
                .iter()
                .filter(|(prefix, &support)| support >= majority && prefix.len() == len)
                .map(|(prefix, _)| *prefix)
                .collect();
            winners.sort_unstable();
            if winners.len() > 1 {
                return Err(CifError::AmbiguousLoopName {
                    first: winners[0].to_string(),
                    second: winners[1].to_string(),
                });
            }
            Ok(winners[0].to_string())
        }
        None => {
            let mut tags: Vec<&String> = headers.iter().collect();
            tags.sort_unstable();
            Err(CifError::AmbiguousLoopName {
                first: tags.first().map(|t| t.to_string()).unwrap_or_default(),
                second: tags.get(1).map(|t| t.to_string()).unwrap_or_default(),
            })
        }
    }
}
