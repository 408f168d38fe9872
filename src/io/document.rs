use std::collections::HashMap;

use super::table::LoopTable;
use super::value::{parse_multiline, parse_value, Value};
use super::CifError;

/// A parsed CIF document: the ordered `data_` blocks of one text.
///
/// Splitting is eager and cheap; block bodies and loop data parse lazily on
/// first access.
#[derive(Debug, Clone)]
pub struct CifDocument {
    blocks: Vec<Block>,
}

impl CifDocument {
    pub fn parse(text: &str) -> Self {
        let padded = format!("\n{text}");
        let candidates: Vec<&str> = padded.split("\ndata_").collect();

        let mut blocks = Vec::new();
        let mut iter = candidates.into_iter().skip(1);
        while let Some(chunk) = iter.next() {
            let mut current = chunk.to_string();
            // An odd number of multiline markers means an unterminated
            // `;` field swallowed the next `data_` token; absorb until even.
            while count_multiline_markers(&current) % 2 == 1 {
                match iter.next() {
                    Some(next) => {
                        current.push_str("\ndata_");
                        current.push_str(next);
                    }
                    None => break,
                }
            }
            blocks.push(Block::from_chunk(&current));
        }

        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn get_block(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn get_block_by_name(&mut self, name: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.name() == name)
    }
}

fn count_multiline_markers(chunk: &str) -> usize {
    chunk.lines().filter(|l| l.trim_start().starts_with(';')).count()
}

/// One `data_` block: a name plus a lazily parsed tag→entry mapping.
#[derive(Debug, Clone)]
pub struct Block {
    name: String,
    lines: Vec<String>,
    state: BlockState,
}

#[derive(Debug, Clone)]
enum BlockState {
    Unparsed,
    Parsed(HashMap<String, BlockEntry>),
}

/// A block-level entry: a scalar item or a whole loop.
#[derive(Debug, Clone)]
pub enum BlockEntry {
    Item(Value),
    Loop(LoopTable),
}

impl Block {
    fn from_chunk(chunk: &str) -> Self {
        let mut lines = chunk.lines();
        let name = lines
            .next()
            .and_then(|l| l.split_whitespace().next())
            .unwrap_or("")
            .to_string();
        let body = lines
            .map(strip_comment)
            .filter(|l| !l.trim().is_empty())
            .collect();
        Self {
            name,
            lines: body,
            state: BlockState::Unparsed,
        }
    }

    /// The block's `data_<name>` name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forces the body parse. Idempotent: already-parsed blocks return
    /// immediately.
    pub fn ensure_parsed(&mut self) -> Result<(), CifError> {
        if matches!(self.state, BlockState::Parsed(_)) {
            return Ok(());
        }
        let entries = parse_body(&self.lines)?;
        self.state = BlockState::Parsed(entries);
        Ok(())
    }

    /// First present entry among the synonym `keys`, tried in order.
    pub fn get(&mut self, keys: &[&str]) -> Result<&BlockEntry, CifError> {
        self.ensure_parsed()?;
        let BlockState::Parsed(entries) = &self.state else {
            unreachable!("block state forced above");
        };
        keys.iter()
            .find_map(|key| entries.get(*key))
            .ok_or_else(|| CifError::MissingKeys {
                block: self.name.clone(),
                tried: keys.iter().map(|k| k.to_string()).collect(),
            })
    }

    /// Like [`get`](Self::get), but absence is not an error.
    pub fn get_optional(&mut self, keys: &[&str]) -> Result<Option<&BlockEntry>, CifError> {
        self.ensure_parsed()?;
        let BlockState::Parsed(entries) = &self.state else {
            unreachable!("block state forced above");
        };
        Ok(keys.iter().find_map(|key| entries.get(*key)))
    }

    /// Scalar value behind the first present key.
    pub fn get_value(&mut self, keys: &[&str]) -> Result<&Value, CifError> {
        let missing = CifError::MissingKeys {
            block: self.name.clone(),
            tried: keys.iter().map(|k| k.to_string()).collect(),
        };
        match self.get(keys)? {
            BlockEntry::Item(value) => Ok(value),
            BlockEntry::Loop(_) => Err(missing),
        }
    }

    /// Scalar behind the first present key, or `None` when every key is
    /// absent or names a loop.
    pub fn get_optional_value(&mut self, keys: &[&str]) -> Result<Option<&Value>, CifError> {
        match self.get_optional(keys)? {
            Some(BlockEntry::Item(value)) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Numeric scalar behind the first present key.
    pub fn get_f64(&mut self, keys: &[&str]) -> Result<f64, CifError> {
        let tag = keys.first().copied().unwrap_or_default().to_string();
        let value = self.get_value(keys)?;
        value.as_f64().ok_or_else(|| CifError::NotNumeric {
            tag,
            got: value.to_string(),
        })
    }

    /// Loop behind the first present key.
    pub fn get_loop(&mut self, keys: &[&str]) -> Result<&mut LoopTable, CifError> {
        self.ensure_parsed()?;
        let tried = || keys.iter().map(|k| k.to_string()).collect();
        let name = self.name.clone();
        let BlockState::Parsed(entries) = &mut self.state else {
            unreachable!("block state forced above");
        };
        let key = keys
            .iter()
            .find(|key| entries.contains_key(**key))
            .ok_or_else(|| CifError::MissingKeys {
                block: name.clone(),
                tried: tried(),
            })?;
        match entries.get_mut(*key) {
            Some(BlockEntry::Loop(table)) => Ok(table),
            _ => Err(CifError::MissingKeys {
                block: name,
                tried: tried(),
            }),
        }
    }

    /// Like [`get_loop`](Self::get_loop), but absence is not an error.
    pub fn get_optional_loop(&mut self, keys: &[&str]) -> Result<Option<&mut LoopTable>, CifError> {
        match self.get_loop(keys) {
            Ok(table) => Ok(Some(table)),
            Err(CifError::MissingKeys { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// All entry keys (items and loop names). Forces the body parse.
    pub fn keys(&mut self) -> Result<Vec<String>, CifError> {
        self.ensure_parsed()?;
        let BlockState::Parsed(entries) = &self.state else {
            unreachable!("block state forced above");
        };
        Ok(entries.keys().cloned().collect())
    }
}

fn strip_comment(line: &str) -> String {
    let mut in_single = false;
    let mut in_double = false;
    for (index, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => return line[..index].trim_end().to_string(),
            _ => {}
        }
    }
    line.to_string()
}

fn parse_body(lines: &[String]) -> Result<HashMap<String, BlockEntry>, CifError> {
    let mut entries = HashMap::new();
    let mut loops: Vec<LoopTable> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        let next = lines.get(i + 1).map(|l| l.trim());

        if next == Some(";") {
            // Bare tag whose value is a `;`-fenced field.
            let tag = line.split_whitespace().next().unwrap_or(line).to_string();
            let (value, close) = parse_multiline(lines, i + 1)?;
            entries.insert(tag, BlockEntry::Item(Value::Str(value)));
            i = close + 1;
        } else if line.starts_with("loop_") {
            let (table, consumed) = parse_loop(lines, i)?;
            loops.push(table);
            i += consumed;
        } else if let Some((tag, rest)) = split_inline_pair(line) {
            store_item(&mut entries, tag, rest);
            i += 1;
        } else if line.starts_with('_')
            && next.map_or(false, |n| !n.starts_with('_') && !n.starts_with("loop_"))
        {
            // Bare tag; the following line holds its value.
            store_item(&mut entries, line, next.unwrap_or_default());
            i += 2;
        } else {
            return Err(CifError::MalformedLine {
                index: i,
                content: line.to_string(),
            });
        }
    }

    resolve_loop_collisions(&mut loops)?;
    for table in loops {
        let name = table.name().to_string();
        if entries.insert(name.clone(), BlockEntry::Loop(table)).is_some() {
            return Err(CifError::LoopNameCollision { name });
        }
    }
    Ok(entries)
}

fn split_inline_pair(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with('_') {
        return None;
    }
    let split = line.find(char::is_whitespace)?;
    let rest = line[split..].trim();
    (!rest.is_empty()).then_some((&line[..split], rest))
}

fn store_item(entries: &mut HashMap<String, BlockEntry>, tag: &str, raw: &str) {
    let parsed = parse_value(raw, true);
    if let Some(su) = parsed.su {
        entries.insert(format!("{tag}_su"), BlockEntry::Item(Value::Float(su)));
    }
    entries.insert(tag.to_string(), BlockEntry::Item(parsed.value));
}

fn parse_loop(lines: &[String], start: usize) -> Result<(LoopTable, usize), CifError> {
    let mut i = start + 1;
    let mut headers = Vec::new();
    while i < lines.len() && lines[i].trim().starts_with('_') {
        headers.push(lines[i].trim().to_string());
        i += 1;
    }
    if headers.is_empty() {
        return Err(CifError::MalformedLine {
            index: start,
            content: lines[start].trim().to_string(),
        });
    }

    // Data runs until the next tag or loop; `;` fences may hide both.
    let mut data = Vec::new();
    let mut in_fence = false;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed == ";" {
            in_fence = !in_fence;
        } else if !in_fence && (trimmed.starts_with('_') || trimmed.starts_with("loop_")) {
            break;
        }
        data.push(lines[i].clone());
        i += 1;
    }

    Ok((LoopTable::new(headers, data)?, i - start))
}

/// Resolves derived-name collisions: the loop with the fuller unique prefix
/// is renamed to it, the shorter keeps the generic name. Anything still
/// colliding afterwards is fatal.
fn resolve_loop_collisions(loops: &mut [LoopTable]) -> Result<(), CifError> {
    for a in 0..loops.len() {
        for b in (a + 1)..loops.len() {
            if loops[a].name() != loops[b].name() {
                continue;
            }
            let name = loops[a].name().to_string();
            let full_a = loops[a].full_common_prefix();
            let full_b = loops[b].full_common_prefix();
            if full_a.len() == full_b.len() {
                return Err(CifError::LoopNameCollision { name });
            }
            if full_a.len() > full_b.len() {
                loops[a].set_name(full_a);
            } else {
                loops[b].set_name(full_b);
            }
            if loops[a].name() == loops[b].name() {
                return Err(CifError::LoopNameCollision { name });
            }
        }
    }
    Ok(())
}
