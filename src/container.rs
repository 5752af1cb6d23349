//! The ordered container backing tables and documents.
//!
//! A `Container` keeps the parsed body as ground truth: a vector of
//! `(Option<Key>, Item)` slots where keyless slots hold whitespace, comments
//! and deletion tombstones. The key-to-index map is only a cache over the
//! body. Deletions leave a `Null` tombstone in place so every index in the
//! map stays valid without renumbering.

use std::collections::HashMap;

use crate::items::{Item, Table, Trivia};
use crate::key::{Key, PathSegment};
use crate::types::ParseError;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Container {
    body: Vec<(Option<Key>, Item)>,
    map: HashMap<Key, Vec<usize>>,
    parsing: bool,
    inline: bool,
}

impl Container {
    /// An empty container with style-repair enabled (the state user-built
    /// documents live in).
    pub fn new() -> Container {
        Container { body: Vec::new(), map: HashMap::new(), parsing: false, inline: false }
    }

    /// An empty container in parsing mode: slots are appended verbatim with
    /// no style repair.
    pub(crate) fn new_parsing() -> Container {
        Container { body: Vec::new(), map: HashMap::new(), parsing: true, inline: false }
    }

    pub(crate) fn is_parsing(&self) -> bool {
        self.parsing
    }

    /// Marks this container as the body of an inline table: insertions use
    /// `, ` separators instead of line-oriented repair.
    pub(crate) fn set_inline(&mut self) {
        self.inline = true;
    }

    /// Flips the parsing flag here and in every nested container.
    pub(crate) fn set_parsing(&mut self, parsing: bool) {
        self.parsing = parsing;
        for (_, item) in &mut self.body {
            match item {
                Item::Table(table) => table.container_mut().set_parsing(parsing),
                Item::InlineTable(table) => table.container.set_parsing(parsing),
                Item::AoT(aot) => {
                    for table in &mut aot.body {
                        table.container_mut().set_parsing(parsing);
                    }
                },
                _ => {},
            }
        }
    }

    pub(crate) fn body(&self) -> &[(Option<Key>, Item)] {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut Vec<(Option<Key>, Item)> {
        &mut self.body
    }

    /// The number of distinct keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.map.contains_key(key)
    }

    /// Iterates the keyed slots in body (declaration) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.body.iter().filter_map(|(key, item)| match key {
            Some(key) if !item.is_null() => Some((key.name(), item)),
            _ => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(key, _)| key)
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.get_key(&Key::new(key))
    }

    pub fn get_key(&self, key: &Key) -> Option<&Item> {
        let idx = *self.map.get(key)?.first()?;
        Some(&self.body[idx].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        let idx = *self.map.get(&Key::new(key))?.first()?;
        Some(&mut self.body[idx].1)
    }

    /// Body index of the last keyed, live slot.
    pub(crate) fn last_value_index(&self) -> Option<usize> {
        self.body
            .iter()
            .rposition(|(key, item)| key.is_some() && !item.is_null())
    }

    /// Whether `key` was declared in two or more non-adjacent blocks.
    pub fn is_out_of_order(&self, key: &str) -> bool {
        self.map.get(&Key::new(key)).map_or(false, |indices| indices.len() > 1)
    }

    /// A read/write view joining the sibling blocks of an out-of-order
    /// table. `None` when the key is absent or declared in a single block.
    pub fn proxy(&mut self, key: &str) -> Option<OutOfOrderTableProxy> {
        let indices = self.map.get(&Key::new(key))?.clone();
        if indices.len() < 2 {
            return None;
        }
        Some(OutOfOrderTableProxy { container: self, indices })
    }

    /// Appends a keyless whitespace or comment slot.
    pub fn add(&mut self, item: Item) -> Result<(), ParseError> {
        if !item.is_whitespace() && !item.is_comment() {
            return Err(ParseError::InternalParser {
                line: 0,
                col: 0,
                message: "only whitespace and comments may be added without a key".to_string(),
            });
        }
        self.body.push((None, item));
        Ok(())
    }

    /// Appends a keyed item, applying the duplicate-key merge rules and, out
    /// of parsing mode, the style-repair rules (placement, indentation
    /// inheritance, newline synthesis).
    pub fn append<K, V>(&mut self, key: K, item: V) -> Result<(), ParseError>
        where K: Into<Key>,
              V: Into<Item>
    {
        self.append_item(Some(key.into()), item.into())
    }

    pub(crate) fn append_item(
        &mut self,
        key: Option<Key>,
        mut item: Item,
    ) -> Result<(), ParseError> {
        let key = match key {
            None => {
                self.body.push((None, item));
                return Ok(());
            },
            Some(key) => key,
        };

        if let Item::Table(table) = &mut item {
            if table.name.is_none() {
                table.set_name(key.as_string());
            }
        }
        if let Item::AoT(aot) = &mut item {
            if aot.name.is_none() {
                aot.name = Some(key.as_string());
            }
        }

        if self.map.contains_key(&key) {
            return self.merge_duplicate(key, item);
        }

        if self.parsing {
            self.map.insert(key.clone(), vec![self.body.len()]);
            self.body.push((Some(key), item));
            return Ok(());
        }

        if self.inline {
            if self.last_value_index().is_some() {
                self.body.push((None, Item::Whitespace { s: ", ".to_string() }));
            }
            if let Some(trivia) = item.trivia_mut() {
                trivia.trail = String::new();
            }
            self.map.insert(key.clone(), vec![self.body.len()]);
            self.body.push((Some(key), item));
            return Ok(());
        }

        // Leaves slot in before the first sub-section; sections go last.
        let pos = if item.is_table_like() {
            self.body.len()
        } else {
            self.body
                .iter()
                .position(|(k, v)| k.is_some() && v.is_table_like())
                .unwrap_or(self.body.len())
        };

        if let Some(trivia) = item.trivia_mut() {
            if trivia.indent.is_empty() {
                if let Some(inherited) = self.inherited_indent(pos) {
                    trivia.indent = inherited;
                }
            }
        }

        if !self.ends_with_newline_before(pos) {
            match &mut item {
                Item::AoT(aot) => {
                    if let Some(table) = aot.body.first_mut() {
                        table.trivia.indent = format!("\n{}", table.trivia.indent);
                    }
                },
                other => {
                    if let Some(trivia) = other.trivia_mut() {
                        trivia.indent = format!("\n{}", trivia.indent);
                    }
                },
            }
        }

        for indices in self.map.values_mut() {
            for idx in indices.iter_mut() {
                if *idx >= pos {
                    *idx += 1;
                }
            }
        }
        self.map.insert(key.clone(), vec![pos]);
        self.body.insert(pos, (Some(key), item));
        Ok(())
    }

    fn merge_duplicate(&mut self, key: Key, item: Item) -> Result<(), ParseError> {
        enum Merge {
            AotElement,
            AotExtend,
            Children,
            SiblingSlot,
            Reject,
        }

        let last_idx = self
            .map
            .get(&key)
            .and_then(|indices| indices.last().copied());
        let last_idx = match last_idx {
            Some(idx) => idx,
            None => {
                return Err(ParseError::InternalParser {
                    line: 0,
                    col: 0,
                    message: "duplicate key with no body slot".to_string(),
                })
            },
        };
        // Appending into the final slot keeps emission in source order; a
        // key declared earlier in the body gets a sibling slot instead so
        // every block re-emits at its original position.
        let is_last = self.last_value_index() == Some(last_idx);

        let merge = match (&self.body[last_idx].1, &item) {
            // A further [[x]] block for an existing array of tables.
            (Item::AoT(_), Item::Table(table)) if table.is_aot_element() => Merge::AotElement,
            (Item::AoT(_), Item::AoT(aot)) if aot.parsed => {
                if is_last {
                    Merge::AotExtend
                } else {
                    Merge::SiblingSlot
                }
            },
            // A sibling declaration reached through a shared super-table
            // prefix.
            (Item::Table(_), Item::Table(table)) if table.is_super_table() => {
                if is_last {
                    Merge::Children
                } else {
                    Merge::SiblingSlot
                }
            },
            (Item::Table(current), Item::Table(_)) if current.is_super_table() => {
                Merge::SiblingSlot
            },
            (Item::Table(current), Item::AoT(_)) if current.is_super_table() => {
                Merge::SiblingSlot
            },
            (Item::AoT(_), Item::Table(table)) if table.is_super_table() => Merge::SiblingSlot,
            _ => Merge::Reject,
        };

        match merge {
            Merge::AotElement => {
                if let (Item::AoT(aot), Item::Table(table)) = (&mut self.body[last_idx].1, item)
                {
                    aot.body.push(table);
                }
                Ok(())
            },
            Merge::AotExtend => {
                if let (Item::AoT(aot), Item::AoT(more)) = (&mut self.body[last_idx].1, item) {
                    aot.body.extend(more.body);
                }
                Ok(())
            },
            Merge::Children => {
                // Hoist the new super-table's children into the existing
                // block; nested duplicates re-apply these rules.
                let children = match item {
                    Item::Table(table) => table,
                    _ => return Err(ParseError::KeyAlreadyPresent { key: key.name().to_string() }),
                };
                match &mut self.body[last_idx].1 {
                    Item::Table(table) => {
                        let target = table.container_mut();
                        for (child_key, child) in children.container.body.into_iter() {
                            target.append_item(child_key, child)?;
                        }
                        Ok(())
                    },
                    _ => Err(ParseError::KeyAlreadyPresent { key: key.name().to_string() }),
                }
            },
            Merge::SiblingSlot => {
                debug!("table {:?} declared out of order", key.name());
                let idx = self.body.len();
                if let Some(indices) = self.map.get_mut(&key) {
                    indices.push(idx);
                }
                self.body.push((Some(key), item));
                Ok(())
            },
            Merge::Reject => {
                warn!("duplicate key {:?}", key.name());
                Err(ParseError::KeyAlreadyPresent { key: key.name().to_string() })
            },
        }
    }

    /// Indent of the last non-whitespace keyed item before `pos`.
    fn inherited_indent(&self, pos: usize) -> Option<String> {
        self.body[..pos]
            .iter()
            .rev()
            .filter(|(key, item)| key.is_some() && !item.is_null())
            .find_map(|(_, item)| item.trivia().map(|trivia| trivia.indent.clone()))
            .filter(|indent| !indent.is_empty())
    }

    /// Whether the text rendered for everything before `pos` ends with a
    /// newline (vacuously true for an empty prefix).
    fn ends_with_newline_before(&self, pos: usize) -> bool {
        for (_, item) in self.body[..pos].iter().rev() {
            if item.is_null() {
                continue;
            }
            return item_ends_with_newline(item);
        }
        true
    }

    /// Replaces the value at `key`, preserving the old slot's trivia unless
    /// the replacement is a Whitespace/Table/AoT, which carry their own
    /// layout. Replacing a leaf with a Table moves it: the leaf slot becomes
    /// a tombstone, a blank line is appended, and the table goes to the end
    /// of the body.
    pub fn replace<K, V>(&mut self, key: K, item: V) -> Result<(), ParseError>
        where K: Into<Key>,
              V: Into<Item>
    {
        let key = key.into();
        let mut item = item.into();
        let indices = match self.map.get(&key) {
            Some(indices) => indices.clone(),
            None => {
                return Err(ParseError::NonExistentKey { key: key.name().to_string() })
            },
        };
        let idx = indices[0];
        // Collapse any extra out-of-order blocks: the replacement is the
        // whole new value of the key.
        for &extra in indices.iter().skip(1) {
            self.body[extra] = (None, Item::Null);
        }
        self.map.insert(key.clone(), vec![idx]);

        let old_is_leaf = !self.body[idx].1.is_table_like();

        if item.is_table_like() && old_is_leaf {
            self.body[idx] = (None, Item::Null);
            self.map.remove(&key);
            self.body.push((None, Item::Whitespace { s: "\n".to_string() }));
            return self.append_item(Some(key), item);
        }

        match &item {
            Item::Whitespace { .. } | Item::Table(_) | Item::AoT(_) | Item::Null => {},
            _ => {
                let old = self.body[idx].1.trivia().cloned();
                if let (Some(old), Some(new)) = (old, item.trivia_mut()) {
                    new.indent = old.indent;
                    new.comment_ws = old.comment_ws;
                    new.comment = old.comment;
                    new.trail = old.trail;
                }
            },
        }
        if let Item::Table(table) = &mut item {
            if table.display_name.is_none() {
                if let Item::Table(old) = &self.body[idx].1 {
                    table.set_display_name(old.display_name.clone());
                }
            }
            if table.name.is_none() {
                table.set_name(key.as_string());
            }
        }
        self.body[idx].1 = item;
        self.body[idx].0 = Some(key);
        Ok(())
    }

    /// Replace-or-append.
    pub fn set<K, V>(&mut self, key: K, item: V) -> Result<(), ParseError>
        where K: Into<Key>,
              V: Into<Item>
    {
        let key = key.into();
        if self.map.contains_key(&key) {
            self.replace(key, item)
        } else {
            self.append_item(Some(key), item.into())
        }
    }

    /// Tombstones every slot of `key` and drops it from the index, then
    /// coalesces neighbouring blank-line whitespace so the emitted text has
    /// no doubled blank lines.
    pub fn remove(&mut self, key: &str) -> Result<(), ParseError> {
        let key = Key::new(key);
        let indices = match self.map.remove(&key) {
            Some(indices) => indices,
            None => {
                warn!("cannot remove missing key {:?}", key.name());
                return Err(ParseError::NonExistentKey { key: key.name().to_string() });
            },
        };
        for idx in indices {
            self.body[idx] = (None, Item::Null);
            self.coalesce_whitespace_around(idx);
        }
        Ok(())
    }

    /// Like `remove`, but also drops the `", "` separator next to the
    /// removed slot. Used by inline tables.
    pub(crate) fn remove_with_separator(&mut self, key: &str) -> Result<(), ParseError> {
        let key = Key::new(key);
        let indices = match self.map.remove(&key) {
            Some(indices) => indices,
            None => {
                return Err(ParseError::NonExistentKey { key: key.name().to_string() })
            },
        };
        for idx in indices {
            self.body[idx] = (None, Item::Null);
            let following = self.body[idx + 1..]
                .iter()
                .position(|(_, item)| !item.is_null())
                .map(|offset| idx + 1 + offset);
            let preceding = self.body[..idx]
                .iter()
                .rposition(|(_, item)| !item.is_null());
            let separator = [following, preceding]
                .iter()
                .flatten()
                .copied()
                .find(|&i| match &self.body[i].1 {
                    Item::Whitespace { s } => s.contains(','),
                    _ => false,
                });
            if let Some(i) = separator {
                self.body[i] = (None, Item::Null);
            }
        }
        Ok(())
    }

    fn coalesce_whitespace_around(&mut self, idx: usize) {
        let after_is_ws = self
            .body
            .get(idx + 1)
            .map_or(false, |(_, item)| item.is_whitespace());
        let before_is_ws =
            idx > 0 && self.body.get(idx - 1).map_or(false, |(_, item)| item.is_whitespace());
        if !(after_is_ws && before_is_ws) {
            return;
        }
        let mut merged = match &self.body[idx - 1].1 {
            Item::Whitespace { s } => s.clone(),
            _ => return,
        };
        if let Item::Whitespace { s } = &self.body[idx + 1].1 {
            merged.push_str(s);
        }
        // Cap a run of bare newlines at one blank line.
        if merged.chars().all(|c| c == '\n') && merged.len() > 2 {
            merged.truncate(2);
        }
        self.body[idx - 1].1 = Item::Whitespace { s: merged };
        self.body[idx + 1] = (None, Item::Null);
    }

    // ----- emission ---------------------------------------------------

    /// Re-assembles the source for this body. `prefix` is the dotted path of
    /// the enclosing table and is used for headers of nested sections; it
    /// never touches leaf keys.
    pub fn as_string(&self, prefix: Option<&str>) -> String {
        let mut out = String::new();
        for (key, item) in &self.body {
            match key {
                None => out.push_str(&item.as_string()),
                Some(key) => match item {
                    Item::Table(table) => {
                        out.push_str(&self.render_table(key, table, prefix))
                    },
                    Item::AoT(aot) => out.push_str(&self.render_aot(key, aot, prefix)),
                    Item::Null => {},
                    leaf => out.push_str(&render_simple(None, key, leaf)),
                },
            }
        }
        out
    }

    fn render_table(&self, key: &Key, table: &Table, prefix: Option<&str>) -> String {
        if key.is_dotted() {
            return render_dotted(&key.as_string(), table);
        }
        let path = join_path(prefix, key);
        if table.is_super_table() {
            return table.container().as_string(Some(&path));
        }
        let header = table.display_name().map(str::to_string).unwrap_or(path);
        let (open, close) = if table.is_aot_element() { ("[[", "]]") } else { ("[", "]") };
        format!(
            "{}{}{}{}{}{}{}{}",
            table.trivia.indent,
            open,
            header,
            close,
            table.trivia.comment_ws,
            table.trivia.comment,
            table.trivia.trail,
            table.container().as_string(Some(&header))
        )
    }

    fn render_aot(&self, key: &Key, aot: &crate::items::AoT, prefix: Option<&str>) -> String {
        let path = join_path(prefix, key);
        let mut out = String::new();
        for table in &aot.body {
            if table.is_super_table() {
                out.push_str(&table.container().as_string(Some(&path)));
                continue;
            }
            let header = table.display_name().map(str::to_string).unwrap_or_else(|| path.clone());
            out.push_str(&format!(
                "{}[[{}]]{}{}{}{}",
                table.trivia.indent,
                header,
                table.trivia.comment_ws,
                table.trivia.comment,
                table.trivia.trail,
                table.container().as_string(Some(&header))
            ));
        }
        out
    }

    // ----- path navigation --------------------------------------------

    pub(crate) fn get_path(&self, segs: &[PathSegment]) -> Option<&Item> {
        let (first, rest) = segs.split_first()?;
        let key = match first {
            PathSegment::Name(key) => key,
            PathSegment::Index(_) => return None,
        };
        let indices = self.map.get(key)?;
        if indices.len() == 1 {
            return descend(&self.body[indices[0]].1, rest);
        }
        self.resolve_multi(indices, rest)
    }

    fn resolve_multi(&self, indices: &[usize], rest: &[PathSegment]) -> Option<&Item> {
        match rest.first() {
            None => Some(&self.body[indices[0]].1),
            Some(PathSegment::Index(wanted)) => {
                // Join sibling AoT runs into one virtual sequence.
                let mut remaining = *wanted;
                for &idx in indices {
                    if let Item::AoT(aot) = &self.body[idx].1 {
                        if remaining < aot.len() {
                            let table = aot.get(remaining)?;
                            return if rest.len() == 1 {
                                None
                            } else {
                                table.container().get_path(&rest[1..])
                            };
                        }
                        remaining -= aot.len();
                    }
                }
                None
            },
            Some(PathSegment::Name(next)) => {
                let idx = self.slot_containing(indices, next).unwrap_or(indices[0]);
                descend(&self.body[idx].1, rest)
            },
        }
    }

    fn slot_containing(&self, indices: &[usize], key: &Key) -> Option<usize> {
        indices.iter().copied().find(|&idx| match &self.body[idx].1 {
            Item::Table(table) => table.container().contains_key(key),
            _ => false,
        })
    }

    pub(crate) fn get_path_mut(&mut self, segs: &[PathSegment]) -> Option<&mut Item> {
        let (first, rest) = segs.split_first()?;
        let key = match first {
            PathSegment::Name(key) => key,
            PathSegment::Index(_) => return None,
        };
        let indices = self.map.get(key)?.clone();
        let idx = if indices.len() == 1 {
            indices[0]
        } else {
            match rest.first() {
                Some(PathSegment::Name(next)) => {
                    self.slot_containing(&indices, next).unwrap_or(indices[0])
                },
                _ => indices[0],
            }
        };
        descend_mut(&mut self.body[idx].1, rest)
    }

    pub(crate) fn set_path(&mut self, segs: &[PathSegment], item: Item) -> Result<(), ParseError> {
        match segs {
            [] => Err(ParseError::NonExistentKey { key: String::new() }),
            [PathSegment::Name(key)] => self.set(key.clone(), item),
            [PathSegment::Index(_)] => {
                Err(ParseError::NonExistentKey { key: "[..]".to_string() })
            },
            [first, rest @ ..] => {
                let parent = match first {
                    PathSegment::Name(key) => {
                        let indices = match self.map.get(key) {
                            Some(indices) => indices.clone(),
                            None => {
                                return Err(ParseError::NonExistentKey {
                                    key: key.name().to_string(),
                                })
                            },
                        };
                        let idx = if indices.len() == 1 {
                            indices[0]
                        } else {
                            match rest.first() {
                                Some(PathSegment::Name(next)) => self
                                    .slot_containing(&indices, next)
                                    .unwrap_or(indices[0]),
                                _ => indices[0],
                            }
                        };
                        &mut self.body[idx].1
                    },
                    PathSegment::Index(_) => {
                        return Err(ParseError::NonExistentKey { key: "[..]".to_string() })
                    },
                };
                set_path_in_item(parent, rest, item)
            },
        }
    }

    pub(crate) fn remove_path(&mut self, segs: &[PathSegment]) -> Result<(), ParseError> {
        match segs {
            [] => Err(ParseError::NonExistentKey { key: String::new() }),
            [PathSegment::Name(key)] => self.remove(key.name()),
            [PathSegment::Index(_)] => {
                Err(ParseError::NonExistentKey { key: "[..]".to_string() })
            },
            [first, rest @ ..] => {
                let key = match first {
                    PathSegment::Name(key) => key,
                    PathSegment::Index(_) => {
                        return Err(ParseError::NonExistentKey { key: "[..]".to_string() })
                    },
                };
                let indices = match self.map.get(key) {
                    Some(indices) => indices.clone(),
                    None => {
                        return Err(ParseError::NonExistentKey { key: key.name().to_string() })
                    },
                };
                let idx = if indices.len() == 1 {
                    indices[0]
                } else {
                    match rest.first() {
                        Some(PathSegment::Name(next)) => {
                            self.slot_containing(&indices, next).unwrap_or(indices[0])
                        },
                        _ => indices[0],
                    }
                };
                remove_path_in_item(&mut self.body[idx].1, rest)
            },
        }
    }

    // ----- sorted copy for dumps --------------------------------------

    /// Re-orders leaf entries alphabetically within each table body.
    /// Declared sections keep their positions; out-of-order blocks sort
    /// internally only.
    pub(crate) fn sort_leaves(&mut self) {
        let leaf_slots: Vec<usize> = self
            .body
            .iter()
            .enumerate()
            .filter(|(_, (key, item))| {
                key.is_some() && !item.is_null() && !item.is_table_like()
            })
            .map(|(idx, _)| idx)
            .collect();
        let mut entries: Vec<(Option<Key>, Item)> = Vec::with_capacity(leaf_slots.len());
        for &idx in &leaf_slots {
            entries.push(std::mem::replace(&mut self.body[idx], (None, Item::Null)));
        }
        entries.sort_by(|(a, _), (b, _)| {
            a.as_ref().map(Key::name).cmp(&b.as_ref().map(Key::name))
        });
        for (&idx, entry) in leaf_slots.iter().zip(entries) {
            self.body[idx] = entry;
        }
        self.rebuild_map();
        for (_, item) in &mut self.body {
            match item {
                Item::Table(table) => table.container_mut().sort_leaves(),
                Item::InlineTable(table) => table.container.sort_leaves(),
                Item::AoT(aot) => {
                    for table in &mut aot.body {
                        table.container_mut().sort_leaves();
                    }
                },
                _ => {},
            }
        }
    }

    fn rebuild_map(&mut self) {
        self.map.clear();
        for (idx, (key, item)) in self.body.iter().enumerate() {
            if let Some(key) = key {
                if !item.is_null() {
                    self.map.entry(key.clone()).or_insert_with(Vec::new).push(idx);
                }
            }
        }
    }
}

fn join_path(prefix: Option<&str>, key: &Key) -> String {
    match prefix {
        Some(prefix) => format!("{}.{}", prefix, key.as_string()),
        None => key.as_string(),
    }
}

/// `indent + key + sep + value + comment_ws + comment + trail`, with the key
/// joined onto `path` for dotted chains.
fn render_simple(path: Option<&str>, key: &Key, item: &Item) -> String {
    let trivia = item.trivia().cloned().unwrap_or_else(Trivia::empty);
    let rendered_key = match path {
        Some(path) => format!("{}.{}", path, key.as_string()),
        None => key.as_string(),
    };
    format!(
        "{}{}{}{}{}{}{}",
        trivia.indent,
        rendered_key,
        key.sep,
        item.as_string(),
        trivia.comment_ws,
        trivia.comment,
        trivia.trail
    )
}

/// Emits the contents of a table reached through a dotted key: leaves come
/// out as `path.key = value`, nested dotted tables recurse.
pub(crate) fn render_dotted(path: &str, table: &Table) -> String {
    let mut out = String::new();
    for (key, item) in table.container().body() {
        let key = match key {
            Some(key) => key,
            None => {
                out.push_str(&item.as_string());
                continue;
            },
        };
        match item {
            Item::Table(child) => {
                let child_path = format!("{}.{}", path, key.as_string());
                out.push_str(&render_dotted(&child_path, child));
            },
            Item::Null => {},
            leaf => out.push_str(&render_simple(Some(path), key, leaf)),
        }
    }
    out
}

/// Whether the source text an item renders to ends with a newline.
fn item_ends_with_newline(item: &Item) -> bool {
    match item {
        Item::Whitespace { s } => s.ends_with('\n'),
        Item::Table(table) => table_ends_with_newline(table),
        Item::AoT(aot) => match aot.body.last() {
            Some(table) => table_ends_with_newline(table),
            None => true,
        },
        Item::Null => true,
        other => other
            .trivia()
            .map_or(true, |trivia| trivia.trail.ends_with('\n')),
    }
}

fn table_ends_with_newline(table: &Table) -> bool {
    match table.container().body().iter().rev().find(|(_, i)| !i.is_null()) {
        Some((_, last)) => item_ends_with_newline(last),
        None => table.trivia.trail.ends_with('\n'),
    }
}

fn descend<'a>(item: &'a Item, segs: &[PathSegment]) -> Option<&'a Item> {
    if segs.is_empty() {
        return Some(item);
    }
    match (item, &segs[0]) {
        (Item::Table(table), _) => table.container().get_path(segs),
        (Item::InlineTable(table), _) => table.container().get_path(segs),
        (Item::AoT(aot), PathSegment::Index(idx)) => {
            let table = aot.get(*idx)?;
            if segs.len() == 1 {
                None
            } else {
                table.container().get_path(&segs[1..])
            }
        },
        (Item::Array(array), PathSegment::Index(idx)) => {
            descend(array.get(*idx)?, &segs[1..])
        },
        _ => None,
    }
}

fn descend_mut<'a>(item: &'a mut Item, segs: &[PathSegment]) -> Option<&'a mut Item> {
    if segs.is_empty() {
        return Some(item);
    }
    match item {
        Item::Table(table) => table.container_mut().get_path_mut(segs),
        Item::InlineTable(table) => table.container.get_path_mut(segs),
        Item::AoT(aot) => match &segs[0] {
            PathSegment::Index(idx) => {
                let table = aot.get_mut(*idx)?;
                if segs.len() == 1 {
                    None
                } else {
                    table.container_mut().get_path_mut(&segs[1..])
                }
            },
            _ => None,
        },
        Item::Array(array) => match &segs[0] {
            PathSegment::Index(idx) => descend_mut(array.get_mut(*idx)?, &segs[1..]),
            _ => None,
        },
        _ => None,
    }
}

fn set_path_in_item(
    parent: &mut Item,
    segs: &[PathSegment],
    item: Item,
) -> Result<(), ParseError> {
    match parent {
        Item::Table(table) => {
            if let [PathSegment::Name(_)] = segs {
                table.prepare_for_append();
            }
            table.container_mut().set_path(segs, item)
        },
        Item::InlineTable(table) => table.container.set_path(segs, item),
        Item::AoT(aot) => match segs {
            [PathSegment::Index(idx), rest @ ..] if !rest.is_empty() => {
                let table = aot.get_mut(*idx).ok_or(ParseError::NonExistentKey {
                    key: format!("[{}]", idx),
                })?;
                if let [PathSegment::Name(_)] = rest {
                    table.prepare_for_append();
                }
                table.container_mut().set_path(rest, item)
            },
            _ => Err(ParseError::NonExistentKey { key: "[..]".to_string() }),
        },
        Item::Array(array) => match segs {
            [PathSegment::Index(idx)] => {
                let slot = array.get_mut(*idx).ok_or(ParseError::NonExistentKey {
                    key: format!("[{}]", idx),
                })?;
                *slot = item;
                Ok(())
            },
            [PathSegment::Index(idx), rest @ ..] => {
                let slot = array.get_mut(*idx).ok_or(ParseError::NonExistentKey {
                    key: format!("[{}]", idx),
                })?;
                set_path_in_item(slot, rest, item)
            },
            _ => Err(ParseError::NonExistentKey { key: "[..]".to_string() }),
        },
        other => Err(ParseError::NonExistentKey { key: other.type_name().to_string() }),
    }
}

fn remove_path_in_item(parent: &mut Item, segs: &[PathSegment]) -> Result<(), ParseError> {
    match parent {
        Item::Table(table) => table.container_mut().remove_path(segs),
        Item::InlineTable(table) => table.container.remove_path(segs),
        Item::AoT(aot) => match segs {
            [PathSegment::Index(idx), rest @ ..] if !rest.is_empty() => {
                let table = aot.get_mut(*idx).ok_or(ParseError::NonExistentKey {
                    key: format!("[{}]", idx),
                })?;
                table.container_mut().remove_path(rest)
            },
            _ => Err(ParseError::NonExistentKey { key: "[..]".to_string() }),
        },
        other => Err(ParseError::NonExistentKey { key: other.type_name().to_string() }),
    }
}

impl Table {
    /// Makes sure the header line ends with a newline before the first entry
    /// is appended to a previously empty table.
    pub(crate) fn prepare_for_append(&mut self) {
        let empty = self
            .container()
            .body()
            .iter()
            .all(|(_, item)| item.is_null());
        if empty && !self.container.is_parsing() && !self.trivia.trail.ends_with('\n') {
            self.trivia.trail.push('\n');
        }
    }
}

/// A read/write view over the sibling blocks of a super-table whose children
/// were declared non-contiguously. Operations route to the block that holds
/// (or should hold) the requested key.
pub struct OutOfOrderTableProxy<'a> {
    container: &'a mut Container,
    indices: Vec<usize>,
}

impl<'a> OutOfOrderTableProxy<'a> {
    fn tables(&self) -> impl Iterator<Item = &Table> {
        let body = self.container.body();
        self.indices.iter().filter_map(move |&idx| match &body[idx].1 {
            Item::Table(table) => Some(table),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.tables().map(Table::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tables().any(|table| table.contains_key(key))
    }

    /// All keys across the sibling blocks, in declaration order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for table in self.tables() {
            for key in table.container().keys() {
                keys.push(key.to_string());
            }
        }
        keys
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.tables().find_map(|table| table.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Item> {
        let slot = self.slot_for(key)?;
        match &mut self.container.body_mut()[slot].1 {
            Item::Table(table) => table.get_mut(key),
            _ => None,
        }
    }

    /// Sets `key` in the block that already holds it, or in the first block
    /// otherwise.
    pub fn set<V>(&mut self, key: &str, value: V) -> Result<(), ParseError>
        where V: Into<Item>
    {
        let slot = self.slot_for(key).unwrap_or(self.indices[0]);
        match &mut self.container.body_mut()[slot].1 {
            Item::Table(table) => {
                table.prepare_for_append();
                table.set(key, value.into())
            },
            _ => Err(ParseError::NonExistentKey { key: key.to_string() }),
        }
    }

    pub fn remove(&mut self, key: &str) -> Result<(), ParseError> {
        let slot = self
            .slot_for(key)
            .ok_or(ParseError::NonExistentKey { key: key.to_string() })?;
        match &mut self.container.body_mut()[slot].1 {
            Item::Table(table) => table.remove(key),
            _ => Err(ParseError::NonExistentKey { key: key.to_string() }),
        }
    }

    fn slot_for(&self, key: &str) -> Option<usize> {
        let body = self.container.body();
        self.indices.iter().copied().find(|&idx| match &body[idx].1 {
            Item::Table(table) => table.contains_key(key),
            _ => false,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::items::{Item, Trivia};
    use crate::key::parse_path;

    fn leaf(value: i64) -> Item {
        Item::from(value)
    }

    #[test]
    fn test_index_matches_body() {
        let mut container = Container::new();
        container.append("a", leaf(1)).unwrap();
        container.append("b", leaf(2)).unwrap();
        for (key, indices) in &container.map {
            for &idx in indices {
                assert_eq!(container.body[idx].0.as_ref(), Some(key));
            }
        }
    }

    #[test]
    fn test_append_duplicate_leaf_fails() {
        let mut container = Container::new();
        container.append("a", leaf(1)).unwrap();
        let err = container.append("a", leaf(2)).unwrap_err();
        assert_eq!(err, ParseError::KeyAlreadyPresent { key: "a".to_string() });
        // The failed append leaves the container unchanged.
        assert_eq!(container.get("a").and_then(Item::as_integer), Some(1));
    }

    #[test]
    fn test_remove_leaves_tombstone() {
        let mut container = Container::new();
        container.append("a", leaf(1)).unwrap();
        container.append("b", leaf(2)).unwrap();
        container.remove("a").unwrap();
        assert!(container.get("a").is_none());
        assert_eq!(container.body.len(), 2);
        assert!(container.body[0].1.is_null());
        // Index for b still points at the right slot.
        assert_eq!(container.get("b").and_then(Item::as_integer), Some(2));
        assert_eq!(
            container.remove("a").unwrap_err(),
            ParseError::NonExistentKey { key: "a".to_string() }
        );
    }

    #[test]
    fn test_replace_preserves_trivia() {
        let mut container = Container::new();
        let mut item = leaf(1);
        if let Some(trivia) = item.trivia_mut() {
            trivia.indent = "  ".to_string();
            trivia.comment_ws = " ".to_string();
            trivia.comment = "# ¡çô₥₥èñƭ!".to_string();
        }
        container.append("a", item).unwrap();
        container.replace("a", leaf(2)).unwrap();
        let replaced = container.get("a").unwrap();
        let trivia = replaced.trivia().unwrap();
        assert_eq!(trivia.indent, "  ");
        assert_eq!(trivia.comment, "# ¡çô₥₥èñƭ!");
        assert_eq!(replaced.as_integer(), Some(2));
    }

    #[test]
    fn test_leaves_insert_before_tables() {
        let mut container = Container::new();
        container.append("x", leaf(1)).unwrap();
        let table = Table::new(Container::new(), Trivia::default(), false);
        container.append("t", Item::Table(table)).unwrap();
        container.append("y", leaf(2)).unwrap();
        let keys: Vec<&str> = container.keys().collect();
        assert_eq!(keys, vec!["x", "y", "t"]);
    }

    #[test]
    fn test_newline_synthesized_on_append() {
        let mut container = Container::new();
        let mut first = leaf(10);
        if let Some(trivia) = first.trivia_mut() {
            trivia.trail = String::new();
        }
        container.append("foo", first).unwrap();
        container.append("bar", leaf(11)).unwrap();
        assert_eq!(container.as_string(None), "foo = 10\nbar = 11\n");
    }

    #[test]
    fn test_get_path_through_array() {
        let mut container = Container::new();
        container.append("ports", Item::from(vec![8001, 8002])).unwrap();
        let segs = parse_path("ports[1]").unwrap();
        assert_eq!(container.get_path(&segs).and_then(Item::as_integer), Some(8002));
    }

    #[test]
    fn test_add_rejects_keyed_items() {
        let mut container = Container::new();
        assert!(container.add(Item::Whitespace { s: "\n".to_string() }).is_ok());
        assert!(container.add(leaf(1)).is_err());
    }
}
