//! Name resolution for struct destinations.
//!
//! A [`FieldTable`] lists every JSON name a struct answers to, together with
//! the path of field indices leading to the storage. Anonymous (embedded)
//! structs are flattened breadth first: a name found at a shallower depth
//! hides deeper ones, and two untagged (or two tagged) fields sharing a name
//! at the same depth cancel each other out. Tables are built once per type
//! and shared through a process-wide cache.

use std::{
    any::TypeId,
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::Arc,
};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::{FieldKind, StructInfo};

/// One hop on the way from the root struct to a field.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub(crate) index: usize,
    /// Whether an absent embedded pointer at this hop may be allocated.
    pub(crate) settable: bool,
    pub(crate) embed_name: &'static str,
}

#[derive(Debug, Clone)]
pub(crate) struct Field {
    pub(crate) name: &'static str,
    pub(crate) path: Vec<Step>,
    pub(crate) tagged: bool,
    /// The value arrives as a JSON string holding the literal.
    pub(crate) quoted: bool,
}

impl Field {
    fn by_index(&self, other: &Field) -> Ordering {
        let a = self.path.iter().map(|s| s.index);
        let b = other.path.iter().map(|s| s.index);
        a.cmp(b)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FieldTable {
    fields: Vec<Field>,
}

struct Pending {
    info: &'static StructInfo,
    path: Vec<Step>,
}

impl FieldTable {
    pub(crate) fn build(root: &'static StructInfo) -> Self {
        let mut fields: Vec<Field> = Vec::new();
        let mut next = vec![Pending {
            info: root,
            path: Vec::new(),
        }];
        let mut next_count: HashMap<TypeId, usize> = HashMap::new();
        let mut visited: HashSet<TypeId> = HashSet::new();

        while !next.is_empty() {
            let current = std::mem::take(&mut next);
            let count = std::mem::take(&mut next_count);

            for pending in current {
                let type_id = (pending.info.type_id)();
                if !visited.insert(type_id) {
                    continue;
                }
                let repeated = count.get(&type_id).copied().unwrap_or(0) > 1;

                for (index, def) in pending.info.fields.iter().enumerate() {
                    let embedded = match def.kind {
                        FieldKind::Embedded(info) | FieldKind::EmbeddedPtr(info) => Some(info()),
                        FieldKind::Plain(_) => None,
                    };
                    if embedded.is_none() && !def.exported {
                        continue;
                    }
                    let tag = def.tag.unwrap_or("");
                    if tag == "-" {
                        continue;
                    }
                    let (mut name, options) = tag.split_once(',').unwrap_or((tag, ""));
                    if !is_valid_tag(name) {
                        name = "";
                    }

                    let mut path = pending.path.clone();
                    path.push(Step {
                        index,
                        settable: def.exported,
                        embed_name: embedded.map_or(def.ident, |info| info.name),
                    });

                    let Some(info) = embedded.filter(|_| name.is_empty()) else {
                        let quoted = options.split(',').any(|opt| opt == "string")
                            && matches!(def.kind, FieldKind::Plain(quotable) if quotable());
                        let field = Field {
                            name: if name.is_empty() { def.ident } else { name },
                            path,
                            tagged: !name.is_empty(),
                            quoted,
                        };
                        if repeated {
                            // A second copy makes the name ambiguous below.
                            fields.push(field.clone());
                        }
                        fields.push(field);
                        continue;
                    };

                    let seen = next_count.entry((info.type_id)()).or_insert(0);
                    *seen += 1;
                    if *seen == 1 {
                        next.push(Pending { info, path });
                    }
                }
            }
        }

        fields.sort_by(|a, b| {
            a.name
                .cmp(b.name)
                .then(a.path.len().cmp(&b.path.len()))
                .then(b.tagged.cmp(&a.tagged))
                .then_with(|| a.by_index(b))
        });

        let mut kept = Vec::with_capacity(fields.len());
        let mut rest = fields.as_slice();
        while let Some(first) = rest.first() {
            let run = rest.iter().take_while(|f| f.name == first.name).count();
            let (group, tail) = rest.split_at(run);
            rest = tail;
            if let Some(winner) = dominant(group) {
                kept.push(winner.clone());
            }
        }
        kept.sort_by(Field::by_index);
        Self { fields: kept }
    }

    /// Exact match first, then the first case-insensitive match in
    /// declaration order.
    pub(crate) fn lookup(&self, key: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == key)
            .or_else(|| self.fields.iter().find(|f| fold_eq(f.name, key)))
    }

    #[cfg(test)]
    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

/// The field that owns a contested name, if any. `group` is sorted by
/// depth, then tagged first.
fn dominant(group: &[Field]) -> Option<&Field> {
    match group {
        [only] => Some(only),
        [first, second, ..]
            if first.path.len() == second.path.len() && first.tagged == second.tagged =>
        {
            None
        }
        [first, ..] => Some(first),
        [] => None,
    }
}

fn is_valid_tag(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            "!#$%&()*+-./:;<=>?@[]^_{|}~ ".contains(c) || c.is_alphabetic() || c.is_numeric()
        })
}

fn fold_eq(a: &str, b: &str) -> bool {
    let mut a = a.chars();
    let mut b = b.chars();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x == y || fold(x) == fold(y) => {}
            _ => return false,
        }
    }
}

/// Simple case folding for one character: both `K` and the Kelvin sign fold
/// to `k`, both `S` and the long s to `s`.
fn fold(c: char) -> char {
    let upper = single(c.to_uppercase()).unwrap_or(c);
    single(upper.to_lowercase()).unwrap_or(upper)
}

fn single(mut it: impl Iterator<Item = char>) -> Option<char> {
    let c = it.next()?;
    it.next().is_none().then_some(c)
}

static FIELD_CACHE: Lazy<DashMap<TypeId, Arc<FieldTable>>> = Lazy::new(DashMap::new);

/// The field table of `info`, built on first use.
pub(crate) fn cached(info: &'static StructInfo) -> Arc<FieldTable> {
    let key = (info.type_id)();
    if let Some(table) = FIELD_CACHE.get(&key) {
        return Arc::clone(table.value());
    }
    let built = Arc::new(FieldTable::build(info));
    let entry = FIELD_CACHE.entry(key).or_insert_with(|| {
        tracing::debug!(target: "jsonpipe", ty = info.name, fields = built.fields.len(), "field table built");
        Arc::clone(&built)
    });
    Arc::clone(entry.value())
}

/// Forgets every cached field table.
///
/// Tables never go stale, so this only matters to tests and benchmarks that
/// measure table construction.
#[doc(hidden)]
pub fn clear_field_cache() {
    FIELD_CACHE.clear();
}
