/*!
  The label table maps assembly label names to addresses.

  Labels are scoped. A name with `n` leading periods is a sub-label of the most recent label
  declared with fewer than `n` periods. The sub-label keeps the periods its parent doesn't account
  for. So in

    ```text
    A:
    .B:     # A.B
    ..C:    # A.B.C
    .D:     # A.D
    ..E:    # A.D.E
    F:
    ..G:    # F..G
    ```

  the full names are as commented. A dotted label only scopes labels with more periods than itself,
  and a dotted label with nothing to attach to keeps all of its periods. The identity of a label is
  the concatenation of its scope's fragments and its own fragment, so `A.B:` and `.B:` under `A:`
  declare the same label.

  Full names are never built. Each label stores its own fragment and a link to its scope. Hashes
  are accumulated from the scope's hash, and names that collide are compared back to front by
  walking the scope chains.
*/

use std::collections::HashMap;
use std::iter::Rev;
use std::str::Bytes;

use string_cache::DefaultAtom;

use crate::error::ParseErrorKind;
use crate::word::Word;

pub type LabelId = usize;

// 64 bit FNV-1a
const HASH_SEED  : u64 = 0xcbf2_9ce4_8422_2325;
const HASH_PRIME : u64 = 0x0000_0100_0000_01b3;

fn extend_hash(seed: u64, fragment: &str) -> u64 {
  fragment.bytes().fold(seed, |hash, b| (hash ^ b as u64).wrapping_mul(HASH_PRIME))
}

#[derive(Clone, Debug)]
pub struct Label {
  /// The label's own part of its name, with the periods that separate it from its scope.
  pub fragment : DefaultAtom,
  pub scope    : Option<LabelId>,
  /// `None` until the label's declaration has been seen.
  pub address  : Option<Word>,
  hash         : u64,
}

/**
  The labels that later sub-labels can attach to, with the number of periods each was declared
  with. Depths strictly increase along the chain.
*/
#[derive(Clone, Debug, Default)]
pub struct Scope {
  chain: Vec<(usize, LabelId)>,
}

impl Scope {
  /// The label a name with `dots` leading periods attaches to, and that label's depth.
  fn parent(&self, dots: usize) -> Option<(usize, LabelId)> {
    self.chain.iter().rev().find(|(depth, _)| *depth < dots).copied()
  }

  fn enter(&mut self, dots: usize, label: LabelId) {
    while let Some(&(depth, _)) = self.chain.last() {
      match depth < dots {
        true  => break,
        false => { self.chain.pop(); }
      }
    }
    self.chain.push((dots, label));
  }

  /// The scope and stored fragment of `name` as written here.
  fn place(&self, name: &str) -> (usize, Option<LabelId>, String) {
    let local = name.trim_start_matches('.');
    let dots  = name.len() - local.len();
    match self.parent(dots) {
      Some((depth, parent)) => (dots, Some(parent), format!("{}{}", ".".repeat(dots - depth), local)),
      None                  => (dots, None, name.to_string())
    }
  }
}

/// Yields the bytes of a label's full name from last to first.
struct ScopedBytes<'t> {
  table   : &'t LabelTable,
  next    : Option<LabelId>,
  current : Rev<Bytes<'t>>,
}

impl<'t> Iterator for ScopedBytes<'t> {
  type Item = u8;

  fn next(&mut self) -> Option<u8> {
    loop {
      if let Some(b) = self.current.next() {
        return Some(b);
      }
      let table = self.table;
      let label = &table.labels[self.next?];
      self.current = label.fragment.bytes().rev();
      self.next = label.scope;
    }
  }
}

#[derive(Clone, Debug, Default)]
pub struct LabelTable {
  labels  : Vec<Label>,
  buckets : HashMap<u64, Vec<LabelId>>,
}

impl LabelTable {

  pub fn new() -> LabelTable {
    LabelTable::default()
  }

  /// An empty scope to start a pass with.
  pub fn begin() -> Scope {
    Scope::default()
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, label: LabelId) -> Option<&Label> {
    self.labels.get(label)
  }

  /// The full, dotted name of a label.
  pub fn full_name(&self, label: LabelId) -> String {
    let mut bytes: Vec<u8> = self.bytes_from(Some(label), "").collect();
    bytes.reverse();
    String::from_utf8_lossy(&bytes).into_owned()
  }

  fn bytes_from<'t>(&'t self, scope: Option<LabelId>, fragment: &'t str) -> ScopedBytes<'t> {
    ScopedBytes {
      table   : self,
      next    : scope,
      current : fragment.bytes().rev(),
    }
  }

  fn hash_of(&self, scope: Option<LabelId>, fragment: &str) -> u64 {
    let seed = scope.map_or(HASH_SEED, |s| self.labels[s].hash);
    extend_hash(seed, fragment)
  }

  /// Finds the label whose identity is `scope` followed by `fragment`.
  fn find(&self, scope: Option<LabelId>, fragment: &str) -> Option<LabelId> {
    let hash = self.hash_of(scope, fragment);
    let bucket = self.buckets.get(&hash)?;
    bucket.iter().copied().find(|&candidate| {
      self.bytes_from(Some(candidate), "").eq(self.bytes_from(scope, fragment))
    })
  }

  fn intern(&mut self, scope: Option<LabelId>, fragment: &str) -> LabelId {
    if let Some(label) = self.find(scope, fragment) {
      return label;
    }
    let hash = self.hash_of(scope, fragment);
    let id = self.labels.len();
    self.labels.push(Label {
      fragment: DefaultAtom::from(fragment),
      scope,
      address: None,
      hash
    });
    self.buckets.entry(hash).or_insert_with(Vec::new).push(id);
    id
  }

  /**
    Looks up or creates the label declared as `name` and makes it the scope for later
    sub-labels with more periods. The label's address is left untouched; see `bind`.
  */
  pub fn declare(&mut self, scope: &mut Scope, name: &str) -> LabelId {
    let (dots, parent, fragment) = scope.place(name);
    let label = self.intern(parent, &fragment);
    scope.enter(dots, label);
    label
  }

  /// Gives a declared label its address. A label may only be bound once.
  pub fn bind(&mut self, label: LabelId, address: Word) -> Result<(), ParseErrorKind> {
    let label = &mut self.labels[label];
    match label.address {
      Some(_) => Err(ParseErrorKind::DuplicateLabel),
      None    => {
        label.address = Some(address);
        Ok(())
      }
    }
  }

  /// Looks up a label referenced as `name` from within `scope`.
  pub fn reference(&self, scope: &Scope, name: &str) -> Option<LabelId> {
    let (_, parent, fragment) = scope.place(name);
    self.find(parent, &fragment)
  }

  /// The address of a label referenced from within `scope`, if it has been declared.
  pub fn address(&self, scope: &Scope, name: &str) -> Option<Word> {
    self.reference(scope, name).and_then(|label| self.labels[label].address)
  }

  /// The address of a label given by its full name, e.g. `loop.end`.
  pub fn resolve(&self, full_name: &str) -> Option<Word> {
    self.address(&LabelTable::begin(), full_name)
  }
}
