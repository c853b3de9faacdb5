//! Query cache and live result sets.
//!
//! A query is an `(include, exclude, any_of)` mask triple. The engine
//! interns each distinct triple once: requesting the same triple again, in
//! any construction order, yields the same handle and therefore the same
//! underlying result list.
//!
//! ## Live updates
//! Each interned triple is a standing subscription. When the world creates
//! an archetype, the store announces it here and every matching result list
//! appends it. Result lists grow monotonically in archetype creation order
//! and never shrink; archetypes that become empty stay listed and are
//! skipped at iteration time instead.
//!
//! ## Cache key
//! Triples are bucketed by a mixed hash of the three mask hashes, with the
//! absent/present distinction for `exclude` and `any_of` folded in, and
//! resolved within a bucket by full mask equality.

use std::collections::HashMap;

use crate::engine::bitset::Bitset;
use crate::engine::registry::ArchetypeRegistry;
use crate::engine::types::ArchetypeId;

/// Index of an interned query triple.
pub type QueryId = u32;

/// Copyable handle to an interned query.
///
/// Two handles compare equal iff they name the same triple, so handle
/// equality doubles as result-list identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Query {
    pub(crate) id: QueryId,
}

struct QueryEntry {
    include: Bitset,
    exclude: Option<Bitset>,
    any_of: Option<Bitset>,
    results: Vec<ArchetypeId>,
    /// Reused per iteration pass to snapshot matched archetypes without
    /// allocating.
    scratch: Vec<ArchetypeId>,
}

fn mask_matches(
    mask: &Bitset,
    include: &Bitset,
    exclude: Option<&Bitset>,
    any_of: Option<&Bitset>,
) -> bool {
    if !mask.contains(include) {
        return false;
    }
    if let Some(excluded) = exclude {
        if mask.overlaps(excluded) {
            return false;
        }
    }
    if let Some(any) = any_of {
        if !mask.overlaps(any) {
            return false;
        }
    }
    true
}

fn triple_hash(include: &Bitset, exclude: Option<&Bitset>, any_of: Option<&Bitset>) -> u32 {
    // Distinguishes a missing mask from an empty one.
    let fold = |hash: u32, part: Option<&Bitset>| {
        let piece = match part {
            Some(mask) => mask.hash() ^ 0x9e37_79b9,
            None => 0x811c_9dc5,
        };
        hash.rotate_left(5) ^ piece
    };
    let mut hash = include.hash();
    hash = fold(hash, exclude);
    hash = fold(hash, any_of);
    hash
}

/// Interns query triples and keeps their result lists current.
#[derive(Default)]
pub struct QueryEngine {
    entries: Vec<QueryEntry>,
    buckets: HashMap<u32, Vec<QueryId>>,
}

impl QueryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a triple, seeding its result list on first use.
    ///
    /// The same triple always resolves to the same handle, regardless of
    /// the order its masks were assembled in.
    pub fn get_or_insert(
        &mut self,
        include: Bitset,
        exclude: Option<Bitset>,
        any_of: Option<Bitset>,
        archetypes: &ArchetypeRegistry,
    ) -> Query {
        let hash = triple_hash(&include, exclude.as_ref(), any_of.as_ref());
        if let Some(bucket) = self.buckets.get(&hash) {
            for &id in bucket {
                let entry = &self.entries[id as usize];
                if entry.include == include
                    && entry.exclude == exclude
                    && entry.any_of == any_of
                {
                    return Query { id };
                }
            }
        }

        let results =
            archetypes.get_matching(&include, exclude.as_ref(), any_of.as_ref());
        let id = self.entries.len() as QueryId;
        self.entries.push(QueryEntry {
            include,
            exclude,
            any_of,
            results,
            scratch: Vec::new(),
        });
        self.buckets.entry(hash).or_default().push(id);
        Query { id }
    }

    /// Appends a newly created archetype to every matching result list.
    pub fn on_archetype_created(&mut self, archetype: ArchetypeId, mask: &Bitset) {
        for entry in &mut self.entries {
            if mask_matches(mask, &entry.include, entry.exclude.as_ref(), entry.any_of.as_ref()) {
                entry.results.push(archetype);
            }
        }
    }

    /// The matched archetypes of a query, in creation order. May contain
    /// transiently empty archetypes.
    pub fn results(&self, query: Query) -> &[ArchetypeId] {
        &self.entries[query.id as usize].results
    }

    /// The triple behind a query, for widening into a derived query.
    pub fn triple(&self, query: Query) -> (&Bitset, Option<&Bitset>, Option<&Bitset>) {
        let entry = &self.entries[query.id as usize];
        (&entry.include, entry.exclude.as_ref(), entry.any_of.as_ref())
    }

    /// Moves the query's scratch buffer out, filled with the current
    /// results. Return it with [`QueryEngine::restore_scratch`] after the
    /// pass.
    pub(crate) fn take_scratch(&mut self, query: Query) -> Vec<ArchetypeId> {
        let entry = &mut self.entries[query.id as usize];
        let mut scratch = std::mem::take(&mut entry.scratch);
        scratch.clear();
        scratch.extend_from_slice(&entry.results);
        scratch
    }

    /// Returns a scratch buffer taken with [`QueryEngine::take_scratch`].
    pub(crate) fn restore_scratch(&mut self, query: Query, scratch: Vec<ArchetypeId>) {
        self.entries[query.id as usize].scratch = scratch;
    }
}
