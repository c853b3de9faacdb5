//! Archetype registry: interning, transitions, and signature matching.
//!
//! The registry owns every archetype in the world and guarantees that at
//! most one archetype exists per signature. Interning uses an FNV-1a hash
//! of the sorted component IDs into buckets, with full signature equality
//! resolving collisions inside a bucket.
//!
//! ## Component index
//! For every component ID the registry keeps the list of archetypes whose
//! signature contains it, appended in creation order and never pruned. The
//! matcher starts from the smallest such list among a query's required
//! components, which keeps matching proportional to the rarest component
//! rather than the world's archetype count.
//!
//! ## Transition edges
//! `resolve_add`/`resolve_remove` translate "this archetype plus/minus one
//! component" into a target archetype ID, caching the answer on both
//! archetypes so repeated transitions are a single map lookup. Edges are
//! bidirectional by construction: resolving `A + c = B` records `A`'s add
//! edge and `B`'s remove edge in the same step.
//!
//! Archetypes are never collected; an archetype that becomes empty stays
//! registered and keeps its place in every index and result list.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::archetype::Archetype;
use crate::engine::bitset::Bitset;
use crate::engine::component::ComponentRegistry;
use crate::engine::types::{ArchetypeId, ComponentId};

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn signature_hash(signature: &[ComponentId]) -> u32 {
    let mut hash = FNV_OFFSET;
    for &id in signature {
        for byte in id.to_le_bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Owns all archetypes, deduplicated by signature.
pub struct ArchetypeRegistry {
    archetypes: Vec<Archetype>,
    buckets: HashMap<u32, Vec<ArchetypeId>>,
    component_index: Vec<Vec<ArchetypeId>>,
}

impl ArchetypeRegistry {
    /// Creates a registry holding only the empty archetype (ID 0).
    pub fn new(components: &ComponentRegistry) -> Self {
        let mut registry = Self {
            archetypes: Vec::new(),
            buckets: HashMap::new(),
            component_index: Vec::new(),
        };
        let (id, _) = registry.get_or_create(Vec::new(), components);
        debug_assert_eq!(id, registry.empty_id());
        registry
    }

    /// Identifier of the empty archetype every entity starts in.
    #[inline]
    pub fn empty_id(&self) -> ArchetypeId {
        0
    }

    /// Number of registered archetypes.
    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns `true` if no archetype exists, which never holds after
    /// construction.
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Borrows an archetype by ID.
    #[inline]
    pub fn archetype(&self, id: ArchetypeId) -> &Archetype {
        &self.archetypes[id as usize]
    }

    /// Mutably borrows an archetype by ID.
    #[inline]
    pub fn archetype_mut(&mut self, id: ArchetypeId) -> &mut Archetype {
        &mut self.archetypes[id as usize]
    }

    /// Mutably borrows two distinct archetypes at once.
    ///
    /// Entity moves copy rows from a source into a destination archetype,
    /// which requires simultaneous mutable access to both.
    pub fn archetype_pair_mut(
        &mut self,
        a: ArchetypeId,
        b: ArchetypeId,
    ) -> (&mut Archetype, &mut Archetype) {
        assert!(a != b, "source and destination archetype must differ");
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.archetypes.split_at_mut(high as usize);
        let low_ref = &mut head[low as usize];
        let high_ref = &mut tail[0];
        if a < b { (low_ref, high_ref) } else { (high_ref, low_ref) }
    }

    /// Interns a sorted signature, creating its archetype on first use.
    ///
    /// ## Behavior
    /// Hashes the signature, then compares full signatures inside the
    /// bucket. On a miss a new archetype is allocated, filed in its bucket,
    /// and appended to the component index of every component it contains.
    ///
    /// ## Returns
    /// The archetype ID and whether this call created it. The caller is
    /// responsible for announcing creations to live query results.
    pub fn get_or_create(
        &mut self,
        signature: Vec<ComponentId>,
        components: &ComponentRegistry,
    ) -> (ArchetypeId, bool) {
        debug_assert!(signature.windows(2).all(|w| w[0] < w[1]));

        let hash = signature_hash(&signature);
        if let Some(bucket) = self.buckets.get(&hash) {
            for &id in bucket {
                if self.archetypes[id as usize].signature() == signature.as_slice() {
                    return (id, false);
                }
            }
        }

        let id = self.archetypes.len() as ArchetypeId;
        for &component in &signature {
            let index = component as usize;
            if index >= self.component_index.len() {
                self.component_index.resize(index + 1, Vec::new());
            }
            self.component_index[index].push(id);
        }
        debug!(id, signature = ?signature, "archetype created");
        self.archetypes.push(Archetype::new(id, signature, components));
        self.buckets.entry(hash).or_default().push(id);
        (id, true)
    }

    /// Resolves the archetype reached by adding `component` to `from`.
    ///
    /// ## Behavior
    /// - Returns `from` unchanged if it already contains the component.
    /// - Answers from the edge cache when the transition was resolved
    ///   before.
    /// - Otherwise interns the widened signature and caches the edge on
    ///   both endpoints: the source's add edge and the target's remove
    ///   edge.
    pub fn resolve_add(
        &mut self,
        from: ArchetypeId,
        component: ComponentId,
        components: &ComponentRegistry,
    ) -> (ArchetypeId, bool) {
        let source = &self.archetypes[from as usize];
        if source.has_component(component) {
            return (from, false);
        }
        if let Some(edge) = source.get_edge(component) {
            if let Some(target) = edge.add {
                return (target, false);
            }
        }

        let mut signature = source.signature().to_vec();
        let position = signature.partition_point(|&c| c < component);
        signature.insert(position, component);

        let (target, created) = self.get_or_create(signature, components);
        self.archetypes[from as usize].set_edge_add(component, target);
        self.archetypes[target as usize].set_edge_remove(component, from);
        (target, created)
    }

    /// Resolves the archetype reached by removing `component` from `from`.
    ///
    /// Mirror of [`ArchetypeRegistry::resolve_add`]; returns `from`
    /// unchanged if it lacks the component.
    pub fn resolve_remove(
        &mut self,
        from: ArchetypeId,
        component: ComponentId,
        components: &ComponentRegistry,
    ) -> (ArchetypeId, bool) {
        let source = &self.archetypes[from as usize];
        if !source.has_component(component) {
            return (from, false);
        }
        if let Some(edge) = source.get_edge(component) {
            if let Some(target) = edge.remove {
                return (target, false);
            }
        }

        let signature: Vec<ComponentId> = source
            .signature()
            .iter()
            .copied()
            .filter(|&c| c != component)
            .collect();

        let (target, created) = self.get_or_create(signature, components);
        self.archetypes[from as usize].set_edge_remove(component, target);
        self.archetypes[target as usize].set_edge_add(component, from);
        (target, created)
    }

    /// Collects archetypes whose signature satisfies a mask triple.
    ///
    /// ## Behavior
    /// 1. With an empty `include`, every archetype is a candidate.
    /// 2. Otherwise candidates come from the smallest component-index list
    ///    among the included components; a component that appears in no
    ///    archetype short-circuits to an empty result.
    /// 3. Candidates are kept when their signature is a superset of
    ///    `include`, disjoint from `exclude`, and intersects `any_of` when
    ///    one is given.
    ///
    /// Results are in archetype creation order.
    pub fn get_matching(
        &self,
        include: &Bitset,
        exclude: Option<&Bitset>,
        any_of: Option<&Bitset>,
    ) -> Vec<ArchetypeId> {
        let mut smallest: Option<&[ArchetypeId]> = None;
        if !include.is_empty() {
            for component in include.iter() {
                let list = self
                    .component_index
                    .get(component as usize)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);
                if list.is_empty() {
                    return Vec::new();
                }
                if smallest.map_or(true, |s| list.len() < s.len()) {
                    smallest = Some(list);
                }
            }
        }

        let matches = |archetype: &Archetype| {
            let mask = archetype.mask();
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
        };

        match smallest {
            Some(candidates) => candidates
                .iter()
                .copied()
                .filter(|&id| matches(&self.archetypes[id as usize]))
                .collect(),
            None => self
                .archetypes
                .iter()
                .filter(|a| matches(a))
                .map(|a| a.id())
                .collect(),
        }
    }
}
