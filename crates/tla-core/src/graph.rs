//! Variable graph manager.
//!
//! Tracks which variables are referenced, which are displayed (and in what
//! order), and which are saved for later. Displayed and saved variables are
//! the GC roots: after every root change the reference counts are rebuilt by
//! walking `source_ids` from each root, and variables nobody reaches are
//! evicted.
//!
//! Every successful mutator bumps [`VariableGraph::version`] once and returns
//! the new value. A mutator that fails leaves the graph untouched.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::transform::Modification;
use crate::types::{Datatype, Direction, VariableCategory, VariableId};
use crate::variable::{DeriveError, Variable};

/// Errors from graph operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// The id is not in the referenced set.
    #[error("unknown variable: {id}")]
    UnknownVariable { id: VariableId },

    /// The id is referenced but not displayed.
    #[error("variable {id} is not displayed")]
    NotDisplayed { id: VariableId },

    /// A row index outside the displayed list.
    #[error("row index {index} out of range for {len} displayed variables")]
    IndexOutOfRange { index: usize, len: usize },

    /// A different variable is already referenced under this id.
    #[error("a different variable with id {id} is already referenced")]
    IdConflict { id: VariableId },

    /// Registering the variable would make it depend on itself.
    #[error("variable {id} would depend on itself")]
    Cycle { id: VariableId },

    #[error(transparent)]
    Derive(#[from] DeriveError),
}

/// A derived variable computed against the graph but not yet added to it.
///
/// Produced by [`VariableGraph::plan_derivation`]. When some sources have no
/// defined value at all, the caller decides whether to keep the plan as is,
/// or to rebuild it without them via [`DerivationPlan::excluding_empty_sources`].
#[derive(Debug, Clone)]
pub struct DerivationPlan {
    variable: Variable,
    sources: Vec<Variable>,
    empty_sources: Vec<VariableId>,
}

impl DerivationPlan {
    /// The variable that would be added.
    pub const fn variable(&self) -> &Variable {
        &self.variable
    }

    /// Sources without any defined value.
    pub fn empty_sources(&self) -> &[VariableId] {
        &self.empty_sources
    }

    pub fn has_empty_sources(&self) -> bool {
        !self.empty_sources.is_empty()
    }

    /// Rebuilds the variable from the non-empty sources only.
    pub fn excluding_empty_sources(self) -> Result<Self, GraphError> {
        if self.empty_sources.is_empty() {
            return Ok(self);
        }
        let Some(modification) = self.variable.modification().cloned() else {
            return Ok(self);
        };
        let kept: Vec<&Variable> = self
            .sources
            .iter()
            .filter(|s| !self.empty_sources.contains(&s.id))
            .collect();
        let mut variable = Variable::derived(
            self.variable.id.clone(),
            self.variable.name.clone(),
            &kept,
            modification,
        )?;
        variable.description.clone_from(&self.variable.description);
        let sources = kept.into_iter().cloned().collect();
        Ok(Self {
            variable,
            sources,
            empty_sources: Vec::new(),
        })
    }

    pub fn into_variable(self) -> Variable {
        self.variable
    }
}

/// Referenced/displayed/saved variable bookkeeping.
#[derive(Debug, Default, Clone)]
pub struct VariableGraph {
    referenced: HashMap<VariableId, Variable>,
    /// Insertion order of `referenced`.
    order: Vec<VariableId>,
    counts: HashMap<VariableId, usize>,
    displayed: Vec<VariableId>,
    saved: Vec<VariableId>,
    add_order: Vec<VariableId>,
    version: u64,
}

impl VariableGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic counter bumped once per completed mutation.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Looks a variable up; unknown ids are an error.
    pub fn variable_by_id(&self, id: &VariableId) -> Result<&Variable, GraphError> {
        self.referenced
            .get(id)
            .ok_or_else(|| GraphError::UnknownVariable { id: id.clone() })
    }

    pub fn get(&self, id: &VariableId) -> Option<&Variable> {
        self.referenced.get(id)
    }

    pub fn contains(&self, id: &VariableId) -> bool {
        self.referenced.contains_key(id)
    }

    /// Referenced variables in insertion order.
    pub fn referenced(&self) -> impl Iterator<Item = &Variable> {
        self.order.iter().filter_map(|id| self.referenced.get(id))
    }

    /// Displayed ids, top to bottom.
    pub fn displayed(&self) -> &[VariableId] {
        &self.displayed
    }

    /// Displayed variables, top to bottom.
    pub fn displayed_variables(&self) -> impl Iterator<Item = &Variable> {
        self.displayed.iter().filter_map(|id| self.referenced.get(id))
    }

    pub fn saved(&self) -> &[VariableId] {
        &self.saved
    }

    pub fn is_displayed(&self, id: &VariableId) -> bool {
        self.displayed.contains(id)
    }

    pub fn is_saved(&self, id: &VariableId) -> bool {
        self.saved.contains(id)
    }

    /// Number of roots depending on `id` (0 for unknown ids).
    pub fn reference_count(&self, id: &VariableId) -> usize {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Adds a variable to the referenced set without displaying it.
    ///
    /// Its sources must already be referenced. The variable survives only if
    /// a root comes to depend on it before the next recount.
    pub fn reference(&mut self, variable: Variable) -> Result<u64, GraphError> {
        self.check_insertable(&variable)?;
        self.insert_referenced(variable);
        Ok(self.bump())
    }

    /// Adds a variable and appends it to the displayed list.
    ///
    /// No-op (apart from the version bump) when it is already displayed.
    pub fn add_displayed(&mut self, variable: Variable) -> Result<u64, GraphError> {
        self.check_insertable(&variable)?;
        let id = variable.id.clone();
        self.insert_referenced(variable);
        if !self.displayed.contains(&id) {
            tracing::debug!(variable = %id, "displaying variable");
            self.displayed.push(id.clone());
            self.add_order.push(id);
        }
        self.recount();
        Ok(self.bump())
    }

    /// Adds `sources` to the referenced set (when absent), then displays
    /// `variable`.
    ///
    /// `sources` must be ordered so every variable comes after its own
    /// sources.
    pub fn add_displayed_with_sources(
        &mut self,
        variable: Variable,
        sources: Vec<Variable>,
    ) -> Result<u64, GraphError> {
        let known: HashSet<&VariableId> = self
            .referenced
            .keys()
            .chain(sources.iter().map(|s| &s.id))
            .collect();
        for candidate in sources.iter().chain(std::iter::once(&variable)) {
            if let Some(missing) = candidate
                .source_ids()
                .iter()
                .find(|id| **id != candidate.id && !known.contains(id))
            {
                return Err(GraphError::UnknownVariable {
                    id: missing.clone(),
                });
            }
        }
        for source in sources {
            self.insert_referenced(source);
        }
        self.add_displayed(variable)
    }

    /// Removes a variable from display and collects what nobody needs.
    pub fn remove_displayed(&mut self, id: &VariableId) -> Result<u64, GraphError> {
        let pos = self.displayed_position(id)?;
        self.displayed.remove(pos);
        self.add_order.retain(|d| d != id);
        tracing::debug!(variable = %id, "removed displayed variable");
        self.recount();
        Ok(self.bump())
    }

    /// Swaps a displayed variable for `new_variable` at the same position.
    ///
    /// A replacement with the same id overwrites the stored variable. A
    /// replacement whose id is referenced by a different variable is an
    /// [`GraphError::IdConflict`].
    pub fn replace_displayed(
        &mut self,
        old_id: &VariableId,
        new_variable: Variable,
    ) -> Result<u64, GraphError> {
        let pos = self.displayed_position(old_id)?;
        self.check_insertable(&new_variable)?;
        let new_id = new_variable.id.clone();
        if new_id == *old_id {
            self.referenced.insert(new_id.clone(), new_variable);
        } else {
            match self.referenced.get(&new_id) {
                Some(existing) if *existing != new_variable => {
                    return Err(GraphError::IdConflict { id: new_id });
                }
                Some(_) => {}
                None => self.insert_referenced(new_variable),
            }
        }

        if let Some(dup) = self
            .displayed
            .iter()
            .position(|d| *d == new_id)
            .filter(|&p| p != pos)
        {
            // The replacement was already displayed elsewhere; keep one row.
            self.displayed.remove(dup);
            let pos = if dup < pos { pos - 1 } else { pos };
            self.displayed[pos] = new_id.clone();
        } else {
            self.displayed[pos] = new_id.clone();
        }

        if let Some(slot) = self.add_order.iter().position(|d| d == old_id) {
            self.add_order[slot] = new_id.clone();
        }
        let mut seen = HashSet::new();
        self.add_order.retain(|d| seen.insert(d.clone()));

        tracing::debug!(old = %old_id, new = %new_id, "replaced displayed variable");
        self.recount();
        Ok(self.bump())
    }

    /// Keeps a variable alive regardless of display state.
    pub fn save(&mut self, id: &VariableId) -> Result<u64, GraphError> {
        if !self.referenced.contains_key(id) {
            return Err(GraphError::UnknownVariable { id: id.clone() });
        }
        if !self.saved.contains(id) {
            self.saved.push(id.clone());
        }
        self.recount();
        Ok(self.bump())
    }

    /// Drops the saved mark; unsaving an unsaved id only bumps the version.
    pub fn unsave(&mut self, id: &VariableId) -> u64 {
        self.saved.retain(|d| d != id);
        self.recount();
        self.bump()
    }

    /// Moves the rows at `indices` up or down.
    ///
    /// With `to_extreme` the selection goes to the very top/bottom, keeping
    /// its relative order. Otherwise each selected row swaps with its
    /// neighbour, unless it already touches the boundary or is blocked by a
    /// selected row that does.
    pub fn move_rows(
        &mut self,
        indices: &[usize],
        direction: Direction,
        to_extreme: bool,
    ) -> Result<u64, GraphError> {
        let len = self.displayed.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(GraphError::IndexOutOfRange { index, len });
        }
        let mut selected: Vec<usize> = indices.to_vec();
        selected.sort_unstable();
        selected.dedup();

        if to_extreme {
            let (picked, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.displayed)
                .into_iter()
                .enumerate()
                .partition(|(i, _)| selected.binary_search(i).is_ok());
            let picked = picked.into_iter().map(|(_, id)| id);
            let rest = rest.into_iter().map(|(_, id)| id);
            self.displayed = match direction {
                Direction::Up => picked.chain(rest).collect(),
                Direction::Down => rest.chain(picked).collect(),
            };
        } else {
            move_by_one(&mut self.displayed, &selected, direction);
        }
        Ok(self.bump())
    }

    /// Stable sort by display name.
    ///
    /// Names compare case-sensitively, so upper-case names sort first.
    pub fn sort_alphabetically(&mut self) -> u64 {
        self.sort_displayed_by_key(|v| v.name.clone())
    }

    /// Stable sort by datatype name.
    pub fn sort_by_datatype(&mut self) -> u64 {
        self.sort_displayed_by_key(|v| v.datatype.as_str())
    }

    /// Stable sort by the order variables were first displayed.
    pub fn sort_by_add_order(&mut self) -> u64 {
        let rank: HashMap<&VariableId, usize> = self
            .add_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        let mut displayed = self.displayed.clone();
        displayed.sort_by_key(|id| rank.get(id).copied().unwrap_or(usize::MAX));
        self.displayed = displayed;
        self.bump()
    }

    /// Stable sort by category, following `category_order`.
    ///
    /// Categories missing from `category_order` go last.
    pub fn sort_by_source(&mut self, category_order: &[VariableCategory]) -> u64 {
        self.sort_displayed_by_key(|v| {
            category_order
                .iter()
                .position(|c| *c == v.category)
                .unwrap_or(usize::MAX)
        })
    }

    /// Builds a derived variable from referenced sources without touching the
    /// graph.
    pub fn plan_derivation(
        &self,
        id: Option<VariableId>,
        name: impl Into<String>,
        source_ids: &[VariableId],
        modification: Modification,
    ) -> Result<DerivationPlan, GraphError> {
        let sources = source_ids
            .iter()
            .map(|id| self.variable_by_id(id))
            .collect::<Result<Vec<_>, _>>()?;
        let id = id.unwrap_or_else(VariableId::generate);
        if source_ids.iter().any(|s| self.depends_on(s, &id)) {
            return Err(GraphError::Cycle { id });
        }
        let variable = Variable::derived(id, name, &sources, modification)?;
        let empty_sources: Vec<VariableId> = sources
            .iter()
            .filter(|s| s.mapper.is_empty())
            .map(|s| s.id.clone())
            .collect();
        if !empty_sources.is_empty() {
            tracing::debug!(
                variable = %variable.id,
                empty = empty_sources.len(),
                "derivation has sources without values"
            );
        }
        Ok(DerivationPlan {
            variable,
            sources: sources.into_iter().cloned().collect(),
            empty_sources,
        })
    }

    /// Whether `id` is, or is derived from, a variable of `category`.
    pub fn derives_from(&self, id: &VariableId, category: VariableCategory) -> bool {
        let mut stack = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(variable) = self.referenced.get(current) else {
                continue;
            };
            if variable.category == category {
                return true;
            }
            if variable.is_derived() {
                stack.extend(variable.source_ids());
            }
        }
        false
    }

    /// Displayed variables that are, or derive from, `category`.
    pub fn related_displayed(&self, category: VariableCategory) -> Vec<&Variable> {
        self.displayed
            .iter()
            .filter(|id| self.derives_from(id, category))
            .filter_map(|id| self.referenced.get(id))
            .collect()
    }

    /// Displayed variables of one datatype.
    pub fn displayed_of_type(&self, datatype: Datatype) -> Vec<&Variable> {
        self.displayed_variables()
            .filter(|v| v.datatype == datatype)
            .collect()
    }

    /// Forgets every variable and root.
    pub fn reset(&mut self) -> u64 {
        self.referenced.clear();
        self.order.clear();
        self.counts.clear();
        self.displayed.clear();
        self.saved.clear();
        self.add_order.clear();
        self.bump()
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn displayed_position(&self, id: &VariableId) -> Result<usize, GraphError> {
        if !self.referenced.contains_key(id) {
            return Err(GraphError::UnknownVariable { id: id.clone() });
        }
        self.displayed
            .iter()
            .position(|d| d == id)
            .ok_or_else(|| GraphError::NotDisplayed { id: id.clone() })
    }

    /// Sources must be referenced, and the variable must not reach itself.
    fn check_insertable(&self, variable: &Variable) -> Result<(), GraphError> {
        if !variable.is_derived() {
            return Ok(());
        }
        for source in variable.source_ids() {
            if *source == variable.id || self.depends_on(source, &variable.id) {
                return Err(GraphError::Cycle {
                    id: variable.id.clone(),
                });
            }
            if !self.referenced.contains_key(source) {
                return Err(GraphError::UnknownVariable { id: source.clone() });
            }
        }
        Ok(())
    }

    /// Whether `from` reaches `target` through `source_ids`.
    fn depends_on(&self, from: &VariableId, target: &VariableId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(variable) = self.referenced.get(current) {
                if variable.is_derived() {
                    stack.extend(variable.source_ids());
                }
            }
        }
        false
    }

    fn insert_referenced(&mut self, variable: Variable) {
        if !self.referenced.contains_key(&variable.id) {
            self.order.push(variable.id.clone());
            self.referenced.insert(variable.id.clone(), variable);
        }
    }

    /// Rebuilds reference counts from the roots and evicts unreachable
    /// variables.
    fn recount(&mut self) {
        let mut counts: HashMap<VariableId, usize> = HashMap::new();
        let mut roots: Vec<&VariableId> = self.displayed.iter().collect();
        for saved in &self.saved {
            if !roots.contains(&saved) {
                roots.push(saved);
            }
        }

        for root in roots {
            let mut stack = vec![root];
            let mut reached = HashSet::new();
            while let Some(current) = stack.pop() {
                if !reached.insert(current) {
                    continue;
                }
                if let Some(variable) = self.referenced.get(current) {
                    if variable.is_derived() {
                        stack.extend(variable.source_ids());
                    }
                }
            }
            for id in reached {
                *counts.entry(id.clone()).or_insert(0) += 1;
            }
        }

        let before = self.referenced.len();
        self.referenced.retain(|id, _| counts.contains_key(id));
        self.order.retain(|id| counts.contains_key(id));
        self.saved.retain(|id| counts.contains_key(id));
        let evicted = before - self.referenced.len();
        if evicted > 0 {
            tracing::debug!(evicted, "collected unreferenced variables");
        }
        self.counts = counts;
    }

    fn sort_displayed_by_key<K: Ord>(&mut self, key: impl Fn(&Variable) -> K) -> u64 {
        let mut keyed: Vec<(K, VariableId)> = self
            .displayed
            .iter()
            .map(|id| {
                let variable = &self.referenced[id];
                (key(variable), id.clone())
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        self.displayed = keyed.into_iter().map(|(_, id)| id).collect();
        self.bump()
    }
}

/// Shifts each selected row one step, pairwise swapping with neighbours.
///
/// Rows are processed starting from the boundary being moved toward, so a
/// selected row pinned there also pins the selected rows behind it.
fn move_by_one<T>(rows: &mut [T], selected: &[usize], direction: Direction) {
    let len = rows.len();
    let mut pinned = vec![false; len];
    let order: Vec<usize> = match direction {
        Direction::Up => selected.to_vec(),
        Direction::Down => selected.iter().rev().copied().collect(),
    };
    for index in order {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|&t| t < len),
        };
        match target {
            Some(target) if !pinned[target] => rows.swap(index, target),
            _ => pinned[index] = true,
        }
    }
}
