use std::slice::Iter as SliceIter;

/// Partial order used by `ParetoFront`. `dominates` must be reflexive :
/// an element dominates an equal one.
pub trait Dominance {
    fn dominates(&self, other: &Self) -> bool;
}

/// A set of mutually non-dominated elements.
pub struct ParetoFront<Id, Criteria> {
    elements: Vec<(Id, Criteria)>,
}

impl<Id, Criteria: Dominance> ParetoFront<Id, Criteria> {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn dominates(&self, criteria: &Criteria) -> bool {
        self.elements
            .iter()
            .any(|(_, old_criteria)| old_criteria.dominates(criteria))
    }

    pub fn remove_elements_dominated_by(&mut self, criteria: &Criteria) {
        self.elements
            .retain(|(_, old_criteria)| !criteria.dominates(old_criteria));
    }

    /// Adds `id` unless it is dominated; removes previous elements the new
    /// one dominates. Returns whether the element was kept.
    pub fn add(&mut self, id: Id, criteria: Criteria) -> bool {
        if self.dominates(&criteria) {
            return false;
        }
        self.remove_elements_dominated_by(&criteria);
        self.elements.push((id, criteria));
        true
    }

    pub fn iter(&self) -> SliceIter<'_, (Id, Criteria)> {
        self.elements.iter()
    }

    pub fn into_elements(self) -> Vec<(Id, Criteria)> {
        self.elements
    }
}

impl<Id, Criteria: Dominance> Default for ParetoFront<Id, Criteria> {
    fn default() -> Self {
        Self::new()
    }
}
