//! Special parameter discovery.
//!
//! Scans a declared parameter list once and records where the page request, sort, fetch
//! plan and query context parameters sit. Everything else is bindable.

use crate::method::{ParamDecl, SpecialKind};
use serde::{Deserialize, Serialize};

/// Position of each special parameter kind, if the method declares one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpecialParameters {
    pub page: Option<usize>,
    pub sort: Option<usize>,
    pub fetch_plan: Option<usize>,
    pub context: Option<usize>,
}

impl SpecialParameters {
    pub fn get(&self, kind: SpecialKind) -> Option<usize> {
        match kind {
            SpecialKind::Page => self.page,
            SpecialKind::Sort => self.sort,
            SpecialKind::FetchPlan => self.fetch_plan,
            SpecialKind::Context => self.context,
        }
    }

    fn slot(&mut self, kind: SpecialKind) -> &mut Option<usize> {
        match kind {
            SpecialKind::Page => &mut self.page,
            SpecialKind::Sort => &mut self.sort,
            SpecialKind::FetchPlan => &mut self.fetch_plan,
            SpecialKind::Context => &mut self.context,
        }
    }

    /// Kind of the special parameter at `index`, if any.
    pub fn kind_at(&self, index: usize) -> Option<SpecialKind> {
        SpecialKind::ALL
            .into_iter()
            .find(|kind| self.get(*kind) == Some(index))
    }
}

/// A second parameter of a kind that already has a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateSpecial {
    pub kind: SpecialKind,
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterIndex {
    pub special: SpecialParameters,
    /// Indices of bindable parameters, in declaration order.
    pub bindable: Vec<usize>,
    pub duplicates: Vec<DuplicateSpecial>,
}

/// Classifies every declared parameter. The first parameter of each special kind wins
/// the slot; later ones are reported in `duplicates` and are neither special nor bindable.
pub fn resolve(params: &[ParamDecl]) -> ParameterIndex {
    let mut index = ParameterIndex::default();
    for (position, param) in params.iter().enumerate() {
        match param.ty.special_kind() {
            None => index.bindable.push(position),
            Some(kind) => {
                let slot = index.special.slot(kind);
                match *slot {
                    None => *slot = Some(position),
                    Some(first) => index.duplicates.push(DuplicateSpecial {
                        kind,
                        first,
                        second: position,
                    }),
                }
            }
        }
    }
    index
}
