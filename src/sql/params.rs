//! Bound parameter values of an executed statement.
//!
//! Positions are 1-based, matching [`ParameterRef::position`](super::ast::ParameterRef).
//! A position normally holds one value; batch execution may bind several
//! values to the same position, which an `IN` list expands into one
//! placeholder per value.

use std::collections::BTreeMap;

use crate::types::Value;

/// Placeholder position → bound value(s).
pub trait ParametersHolder {
    fn parameter(&self, position: u32) -> Option<&[Value]>;
}

/// Values appended by a with-params rendering, one group per fragment.
pub type ParameterGroups = Vec<Vec<Value>>;

impl ParametersHolder for BTreeMap<u32, Vec<Value>> {
    fn parameter(&self, position: u32) -> Option<&[Value]> {
        self.get(&position).map(Vec::as_slice)
    }
}

impl<S: std::hash::BuildHasher> ParametersHolder for hashbrown::HashMap<u32, Vec<Value>, S> {
    fn parameter(&self, position: u32) -> Option<&[Value]> {
        self.get(&position).map(Vec::as_slice)
    }
}

/// One value per position, position `n` at index `n - 1`.
impl ParametersHolder for [Value] {
    fn parameter(&self, position: u32) -> Option<&[Value]> {
        let index = (position as usize).checked_sub(1)?;
        self.get(index).map(std::slice::from_ref)
    }
}

impl ParametersHolder for Vec<Value> {
    fn parameter(&self, position: u32) -> Option<&[Value]> {
        self.as_slice().parameter(position)
    }
}

impl<T: ParametersHolder + ?Sized> ParametersHolder for &T {
    fn parameter(&self, position: u32) -> Option<&[Value]> {
        (**self).parameter(position)
    }
}
