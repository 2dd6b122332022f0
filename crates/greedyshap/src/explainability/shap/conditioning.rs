//! Interventional conditioning state.
//!
//! A [`ConditioningState`] is an immutable snapshot of which input columns
//! are pinned to the explained instance's values. Pinning is row-wise and
//! per instance: every background row sees the instance's own value in the
//! fixed columns. Snapshots only grow; [`ConditioningState::fix`] derives a
//! new one and leaves the original untouched.

/// Set of input columns pinned to the explained instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditioningState {
    /// Sorted, unique input indices.
    fixed: Vec<usize>,
}

pub(crate) static UNCONDITIONED: ConditioningState = ConditioningState { fixed: Vec::new() };

impl ConditioningState {
    /// Nothing fixed.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty()
    }

    /// Fixed input columns, ascending.
    #[inline]
    pub fn fixed_inputs(&self) -> &[usize] {
        &self.fixed
    }

    #[inline]
    pub fn is_fixed(&self, input: usize) -> bool {
        self.fixed.binary_search(&input).is_ok()
    }

    /// Derive a snapshot with `inputs` fixed in addition to the current ones.
    #[must_use]
    pub fn fix(&self, inputs: impl IntoIterator<Item = usize>) -> Self {
        let mut fixed = self.fixed.clone();
        fixed.extend(inputs);
        fixed.sort_unstable();
        fixed.dedup();
        Self { fixed }
    }

    /// Overwrite the fixed columns of `row` with the instance's values.
    #[inline]
    pub fn pin_row(&self, row: &mut [f64], instance: &[f64]) {
        for &input in &self.fixed {
            row[input] = instance[input];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_derives_new_snapshot() {
        let empty = ConditioningState::new();
        let one = empty.fix([2]);
        let two = one.fix([0, 2]);

        assert!(empty.is_empty());
        assert_eq!(one.fixed_inputs(), &[2]);
        assert_eq!(two.fixed_inputs(), &[0, 2]);
        assert!(two.is_fixed(0));
        assert!(!two.is_fixed(1));
    }

    #[test]
    fn pin_row_is_per_instance() {
        let state = ConditioningState::new().fix([1]);
        let background = [[1.0, 10.0], [2.0, 20.0]];

        for (instance, expected) in [([0.0, 7.0], 7.0), ([0.0, 9.0], 9.0)] {
            for reference in background {
                let mut row = reference;
                state.pin_row(&mut row, &instance);
                assert_eq!(row, [reference[0], expected]);
            }
        }
    }

    #[test]
    fn pin_row_overwrites_fixed_columns() {
        let state = ConditioningState::new().fix([0]);
        let mut row = [1.0, 2.0];
        state.pin_row(&mut row, &[9.0, 9.0]);
        assert_eq!(row, [9.0, 2.0]);
    }
}
