use serde::{Deserialize, Serialize};

use crate::model::*;

/// Inclusive value range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Builds a range, swapping the bounds if they arrive reversed.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Smallest range holding every leaf value, `None` for no leaves.
    pub fn full_span(items: &[Item]) -> Option<Self> {
        let mut span: Option<Self> = None;
        for item in items {
            item.for_each_leaf_value(&mut |v| {
                span = Some(match span {
                    None => Self { min: v, max: v },
                    Some(s) => Self {
                        min: s.min.min(v),
                        max: s.max.max(v),
                    },
                });
            });
        }
        span
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub value_range: Option<ValueRange>,
    pub original: Vec<Item>,
    pub filtered: Vec<Item>,
}

impl FilterState {
    /// Derived from the two item sets so it can never disagree with them.
    pub fn is_filtered(&self) -> bool {
        leaf_count(&self.filtered) != leaf_count(&self.original)
    }
}

#[derive(Debug, Default)]
pub struct FilterController {
    state: FilterState,
}

impl FilterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn filtered(&self) -> &[Item] {
        &self.state.filtered
    }

    pub fn value_range(&self) -> Option<ValueRange> {
        self.state.value_range
    }

    /// Span of the unfiltered data, the bounds a range control should offer.
    pub fn full_range(&self) -> Option<ValueRange> {
        ValueRange::full_span(&self.state.original)
    }

    pub fn is_filtered(&self) -> bool {
        self.state.is_filtered()
    }

    /// Replaces the data and resets the range to its full span.
    pub fn set_data(&mut self, mut items: Vec<Item>) {
        let clamped = sanitize_items(&mut items);
        if clamped > 0 {
            tracing::warn!(clamped, "clamped negative or non-finite item values to zero");
        }
        let range = ValueRange::full_span(&items);
        self.state = FilterState {
            value_range: range,
            filtered: items.clone(),
            original: items,
        };
    }

    /// Restricts the working set to `range`. Returns whether the filtered
    /// items changed. NaN bounds are ignored.
    pub fn set_value_range(&mut self, range: ValueRange) -> bool {
        if range.min.is_nan() || range.max.is_nan() {
            tracing::warn!(?range, "ignoring value range with NaN bound");
            return false;
        }
        let range = ValueRange::new(range.min, range.max);
        let filtered = filter_items(&self.state.original, range);
        self.state.value_range = Some(range);
        if filtered == self.state.filtered {
            return false;
        }
        tracing::debug!(
            shown = leaf_count(&filtered),
            total = leaf_count(&self.state.original),
            "value range changed"
        );
        self.state.filtered = filtered;
        true
    }

    /// Drops the range restriction.
    pub fn clear_range(&mut self) -> bool {
        match self.full_range() {
            Some(range) => self.set_value_range(range),
            None => false,
        }
    }
}

/// Keeps the leaves whose value falls inside `range`; groups left without
/// leaves are dropped.
pub fn filter_items(items: &[Item], range: ValueRange) -> Vec<Item> {
    items
        .iter()
        .filter_map(|item| {
            if item.is_group() {
                let children = filter_items(&item.children, range);
                (!children.is_empty()).then(|| Item {
                    children,
                    ..item.clone()
                })
            } else {
                range.contains(item.value).then(|| item.clone())
            }
        })
        .collect()
}

fn sanitize_items(items: &mut [Item]) -> usize {
    let mut clamped = 0;
    for item in items {
        if item.is_group() {
            clamped += sanitize_items(&mut item.children);
        } else {
            let value = sanitize_value(item.value);
            if value != item.value {
                item.value = value;
                clamped += 1;
            }
        }
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<Item> {
        vec![
            Item::new("A", 50.0),
            Item::new("B", 30.0),
            Item::new("C", 20.0),
        ]
    }

    #[test]
    fn set_data_defaults_to_full_span() {
        let mut filter = FilterController::new();
        filter.set_data(abc());
        assert_eq!(filter.value_range(), Some(ValueRange::new(20.0, 50.0)));
        assert_eq!(filter.filtered(), abc().as_slice());
        assert!(!filter.is_filtered());
    }

    #[test]
    fn range_drops_out_of_range_items() {
        let mut filter = FilterController::new();
        filter.set_data(abc());
        assert!(filter.set_value_range(ValueRange::new(25.0, 100.0)));
        let names: Vec<&str> = filter.filtered().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert!(filter.is_filtered());
    }

    #[test]
    fn full_range_is_identity_and_repeat_is_stable() {
        let mut filter = FilterController::new();
        filter.set_data(abc());
        filter.set_value_range(ValueRange::new(25.0, 100.0));
        let full = filter.full_range().unwrap();
        assert!(filter.set_value_range(full));
        assert_eq!(filter.filtered(), abc().as_slice());
        let first = filter.filtered().to_vec();
        assert!(!filter.set_value_range(full));
        assert_eq!(filter.filtered(), first.as_slice());
    }

    #[test]
    fn reversed_bounds_are_swapped_and_nan_ignored() {
        let mut filter = FilterController::new();
        filter.set_data(abc());
        filter.set_value_range(ValueRange { min: 40.0, max: 10.0 });
        assert_eq!(filter.value_range(), Some(ValueRange::new(10.0, 40.0)));
        assert!(!filter.set_value_range(ValueRange { min: f64::NAN, max: 1.0 }));
        assert_eq!(filter.value_range(), Some(ValueRange::new(10.0, 40.0)));
    }

    #[test]
    fn new_data_resets_range() {
        let mut filter = FilterController::new();
        filter.set_data(abc());
        filter.set_value_range(ValueRange::new(25.0, 100.0));
        filter.set_data(vec![Item::new("Z", 7.0), Item::new("Y", -2.0)]);
        assert_eq!(filter.value_range(), Some(ValueRange::new(0.0, 7.0)));
        assert!(!filter.is_filtered());
        assert_eq!(filter.state().original[1].value, 0.0);
    }

    #[test]
    fn empty_groups_are_pruned() {
        let items = vec![
            Item::group("g", vec![Item::new("small", 1.0)]),
            Item::new("big", 10.0),
        ];
        let kept = filter_items(&items, ValueRange::new(5.0, 20.0));
        assert_eq!(kept, vec![Item::new("big", 10.0)]);
    }
}
