//! Display ordering of a calculated day.

use std::cmp::Ordering;

use crate::zman::CalculatedZman;

fn chronological(a: &CalculatedZman, b: &CalculatedZman) -> Ordering {
    a.instant
        .cmp(&b.instant)
        .then_with(|| a.category.sort_order().cmp(&b.category.sort_order()))
        .then_with(|| a.key.cmp(&b.key))
}

fn category_first(a: &CalculatedZman, b: &CalculatedZman) -> Ordering {
    a.category
        .sort_order()
        .cmp(&b.category.sort_order())
        .then_with(|| a.instant.cmp(&b.instant))
        .then_with(|| a.key.cmp(&b.key))
}

/// Sort in place. Chronological by default, ties broken by category then key;
/// with `by_category` the category sequence comes first.
pub fn sort_in_place(events: &mut [CalculatedZman], by_category: bool) {
    if by_category {
        events.sort_by(category_first);
    } else {
        events.sort_by(chronological);
    }
}

pub fn sort(mut events: Vec<CalculatedZman>, by_category: bool) -> Vec<CalculatedZman> {
    sort_in_place(&mut events, by_category);
    events
}
