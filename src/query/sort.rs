use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Column-header sort state: choosing the active field again flips the
/// direction, choosing another field starts ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: Copy + PartialEq> SortState<F> {
    pub fn new(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn toggle(&mut self, field: F) {
        if self.field == field {
            self.direction = self.direction.toggled();
        } else {
            self.field = field;
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Case-insensitive text ordering, falling back to byte order so that the
/// result is total.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Order optional text with missing values first.
pub fn optional_cmp(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => locale_cmp(a, b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort into a new vector, leaving `items` untouched.
pub fn sorted_by<T, C>(items: &[T], direction: SortDirection, cmp: C) -> Vec<T>
where
    T: Clone,
    C: Fn(&T, &T) -> Ordering,
{
    let mut out = items.to_vec();
    out.sort_by(|a, b| direction.apply(cmp(a, b)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_direction() {
        assert_eq!(SortDirection::Ascending.toggled(), SortDirection::Descending);
        assert_eq!(SortDirection::Descending.toggled(), SortDirection::Ascending);
    }

    #[test]
    fn test_sort_state_toggle() {
        let mut state = SortState::new("id");
        state.toggle("id");
        assert_eq!(state.direction, SortDirection::Descending);
        state.toggle("id");
        assert_eq!(state.direction, SortDirection::Ascending);
        state.toggle("id");
        state.toggle("name");
        assert_eq!(state.field, "name");
        assert_eq!(state.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_locale_cmp_ignores_case() {
        let mut names = vec!["bob", "Ann", "carl", "Bea"];
        names.sort_by(|a, b| locale_cmp(a, b));
        assert_eq!(names, vec!["Ann", "Bea", "bob", "carl"]);
    }

    #[test]
    fn test_optional_cmp() {
        assert_eq!(optional_cmp(None, Some("a")), Ordering::Less);
        assert_eq!(optional_cmp(Some("b"), Some("A")), Ordering::Greater);
    }

    #[test]
    fn test_sorted_by_is_stable_and_non_destructive() {
        let items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        let asc = sorted_by(&items, SortDirection::Ascending, |a, b| a.0.cmp(&b.0));
        assert_eq!(asc, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
        let desc = sorted_by(&items, SortDirection::Descending, |a, b| a.0.cmp(&b.0));
        assert_eq!(desc, vec![(2, 'a'), (2, 'c'), (1, 'b'), (1, 'd')]);
        assert_eq!(items[0], (2, 'a'));
    }

    #[test]
    fn test_toggled_sort_reverses_distinct_keys() {
        let items = vec![5, 3, 9, 1];
        let asc = sorted_by(&items, SortDirection::Ascending, |a, b| a.cmp(b));
        let mut desc = sorted_by(&asc, SortDirection::Ascending.toggled(), |a, b| a.cmp(b));
        desc.reverse();
        assert_eq!(asc, desc);
    }
}
