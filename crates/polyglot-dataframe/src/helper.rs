//! Helper utilities for naming
//!
//! Small naming helpers shared by the DataFrame layer and the optimizer.

use std::collections::HashSet;

/// Find a name that does not collide with any name in `taken`.
///
/// Returns `base` unchanged when it is free, otherwise appends `_2`, `_3`,
/// ... until a free name is found.
///
/// # Example
///
/// ```
/// use polyglot_dataframe::helper::find_new_name;
/// use std::collections::HashSet;
///
/// let taken = HashSet::from(["col".to_string(), "col_2".to_string()]);
/// assert_eq!(find_new_name(&taken, "col"), "col_3");
/// assert_eq!(find_new_name(&taken, "other"), "other");
/// ```
pub fn find_new_name(taken: &HashSet<String>, base: &str) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    let mut i = 2;
    loop {
        let new_name = format!("{}_{}", base, i);
        if !taken.contains(&new_name) {
            return new_name;
        }
        i += 1;
    }
}

/// Whether `name` can be rendered without quotes in any dialect
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_new_name_counts_from_two() {
        let taken = HashSet::from(["num_nulls".to_string()]);
        assert_eq!(find_new_name(&taken, "num_nulls"), "num_nulls_2");
    }

    #[test]
    fn test_is_safe_identifier() {
        assert!(is_safe_identifier("employee_id"));
        assert!(is_safe_identifier("_r1"));
        assert!(!is_safe_identifier("1abc"));
        assert!(!is_safe_identifier("sum(age)"));
        assert!(!is_safe_identifier(""));
    }
}
