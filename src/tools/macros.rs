//! Shared Macros

/// Deduplicate a collection while preserving order.
#[macro_export]
macro_rules! dedupe {
    ($list:expr) => {{
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();
        for item in $list {
            if seen.insert(item.clone()) {
                result.push(item);
            }
        }
        result
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let out = crate::dedupe!(vec!["b", "a", "b", "c", "a"]);
        assert_eq!(out, vec!["b", "a", "c"]);
    }
}
