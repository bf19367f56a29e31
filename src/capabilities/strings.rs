//! `strings` capability.

#[derive(Debug, Clone, Copy, Default)]
pub struct StringsCapability;

impl StringsCapability {
    pub fn contains(&self, s: &str, substr: &str) -> bool {
        s.contains(substr)
    }

    pub fn starts_with(&self, s: &str, prefix: &str) -> bool {
        s.starts_with(prefix)
    }

    pub fn ends_with(&self, s: &str, suffix: &str) -> bool {
        s.ends_with(suffix)
    }

    /// Replace the first `n` occurrences, or all of them when `n` is negative.
    pub fn replace(&self, s: &str, from: &str, to: &str, n: i64) -> String {
        match usize::try_from(n) {
            Ok(count) => s.replacen(from, to, count),
            Err(_) => s.replace(from, to),
        }
    }

    pub fn split(&self, s: &str, sep: &str) -> Vec<String> {
        s.split(sep).map(str::to_string).collect()
    }

    pub fn trim(&self, s: &str) -> String {
        s.trim().to_string()
    }

    pub fn to_upper(&self, s: &str) -> String {
        s.to_uppercase()
    }

    pub fn to_lower(&self, s: &str) -> String {
        s.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_counts() {
        let s = StringsCapability;
        assert_eq!(s.replace("a-a-a", "a", "b", 2), "b-b-a");
        assert_eq!(s.replace("a-a-a", "a", "b", -1), "b-b-b");
        assert_eq!(s.replace("a-a-a", "a", "b", 0), "a-a-a");
    }

    #[test]
    fn split_and_case() {
        let s = StringsCapability;
        assert_eq!(s.split("a,b,,c", ","), vec!["a", "b", "", "c"]);
        assert_eq!(s.to_upper("MiXed"), "MIXED");
        assert_eq!(s.to_lower("MiXed"), "mixed");
        assert_eq!(s.trim("  x \n"), "x");
        assert!(s.starts_with("prefix-rest", "prefix"));
        assert!(s.ends_with("rest.txt", ".txt"));
        assert!(s.contains("haystack", "st"));
    }
}
