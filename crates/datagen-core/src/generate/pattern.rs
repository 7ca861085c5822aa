use rand::Rng;

/// Placeholder replaced by a random decimal digit.
pub const DIGIT_PLACEHOLDER: char = '#';

/// Expand a `#` template: `"ABC#####"` → `"ABC40917"`.
///
/// Every `#` becomes an independent uniform digit. Afterwards, if the first
/// character is `'0'` (whether drawn or literal) it is redrawn from `1..=8`.
/// Only the first character is protected.
pub fn expand_pattern(pattern: &str, rng: &mut impl Rng) -> String {
    let mut out: String = pattern
        .chars()
        .map(|c| {
            if c == DIGIT_PLACEHOLDER {
                char::from(b'0' + rng.random_range(0..10u8))
            } else {
                c
            }
        })
        .collect();

    if out.starts_with('0') {
        let lead = char::from(b'0' + rng.random_range(1..=8u8));
        out.replace_range(0..1, &lead.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use regex::Regex;

    #[test]
    fn test_expand_digits() {
        let mut rng = StdRng::seed_from_u64(42);
        let re = Regex::new(r"^TEST[0-9]{4}$").unwrap();
        for _ in 0..200 {
            assert!(re.is_match(&expand_pattern("TEST####", &mut rng)));
        }
    }

    #[test]
    fn test_no_placeholders() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(expand_pattern("", &mut rng), "");
        assert_eq!(expand_pattern("ABC", &mut rng), "ABC");
    }

    #[test]
    fn test_leading_zero_redrawn() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let out = expand_pattern("###", &mut rng);
            let first = out.chars().next().unwrap();
            assert!(('1'..='9').contains(&first), "got {}", out);
            assert_eq!(out.len(), 3);
        }
        // A literal leading zero is replaced too, and never by 9.
        for _ in 0..100 {
            let out = expand_pattern("0#", &mut rng);
            assert!(('1'..='8').contains(&out.chars().next().unwrap()));
        }
    }

    #[test]
    fn test_non_ascii_literals_preserved() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = expand_pattern("Ü-##", &mut rng);
        assert!(out.starts_with("Ü-"));
        assert_eq!(out.chars().count(), 4);
    }
}
