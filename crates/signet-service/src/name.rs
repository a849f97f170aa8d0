/// Best-effort split of a free-form name into first/middle/last parts.
///
/// One token is a first name only, two are first + last, and anything longer
/// keeps the first and last tokens with everything in between joined as the
/// middle name. No attempt is made at honorifics or suffixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    pub first: String,
    pub middle: String,
    pub last: String,
}

pub fn parse_name(raw: &str) -> ParsedName {
    let parts: Vec<&str> = raw.split_whitespace().collect();

    match parts.as_slice() {
        [] => ParsedName::default(),
        [first] => ParsedName {
            first: (*first).to_string(),
            ..ParsedName::default()
        },
        [first, last] => ParsedName {
            first: (*first).to_string(),
            middle: String::new(),
            last: (*last).to_string(),
        },
        [first, middle @ .., last] => ParsedName {
            first: (*first).to_string(),
            middle: middle.join(" "),
            last: (*last).to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name() {
        assert_eq!(parse_name(""), ParsedName::default());
        assert_eq!(parse_name("   "), ParsedName::default());
    }

    #[test]
    fn single_token_is_first_name() {
        let parsed = parse_name("John");
        assert_eq!(parsed.first, "John");
        assert_eq!(parsed.middle, "");
        assert_eq!(parsed.last, "");
    }

    #[test]
    fn two_tokens_are_first_and_last() {
        let parsed = parse_name("John Doe");
        assert_eq!(parsed.first, "John");
        assert_eq!(parsed.middle, "");
        assert_eq!(parsed.last, "Doe");
    }

    #[test]
    fn three_tokens_fill_middle() {
        let parsed = parse_name("John Quincy Doe");
        assert_eq!(parsed.first, "John");
        assert_eq!(parsed.middle, "Quincy");
        assert_eq!(parsed.last, "Doe");
    }

    #[test]
    fn extra_tokens_join_the_middle() {
        let parsed = parse_name("John Jacob Jingleheimer Schmidt");
        assert_eq!(parsed.first, "John");
        assert_eq!(parsed.middle, "Jacob Jingleheimer");
        assert_eq!(parsed.last, "Schmidt");
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        let parsed = parse_name("  John   Doe ");
        assert_eq!(parsed.first, "John");
        assert_eq!(parsed.last, "Doe");
    }
}
