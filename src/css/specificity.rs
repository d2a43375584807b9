//! Specificity scoring.
//!
//! The score depends on selector text alone, so the same selector always
//! ranks the same no matter which element it matched or in which order.

use std::ops::Add;

/// Token counts of one selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Specificity {
    pub ids: u32,
    /// Class, attribute and counted pseudo-class arguments.
    pub classes: u32,
    /// Type selectors and pseudo-elements.
    pub types: u32,
}

impl Specificity {
    pub fn score(&self) -> u32 {
        self.ids * 100 + self.classes * 10 + self.types
    }

    /// Count the tokens of a selector or selector list. A list counts as its
    /// highest-scoring member.
    pub fn of(selector: &str) -> Self {
        let chars: Vec<char> = selector.chars().collect();
        split_top_level(&chars)
            .into_iter()
            .map(count)
            .max_by_key(Specificity::score)
            .unwrap_or_default()
    }
}

impl Add for Specificity {
    type Output = Specificity;

    fn add(self, other: Specificity) -> Specificity {
        Specificity {
            ids: self.ids + other.ids,
            classes: self.classes + other.classes,
            types: self.types + other.types,
        }
    }
}

/// `ids*100 + (classes+attributes)*10 + types`.
pub fn specificity(selector: &str) -> u32 {
    Specificity::of(selector).score()
}

const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Index just past the identifier starting at `i`.
fn skip_ident(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && is_ident_char(chars[i]) {
        if chars[i] == '\\' {
            i += 1;
        }
        i += 1;
    }
    i.min(chars.len())
}

/// Index of the bracket closing the one opened at `open`.
fn skip_balanced(chars: &[char], open: usize, close: char) -> usize {
    let opener = chars[open];
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
        } else if c == opener {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return i;
            }
        }
        i += 1;
    }
    chars.len()
}

fn split_top_level(chars: &[char]) -> Vec<&[char]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '(' => i = skip_balanced(chars, i, ')'),
            '[' => i = skip_balanced(chars, i, ']'),
            ',' => {
                parts.push(&chars[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&chars[start.min(chars.len())..]);
    parts
}

fn count(chars: &[char]) -> Specificity {
    let mut spec = Specificity::default();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '#' => {
                spec.ids += 1;
                i = skip_ident(chars, i + 1);
            }
            '.' => {
                spec.classes += 1;
                i = skip_ident(chars, i + 1);
            }
            '[' => {
                spec.classes += 1;
                i = skip_balanced(chars, i, ']') + 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                spec.types += 1;
                i = skip_ident(chars, i + 2);
                if chars.get(i) == Some(&'(') {
                    i = skip_balanced(chars, i, ')') + 1;
                }
            }
            ':' => {
                let name_end = skip_ident(chars, i + 1);
                let name: String = chars[i + 1..name_end].iter().collect::<String>().to_ascii_lowercase();
                i = name_end;
                if LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
                    spec.types += 1;
                }
                if chars.get(i) == Some(&'(') {
                    let close = skip_balanced(chars, i, ')');
                    if matches!(name.as_str(), "not" | "is" | "matches" | "has") {
                        let inner = &chars[i + 1..close.min(chars.len())];
                        let inner: String = inner.iter().collect();
                        spec = spec + Specificity::of(&inner);
                    }
                    i = close + 1;
                }
            }
            '"' | '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    i += 1;
                }
                i += 1;
            }
            _ if is_ident_start(c) => {
                spec.types += 1;
                i = skip_ident(chars, i);
            }
            _ => i += 1,
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula() {
        assert_eq!(specificity("#a .b .c div"), 121);
        assert_eq!(specificity("div#a.b[title].c"), 131);
        assert_eq!(specificity(""), 0);
        assert_eq!(specificity("*"), 0);
        assert_eq!(specificity("ul > li + li"), 3);
    }

    #[test]
    fn test_pseudo_classes_and_elements() {
        assert_eq!(specificity("a:hover"), 1);
        assert_eq!(specificity("p::first-line"), 2);
        assert_eq!(specificity("p:before"), 2);
        assert_eq!(specificity("li:nth-child(2n+1)"), 1);
        assert_eq!(specificity("li:not(.done)"), 11);
        assert_eq!(specificity(":is(#a, .b) p"), 101);
        assert_eq!(specificity(":where(#a, .b) p"), 1);
        assert_eq!(specificity("section:has(> img)"), 2);
    }

    #[test]
    fn test_selector_list_takes_max() {
        assert_eq!(specificity(".a, #b, p"), 100);
        assert_eq!(
            Specificity::of(".a .b"),
            Specificity {
                ids: 0,
                classes: 2,
                types: 0
            }
        );
    }

    #[test]
    fn test_attribute_values_are_not_counted() {
        assert_eq!(specificity(r##"a[href="#top.x"]"##), 11);
        assert_eq!(specificity(r#"input[type="a,b"]"#), 11);
    }
}
