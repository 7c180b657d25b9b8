//! Splits a camel-case method name into words.

/// One camel-case word of a method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// The word followed an underscore: a property path must start a new segment here.
    pub hard_break: bool,
}

impl Word {
    pub fn is(&self, keyword: &str) -> bool {
        self.text == keyword
    }

    pub fn is_number(&self) -> bool {
        !self.text.is_empty() && self.text.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Splits `name` at case changes, digit runs and underscores.
///
/// Upper-case runs stay together as acronyms, except for their last letter when a
/// lower-case letter follows (`URLName` is `URL`, `Name`).
pub fn tokenize(name: &str) -> Vec<Word> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    let mut pending_break = false;

    for (i, &c) in chars.iter().enumerate() {
        let last = current.chars().last();
        if !c.is_ascii_alphanumeric() {
            flush(&mut current, &mut pending_break, &mut words);
            pending_break = true;
            continue;
        }
        let boundary = match last {
            None => false,
            Some(prev) if c.is_ascii_digit() => !prev.is_ascii_digit(),
            Some(prev) if c.is_ascii_uppercase() => {
                prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase()
                        && chars.get(i + 1).is_some_and(|next| next.is_ascii_lowercase()))
            }
            Some(prev) => prev.is_ascii_digit(),
        };
        if boundary {
            flush(&mut current, &mut pending_break, &mut words);
        }
        current.push(c);
    }
    flush(&mut current, &mut pending_break, &mut words);
    words
}

fn flush(current: &mut String, pending_break: &mut bool, words: &mut Vec<Word>) {
    if !current.is_empty() {
        words.push(Word {
            text: std::mem::take(current),
            hard_break: *pending_break,
        });
        *pending_break = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(name: &str) -> Vec<String> {
        tokenize(name).into_iter().map(|w| w.text).collect()
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(
            texts("findDistinctByStatusAndCreatedAfter"),
            vec!["find", "Distinct", "By", "Status", "And", "Created", "After"]
        );
    }

    #[test]
    fn test_digits_and_acronyms() {
        assert_eq!(texts("findTop10ByURLName"), vec!["find", "Top", "10", "By", "URL", "Name"]);
        assert_eq!(texts("findByHTTPStatus"), vec!["find", "By", "HTTP", "Status"]);
    }

    #[test]
    fn test_underscore_marks_hard_break() {
        let words = tokenize("findByAddress_ZipCode");
        let flags: Vec<bool> = words.iter().map(|w| w.hard_break).collect();
        assert_eq!(flags, vec![false, false, false, true, false]);
        assert_eq!(words[3].text, "Zip");
    }

    #[test]
    fn test_number_word() {
        let words = tokenize("findFirst25");
        assert!(words[2].is_number());
        assert!(!words[1].is_number());
    }
}
