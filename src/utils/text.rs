//! Word-boundary keyword matching shared by classification and feature extraction.
//!
//! Text is lowercased and split on every non-alphanumeric character, so
//! `"Phone-Case"` yields `["phone", "case"]` and the keyword `"case"` matches
//! while `"showcase"` does not. Multi-word keywords such as `"sim only"` must
//! appear as contiguous words inside a single source field.

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    fields: Vec<Vec<String>>,
}

impl TextIndex {
    pub fn new<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(tokenize)
                .filter(|tokens| !tokens.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, phrase: &str) -> bool {
        let needle = tokenize(phrase);
        if needle.is_empty() {
            return false;
        }
        self.fields.iter().any(|field| {
            field
                .windows(needle.len())
                .any(|window| window == needle.as_slice())
        })
    }

    /// First phrase of `phrases`, in the given order, that occurs in the index.
    pub fn first_match<'p>(&self, phrases: &'p [String]) -> Option<&'p str> {
        phrases
            .iter()
            .find(|phrase| self.contains(phrase))
            .map(String::as_str)
    }
}
