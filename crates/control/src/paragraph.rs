/// One paragraph of a control document.
///
/// Fields keep their document order and their original spelling; lookups
/// through [`get`](Self::get) ignore case and surrounding whitespace, as
/// field names are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    fields: Vec<(String, String)>,
}

impl Paragraph {
    pub(crate) fn push(&mut self, name: String, value: String) {
        self.fields.push((name, value));
    }

    /// Append a continuation line to the most recently pushed field.
    /// Returns `false` if there is no field to continue.
    pub(crate) fn continue_last(&mut self, line: &str) -> bool {
        let Some((_, value)) = self.fields.last_mut() else {
            return false;
        };
        value.push('\n');
        // A lone "." stands for an empty line inside a multi-line value.
        if line != "." {
            value.push_str(line);
        }
        true
    }

    /// Iterate `(name, value)` pairs in document order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Value of the first field called `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        self.fields.iter().find(|(field, _)| field.trim().eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Paragraph {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Paragraph;

    #[test]
    fn get_ignores_case_and_whitespace() {
        let paragraph: Paragraph = [("Package", "zlib"), ("SHA256", "00ff")].into_iter().collect();
        assert_eq!(paragraph.get("package"), Some("zlib"));
        assert_eq!(paragraph.get(" sha256 "), Some("00ff"));
        assert_eq!(paragraph.get("version"), None);
    }

    #[test]
    fn continuation_needs_a_field() {
        let mut paragraph = Paragraph::default();
        assert!(!paragraph.continue_last("orphan"));
        paragraph.push("Description".into(), "short".into());
        assert!(paragraph.continue_last("long"));
        assert!(paragraph.continue_last("."));
        assert_eq!(paragraph.get("description"), Some("short\nlong\n"));
    }
}
