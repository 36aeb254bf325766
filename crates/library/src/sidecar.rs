/// Title and keywords read from a video's sidecar text file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sidecar {
    pub title: String,
    /// Raw keyword text after the `#`, trimmed. Empty when absent.
    pub keywords: String,
}

impl Sidecar {
    /// Keywords split on `,`, trimmed, with empty entries dropped.
    pub fn tags(&self) -> Vec<String> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parses sidecar text: everything before the first `#` is the title,
/// everything after it the keywords. Both are trimmed.
pub fn parse_sidecar(text: &str) -> Sidecar {
    let text = text.trim();
    match text.split_once('#') {
        Some((title, keywords)) => Sidecar {
            title: title.trim().to_string(),
            keywords: keywords.trim().to_string(),
        },
        None => Sidecar {
            title: text.to_string(),
            keywords: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_keywords() {
        let s = parse_sidecar("  My Clip # rust, video ,tokio \n");
        assert_eq!(s.title, "My Clip");
        assert_eq!(s.keywords, "rust, video ,tokio");
        assert_eq!(s.tags(), vec!["rust", "video", "tokio"]);
    }

    #[test]
    fn title_only() {
        let s = parse_sidecar("Just a title\n");
        assert_eq!(s.title, "Just a title");
        assert!(s.keywords.is_empty());
        assert!(s.tags().is_empty());
    }

    #[test]
    fn splits_on_first_hash_only() {
        let s = parse_sidecar("C# tips # csharp, #dotnet");
        assert_eq!(s.title, "C");
        assert_eq!(s.keywords, "tips # csharp, #dotnet");
    }

    #[test]
    fn empty_pieces_dropped() {
        let s = parse_sidecar("t # a,, ,b,");
        assert_eq!(s.tags(), vec!["a", "b"]);
    }

    #[test]
    fn empty_text() {
        let s = parse_sidecar("   ");
        assert_eq!(s, Sidecar::default());
    }
}
