//! Explicit-skill safety net.
//!
//! The model sometimes drops technologies the posting names outright. Any
//! lexicon entry that appears literally in the content is added back.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// (canonical name, match case-sensitively)
///
/// Names that are also common English words only match in their proper casing.
const LEXICON: &[(&str, bool)] = &[
    // languages
    ("Python", false),
    ("JavaScript", false),
    ("TypeScript", false),
    ("Java", false),
    ("C++", false),
    ("C#", false),
    ("Go", true),
    ("Rust", true),
    ("PHP", false),
    ("Ruby", true),
    ("Swift", true),
    ("Kotlin", false),
    ("Scala", false),
    ("SQL", false),
    // frontend
    ("React", false),
    ("Angular", false),
    ("Vue", false),
    ("HTML", false),
    ("CSS", false),
    ("jQuery", false),
    ("Bootstrap", false),
    ("Tailwind", false),
    // backend
    ("Node.js", false),
    ("Django", false),
    ("Flask", false),
    ("Spring", true),
    ("Express", true),
    ("FastAPI", false),
    ("Laravel", false),
    ("Rails", true),
    // databases
    ("PostgreSQL", false),
    ("MySQL", false),
    ("MongoDB", false),
    ("Redis", false),
    ("Elasticsearch", false),
    ("Cassandra", false),
    ("DynamoDB", false),
    // cloud and devops
    ("AWS", false),
    ("Azure", false),
    ("GCP", false),
    ("Docker", false),
    ("Kubernetes", false),
    ("Jenkins", false),
    ("Terraform", false),
    ("Ansible", false),
    // tools
    ("Git", false),
    ("Linux", false),
    ("Nginx", false),
    ("Webpack", false),
    ("Babel", false),
    ("Jest", true),
    ("Pytest", false),
    // data
    ("Pandas", false),
    ("NumPy", false),
    ("TensorFlow", false),
    ("PyTorch", false),
    ("Spark", true),
    ("Hadoop", false),
    ("Tableau", false),
    ("Power BI", false),
    // mobile
    ("iOS", false),
    ("Android", false),
    ("React Native", false),
    ("Flutter", true),
    ("Xamarin", false),
];

static PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    LEXICON
        .iter()
        .filter_map(|&(name, case_sensitive)| {
            let pattern = format!(
                r"(?:^|[^A-Za-z0-9_]){}(?:$|[^A-Za-z0-9_+#])",
                regex::escape(name)
            );
            RegexBuilder::new(&pattern)
                .case_insensitive(!case_sensitive)
                .build()
                .ok()
                .map(|re| (name, re))
        })
        .collect()
});

/// Lexicon skills named literally in `content`, in lexicon order.
pub fn explicit_skills(content: &str) -> Vec<&'static str> {
    PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(content))
        .map(|(name, _)| *name)
        .collect()
}

/// Union of model skills and lexicon hits, de-duplicated case-insensitively.
/// Model skills keep their order and spelling and come first.
pub fn merge(model_skills: Vec<String>, explicit: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    model_skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .chain(explicit.iter().map(|s| s.to_string()))
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_named_technologies() {
        let found = explicit_skills("We use React, python and PostgreSQL on AWS.");
        assert_eq!(found, vec!["Python", "React", "PostgreSQL", "AWS"]);
    }

    #[test]
    fn test_word_boundaries() {
        let found = explicit_skills("Experience with JavaScript and Reactive streams");
        assert!(found.contains(&"JavaScript"));
        assert!(!found.contains(&"Java"));
        assert!(!found.contains(&"React"));
    }

    #[test]
    fn test_symbols_in_names() {
        let found = explicit_skills("Strong C++ and C# skills, Node.js a plus");
        assert!(found.contains(&"C++"));
        assert!(found.contains(&"C#"));
        assert!(found.contains(&"Node.js"));
    }

    #[test]
    fn test_ambiguous_words_need_proper_casing() {
        let found = explicit_skills("You will go the extra mile in spring and express ideas.");
        assert!(found.is_empty());

        let found = explicit_skills("Backend services in Go with Spring Boot.");
        assert!(found.contains(&"Go"));
        assert!(found.contains(&"Spring"));
    }

    #[test]
    fn test_merge_keeps_model_order_and_dedups() {
        let merged = merge(
            vec!["react".to_string(), "REST APIs".to_string(), "react".to_string()],
            &["React", "Python"],
        );
        assert_eq!(merged, vec!["react", "REST APIs", "Python"]);
    }
}
