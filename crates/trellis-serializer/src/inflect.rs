//! Name inflection for wire formats.

use heck::ToKebabCase;

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "media",
    "metadata",
    "news",
    "series",
    "sheep",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("man", "men"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    ("person", "people"),
    ("tooth", "teeth"),
    ("woman", "women"),
];

/// Converts a name to dash-separated lowercase.
///
/// ```
/// use trellis_serializer::inflect::dasherize;
///
/// assert_eq!(dasherize("publishedAt"), "published-at");
/// assert_eq!(dasherize("author_name"), "author-name");
/// assert_eq!(dasherize("title"), "title");
/// ```
#[must_use]
pub fn dasherize(name: &str) -> String {
    name.to_kebab_case()
}

/// Pluralizes the last word of a dash-separated name.
///
/// ```
/// use trellis_serializer::inflect::pluralize;
///
/// assert_eq!(pluralize("post"), "posts");
/// assert_eq!(pluralize("blog-entry"), "blog-entries");
/// assert_eq!(pluralize("person"), "people");
/// assert_eq!(pluralize("news"), "news");
/// ```
#[must_use]
pub fn pluralize(name: &str) -> String {
    let (head, word) = match name.rsplit_once('-') {
        Some((head, word)) => (Some(head), word),
        None => (None, name),
    };
    let plural = pluralize_word(word);
    match head {
        Some(head) => format!("{head}-{plural}"),
        None => plural,
    }
}

/// The JSON-API `type` for a record type tag: dasherized, then pluralized.
#[must_use]
pub fn resource_type(tag: &str) -> String {
    pluralize(&dasherize(tag))
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_ascii_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }
    if lower.ends_with("is") {
        return format!("{}es", &word[..word.len() - 2]);
    }
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before_y = stem.chars().last();
        if before_y.is_some_and(|c| !"aeiou".contains(c.to_ascii_lowercase())) {
            return format!("{stem}ies");
        }
    }
    if let Some(stem) = word.strip_suffix("fe") {
        return format!("{stem}ves");
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_rules() {
        let cases = [
            ("post", "posts"),
            ("comment", "comments"),
            ("box", "boxes"),
            ("address", "addresses"),
            ("church", "churches"),
            ("wish", "wishes"),
            ("category", "categories"),
            ("day", "days"),
            ("knife", "knives"),
            ("analysis", "analyses"),
            ("child", "children"),
            ("series", "series"),
        ];
        for (singular, plural) in cases {
            assert_eq!(pluralize(singular), plural, "pluralizing {singular}");
        }
    }

    #[test]
    fn test_pluralize_last_word_only() {
        assert_eq!(pluralize("line-item"), "line-items");
        assert_eq!(pluralize("sales-person"), "sales-people");
    }

    #[test]
    fn test_resource_type() {
        assert_eq!(resource_type("blogPost"), "blog-posts");
        assert_eq!(resource_type("comment"), "comments");
    }
}
