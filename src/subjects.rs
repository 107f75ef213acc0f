use crate::models::{SubjectDefinition, SubjectMark};

/// Spellings recorded for the same subject across marks entry screens.
/// Entries are in normalized form; the first name of each group is canonical.
const ALIAS_GROUPS: &[&[&str]] = &[
    &["math", "maths", "mathematics"],
    &["english", "english i", "eng i"],
    &["english ii", "eng ii"],
    &["social studies", "social science"],
    &["spelling", "spellings"],
    &["rhyme", "rhymes"],
];

/// Lowercases and folds punctuation and runs of whitespace into single
/// spaces, so "English - II" and "english ii" compare equal.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn canonical_name(name: &str) -> String {
    let normalized = normalize(name);
    ALIAS_GROUPS
        .iter()
        .find(|group| group.contains(&normalized.as_str()))
        .map(|group| group[0].to_string())
        .unwrap_or(normalized)
}

pub fn same_subject(left: &str, right: &str) -> bool {
    canonical_name(left) == canonical_name(right)
}

/// First recorded mark belonging to `definition`, if any.
pub fn find_mark<'a>(
    definition: &SubjectDefinition,
    marks: &'a [SubjectMark],
) -> Option<&'a SubjectMark> {
    let wanted = canonical_name(&definition.name);
    marks
        .iter()
        .find(|mark| canonical_name(&mark.subject) == wanted)
}
