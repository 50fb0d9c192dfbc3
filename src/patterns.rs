use indexmap::IndexMap;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

/// Declarative file patterns for the mod-data checker.
///
/// Glob patterns match entry base names only; subfolder layout is the
/// checker's concern. Categories are checked in the order
/// `ignore -> unfold -> valid -> delete -> move`, first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobPatterns {
    /// Entries that must not influence the check result.
    pub ignore: Vec<String>,
    /// Directories whose contents are merged into the parent after the
    /// subtree validates.
    pub unfold: Vec<String>,
    /// Entries already in the right place.
    pub valid: Vec<String>,
    /// Noise to remove (readmes, icons, license files).
    pub delete: Vec<String>,
    /// Entries to relocate. A trailing `/` on the target means "insert
    /// inside", no trailing `/` means "replace". Insertion order is
    /// significant: the first matching pattern wins.
    pub move_map: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Each field of the result is the other set's field if non-empty,
    /// otherwise this set's.
    Replace,
    /// List fields concatenate; the move map is the union with the other
    /// set winning on key collision.
    Merge,
}

impl GlobPatterns {
    pub fn merge(&self, other: &GlobPatterns, mode: MergeMode) -> GlobPatterns {
        match mode {
            MergeMode::Replace => GlobPatterns {
                ignore: pick(&self.ignore, &other.ignore),
                unfold: pick(&self.unfold, &other.unfold),
                valid: pick(&self.valid, &other.valid),
                delete: pick(&self.delete, &other.delete),
                move_map: if other.move_map.is_empty() {
                    self.move_map.clone()
                } else {
                    other.move_map.clone()
                },
            },
            MergeMode::Merge => {
                let mut move_map = self.move_map.clone();
                for (pattern, target) in &other.move_map {
                    move_map.insert(pattern.clone(), target.clone());
                }
                GlobPatterns {
                    ignore: concat(&self.ignore, &other.ignore),
                    unfold: concat(&self.unfold, &other.unfold),
                    valid: concat(&self.valid, &other.valid),
                    delete: concat(&self.delete, &other.delete),
                    move_map,
                }
            }
        }
    }

    pub fn compile(&self) -> Result<PatternClassifier> {
        PatternClassifier::new(self)
    }
}

fn pick(mine: &[String], theirs: &[String]) -> Vec<String> {
    if theirs.is_empty() {
        mine.to_vec()
    } else {
        theirs.to_vec()
    }
}

fn concat(mine: &[String], theirs: &[String]) -> Vec<String> {
    mine.iter().chain(theirs).cloned().collect()
}

/// Which rule fired for an entry, including the index of the pattern inside
/// its category so rule-specific follow-ups can be selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    Ignore(usize),
    Unfold(usize),
    Valid(usize),
    Delete(usize),
    Move { index: usize, target: String },
}

/// Compiled form of a `GlobPatterns` set: one combined case-insensitive
/// regex per list category (each alternative its own capture group), and an
/// ordered `(regex, target)` list for the move rules.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    ignore: Option<GroupRegex>,
    unfold: Option<GroupRegex>,
    valid: Option<GroupRegex>,
    delete: Option<GroupRegex>,
    move_rules: Vec<(Regex, String)>,
}

impl PatternClassifier {
    pub fn new(patterns: &GlobPatterns) -> Result<Self> {
        let mut move_rules = Vec::with_capacity(patterns.move_map.len());
        for (glob, target) in &patterns.move_map {
            move_rules.push((compile_glob(glob)?, target.clone()));
        }
        Ok(Self {
            ignore: GroupRegex::from_globs(&patterns.ignore)?,
            unfold: GroupRegex::from_globs(&patterns.unfold)?,
            valid: GroupRegex::from_globs(&patterns.valid)?,
            delete: GroupRegex::from_globs(&patterns.delete)?,
            move_rules,
        })
    }

    /// Classify an entry by base name. Returns the first matching rule in
    /// category order, or `None` when nothing recognises the entry.
    pub fn classify(&self, name: &str) -> Option<RuleMatch> {
        if let Some(index) = self.ignore.as_ref().and_then(|r| r.match_index(name)) {
            return Some(RuleMatch::Ignore(index));
        }
        if let Some(index) = self.unfold.as_ref().and_then(|r| r.match_index(name)) {
            return Some(RuleMatch::Unfold(index));
        }
        if let Some(index) = self.valid.as_ref().and_then(|r| r.match_index(name)) {
            return Some(RuleMatch::Valid(index));
        }
        if let Some(index) = self.delete.as_ref().and_then(|r| r.match_index(name)) {
            return Some(RuleMatch::Delete(index));
        }
        for (index, (regex, target)) in self.move_rules.iter().enumerate() {
            if regex.is_match(name) {
                return Some(RuleMatch::Move {
                    index,
                    target: target.clone(),
                });
            }
        }
        None
    }
}

#[derive(Debug, Clone)]
struct GroupRegex {
    regex: Regex,
}

impl GroupRegex {
    fn from_globs(globs: &[String]) -> Result<Option<Self>> {
        if globs.is_empty() {
            return Ok(None);
        }
        let alternation = globs
            .iter()
            .map(|glob| format!("({})", translate_glob(glob)))
            .collect::<Vec<_>>()
            .join("|");
        let regex = RegexBuilder::new(&format!("\\A(?:{alternation})\\z"))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("compile glob set {globs:?}"))?;
        Ok(Some(Self { regex }))
    }

    /// Index of the glob that matched, recovered from the capture group.
    fn match_index(&self, name: &str) -> Option<usize> {
        let captures = self.regex.captures(name)?;
        (1..captures.len()).find(|&group| captures.get(group).is_some()).map(|g| g - 1)
    }
}

fn compile_glob(glob: &str) -> Result<Regex> {
    RegexBuilder::new(&format!("\\A{}\\z", translate_glob(glob)))
        .case_insensitive(true)
        .build()
        .with_context(|| format!("compile glob {glob:?}"))
}

/// Translate an fnmatch-style glob into a regex fragment. `*` and `?` match
/// anything except nothing is special about separators, because matching is
/// by base name only.
fn translate_glob(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                // Character class; pass through with a leading ! mapped to ^.
                let mut class = String::new();
                let mut closed = false;
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    class.push(inner);
                }
                if closed && !class.trim_start_matches('^').is_empty() {
                    out.push('[');
                    out.push_str(&class);
                    out.push(']');
                } else {
                    out.push_str(&regex::escape("["));
                    out.push_str(&regex::escape(&class.replace('^', "!")));
                    if closed {
                        out.push_str(&regex::escape("]"));
                    }
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> GlobPatterns {
        GlobPatterns {
            valid: vec!["archive".into(), "engine".into()],
            delete: vec!["*.txt".into()],
            move_map: IndexMap::from([
                ("*.archive".to_string(), "archive/pc/mod/".to_string()),
                ("*.ar?hive".to_string(), "elsewhere/".to_string()),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn categories_checked_in_order() {
        let classifier = GlobPatterns {
            ignore: vec!["*.txt".into()],
            delete: vec!["*.txt".into()],
            ..Default::default()
        }
        .compile()
        .unwrap();
        assert_eq!(classifier.classify("readme.TXT"), Some(RuleMatch::Ignore(0)));
    }

    #[test]
    fn matched_index_is_recovered() {
        let classifier = patterns().compile().unwrap();
        assert_eq!(classifier.classify("Engine"), Some(RuleMatch::Valid(1)));
        assert_eq!(classifier.classify("archive"), Some(RuleMatch::Valid(0)));
    }

    #[test]
    fn first_move_rule_wins() {
        let classifier = patterns().compile().unwrap();
        match classifier.classify("foo.archive") {
            Some(RuleMatch::Move { index, target }) => {
                assert_eq!(index, 0);
                assert_eq!(target, "archive/pc/mod/");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn unmatched_entries_fall_through() {
        let classifier = patterns().compile().unwrap();
        assert_eq!(classifier.classify("mystery.bin"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let classifier = patterns().compile().unwrap();
        assert_eq!(classifier.classify("README.txt"), Some(RuleMatch::Delete(0)));
    }

    #[test]
    fn merge_replace_identity() {
        let p = patterns();
        let empty = GlobPatterns::default();
        assert_eq!(p.merge(&empty, MergeMode::Replace), p);
        assert_eq!(empty.merge(&p, MergeMode::Replace), p);
    }

    #[test]
    fn merge_mode_concatenates_and_overrides() {
        let a = GlobPatterns {
            unfold: vec!["pack_a".into()],
            move_map: IndexMap::from([("*.pak".to_string(), "Paks/".to_string())]),
            ..Default::default()
        };
        let b = GlobPatterns {
            unfold: vec!["pack_b".into()],
            move_map: IndexMap::from([
                ("*.pak".to_string(), "Content/Paks/~mods/".to_string()),
                ("*.ucas".to_string(), "Content/Paks/~mods/".to_string()),
            ]),
            ..Default::default()
        };
        let merged = a.merge(&b, MergeMode::Merge);
        assert_eq!(merged.unfold, vec!["pack_a".to_string(), "pack_b".to_string()]);
        assert_eq!(
            merged.move_map.get("*.pak"),
            Some(&"Content/Paks/~mods/".to_string())
        );
        assert_eq!(merged.move_map.len(), 2);
    }

    #[test]
    fn glob_character_class() {
        let classifier = GlobPatterns {
            valid: vec!["save[0-9].dat".into()],
            ..Default::default()
        }
        .compile()
        .unwrap();
        assert_eq!(classifier.classify("save3.dat"), Some(RuleMatch::Valid(0)));
        assert_eq!(classifier.classify("saveX.dat"), None);
    }
}
