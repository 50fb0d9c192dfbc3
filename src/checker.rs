use crate::patterns::{GlobPatterns, PatternClassifier, RuleMatch};
use crate::tree::{ModTree, TreeEntry};
use anyhow::Result;

/// Outcome of a mod layout check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// The layout does not match the game and cannot be repaired.
    Invalid,
    /// The layout is already what the game expects.
    Valid,
    /// The layout is wrong but `fix` can rewrite it into a valid one.
    Fixable,
}

/// Game feature deciding whether a freshly extracted mod's directory layout
/// matches what the game needs, and repairing it when it can.
pub trait ModDataChecker: Send + Sync {
    fn data_looks_valid(&self, tree: &ModTree) -> CheckResult;

    /// Rewrite a `Fixable` tree into one that checks `Valid`. Must be
    /// idempotent: fixing an already-fixed tree is a no-op.
    fn fix(&self, tree: ModTree) -> Result<ModTree>;
}

/// Pattern-driven checker: classifies one level of children at a time and
/// folds rule hits into a single status.
pub struct BasicModDataChecker {
    patterns: GlobPatterns,
    classifier: PatternClassifier,
}

impl BasicModDataChecker {
    pub fn new(patterns: GlobPatterns) -> Result<Self> {
        let classifier = patterns.compile()?;
        Ok(Self {
            patterns,
            classifier,
        })
    }

    pub fn patterns(&self) -> &GlobPatterns {
        &self.patterns
    }

    fn check_node(&self, node: &TreeEntry) -> CheckResult {
        let mut status = CheckResult::Invalid;
        for entry in &node.children {
            match self.classifier.classify(&entry.name) {
                Some(RuleMatch::Ignore(_)) => {}
                Some(RuleMatch::Unfold(_)) => {
                    if !entry.is_dir {
                        return CheckResult::Invalid;
                    }
                    status = self.check_node(entry);
                }
                Some(RuleMatch::Valid(_)) => {
                    if status == CheckResult::Invalid {
                        status = CheckResult::Valid;
                    }
                }
                Some(RuleMatch::Delete(_)) | Some(RuleMatch::Move { .. }) => {
                    status = CheckResult::Fixable;
                }
                None => return CheckResult::Invalid,
            }
        }
        status
    }

    fn fix_node(&self, node: &mut TreeEntry) -> Result<()> {
        let names: Vec<String> = node.children.iter().map(|e| e.name.clone()).collect();
        for name in names {
            // A previous unfold or move may have consumed the entry.
            let Some(entry) = node.child(&name) else {
                continue;
            };
            let is_dir = entry.is_dir;
            match self.classifier.classify(&name) {
                Some(RuleMatch::Ignore(_)) | Some(RuleMatch::Valid(_)) | None => {}
                Some(RuleMatch::Unfold(_)) if is_dir => {
                    if let Some(mut child) = node.detach(&name) {
                        self.fix_node(&mut child)?;
                        for fixed in child.children {
                            node.insert(fixed);
                        }
                    }
                }
                Some(RuleMatch::Unfold(_)) => {}
                Some(RuleMatch::Delete(_)) => {
                    node.detach(&name);
                }
                Some(RuleMatch::Move { target, .. }) => {
                    node.move_child(&name, &target)?;
                }
            }
        }
        Ok(())
    }
}

impl ModDataChecker for BasicModDataChecker {
    fn data_looks_valid(&self, tree: &ModTree) -> CheckResult {
        self.check_node(&tree.root)
    }

    fn fix(&self, tree: ModTree) -> Result<ModTree> {
        let mut tree = tree;
        self.fix_node(&mut tree.root)?;
        Ok(tree)
    }
}

type FixPass = Box<dyn Fn(ModTree) -> Result<ModTree> + Send + Sync>;

/// Wraps another checker and runs extra rewrite passes before and after its
/// `fix`. Games with layout quirks the pattern rules cannot express hang
/// their passes here instead of reimplementing the whole checker.
pub struct DelegatedChecker {
    inner: Box<dyn ModDataChecker>,
    prefix_fix: Option<FixPass>,
    suffix_fix: Option<FixPass>,
}

impl DelegatedChecker {
    pub fn new(inner: Box<dyn ModDataChecker>) -> Self {
        Self {
            inner,
            prefix_fix: None,
            suffix_fix: None,
        }
    }

    pub fn with_prefix_fix(
        mut self,
        pass: impl Fn(ModTree) -> Result<ModTree> + Send + Sync + 'static,
    ) -> Self {
        self.prefix_fix = Some(Box::new(pass));
        self
    }

    pub fn with_suffix_fix(
        mut self,
        pass: impl Fn(ModTree) -> Result<ModTree> + Send + Sync + 'static,
    ) -> Self {
        self.suffix_fix = Some(Box::new(pass));
        self
    }
}

impl ModDataChecker for DelegatedChecker {
    fn data_looks_valid(&self, tree: &ModTree) -> CheckResult {
        self.inner.data_looks_valid(tree)
    }

    fn fix(&self, tree: ModTree) -> Result<ModTree> {
        let tree = match &self.prefix_fix {
            Some(pass) => pass(tree)?,
            None => tree,
        };
        let tree = self.inner.fix(tree)?;
        match &self.suffix_fix {
            Some(pass) => pass(tree),
            None => Ok(tree),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn cyberpunk_patterns(delete_txt: bool) -> GlobPatterns {
        GlobPatterns {
            valid: vec!["archive".into(), "engine".into()],
            delete: if delete_txt { vec!["*.txt".into()] } else { Vec::new() },
            move_map: IndexMap::from([(
                "*.archive".to_string(),
                "archive/pc/mod/".to_string(),
            )]),
            ..Default::default()
        }
    }

    fn cyberpunk_tree() -> ModTree {
        ModTree::new(vec![
            TreeEntry::file("foo.archive"),
            TreeEntry::dir("engine", Vec::new()),
            TreeEntry::file("readme.txt"),
        ])
    }

    #[test]
    fn move_and_delete_classify_fixable() {
        let checker = BasicModDataChecker::new(cyberpunk_patterns(true)).unwrap();
        assert_eq!(checker.data_looks_valid(&cyberpunk_tree()), CheckResult::Fixable);
    }

    #[test]
    fn fix_without_delete_rule_leaves_unknown_file() {
        let checker = BasicModDataChecker::new(cyberpunk_patterns(false)).unwrap();
        let fixed = checker.fix(cyberpunk_tree()).unwrap();
        assert_eq!(
            fixed.flatten(),
            vec!["archive/pc/mod/foo.archive", "engine/", "readme.txt"]
        );
        // readme.txt still matches nothing, so the tree stays unsettled.
        assert_eq!(checker.data_looks_valid(&fixed), CheckResult::Invalid);
    }

    #[test]
    fn fix_with_delete_rule_produces_valid_tree() {
        let checker = BasicModDataChecker::new(cyberpunk_patterns(true)).unwrap();
        let fixed = checker.fix(cyberpunk_tree()).unwrap();
        assert_eq!(
            fixed.flatten(),
            vec!["archive/pc/mod/foo.archive", "engine/"]
        );
        assert_eq!(checker.data_looks_valid(&fixed), CheckResult::Valid);
    }

    #[test]
    fn fix_is_idempotent() {
        let checker = BasicModDataChecker::new(cyberpunk_patterns(true)).unwrap();
        let fixed = checker.fix(cyberpunk_tree()).unwrap();
        let fixed_again = checker.fix(fixed.clone()).unwrap();
        assert_eq!(fixed, fixed_again);
    }

    #[test]
    fn unfold_directory_uses_recursive_result() {
        let patterns = GlobPatterns {
            unfold: vec!["BepInExPack_Valheim".into()],
            valid: vec!["BepInEx".into()],
            ..Default::default()
        };
        let checker = BasicModDataChecker::new(patterns).unwrap();

        let tree = ModTree::new(vec![TreeEntry::dir(
            "BepInExPack_Valheim",
            vec![TreeEntry::dir("BepInEx", Vec::new())],
        )]);
        assert_eq!(checker.data_looks_valid(&tree), CheckResult::Valid);
    }

    #[test]
    fn unfold_matching_file_is_invalid() {
        let patterns = GlobPatterns {
            unfold: vec!["BepInExPack_Valheim".into()],
            valid: vec!["BepInEx".into()],
            ..Default::default()
        };
        let checker = BasicModDataChecker::new(patterns).unwrap();
        let tree = ModTree::new(vec![TreeEntry::file("BepInExPack_Valheim")]);
        assert_eq!(checker.data_looks_valid(&tree), CheckResult::Invalid);
    }

    #[test]
    fn unknown_entry_stops_the_walk() {
        let checker = BasicModDataChecker::new(cyberpunk_patterns(true)).unwrap();
        let tree = ModTree::new(vec![
            TreeEntry::dir("archive", Vec::new()),
            TreeEntry::file("mystery.bin"),
        ]);
        assert_eq!(checker.data_looks_valid(&tree), CheckResult::Invalid);
    }

    #[test]
    fn empty_tree_is_invalid() {
        let checker = BasicModDataChecker::new(cyberpunk_patterns(true)).unwrap();
        assert_eq!(
            checker.data_looks_valid(&ModTree::new(Vec::new())),
            CheckResult::Invalid
        );
    }

    #[test]
    fn delegated_checker_runs_passes_around_base_fix() {
        let checker = DelegatedChecker::new(Box::new(
            BasicModDataChecker::new(cyberpunk_patterns(true)).unwrap(),
        ))
        .with_suffix_fix(|mut tree| {
            tree.root.insert(TreeEntry::file("marker.bin"));
            Ok(tree)
        });
        let fixed = checker.fix(cyberpunk_tree()).unwrap();
        assert!(fixed.flatten().contains(&"marker.bin".to_string()));
        assert!(fixed
            .flatten()
            .contains(&"archive/pc/mod/foo.archive".to_string()));
    }

    #[test]
    fn fix_unfolds_nested_pack() {
        let patterns = GlobPatterns {
            unfold: vec!["BepInExPack_Valheim".into()],
            valid: vec!["BepInEx".into()],
            delete: vec!["*.md".into()],
            ..Default::default()
        };
        let checker = BasicModDataChecker::new(patterns).unwrap();
        let tree = ModTree::new(vec![TreeEntry::dir(
            "BepInExPack_Valheim",
            vec![
                TreeEntry::dir("BepInEx", vec![TreeEntry::file("core.dll")]),
                TreeEntry::file("README.md"),
            ],
        )]);
        let fixed = checker.fix(tree).unwrap();
        assert_eq!(fixed.flatten(), vec!["BepInEx/core.dll"]);
        assert_eq!(checker.data_looks_valid(&fixed), CheckResult::Valid);
    }
}
