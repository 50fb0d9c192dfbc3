use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// In-memory model of a mod's directory tree.
///
/// The host hands freshly extracted mods to the mod-data checker as a tree;
/// `fix` rewrites the tree and the host materializes the result. Entries are
/// plain values, so a fix that goes wrong cannot damage anything on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub is_dir: bool,
    pub children: Vec<TreeEntry>,
}

impl TreeEntry {
    pub fn file(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_dir: false,
            children: Vec::new(),
        }
    }

    pub fn dir(name: &str, children: Vec<TreeEntry>) -> Self {
        Self {
            name: name.to_string(),
            is_dir: true,
            children,
        }
    }

    pub fn child(&self, name: &str) -> Option<&TreeEntry> {
        self.children
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut TreeEntry> {
        self.children
            .iter_mut()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// Remove and return the direct child with the given name.
    pub fn detach(&mut self, name: &str) -> Option<TreeEntry> {
        let index = self
            .children
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))?;
        Some(self.children.remove(index))
    }

    /// Directory node at `path` (segments separated by `/`), created on
    /// demand. Fails if a path segment exists as a file.
    pub fn ensure_dir(&mut self, path: &str) -> Result<&mut TreeEntry> {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if node.child(segment).is_none() {
                node.children.push(TreeEntry::dir(segment, Vec::new()));
            }
            node = node.child_mut(segment).context("tree path segment")?;
            if !node.is_dir {
                anyhow::bail!("tree path segment {:?} is a file", segment);
            }
        }
        Ok(node)
    }

    /// Move a direct child to `target`.
    ///
    /// A trailing `/` places the entry inside the target directory under its
    /// own name; without it the entry replaces whatever sits at the target
    /// path and takes the final segment as its new name.
    pub fn move_child(&mut self, name: &str, target: &str) -> Result<()> {
        let entry = self
            .detach(name)
            .with_context(|| format!("no tree entry named {name:?}"))?;

        if target.is_empty() || target == "/" {
            self.insert(entry);
            return Ok(());
        }

        if target.ends_with('/') || target.ends_with('\\') {
            let dir = self.ensure_dir(target)?;
            dir.insert(entry);
            return Ok(());
        }

        let (parent_path, new_name) = match target.rfind('/') {
            Some(split) => (&target[..split], &target[split + 1..]),
            None => ("", target),
        };
        let mut entry = entry;
        entry.name = new_name.to_string();
        let dir = self.ensure_dir(parent_path)?;
        dir.detach(new_name);
        dir.children.push(entry);
        Ok(())
    }

    /// Insert an entry, merging directories and replacing files on name
    /// collision. Directory contents merge recursively.
    pub fn insert(&mut self, entry: TreeEntry) {
        match self.child_mut(&entry.name) {
            Some(existing) if existing.is_dir && entry.is_dir => {
                for child in entry.children {
                    existing.insert(child);
                }
            }
            Some(existing) => {
                *existing = entry;
            }
            None => self.children.push(entry),
        }
    }

    /// Merge the contents of the direct child directory `name` into this
    /// node and drop the (now empty) child. Used by `unfold` rules.
    pub fn unfold_child(&mut self, name: &str) -> Result<()> {
        let child = self
            .detach(name)
            .with_context(|| format!("no tree entry named {name:?}"))?;
        anyhow::ensure!(child.is_dir, "cannot unfold file {:?}", child.name);
        for entry in child.children {
            self.insert(entry);
        }
        Ok(())
    }

    /// All file paths under this node, `/`-separated and sorted. Test and
    /// diagnostics helper.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        fn walk(node: &TreeEntry, prefix: &str, out: &mut Vec<String>) {
            for entry in &node.children {
                let path = if prefix.is_empty() {
                    entry.name.clone()
                } else {
                    format!("{prefix}/{}", entry.name)
                };
                if entry.is_dir {
                    if entry.children.is_empty() {
                        out.push(format!("{path}/"));
                    } else {
                        walk(entry, &path, out);
                    }
                } else {
                    out.push(path);
                }
            }
        }
        walk(self, "", &mut out);
        out.sort();
        out
    }
}

/// A mod tree rooted at an anonymous directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModTree {
    pub root: TreeEntry,
}

impl ModTree {
    pub fn new(children: Vec<TreeEntry>) -> Self {
        Self {
            root: TreeEntry::dir("", children),
        }
    }

    /// Snapshot an on-disk directory into a tree.
    pub fn from_dir(path: &Path) -> Result<Self> {
        Ok(Self {
            root: read_dir_entry(path, "")?,
        })
    }

    pub fn flatten(&self) -> Vec<String> {
        self.root.flatten()
    }
}

fn read_dir_entry(path: &Path, name: &str) -> Result<TreeEntry> {
    let mut children = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("read dir {path:?}"))? {
        let entry = entry.with_context(|| format!("read dir entry in {path:?}"))?;
        let entry_name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().context("entry file type")?;
        if file_type.is_dir() {
            children.push(read_dir_entry(&entry.path(), &entry_name)?);
        } else {
            children.push(TreeEntry::file(&entry_name));
        }
    }
    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(TreeEntry {
        name: name.to_string(),
        is_dir: true,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModTree {
        ModTree::new(vec![
            TreeEntry::file("foo.archive"),
            TreeEntry::dir("engine", Vec::new()),
            TreeEntry::file("readme.txt"),
        ])
    }

    #[test]
    fn move_with_trailing_slash_inserts_inside() {
        let mut tree = sample();
        tree.root
            .move_child("foo.archive", "archive/pc/mod/")
            .unwrap();
        assert_eq!(
            tree.flatten(),
            vec!["archive/pc/mod/foo.archive", "engine/", "readme.txt"]
        );
    }

    #[test]
    fn move_without_trailing_slash_replaces_target() {
        let mut tree = ModTree::new(vec![
            TreeEntry::file("mod.pak"),
            TreeEntry::dir("Paks", vec![TreeEntry::file("old.pak")]),
        ]);
        tree.root.move_child("mod.pak", "Paks/new.pak").unwrap();
        assert_eq!(tree.flatten(), vec!["Paks/new.pak", "Paks/old.pak"]);
    }

    #[test]
    fn move_to_root_keeps_name() {
        let mut tree = ModTree::new(vec![TreeEntry::dir(
            "sub",
            vec![TreeEntry::file("a.pak")],
        )]);
        tree.root.move_child("sub", "/").unwrap();
        assert_eq!(tree.flatten(), vec!["sub/a.pak"]);
    }

    #[test]
    fn unfold_merges_children_into_parent() {
        let mut tree = ModTree::new(vec![
            TreeEntry::dir(
                "BepInExPack_Valheim",
                vec![TreeEntry::dir("BepInEx", vec![TreeEntry::file("core.dll")])],
            ),
            TreeEntry::dir("BepInEx", vec![TreeEntry::file("doorstop.ini")]),
        ]);
        tree.root.unfold_child("BepInExPack_Valheim").unwrap();
        assert_eq!(
            tree.flatten(),
            vec!["BepInEx/core.dll", "BepInEx/doorstop.ini"]
        );
    }

    #[test]
    fn unfold_refuses_files() {
        let mut tree = ModTree::new(vec![TreeEntry::file("foo.txt")]);
        assert!(tree.root.unfold_child("foo.txt").is_err());
    }

    #[test]
    fn from_dir_round_trip(){
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("engine/sub")).unwrap();
        fs::write(dir.path().join("foo.archive"), b"x").unwrap();
        fs::write(dir.path().join("engine/sub/a.ini"), b"x").unwrap();
        let tree = ModTree::from_dir(dir.path()).unwrap();
        assert_eq!(tree.flatten(), vec!["engine/sub/a.ini", "foo.archive"]);
    }
}
