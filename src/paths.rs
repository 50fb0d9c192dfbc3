use directories::UserDirs;
use std::path::{Path, PathBuf};

/// Values substituted into declarative attribute strings.
///
/// The game-side tokens are optional: until the host has resolved the game
/// (`_gamePath` set), `%GAME_PATH%` and `%GAME_DOCUMENTS%` expand to empty
/// strings and callers that depend on them must cope with that.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    pub documents: Option<PathBuf>,
    pub user_profile: Option<PathBuf>,
    pub game_path: Option<PathBuf>,
    pub game_documents: Option<PathBuf>,
}

impl ResolveContext {
    pub fn host_defaults() -> Self {
        Self {
            documents: documents_dir(),
            user_profile: home_dir(),
            game_path: None,
            game_documents: None,
        }
    }

    pub fn with_game_path(mut self, path: &Path) -> Self {
        if !path.as_os_str().is_empty() {
            self.game_path = Some(path.to_path_buf());
        }
        self
    }

    pub fn with_game_documents(mut self, path: &Path) -> Self {
        if !path.as_os_str().is_empty() {
            self.game_documents = Some(path.to_path_buf());
        }
        self
    }
}

/// Expand the `%TOKEN%` placeholders of a declarative attribute string.
///
/// Tokens are disjoint, so substitution order does not matter. Unknown
/// `%...%` sequences are left untouched; they may be legitimate path
/// characters on some filesystems.
pub fn resolve(value: &str, ctx: &ResolveContext) -> String {
    let mut out = value.to_string();
    for (token, path) in [
        ("%DOCUMENTS%", &ctx.documents),
        ("%USERPROFILE%", &ctx.user_profile),
        ("%GAME_PATH%", &ctx.game_path),
        ("%GAME_DOCUMENTS%", &ctx.game_documents),
    ] {
        if out.contains(token) {
            let replacement = path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            out = out.replace(token, &replacement);
        }
    }
    // Environment tokens used by declarative games and the store finders.
    for token in ["%LOCALAPPDATA%", "%PROGRAMDATA%", "%PROGRAMW6432%", "%PROGRAMFILES%"] {
        if out.contains(token) {
            let var = token.trim_matches('%');
            let replacement = std::env::var(var).unwrap_or_default();
            out = out.replace(token, &replacement);
        }
    }
    out
}

pub fn resolve_path(value: &str, ctx: &ResolveContext) -> PathBuf {
    PathBuf::from(resolve(value, ctx))
}

pub fn home_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        return Some(PathBuf::from(home));
    }
    if let Some(profile) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(profile));
    }
    UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

pub fn documents_dir() -> Option<PathBuf> {
    if let Some(dirs) = UserDirs::new() {
        if let Some(docs) = dirs.document_dir() {
            return Some(docs.to_path_buf());
        }
        return Some(dirs.home_dir().join("Documents"));
    }
    home_dir().map(|home| home.join("Documents"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ResolveContext {
        ResolveContext {
            documents: Some(PathBuf::from("/home/user/Documents")),
            user_profile: Some(PathBuf::from("/home/user")),
            game_path: Some(PathBuf::from("/games/Stalker2")),
            game_documents: Some(PathBuf::from("/home/user/Documents/Stalker2")),
        }
    }

    #[test]
    fn replaces_every_token() {
        let resolved = resolve(
            "%GAME_DOCUMENTS%/Saved|%GAME_PATH%/bin|%DOCUMENTS%|%USERPROFILE%",
            &ctx(),
        );
        assert_eq!(
            resolved,
            "/home/user/Documents/Stalker2/Saved|/games/Stalker2/bin|/home/user/Documents|/home/user"
        );
    }

    #[test]
    fn unset_game_tokens_resolve_empty() {
        let ctx = ResolveContext {
            documents: Some(PathBuf::from("/home/user/Documents")),
            user_profile: Some(PathBuf::from("/home/user")),
            game_path: None,
            game_documents: None,
        };
        assert_eq!(resolve("%GAME_PATH%/Content", &ctx), "/Content");
        assert_eq!(resolve("%GAME_DOCUMENTS%", &ctx), "");
    }

    #[test]
    fn no_tokens_left_when_sources_defined() {
        let resolved = resolve("%DOCUMENTS%/My Games/%GAME_PATH%", &ctx());
        for token in ["%DOCUMENTS%", "%USERPROFILE%", "%GAME_PATH%", "%GAME_DOCUMENTS%"] {
            assert!(!resolved.contains(token));
        }
    }

    #[test]
    fn plain_strings_pass_through() {
        assert_eq!(resolve("bin/x64/witcher3.exe", &ctx()), "bin/x64/witcher3.exe");
    }
}
