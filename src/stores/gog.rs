use super::{ErrorSink, Hive, StoreContext, StoreEntries};
use std::path::PathBuf;

const GOG_GAMES_KEY: &str = "Software\\Wow6432Node\\GOG.com\\Games";

/// Locate installed GOG games: every numeric subkey under the GOG games
/// registry node carries a `path` value naming the install directory.
pub fn find_games(ctx: &StoreContext, _sink: &mut ErrorSink) -> StoreEntries {
    let mut games = StoreEntries::new();
    for subkey in ctx.registry.subkeys(Hive::LocalMachine, GOG_GAMES_KEY) {
        if !subkey.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let key = format!("{GOG_GAMES_KEY}\\{subkey}");
        if let Some(path) = ctx.registry.string_value(Hive::LocalMachine, &key, "path") {
            games.insert(subkey, PathBuf::from(path));
        }
    }
    games
}
