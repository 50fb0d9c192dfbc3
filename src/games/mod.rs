pub mod baldursgate3;
pub mod cyberpunk2077;
pub mod finalfantasy7remake;
pub mod stalker2;
pub mod valheim;
pub mod witcher3;

use crate::loader::GameRegistry;

/// The factory table for the built-in game modules. Every native module is
/// registered here, by hand.
pub fn builtin_registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry.register("baldursgate3", baldursgate3::create);
    registry.register("cyberpunk2077", cyberpunk2077::create);
    registry.register("finalfantasy7remake", finalfantasy7remake::create);
    registry.register("stalker2heartofchornobyl", stalker2::create);
    registry.register("valheim", valheim::create);
    registry.register("witcher3", witcher3::create);
    registry
}
