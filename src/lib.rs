//! Game-support plugin framework for mod-management hosts.
//!
//! The pieces fit together like this: [`stores::Discovery`] scans the PC
//! store installations once at startup; [`loader::load_games`] builds the
//! [`game::GameModule`]s from the explicit factory registry plus the
//! declarative `games/*.ini` files; each module binds its attribute record
//! through [`binding::GameBindings`], detects its install directory against
//! the discovery maps and exposes the host contract (executables, saves,
//! profile init, feature objects). [`rootmap`], [`loadorder`] and
//! [`lifecycle`] cover the games that need launch-time mappings, persisted
//! plugin orders and cache upkeep around a run.

pub mod binding;
pub mod checker;
pub mod features;
pub mod game;
pub mod games;
pub mod host;
pub mod ini;
pub mod lifecycle;
pub mod loader;
pub mod loadorder;
pub mod patterns;
pub mod paths;
pub mod progress;
pub mod rootmap;
pub mod saves;
pub mod stores;
pub mod tree;

pub use binding::{BindingError, GameAttributes, GameBindings, OptionsMapping};
pub use checker::{BasicModDataChecker, CheckResult, DelegatedChecker, ModDataChecker};
pub use game::{Executable, GameModule};
pub use host::{ActiveMod, Mapping, MappingContext, Profile, ProfileSettings};
pub use loader::{load_games, GameRegistry};
pub use patterns::{GlobPatterns, MergeMode};
pub use stores::{Discovery, ErrorSink, StoreContext, StoreKind};
pub use tree::{ModTree, TreeEntry};
