use std::path::PathBuf;

use anyhow::Result;

use gamesmith::stores::{Discovery, ErrorSink, StoreContext, StoreKind};
use gamesmith::{games, loader};

fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let mut args = std::env::args().skip(1);
    let mut games_dir: Option<PathBuf> = None;
    let mut list_stores = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--games-dir" | "-g" => match args.next() {
                Some(path) => games_dir = Some(PathBuf::from(path)),
                None => eprintln!("--games-dir requires a path"),
            },
            "--stores" | "-s" => list_stores = true,
            "--help" | "-h" => {
                println!("gamesmith");
                println!("  --games-dir <path>   Load declarative games from <path>");
                println!("  --stores             Print every store entry found");
                return Ok(());
            }
            other => eprintln!("unknown argument: {other}"),
        }
    }

    let ctx = StoreContext::system();
    let mut sink = ErrorSink::default();
    let discovery = Discovery::scan(&ctx, &mut sink);

    if list_stores {
        for kind in StoreKind::ALL {
            let entries = discovery.store(kind);
            println!("{kind}: {} entries", entries.len());
            for (id, path) in entries {
                println!("  {id} -> {}", path.display());
            }
        }
    }

    let mut modules = loader::load_games(&games::builtin_registry(), games_dir.as_deref());
    println!("{} game modules loaded", modules.len());
    for module in &mut modules {
        if module.detect_game(&discovery) {
            println!(
                "{}: {}",
                module.game_name(),
                module.game_path().map(|p| p.display().to_string()).unwrap_or_default()
            );
        } else {
            println!("{}: not installed", module.game_name());
        }
    }

    if !sink.is_empty() {
        eprintln!("{} store errors during discovery", sink.errors().len());
    }
    Ok(())
}
