//! # Lootbox Demo
//!
//! Runs one economy command against a local save file.
//!
//! ```bash
//! lootbox_demo status
//! lootbox_demo buy silver
//! lootbox_demo open silver
//! lootbox_demo use longdash
//! lootbox_demo expedite silver
//!
//! # Custom config
//! lootbox_demo --config lootbox.toml buy bronze
//!
//! # Verbose logs
//! RUST_LOG=lootbox_economy=debug lootbox_demo status
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use lootbox_economy::{
    bootstrap, Consumable, Currency, EconomyError, EconomyResult, FileSaveSlot, HeadstartKind,
    LootboxConfig, PowerupKind, RewardBundle, SlotPersister, Tier, TransactionCoordinator,
};

const USAGE: &str = "usage: lootbox_demo [--config <path>] <status | buy <tier> | open <tier> | use <consumable> | expedite <tier>>";

/// A parsed command line.
enum Command {
    Status,
    Buy(Tier),
    Open(Tier),
    Use(Consumable),
    Expedite(Tier),
}

fn parse_args(mut args: Vec<String>) -> EconomyResult<(Option<String>, Command)> {
    let mut config_path = None;
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            return Err(EconomyError::InvalidConfig("--config needs a path".into()));
        }
        config_path = Some(args.remove(1));
        args.remove(0);
    }

    let command = match args.as_slice() {
        [] => Command::Status,
        [cmd] if cmd == "status" => Command::Status,
        [cmd, arg] if cmd == "buy" => Command::Buy(arg.parse()?),
        [cmd, arg] if cmd == "open" => Command::Open(arg.parse()?),
        [cmd, arg] if cmd == "use" => Command::Use(arg.parse()?),
        [cmd, arg] if cmd == "expedite" => Command::Expedite(arg.parse()?),
        _ => return Err(EconomyError::InvalidTierOrKind(USAGE.to_string())),
    };
    Ok((config_path, command))
}

fn print_status(economy: &TransactionCoordinator) {
    let inventory = economy.inventory();
    println!("  Player:   {}", inventory.user_id());
    for currency in Currency::ALL {
        println!("  {currency:<9} {}", inventory.balance(currency));
    }
    println!();
    for tier in Tier::ALL {
        let remaining = economy.remaining_cooldown(tier);
        let state = if remaining.is_zero() {
            "ready".to_string()
        } else {
            format!("cooling {}m", remaining.num_minutes() + 1)
        };
        println!(
            "  {tier:<9} held {:<3} {state}",
            inventory.container_count(tier)
        );
    }
    println!();
    for kind in HeadstartKind::ALL {
        println!("  {kind:<17} {}", inventory.headstarts(kind));
    }
    for kind in PowerupKind::ALL {
        println!("  {kind:<17} {}", inventory.powerups(kind));
    }
}

fn print_bundle(bundle: &RewardBundle) {
    for (currency, amount) in &bundle.currencies {
        println!("  + {amount} {currency}");
    }
    for (kind, amount) in &bundle.headstarts {
        println!("  + {amount} {kind}");
    }
    for (kind, amount) in &bundle.powerups {
        println!("  + {amount} {kind}");
    }
}

async fn run(config_path: Option<String>, command: Command) -> EconomyResult<()> {
    let config = match config_path {
        Some(path) => LootboxConfig::load(path)?,
        None => LootboxConfig::default(),
    };

    let slot = Arc::new(FileSaveSlot::new(config.storage.save_path.clone()));
    let (inventory, source) = bootstrap(config.player.id.as_deref(), None, &*slot).await;
    tracing::info!(?source, path = %slot.path().display(), "session ready");

    let mut economy = TransactionCoordinator::with_system_clock(
        inventory,
        Arc::new(config.ads.provider()),
        config.rng.seed,
    );
    economy.subscribe(Arc::new(SlotPersister::new(slot)));
    economy.initialize();

    match command {
        Command::Status => {}
        Command::Buy(tier) => {
            if tier == Tier::Bronze {
                println!("  Watching ad...");
            }
            economy.buy_container(tier).await?;
            println!("  Bought a {tier} container");
        }
        Command::Open(tier) => {
            let bundle = economy.open_container(tier)?;
            println!("  Opened a {tier} container:");
            print_bundle(&bundle);
        }
        Command::Use(consumable) => {
            economy.use_consumable(consumable)?;
            println!("  Used {consumable}");
        }
        Command::Expedite(tier) => {
            economy.expedite_cooldown(tier)?;
            println!("  {tier} cooldown cleared");
        }
    }
    println!();
    print_status(&economy);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lootbox_economy=info".into()),
        )
        .init();

    let (config_path, command) = match parse_args(std::env::args().skip(1).collect()) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("  ✗ {e}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("  ✗ FATAL: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                      LOOTBOX ECONOMY DEMO");
    println!("═══════════════════════════════════════════════════════════════════");

    match runtime.block_on(run(config_path, command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("  ✗ {e}");
            ExitCode::FAILURE
        }
    }
}
