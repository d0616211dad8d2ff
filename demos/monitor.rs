use comap_smart_home::{ComapClient, Config, Entity, ExchangeLogMode, Integration, Options};
use std::env;

#[tokio::main]
async fn main() -> comap_smart_home::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let log_path = args
        .iter()
        .position(|a| a == "--log")
        .and_then(|i| args.get(i + 1));

    let config = Config::from_env()?;
    let options = Options::from_env()?;

    let mut builder = ComapClient::builder(config);
    if let Some(path) = log_path {
        println!("Logging exchanges to {path}");
        builder = builder.exchange_log(ExchangeLogMode::Diffed, path);
    }
    let client = builder.build()?;

    println!("Connecting to Comap...");
    let integration = Integration::with_client(client, options).await?;
    let snapshot = integration.snapshot();
    println!(
        "Housing {} ({} zones, {} objects)",
        snapshot.housing.name,
        snapshot.zones().len(),
        snapshot.connected_objects.len()
    );

    integration.subscribe(|snapshot| {
        for zone in snapshot.zones() {
            println!(
                "[{}] {} | instruction: {} | override: {}",
                zone.title,
                zone.temperature
                    .map(|t| format!("{t:.1}\u{00b0}C"))
                    .unwrap_or_else(|| "--".to_string()),
                zone.instruction()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".to_string()),
                if zone.temporary_instruction().is_some() { "yes" } else { "no" },
            );
        }
    });

    for entity in integration.entities() {
        if let Entity::Thermostat(t) = entity {
            println!(
                "{}: mode {:?} action {:?} target {:?}",
                entity.name(),
                t.hvac_mode(),
                t.hvac_action(),
                t.target_temperature()
            );
        }
    }

    let poller = integration.spawn_polling();
    println!(
        "Polling every {}s. Ctrl-C to stop.",
        integration.options().update_interval.as_secs()
    );
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Signal error: {e}");
    }
    poller.abort();
    Ok(())
}
