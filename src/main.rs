use anyhow::Context;
use clap::Parser;
use currency_lens::core::price_calculator::breakdown;
use currency_lens::core::session::is_breakdown_site;
use currency_lens::core::settings::{load_settings, save_settings};
use currency_lens::domain::model::{supported_currency, Overlay, Settings, SettingsMessage};
use currency_lens::domain::ports::{keys, SettingsStore};
use currency_lens::utils::error::{ConverterError, Result};
use currency_lens::utils::{logger, validation::Validate};
use currency_lens::{
    spawn_refresh_loop, AppConfig, CliConfig, Command, ExchangeRateApiClient, JsonFileStore,
    KeyStatus, KeyValidator, PageSession, RateCache, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;

type Cache = RateCache<ExchangeRateApiClient, JsonFileStore, SystemClock>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if matches!(cli.command, Command::Watch) {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let app = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    app.validate().context("invalid config")?;

    if let Err(e) = run(cli, app).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }

    Ok(())
}

async fn run(cli: CliConfig, app: AppConfig) -> Result<()> {
    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| PathBuf::from(&app.cache.store_path));
    let store = JsonFileStore::new(store_path);
    let provider =
        ExchangeRateApiClient::with_timeout(app.provider.base_url.clone(), app.request_timeout())?;

    let cache = Arc::new(
        RateCache::new(provider, store, SystemClock)
            .with_ttl(app.ttl())
            .with_default_api_key(app.provider.api_key.clone()),
    );
    cache.load_persisted().await;

    match cli.command.clone() {
        Command::Convert { text } => {
            cache.refresh().await;
            let session = open_session(&cache, &cli, &app).await?;
            match session.on_selection(&text) {
                Some(overlay) => println!("{}", overlay),
                None => tracing::info!("No convertible amount in selection"),
            }
        }
        Command::Cart { subtotal } => {
            cache.refresh().await;
            let session = open_session(&cache, &cli, &app).await?;
            match session.cart_total(&subtotal) {
                Some(total) => println!("{}: {}", total.label, total.value),
                None => tracing::warn!("Could not compute a cart total"),
            }
        }
        Command::Breakdown { amount, currency, vat } => {
            cache.refresh().await;
            let mut session = open_session(&cache, &cli, &app).await?;
            if let Some(code) = currency {
                session.set_target_currency(&code.to_ascii_uppercase())?;
            }
            if let Some(vat) = vat {
                session.set_vat_percent(&vat.to_string())?;
            }

            let settings = session.settings();
            let symbol = supported_currency(&settings.target_currency)
                .map(|c| c.symbol)
                .unwrap_or("");
            let details = breakdown(
                cache.as_ref(),
                amount,
                &settings.target_currency,
                settings.vat_rate,
            )
            .ok_or_else(|| ConverterError::ValidationError {
                message: format!("No rate available for {}", settings.target_currency),
            })?;

            println!(
                "{}",
                Overlay::Breakdown {
                    symbol,
                    breakdown: details
                }
            );
            println!("{}", session.vat_label());
        }
        Command::Refresh => {
            let outcome = cache.refresh().await;
            println!("{:?}", outcome);
        }
        Command::Rates => print_rates(&cache),
        Command::Configure {
            api_key,
            currency,
            vat,
        } => configure(&cache, &app, api_key, currency, vat).await?,
        Command::Watch => {
            tracing::info!("Refreshing rates every {:?}", cache.ttl());
            let handle = spawn_refresh_loop(cache.clone(), cache.ttl());
            tokio::signal::ctrl_c().await?;
            handle.abort();
            tracing::info!("Stopped");
        }
    }

    Ok(())
}

async fn open_session(
    cache: &Arc<Cache>,
    cli: &CliConfig,
    app: &AppConfig,
) -> Result<PageSession<Cache>> {
    let settings = load_settings(cache.store(), &app.default_settings()).await?;
    let breakdown_site = cli
        .url
        .as_deref()
        .map(|url| is_breakdown_site(url, &app.site.breakdown_host))
        .unwrap_or(false);
    PageSession::new(cache.clone(), settings, breakdown_site)
}

fn print_rates(cache: &Cache) {
    let (live, fetched_at) = cache.snapshot();
    if live.is_empty() {
        println!("No live rates; fallback table in use:");
        for (code, rate) in currency_lens::core::RateTable::fallback().sorted() {
            println!("{}\t{}", code, rate);
        }
        return;
    }

    let fetched = chrono::DateTime::from_timestamp_millis(fetched_at)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| fetched_at.to_string());
    println!("{} rates fetched at {}", live.len(), fetched);
    for (code, rate) in live.sorted() {
        println!("{}\t{}", code, rate);
    }
}

async fn configure(
    cache: &Cache,
    app: &AppConfig,
    api_key: Option<String>,
    currency: Option<String>,
    vat: Option<f64>,
) -> Result<()> {
    let current = load_settings(cache.store(), &app.default_settings()).await?;
    let settings = Settings {
        target_currency: currency
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or(current.target_currency),
        vat_rate: vat.map(|v| v / 100.0).unwrap_or(current.vat_rate),
    };
    settings.validate()?;

    let key_to_check = match &api_key {
        Some(key) => Some(key.trim().to_string()),
        None => match cache.store().get(keys::API_KEY).await? {
            Some(serde_json::Value::String(key)) => Some(key),
            _ => app.provider.api_key.clone(),
        },
    };

    match &key_to_check {
        Some(key) => {
            let validator = KeyValidator::new(cache.provider(), cache.store(), cache.clock());
            match validator.check(key).await {
                KeyStatus::Valid => println!("✔️ {}", KeyStatus::Valid.message()),
                KeyStatus::Invalid => {
                    return Err(ConverterError::ProviderRejected {
                        error_type: "invalid-key".to_string(),
                    })
                }
                KeyStatus::Empty => {
                    return Err(ConverterError::ValidationError {
                        message: "API key cannot be empty".to_string(),
                    })
                }
                KeyStatus::WrongLength => {
                    return Err(ConverterError::ValidationError {
                        message: KeyStatus::WrongLength.message().to_string(),
                    })
                }
            }
        }
        None => tracing::warn!("No API key configured; rates will come from the fallback table"),
    }

    let new_key = api_key.as_deref().map(str::trim);
    save_settings(cache.store(), &settings, new_key).await?;
    println!("✔️ Settings saved!");

    let message = SettingsMessage::UpdateSettings {
        target_currency: settings.target_currency,
        vat_rate: settings.vat_rate,
    };
    println!("{}", serde_json::to_string(&message)?);
    Ok(())
}
