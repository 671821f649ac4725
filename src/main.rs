#[macro_use]
extern crate log;

use std::path::PathBuf;

use anyhow::anyhow;
use chillhours::{
    AnyDateTime, ChillHours, ChillHoursError, ChillRange, FetchedReport, Settings,
    StartEndDateTime,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(version, about = "Count chill hours from Ambient Weather station history")]
pub struct ChillHoursCli {
    /// Configuration file, defaults to <config dir>/chillhours/config.json
    #[arg(long, global = true, env = "CHILLHOURS_CONFIG")]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub subcommand: ChillHoursCommand,
}

#[derive(Subcommand)]
pub enum ChillHoursCommand {
    ///
    /// List the devices registered to the API key
    ///
    Devices,
    ///
    /// Count chill hours between two dates (YYYY-MM-DD or RFC 3339)
    ///
    Range {
        #[arg(long)]
        start: String,
        /// Defaults to now
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        device: Option<String>,
        /// Lower chill temperature in °F, inclusive
        #[arg(long)]
        min: Option<f64>,
        /// Upper chill temperature in °F, inclusive
        #[arg(long)]
        max: Option<f64>,
    },
    ///
    /// Count chill hours over one dormant season
    ///
    Season {
        /// Year the season ends in, defaults to the latest started season
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        start_month: Option<u32>,
        #[arg(long)]
        device: Option<String>,
    },
    ///
    /// Write a configuration file with the given credentials
    ///
    InitConfig {
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        application_key: Option<String>,
        #[arg(long)]
        device: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        debug!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("reqwest", log::LevelFilter::Warn)
        .init();

    let cli = ChillHoursCli::parse();

    if let ChillHoursCommand::InitConfig {
        api_key,
        application_key,
        device,
    } = cli.subcommand
    {
        return init_config(cli.config, api_key, application_key, device).await;
    }

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path).await?.with_env_overrides(),
        None => Settings::load().await?,
    };
    let client = ChillHours::from_settings(settings)?;
    cancel_on_ctrl_c(client.cancellation_token());

    match cli.subcommand {
        ChillHoursCommand::Devices => {
            let devices = client.devices().await?;
            if devices.is_empty() {
                println!("No devices registered to this API key");
            }
            for device in devices {
                let last_reading = match (device.last_reading_at, device.last_temperature_f) {
                    (Some(at), Some(temperature)) => format!(
                        "{:.1}°F at {}",
                        temperature,
                        at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    ),
                    _ => "no readings".to_string(),
                };
                println!(
                    "{}  {}  {}  {}",
                    device.mac_address,
                    device.name.as_deref().unwrap_or("-"),
                    device.location.as_deref().unwrap_or("-"),
                    last_reading
                );
            }
            Ok(())
        }
        ChillHoursCommand::Range {
            start,
            end,
            device,
            min,
            max,
        } => {
            let start = parse_date(&start)?.start;
            let end = end.map(|end| parse_date(&end)).transpose()?.map(|end| end.end);

            let settings = client.settings();
            let range = ChillRange::new(
                min.unwrap_or(settings.chill_min_f),
                max.unwrap_or(settings.chill_max_f),
            );
            if range.min_f > range.max_f {
                return Err(anyhow!(
                    "--min {} is above --max {}",
                    range.min_f,
                    range.max_f
                ));
            }

            let result = client
                .range_report()
                .maybe_device(device.as_deref())
                .start(start)
                .maybe_end(end)
                .range(range)
                .call()
                .await?;
            println!("{}", result.report);
            print_fetch_notes(&result);
            Ok(())
        }
        ChillHoursCommand::Season {
            year,
            start_month,
            device,
        } => {
            let result = client
                .season_report()
                .maybe_device(device.as_deref())
                .maybe_year(year)
                .maybe_start_month(start_month)
                .call()
                .await?;
            println!("{}", result.report.report);
            if let Some(warning) = result.report.coverage_warning() {
                println!("Warning: {}", warning);
            }
            print_fetch_notes(&result);
            Ok(())
        }
        ChillHoursCommand::InitConfig { .. } => unreachable!("handled before loading settings"),
    }
}

async fn init_config(
    path: Option<PathBuf>,
    api_key: String,
    application_key: Option<String>,
    device: Option<String>,
) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path,
        None => chillhours::get_config_file()?,
    };
    let mut settings = Settings::load_from(&path).await?;
    settings.api_key = Some(api_key);
    if application_key.is_some() {
        settings.application_key = application_key;
    }
    if device.is_some() {
        settings.device_mac = device;
    }
    settings.validate()?;
    settings.save_to(&path).await?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

fn parse_date(input: &str) -> Result<StartEndDateTime, ChillHoursError> {
    input
        .get_datetime_range()
        .ok_or_else(|| ChillHoursError::InvalidDate(input.to_string()))
}

fn print_fetch_notes<R>(result: &FetchedReport<R>) {
    println!(
        "Based on {} samples from {} pages",
        result.samples, result.pages
    );
    if result.is_partial() {
        println!(
            "Warning: fetching stopped early ({:?}), older data may be missing",
            result.stop
        );
    }
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, reporting on the data fetched so far");
            cancel.cancel();
        }
    });
}
