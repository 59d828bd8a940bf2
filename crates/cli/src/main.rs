//! Smart City Forecasting CLI
//!
//! A command-line tool for checking the forecast server and requesting
//! traffic, energy, waste, pollution and emergency predictions.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::{EmergencyRequest, EnergyRequest, PollutionRequest, TrafficRequest, WasteRequest};
use commands::{predict, status};

/// Smart City Forecasting CLI
#[derive(Parser)]
#[command(name = "cityctl")]
#[command(author, version, about = "CLI for the Smart City Forecasting API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (falls back to the config file, then http://127.0.0.1:8000)
    #[arg(long, env = "CITYCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show API status and loaded models
    Status,

    /// Show component health and readiness
    Health,

    /// Request a forecast
    #[command(subcommand)]
    Predict(PredictCommands),
}

#[derive(Subcommand)]
pub enum PredictCommands {
    /// Vehicle count in one hour
    Traffic {
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..24))]
        hour: i64,
        /// 0 = Monday
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..7))]
        day_of_week: i64,
        /// Clear, Rain or Fog
        #[arg(long)]
        weather: String,
        #[arg(long)]
        vehicle_count: i64,
    },

    /// Grid load in 24 hours
    Energy {
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..24))]
        hour: i64,
        /// 0 = Monday
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..7))]
        day_of_week: i64,
        /// Degrees Celsius
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,
        #[arg(long)]
        grid_load_mw: i64,
    },

    /// Bin fill level in one day
    Waste {
        /// Landfill or Recycling
        #[arg(long)]
        bin_type: String,
        #[arg(long)]
        fill_level_percent: i64,
        #[arg(long)]
        days_since_collection: i64,
    },

    /// Air quality index in one hour
    Pollution {
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..24))]
        hour: i64,
        /// Low or High
        #[arg(long)]
        traffic_level: String,
        #[arg(long)]
        aqi: i64,
    },

    /// Incident probability in one hour
    Emergency {
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..24))]
        hour: i64,
        /// 0 = Monday
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..7))]
        day_of_week: i64,
        /// Clear, Rain or Fog
        #[arg(long)]
        weather: String,
        /// Low or High
        #[arg(long)]
        traffic_level: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let format = config.resolve_format(cli.format)?;

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Status => status::show_status(&client, format).await?,
        Commands::Health => status::show_health(&client, format).await?,
        Commands::Predict(predict_cmd) => match predict_cmd {
            PredictCommands::Traffic {
                hour,
                day_of_week,
                weather,
                vehicle_count,
            } => {
                let request = TrafficRequest {
                    hour,
                    day_of_week,
                    weather,
                    vehicle_count,
                };
                predict::run(&client, "traffic", &request, format).await?;
            }
            PredictCommands::Energy {
                hour,
                day_of_week,
                temperature,
                grid_load_mw,
            } => {
                let request = EnergyRequest {
                    hour,
                    day_of_week,
                    temperature,
                    grid_load_mw,
                };
                predict::run(&client, "energy", &request, format).await?;
            }
            PredictCommands::Waste {
                bin_type,
                fill_level_percent,
                days_since_collection,
            } => {
                let request = WasteRequest {
                    bin_type,
                    fill_level_percent,
                    days_since_collection,
                };
                predict::run(&client, "waste", &request, format).await?;
            }
            PredictCommands::Pollution {
                hour,
                traffic_level,
                aqi,
            } => {
                let request = PollutionRequest {
                    hour,
                    traffic_level,
                    aqi,
                };
                predict::run(&client, "pollution", &request, format).await?;
            }
            PredictCommands::Emergency {
                hour,
                day_of_week,
                weather,
                traffic_level,
            } => {
                let request = EmergencyRequest {
                    hour,
                    day_of_week,
                    weather,
                    traffic_level,
                };
                predict::run(&client, "emergency", &request, format).await?;
            }
        },
    }

    Ok(())
}
