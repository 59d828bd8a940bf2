//! Prediction commands

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, PredictionReply};
use crate::output::{format_forecast, print_error, print_json, print_table, OutputFormat};

/// City domains served under `/predict/{domain}`, in server order
pub const DOMAINS: &[&str] = &["traffic", "energy", "waste", "pollution", "emergency"];

/// The server registers each domain's model as `{domain}_model`
pub fn model_name(domain: &str) -> String {
    format!("{}_model", domain)
}

/// Row for the prediction table
#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Forecast")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Request a forecast for `domain` and print it.
///
/// A server-side error envelope is printed and turned into a failing exit.
pub async fn run<B: Serialize>(
    client: &ApiClient,
    domain: &str,
    request: &B,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("predict/{}", domain);
    let reply: PredictionReply = client.post(&path, request).await?;

    if let OutputFormat::Json = format {
        print_json(&reply)?;
    }

    match reply.into_result() {
        Ok((field, value)) => {
            if let OutputFormat::Table = format {
                print_table(&[ForecastRow {
                    domain: domain.to_string(),
                    field,
                    value: format_forecast(value),
                }]);
            }
            Ok(())
        }
        Err(message) => {
            print_error(&message);
            anyhow::bail!("{} prediction failed: {}", domain, message)
        }
    }
}
