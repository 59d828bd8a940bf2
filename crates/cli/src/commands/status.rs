//! Service status and health commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use super::predict::{model_name, DOMAINS};
use crate::client::{ApiClient, HealthResponse, ReadinessResponse, StatusResponse};
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

/// Row for the model status table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show whether the API is up and which models it loaded
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: StatusResponse = client.get("").await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("{}", status.status.bold());
            println!("API: {}", client.base_url().as_str().cyan());
            println!();

            print_table(&model_rows(&status.models_loaded));

            let unknown: Vec<&String> = status
                .models_loaded
                .iter()
                .filter(|m| !DOMAINS.iter().any(|domain| model_name(domain) == **m))
                .collect();
            if !unknown.is_empty() {
                let names: Vec<&str> = unknown.iter().map(|m| m.as_str()).collect();
                println!("Other models: {}", names.join(", "));
            }
        }
    }

    Ok(())
}

fn model_rows(loaded: &[String]) -> Vec<ModelRow> {
    DOMAINS
        .iter()
        .map(|domain| {
            let model = model_name(domain);
            let state = if loaded.iter().any(|m| *m == model) {
                "loaded"
            } else {
                "missing"
            };
            ModelRow {
                domain: domain.to_string(),
                model,
                status: color_status(state),
            }
        })
        .collect()
}

/// Show component health and readiness
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health) = client.get_with_status::<HealthResponse>("healthz").await?;
    let (_, readiness) = client
        .get_with_status::<ReadinessResponse>("readyz")
        .await?;
    let health = health.ok_or_else(|| anyhow::anyhow!("Empty health response"))?;
    let readiness = readiness.ok_or_else(|| anyhow::anyhow!("Empty readiness response"))?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "health": health,
            "readiness": readiness,
        }))?,
        OutputFormat::Table => {
            println!("Status: {}", color_status(&health.status));
            let ready = if readiness.ready { "ready" } else { "not ready" };
            println!("Ready:  {}", color_status(ready));
            if let Some(reason) = &readiness.reason {
                print_warning(reason);
            }
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    component: name.clone(),
                    status: color_status(&component.status),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.component.cmp(&b.component));
            print_table(&rows);
        }
    }

    if health.status == "unhealthy" {
        anyhow::bail!("Service is unhealthy");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_rows_mark_missing_models() {
        colored::control::set_override(false);
        let rows = model_rows(&["traffic_model".to_string(), "waste_model".to_string()]);

        assert_eq!(rows.len(), DOMAINS.len());
        assert_eq!(rows[4].model, "emergency_model");
        let states: Vec<&str> = rows.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(states, vec!["loaded", "missing", "loaded", "missing", "missing"]);
    }
}
