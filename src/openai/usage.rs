//! Best-effort billing usage query.
//!
//! Never fails the caller: any problem (missing credential, network
//! error, non-2xx status, malformed body) yields the placeholder.

use chrono::{Datelike, Local, Months, NaiveDate};
use reqwest::Client;
use serde::Deserialize;

use crate::config::OpenAiConfig;
use crate::error::Error;

/// Returned whenever usage cannot be determined.
const PLACEHOLDER: &str = "-";

#[derive(Debug, Deserialize)]
struct UsageResponse {
    /// Hundredths of a currency unit used this period.
    total_usage: f64,
}

/// Spend for the current calendar month as a currency string, or `"-"`.
///
/// Without a configured credential no network call is attempted.
pub async fn current_usage(http: &Client, cfg: &OpenAiConfig) -> String {
    let Some(api_key) = &cfg.api_key else {
        return PLACEHOLDER.to_string();
    };

    match fetch_usage(http, &cfg.api_base_url, api_key.expose_secret()).await {
        Ok(usage) => usage,
        Err(e) => {
            tracing::warn!(error = %e, "Usage query failed");
            PLACEHOLDER.to_string()
        }
    }
}

async fn fetch_usage(http: &Client, base_url: &str, api_key: &str) -> crate::Result<String> {
    let (start_date, end_date) = month_range(Local::now().date_naive());
    let url = format!(
        "{}/v1/dashboard/billing/usage?start_date={}&end_date={}",
        base_url.trim_end_matches('/'),
        start_date,
        end_date
    );

    let response = http.get(&url).bearer_auth(api_key).send().await?;
    if !response.status().is_success() {
        return Err(Error::Protocol(format!(
            "usage endpoint returned {}",
            response.status()
        )));
    }

    let usage: UsageResponse = response.json().await?;
    Ok(format_usage(usage.total_usage))
}

/// First and last day of the month containing `today`, as YYYY-MM-DD.
fn month_range(today: NaiveDate) -> (String, String) {
    // Day 1 exists in every month.
    let first = today.with_day(1).unwrap();
    let last = first
        .checked_add_months(Months::new(1))
        .unwrap()
        .pred_opt()
        .unwrap();

    (
        first.format("%Y-%m-%d").to_string(),
        last.format("%Y-%m-%d").to_string(),
    )
}

/// Cents to a `$` string with the shortest decimal form; zero usage
/// renders as the placeholder.
fn format_usage(total_usage: f64) -> String {
    let amount = total_usage.round() / 100.0;
    if amount == 0.0 {
        PLACEHOLDER.to_string()
    } else {
        format!("${}", amount)
    }
}
