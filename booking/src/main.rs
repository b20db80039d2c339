//! Ticket desk command line.
//!
//! Operator tool over the venue API: inspect settings and slots, quote an
//! order, and fetch and render the ticket of a checkout session.
//!
//! ```text
//! ticketdesk settings
//! ticketdesk slots 2025-07-12
//! ticketdesk quote <tickets> [socks] [card|cash] [--insured] [--bundle <id>]
//! ticketdesk ticket <session-id>
//! ```

use anyhow::{Context, bail};
use chrono::NaiveDate;
use ticketdesk::config::Config;
use ticketdesk::document::{self, TicketSource};
use ticketdesk::payment_return;
use ticketdesk::pricing::{AddOnSelection, price_breakdown};
use ticketdesk_api::types::format_date;
use ticketdesk_api::PaymentMethod;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local .env is optional
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("ticketdesk={0},ticketdesk_api={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = config.client()?;
    info!(base_url = %client.base_url(), "Ticket desk started");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map_or("settings", String::as_str);

    match command {
        "settings" => {
            let settings = client
                .fetch_settings()
                .await?
                .context("No settings configured")?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        },

        "slots" => {
            let date = match args.get(1) {
                Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .with_context(|| format!("Invalid date: {raw}"))?,
                None => chrono::Local::now().date_naive(),
            };
            let slots = client.fetch_slots(&format_date(date)).await?;
            if slots.is_empty() {
                println!("No slots on {date}");
            }
            for slot in slots {
                println!(
                    "{} {}-{}  {:>3}/{:<3} {:?}",
                    slot.date,
                    slot.start_time,
                    slot.end_time,
                    slot.available_tickets,
                    slot.max_tickets,
                    slot.status()
                );
            }
        },

        "quote" => {
            let (positional, options) = split_options(&args[1..]);
            let tickets: u32 = parse_arg(&positional, 0, "tickets")?.unwrap_or(1);
            let socks: u32 = parse_arg(&positional, 1, "socks")?.unwrap_or(0);
            let method = match positional.get(2).map(String::as_str) {
                None | Some("card") => PaymentMethod::Card,
                Some("cash") => PaymentMethod::Cash,
                Some(other) => bail!("Unknown payment method: {other}"),
            };
            let insured = options.iter().any(|(name, _)| name == "--insured");
            let bundle_id = options
                .iter()
                .find(|(name, _)| name == "--bundle")
                .map(|(_, value)| value.as_deref().context("--bundle needs an id"))
                .transpose()?;

            let settings = client.fetch_settings().await?.unwrap_or_default();
            let bundle = match bundle_id {
                Some(id) => Some(
                    client
                        .fetch_bundles()
                        .await?
                        .into_iter()
                        .find(|bundle| bundle.id.as_deref() == Some(id))
                        .with_context(|| format!("Unknown bundle: {id}"))?,
                ),
                None => None,
            };
            let add_ons = AddOnSelection::compose(&settings, socks, insured, tickets);
            let breakdown =
                price_breakdown(&settings, tickets, &add_ons, bundle.as_ref(), None, method);
            println!("Tickets     {}", breakdown.ticket_amount);
            println!("Bundle      {}", breakdown.bundle_net);
            println!("Add-ons     {}", breakdown.add_on_amount);
            println!("Admin fee   {}", breakdown.admin_fee);
            println!("Total       {}", breakdown.total);
        },

        "ticket" => {
            let session_id = args.get(1).context("Usage: ticketdesk ticket <session-id>")?;
            let ticket =
                payment_return::fetch_ticket_with_retry(&client, session_id, &config.retry_policy()).await?;
            let pdf = document::render_ticket(&ticket, TicketSource::Regular)?;
            let options = config.document_options();
            let path = options.download_dir.join(&options.file_name);
            document::write_file(&path, &pdf).await?;
            info!(ticket_id = %ticket.ticket_id, path = %path.display(), "Ticket saved");
        },

        other => bail!("Unknown command: {other} (expected settings, slots, quote or ticket)"),
    }

    Ok(())
}

fn parse_arg<T>(args: &[String], index: usize, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    args.get(index)
        .map(|raw| raw.parse::<T>().with_context(|| format!("Invalid {name}: {raw}")))
        .transpose()
}

/// Positional arguments and `--flag [value]` options; only `--bundle` takes a value
fn split_options(args: &[String]) -> (Vec<String>, Vec<(String, Option<String>)>) {
    let mut positional = Vec::new();
    let mut options = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--bundle" {
            options.push((arg.clone(), iter.next().cloned()));
        } else if arg.starts_with("--") {
            options.push((arg.clone(), None));
        } else {
            positional.push(arg.clone());
        }
    }
    (positional, options)
}
