//! `smartgate verify` -- one-shot plate check.

use std::time::Duration;

use owo_colors::OwoColorize;

use smartgate_core::{AccessKind, VerificationOutcome, Verifier, VerifierConfig};

use crate::cli::{GlobalOpts, VerifyArgs};
use crate::error::CliError;

pub async fn handle(args: &VerifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = VerifierConfig::new(global.base_url()?);
    config.timeout = Duration::from_secs(global.timeout);

    let verifier = Verifier::new(&config)?;
    let kind = if args.secured {
        AccessKind::Secured
    } else {
        AccessKind::General
    };

    let record = verifier.verify(&args.plate, kind).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record.outcome)?);
        return Ok(());
    }

    match &record.outcome {
        VerificationOutcome::Granted {
            message,
            days_remaining,
            due_date,
        } => {
            println!("{}  {}", record.plate.bold(), "ACCESS GRANTED".green().bold());
            if let Some(message) = message {
                println!("  {message}");
            }
            if let Some(days) = days_remaining {
                println!("  {days} day(s) remaining on the current period");
            }
            if let Some(due) = due_date {
                println!("  next payment due {due}");
            }
            Ok(())
        }

        VerificationOutcome::Denied {
            reason,
            days_overdue,
        } => {
            println!("{}  {}", record.plate.bold(), "ACCESS DENIED".red().bold());
            println!("  {reason}");
            if let Some(days) = days_overdue {
                println!("  {days} day(s) overdue");
            }
            Ok(())
        }

        // Transport and server faults surface as process errors
        VerificationOutcome::Error { message } => Err(CliError::Api {
            message: message.clone(),
        }),
    }
}
