//! # Round Subcommand
//!
//! Caregiving round lifecycle commands. Rounds live as JSON records in the
//! state directory and every command goes through the round service, so
//! the CLI gets the same optimistic locking, follow-up rounds and events
//! as any other caller.
//!
//! ## Subcommands
//!
//! - `open`: open the next round of a reception in NOT_STARTED.
//! - `assign`: attach or replace the caregiver.
//! - `start`, `stop`, `complete`, `cancel`, `pend`, `reconcile`: lifecycle
//!   transitions.
//! - `edit-start`, `edit-end`: correct recorded times.
//! - `status`: show one round.
//! - `list`: list rounds, optionally of one reception.
//!
//! Commands the round rejects exit with status 2 and print `REJECTED:`.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use careins_core::{CaregivingRoundId, ReceptionId, Timestamp};
use careins_round::{
    CaregivingRoundRecord, CaregivingRoundService, EventPublisher, RoundCommand, RoundEvent,
    RoundServiceConfig, Subject,
};
use careins_state::{AccountInfo, CancellationReason, CaregiverInfo, FinishingReason, Sex};

use crate::store::FileRoundRepository;

/// The round service as the CLI wires it.
pub type CliRoundService = CaregivingRoundService<FileRoundRepository, LoggingPublisher>;

pub fn build_service(state_dir: &Path, config: RoundServiceConfig) -> CliRoundService {
    CaregivingRoundService::new(FileRoundRepository::new(state_dir), LoggingPublisher, config)
}

/// Publishes round events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPublisher;

impl EventPublisher for LoggingPublisher {
    fn publish(&self, event: &RoundEvent) {
        info!(
            event = event.name(),
            round_id = %event.caregiving_round_id(),
            reception_id = %event.reception_id(),
            "round event published"
        );
        match serde_json::to_string(event) {
            Ok(payload) => debug!(%payload, "round event payload"),
            Err(e) => warn!(error = %e, "failed to encode round event payload"),
        }
    }
}

// ─── Arguments ──────────────────────────────────────────────────────────

/// Arguments for the `careins round` subcommand.
#[derive(Args, Debug)]
pub struct RoundArgs {
    /// Act as this user. Without it commands are attributed to the system.
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: RoundSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RoundSubcommand {
    /// Open the next round of a reception in NOT_STARTED.
    Open {
        /// Reception the round belongs to. A new reception if omitted.
        #[arg(long)]
        reception: Option<ReceptionId>,
    },

    /// Attach or replace the caregiver.
    Assign {
        #[arg(long)]
        id: CaregivingRoundId,
        #[command(flatten)]
        caregiver: CaregiverArgs,
    },

    /// Start caregiving (→ CAREGIVING_IN_PROGRESS).
    Start {
        #[arg(long)]
        id: CaregivingRoundId,
        /// RFC 3339 start time.
        #[arg(long, value_parser = parse_timestamp)]
        at: Timestamp,
    },

    /// Correct the start time.
    EditStart {
        #[arg(long)]
        id: CaregivingRoundId,
        #[arg(long, value_parser = parse_timestamp)]
        at: Timestamp,
    },

    /// Correct the end time.
    EditEnd {
        #[arg(long)]
        id: CaregivingRoundId,
        #[arg(long, value_parser = parse_timestamp)]
        at: Timestamp,
    },

    /// Complete the round with a finishing reason.
    Complete {
        #[arg(long)]
        id: CaregivingRoundId,
        #[arg(long, value_parser = parse_timestamp)]
        at: Timestamp,
        /// e.g. FINISHED, FINISHED_CONTINUE, finished-restarting.
        #[arg(long, value_parser = parse_enum::<FinishingReason>)]
        reason: FinishingReason,
    },

    /// Stop caregiving for a later restart (→ COMPLETED_RESTARTING).
    Stop {
        #[arg(long)]
        id: CaregivingRoundId,
        #[arg(long, value_parser = parse_timestamp)]
        at: Timestamp,
    },

    /// Cancel a round still looking for a caregiver.
    Cancel {
        #[arg(long)]
        id: CaregivingRoundId,
        #[arg(long, value_parser = parse_enum::<CancellationReason>)]
        reason: CancellationReason,
        #[arg(long, default_value = "")]
        detail: String,
    },

    /// Put rematching on hold (→ PENDING_REMATCHING).
    Pend {
        #[arg(long)]
        id: CaregivingRoundId,
    },

    /// Close out a completed round (→ RECONCILIATION_COMPLETED).
    Reconcile {
        #[arg(long)]
        id: CaregivingRoundId,
    },

    /// Show one round.
    Status {
        #[arg(long)]
        id: CaregivingRoundId,
    },

    /// List rounds.
    List {
        #[arg(long)]
        reception: Option<ReceptionId>,
    },
}

/// Caregiver fields for `careins round assign`.
#[derive(Args, Debug, Clone)]
pub struct CaregiverArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, value_parser = parse_enum::<Sex>)]
    pub sex: Sex,
    #[arg(long)]
    pub phone: String,
    #[arg(long, default_value_t = 0)]
    pub daily_charge: u32,
    #[arg(long, default_value_t = 0)]
    pub commission_fee: u32,
    #[arg(long)]
    pub insured: bool,
    #[arg(long)]
    pub organization_id: Option<String>,
    #[arg(long)]
    pub birth_date: Option<String>,
    #[arg(long)]
    pub bank: Option<String>,
    #[arg(long)]
    pub account_number: Option<String>,
    #[arg(long)]
    pub account_holder: Option<String>,
}

impl From<&CaregiverArgs> for CaregiverInfo {
    fn from(args: &CaregiverArgs) -> Self {
        CaregiverInfo {
            caregiver_organization_id: args.organization_id.clone(),
            name: args.name.clone(),
            sex: args.sex,
            birth_date: args.birth_date.clone(),
            phone_number: args.phone.clone(),
            daily_caregiving_charge: args.daily_charge,
            commission_fee: args.commission_fee,
            insured: args.insured,
            account_info: AccountInfo {
                bank: args.bank.clone(),
                account_number: args.account_number.clone(),
                account_holder: args.account_holder.clone(),
            },
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<Timestamp, String> {
    Timestamp::parse_lenient(raw).map_err(|e| e.to_string())
}

/// Parse a SCREAMING_SNAKE_CASE enum, also accepting lower-case and
/// kebab-case spellings.
fn parse_enum<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let normalized = raw.trim().to_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| format!("unknown value {raw:?}"))
}

// ─── Handlers ───────────────────────────────────────────────────────────

/// Execute the round subcommand.
pub fn run_round(args: &RoundArgs, service: &CliRoundService) -> Result<u8> {
    let subject = args.user.as_deref().map_or(Subject::System, Subject::user);

    match &args.command {
        RoundSubcommand::Open { reception } => {
            cmd_open(service, reception.unwrap_or_else(ReceptionId::new))
        }
        RoundSubcommand::Assign { id, caregiver } => cmd_apply(
            service,
            *id,
            &RoundCommand::AssignCaregiver {
                caregiver_info: caregiver.into(),
            },
            &subject,
        ),
        RoundSubcommand::Start { id, at } => cmd_apply(
            service,
            *id,
            &RoundCommand::Start {
                start_date_time: *at,
            },
            &subject,
        ),
        RoundSubcommand::EditStart { id, at } => cmd_apply(
            service,
            *id,
            &RoundCommand::EditStartDateTime {
                start_date_time: *at,
            },
            &subject,
        ),
        RoundSubcommand::EditEnd { id, at } => cmd_apply(
            service,
            *id,
            &RoundCommand::EditEndDateTime { end_date_time: *at },
            &subject,
        ),
        RoundSubcommand::Complete { id, at, reason } => cmd_apply(
            service,
            *id,
            &RoundCommand::Complete {
                end_date_time: *at,
                reason: *reason,
            },
            &subject,
        ),
        RoundSubcommand::Stop { id, at } => cmd_apply(
            service,
            *id,
            &RoundCommand::Stop {
                stop_date_time: *at,
            },
            &subject,
        ),
        RoundSubcommand::Cancel { id, reason, detail } => cmd_apply(
            service,
            *id,
            &RoundCommand::Cancel {
                reason: *reason,
                detail_reason: detail.clone(),
            },
            &subject,
        ),
        RoundSubcommand::Pend { id } => cmd_apply(service, *id, &RoundCommand::Pend, &subject),
        RoundSubcommand::Reconcile { id } => {
            cmd_apply(service, *id, &RoundCommand::CompleteReconciliation, &subject)
        }
        RoundSubcommand::Status { id } => cmd_status(service, *id),
        RoundSubcommand::List { reception } => cmd_list(service, *reception),
    }
}

fn cmd_open(service: &CliRoundService, reception_id: ReceptionId) -> Result<u8> {
    let record = service
        .open_round(reception_id)
        .context("failed to open caregiving round")?;
    println!(
        "OK: opened caregiving round {} (#{} of {}) in {}",
        record.id,
        record.caregiving_round_number,
        record.reception_id,
        record.caregiving_state_data.progressing_status
    );
    Ok(0)
}

fn cmd_apply(
    service: &CliRoundService,
    id: CaregivingRoundId,
    command: &RoundCommand,
    subject: &Subject,
) -> Result<u8> {
    let before = service
        .find(id)
        .with_context(|| format!("failed to load caregiving round {id}"))?;

    let outcome = match service.execute(id, command, subject) {
        Ok(outcome) => outcome,
        Err(err) if err.is_rejection() => {
            eprintln!("REJECTED: {command} on caregiving round {id}: {err}");
            return Ok(2);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to {command} caregiving round {id}"))
        }
    };

    let from = before.caregiving_state_data.progressing_status;
    let to = outcome.record.caregiving_state_data.progressing_status;
    if from == to {
        println!("OK: {command} applied to caregiving round {id} ({to})");
    } else {
        println!("OK: caregiving round {id} transitioned {from} → {to}");
    }
    if let Some(next) = &outcome.next_round {
        println!(
            "OK: opened caregiving round {} (#{}) in {}",
            next.id, next.caregiving_round_number, next.caregiving_state_data.progressing_status
        );
    }
    if let Some(err) = &outcome.follow_up_error {
        eprintln!("WARNING: caregiving round {id} was saved but its follow-up round was not: {err}");
    }
    Ok(0)
}

fn cmd_status(service: &CliRoundService, id: CaregivingRoundId) -> Result<u8> {
    let record = service
        .find(id)
        .with_context(|| format!("failed to load caregiving round {id}"))?;
    print!("{}", render_status(&record));
    Ok(0)
}

fn render_status(record: &CaregivingRoundRecord) -> String {
    let data = &record.caregiving_state_data;
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    out.push_str(&format!("Caregiving round: {}\n", record.id));
    out.push_str(&format!("  Reception: {}\n", record.reception_id));
    out.push_str(&format!("  Round: #{}\n", record.caregiving_round_number));
    out.push_str(&format!("  Status: {}\n", data.progressing_status));
    out.push_str(&format!(
        "  Caregiver: {}\n",
        or_dash(data.caregiver_info.as_ref().map(|c| c.name.clone()))
    ));
    out.push_str(&format!(
        "  Start: {}\n",
        or_dash(data.start_date_time.map(|t| t.to_iso8601()))
    ));
    out.push_str(&format!(
        "  End: {}\n",
        or_dash(data.end_date_time.map(|t| t.to_iso8601()))
    ));
    out.push_str(&format!(
        "  Closing reason: {}\n",
        or_dash(data.closing_reason_type.map(|r| r.to_string()))
    ));
    if let Some(canceled) = data.canceled_date_time {
        out.push_str(&format!("  Canceled: {}\n", canceled.to_iso8601()));
    }
    if let Some(detail) = &data.detail_closing_reason {
        out.push_str(&format!("  Detail: {detail}\n"));
    }
    out.push_str(&format!("  Billing: {}\n", record.billing_progressing_status));
    out.push_str(&format!("  Settlement: {}\n", record.settlement_progressing_status));
    if !record.remarks.is_empty() {
        out.push_str(&format!("  Remarks: {}\n", record.remarks));
    }
    out.push_str(&format!("  Version: {}\n", record.version));
    out
}

fn cmd_list(service: &CliRoundService, reception: Option<ReceptionId>) -> Result<u8> {
    let records = match reception {
        Some(reception_id) => service.rounds_of(reception_id),
        None => service.list(),
    }
    .context("failed to list caregiving rounds")?;

    if records.is_empty() {
        println!("No caregiving rounds found.");
        return Ok(0);
    }
    println!("Caregiving rounds ({}):", records.len());
    for record in &records {
        println!(
            "  {} #{} {}: {}",
            record.reception_id,
            record.caregiving_round_number,
            record.id,
            record.caregiving_state_data.progressing_status
        );
    }
    Ok(0)
}
