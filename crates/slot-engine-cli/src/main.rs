//! `slots` CLI: query bookable slots and commit bookings against a JSON catalog.
//!
//! ## Usage
//!
//! ```sh
//! # Bookable slots for a service on one date (catalog from a file)
//! slots -c catalog.json availability --business $BIZ --service $SVC --date 2026-03-16
//!
//! # Same, rendered in another timezone and for one staff member
//! slots -c catalog.json availability --business $BIZ --service $SVC \
//!     --date 2026-03-16 --staff $STAFF --timezone UTC
//!
//! # Book a slot and write the updated catalog back
//! slots -c catalog.json book --business $BIZ --service $SVC \
//!     --start 2026-03-16T09:00:00-05:00 --email sam@example.com --save catalog.json
//!
//! # Cancel an appointment
//! slots -c catalog.json cancel --appointment $ID --save catalog.json
//!
//! # Appointments on the calendar for one week
//! slots -c catalog.json calendar --business $BIZ \
//!     --from 2026-03-16T00:00:00-05:00 --to 2026-03-23T00:00:00-05:00
//!
//! # Catalog listings
//! slots -c catalog.json services --business $BIZ
//! cat catalog.json | slots staff --business $BIZ
//! ```
//!
//! Results are printed as JSON on stdout. Logs go to stderr.

mod logging;

use std::io::{self, Read};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slot_engine::api::parse_instant;
use slot_engine::model::ClientInfo;
use slot_engine::{
    AvailabilityRequest, BookingRequest, CalendarRequest, Clock, FixedClock, MemoryStore,
    Scheduler, SchedulingError,
};
use uuid::Uuid;

use crate::logging::{init_logging, LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Appointment availability and booking over a JSON catalog"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog JSON file (reads from stdin if omitted)
    #[arg(short, long, global = true)]
    catalog: Option<String>,

    /// Evaluate lead time and horizon as of this RFC 3339 instant instead of now
    #[arg(long, global = true)]
    now: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Filter directive such as `slot_engine=debug`, overriding --log-level
    #[arg(long, global = true)]
    log_filter: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable slots for a service on one date
    Availability {
        #[arg(long)]
        business: Uuid,
        #[arg(long)]
        service: Uuid,
        /// Calendar date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Restrict to one staff member
        #[arg(long)]
        staff: Option<Uuid>,
        /// IANA timezone overriding the business's own
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Book a slot starting at the given instant
    Book {
        #[arg(long)]
        business: Uuid,
        #[arg(long)]
        service: Uuid,
        /// Desired start as RFC 3339
        #[arg(long)]
        start: String,
        /// Preferred staff member
        #[arg(long)]
        staff: Option<Uuid>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Write the updated catalog to this file
        #[arg(long)]
        save: Option<String>,
    },
    /// Cancel an appointment
    Cancel {
        #[arg(long)]
        appointment: Uuid,
        /// Write the updated catalog to this file
        #[arg(long)]
        save: Option<String>,
    },
    /// List a business's appointments within a time range
    Calendar {
        #[arg(long)]
        business: Uuid,
        /// Earliest appointment start, RFC 3339
        #[arg(long)]
        from: String,
        /// Latest appointment end, RFC 3339
        #[arg(long)]
        to: String,
        /// Restrict to one staff member
        #[arg(long)]
        staff: Option<Uuid>,
    },
    /// List a business's active services
    Services {
        #[arg(long)]
        business: Uuid,
    },
    /// List a business's active staff
    Staff {
        #[arg(long)]
        business: Uuid,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default()
        .with_level(cli.log_level)
        .with_format(cli.log_format);
    if let Some(ref directive) = cli.log_filter {
        logging = logging.with_env_filter(directive.as_str());
    }
    if let Err(err) = init_logging(logging) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }

    if let Err(err) = run(cli) {
        match err.downcast_ref::<SchedulingError>() {
            Some(e) => eprintln!("Error [{}]: {:#}", e.kind(), err),
            None => eprintln!("Error: {:#}", err),
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let now = cli
        .now
        .as_deref()
        .map(parse_instant)
        .transpose()
        .context("Invalid --now")?;
    let json = read_input(cli.catalog.as_deref())?;
    let store = MemoryStore::from_json(&json).context("Failed to load catalog")?;

    match now {
        Some(now) => execute(&Scheduler::new(store, FixedClock(now)), cli.command),
        None => execute(&Scheduler::with_system_clock(store), cli.command),
    }
}

fn execute<C: Clock>(scheduler: &Scheduler<MemoryStore, C>, command: Commands) -> Result<()> {
    match command {
        Commands::Availability {
            business,
            service,
            date,
            staff,
            timezone,
        } => {
            let response = scheduler
                .compute_availability(&AvailabilityRequest {
                    business_id: business,
                    service_id: service,
                    date,
                    staff_id: staff,
                    timezone,
                })
                .context("Failed to compute availability")?;
            print_json(&response)?;
        }
        Commands::Book {
            business,
            service,
            start,
            staff,
            email,
            phone,
            first_name,
            last_name,
            save,
        } => {
            let client = ClientInfo {
                email,
                phone,
                first_name,
                last_name,
            };
            let confirmation = scheduler
                .create_booking(&BookingRequest {
                    business_id: business,
                    service_id: service,
                    staff_id: staff,
                    slot_start: start,
                    client: Some(client),
                })
                .context("Booking failed")?;
            save_catalog(scheduler, save.as_deref())?;
            print_json(&confirmation)?;
        }
        Commands::Cancel { appointment, save } => {
            let cancelled = scheduler
                .cancel_appointment(appointment)
                .context("Cancellation failed")?;
            save_catalog(scheduler, save.as_deref())?;
            print_json(&cancelled)?;
        }
        Commands::Calendar {
            business,
            from,
            to,
            staff,
        } => {
            let calendar = scheduler
                .calendar(&CalendarRequest {
                    business_id: business,
                    from,
                    to,
                    staff_id: staff,
                })
                .context("Failed to read calendar")?;
            print_json(&calendar)?;
        }
        Commands::Services { business } => {
            print_json(&scheduler.services(business)?)?;
        }
        Commands::Staff { business } => {
            print_json(&scheduler.staff(business)?)?;
        }
    }

    Ok(())
}

fn save_catalog<C: Clock>(scheduler: &Scheduler<MemoryStore, C>, path: Option<&str>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = scheduler
        .store()
        .to_json_pretty()
        .context("Failed to serialize catalog")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write file: {}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)?;
    println!("{}", pretty);
    Ok(())
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
