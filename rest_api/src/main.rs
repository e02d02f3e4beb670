// rest_api/src/main.rs
// clinic-server: runs the HTTP API and the store maintenance commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lib::config::load_clinic_config;
use lib::{create_storage, AccountService};
use models::NewStaffMember;

#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(version)]
#[command(about = "Dental clinic appointment and prescription service")]
struct CliArgs {
    /// YAML configuration file (defaults to ./clinic_config.yaml when present)
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<ClinicCommands>,
}

#[derive(Subcommand, Debug)]
enum ClinicCommands {
    /// Run the HTTP API (the default)
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create or replace a staff login. Without arguments the two demo
    /// doctors DOC001 and DOC002 are seeded.
    SeedStaff {
        #[arg(long, requires_all = ["name", "password"])]
        staff_id: Option<String>,
        #[arg(long, requires_all = ["staff_id", "password"])]
        name: Option<String>,
        #[arg(long, requires_all = ["staff_id", "name"])]
        password: Option<String>,
    },
    /// Rebuild slot reservations from the stored appointments
    ReindexSlots,
}

fn demo_staff() -> Vec<NewStaffMember> {
    vec![
        NewStaffMember { staff_id: "DOC001".into(), name: "Dr. Smith".into(), password: "doctor123".into() },
        NewStaffMember { staff_id: "DOC002".into(), name: "Dr. Johnson".into(), password: "doctor456".into() },
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();
    let mut config = load_clinic_config(args.config.as_deref()).context("Failed to load clinic configuration")?;

    match args.command.unwrap_or(ClinicCommands::Serve { port: None }) {
        ClinicCommands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            // Held for the life of the server; Ctrl-C is the shutdown path.
            let (_shutdown_tx, shutdown_rx) = oneshot::channel();
            rest_api::start_server(config, shutdown_rx).await?;
        }
        ClinicCommands::SeedStaff { staff_id, name, password } => {
            let storage = create_storage(&config.storage)?;
            let accounts = AccountService::new(storage.clone(), config.auth.bcrypt_cost);
            let members = match (staff_id, name, password) {
                (Some(staff_id), Some(name), Some(password)) => vec![NewStaffMember { staff_id, name, password }],
                _ => demo_staff(),
            };
            for member in members {
                let staff = accounts.seed_staff(member).await?;
                println!("Seeded staff {} ({})", staff.staff_id, staff.name);
            }
            storage.flush().await?;
        }
        ClinicCommands::ReindexSlots => {
            let storage = create_storage(&config.storage)?;
            let report = storage.rebuild_slot_index().await?;
            info!(
                "Scanned {} appointments, {} slots reserved",
                report.appointments_scanned, report.reservations
            );
            for (slot, holders) in &report.conflicts {
                warn!("Slot {} is claimed by {} active appointments: {:?}", slot, holders.len(), holders);
            }
            println!(
                "Reindexed {} appointments: {} reservations, {} conflicting slots",
                report.appointments_scanned,
                report.reservations,
                report.conflicts.len()
            );
            storage.flush().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_staff_arguments_are_rejected() {
        for partial in [
            vec!["clinic-server", "seed-staff", "--name", "Dr. Rao"],
            vec!["clinic-server", "seed-staff", "--password", "secret"],
            vec!["clinic-server", "seed-staff", "--staff-id", "DOC003"],
            vec!["clinic-server", "seed-staff", "--name", "Dr. Rao", "--password", "secret"],
        ] {
            assert!(CliArgs::try_parse_from(&partial).is_err(), "{:?} should be rejected", partial);
        }
    }

    #[test]
    fn seed_staff_accepts_all_or_nothing() {
        let args = CliArgs::try_parse_from([
            "clinic-server",
            "seed-staff",
            "--staff-id",
            "DOC003",
            "--name",
            "Dr. Rao",
            "--password",
            "secret",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Some(ClinicCommands::SeedStaff { staff_id: Some(_), name: Some(_), password: Some(_) })
        ));

        let args = CliArgs::try_parse_from(["clinic-server", "seed-staff"]).unwrap();
        assert!(matches!(
            args.command,
            Some(ClinicCommands::SeedStaff { staff_id: None, name: None, password: None })
        ));
    }
}
