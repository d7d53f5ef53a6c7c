use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use dcms_client::models::{AppointmentStatus, NewAppointment};
use dcms_client::schedule::{DEFAULT_DURATION_MIN, find_conflict, parse_clock};
use dcms_client::{Config, DcmsClient};

#[derive(Debug, Parser)]
#[command(name = "dcms", version, about = "Clinic registry command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long, env = "DCMS_USERNAME")]
        username: String,
        #[arg(long, env = "DCMS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user, as the server sees it
    Whoami,
    /// Show the stored session without calling the server
    Status,
    #[command(subcommand)]
    Patients(PatientCommand),
    #[command(subcommand)]
    Doctors(DoctorCommand),
    #[command(subcommand)]
    Appointments(AppointmentCommand),
    #[command(subcommand)]
    Reports(ReportCommand),
}

#[derive(Debug, Subcommand)]
enum PatientCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    Show {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DoctorCommand {
    List,
    Show { id: i64 },
}

#[derive(Debug, Subcommand)]
enum AppointmentCommand {
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        page: Option<u32>,
    },
    Show {
        id: i64,
    },
    /// One day's appointments, optionally for a single doctor
    Schedule {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        doctor: Option<i64>,
    },
    /// Book a slot; the end time is start + duration
    Book {
        #[arg(long)]
        patient: i64,
        #[arg(long)]
        doctor: i64,
        #[arg(long)]
        date: NaiveDate,
        /// HH:MM
        #[arg(long)]
        start: String,
        /// Minutes
        #[arg(long, default_value_t = DEFAULT_DURATION_MIN)]
        duration: u32,
        #[arg(long)]
        note: Option<String>,
    },
    Cancel {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum ReportCommand {
    Daily {
        #[arg(long)]
        date: NaiveDate,
    },
    DoctorDaily {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        doctor: i64,
    },
    Cancelled {
        #[arg(long)]
        date: NaiveDate,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(client: &DcmsClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            let user = client.login(&username, &password).await?;
            tracing::info!("Signed in as {}", user.display_name());
            print_json(&user)
        }
        Command::Logout => client.logout().await.map_err(Into::into),
        Command::Whoami => print_json(&client.auth().me().await?),
        Command::Status => print_json(&client.auth().status().await?),

        Command::Patients(cmd) => match cmd {
            PatientCommand::List { search, page } => {
                print_json(&client.patients().list(search.as_deref(), page).await?)
            }
            PatientCommand::Show { id } => print_json(&client.patients().get(id).await?),
            PatientCommand::Delete { id } => client.patients().delete(id).await.map_err(Into::into),
        },

        Command::Doctors(cmd) => match cmd {
            DoctorCommand::List => print_json(&client.doctors().list().await?),
            DoctorCommand::Show { id } => print_json(&client.doctors().get(id).await?),
        },

        Command::Appointments(cmd) => match cmd {
            AppointmentCommand::List { date, page } => {
                print_json(&client.appointments().list(date, page).await?)
            }
            AppointmentCommand::Show { id } => print_json(&client.appointments().get(id).await?),
            AppointmentCommand::Schedule { date, doctor } => {
                print_json(&client.appointments().schedule(Some(date), doctor).await?)
            }
            AppointmentCommand::Book {
                patient,
                doctor,
                date,
                start,
                duration,
                note,
            } => {
                let start = parse_clock(&start)?;
                let mut draft =
                    NewAppointment::with_duration(patient, doctor, date, start, duration)?;
                draft.note = note;

                let day = client
                    .appointments()
                    .schedule(Some(date), Some(doctor))
                    .await
                    .context("loading the doctor's schedule")?;
                let active: Vec<_> = day
                    .into_iter()
                    .filter(|a| a.status() != Some(AppointmentStatus::Cancelled))
                    .collect();
                if let Some(clash) =
                    find_conflict(&active, doctor, date, (draft.time_start, draft.time_end), None)
                {
                    bail!(
                        "doctor already has appointment #{} from {} to {}",
                        clash.id,
                        clash.time_start.format("%H:%M"),
                        clash.time_end.format("%H:%M")
                    );
                }

                print_json(&client.appointments().create(&draft).await?)
            }
            AppointmentCommand::Cancel { id } => {
                print_json(&client.appointments().cancel(id).await?)
            }
        },

        Command::Reports(cmd) => match cmd {
            ReportCommand::Daily { date } => print_json(&client.reports().daily(date).await?),
            ReportCommand::DoctorDaily { date, doctor } => {
                print_json(&client.reports().doctor_daily(date, doctor).await?)
            }
            ReportCommand::Cancelled { date } => {
                print_json(&client.reports().cancelled(date).await?)
            }
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env()?;
    let client = DcmsClient::from_config(&cfg)?;

    tracing::debug!(api = %cfg.api_base_url, session = %cfg.session_file.display(), "Using API");
    run(&client, cli.command).await
}
