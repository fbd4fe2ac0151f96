use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use meditrack_core::api::MedicineQuery;
use meditrack_core::prescription::parse_slot;
use meditrack_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "meditrack")]
#[command(about = "Medication tracking client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory (where the session is kept)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render prescriptions from a saved listing (JSON array) without contacting the backend
    Schedule {
        /// Path to a JSON file holding a prescription listing
        #[arg(long)]
        file: PathBuf,
    },

    /// Sign in and remember the session token
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Forget the stored session token
    Logout,

    /// Show the current session
    Whoami,

    /// List my prescriptions
    Prescriptions,

    /// Create a prescription for myself
    Prescribe {
        #[arg(long)]
        medicine_id: i64,

        /// Dose amount, e.g. 500
        #[arg(long)]
        amount: f64,

        /// Dose unit, e.g. MG
        #[arg(long)]
        unit: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD); omit for an ongoing prescription
        #[arg(long)]
        end: Option<NaiveDate>,

        /// IANA time zone; defaults to the configured zone
        #[arg(long)]
        time_zone: Option<String>,

        /// Dose slot as DAY@HH:MM or daily@HH:MM (repeatable)
        #[arg(long = "at", required = true)]
        slots: Vec<String>,
    },

    /// Browse the medicine catalog
    Medicines {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Page size; defaults to the configured size
        #[arg(long)]
        size: Option<u32>,

        /// Search text
        #[arg(long)]
        query: Option<String>,

        /// List the whole catalog without paging
        #[arg(long, conflicts_with_all = ["page", "size", "query"])]
        all: bool,
    },

    /// Show one medicine
    Medicine { id: i64 },

    /// Add a medicine to the catalog
    AddMedicine {
        #[arg(long)]
        name: String,

        #[arg(long)]
        generic_name: Option<String>,

        #[arg(long)]
        manufacturer: Option<String>,

        #[arg(long)]
        dosage_form: Option<String>,

        #[arg(long)]
        strength: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Change fields of a catalog medicine (admin); omitted flags keep their value
    EditMedicine {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        generic_name: Option<String>,

        #[arg(long)]
        manufacturer: Option<String>,

        #[arg(long)]
        dosage_form: Option<String>,

        #[arg(long)]
        strength: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        side_effects: Option<String>,

        #[arg(long)]
        contraindications: Option<String>,
    },

    /// Delete a medicine from the catalog
    DeleteMedicine { id: i64 },

    /// List users (admin)
    Users {
        /// Filter by role name
        #[arg(long)]
        role: Option<String>,

        /// Only users whose sole role is the filter role
        #[arg(long, requires = "role")]
        only: bool,
    },

    /// List available roles (admin)
    Roles,

    /// Replace a user's roles (admin)
    SetRoles {
        user_id: i64,

        #[arg(required = true)]
        roles: Vec<String>,
    },

    /// Delete a user (admin)
    DeleteUser { user_id: i64 },
}

fn main() {
    meditrack_core::logging::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let store = SessionStore::new(match &cli.data_dir {
        Some(dir) => dir.join("session.json"),
        None => config.session_path(),
    });
    let mut session = store.load()?;
    let client = MediTrackerClient::new(HttpBackend::new(
        &config.api.base_url,
        config.api.timeout_secs,
    )?);

    match cli.command {
        Commands::Schedule { file } => cmd_schedule(&file),

        Commands::Logout => {
            client.logout(&mut session);
            store.clear()?;
            println!("✓ Signed out");
            Ok(())
        }

        Commands::Whoami => {
            print_session(&session);
            Ok(())
        }

        Commands::Login { email, password } => {
            client.login(&mut session, &LoginRequest { email, password })?;
            store.save(&session)?;
            println!("✓ Signed in");
            if let Some(user) = session.user() {
                println!("  {} <{}> [{}]", user.name, user.email, user.roles());
            }
            Ok(())
        }

        Commands::Prescriptions => {
            let prescriptions = client.list_my_prescriptions(&session)?;
            print_lines(&render_prescriptions(&prescriptions));
            Ok(())
        }

        Commands::Prescribe {
            medicine_id,
            amount,
            unit,
            start,
            end,
            time_zone,
            slots,
        } => {
            let mut schedule = Vec::new();
            for slot in &slots {
                schedule.extend(parse_slot(slot)?);
            }
            let request = PrescriptionRequest {
                medicine_id,
                dosage: Dosage { amount, unit },
                start_date: start,
                end_date: end,
                time_zone: time_zone
                    .unwrap_or_else(|| config.prescriptions.default_time_zone.clone()),
                schedule,
            };
            let lines = format_schedule(&request.schedule);
            client.create_prescription(&session, request)?;
            println!("✓ Prescription created");
            for line in lines {
                println!("  • {}", line);
            }
            Ok(())
        }

        Commands::Medicines { all: true, .. } => {
            print_medicine_table(&client.list_medicines(&session)?);
            Ok(())
        }

        Commands::Medicines {
            page, size, query, ..
        } => {
            let query = MedicineQuery::new(
                page,
                size.unwrap_or(config.display.page_size),
                query.as_deref(),
            )?;
            let listing = client.medicines_paged(&session, &query)?;
            print_medicine_table(&listing.content);
            println!();
            println!("{}", listing.summary());
            if listing.has_next() {
                println!("Next page: --page {}", listing.page + 1);
            }
            Ok(())
        }

        Commands::Medicine { id } => {
            let medicine = client.get_medicine(&session, id)?;
            print_medicine_details(&medicine);
            Ok(())
        }

        Commands::AddMedicine {
            name,
            generic_name,
            manufacturer,
            dosage_form,
            strength,
            description,
        } => {
            let medicine = Medicine {
                name,
                generic_name,
                manufacturer,
                dosage_form,
                strength,
                description,
                ..Default::default()
            };
            let created = client.create_medicine(&session, &medicine)?;
            match created.id {
                Some(id) => println!("✓ Added {} (id {})", created.name, id),
                None => println!("✓ Added {}", created.name),
            }
            Ok(())
        }

        Commands::EditMedicine {
            id,
            name,
            generic_name,
            manufacturer,
            dosage_form,
            strength,
            description,
            side_effects,
            contraindications,
        } => {
            let mut medicine = client.get_medicine(&session, id)?;
            if let Some(name) = name {
                medicine.name = name;
            }
            medicine.generic_name = generic_name.or(medicine.generic_name);
            medicine.manufacturer = manufacturer.or(medicine.manufacturer);
            medicine.dosage_form = dosage_form.or(medicine.dosage_form);
            medicine.strength = strength.or(medicine.strength);
            medicine.description = description.or(medicine.description);
            medicine.side_effects = side_effects.or(medicine.side_effects);
            medicine.contraindications = contraindications.or(medicine.contraindications);

            let updated = client.update_medicine(&session, id, &medicine)?;
            println!("✓ Updated {} (id {})", updated.name, id);
            Ok(())
        }

        Commands::DeleteMedicine { id } => {
            client.delete_medicine(&session, id)?;
            println!("✓ Medicine {} deleted", id);
            Ok(())
        }

        Commands::Users { role, only } => {
            let users = client.list_users(&session, role.as_deref(), only)?;
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            println!("{:<6} {:<24} {:<32} {}", "ID", "NAME", "EMAIL", "ROLES");
            for user in &users {
                println!(
                    "{:<6} {:<24} {:<32} {}",
                    user.user_id, user.name, user.email, user.role
                );
            }
            Ok(())
        }

        Commands::Roles => {
            for role in client.list_roles(&session)? {
                println!("{}", role);
            }
            Ok(())
        }

        Commands::SetRoles { user_id, roles } => {
            client.update_user_roles(&session, user_id, &roles)?;
            println!("✓ User roles updated successfully");
            Ok(())
        }

        Commands::DeleteUser { user_id } => {
            client.delete_user(&session, user_id)?;
            println!("✓ User deleted successfully");
            Ok(())
        }
    }
}

fn cmd_schedule(file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)?;
    let prescriptions: Vec<Prescription> = serde_json::from_str(&contents)?;
    tracing::info!("Rendering {} prescriptions from {:?}", prescriptions.len(), file);
    print_lines(&render_prescriptions(&prescriptions));
    Ok(())
}

fn print_session(session: &SessionContext) {
    if !session.is_authenticated() {
        println!("Not logged in.");
        return;
    }

    match session.user() {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            println!("  User ID: {}", user.user_id);
            println!("  Roles: {}", session.roles());
        }
        None => println!("Signed in (profile not provided by the backend)"),
    }
}

fn print_lines(lines: &[String]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        // A closed pipe just ends the listing
        if writeln!(out, "{}", line).is_err() {
            break;
        }
    }
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

fn print_medicine_table(medicines: &[Medicine]) {
    if medicines.is_empty() {
        println!("No medicines found.");
        return;
    }
    println!(
        "{:<6} {:<24} {:<24} {:<20} {:<12} {}",
        "ID", "NAME", "GENERIC NAME", "MANUFACTURER", "FORM", "STRENGTH"
    );
    for medicine in medicines {
        let id = medicine.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "{:<6} {:<24} {:<24} {:<20} {:<12} {}",
            id,
            medicine.name,
            or_na(&medicine.generic_name),
            or_na(&medicine.manufacturer),
            or_na(&medicine.dosage_form),
            or_na(&medicine.strength)
        );
    }
}

fn print_medicine_details(medicine: &Medicine) {
    println!("{}", medicine.name);
    println!("  Generic name: {}", or_na(&medicine.generic_name));
    println!("  Manufacturer: {}", or_na(&medicine.manufacturer));
    println!("  Dosage form: {}", or_na(&medicine.dosage_form));
    println!("  Strength: {}", or_na(&medicine.strength));
    if let Some(description) = &medicine.description {
        println!("  Description: {}", description);
    }
    if let Some(side_effects) = &medicine.side_effects {
        println!("  Side effects: {}", side_effects);
    }
    if let Some(contraindications) = &medicine.contraindications {
        println!("  Contraindications: {}", contraindications);
    }
}
