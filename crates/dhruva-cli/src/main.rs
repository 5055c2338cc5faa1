mod commands;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dhruva", about = "Grievance triage: root causes, resolution templates, SLA tracking", version)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a DHRUVA repository with the default config and reference data
    Init,

    /// Load and check the config and reference data
    Validate,

    /// Register a new grievance
    File {
        /// Grievance text as the citizen wrote it
        description: String,

        /// District code used in the case id
        #[arg(long, default_value = "GTR")]
        district: String,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        citizen_phone: Option<String>,

        /// Citizen's preferred language (te, en)
        #[arg(long, default_value = "te")]
        language: String,

        /// Filing time (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long, value_parser = commands::parse_time)]
        filed_at: Option<DateTime<Utc>>,
    },

    /// Classify a case with the configured classifier, or set the root cause by hand
    Classify {
        /// Case id
        id: String,

        /// Operator decision; skips the classifier
        #[arg(long)]
        root_cause: Option<String>,

        /// Department to record with an operator decision
        #[arg(long)]
        department: Option<String>,
    },

    /// List the clarifying questions still open for a case
    Questions {
        /// Case id
        id: String,

        /// Language for question text (defaults to the citizen's)
        #[arg(long)]
        language: Option<String>,
    },

    /// Record a citizen's answer to a clarifying question
    Answer {
        /// Case id
        id: String,

        /// Question id
        question: u32,

        /// Answer text; comma separated for multiple choice
        value: String,
    },

    /// Recommend a resolution template for a case or an ad-hoc key
    Recommend {
        /// Case id; omit to look up by the flags below
        id: Option<String>,

        #[arg(long)]
        root_cause: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Apply a resolution template and run its action steps
    Apply {
        /// Case id
        id: String,

        /// Template key (defaults to the recommended template)
        #[arg(long)]
        template: Option<String>,

        /// Acting officer (defaults to $DHRUVA_OFFICER)
        #[arg(long)]
        officer: Option<String>,
    },

    /// Mark a case resolved
    Resolve {
        /// Case id
        id: String,

        #[arg(long, default_value = "")]
        note: String,

        /// Acting officer (defaults to $DHRUVA_OFFICER)
        #[arg(long)]
        officer: Option<String>,
    },

    /// Advance SLA state on every open case and queue notifications
    SlaCheck {
        /// Evaluation time (RFC 3339 or YYYY-MM-DD); defaults to now
        #[arg(long, value_parser = commands::parse_time)]
        at: Option<DateTime<Utc>>,
    },

    /// Show one case
    Show {
        /// Case id
        id: String,
    },

    /// List cases, newest first
    List {
        /// Filter by status (registered, clarifying, in_progress, resolved, escalated)
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        root_cause: Option<String>,

        /// Only cases that are not resolved
        #[arg(long)]
        open: bool,
    },

    /// Show the operator queue, oldest first
    Queue {
        #[arg(long, value_enum)]
        reason: Option<QueueArg>,
    },

    /// List active resolution templates, best first
    Templates {
        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        root_cause: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QueueArg {
    Manual,
    NoTemplate,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DHRUVA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Init => commands::init::run(cli.json),
        Commands::Validate => commands::validate::run(cli.json),
        Commands::File {
            description,
            district,
            department,
            category,
            citizen_phone,
            language,
            filed_at,
        } => commands::file::run(
            commands::file::FileArgs {
                description,
                district,
                department,
                category,
                citizen_phone,
                language,
                filed_at,
            },
            cli.json,
        ),
        Commands::Classify {
            id,
            root_cause,
            department,
        } => commands::classify::run(id, root_cause, department, cli.json),
        Commands::Questions { id, language } => commands::questions::run(id, language, cli.json),
        Commands::Answer {
            id,
            question,
            value,
        } => commands::answer::run(id, question, value, cli.json),
        Commands::Recommend {
            id,
            root_cause,
            department,
            category,
        } => commands::recommend::run(id, root_cause, department, category, cli.json),
        Commands::Apply {
            id,
            template,
            officer,
        } => commands::apply::run(id, template, officer, cli.json),
        Commands::Resolve { id, note, officer } => {
            commands::resolve::run(id, note, officer, cli.json)
        }
        Commands::SlaCheck { at } => commands::sla_check::run(at, cli.json),
        Commands::Show { id } => commands::show::run(id, cli.json),
        Commands::List {
            status,
            department,
            root_cause,
            open,
        } => commands::list::cases(status, department, root_cause, open, cli.json),
        Commands::Queue { reason } => {
            let reason = reason.map(|r| match r {
                QueueArg::Manual => dhruva_core::case::QueueReason::ManualClassification,
                QueueArg::NoTemplate => dhruva_core::case::QueueReason::NoTemplateFound,
            });
            commands::list::queue(reason, cli.json)
        }
        Commands::Templates {
            department,
            category,
            root_cause,
        } => commands::templates::run(department, category, root_cause, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
