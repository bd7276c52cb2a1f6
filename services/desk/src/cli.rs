use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use permit_desk::config::AppConfig;
use permit_desk::db::{Database, PgBackend};
use permit_desk::desk::ABOUT;
use permit_desk::error::AppError;
use permit_desk::export::ExportFormat;
use permit_desk::forms::{
    ApplicationForm, AuditFilterForm, BulkUpdateForm, CitizenForm, CompleteReviewForm,
    EligibilityForm, PaymentForm, RevenueForm, ReviewStepForm,
};
use permit_desk::views::{ListingView, Lookup};
use permit_desk::{telemetry, Action, Desk, Notice, Notifier, Screen};
use tracing::info;

use crate::console::ConsoleNotifier;
use crate::render::{render, OutputFormat};

#[derive(Parser, Debug)]
#[command(
    name = "permit-desk",
    about = "Administer permits, licenses and reviews against the permit database",
    version
)]
struct Cli {
    /// Override the configured database connection URL
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// How screens are printed
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the headline counters (default command)
    Dashboard,
    /// List the records of one entity
    List {
        #[arg(value_enum)]
        view: ViewArg,
    },
    /// Show the active records that can be selected on forms
    Lookup {
        #[arg(value_enum)]
        kind: LookupArg,
    },
    /// Citizen registration and checks
    Citizen {
        #[command(subcommand)]
        command: CitizenCommand,
    },
    /// Permit applications
    Application {
        #[command(subcommand)]
        command: ApplicationCommand,
    },
    /// Record a payment against an application
    Payment(PaymentArgs),
    /// Department review steps
    Review {
        #[command(subcommand)]
        command: ReviewCommand,
    },
    /// Permit type details
    Permit {
        #[command(subcommand)]
        command: PermitCommand,
    },
    /// Department workload
    Department {
        #[command(subcommand)]
        command: DepartmentCommand,
    },
    /// Issued licenses
    License {
        #[command(subcommand)]
        command: LicenseCommand,
    },
    /// Operational checks and bulk changes
    Ops {
        #[command(subcommand)]
        command: OpsCommand,
    },
    /// Revenue and performance reports
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Write audit logs or whole tables to files
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
    /// Describe this application
    About,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Citizens,
    Applications,
    PermitTypes,
    Departments,
    Licenses,
    ReviewSteps,
    Documents,
    Holidays,
    AuditLogs,
}

impl From<ViewArg> for ListingView {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Citizens => Self::Citizens,
            ViewArg::Applications => Self::Applications,
            ViewArg::PermitTypes => Self::PermitTypes,
            ViewArg::Departments => Self::Departments,
            ViewArg::Licenses => Self::Licenses,
            ViewArg::ReviewSteps => Self::ReviewSteps,
            ViewArg::Documents => Self::Documents,
            ViewArg::Holidays => Self::Holidays,
            ViewArg::AuditLogs => Self::AuditLogs,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LookupArg {
    Citizens,
    PermitTypes,
    Departments,
}

impl From<LookupArg> for Lookup {
    fn from(value: LookupArg) -> Self {
        match value {
            LookupArg::Citizens => Self::ActiveCitizens,
            LookupArg::PermitTypes => Self::ActivePermitTypes,
            LookupArg::Departments => Self::ActiveDepartments,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => Self::Csv,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
enum CitizenCommand {
    /// Register a new citizen
    Register(CitizenArgs),
    /// Calculate a citizen's age
    Age {
        /// Citizen id, or an `id: name` lookup label
        citizen: String,
    },
    /// Check whether a citizen may apply for a permit type
    Eligibility {
        citizen: String,
        #[arg(long, default_value = "")]
        permit_type: String,
    },
}

#[derive(Args, Debug)]
struct CitizenArgs {
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    date_of_birth: String,
    #[arg(long, default_value = "")]
    national_id: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    /// Citizen, Resident or Foreigner
    #[arg(long, default_value = "Citizen")]
    residency: String,
}

#[derive(Subcommand, Debug)]
enum ApplicationCommand {
    /// Submit a new permit application
    Submit {
        #[arg(long, default_value = "")]
        citizen: String,
        #[arg(long, default_value = "")]
        permit_type: String,
        /// Low, Normal, High or Urgent
        #[arg(long, default_value = "Normal")]
        priority: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Show the status summary of an application
    Summary { application: String },
    /// Pay a listed application; the amount defaults to its recorded fee
    Pay {
        application: String,
        #[arg(long, default_value = "")]
        amount: String,
        /// Cash, Mobile Money or Bank Transfer
        #[arg(long, default_value = "Cash")]
        method: String,
    },
}

#[derive(Args, Debug)]
struct PaymentArgs {
    #[arg(long, default_value = "")]
    application: String,
    #[arg(long, default_value = "")]
    amount: String,
    /// Cash, Mobile Money or Bank Transfer
    #[arg(long, default_value = "Cash")]
    method: String,
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
    /// Route an application to a department review step
    Add {
        #[arg(long, default_value = "")]
        application: String,
        #[arg(long, default_value = "")]
        department: String,
        #[arg(long, default_value = "")]
        reviewer: String,
        #[arg(long, default_value = "")]
        comments: String,
    },
    /// Record the decision on a review step
    Complete {
        step: String,
        /// Approved, Rejected or Revision Required
        #[arg(long, default_value = "Approved")]
        decision: String,
        #[arg(long, default_value = "")]
        comments: String,
    },
}

#[derive(Subcommand, Debug)]
enum PermitCommand {
    /// Show the details of a permit type
    Details { permit_type: String },
}

#[derive(Subcommand, Debug)]
enum DepartmentCommand {
    /// Count the reviews waiting on a department
    Pending { department: String },
}

#[derive(Subcommand, Debug)]
enum LicenseCommand {
    /// Calculate the renewal fee of a license
    RenewalFee { license: String },
}

#[derive(Subcommand, Debug)]
enum OpsCommand {
    /// Ask the database whether operations are allowed today
    CheckAllowed,
    /// Move applications that sat in one status too long to another
    BulkUpdate {
        #[arg(long, default_value = "Submitted")]
        from: String,
        #[arg(long, default_value = "Cancelled")]
        to: String,
        /// Days in the current status
        #[arg(long, default_value = "30")]
        days: String,
    },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Paid revenue per month for a year (defaults to the current year)
    MonthlyRevenue {
        #[arg(long, default_value = "")]
        year: String,
    },
    /// Performance score and pending reviews per department
    DepartmentPerformance,
    /// The most requested permit types
    TopPermits,
    /// Total revenue for an optional date range and permit type
    Revenue {
        /// Start date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        start: String,
        /// End date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        end: String,
        #[arg(long, default_value = "")]
        permit_type: String,
    },
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// Export the audit log
    Audit {
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
        /// Destination file; defaults to audit_logs.<format>
        #[arg(long)]
        out: Option<PathBuf>,
        /// Earliest operation date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        from: String,
        /// Latest operation date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        to: String,
        #[arg(long, default_value = "")]
        table: String,
        #[arg(long, default_value = "")]
        operation: String,
    },
    /// Export every table to CSV files in a directory
    All {
        #[arg(long, default_value = "export")]
        dir: PathBuf,
    },
}

impl Command {
    fn into_action(self) -> Action {
        match self {
            Command::Dashboard => Action::Dashboard,
            Command::List { view } => Action::List(view.into()),
            Command::Lookup { kind } => Action::Lookup(kind.into()),
            Command::Citizen { command } => match command {
                CitizenCommand::Register(args) => Action::RegisterCitizen(CitizenForm {
                    first_name: args.first_name,
                    last_name: args.last_name,
                    date_of_birth: args.date_of_birth,
                    national_id: args.national_id,
                    email: args.email,
                    phone: args.phone,
                    address: args.address,
                    residency: args.residency,
                }),
                CitizenCommand::Age { citizen } => Action::CitizenAge { citizen },
                CitizenCommand::Eligibility {
                    citizen,
                    permit_type,
                } => Action::CheckEligibility(EligibilityForm {
                    citizen,
                    permit_type,
                }),
            },
            Command::Application { command } => match command {
                ApplicationCommand::Submit {
                    citizen,
                    permit_type,
                    priority,
                    notes,
                } => Action::SubmitApplication(ApplicationForm {
                    citizen,
                    permit_type,
                    priority,
                    notes,
                }),
                ApplicationCommand::Summary { application } => {
                    Action::ApplicationSummary { application }
                }
                ApplicationCommand::Pay {
                    application,
                    amount,
                    method,
                } => Action::PayApplication(PaymentForm {
                    application,
                    amount,
                    method,
                }),
            },
            Command::Payment(args) => Action::ProcessPayment(PaymentForm {
                application: args.application,
                amount: args.amount,
                method: args.method,
            }),
            Command::Review { command } => match command {
                ReviewCommand::Add {
                    application,
                    department,
                    reviewer,
                    comments,
                } => Action::AddReviewStep(ReviewStepForm {
                    application,
                    department,
                    reviewer_name: reviewer,
                    comments,
                }),
                ReviewCommand::Complete {
                    step,
                    decision,
                    comments,
                } => Action::CompleteReviewStep(CompleteReviewForm {
                    step,
                    decision,
                    comments,
                }),
            },
            Command::Permit {
                command: PermitCommand::Details { permit_type },
            } => Action::PermitDetails { permit_type },
            Command::Department {
                command: DepartmentCommand::Pending { department },
            } => Action::PendingReviews { department },
            Command::License {
                command: LicenseCommand::RenewalFee { license },
            } => Action::RenewalFee { license },
            Command::Ops { command } => match command {
                OpsCommand::CheckAllowed => Action::CheckOperationAllowed,
                OpsCommand::BulkUpdate { from, to, days } => {
                    Action::BulkUpdateStatus(BulkUpdateForm { from, to, days })
                }
            },
            Command::Report { command } => match command {
                ReportCommand::MonthlyRevenue { year } => Action::MonthlyRevenue { year },
                ReportCommand::DepartmentPerformance => Action::DepartmentPerformance,
                ReportCommand::TopPermits => Action::TopPermitTypes,
                ReportCommand::Revenue {
                    start,
                    end,
                    permit_type,
                } => Action::CalculateRevenue(RevenueForm {
                    start,
                    end,
                    permit_type,
                }),
            },
            Command::Export { command } => match command {
                ExportCommand::Audit {
                    format,
                    out,
                    from,
                    to,
                    table,
                    operation,
                } => {
                    let format = ExportFormat::from(format);
                    let path = out.unwrap_or_else(|| {
                        PathBuf::from(format!("audit_logs.{}", format.extension()))
                    });
                    Action::ExportAuditLog {
                        format,
                        path,
                        filter: AuditFilterForm {
                            from,
                            to,
                            table_name: table,
                            operation,
                        },
                    }
                }
                ExportCommand::All { dir } => Action::ExportAll { dir },
            },
            Command::About => Action::About,
        }
    }
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let action = cli.command.unwrap_or(Command::Dashboard).into_action();
    if action == Action::About {
        let about = Screen::Text {
            title: "About".to_string(),
            body: ABOUT.to_string(),
        };
        println!("{}", render(&about, cli.output));
        return Ok(());
    }
    let notifier = ConsoleNotifier;

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.database_url {
        config.database.url = Some(url);
    }
    telemetry::init(&config.telemetry)?;

    let backend = match PgBackend::connect(&config.database.url()) {
        Ok(backend) => backend,
        Err(err) => {
            notifier.notify(Notice::error("Connection Error", err.to_string()));
            notifier.notify(Notice::error("Fatal Error", "Cannot start without database"));
            return Err(err.into());
        }
    };
    info!(environment = ?config.environment, action = action.name(), "permit desk connected");

    let mut desk = Desk::new(
        Database::open(backend, notifier),
        config.audit_limit,
        Local::now().date_naive(),
    );
    let screen = desk.perform(action);
    let output = render(&screen, cli.output);
    if !output.is_empty() {
        println!("{output}");
    }
    desk.close()?;
    Ok(())
}
