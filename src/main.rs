use campaign_kit::commands::{brand_kit, deck, diagram, drive, email, evidence, image, init, rfp};
use campaign_kit::config::Config;
use campaign_kit::mcp;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ckit")]
#[command(about = "Campaign and proposal toolkit - images, decks, diagrams, RFPs, Drive and Gmail", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workspace layout and a default campaign-kit.toml
    Init,

    /// Manage brand kits
    BrandKit {
        #[command(subcommand)]
        action: BrandKitAction,
    },

    /// Render a Mermaid file to an interactive HTML diagram
    Diagram {
        /// Mermaid source file
        input: PathBuf,

        /// Output HTML file
        #[arg(short, long, default_value = "diagram.html")]
        output: PathBuf,

        /// Diagram title
        #[arg(short, long, default_value = "Flow Diagram")]
        title: String,

        /// Mermaid theme: default, forest, dark, neutral, base
        #[arg(long, default_value = "default")]
        theme: String,

        /// Background colour (overrides --brand-kit)
        #[arg(short, long)]
        background: Option<String>,

        /// Custom HTML template
        #[arg(long)]
        template: Option<PathBuf>,

        /// Use the brand kit's primary colour as background
        #[arg(long)]
        brand_kit: Option<String>,
    },

    /// Build an HTML slide deck from a JSON description
    Deck {
        /// Deck JSON file
        input: PathBuf,

        /// Output directory (default: outputs/presentations)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Brand kit to style the deck with
        #[arg(long)]
        brand_kit: Option<String>,
    },

    /// Work with RFP documents
    Rfp {
        #[command(subcommand)]
        action: RfpAction,
    },

    /// Generate an image from a prompt
    Image {
        /// Image prompt
        prompt: String,

        /// Output file stem
        #[arg(short, long)]
        filename: String,

        /// 1:1, 2:3 or 3:2
        #[arg(short, long, default_value = "1:1")]
        aspect_ratio: String,

        /// Upload the result to this Drive folder type
        #[arg(long)]
        upload: Option<String>,
    },

    /// Google Drive uploads
    Drive {
        #[command(subcommand)]
        action: DriveAction,
    },

    /// Send email through Gmail
    Email {
        #[command(subcommand)]
        action: EmailAction,
    },

    /// Search case studies, bios and certifications
    Evidence {
        /// Filters as key=value (case-insensitive substring)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Start MCP server on stdio for tool integration
    Serve,
}

#[derive(Subcommand)]
enum BrandKitAction {
    /// Create or replace a brand kit
    Create {
        name: String,
        #[arg(long)]
        primary: String,
        #[arg(long)]
        secondary: String,
        #[arg(long)]
        accent: String,
        #[arg(long, default_value = "Inter")]
        headline_font: String,
        #[arg(long, default_value = "Inter")]
        body_font: String,
        #[arg(long)]
        logo: Option<String>,
        #[arg(long)]
        watermark: Option<String>,
    },
    /// List brand kits
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a brand kit
    Delete { name: String },
}

#[derive(Subcommand)]
enum RfpAction {
    /// Show the page map of an RFP text file
    Ingest {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Extract obligation sentences as requirements
    Extract {
        file: PathBuf,
        #[arg(long)]
        json: bool,
        /// Write a compliance matrix CSV
        #[arg(long)]
        matrix: Option<PathBuf>,
    },
    /// Find similar prior passages for each requirement
    Similar {
        file: PathBuf,
        #[arg(long)]
        top_k: Option<usize>,
        /// Metadata filters as key=value
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Embed and upsert records from a JSON array into the vector index
    Index { records: PathBuf },
    /// Write deliverables.json and the compliance matrix
    Package {
        file: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Section title (repeatable)
        #[arg(long = "section")]
        sections: Vec<String>,
        /// Annex name (repeatable)
        #[arg(long = "annex")]
        annexes: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DriveAction {
    /// Create the folder layout
    Setup,
    /// Upload a file into a content-type folder
    Upload {
        file: PathBuf,
        /// blog_posts, social_posts, images, videos, pdfs, presentations, emails
        #[arg(long)]
        folder: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(clap::Args)]
struct MessageArgs {
    #[arg(long)]
    subject: String,
    /// File holding the message body
    #[arg(long)]
    body_file: PathBuf,
    /// Attachment path (repeatable)
    #[arg(long = "attach")]
    attachments: Vec<PathBuf>,
    /// Send as plain text instead of HTML
    #[arg(long)]
    plain: bool,
}

impl From<MessageArgs> for email::EmailArgs {
    fn from(args: MessageArgs) -> Self {
        Self {
            subject: args.subject,
            body_file: args.body_file,
            attachments: args.attachments,
            plain: args.plain,
        }
    }
}

#[derive(Subcommand)]
enum EmailAction {
    /// Send one message
    Send {
        #[arg(long)]
        to: String,
        #[command(flatten)]
        message: MessageArgs,
        /// Create a draft instead of sending
        #[arg(long)]
        draft: bool,
    },
    /// Send the same message to a comma-separated list, paced and within the daily limit
    Campaign {
        #[arg(long)]
        to: String,
        #[command(flatten)]
        message: MessageArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "campaign_kit=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return init::init_command();
    }
    let config = Config::load_default()?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::BrandKit { action } => {
            let store = &config.paths.brand_kits;
            match action {
                BrandKitAction::Create {
                    name,
                    primary,
                    secondary,
                    accent,
                    headline_font,
                    body_font,
                    logo,
                    watermark,
                } => brand_kit::create_command(
                    store,
                    brand_kit::CreateArgs {
                        name,
                        primary,
                        secondary,
                        accent,
                        headline_font,
                        body_font,
                        logo,
                        watermark,
                    },
                ),
                BrandKitAction::List { json } => brand_kit::list_command(store, json),
                BrandKitAction::Delete { name } => brand_kit::delete_command(store, &name),
            }
        }
        Commands::Diagram {
            input,
            output,
            title,
            theme,
            background,
            template,
            brand_kit,
        } => diagram::diagram_command(
            &config.paths.brand_kits,
            diagram::DiagramArgs {
                input,
                output,
                title,
                theme,
                background,
                template,
                brand_kit,
            },
        ),
        Commands::Deck {
            input,
            output_dir,
            brand_kit,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| config.presentations_dir());
            deck::deck_command(
                &input,
                &output_dir,
                &config.paths.brand_kits,
                brand_kit.as_deref(),
            )
        }
        Commands::Rfp { action } => match action {
            RfpAction::Ingest { file, json } => rfp::ingest_command(&file, json),
            RfpAction::Extract { file, json, matrix } => {
                rfp::extract_command(&file, json, matrix.as_deref())
            }
            RfpAction::Similar {
                file,
                top_k,
                filters,
                json,
            } => rfp::similar_command(&config, &file, top_k, &filters, json).await,
            RfpAction::Index { records } => rfp::index_command(&config, &records).await,
            RfpAction::Package {
                file,
                out,
                sections,
                annexes,
            } => rfp::package_command(&file, &out, &sections, &annexes),
        },
        Commands::Image {
            prompt,
            filename,
            aspect_ratio,
            upload,
        } => image::image_command(&config, prompt, filename, &aspect_ratio, upload.as_deref()).await,
        Commands::Drive { action } => match action {
            DriveAction::Setup => drive::setup_command(&config).await,
            DriveAction::Upload {
                file,
                folder,
                description,
            } => drive::upload_command(&config, &file, &folder, description.as_deref()).await,
        },
        Commands::Email { action } => match action {
            EmailAction::Send { to, message, draft } => {
                email::send_command(&config, &to, &message.into(), draft).await
            }
            EmailAction::Campaign { to, message } => {
                email::campaign_command(&config, &to, &message.into()).await
            }
        },
        Commands::Evidence { filters } => evidence::search_command(&config.paths.evidence, &filters),
        Commands::Serve => mcp::serve(config).await,
    }
}
