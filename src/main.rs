use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::builder::{PossibleValue, PossibleValuesParser, TypedValueParser};
use clap::{Args, Parser, Subcommand};

use marketboost::config::StudioConfig;
use marketboost::llm::LlmClient;
use marketboost::llm::types::{ContentGenerator, ContentRequest, ImageGenerator, InlineImage, LlmError};
use marketboost::model::{CopywritingStyle, GeneratedContent, Platform, ProjectId};
use marketboost::services::concept::{self, ConceptId};
use marketboost::services::export::{self, DirectoryArchiver, ExportError};
use marketboost::services::generation::{self, GenerateError};
use marketboost::services::intake::{self, CandidateFile};
use marketboost::services::projects::{self, ProjectError};
use marketboost::services::sections::{
    Clipboard, ClipboardError, SectionKind, StdoutClipboard, copy_section, download_section, sections, strip_markup,
};
use marketboost::state::Studio;
use marketboost::storage::{FileSlot, ProjectStore};

const SETTLE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("llm setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("{0}")]
    Generate(#[from] GenerateError),
    #[error("{0}")]
    Project(#[from] ProjectError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("{0}")]
    Clipboard(#[from] ClipboardError),
    #[error("download failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("no image could be added; every --image was rejected")]
    NoImages,
}

#[derive(Parser, Debug)]
#[command(name = "marketboost", about = "Marketplace listing studio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a listing package from photos and a brief.
    Generate(GenerateArgs),
    Projects(ProjectsCommand),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    platform: Platform,

    #[arg(long, default_value = "natural", value_parser = style_parser())]
    style: CopywritingStyle,

    #[arg(long, default_value = "")]
    materials: String,

    #[arg(long, default_value = "")]
    target_market: String,

    #[arg(long, default_value = "")]
    price: String,

    #[arg(long, default_value = "")]
    brief: String,

    #[arg(long = "image", required = true, help = "Product photo; repeat for more (max 8)")]
    images: Vec<PathBuf>,

    #[arg(long, default_value_t = false, help = "Also render every supporting concept")]
    all_concepts: bool,

    #[arg(long, default_value_t = false)]
    save: bool,

    #[arg(long, default_value_t = false)]
    export: bool,
}

#[derive(Args, Debug)]
struct ProjectsCommand {
    #[command(subcommand)]
    command: ProjectsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProjectsSubcommand {
    List,
    Show {
        id: String,
        /// Print only this section, markup stripped.
        #[arg(long, value_name = "SECTION")]
        copy: Option<SectionKind>,
        /// Write a section to `<export dir>/<Title>.txt`; repeatable.
        #[arg(long = "download", value_name = "SECTION")]
        downloads: Vec<SectionKind>,
    },
    Delete {
        id: String,
        #[arg(long, default_value_t = false)]
        undo: bool,
    },
    Export {
        id: String,
    },
}

/// Slugs as values, display labels as help text.
fn style_parser() -> impl TypedValueParser<Value = CopywritingStyle> {
    PossibleValuesParser::new(CopywritingStyle::ALL.map(|s| PossibleValue::new(s.slug()).help(s.display_label())))
        .try_map(|slug| slug.parse::<CopywritingStyle>())
}

/// Stand-in provider for commands that never call the model.
struct Offline;

fn offline_error() -> LlmError {
    LlmError::MissingApiKey { var: "GEMINI_API_KEY".to_owned() }
}

#[async_trait::async_trait]
impl ContentGenerator for Offline {
    async fn generate_content(&self, _request: &ContentRequest) -> Result<GeneratedContent, LlmError> {
        Err(offline_error())
    }
}

#[async_trait::async_trait]
impl ImageGenerator for Offline {
    async fn generate_image(&self, _instruction: &str, _reference: &InlineImage) -> Result<String, LlmError> {
        Err(offline_error())
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = StudioConfig::from_env();
    let archiver = DirectoryArchiver::new(config.export_dir.clone());
    let store = ProjectStore::new(Arc::new(FileSlot::new(config.data_dir.clone())));

    match cli.command {
        Command::Generate(args) => {
            let llm = Arc::new(LlmClient::from_env()?);
            let studio = Studio::new(config, llm.clone(), llm, store);
            run_generate(&studio, &archiver, args).await
        }
        Command::Projects(cmd) => {
            let offline = Arc::new(Offline);
            let studio = Studio::new(config, offline.clone(), offline, store);
            run_projects(&studio, &archiver, cmd).await
        }
    }
}

async fn run_generate(studio: &Studio, archiver: &DirectoryArchiver, args: GenerateArgs) -> Result<(), CliError> {
    let files = args.images.into_iter().map(CandidateFile::from_path).collect();
    let report = intake::add_images(studio, files).await;
    for err in &report.errors {
        eprintln!("image skipped: {err}");
    }
    if report.accepted == 0 {
        return Err(CliError::NoImages);
    }
    for image in &studio.state.read().await.form.images {
        println!("image {} ({})", image.name(), image.preview().url());
    }

    {
        let mut state = studio.state.write().await;
        let form = &mut state.form;
        form.product_name = args.name;
        form.platform = Some(args.platform);
        form.copywriting_style = args.style;
        form.materials = args.materials;
        form.target_market = args.target_market;
        form.estimated_price = args.price;
        form.additional_brief = args.brief;
    }

    let content = generation::generate(studio).await?;

    if let Some(hero) = concept::wait_settled(studio, ConceptId::Hero, SETTLE_POLL).await {
        println!("{}: {:?}", ConceptId::Hero, hero.status);
    }
    if args.all_concepts {
        for (id, outcome) in concept::start_supporting(studio).await {
            match outcome {
                Ok(_) => println!("{id}: rendered"),
                Err(e) => println!("{id}: {e}"),
            }
        }
    }

    if args.save {
        let id = projects::save_project(studio).await?;
        println!("saved project {id}");
    }
    if args.export {
        let summary = export::export_all(studio, archiver).await?;
        println!(
            "exported {} text and {} image entries to {}",
            summary.text_entries,
            summary.image_entries,
            summary.path.display()
        );
    }

    print_sections(&content)?;
    print_toast(studio).await;
    Ok(())
}

async fn run_projects(studio: &Studio, archiver: &DirectoryArchiver, cmd: ProjectsCommand) -> Result<(), CliError> {
    match cmd.command {
        ProjectsSubcommand::List => {
            let state = studio.state.read().await;
            if state.projects.is_empty() {
                println!("no saved projects");
            }
            for project in &state.projects {
                let result = if project.result.is_some() { "with result" } else { "draft" };
                println!("{}\t{}\t{}\t{result}", project.id, project.timestamp, project.name);
            }
            Ok(())
        }
        ProjectsSubcommand::Show { id, copy, downloads } => {
            projects::load_project(studio, &ProjectId::from(id)).await?;
            print_toast(studio).await;
            let Some(content) = studio.state.read().await.generation.result().cloned() else {
                println!("project has no generated result");
                return Ok(());
            };

            match copy {
                Some(kind) => {
                    if !copy_section(&StdoutClipboard, kind, &content)? {
                        println!("{}: empty", kind.title());
                    }
                }
                None if downloads.is_empty() => print_sections(&content)?,
                None => {}
            }
            for kind in downloads {
                match download_section(kind, &content, &studio.config.export_dir).await? {
                    Some(path) => println!("downloaded {} to {}", kind.title(), path.display()),
                    None => println!("{}: empty, nothing written", kind.title()),
                }
            }
            Ok(())
        }
        ProjectsSubcommand::Delete { id, undo } => {
            let id = ProjectId::from(id);
            projects::delete_project(studio, &id).await?;
            print_toast(studio).await;
            if undo {
                projects::undo_delete(studio, &id).await?;
                print_toast(studio).await;
            }
            tokio::time::sleep(studio.config.undo_window + SETTLE_POLL).await;
            let remaining = studio.store.load();
            println!("{} project(s) in storage", remaining.len());
            Ok(())
        }
        ProjectsSubcommand::Export { id } => {
            let summary = export::export_project(studio, &ProjectId::from(id), archiver).await?;
            println!("exported {} text entries to {}", summary.text_entries, summary.path.display());
            Ok(())
        }
    }
}

fn print_sections(content: &GeneratedContent) -> Result<(), CliError> {
    let clipboard = StdoutClipboard;
    let present = sections(content);
    for section in &present {
        println!("\n== {:02} {} ==", section.kind.ordinal(), section.kind.title());
        clipboard.write_text(&strip_markup(&section.text))?;
    }
    let omitted = SectionKind::ALL.len() - present.len();
    if omitted > 0 {
        println!("\n({omitted} empty section(s) omitted)");
    }
    Ok(())
}

async fn print_toast(studio: &Studio) {
    if let Some(toast) = studio.state.read().await.toast.current() {
        println!("[{:?}] {}", toast.severity, toast.text);
    }
}
