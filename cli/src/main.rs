mod members;


use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::Level;

use archsketch::auth::StaticAuth;
use archsketch::config::{DEFAULT_DATA_DIR, DEFAULT_USER, SyncConfig};
use archsketch::editor::{Editor, EditorError, ExportedFile};
use archsketch::store::{DocumentStore, FileStore, StoreError};
use archsketch::sync::SyncStatus;
use archsketch::templates::{self, TemplateError};
use canvas::camera::{Camera, Point};
use canvas::doc::{ConnectRejection, ConnectionKind, Diagram};
use canvas::engine::Action;
use canvas::hit;
use canvas::size::NodeSizes;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Member(#[from] members::MemberError),
    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown connection type `{0}`; expected one of uses, extends, contains, creates, related")]
    UnknownKind(String),
    #[error("class name must not be blank")]
    BlankClassName,
    #[error("no class named or with id `{0}`")]
    UnknownClass(String),
    #[error("connection refused: {0}")]
    Connection(&'static str),
    #[error("sync failed: {0}")]
    Sync(String),
}

#[derive(Parser, Debug)]
#[command(name = "archsketch", about = "Game architecture diagrams from the command line")]
struct Cli {
    #[arg(long, env = "ARCHSKETCH_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[arg(long, env = "ARCHSKETCH_USER", default_value = DEFAULT_USER)]
    user: String,

    /// Log progress to stderr (repeat for more detail).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Diagram(DiagramCommand),
    Class(ClassCommand),
    /// Connect two classes.
    Connect(ConnectArgs),
    Template(TemplateCommand),
    Category(CategoryCommand),
    Export(ExportCommand),
    /// Import a diagram JSON file as a new diagram.
    Import {
        file: PathBuf,
    },
    /// Print the routed SVG path of every connection.
    Routes {
        #[arg(long)]
        diagram: Option<String>,
    },
}

#[derive(Args, Debug)]
struct DiagramCommand {
    #[command(subcommand)]
    command: DiagramSubcommand,
}

#[derive(Subcommand, Debug)]
enum DiagramSubcommand {
    List,
    Show {
        diagram_id: String,
    },
    New {
        name: String,
    },
    Rename {
        diagram_id: String,
        name: String,
    },
    Duplicate {
        diagram_id: String,
    },
    Delete {
        diagram_id: String,
    },
}

#[derive(Args, Debug)]
struct ClassCommand {
    #[command(subcommand)]
    command: ClassSubcommand,
}

#[derive(Subcommand, Debug)]
enum ClassSubcommand {
    Add(ClassAddArgs),
    Delete {
        class: String,
        #[arg(long)]
        diagram: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ClassAddArgs {
    name: String,

    #[arg(long)]
    diagram: Option<String>,

    #[arg(long, default_value = "")]
    category: String,

    #[arg(long, requires = "y", help = "World position x; defaults to the spawn point")]
    x: Option<f64>,

    #[arg(long, requires = "x", help = "World position y; defaults to the spawn point")]
    y: Option<f64>,

    #[arg(long = "property", help = "name:type, optional leading + - #")]
    properties: Vec<String>,

    #[arg(long = "method", help = "name(params):returnType, optional leading + - #")]
    methods: Vec<String>,
}

#[derive(Args, Debug)]
struct ConnectArgs {
    from: String,
    to: String,

    #[arg(long, default_value = "related")]
    kind: String,

    #[arg(long, default_value = "")]
    label: String,

    #[arg(long)]
    diagram: Option<String>,
}

#[derive(Args, Debug)]
struct TemplateCommand {
    #[command(subcommand)]
    command: TemplateSubcommand,
}

#[derive(Subcommand, Debug)]
enum TemplateSubcommand {
    List,
    Apply {
        key: String,
        #[arg(long)]
        diagram: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CategoryCommand {
    #[command(subcommand)]
    command: CategorySubcommand,
}

#[derive(Subcommand, Debug)]
enum CategorySubcommand {
    Add {
        name: String,
        #[arg(long)]
        diagram: Option<String>,
    },
    Remove {
        name: String,
        #[arg(long)]
        diagram: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ExportCommand {
    #[command(subcommand)]
    format: ExportFormat,
}

#[derive(Subcommand, Debug)]
enum ExportFormat {
    Json(ExportArgs),
    Code(ExportArgs),
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    diagram: Option<String>,

    #[arg(long, help = "Directory to write into; stdout when absent")]
    out: Option<PathBuf>,
}

struct CliContext {
    store: Arc<FileStore>,
    user: String,
}

impl CliContext {
    /// Editor over the file store, positioned on `diagram` (or the most
    /// recently modified one).
    async fn editor(&self, diagram: Option<&str>) -> Result<Editor, CliError> {
        let auth = StaticAuth::signed_in(&self.user);
        let mut editor = Editor::open(&auth, self.store.clone(), SyncConfig::from_env()).await?;
        if let Some(id) = diagram {
            editor.switch_diagram(id)?;
        }
        Ok(editor)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();

    let ctx = CliContext { store: Arc::new(FileStore::new(cli.data_dir)), user: cli.user };

    match cli.command {
        Command::Diagram(diagram) => run_diagram(&ctx, diagram).await,
        Command::Class(class) => run_class(&ctx, class).await,
        Command::Connect(args) => run_connect(&ctx, args).await,
        Command::Template(template) => run_template(&ctx, template).await,
        Command::Category(category) => run_category(&ctx, category).await,
        Command::Export(export) => run_export(&ctx, export).await,
        Command::Import { file } => {
            let json = tokio::fs::read_to_string(&file).await?;
            let mut editor = ctx.editor(None).await?;
            let report = editor.import_json(&json).await?;
            if report.dropped_classes > 0 || report.dropped_connections > 0 {
                eprintln!(
                    "repaired: dropped {} duplicate classes, {} invalid connections",
                    report.dropped_classes, report.dropped_connections
                );
            }
            println!("{}", editor.workspace().current_id());
            Ok(())
        }
        Command::Routes { diagram } => {
            let editor = ctx.editor(diagram.as_deref()).await?;
            print_routes(&editor.engine().doc);
            Ok(())
        }
    }
}

async fn run_diagram(ctx: &CliContext, diagram: DiagramCommand) -> Result<(), CliError> {
    match diagram.command {
        DiagramSubcommand::List => {
            for d in ctx.store.list(&ctx.user).await? {
                println!("{}\t{}\t{} classes\t{}", d.id, d.name, d.classes.len(), d.last_modified);
            }
            Ok(())
        }
        DiagramSubcommand::Show { diagram_id } => {
            let d = ctx.store.get(&diagram_id).await?;
            println!("{}", serde_json::to_string_pretty(&d)?);
            Ok(())
        }
        DiagramSubcommand::New { name } => {
            let mut editor = ctx.editor(None).await?;
            let id = editor.create_diagram(&name).await?;
            println!("{id}");
            Ok(())
        }
        DiagramSubcommand::Rename { diagram_id, name } => {
            let mut editor = ctx.editor(None).await?;
            editor.rename_diagram(&diagram_id, &name)?;
            finish(&editor).await
        }
        DiagramSubcommand::Duplicate { diagram_id } => {
            let mut editor = ctx.editor(None).await?;
            let id = editor.duplicate_diagram(&diagram_id).await?;
            println!("{id}");
            Ok(())
        }
        DiagramSubcommand::Delete { diagram_id } => {
            let mut editor = ctx.editor(None).await?;
            editor.delete_diagram(&diagram_id).await?;
            Ok(())
        }
    }
}

async fn run_class(ctx: &CliContext, class: ClassCommand) -> Result<(), CliError> {
    match class.command {
        ClassSubcommand::Add(args) => {
            let properties = args.properties.iter().map(|p| members::parse_property(p)).collect::<Result<Vec<_>, _>>()?;
            let methods = args.methods.iter().map(|m| members::parse_method(m)).collect::<Result<Vec<_>, _>>()?;

            if args.name.trim().is_empty() {
                return Err(CliError::BlankClassName);
            }

            let mut editor = ctx.editor(args.diagram.as_deref()).await?;
            let actions = editor.engine_mut().add_class(&args.name, &args.category);
            editor.dispatch(&actions);
            let Some(mut node) = editor.engine().active().cloned() else {
                return Err(CliError::UnknownClass(args.name));
            };

            node.properties = properties;
            node.methods = methods;
            if let (Some(x), Some(y)) = (args.x, args.y) {
                node.position = Point::new(x, y);
            }
            let id = node.id.clone();
            let actions = editor.engine_mut().update_class(node);
            editor.dispatch(&actions);
            finish(&editor).await?;
            println!("{id}");
            Ok(())
        }
        ClassSubcommand::Delete { class, diagram } => {
            let mut editor = ctx.editor(diagram.as_deref()).await?;
            let id = resolve_class(&editor.engine().doc, &class)?;
            let actions = editor.engine_mut().delete_class(&id);
            editor.dispatch(&actions);
            finish(&editor).await
        }
    }
}

async fn run_connect(ctx: &CliContext, args: ConnectArgs) -> Result<(), CliError> {
    let kind = ConnectionKind::parse(&args.kind).ok_or_else(|| CliError::UnknownKind(args.kind.clone()))?;
    let mut editor = ctx.editor(args.diagram.as_deref()).await?;
    let from = resolve_class(&editor.engine().doc, &args.from)?;
    let to = resolve_class(&editor.engine().doc, &args.to)?;

    let conn = editor.engine_mut().doc.add_connection(&from, &to, kind, args.label).map_err(|rejection| {
        CliError::Connection(match rejection {
            ConnectRejection::SelfLoop => "a class cannot connect to itself",
            ConnectRejection::MissingEndpoint => "endpoint does not exist",
            ConnectRejection::Duplicate => "these classes are already connected",
        })
    })?;
    let id = conn.id.clone();
    editor.dispatch(&[Action::ConnectionCreated(conn)]);
    finish(&editor).await?;
    println!("{id}");
    Ok(())
}

async fn run_template(ctx: &CliContext, template: TemplateCommand) -> Result<(), CliError> {
    match template.command {
        TemplateSubcommand::List => {
            for t in templates::builtin()? {
                println!("{}\t{}\t{} classes\t{}", t.key, t.name, t.classes.len(), t.description);
            }
            Ok(())
        }
        TemplateSubcommand::Apply { key, diagram } => {
            let mut editor = ctx.editor(diagram.as_deref()).await?;
            editor.apply_template(&key)?;
            finish(&editor).await
        }
    }
}

async fn run_category(ctx: &CliContext, category: CategoryCommand) -> Result<(), CliError> {
    let (name, diagram, add) = match category.command {
        CategorySubcommand::Add { name, diagram } => (name, diagram, true),
        CategorySubcommand::Remove { name, diagram } => (name, diagram, false),
    };
    let mut editor = ctx.editor(diagram.as_deref()).await?;
    if add {
        editor.add_category(&name)?;
    } else {
        editor.remove_category(&name)?;
    }
    println!("{}", editor.workspace().current().categories.join(", "));
    finish(&editor).await
}

async fn run_export(ctx: &CliContext, export: ExportCommand) -> Result<(), CliError> {
    let (args, code) = match export.format {
        ExportFormat::Json(args) => (args, false),
        ExportFormat::Code(args) => (args, true),
    };
    let editor = ctx.editor(args.diagram.as_deref()).await?;
    let file = if code { editor.export_code()? } else { editor.export_json()? };
    write_export(file, args.out).await
}

async fn write_export(file: ExportedFile, out: Option<PathBuf>) -> Result<(), CliError> {
    match out {
        Some(dir) => {
            tokio::fs::create_dir_all(&dir).await?;
            let path = dir.join(&file.file_name);
            tokio::fs::write(&path, file.content).await?;
            println!("{}", path.display());
        }
        None => print!("{}", file.content),
    }
    Ok(())
}

/// Write pending edits and surface a sync failure as an error.
async fn finish(editor: &Editor) -> Result<(), CliError> {
    match editor.flush().await {
        SyncStatus::Error(message) => Err(CliError::Sync(message)),
        _ => Ok(()),
    }
}

/// Accept either a class id or an exact class name.
fn resolve_class(doc: &Diagram, key: &str) -> Result<String, CliError> {
    doc.node(key)
        .or_else(|| doc.classes.iter().find(|c| c.name == key))
        .map(|c| c.id.clone())
        .ok_or_else(|| CliError::UnknownClass(key.to_string()))
}

fn print_routes(doc: &Diagram) {
    let sizes = NodeSizes::default();
    let camera = Camera::default();
    for (conn, route) in hit::routes(doc, &sizes, &camera) {
        let name = |id: &str| doc.node(id).map_or_else(|| id.to_string(), |n| n.name.clone());
        println!("{} -> {} ({})\t{}", name(&conn.from), name(&conn.to), conn.kind.label(), route.svg_path());
    }
}
