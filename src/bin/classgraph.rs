//! Binary entry point for the classgraph command-line tool.
#![forbid(unsafe_code)]

#[path = "classgraph/ui.rs"]
mod ui;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use classgraph::{
    logging::init_logging, ClassOptions, Config, DataNodeFilter, DuplicatePolicy, LinkEnd,
    LinkImportOptions, MemoryGraph, NodeId, NodeImportOptions, Schema, SchemaError, SortOrder,
    Table, TreeImportOptions,
};
use serde::Serialize;
use tracing::{debug, warn};
use ui::{Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "classgraph",
    version,
    about = "Schema management and bulk import for a class-typed property graph",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "CLASSGRAPH_DB",
        help = "Graph snapshot file (created on first write)"
    )]
    db: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILE", help = "Configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "FILTER",
        help = "Tracing filter, e.g. info or classgraph=debug"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ThemeArg::Auto,
        help = "Color theme for text output"
    )]
    theme: ThemeArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand, about = "Manage Classes, Properties and relationships")]
    Class(ClassCmd),

    #[command(subcommand, about = "Manage namespace counters")]
    Namespace(NamespaceCmd),

    #[command(subcommand, about = "Bulk import data nodes and relationships")]
    Import(ImportCmd),

    #[command(subcommand, about = "Inspect data nodes")]
    Node(NodeCmd),
}

#[derive(Subcommand, Debug)]
enum ClassCmd {
    #[command(about = "Create a Class")]
    Create(CreateClassCmd),

    #[command(about = "List every Class")]
    List,

    #[command(about = "Show a Class with its properties and relationships")]
    Show(ShowClassCmd),

    #[command(about = "Declare a relationship between two Classes")]
    Link {
        from: String,
        to: String,
        name: String,
        #[arg(long = "property", value_name = "NAME", help = "Relationship property")]
        properties: Vec<String>,
    },

    #[command(about = "Declare CHILD an instance of PARENT")]
    Inherit { child: String, parent: String },

    #[command(about = "Rename a Class and its data nodes")]
    Rename { class: String, new_name: String },

    #[command(about = "Delete a Class")]
    Delete {
        class: String,
        #[arg(long, help = "Delete even if data nodes are bound to the Class")]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct CreateClassCmd {
    name: String,

    #[arg(long, help = "Only declared properties are accepted on data nodes")]
    strict: bool,

    #[arg(long = "property", short = 'p', value_name = "NAME")]
    properties: Vec<String>,

    #[arg(long, help = "Short code stored on the Class")]
    code: Option<String>,

    #[arg(long, help = "Forbid data nodes of this Class")]
    no_datanodes: bool,
}

#[derive(Args, Debug)]
struct ShowClassCmd {
    class: String,

    #[arg(long, help = "Only properties declared on the Class itself")]
    own: bool,

    #[arg(long, help = "Hide system properties")]
    exclude_system: bool,

    #[arg(long, value_enum, default_value_t = SortArg::Asc)]
    sort: SortArg,
}

#[derive(Subcommand, Debug)]
enum NamespaceCmd {
    #[command(about = "Create a namespace counter")]
    Create {
        name: String,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        suffix: Option<String>,
    },

    #[command(about = "Reserve the next uri of a namespace")]
    Next {
        name: String,
        #[arg(long, help = "Override the stored prefix for this call")]
        prefix: Option<String>,
        #[arg(long, help = "Override the stored suffix for this call")]
        suffix: Option<String>,
    },

    #[command(about = "List namespace counters")]
    List,
}

#[derive(Subcommand, Debug)]
enum ImportCmd {
    #[command(about = "Import data nodes from a CSV file")]
    Nodes(ImportNodesCmd),

    #[command(about = "Import relationships from a CSV file")]
    Links(ImportLinksCmd),

    #[command(about = "Import a nested JSON document")]
    Json {
        class: String,
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, help = "Drop undeclared keys on strict Classes")]
        silently_drop: bool,
    },
}

#[derive(Args, Debug)]
struct ImportNodesCmd {
    class: String,

    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[arg(long, value_name = "COLUMN")]
    primary_key: Option<String>,

    #[arg(long, value_enum, default_value_t = DuplicatesArg::Merge)]
    duplicates: DuplicatesArg,

    #[arg(long, value_name = "OLD=NEW", value_parser = parse_rename)]
    rename: Vec<(String, String)>,

    #[arg(long, value_name = "COLUMN", conflicts_with = "select")]
    drop: Vec<String>,

    #[arg(long, value_name = "COLUMN")]
    select: Vec<String>,

    #[arg(long, value_name = "ROWS")]
    batch_size: Option<usize>,

    #[arg(long, help = "Drop undeclared columns on strict Classes")]
    silently_drop: bool,
}

#[derive(Args, Debug)]
struct ImportLinksCmd {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[arg(long)]
    from_class: String,

    #[arg(long)]
    from_column: String,

    #[arg(long, help = "Node property matched against the source column")]
    from_key: Option<String>,

    #[arg(long)]
    to_class: String,

    #[arg(long)]
    to_column: String,

    #[arg(long, help = "Node property matched against the target column")]
    to_key: Option<String>,

    #[arg(long)]
    relationship: String,

    #[arg(long = "property", value_name = "COLUMN")]
    properties: Vec<String>,

    #[arg(long, value_name = "ROWS")]
    batch_size: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum NodeCmd {
    #[command(about = "Show a data node by identity")]
    Get { id: u64 },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Plain => Theme::Plain,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DuplicatesArg {
    Skip,
    Merge,
    Replace,
}

impl From<DuplicatesArg> for DuplicatePolicy {
    fn from(policy: DuplicatesArg) -> Self {
        match policy {
            DuplicatesArg::Skip => DuplicatePolicy::Skip,
            DuplicatesArg::Merge => DuplicatePolicy::Merge,
            DuplicatesArg::Replace => DuplicatePolicy::Replace,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Asc => SortOrder::Asc,
            SortArg::Desc => SortOrder::Desc,
        }
    }
}

fn parse_rename(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((old, new)) if !old.trim().is_empty() && !new.trim().is_empty() => {
            Ok((old.trim().to_string(), new.trim().to_string()))
        }
        _ => Err(format!("expected OLD=NEW, got '{raw}'")),
    }
}

#[derive(Serialize)]
struct ClassView {
    #[serde(flatten)]
    class: classgraph::ClassAttributes,
    properties: Vec<String>,
    relationships: Vec<classgraph::ClassLink>,
    data_nodes: usize,
}

#[derive(Serialize)]
struct NodeView {
    class: String,
    #[serde(flatten)]
    node: classgraph::NodeRecord,
}

#[derive(Serialize)]
struct Created {
    id: NodeId,
    name: String,
}

fn main() {
    if let Err(err) = run() {
        let code = err
            .downcast_ref::<SchemaError>()
            .map(|e| format!(" [{}]", e.code()))
            .unwrap_or_default();
        eprintln!("error{code}: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    init_logging(&level)?;

    let db_path = cli
        .db
        .clone()
        .or_else(|| config.database.clone())
        .ok_or("no database: pass --db or set `database` in the config file")?;
    let schema = Schema::with_options(MemoryGraph::open(&db_path)?, config.schema.clone());
    debug!(db = %db_path.display(), "cli.opened");

    let ui = Ui::new(cli.theme.into());
    let format = cli.format;
    let dirty = match cli.command {
        Command::Class(cmd) => run_class(&schema, cmd, format, &ui)?,
        Command::Namespace(cmd) => run_namespace(&schema, cmd, format, &ui)?,
        Command::Import(cmd) => run_import(&schema, cmd, format, &ui)?,
        Command::Node(cmd) => run_node(&schema, cmd, format, &ui)?,
    };
    if dirty {
        save(&schema, &db_path)?;
    }
    Ok(())
}

fn save(schema: &Schema<MemoryGraph>, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    schema.store().persist(path)?;
    debug!(
        db = %path.display(),
        nodes = schema.store().node_count(),
        edges = schema.store().edge_count(),
        "cli.persisted"
    );
    Ok(())
}

fn run_class(
    schema: &Schema<MemoryGraph>,
    cmd: ClassCmd,
    format: OutputFormat,
    ui: &Ui,
) -> Result<bool, Box<dyn Error>> {
    match cmd {
        ClassCmd::Create(cmd) => {
            let options = ClassOptions {
                strict: cmd.strict,
                code: cmd.code,
                no_datanodes: cmd.no_datanodes,
            };
            let id = schema.create_class_with_options(&cmd.name, &options)?;
            if !cmd.properties.is_empty() {
                schema.add_properties_to_class(id, cmd.properties.iter())?;
            }
            let created = Created { id, name: cmd.name };
            emit(format, &created, || {
                ui.success(&format!("created class {} (#{})", created.name, created.id))
            })?;
            Ok(true)
        }
        ClassCmd::List => {
            let classes = schema.list_classes()?;
            emit(format, &classes, || ui.classes(&classes))?;
            Ok(false)
        }
        ClassCmd::Show(cmd) => {
            let class = schema.get_class(cmd.class.as_str())?;
            let view = ClassView {
                properties: schema.get_class_properties(
                    class.id,
                    !cmd.own,
                    cmd.sort.into(),
                    cmd.exclude_system,
                )?,
                relationships: schema.get_class_relationships(class.id)?,
                data_nodes: schema.count_data_nodes_of_class(class.id)?,
                class,
            };
            emit(format, &view, || {
                ui.class(&view.class, &view.properties, &view.relationships, view.data_nodes)
            })?;
            Ok(false)
        }
        ClassCmd::Link {
            from,
            to,
            name,
            properties,
        } => {
            if properties.is_empty() {
                schema.create_class_relationship(from.as_str(), to.as_str(), &name)?;
            } else {
                schema.create_class_relationship_with_properties(
                    from.as_str(),
                    to.as_str(),
                    &name,
                    properties.iter(),
                )?;
            }
            emit(format, &serde_json::json!({"from": from, "to": to, "name": name}), || {
                ui.success(&format!("declared {from} -[{name}]-> {to}"))
            })?;
            Ok(true)
        }
        ClassCmd::Inherit { child, parent } => {
            schema.add_ancestor(child.as_str(), parent.as_str())?;
            emit(format, &serde_json::json!({"child": child, "parent": parent}), || {
                ui.success(&format!("{child} is now an instance of {parent}"))
            })?;
            Ok(true)
        }
        ClassCmd::Rename { class, new_name } => {
            let renamed = schema.rename_class(class.as_str(), &new_name)?;
            emit(
                format,
                &serde_json::json!({"class": new_name, "data_nodes": renamed}),
                || ui.success(&format!("renamed {class} to {new_name} ({renamed} data nodes)")),
            )?;
            Ok(true)
        }
        ClassCmd::Delete { class, force } => {
            let orphans = schema.delete_class(class.as_str(), !force)?;
            if orphans > 0 {
                warn!(class = %class, orphans, "cli.class.orphans");
                ui.warn(&format!("{orphans} data nodes still reference {class}"));
            }
            emit(format, &serde_json::json!({"class": class, "orphans": orphans}), || {
                ui.success(&format!("deleted class {class}"))
            })?;
            Ok(true)
        }
    }
}

fn run_namespace(
    schema: &Schema<MemoryGraph>,
    cmd: NamespaceCmd,
    format: OutputFormat,
    ui: &Ui,
) -> Result<bool, Box<dyn Error>> {
    match cmd {
        NamespaceCmd::Create {
            name,
            prefix,
            suffix,
        } => {
            schema.create_namespace(&name, prefix.as_deref(), suffix.as_deref())?;
            emit(format, &serde_json::json!({"namespace": name}), || {
                ui.success(&format!("created namespace {name}"))
            })?;
            Ok(true)
        }
        NamespaceCmd::Next {
            name,
            prefix,
            suffix,
        } => {
            let uri = schema.reserve_next_uri(&name, prefix.as_deref(), suffix.as_deref())?;
            emit(format, &serde_json::json!({"namespace": name, "uri": uri}), || {
                println!("{uri}")
            })?;
            Ok(true)
        }
        NamespaceCmd::List => {
            let all = schema.list_namespaces()?;
            emit(format, &all, || ui.namespaces(&all))?;
            Ok(false)
        }
    }
}

fn run_import(
    schema: &Schema<MemoryGraph>,
    cmd: ImportCmd,
    format: OutputFormat,
    ui: &Ui,
) -> Result<bool, Box<dyn Error>> {
    match cmd {
        ImportCmd::Nodes(cmd) => {
            let table = Table::read_csv(&cmd.file)?;
            let options = NodeImportOptions {
                primary_key: cmd.primary_key,
                rename: cmd.rename.into_iter().collect(),
                drop: cmd.drop,
                select: cmd.select,
                duplicates: cmd.duplicates.into(),
                max_batch_size: cmd.batch_size,
                silently_drop: cmd.silently_drop,
                ..NodeImportOptions::default()
            };
            let report = schema.import_nodes(cmd.class.as_str(), &table, &options)?;
            emit(format, &report, || ui.node_report(&cmd.class, &report))?;
            Ok(true)
        }
        ImportCmd::Links(cmd) => {
            let table = Table::read_csv(&cmd.file)?;
            let mut from = LinkEnd::new(cmd.from_class, cmd.from_column);
            if let Some(key) = cmd.from_key {
                from = from.with_key(key);
            }
            let mut to = LinkEnd::new(cmd.to_class, cmd.to_column);
            if let Some(key) = cmd.to_key {
                to = to.with_key(key);
            }
            let mut options = LinkImportOptions::new(from, to, cmd.relationship);
            options.properties = cmd.properties;
            options.max_batch_size = cmd.batch_size;
            let report = schema.import_links(&table, &options)?;
            emit(format, &report, || ui.link_report(&options.relationship, &report))?;
            Ok(true)
        }
        ImportCmd::Json {
            class,
            file,
            silently_drop,
        } => {
            let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
            let options = TreeImportOptions {
                silently_drop,
                ..TreeImportOptions::default()
            };
            let roots = match schema.import_tree(class.as_str(), &document, &options) {
                Ok(roots) => roots,
                Err(SchemaError::PartialImport { created, source }) => {
                    let removed = schema.compensate(&created)?;
                    ui.warn(&format!("import aborted; removed {removed} partial nodes"));
                    return Err((*source).into());
                }
                Err(err) => return Err(err.into()),
            };
            emit(format, &serde_json::json!({"roots": roots}), || {
                ui.success(&format!("imported {} root nodes into {class}", roots.len()))
            })?;
            Ok(true)
        }
    }
}

fn run_node(
    schema: &Schema<MemoryGraph>,
    cmd: NodeCmd,
    format: OutputFormat,
    ui: &Ui,
) -> Result<bool, Box<dyn Error>> {
    match cmd {
        NodeCmd::Get { id } => {
            let id = NodeId(id);
            let node = schema
                .get_data_node(&DataNodeFilter::Id(id))?
                .ok_or(SchemaError::UnknownNode(id.to_string()))?;
            let view = NodeView {
                class: schema.class_of_data_node(id)?,
                node,
            };
            emit(format, &view, || ui.node(&view.class, &view.node))?;
            Ok(false)
        }
    }
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}
