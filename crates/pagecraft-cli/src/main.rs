//! pagecraft - operator command line for builder templates

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pagecraft::{BuilderConfig, Engine, RenderContext, Rendered, TemplateManager, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod snapshot;

use snapshot::Snapshot;

#[derive(Parser, Debug)]
#[command(name = "pagecraft")]
#[command(about = "Manage and render page and popup templates")]
struct Cli {
    /// Builder configuration (TOML). Built-in defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON snapshot holding templates and style settings
    #[arg(short, long, global = true, default_value = "pagecraft-store.json")]
    store: PathBuf,

    /// Classroom id, required when templates are classroom scoped
    #[arg(long, global = true)]
    classroom: Option<String>,

    /// Operator name recorded on changes
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create configured default templates that do not exist yet
    Seed,

    /// Reset unpublished default templates to the configured content
    Refresh,

    /// Create a popup template from a display name
    CreatePopup {
        /// Display name, e.g. "Back to School"
        name: String,
    },

    /// Replace the draft body of a template
    Edit {
        key: String,

        /// Read the new draft from this file
        #[arg(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,

        /// New draft body
        #[arg(long)]
        content: Option<String>,
    },

    /// Copy the draft of a template into its published slot
    Publish { key: String },

    /// Render a template for preview, draft by default
    Preview {
        key: String,

        /// "draft" or "published"
        #[arg(long)]
        version: Option<String>,

        /// Request context as JSON: {"user": ..., "classroom": ..., "locale": ..., "page": ...}
        #[arg(long)]
        context: Option<String>,

        /// Extra scope data as a JSON object
        #[arg(long)]
        data: Option<String>,

        /// Exit with an error when the render produced warnings
        #[arg(long)]
        strict: bool,
    },

    /// Render the published version of a popup
    Popup {
        key: String,

        #[arg(long)]
        context: Option<String>,

        #[arg(long)]
        data: Option<String>,
    },

    /// List templates with their publish state
    List,

    /// Update global style settings
    Style {
        #[arg(long)]
        primary_color: Option<String>,
        #[arg(long)]
        secondary_color: Option<String>,
        #[arg(long)]
        background_color: Option<String>,
        #[arg(long)]
        text_color: Option<String>,
        #[arg(long)]
        body_font: Option<String>,
        #[arg(long)]
        heading_font: Option<String>,
        #[arg(long)]
        base_font_size: Option<u16>,
        /// File with custom SCSS rules
        #[arg(long)]
        custom_scss: Option<PathBuf>,
    },

    /// Publish the theme stylesheet and print its URL
    Css,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagecraft=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BuilderConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BuilderConfig::default(),
    };

    let (store, settings) = Snapshot::load(&cli.store)?.into_stores();
    let store = Arc::new(store);
    let settings = Arc::new(settings);
    let engine = Engine::new(config, store.clone(), settings.clone());

    let base_context = match &cli.classroom {
        Some(id) => RenderContext::new().with_classroom(id.clone(), id.as_str()),
        None => RenderContext::new(),
    };

    let changed = run(&cli, &engine, &base_context)?;
    if changed {
        Snapshot::capture(&store, &settings)?.save(&cli.store)?;
    }
    Ok(())
}

/// Execute one command. Returns whether the stores were modified.
fn run(cli: &Cli, engine: &Engine, base_context: &RenderContext) -> Result<bool> {
    match &cli.command {
        Commands::Seed => {
            let created = manager(cli, engine, base_context)?.ensure_default_templates()?;
            if created.is_empty() {
                println!("All default templates already exist");
            }
            for key in &created {
                println!("created {key}");
            }
            Ok(!created.is_empty())
        }

        Commands::Refresh => {
            let report = manager(cli, engine, base_context)?.refresh_defaults()?;
            for key in &report.refreshed {
                println!("refreshed {key}");
            }
            for key in &report.unchanged {
                println!("unchanged {key}");
            }
            for key in &report.skipped_published {
                println!("kept      {key} (published)");
            }
            for key in &report.missing {
                println!("missing   {key} (run `pagecraft seed`)");
            }
            Ok(!report.refreshed.is_empty())
        }

        Commands::CreatePopup { name } => {
            let record = manager(cli, engine, base_context)?.create_popup_template(name)?;
            println!("created {}", record.key);
            Ok(true)
        }

        Commands::Edit { key, file, content } => {
            let body = match (file, content) {
                (Some(path), _) => read_file(path)?,
                (None, Some(content)) => content.clone(),
                (None, None) => bail!("Pass the new draft with --file or --content"),
            };
            let record = manager(cli, engine, base_context)?.update_draft(key, &body)?;
            println!("updated draft of {}", record.key);
            Ok(true)
        }

        Commands::Publish { key } => {
            let record = manager(cli, engine, base_context)?.publish(key)?;
            println!("published {}", record.key);
            Ok(true)
        }

        Commands::Preview {
            key,
            version,
            context,
            data,
            strict,
        } => {
            let ctx = request_context(base_context, context.as_deref())?;
            let data = scope_data(data.as_deref())?;
            let rendered = engine.preview(key, version.as_deref(), &ctx, data)?;
            print_rendered(&rendered);
            if *strict && !rendered.is_clean() {
                bail!("{} render warning(s)", rendered.warnings.len());
            }
            Ok(false)
        }

        Commands::Popup { key, context, data } => {
            let ctx = request_context(base_context, context.as_deref())?;
            println!("{}", engine.popup(key, &ctx, scope_data(data.as_deref())?));
            Ok(false)
        }

        Commands::List => {
            for record in manager(cli, engine, base_context)?.list()? {
                let state = match record.published_at {
                    Some(at) => format!("published {}", at.format("%Y-%m-%d %H:%M")),
                    None => "draft only".to_string(),
                };
                println!("{:<40} {:<24} {}", record.key, state, record.name);
            }
            Ok(false)
        }

        Commands::Style {
            primary_color,
            secondary_color,
            background_color,
            text_color,
            body_font,
            heading_font,
            base_font_size,
            custom_scss,
        } => {
            let custom = custom_scss.as_deref().map(read_file).transpose()?;
            let settings = engine.styles().update(|s| {
                let fields = [
                    (&mut s.primary_color, primary_color),
                    (&mut s.secondary_color, secondary_color),
                    (&mut s.background_color, background_color),
                    (&mut s.text_color, text_color),
                    (&mut s.body_font, body_font),
                    (&mut s.heading_font, heading_font),
                ];
                for (field, value) in fields {
                    if let Some(value) = value {
                        field.clone_from(value);
                    }
                }
                if let Some(size) = base_font_size {
                    s.base_font_size = *size;
                }
                if let Some(custom) = custom {
                    s.custom_scss = custom;
                }
            })?;
            info!(fingerprint = %engine.css().fingerprint(&settings)?, "style settings updated");
            Ok(true)
        }

        Commands::Css => {
            if !engine.css().is_enabled() {
                bail!("Stylesheet publishing is disabled in the configuration");
            }
            let published = engine.publish_css()?;
            println!("{}", published.url);
            // Publishing may have created the default settings record.
            Ok(true)
        }
    }
}

fn manager<'a>(
    cli: &Cli,
    engine: &'a Engine,
    context: &RenderContext,
) -> Result<TemplateManager<'a>> {
    let manager = engine.manager(context)?;
    Ok(match &cli.actor {
        Some(actor) => manager.with_actor(actor.clone()),
        None => manager,
    })
}

/// Request context from `--context`, keeping the `--classroom` tenant.
fn request_context(base: &RenderContext, json: Option<&str>) -> Result<RenderContext> {
    let Some(json) = json else {
        return Ok(base.clone());
    };
    let mut ctx: RenderContext = serde_json::from_str(json).context("Invalid --context JSON")?;
    if ctx.classroom_id.is_none() {
        ctx.classroom_id = base.classroom_id.clone();
    }
    Ok(ctx)
}

fn scope_data(json: Option<&str>) -> Result<Vec<(String, Value)>> {
    let Some(json) = json else {
        return Ok(Vec::new());
    };
    let value: serde_json::Value = serde_json::from_str(json).context("Invalid --data JSON")?;
    if !value.is_object() {
        bail!("--data must be a JSON object");
    }
    Ok(Value::from_json(value).into_entries())
}

fn print_rendered(rendered: &Rendered) {
    println!("{}", rendered.markup);
    for warning in &rendered.warnings {
        eprintln!("warning: {warning}");
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
