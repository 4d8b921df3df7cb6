use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use memestage::{
    AssetKind, Catalog, ExportFormat, ExportOptions, FontLibrary, FsFetcher, JsonDirSource, Point,
    Rgba8, Stage, TextStyle, export_raster,
};

#[derive(Parser, Debug)]
#[command(name = "memestage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a scene JSON into an encoded meme image.
    Compose(ComposeArgs),
    /// List the template/asset catalog published in a directory.
    Catalog(CatalogArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Input scene JSON; image and font paths resolve relative to it.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// Output encoding.
    #[arg(long, value_enum, default_value = "png")]
    format: FormatChoice,

    /// JPEG quality (1-100); ignored for PNG.
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Creator name stamped into the export metadata.
    #[arg(long)]
    creator: Option<String>,

    /// Directory of .ttf/.otf/.ttc files to register in addition to the
    /// scene's font list.
    #[arg(long)]
    fonts_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CatalogArgs {
    /// Directory containing templates.json / assets.json.
    #[arg(long)]
    root: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpeg,
}

/// On-disk scene description consumed by `compose`.
#[derive(Debug, serde::Deserialize)]
struct Scene {
    canvas: CanvasSpec,
    #[serde(default = "default_background")]
    background: String,
    /// Font files to register, in order; the first becomes the fallback.
    #[serde(default)]
    fonts: Vec<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    texts: Vec<TextSpec>,
    #[serde(default)]
    images: Vec<ImageSpec>,
    #[serde(default)]
    assets: Vec<AssetSpec>,
}

#[derive(Debug, serde::Deserialize)]
struct CanvasSpec {
    width: u32,
    height: u32,
}

#[derive(Debug, serde::Deserialize)]
struct TextSpec {
    content: String,
    #[serde(default)]
    style: TextStyle,
    #[serde(default)]
    position: Option<[f64; 2]>,
}

#[derive(Debug, serde::Deserialize)]
struct ImageSpec {
    source: String,
    #[serde(default)]
    position: Option<[f64; 2]>,
    #[serde(default)]
    scale: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
struct AssetSpec {
    source: String,
    #[serde(default)]
    kind: Option<AssetKind>,
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Catalog(args) => cmd_catalog(args),
    }
}

fn read_scene(path: &Path) -> anyhow::Result<Scene> {
    let f = File::open(path).with_context(|| format!("open scene '{}'", path.display()))?;
    let r = BufReader::new(f);
    let scene: Scene = serde_json::from_reader(r).with_context(|| "parse scene JSON")?;
    Ok(scene)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let scene = read_scene(&args.in_path)?;
    let root = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let fetcher = FsFetcher::new(root);

    let background = Rgba8::from_hex(&scene.background)?;
    let mut stage = Stage::new(scene.canvas.width, scene.canvas.height, background)?;

    let mut fonts = FontLibrary::new();
    if let Some(dir) = &args.fonts_dir {
        let n = fonts.register_fonts_from_dir(dir)?;
        eprintln!("registered {n} font(s) from {}", dir.display());
    }
    for font_path in &scene.fonts {
        let path = root.join(font_path);
        let bytes =
            std::fs::read(&path).with_context(|| format!("read font '{}'", path.display()))?;
        let family = fonts.register_font(bytes)?;
        eprintln!("registered font family '{family}'");
    }

    if let Some(template) = &scene.template {
        stage.add_template(&fetcher, template)?;
    }
    for spec in &scene.images {
        let id = stage.add_user_image(&fetcher, &spec.source)?;
        if let Some([x, y]) = spec.position {
            stage.move_object(id, Point::new(x, y))?;
        }
        if let Some(scale) = spec.scale {
            stage.modify_object(
                id,
                &memestage::ObjectPatch {
                    scale: Some(scale),
                    ..Default::default()
                },
            )?;
        }
    }
    for spec in &scene.assets {
        stage.add_asset(&fetcher, &spec.source, spec.kind)?;
    }
    for spec in &scene.texts {
        let id = stage.add_text(spec.content.clone(), spec.style.clone());
        if let Some([x, y]) = spec.position {
            stage.move_object(id, Point::new(x, y))?;
        }
    }

    let options = ExportOptions {
        format: match args.format {
            FormatChoice::Png => ExportFormat::Png,
            FormatChoice::Jpeg => ExportFormat::Jpeg,
        },
        quality: args.quality,
        creator: args.creator,
    };
    let meme = export_raster(&stage, &mut fonts, &options)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &meme.bytes)
        .with_context(|| format!("write image '{}'", args.out.display()))?;

    eprintln!("wrote {} ({})", args.out.display(), meme.title);
    Ok(())
}

fn cmd_catalog(args: CatalogArgs) -> anyhow::Result<()> {
    let catalog = Catalog::load(JsonDirSource::new(&args.root))?;

    eprintln!("templates:");
    for t in catalog.templates() {
        eprintln!("  {}  {}  ({})  {}", t.id, t.name, t.category, t.url);
    }
    eprintln!("assets:");
    for a in catalog.assets() {
        eprintln!("  {}  {}  ({:?})  {}", a.id, a.name, a.kind, a.url);
    }
    Ok(())
}
