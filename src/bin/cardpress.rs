use std::{
    collections::BTreeSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "cardpress", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every subject field a template binds to.
    Fields(FieldsArgs),
    /// Render one side of a card for one subject as a PNG.
    Render(RenderArgs),
    /// Render cards for a list of subjects and tile them onto print sheets.
    Sheet(SheetArgs),
}

#[derive(Parser, Debug)]
struct FieldsArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Subject JSON (an object mapping field names to values).
    #[arg(long)]
    subject: PathBuf,

    /// Which side of the card to render.
    #[arg(long, value_enum, default_value_t = SideChoice::Front)]
    side: SideChoice,

    /// Photo root directory. Defaults to the template's directory.
    #[arg(long)]
    photos_root: Option<PathBuf>,

    /// Register a font as NAME=PATH. May be repeated.
    #[arg(long = "font")]
    fonts: Vec<String>,

    /// Fallback font used for families with no registered file.
    #[arg(long)]
    default_font: Option<PathBuf>,

    /// Canvas background override as #RRGGBB or #RRGGBBAA.
    #[arg(long)]
    background: Option<String>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SheetArgs {
    /// Template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Subjects JSON (an array of field objects).
    #[arg(long)]
    subjects: PathBuf,

    /// Which side of the card to render.
    #[arg(long, value_enum, default_value_t = SideChoice::Front)]
    side: SideChoice,

    /// Photo root directory. Defaults to the template's directory.
    #[arg(long)]
    photos_root: Option<PathBuf>,

    /// Register a font as NAME=PATH. May be repeated.
    #[arg(long = "font")]
    fonts: Vec<String>,

    /// Fallback font used for families with no registered file.
    #[arg(long)]
    default_font: Option<PathBuf>,

    /// Output directory for page PNGs.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SideChoice {
    Front,
    Back,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Fields(args) => cmd_fields(args),
        Command::Render(args) => cmd_render(args),
        Command::Sheet(args) => cmd_sheet(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON"))
}

fn cmd_fields(args: FieldsArgs) -> anyhow::Result<()> {
    let raw: serde_json::Value = read_json(&args.template, "template")?;

    let mut keys = BTreeSet::new();
    for field in ["frontDesign", "backDesign"] {
        if let Some(design) = raw.get(field).filter(|v| !v.is_null()) {
            let design = cardpress::template::unwrap_legacy_design(design, field);
            keys.extend(cardpress::extract_fields(design));
        }
    }

    for key in &keys {
        println!("{key}");
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let template: cardpress::Template = read_json(&args.template, "template")?;
    let design = side_design(&template, args.side)?;
    let subject: cardpress::Subject = read_json(&args.subject, "subject")?;

    let photos = cardpress::FilePhotoSource::new(photo_root(&args.photos_root, &args.template));
    let fonts = load_fonts(&args.fonts, args.default_font.as_deref())?;
    let mut text_engine = cardpress::TextLayoutEngine::new();
    let settings = cardpress::RenderSettings {
        clear_rgba: parse_background(args.background.as_deref())?,
    };
    let mut backend = cardpress::create_backend(cardpress::BackendKind::Cpu, &settings)?;

    let card = cardpress::render_subject_card(
        design,
        &subject,
        &photos,
        &fonts,
        &mut text_engine,
        backend.as_mut(),
    )?;

    save_png(&card, &args.out)
}

fn cmd_sheet(args: SheetArgs) -> anyhow::Result<()> {
    let template: cardpress::Template = read_json(&args.template, "template")?;
    let design = side_design(&template, args.side)?;
    let subjects: Vec<cardpress::Subject> = read_json(&args.subjects, "subjects")?;

    let photos = cardpress::FilePhotoSource::new(photo_root(&args.photos_root, &args.template));
    let fonts = load_fonts(&args.fonts, args.default_font.as_deref())?;
    let mut text_engine = cardpress::TextLayoutEngine::new();
    let settings = cardpress::RenderSettings::default();
    let mut backend = cardpress::create_backend(cardpress::BackendKind::Cpu, &settings)?;

    let mut cards = Vec::with_capacity(subjects.len());
    for subject in &subjects {
        cards.push(cardpress::render_subject_card(
            design,
            subject,
            &photos,
            &fonts,
            &mut text_engine,
            backend.as_mut(),
        )?);
    }

    let pages = cardpress::compose_sheets(&cards, &cardpress::SheetLayout::default())?;
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    for (i, page) in pages.iter().enumerate() {
        let path = args.out_dir.join(format!("page-{:02}.png", i + 1));
        save_png(page, &path)?;
    }
    Ok(())
}

fn side_design(
    template: &cardpress::Template,
    side: SideChoice,
) -> anyhow::Result<&cardpress::Scene> {
    let design = match side {
        SideChoice::Front => template.front_design.as_ref(),
        SideChoice::Back => template.back_design.as_ref(),
    };
    design.with_context(|| format!("template has no {:?} design", side))
}

fn photo_root(photos_root: &Option<PathBuf>, template_path: &Path) -> PathBuf {
    photos_root.clone().unwrap_or_else(|| {
        template_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    })
}

fn parse_background(flag: Option<&str>) -> anyhow::Result<Option<[u8; 4]>> {
    let Some(s) = flag else { return Ok(None) };
    let color: cardpress::Color = s
        .parse()
        .with_context(|| format!("parse --background '{s}'"))?;
    Ok(Some(color.to_rgba8()))
}

fn load_fonts(
    specs: &[String],
    default_font: Option<&Path>,
) -> anyhow::Result<cardpress::FontStore> {
    let mut fonts = cardpress::FontStore::new();
    for spec in specs {
        let (name, path) = spec
            .split_once('=')
            .with_context(|| format!("--font '{spec}' is not NAME=PATH"))?;
        fonts.register_file(name, Path::new(path))?;
    }
    if let Some(path) = default_font {
        fonts.set_default_file(path)?;
    }
    Ok(fonts)
}

fn save_png(card: &cardpress::CardRaster, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let mut data = card.data.clone();
    if card.premultiplied {
        cardpress::composite_cpu::unpremultiply_rgba8_in_place(&mut data);
    }

    image::save_buffer_with_format(
        out,
        &data,
        card.width,
        card.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    Ok(())
}
