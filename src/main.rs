use clap::{Parser, Subcommand};
use content_gallery::config::{self, GalleryConfig};
use content_gallery::gallery;
use content_gallery::imaging::RustBackend;
use content_gallery::media::Media;
use content_gallery::output;
use content_gallery::record::ImageRecord;
use content_gallery::rendition::Upload;
use content_gallery::store::{Catalog, ImageId, OwnerDirectory, OwnerRef};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crate version on a release tag, `dev@{commit}` anywhere else.
fn version_string() -> &'static str {
    if env!("CONTENT_GALLERY_RELEASE") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("CONTENT_GALLERY_COMMIT") {
        "" => "dev@unknown",
        commit => Box::leak(format!("dev@{commit}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "content-gallery")]
#[command(about = "Attach ordered image galleries to records and keep their renditions in sync")]
#[command(long_about = "\
Attach ordered image galleries to records and keep their renditions in sync

Every uploaded image is stored as five files named after its owner:

  {media_root}/{path}/
  ├── red-cat.jpg                  # Full-size image (752x608 box)
  ├── red-cat_small.jpg            # Small image (564x456)
  ├── red-cat_preview.jpg          # Preview (376x304)
  ├── red-cat_small_preview.jpg    # Small preview (141x114)
  └── red-cat_thumbnail.jpg        # Thumbnail (94x76)

Moving an image to another owner renames its files; replacing the image
re-creates them. Owners and images are kept in a JSON catalog.

Run 'content-gallery gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = "content-gallery.toml", global = true)]
    config: PathBuf,

    /// Catalog of owners and images
    #[arg(long, default_value = "content-gallery.json", global = true)]
    catalog: PathBuf,

    /// Filesystem root of all media (overrides the config file)
    #[arg(long, env = "CONTENT_GALLERY_MEDIA_ROOT", global = true)]
    media_root: Option<PathBuf>,

    /// Public base URL of the media root (overrides the config file)
    #[arg(long, env = "CONTENT_GALLERY_MEDIA_URL", global = true)]
    media_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add or rename owning records
    #[command(subcommand)]
    Owner(OwnerCommand),
    /// Set how an owner kind relates to galleries
    Kind {
        name: String,
        /// Images cannot be attached to owners of this kind
        #[arg(long)]
        no_gallery: bool,
        /// Keep owners of this kind out of choice listings
        #[arg(long)]
        hidden: bool,
    },
    /// Attach a new image to an owner
    Upload {
        #[arg(long)]
        owner: OwnerRef,
        file: PathBuf,
    },
    /// Replace the bytes of an image, keeping its name
    Replace { id: ImageId, file: PathBuf },
    /// Move an image to another owner, renaming its files
    Move {
        id: ImageId,
        #[arg(long)]
        owner: OwnerRef,
    },
    /// Delete an image and all of its files
    Delete { id: ImageId },
    /// Delete every image of an owner
    DeleteOwner { owner: OwnerRef },
    /// Show the gallery of an owner
    List {
        owner: OwnerRef,
        /// Print the gallery payload as JSON
        #[arg(long)]
        json: bool,
    },
    /// List owners of a kind that galleries can be attached to, as JSON
    Choices { kind: String },
    /// Compare the storage directory against the catalog
    Audit,
    /// Print a stock config file with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum OwnerCommand {
    /// Register an owner
    Add { owner: OwnerRef, title: String },
    /// Change an owner's title. Existing files keep their names.
    Rename { owner: OwnerRef, title: String },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Layer the config file and media overrides, then build the media context.
fn load_media(cli: &Cli) -> Result<Media<RustBackend>, Box<dyn std::error::Error>> {
    let config = load_settings(cli)?;
    Ok(Media::from_config(&config, RustBackend::new())?)
}

fn load_settings(cli: &Cli) -> Result<GalleryConfig, config::ConfigError> {
    let base = config::stock_defaults_value()?;
    let file = config::load_raw_config(&cli.config)?;
    let overrides = config::media_overlay(cli.media_root.as_deref(), cli.media_url.as_deref());
    config::resolve_config(base, file.into_iter().chain([overrides]))
}

fn read_upload(path: &Path) -> Result<Upload, Box<dyn std::error::Error>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("{} is not a file name", path.display()))?;
    let bytes = std::fs::read(path)?;
    Ok(Upload::new(name, bytes))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    let mut catalog = Catalog::load(&cli.catalog)?;

    match &cli.command {
        Command::Owner(OwnerCommand::Add { owner, title }) => {
            catalog.set_owner(owner, title.as_str());
            catalog.save(&cli.catalog)?;
            println!("{} {}", owner, title);
        }
        Command::Owner(OwnerCommand::Rename { owner, title }) => {
            if catalog.title(owner).is_none() {
                return Err(format!("owner {owner} not found").into());
            }
            catalog.set_owner(owner, title.as_str());
            catalog.save(&cli.catalog)?;
            println!("{} {}", owner, title);
        }
        Command::Kind {
            name,
            no_gallery,
            hidden,
        } => {
            catalog.define_kind(name, !no_gallery, !hidden);
            catalog.save(&cli.catalog)?;
        }
        Command::Upload { owner, file } => {
            let media = load_media(&cli)?;
            let mut record = ImageRecord::with_upload(owner.clone(), read_upload(file)?);
            record.save(&media, &mut catalog)?;
            catalog.save(&cli.catalog)?;
            output::print_saved_image(&record, &catalog, &media.sizes);
        }
        Command::Replace { id, file } => {
            let media = load_media(&cli)?;
            let mut record = ImageRecord::load(&catalog, *id)?;
            record.replace_image(read_upload(file)?);
            record.save(&media, &mut catalog)?;
            catalog.save(&cli.catalog)?;
            output::print_saved_image(&record, &catalog, &media.sizes);
        }
        Command::Move { id, owner } => {
            let media = load_media(&cli)?;
            let mut record = ImageRecord::load(&catalog, *id)?;
            record.set_owner(owner.clone());
            record.save(&media, &mut catalog)?;
            catalog.save(&cli.catalog)?;
            output::print_saved_image(&record, &catalog, &media.sizes);
        }
        Command::Delete { id } => {
            let media = load_media(&cli)?;
            let mut record = ImageRecord::load(&catalog, *id)?;
            let label = record.display(&catalog);
            record.delete(&media, &mut catalog)?;
            catalog.save(&cli.catalog)?;
            println!("Deleted #{} {}", id, label);
        }
        Command::DeleteOwner { owner } => {
            let media = load_media(&cli)?;
            let result = gallery::delete_owner_images(&media, &mut catalog, owner);
            // Rows of images deleted before a failure are gone too.
            catalog.save(&cli.catalog)?;
            println!("Deleted {} images of {}", result?, owner);
        }
        Command::List { owner, json } => {
            let media = load_media(&cli)?;
            let data = gallery::gallery_data(&media, &catalog, owner)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                let title = catalog.title(owner).unwrap_or_else(|| owner.to_string());
                output::print_gallery(&title, &data);
            }
        }
        Command::Choices { kind } => {
            let choices = gallery::owner_choices(&catalog, kind)?;
            println!("{}", serde_json::to_string_pretty(&choices)?);
        }
        Command::Audit => {
            let media = load_media(&cli)?;
            let report = content_gallery::audit::audit(&media, &catalog)?;
            output::print_audit_report(&report);
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
