use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::api::DEFAULT_COMMENT_LIMIT;
use crate::format::{ImageFit, ImageFormat};

#[derive(Debug, Parser)]
#[command(
    name = "unbelong",
    version,
    about = "Read unbelong webcomics in the terminal"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Base URL of the content API.
    #[arg(
        long,
        global = true,
        env = "UNBELONG_API_URL",
        default_value = "http://localhost:8787"
    )]
    pub api_url: String,

    /// Host serving episode and thumbnail images.
    #[arg(
        long,
        global = true,
        env = "UNBELONG_IMAGE_DOMAIN",
        default_value = "img.unbelong.xyz"
    )]
    pub image_domain: String,

    /// Public site URL used for share links.
    #[arg(
        long,
        global = true,
        env = "UNBELONG_SITE_URL",
        default_value = "https://comic.unbelong.xyz"
    )]
    pub site_url: String,

    /// Rows kept above a heading when jumping to it from the outline.
    #[arg(long, global = true, env = "UNBELONG_HEADER_OFFSET", default_value_t = 2)]
    pub header_offset: u32,

    /// Terminal width at which the outline panel is docked beside the episode.
    #[arg(
        long,
        global = true,
        env = "UNBELONG_WIDE_THRESHOLD",
        default_value_t = 100
    )]
    pub wide_threshold: u16,

    /// Which heading becomes active when several enter the reading band at once.
    #[arg(
        long,
        global = true,
        env = "UNBELONG_ACTIVATION",
        value_enum,
        default_value_t = Activation::Last
    )]
    pub activation: Activation,

    /// Resize mode for cover images in the works listing.
    #[arg(
        long,
        global = true,
        env = "UNBELONG_COVER_FIT",
        value_enum,
        default_value_t = ImageFit::Cover
    )]
    pub cover_fit: ImageFit,

    /// Delivery format for cover images in the works listing.
    #[arg(
        long,
        global = true,
        env = "UNBELONG_COVER_FORMAT",
        value_enum,
        default_value_t = ImageFormat::Auto
    )]
    pub cover_format: ImageFormat,

    /// Raise log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Activation {
    /// The last heading reported in a batch wins.
    Last,
    /// The heading nearest the top of the band wins.
    Nearest,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List published works.
    Works,
    /// Show a work and its published episodes.
    Work { slug: String },
    /// Print an episode with its outline.
    Read {
        work: String,
        episode: String,
        /// Wrap width for the episode body.
        #[arg(long, default_value_t = 80)]
        width: u16,
    },
    /// List approved comments on an episode.
    Comments {
        episode_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_COMMENT_LIMIT)]
        limit: u32,
    },
    /// Show the author profile.
    About,
    /// List recently read episodes.
    History,
    /// Open the full-screen reader (default).
    Tui,
}

impl Command {
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Tui)
    }
}
