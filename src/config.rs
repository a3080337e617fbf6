use crate::cli::{Activation, GlobalArgs};
use crate::format::{CustomVariant, ImageFit, ImageFormat, ImageVariant};
use crate::outline::{ActivationPolicy, Navigator, ObservationBand, OutlineTracker};
use crate::render::RenderOptions;

const CARD_WIDTH: u32 = 400;
const CARD_HEIGHT: u32 = 300;
const CARD_QUALITY: u32 = 85;

/// Settings resolved once from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub(crate) api_url: String,
    pub(crate) image_domain: String,
    pub(crate) site_url: String,
    pub(crate) header_offset: u32,
    pub(crate) wide_threshold: u16,
    pub(crate) activation: ActivationPolicy,
    pub(crate) cover_fit: ImageFit,
    pub(crate) cover_format: ImageFormat,
}

impl Config {
    pub(crate) fn from_args(args: &GlobalArgs) -> Self {
        Self {
            api_url: args.api_url.trim().trim_end_matches('/').to_string(),
            image_domain: args
                .image_domain
                .trim()
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string(),
            site_url: args.site_url.trim().trim_end_matches('/').to_string(),
            header_offset: args.header_offset,
            wide_threshold: args.wide_threshold.max(1),
            activation: match args.activation {
                Activation::Last => ActivationPolicy::LastReported,
                Activation::Nearest => ActivationPolicy::NearestBandTop,
            },
            cover_fit: args.cover_fit,
            cover_format: args.cover_format,
        }
    }

    /// Image variant for work cards in listings.
    pub(crate) fn card_variant(&self) -> ImageVariant {
        ImageVariant::Custom(CustomVariant {
            width: Some(CARD_WIDTH),
            height: Some(CARD_HEIGHT),
            fit: Some(self.cover_fit),
            quality: Some(CARD_QUALITY),
            format: Some(self.cover_format),
        })
    }

    pub(crate) fn render_options(&self) -> RenderOptions {
        RenderOptions {
            image_domain: self.image_domain.clone(),
        }
    }

    pub(crate) fn outline_tracker(&self) -> OutlineTracker {
        OutlineTracker::new(
            Navigator::new(self.wide_threshold, self.header_offset),
            ObservationBand::default(),
            self.activation,
        )
    }
}
