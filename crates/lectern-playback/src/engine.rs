//! Adaptive playback engine.
//!
//! Attachment evaluates a ranked capability-probe list once per source:
//! native manifest decoding where the surface supports it, the software
//! adaptive client otherwise, plain source assignment for direct files, and
//! a restricted embed for third-party references. Switching sources tears
//! the previous client down synchronously before anything new is built.

use async_trait::async_trait;
use lectern_core::models::{QualityLevel, AUTO_LEVEL};
use std::collections::HashMap;

use crate::error::PlaybackError;
use crate::source::PlaybackSource;

/// Manifest MIME type probed for native support.
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// The platform media element, as much of it as the engine needs.
pub trait MediaSurface: Send {
    /// Whether the element can decode this MIME type on its own.
    fn can_play_natively(&self, mime: &str) -> bool;
    fn set_source(&mut self, url: &str, mime: &str);
    fn clear(&mut self);
}

/// A software adaptive-bitrate client bound to the media surface.
#[async_trait]
pub trait AdaptiveClient: Send {
    /// Fetch and parse the manifest; returns the quality ladder sorted by
    /// descending resolution.
    async fn load(
        &mut self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Vec<QualityLevel>, PlaybackError>;

    /// Pin one rung, or restore automatic selection with [`AUTO_LEVEL`].
    fn set_level(&mut self, index: i32) -> Result<(), PlaybackError>;

    fn current_level(&self) -> i32;

    /// Release resources. Must be safe to call more than once.
    fn destroy(&mut self);
}

/// Builds a fresh adaptive client per attachment.
pub type ClientFactory = Box<dyn Fn() -> Box<dyn AdaptiveClient> + Send + Sync>;

/// How a source gets attached once a probe claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachPlan {
    NativeManifest,
    SoftwareAdaptive,
    DirectFile,
    Embed,
    NoVideo,
}

/// One rung of the capability ranking: a predicate plus the plan it selects.
pub struct CapabilityProbe {
    pub name: &'static str,
    pub applies: fn(&PlaybackSource, &dyn MediaSurface) -> bool,
    pub plan: AttachPlan,
}

/// Ranked probe list, evaluated once per attachment. First match wins; a
/// source no probe claims is unplayable.
pub fn capability_probes() -> &'static [CapabilityProbe] {
    &[
        CapabilityProbe {
            name: "native-manifest",
            applies: |source, surface| {
                matches!(source, PlaybackSource::Manifest { .. })
                    && surface.can_play_natively(HLS_MIME)
            },
            plan: AttachPlan::NativeManifest,
        },
        CapabilityProbe {
            name: "software-adaptive",
            applies: |source, _| matches!(source, PlaybackSource::Manifest { .. }),
            plan: AttachPlan::SoftwareAdaptive,
        },
        CapabilityProbe {
            name: "direct-file",
            applies: |source, _| matches!(source, PlaybackSource::DirectFile { .. }),
            plan: AttachPlan::DirectFile,
        },
        CapabilityProbe {
            name: "embed",
            applies: |source, _| matches!(source, PlaybackSource::Embed { .. }),
            plan: AttachPlan::Embed,
        },
        CapabilityProbe {
            name: "no-video",
            applies: |source, _| matches!(source, PlaybackSource::None),
            plan: AttachPlan::NoVideo,
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    /// Platform decodes the manifest itself; bitrate is governed silently
    /// and manual quality control is unavailable.
    NativeManifest,
    SoftwareAdaptive,
    DirectFile,
}

/// Where playback stands for the current source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing {
        mode: AttachMode,
        ladder: Vec<QualityLevel>,
        selected: i32,
    },
    Embedded {
        embed_url: String,
    },
    NoVideo,
    /// Recovery affordance: open externally or retry from scratch.
    Unplayable {
        open_url: Option<String>,
    },
}

/// Binds one lesson's source to the media surface.
pub struct PlaybackEngine {
    surface: Box<dyn MediaSurface>,
    make_client: ClientFactory,
    client: Option<Box<dyn AdaptiveClient>>,
    state: PlaybackState,
    source: PlaybackSource,
}

impl PlaybackEngine {
    pub fn new(surface: Box<dyn MediaSurface>, make_client: ClientFactory) -> Self {
        Self {
            surface,
            make_client,
            client: None,
            state: PlaybackState::Idle,
            source: PlaybackSource::None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// The discovered quality ladder; empty for native, direct, and embedded
    /// playback.
    pub fn ladder(&self) -> &[QualityLevel] {
        match &self.state {
            PlaybackState::Playing { ladder, .. } => ladder,
            _ => &[],
        }
    }

    /// Attach a new source, tearing the previous attachment down first.
    pub async fn attach(&mut self, source: PlaybackSource) -> &PlaybackState {
        self.teardown();
        self.source = source.clone();

        let plan = capability_probes()
            .iter()
            .find(|probe| (probe.applies)(&source, self.surface.as_ref()));

        let Some(probe) = plan else {
            let open_url = source_url(&source);
            tracing::warn!(url = ?open_url, "No playback path for source");
            self.state = PlaybackState::Unplayable { open_url };
            return &self.state;
        };

        tracing::debug!(probe = probe.name, "Attaching source");

        self.state = match (probe.plan, source) {
            (AttachPlan::NativeManifest, PlaybackSource::Manifest { url, .. }) => {
                self.surface.set_source(&url, HLS_MIME);
                PlaybackState::Playing {
                    mode: AttachMode::NativeManifest,
                    ladder: Vec::new(),
                    selected: AUTO_LEVEL,
                }
            }
            (AttachPlan::SoftwareAdaptive, PlaybackSource::Manifest { url, headers }) => {
                let mut client = (self.make_client)();
                match client.load(&url, &headers).await {
                    Ok(ladder) => {
                        self.client = Some(client);
                        PlaybackState::Playing {
                            mode: AttachMode::SoftwareAdaptive,
                            ladder,
                            selected: AUTO_LEVEL,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Adaptive attach failed");
                        client.destroy();
                        PlaybackState::Unplayable {
                            open_url: Some(url),
                        }
                    }
                }
            }
            (AttachPlan::DirectFile, PlaybackSource::DirectFile { url }) => {
                self.surface.set_source(&url, &direct_mime(&url));
                PlaybackState::Playing {
                    mode: AttachMode::DirectFile,
                    ladder: Vec::new(),
                    selected: AUTO_LEVEL,
                }
            }
            (AttachPlan::Embed, PlaybackSource::Embed { embed_url }) => {
                PlaybackState::Embedded { embed_url }
            }
            (AttachPlan::NoVideo, _) => PlaybackState::NoVideo,
            // A probe can only claim the source shape it matched on.
            (_, source) => PlaybackState::Unplayable {
                open_url: source_url(&source),
            },
        };

        &self.state
    }

    /// Re-attempt attachment of the current source from scratch.
    pub async fn retry(&mut self) -> &PlaybackState {
        let source = self.source.clone();
        self.attach(source).await
    }

    /// Pin a ladder rung, or restore automatic selection with
    /// [`AUTO_LEVEL`]. Only meaningful for software adaptive playback.
    pub fn set_quality(&mut self, index: i32) -> Result<(), PlaybackError> {
        let PlaybackState::Playing {
            mode: AttachMode::SoftwareAdaptive,
            selected,
            ..
        } = &mut self.state
        else {
            return Err(PlaybackError::QualitySelectionUnavailable);
        };

        let Some(client) = self.client.as_mut() else {
            return Err(PlaybackError::QualitySelectionUnavailable);
        };

        client.set_level(index)?;
        *selected = index;

        tracing::debug!(level = index, "Quality level set");
        Ok(())
    }

    /// Synchronously release the current attachment. A stale client must
    /// never keep decoding against a torn-down surface.
    fn teardown(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.destroy();
        }
        self.surface.clear();
        self.state = PlaybackState::Idle;
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn source_url(source: &PlaybackSource) -> Option<String> {
    match source {
        PlaybackSource::Manifest { url, .. }
        | PlaybackSource::DirectFile { url }
        | PlaybackSource::Unrecognized { url } => Some(url.clone()),
        PlaybackSource::Embed { embed_url } => Some(embed_url.clone()),
        PlaybackSource::None => None,
    }
}

fn direct_mime(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        _ => "video/mp4",
    }
    .to_string()
}
