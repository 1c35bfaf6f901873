//! Material Families
//!
//! Each family fixes an ordered list of channels. The order decides both
//! apply order and result indexing.

use std::fmt;

use serde::Serialize;
use texpack_core::{ArrayProperties, ChannelId, PixelFormat};

use crate::handler::HandlerDescriptor;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];
/// Tangent-space up vector
const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

/// Binding of one source channel to the handler built from `handler`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMapping {
    pub source: ChannelId,
    pub handler: HandlerDescriptor,
}

const fn mapping(
    source: &'static str,
    properties: ArrayProperties,
    format: PixelFormat,
    default_color: Option<[u8; 4]>,
) -> ChannelMapping {
    ChannelMapping {
        source: ChannelId(source),
        handler: HandlerDescriptor {
            channel: ChannelId(source),
            format,
            properties,
            default_color,
            variant: 0,
        },
    }
}

const PBR_CHANNELS: [ChannelMapping; 3] = [
    mapping(
        "_BaseMap",
        ArrayProperties::new("_MainTexArr_ID", "_MainTexArr"),
        PixelFormat::Bc7,
        Some(WHITE),
    ),
    mapping(
        "_BumpMap",
        ArrayProperties::new("_NormalMapArr_ID", "_NormalMapArr"),
        PixelFormat::Bc5,
        Some(FLAT_NORMAL),
    ),
    mapping(
        "_EmissionMap",
        ArrayProperties::new("_EmissionMapArr_ID", "_EmissionMapArr"),
        PixelFormat::Bc7,
        Some(BLACK),
    ),
];

const TOON_CHANNELS: [ChannelMapping; 4] = [
    mapping(
        "_MainTex",
        ArrayProperties::new("_MainTexArr_ID", "_MainTexArr"),
        PixelFormat::Bc7,
        Some(WHITE),
    ),
    mapping(
        "_NormalMap",
        ArrayProperties::new("_NormalMapArr_ID", "_NormalMapArr"),
        PixelFormat::Bc5,
        Some(FLAT_NORMAL),
    ),
    mapping(
        "_Emissive_Tex",
        ArrayProperties::new("_EmissiveTexArr_ID", "_EmissiveTexArr"),
        PixelFormat::Bc7,
        Some(BLACK),
    ),
    mapping(
        "_MatCap_Sampler",
        ArrayProperties::new("_MatCapArr_ID", "_MatCapArr"),
        PixelFormat::Rgba8UnormSrgb,
        None,
    ),
];

/// Material family selected from a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MaterialFamily {
    /// Lit scene shader
    Pbr,
    /// Avatar toon shader
    Toon,
}

impl MaterialFamily {
    pub const ALL: [MaterialFamily; 2] = [Self::Pbr, Self::Toon];

    /// Resolve a shader name; unknown shaders use the PBR family
    pub fn from_shader_name(shader: &str) -> Self {
        match shader {
            "DCL/Scene" | "DCL/Universal Render Pipeline/Lit" => Self::Pbr,
            "DCL/DCL_Toon" => Self::Toon,
            other if other.to_ascii_lowercase().contains("toon") => Self::Toon,
            other => {
                log::debug!("Unknown shader '{}', using {} family", other, Self::Pbr);
                Self::Pbr
            }
        }
    }

    pub fn shader_name(&self) -> &'static str {
        match self {
            Self::Pbr => "DCL/Scene",
            Self::Toon => "DCL/DCL_Toon",
        }
    }

    /// Ordered channel table
    pub fn channels(&self) -> &'static [ChannelMapping] {
        match self {
            Self::Pbr => &PBR_CHANNELS,
            Self::Toon => &TOON_CHANNELS,
        }
    }
}

impl Default for MaterialFamily {
    fn default() -> Self {
        Self::Pbr
    }
}

impl fmt::Display for MaterialFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pbr => f.write_str("pbr"),
            Self::Toon => f.write_str("toon"),
        }
    }
}
