//! # Capability Advertisement
//!
//! Formats the element accepts and produces, and the caps transform used
//! during negotiation.
//!
//! The sink side accepts `application/x-cenc` for every registered key system
//! combined with every clear content type. The source side produces the clear
//! content types themselves.

use crate::key_systems::KeySystemRegistry;
use crate::structure::Structure;

/// Media type of CENC-protected streams.
pub const CENC_MEDIA_TYPE: &str = "application/x-cenc";
/// Field holding the media type of the stream once decrypted.
pub const FIELD_ORIGINAL_MEDIA_TYPE: &str = "original-media-type";
/// Field holding the protection-system GUID.
pub const FIELD_PROTECTION_SYSTEM: &str = "protection-system";

/// Direction of the pad whose caps are being transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadDirection {
    /// Caps on the source pad, transformed for the sink pad (upstream)
    Src,
    /// Caps on the sink pad, transformed for the source pad (downstream)
    Sink,
}

/// Ordered list of acceptable formats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caps {
    structures: Vec<Structure>,
}

impl Caps {
    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn append(&mut self, structure: Structure) {
        self.structures.push(structure);
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Every pairwise structure intersection, in `self`'s order.
    pub fn intersect(&self, other: &Caps) -> Caps {
        let mut result = Caps::new_empty();
        for ours in &self.structures {
            for theirs in &other.structures {
                if let Some(merged) = ours.intersect(theirs) {
                    if !result.structures.contains(&merged) {
                        result.append(merged);
                    }
                }
            }
        }
        result
    }
}

impl FromIterator<Structure> for Caps {
    fn from_iter<I: IntoIterator<Item = Structure>>(iter: I) -> Self {
        Self {
            structures: iter.into_iter().collect(),
        }
    }
}

/// Caps accepted on the sink pad: one structure per key system and content type.
pub fn sink_caps(registry: &KeySystemRegistry, content_types: &[String]) -> Caps {
    registry
        .system_ids()
        .flat_map(|system_id| {
            content_types.iter().map(move |media_type| {
                Structure::new(CENC_MEDIA_TYPE)
                    .with_field(FIELD_ORIGINAL_MEDIA_TYPE, media_type.as_str())
                    .with_field(FIELD_PROTECTION_SYSTEM, system_id.as_str())
            })
        })
        .collect()
}

/// Caps produced on the source pad.
pub fn src_caps(content_types: &[String]) -> Caps {
    content_types.iter().map(Structure::new).collect()
}

/// Rewrite a protected structure to the clear format it decrypts to.
///
/// Structures that are not `application/x-cenc`, or that lack an original
/// media type, are left unchanged.
pub fn clear_cenc_structure(structure: &mut Structure) {
    if structure.name() != CENC_MEDIA_TYPE {
        return;
    }

    let Some(original) = structure.get_str(FIELD_ORIGINAL_MEDIA_TYPE).map(str::to_string) else {
        return;
    };

    structure.set_name(original);
    structure.remove_field(FIELD_PROTECTION_SYSTEM);
    structure.remove_field(FIELD_ORIGINAL_MEDIA_TYPE);
}

/// Caps on the other side of the element for `caps` arriving on `direction`.
///
/// Downstream, encryption fields are dropped so the result intersects with a
/// decoder's clear caps. Upstream, caps are passed through as they are.
pub fn transform_caps(direction: PadDirection, caps: &Caps, filter: Option<&Caps>) -> Caps {
    let transformed = match direction {
        PadDirection::Src => caps.clone(),
        PadDirection::Sink => caps
            .structures()
            .iter()
            .map(|structure| {
                let mut copy = structure.clone();
                clear_cenc_structure(&mut copy);
                copy
            })
            .collect(),
    };

    match filter {
        Some(filter) => transformed.intersect(filter),
        None => transformed,
    }
}
