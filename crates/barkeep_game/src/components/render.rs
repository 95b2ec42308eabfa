//! Renderer selection. The core never draws; these tell an external renderer
//! how to.

use serde::{Deserialize, Serialize};

/// RGBA, 8 bits per channel.
pub type Color = [u8; 4];

/// Draw the entity as a box with a distinct front face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleColoredBoxRenderer {
    /// Front face colour.
    pub face: Color,
    /// Colour of the remaining faces.
    pub base: Color,
}

impl SimpleColoredBoxRenderer {
    /// Creates a box renderer.
    #[must_use]
    pub fn new(face: Color, base: Color) -> Self {
        Self { face, base }
    }
}

/// Draw the entity with a named model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRenderer {
    /// Key into the renderer's model library.
    pub model_name: String,
}

impl ModelRenderer {
    /// Creates a model renderer.
    #[must_use]
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
        }
    }
}

component!(SimpleColoredBoxRenderer, ModelRenderer);
