//! Core flashcard library shared by the package converters.
//!
//! Provides:
//! - The native card model (CardData, ChoiceData, CardType)
//! - Checksum and digest routines used by the package format
//! - Full-width/half-width numeral normalization
//! - Markup tables (HTML escaping, character references, color palette)
//! - Conversion settings

pub mod checksum;
pub mod error;
pub mod markup;
pub mod settings;
pub mod text;
pub mod types;

pub use checksum::{field_checksum, sha1_digest, stable_id};
pub use error::{CoreError, Result};
pub use markup::{NamedColor, Palette, Rgb};
pub use settings::InterchangeSettings;
pub use types::{new_identifier, CardData, CardType, ChoiceData, SelectionRect};
