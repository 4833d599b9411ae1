//! Type registry for course stacks
//!
//! Every element category maps to a [`BaseType`], which owns an independent
//! stack of courses. Subtypes (`M65`, `B14`, `SLAB_13`, ...) are base types in
//! their own right, not children of `brick`/`block`/`slab`.
//!
//! A type string may carry a cut fraction or a custom dimension tag
//! (`M65_HALF`, `B14_CUSTOM_16_W_20_H_10`). Those parse into a [`TypeKey`];
//! only [`TypeKey::base`] is used for course lookups and height math.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Material family of a base type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Brick,
    Block,
    CellularConcrete,
    Insulation,
    Joint,
    Lintel,
    Beam,
    Membrane,
    Slab,
}

macro_rules! base_types {
    ($($variant:ident => ($key:literal, $family:ident, $height:expr)),+ $(,)?) => {
        /// Closed set of course-stack keys
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum BaseType {
            $($variant),+
        }

        impl BaseType {
            /// Every base type, in declaration order
            pub const ALL: &'static [BaseType] = &[$(BaseType::$variant),+];

            /// Stable string key used in snapshots and events
            pub fn key(self) -> &'static str {
                match self {
                    $(BaseType::$variant => $key),+
                }
            }

            /// Material family
            pub fn family(self) -> TypeFamily {
                match self {
                    $(BaseType::$variant => TypeFamily::$family),+
                }
            }

            /// Static fallback element height (cm)
            pub fn table_height(self) -> Option<f64> {
                match self {
                    $(BaseType::$variant => $height),+
                }
            }

            /// Look up a base type by its exact key
            pub fn from_key(key: &str) -> Option<BaseType> {
                match key {
                    $($key => Some(BaseType::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

base_types! {
    Brick => ("brick", Brick, None),
    M50 => ("M50", Brick, Some(5.0)),
    M57 => ("M57", Brick, Some(5.7)),
    M60 => ("M60", Brick, Some(6.0)),
    M65 => ("M65", Brick, Some(6.5)),
    M90 => ("M90", Brick, Some(9.0)),

    Block => ("block", Block, Some(19.0)),
    B9 => ("B9", Block, Some(19.0)),
    B14 => ("B14", Block, Some(19.0)),
    B19 => ("B19", Block, Some(19.0)),
    B29 => ("B29", Block, Some(19.0)),

    Cellular => ("BC", CellularConcrete, Some(25.0)),
    Bc5 => ("BC_5", CellularConcrete, Some(25.0)),
    Bc7 => ("BC_7", CellularConcrete, Some(25.0)),
    Bc10 => ("BC_10", CellularConcrete, Some(25.0)),
    Bc15 => ("BC_15", CellularConcrete, Some(25.0)),
    Bc20 => ("BC_20", CellularConcrete, Some(25.0)),
    Bc24 => ("BC_24", CellularConcrete, Some(25.0)),
    Bc30 => ("BC_30", CellularConcrete, Some(25.0)),
    Bc36 => ("BC_36", CellularConcrete, Some(25.0)),

    Insulation => ("insulation", Insulation, Some(20.0)),
    Joint => ("joint", Joint, None),

    Lintel => ("lintel", Lintel, Some(19.0)),
    L120 => ("L120", Lintel, Some(19.0)),
    L140 => ("L140", Lintel, Some(19.0)),
    L160 => ("L160", Lintel, Some(19.0)),
    L180 => ("L180", Lintel, Some(19.0)),
    L200 => ("L200", Lintel, Some(19.0)),
    L220 => ("L220", Lintel, Some(19.0)),
    L250 => ("L250", Lintel, Some(19.0)),
    L300 => ("L300", Lintel, Some(19.0)),

    Beam => ("beam", Beam, Some(20.0)),
    Membrane => ("membrane", Membrane, Some(0.2)),

    Slab => ("slab", Slab, Some(13.0)),
    Slab12 => ("SLAB_12", Slab, Some(12.0)),
    Slab13 => ("SLAB_13", Slab, Some(13.0)),
    Slab15 => ("SLAB_15", Slab, Some(15.0)),
    Slab16 => ("SLAB_16", Slab, Some(16.0)),
    Slab20 => ("SLAB_20", Slab, Some(20.0)),
}

impl BaseType {
    /// Slab variant used when a slab element carries no usable marker
    pub const BASELINE_SLAB: BaseType = BaseType::Slab13;

    /// Brick subtypes with a fixed thickness, for height-based detection
    pub const BRICK_SUBTYPES: &'static [BaseType] = &[
        BaseType::M50,
        BaseType::M57,
        BaseType::M60,
        BaseType::M65,
        BaseType::M90,
    ];

    /// Types with no joint at all (default joint forced to zero)
    pub fn is_jointless(self) -> bool {
        matches!(
            self.family(),
            TypeFamily::Insulation | TypeFamily::Membrane | TypeFamily::Slab
        )
    }

    /// Generic family type that follows the catalog's current selection
    pub fn is_generic(self) -> bool {
        matches!(
            self,
            BaseType::Brick
                | BaseType::Block
                | BaseType::Cellular
                | BaseType::Insulation
                | BaseType::Lintel
                | BaseType::Slab
        )
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for BaseType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for BaseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        BaseType::from_key(&key)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported type: {key}")))
    }
}

/// Cut fraction of a whole element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fraction {
    ThreeQuarters,
    Half,
    Quarter,
}

impl Fraction {
    pub fn suffix(self) -> &'static str {
        match self {
            Fraction::ThreeQuarters => "3Q",
            Fraction::Half => "HALF",
            Fraction::Quarter => "1Q",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Fraction> {
        match suffix {
            "3Q" => Some(Fraction::ThreeQuarters),
            "HALF" => Some(Fraction::Half),
            "1Q" => Some(Fraction::Quarter),
            _ => None,
        }
    }

    pub fn ratio(self) -> f64 {
        match self {
            Fraction::ThreeQuarters => 0.75,
            Fraction::Half => 0.5,
            Fraction::Quarter => 0.25,
        }
    }
}

/// Custom dimension tag (`_CUSTOM_<len>[_W_<w>_H_<h>]`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomDims {
    pub length: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Structured type key: course stack plus display-only decorations
#[derive(Debug, Clone, PartialEq)]
pub struct TypeKey {
    pub base: BaseType,
    pub cut: Option<Fraction>,
    pub custom: Option<CustomDims>,
}

impl TypeKey {
    pub fn new(base: BaseType) -> Self {
        TypeKey {
            base,
            cut: None,
            custom: None,
        }
    }

    pub fn with_cut(mut self, cut: Fraction) -> Self {
        self.cut = Some(cut);
        self
    }

    pub fn with_custom(mut self, custom: CustomDims) -> Self {
        self.custom = Some(custom);
        self
    }

    /// True when the key carries a cut or custom suffix
    pub fn is_decorated(&self) -> bool {
        self.cut.is_some() || self.custom.is_some()
    }

    /// Parse a type string, resolving cut and custom suffixes
    pub fn parse(text: &str) -> Result<TypeKey> {
        let unsupported = || Error::UnsupportedType(text.to_string());

        let (head, custom) = match text.find("_CUSTOM_") {
            Some(pos) => {
                let dims =
                    parse_custom(&text[pos + "_CUSTOM_".len()..]).ok_or_else(unsupported)?;
                (&text[..pos], Some(dims))
            }
            None => (text, None),
        };

        if let Some(base) = BaseType::from_key(head) {
            return Ok(TypeKey {
                base,
                cut: None,
                custom,
            });
        }

        let (stem, suffix) = head.rsplit_once('_').ok_or_else(unsupported)?;
        let cut = Fraction::from_suffix(suffix).ok_or_else(unsupported)?;
        let base = BaseType::from_key(stem).ok_or_else(unsupported)?;
        Ok(TypeKey {
            base,
            cut: Some(cut),
            custom,
        })
    }
}

fn parse_custom(rest: &str) -> Option<CustomDims> {
    let parts: Vec<&str> = rest.split('_').collect();
    match parts.as_slice() {
        [length] => Some(CustomDims {
            length: parse_dim(length)?,
            width: None,
            height: None,
        }),
        [length, "W", w, "H", h] => Some(CustomDims {
            length: parse_dim(length)?,
            width: Some(parse_dim(w)?),
            height: Some(parse_dim(h)?),
        }),
        _ => None,
    }
}

fn parse_dim(text: &str) -> Option<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

impl From<BaseType> for TypeKey {
    fn from(base: BaseType) -> Self {
        TypeKey::new(base)
    }
}

impl FromStr for TypeKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TypeKey::parse(s)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.key())?;
        if let Some(cut) = self.cut {
            write!(f, "_{}", cut.suffix())?;
        }
        if let Some(custom) = &self.custom {
            write!(f, "_CUSTOM_{}", custom.length)?;
            if let (Some(w), Some(h)) = (custom.width, custom.height) {
                write!(f, "_W_{w}_H_{h}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for TypeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TypeKey::parse(&text).map_err(serde::de::Error::custom)
    }
}
