use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The six document layouts a submitter can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemplateChoice {
    #[default]
    Free,
    Classic,
    Floral,
    Royal,
    SidePortrait,
    Heritage,
}

/// Structural layout used to render a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Centered,
    SidePortrait,
}

impl TemplateChoice {
    pub const ALL: [TemplateChoice; 6] = [
        TemplateChoice::Free,
        TemplateChoice::Classic,
        TemplateChoice::Floral,
        TemplateChoice::Royal,
        TemplateChoice::SidePortrait,
        TemplateChoice::Heritage,
    ];

    pub fn code(self) -> u8 {
        match self {
            TemplateChoice::Free => 1,
            TemplateChoice::Classic => 2,
            TemplateChoice::Floral => 3,
            TemplateChoice::Royal => 4,
            TemplateChoice::SidePortrait => 5,
            TemplateChoice::Heritage => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn is_free(self) -> bool {
        matches!(self, TemplateChoice::Free)
    }

    pub fn layout(self) -> Layout {
        match self {
            TemplateChoice::SidePortrait => Layout::SidePortrait,
            TemplateChoice::Free
            | TemplateChoice::Classic
            | TemplateChoice::Floral
            | TemplateChoice::Royal
            | TemplateChoice::Heritage => Layout::Centered,
        }
    }

    /// Border artwork file under `<assets>/border/`.
    pub fn border_image(self) -> &'static str {
        match self {
            TemplateChoice::Free => "White.png",
            TemplateChoice::Classic => "bg0.png",
            TemplateChoice::Floral => "bg6.png",
            TemplateChoice::Royal => "bg8.jpg",
            TemplateChoice::SidePortrait => "bg9.jpg",
            TemplateChoice::Heritage => "bg10.jpg",
        }
    }

    /// Stored selector text. Empty or missing selectors mean the free tier.
    pub fn parse_stored(raw: Option<&str>) -> Result<Self, String> {
        match raw.map(str::trim) {
            None | Some("") => Ok(TemplateChoice::Free),
            Some(s) => s.parse(),
        }
    }
}

impl fmt::Display for TemplateChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for TemplateChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| format!("Unknown template_choice '{s}' (expected 1-6)"))
    }
}

impl Serialize for TemplateChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Accepts `"3"` as well as `3`.
impl<'de> Deserialize<'de> for TemplateChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let text = match raw {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => return Err(serde::de::Error::custom(format!("invalid template_choice: {other}"))),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}
