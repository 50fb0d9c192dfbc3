use indexmap::IndexMap;
use thiserror::Error;

/// Why a game module failed to construct. The message always names the
/// module and the attribute, so a broken declarative file is diagnosable
/// from the log alone.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("game module {module} is missing the {attribute} attribute")]
    MissingRequired {
        module: String,
        attribute: &'static str,
    },
    #[error("game module {module} has an invalid {attribute} attribute: {message}")]
    InvalidValue {
        module: String,
        attribute: &'static str,
        message: String,
    },
}

/// Raw declared value before coercion: either straight text (always the
/// case for INI games) or an already-split list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    List(Vec<String>),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl AttrValue {
    /// `list` coercion: comma-separated text becomes one entry per comma.
    fn into_list(self) -> Vec<String> {
        match self {
            AttrValue::List(list) => list,
            AttrValue::Text(text) => text
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
        }
    }
}

/// The declarative attribute record of a game module.
///
/// Everything is optional here; `GameBindings::bind` applies coercions and
/// defaults and rejects records lacking a required field. This is the
/// descriptor-table replacement for attribute lookup by name: each known
/// field is an explicitly typed slot.
#[derive(Debug, Clone, Default)]
pub struct GameAttributes {
    pub name: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub game_name: Option<String>,
    pub game_short_name: Option<String>,
    pub game_nexus_name: Option<String>,
    pub nexus_game_id: Option<AttrValue>,
    pub valid_short_names: Option<AttrValue>,
    pub binary_name: Option<String>,
    pub launcher_name: Option<String>,
    pub data_directory: Option<String>,
    pub documents_directory: Option<String>,
    pub saves_directory: Option<String>,
    pub savegame_extension: Option<String>,
    pub steam_ids: Option<AttrValue>,
    pub gog_ids: Option<AttrValue>,
    pub epic_ids: Option<AttrValue>,
    pub origin_manifest_ids: Option<AttrValue>,
    pub ea_desktop_ids: Option<AttrValue>,
    pub ini_files: Option<AttrValue>,
    pub support_url: Option<String>,
}

impl GameAttributes {
    /// Overlay `over` onto `self`: the overlay wins on every field it sets.
    /// This is the documented precedence when a declarative INI and a
    /// native module describe the same game.
    pub fn overlay(mut self, over: GameAttributes) -> GameAttributes {
        macro_rules! take {
            ($field:ident) => {
                if over.$field.is_some() {
                    self.$field = over.$field;
                }
            };
        }
        take!(name);
        take!(author);
        take!(version);
        take!(description);
        take!(game_name);
        take!(game_short_name);
        take!(game_nexus_name);
        take!(nexus_game_id);
        take!(valid_short_names);
        take!(binary_name);
        take!(launcher_name);
        take!(data_directory);
        take!(documents_directory);
        take!(saves_directory);
        take!(savegame_extension);
        take!(steam_ids);
        take!(gog_ids);
        take!(epic_ids);
        take!(origin_manifest_ids);
        take!(ea_desktop_ids);
        take!(ini_files);
        take!(support_url);
        self
    }

    /// Read the attribute record from a declarative INI section. Option
    /// names are the case-sensitive compatibility surface.
    pub fn from_ini_section(options: &IndexMap<String, String>) -> GameAttributes {
        let get = |key: &str| options.get(key).cloned();
        let get_value = |key: &str| options.get(key).cloned().map(AttrValue::Text);
        GameAttributes {
            name: get("Name"),
            author: get("Author"),
            version: get("Version"),
            description: get("Description"),
            game_name: get("GameName"),
            game_short_name: get("GameShortName"),
            game_nexus_name: get("GameNexusName"),
            nexus_game_id: get_value("GameNexusId"),
            valid_short_names: get_value("GameValidShortNames"),
            binary_name: get("GameBinary"),
            launcher_name: get("GameLauncher"),
            data_directory: get("GameDataPath"),
            documents_directory: get("GameDocumentsDirectory"),
            saves_directory: get("GameSavesDirectory"),
            savegame_extension: get("GameSaveExtension"),
            steam_ids: get_value("GameSteamId"),
            gog_ids: get_value("GameGogId"),
            epic_ids: get_value("GameEpicId"),
            origin_manifest_ids: get_value("GameOriginManifestIds"),
            ea_desktop_ids: get_value("GameEaDesktopId"),
            ini_files: get_value("GameIniFiles"),
            support_url: get("GameSupportURL"),
        }
    }
}

/// A bound multi-valued field: the host selects the effective value once it
/// knows which one matched (e.g. which Steam id the detected install path
/// belongs to); until then the first entry applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsMapping {
    values: Vec<String>,
    current: Option<usize>,
}

impl OptionsMapping {
    pub fn new(values: Vec<String>) -> Self {
        Self {
            values,
            current: None,
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The selected value, or the first one while nothing is selected.
    pub fn current(&self) -> Option<&str> {
        let index = self.current.unwrap_or(0);
        self.values.get(index).map(String::as_str)
    }

    /// Select a value. Returns false (and keeps the previous selection)
    /// when the value is not one of the declared options.
    pub fn set_value(&mut self, value: &str) -> bool {
        match self.values.iter().position(|v| v == value) {
            Some(index) => {
                self.current = Some(index);
                true
            }
            None => false,
        }
    }
}

/// Fully bound attributes: every coercion applied, every default filled,
/// every required field present. Strings still carry `%TOKEN%` variables;
/// the game module resolves them on read.
#[derive(Debug, Clone)]
pub struct GameBindings {
    pub name: String,
    pub author: String,
    pub version: String,
    pub description: String,
    pub game_name: String,
    pub game_short_name: String,
    pub game_nexus_name: String,
    pub nexus_game_id: u32,
    pub valid_short_names: Vec<String>,
    pub binary_name: String,
    pub launcher_name: Option<String>,
    pub data_directory: String,
    pub documents_directory: Option<String>,
    pub saves_directory: Option<String>,
    pub savegame_extension: String,
    pub steam_ids: OptionsMapping,
    pub gog_ids: OptionsMapping,
    pub epic_ids: OptionsMapping,
    pub origin_manifest_ids: OptionsMapping,
    pub ea_desktop_ids: OptionsMapping,
    pub ini_files: Vec<String>,
    pub support_url: Option<String>,
}

impl GameBindings {
    pub fn bind(module: &str, attrs: GameAttributes) -> Result<GameBindings, BindingError> {
        let required = |attribute: &'static str, value: Option<String>| {
            value.ok_or_else(|| BindingError::MissingRequired {
                module: module.to_string(),
                attribute,
            })
        };

        let game_name = required("GameName", attrs.game_name)?;
        let game_short_name = required("GameShortName", attrs.game_short_name)?;
        let description = attrs
            .description
            .unwrap_or_else(|| format!("Adds basic support for game {game_name}."));
        let game_nexus_name = attrs
            .game_nexus_name
            .unwrap_or_else(|| game_short_name.clone());

        Ok(GameBindings {
            name: required("Name", attrs.name)?,
            author: required("Author", attrs.author)?,
            version: required("Version", attrs.version)?,
            description,
            game_nexus_name,
            nexus_game_id: numeric_id(module, "GameNexusId", attrs.nexus_game_id)?,
            valid_short_names: attrs
                .valid_short_names
                .map(AttrValue::into_list)
                .unwrap_or_default(),
            binary_name: required("GameBinary", attrs.binary_name)?,
            launcher_name: attrs.launcher_name.filter(|l| !l.is_empty()),
            data_directory: required("GameDataPath", attrs.data_directory)?,
            documents_directory: attrs.documents_directory,
            saves_directory: attrs.saves_directory,
            savegame_extension: attrs
                .savegame_extension
                .unwrap_or_else(|| "save".to_string()),
            steam_ids: numeric_ids(module, "GameSteamId", attrs.steam_ids)?,
            gog_ids: numeric_ids(module, "GameGogId", attrs.gog_ids)?,
            epic_ids: free_ids(attrs.epic_ids),
            origin_manifest_ids: free_ids(attrs.origin_manifest_ids),
            ea_desktop_ids: free_ids(attrs.ea_desktop_ids),
            ini_files: attrs.ini_files.map(AttrValue::into_list).unwrap_or_default(),
            support_url: attrs.support_url,
            game_name,
            game_short_name,
        })
    }
}

/// `ids` coercion for stores whose ids are decimal app ids.
fn numeric_ids(
    module: &str,
    attribute: &'static str,
    value: Option<AttrValue>,
) -> Result<OptionsMapping, BindingError> {
    let ids = value.map(AttrValue::into_list).unwrap_or_default();
    for id in &ids {
        if !id.chars().all(|c| c.is_ascii_digit()) || id.is_empty() {
            return Err(BindingError::InvalidValue {
                module: module.to_string(),
                attribute,
                message: format!("{id:?} is not a numeric id"),
            });
        }
    }
    Ok(OptionsMapping::new(ids))
}

/// Ids that are free-form strings (Epic app names, Origin manifests).
fn free_ids(value: Option<AttrValue>) -> OptionsMapping {
    OptionsMapping::new(value.map(AttrValue::into_list).unwrap_or_default())
}

fn numeric_id(
    module: &str,
    attribute: &'static str,
    value: Option<AttrValue>,
) -> Result<u32, BindingError> {
    let Some(value) = value else {
        return Ok(0);
    };
    let text = match value {
        AttrValue::Text(text) => text,
        AttrValue::List(_) => {
            return Err(BindingError::InvalidValue {
                module: module.to_string(),
                attribute,
                message: "expected a single numeric id".to_string(),
            })
        }
    };
    text.trim()
        .parse::<u32>()
        .map_err(|_| BindingError::InvalidValue {
            module: module.to_string(),
            attribute,
            message: format!("{text:?} is not a numeric id"),
        })
}
