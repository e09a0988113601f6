use serde::Deserialize;

/// Which flavour of the transactions load script to reproduce.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
pub enum ScriptVariant {
    /// String account ids, page 0, no bootstrap create, no get-by-id task.
    #[strum(to_string = "basic", serialize = "v1")]
    #[serde(rename = "basic", alias = "v1")]
    Basic,

    /// Numeric account ids, decimal-string amounts, bootstrap creates, get-by-id task.
    #[default]
    #[strum(to_string = "extended", serialize = "v2")]
    #[serde(rename = "extended", alias = "v2")]
    Extended,
}

impl ScriptVariant {
    #[must_use]
    pub fn bootstraps(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub fn has_get_by_id(self) -> bool {
        matches!(self, Self::Extended)
    }

    #[must_use]
    pub fn default_page(self) -> u32 {
        match self {
            Self::Basic => 0,
            Self::Extended => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskWeights {
    pub list: u32,
    pub create: u32,
    pub update: u32,
    pub delete: u32,
    pub get: u32,
}

impl Default for TaskWeights {
    fn default() -> Self {
        Self {
            list: 2,
            create: 3,
            update: 1,
            delete: 1,
            get: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    pub variant: ScriptVariant,
    pub page: u32,
    pub size: u32,
    /// Extended variant: run one create first while fewer ids than this are known.
    pub bootstrap_below: usize,
    pub weights: TaskWeights,
}

impl DriverOptions {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;

    #[must_use]
    pub fn for_variant(variant: ScriptVariant) -> Self {
        Self {
            variant,
            page: variant.default_page(),
            size: Self::DEFAULT_PAGE_SIZE,
            bootstrap_below: 1,
            weights: TaskWeights::default(),
        }
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::for_variant(ScriptVariant::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_parses_names_and_aliases() {
        assert_eq!("basic".parse::<ScriptVariant>(), Ok(ScriptVariant::Basic));
        assert_eq!("v1".parse::<ScriptVariant>(), Ok(ScriptVariant::Basic));
        assert_eq!("v2".parse::<ScriptVariant>(), Ok(ScriptVariant::Extended));
        assert!("v3".parse::<ScriptVariant>().is_err());
        assert_eq!(ScriptVariant::Extended.to_string(), "extended");
    }

    #[test]
    fn defaults_depend_on_variant() {
        let basic = DriverOptions::for_variant(ScriptVariant::Basic);
        assert_eq!(basic.page, 0);
        assert_eq!(basic.size, 10);

        let extended = DriverOptions::default();
        assert_eq!(extended.variant, ScriptVariant::Extended);
        assert_eq!(extended.page, 1);
        assert_eq!(extended.bootstrap_below, 1);
        assert_eq!(extended.weights, TaskWeights::default());
    }
}
