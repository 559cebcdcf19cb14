//! Premium/standard feature tiering.

use std::collections::BTreeMap;

use amora_common::{AppError, AppResult};
use amora_db::{
    entities::{app_setting::FEATURE_FLAGS_KEY, user},
    repositories::AppSettingRepository,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Account tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Premium,
    Standard,
}

impl Tier {
    /// The tier a user belongs to.
    #[must_use]
    pub const fn of(user: &user::Model) -> Self {
        if user.is_premium {
            Self::Premium
        } else {
            Self::Standard
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Premium => "premium",
            Self::Standard => "standard",
        }
    }
}

/// Built-in matrix: (feature, premium, standard).
const DEFAULT_FEATURES: &[(&str, bool, bool)] = &[
    ("unlimited_likes", true, false),
    ("see_who_liked_you", true, false),
    ("profile_visitors", true, false),
    ("rewind", true, false),
    ("read_receipts", true, false),
    ("incognito_mode", true, false),
    ("advanced_filters", true, false),
    ("free_chat_initiation", true, false),
    ("ad_free", true, false),
    ("voice_messages", true, true),
    ("video_calls", true, true),
];

/// Tier × feature capability matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureMatrix {
    premium: BTreeMap<String, bool>,
    standard: BTreeMap<String, bool>,
}

impl FeatureMatrix {
    /// The built-in matrix.
    #[must_use]
    pub fn defaults() -> Self {
        let mut premium = BTreeMap::new();
        let mut standard = BTreeMap::new();
        for (feature, p, s) in DEFAULT_FEATURES {
            premium.insert((*feature).to_string(), *p);
            standard.insert((*feature).to_string(), *s);
        }
        Self { premium, standard }
    }

    /// Defaults with stored overrides laid over them key by key.
    ///
    /// `overrides` looks like `{"premium": {"rewind": false}, "standard": {...}}`.
    /// Keys absent from the override keep their default; values that are not
    /// booleans are ignored.
    #[must_use]
    pub fn merged(overrides: &Value) -> Self {
        let mut matrix = Self::defaults();
        for tier in [Tier::Premium, Tier::Standard] {
            let Some(entries) = overrides.get(tier.key()).and_then(Value::as_object) else {
                continue;
            };
            let flags = matrix.flags_mut(tier);
            for (feature, value) in entries {
                if let Some(enabled) = value.as_bool() {
                    flags.insert(feature.clone(), enabled);
                }
            }
        }
        matrix
    }

    /// Whether `tier` has `feature`. Unknown features are off.
    #[must_use]
    pub fn has_feature(&self, tier: Tier, feature: &str) -> bool {
        self.flags(tier).get(feature).copied().unwrap_or(false)
    }

    /// All flags for a tier.
    #[must_use]
    pub const fn flags(&self, tier: Tier) -> &BTreeMap<String, bool> {
        match tier {
            Tier::Premium => &self.premium,
            Tier::Standard => &self.standard,
        }
    }

    fn flags_mut(&mut self, tier: Tier) -> &mut BTreeMap<String, bool> {
        match tier {
            Tier::Premium => &mut self.premium,
            Tier::Standard => &mut self.standard,
        }
    }
}

/// Service for the persisted feature matrix.
#[derive(Clone)]
pub struct FeatureFlagService {
    setting_repo: AppSettingRepository,
}

impl FeatureFlagService {
    /// Create a new feature flag service.
    #[must_use]
    pub const fn new(setting_repo: AppSettingRepository) -> Self {
        Self { setting_repo }
    }

    /// The current matrix: defaults merged with stored overrides.
    pub async fn matrix(&self) -> AppResult<FeatureMatrix> {
        Ok(match self.setting_repo.get(FEATURE_FLAGS_KEY).await? {
            Some(overrides) => FeatureMatrix::merged(&overrides),
            None => FeatureMatrix::defaults(),
        })
    }

    /// Whether `user` may use `feature`.
    pub async fn user_has_feature(&self, user: &user::Model, feature: &str) -> AppResult<bool> {
        Ok(self.matrix().await?.has_feature(Tier::of(user), feature))
    }

    /// Replace the stored overrides.
    pub async fn set_overrides(&self, overrides: Value) -> AppResult<FeatureMatrix> {
        let object = overrides
            .as_object()
            .ok_or_else(|| AppError::Validation("Feature overrides must be an object".to_string()))?;
        if let Some(unknown) = object
            .keys()
            .find(|k| *k != Tier::Premium.key() && *k != Tier::Standard.key())
        {
            return Err(AppError::Validation(format!("Unknown tier: {unknown}")));
        }

        self.setting_repo
            .set(FEATURE_FLAGS_KEY, overrides.clone())
            .await?;
        Ok(FeatureMatrix::merged(&overrides))
    }
}
