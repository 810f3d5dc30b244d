//! # Localization
//!
//! Every chat-facing string comes from the embedded pt-BR Fluent catalog.

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use lazy_static::lazy_static;
use tracing::{error, warn};
use unic_langid::LanguageIdentifier;

const DEFAULT_LOCALE: &str = "pt-BR";
const PT_BR_CATALOG: &str = include_str!("../locales/pt-BR/main.ftl");

lazy_static! {
    static ref LOCALIZATION_MANAGER: LocalizationManager = LocalizationManager::new();
}

/// Localization manager backed by a thread-safe Fluent bundle
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    fn new() -> Self {
        let locale: LanguageIdentifier = DEFAULT_LOCALE.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        bundle.set_use_isolating(false);

        let resource = match FluentResource::try_new(PT_BR_CATALOG.to_string()) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                error!(count = errors.len(), "Fluent catalog has syntax errors");
                resource
            }
        };
        if let Err(errors) = bundle.add_resource(resource) {
            error!(count = errors.len(), "Fluent catalog has duplicate messages");
        }

        Self { bundle }
    }

    /// Format a message; a missing key renders as the key itself
    pub fn get_message(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(pattern) = self.bundle.get_message(key).and_then(|msg| msg.value()) else {
            warn!(key, "Missing translation");
            return key.to_string();
        };

        let fluent_args = (!args.is_empty()).then(|| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = self
            .bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, errors = ?errors, "Translation formatted with errors");
        }
        value.into_owned()
    }
}

/// Get a localized message
pub fn t(key: &str) -> String {
    LOCALIZATION_MANAGER.get_message(key, &[])
}

/// Get a localized message with string arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    LOCALIZATION_MANAGER.get_message(key, args)
}
