use super::schema::Config;

macro_rules! define_credentials {
    ($( $name:literal, $env:literal => $($path:ident).+ );* $(;)?) => {
        /// (slot name, env var name) pairs.
        pub const CREDENTIAL_ENV_VARS: &[(&str, &str)] = &[$(($name, $env)),*];

        /// Get the current value of a credential field by slot name.
        pub fn get_credential_value<'a>(config: &'a Config, name: &str) -> Option<&'a str> {
            match name {
                $($name => Some(config.$($path).+.as_str()),)*
                _ => None,
            }
        }

        /// Apply environment variable overrides.
        ///
        /// Any `RELMAP_*` env var that is set and non-empty will overwrite the
        /// corresponding config field, so tokens never have to live in the
        /// config file.
        pub fn apply_env_overrides(config: &mut Config) {
            apply_overrides_from(config, |var| std::env::var(var).ok());
        }

        fn apply_overrides_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
            $(
                if let Some(val) = lookup($env) {
                    if !val.is_empty() {
                        config.$($path).+ = val;
                    }
                }
            )*
        }
    };
}

/// Credentials still empty after env overrides, as (slot name, env var) pairs.
pub fn missing_credentials(config: &Config) -> Vec<(&'static str, &'static str)> {
    CREDENTIAL_ENV_VARS
        .iter()
        .filter(|(name, _)| get_credential_value(config, name).is_none_or(|v| v.trim().is_empty()))
        .copied()
        .collect()
}

define_credentials! {
    "discord-token",     "RELMAP_DISCORD_TOKEN"     => discord.token;
    "sentiment-api-key", "RELMAP_SENTIMENT_API_KEY" => sentiment.api_key;
}
