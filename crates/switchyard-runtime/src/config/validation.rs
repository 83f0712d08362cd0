//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AppConfig, LogOutput, LoggingConfig};
use switchyard_core::{DispatchConfig, naming};
use switchyard_framework::MiddlewareSpec;

/// Validates the entire configuration.
pub fn validate_config(config: &AppConfig) -> ConfigResult<()> {
    validate_dispatch_config(&config.dispatch)?;
    validate_logging_config(&config.logging)?;
    validate_global_middleware(&config.global_middleware)?;
    Ok(())
}

/// Validates naming and defaulting rules.
fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.default_controller.is_empty() {
        return Err(ConfigError::Required("dispatch.default_controller"));
    }
    if !naming::is_valid_controller(&dispatch.default_controller) {
        return Err(ConfigError::invalid(
            "dispatch.default_controller",
            format!("'{}' is not a controller name", dispatch.default_controller),
        ));
    }

    if dispatch.default_action.is_empty() {
        return Err(ConfigError::Required("dispatch.default_action"));
    }

    if !dispatch.empty_controller.is_empty()
        && !naming::is_valid_controller(&dispatch.empty_controller)
    {
        return Err(ConfigError::invalid(
            "dispatch.empty_controller",
            format!("'{}' is not a controller name", dispatch.empty_controller),
        ));
    }

    if dispatch.controller_suffix && dispatch.suffix.is_empty() {
        return Err(ConfigError::invalid(
            "dispatch.suffix",
            "must not be empty while controller_suffix is on",
        ));
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::Required("logging.file_path"));
    }
    Ok(())
}

/// Validates global middleware identifiers.
fn validate_global_middleware(identifiers: &[String]) -> ConfigResult<()> {
    for identifier in identifiers {
        if MiddlewareSpec::parse(identifier).name().is_empty() {
            return Err(ConfigError::invalid(
                "global_middleware",
                format!("'{identifier}' has no middleware name"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_default_controller() {
        let mut config = AppConfig::default();
        config.dispatch.default_controller = "-home".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid { key: "dispatch.default_controller", .. })
        ));

        config.dispatch.default_controller.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Required("dispatch.default_controller"))
        ));
    }

    #[test]
    fn test_rejects_empty_suffix() {
        let mut config = AppConfig::default();
        config.dispatch.controller_suffix = true;
        config.dispatch.suffix.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = AppConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_nameless_middleware() {
        let config = AppConfig {
            global_middleware: vec![":60".into()],
            ..AppConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
