use punch_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Variable de entorno inválida {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("Error de configuración de base de datos: {0}")]
    Database(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_variant_format() {
        let err = ConfigError::Invalid { key: "PUNCHFLOW_DEADLINE_MS",
                                         value: "abc".into() };
        assert_eq!(err.to_string(), "Variable de entorno inválida PUNCHFLOW_DEADLINE_MS: \"abc\"");
    }
}
