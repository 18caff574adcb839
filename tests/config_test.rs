//! Configuration Integration Tests
//!
//! YAML parsing, file loading with environment expansion, validation, and
//! building a strategy from the loaded configuration.

#[cfg(test)]
mod tests {
    use bearer_strategy::auth::{AuthContext, AuthError, AuthRequest, JwtStrategy, Strategy};
    use bearer_strategy::config::{
        Config, ConfigError, ConfigLoader, LogFormat, SecretConfig, StrategyConfig,
    };
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use serde_json::json;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_minimal_config() {
        let config = ConfigLoader::from_str("strategy:\n  secret: so-secret\n").unwrap();

        assert_eq!(config.strategy.secret, SecretConfig::Static("so-secret".into()));
        assert_eq!(config.strategy.header, None);
        assert_eq!(config.strategy.algorithm, "HS256");
        assert!(config.strategy.revoked_token_digests.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
strategy:
  secret:
    url: "https://vault.internal/jwt-secret"
    timeout_seconds: 3
  header: "x-auth"
  query: "accessToken"
  expire_field: "tokenExpiresAt"
  allowed_scopes: ["user", "admin"]
  algorithm: "HS384"
logging:
  level: "debug"
  format: "pretty"
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();

        assert_eq!(
            config.strategy.secret,
            SecretConfig::Remote {
                url: "https://vault.internal/jwt-secret".into(),
                timeout_seconds: 3
            }
        );
        assert_eq!(config.strategy.header.as_deref(), Some("x-auth"));
        assert_eq!(config.strategy.query.as_deref(), Some("accessToken"));
        assert_eq!(
            config.strategy.expire_field.as_deref(),
            Some("tokenExpiresAt")
        );
        assert_eq!(
            config.strategy.allowed_scopes,
            Some(vec!["user".to_string(), "admin".to_string()])
        );
        assert_eq!(config.strategy.algorithm().unwrap(), Algorithm::HS384);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_secret_config() {
        let config =
            ConfigLoader::from_str("strategy:\n  secret:\n    env: JWT_SECRET\n").unwrap();
        assert_eq!(
            config.strategy.secret,
            SecretConfig::Env {
                env: "JWT_SECRET".into()
            }
        );
    }

    #[test]
    fn test_missing_strategy_section() {
        let result = ConfigLoader::from_str("logging:\n  level: info\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_log_format() {
        let result =
            ConfigLoader::from_str("strategy:\n  secret: s\nlogging:\n  format: xml\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_validation_errors() {
        let cases = [
            "strategy:\n  secret: s\n  header: \"\"\n",
            "strategy:\n  secret: s\n  query: \" \"\n",
            "strategy:\n  secret: s\n  expire_field: \"\"\n",
            "strategy:\n  secret: s\n  algorithm: RS256\n",
            "strategy:\n  secret: s\n  algorithm: XX999\n",
            "strategy:\n  secret:\n    url: vault.internal\n",
            "strategy:\n  secret: s\nlogging:\n  level: loud\n",
        ];

        for yaml in cases {
            let result = ConfigLoader::from_str(yaml);
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "expected validation error for {:?}",
                yaml
            );
        }
    }

    #[test]
    fn test_empty_secret() {
        let result = ConfigLoader::from_str("strategy:\n  secret: \"\"\n");
        assert!(matches!(result, Err(ConfigError::EmptySecret)));
    }

    // ========================================================================
    // Loading from disk
    // ========================================================================

    #[test]
    fn test_load_from_file() {
        let file = write_config("strategy:\n  secret: so-secret\n  query: accessToken\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.strategy.query.as_deref(), Some("accessToken"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/strategy.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    #[serial]
    fn test_load_expands_env_vars() {
        std::env::set_var("BEARER_CONFIG_TEST_SECRET", "from-env");
        std::env::remove_var("BEARER_CONFIG_TEST_LEVEL");

        let file = write_config(
            "strategy:\n  secret: \"${BEARER_CONFIG_TEST_SECRET}\"\nlogging:\n  level: \"${BEARER_CONFIG_TEST_LEVEL:-warn}\"\n",
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.strategy.secret, SecretConfig::Static("from-env".into()));
        assert_eq!(config.logging.level, "warn");

        std::env::remove_var("BEARER_CONFIG_TEST_SECRET");
    }

    // ========================================================================
    // Strategy from config
    // ========================================================================

    #[tokio::test]
    async fn test_strategy_from_loaded_config() {
        let file = write_config(
            "strategy:\n  secret: so-secret\n  query: accessToken\n  allowed_scopes: [user]\n",
        );
        let config = Config::load(file.path()).unwrap();
        let strategy = JwtStrategy::from_config(&config.strategy).unwrap();

        let token = encode(
            &Header::default(),
            &json!({"iss": "myself"}),
            &EncodingKey::from_secret(b"so-secret"),
        )
        .unwrap();
        let ctx = AuthContext::new(AuthRequest::from_uri(
            "GET",
            &format!("/?accessToken={}", token),
        ));

        assert!(strategy.authenticate(&ctx, "user").await.unwrap().is_authenticated());
        assert!(!strategy.authenticate(&ctx, "admin").await.unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn test_builder_from_config_accepts_code_hooks() {
        let config = StrategyConfig::with_static_secret("so-secret");
        let strategy = JwtStrategy::builder_from_config(&config)
            .unwrap()
            .with_claims_processor(bearer_strategy::auth::processor_fn(|_ctx, _claims| async {
                Ok::<_, AuthError>(json!(false))
            }))
            .build()
            .unwrap();

        let token = encode(
            &Header::default(),
            &json!({"iss": "myself"}),
            &EncodingKey::from_secret(b"so-secret"),
        )
        .unwrap();
        let ctx = AuthContext::new(
            AuthRequest::default().with_header("authorization", &format!("Bearer {}", token)),
        );

        let result = strategy.authenticate(&ctx, "whatever").await;
        assert!(matches!(result, Err(AuthError::ProcessorRejected)));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = StrategyConfig::with_static_secret("");
        assert!(matches!(
            JwtStrategy::from_config(&config),
            Err(ConfigError::EmptySecret)
        ));
    }
}
