use distill_config::{ConfigError, DistillConfig};
use figment::Jail;
use pretty_assertions::assert_eq;

#[test]
fn env_maps_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("DISTILL_DATABASE__PATH", "/tmp/env.db");
        jail.set_env("DISTILL_SEARCH__MAX_RESULTS", "9");
        jail.set_env("DISTILL_INFERENCE__BASE_URL", "http://gpu-box:8000");

        let config = DistillConfig::load().expect("config loads");
        assert_eq!(config.database.path, "/tmp/env.db");
        assert_eq!(config.search.max_results, 9);
        assert_eq!(config.inference.base_url, "http://gpu-box:8000");
        Ok(())
    });
}

#[test]
fn env_beats_local_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "distill.toml",
            r#"
[queue]
search_queue = "from-toml"
"#,
        )?;
        jail.set_env("DISTILL_QUEUE__SEARCH_QUEUE", "from-env");

        let config = DistillConfig::load().expect("config loads");
        assert_eq!(config.queue.search_queue, "from-env");
        Ok(())
    });
}

#[test]
fn malformed_value_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.set_env("DISTILL_SEARCH__MAX_RESULTS", "plenty");

        let err = DistillConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}
