//! TOML layering, sandboxed with `figment::Jail`.

use distill_config::DistillConfig;
use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/var/lib/distill/pipeline.db"
busy_timeout_ms = 250

[search]
searxng_url = "http://searx.internal:8888"
max_results = 3
crawl_delay_ms = 0

[inference]
model = "hugging-quants/Meta-Llama-3.1-8B-Instruct-AWQ-INT4"
max_model_len = 8192
language = "German"
"#,
        )?;

        let config: DistillConfig = Figment::from(Serialized::defaults(DistillConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "/var/lib/distill/pipeline.db");
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.search.searxng_url, "http://searx.internal:8888");
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.search.crawl_delay_ms, 0);
        assert_eq!(config.inference.max_model_len, 8192);
        assert_eq!(config.inference.language, "German");
        assert!(config.inference.has_model_override());
        // untouched sections keep defaults
        assert_eq!(config.queue.search_queue, "search-queue");
        assert_eq!(config.worker.stale_claim_secs, 1800);
        Ok(())
    });
}

#[test]
fn partial_section_keeps_field_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[queue]
analysis_queue = "analysis-v2"
"#,
        )?;

        let config: DistillConfig = Figment::from(Serialized::defaults(DistillConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.queue.analysis_queue, "analysis-v2");
        assert_eq!(config.queue.search_queue, "search-queue");
        assert_eq!(config.queue.poll_interval_ms, 500);
        Ok(())
    });
}

#[test]
fn local_distill_toml_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "distill.toml",
            r#"
[worker]
sweep_interval_secs = 120
"#,
        )?;

        let config = DistillConfig::load().expect("config loads");
        assert_eq!(config.worker.sweep_interval_secs, 120);
        Ok(())
    });
}
