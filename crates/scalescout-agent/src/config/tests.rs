#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.llm.backend, BackendKind::OpenAi);
        assert_eq!(config.sources.max_per_source, 20);
        assert_eq!(config.sources.enabled_sources().unwrap(), PaperSource::ALL.to_vec());
        assert_eq!(config.pipeline.screen_limit, 80);
        assert_eq!(config.pipeline.extract_limit, 50);
        assert_eq!(config.pipeline.download_limit, 50);
        assert_eq!(config.pipeline.focus_areas[0], "definitions");
        assert_eq!(config.output.runs_dir, PathBuf::from("./data/runs"));
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_llm_timeout_is_independent_of_http_timeout() {
        let config = Config::from_toml("[http]\ntimeout_secs = 10\n").unwrap();
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
        assert_eq!(config.llm.backend_config().timeout, Duration::from_secs(120));

        let config = Config::from_toml("[llm]\ntimeout_secs = 300\n").unwrap();
        assert_eq!(config.llm.backend_config().timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let config = Config::from_toml(
            r#"
            [llm]
            backend = "ollama"
            model = "llama3.1:8b"

            [sources]
            enabled = ["arxiv", "crossref", "arxiv"]
            contact_email = "lab@example.org"

            [sources.requests_per_minute]
            arxiv = 10

            [pipeline]
            accept_threshold = 9
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.backend, BackendKind::Ollama);
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(
            config.sources.enabled_sources().unwrap(),
            vec![PaperSource::Arxiv, PaperSource::CrossRef]
        );
        assert_eq!(config.sources.max_per_source, 20);

        let settings = config.sources.settings().unwrap();
        assert_eq!(settings.rate_overrides.get(&PaperSource::Arxiv), Some(&10));
        assert_eq!(settings.contact_email.as_deref(), Some("lab@example.org"));

        let pipeline = config.pipeline.pipeline_config();
        assert_eq!(pipeline.accept_threshold, 5);
        assert_eq!(pipeline.abstract_chars, 500);
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let config = Config::from_toml("[sources]\nenabled = [\"scopus\"]").unwrap();
        assert!(config.sources.enabled_sources().is_err());

        let config = Config::from_toml("[sources.requests_per_minute]\nscopus = 5").unwrap();
        assert!(config.sources.settings().is_err());
    }

    #[test]
    fn test_api_key_falls_back_to_environment() {
        let mut llm = LlmConfig { backend: BackendKind::Anthropic, ..Default::default() };
        assert_eq!(llm.api_key_env(), "SCALESCOUT_ANTHROPIC_API_KEY");

        std::env::set_var("SCALESCOUT_ANTHROPIC_API_KEY", "from-env");
        assert_eq!(llm.resolved_api_key().as_deref(), Some("from-env"));

        llm.api_key = "from-file".to_string();
        let backend = llm.backend_config();
        assert_eq!(backend.api_key.as_deref(), Some("from-file"));
        assert_eq!(backend.max_tokens, 2000);
        std::env::remove_var("SCALESCOUT_ANTHROPIC_API_KEY");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.pipeline.download_timeout(), Duration::from_secs(60));

        let path = dir.path().join("scalescout.toml");
        std::fs::write(&path, "[output]\nruns_dir = \"/tmp/scout-runs\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.output.runs_dir, PathBuf::from("/tmp/scout-runs"));

        std::fs::write(&path, "[pipeline\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_extra_domains_are_allowlisted() {
        let http = HttpConfig {
            extra_allowed_domains: vec!["mirror.example.org".to_string()],
            ..Default::default()
        };
        let client = http.sandbox_client().unwrap();
        assert!(client.is_allowed("https://mirror.example.org/works"));
        assert!(!client.is_allowed("https://elsewhere.example.org/works"));
    }
}
