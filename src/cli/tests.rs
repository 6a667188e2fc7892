#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(&["til-agent-rs"]).unwrap();

        assert_eq!(args.input, PathBuf::from("./commits.json"));
        assert_eq!(args.output_path, PathBuf::from("./til.docs"));
        assert!(!args.verbose);
        assert!(!args.no_search);
        assert!(!args.no_cache);
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from(&[
            "til-agent-rs",
            "-i", "/test/commits.json",
            "-o", "/test/output",
            "-v"
        ]).unwrap();

        assert_eq!(args.input, PathBuf::from("/test/commits.json"));
        assert_eq!(args.output_path, PathBuf::from("/test/output"));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_llm_options() {
        let args = Args::try_parse_from(&[
            "til-agent-rs",
            "--llm-provider", "openai",
            "--llm-api-key", "test-key",
            "--llm-api-base-url", "https://api.openai.com/v1",
            "--model-efficient", "gpt-4o-mini",
            "--model-powerful", "gpt-4o",
            "--max-tokens", "2048",
            "--temperature", "0.7",
            "--max-parallels", "5"
        ]).unwrap();

        assert_eq!(args.llm_provider, Some("openai".to_string()));
        assert_eq!(args.llm_api_key, Some("test-key".to_string()));
        assert_eq!(args.llm_api_base_url, Some("https://api.openai.com/v1".to_string()));
        assert_eq!(args.model_efficient, Some("gpt-4o-mini".to_string()));
        assert_eq!(args.model_powerful, Some("gpt-4o".to_string()));
        assert_eq!(args.max_tokens, Some(2048));
        assert_eq!(args.temperature, Some(0.7));
        assert_eq!(args.max_parallels, Some(5));
    }

    #[test]
    fn test_args_target_language() {
        let args = Args::try_parse_from(&[
            "til-agent-rs",
            "--target-language", "ko"
        ]).unwrap();

        assert_eq!(args.target_language, Some("ko".to_string()));
    }

    #[test]
    fn test_into_config_basic() {
        let args = Args::try_parse_from(&[
            "til-agent-rs",
            "-i", "/test/commits.json",
            "-o", "/test/output"
        ]).unwrap();

        let config = args.into_config();

        assert_eq!(config.input_path, PathBuf::from("/test/commits.json"));
        assert_eq!(config.output_path, PathBuf::from("/test/output"));
        assert!(!config.verbose);
    }

    #[test]
    fn test_into_config_with_overrides() {
        let args = Args::try_parse_from(&[
            "til-agent-rs",
            "--verbose",
            "--llm-provider", "deepseek",
            "--model-efficient", "deepseek-chat",
            "--target-language", "en"
        ]).unwrap();

        let config = args.into_config();

        assert!(config.verbose);
        assert_eq!(config.llm.provider, crate::config::LLMProvider::DeepSeek);
        assert_eq!(config.llm.model_efficient, "deepseek-chat");
        assert_eq!(config.target_language, crate::i18n::TargetLanguage::English);
    }

    #[test]
    fn test_into_config_no_search_no_cache() {
        let args = Args::try_parse_from(&[
            "til-agent-rs",
            "--no-search",
            "--no-cache"
        ]).unwrap();

        let config = args.into_config();
        assert!(!config.search.enabled);
        assert!(!config.cache.enabled);
    }
}
