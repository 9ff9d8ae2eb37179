use super::*;

#[test]
fn provider_defaults_to_anthropic() {
    assert_eq!(parse_provider(None).expect("default"), LlmProviderKind::Anthropic);
    assert_eq!(parse_provider(Some("")).expect("blank"), LlmProviderKind::Anthropic);
    assert_eq!(parse_provider(Some(" anthropic ")).expect("padded"), LlmProviderKind::Anthropic);
}

#[test]
fn unknown_provider_is_config_error() {
    let err = parse_provider(Some("openai")).expect_err("unsupported");
    assert!(matches!(err, LlmError::ConfigParse(msg) if msg.contains("openai")));
}

#[test]
fn default_model_per_provider() {
    assert_eq!(default_model(LlmProviderKind::Anthropic), DEFAULT_ANTHROPIC_MODEL);
}

#[test]
fn timeouts_default() {
    let t = LlmTimeouts::default();
    assert_eq!(t.request_secs, 120);
    assert_eq!(t.connect_secs, 10);
}
