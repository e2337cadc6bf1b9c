/*!
 * Module Policy Integration Tests
 */

use ai_os_sandbox::core::limits::DEFAULT_RESTRICTED_MODULES;
use ai_os_sandbox::security::{
    DenyReason, PolicyConfig, PolicyMode, PolicySet, PolicyVerdict, SandboxError,
};
use proptest::prelude::*;

#[test]
fn test_default_policy_blocks_the_restricted_list() {
    let policy = PolicyConfig::default().to_policy_set().unwrap();

    assert_eq!(policy.mode(), PolicyMode::Denylist);
    for prefix in DEFAULT_RESTRICTED_MODULES {
        assert!(!policy.permits(prefix), "{prefix} should be denied");
        assert!(
            !policy.permits(&format!("{prefix}.child")),
            "{prefix}.child should be denied"
        );
    }

    for allowed in ["math", "json", "re", "collections", "xml.etree"] {
        assert!(policy.permits(allowed), "{allowed} should be permitted");
    }
}

#[test]
fn test_prefix_boundaries() {
    let policy = PolicySet::denylist(["http", "os"]).unwrap();

    assert!(!policy.permits("http.client"));
    assert!(policy.permits("httpx"));
    assert!(policy.permits("osmosis"));
    assert_eq!(
        policy.evaluate("http.client.parse"),
        PolicyVerdict::Deny(DenyReason::Restricted {
            prefix: "http".into()
        })
    );
}

#[test]
fn test_most_specific_allow_prefix() {
    let policy = PolicySet::allowlist(["xml.etree"]).unwrap();

    assert!(policy.permits("xml.etree"));
    assert!(policy.permits("xml.etree.ElementTree"));
    assert!(!policy.permits("xml"));
    assert!(!policy.permits("xml.dom"));
}

#[test]
fn test_policy_json_roundtrip_validates() {
    let config: PolicyConfig =
        serde_json::from_str(r#"{"mode": "allowlist", "prefixes": ["math", "json"]}"#).unwrap();
    let policy = config.to_policy_set().unwrap();
    assert_eq!(policy.prefixes(), vec!["json", "math"]);

    let config: PolicyConfig =
        serde_json::from_str(r#"{"mode": "denylist", "prefixes": ["ok", "not ok"]}"#).unwrap();
    assert!(matches!(
        config.to_policy_set(),
        Err(SandboxError::InvalidPrefix { .. })
    ));
}

proptest! {
    #[test]
    fn prop_submodules_inherit_verdict(
        prefix in "[a-z]{1,4}",
        child in "[a-z]{1,4}",
    ) {
        let deny = PolicySet::denylist([prefix.clone()]).unwrap();
        let allow = PolicySet::allowlist([prefix.clone()]).unwrap();
        let submodule = format!("{prefix}.{child}");

        prop_assert!(!deny.permits(&submodule));
        prop_assert!(allow.permits(&submodule));
    }
}
