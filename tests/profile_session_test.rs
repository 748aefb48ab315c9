// ==========================================
// 配置编辑会话集成测试
// ==========================================
// 测试范围:
// 1. 版本删除保护 / 复制隔离 / 回退版本
// 2. 未保存标记与确认回调
// 3. 存储失败时会话保持未保存
// 4. 规则与样本编辑经保存后可重新加载
// 5. 损坏版本不阻断会话打开，未识别字段经编辑保存后保留
// ==========================================

mod helpers;

use bayes_profile_engine::config::default_profile;
use bayes_profile_engine::engine::rule_codec::{
    EditableCompleteness, EditableRule, KeywordEditRow, ParamEditRow,
};
use bayes_profile_engine::engine::SampleRow;
use bayes_profile_engine::repository::{FileProfileStore, InMemoryProfileStore};
use bayes_profile_engine::{ProfileError, ProfileSession, ProfileStore, SampleBucket, ScoringRule};
use helpers::failing_store::FailingStore;
use serde_json::json;
use std::sync::Arc;
use test_helpers::*;

// ==========================================
// 版本删除 / 复制
// ==========================================

#[tokio::test]
async fn test_delete_last_version_is_refused() {
    let store = memory_store_with(&["v1"]);
    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();

    let result = session.delete_current(|| true).await;
    assert!(matches!(result, Err(ProfileError::LastVersionError(ref v)) if v == "v1"));
    assert_eq!(store.list_versions().await.unwrap(), vec!["v1"]);
    assert_eq!(session.current_version(), Some("v1"));
}

#[tokio::test]
async fn test_copy_then_delete_falls_back_to_copy() {
    let store = memory_store_with(&["v1"]);
    let mut session = ProfileSession::open(store.clone(), Some("v1")).await.unwrap();

    let created = session.copy_current("v1_copy").await.unwrap();
    assert_eq!(created, "v1_copy");
    assert_eq!(session.current_version(), Some("v1"));
    assert_eq!(session.known_versions(), ["v1", "v1_copy"]);

    let fallback = session.delete_current(|| true).await.unwrap();
    assert_eq!(fallback, "v1_copy");
    assert_eq!(store.list_versions().await.unwrap(), vec!["v1_copy"]);
    assert_eq!(session.current_version(), Some("v1_copy"));
}

#[tokio::test]
async fn test_copy_is_isolated_from_source() {
    let store = memory_store_with(&["src"]);
    let mut session = ProfileSession::open(store.clone(), Some("src")).await.unwrap();
    session.copy_current("x").await.unwrap();

    session.switch_version("x", || true).await.unwrap();
    session.set_weight("weights.bayesian", 0.5).unwrap();
    session.set_weight("weights.ai", 0.2).unwrap();
    session.save().await.unwrap();

    let src = store.load("src").await.unwrap();
    assert_eq!(src["weights"]["bayesian"], 0.4);
    assert_eq!(src["weights"]["ai"], 0.3);
}

#[tokio::test]
async fn test_copy_rejects_bad_and_duplicate_names() {
    let store = memory_store_with(&["v1", "v2"]);
    let mut session = ProfileSession::open(store, None).await.unwrap();

    assert!(matches!(
        session.copy_current("v2").await,
        Err(ProfileError::DuplicateName(_))
    ));
    assert!(matches!(
        session.copy_current("new version").await,
        Err(ProfileError::InvalidName(_))
    ));
    assert!(matches!(
        session.copy_current("   ").await,
        Err(ProfileError::InvalidName(_))
    ));
}

// ==========================================
// 未保存标记
// ==========================================

#[tokio::test]
async fn test_delete_with_unsaved_changes_needs_confirmation() {
    let store = memory_store_with(&["v1", "v2"]);
    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();
    session.set_risk_penalty(5, 20).unwrap();

    let result = session.delete_current(|| false).await;
    assert!(matches!(result, Err(ProfileError::UnsavedChanges)));
    assert_eq!(store.list_versions().await.unwrap().len(), 2);
    assert!(session.is_dirty());
}

#[tokio::test]
async fn test_reload_discards_edits() {
    let store = memory_store_with(&["v1"]);
    let mut session = ProfileSession::open(store, None).await.unwrap();
    session.set_weight("weights.ai", 0.9).unwrap();

    session.reload(|| true).await.unwrap();
    assert!(!session.is_dirty());
    assert_eq!(session.current().unwrap().weights.ai, 0.3);
}

#[tokio::test]
async fn test_declined_sample_delete_keeps_session_clean() {
    let store = memory_store_with(&["v1"]);
    let mut session = ProfileSession::open(store, None).await.unwrap();
    session.add_sample(SampleBucket::Trusted).unwrap();
    session.save().await.unwrap();

    assert!(!session.delete_sample(SampleBucket::Trusted, 0, || false).unwrap());
    assert!(!session.delete_sample(SampleBucket::Trusted, 9, || true).unwrap());
    assert!(!session.is_dirty());

    assert!(session.delete_sample(SampleBucket::Trusted, 0, || true).unwrap());
    assert!(session.is_dirty());
}

// ==========================================
// 存储失败
// ==========================================

#[tokio::test]
async fn test_failed_save_leaves_session_dirty() {
    let inner = InMemoryProfileStore::with_documents(vec![serde_json::to_value(
        bayes_profile_engine::config::default_profile("v1"),
    )
    .unwrap()])
    .unwrap();
    let store = Arc::new(FailingStore::new(inner));
    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();

    session.set_risk_penalty(7, 21).unwrap();
    store.fail_saves(true);

    let result = session.save().await;
    match result {
        Err(ProfileError::PersistenceError(msg)) => assert!(msg.contains("disk I/O error")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(session.is_dirty());
    assert_eq!(session.current().unwrap().risk_penalty.per_tag_penalty, 7);
    assert!(session.current().unwrap().updated_at.is_none());

    // 重试
    store.fail_saves(false);
    session.save().await.unwrap();
    assert!(!session.is_dirty());
    assert_eq!(store.load("v1").await.unwrap()["risk_penalty"]["per_tag_penalty"], 7);
}

// ==========================================
// 规则与样本编辑
// ==========================================

#[tokio::test]
async fn test_rule_edits_persist_through_file_store() {
    let dir = create_profile_dir().unwrap();
    let store: Arc<dyn ProfileStore> = Arc::new(FileProfileStore::new(dir.path()));
    seed_defaults(store.as_ref(), &["v1"]).await;

    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();
    let warnings = session
        .update_rule(
            "seller_credit_level",
            &EditableRule::KeywordMapping {
                rows: vec![
                    KeywordEditRow {
                        description: "优秀".to_string(),
                        keywords: "极好，优秀".to_string(),
                        score: "1".to_string(),
                    },
                    KeywordEditRow::default(),
                ],
                missing_score: "0.5".to_string(),
                default_score: String::new(),
            },
        )
        .unwrap();
    assert!(warnings.is_empty());

    let warnings = session
        .update_rule(
            "sales_ratio",
            &EditableRule::Formula {
                rows: vec![ParamEditRow {
                    name: "boost_factor".to_string(),
                    value: "lots".to_string(),
                }],
            },
        )
        .unwrap();
    assert_eq!(warnings.len(), 1);

    session.save().await.unwrap();

    let reopened = ProfileSession::open(store, Some("v1")).await.unwrap();
    let profile = reopened.current().unwrap();
    let Some(ScoringRule::KeywordMapping(rule)) = profile.scoring_rules.get("seller_credit_level")
    else {
        panic!("信用等级应为关键词映射");
    };
    assert_eq!(rule.rules.len(), 1);
    assert_eq!(rule.rules[0].keywords, vec!["极好", "优秀"]);
    assert_eq!(rule.default_score, None);
    assert_eq!(reopened.preview("seller_credit_level", Some("信用优秀")).unwrap(), Some(1.0));

    let Some(ScoringRule::Formula(formula)) = profile.scoring_rules.get("sales_ratio") else {
        panic!("在售/已售比应为公式");
    };
    assert_eq!(formula.parameters["boost_factor"], 0.0);
}

#[tokio::test]
async fn test_unknown_feature_is_rejected() {
    let store = memory_store_with(&["v1"]);
    let mut session = ProfileSession::open(store, None).await.unwrap();
    let result = session.update_rule(
        "shipping_speed",
        &EditableRule::Boolean {
            description: String::new(),
        },
    );
    assert!(matches!(result, Err(ProfileError::UnknownFeature(_))));
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn test_sample_rows_round_trip_with_legacy_mirror() {
    let (_temp, store) = create_sqlite_store().unwrap();
    store.save(&legacy_document("v1")).await.unwrap();

    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();
    assert!(!session.last_migration().unwrap().is_noop());

    let mut rows = session.sample_rows().unwrap();
    rows.push(SampleRow {
        bucket: SampleBucket::Untrusted,
        id: String::new(),
        name: "D".to_string(),
        vector: "0.2, 0.3, ?, 0.4".to_string(),
        note: String::new(),
    });
    let warnings = session.apply_sample_rows(&rows).unwrap();
    assert_eq!(warnings.len(), 1);
    session.save().await.unwrap();

    let document = store.load("v1").await.unwrap();
    assert_eq!(document["samples"]["untrusted"].as_array().unwrap().len(), 2);
    assert_eq!(document["samples"]["不可信"].as_array().unwrap().len(), 2);
    assert_eq!(document["samples"]["untrusted"][1]["vector"].as_array().unwrap().len(), 3);

    let reopened = ProfileSession::open(store, None).await.unwrap();
    assert!(reopened.last_migration().unwrap().is_noop());
    assert_eq!(reopened.current().unwrap().samples.len(), 4);
}

#[tokio::test]
async fn test_create_from_defaults_on_empty_store() {
    let store = memory_store_with(&[]);
    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();
    assert!(session.current().is_none());
    assert!(matches!(session.save().await, Err(ProfileError::NoProfileLoaded)));

    session.create_from_defaults("default.json", || true).await.unwrap();
    assert_eq!(session.current_version(), Some("default"));
    assert_eq!(session.known_versions(), ["default"]);
    assert!(session.validate().unwrap().is_empty());

    assert!(matches!(
        session.create_from_defaults("default", || true).await,
        Err(ProfileError::DuplicateName(_))
    ));
}

// ==========================================
// 损坏版本 / 未识别字段
// ==========================================

#[tokio::test]
async fn test_corrupt_version_does_not_block_open() {
    let good = serde_json::to_value(default_profile("b")).unwrap();
    let corrupt = json!({"version": "a", "weights": {"bayesian": 0.5, "visual": 0.5}});
    let store = Arc::new(InMemoryProfileStore::with_documents(vec![corrupt, good]).unwrap());

    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();
    assert!(session.current().is_none());
    assert_eq!(session.known_versions(), ["a", "b"]);
    assert!(matches!(
        session.last_load_error(),
        Some(ProfileError::InvalidDocument(_))
    ));

    session.switch_version("b", || true).await.unwrap();
    assert_eq!(session.current_version(), Some("b"));
    assert!(session.last_load_error().is_none());

    let fallback = session.manager().delete_version("a").await.unwrap();
    assert_eq!(fallback, "b");
    assert_eq!(store.list_versions().await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn test_unknown_fields_survive_editing_and_save() {
    let mut document = serde_json::to_value(default_profile("v1")).unwrap();
    document["scoring_rules"]["seller_tenure"]["note"] = json!("keep me");
    document["scoring_rules"]["seller_tenure"]["rungs"][0]["source"] = json!("manual");
    document["scoring_rules"]["visual"]["condition"]["groups"]["high"]["color"] = json!("green");
    document["scoring_rules"]["visual"]["condition"]["weight_hint"] = json!(0.5);
    document["scoring_rules"]["visual"]["completeness"]["note"] = json!("count photos");
    document["risk_penalty"]["enabled"] = json!(true);
    let store = Arc::new(InMemoryProfileStore::with_documents(vec![document]).unwrap());

    let mut session = ProfileSession::open(store.clone(), None).await.unwrap();
    let tenure = session.rule_editable("seller_tenure").unwrap().unwrap();
    session.update_rule("seller_tenure", &tenure).unwrap();
    let condition = session.visual_group_editable("condition").unwrap();
    session.update_visual_group("condition", &condition).unwrap();
    session
        .update_completeness(&EditableCompleteness {
            max_images: "6".to_string(),
            min_score: "0.3".to_string(),
        })
        .unwrap();
    session.save().await.unwrap();

    let saved = store.load("v1").await.unwrap();
    let rules = &saved["scoring_rules"];
    assert_eq!(rules["seller_tenure"]["note"], json!("keep me"));
    assert_eq!(rules["seller_tenure"]["rungs"][0]["source"], json!("manual"));
    assert_eq!(rules["visual"]["condition"]["groups"]["high"]["color"], json!("green"));
    assert_eq!(rules["visual"]["condition"]["weight_hint"], json!(0.5));
    assert_eq!(rules["visual"]["completeness"]["note"], json!("count photos"));
    assert_eq!(rules["visual"]["completeness"]["max_images"], json!(6));
    assert_eq!(saved["risk_penalty"]["enabled"], json!(true));
}
