// ==========================================
// 闲置商品监控 - 配置编辑会话
// ==========================================
// 职责: 持有"当前配置"与未保存标记，串联版本管理 / 迁移 / 校验 / 样本仓库
// 红线: 未保存标记只在保存成功或重新加载成功后清除
// 红线: 会丢弃未保存修改的操作必须经过确认回调
// 红线: 单个版本无法加载不影响会话打开（错误记录在 last_load_error）
// 说明: 不提供并发保护，后写覆盖先写
// ==========================================

use crate::config::defaults;
use crate::domain::catalog::{BayesianFeature, VisualFeature};
use crate::domain::profile::ConfigProfile;
use crate::domain::rules::ScoringRule;
use crate::domain::sample::SampleBucket;
use crate::engine::error::{ProfileError, ProfileResult};
use crate::engine::migrator::{LegacyCache, MigrationReport};
use crate::engine::rule_codec::{
    self, CollectWarning, EditableCompleteness, EditableGroupRule, EditableRule,
};
use crate::engine::sample_repo::{self, SampleRow};
use crate::engine::version_manager::{checked_version_name, select_version, VersionManager};
use crate::repository::profile_store::ProfileStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// ProfileSession
// ==========================================

/// 配置编辑会话
///
/// 所有编辑都作用于内存中的当前配置，显式调用 `save` 才会写入存储。
pub struct ProfileSession {
    manager: VersionManager,
    current: Option<ConfigProfile>,
    legacy_cache: LegacyCache,
    known_versions: Vec<String>,
    dirty: bool,
    last_report: Option<MigrationReport>,
    last_load_error: Option<ProfileError>,
}

impl ProfileSession {
    /// 打开会话并加载首选版本（不存在则加载第一个版本，无版本则为空会话）
    ///
    /// 选中的版本无法加载时仍返回会话：当前配置为空，版本列表照常可用，
    /// 加载错误可通过 `last_load_error` 取得
    pub async fn open(
        store: Arc<dyn ProfileStore>,
        preferred: Option<&str>,
    ) -> ProfileResult<Self> {
        let manager = VersionManager::new(store);
        let known_versions = manager.list_versions(None).await;

        let mut session = Self {
            manager,
            current: None,
            legacy_cache: LegacyCache::default(),
            known_versions,
            dirty: false,
            last_report: None,
            last_load_error: None,
        };

        if let Some(version) = select_version(&session.known_versions, preferred) {
            if let Err(e) = session.load_version(&version).await {
                warn!(version = %version, error = %e, "配置版本加载失败，会话以空配置打开");
                session.last_load_error = Some(e);
            }
        } else {
            info!("存储中没有配置版本");
        }
        Ok(session)
    }

    // ===== 只读访问 =====

    pub fn manager(&self) -> &VersionManager {
        &self.manager
    }

    pub fn current(&self) -> Option<&ConfigProfile> {
        self.current.as_ref()
    }

    pub fn current_version(&self) -> Option<&str> {
        self.current.as_ref().map(|p| p.version.as_str())
    }

    pub fn known_versions(&self) -> &[String] {
        &self.known_versions
    }

    pub fn legacy_cache(&self) -> &LegacyCache {
        &self.legacy_cache
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 最近一次加载时的迁移记录
    pub fn last_migration(&self) -> Option<&MigrationReport> {
        self.last_report.as_ref()
    }

    /// 打开会话时选中版本的加载错误（之后任一版本加载成功即清除）
    pub fn last_load_error(&self) -> Option<&ProfileError> {
        self.last_load_error.as_ref()
    }

    pub fn take_load_error(&mut self) -> Option<ProfileError> {
        self.last_load_error.take()
    }

    fn profile(&self) -> ProfileResult<&ConfigProfile> {
        self.current.as_ref().ok_or(ProfileError::NoProfileLoaded)
    }

    /// 取可变配置并标记为未保存
    fn profile_mut(&mut self) -> ProfileResult<&mut ConfigProfile> {
        let profile = self.current.as_mut().ok_or(ProfileError::NoProfileLoaded)?;
        self.dirty = true;
        Ok(profile)
    }

    /// 有未保存修改且调用方拒绝丢弃时返回 UnsavedChanges
    fn ensure_discard_allowed(&self, confirm: impl FnOnce() -> bool) -> ProfileResult<()> {
        if self.dirty && !confirm() {
            return Err(ProfileError::UnsavedChanges);
        }
        Ok(())
    }

    async fn load_version(&mut self, version: &str) -> ProfileResult<()> {
        let outcome = self.manager.load(version).await?;
        self.current = Some(outcome.profile);
        self.legacy_cache = outcome.cache;
        self.last_report = Some(outcome.report);
        self.last_load_error = None;
        self.dirty = false;
        info!(version = %version, "已加载配置版本");
        Ok(())
    }

    /// 重新读取版本列表（存储不可达时退回到当前版本名）
    pub async fn refresh_versions(&mut self) -> &[String] {
        let in_memory = self.current.as_ref().map(|p| p.version.clone());
        self.known_versions = self.manager.list_versions(in_memory.as_deref()).await;
        &self.known_versions
    }

    // ==========================================
    // 版本切换 / 保存
    // ==========================================

    /// 切换到其他版本（加载失败时会话保持原状）
    pub async fn switch_version(
        &mut self,
        name: &str,
        confirm: impl FnOnce() -> bool,
    ) -> ProfileResult<()> {
        let version = checked_version_name(name)?;
        self.ensure_discard_allowed(confirm)?;
        self.load_version(&version).await
    }

    /// 放弃未保存修改，从存储重新加载当前版本
    pub async fn reload(&mut self, confirm: impl FnOnce() -> bool) -> ProfileResult<()> {
        let version = self.profile()?.version.clone();
        self.ensure_discard_allowed(confirm)?;
        self.load_version(&version).await
    }

    /// 校验当前配置（不修改任何状态）
    pub fn validate(&self) -> ProfileResult<Vec<String>> {
        Ok(self.manager.validator().validate(self.profile()?))
    }

    /// 非阻断性提示
    pub fn warnings(&self) -> ProfileResult<Vec<String>> {
        Ok(self.manager.validator().warnings(self.profile()?))
    }

    /// 保存当前配置
    ///
    /// # 错误
    /// - ValidationError: 权重和校验失败
    /// - PersistenceError: 存储失败
    ///
    /// 失败时配置与未保存标记均保持不变
    pub async fn save(&mut self) -> ProfileResult<()> {
        let profile = self.profile()?;
        let saved_at = self.manager.persist(profile, &self.legacy_cache).await?;
        let mirror = sample_repo::legacy_mirror(&profile.samples, &self.legacy_cache);
        let version = profile.version.clone();

        if let Some(profile) = self.current.as_mut() {
            profile.updated_at = Some(saved_at);
        }
        self.legacy_cache = mirror.into_cache();
        self.dirty = false;

        if !self.known_versions.contains(&version) {
            self.known_versions.push(version);
            self.known_versions.sort();
        }
        Ok(())
    }

    // ==========================================
    // 版本复制 / 删除 / 新建
    // ==========================================

    /// 将内存中的当前配置复制为新版本（会话仍停留在原版本）
    pub async fn copy_current(&mut self, new_name: &str) -> ProfileResult<String> {
        let source = self.profile()?;
        let copy = self
            .manager
            .copy_version(source, &self.legacy_cache, new_name)
            .await?;
        self.refresh_versions().await;
        Ok(copy.version)
    }

    /// 删除当前版本并加载回退版本，返回回退版本名
    pub async fn delete_current(&mut self, confirm: impl FnOnce() -> bool) -> ProfileResult<String> {
        let version = self.profile()?.version.clone();
        self.ensure_discard_allowed(confirm)?;

        let fallback = self.manager.delete_version(&version).await?;
        self.refresh_versions().await;

        if let Err(e) = self.load_version(&fallback).await {
            warn!(fallback = %fallback, error = %e, "加载回退版本失败");
            self.current = None;
            self.legacy_cache = LegacyCache::default();
            self.dirty = false;
            return Err(e);
        }
        Ok(fallback)
    }

    /// 以默认配置新建版本并切换过去
    pub async fn create_from_defaults(
        &mut self,
        name: &str,
        confirm: impl FnOnce() -> bool,
    ) -> ProfileResult<()> {
        let version = checked_version_name(name)?;
        let known = self.manager.try_list_versions().await?;
        if known.contains(&version) {
            return Err(ProfileError::DuplicateName(version));
        }
        self.ensure_discard_allowed(confirm)?;

        let mut profile = defaults::default_profile(version);
        let saved_at = self
            .manager
            .persist(&profile, &LegacyCache::default())
            .await?;
        profile.updated_at = Some(saved_at);

        info!(version = %profile.version, "已创建默认配置");
        self.current = Some(profile);
        self.legacy_cache = LegacyCache::default();
        self.last_report = None;
        self.last_load_error = None;
        self.dirty = false;
        self.refresh_versions().await;
        Ok(())
    }

    /// 把当前版本的权重与规则重置为默认值（样本保留，需保存才生效）
    pub fn reset_to_defaults(&mut self, confirm: impl FnOnce() -> bool) -> ProfileResult<()> {
        self.profile()?;
        self.ensure_discard_allowed(confirm)?;

        let profile = self.profile_mut()?;
        let fresh = defaults::default_profile(profile.version.clone());
        profile.weights = fresh.weights;
        profile.weights_no_visual = fresh.weights_no_visual;
        profile.bayesian_features = fresh.bayesian_features;
        profile.visual_features = fresh.visual_features;
        profile.risk_penalty = fresh.risk_penalty;
        profile.scoring_rules = fresh.scoring_rules;
        Ok(())
    }

    // ==========================================
    // 编辑
    // ==========================================

    /// 任意修改（标记为未保存）
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut ConfigProfile) -> R) -> ProfileResult<R> {
        Ok(f(self.profile_mut()?))
    }

    /// 按路径修改权重，如 `weights.ai`
    pub fn set_weight(&mut self, path: &str, value: f64) -> ProfileResult<()> {
        let profile = self.current.as_mut().ok_or(ProfileError::NoProfileLoaded)?;
        if !profile.set_weight(path, value) {
            return Err(ProfileError::UnknownFeature(path.to_string()));
        }
        self.dirty = true;
        debug!(path = %path, value = value, "权重已修改");
        Ok(())
    }

    pub fn set_risk_penalty(&mut self, per_tag_penalty: i64, max_penalty: i64) -> ProfileResult<()> {
        let profile = self.profile_mut()?;
        profile.risk_penalty.per_tag_penalty = per_tag_penalty;
        profile.risk_penalty.max_penalty = max_penalty;
        Ok(())
    }

    /// 当前规则的编辑形态
    pub fn rule_editable(&self, feature: &str) -> ProfileResult<Option<EditableRule>> {
        let feature = parse_bayesian(feature)?;
        Ok(self
            .profile()?
            .scoring_rules
            .get(feature.key())
            .map(rule_codec::to_editable))
    }

    /// 用编辑形态替换特征规则，返回收集警告
    ///
    /// 旧规则上的未识别字段在类型不变时沿用（行级字段仅在行数不变时按下标沿用）
    pub fn update_rule(
        &mut self,
        feature: &str,
        editable: &EditableRule,
    ) -> ProfileResult<Vec<CollectWarning>> {
        let feature = parse_bayesian(feature)?;
        let mut collected = rule_codec::collect_rule(feature.key(), editable);
        if let Some(previous) = self.profile()?.scoring_rules.get(feature.key()) {
            rule_codec::carry_extras(previous, &mut collected.value);
        }
        if collected.value.kind() != feature.rule_kind() {
            warn!(
                feature = %feature,
                kind = %collected.value.kind(),
                expected = %feature.rule_kind(),
                "规则类型与特征目录不一致"
            );
        }
        self.profile_mut()?
            .scoring_rules
            .features
            .insert(feature.key().to_string(), collected.value);
        Ok(collected.warnings)
    }

    pub fn visual_group_editable(&self, key: &str) -> ProfileResult<EditableGroupRule> {
        let rule = self
            .profile()?
            .scoring_rules
            .visual
            .group_rule(key)
            .ok_or_else(|| ProfileError::UnknownFeature(key.to_string()))?;
        Ok(rule_codec::group_rule_to_editable(rule))
    }

    /// 替换视觉关键词分组规则（image_quality / condition / authenticity）
    pub fn update_visual_group(
        &mut self,
        key: &str,
        editable: &EditableGroupRule,
    ) -> ProfileResult<Vec<CollectWarning>> {
        let feature = VisualFeature::parse(key)
            .filter(VisualFeature::is_keyword_grouped)
            .ok_or_else(|| ProfileError::UnknownFeature(key.to_string()))?;
        let mut collected =
            rule_codec::collect_group_rule(&format!("visual.{}", feature.key()), editable);

        let profile = self.profile_mut()?;
        if let Some(slot) = profile.scoring_rules.visual.group_rule_mut(feature.key()) {
            rule_codec::carry_group_extras(slot, &mut collected.value);
            *slot = collected.value;
        }
        Ok(collected.warnings)
    }

    pub fn update_completeness(
        &mut self,
        editable: &EditableCompleteness,
    ) -> ProfileResult<Vec<CollectWarning>> {
        let mut collected = rule_codec::collect_completeness("visual.completeness", editable);
        let completeness = &mut self.profile_mut()?.scoring_rules.visual.completeness;
        collected.value.extra = std::mem::take(&mut completeness.extra);
        *completeness = collected.value;
        Ok(collected.warnings)
    }

    // ==========================================
    // 样本
    // ==========================================

    pub fn add_sample(&mut self, bucket: SampleBucket) -> ProfileResult<usize> {
        let profile = self.profile_mut()?;
        Ok(sample_repo::add_sample(&mut profile.samples, bucket))
    }

    /// 删除样本；未确认或下标越界时返回 false 且不标记修改
    pub fn delete_sample(
        &mut self,
        bucket: SampleBucket,
        index: usize,
        confirm: impl FnOnce() -> bool,
    ) -> ProfileResult<bool> {
        let profile = self.current.as_mut().ok_or(ProfileError::NoProfileLoaded)?;
        let removed =
            sample_repo::delete_sample(&mut profile.samples, bucket, index, |_| confirm());
        if removed.is_some() {
            self.dirty = true;
        }
        Ok(removed.is_some())
    }

    pub fn sample_rows(&self) -> ProfileResult<Vec<SampleRow>> {
        Ok(sample_repo::to_rows(&self.profile()?.samples))
    }

    /// 用编辑表格替换全部样本，返回向量解析警告
    pub fn apply_sample_rows(&mut self, rows: &[SampleRow]) -> ProfileResult<Vec<CollectWarning>> {
        let collected = sample_repo::collect(rows, &self.legacy_cache);
        self.profile_mut()?.samples = collected.samples;
        Ok(collected.warnings)
    }

    // ==========================================
    // 预览
    // ==========================================

    /// 用当前规则为单个输入打分（sales_ratio 公式不在此求值，返回 None）
    pub fn preview(&self, feature: &str, input: Option<&str>) -> ProfileResult<Option<f64>> {
        let rules = &self.profile()?.scoring_rules;

        if let Some(visual) = VisualFeature::parse(feature) {
            let text = input.unwrap_or_default();
            let score = match visual {
                VisualFeature::Completeness => Some(
                    rules
                        .visual
                        .completeness
                        .evaluate(text.trim().parse::<u32>().unwrap_or(0)),
                ),
                other => rules
                    .visual
                    .group_rule(other.key())
                    .and_then(|rule| rule.evaluate(text)),
            };
            return Ok(score);
        }

        let feature = parse_bayesian(feature)?;
        let score = match rules.get(feature.key()) {
            Some(ScoringRule::KeywordMapping(rule)) => rule.evaluate(input),
            Some(ScoringRule::RangeLadder(rule)) => rule.evaluate(input),
            Some(ScoringRule::Boolean(rule)) => rule.evaluate(input),
            Some(ScoringRule::Formula(_)) | None => None,
        };
        Ok(score)
    }
}

fn parse_bayesian(feature: &str) -> ProfileResult<BayesianFeature> {
    BayesianFeature::parse(feature).ok_or_else(|| ProfileError::UnknownFeature(feature.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory_store::InMemoryProfileStore;

    async fn session_with(versions: &[&str]) -> ProfileSession {
        let docs = versions
            .iter()
            .map(|v| serde_json::to_value(defaults::default_profile(*v)).unwrap())
            .collect();
        let store = InMemoryProfileStore::with_documents(docs).unwrap();
        ProfileSession::open(Arc::new(store), None).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_selects_first_version() {
        let session = session_with(&["b", "a"]).await;
        assert_eq!(session.current_version(), Some("a"));
        assert_eq!(session.known_versions(), ["a", "b"]);
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_edits_mark_dirty_and_save_clears() {
        let mut session = session_with(&["v1"]).await;
        session.set_weight("weights.ai", 0.2).unwrap();
        session.set_weight("weights.bayesian", 0.5).unwrap();
        assert!(session.is_dirty());

        session.save().await.unwrap();
        assert!(!session.is_dirty());
        assert!(session.current().unwrap().updated_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_weight_path() {
        let mut session = session_with(&["v1"]).await;
        assert!(matches!(
            session.set_weight("weights.fourth", 0.1),
            Err(ProfileError::UnknownFeature(_))
        ));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_invalid_save_keeps_dirty() {
        let mut session = session_with(&["v1"]).await;
        session.set_weight("weights.ai", 0.9).unwrap();
        let result = session.save().await;
        assert!(matches!(result, Err(ProfileError::ValidationError { .. })));
        assert!(session.is_dirty());
        assert_eq!(session.current().unwrap().weights.ai, 0.9);
    }

    #[tokio::test]
    async fn test_switch_requires_confirmation_when_dirty() {
        let mut session = session_with(&["v1", "v2"]).await;
        session.add_sample(SampleBucket::Trusted).unwrap();

        let result = session.switch_version("v2", || false).await;
        assert!(matches!(result, Err(ProfileError::UnsavedChanges)));
        assert_eq!(session.current_version(), Some("v1"));
        assert!(session.is_dirty());

        session.switch_version("v2", || true).await.unwrap();
        assert_eq!(session.current_version(), Some("v2"));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_preview_uses_current_rules() {
        let session = session_with(&["v1"]).await;
        assert_eq!(session.preview("seller_tenure", Some("30")).unwrap(), Some(0.8));
        assert_eq!(session.preview("has_guarantee", Some("是")).unwrap(), Some(1.0));
        assert_eq!(session.preview("sales_ratio", Some("2")).unwrap(), None);
        assert_eq!(session.preview("image_quality", Some("实拍清晰")).unwrap(), Some(1.0));
        assert!(matches!(
            session.preview("nope", None),
            Err(ProfileError::UnknownFeature(_))
        ));
    }
}
