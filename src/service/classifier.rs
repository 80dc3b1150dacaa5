use crate::models::CanonicalStatus;
use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// 反向子串匹配 (原始文本包含于同义词) 的最小长度, 避免 "a" 之类的噪声命中
const MIN_REVERSE_MATCH_LEN: usize = 3;

/// 单独计数的未识别文本上限, 超出后并入溢出计数
pub const MAX_TRACKED_GAPS: usize = 512;

/// 状态同义词表: 状态桶 -> 规范化后的原始文本集合
/// 桶的顺序决定子串回退匹配的优先级
#[derive(Debug, Clone)]
pub struct SynonymTable {
    buckets: IndexMap<CanonicalStatus, IndexSet<String>>,
}

impl SynonymTable {
    pub fn empty() -> Self {
        let mut buckets = IndexMap::new();
        for status in [
            CanonicalStatus::Cancelled,
            CanonicalStatus::Completed,
            CanonicalStatus::Ready,
            CanonicalStatus::Preparing,
            CanonicalStatus::Pending,
        ] {
            buckets.insert(status, IndexSet::new());
        }
        Self { buckets }
    }

    /// 内置中英/西语词表
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.extend(
            CanonicalStatus::Cancelled,
            ["cancelled", "canceled", "cancelado", "cancelada", "anulado", "anulada", "rechazado", "void", "voided"],
        );
        table.extend(
            CanonicalStatus::Completed,
            [
                "completed", "complete", "completado", "completada", "entregado", "entregada", "delivered",
                "pagado", "pagada", "paid", "finalizado", "finalizada", "cerrado", "closed", "done",
            ],
        );
        table.extend(
            CanonicalStatus::Ready,
            ["ready", "listo", "lista", "listo para servir", "preparado", "servido", "served"],
        );
        table.extend(
            CanonicalStatus::Preparing,
            [
                "preparing", "in preparation", "in progress", "en preparacion", "en preparación", "preparando",
                "cocinando", "cooking", "en cocina", "en proceso",
            ],
        );
        table.extend(
            CanonicalStatus::Pending,
            [
                "pending", "pendiente", "nuevo", "nueva", "new", "received", "recibido", "en espera", "waiting",
                // 否定形式: 精确命中优先于子串回退, 否则会被 "paid"/"pagado" 归为已完成
                "unpaid", "not paid", "no pagado", "no pagada", "sin pagar", "pago pendiente",
            ],
        );
        table
    }

    /// 追加同义词 (自动规范化, 重复项忽略)
    pub fn extend<I, S>(&mut self, status: CanonicalStatus, synonyms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if status == CanonicalStatus::Unknown {
            return;
        }
        let bucket = self.buckets.entry(status).or_default();
        for synonym in synonyms {
            let normalized = normalize(synonym.as_ref());
            if !normalized.is_empty() {
                bucket.insert(normalized);
            }
        }
    }

    /// 合并配置中的额外同义词, 未识别的桶名记录告警后跳过
    pub fn merge_config(&mut self, extra: &HashMap<String, Vec<String>>) {
        for (bucket, synonyms) in extra {
            match CanonicalStatus::from_str(bucket) {
                Ok(status) => self.extend(status, synonyms),
                Err(e) => tracing::warn!("Ignoring synonyms for {}: {}", bucket, e),
            }
        }
    }

    pub fn synonyms_for(&self, status: CanonicalStatus) -> Vec<String> {
        self.buckets
            .get(&status)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn exact(&self, text: &str) -> Option<CanonicalStatus> {
        self.buckets
            .iter()
            .find(|(_, synonyms)| synonyms.contains(text))
            .map(|(status, _)| *status)
    }

    fn fuzzy(&self, text: &str) -> Option<CanonicalStatus> {
        let allow_reverse = text.chars().count() >= MIN_REVERSE_MATCH_LEN;
        self.buckets
            .iter()
            .find(|(_, synonyms)| {
                synonyms
                    .iter()
                    .any(|syn| text.contains(syn.as_str()) || (allow_reverse && syn.contains(text)))
            })
            .map(|(status, _)| *status)
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// 小写 + 去首尾空白, `_`/`-` 视为空格, 连续空白合并
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 状态分类器: 先精确匹配, 再子串回退, 都未命中归为 Unknown 并计数
///
/// 缺口计数的单位是 classify 调用, 不是订单: 每次重算都会重新分类当日订单,
/// 因此同一笔订单会被重复计入。计数反映未识别文本的出现频率。
#[derive(Debug, Default)]
pub struct StatusClassifier {
    table: SynonymTable,
    gaps: DashMap<String, u64>,
    overflow: AtomicU64,
}

impl StatusClassifier {
    pub fn new(table: SynonymTable) -> Self {
        Self {
            table,
            gaps: DashMap::new(),
            overflow: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &SynonymTable {
        &self.table
    }

    pub fn classify(&self, raw: &str) -> CanonicalStatus {
        let text = normalize(raw);
        match self.resolve(&text) {
            Some(status) => status,
            None => {
                self.record_gap(text);
                CanonicalStatus::Unknown
            }
        }
    }

    /// 同 classify, 但不计入缺口 (用于构造查询条件等非订单场景)
    pub fn classify_untracked(&self, raw: &str) -> CanonicalStatus {
        self.resolve(&normalize(raw)).unwrap_or(CanonicalStatus::Unknown)
    }

    fn resolve(&self, text: &str) -> Option<CanonicalStatus> {
        if text.is_empty() {
            return None;
        }
        self.table.exact(text).or_else(|| self.table.fuzzy(text))
    }

    fn record_gap(&self, text: String) {
        if let Some(mut count) = self.gaps.get_mut(&text) {
            *count += 1;
            return;
        }
        if self.gaps.len() >= MAX_TRACKED_GAPS {
            self.overflow.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut count = self.gaps.entry(text.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            tracing::warn!("Unrecognized order status {:?}, classified as unknown", text);
        }
    }

    /// 未识别状态的出现次数 (按规范化文本)
    pub fn gaps(&self) -> Vec<(String, u64)> {
        let mut gaps: Vec<(String, u64)> = self
            .gaps
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        gaps.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        gaps
    }

    /// 全部缺口次数, 含超出上限未单独记录的部分
    pub fn gap_total(&self) -> u64 {
        self.gaps.iter().map(|entry| *entry.value()).sum::<u64>() + self.overflow.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> StatusClassifier {
        StatusClassifier::default()
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let c = classifier();
        assert_eq!(c.classify(" PAGADO "), c.classify("pagado"));
        assert_eq!(c.classify("pagado"), CanonicalStatus::Completed);
        assert_eq!(c.classify("En Preparación"), CanonicalStatus::Preparing);
        assert_eq!(c.classify("in_progress"), CanonicalStatus::Preparing);
    }

    #[test]
    fn test_empty_and_garbage_map_to_unknown() {
        let c = classifier();
        assert_eq!(c.classify(""), CanonicalStatus::Unknown);
        assert_eq!(c.classify("   "), CanonicalStatus::Unknown);
        assert_eq!(c.classify("zzz-qqq"), CanonicalStatus::Unknown);
        assert_eq!(c.classify("a"), CanonicalStatus::Unknown);
    }

    #[test]
    fn test_substring_fallback_both_directions() {
        let c = classifier();
        // 同义词包含于原始文本
        assert_eq!(c.classify("Pedido cancelado por cliente"), CanonicalStatus::Cancelled);
        assert_eq!(c.classify("pendientes!"), CanonicalStatus::Pending);
        // 原始文本包含于同义词
        assert_eq!(c.classify("cancel"), CanonicalStatus::Cancelled);
    }

    #[test]
    fn test_fallback_precedence_follows_bucket_order() {
        let c = classifier();
        // 同时含多个桶的同义词时, 按 Cancelled > Completed > Ready > Preparing > Pending
        assert_eq!(c.classify("listo pero cancelado"), CanonicalStatus::Cancelled);
        assert_eq!(c.classify("entregado y listo"), CanonicalStatus::Completed);
        assert_eq!(c.classify("listo, estaba preparando"), CanonicalStatus::Ready);
        assert_eq!(c.classify("preparando pedido nuevo"), CanonicalStatus::Preparing);
        assert_eq!(c.classify("Listo!"), CanonicalStatus::Ready);
    }

    #[test]
    fn test_negated_payment_is_not_completed() {
        let c = classifier();
        assert_eq!(c.classify("unpaid"), CanonicalStatus::Pending);
        assert_eq!(c.classify("No Pagado"), CanonicalStatus::Pending);
        assert_eq!(c.classify("sin_pagar"), CanonicalStatus::Pending);
        // 其余含 "pagado" 的文本仍走回退
        assert_eq!(c.classify("pagado en caja"), CanonicalStatus::Completed);
    }

    #[test]
    fn test_untracked_classification_skips_gaps() {
        let c = classifier();
        assert_eq!(c.classify_untracked("mystery"), CanonicalStatus::Unknown);
        assert_eq!(c.classify_untracked("listo"), CanonicalStatus::Ready);
        assert_eq!(c.gap_total(), 0);
    }

    #[test]
    fn test_gap_map_is_bounded() {
        let c = classifier();
        for i in 0..MAX_TRACKED_GAPS + 10 {
            c.classify(&format!("zz{}", i));
        }
        c.classify("zz0");

        assert_eq!(c.gaps().len(), MAX_TRACKED_GAPS);
        assert_eq!(c.gap_total(), (MAX_TRACKED_GAPS + 11) as u64);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let c = classifier();
        for raw in ["listo", "Cancelado", "weird", "", "PREPARING", "entregado"] {
            let first = c.classify(raw);
            for _ in 0..5 {
                assert_eq!(c.classify(raw), first);
            }
        }
    }

    #[test]
    fn test_gaps_are_counted() {
        let c = classifier();
        c.classify("Mystery");
        c.classify("mystery ");
        c.classify("other thing");
        c.classify("listo");

        assert_eq!(c.gap_total(), 3);
        assert_eq!(c.gaps()[0], ("mystery".to_string(), 2));
    }

    #[test]
    fn test_table_is_extensible() {
        let mut table = SynonymTable::builtin();
        let mut extra = HashMap::new();
        extra.insert("ready".to_string(), vec!["Para Recoger".to_string()]);
        extra.insert("bogus".to_string(), vec!["x".to_string()]);
        table.merge_config(&extra);

        let c = StatusClassifier::new(table);
        assert_eq!(c.classify("PARA RECOGER"), CanonicalStatus::Ready);
        assert!(c.table().synonyms_for(CanonicalStatus::Ready).contains(&"para recoger".to_string()));
    }
}
