use crate::config::toml_config::KnowledgeConfig;
use crate::core::similarity::rank;
use crate::domain::model::{FaqEntry, PolicyChunk, Scored};
use crate::domain::ports::Storage;
use crate::utils::error::{ChatError, Result};
use serde::de::DeserializeOwned;

/// Role ids granting the manager FAQ set.
pub const MANAGER_ROLES: [i64; 2] = [10, 13];
/// Role ids granting the HR FAQ set.
pub const HR_ROLES: [i64; 2] = [7, 15];

/// Embedded policy excerpts and FAQ sets used to ground answers.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    pub policies: Vec<PolicyChunk>,
    pub faqs_employee: Vec<FaqEntry>,
    pub faqs_manager: Vec<FaqEntry>,
    pub faqs_hr: Vec<FaqEntry>,
}

impl KnowledgeBase {
    /// 載入政策與 FAQ 向量；政策檔為必要，FAQ 檔讀取失敗時視為空集合
    pub async fn load<S: Storage>(storage: &S, config: &KnowledgeConfig) -> Result<Self> {
        let policies: Vec<PolicyChunk> = read_json(storage, &config.policy_file).await?;

        let faqs_employee = load_faqs(storage, &config.faq_employee_file).await;
        let faqs_manager = load_faqs(storage, &config.faq_manager_file).await;
        let faqs_hr = load_faqs(storage, &config.faq_hr_file).await;

        tracing::info!(
            "✅ Loaded {} policies, FAQs - Emp:{} Mgr:{} HR:{}",
            policies.len(),
            faqs_employee.len(),
            faqs_manager.len(),
            faqs_hr.len()
        );

        Ok(Self {
            policies,
            faqs_employee,
            faqs_manager,
            faqs_hr,
        })
    }

    pub fn faq_count(&self) -> usize {
        self.faqs_employee.len() + self.faqs_manager.len() + self.faqs_hr.len()
    }

    /// FAQ entries visible to the given roles; the employee set always applies.
    pub fn faqs_for_roles(&self, roles: &[i64]) -> Vec<&FaqEntry> {
        let mut faqs: Vec<&FaqEntry> = self.faqs_employee.iter().collect();

        if roles.iter().any(|r| MANAGER_ROLES.contains(r)) {
            faqs.extend(self.faqs_manager.iter());
        }
        if roles.iter().any(|r| HR_ROLES.contains(r)) {
            faqs.extend(self.faqs_hr.iter());
        }

        faqs
    }

    pub fn relevant_policies(&self, query: &[f32], k: usize) -> Vec<Scored<&PolicyChunk>> {
        let mut ranked = rank(&self.policies, query, |p| p.embedding.as_slice());
        ranked.truncate(k);
        ranked
    }

    pub fn best_faq(&self, query: &[f32], roles: &[i64]) -> Option<Scored<&FaqEntry>> {
        let faqs = self.faqs_for_roles(roles);
        rank(faqs, query, |f| f.embedding.as_slice())
            .into_iter()
            .next()
    }
}

/// 單一 FAQ 檔失敗只清空該集合
async fn load_faqs<S: Storage>(storage: &S, path: &str) -> Vec<FaqEntry> {
    match read_json(storage, path).await {
        Ok(faqs) => faqs,
        Err(e) => {
            tracing::warn!("⚠️ Skipping FAQ vectors: {}", e);
            Vec::new()
        }
    }
}

async fn read_json<S: Storage, T: DeserializeOwned>(storage: &S, path: &str) -> Result<T> {
    let data = storage
        .read_file(path)
        .await
        .map_err(|e| ChatError::KnowledgeBaseError {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    serde_json::from_slice(&data).map_err(|e| ChatError::KnowledgeBaseError {
        path: path.to_string(),
        message: e.to_string(),
    })
}
