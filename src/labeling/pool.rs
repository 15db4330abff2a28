//! Labeler pool provisioning

use crate::error::{Error, Result};

use super::{LabelingService, PoolSpec};

/// Members of a pool that is yet to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPool {
    manager: String,
    members: Vec<String>,
}

impl NewPool {
    /// The first email becomes the manager; every email is a member.
    /// Blank entries are ignored.
    pub fn from_emails(emails: &[String]) -> Result<Self> {
        let members: Vec<String> = emails
            .iter()
            .map(|email| email.trim())
            .filter(|email| !email.is_empty())
            .map(str::to_string)
            .collect();

        let manager = members
            .first()
            .ok_or_else(|| Error::config("Must provide at least one labeler email"))?
            .clone();

        Ok(Self { manager, members })
    }

    pub fn manager(&self) -> &str {
        &self.manager
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// Which pool a labeling job is assigned to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolSelection {
    /// Reuse a pool by resource name
    Existing(String),
    /// Create a fresh pool
    Create(NewPool),
}

impl PoolSelection {
    /// An existing pool takes precedence over emails
    pub fn new(existing_pool: Option<String>, emails: &[String]) -> Result<Self> {
        match existing_pool {
            Some(pool) => Ok(PoolSelection::Existing(pool)),
            None => NewPool::from_emails(emails).map(PoolSelection::Create),
        }
    }
}

/// A provisioned labeler pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelerPool {
    /// Resource name
    pub name: String,
    /// Whether this run created the pool
    pub created: bool,
}

/// Display name of a pool created for a dataset
pub fn pool_display_name(dataset_name: &str) -> String {
    format!("{}_pool", dataset_name)
}

/// Resolves a pool selection, creating the pool if needed.
///
/// Existing pools are not checked; a bad name surfaces when the job is created.
pub async fn provision_pool(
    selection: &PoolSelection,
    project: &str,
    region: &str,
    dataset_name: &str,
    service: &dyn LabelingService,
) -> Result<LabelerPool> {
    match selection {
        PoolSelection::Existing(name) => {
            tracing::info!(pool = %name, "Using existing labeler pool");
            Ok(LabelerPool {
                name: name.clone(),
                created: false,
            })
        }
        PoolSelection::Create(new_pool) => {
            let spec = PoolSpec {
                project: project.to_string(),
                region: region.to_string(),
                display_name: pool_display_name(dataset_name),
                manager_emails: vec![new_pool.manager().to_string()],
                worker_emails: new_pool.members().to_vec(),
            };

            let name = service.create_specialist_pool(&spec).await?;
            tracing::debug!(pool = %name, members = spec.worker_emails.len(), "Created labeler pool");

            Ok(LabelerPool {
                name,
                created: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeling::JobSpec;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        pools: Mutex<Vec<PoolSpec>>,
    }

    #[async_trait]
    impl LabelingService for RecordingService {
        async fn create_specialist_pool(&self, spec: &PoolSpec) -> Result<String> {
            self.pools.lock().unwrap().push(spec.clone());
            Ok("projects/p/locations/us-central1/specialistPools/123".to_string())
        }

        async fn create_dataset(&self, _: &str, _: &str, _: &str) -> Result<String> {
            unimplemented!()
        }

        async fn import_data(&self, _: &str, _: &str, _: &str) -> Result<()> {
            unimplemented!()
        }

        async fn create_labeling_job(&self, _: &str, _: &str, _: &JobSpec) -> Result<String> {
            unimplemented!()
        }
    }

    fn emails(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_email_is_manager() {
        let pool = NewPool::from_emails(&emails(&["a@x.com", "b@x.com"])).unwrap();
        assert_eq!(pool.manager(), "a@x.com");
        assert_eq!(pool.members(), ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_no_emails_no_pool_is_config_error() {
        assert!(PoolSelection::new(None, &[]).unwrap_err().is_config());
    }

    #[test]
    fn test_blank_emails_are_ignored() {
        assert!(NewPool::from_emails(&emails(&[""])).unwrap_err().is_config());
        assert!(PoolSelection::new(None, &emails(&[" ", ""])).unwrap_err().is_config());

        let pool = NewPool::from_emails(&emails(&["", "a@x.com", " b@x.com "])).unwrap();
        assert_eq!(pool.manager(), "a@x.com");
        assert_eq!(pool.members(), ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_existing_pool_wins() {
        let selection = PoolSelection::new(Some("pools/1".to_string()), &emails(&["a@x.com"])).unwrap();
        assert_eq!(selection, PoolSelection::Existing("pools/1".to_string()));
    }

    #[tokio::test]
    async fn test_provision_new_pool() {
        let service = RecordingService::default();
        let selection = PoolSelection::new(None, &emails(&["a@x.com", "b@x.com"])).unwrap();

        let pool = provision_pool(&selection, "proj", "us-central1", "quake_20211103_140509", &service)
            .await
            .unwrap();

        assert!(pool.created);
        let pools = service.pools.lock().unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].display_name, "quake_20211103_140509_pool");
        assert_eq!(pools[0].manager_emails, ["a@x.com"]);
        assert_eq!(pools[0].worker_emails, ["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn test_existing_pool_not_created() {
        let service = RecordingService::default();
        let selection = PoolSelection::Existing("pools/7".to_string());

        let pool = provision_pool(&selection, "proj", "us-central1", "d", &service)
            .await
            .unwrap();

        assert_eq!(pool.name, "pools/7");
        assert!(!pool.created);
        assert!(service.pools.lock().unwrap().is_empty());
    }
}
