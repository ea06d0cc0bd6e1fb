use std::collections::{HashMap, HashSet};

use futures::prelude::*;
use tracing::{debug, info, warn};

use super::cache_policy::CachePolicy;
use super::key_resolver;
use super::plan::{self, Action, SyncPlan};
use super::store::{self, ObjectCopy, ObjectStore, RemoteObject};
use super::Error;

#[derive(Debug, Clone)]
pub struct Deploy {
    pub source_bucket: String,
    pub destination_bucket: String,
    pub frontend: String,
    pub version: String,
    pub check_only: bool,
    pub min_files: usize,
    pub cache_policy: CachePolicy,
    pub strip_extension: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The version exists with at least the minimum number of files.
    Checked { files: usize },
    Synced { copied: usize, skipped: usize },
}

pub struct DeployExecutor<S> {
    store: S,
}

impl<S: ObjectStore> DeployExecutor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        Deploy {
            source_bucket,
            destination_bucket,
            frontend,
            version,
            check_only,
            min_files,
            cache_policy,
            strip_extension,
        }: &Deploy,
    ) -> Result<Outcome, Error> {
        let src_prefix = key_resolver::source_prefix(frontend, version);

        let mut src_files: Vec<RemoteObject> =
            store::list_objects(&self.store, source_bucket, &src_prefix)
                .try_collect()
                .await?;
        plan::sort_for_sync(&mut src_files);
        info!("Listed {} files from {}/{}", src_files.len(), source_bucket, src_prefix);
        if src_files.len() < *min_files {
            return Err(Error::Validation {
                found: src_files.len(),
                expected: *min_files,
            });
        }

        if *check_only {
            return Ok(Outcome::Checked {
                files: src_files.len(),
            });
        }

        let targets: Vec<(RemoteObject, String)> = src_files
            .into_iter()
            .map(|object| {
                let path =
                    key_resolver::destination_path(&object.key, &src_prefix, *strip_extension)
                        .to_string();
                (object, path)
            })
            .collect();
        let dst_files = self.list_destination(destination_bucket, &targets).await?;

        let plan = SyncPlan::build(targets, &dst_files);
        let copies = plan.copy_count();
        debug!("{} of {} files need copying", copies, plan.entries().len());
        for entry in plan.entries() {
            let reason = match entry.action {
                Action::Skip => {
                    info!("{} matches", entry.destination);
                    continue;
                }
                Action::Copy(reason) => reason,
            };
            info!("{} {}", entry.destination, reason);

            let content_type = self
                .store
                .content_type(&entry.source.bucket, &entry.source.key)
                .await?;
            let copy = ObjectCopy {
                source_bucket: entry.source.bucket.clone(),
                source_key: entry.source.key.clone(),
                destination_bucket: destination_bucket.clone(),
                destination_key: entry.destination.clone(),
                content_type,
                cache_control: cache_policy.cache_control(&entry.destination),
            };
            debug!(
                "Copying {}/{} with {:?}",
                copy.source_bucket, copy.source_key, copy.cache_control
            );
            self.store.copy(&copy).await?;
        }

        Ok(Outcome::Synced {
            copied: copies,
            skipped: plan.entries().len() - copies,
        })
    }

    /// Reads the whole destination bucket, keeping only the keys a target
    /// could overwrite.
    async fn list_destination(
        &self,
        bucket: &str,
        targets: &[(RemoteObject, String)],
    ) -> Result<HashMap<String, RemoteObject>, Error> {
        let wanted: HashSet<&str> = targets.iter().map(|(_, path)| path.as_str()).collect();
        let (total, dst_files) = store::list_objects(&self.store, bucket, "")
            .try_fold(
                (0usize, HashMap::new()),
                |(total, mut dst_files), object| {
                    if wanted.contains(object.key.as_str()) {
                        if is_multipart_e_tag(&object) {
                            warn!("{} has a multipart ETag, compared as an opaque tag", object.key);
                        }
                        dst_files.insert(object.key.clone(), object);
                    }
                    future::ready(Ok((total + 1, dst_files)))
                },
            )
            .await?;
        info!("Listed {} files from {}", total, bucket);
        Ok(dst_files)
    }
}

fn is_multipart_e_tag(object: &RemoteObject) -> bool {
    object
        .e_tag
        .as_deref()
        .map_or(false, |e_tag| e_tag.contains('-'))
}
