//! In-process provider.
//!
//! [`InMemoryProvider`] keeps buckets, objects and distributions in
//! concurrent maps and applies the S3 rules a static website deployment
//! runs into:
//!
//! - new buckets start with every public access block flag enabled, so a
//!   public policy is rejected with `AccessDenied` until the block is relaxed;
//! - a bucket can only be deleted once it holds no objects;
//! - website requests are served only when the bucket policy allows
//!   anonymous `s3:GetObject` and public buckets are not restricted.
//!
//! Every call is recorded with start and finish markers so tests can assert
//! ordering and concurrency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use md5::{Digest, Md5};
use parking_lot::{Mutex, RwLock};
use sitestack_core::{AccountId, AwsRegion};
use sitestack_model::cloudfront::DistributionArgs;
use sitestack_model::endpoint::{
    bucket_arn, bucket_regional_domain_name, website_domain, website_endpoint,
};
use sitestack_model::policy::{GET_OBJECT, PolicyDocument};
use sitestack_model::s3::{
    BucketArgs, BucketObjectArgs, BucketPolicyArgs, ObjectOwnership, OwnershipControlsArgs,
    PublicAccessBlockArgs, WebsiteConfigurationArgs,
};
use sitestack_model::{Attributes, ResourceProps, Urn, attrs};
use tracing::{debug, info};
use uuid::Uuid;

use crate::plan::Operation;
use crate::provider::{CreateResult, Provider, ProviderError};

/// Whether a recorded call was starting or finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// The call was entered.
    Start,
    /// The call returned, successfully or not.
    Finish,
}

/// One entry of the call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    /// Target resource.
    pub urn: Urn,
    /// `Create`, `Update` or `Delete`.
    pub operation: Operation,
    /// Start or finish marker.
    pub phase: CallPhase,
}

/// A stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object body.
    pub body: Bytes,
    /// Stored `Content-Type`.
    pub content_type: Option<String>,
    /// Quoted MD5 entity tag.
    pub etag: String,
    /// Last write time.
    pub last_modified: DateTime<Utc>,
}

/// A response of the emulated website endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteResponse {
    /// HTTP status.
    pub status: u16,
    /// `Content-Type` of the body.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Bytes,
}

impl WebsiteResponse {
    fn plain(status: u16, body: &'static str) -> Self {
        Self {
            status,
            content_type: Some("text/plain".to_owned()),
            body: Bytes::from_static(body.as_bytes()),
        }
    }
}

/// A stored distribution.
#[derive(Debug, Clone)]
pub struct DistributionRecord {
    /// Distribution id, e.g. `E2QWRUHEXAMPLE`.
    pub id: String,
    /// Distribution ARN.
    pub arn: String,
    /// `<random>.cloudfront.net`.
    pub domain_name: String,
    /// `InProgress` or `Deployed`.
    pub status: String,
    /// Entity tag of the current configuration.
    pub etag: String,
    /// Current configuration.
    pub config: DistributionArgs,
}

#[derive(Debug)]
struct MemoryBucket {
    region: AwsRegion,
    tags: RwLock<BTreeMap<String, String>>,
    ownership: RwLock<Option<ObjectOwnership>>,
    public_access_block: RwLock<Option<PublicAccessBlockArgs>>,
    website: RwLock<Option<WebsiteConfigurationArgs>>,
    policy: RwLock<Option<String>>,
    objects: DashMap<String, StoredObject>,
}

impl MemoryBucket {
    fn new(name: &str, region: AwsRegion, tags: BTreeMap<String, String>) -> Self {
        Self {
            region,
            tags: RwLock::new(tags),
            ownership: RwLock::new(Some(ObjectOwnership::BucketOwnerEnforced)),
            public_access_block: RwLock::new(Some(PublicAccessBlockArgs {
                bucket: name.to_owned(),
                block_public_acls: true,
                ignore_public_acls: true,
                block_public_policy: true,
                restrict_public_buckets: true,
            })),
            website: RwLock::new(None),
            policy: RwLock::new(None),
            objects: DashMap::new(),
        }
    }

    fn blocks_public_policy(&self) -> bool {
        self.public_access_block
            .read()
            .as_ref()
            .is_some_and(|pab| pab.block_public_policy)
    }

    fn restricts_public_buckets(&self) -> bool {
        self.public_access_block
            .read()
            .as_ref()
            .is_some_and(|pab| pab.restrict_public_buckets)
    }

    fn allows_anonymous_read(&self, object_arn: &str) -> bool {
        if self.restricts_public_buckets() {
            return false;
        }
        self.policy
            .read()
            .as_deref()
            .and_then(|json| PolicyDocument::parse(json).ok())
            .is_some_and(|doc| doc.allows_anonymous(GET_OBJECT, object_arn))
    }
}

/// Provider backed by in-process state.
pub struct InMemoryProvider {
    region: AwsRegion,
    account: AccountId,
    latency: Duration,
    buckets: DashMap<String, MemoryBucket>,
    distributions: DashMap<String, DistributionRecord>,
    calls: Mutex<Vec<ProviderCall>>,
    failures: Mutex<Vec<(String, Operation)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProvider")
            .field("region", &self.region)
            .field("bucket_count", &self.buckets.len())
            .field("distribution_count", &self.distributions.len())
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn no_such_bucket(operation: &str, bucket: &str) -> ProviderError {
    ProviderError::api(
        operation,
        "NoSuchBucket",
        format!("The specified bucket does not exist: {bucket}"),
    )
}

fn random_token(len: usize) -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(len);
    token
}

fn compute_etag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Md5::digest(body)))
}

impl InMemoryProvider {
    /// An empty provider in `us-east-1` for account `000000000000`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            region: AwsRegion::default(),
            account: AccountId::default(),
            latency: Duration::ZERO,
            buckets: DashMap::new(),
            distributions: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Use another region for new buckets and endpoints.
    #[must_use]
    pub fn with_region(mut self, region: AwsRegion) -> Self {
        self.region = region;
        self
    }

    /// Use another account id in ARNs.
    #[must_use]
    pub fn with_account(mut self, account: AccountId) -> Self {
        self.account = account;
        self
    }

    /// Delay every call, making overlaps observable.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `operation` on the resource named `name` fail.
    pub fn fail_on(&self, name: &str, operation: Operation) {
        self.failures.lock().push((name.to_owned(), operation));
    }

    /// The call log, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    /// Number of calls made (create, update and delete alike).
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.phase == CallPhase::Start)
            .count()
    }

    /// Position of the first log entry for `urn` in `phase`.
    #[must_use]
    pub fn call_index(&self, urn: &Urn, phase: CallPhase) -> Option<usize> {
        self.calls
            .lock()
            .iter()
            .position(|c| c.urn == *urn && c.phase == phase)
    }

    /// Highest number of calls that were in flight at the same time.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Names of existing buckets, sorted.
    #[must_use]
    pub fn bucket_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.iter().map(|b| b.key().clone()).collect();
        names.sort();
        names
    }

    /// Whether a bucket exists.
    #[must_use]
    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.buckets.contains_key(bucket)
    }

    /// Tags of a bucket.
    #[must_use]
    pub fn bucket_tags(&self, bucket: &str) -> Option<BTreeMap<String, String>> {
        self.buckets.get(bucket).map(|b| b.tags.read().clone())
    }

    /// Ownership setting of a bucket.
    #[must_use]
    pub fn ownership(&self, bucket: &str) -> Option<ObjectOwnership> {
        self.buckets.get(bucket).and_then(|b| *b.ownership.read())
    }

    /// Public access block of a bucket.
    #[must_use]
    pub fn public_access_block(&self, bucket: &str) -> Option<PublicAccessBlockArgs> {
        self.buckets
            .get(bucket)
            .and_then(|b| b.public_access_block.read().clone())
    }

    /// Website configuration of a bucket.
    #[must_use]
    pub fn website(&self, bucket: &str) -> Option<WebsiteConfigurationArgs> {
        self.buckets.get(bucket).and_then(|b| b.website.read().clone())
    }

    /// Policy JSON of a bucket.
    #[must_use]
    pub fn bucket_policy(&self, bucket: &str) -> Option<String> {
        self.buckets.get(bucket).and_then(|b| b.policy.read().clone())
    }

    /// A stored object.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key).map(|o| o.clone()))
    }

    /// A stored distribution.
    #[must_use]
    pub fn distribution(&self, id: &str) -> Option<DistributionRecord> {
        self.distributions.get(id).map(|d| d.clone())
    }

    /// Number of distributions.
    #[must_use]
    pub fn distribution_count(&self) -> usize {
        self.distributions.len()
    }

    /// Serve `path` from the website endpoint of `bucket`.
    ///
    /// Returns `None` when the bucket does not exist or has no website
    /// configuration. Directory paths get the index suffix appended, missing
    /// keys return 404 with the error document when one is configured.
    #[must_use]
    pub fn website_get(&self, bucket: &str, path: &str) -> Option<WebsiteResponse> {
        let state = self.buckets.get(bucket)?;
        let website = state.website.read().clone()?;

        let path = path.trim_start_matches('/');
        let key = if path.is_empty() || path.ends_with('/') {
            format!("{path}{}", website.index_document.suffix)
        } else {
            path.to_owned()
        };

        let arn = bucket_arn(bucket);
        if !state.allows_anonymous_read(&format!("{arn}/{key}")) {
            return Some(WebsiteResponse::plain(403, "403 Forbidden"));
        }

        if let Some(object) = state.objects.get(&key) {
            return Some(WebsiteResponse {
                status: 200,
                content_type: object.content_type.clone(),
                body: object.body.clone(),
            });
        }

        let error_document = website
            .error_document
            .as_ref()
            .and_then(|doc| state.objects.get(&doc.key).map(|o| o.clone()));
        Some(match error_document {
            Some(doc) => WebsiteResponse {
                status: 404,
                content_type: doc.content_type,
                body: doc.body,
            },
            None => WebsiteResponse::plain(404, "404 Not Found"),
        })
    }

    /// Log the start of a call; [`finish`](Self::finish) must follow even on error.
    async fn begin(&self, urn: &Urn, operation: Operation) -> Result<(), ProviderError> {
        self.calls.lock().push(ProviderCall {
            urn: urn.clone(),
            operation,
            phase: CallPhase::Start,
        });
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut failures = self.failures.lock();
        if let Some(pos) = failures
            .iter()
            .position(|(name, op)| name == urn.name() && *op == operation)
        {
            failures.remove(pos);
            return Err(ProviderError::api(
                operation.to_string(),
                "InjectedFailure",
                format!("{operation} of {} was configured to fail", urn.name()),
            ));
        }
        Ok(())
    }

    fn finish(&self, urn: &Urn, operation: Operation) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.lock().push(ProviderCall {
            urn: urn.clone(),
            operation,
            phase: CallPhase::Finish,
        });
    }

    fn with_bucket<T>(
        &self,
        operation: &str,
        bucket: &str,
        f: impl FnOnce(&MemoryBucket) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let state = self
            .buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket(operation, bucket))?;
        f(&state)
    }

    fn bucket_id_outputs(bucket: &str) -> Attributes {
        Attributes::from([(attrs::ID.to_owned(), bucket.to_owned())])
    }

    fn create_bucket(&self, args: &BucketArgs) -> Result<CreateResult, ProviderError> {
        let name = args.bucket.clone();
        match self.buckets.entry(name.clone()) {
            Entry::Occupied(_) => {
                return Err(ProviderError::api(
                    "CreateBucket",
                    "BucketAlreadyOwnedByYou",
                    format!("Your previous request to create the named bucket succeeded: {name}"),
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(MemoryBucket::new(
                    &name,
                    self.region.clone(),
                    args.tags.clone(),
                ));
            }
        }
        info!(bucket = %name, "bucket created");

        let outputs = Attributes::from([
            (attrs::ID.to_owned(), name.clone()),
            (attrs::ARN.to_owned(), bucket_arn(&name)),
            (attrs::BUCKET.to_owned(), name.clone()),
            (
                attrs::BUCKET_REGIONAL_DOMAIN_NAME.to_owned(),
                bucket_regional_domain_name(&name, &self.region),
            ),
        ]);
        Ok(CreateResult { id: name, outputs })
    }

    fn put_ownership_controls(&self, args: &OwnershipControlsArgs) -> Result<Attributes, ProviderError> {
        self.with_bucket("PutBucketOwnershipControls", &args.bucket, |b| {
            *b.ownership.write() = Some(args.rule.object_ownership);
            Ok(())
        })?;
        Ok(Self::bucket_id_outputs(&args.bucket))
    }

    fn put_public_access_block(
        &self,
        args: &PublicAccessBlockArgs,
    ) -> Result<Attributes, ProviderError> {
        self.with_bucket("PutPublicAccessBlock", &args.bucket, |b| {
            *b.public_access_block.write() = Some(args.clone());
            Ok(())
        })?;
        Ok(Self::bucket_id_outputs(&args.bucket))
    }

    fn put_website(&self, args: &WebsiteConfigurationArgs) -> Result<Attributes, ProviderError> {
        let region = self.with_bucket("PutBucketWebsite", &args.bucket, |b| {
            *b.website.write() = Some(args.clone());
            Ok(b.region.clone())
        })?;

        let mut outputs = Self::bucket_id_outputs(&args.bucket);
        outputs.insert(
            attrs::WEBSITE_ENDPOINT.to_owned(),
            format!("http://{}", website_endpoint(&args.bucket, &region)),
        );
        outputs.insert(attrs::WEBSITE_DOMAIN.to_owned(), website_domain(&region));
        Ok(outputs)
    }

    fn put_policy(&self, args: &BucketPolicyArgs) -> Result<Attributes, ProviderError> {
        let document = PolicyDocument::parse(&args.policy).map_err(|e| {
            ProviderError::api("PutBucketPolicy", "MalformedPolicy", e.to_string())
        })?;

        self.with_bucket("PutBucketPolicy", &args.bucket, |b| {
            if document.grants_public_access() && b.blocks_public_policy() {
                return Err(ProviderError::api(
                    "PutBucketPolicy",
                    "AccessDenied",
                    "User is not authorized to perform: s3:PutBucketPolicy because public \
                     policies are blocked by the BlockPublicPolicy block public access setting.",
                ));
            }
            *b.policy.write() = Some(args.policy.clone());
            Ok(())
        })?;
        Ok(Self::bucket_id_outputs(&args.bucket))
    }

    fn put_object(&self, args: &BucketObjectArgs) -> Result<Attributes, ProviderError> {
        let body = Bytes::from(args.content.clone().into_bytes());
        let etag = compute_etag(&body);
        self.with_bucket("PutObject", &args.bucket, |b| {
            b.objects.insert(
                args.key.clone(),
                StoredObject {
                    body,
                    content_type: args.content_type.clone(),
                    etag: etag.clone(),
                    last_modified: Utc::now(),
                },
            );
            Ok(())
        })?;
        debug!(bucket = %args.bucket, key = %args.key, %etag, "object stored");

        Ok(Attributes::from([
            (attrs::ID.to_owned(), args.key.clone()),
            (attrs::ETAG.to_owned(), etag),
        ]))
    }

    fn distribution_outputs(record: &DistributionRecord) -> Attributes {
        Attributes::from([
            (attrs::ID.to_owned(), record.id.clone()),
            (attrs::ARN.to_owned(), record.arn.clone()),
            (attrs::DOMAIN_NAME.to_owned(), record.domain_name.clone()),
            (attrs::STATUS.to_owned(), record.status.clone()),
            (attrs::ETAG.to_owned(), record.etag.clone()),
        ])
    }

    fn deployment_status(config: &DistributionArgs) -> String {
        if config.wait_for_deployment {
            "Deployed".to_owned()
        } else {
            "InProgress".to_owned()
        }
    }

    fn create_distribution(&self, args: &DistributionArgs) -> Result<CreateResult, ProviderError> {
        let id = format!("E{}", random_token(13).to_uppercase());
        let record = DistributionRecord {
            arn: format!(
                "arn:aws:cloudfront::{}:distribution/{id}",
                self.account.as_str()
            ),
            domain_name: format!("d{}.cloudfront.net", random_token(13)),
            status: Self::deployment_status(args),
            etag: format!("E{}", random_token(13).to_uppercase()),
            config: args.clone(),
            id: id.clone(),
        };
        info!(distribution = %id, domain = %record.domain_name, "distribution created");

        let outputs = Self::distribution_outputs(&record);
        self.distributions.insert(id.clone(), record);
        Ok(CreateResult { id, outputs })
    }

    fn update_distribution(
        &self,
        id: &str,
        args: &DistributionArgs,
    ) -> Result<Attributes, ProviderError> {
        let mut record = self.distributions.get_mut(id).ok_or_else(|| {
            ProviderError::api(
                "UpdateDistribution",
                "NoSuchDistribution",
                format!("The specified distribution does not exist: {id}"),
            )
        })?;
        record.config = args.clone();
        record.status = Self::deployment_status(args);
        record.etag = format!("E{}", random_token(13).to_uppercase());
        Ok(Self::distribution_outputs(&record))
    }

    fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        let Some(state) = self.buckets.get(bucket) else {
            return Ok(());
        };
        if !state.objects.is_empty() {
            return Err(ProviderError::api(
                "DeleteBucket",
                "BucketNotEmpty",
                format!("The bucket you tried to delete is not empty: {bucket}"),
            ));
        }
        drop(state);
        self.buckets.remove(bucket);
        info!(bucket = %bucket, "bucket deleted");
        Ok(())
    }

    /// Run `f` against a bucket that may already be gone.
    fn if_bucket(&self, bucket: &str, f: impl FnOnce(&MemoryBucket)) {
        if let Some(state) = self.buckets.get(bucket) {
            f(&state);
        }
    }

    fn apply_create(&self, props: &ResourceProps) -> Result<CreateResult, ProviderError> {
        let with_id = |outputs: Attributes| {
            let id = outputs.get(attrs::ID).cloned().unwrap_or_default();
            CreateResult { id, outputs }
        };
        match props {
            ResourceProps::Bucket(args) => self.create_bucket(args),
            ResourceProps::OwnershipControls(args) => {
                self.put_ownership_controls(args).map(with_id)
            }
            ResourceProps::PublicAccessBlock(args) => {
                self.put_public_access_block(args).map(with_id)
            }
            ResourceProps::WebsiteConfiguration(args) => self.put_website(args).map(with_id),
            ResourceProps::BucketPolicy(args) => self.put_policy(args).map(with_id),
            ResourceProps::BucketObject(args) => self.put_object(args).map(with_id),
            ResourceProps::Distribution(args) => self.create_distribution(args),
        }
    }

    fn apply_update(&self, id: &str, new: &ResourceProps) -> Result<Attributes, ProviderError> {
        match new {
            ResourceProps::Bucket(args) => {
                self.with_bucket("PutBucketTagging", &args.bucket, |b| {
                    b.tags.write().clone_from(&args.tags);
                    Ok(())
                })?;
                let mut outputs = Self::bucket_id_outputs(&args.bucket);
                outputs.insert(attrs::ARN.to_owned(), bucket_arn(&args.bucket));
                outputs.insert(attrs::BUCKET.to_owned(), args.bucket.clone());
                outputs.insert(
                    attrs::BUCKET_REGIONAL_DOMAIN_NAME.to_owned(),
                    bucket_regional_domain_name(&args.bucket, &self.region),
                );
                Ok(outputs)
            }
            ResourceProps::Distribution(args) => self.update_distribution(id, args),
            other => self.apply_create(other).map(|created| created.outputs),
        }
    }

    fn apply_delete(&self, id: &str, props: &ResourceProps) -> Result<(), ProviderError> {
        match props {
            ResourceProps::Bucket(args) => self.delete_bucket(&args.bucket),
            ResourceProps::OwnershipControls(args) => {
                self.if_bucket(&args.bucket, |b| *b.ownership.write() = None);
                Ok(())
            }
            ResourceProps::PublicAccessBlock(args) => {
                self.if_bucket(&args.bucket, |b| *b.public_access_block.write() = None);
                Ok(())
            }
            ResourceProps::WebsiteConfiguration(args) => {
                self.if_bucket(&args.bucket, |b| *b.website.write() = None);
                Ok(())
            }
            ResourceProps::BucketPolicy(args) => {
                self.if_bucket(&args.bucket, |b| *b.policy.write() = None);
                Ok(())
            }
            ResourceProps::BucketObject(args) => {
                self.if_bucket(&args.bucket, |b| {
                    b.objects.remove(&args.key);
                });
                Ok(())
            }
            ResourceProps::Distribution(_) => {
                if self.distributions.remove(id).is_some() {
                    info!(distribution = %id, "distribution deleted");
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    async fn create(&self, urn: &Urn, props: &ResourceProps) -> Result<CreateResult, ProviderError> {
        let result = self
            .begin(urn, Operation::Create)
            .await
            .and_then(|()| self.apply_create(props));
        self.finish(urn, Operation::Create);
        result
    }

    async fn update(
        &self,
        urn: &Urn,
        id: &str,
        _old: &ResourceProps,
        new: &ResourceProps,
    ) -> Result<Attributes, ProviderError> {
        let result = self
            .begin(urn, Operation::Update)
            .await
            .and_then(|()| self.apply_update(id, new));
        self.finish(urn, Operation::Update);
        result
    }

    async fn delete(&self, urn: &Urn, id: &str, props: &ResourceProps) -> Result<(), ProviderError> {
        let result = self
            .begin(urn, Operation::Delete)
            .await
            .and_then(|()| self.apply_delete(id, props));
        self.finish(urn, Operation::Delete);
        result
    }
}

#[cfg(test)]
mod tests {
    use sitestack_model::policy::PolicyDocument;
    use sitestack_model::s3::{ErrorDocument, IndexDocument, OwnershipControlsRule};
    use sitestack_model::{ResourceArgs, ResourceKind};

    use super::*;

    fn urn(kind: ResourceKind, name: &str) -> Urn {
        Urn::new("dev", "static-website", kind, name).unwrap()
    }

    async fn create(provider: &InMemoryProvider, props: ResourceProps) -> CreateResult {
        provider
            .create(&urn(props.kind(), "r"), &props)
            .await
            .unwrap()
    }

    fn bucket(name: &str) -> ResourceProps {
        BucketArgs {
            bucket: name.to_owned(),
            ..BucketArgs::default()
        }
        .into_props()
    }

    fn public_policy(name: &str) -> ResourceProps {
        BucketPolicyArgs {
            bucket: name.to_owned(),
            policy: PolicyDocument::public_read(&bucket_arn(name))
                .to_json()
                .unwrap(),
        }
        .into_props()
    }

    fn object(name: &str, key: &str, content: &str) -> ResourceProps {
        BucketObjectArgs {
            bucket: name.to_owned(),
            key: key.to_owned(),
            content: content.to_owned(),
            content_type: Some("text/html".to_owned()),
        }
        .into_props()
    }

    fn website(name: &str) -> ResourceProps {
        WebsiteConfigurationArgs {
            bucket: name.to_owned(),
            index_document: IndexDocument {
                suffix: "index.html".into(),
            },
            error_document: Some(ErrorDocument {
                key: "error.html".into(),
            }),
        }
        .into_props()
    }

    #[tokio::test]
    async fn test_should_create_bucket_with_outputs() {
        let provider = InMemoryProvider::new();
        let result = create(&provider, bucket("site")).await;

        assert_eq!(result.id, "site");
        assert_eq!(result.outputs[attrs::ARN], "arn:aws:s3:::site");
        assert_eq!(
            result.outputs[attrs::BUCKET_REGIONAL_DOMAIN_NAME],
            "site.s3.us-east-1.amazonaws.com"
        );
        assert!(provider.bucket_exists("site"));
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_bucket() {
        let provider = InMemoryProvider::new();
        create(&provider, bucket("site")).await;
        let err = provider
            .create(&urn(ResourceKind::Bucket, "again"), &bucket("site"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("BucketAlreadyOwnedByYou"));
    }

    #[tokio::test]
    async fn test_should_block_public_policy_on_new_bucket() {
        let provider = InMemoryProvider::new();
        create(&provider, bucket("site")).await;

        let err = provider
            .create(&urn(ResourceKind::BucketPolicy, "p"), &public_policy("site"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("AccessDenied"));

        create(&provider, PublicAccessBlockArgs::permissive("site").into_props()).await;
        create(&provider, public_policy("site")).await;
        assert!(provider.bucket_policy("site").is_some());
    }

    #[tokio::test]
    async fn test_should_report_website_endpoint_with_scheme() {
        let provider = InMemoryProvider::new();
        create(&provider, bucket("site")).await;
        let result = create(&provider, website("site")).await;
        assert_eq!(
            result.outputs[attrs::WEBSITE_ENDPOINT],
            "http://site.s3-website-us-east-1.amazonaws.com"
        );
        assert_eq!(
            result.outputs[attrs::WEBSITE_DOMAIN],
            "s3-website-us-east-1.amazonaws.com"
        );
    }

    #[tokio::test]
    async fn test_should_serve_website_only_when_public() {
        let provider = InMemoryProvider::new();
        create(&provider, bucket("site")).await;
        create(&provider, website("site")).await;
        create(&provider, object("site", "index.html", "<h1>hi</h1>")).await;
        create(&provider, object("site", "error.html", "<h1>404</h1>")).await;

        assert_eq!(provider.website_get("site", "/").unwrap().status, 403);

        create(&provider, PublicAccessBlockArgs::permissive("site").into_props()).await;
        create(&provider, public_policy("site")).await;

        let index = provider.website_get("site", "/").unwrap();
        assert_eq!(index.status, 200);
        assert_eq!(index.body, Bytes::from_static(b"<h1>hi</h1>"));
        assert_eq!(index.content_type.as_deref(), Some("text/html"));

        let missing = provider.website_get("site", "/nope.html").unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body, Bytes::from_static(b"<h1>404</h1>"));

        assert!(provider.website_get("other", "/").is_none());
    }

    #[tokio::test]
    async fn test_should_store_object_with_md5_etag() {
        let provider = InMemoryProvider::new();
        create(&provider, bucket("site")).await;
        let result = create(&provider, object("site", "index.html", "")).await;
        assert_eq!(result.id, "index.html");
        assert_eq!(
            result.outputs[attrs::ETAG],
            "\"d41d8cd98f00b204e9800998ecf8427e\""
        );
    }

    #[tokio::test]
    async fn test_should_refuse_to_delete_non_empty_bucket() {
        let provider = InMemoryProvider::new();
        create(&provider, bucket("site")).await;
        create(&provider, object("site", "index.html", "x")).await;

        let bucket_urn = urn(ResourceKind::Bucket, "site");
        let err = provider
            .delete(&bucket_urn, "site", &bucket("site"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("BucketNotEmpty"));

        provider
            .delete(
                &urn(ResourceKind::BucketObject, "index"),
                "index.html",
                &object("site", "index.html", "x"),
            )
            .await
            .unwrap();
        provider
            .delete(&bucket_urn, "site", &bucket("site"))
            .await
            .unwrap();
        assert!(!provider.bucket_exists("site"));

        // Deleting again is a no-op.
        provider
            .delete(&bucket_urn, "site", &bucket("site"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_apply_ownership_controls() {
        let provider = InMemoryProvider::new();
        create(&provider, bucket("site")).await;
        assert_eq!(
            provider.ownership("site"),
            Some(ObjectOwnership::BucketOwnerEnforced)
        );

        create(
            &provider,
            OwnershipControlsArgs {
                bucket: "site".into(),
                rule: OwnershipControlsRule {
                    object_ownership: ObjectOwnership::BucketOwnerPreferred,
                },
            }
            .into_props(),
        )
        .await;
        assert_eq!(
            provider.ownership("site"),
            Some(ObjectOwnership::BucketOwnerPreferred)
        );
    }

    #[tokio::test]
    async fn test_should_record_calls_and_inject_failures() {
        let provider = InMemoryProvider::new();
        let bucket_urn = urn(ResourceKind::Bucket, "site");
        provider.fail_on("site", Operation::Create);

        let err = provider.create(&bucket_urn, &bucket("site")).await.unwrap_err();
        assert_eq!(err.code(), Some("InjectedFailure"));
        assert!(!provider.bucket_exists("site"));

        provider.create(&bucket_urn, &bucket("site")).await.unwrap();
        assert_eq!(provider.mutation_count(), 2);
        assert_eq!(
            provider.call_index(&bucket_urn, CallPhase::Start),
            Some(0)
        );
        assert!(provider.call_index(&bucket_urn, CallPhase::Finish).is_some());
    }
}
