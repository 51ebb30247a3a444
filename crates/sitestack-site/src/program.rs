//! Resource declarations of the static website.

use std::collections::BTreeMap;

use sitestack_engine::{EngineResult, ResourceOptions, ResourceRef, Stack};
use sitestack_model::endpoint::strip_scheme;
use sitestack_model::policy::PolicyDocument;
use sitestack_model::s3::{
    BucketArgs, BucketObjectArgs, BucketPolicyArgs, ErrorDocument, IndexDocument,
    ObjectOwnership, OwnershipControlsArgs, OwnershipControlsRule, PublicAccessBlockArgs,
    WebsiteConfigurationArgs,
};
use sitestack_model::{Output, attrs};
use tracing::debug;

use crate::content::SiteContent;
use crate::distribution::website_distribution;

/// Output holding the distribution's domain name.
pub const CLOUDFRONT_URL: &str = "cloudfrontUrl";
/// Output holding the bucket's website endpoint.
pub const S3_WEBSITE_URL: &str = "s3WebsiteUrl";
/// Output holding the bucket name.
pub const BUCKET_NAME: &str = "bucketName";
/// Output holding the distribution id.
pub const DISTRIBUTION_ID: &str = "distributionId";

const INDEX_DOCUMENT: &str = "index.html";
const ERROR_DOCUMENT: &str = "error.html";
const HTML: &str = "text/html";

/// Handles to every resource of the site.
#[derive(Debug, Clone)]
pub struct StaticWebsite {
    /// Content bucket.
    pub bucket: ResourceRef,
    /// Ownership controls of the bucket.
    pub ownership_controls: ResourceRef,
    /// Public access block of the bucket.
    pub public_access_block: ResourceRef,
    /// Website configuration of the bucket.
    pub website: ResourceRef,
    /// Public-read bucket policy.
    pub policy: ResourceRef,
    /// `index.html` object.
    pub index: ResourceRef,
    /// `error.html` object.
    pub error: ResourceRef,
    /// CloudFront distribution.
    pub distribution: ResourceRef,
}

/// Declare the site with its default pages.
pub fn static_website(stack: &mut Stack) -> EngineResult<StaticWebsite> {
    static_website_with(stack, &SiteContent::default())
}

/// Declare the site serving `content`.
pub fn static_website_with(stack: &mut Stack, content: &SiteContent) -> EngineResult<StaticWebsite> {
    let tags = BTreeMap::from([
        ("Project".to_owned(), "StaticWebsite".to_owned()),
        ("ManagedBy".to_owned(), "SiteStack".to_owned()),
    ]);
    let bucket = stack.register(
        "static-website-bucket",
        Output::known(BucketArgs {
            bucket: String::new(),
            tags,
        }),
        ResourceOptions::new(),
    )?;

    let ownership_controls = stack.register(
        "ownership-controls",
        bucket.id().apply(|bucket| OwnershipControlsArgs {
            bucket,
            rule: OwnershipControlsRule {
                object_ownership: ObjectOwnership::BucketOwnerPreferred,
            },
        }),
        ResourceOptions::new(),
    )?;

    let public_access_block = stack.register(
        "public-access-block",
        bucket.id().apply(|bucket| PublicAccessBlockArgs::permissive(bucket)),
        ResourceOptions::new(),
    )?;

    let website = stack.register(
        "website-config",
        bucket.id().apply(|bucket| WebsiteConfigurationArgs {
            bucket,
            index_document: IndexDocument {
                suffix: INDEX_DOCUMENT.to_owned(),
            },
            error_document: Some(ErrorDocument {
                key: ERROR_DOCUMENT.to_owned(),
            }),
        }),
        ResourceOptions::new()
            .depends_on(&ownership_controls)
            .depends_on(&public_access_block),
    )?;

    let policy = stack.register(
        "bucket-policy",
        bucket
            .id()
            .zip(bucket.arn())
            .try_apply(|(bucket, arn)| {
                Ok(BucketPolicyArgs {
                    bucket,
                    policy: PolicyDocument::public_read(&arn).to_json()?,
                })
            }),
        ResourceOptions::new()
            .depends_on(&public_access_block)
            .depends_on(&website),
    )?;

    let index = stack.register(
        INDEX_DOCUMENT,
        html_object(&bucket, INDEX_DOCUMENT, &content.index),
        ResourceOptions::new(),
    )?;
    let error = stack.register(
        ERROR_DOCUMENT,
        html_object(&bucket, ERROR_DOCUMENT, &content.error),
        ResourceOptions::new(),
    )?;

    let origin_domain = website
        .attribute(attrs::WEBSITE_ENDPOINT)
        .apply(|endpoint| strip_scheme(&endpoint).to_owned());
    let distribution = stack.register(
        "static-site-distribution",
        bucket
            .arn()
            .zip(origin_domain)
            .apply(|(arn, domain)| website_distribution(arn, domain)),
        ResourceOptions::new(),
    )?;

    stack.export(CLOUDFRONT_URL, distribution.attribute(attrs::DOMAIN_NAME))?;
    stack.export(S3_WEBSITE_URL, website.attribute(attrs::WEBSITE_ENDPOINT))?;
    stack.export(BUCKET_NAME, bucket.id())?;
    stack.export(DISTRIBUTION_ID, distribution.id())?;

    debug!(
        project = %stack.project(),
        stack = %stack.name(),
        resources = stack.resources().len(),
        "static website declared"
    );
    Ok(StaticWebsite {
        bucket,
        ownership_controls,
        public_access_block,
        website,
        policy,
        index,
        error,
        distribution,
    })
}

fn html_object(bucket: &ResourceRef, key: &str, body: &str) -> Output<BucketObjectArgs> {
    let key = key.to_owned();
    let body = body.to_owned();
    bucket.id().apply(move |bucket| BucketObjectArgs {
        bucket,
        key: key.clone(),
        content: body.clone(),
        content_type: Some(HTML.to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sitestack_engine::{
        CallPhase, DependencyGraph, Engine, InMemoryProvider, MemoryStateStore, Operation,
    };
    use sitestack_model::policy::{GET_BUCKET_WEBSITE, GET_OBJECT};

    use super::*;

    fn declare() -> (Stack, StaticWebsite) {
        let mut stack = Stack::new("static-website", "dev");
        let site = static_website(&mut stack).unwrap();
        (stack, site)
    }

    fn engine(provider: &Arc<InMemoryProvider>) -> Engine {
        Engine::new(provider.clone(), Arc::new(MemoryStateStore::new()))
    }

    #[test]
    fn test_should_declare_eight_resources_and_four_outputs() {
        let (stack, _) = declare();
        assert_eq!(stack.resources().len(), 8);
        let names: Vec<&str> = stack.exports().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![CLOUDFRONT_URL, S3_WEBSITE_URL, BUCKET_NAME, DISTRIBUTION_ID]
        );
    }

    #[test]
    fn test_should_derive_explicit_and_implicit_edges() {
        let (stack, site) = declare();
        let graph = DependencyGraph::build(&stack).unwrap();

        let website = graph.dependencies_of(site.website.urn());
        assert!(website.contains(site.ownership_controls.urn()));
        assert!(website.contains(site.public_access_block.urn()));
        assert!(website.contains(site.bucket.urn()));

        let policy = graph.dependencies_of(site.policy.urn());
        assert!(policy.contains(site.public_access_block.urn()));
        assert!(policy.contains(site.website.urn()));

        for object in [&site.index, &site.error] {
            let deps = graph.dependencies_of(object.urn());
            assert_eq!(deps.len(), 1);
            assert!(deps.contains(site.bucket.urn()));
        }

        let distribution = graph.dependencies_of(site.distribution.urn());
        assert!(distribution.contains(site.website.urn()));
        assert!(distribution.contains(site.bucket.urn()));

        assert!(
            !graph
                .dependencies_of(site.ownership_controls.urn())
                .contains(site.public_access_block.urn())
        );
    }

    #[tokio::test]
    async fn test_should_create_site_and_publish_outputs() {
        let provider = Arc::new(InMemoryProvider::new());
        let engine = engine(&provider);
        let (stack, _) = declare();

        let summary = engine.up(&stack).await.unwrap();

        assert_eq!(summary.count(Operation::Create), 8);
        assert_eq!(summary.mutations(), 8);
        assert_eq!(summary.outputs.len(), 4);
        for name in [CLOUDFRONT_URL, S3_WEBSITE_URL, BUCKET_NAME, DISTRIBUTION_ID] {
            assert!(!summary.outputs[name].is_empty(), "{name} is empty");
        }

        let bucket = &summary.outputs[BUCKET_NAME];
        assert!(bucket.starts_with("static-website-bucket-"));
        assert!(summary.outputs[CLOUDFRONT_URL].ends_with(".cloudfront.net"));

        let tags = provider.bucket_tags(bucket).unwrap();
        assert_eq!(tags["Project"], "StaticWebsite");
        assert_eq!(tags["ManagedBy"], "SiteStack");
        assert_eq!(
            provider.ownership(bucket),
            Some(ObjectOwnership::BucketOwnerPreferred)
        );
        assert_eq!(
            provider.public_access_block(bucket),
            Some(PublicAccessBlockArgs::permissive(bucket.as_str()))
        );
    }

    #[tokio::test]
    async fn test_should_strip_scheme_from_origin_domain() {
        let provider = Arc::new(InMemoryProvider::new());
        let (stack, _) = declare();
        let summary = engine(&provider).up(&stack).await.unwrap();

        let endpoint = &summary.outputs[S3_WEBSITE_URL];
        assert!(endpoint.starts_with("http://"));
        let record = provider
            .distribution(&summary.outputs[DISTRIBUTION_ID])
            .unwrap();
        assert_eq!(record.config.origins[0].domain_name, strip_scheme(endpoint));
        assert!(!record.config.origins[0].domain_name.contains("://"));
        assert_eq!(
            record.config.origins[0].origin_id,
            format!("arn:aws:s3:::{}", summary.outputs[BUCKET_NAME])
        );
    }

    #[tokio::test]
    async fn test_should_attach_public_read_policy() {
        let provider = Arc::new(InMemoryProvider::new());
        let (stack, _) = declare();
        let summary = engine(&provider).up(&stack).await.unwrap();

        let bucket = &summary.outputs[BUCKET_NAME];
        let arn = format!("arn:aws:s3:::{bucket}");
        let policy = PolicyDocument::parse(&provider.bucket_policy(bucket).unwrap()).unwrap();
        assert_eq!(policy.statement.len(), 2);
        assert!(policy.allows_anonymous(GET_OBJECT, &format!("{arn}/index.html")));
        assert!(policy.allows_anonymous(GET_BUCKET_WEBSITE, &arn));
    }

    #[tokio::test]
    async fn test_should_not_start_policy_before_access_block_and_website_finish() {
        let provider = Arc::new(InMemoryProvider::new().with_latency(Duration::from_millis(20)));
        let (stack, site) = declare();
        engine(&provider).up(&stack).await.unwrap();

        let policy_start = provider
            .call_index(site.policy.urn(), CallPhase::Start)
            .unwrap();
        for prerequisite in [&site.public_access_block, &site.website] {
            let finished = provider
                .call_index(prerequisite.urn(), CallPhase::Finish)
                .unwrap();
            assert!(finished < policy_start, "{} finished late", prerequisite.urn());
        }

        let website_start = provider
            .call_index(site.website.urn(), CallPhase::Start)
            .unwrap();
        for prerequisite in [&site.ownership_controls, &site.public_access_block] {
            let finished = provider
                .call_index(prerequisite.urn(), CallPhase::Finish)
                .unwrap();
            assert!(finished < website_start);
        }
        assert!(provider.max_concurrency() > 1);
    }

    #[tokio::test]
    async fn test_should_make_no_changes_on_second_up() {
        let provider = Arc::new(InMemoryProvider::new());
        let engine = engine(&provider);
        let (stack, _) = declare();

        let first = engine.up(&stack).await.unwrap();
        provider.clear_calls();
        let second = engine.up(&stack).await.unwrap();

        assert_eq!(second.mutations(), 0);
        assert_eq!(second.count(Operation::Same), 8);
        assert_eq!(provider.mutation_count(), 0);
        assert_eq!(second.outputs, first.outputs);
    }

    #[tokio::test]
    async fn test_should_update_only_the_changed_page() {
        let provider = Arc::new(InMemoryProvider::new());
        let engine = engine(&provider);
        let (stack, _) = declare();
        let first = engine.up(&stack).await.unwrap();

        let mut changed = Stack::new("static-website", "dev");
        static_website_with(
            &mut changed,
            &SiteContent {
                index: "<h1>v2</h1>".to_owned(),
                ..SiteContent::default()
            },
        )
        .unwrap();
        let second = engine.up(&changed).await.unwrap();

        assert_eq!(second.count(Operation::Update), 1);
        assert_eq!(second.mutations(), 1);
        let object = provider
            .object(&first.outputs[BUCKET_NAME], INDEX_DOCUMENT)
            .unwrap();
        assert_eq!(&object.body[..], b"<h1>v2</h1>");
    }

    #[tokio::test]
    async fn test_should_delete_removed_declaration() {
        let provider = Arc::new(InMemoryProvider::new());
        let engine = engine(&provider);

        let mut extended = Stack::new("static-website", "dev");
        let site = static_website(&mut extended).unwrap();
        extended
            .register(
                "about.html",
                html_object(&site.bucket, "about.html", "<h1>about</h1>"),
                ResourceOptions::new(),
            )
            .unwrap();
        let first = engine.up(&extended).await.unwrap();
        assert_eq!(first.count(Operation::Create), 9);
        let bucket = first.outputs[BUCKET_NAME].clone();
        assert!(provider.object(&bucket, "about.html").is_some());

        let (stack, _) = declare();
        let second = engine.up(&stack).await.unwrap();
        assert_eq!(second.count(Operation::Delete), 1);
        assert_eq!(second.mutations(), 1);
        assert!(provider.object(&bucket, "about.html").is_none());
    }

    #[tokio::test]
    async fn test_should_serve_pages_from_website_endpoint() {
        let provider = Arc::new(InMemoryProvider::new());
        let (stack, _) = declare();
        let summary = engine(&provider).up(&stack).await.unwrap();
        let bucket = &summary.outputs[BUCKET_NAME];

        let index = provider.website_get(bucket, "/").unwrap();
        assert_eq!(index.status, 200);
        assert_eq!(index.content_type.as_deref(), Some("text/html"));
        let body = String::from_utf8(index.body.to_vec()).unwrap();
        assert!(body.contains("Welcome to my SiteStack-deployed website!"));

        let missing = provider.website_get(bucket, "/missing.html").unwrap();
        assert_eq!(missing.status, 404);
        assert!(String::from_utf8(missing.body.to_vec()).unwrap().contains("404 Not Found"));
    }

    #[tokio::test]
    async fn test_should_destroy_everything() {
        let provider = Arc::new(InMemoryProvider::new());
        let engine = engine(&provider);
        let (stack, _) = declare();
        let created = engine.up(&stack).await.unwrap();

        let destroyed = engine.destroy().await.unwrap();
        assert_eq!(destroyed.count(Operation::Delete), 8);
        assert!(!provider.bucket_exists(&created.outputs[BUCKET_NAME]));
        assert_eq!(provider.distribution_count(), 0);
    }
}
