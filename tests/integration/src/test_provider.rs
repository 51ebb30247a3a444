//! AWS provider calls against the server.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sitestack_aws::AwsProvider;
    use sitestack_engine::Provider;
    use sitestack_model::s3::{BucketArgs, PublicAccessBlockArgs};
    use sitestack_model::{ResourceKind, ResourceProps, Urn, attrs};

    use crate::{TestDeployment, s3_client, test_stack_name};

    fn urn(kind: ResourceKind, name: &str) -> Urn {
        Urn::new("test", "static-website", kind, name).unwrap()
    }

    async fn provider() -> AwsProvider {
        let deployment = TestDeployment::new("provider").await.unwrap();
        AwsProvider::from_config(&deployment.config).await
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_tagged_bucket() {
        let provider = provider().await;
        let name = test_stack_name("tags");
        let props = ResourceProps::Bucket(BucketArgs {
            bucket: name.clone(),
            tags: BTreeMap::from([("Project".to_owned(), "StaticWebsite".to_owned())]),
        });

        let created = provider
            .create(&urn(ResourceKind::Bucket, "bucket"), &props)
            .await
            .expect("create bucket");
        assert_eq!(created.id, name);
        assert_eq!(created.outputs[attrs::ARN], format!("arn:aws:s3:::{name}"));

        let tagging = s3_client()
            .get_bucket_tagging()
            .bucket(&name)
            .send()
            .await
            .expect("get_bucket_tagging");
        assert_eq!(tagging.tag_set().len(), 1);
        assert_eq!(tagging.tag_set()[0].key(), "Project");

        provider
            .delete(&urn(ResourceKind::Bucket, "bucket"), &name, &props)
            .await
            .expect("delete bucket");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_treat_missing_resources_as_deleted() {
        let provider = provider().await;
        let name = test_stack_name("missing");

        let bucket = ResourceProps::Bucket(BucketArgs {
            bucket: name.clone(),
            tags: BTreeMap::new(),
        });
        provider
            .delete(&urn(ResourceKind::Bucket, "bucket"), &name, &bucket)
            .await
            .expect("deleting a missing bucket succeeds");

        let pab = ResourceProps::PublicAccessBlock(PublicAccessBlockArgs::permissive(name.clone()));
        provider
            .delete(&urn(ResourceKind::PublicAccessBlock, "pab"), &name, &pab)
            .await
            .expect("deleting a missing access block succeeds");
    }
}
