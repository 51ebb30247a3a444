//! End-to-end deployment of the static website.

#[cfg(test)]
mod tests {
    use sitestack_engine::Operation;
    use sitestack_model::policy::PolicyDocument;
    use sitestack_site::{BUCKET_NAME, CLOUDFRONT_URL, DISTRIBUTION_ID, S3_WEBSITE_URL};

    use crate::{TestDeployment, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_deploy_site_and_converge() {
        let deployment = TestDeployment::new("deploy").await.unwrap();
        let stack = deployment.site().unwrap();

        let first = deployment.engine.up(&stack).await.expect("first up");
        assert_eq!(first.count(Operation::Create), 8);
        for name in [CLOUDFRONT_URL, S3_WEBSITE_URL, BUCKET_NAME, DISTRIBUTION_ID] {
            assert!(!first.outputs[name].is_empty(), "{name} is empty");
        }

        let second = deployment.engine.up(&stack).await.expect("second up");
        assert_eq!(second.mutations(), 0);
        assert_eq!(second.outputs, first.outputs);

        deployment.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_html_pages() {
        let deployment = TestDeployment::new("pages").await.unwrap();
        let stack = deployment.site().unwrap();
        let summary = deployment.engine.up(&stack).await.expect("up");
        let bucket = &summary.outputs[BUCKET_NAME];

        let client = s3_client();
        let index = client
            .get_object()
            .bucket(bucket)
            .key("index.html")
            .send()
            .await
            .expect("get index.html");
        assert_eq!(index.content_type(), Some("text/html"));
        let body = index.body.collect().await.expect("read body").into_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Welcome to my SiteStack-deployed website!"));

        let error = client
            .head_object()
            .bucket(bucket)
            .key("error.html")
            .send()
            .await
            .expect("head error.html");
        assert_eq!(error.content_type(), Some("text/html"));

        deployment.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_configure_website_and_public_policy() {
        let deployment = TestDeployment::new("policy").await.unwrap();
        let stack = deployment.site().unwrap();
        let summary = deployment.engine.up(&stack).await.expect("up");
        let bucket = &summary.outputs[BUCKET_NAME];
        let client = s3_client();

        let website = client
            .get_bucket_website()
            .bucket(bucket)
            .send()
            .await
            .expect("get_bucket_website");
        assert_eq!(
            website.index_document().map(|d| d.suffix()),
            Some("index.html")
        );
        assert_eq!(website.error_document().map(|d| d.key()), Some("error.html"));

        let policy = client
            .get_bucket_policy()
            .bucket(bucket)
            .send()
            .await
            .expect("get_bucket_policy");
        let document = PolicyDocument::parse(policy.policy().unwrap()).unwrap();
        assert_eq!(document, PolicyDocument::public_read(&format!("arn:aws:s3:::{bucket}")));

        deployment.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_destroy_every_resource() {
        let deployment = TestDeployment::new("destroy").await.unwrap();
        let stack = deployment.site().unwrap();
        let summary = deployment.engine.up(&stack).await.expect("up");
        let bucket = summary.outputs[BUCKET_NAME].clone();

        let destroyed = deployment.engine.destroy().await.expect("destroy");
        assert_eq!(destroyed.count(Operation::Delete), 8);

        let head = s3_client().head_bucket().bucket(&bucket).send().await;
        assert!(head.is_err(), "bucket should be gone after destroy");
        assert!(deployment.engine.outputs().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires running server with website hosting"]
    async fn test_should_serve_index_from_website_endpoint() {
        let deployment = TestDeployment::new("website").await.unwrap();
        let stack = deployment.site().unwrap();
        let summary = deployment.engine.up(&stack).await.expect("up");

        let response = reqwest::get(&summary.outputs[S3_WEBSITE_URL])
            .await
            .expect("GET website endpoint");
        assert_eq!(response.status().as_u16(), 200);
        let body = response.text().await.unwrap();
        assert!(body.contains("Welcome to my SiteStack-deployed website!"));

        deployment.cleanup().await;
    }
}
