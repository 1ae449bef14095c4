//! Admin API calls against a live server.

#[cfg(test)]
mod tests {
    use minio_bootstrap_admin::MinioClient;
    use minio_bootstrap_core::{AdminError, ObjectStoreAdmin, PolicyDocument};

    use crate::{endpoint_url, root_credentials, test_app_credentials, test_bucket_name};

    fn client() -> MinioClient {
        MinioClient::connect(&endpoint_url(), "us-east-1", root_credentials()).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires running MinIO"]
    async fn test_should_accept_root_credentials() {
        client().check_connection().await.expect("server info");
    }

    #[tokio::test]
    #[ignore = "requires running MinIO"]
    async fn test_should_create_user_with_encrypted_payload() {
        let client = client();
        let app = test_app_credentials("user");

        assert!(!client.user_exists(app.access_key()).await.unwrap());
        client.put_user(&app).await.expect("add user");
        assert!(client.user_exists(app.access_key()).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires running MinIO"]
    async fn test_should_report_repeated_attachment() {
        let client = client();
        let app = test_app_credentials("attach");
        let bucket = test_bucket_name("attach");
        let policy = format!("app-policy-{bucket}");
        let document = PolicyDocument::for_bucket(&bucket).to_json().unwrap();

        client.put_user(&app).await.expect("add user");
        client.put_policy(&policy, &document).await.expect("add policy");
        client
            .attach_policy(&policy, app.access_key())
            .await
            .expect("first attach");

        let err = client
            .attach_policy(&policy, app.access_key())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::AlreadyAttached { .. }), "got {err:?}");
    }

    #[tokio::test]
    #[ignore = "requires running MinIO"]
    async fn test_should_reject_wrong_admin_secret() {
        let bad = MinioClient::connect(
            &endpoint_url(),
            "us-east-1",
            minio_bootstrap_core::Credentials::new(root_credentials().access_key(), "wrong"),
        )
        .unwrap();

        let err = bad.check_connection().await.unwrap_err();
        assert!(matches!(err, AdminError::Service { status: 403, .. }), "got {err:?}");
    }
}
