//! End-to-end bootstrap runs.

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use aws_sdk_s3::primitives::ByteStream;
    use minio_bootstrap_admin::MinioClient;
    use minio_bootstrap_core::{
        BootstrapConfig, BootstrapError, Bootstrapper, Credentials, RetryPolicy, Step, StepOutcome,
        TokioClock,
    };

    use crate::{
        cleanup_bucket, root_credentials, s3_client, test_app_credentials, test_bucket_name,
        test_config,
    };

    #[tokio::test]
    #[ignore = "requires running MinIO"]
    async fn test_should_provision_bucket_identity_and_policy() {
        let bucket = test_bucket_name("provision");
        let app = test_app_credentials("provision");
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&bucket, app.clone());
        config.verify_access = true;
        config.policy_dir = Some(dir.path().to_path_buf());

        let client = MinioClient::new(&config).unwrap();
        let report = Bootstrapper::new(&config, &client, &TokioClock::new())
            .run()
            .await
            .expect("bootstrap");

        assert_eq!(report.outcome(Step::Bucket), Some(&StepOutcome::Created));
        assert_eq!(report.outcome(Step::Identity), Some(&StepOutcome::Created));
        assert_eq!(report.outcome(Step::Verify), Some(&StepOutcome::Done));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());

        let app_s3 = s3_client(&app);
        app_s3
            .put_object()
            .bucket(&bucket)
            .key("hello.txt")
            .body(ByteStream::from_static(b"hello"))
            .send()
            .await
            .expect("app identity should write to its bucket");

        let denied = app_s3
            .create_bucket()
            .bucket(test_bucket_name("denied"))
            .send()
            .await;
        assert!(denied.is_err(), "app identity must not create buckets");

        cleanup_bucket(&s3_client(&root_credentials()), &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running MinIO"]
    async fn test_should_converge_on_second_run() {
        let bucket = test_bucket_name("rerun");
        let config = test_config(&bucket, test_app_credentials("rerun"));
        let client = MinioClient::new(&config).unwrap();
        let clock = TokioClock::new();
        let bootstrapper = Bootstrapper::new(&config, &client, &clock);

        bootstrapper.run().await.expect("first run");
        let report = bootstrapper.run().await.expect("second run");

        assert_eq!(report.outcome(Step::Bucket), Some(&StepOutcome::AlreadyPresent));
        assert_eq!(report.outcome(Step::Identity), Some(&StepOutcome::AlreadyPresent));
        assert_eq!(report.outcome(Step::Policy), Some(&StepOutcome::Updated));
        assert_eq!(report.outcome(Step::Attach), Some(&StepOutcome::AlreadyPresent));

        cleanup_bucket(&s3_client(&root_credentials()), &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running MinIO"]
    async fn test_should_keep_existing_secret_without_rotation() {
        let bucket = test_bucket_name("norotate");
        let app = test_app_credentials("norotate");
        let config = test_config(&bucket, app.clone());
        let client = MinioClient::new(&config).unwrap();
        let clock = TokioClock::new();
        Bootstrapper::new(&config, &client, &clock)
            .run()
            .await
            .expect("first run");

        let changed = test_config(
            &bucket,
            Credentials::new(app.access_key(), "a-completely-different-secret"),
        );
        Bootstrapper::new(&changed, &client, &clock)
            .run()
            .await
            .expect("second run");

        let head = s3_client(&app).head_bucket().bucket(&bucket).send().await;
        assert!(head.is_ok(), "first secret should still authenticate");

        cleanup_bucket(&s3_client(&root_credentials()), &bucket).await;
    }

    #[tokio::test]
    async fn test_should_give_up_when_server_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = test_config("photos", Credentials::new("app", "secret123"));
        config.endpoint_host = "127.0.0.1".to_owned();
        config.endpoint_port = port;
        config.connect_retry = RetryPolicy::builder()
            .max_attempts(3)
            .interval(Duration::from_millis(10))
            .build();

        let client = MinioClient::new(&config).unwrap();
        let err = Bootstrapper::new(&config, &client, &TokioClock::new())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::ConnectTimeout { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_should_bound_connect_time_against_silent_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let holder = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let vars = [
            ("MINIO_BUCKET_NAME", "photos".to_owned()),
            ("MINIO_ACCESS_KEY", "app".to_owned()),
            ("MINIO_SECRET_KEY", "secret123".to_owned()),
            ("MINIO_ROOT_USER", "root".to_owned()),
            ("MINIO_ROOT_PASSWORD", "rootpass".to_owned()),
            ("MINIO_ENDPOINT_HOST", "127.0.0.1".to_owned()),
            ("MINIO_ENDPOINT_PORT", port.to_string()),
            ("MINIO_CONNECT_ATTEMPTS", "3".to_owned()),
            ("MINIO_CONNECT_INTERVAL_SECS", "0".to_owned()),
        ];
        let config = BootstrapConfig::from_lookup(|key| {
            vars.iter().find(|(name, _)| *name == key).map(|(_, v)| v.clone())
        })
        .unwrap();

        let client = MinioClient::new(&config).unwrap();
        let started = Instant::now();
        let err = Bootstrapper::new(&config, &client, &TokioClock::new())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::ConnectTimeout { attempts: 3, .. }));
        assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());
        holder.abort();
    }
}
