use marketplace_api::storage::{MockStorageService, S3StorageClient, StorageService, object_key};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn stored_objects_can_be_read_back() {
        let mock = MockStorageService::new();
        let key = mock
            .put_object("categories/plumbing.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(key, "categories/plumbing.png");
        assert_eq!(
            mock.get(&key),
            Some(("image/png".to_string(), vec![1, 2, 3]))
        );
    }

    #[tokio::test]
    async fn deleted_objects_are_gone() {
        let mock = MockStorageService::new();
        let key = mock.put_object("a/b.pdf", "application/pdf", vec![]).await.unwrap();
        mock.delete_object(&key).await.unwrap();
        assert!(mock.keys().is_empty());
    }

    #[tokio::test]
    async fn failing_mock_refuses_every_operation() {
        let mock = MockStorageService::new_failing();
        assert!(mock.put_object("a.png", "image/png", vec![]).await.is_err());
        assert!(mock.delete_object("a.png").await.is_err());
    }

    #[tokio::test]
    async fn traversal_is_stripped_from_keys() {
        let mock = MockStorageService::new();
        let key = mock
            .put_object("../../etc/passwd", "text/plain", vec![])
            .await
            .unwrap();

        assert!(!key.contains(".."));
        assert_eq!(key, "etc/passwd");
    }

    #[test]
    fn generated_keys_are_unique_per_upload() {
        let first = object_key("service-providers", Some("id.pdf"));
        let second = object_key("service-providers", Some("id.pdf"));
        assert_ne!(first, second);
        assert!(first.starts_with("service-providers/"));
        assert!(first.ends_with(".pdf"));
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn s3_client_builds_without_network() {
        let _client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await;
        // Construction alone must not reach the endpoint.
    }
}
