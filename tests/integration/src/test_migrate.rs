//! Migration endpoint integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::{
        cleanup_bucket, create_test_bucket, gateway_url, http_client, object_exists, put_object,
        s3_client, test_bucket_name,
    };

    async fn migrate(body: serde_json::Value) -> serde_json::Value {
        let resp = http_client()
            .post(format!("{}/migrate", gateway_url()))
            .json(&body)
            .send()
            .await
            .unwrap_or_else(|e| panic!("migrate request: {e}"));
        assert_eq!(resp.status(), StatusCode::OK);
        resp.json().await.unwrap_or_else(|e| panic!("json: {e}"))
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_migrate_prefixes_and_remove_source() {
        let s3 = s3_client();
        let source = create_test_bucket(&s3, "migsrc").await;
        let destination = test_bucket_name("migdst");

        put_object(&s3, &source, "images/a.png", b"a").await;
        put_object(&s3, &source, "videos/b.mp4", b"b").await;
        put_object(&s3, &source, "docs/keep.pdf", b"c").await;

        let body = migrate(serde_json::json!({
            "sourceBucket": source,
            "destinationBucket": destination,
            "prefixes": ["images/", "videos/"],
            "removeSource": true,
        }))
        .await;

        assert_eq!(body["message"], "Migration completed");
        assert_eq!(body["result"]["successCount"], 2);
        assert_eq!(body["result"]["failed"], serde_json::json!([]));

        assert!(object_exists(&s3, &destination, "images/a.png").await);
        assert!(object_exists(&s3, &destination, "videos/b.mp4").await);
        assert!(!object_exists(&s3, &destination, "docs/keep.pdf").await);
        assert!(!object_exists(&s3, &source, "images/a.png").await);
        assert!(object_exists(&s3, &source, "docs/keep.pdf").await);

        cleanup_bucket(&s3, &source).await;
        cleanup_bucket(&s3, &destination).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_skip_existing_destination_objects() {
        let s3 = s3_client();
        let source = create_test_bucket(&s3, "skipsrc").await;
        let destination = create_test_bucket(&s3, "skipdst").await;

        put_object(&s3, &source, "images/a.png", b"new").await;
        put_object(&s3, &destination, "images/a.png", b"old").await;

        let body = migrate(serde_json::json!({
            "sourceBucket": source,
            "destinationBucket": destination,
            "prefixes": ["images/"],
            "removeSource": true,
        }))
        .await;

        assert_eq!(body["result"]["successCount"], 0);
        assert_eq!(body["result"]["failed"][0]["objectKey"], "images/a.png");
        assert_eq!(body["result"]["failed"][0]["kind"], "destinationExists");
        assert!(object_exists(&s3, &source, "images/a.png").await);

        cleanup_bucket(&s3, &source).await;
        cleanup_bucket(&s3, &destination).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_rename_on_migration() {
        let s3 = s3_client();
        let source = create_test_bucket(&s3, "rensrc").await;
        let destination = test_bucket_name("rendst");

        put_object(&s3, &source, "images/a.png", b"a").await;

        let body = migrate(serde_json::json!({
            "sourceBucket": source,
            "destinationBucket": destination,
            "prefixes": ["images/"],
            "rename": { "type": "replacePrefix", "from": "images/", "to": "archive/images/" },
        }))
        .await;

        assert_eq!(body["result"]["successCount"], 1);
        assert!(object_exists(&s3, &destination, "archive/images/a.png").await);
        assert!(object_exists(&s3, &source, "images/a.png").await);

        cleanup_bucket(&s3, &source).await;
        cleanup_bucket(&s3, &destination).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_request_without_source_bucket() {
        let resp = http_client()
            .post(format!("{}/migrate", gateway_url()))
            .json(&serde_json::json!({ "sourceBucket": "", "destinationBucket": "x" }))
            .send()
            .await
            .unwrap_or_else(|e| panic!("migrate request: {e}"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
