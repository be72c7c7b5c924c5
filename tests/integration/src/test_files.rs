//! File endpoint integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use reqwest::multipart::{Form, Part};

    use crate::{gateway_url, http_client, object_exists, public_bucket, s3_client};

    async fn upload(client: &reqwest::Client, filename: &str, body: &[u8]) -> reqwest::Response {
        let part = Part::bytes(body.to_vec()).file_name(filename.to_owned());
        client
            .post(format!("{}/upload", gateway_url()))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap_or_else(|e| panic!("upload request: {e}"))
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let resp = http_client()
            .get(format!("{}/health", gateway_url()))
            .send()
            .await
            .unwrap_or_else(|e| panic!("health request: {e}"));
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = resp.json().await.unwrap_or_else(|e| panic!("json: {e}"));
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_list_and_delete_image() {
        let client = http_client();
        let s3 = s3_client();

        let resp = upload(&client, "holiday.PNG", b"\x89PNG fake").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap_or_else(|e| panic!("json: {e}"));
        assert_eq!(body["message"], "File uploaded successfully");
        let file_url = body["fileUrl"]
            .as_str()
            .unwrap_or_else(|| panic!("fileUrl missing: {body}"))
            .to_owned();
        assert!(file_url.starts_with("images/"), "{file_url}");
        assert!(file_url.ends_with(".png"), "{file_url}");
        assert!(object_exists(&s3, &public_bucket(), &file_url).await);

        let listed: serde_json::Value = client
            .get(format!("{}/list?bucket={}&folder=images", gateway_url(), public_bucket()))
            .send()
            .await
            .unwrap_or_else(|e| panic!("list request: {e}"))
            .json()
            .await
            .unwrap_or_else(|e| panic!("json: {e}"));
        let listed = listed["fileUrls"].to_string();
        assert!(listed.contains(&file_url), "{listed}");

        let resp = client
            .delete(format!("{}/files?fileUrl={file_url}", gateway_url()))
            .send()
            .await
            .unwrap_or_else(|e| panic!("delete request: {e}"));
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(!object_exists(&s3, &public_bucket(), &file_url).await);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_store_audio_under_videos() {
        let client = http_client();
        let resp = upload(&client, "song.mp3", b"ID3").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = resp.json().await.unwrap_or_else(|e| panic!("json: {e}"));
        let file_url = body["fileUrl"].as_str().unwrap_or_default().to_owned();
        assert!(file_url.starts_with("videos/"), "{file_url}");

        let _ = client
            .delete(format!("{}/files?fileUrl={file_url}", gateway_url()))
            .send()
            .await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unsupported_extension() {
        let resp = upload(&http_client(), "notes.txt", b"hello").await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_presign_uploaded_file() {
        let client = http_client();
        let resp = upload(&client, "clip.mp4", b"\x00\x00\x00\x18ftyp").await;
        let body: serde_json::Value = resp.json().await.unwrap_or_else(|e| panic!("json: {e}"));
        let file_url = body["fileUrl"].as_str().unwrap_or_default().to_owned();

        let presigned: serde_json::Value = client
            .get(format!("{}/presign?fileUrl={file_url}&expirySecs=60", gateway_url()))
            .send()
            .await
            .unwrap_or_else(|e| panic!("presign request: {e}"))
            .json()
            .await
            .unwrap_or_else(|e| panic!("json: {e}"));
        let url = presigned["url"].as_str().unwrap_or_default();
        assert!(url.contains("X-Amz-Signature"), "{url}");

        let fetched = client
            .get(url)
            .send()
            .await
            .unwrap_or_else(|e| panic!("presigned get: {e}"));
        assert_eq!(fetched.status(), StatusCode::OK);

        let _ = client
            .delete(format!("{}/files?fileUrl={file_url}", gateway_url()))
            .send()
            .await;
    }
}
