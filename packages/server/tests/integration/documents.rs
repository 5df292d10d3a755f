use serde_json::json;

use crate::common::{TestApp, UploadForm, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn upload_returns_created_record_with_location() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                UploadForm::file("a.pdf", b"%PDF-1.7 body")
                    .content_type("application/pdf")
                    .description("March invoice")
                    .tags("x, y ,x")
                    .metadata(r#"{"k":"v"}"#),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();
        assert_eq!(
            res.header("location"),
            Some(routes::document(&id).as_str())
        );
        assert_eq!(res.body["fileName"], "a.pdf");
        assert_eq!(res.body["originalFileName"], "a.pdf");
        assert_eq!(res.body["contentType"], "application/pdf");
        assert_eq!(res.body["fileSize"], 13);
        assert_eq!(res.body["blobBucket"], "documents");
        assert_eq!(res.body["tags"], json!(["x", "y", "x"]));
        assert_eq!(res.body["metadata"], json!({"k": "v"}));
        assert_eq!(res.body["description"], "March invoice");
        assert!(
            res.body["blobKey"]
                .as_str()
                .unwrap()
                .starts_with("documents/")
        );
    }

    #[tokio::test]
    async fn malformed_metadata_is_stored_empty() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(UploadForm::file("a.txt", b"hello").metadata("{not json"))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["metadata"], json!({}));
    }

    #[tokio::test]
    async fn missing_tags_and_description_are_empty() {
        let app = TestApp::spawn().await;

        let res = app.upload(UploadForm::file("a.txt", b"hello")).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["tags"], json!([]));
        assert!(res.body["description"].is_null());
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload(UploadForm::file("empty.txt", b"")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["message"], "No file uploaded");
    }

    #[tokio::test]
    async fn form_without_file_is_rejected() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new().text("description", "no file here");

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::UPLOAD))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn_with_limit(8).await;

        let res = app
            .upload(UploadForm::file("big.bin", b"more than eight bytes"))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn same_file_name_twice_creates_two_documents() {
        let app = TestApp::spawn().await;

        let first = app.create_document("dup.txt", "").await;
        let second = app.create_document("dup.txt", "").await;
        assert_ne!(first, second);

        let a = app.get(&routes::document(&first)).await;
        let b = app.get(&routes::document(&second)).await;
        assert_ne!(a.body["blobKey"], b.body["blobKey"]);
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn get_returns_uploaded_record() {
        let app = TestApp::spawn().await;
        let created = app
            .upload(UploadForm::file("notes.txt", b"hello").tags("a,b"))
            .await;
        let id = created.id();

        let res = app.get(&routes::document(&id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, created.body);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        for id in ["does-not-exist", "01936f0e-1234-7abc-8000-000000000001"] {
            let res = app.get(&routes::document(id)).await;
            assert_eq!(res.status, 404);
            assert_eq!(res.body["code"], "NOT_FOUND");
        }
    }

    #[tokio::test]
    async fn download_returns_identical_bytes() {
        let app = TestApp::spawn().await;
        let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let created = app
            .upload(UploadForm {
                content: content.clone(),
                ..UploadForm::file("data.bin", b"").content_type("application/x-custom")
            })
            .await;
        assert_eq!(created.status, 201, "{}", created.text);

        let res = app.get(&routes::download(&created.id())).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, content);
        assert_eq!(res.header("content-type"), Some("application/x-custom"));
        assert_eq!(res.header("content-length"), Some("10000"));
        let disposition = res.header("content-disposition").unwrap();
        assert!(disposition.starts_with("attachment;"), "{disposition}");
        assert!(disposition.contains("data.bin"), "{disposition}");
    }

    #[tokio::test]
    async fn download_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::download("missing")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod download_url {
    use super::*;

    #[tokio::test]
    async fn default_expiration_is_sixty_minutes() {
        let app = TestApp::spawn().await;
        let id = app.create_document("a.txt", "").await;

        let res = app.get(&routes::download_url(&id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["expiresIn"], 60);
        assert!(res.body["url"].as_str().unwrap().starts_with("file://"));
    }

    #[tokio::test]
    async fn explicit_expiration_is_echoed() {
        let app = TestApp::spawn().await;
        let id = app.create_document("a.txt", "").await;

        let res = app
            .get(&format!("{}?expirationMinutes=5", routes::download_url(&id)))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["expiresIn"], 5);
    }

    #[tokio::test]
    async fn out_of_range_expiration_is_rejected() {
        let app = TestApp::spawn().await;
        let id = app.create_document("a.txt", "").await;

        for minutes in ["0", "10081", "-1", "soon"] {
            let res = app
                .get(&format!(
                    "{}?expirationMinutes={minutes}",
                    routes::download_url(&id)
                ))
                .await;
            assert_eq!(res.status, 400, "expirationMinutes={minutes}: {}", res.text);
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::download_url("missing")).await;

        assert_eq!(res.status, 404);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_document_and_content() {
        let app = TestApp::spawn().await;
        let id = app.create_document("a.txt", "").await;

        let res = app.delete(&routes::document(&id)).await;
        assert_eq!(res.status, 204);
        assert!(res.text.is_empty());

        assert_eq!(app.get(&routes::document(&id)).await.status, 404);
        assert_eq!(app.get(&routes::download(&id)).await.status, 404);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let app = TestApp::spawn().await;
        let id = app.create_document("a.txt", "").await;

        assert_eq!(app.delete(&routes::document(&id)).await.status, 204);
        let res = app.delete(&routes::document(&id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod docs {
    use super::*;

    #[tokio::test]
    async fn openapi_lists_document_routes() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::OPENAPI).await;

        assert_eq!(res.status, 200);
        let paths = res.body["paths"].as_object().unwrap();
        for path in [
            "/api/documents/upload",
            "/api/documents/{id}",
            "/api/documents/{id}/download",
            "/api/documents/{id}/download-url",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
