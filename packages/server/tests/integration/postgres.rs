//! The HTTP surface against the PostgreSQL metadata store. Needs Docker.

use serde_json::json;

use crate::common::{TestApp, UploadForm, routes};

#[tokio::test]
async fn upload_get_delete_round_trip() {
    let app = TestApp::spawn_with_postgres().await;

    let created = app
        .upload(
            UploadForm::file("contract.pdf", b"%PDF contract")
                .content_type("application/pdf")
                .tags("legal,2024")
                .metadata(r#"{"client":"acme"}"#)
                .description("Signed contract"),
        )
        .await;
    assert_eq!(created.status, 201, "{}", created.text);
    let id = created.id();

    let fetched = app.get(&routes::document(&id)).await;
    assert_eq!(fetched.status, 200);
    assert_eq!(fetched.body["tags"], json!(["legal", "2024"]));
    assert_eq!(fetched.body["metadata"], json!({"client": "acme"}));
    assert_eq!(fetched.body["description"], "Signed contract");

    let download = app.get(&routes::download(&id)).await;
    assert_eq!(download.bytes, b"%PDF contract");

    assert_eq!(app.delete(&routes::document(&id)).await.status, 204);
    assert_eq!(app.get(&routes::document(&id)).await.status, 404);
    assert_eq!(app.delete(&routes::document(&id)).await.status, 404);
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let app = TestApp::spawn_with_postgres().await;

    let res = app.get(&routes::document("not-a-uuid")).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn search_uses_escaped_like_and_tag_containment() {
    let app = TestApp::spawn_with_postgres().await;
    app.create_document("100%_done.txt", "status").await;
    app.create_document("100xdone.txt", "status").await;
    app.create_document("100%_done-copy.txt", "Status").await;

    let res = app
        .graphql(
            r#"{ searchDocuments(fileName: "%_D", tag: "status") { fileName } }"#,
            json!({}),
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(
        res.body["data"]["searchDocuments"],
        json!([{"fileName": "100%_done.txt"}])
    );
}

#[tokio::test]
async fn graphql_update_persists() {
    let app = TestApp::spawn_with_postgres().await;
    let id = app.create_document("a.txt", "x").await;

    let res = app
        .graphql(
            r#"mutation($id: String!) { updateDocument(id: $id, description: "changed") { description tags } }"#,
            json!({"id": id}),
        )
        .await;
    assert_eq!(res.body["data"]["updateDocument"]["description"], "changed");
    assert_eq!(res.body["data"]["updateDocument"]["tags"], json!(["x"]));

    let rest = app.get(&routes::document(&id)).await;
    assert_eq!(rest.body["description"], "changed");
}
