use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn documents_query_returns_uploads() {
    let app = TestApp::spawn().await;
    app.create_document("one.txt", "a").await;
    app.create_document("two.txt", "b").await;

    let res = app
        .graphql("{ documents { id fileName tags } }", json!({}))
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    let docs = res.body["data"]["documents"].as_array().unwrap();
    let names: Vec<_> = docs.iter().map(|d| d["fileName"].clone()).collect();
    assert_eq!(names, vec![json!("one.txt"), json!("two.txt")]);
}

#[tokio::test]
async fn document_query_matches_rest_record() {
    let app = TestApp::spawn().await;
    let id = app.create_document("report.pdf", "q1").await;

    let res = app
        .graphql(
            "query($id: String!) { document(id: $id) { id fileName fileSize blobKey } }",
            json!({"id": id}),
        )
        .await;
    let rest = app.get(&routes::document(&id)).await;

    let doc = &res.body["data"]["document"];
    assert_eq!(doc["id"], rest.body["id"]);
    assert_eq!(doc["fileName"], rest.body["fileName"]);
    assert_eq!(doc["fileSize"], rest.body["fileSize"]);
    assert_eq!(doc["blobKey"], rest.body["blobKey"]);
}

#[tokio::test]
async fn search_documents_combines_filters() {
    let app = TestApp::spawn().await;
    app.create_document("Invoice-March.pdf", "invoice,finance").await;
    app.create_document("invoice-draft.pdf", "draft").await;
    app.create_document("notes.txt", "invoice").await;

    let res = app
        .graphql(
            r#"{ searchDocuments(fileName: "INVOICE", tag: "invoice") { fileName } }"#,
            json!({}),
        )
        .await;

    assert_eq!(
        res.body["data"]["searchDocuments"],
        json!([{"fileName": "Invoice-March.pdf"}])
    );
}

#[tokio::test]
async fn search_documents_from_date_is_inclusive_lower_bound() {
    let app = TestApp::spawn().await;
    let id = app.create_document("a.txt", "").await;
    let uploaded_at = app.get(&routes::document(&id)).await.body["uploadedAt"].clone();

    let res = app
        .graphql(
            "query($from: DateTime) { searchDocuments(fromDate: $from) { id } }",
            json!({"from": uploaded_at}),
        )
        .await;
    assert_eq!(res.body["data"]["searchDocuments"], json!([{"id": id}]));

    let res = app
        .graphql(
            "query($from: DateTime) { searchDocuments(fromDate: $from) { id } }",
            json!({"from": "2999-01-01T00:00:00Z"}),
        )
        .await;
    assert_eq!(res.body["data"]["searchDocuments"], json!([]));
}

#[tokio::test]
async fn update_document_is_visible_over_rest() {
    let app = TestApp::spawn().await;
    let id = app.create_document("a.txt", "old").await;

    let res = app
        .graphql(
            r#"mutation($id: String!) {
                updateDocument(id: $id, tags: ["new"], metadata: [{key: "owner", value: "ops"}]) {
                    tags
                    metadata { key value }
                }
            }"#,
            json!({"id": id}),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["data"]["updateDocument"]["tags"], json!(["new"]));

    let rest = app.get(&routes::document(&id)).await;
    assert_eq!(rest.body["tags"], json!(["new"]));
    assert_eq!(rest.body["metadata"], json!({"owner": "ops"}));
}

#[tokio::test]
async fn update_unknown_document_reports_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .graphql(
            r#"mutation { updateDocument(id: "missing", description: "x") { id } }"#,
            json!({}),
        )
        .await;

    assert_eq!(res.body["errors"][0]["message"], "Document not found");
}

#[tokio::test]
async fn delete_document_removes_record() {
    let app = TestApp::spawn().await;
    let id = app.create_document("a.txt", "").await;
    let query = "mutation($id: String!) { deleteDocument(id: $id) }";

    let res = app.graphql(query, json!({"id": id})).await;
    assert_eq!(res.body["data"]["deleteDocument"], true);
    assert_eq!(app.get(&routes::document(&id)).await.status, 404);

    let res = app.graphql(query, json!({"id": id})).await;
    assert_eq!(res.body["data"]["deleteDocument"], false);
}

#[tokio::test]
async fn malformed_request_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let res = app.post_json(routes::GRAPHQL, &json!("not a request")).await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}
