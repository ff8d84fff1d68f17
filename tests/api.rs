//! End-to-end tests driving the full router against the in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use journal_backend::{
    admin_init,
    config::Config,
    server::{create_router, AppState},
    store::{MemoryStore, UserStore},
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    config: Config,
    _media: TempDir,
}

fn test_config(media: &TempDir) -> Config {
    let mut config = Config::default();
    config.jwt.bcrypt_cost = 4;
    config.storage.local_path = media.path().to_string_lossy().into_owned();
    config
}

fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let media = TempDir::new().unwrap();
    let mut config = test_config(&media);
    configure(&mut config);

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config.clone(), store.clone()).unwrap();

    TestApp {
        router: create_router(state),
        store,
        config,
        _media: media,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(|_| {})
}

impl TestApp {
    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body), None).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None, None).await
    }

    async fn create_publisher(&self, email: &str) -> String {
        let (status, body) = self
            .post("/api/users/", json!({ "email": email, "password": "secret-pass" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Journal "Nature" with volume 1, issue 1 and the given number of articles.
    async fn seed_catalog(&self, articles: usize) -> Catalog {
        let publisher = self.create_publisher("author@example.org").await;

        let (status, journal) = self.post("/api/journals/", json!({ "name": "Nature" })).await;
        assert_eq!(status, StatusCode::CREATED, "{journal}");

        let (status, volume) = self
            .post(
                "/api/volumes/",
                json!({ "number": 1, "year": 2024, "journal": journal["id"] }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{volume}");

        let (status, issue) = self
            .post(
                "/api/issues/",
                json!({ "number": 1, "title": "Spring", "month": 3, "volume": volume["id"] }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{issue}");

        let mut slugs = Vec::new();
        for _ in 0..articles {
            let (status, article) = self
                .post(
                    "/api/articles/",
                    json!({
                        "title": "Study A",
                        "authors": "A. Author",
                        "abstract": "Findings.",
                        "issue": issue["id"],
                        "publisher": publisher,
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{article}");
            slugs.push(article["slug"].as_str().unwrap().to_string());
        }

        Catalog {
            publisher,
            volume_id: volume["id"].as_str().unwrap().to_string(),
            issue_id: issue["id"].as_str().unwrap().to_string(),
            slugs,
        }
    }
}

struct Catalog {
    publisher: String,
    volume_id: String,
    issue_id: String,
    slugs: Vec<String>,
}

#[tokio::test]
async fn journal_slug_is_derived_and_names_are_unique() {
    let app = spawn_app();

    let (status, body) = app.post("/api/journals/", json!({ "name": "Nature" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "nature");

    let (status, body) = app.post("/api/journals/", json!({ "name": "Nature" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["name"].is_array());
}

#[tokio::test]
async fn identical_article_titles_get_suffixed_slugs() {
    let app = spawn_app();
    let catalog = app.seed_catalog(2).await;

    assert_eq!(catalog.slugs, vec!["study-a", "study-a-1"]);
}

#[tokio::test]
async fn deleting_a_journal_removes_everything_below_it() {
    let app = spawn_app();
    let catalog = app.seed_catalog(1).await;

    let (status, _) = app.delete("/api/journals/nature/").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/volumes/{}/", catalog.volume_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/issues/{}/", catalog.issue_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/articles/study-a/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_user_removes_their_articles() {
    let app = spawn_app();
    let catalog = app.seed_catalog(2).await;

    let publisher: Uuid = catalog.publisher.parse().unwrap();
    app.store.delete_user(publisher).await.unwrap();

    let (status, body) = app.get("/api/articles/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn article_counts_match_article_lists() {
    let app = spawn_app();
    let catalog = app.seed_catalog(2).await;

    let (status, tree) = app.get("/api/journals_data/nature").await;
    assert_eq!(status, StatusCode::OK);
    let issue = &tree["volumes"][0]["issues"][0];
    assert_eq!(issue["id"], catalog.issue_id.as_str());
    assert_eq!(issue["article_count"], 2);

    let (status, articles) = app
        .get(&format!("/api/articles/issue/{}/", catalog.issue_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(articles.as_array().unwrap().len(), 2);

    let (status, detailed) = app.get("/api/journals/detailed/").await;
    assert_eq!(status, StatusCode::OK);
    let full = &detailed[0]["volumes"][0]["issues"][0]["articles"];
    assert_eq!(full.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_volume_number_is_a_validation_error() {
    let app = spawn_app();
    let (_, journal) = app.post("/api/journals/", json!({ "name": "Cell" })).await;
    let volume = json!({ "number": 4, "year": 2023, "journal_id": journal["id"] });

    let (status, _) = app.post("/api/volumes/", volume.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/volumes/", volume).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["number"].is_array());
}

#[tokio::test]
async fn volume_for_missing_journal_is_rejected() {
    let app = spawn_app();

    let (status, body) = app
        .post(
            "/api/volumes/",
            json!({ "number": 1, "year": 2024, "journal_id": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["journal_id"].is_array());
}

#[tokio::test]
async fn status_update_leaves_other_fields_alone() {
    let app = spawn_app();
    app.seed_catalog(1).await;

    let (status, body) = app
        .put("/api/articles/study-a/", json!({ "status": "SUBMITTED" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SUBMITTED");
    assert_eq!(body["title"], "Study A");
    assert_eq!(body["authors"], "A. Author");
    assert_eq!(body["abstract"], "Findings.");
    assert_eq!(body["slug"], "study-a");
}

#[tokio::test]
async fn articles_can_be_filtered_by_status() {
    let app = spawn_app();
    app.seed_catalog(2).await;
    app.put("/api/articles/study-a-1/", json!({ "status": "SUBMITTED" }))
        .await;

    let (status, body) = app.get("/api/articles/?status=SUBMITTED").await;
    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["study-a-1"]);

    let (status, _) = app.get("/api/articles/?status=LOST").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_login_and_refresh() {
    let app = spawn_app();
    let credentials = json!({ "email": "new@Example.ORG", "password": "hunter22" });

    let (status, body) = app.post("/api/signup/", credentials.clone()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["email"], "new@example.org");
    assert_eq!(body["user"]["role"], "PUBLISHER");
    assert!(body["access"].is_string());

    let (status, body) = app.post("/api/signup/", credentials).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DUPLICATE_EMAIL");

    let (status, _) = app
        .post("/api/login/", json!({ "email": "new@example.org", "password": "wrong" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tokens) = app
        .post("/api/login/", json!({ "email": "new@example.org", "password": "hunter22" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, refreshed) = app
        .post("/api/token/refresh/", json!({ "refresh": tokens["refresh"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["access"].is_string());

    let (status, _) = app
        .post("/api/token/refresh/", json!({ "refresh": tokens["access"] }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_resources_use_the_error_shape() {
    let app = spawn_app();

    let (status, body) = app.get("/api/journals/missing/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = app.get("/api/volumes/not-a-uuid/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn issue_is_reachable_through_its_journal() {
    let app = spawn_app();
    let catalog = app.seed_catalog(1).await;

    let uri = format!(
        "/api/journals/nature/volumes/{}/{}/",
        catalog.volume_id, catalog.issue_id
    );
    let (status, body) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["volume"]["journal"]["slug"], "nature");
    assert_eq!(body["articles"].as_array().unwrap().len(), 1);

    app.post("/api/journals/", json!({ "name": "Science" })).await;
    let uri = format!(
        "/api/journals/science/volumes/{}/{}/",
        catalog.volume_id, catalog.issue_id
    );
    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manuscript_upload_is_stored_and_attached() {
    let app = spawn_app();
    app.seed_catalog(1).await;

    let boundary = "journal-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"paper.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/articles/study-a/upload/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let article: Value = serde_json::from_slice(&bytes).unwrap();

    let file = article["file"].as_str().unwrap();
    assert!(file.starts_with("articles/"));
    assert!(file.ends_with("-paper.pdf"));
    let stored = std::path::Path::new(&app.config.storage.local_path).join(file);
    assert_eq!(std::fs::read(stored).unwrap(), b"%PDF-1.4 test");
    assert!(article["payment_proof"].is_null());
}

#[tokio::test]
async fn policies_restrict_catalog_writes_when_enforced() {
    let app = spawn_app_with(|config| {
        config.features.enforce_policies = true;
        config.admin.email = Some("admin@example.org".to_string());
        config.admin.password = Some("admin-pass".to_string());
    });
    admin_init::ensure_admin_user(app.store.as_ref(), &app.config)
        .await
        .unwrap();
    let journal = json!({ "name": "Nature" });

    let (status, _) = app.post("/api/journals/", journal.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, publisher) = app
        .post("/api/signup/", json!({ "email": "pub@example.org", "password": "pub-pass" }))
        .await;
    let token = publisher["access"].as_str().unwrap();
    let (status, body) = app
        .request(Method::POST, "/api/journals/", Some(journal.clone()), Some(token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "AUTHORIZATION_ERROR");

    let (_, admin) = app
        .post("/api/login/", json!({ "email": "admin@example.org", "password": "admin-pass" }))
        .await;
    let token = admin["access"].as_str().unwrap();
    let (status, _) = app
        .request(Method::POST, "/api/journals/", Some(journal), Some(token))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Reads stay public
    let (status, _) = app.get("/api/journals/nature/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_attempts_are_rate_limited() {
    let app = spawn_app_with(|config| config.features.rate_limiting = true);
    let credentials = json!({ "email": "nobody@example.org", "password": "x" });

    for _ in 0..5 {
        let (status, _) = app.post("/api/login/", credentials.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = app.post("/api/login/", credentials).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn blank_slugs_are_derived() {
    let app = spawn_app();
    let publisher = app.create_publisher("author@example.org").await;

    let (status, journal) = app
        .post("/api/journals/", json!({ "name": "Nature", "slug": "" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{journal}");
    assert_eq!(journal["slug"], "nature");

    let (status, article) = app
        .post(
            "/api/articles/",
            json!({
                "title": "Study A",
                "slug": "",
                "authors": "A. Author",
                "publisher": publisher,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{article}");
    assert_eq!(article["slug"], "study-a");
}

#[tokio::test]
async fn updates_apply_the_same_field_limits_as_creates() {
    let app = spawn_app();
    let catalog = app.seed_catalog(0).await;
    let long = "x".repeat(300);

    let (status, body) = app
        .put(&format!("/api/issues/{}/", catalog.issue_id), json!({ "title": long }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["title"].is_array());

    let (status, body) = app
        .put(
            &format!("/api/users/{}/", catalog.publisher),
            json!({ "name": long, "image": "not a url" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["name"].is_array());
    assert!(body["error"]["details"]["image"].is_array());

    let (status, issue) = app.get(&format!("/api/issues/{}/", catalog.issue_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issue["title"], "Spring");
}

#[tokio::test]
async fn articles_report_issue_and_publisher() {
    let app = spawn_app();
    let catalog = app.seed_catalog(1).await;

    let (status, article) = app.get("/api/articles/study-a/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(article["publisher"], catalog.publisher.as_str());
    assert_eq!(article["issue"], catalog.issue_id.as_str());
    assert!(article.get("publisher_id").is_none());
}
