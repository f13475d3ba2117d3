//! Integration tests for the widget and admin routes.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, COOKIE, LOCATION, ORIGIN, REFERER,
};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use blog_comments_bridge::config::Config;
use blog_comments_bridge::db::{
    add_group_member, count_bookmarks, count_topic_posts, count_votes, create_category,
    create_session, create_user, get_binding, get_topic, Database,
};
use blog_comments_bridge::forum::{Collaborators, Session};
use blog_comments_bridge::settings::{CID_KEY, NAME_KEY, URL_KEY};
use blog_comments_bridge::web::{create_app, AppState, BUNDLED_TEMPLATE};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BLOG: &str = "https://blog.example";
const OTHER_BLOG: &str = "https://other.example";
const STRANGER: &str = "https://evil.example";

struct TestApp {
    app: Router,
    db: Database,
    /// Second category, bound to `OTHER_BLOG`.
    other_cid: i64,
    _temp_dir: TempDir,
}

async fn setup() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");

    let other_cid = create_category(db.pool(), "Other Blog")
        .await
        .expect("Failed to create category");

    let services = Collaborators::sqlite(db.clone());
    services
        .settings
        .set(URL_KEY, &format!("{BLOG}, {OTHER_BLOG}"))
        .await
        .unwrap();
    services
        .settings
        .set(CID_KEY, &format!("1, {other_cid}"))
        .await
        .unwrap();
    services
        .settings
        .set(NAME_KEY, "Main Blog, Other Blog")
        .await
        .unwrap();

    let state = AppState::new(Config::default(), services, Arc::from(BUNDLED_TEMPLATE));

    TestApp {
        app: create_app(state),
        db,
        other_cid,
        _temp_dir: temp_dir,
    }
}

/// A signed-in user with a live session.
async fn sign_in(db: &Database, username: &str) -> Session {
    let uid = create_user(db.pool(), username, None)
        .await
        .expect("Failed to create user");
    create_session(db.pool(), uid, chrono::Duration::hours(1))
        .await
        .expect("Failed to create session")
}

async fn publisher(db: &Database, username: &str) -> Session {
    let session = sign_in(db, username).await;
    add_group_member(db.pool(), "publishers", session.uid)
        .await
        .unwrap();
    session
}

fn encode_form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn get(uri: &str, origin: &str, session: Option<&Session>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header(ORIGIN, origin);
    if let Some(session) = session {
        builder = builder.header(COOKIE, format!("session={}", session.token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(
    uri: &str,
    origin: &str,
    session: Option<&Session>,
    pairs: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(ORIGIN, origin)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(session) = session {
        builder = builder.header(COOKIE, format!("session={}", session.token));
    }
    builder.body(Body::from(encode_form(pairs))).unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Response is not JSON")
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|h| h.to_str().ok())
        .expect("Missing Location header")
}

/// Publish an article as `session` and return the bound tid.
async fn publish_article(t: &TestApp, session: &Session, id: &str) -> i64 {
    let response = t
        .app
        .clone()
        .oneshot(post_form(
            "/comments/publish",
            BLOG,
            Some(session),
            &[
                ("markdown", "Article body"),
                ("title", "An article"),
                ("url", "https://blog.example/2024/an-article"),
                ("id", id),
                ("tags", r#"["rust"]"#),
                ("cid", "1"),
                ("_csrf", session.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    get_binding(t.db.pool(), "default", id)
        .await
        .unwrap()
        .expect("Article should be bound")
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}

#[tokio::test]
async fn test_feed_from_untrusted_origin_is_dropped() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(get("/comments/get/default/42", STRANGER, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_feed_without_origin_is_dropped() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/comments/get/default/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn test_feed_for_unpublished_article() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(get("/comments/get/default/42", "https://blog.example", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        BLOG
    );
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );

    let json = body_json(response).await;
    assert_eq!(json["isValid"], false);
    assert_eq!(json["tid"], Value::Null);
    assert_eq!(json["posts"], serde_json::json!([]));
    assert_eq!(json["isLoggedIn"], false);
    assert_eq!(json["user"]["uid"], 0);
    assert_eq!(json["atTop"], true);
    assert_eq!(json["token"].as_str().unwrap().len(), 32);
    assert_eq!(json["template"], BUNDLED_TEMPLATE);
}

#[tokio::test]
async fn test_cors_echoes_configured_entry() {
    let t = setup().await;

    // A longer origin that starts with a configured entry is trusted, and the
    // configured entry is what gets echoed.
    let response = t
        .app
        .oneshot(get("/comments/get/default/42", "https://other.example.org", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        OTHER_BLOG
    );
}

#[tokio::test]
async fn test_preflight() {
    let t = setup().await;

    let trusted = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/comments/vote")
                .header(ORIGIN, BLOG)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(trusted.status(), StatusCode::NO_CONTENT);
    assert_eq!(trusted.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), BLOG);
    assert_eq!(
        trusted.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "GET, POST, OPTIONS"
    );

    let untrusted = t
        .app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/comments/vote")
                .header(ORIGIN, STRANGER)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(untrusted.status(), StatusCode::NO_CONTENT);
    assert!(untrusted.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(untrusted.headers().get(ACCESS_CONTROL_ALLOW_METHODS).is_none());
}

#[tokio::test]
async fn test_publish_then_feed() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;

    let reader = sign_in(&t.db, "reader").await;
    let response = t
        .app
        .oneshot(get("/comments/get/default/42", BLOG, Some(&reader)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["isValid"], true);
    assert_eq!(json["tid"], tid);
    assert_eq!(json["postCount"], 1);
    assert_eq!(json["mainPost"]["content"], "Article body");
    assert_eq!(json["category"]["cid"], 1);
    assert_eq!(json["isLoggedIn"], true);
    assert_eq!(json["isAdmin"], false);
    assert_eq!(json["user"]["username"], "reader");
    assert_eq!(json["token"], reader.csrf_token);
}

#[tokio::test]
async fn test_publish_redirects_to_referer() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;

    let mut request = post_form(
        "/comments/publish",
        BLOG,
        Some(&author),
        &[
            ("markdown", "Body"),
            ("title", "Hello world"),
            ("url", "https://blog.example/hello"),
            ("id", "7"),
            ("cid", "1"),
            ("_csrf", author.csrf_token.as_str()),
        ],
    );
    request.headers_mut().insert(
        REFERER,
        "https://blog.example/admin/publish".parse().unwrap(),
    );

    let response = t.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "https://blog.example/admin/publish#nodebb-comments"
    );
    assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), BLOG);
}

#[tokio::test]
async fn test_publish_twice_keeps_one_thread() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;

    let first = publish_article(&t, &author, "42").await;
    let second = publish_article(&t, &author, "42").await;

    assert_eq!(first, second);
    assert!(get_topic(t.db.pool(), first + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_publish_denied_without_role() {
    let t = setup().await;
    let reader = sign_in(&t.db, "reader").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/publish",
            BLOG,
            Some(&reader),
            &[
                ("markdown", "Body"),
                ("title", "Hello world"),
                ("url", "https://blog.example/hello"),
                ("id", "7"),
                ("cid", "1"),
                ("_csrf", reader.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "Only Administrators or members of the publishers group can publish articles"
    );
    assert!(get_binding(t.db.pool(), "default", "7")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_publish_category_from_origin() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;

    let response = t
        .app
        .clone()
        .oneshot(post_form(
            "/comments/publish",
            OTHER_BLOG,
            Some(&author),
            &[
                ("markdown", "Body"),
                ("title", "Elsewhere"),
                ("url", "https://other.example/elsewhere"),
                ("id", "9"),
                ("namespace", "other"),
                ("cid", "-1"),
                ("_csrf", author.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let tid = get_binding(t.db.pool(), "other", "9")
        .await
        .unwrap()
        .expect("Article should be bound");
    let topic = get_topic(t.db.pool(), tid).await.unwrap().unwrap();
    assert_eq!(topic.cid, t.other_cid);
}

#[tokio::test]
async fn test_publish_from_untrusted_origin_has_no_cors() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/publish",
            STRANGER,
            Some(&author),
            &[
                ("markdown", "Body"),
                ("title", "Hello world"),
                ("url", "https://blog.example/hello"),
                ("id", "11"),
                ("cid", "-1"),
                ("_csrf", author.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

    let tid = get_binding(t.db.pool(), "default", "11")
        .await
        .unwrap()
        .unwrap();
    // Unresolvable origin falls back to the first configured category.
    assert_eq!(get_topic(t.db.pool(), tid).await.unwrap().unwrap().cid, 1);
}

#[tokio::test]
async fn test_publish_rejects_malformed_cid() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/publish",
            BLOG,
            Some(&author),
            &[
                ("title", "Hello world"),
                ("id", "12"),
                ("cid", "one"),
                ("_csrf", author.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("malformed cid"));
}

#[tokio::test]
async fn test_vote_toggle() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let main_pid = get_topic(t.db.pool(), tid).await.unwrap().unwrap().main_pid.unwrap();
    let voter = sign_in(&t.db, "voter").await;
    let pid = main_pid.to_string();

    let response = t
        .app
        .clone()
        .oneshot(post_form(
            "/comments/vote",
            BLOG,
            Some(&voter),
            &[("toPid", pid.as_str()), ("isUpvote", "true"), ("_csrf", voter.csrf_token.as_str())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), BLOG);
    let json = body_json(response).await;
    assert_eq!(json["error"], Value::Null);
    assert_eq!(json["result"]["votes"], 1);
    assert_eq!(json["result"]["upvoted"], true);

    let response = t
        .app
        .oneshot(post_form(
            "/comments/vote",
            BLOG,
            Some(&voter),
            &[("toPid", pid.as_str()), ("isUpvote", "false"), ("_csrf", voter.csrf_token.as_str())],
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["result"]["votes"], 0);
    assert_eq!(count_votes(t.db.pool(), main_pid).await.unwrap(), 0);
}

#[tokio::test]
async fn test_vote_from_untrusted_origin_touches_nothing() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let main_pid = get_topic(t.db.pool(), tid).await.unwrap().unwrap().main_pid.unwrap();
    let voter = sign_in(&t.db, "voter").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/vote",
            STRANGER,
            Some(&voter),
            &[
                ("toPid", main_pid.to_string().as_str()),
                ("isUpvote", "true"),
                ("_csrf", voter.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(count_votes(t.db.pool(), main_pid).await.unwrap(), 0);
}

#[tokio::test]
async fn test_vote_rejects_non_boolean_direction() {
    let t = setup().await;
    let voter = sign_in(&t.db, "voter").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/vote",
            BLOG,
            Some(&voter),
            &[("toPid", "1"), ("isUpvote", "yes"), ("_csrf", voter.csrf_token.as_str())],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["result"], Value::Null);
    assert!(json["error"].as_str().unwrap().contains("isUpvote"));
}

#[tokio::test]
async fn test_vote_requires_csrf_token() {
    let t = setup().await;
    let voter = sign_in(&t.db, "voter").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/vote",
            BLOG,
            Some(&voter),
            &[("toPid", "1"), ("isUpvote", "true")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"], "[[error:invalid-csrf-token]]");
}

#[tokio::test]
async fn test_self_vote_error_passes_through() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let main_pid = get_topic(t.db.pool(), tid).await.unwrap().unwrap().main_pid.unwrap();

    let response = t
        .app
        .oneshot(post_form(
            "/comments/vote",
            BLOG,
            Some(&author),
            &[
                ("toPid", main_pid.to_string().as_str()),
                ("isUpvote", "true"),
                ("_csrf", author.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["error"], "[[error:self-vote]]");
    assert_eq!(json["result"], Value::Null);
}

#[tokio::test]
async fn test_bookmark_toggle() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let main_pid = get_topic(t.db.pool(), tid).await.unwrap().unwrap().main_pid.unwrap();

    let response = t
        .app
        .oneshot(post_form(
            "/comments/bookmark",
            BLOG,
            Some(&author),
            &[
                ("toPid", main_pid.to_string().as_str()),
                ("isBookmark", "true"),
                ("_csrf", author.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["result"]["bookmarked"], true);
    assert_eq!(json["result"]["bookmarks"], 1);
    assert_eq!(count_bookmarks(t.db.pool(), main_pid).await.unwrap(), 1);
}

#[tokio::test]
async fn test_bookmark_from_untrusted_origin_touches_nothing() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let main_pid = get_topic(t.db.pool(), tid).await.unwrap().unwrap().main_pid.unwrap();

    let response = t
        .app
        .oneshot(post_form(
            "/comments/bookmark",
            STRANGER,
            Some(&author),
            &[
                ("toPid", main_pid.to_string().as_str()),
                ("isBookmark", "true"),
                ("_csrf", author.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(count_bookmarks(t.db.pool(), main_pid).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reply_redirects_to_comments() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let reader = sign_in(&t.db, "reader").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/reply",
            BLOG,
            Some(&reader),
            &[
                ("content", "Nice article"),
                ("tid", tid.to_string().as_str()),
                ("url", "https://blog.example/2024/an-article"),
                ("_csrf", reader.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "https://blog.example/2024/an-article#nodebb-comments"
    );
    assert_eq!(count_topic_posts(t.db.pool(), tid).await.unwrap(), 2);
}

#[tokio::test]
async fn test_reply_from_untrusted_origin_touches_nothing() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let reader = sign_in(&t.db, "reader").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/reply",
            STRANGER,
            Some(&reader),
            &[
                ("content", "Nice article"),
                ("tid", tid.to_string().as_str()),
                ("url", "https://blog.example/2024/an-article"),
                ("_csrf", reader.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(response.headers().get(LOCATION).is_none());
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(count_topic_posts(t.db.pool(), tid).await.unwrap(), 1);
}

#[tokio::test]
async fn test_guest_reply_redirects_with_error() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/reply",
            BLOG,
            None,
            &[
                ("content", "Drive-by"),
                ("tid", tid.to_string().as_str()),
                ("url", "https://blog.example/post?ref=feed"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "https://blog.example/post?ref=feed&error=%5B%5Berror%3Anot-logged-in%5D%5D#nodebb-comments"
    );
    assert_eq!(count_topic_posts(t.db.pool(), tid).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reply_with_bad_token_redirects_with_error() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;

    let response = t
        .app
        .oneshot(post_form(
            "/comments/reply",
            BLOG,
            Some(&author),
            &[
                ("content", "Forged"),
                ("tid", tid.to_string().as_str()),
                ("url", "https://blog.example/post"),
                ("_csrf", "not-the-token"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        "https://blog.example/post?error=%5B%5Berror%3Ainvalid-csrf-token%5D%5D#nodebb-comments"
    );
    assert_eq!(count_topic_posts(t.db.pool(), tid).await.unwrap(), 1);
}

#[tokio::test]
async fn test_linkback_for_published_post() {
    let t = setup().await;
    let author = publisher(&t.db, "author").await;
    let tid = publish_article(&t, &author, "42").await;
    let main_pid = get_topic(t.db.pool(), tid).await.unwrap().unwrap().main_pid.unwrap();

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/api/posts/{main_pid}/linkback"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["linkback"]["blogName"], "Main Blog");
    assert_eq!(json["linkback"]["url"], "https://blog.example/2024/an-article");
}

#[tokio::test]
async fn test_admin_settings_require_administrator() {
    let t = setup().await;
    let reader = sign_in(&t.db, "reader").await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/admin/blog-comments", BLOG, Some(&reader)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = sign_in(&t.db, "admin").await;
    add_group_member(t.db.pool(), "administrators", admin.uid)
        .await
        .unwrap();

    let response = t
        .app
        .clone()
        .oneshot(post_form(
            "/api/admin/blog-comments",
            BLOG,
            Some(&admin),
            &[
                ("composeLocation", "bottom"),
                ("title", "The Forum"),
                ("_csrf", admin.csrf_token.as_str()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["composeLocation"], "bottom");
    assert_eq!(json["url"], format!("{BLOG}, {OTHER_BLOG}"));

    // The next feed request sees the change.
    let response = t
        .app
        .oneshot(get("/comments/get/default/1", BLOG, None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["atBottom"], true);
    assert_eq!(json["atTop"], false);
    assert_eq!(json["siteTitle"], "The Forum");
}
