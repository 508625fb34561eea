use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use socium_api::server::{self, ServerState};
use socium_common::{
    model::{account::EmailAddress, auth::Password},
    snowflake::WorkerId,
    util::PositiveDuration,
};
use socium_db::MemoryStore;
use socium_service::{
    Service,
    outbox::{Outbox, OutboxReceiver},
    token::{TokenKeys, TokenPurpose},
};
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "correct horse battery staple";

struct TestApp {
    router: Router,
    service: Arc<Service<MemoryStore>>,
    mails: OutboxReceiver,
}

fn app() -> TestApp {
    let tokens = TokenKeys::from_secret(b"api test", PositiveDuration::from_hours(1).unwrap());
    let (outbox, mails) = Outbox::channel();
    let service = Arc::new(Service::new(
        MemoryStore::new(),
        WorkerId::new(3).unwrap(),
        Arc::new(tokens),
        outbox,
        "http://localhost",
    ));

    let router = server::routes().with_state(ServerState::new(Arc::clone(&service)));

    TestApp {
        router,
        service,
        mails,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// The token at the end of the next mailed link.
    async fn mailed_token(&mut self) -> String {
        let mail = self.mails.recv().await.unwrap();
        mail.body.rsplit('/').next().unwrap().to_owned()
    }

    /// Registers, activates and logs in, returning the id and a token.
    async fn member(&mut self, name: &str) -> (String, String) {
        let email = format!("{name}@example.com");
        let (status, account) = self
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(json!({
                    "name": name,
                    "surname": "Tester",
                    "email": email,
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = account["id"].as_str().unwrap().to_owned();

        let activation = self.mailed_token().await;
        let (status, _) = self
            .send(Method::GET, &format!("/api/activation/{activation}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, token) = self.login(&email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK);

        (id, token["token"].as_str().unwrap().to_owned())
    }

    async fn admin(&self) -> String {
        self.service
            .ensure_admin(
                "Root",
                "Admin",
                EmailAddress::new("root@example.com").unwrap(),
                &Password::new(PASSWORD),
            )
            .await
            .unwrap();

        let (status, token) = self.login("root@example.com", PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        token["token"].as_str().unwrap().to_owned()
    }
}

#[tokio::test]
async fn register_activate_login() {
    let mut app = app();

    let (status, account) = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "name": "Ada",
                "surname": "Lovelace",
                "email": "Ada@Example.com",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["email"], "ada@example.com");
    assert_eq!(account["isActivated"], false);
    assert_eq!(account["userType"], "user");
    assert!(account.get("passwordHash").is_none());
    let id = account["id"].as_str().unwrap().to_owned();

    let (status, body) = app.login("ada@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "status": 401 }));

    let (status, _) = app
        .send(Method::GET, &format!("/api/activation/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let activation = app.mailed_token().await;
    let (status, _) = app
        .send(Method::GET, &format!("/api/activation/{activation}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, token) = app.login("ada@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!token["token"].as_str().unwrap().is_empty());

    let (status, _) = app
        .send(Method::GET, &format!("/api/activation/{activation}"), None, None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "name": "Ada",
                "surname": "Lovelace",
                "email": "ada@example.com",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rejected_requests() {
    let app = app();

    let (status, _) = app.send(Method::GET, "/user/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::GET, "/user/posts", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "status": 404 }));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "name": "Ada" })),
        )
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn password_reset_needs_the_mailed_token() {
    let mut app = app();
    let (id, access_token) = app.member("ada").await;
    let attempt = json!({ "password": "attacker chosen" });

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/reset-password/{id}"),
            None,
            Some(attempt.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/reset-password/{access_token}"),
            None,
            Some(attempt.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let account = app.service.get_account(id.parse().unwrap()).await.unwrap();
    let activation = app
        .service
        .tokens()
        .sign_for(&account, TokenPurpose::Activation)
        .unwrap();
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/reset-password/{}", activation.as_str()),
            None,
            Some(attempt),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.login("ada@example.com", "attacker chosen").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/forgot-password",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let reset = app.mailed_token().await;
    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/api/reset-password/{reset}"),
            None,
            Some(json!({ "password": "new password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.login("ada@example.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("ada@example.com", "new password").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_need_admin() {
    let mut app = app();
    let (_, user_token) = app.member("ada").await;

    let (status, _) = app
        .send(Method::GET, "/admin/dashboard", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin_token = app.admin().await;
    let (status, dashboard) = app
        .send(Method::GET, "/admin/dashboard", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["userCount"], 2);
    assert_eq!(dashboard["activatedUserCount"], 2);
}

#[tokio::test]
async fn admin_account_listing() {
    let mut app = app();
    for name in ["ada", "adam", "adele", "adrian", "grace"] {
        app.member(name).await;
    }
    let admin_token = app.admin().await;

    let (status, page) = app
        .send(
            Method::GET,
            "/admin/users?page=0&size=2&filter=ad",
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["accounts"].as_array().unwrap().len(), 2);
    assert_eq!(page["page"]["totalElements"], 4);
    assert_eq!(page["page"]["totalPages"], 2);
}

#[tokio::test]
async fn friendship_and_feed() {
    let mut app = app();
    let (ada, ada_token) = app.member("ada").await;
    let (grace, grace_token) = app.member("grace").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/user/posts",
            Some(&ada_token),
            Some(json!({ "description": "only for friends", "isPrivate": true })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/user/users/{ada}/friend-requests"),
            Some(&grace_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/user/users/{ada}/friend-requests"),
            Some(&grace_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, requests) = app
        .send(
            Method::GET,
            &format!("/user/users/{ada}/friend-requests"),
            Some(&ada_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(requests[0]["id"], grace.as_str());

    let (status, account) = app
        .send(
            Method::POST,
            &format!("/user/users/{ada}/friend-requests/{grace}"),
            Some(&ada_token),
            Some(json!({ "accept": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["friendIds"], json!([grace]));

    let (status, profile) = app
        .send(Method::GET, "/user/posts", Some(&grace_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile, json!([]));

    let (status, feed) = app
        .send(
            Method::GET,
            "/user/posts?homepage=true",
            Some(&grace_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["description"], "only for friends");
    assert_eq!(feed[0]["userId"], ada.as_str());
    assert_eq!(feed[0]["user"]["id"], ada.as_str());

    let post_id = feed[0]["id"].as_str().unwrap().to_owned();
    let (status, post) = app
        .send(
            Method::PATCH,
            &format!("/user/posts/{post_id}/like"),
            Some(&grace_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["whoLikesUserIds"], json!([grace]));

    let (status, post) = app
        .send(
            Method::POST,
            &format!("/user/posts/{post_id}/comments"),
            Some(&grace_token),
            Some(json!({ "content": "nice" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["comments"][0]["content"], "nice");
    assert_eq!(post["comments"][0]["user"]["id"], grace.as_str());

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/user/users/{grace}/friends/{ada}"),
            Some(&grace_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, friends) = app
        .send(
            Method::GET,
            &format!("/user/users/{ada}/friends"),
            Some(&ada_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(friends, json!([]));
}
