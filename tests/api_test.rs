//! End-to-end tests driving the full router against a scratch database.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use rusqlite::params;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use foodgram::auth::accounts::{self, NewAccount};
use foodgram::auth::session;
use foodgram::config::Config;
use foodgram::db;
use foodgram::state::{AppState, DbPool};

type Reply = (StatusCode, HeaderMap, String);

struct TestApp {
    _dir: TempDir,
    pool: DbPool,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("test.db"))
            .expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        let mut config = Config::default();
        config.auth.bcrypt_cost = 4;
        let router = foodgram::routes::router(AppState {
            db: pool.clone(),
            config,
        });

        // Shared catalog: Salt/Flour plus the three default tags
        pool.get()
            .unwrap()
            .execute_batch(
                "INSERT INTO ingredients (id, name, unit) VALUES
                    (1, 'Salt', 'g'), (2, 'Flour', 'g'), (3, 'Egg', 'pcs');
                 INSERT INTO tags (id, name, slug, checkbox_style) VALUES
                    (1, 'Breakfast', 'breakfast', 'orange'),
                    (2, 'Lunch', 'lunch', 'green'),
                    (3, 'Dinner', 'dinner', 'purple');",
            )
            .unwrap();

        Self {
            _dir: dir,
            pool,
            router,
        }
    }

    /// Create a user and return `(id, session cookie)`.
    fn user(&self, username: &str) -> (i64, String) {
        let conn = self.pool.get().unwrap();
        let user = accounts::create_user(
            &conn,
            &NewAccount {
                username,
                email: &format!("{}@example.com", username),
                first_name: "",
                password: "correct horse",
            },
            4,
        )
        .unwrap();
        let token = session::create_session(&conn, user.id, 1).unwrap();
        (user.id, format!("foodgram_session={}", token))
    }

    fn recipe(&self, author_id: i64, name: &str, tags: &[i64], amounts: &[(i64, u32)]) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.execute(
            "INSERT INTO recipes (author_id, name, description, cook_time, slug)
             VALUES (?1, ?2, 'Tasty', 20, ?3)",
            params![author_id, name, name.to_lowercase()],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        for tag in tags {
            conn.execute(
                "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?1, ?2)",
                params![id, tag],
            )
            .unwrap();
        }
        for (ingredient, quantity) in amounts {
            conn.execute(
                "INSERT INTO amounts (recipe_id, ingredient_id, quantity) VALUES (?1, ?2, ?3)",
                params![id, ingredient, quantity],
            )
            .unwrap();
        }
        id
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::GET, uri, cookie, None).await
    }

    async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> Reply {
        self.send(Method::POST, uri, cookie, Some(body)).await
    }

    async fn delete(&self, uri: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::DELETE, uri, cookie, None).await
    }

    fn count(&self, sql: &str) -> i64 {
        self.pool
            .get()
            .unwrap()
            .query_row(sql, [], |row| row.get(0))
            .unwrap()
    }
}

fn success(body: &str) -> bool {
    let value: Value = serde_json::from_str(body).unwrap();
    value["success"].as_bool().unwrap()
}

#[tokio::test]
async fn test_favorite_toggle_is_idempotent() {
    let app = TestApp::new();
    let (alice, cookie) = app.user("alice");
    let cookie = Some(cookie.as_str());
    let recipe = app.recipe(alice, "Soup", &[], &[(1, 2)]);

    let (status, _, body) = app
        .post("/api/favorites", cookie, json!({ "id": recipe }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(success(&body));

    let (_, _, body) = app
        .post("/api/favorites", cookie, json!({ "id": recipe }))
        .await;
    assert!(!success(&body), "Second add should report no change");
    assert_eq!(app.count("SELECT COUNT(*) FROM favorites"), 1);

    let uri = format!("/api/favorites/{}", recipe);
    let (_, _, body) = app.delete(&uri, cookie).await;
    assert!(success(&body));
    let (_, _, body) = app.delete(&uri, cookie).await;
    assert!(!success(&body));
    assert_eq!(app.count("SELECT COUNT(*) FROM favorites"), 0);
}

#[tokio::test]
async fn test_toggles_require_a_session() {
    let app = TestApp::new();
    let (alice, _) = app.user("alice");
    let recipe = app.recipe(alice, "Soup", &[], &[]);

    let (status, _, _) = app
        .post("/api/purchases", None, json!({ "id": recipe }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bogus = Some("foodgram_session=bogus");
    let (status, _, _) = app
        .post("/api/purchases", bogus, json!({ "id": recipe }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_targets() {
    let app = TestApp::new();
    let (_, cookie) = app.user("alice");
    let cookie = Some(cookie.as_str());

    let (status, _, _) = app
        .post("/api/purchases", cookie, json!({ "id": 999 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app.delete("/api/favorites/999", cookie).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Removing a purchase does not look the recipe up
    let (status, _, body) = app.delete("/api/purchases/999", cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!success(&body));

    let (status, _, _) = app
        .post("/api/favorites", cookie, json!({ "id": "soup" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscriptions() {
    let app = TestApp::new();
    let (alice, cookie) = app.user("alice");
    let cookie = Some(cookie.as_str());
    let (bob, _) = app.user("bob");
    app.recipe(bob, "Soup", &[], &[]);

    // Self-follow is refused without a row, and ids may come as strings
    let self_follow = json!({ "id": alice.to_string() });
    let (status, _, body) = app.post("/api/subscriptions", cookie, self_follow).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!success(&body));
    assert_eq!(app.count("SELECT COUNT(*) FROM follows"), 0);

    let (_, _, body) = app
        .post("/api/subscriptions", cookie, json!({ "id": bob }))
        .await;
    assert!(success(&body));

    let (status, _, html) = app.get("/subscriptions", cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("bob"));
    assert!(html.contains("Soup"));

    let uri = format!("/api/subscriptions/{}", bob);
    let (_, _, body) = app.delete(&uri, cookie).await;
    assert!(success(&body));
}

#[tokio::test]
async fn test_shopping_list_download() {
    let app = TestApp::new();
    let (alice, cookie) = app.user("alice");
    let cookie = Some(cookie.as_str());
    let soup = app.recipe(alice, "Soup", &[], &[(1, 2)]);
    let bread = app.recipe(alice, "Bread", &[], &[(1, 2), (2, 500)]);

    for recipe in [soup, bread] {
        let (_, _, body) = app
            .post("/api/purchases", cookie, json!({ "id": recipe }))
            .await;
        assert!(success(&body));
    }

    let (status, headers, body) = app.get("/purchases/download", cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"purchaselist.txt\""
    );
    assert_eq!(
        body,
        "Shopping list\nRecipes:\n- Bread\n- Soup\n\n\
         Ingredients:\n- Flour (g): 500\n- Salt (g): 4\n"
    );

    let (status, _, html) = app.get("/purchases", cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(r#"id="counter">2<"#));
}

#[tokio::test]
async fn test_tag_filter_and_pagination() {
    let app = TestApp::new();
    let (alice, _) = app.user("alice");
    app.recipe(alice, "Porridge", &[1], &[]);
    app.recipe(alice, "Stew", &[2], &[]);
    app.recipe(alice, "Brunch", &[1, 2], &[]);

    let (status, _, html) = app.get("/?tag=lunch", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Stew"));
    assert!(html.contains("Brunch"));
    assert!(!html.contains("Porridge"));
    assert_eq!(html.matches(">Brunch</a>").count(), 1);

    let (status, _, _) = app.get("/?page=2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = app.get("/?page=abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recipe_create_validation() {
    let app = TestApp::new();
    let (_, cookie) = app.user("alice");
    let cookie = Some(cookie.as_str());

    let input = json!({
        "name": "Air",
        "description": "Nothing at all",
        "cook_time": 5,
        "tags": ["lunch"],
        "ingredients": []
    });
    let (status, _, body) = app.post("/api/recipes", cookie, input).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors: Value = serde_json::from_str(&body).unwrap();
    assert!(errors["errors"]["ingredients"].is_array());
    assert_eq!(app.count("SELECT COUNT(*) FROM recipes"), 0);

    let input = json!({
        "name": "Pancakes",
        "description": "Fluffy",
        "cook_time": 15,
        "tags": ["breakfast"],
        "ingredients": [
            { "name": "Flour", "quantity": 200 },
            { "name": "Egg", "quantity": 2 }
        ]
    });
    let (status, _, body) = app.post("/api/recipes", cookie, input).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(created["slug"], "pancakes");
    assert_eq!(app.count("SELECT COUNT(*) FROM amounts"), 2);

    let uri = format!("/recipes/{}", created["id"]);
    let (status, _, html) = app.get(&uri, cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Flour - 200 g"));
}

#[tokio::test]
async fn test_non_owner_gets_not_found() {
    let app = TestApp::new();
    let (alice, _) = app.user("alice");
    let (_, mallory) = app.user("mallory");
    let mallory = Some(mallory.as_str());
    let recipe = app.recipe(alice, "Soup", &[], &[(1, 2)]);

    let uri = format!("/api/recipes/{}", recipe);
    let input = json!({
        "name": "Stolen",
        "description": "Mine now",
        "ingredients": [{ "name": "Salt", "quantity": 1 }]
    });
    let (status, _, _) = app.send(Method::PUT, &uri, mallory, Some(input)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app.delete(&uri, mallory).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let name: String = app
        .pool
        .get()
        .unwrap()
        .query_row(
            "SELECT name FROM recipes WHERE id = ?1",
            params![recipe],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(name, "Soup");
}

#[tokio::test]
async fn test_owner_deletes_recipe() {
    let app = TestApp::new();
    let (alice, cookie) = app.user("alice");
    let recipe = app.recipe(alice, "Soup", &[], &[(1, 2)]);

    let uri = format!("/api/recipes/{}", recipe);
    let (status, _, _) = app.delete(&uri, Some(&cookie)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.count("SELECT COUNT(*) FROM recipes"), 0);
}

#[tokio::test]
async fn test_ingredient_autocomplete() {
    let app = TestApp::new();

    let (status, _, body) = app.get("/api/ingredients?query=fl", None).await;
    assert_eq!(status, StatusCode::OK);
    let items: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(items, json!([{ "title": "Flour", "dimension": "g" }]));

    let (_, _, body) = app.get("/api/ingredients", None).await;
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn test_signup_and_login() {
    let app = TestApp::new();

    let signup = json!({
        "username": "carol",
        "email": "c@example.com",
        "password": "long enough pw"
    });
    let (status, headers, _) = app.post("/auth/signup", None, signup).await;
    assert_eq!(status, StatusCode::CREATED);
    let cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("foodgram_session="));

    let wrong = json!({ "username": "carol", "password": "wrong password" });
    let (status, _, _) = app.post("/auth/login", None, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let right = json!({ "username": "carol", "password": "long enough pw" });
    let (status, _, _) = app.post("/auth/login", None, right).await;
    assert_eq!(status, StatusCode::OK);
}
