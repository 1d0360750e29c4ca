use async_graphql::{Request, Response, Variables};
use serde_json::{json, Value};
use tempfile::TempDir;

use driftpost::blog::users;
use driftpost::config::BlogConfig;
use driftpost::db;
use driftpost::extractors::CurrentUser;
use driftpost::graphql::{build_schema, BlogSchema};
use driftpost::state::DbPool;

struct Harness {
    _dir: TempDir,
    pool: DbPool,
    schema: BlogSchema,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&dir.path().join("test.db")).unwrap();
        db::run_migrations(&pool).unwrap();
        let conn = pool.get().unwrap();
        conn.execute_batch(
            "INSERT INTO category (id, name) VALUES ('c1', 'Python'), ('c2', 'APIs');
             INSERT INTO tag (id, name) VALUES ('t1', 'beginner'), ('t2', 'testing'), ('t3', 'tooling');",
        )
        .unwrap();
        drop(conn);

        Self {
            _dir: dir,
            pool,
            schema: build_schema(BlogConfig::default()),
        }
    }

    fn user(&self, name: &str) -> CurrentUser {
        let conn = self.pool.get().unwrap();
        let email = format!("{}@example.com", name.to_lowercase());
        let user = users::create_with_password(&conn, name, &email, Some(30), "hash").unwrap();
        CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            session_id: "test-session".to_string(),
        }
    }

    async fn run(&self, user: Option<&CurrentUser>, query: &str, variables: Value) -> Response {
        let mut request = Request::new(query)
            .variables(Variables::from_json(variables))
            .data(self.pool.clone());
        if let Some(user) = user {
            request = request.data(user.clone());
        }
        self.schema.execute(request).await
    }

    async fn ok(&self, user: Option<&CurrentUser>, query: &str, variables: Value) -> Value {
        let response = self.run(user, query, variables).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        response.data.into_json().unwrap()
    }
}

fn error_code(response: &Response) -> String {
    let error = response.errors.first().expect("expected an error");
    let extensions = serde_json::to_value(&error.extensions).unwrap();
    extensions["code"].as_str().unwrap_or_default().to_string()
}

const CREATE_POST: &str = r#"
    mutation($input: PostInput!) {
        createPost(input: $input) { success message id }
    }
"#;

const UPDATE_POST: &str = r#"
    mutation($input: PostInput!) {
        updatePost(input: $input) { success }
    }
"#;

fn post_input(title: &str, tag_ids: &[&str]) -> Value {
    json!({
        "input": {
            "mode": "CREATE",
            "title": title,
            "shortDescription": "A short description",
            "content": "Body text",
            "categoryId": "c1",
            "tagIds": tag_ids,
        }
    })
}

async fn create_post(h: &Harness, user: &CurrentUser, title: &str, tag_ids: &[&str]) -> String {
    let data = h.ok(Some(user), CREATE_POST, post_input(title, tag_ids)).await;
    data["createPost"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn created_post_can_be_fetched() {
    let h = Harness::new();
    let ada = h.user("Ada");
    let id = create_post(&h, &ada, "Hello world", &["t1", "t2"]).await;

    let data = h
        .ok(
            None,
            r#"query($id: String!) {
                getPostById(id: $id) {
                    title shortDescription content userId
                    category { id name }
                    user { name }
                    tags { id }
                    comments { id }
                }
            }"#,
            json!({ "id": id }),
        )
        .await;

    let post = &data["getPostById"];
    assert_eq!(post["title"], "Hello world");
    assert_eq!(post["shortDescription"], "A short description");
    assert_eq!(post["userId"], ada.id.as_str());
    assert_eq!(post["category"]["name"], "Python");
    assert_eq!(post["user"]["name"], "Ada");
    assert_eq!(post["tags"].as_array().unwrap().len(), 2);
    assert!(post["comments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_post_is_null() {
    let h = Harness::new();
    let data = h
        .ok(None, r#"{ getPostById(id: "nope") { id } }"#, json!({}))
        .await;
    assert!(data["getPostById"].is_null());
}

#[tokio::test]
async fn mutations_require_a_session() {
    let h = Harness::new();
    let response = h.run(None, CREATE_POST, post_input("Anon", &[])).await;
    assert_eq!(error_code(&response), "UNAUTHORIZED");
}

#[tokio::test]
async fn only_the_owner_can_edit_or_delete() {
    let h = Harness::new();
    let ada = h.user("Ada");
    let grace = h.user("Grace");
    let id = create_post(&h, &ada, "Mine", &[]).await;

    let mut input = post_input("Hijacked", &[]);
    input["input"]["mode"] = json!("EDIT");
    input["input"]["id"] = json!(id);
    let response = h.run(Some(&grace), UPDATE_POST, input.clone()).await;
    assert_eq!(error_code(&response), "FORBIDDEN");

    let response = h
        .run(
            Some(&grace),
            r#"mutation($id: String!) { deletePostById(id: $id) { success } }"#,
            json!({ "id": id }),
        )
        .await;
    assert_eq!(error_code(&response), "FORBIDDEN");

    h.ok(Some(&ada), UPDATE_POST, input).await;
    let data = h
        .ok(
            None,
            r#"query($id: String!) { getPostById(id: $id) { title } }"#,
            json!({ "id": id }),
        )
        .await;
    assert_eq!(data["getPostById"]["title"], "Hijacked");
}

#[tokio::test]
async fn deleting_a_post_removes_tags_and_comments() {
    let h = Harness::new();
    let ada = h.user("Ada");
    let id = create_post(&h, &ada, "Short lived", &["t1", "t3"]).await;
    h.ok(
        Some(&ada),
        r#"mutation($input: CommentInput!) { createComment(input: $input) { id } }"#,
        json!({ "input": { "postId": id, "content": "First!" } }),
    )
    .await;

    let data = h
        .ok(
            Some(&ada),
            r#"mutation($id: String!) { deletePostById(id: $id) { success } }"#,
            json!({ "id": id }),
        )
        .await;
    assert_eq!(data["deletePostById"]["success"], true);

    let conn = h.pool.get().unwrap();
    let remaining: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM post_tag WHERE post_id = ?1)
                  + (SELECT COUNT(*) FROM comment WHERE post_id = ?1)
                  + (SELECT COUNT(*) FROM post WHERE id = ?1)",
            [&id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn search_pagination_and_count_agree() {
    let h = Harness::new();
    let ada = h.user("Ada");
    for n in 0..5 {
        create_post(&h, &ada, &format!("Rust tip {}", n), &[]).await;
    }
    create_post(&h, &ada, "Gardening", &[]).await;

    let data = h
        .ok(
            None,
            r#"{
                count: getPostsCount(searchTerm: "rust")
                first: getPosts(page: 0, limit: 2, searchTerm: "RUST") { title }
                last: getPosts(page: 2, limit: 2, searchTerm: "rust") { title }
                all: getPostsCount
            }"#,
            json!({}),
        )
        .await;

    assert_eq!(data["count"], 5);
    assert_eq!(data["all"], 6);
    let first = data["first"].as_array().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0]["title"], "Rust tip 4");
    let last = data["last"].as_array().unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0]["title"], "Rust tip 0");
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let h = Harness::new();
    let ada = h.user("Ada");

    let response = h
        .run(None, r#"{ getPosts(page: -1, limit: 10) { id } }"#, json!({}))
        .await;
    assert_eq!(error_code(&response), "BAD_REQUEST");

    let response = h.run(Some(&ada), CREATE_POST, post_input("", &[])).await;
    assert_eq!(error_code(&response), "BAD_REQUEST");

    let response = h
        .run(Some(&ada), CREATE_POST, post_input("Unknown tag", &["t9"]))
        .await;
    assert_eq!(error_code(&response), "BAD_REQUEST");
}

#[tokio::test]
async fn users_update_only_their_own_profile() {
    let h = Harness::new();
    let ada = h.user("Ada");
    let grace = h.user("Grace");
    let query = r#"mutation($input: UserInput!) { updateUser(input: $input) { name age } }"#;

    let response = h
        .run(
            Some(&grace),
            query,
            json!({ "input": { "mode": "UPDATE", "id": ada.id, "name": "Mallory" } }),
        )
        .await;
    assert_eq!(error_code(&response), "FORBIDDEN");

    let data = h
        .ok(
            Some(&ada),
            query,
            json!({ "input": { "mode": "UPDATE", "id": ada.id, "name": "Ada Lovelace", "age": 36 } }),
        )
        .await;
    assert_eq!(data["updateUser"]["name"], "Ada Lovelace");
    assert_eq!(data["updateUser"]["age"], 36);
}

#[tokio::test]
async fn categories_report_post_counts() {
    let h = Harness::new();
    let ada = h.user("Ada");
    create_post(&h, &ada, "One", &[]).await;
    create_post(&h, &ada, "Two", &[]).await;

    let data = h
        .ok(None, "{ getCategories { name postCount } }", json!({}))
        .await;
    assert_eq!(
        data["getCategories"],
        json!([
            { "name": "APIs", "postCount": 0 },
            { "name": "Python", "postCount": 2 },
        ])
    );
}

#[tokio::test]
async fn tags_are_listed_by_name() {
    let h = Harness::new();
    let data = h.ok(None, "{ getTags { id name } }", json!({})).await;
    let names: Vec<_> = data["getTags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["beginner", "testing", "tooling"]);
}

#[tokio::test]
async fn public_user_exposes_only_id_name_and_email() {
    let h = Harness::new();
    let ada = h.user("Ada");

    let data = h
        .ok(
            None,
            r#"query($id: String!) {
                user: getUser(userId: $id) { id name email }
                missing: getUser(userId: "nobody") { id }
                shape: __type(name: "PublicUser") { fields { name } }
            }"#,
            json!({ "id": ada.id }),
        )
        .await;

    assert_eq!(
        data["user"],
        json!({ "id": ada.id, "name": "Ada", "email": "ada@example.com" })
    );
    assert!(data["missing"].is_null());
    let mut fields: Vec<_> = data["shape"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    fields.sort();
    assert_eq!(fields, vec!["email", "id", "name"]);
}

#[tokio::test]
async fn user_posts_page_and_count_agree() {
    let h = Harness::new();
    let ada = h.user("Ada");
    let grace = h.user("Grace");
    for n in 0..3 {
        create_post(&h, &ada, &format!("Ada {}", n), &[]).await;
    }
    create_post(&h, &grace, "Grace 0", &[]).await;

    let data = h
        .ok(
            None,
            r#"query($id: String!) {
                count: getUserPostsCount(userId: $id)
                first: getUserPosts(userId: $id, page: 0, limit: 2) { title userId }
                second: getUserPosts(userId: $id, page: 1, limit: 2) { title }
            }"#,
            json!({ "id": ada.id }),
        )
        .await;

    assert_eq!(data["count"], 3);
    let first = data["first"].as_array().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0]["title"], "Ada 2");
    assert!(first.iter().all(|p| p["userId"] == ada.id.as_str()));
    let second = data["second"].as_array().unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0]["title"], "Ada 0");
}

#[tokio::test]
async fn category_posts_page_and_count_agree() {
    let h = Harness::new();
    let ada = h.user("Ada");
    for n in 0..3 {
        create_post(&h, &ada, &format!("Python {}", n), &[]).await;
    }
    let mut other = post_input("Elsewhere", &[]);
    other["input"]["categoryId"] = json!("c2");
    h.ok(Some(&ada), CREATE_POST, other).await;

    let data = h
        .ok(
            None,
            r#"{
                count: getCategoryPostsCount(categoryId: "c1")
                first: getPostsByCategoryId(categoryId: "c1", page: 0, limit: 2) { title }
                second: getPostsByCategoryId(categoryId: "c1", page: 1, limit: 2) { title }
            }"#,
            json!({}),
        )
        .await;

    assert_eq!(data["count"], 3);
    let first: Vec<_> = data["first"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(first, vec!["Python 2", "Python 1"]);
    let second: Vec<_> = data["second"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(second, vec!["Python 0"]);
}

#[tokio::test]
async fn related_posts_can_exclude_the_current_post() {
    let h = Harness::new();
    let ada = h.user("Ada");
    let current = create_post(&h, &ada, "Current", &[]).await;
    create_post(&h, &ada, "Sibling", &[]).await;
    let mut other = post_input("Other category", &[]);
    other["input"]["categoryId"] = json!("c2");
    h.ok(Some(&ada), CREATE_POST, other).await;

    let data = h
        .ok(
            None,
            r#"query($id: String!) {
                all: getRelatedPostsByCategoryId(categoryId: "c1") { id title }
                rest: getRelatedPostsByCategoryId(categoryId: "c1", excludeId: $id) { id title }
            }"#,
            json!({ "id": current }),
        )
        .await;

    let all = data["all"].as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|p| p["id"] == current.as_str()));
    let rest = data["rest"].as_array().unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["title"], "Sibling");
}
