//! Input schemas and their validation rules.
//!
//! Each form collects every failing field before returning, so a client gets the
//! full list of problems in one round trip.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MIN_AGE: i64 = 18;
pub const MAX_AGE: i64 = 99;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_TITLE_LEN: usize = 255;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z",
    )
    .expect("email pattern is valid")
});

/// Field name -> messages for every rule the input broke.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// Flattened "field: message" lines, for HTML forms.
    pub fn messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{}: {}", field, m)))
            .collect()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if !EMAIL_RE.is_match(email) {
        errors.add("email", "Invalid email address");
    }
}

fn check_required(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{} is required", field));
    }
}

fn check_age(errors: &mut ValidationErrors, age: Option<i64>) {
    if let Some(age) = age {
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            errors.add("age", format!("Age must be between {} and {}", MIN_AGE, MAX_AGE));
        }
    }
}

/// The three shapes a user form can take, discriminated by `mode`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum UserForm {
    #[serde(rename_all = "camelCase")]
    SignUp {
        email: String,
        name: String,
        password: String,
        age: Option<i64>,
    },
    SignIn {
        email: String,
        password: String,
    },
    Update {
        id: String,
        name: String,
        age: Option<i64>,
    },
}

impl Validate for UserForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        match self {
            UserForm::SignUp {
                email,
                name,
                password,
                age,
            } => {
                check_email(&mut errors, email);
                check_required(&mut errors, "name", name);
                if password.chars().count() < MIN_PASSWORD_LEN {
                    errors.add(
                        "password",
                        format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
                    );
                }
                check_age(&mut errors, *age);
            }
            UserForm::SignIn { email, password } => {
                check_email(&mut errors, email);
                if password.is_empty() {
                    errors.add("password", "Password is required");
                }
            }
            UserForm::Update { id, name, age } => {
                check_required(&mut errors, "id", id);
                check_required(&mut errors, "name", name);
                check_age(&mut errors, *age);
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PostMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostForm {
    pub mode: PostMode,
    pub id: Option<String>,
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub category_id: String,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

impl PostForm {
    /// Tag ids with blanks dropped and duplicates collapsed, first occurrence wins.
    pub fn normalized_tag_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.tag_ids
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.to_string()))
            .map(str::to_string)
            .collect()
    }
}

impl Validate for PostForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.mode == PostMode::Edit && self.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            errors.add("id", "id is required when editing a post");
        }
        check_required(&mut errors, "title", &self.title);
        if self.title.chars().count() > MAX_TITLE_LEN {
            errors.add(
                "title",
                format!("title must be at most {} characters", MAX_TITLE_LEN),
            );
        }
        check_required(&mut errors, "shortDescription", &self.short_description);
        check_required(&mut errors, "content", &self.content);
        check_required(&mut errors, "categoryId", &self.category_id);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentForm {
    pub post_id: String,
    pub content: String,
    pub parent_id: Option<String>,
}

impl Validate for CommentForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_required(&mut errors, "postId", &self.post_id);
        check_required(&mut errors, "content", &self.content);
        errors.into_result()
    }
}

/// Validates a required id-like query argument.
pub fn require_id(field: &str, value: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_required(&mut errors, field, value);
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(email: &str, password: &str, age: Option<i64>) -> UserForm {
        UserForm::SignUp {
            email: email.into(),
            name: "Ada".into(),
            password: password.into(),
            age,
        }
    }

    #[test]
    fn valid_sign_up_passes() {
        assert!(sign_up("ada@example.com", "hunter2hunter2", Some(30))
            .validate()
            .is_ok());
    }

    #[test]
    fn sign_up_collects_every_failure() {
        let errors = sign_up("not-an-email", "short", Some(12))
            .validate()
            .unwrap_err();
        assert!(errors.field("email").is_some());
        assert!(errors.field("password").is_some());
        assert!(errors.field("age").is_some());
        assert!(errors.field("name").is_none());
    }

    #[test]
    fn age_bounds_are_inclusive() {
        assert!(sign_up("a@b.io", "longenough", Some(18)).validate().is_ok());
        assert!(sign_up("a@b.io", "longenough", Some(99)).validate().is_ok());
        assert!(sign_up("a@b.io", "longenough", Some(100)).validate().is_err());
    }

    #[test]
    fn user_form_is_tagged_by_mode() {
        let form: UserForm = serde_json::from_str(
            r#"{"mode":"update","id":"u1","name":"Grace","age":40}"#,
        )
        .unwrap();
        assert!(matches!(form, UserForm::Update { ref id, .. } if id == "u1"));

        let form: UserForm =
            serde_json::from_str(r#"{"mode":"signIn","email":"a@b.io","password":"x"}"#).unwrap();
        assert!(matches!(form, UserForm::SignIn { .. }));
    }

    #[test]
    fn sign_in_requires_password() {
        let form = UserForm::SignIn {
            email: "a@b.io".into(),
            password: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.field("password"),
            Some(&["Password is required".to_string()][..])
        );
    }

    fn post_form(mode: PostMode) -> PostForm {
        PostForm {
            mode,
            id: None,
            title: "Hello".into(),
            short_description: "Short".into(),
            content: "Body".into(),
            category_id: "c1".into(),
            tag_ids: vec![],
        }
    }

    #[test]
    fn edit_requires_id() {
        assert!(post_form(PostMode::Create).validate().is_ok());
        let errors = post_form(PostMode::Edit).validate().unwrap_err();
        assert!(errors.field("id").is_some());
    }

    #[test]
    fn title_length_is_capped() {
        let mut form = post_form(PostMode::Create);
        form.title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(form.validate().unwrap_err().field("title").is_some());
    }

    #[test]
    fn tag_ids_are_deduplicated() {
        let mut form = post_form(PostMode::Create);
        form.tag_ids = vec!["a".into(), "b".into(), "a".into(), " ".into()];
        assert_eq!(form.normalized_tag_ids(), vec!["a", "b"]);
    }

    #[test]
    fn comment_needs_content() {
        let form = CommentForm {
            post_id: "p1".into(),
            content: "   ".into(),
            parent_id: None,
        };
        assert!(form.validate().unwrap_err().field("content").is_some());
    }

    #[test]
    fn messages_flatten_fields() {
        let mut errors = ValidationErrors::default();
        errors.add("title", "title is required");
        errors.add("content", "content is required");
        assert_eq!(
            errors.messages(),
            vec!["content: content is required", "title: title is required"]
        );
    }
}
