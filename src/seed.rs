//! Demo data for local development (`driftpost seed`).

use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection};

use crate::auth::password;
use crate::blog::users::CREDENTIAL_PROVIDER;
use crate::config::AuthConfig;
use crate::error::AppResult;

/// Password shared by every seeded account.
pub const DEMO_PASSWORD: &str = "driftpost-demo";

const USER_COUNT: usize = 20;
const POST_COUNT: usize = 40;
const COMMENT_COUNT: usize = 80;

pub const CATEGORIES: &[&str] = &[
    "Node.js",
    "React.js",
    "Next.js",
    "Python",
    "Javascript",
    "Algorithms",
    "APIs",
];

pub const TAGS: &[&str] = &[
    "beginner",
    "advanced",
    "tutorial",
    "performance",
    "testing",
    "tooling",
    "architecture",
    "security",
    "databases",
    "career",
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Margaret", "Ken", "Frances", "Dennis",
    "Radia", "Linus", "Hedy", "John", "Katherine", "Niklaus",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Hamilton", "Thompson", "Allen",
    "Ritchie", "Perlman", "Torvalds", "Lamarr", "Backus", "Johnson", "Wirth",
];

const TITLE_OPENERS: &[&str] = &[
    "A practical guide to",
    "What I learned from",
    "Getting started with",
    "Common mistakes in",
    "Deep dive:",
    "Ten tips for",
    "Rethinking",
];

const TITLE_SUBJECTS: &[&str] = &[
    "error handling",
    "state management",
    "async code",
    "API design",
    "caching",
    "pagination",
    "data modeling",
    "code review",
    "dependency upgrades",
    "background jobs",
];

const SENTENCES: &[&str] = &[
    "Start small and measure before you optimize.",
    "Most bugs hide at the boundaries between components.",
    "Naming things well pays off every time you come back to the code.",
    "Tests are documentation that cannot drift out of date.",
    "A clear error message saves an hour of debugging.",
    "Keep the happy path short and obvious.",
    "Every abstraction has a cost, so make sure it earns its keep.",
    "Read the changelog before you upgrade.",
    "Logs are only useful if someone can search them.",
    "Ship the boring version first, then iterate.",
];

const COMMENTS: &[&str] = &[
    "Great write-up, thanks!",
    "This saved me a lot of time.",
    "I disagree with the second point, but the rest is spot on.",
    "Could you expand on the testing part?",
    "Bookmarked for later.",
    "We ran into exactly this last week.",
    "Nice examples, very easy to follow.",
    "Is there a follow-up planned?",
];

/// Row counts written by [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub categories: usize,
    pub tags: usize,
    pub posts: usize,
    pub post_tags: usize,
    pub comments: usize,
}

/// Empties the content tables and fills them with demo data, all in one transaction.
pub fn run<R: Rng>(conn: &Connection, auth: &AuthConfig, rng: &mut R) -> AppResult<SeedSummary> {
    let password_hash = password::hash_password(DEMO_PASSWORD, auth.bcrypt_cost)?;

    let tx = conn.unchecked_transaction()?;
    reset(&tx)?;

    let users = seed_users(&tx, &password_hash, rng)?;
    let categories = seed_named(&tx, "category", CATEGORIES)?;
    let tags = seed_named(&tx, "tag", TAGS)?;
    let posts = seed_posts(&tx, &users, &categories, rng)?;
    let post_tags = seed_post_tags(&tx, &posts, &tags, rng)?;
    let comments = seed_comments(&tx, &users, &posts, rng)?;
    tx.commit()?;

    let summary = SeedSummary {
        users: users.len(),
        categories: categories.len(),
        tags: tags.len(),
        posts: posts.len(),
        post_tags,
        comments,
    };
    tracing::info!(?summary, "Seeding done");
    Ok(summary)
}

/// Deletes children before parents so foreign keys hold throughout.
fn reset(conn: &Connection) -> AppResult<()> {
    for table in [
        "comment",
        "post_tag",
        "post",
        "tag",
        "category",
        "session",
        "account",
        "verification",
        "user",
    ] {
        conn.execute(&format!("DELETE FROM {}", table), [])?;
    }
    Ok(())
}

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn pick<'a, R: Rng>(items: &'a [&'a str], rng: &mut R) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn hours_ago(hours: u32) -> String {
    format!("-{} hours", hours)
}

fn seed_users<R: Rng>(conn: &Connection, password_hash: &str, rng: &mut R) -> AppResult<Vec<String>> {
    let mut ids = Vec::with_capacity(USER_COUNT);
    for n in 0..USER_COUNT {
        let first = pick(FIRST_NAMES, rng);
        let last = pick(LAST_NAMES, rng);
        let id = new_id();
        let email = format!(
            "{}.{}{}@example.com",
            first.to_lowercase(),
            last.to_lowercase(),
            n + 1
        );
        let joined = hours_ago(rng.gen_range(24..24 * 365));

        conn.execute(
            "INSERT INTO user (id, name, email, age, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, datetime('now', ?5), datetime('now', ?5))",
            params![id, format!("{} {}", first, last), email, rng.gen_range(18..=99i64), joined],
        )?;
        conn.execute(
            "INSERT INTO account (id, account_id, provider_id, user_id, password)
             VALUES (?1, ?2, ?3, ?2, ?4)",
            params![new_id(), id, CREDENTIAL_PROVIDER, password_hash],
        )?;
        ids.push(id);
    }
    Ok(ids)
}

fn seed_named(conn: &Connection, table: &str, names: &[&str]) -> AppResult<Vec<String>> {
    let sql = format!("INSERT INTO {} (id, name) VALUES (?1, ?2)", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = new_id();
        stmt.execute(params![id, name])?;
        ids.push(id);
    }
    Ok(ids)
}

fn paragraph<R: Rng>(rng: &mut R, sentences: usize) -> String {
    (0..sentences)
        .map(|_| pick(SENTENCES, rng))
        .collect::<Vec<_>>()
        .join(" ")
}

fn seed_posts<R: Rng>(
    conn: &Connection,
    users: &[String],
    categories: &[String],
    rng: &mut R,
) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "INSERT INTO post (id, user_id, title, short_description, content, category_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now', ?7), datetime('now', ?7))",
    )?;

    let mut ids = Vec::with_capacity(POST_COUNT);
    for _ in 0..POST_COUNT {
        let (Some(user_id), Some(category_id)) = (users.choose(rng), categories.choose(rng)) else {
            break;
        };
        let id = new_id();
        let title = format!("{} {}", pick(TITLE_OPENERS, rng), pick(TITLE_SUBJECTS, rng));
        let content = (0..rng.gen_range(2..=4))
            .map(|_| paragraph(rng, 4))
            .collect::<Vec<_>>()
            .join("\n\n");

        stmt.execute(params![
            id,
            user_id,
            title,
            paragraph(rng, 1),
            content,
            category_id,
            hours_ago(rng.gen_range(1..24 * 90)),
        ])?;
        ids.push(id);
    }
    Ok(ids)
}

/// Tags a random subset of posts with a random subset of tags each.
fn seed_post_tags<R: Rng>(
    conn: &Connection,
    posts: &[String],
    tags: &[String],
    rng: &mut R,
) -> AppResult<usize> {
    let mut stmt = conn.prepare("INSERT INTO post_tag (post_id, tag_id) VALUES (?1, ?2)")?;
    let mut count = 0;
    let tagged = rng.gen_range(0..=posts.len());
    for post_id in posts.choose_multiple(rng, tagged) {
        let n = rng.gen_range(1..=tags.len().clamp(1, 4));
        for tag_id in tags.choose_multiple(rng, n) {
            stmt.execute(params![post_id, tag_id])?;
            count += 1;
        }
    }
    Ok(count)
}

/// Comments by random users. Roughly one in four replies to an earlier comment on the same post.
fn seed_comments<R: Rng>(
    conn: &Connection,
    users: &[String],
    posts: &[String],
    rng: &mut R,
) -> AppResult<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO comment (id, parent_id, user_id, post_id, content) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    // (comment id, post id)
    let mut written: Vec<(String, String)> = Vec::with_capacity(COMMENT_COUNT);
    for _ in 0..COMMENT_COUNT {
        let (Some(user_id), Some(post_id)) = (users.choose(rng), posts.choose(rng)) else {
            break;
        };
        let parent_id = if rng.gen_bool(0.25) {
            written
                .iter()
                .filter(|(_, p)| p == post_id)
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>()
                .choose(rng)
                .cloned()
        } else {
            None
        };

        let id = new_id();
        stmt.execute(params![id, parent_id, user_id, post_id, pick(COMMENTS, rng)])?;
        written.push((id, post_id.clone()));
    }
    Ok(written.len())
}
