use logotask::db::Db;
use logotask::models::NewContentItem;

pub async fn create_test_db() -> Db {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path =
        std::env::temp_dir().join(format!("logotask_test_{}_{}.db", std::process::id(), id));
    // Clean up leftover file from previous runs
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());
    Db::new(&url).await.expect("failed to create test database")
}

#[allow(dead_code)]
pub fn make_content(n: usize) -> Vec<NewContentItem> {
    (0..n)
        .map(|i| NewContentItem {
            text: format!("word-{i}"),
            counterpart: format!("images/word-{i}.png"),
            tags: vec![format!("category-{}", i % 3)],
        })
        .collect()
}
