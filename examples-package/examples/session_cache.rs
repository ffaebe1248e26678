//! Session Cache Example
//!
//! Demonstrates local-cache reuse, nested selects and second-level caching
//! across sessions against a small in-memory data source.
//!
//! Run with `RUST_LOG=debug` to see cache hits and the hit ratio.

use anyhow::Result;
use query_cache::{CacheBuilder, CacheConfig};
use query_core::{record, BoundSql, ParameterMapping, Record, RowBounds, Value};
use query_executor::{
    Executor, ExecutorConfig, MappedStatement, NestedSelect, NestedSelectMaterializer,
    RawExecutor, TargetType,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Tables keyed by statement id, rows filtered on the first bound value
struct InMemoryDatabase {
    tables: BTreeMap<&'static str, Vec<Record>>,
    round_trips: Arc<AtomicUsize>,
}

impl InMemoryDatabase {
    fn new(round_trips: Arc<AtomicUsize>) -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(
            "BlogMapper.selectBlog",
            vec![record([
                ("id", Value::Int64(1)),
                ("title", Value::from("Caching in Rust")),
                ("author_id", Value::Int64(10)),
            ])],
        );
        tables.insert(
            "AuthorMapper.selectAuthor",
            vec![record([
                ("id", Value::Int64(10)),
                ("name", Value::from("ferris")),
            ])],
        );
        Self {
            tables,
            round_trips,
        }
    }
}

impl RawExecutor for InMemoryDatabase {
    fn query(
        &mut self,
        ms: &MappedStatement,
        bound_sql: &BoundSql,
        parameter: &Value,
        _row_bounds: RowBounds,
    ) -> query_core::Result<Vec<Record>> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        println!("  [db] {}  params={:?}", bound_sql.sql(), bound_sql.input_values(parameter));
        let wanted = bound_sql.input_values(parameter).into_iter().next();
        Ok(self
            .tables
            .get(ms.id.as_str())
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get("id") == wanted.as_ref())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn update(
        &mut self,
        _ms: &MappedStatement,
        _bound_sql: &BoundSql,
        _parameter: &Value,
    ) -> query_core::Result<u64> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Session Cache Example ===\n");

    let blog_cache = CacheBuilder::new("BlogMapper")
        .config(CacheConfig::default().with_size(256))
        .build()?;

    let author = Arc::new(
        MappedStatement::select("AuthorMapper.selectAuthor", "SELECT * FROM author WHERE id = ?")
            .with_parameter(ParameterMapping::input("id")),
    );
    let blog = MappedStatement::select("BlogMapper.selectBlog", "SELECT * FROM blog WHERE id = ?")
        .with_parameter(ParameterMapping::input("id"))
        .with_cache(Arc::clone(&blog_cache));
    let materializer = Arc::new(NestedSelectMaterializer::new().with_nested(
        "BlogMapper.selectBlog",
        NestedSelect::new("author", "author_id", author, TargetType::Single),
    ));

    let round_trips = Arc::new(AtomicUsize::new(0));
    let new_session = || {
        Executor::new(
            ExecutorConfig::default(),
            Box::new(InMemoryDatabase::new(Arc::clone(&round_trips))),
            materializer.clone(),
        )
    };

    println!("--- Session 1: first query loads blog and author ---");
    let mut session = new_session();
    let blogs = session.query(&blog, &Value::Int64(1), RowBounds::default(), None)?;
    println!("  result: {}", blogs[0]);

    println!("\n--- Session 1: repeated query served from the local cache ---");
    session.query(&blog, &Value::Int64(1), RowBounds::default(), None)?;
    println!("  round trips so far: {}", round_trips.load(Ordering::SeqCst));

    session.commit(true)?;
    session.close(false)?;
    println!("  committed; second-level cache now holds {} entries", blog_cache.size());

    println!("\n--- Session 2: served from the second-level cache ---");
    let mut session = new_session();
    let blogs = session.query(&blog, &Value::Int64(1), RowBounds::default(), None)?;
    println!("  result: {}", blogs[0]);
    println!("  round trips so far: {}", round_trips.load(Ordering::SeqCst));
    session.close(false)?;

    if let Some(stats) = blog_cache.stats() {
        println!(
            "\nBlogMapper cache: {} requests, {} hits ({:.0}% hit ratio)",
            stats.requests(),
            stats.hits(),
            stats.hit_ratio() * 100.0
        );
    }

    println!("\n=== Session cache example completed! ===");
    Ok(())
}
